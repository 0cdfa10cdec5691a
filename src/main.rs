use ipcount::cli::Cli;
use ipcount::counter::{Config, UniqueCounter};
use ipcount::{eprint_blue, eprint_green, eprintln_red, eprintln_yellow};

use std::io;
use std::time::Instant;

use clap::Parser;

fn main() -> io::Result<()> {
    ipcount::tracy::start();

    _ = ipcount::platform::set_process_priority(-10);

    let cli = Cli::parse();
    let path = cli.path.display();

    let counter = UniqueCounter::new(Config::from(&cli));

    let start = Instant::now();
    let stats = match counter.count_file(&cli.path) {
        Ok(ok) => ok,
        Err(e) => {
            match e.kind() {
                io::ErrorKind::NotFound => {
                    eprintln_red!("error: file not found: '{path}'");
                }
                io::ErrorKind::PermissionDenied => {
                    eprintln_red!("error: permission denied while opening '{path}'");
                }
                _ => {
                    eprintln_red!("error: failed to count addresses in '{path}': {e}");
                }
            }

            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    println!("Unique IP addresses: {}", stats.unique);
    println!("Time elapsed: {elapsed:.2?}");

    if stats.malformed > 0 {
        eprintln_yellow!("warning: skipped {} malformed lines", stats.malformed);
    }

    if cli.stats {
        eprint_blue!("Counted ");
        eprint_green!("'{path}' ");
        eprint_blue!("in ");
        eprint_green!("{elapsed:.2?}\n");
        eprintln!("{stats}");
    }

    Ok(())
}
