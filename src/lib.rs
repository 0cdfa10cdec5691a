#![cfg_attr(all(feature = "use_nightly", nightly), allow(internal_features))]
#![cfg_attr(all(feature = "use_nightly", nightly), feature(core_intrinsics))]

pub mod bitmap;
pub mod cli;
pub mod core_topology;
pub mod counter;
pub mod input;
pub mod parser;
pub mod platform;
pub mod reducer;
pub mod splitter;
pub mod stats;
pub mod tracy;
pub mod util;

pub use bitmap::PresenceBitmap;
pub use counter::{count_unique, Config, UniqueCounter};
pub use input::MappedInput;
pub use parser::ParseMode;
pub use stats::Stats;
