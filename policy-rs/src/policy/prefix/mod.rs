pub mod list;
pub use list::{PrefixList, PrefixListRule};

pub mod show;
