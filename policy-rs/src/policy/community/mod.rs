pub mod list;
pub use list::{CommunityList, CommunityListRule, CommunityListType};

pub mod syntax;
pub use syntax::*;

pub mod show;
