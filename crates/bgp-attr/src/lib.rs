pub mod error;
pub use error::*;

pub mod com;
pub use com::*;

pub mod ext_com;
pub use ext_com::*;

pub mod large_com;
pub use large_com::*;

pub mod aspath;
pub use aspath::*;

pub mod origin;
pub use origin::*;
