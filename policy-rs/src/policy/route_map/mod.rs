pub mod rule;
pub use rule::*;

pub mod normalize;
pub use normalize::{Normalizer, normalize};

pub mod show;
