use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AttrParseError;

/// BGP route origin types as defined in RFC 4271
#[repr(u8)]
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Default, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Igp = 0,
    Egp = 1,
    Incomplete = 2,
}

impl Origin {
    pub fn short_str(&self) -> &'static str {
        match self {
            Origin::Igp => "i",
            Origin::Egp => "e",
            Origin::Incomplete => "?",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Igp => write!(f, "igp"),
            Origin::Egp => write!(f, "egp"),
            Origin::Incomplete => write!(f, "incomplete"),
        }
    }
}

impl FromStr for Origin {
    type Err = AttrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "igp" => Ok(Origin::Igp),
            "egp" => Ok(Origin::Egp),
            "incomplete" => Ok(Origin::Incomplete),
            _ => Err(AttrParseError::Origin(s.to_string())),
        }
    }
}
