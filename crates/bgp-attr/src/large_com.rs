use std::fmt;
use std::str::FromStr;

use crate::AttrParseError;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LargeCommunityValue {
    pub global: u32,
    pub local1: u32,
    pub local2: u32,
}

impl fmt::Display for LargeCommunityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.global, self.local1, self.local2)
    }
}

impl FromStr for LargeCommunityValue {
    type Err = AttrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let com_strs: Vec<&str> = s.split(':').collect();
        if com_strs.len() == 3
            && let Ok(global) = com_strs[0].parse::<u32>()
            && let Ok(local1) = com_strs[1].parse::<u32>()
            && let Ok(local2) = com_strs[2].parse::<u32>()
        {
            return Ok(Self {
                global,
                local1,
                local2,
            });
        }
        Err(AttrParseError::LargeCommunity(s.to_string()))
    }
}
