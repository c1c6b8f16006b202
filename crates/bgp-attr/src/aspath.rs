use std::fmt;
use std::str::FromStr;

use crate::AttrParseError;

/// Four octet AS number. Accepts asplain (`4200000000`) and asdot
/// (`64086.59904`) notation, displays asplain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Asn(pub u32);

impl fmt::Display for Asn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Asn {
    type Err = AttrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AttrParseError::Asn(s.to_string());
        if let Some((hval, lval)) = s.split_once('.') {
            let hval = hval.parse::<u16>().map_err(|_| err())?;
            let lval = lval.parse::<u16>().map_err(|_| err())?;
            return Ok(Asn(u32::from(hval) << 16 | u32::from(lval)));
        }
        s.parse::<u32>().map(Asn).map_err(|_| err())
    }
}
