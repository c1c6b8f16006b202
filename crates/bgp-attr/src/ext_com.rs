use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use strum_macros::{Display, EnumString};

use crate::AttrParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, EnumString, Display)]
pub enum ExtCommunitySubType {
    #[strum(serialize = "rt")]
    RouteTarget,
    #[strum(serialize = "soo")]
    RouteOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExtGlobalAdmin {
    As(u32),
    Ip(Ipv4Addr),
}

impl fmt::Display for ExtGlobalAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtGlobalAdmin::As(asn) => write!(f, "{asn}"),
            ExtGlobalAdmin::Ip(addr) => write!(f, "{addr}"),
        }
    }
}

/// Route target or site of origin, written as `rt:ASN:NN`, `rt:A.B.C.D:NN`
/// or `soo:...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExtCommunityValue {
    pub sub_type: ExtCommunitySubType,
    pub global: ExtGlobalAdmin,
    pub local: u32,
}

impl ExtCommunityValue {
    /// Value part without the sub type, e.g. `100:200`.
    pub fn value_str(&self) -> String {
        format!("{}:{}", self.global, self.local)
    }

    fn from_value_str(sub_type: ExtCommunitySubType, s: &str) -> Option<Self> {
        let (global, local) = s.rsplit_once(':')?;
        if let Ok(addr) = global.parse::<Ipv4Addr>() {
            let local = local.parse::<u16>().ok()?;
            return Some(Self {
                sub_type,
                global: ExtGlobalAdmin::Ip(addr),
                local: local.into(),
            });
        }
        let asn = global.parse::<u32>().ok()?;
        // Four octet AS leaves two octets for the local administrator.
        let local = if asn > u16::MAX as u32 {
            local.parse::<u16>().ok()?.into()
        } else {
            local.parse::<u32>().ok()?
        };
        Some(Self {
            sub_type,
            global: ExtGlobalAdmin::As(asn),
            local,
        })
    }
}

impl fmt::Display for ExtCommunityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.sub_type, self.global, self.local)
    }
}

impl FromStr for ExtCommunityValue {
    type Err = AttrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AttrParseError::ExtCommunity(s.to_string());
        let (sub_type, value) = s.split_once(':').ok_or_else(err)?;
        let sub_type: ExtCommunitySubType = sub_type.parse().map_err(|_| err())?;
        Self::from_value_str(sub_type, value).ok_or_else(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rt_asn() {
        let val = ExtCommunityValue::from_str("rt:100:200").unwrap();
        assert_eq!(val.sub_type, ExtCommunitySubType::RouteTarget);
        assert_eq!(val.global, ExtGlobalAdmin::As(100));
        assert_eq!(val.local, 200);
        assert_eq!(val.to_string(), "rt:100:200");
        assert_eq!(val.value_str(), "100:200");
    }

    #[test]
    fn parse_soo_ip() {
        let val = ExtCommunityValue::from_str("soo:1.2.3.4:100").unwrap();
        assert_eq!(val.sub_type, ExtCommunitySubType::RouteOrigin);
        assert_eq!(val.global, ExtGlobalAdmin::Ip(Ipv4Addr::new(1, 2, 3, 4)));
    }

    #[test]
    fn parse_as4_local_range() {
        assert!(ExtCommunityValue::from_str("rt:4200000000:65535").is_ok());
        assert!(ExtCommunityValue::from_str("rt:4200000000:65536").is_err());
        assert!(ExtCommunityValue::from_str("rt:65000:4294967295").is_ok());
    }

    #[test]
    fn parse_invalid() {
        assert!(ExtCommunityValue::from_str("100:200").is_err());
        assert!(ExtCommunityValue::from_str("opaque:1:2").is_err());
        assert!(ExtCommunityValue::from_str("rt:^62692:.*$").is_err());
        assert!(ExtCommunityValue::from_str("rt:1.2.3.4:70000").is_err());
    }
}
