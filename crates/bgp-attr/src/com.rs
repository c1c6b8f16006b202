use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::AttrParseError;

/// BGP Community 32 bit value.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct CommunityValue(pub u32);

impl CommunityValue {
    pub const GRACEFUL_SHUTDOWN: Self = CommunityValue(0xFFFF_0000);
    pub const ACCEPT_OWN: Self = CommunityValue(0xFFFF_0001);
    pub const LLGR_STALE: Self = CommunityValue(0xFFFF_0006);
    pub const NO_LLGR: Self = CommunityValue(0xFFFF_0007);
    pub const BLACKHOLE: Self = CommunityValue(0xFFFF_029A);
    pub const NO_EXPORT: Self = CommunityValue(0xFFFF_FF01);
    pub const NO_ADVERTISE: Self = CommunityValue(0xFFFF_FF02);
    pub const LOCAL_AS: Self = CommunityValue(0xFFFF_FF03);
    pub const NO_PEER: Self = CommunityValue(0xFFFF_FF04);

    pub fn from_wellknown_str(s: &str) -> Option<Self> {
        STR_WELLKNOWN_MAP.get(s).cloned()
    }

    // ASN:NN format only, a bare 32 bit number is not accepted in policy.
    fn from_digit_str(s: &str) -> Option<Self> {
        let (hval, lval) = s.split_once(':')?;
        if let Ok(hval) = hval.parse::<u16>()
            && let Ok(lval) = lval.parse::<u16>()
        {
            return Some(Self(u32::from(hval) << 16 | u32::from(lval)));
        }
        None
    }

    pub fn from_readable_str(s: &str) -> Option<Self> {
        Self::from_wellknown_str(s).or(Self::from_digit_str(s))
    }

    pub fn to_wellknown_str(&self) -> Option<&'static str> {
        WELLKNOWN_STR_MAP.get(self).copied()
    }

    pub fn to_digit_str(&self) -> String {
        let hval: u32 = (self.0 & 0xFFFF_0000) >> 16;
        let lval: u32 = self.0 & 0x0000_FFFF;
        format!("{}:{}", hval, lval)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CommunityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_wellknown_str() {
            Some(s) => write!(f, "{s}"),
            None => write!(f, "{}", self.to_digit_str()),
        }
    }
}

impl FromStr for CommunityValue {
    type Err = AttrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_readable_str(s).ok_or_else(|| AttrParseError::Community(s.to_string()))
    }
}

static WELLKNOWN_STR_MAP: LazyLock<HashMap<CommunityValue, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    map.insert(CommunityValue::GRACEFUL_SHUTDOWN, "graceful-shutdown");
    map.insert(CommunityValue::ACCEPT_OWN, "accept-own");
    map.insert(CommunityValue::LLGR_STALE, "llgr-stale");
    map.insert(CommunityValue::NO_LLGR, "no-llgr");
    map.insert(CommunityValue::BLACKHOLE, "blackhole");
    map.insert(CommunityValue::NO_EXPORT, "no-export");
    map.insert(CommunityValue::NO_ADVERTISE, "no-advertise");
    map.insert(CommunityValue::LOCAL_AS, "local-as");
    map.insert(CommunityValue::NO_PEER, "no-peer");
    map
});

static STR_WELLKNOWN_MAP: LazyLock<HashMap<&'static str, CommunityValue>> = LazyLock::new(|| {
    WELLKNOWN_STR_MAP
        .iter()
        .map(|(val, name)| (*name, *val))
        .collect()
});

/// Ordered list of community values as written in a policy statement.
/// Order and duplicates are kept, the device decides what to do with them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Community(pub Vec<CommunityValue>);

impl Community {
    pub fn new() -> Self {
        Community(Vec::new())
    }

    pub fn push(&mut self, value: CommunityValue) {
        self.0.push(value)
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self
            .0
            .iter()
            .map(|x| x.to_string())
            .collect::<Vec<String>>()
            .join(" ");
        write!(f, "{v}")
    }
}

impl FromStr for Community {
    type Err = AttrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let com_strs: Vec<&str> = s.split_whitespace().collect();
        if com_strs.is_empty() {
            return Err(AttrParseError::Empty);
        }
        let mut coms = Community::new();
        for s in com_strs.iter() {
            coms.push(s.parse()?);
        }
        Ok(coms)
    }
}
