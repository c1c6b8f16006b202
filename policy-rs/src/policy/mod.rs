pub mod error;
pub use error::{Key, PolicyError, PolicyKind, PolicyResult, Reference};

pub mod action;
pub use action::Action;

pub mod args;
pub use args::{Args, parse_list};

pub mod regex;
pub use regex::regcomp;

pub mod fields;
pub use fields::RawFields;

pub mod seq_map;

pub mod prefix;
pub use prefix::{PrefixList, PrefixListRule};

pub mod community;
pub use community::{CommunityList, CommunityListRule, CommunityListType};

pub mod route_map;
pub use route_map::{
    CommunityFamily, Match, MetricType, RouteMap, RouteMapRule, Set, normalize,
};

pub mod validate;

pub mod store;
pub use store::{PolicyStore, Snapshot};

pub mod device;
pub use device::{CommandDevice, DeviceApi, DeviceError};

pub mod vyos;

pub mod inst;
pub use inst::{PolicyClient, PolicyManager, Request, serve};

pub mod show;
