use std::collections::BTreeMap;
use std::net::IpAddr;

use bgp_attr::Origin;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};

use crate::policy::seq_map::{self, Sequenced};
use crate::policy::{Action, PolicyResult, RawFields};

use super::normalize;

#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteMap {
    pub name: String,
    #[serde(default, with = "seq_map")]
    pub rules: BTreeMap<u32, RouteMapRule>,
}

impl RouteMap {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rules: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteMapRule {
    pub sequence: u32,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#match: Option<Match>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Set>,
}

impl Sequenced for RouteMapRule {
    fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl RouteMapRule {
    pub fn new(sequence: u32, action: Action) -> Self {
        Self {
            sequence,
            action,
            description: None,
            r#match: None,
            set: None,
        }
    }

    pub fn with_match(mut self, m: Match) -> Self {
        self.r#match = Some(m);
        self
    }

    pub fn with_set(mut self, s: Set) -> Self {
        self.set = Some(s);
        self
    }

    const FIELDS: [&str; 3] = ["sequence", "action", "description"];

    /// Build a rule from form fields; `match/...` and `set/...` paths go
    /// through the normalizer.
    pub fn from_fields(fields: &RawFields) -> PolicyResult<Self> {
        let (m, s) = normalize(&fields.without(&Self::FIELDS))?;
        Ok(Self {
            sequence: fields.required("sequence")?,
            action: fields.required("action")?,
            description: fields.text("description"),
            r#match: (!m.is_empty()).then_some(m),
            set: (!s.is_empty()).then_some(s),
        })
    }
}

#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address_prefix_list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_address_prefix_list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_nexthop_prefix_list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extcommunity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_community: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_preference: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_nexthop: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_route_source: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

impl Match {
    pub fn is_empty(&self) -> bool {
        *self == Match::default()
    }

    /// Prefix-list references as (field, name).
    pub fn prefix_list_refs(&self) -> Vec<(&'static str, &str)> {
        [
            ("ip_address_prefix_list", &self.ip_address_prefix_list),
            ("ipv6_address_prefix_list", &self.ipv6_address_prefix_list),
            ("ip_nexthop_prefix_list", &self.ip_nexthop_prefix_list),
        ]
        .into_iter()
        .filter_map(|(field, name)| name.as_deref().map(|n| (field, n)))
        .collect()
    }

    /// Community-list references as (field, name).
    pub fn community_list_refs(&self) -> Vec<(&'static str, &str)> {
        [
            ("community", &self.community),
            ("extcommunity", &self.extcommunity),
            ("large_community", &self.large_community),
        ]
        .into_iter()
        .filter_map(|(field, name)| name.as_deref().map(|n| (field, n)))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Serialize, Deserialize)]
pub enum MetricType {
    #[strum(serialize = "type-1")]
    #[serde(rename = "type-1")]
    Type1,
    #[strum(serialize = "type-2")]
    #[serde(rename = "type-2")]
    Type2,
}

#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Set {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_preference: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<MetricType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_next_hop: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_nexthop_peer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_path_prepend: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_path_exclude: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_path_replace: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_add: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_delete: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extcommunity: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extcommunity_add: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extcommunity_delete: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_community: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_community_add: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_community_delete: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

/// Community attribute family touched by a `Set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CommunityFamily {
    #[strum(serialize = "community")]
    Standard,
    #[strum(serialize = "extcommunity")]
    Extended,
    #[strum(serialize = "large_community")]
    Large,
}

/// Replace, add and delete operations of one community family.
pub struct CommunityOps<'a> {
    pub family: CommunityFamily,
    pub replace: Option<&'a Vec<String>>,
    pub add: Option<&'a Vec<String>>,
    pub delete: Option<&'a Vec<String>>,
}

impl Set {
    pub fn is_empty(&self) -> bool {
        *self == Set::default()
    }

    pub fn community_ops(&self) -> [CommunityOps<'_>; 3] {
        [
            CommunityOps {
                family: CommunityFamily::Standard,
                replace: self.community.as_ref(),
                add: self.community_add.as_ref(),
                delete: self.community_delete.as_ref(),
            },
            CommunityOps {
                family: CommunityFamily::Extended,
                replace: self.extcommunity.as_ref(),
                add: self.extcommunity_add.as_ref(),
                delete: self.extcommunity_delete.as_ref(),
            },
            CommunityOps {
                family: CommunityFamily::Large,
                replace: self.large_community.as_ref(),
                add: self.large_community_add.as_ref(),
                delete: self.large_community_delete.as_ref(),
            },
        ]
    }
}

/// Supplied fields of a sparse `Match` or `Set` as (field, value), in
/// declaration order.
pub fn supplied<T: Serialize>(val: &T) -> Vec<(String, Value)> {
    match serde_json::to_value(val) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Plain text of a supplied value. Lists are space separated.
pub fn value_text(val: &Value) -> String {
    match val {
        Value::String(s) => s.clone(),
        Value::Array(vals) => vals.iter().map(value_text).collect::<Vec<_>>().join(" "),
        val => val.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_serialization() {
        let set = Set {
            metric: Some(0),
            ..Default::default()
        };
        let rule = RouteMapRule::new(10, Action::Permit).with_set(set);
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(json, r#"{"sequence":10,"action":"permit","set":{"metric":0}}"#);
    }

    #[test]
    fn empty_list_is_kept() {
        let json = r#"{"sequence":10,"action":"permit","set":{"community":[]}}"#;
        let rule: RouteMapRule = serde_json::from_str(json).unwrap();
        let set = rule.set.unwrap();
        assert_eq!(set.community, Some(vec![]));
        assert!(!set.is_empty());
    }

    #[test]
    fn match_refs() {
        let m = Match {
            ip_address_prefix_list: Some("PL-4".into()),
            large_community: Some("CL-L".into()),
            metric: Some(5),
            ..Default::default()
        };
        assert_eq!(m.prefix_list_refs(), vec![("ip_address_prefix_list", "PL-4")]);
        assert_eq!(m.community_list_refs(), vec![("large_community", "CL-L")]);
    }

    #[test]
    fn from_fields() {
        let fields = RawFields::new()
            .with("sequence", "10")
            .with("action", "permit")
            .with("match/community", "CL-TEST")
            .with("set/local_preference", "200")
            .with("set/weight", "");
        let rule = RouteMapRule::from_fields(&fields).unwrap();
        assert_eq!(rule.r#match.unwrap().community.as_deref(), Some("CL-TEST"));
        let set = rule.set.unwrap();
        assert_eq!(set.local_preference, Some(200));
        assert_eq!(set.weight, None);
    }

    #[test]
    fn supplied_fields() {
        let set = Set {
            metric: Some(0),
            as_path_prepend: Some(vec![65001, 65002]),
            community: Some(vec![]),
            ..Default::default()
        };
        let fields: Vec<(String, String)> = supplied(&set)
            .iter()
            .map(|(k, v)| (k.clone(), value_text(v)))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("metric".to_string(), "0".to_string()),
                ("as_path_prepend".to_string(), "65001 65002".to_string()),
                ("community".to_string(), "".to_string()),
            ]
        );
    }

    #[test]
    fn from_fields_nothing_supplied() {
        let fields = RawFields::new()
            .with("sequence", "30")
            .with("action", "deny")
            .with("match/community", " ");
        let rule = RouteMapRule::from_fields(&fields).unwrap();
        assert!(rule.r#match.is_none());
        assert!(rule.set.is_none());
    }
}
