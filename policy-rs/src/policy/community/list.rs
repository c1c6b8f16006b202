use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::policy::seq_map::{self, Sequenced};
use crate::policy::{Action, PolicyResult, RawFields};

/// Decides the syntax of the member values, fixed when the list is created.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CommunityListType {
    #[default]
    #[strum(serialize = "standard")]
    Standard,
    #[strum(serialize = "expanded")]
    Expanded,
}

#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommunityList {
    pub name: String,
    #[serde(rename = "type", default)]
    pub list_type: CommunityListType,
    #[serde(default, with = "seq_map")]
    pub rules: BTreeMap<u32, CommunityListRule>,
}

impl CommunityList {
    pub fn new(name: &str, list_type: CommunityListType) -> Self {
        Self {
            name: name.to_string(),
            list_type,
            rules: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommunityListRule {
    pub sequence: u32,
    pub action: Action,
    pub community: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Sequenced for CommunityListRule {
    fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl CommunityListRule {
    pub fn new(sequence: u32, action: Action, community: &str) -> Self {
        Self {
            sequence,
            action,
            community: community.to_string(),
            description: None,
        }
    }

    const FIELDS: [&str; 4] = ["sequence", "action", "community", "description"];

    pub fn from_fields(fields: &RawFields) -> PolicyResult<Self> {
        fields.check_known(&Self::FIELDS)?;
        Ok(Self {
            sequence: fields.required("sequence")?,
            action: fields.required("action")?,
            community: fields.required("community")?,
            description: fields.text("description"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyError;

    #[test]
    fn from_fields() {
        let fields = RawFields::new()
            .with("sequence", "10")
            .with("action", "permit")
            .with("community", " 65001:100 ")
            .with("description", "customer routes");
        let rule = CommunityListRule::from_fields(&fields).unwrap();
        assert_eq!(rule.community, "65001:100");
        assert_eq!(rule.description.as_deref(), Some("customer routes"));
    }

    #[test]
    fn from_fields_blank_community() {
        let fields = RawFields::new()
            .with("sequence", "10")
            .with("action", "permit")
            .with("community", "   ");
        assert_eq!(
            CommunityListRule::from_fields(&fields),
            Err(PolicyError::invalid("community", "required"))
        );
    }

    #[test]
    fn list_type_serde() {
        let clist: CommunityList =
            serde_json::from_str(r#"{"name":"CL","type":"expanded","rules":[]}"#).unwrap();
        assert_eq!(clist.list_type, CommunityListType::Expanded);
        assert_eq!("standard".parse::<CommunityListType>().unwrap(), CommunityListType::Standard);
    }
}
