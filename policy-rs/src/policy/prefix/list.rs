use std::collections::BTreeMap;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::policy::seq_map::{self, Sequenced};
use crate::policy::{Action, PolicyResult, RawFields};

#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrefixList {
    pub name: String,
    #[serde(default, with = "seq_map")]
    pub rules: BTreeMap<u32, PrefixListRule>,
}

impl PrefixList {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rules: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrefixListRule {
    pub sequence: u32,
    pub action: Action,
    pub prefix: IpNet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ge: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub le: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Sequenced for PrefixListRule {
    fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl PrefixListRule {
    pub fn new(sequence: u32, action: Action, prefix: IpNet) -> Self {
        Self {
            sequence,
            action,
            prefix,
            ge: None,
            le: None,
            description: None,
        }
    }

    pub fn ge(mut self, ge: u8) -> Self {
        self.ge = Some(ge);
        self
    }

    pub fn le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    const FIELDS: [&str; 6] = ["sequence", "action", "prefix", "ge", "le", "description"];

    /// Build a rule from form fields. Range checks are left to the validator.
    pub fn from_fields(fields: &RawFields) -> PolicyResult<Self> {
        fields.check_known(&Self::FIELDS)?;
        Ok(Self {
            sequence: fields.required("sequence")?,
            action: fields.required("action")?,
            prefix: fields.required("prefix")?,
            ge: fields.optional("ge")?,
            le: fields.optional("le")?,
            description: fields.text("description"),
        })
    }
}
