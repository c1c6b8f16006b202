use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[strum(serialize = "permit")]
    Permit,
    #[strum(serialize = "deny")]
    Deny,
}
