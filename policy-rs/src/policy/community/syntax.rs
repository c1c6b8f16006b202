// Member value syntax of a community-list.
//
// community-list standard CUSTOMER {
//   rule 10 { action permit; community 65001:100; }
//   rule 20 { action deny; community no-export; }
// }
//
// community-list expanded TRANSIT {
//   rule 10 { action permit; community _65002:[0-9]+_; }
// }
//
// A standard member may hold several values separated by spaces, all of
// which must be present on the route.

use bgp_attr::Community;

use crate::policy::regex::regcomp;
use crate::policy::{PolicyError, PolicyResult};

use super::CommunityListType;

pub fn check_community(list_type: CommunityListType, value: &str) -> PolicyResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PolicyError::invalid("community", "required"));
    }
    match list_type {
        CommunityListType::Standard => {
            value
                .parse::<Community>()
                .map_err(|e| PolicyError::invalid("community", e.to_string()))?;
        }
        CommunityListType::Expanded => {
            regcomp(value).map_err(|e| {
                PolicyError::invalid("community", format!("invalid expression: {}", e))
            })?;
        }
    }
    Ok(())
}
