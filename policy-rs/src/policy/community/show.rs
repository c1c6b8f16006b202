use anyhow::{Context, Error};
use std::fmt::Write;

use crate::policy::{Args, PolicyStore};

use super::CommunityList;

// Show all community-lists, or the one named in args.
pub fn community_list(store: &PolicyStore, mut args: Args, json: bool) -> Result<String, Error> {
    let clists: Vec<&CommunityList> = match args.string() {
        Some(name) => vec![
            store
                .community_list(&name)
                .context(format!("community-list '{}' not found", name))?,
        ],
        None => store.community_lists().collect(),
    };

    if json {
        return Ok(serde_json::to_string_pretty(&clists)?);
    }

    let mut buf = String::new();
    for clist in clists {
        writeln!(buf, "community-list {} ({})", clist.name, clist.list_type)?;
        for rule in clist.rules.values() {
            writeln!(buf, "  rule {} {} {}", rule.sequence, rule.action, rule.community)?;
            if let Some(desc) = &rule.description {
                writeln!(buf, "    description \"{}\"", desc)?;
            }
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Action, CommunityListRule, CommunityListType};

    #[test]
    fn text() {
        let mut store = PolicyStore::new();
        store
            .create_community_list("CL-X", CommunityListType::Expanded)
            .unwrap();
        let mut rule = CommunityListRule::new(5, Action::Deny, "_65001:.*_");
        rule.description = Some("block".into());
        store.add_community_list_rule("CL-X", rule).unwrap();

        let out = community_list(&store, Args::default(), false).unwrap();
        assert_eq!(
            out,
            "community-list CL-X (expanded)\n  rule 5 deny _65001:.*_\n    description \"block\"\n"
        );
    }
}
