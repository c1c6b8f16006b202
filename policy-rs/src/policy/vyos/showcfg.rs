// Read the policy node back from the device, either as the hierarchical
// configuration text or as a list of configuration commands.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::policy::community::check_community;
use crate::policy::{
    CommunityList, CommunityListRule, CommunityListType, Key, PolicyError, PolicyKind,
    PolicyResult, PrefixList, PrefixListRule, RawFields, RouteMap, RouteMapRule, Snapshot,
};

use super::{route_map_container, route_map_field, route_map_fields_under, tokenize};

/// Every node path of the configuration text, containers included.
pub fn paths(text: &str) -> Vec<Vec<String>> {
    let mut stack: Vec<Vec<String>> = Vec::new();
    let mut paths = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("/*") || line.starts_with("//") {
            continue;
        }
        if line == "}" {
            stack.pop();
            continue;
        }
        let mut path = stack.last().cloned().unwrap_or_default();
        if let Some(head) = line.strip_suffix('{') {
            path.extend(tokenize(head));
            paths.push(path.clone());
            stack.push(path);
        } else {
            path.extend(tokenize(line));
            paths.push(path);
        }
    }
    paths
}

/// Snapshot of the `policy` node in the configuration text.
pub fn parse(text: &str) -> PolicyResult<Snapshot> {
    let mut builder = Builder::default();
    for path in paths(text) {
        if path.first().map(String::as_str) == Some("policy") {
            builder.set(&path[1..])?;
        }
    }
    builder.build()
}

/// Snapshot left by replaying `set policy` and `delete policy` commands
/// from an empty configuration.
pub fn parse_commands<I, S>(lines: I) -> PolicyResult<Snapshot>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut builder = Builder::default();
    for line in lines {
        let words = tokenize(line.as_ref());
        let (Some(op), Some(node)) = (words.first(), words.get(1)) else {
            continue;
        };
        if node != "policy" {
            continue;
        }
        match op.as_str() {
            "set" => builder.set(&words[2..])?,
            "delete" => builder.delete(&words[2..])?,
            _ => debug!("skip {}", line.as_ref()),
        }
    }
    builder.build()
}

type Rules = BTreeMap<u32, RawFields>;

#[derive(Default)]
struct Builder {
    prefix_lists: BTreeMap<String, Rules>,
    community_lists: BTreeMap<String, Rules>,
    route_maps: BTreeMap<String, Rules>,
}

fn sequence(word: &str) -> PolicyResult<u32> {
    word.parse()
        .map_err(|_| PolicyError::invalid("rule", format!("malformed sequence '{}'", word)))
}

// Locate a rule field error within the configuration.
fn locate(err: PolicyError, key: &Key) -> PolicyError {
    match err {
        PolicyError::InvalidInput { field, reason } => PolicyError::InvalidInput {
            field: format!("{} {}", key, field),
            reason,
        },
        err => err,
    }
}

impl Builder {
    fn kind(&mut self, kind: &str) -> Option<(PolicyKind, &mut BTreeMap<String, Rules>)> {
        match kind {
            "prefix-list" => Some((PolicyKind::PrefixList, &mut self.prefix_lists)),
            "community-list" => Some((PolicyKind::CommunityList, &mut self.community_lists)),
            "route-map" => Some((PolicyKind::RouteMap, &mut self.route_maps)),
            _ => None,
        }
    }

    fn set(&mut self, path: &[String]) -> PolicyResult<()> {
        let Some((kind, name)) = path.first().zip(path.get(1)) else {
            return Ok(());
        };
        let Some((kind, entities)) = self.kind(kind) else {
            debug!("skip policy {}", path.join(" "));
            return Ok(());
        };
        let rules = entities.entry(name.clone()).or_default();
        match path.get(2).map(String::as_str) {
            None => return Ok(()),
            Some("rule") => {}
            Some(_) => {
                debug!("skip policy {}", path.join(" "));
                return Ok(());
            }
        }
        let Some(seq) = path.get(3) else {
            return Ok(());
        };
        let seq = sequence(seq)?;
        let fields = rules
            .entry(seq)
            .or_insert_with(|| RawFields::new().with("sequence", &seq.to_string()));

        let leaf = &path[4..];
        let Some(key) = leaf.first() else {
            return Ok(());
        };
        let value = leaf[1..].join(" ");
        match (kind, key.as_str()) {
            (_, "action" | "description") => fields.insert(key, &value),
            (PolicyKind::PrefixList, "prefix" | "ge" | "le") => fields.insert(key, &value),
            (PolicyKind::CommunityList, "community" | "regex") => {
                fields.insert("community", &value)
            }
            (PolicyKind::RouteMap, _) => match route_map_field(leaf) {
                Some((field, raw)) => fields.insert(field, &raw),
                None if route_map_container(leaf) => {}
                None => warn!("route-map {} rule {}: unsupported {}", name, seq, leaf.join(" ")),
            },
            _ => warn!("{} {} rule {}: unsupported {}", kind, name, seq, leaf.join(" ")),
        }
        Ok(())
    }

    fn delete(&mut self, path: &[String]) -> PolicyResult<()> {
        let Some((kind, name)) = path.first().zip(path.get(1)) else {
            return Ok(());
        };
        let Some((kind, entities)) = self.kind(kind) else {
            return Ok(());
        };
        if path.len() == 2 {
            entities.remove(name);
            return Ok(());
        }
        let (Some(rules), Some("rule"), Some(seq)) = (
            entities.get_mut(name),
            path.get(2).map(String::as_str),
            path.get(3),
        ) else {
            return Ok(());
        };
        let seq = sequence(seq)?;
        let leaf = &path[4..];
        if leaf.is_empty() {
            rules.remove(&seq);
            return Ok(());
        }
        let Some(fields) = rules.get_mut(&seq) else {
            return Ok(());
        };
        let removed: Vec<&str> = match (kind, leaf[0].as_str()) {
            (PolicyKind::RouteMap, "action" | "description") => vec![leaf[0].as_str()],
            (PolicyKind::RouteMap, _) => route_map_fields_under(leaf),
            (PolicyKind::CommunityList, "regex") => vec!["community"],
            _ => vec![leaf[0].as_str()],
        };
        fields.0.retain(|(path, _)| !removed.contains(&path.as_str()));
        Ok(())
    }

    fn build(self) -> PolicyResult<Snapshot> {
        let mut snapshot = Snapshot::default();
        for (name, rules) in self.prefix_lists {
            let mut plist = PrefixList::new(&name);
            for (seq, fields) in rules {
                let key = Key::rule(PolicyKind::PrefixList, &name, seq);
                let rule = PrefixListRule::from_fields(&fields).map_err(|e| locate(e, &key))?;
                plist.rules.insert(seq, rule);
            }
            snapshot.prefix_lists.push(plist);
        }
        for (name, rules) in self.community_lists {
            let mut clist = CommunityList::new(&name, CommunityListType::Standard);
            for (seq, fields) in rules {
                let key = Key::rule(PolicyKind::CommunityList, &name, seq);
                let rule =
                    CommunityListRule::from_fields(&fields).map_err(|e| locate(e, &key))?;
                clist.rules.insert(seq, rule);
            }
            // The device does not keep the list type, a list is expanded as
            // soon as one member is not a plain community.
            if clist
                .rules
                .values()
                .any(|rule| check_community(CommunityListType::Standard, &rule.community).is_err())
            {
                clist.list_type = CommunityListType::Expanded;
            }
            snapshot.community_lists.push(clist);
        }
        for (name, rules) in self.route_maps {
            let mut rmap = RouteMap::new(&name);
            for (seq, fields) in rules {
                let key = Key::rule(PolicyKind::RouteMap, &name, seq);
                let rule = RouteMapRule::from_fields(&fields).map_err(|e| locate(e, &key))?;
                rmap.rules.insert(seq, rule);
            }
            snapshot.route_maps.push(rmap);
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::vyos::commands;
    use crate::policy::{Action, Match, Set};

    const SHOWCFG: &str = r#"
interfaces {
    ethernet eth0 {
        address 192.0.2.1/24
    }
}
policy {
    community-list CL-TEST {
        rule 10 {
            action permit
            community 65001:100
            description "customer routes"
        }
    }
    community-list CL-RE {
        rule 10 {
            action deny
            community _65002:.*_
        }
    }
    prefix-list PL-1 {
        rule 10 {
            action permit
            le 24
            prefix 10.0.0.0/8
        }
        rule 20 {
            action deny
            prefix 0.0.0.0/0
        }
    }
    route-map RM-TEST {
        rule 10 {
            action permit
            match {
                community {
                    community-list CL-TEST
                }
                ip {
                    address {
                        prefix-list PL-1
                    }
                }
            }
            set {
                as-path {
                    prepend "65001 65001"
                }
                community {
                    none
                }
                ip-next-hop peer-address
                local-preference 200
                metric 0
            }
        }
        rule 20 {
            action deny
            call RM-OTHER
        }
    }
}
"#;

    #[test]
    fn parse_showcfg() {
        let snapshot = parse(SHOWCFG).unwrap();
        assert_eq!(snapshot.prefix_lists.len(), 1);
        let plist = &snapshot.prefix_lists[0];
        assert_eq!(plist.rules[&10].le, Some(24));
        assert_eq!(plist.rules[&20].action, Action::Deny);

        let names: Vec<&str> = snapshot
            .community_lists
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["CL-RE", "CL-TEST"]);
        assert_eq!(snapshot.community_lists[0].list_type, CommunityListType::Expanded);
        let clist = &snapshot.community_lists[1];
        assert_eq!(clist.list_type, CommunityListType::Standard);
        assert_eq!(
            clist.rules[&10].description.as_deref(),
            Some("customer routes")
        );

        let rmap = &snapshot.route_maps[0];
        let rule = &rmap.rules[&10];
        let m = rule.r#match.as_ref().unwrap();
        assert_eq!(m.community.as_deref(), Some("CL-TEST"));
        assert_eq!(m.ip_address_prefix_list.as_deref(), Some("PL-1"));
        let set = rule.set.as_ref().unwrap();
        assert_eq!(set.as_path_prepend, Some(vec![65001, 65001]));
        assert_eq!(set.community, Some(vec![]));
        assert_eq!(set.ip_nexthop_peer, Some(true));
        assert_eq!(set.local_preference, Some(200));
        assert_eq!(set.metric, Some(0));
        assert_eq!(rmap.rules[&20].action, Action::Deny);
    }

    #[test]
    fn malformed_value_is_located() {
        let text = "policy {\n prefix-list PL {\n rule 10 {\n action permit\n prefix 10.0.0.0/33\n }\n }\n}\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(
            err,
            PolicyError::InvalidInput { ref field, .. } if field == "prefix-list PL rule 10 prefix"
        ));
    }

    #[test]
    fn replay_commands() {
        let mut lines = commands::create_prefix_list("PL-EMPTY");
        let m = Match {
            peer: Some("192.0.2.1".parse().unwrap()),
            ..Default::default()
        };
        let s = Set {
            community_add: Some(vec!["65001:1".into(), "no-export".into()]),
            ..Default::default()
        };
        let rule = RouteMapRule::new(10, Action::Permit).with_match(m).with_set(s);
        lines.extend(commands::route_map_rule("RM", &rule));
        let rule2 = RouteMapRule::new(20, Action::Deny);
        lines.extend(commands::route_map_rule("RM", &rule2));
        lines.extend(commands::delete_route_map_rule("RM", 20));

        let snapshot = parse_commands(&lines).unwrap();
        assert!(snapshot.prefix_lists[0].rules.is_empty());
        let rmap = &snapshot.route_maps[0];
        assert_eq!(rmap.rules.len(), 1);
        assert_eq!(rmap.rules[&10], rule);

        lines.extend(commands::delete_prefix_list("PL-EMPTY"));
        lines.push("delete policy route-map RM rule 10 set community".into());
        let snapshot = parse_commands(&lines).unwrap();
        assert!(snapshot.prefix_lists.is_empty());
        assert_eq!(snapshot.route_maps[0].rules[&10].set, None);
    }

    #[test]
    fn delete_leaf_without_value() {
        let base = "policy route-map RM rule 10";
        let lines = vec![
            format!("set {} action permit", base),
            format!("set {} set metric 5", base),
            format!("set {} set ip-next-hop 192.0.2.1", base),
            format!("set {} set local-preference 200", base),
            format!("delete {} set metric", base),
            format!("delete {} set ip-next-hop", base),
        ];
        let snapshot = parse_commands(&lines).unwrap();
        let set = snapshot.route_maps[0].rules[&10].set.clone().unwrap();
        assert_eq!(
            set,
            Set {
                local_preference: Some(200),
                ..Default::default()
            }
        );

        let lines = vec![
            format!("set {} action permit", base),
            format!("set {} set metric 5", base),
            format!("delete {} set metric 5", base),
        ];
        let snapshot = parse_commands(&lines).unwrap();
        assert_eq!(snapshot.route_maps[0].rules[&10].set, None);
    }
}
