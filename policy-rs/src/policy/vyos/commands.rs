// Configuration mode commands for each policy mutation.

use serde_json::Value;

use crate::policy::route_map::{supplied, value_text};
use crate::policy::{
    CommunityListRule, PrefixListRule, RouteMapRule, Snapshot,
};

use super::{device_flag, device_path, quote};

fn set(path: String) -> String {
    format!("set policy {}", path)
}

fn delete(path: String) -> String {
    format!("delete policy {}", path)
}

// The device has no empty list node. A placeholder rule is set and removed
// in the same commit, which leaves the named node behind.
fn create(kind: &str, name: &str) -> Vec<String> {
    let base = format!("{} {} rule 10", kind, name);
    vec![set(format!("{} action permit", base)), delete(base)]
}

pub fn create_prefix_list(name: &str) -> Vec<String> {
    create("prefix-list", name)
}

pub fn create_community_list(name: &str) -> Vec<String> {
    create("community-list", name)
}

pub fn create_route_map(name: &str) -> Vec<String> {
    create("route-map", name)
}

pub fn delete_prefix_list(name: &str) -> Vec<String> {
    vec![delete(format!("prefix-list {}", name))]
}

pub fn delete_community_list(name: &str) -> Vec<String> {
    vec![delete(format!("community-list {}", name))]
}

pub fn delete_route_map(name: &str) -> Vec<String> {
    vec![delete(format!("route-map {}", name))]
}

pub fn delete_prefix_list_rule(name: &str, sequence: u32) -> Vec<String> {
    vec![delete(format!("prefix-list {} rule {}", name, sequence))]
}

pub fn delete_community_list_rule(name: &str, sequence: u32) -> Vec<String> {
    vec![delete(format!("community-list {} rule {}", name, sequence))]
}

pub fn delete_route_map_rule(name: &str, sequence: u32) -> Vec<String> {
    vec![delete(format!("route-map {} rule {}", name, sequence))]
}

pub fn prefix_list_rule(name: &str, rule: &PrefixListRule) -> Vec<String> {
    let base = format!("prefix-list {} rule {}", name, rule.sequence);
    let mut cmds = vec![
        set(format!("{} action {}", base, rule.action)),
        set(format!("{} prefix {}", base, rule.prefix)),
    ];
    if let Some(ge) = rule.ge {
        cmds.push(set(format!("{} ge {}", base, ge)));
    }
    if let Some(le) = rule.le {
        cmds.push(set(format!("{} le {}", base, le)));
    }
    if let Some(desc) = &rule.description {
        cmds.push(set(format!("{} description {}", base, quote(desc))));
    }
    cmds
}

pub fn community_list_rule(name: &str, rule: &CommunityListRule) -> Vec<String> {
    let base = format!("community-list {} rule {}", name, rule.sequence);
    let mut cmds = vec![
        set(format!("{} action {}", base, rule.action)),
        set(format!("{} community {}", base, quote(&rule.community))),
    ];
    if let Some(desc) = &rule.description {
        cmds.push(set(format!("{} description {}", base, quote(desc))));
    }
    cmds
}

// One command per supplied field of a match or set.
fn sparse(base: &str, section: &str, fields: Vec<(String, Value)>, cmds: &mut Vec<String>) {
    for (key, val) in fields {
        let field = format!("{}/{}", section, key);
        let raw = match &val {
            Value::Bool(true) => "true".to_string(),
            Value::Bool(false) => continue,
            Value::Array(vals) if vals.is_empty() => "none".to_string(),
            val => value_text(val),
        };
        if let Some(flag) = device_flag(&field, &raw) {
            cmds.push(set(format!("{} {}", base, flag)));
            continue;
        }
        let v6 = raw.contains(':') && raw.parse::<std::net::Ipv6Addr>().is_ok();
        if let Some(path) = device_path(&field, v6) {
            cmds.push(set(format!("{} {} {}", base, path, quote(&raw))));
        }
    }
}

pub fn route_map_rule(name: &str, rule: &RouteMapRule) -> Vec<String> {
    let base = format!("route-map {} rule {}", name, rule.sequence);
    let mut cmds = vec![set(format!("{} action {}", base, rule.action))];
    if let Some(desc) = &rule.description {
        cmds.push(set(format!("{} description {}", base, quote(desc))));
    }
    if let Some(m) = &rule.r#match {
        sparse(&base, "match", supplied(m), &mut cmds);
    }
    if let Some(s) = &rule.set {
        sparse(&base, "set", supplied(s), &mut cmds);
    }
    cmds
}

/// Commands building the whole snapshot from an empty `policy` node, lists
/// before route-maps.
pub fn snapshot(snapshot: &Snapshot) -> Vec<String> {
    let mut cmds = Vec::new();
    for plist in &snapshot.prefix_lists {
        if plist.rules.is_empty() {
            cmds.extend(create_prefix_list(&plist.name));
        }
        for rule in plist.rules.values() {
            cmds.extend(prefix_list_rule(&plist.name, rule));
        }
    }
    for clist in &snapshot.community_lists {
        if clist.rules.is_empty() {
            cmds.extend(create_community_list(&clist.name));
        }
        for rule in clist.rules.values() {
            cmds.extend(community_list_rule(&clist.name, rule));
        }
    }
    for rmap in &snapshot.route_maps {
        if rmap.rules.is_empty() {
            cmds.extend(create_route_map(&rmap.name));
        }
        for rule in rmap.rules.values() {
            cmds.extend(route_map_rule(&rmap.name, rule));
        }
    }
    cmds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Action, Match, Set};

    #[test]
    fn prefix_list_commands() {
        let rule = PrefixListRule::new(10, Action::Permit, "10.0.0.0/8".parse().unwrap()).le(24);
        assert_eq!(
            prefix_list_rule("PL-1", &rule),
            vec![
                "set policy prefix-list PL-1 rule 10 action permit",
                "set policy prefix-list PL-1 rule 10 prefix 10.0.0.0/8",
                "set policy prefix-list PL-1 rule 10 le 24",
            ]
        );
        assert_eq!(
            delete_community_list_rule("CL-1", 10),
            vec!["delete policy community-list CL-1 rule 10"]
        );
        assert_eq!(
            create_route_map("RM-1"),
            vec![
                "set policy route-map RM-1 rule 10 action permit",
                "delete policy route-map RM-1 rule 10",
            ]
        );
    }

    #[test]
    fn route_map_commands() {
        let m = Match {
            community: Some("CL-TEST".into()),
            metric: Some(0),
            ..Default::default()
        };
        let s = Set {
            local_preference: Some(200),
            ip_nexthop_peer: Some(true),
            as_path_prepend: Some(vec![65001, 65001]),
            large_community: Some(vec![]),
            ..Default::default()
        };
        let mut rule = RouteMapRule::new(10, Action::Permit).with_match(m).with_set(s);
        rule.description = Some("from customer".into());
        assert_eq!(
            route_map_rule("RM-TEST", &rule),
            vec![
                "set policy route-map RM-TEST rule 10 action permit",
                "set policy route-map RM-TEST rule 10 description 'from customer'",
                "set policy route-map RM-TEST rule 10 match community community-list CL-TEST",
                "set policy route-map RM-TEST rule 10 match metric 0",
                "set policy route-map RM-TEST rule 10 set local-preference 200",
                "set policy route-map RM-TEST rule 10 set ip-next-hop peer-address",
                "set policy route-map RM-TEST rule 10 set as-path prepend '65001 65001'",
                "set policy route-map RM-TEST rule 10 set large-community none",
            ]
        );
    }

    #[test]
    fn nexthop_family() {
        let s = Set {
            ip_next_hop: Some("2001:db8::1".parse().unwrap()),
            ip_nexthop_peer: Some(false),
            ..Default::default()
        };
        let rule = RouteMapRule::new(20, Action::Deny).with_set(s);
        assert_eq!(
            route_map_rule("RM", &rule),
            vec![
                "set policy route-map RM rule 20 action deny",
                "set policy route-map RM rule 20 set ipv6-next-hop global 2001:db8::1",
            ]
        );
    }
}
