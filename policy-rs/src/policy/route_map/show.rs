use anyhow::{Context, Error};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt::Write;

use crate::policy::{Args, PolicyError, PolicyStore};

use super::{RouteMap, supplied, value_text};

fn entries<T: Serialize>(val: &T) -> Vec<(String, String)> {
    supplied(val)
        .into_iter()
        .map(|(key, val)| {
            let text = match &val {
                Value::Array(vals) if vals.is_empty() => "none".to_string(),
                val => value_text(val),
            };
            (key.replace('_', "-"), text)
        })
        .collect()
}

fn render(buf: &mut String, rmap: &RouteMap) -> Result<(), Error> {
    writeln!(buf, "route-map {}", rmap.name)?;
    for rule in rmap.rules.values() {
        writeln!(buf, "  rule {} {}", rule.sequence, rule.action)?;
        if let Some(desc) = &rule.description {
            writeln!(buf, "    description \"{}\"", desc)?;
        }
        if let Some(m) = &rule.r#match {
            for (key, val) in entries(m) {
                writeln!(buf, "    match {} {}", key, val)?;
            }
        }
        if let Some(s) = &rule.set {
            for (key, val) in entries(s) {
                writeln!(buf, "    set {} {}", key, val)?;
            }
        }
    }
    Ok(())
}

// Show all route-maps, or the one named in args.
pub fn route_map(store: &PolicyStore, mut args: Args, json: bool) -> Result<String, Error> {
    let rmaps: Vec<&RouteMap> = match args.string() {
        Some(name) => vec![
            store
                .route_map(&name)
                .context(format!("route-map '{}' not found", name))?,
        ],
        None => store.route_maps().collect(),
    };

    if json {
        return Ok(serde_json::to_string_pretty(&rmaps)?);
    }

    let mut buf = String::new();
    for rmap in rmaps {
        render(&mut buf, rmap)?;
    }
    Ok(buf)
}

// Route-map rules pointing at lists which no longer exist.
pub fn dangling(store: &PolicyStore, _args: Args, json: bool) -> Result<String, Error> {
    if json {
        let missing: Vec<Value> = store
            .dangling()
            .into_iter()
            .filter_map(|err| match err {
                PolicyError::DanglingReference {
                    kind,
                    name,
                    referrers,
                } => Some(json!({
                    "kind": kind.to_string(),
                    "name": name,
                    "referrers": referrers,
                })),
                _ => None,
            })
            .collect();
        return Ok(serde_json::to_string_pretty(&missing)?);
    }

    let mut buf = String::new();
    for err in store.dangling() {
        writeln!(buf, "{}", err)?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Action, Match, RouteMapRule, Set};

    #[test]
    fn text() {
        let mut store = PolicyStore::new();
        store.create_route_map("RM-1").unwrap();
        let m = Match {
            metric: Some(0),
            ..Default::default()
        };
        let s = Set {
            as_path_prepend: Some(vec![65001, 65001]),
            community: Some(vec![]),
            ip_nexthop_peer: Some(false),
            ..Default::default()
        };
        let rule = RouteMapRule::new(10, Action::Permit).with_match(m).with_set(s);
        store.add_route_map_rule("RM-1", rule).unwrap();

        let out = route_map(&store, Args::default(), false).unwrap();
        assert_eq!(
            out,
            "route-map RM-1\n  rule 10 permit\n    match metric 0\n    \
             set ip-nexthop-peer false\n    set as-path-prepend 65001 65001\n    \
             set community none\n"
        );
    }

    #[test]
    fn dangling_json() {
        let mut store = PolicyStore::new();
        store.create_prefix_list("PL-1").unwrap();
        store.create_route_map("RM-1").unwrap();
        let m = Match {
            ip_address_prefix_list: Some("PL-1".into()),
            ..Default::default()
        };
        let rule = RouteMapRule::new(10, Action::Permit).with_match(m);
        store.add_route_map_rule("RM-1", rule).unwrap();
        store.purge_prefix_list("PL-1").unwrap();

        let out = dangling(&store, Args::default(), true).unwrap();
        let val: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(val[0]["kind"], "prefix-list");
        assert_eq!(val[0]["name"], "PL-1");
        assert_eq!(val[0]["referrers"][0]["route_map"], "RM-1");
        assert_eq!(val[0]["referrers"][0]["sequence"], 10);

        let out = dangling(&store, Args::default(), false).unwrap();
        assert!(out.starts_with("dangling reference to prefix-list PL-1 from route-map RM-1"));
    }
}
