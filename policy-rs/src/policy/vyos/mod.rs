// VyOS style device configuration. Policy lives under the `policy` node:
//
// policy {
//     prefix-list PL-1 {
//         rule 10 {
//             action permit
//             prefix 10.0.0.0/8
//             le 24
//         }
//     }
//     route-map RM-1 {
//         rule 10 {
//             action permit
//             match {
//                 community {
//                     community-list CL-1
//                 }
//             }
//             set {
//                 as-path {
//                     prepend "65001 65001"
//                 }
//             }
//         }
//     }
// }

pub mod commands;
pub mod showcfg;

/// Route-map rule field and its node path below `rule N`.
const ROUTE_MAP_PATHS: [(&str, &str); 36] = [
    ("match/ip_address_prefix_list", "match ip address prefix-list"),
    ("match/ipv6_address_prefix_list", "match ipv6 address prefix-list"),
    ("match/ip_nexthop_prefix_list", "match ip nexthop prefix-list"),
    ("match/community", "match community community-list"),
    ("match/extcommunity", "match extcommunity"),
    ("match/large_community", "match large-community large-community-list"),
    ("match/as_path", "match as-path"),
    ("match/local_preference", "match local-preference"),
    ("match/metric", "match metric"),
    ("match/tag", "match tag"),
    ("match/interface", "match interface"),
    ("match/ip_nexthop", "match ip nexthop address"),
    ("match/ip_route_source", "match ip route-source address"),
    ("match/peer", "match peer"),
    ("match/origin", "match origin"),
    ("set/local_preference", "set local-preference"),
    ("set/metric", "set metric"),
    ("set/metric_type", "set metric-type"),
    ("set/tag", "set tag"),
    ("set/weight", "set weight"),
    ("set/distance", "set distance"),
    ("set/ip_next_hop", "set ip-next-hop"),
    ("set/as_path_prepend", "set as-path prepend"),
    ("set/as_path_exclude", "set as-path exclude"),
    ("set/as_path_replace", "set as-path replace"),
    ("set/community", "set community replace"),
    ("set/community_add", "set community add"),
    ("set/community_delete", "set community delete"),
    ("set/extcommunity", "set extcommunity replace"),
    ("set/extcommunity_add", "set extcommunity add"),
    ("set/extcommunity_delete", "set extcommunity delete"),
    ("set/large_community", "set large-community replace"),
    ("set/large_community_add", "set large-community add"),
    ("set/large_community_delete", "set large-community delete"),
    ("set/src", "set src"),
    ("set/origin", "set origin"),
];

// IPv6 addresses live under their own nodes.
const ROUTE_MAP_PATHS_V6: [(&str, &str); 2] = [
    ("match/ip_nexthop", "match ipv6 nexthop address"),
    ("set/ip_next_hop", "set ipv6-next-hop global"),
];

// Value-less nodes and the raw value they stand for.
const ROUTE_MAP_FLAGS: [(&str, &str, &str); 4] = [
    ("set/ip_nexthop_peer", "set ip-next-hop peer-address", "true"),
    ("set/community", "set community none", "none"),
    ("set/extcommunity", "set extcommunity none", "none"),
    ("set/large_community", "set large-community none", "none"),
];

fn all_paths() -> impl Iterator<Item = (&'static str, &'static str)> {
    ROUTE_MAP_PATHS.into_iter().chain(ROUTE_MAP_PATHS_V6)
}

/// Node path of a route-map field. `v6` selects the IPv6 variant where
/// one exists.
pub(crate) fn device_path(field: &str, v6: bool) -> Option<&'static str> {
    if v6
        && let Some((_, path)) = ROUTE_MAP_PATHS_V6.iter().find(|(f, _)| *f == field)
    {
        return Some(*path);
    }
    ROUTE_MAP_PATHS
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, path)| *path)
}

/// Value-less node standing for `raw` in `field`.
pub(crate) fn device_flag(field: &str, raw: &str) -> Option<&'static str> {
    ROUTE_MAP_FLAGS
        .iter()
        .find(|(f, _, r)| *f == field && *r == raw)
        .map(|(_, path, _)| *path)
}

fn starts_with(leaf: &[String], path: &str) -> bool {
    let words: Vec<&str> = path.split(' ').collect();
    leaf.len() >= words.len() && leaf.iter().zip(&words).all(|(a, b)| a == b)
}

/// Field and raw value of a leaf below `rule N`.
pub(crate) fn route_map_field(leaf: &[String]) -> Option<(&'static str, String)> {
    for (field, path, raw) in ROUTE_MAP_FLAGS {
        if starts_with(leaf, path) && leaf.len() == path.split(' ').count() {
            return Some((field, raw.to_string()));
        }
    }
    for (field, path) in all_paths() {
        let len = path.split(' ').count();
        if starts_with(leaf, path) && leaf.len() > len {
            return Some((field, leaf[len..].join(" ")));
        }
    }
    None
}

/// Fields removed by deleting `leaf`: the field the leaf belongs to, or
/// every field below it when the leaf is an intermediate node.
pub(crate) fn route_map_fields_under(leaf: &[String]) -> Vec<&'static str> {
    if let Some((field, _)) = route_map_field(leaf) {
        return vec![field];
    }
    let flags = ROUTE_MAP_FLAGS.iter().map(|(field, path, _)| (*field, *path));
    let mut fields: Vec<&'static str> = Vec::new();
    for (field, path) in all_paths().chain(flags) {
        if starts_with(&path.split(' ').map(String::from).collect::<Vec<_>>(), &leaf.join(" "))
            && !fields.contains(&field)
        {
            fields.push(field);
        }
    }
    fields
}

/// True when the leaf is an intermediate node such as `match community`.
pub(crate) fn route_map_container(leaf: &[String]) -> bool {
    let flags = ROUTE_MAP_FLAGS.iter().map(|(_, path, _)| *path);
    all_paths().map(|(_, path)| path).chain(flags).any(|path| {
        leaf.len() < path.split(' ').count() && path.split(' ').zip(leaf).all(|(a, b)| a == b)
    })
}

/// Split a line into words. Single or double quotes group words and are
/// removed.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut quote: Option<char> = None;
    let mut quoted = false;
    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => word.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                quoted = true;
            }
            None if c.is_whitespace() => {
                if !word.is_empty() || quoted {
                    words.push(std::mem::take(&mut word));
                }
                quoted = false;
            }
            None => word.push(c),
        }
    }
    if !word.is_empty() || quoted {
        words.push(word);
    }
    words
}

/// Quote a value when the device would otherwise split or interpret it.
pub fn quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '.' | '/' | '-' | '_'));
    if plain {
        value.to_string()
    } else if value.contains('\'') {
        format!("\"{}\"", value)
    } else {
        format!("'{}'", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        tokenize(s)
    }

    #[test]
    fn tokenize_quotes() {
        assert_eq!(
            words("set as-path prepend '65001 65001'"),
            vec!["set", "as-path", "prepend", "65001 65001"]
        );
        assert_eq!(
            words(r#"description "two words" "#),
            vec!["description", "two words"]
        );
        assert_eq!(words("regex ''"), vec!["regex", ""]);
    }

    #[test]
    fn quote_values() {
        assert_eq!(quote("65001:100"), "65001:100");
        assert_eq!(quote("65001 65002"), "'65001 65002'");
        assert_eq!(quote("^65001_"), "'^65001_'");
        assert_eq!(quote("it's"), "\"it's\"");
    }

    #[test]
    fn field_lookup() {
        assert_eq!(
            route_map_field(&words("match community community-list CL-1")),
            Some(("match/community", "CL-1".to_string()))
        );
        assert_eq!(
            route_map_field(&words("set ip-next-hop peer-address")),
            Some(("set/ip_nexthop_peer", "true".to_string()))
        );
        assert_eq!(
            route_map_field(&words("set ipv6-next-hop global 2001:db8::1")),
            Some(("set/ip_next_hop", "2001:db8::1".to_string()))
        );
        assert_eq!(
            route_map_field(&words("set origin igp")),
            Some(("set/origin", "igp".to_string()))
        );
        assert_eq!(route_map_field(&words("set community")), None);
        assert!(route_map_container(&words("match community")));
        assert!(route_map_container(&words("set")));
        assert!(!route_map_container(&words("call RM-OTHER")));
    }

    #[test]
    fn fields_under_leaf() {
        assert_eq!(route_map_fields_under(&words("set metric")), vec!["set/metric"]);
        assert_eq!(route_map_fields_under(&words("set metric 5")), vec!["set/metric"]);
        assert_eq!(
            route_map_fields_under(&words("set ip-next-hop peer-address")),
            vec!["set/ip_nexthop_peer"]
        );
        assert_eq!(
            route_map_fields_under(&words("set community")),
            vec!["set/community", "set/community_add", "set/community_delete"]
        );
        assert_eq!(
            route_map_fields_under(&words("match ipv6")),
            vec!["match/ipv6_address_prefix_list", "match/ip_nexthop"]
        );
        assert_eq!(
            route_map_fields_under(&words("set ip-next-hop")),
            vec!["set/ip_next_hop", "set/ip_nexthop_peer"]
        );
        assert!(route_map_fields_under(&words("call RM-OTHER")).is_empty());
    }

    #[test]
    fn every_path_has_a_field() {
        assert_eq!(device_path("set/metric", false), Some("set metric"));
        assert_eq!(device_path("set/ip_next_hop", true), Some("set ipv6-next-hop global"));
        assert_eq!(device_path("set/origin", true), Some("set origin"));
        assert_eq!(device_flag("set/community", "none"), Some("set community none"));
    }
}
