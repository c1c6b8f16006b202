// Rule validation. Checks run in a fixed order and stop at the first
// failure:
//
//   1. sequence range and uniqueness within the target list
//   2. required fields
//   3. value ranges and syntax
//   4. references to other lists
//   5. conflicting set operations
//
// Nothing here mutates the store.

use std::ops::RangeInclusive;
use std::str::FromStr;

use bgp_attr::{CommunityValue, ExtCommunityValue, LargeCommunityValue};
use ipnet::IpNet;

use super::community::check_community;
use super::regex::regcomp;
use super::{
    CommunityFamily, CommunityListRule, Key, Match, PolicyError, PolicyKind, PolicyResult,
    PolicyStore, PrefixListRule, Reference, RouteMapRule, Set,
};

pub const PREFIX_LIST_SEQ: RangeInclusive<u32> = 1..=9999;
pub const COMMUNITY_LIST_SEQ: RangeInclusive<u32> = 1..=65535;
pub const ROUTE_MAP_SEQ: RangeInclusive<u32> = 1..=65535;

const WEIGHT: RangeInclusive<u32> = 0..=65535;
const DISTANCE: RangeInclusive<u32> = 1..=255;
const TAG: RangeInclusive<u32> = 1..=65535;

fn check_name(field: &str, name: &str) -> PolicyResult<()> {
    if name.trim().is_empty() {
        return Err(PolicyError::invalid(field, "name must not be empty"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(PolicyError::invalid(field, "name must not contain spaces"));
    }
    Ok(())
}

/// Name of a new list or route-map.
pub fn check_entity_name(name: &str) -> PolicyResult<()> {
    check_name("name", name)
}

fn check_range(field: &str, val: u32, range: &RangeInclusive<u32>) -> PolicyResult<()> {
    if range.contains(&val) {
        Ok(())
    } else {
        Err(PolicyError::invalid(
            field,
            format!("{} out of range {}-{}", val, range.start(), range.end()),
        ))
    }
}

fn check_sequence<R>(
    key: Key,
    range: &RangeInclusive<u32>,
    existing: Option<&R>,
) -> PolicyResult<()> {
    let sequence = key.sequence.unwrap_or_default();
    check_range("sequence", sequence, range)?;
    if existing.is_some() {
        return Err(PolicyError::DuplicateKey(key));
    }
    Ok(())
}

fn check_description(description: &Option<String>) -> PolicyResult<()> {
    if let Some(desc) = description
        && desc.contains(['"', '\n'])
    {
        return Err(PolicyError::invalid(
            "description",
            "must not contain quotes or newlines",
        ));
    }
    Ok(())
}

pub fn validate_prefix_list_rule(
    name: &str,
    rule: &PrefixListRule,
    store: &PolicyStore,
) -> PolicyResult<()> {
    let plist = store
        .prefix_list(name)
        .ok_or_else(|| PolicyError::NotFound(Key::entity(PolicyKind::PrefixList, name)))?;

    // 1.
    check_sequence(
        Key::rule(PolicyKind::PrefixList, name, rule.sequence),
        &PREFIX_LIST_SEQ,
        plist.rules.get(&rule.sequence),
    )?;

    // 2. action and prefix are carried by the type.

    // 3.
    check_prefix_bounds(rule.prefix, rule.ge, rule.le)?;
    check_description(&rule.description)
}

pub fn check_prefix_bounds(prefix: IpNet, ge: Option<u8>, le: Option<u8>) -> PolicyResult<()> {
    if prefix != prefix.trunc() {
        return Err(PolicyError::invalid(
            "prefix",
            format!("{} has host bits set, use {}", prefix, prefix.trunc()),
        ));
    }
    let plen = prefix.prefix_len();
    let max_len = prefix.max_prefix_len();
    for (field, val) in [("ge", ge), ("le", le)] {
        let Some(val) = val else {
            continue;
        };
        if val > max_len {
            return Err(PolicyError::invalid(
                field,
                format!("{} out of range 0-{}", val, max_len),
            ));
        }
        if val < plen {
            return Err(PolicyError::invalid(
                field,
                format!("{} is shorter than prefix length {}", val, plen),
            ));
        }
    }
    if let (Some(ge), Some(le)) = (ge, le)
        && ge > le
    {
        return Err(PolicyError::invalid(
            "ge",
            format!("ge {} is greater than le {}", ge, le),
        ));
    }
    Ok(())
}

pub fn validate_community_list_rule(
    name: &str,
    rule: &CommunityListRule,
    store: &PolicyStore,
) -> PolicyResult<()> {
    let clist = store
        .community_list(name)
        .ok_or_else(|| PolicyError::NotFound(Key::entity(PolicyKind::CommunityList, name)))?;

    // 1.
    check_sequence(
        Key::rule(PolicyKind::CommunityList, name, rule.sequence),
        &COMMUNITY_LIST_SEQ,
        clist.rules.get(&rule.sequence),
    )?;

    // 2. and 3.
    check_community(clist.list_type, &rule.community)?;
    check_description(&rule.description)
}

pub fn validate_route_map_rule(
    name: &str,
    rule: &RouteMapRule,
    store: &PolicyStore,
) -> PolicyResult<()> {
    let rmap = store
        .route_map(name)
        .ok_or_else(|| PolicyError::NotFound(Key::entity(PolicyKind::RouteMap, name)))?;

    // 1.
    check_sequence(
        Key::rule(PolicyKind::RouteMap, name, rule.sequence),
        &ROUTE_MAP_SEQ,
        rmap.rules.get(&rule.sequence),
    )?;

    // 2.
    if let Some(m) = &rule.r#match {
        check_match_required(m)?;
    }
    if let Some(s) = &rule.set {
        check_set_required(s)?;
    }

    // 3.
    check_description(&rule.description)?;
    if let Some(m) = &rule.r#match {
        check_match_values(m)?;
    }
    if let Some(s) = &rule.set {
        check_set_values(s)?;
    }

    // 4.
    if let Some(m) = &rule.r#match {
        check_match_refs(name, rule.sequence, m, store)?;
    }

    // 5.
    if let Some(s) = &rule.set {
        check_set_conflicts(s)?;
    }
    Ok(())
}

fn check_match_required(m: &Match) -> PolicyResult<()> {
    for (field, list) in m.prefix_list_refs().into_iter().chain(m.community_list_refs()) {
        check_name(&format!("match/{}", field), list)?;
    }
    if let Some(interface) = &m.interface {
        check_name("match/interface", interface)?;
    }
    if let Some(as_path) = &m.as_path
        && as_path.trim().is_empty()
    {
        return Err(PolicyError::invalid("match/as_path", "required"));
    }
    Ok(())
}

fn check_set_required(s: &Set) -> PolicyResult<()> {
    let incremental = [
        ("set/as_path_prepend", s.as_path_prepend.as_ref().map(Vec::len)),
        ("set/as_path_exclude", s.as_path_exclude.as_ref().map(Vec::len)),
        ("set/as_path_replace", s.as_path_replace.as_ref().map(Vec::len)),
    ];
    for (field, len) in incremental {
        if len == Some(0) {
            return Err(PolicyError::invalid(field, "at least one AS number required"));
        }
    }
    // An empty replace-set clears the attribute, add and delete need values.
    for ops in s.community_ops() {
        for (op, vals) in [("add", ops.add), ("delete", ops.delete)] {
            if vals.is_some_and(|v| v.is_empty()) {
                return Err(PolicyError::invalid(
                    format!("set/{}_{}", ops.family, op),
                    "at least one value required",
                ));
            }
        }
    }
    Ok(())
}

fn check_match_values(m: &Match) -> PolicyResult<()> {
    if let Some(as_path) = &m.as_path {
        regcomp(as_path).map_err(|e| {
            PolicyError::invalid("match/as_path", format!("invalid expression: {}", e))
        })?;
    }
    if let Some(tag) = m.tag {
        check_range("match/tag", tag, &TAG)?;
    }
    Ok(())
}

fn check_values<T: FromStr>(field: &str, vals: Option<&Vec<String>>) -> PolicyResult<()> {
    for val in vals.into_iter().flatten() {
        if val.parse::<T>().is_err() {
            return Err(PolicyError::invalid(
                field,
                format!("malformed value '{}'", val),
            ));
        }
    }
    Ok(())
}

fn check_set_values(s: &Set) -> PolicyResult<()> {
    if let Some(weight) = s.weight {
        check_range("set/weight", weight, &WEIGHT)?;
    }
    if let Some(distance) = s.distance {
        check_range("set/distance", distance, &DISTANCE)?;
    }
    if let Some(tag) = s.tag {
        check_range("set/tag", tag, &TAG)?;
    }
    for ops in s.community_ops() {
        let check = match ops.family {
            CommunityFamily::Standard => check_values::<CommunityValue>,
            CommunityFamily::Extended => check_values::<ExtCommunityValue>,
            CommunityFamily::Large => check_values::<LargeCommunityValue>,
        };
        check(&format!("set/{}", ops.family), ops.replace)?;
        check(&format!("set/{}_add", ops.family), ops.add)?;
        check(&format!("set/{}_delete", ops.family), ops.delete)?;
    }
    Ok(())
}

fn check_match_refs(name: &str, sequence: u32, m: &Match, store: &PolicyStore) -> PolicyResult<()> {
    let reference = |field| Reference {
        route_map: name.to_string(),
        sequence,
        field,
    };
    for (field, list) in m.prefix_list_refs() {
        if store.prefix_list(list).is_none() {
            return Err(PolicyError::DanglingReference {
                kind: PolicyKind::PrefixList,
                name: list.to_string(),
                referrers: vec![reference(field)],
            });
        }
    }
    for (field, list) in m.community_list_refs() {
        if store.community_list(list).is_none() {
            return Err(PolicyError::DanglingReference {
                kind: PolicyKind::CommunityList,
                name: list.to_string(),
                referrers: vec![reference(field)],
            });
        }
    }
    Ok(())
}

fn check_set_conflicts(s: &Set) -> PolicyResult<()> {
    for ops in s.community_ops() {
        if ops.replace.is_some() && (ops.add.is_some() || ops.delete.is_some()) {
            return Err(PolicyError::conflict(
                format!("set/{}", ops.family),
                "replace cannot be combined with add or delete",
            ));
        }
    }
    if s.ip_next_hop.is_some() && s.ip_nexthop_peer == Some(true) {
        return Err(PolicyError::conflict(
            "set/ip_next_hop",
            "explicit next-hop cannot be combined with peer address",
        ));
    }
    Ok(())
}
