use std::collections::BTreeMap;
use std::sync::LazyLock;

use bgp_attr::{Asn, Origin};

use crate::policy::fields::Input;
use crate::policy::{PolicyError, PolicyResult, RawFields};

use super::{Match, MetricType, Set};

type Handler = fn(m: &mut Match, s: &mut Set, input: &mut Input) -> PolicyResult<()>;

/// Maps `match/...` and `set/...` field paths onto the sparse `Match` and
/// `Set`. A field lands in the output only when a non-blank value was
/// supplied; zero and `false` are values like any other.
pub struct Normalizer {
    map: BTreeMap<String, Handler>,
}

static NORMALIZER: LazyLock<Normalizer> = LazyLock::new(Normalizer::new);

pub fn normalize(fields: &RawFields) -> PolicyResult<(Match, Set)> {
    NORMALIZER.normalize(fields)
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            map: NormalizerBuilder::new().map,
        }
    }

    pub fn normalize(&self, fields: &RawFields) -> PolicyResult<(Match, Set)> {
        let mut m = Match::default();
        let mut s = Set::default();
        for (path, raw) in fields.iter() {
            let handler = self
                .map
                .get(path)
                .ok_or_else(|| PolicyError::invalid(path, "unknown field"))?;
            if raw.trim().is_empty() {
                continue;
            }
            let mut input = Input::new(path, raw);
            handler(&mut m, &mut s, &mut input)?;
        }
        Ok((m, s))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(|k| k.as_str())
    }
}

fn asns(input: &mut Input) -> PolicyResult<Vec<u32>> {
    let asns: Vec<Asn> = input.list()?;
    Ok(asns.into_iter().map(|asn| asn.0).collect())
}

// "none" clears the attribute: supplied, but empty.
fn replace_values(input: &mut Input) -> PolicyResult<Vec<String>> {
    if input.raw == "none" {
        return Ok(Vec::new());
    }
    input.list()
}

#[derive(Default)]
struct NormalizerBuilder {
    path: String,
    map: BTreeMap<String, Handler>,
}

impl NormalizerBuilder {
    fn new() -> Self {
        NormalizerBuilder::default()
            .path("match/ip_address_prefix_list")
            .field(|m, _s, input| {
                m.ip_address_prefix_list = Some(input.single()?);
                Ok(())
            })
            .path("match/ipv6_address_prefix_list")
            .field(|m, _s, input| {
                m.ipv6_address_prefix_list = Some(input.single()?);
                Ok(())
            })
            .path("match/ip_nexthop_prefix_list")
            .field(|m, _s, input| {
                m.ip_nexthop_prefix_list = Some(input.single()?);
                Ok(())
            })
            .path("match/community")
            .field(|m, _s, input| {
                m.community = Some(input.single()?);
                Ok(())
            })
            .path("match/extcommunity")
            .field(|m, _s, input| {
                m.extcommunity = Some(input.single()?);
                Ok(())
            })
            .path("match/large_community")
            .field(|m, _s, input| {
                m.large_community = Some(input.single()?);
                Ok(())
            })
            .path("match/as_path")
            .field(|m, _s, input| {
                m.as_path = Some(input.text());
                Ok(())
            })
            .path("match/local_preference")
            .field(|m, _s, input| {
                m.local_preference = Some(input.single()?);
                Ok(())
            })
            .path("match/metric")
            .field(|m, _s, input| {
                m.metric = Some(input.single()?);
                Ok(())
            })
            .path("match/tag")
            .field(|m, _s, input| {
                m.tag = Some(input.single()?);
                Ok(())
            })
            .path("match/interface")
            .field(|m, _s, input| {
                m.interface = Some(input.single()?);
                Ok(())
            })
            .path("match/ip_nexthop")
            .field(|m, _s, input| {
                m.ip_nexthop = Some(input.single()?);
                Ok(())
            })
            .path("match/ip_route_source")
            .field(|m, _s, input| {
                m.ip_route_source = Some(input.single()?);
                Ok(())
            })
            .path("match/peer")
            .field(|m, _s, input| {
                m.peer = Some(input.single()?);
                Ok(())
            })
            .path("match/origin")
            .field(|m, _s, input| {
                m.origin = Some(input.single::<Origin>()?);
                Ok(())
            })
            .path("set/local_preference")
            .field(|_m, s, input| {
                s.local_preference = Some(input.single()?);
                Ok(())
            })
            .path("set/metric")
            .field(|_m, s, input| {
                s.metric = Some(input.single()?);
                Ok(())
            })
            .path("set/metric_type")
            .field(|_m, s, input| {
                s.metric_type = Some(input.single::<MetricType>()?);
                Ok(())
            })
            .path("set/tag")
            .field(|_m, s, input| {
                s.tag = Some(input.single()?);
                Ok(())
            })
            .path("set/weight")
            .field(|_m, s, input| {
                s.weight = Some(input.single()?);
                Ok(())
            })
            .path("set/distance")
            .field(|_m, s, input| {
                s.distance = Some(input.single()?);
                Ok(())
            })
            .path("set/ip_next_hop")
            .field(|_m, s, input| {
                s.ip_next_hop = Some(input.single()?);
                Ok(())
            })
            .path("set/ip_nexthop_peer")
            .field(|_m, s, input| {
                s.ip_nexthop_peer = Some(input.flag()?);
                Ok(())
            })
            .path("set/as_path_prepend")
            .field(|_m, s, input| {
                s.as_path_prepend = Some(asns(input)?);
                Ok(())
            })
            .path("set/as_path_exclude")
            .field(|_m, s, input| {
                s.as_path_exclude = Some(asns(input)?);
                Ok(())
            })
            .path("set/as_path_replace")
            .field(|_m, s, input| {
                s.as_path_replace = Some(asns(input)?);
                Ok(())
            })
            .path("set/community")
            .field(|_m, s, input| {
                s.community = Some(replace_values(input)?);
                Ok(())
            })
            .path("set/community_add")
            .field(|_m, s, input| {
                s.community_add = Some(input.list()?);
                Ok(())
            })
            .path("set/community_delete")
            .field(|_m, s, input| {
                s.community_delete = Some(input.list()?);
                Ok(())
            })
            .path("set/extcommunity")
            .field(|_m, s, input| {
                s.extcommunity = Some(replace_values(input)?);
                Ok(())
            })
            .path("set/extcommunity_add")
            .field(|_m, s, input| {
                s.extcommunity_add = Some(input.list()?);
                Ok(())
            })
            .path("set/extcommunity_delete")
            .field(|_m, s, input| {
                s.extcommunity_delete = Some(input.list()?);
                Ok(())
            })
            .path("set/large_community")
            .field(|_m, s, input| {
                s.large_community = Some(replace_values(input)?);
                Ok(())
            })
            .path("set/large_community_add")
            .field(|_m, s, input| {
                s.large_community_add = Some(input.list()?);
                Ok(())
            })
            .path("set/large_community_delete")
            .field(|_m, s, input| {
                s.large_community_delete = Some(input.list()?);
                Ok(())
            })
            .path("set/src")
            .field(|_m, s, input| {
                s.src = Some(input.single()?);
                Ok(())
            })
            .path("set/origin")
            .field(|_m, s, input| {
                s.origin = Some(input.single::<Origin>()?);
                Ok(())
            })
    }

    fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    fn field(mut self, func: Handler) -> Self {
        self.map.insert(self.path.clone(), func);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_metric_is_kept() {
        let fields = RawFields::new().with("set/metric", "0");
        let (m, s) = normalize(&fields).unwrap();
        assert!(m.is_empty());
        assert_eq!(s.metric, Some(0));

        let fields = RawFields::new()
            .with("match/metric", "0")
            .with("set/local_preference", "0");
        let (m, s) = normalize(&fields).unwrap();
        assert_eq!(m.metric, Some(0));
        assert_eq!(s.local_preference, Some(0));
    }

    #[test]
    fn blank_is_absent() {
        let fields = RawFields::new()
            .with("set/metric", "")
            .with("set/community", "  ")
            .with("match/as_path", "");
        let (m, s) = normalize(&fields).unwrap();
        assert!(m.is_empty());
        assert!(s.is_empty());
    }

    #[test]
    fn nexthop_peer_three_valued() {
        let (_, s) = normalize(&RawFields::new()).unwrap();
        assert_eq!(s.ip_nexthop_peer, None);

        let (_, s) = normalize(&RawFields::new().with("set/ip_nexthop_peer", "false")).unwrap();
        assert_eq!(s.ip_nexthop_peer, Some(false));

        let (_, s) = normalize(&RawFields::new().with("set/ip_nexthop_peer", "true")).unwrap();
        assert_eq!(s.ip_nexthop_peer, Some(true));

        assert!(normalize(&RawFields::new().with("set/ip_nexthop_peer", "maybe")).is_err());
    }

    #[test]
    fn prepend_order_and_duplicates() {
        let fields = RawFields::new().with("set/as_path_prepend", "65001, 65001  65002");
        let (_, s) = normalize(&fields).unwrap();
        assert_eq!(s.as_path_prepend, Some(vec![65001, 65001, 65002]));
    }

    #[test]
    fn community_values() {
        let fields = RawFields::new()
            .with("set/community_add", "65001:100,no-export")
            .with("set/large_community", "none");
        let (_, s) = normalize(&fields).unwrap();
        assert_eq!(
            s.community_add,
            Some(vec!["65001:100".to_string(), "no-export".to_string()])
        );
        assert_eq!(s.large_community, Some(vec![]));
        assert_eq!(s.community, None);
    }

    #[test]
    fn as_path_pattern_kept_verbatim() {
        let fields = RawFields::new().with("match/as_path", " _6500[0-9]{1,2}_ ");
        let (m, _) = normalize(&fields).unwrap();
        assert_eq!(m.as_path.as_deref(), Some("_6500[0-9]{1,2}_"));
    }

    #[test]
    fn errors_name_the_field() {
        let err = normalize(&RawFields::new().with("set/weight", "heavy")).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidInput { ref field, .. } if field == "set/weight"));

        let err = normalize(&RawFields::new().with("set/colour", "red")).unwrap_err();
        assert_eq!(err, PolicyError::invalid("set/colour", "unknown field"));

        let err = normalize(&RawFields::new().with("match/peer", "10.0.0.1 10.0.0.2")).unwrap_err();
        assert_eq!(err, PolicyError::invalid("match/peer", "expects a single value"));
    }

    #[test]
    fn typed_values() {
        let fields = RawFields::new()
            .with("set/metric_type", "type-2")
            .with("set/origin", "incomplete")
            .with("set/ip_next_hop", "2001:db8::1")
            .with("match/origin", "igp");
        let (m, s) = normalize(&fields).unwrap();
        assert_eq!(s.metric_type, Some(MetricType::Type2));
        assert_eq!(s.origin, Some(Origin::Incomplete));
        assert_eq!(s.ip_next_hop, Some("2001:db8::1".parse().unwrap()));
        assert_eq!(m.origin, Some(Origin::Igp));
    }

    #[test]
    fn every_sparse_field_has_a_path() {
        let normalizer = Normalizer::new();
        assert_eq!(normalizer.paths().filter(|p| p.starts_with("match/")).count(), 15);
        assert_eq!(normalizer.paths().filter(|p| p.starts_with("set/")).count(), 22);
    }
}
