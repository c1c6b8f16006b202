use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::validate::{
    check_entity_name, validate_community_list_rule, validate_prefix_list_rule,
    validate_route_map_rule,
};
use super::community::check_community;
use super::{
    CommunityList, CommunityListRule, CommunityListType, Key, PolicyError, PolicyKind,
    PolicyResult, PrefixList, PrefixListRule, Reference, RouteMap, RouteMapRule, Set,
};

/// Full copy of the three collections, as read from a device or a policy
/// document.
#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub prefix_lists: Vec<PrefixList>,
    #[serde(default)]
    pub community_lists: Vec<CommunityList>,
    #[serde(default)]
    pub route_maps: Vec<RouteMap>,
}

impl Snapshot {
    /// Carry over from `known` what the device configuration does not keep:
    /// the community-list type and an explicit `ip_nexthop_peer` false.
    pub fn reconcile(&mut self, known: &PolicyStore) {
        for clist in &mut self.community_lists {
            if let Some(prev) = known.community_list(&clist.name)
                && prev.list_type != clist.list_type
                && clist
                    .rules
                    .values()
                    .all(|rule| check_community(prev.list_type, &rule.community).is_ok())
            {
                clist.list_type = prev.list_type;
            }
        }
        for rmap in &mut self.route_maps {
            let Some(prev) = known.route_map(&rmap.name) else {
                continue;
            };
            for (seq, rule) in rmap.rules.iter_mut() {
                let peer = prev
                    .rules
                    .get(seq)
                    .and_then(|r| r.set.as_ref())
                    .and_then(|s| s.ip_nexthop_peer);
                if peer == Some(false) {
                    let set = rule.set.get_or_insert_with(Set::default);
                    set.ip_nexthop_peer.get_or_insert(false);
                }
            }
        }
    }
}

/// Canonical in-memory policy. Every mutation either succeeds completely or
/// leaves the store untouched.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct PolicyStore {
    prefix_lists: BTreeMap<String, PrefixList>,
    community_lists: BTreeMap<String, CommunityList>,
    route_maps: BTreeMap<String, RouteMap>,
}

fn remove_rule<R>(rules: &mut BTreeMap<u32, R>, key: Key) -> PolicyResult<R> {
    let sequence = key.sequence.unwrap_or_default();
    rules.remove(&sequence).ok_or(PolicyError::NotFound(key))
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot through the regular validation path.
    /// Lists are loaded before route-maps so references resolve.
    pub fn load(snapshot: Snapshot) -> PolicyResult<Self> {
        let mut store = Self::new();
        for plist in snapshot.prefix_lists {
            store.create_prefix_list(&plist.name)?;
            for rule in plist.rules.into_values() {
                store.add_prefix_list_rule(&plist.name, rule)?;
            }
        }
        for clist in snapshot.community_lists {
            store.create_community_list(&clist.name, clist.list_type)?;
            for rule in clist.rules.into_values() {
                store.add_community_list_rule(&clist.name, rule)?;
            }
        }
        for rmap in snapshot.route_maps {
            store.create_route_map(&rmap.name)?;
            for rule in rmap.rules.into_values() {
                store.add_route_map_rule(&rmap.name, rule)?;
            }
        }
        Ok(store)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            prefix_lists: self.prefix_lists.values().cloned().collect(),
            community_lists: self.community_lists.values().cloned().collect(),
            route_maps: self.route_maps.values().cloned().collect(),
        }
    }

    // Prefix-list.

    pub fn prefix_list(&self, name: &str) -> Option<&PrefixList> {
        self.prefix_lists.get(name)
    }

    pub fn prefix_lists(&self) -> impl Iterator<Item = &PrefixList> {
        self.prefix_lists.values()
    }

    pub fn create_prefix_list(&mut self, name: &str) -> PolicyResult<()> {
        check_entity_name(name)?;
        if self.prefix_lists.contains_key(name) {
            return Err(PolicyError::DuplicateKey(Key::entity(
                PolicyKind::PrefixList,
                name,
            )));
        }
        self.prefix_lists
            .insert(name.to_string(), PrefixList::new(name));
        info!("prefix-list {} created", name);
        Ok(())
    }

    pub fn delete_prefix_list(&mut self, name: &str) -> PolicyResult<PrefixList> {
        self.check_unreferenced(PolicyKind::PrefixList, name)?;
        self.purge_prefix_list(name).map(|(plist, _)| plist)
    }

    /// Delete even when referenced. The references left dangling are
    /// returned.
    pub fn purge_prefix_list(&mut self, name: &str) -> PolicyResult<(PrefixList, Vec<Reference>)> {
        let plist = self
            .prefix_lists
            .remove(name)
            .ok_or_else(|| PolicyError::NotFound(Key::entity(PolicyKind::PrefixList, name)))?;
        let dangling = self.referrers(PolicyKind::PrefixList, name);
        self.log_deleted(PolicyKind::PrefixList, name, &dangling);
        Ok((plist, dangling))
    }

    pub fn add_prefix_list_rule(&mut self, name: &str, rule: PrefixListRule) -> PolicyResult<()> {
        validate_prefix_list_rule(name, &rule, self)?;
        if let Some(plist) = self.prefix_lists.get_mut(name) {
            debug!("prefix-list {} rule {} added", name, rule.sequence);
            plist.rules.insert(rule.sequence, rule);
        }
        Ok(())
    }

    pub fn delete_prefix_list_rule(
        &mut self,
        name: &str,
        sequence: u32,
    ) -> PolicyResult<PrefixListRule> {
        let plist = self
            .prefix_lists
            .get_mut(name)
            .ok_or_else(|| PolicyError::NotFound(Key::entity(PolicyKind::PrefixList, name)))?;
        let rule = remove_rule(
            &mut plist.rules,
            Key::rule(PolicyKind::PrefixList, name, sequence),
        )?;
        debug!("prefix-list {} rule {} deleted", name, sequence);
        Ok(rule)
    }

    // Community-list.

    pub fn community_list(&self, name: &str) -> Option<&CommunityList> {
        self.community_lists.get(name)
    }

    pub fn community_lists(&self) -> impl Iterator<Item = &CommunityList> {
        self.community_lists.values()
    }

    pub fn create_community_list(
        &mut self,
        name: &str,
        list_type: CommunityListType,
    ) -> PolicyResult<()> {
        check_entity_name(name)?;
        if self.community_lists.contains_key(name) {
            return Err(PolicyError::DuplicateKey(Key::entity(
                PolicyKind::CommunityList,
                name,
            )));
        }
        self.community_lists
            .insert(name.to_string(), CommunityList::new(name, list_type));
        info!("community-list {} ({}) created", name, list_type);
        Ok(())
    }

    pub fn delete_community_list(&mut self, name: &str) -> PolicyResult<CommunityList> {
        self.check_unreferenced(PolicyKind::CommunityList, name)?;
        self.purge_community_list(name).map(|(clist, _)| clist)
    }

    pub fn purge_community_list(
        &mut self,
        name: &str,
    ) -> PolicyResult<(CommunityList, Vec<Reference>)> {
        let clist = self
            .community_lists
            .remove(name)
            .ok_or_else(|| PolicyError::NotFound(Key::entity(PolicyKind::CommunityList, name)))?;
        let dangling = self.referrers(PolicyKind::CommunityList, name);
        self.log_deleted(PolicyKind::CommunityList, name, &dangling);
        Ok((clist, dangling))
    }

    pub fn add_community_list_rule(
        &mut self,
        name: &str,
        rule: CommunityListRule,
    ) -> PolicyResult<()> {
        validate_community_list_rule(name, &rule, self)?;
        if let Some(clist) = self.community_lists.get_mut(name) {
            debug!("community-list {} rule {} added", name, rule.sequence);
            clist.rules.insert(rule.sequence, rule);
        }
        Ok(())
    }

    pub fn delete_community_list_rule(
        &mut self,
        name: &str,
        sequence: u32,
    ) -> PolicyResult<CommunityListRule> {
        let clist = self
            .community_lists
            .get_mut(name)
            .ok_or_else(|| PolicyError::NotFound(Key::entity(PolicyKind::CommunityList, name)))?;
        let rule = remove_rule(
            &mut clist.rules,
            Key::rule(PolicyKind::CommunityList, name, sequence),
        )?;
        debug!("community-list {} rule {} deleted", name, sequence);
        Ok(rule)
    }

    // Route-map.

    pub fn route_map(&self, name: &str) -> Option<&RouteMap> {
        self.route_maps.get(name)
    }

    pub fn route_maps(&self) -> impl Iterator<Item = &RouteMap> {
        self.route_maps.values()
    }

    pub fn create_route_map(&mut self, name: &str) -> PolicyResult<()> {
        check_entity_name(name)?;
        if self.route_maps.contains_key(name) {
            return Err(PolicyError::DuplicateKey(Key::entity(
                PolicyKind::RouteMap,
                name,
            )));
        }
        self.route_maps.insert(name.to_string(), RouteMap::new(name));
        info!("route-map {} created", name);
        Ok(())
    }

    pub fn delete_route_map(&mut self, name: &str) -> PolicyResult<RouteMap> {
        let rmap = self
            .route_maps
            .remove(name)
            .ok_or_else(|| PolicyError::NotFound(Key::entity(PolicyKind::RouteMap, name)))?;
        info!("route-map {} deleted", name);
        Ok(rmap)
    }

    pub fn add_route_map_rule(&mut self, name: &str, rule: RouteMapRule) -> PolicyResult<()> {
        validate_route_map_rule(name, &rule, self)?;
        if let Some(rmap) = self.route_maps.get_mut(name) {
            debug!("route-map {} rule {} added", name, rule.sequence);
            rmap.rules.insert(rule.sequence, rule);
        }
        Ok(())
    }

    pub fn delete_route_map_rule(
        &mut self,
        name: &str,
        sequence: u32,
    ) -> PolicyResult<RouteMapRule> {
        let rmap = self
            .route_maps
            .get_mut(name)
            .ok_or_else(|| PolicyError::NotFound(Key::entity(PolicyKind::RouteMap, name)))?;
        let rule = remove_rule(
            &mut rmap.rules,
            Key::rule(PolicyKind::RouteMap, name, sequence),
        )?;
        debug!("route-map {} rule {} deleted", name, sequence);
        Ok(rule)
    }

    // References.

    /// Route-map rules whose match names the list.
    pub fn referrers(&self, kind: PolicyKind, name: &str) -> Vec<Reference> {
        let mut refs = Vec::new();
        for rmap in self.route_maps.values() {
            for rule in rmap.rules.values() {
                let Some(m) = &rule.r#match else {
                    continue;
                };
                let candidates = match kind {
                    PolicyKind::PrefixList => m.prefix_list_refs(),
                    PolicyKind::CommunityList => m.community_list_refs(),
                    PolicyKind::RouteMap => Vec::new(),
                };
                for (field, list) in candidates {
                    if list == name {
                        refs.push(Reference {
                            route_map: rmap.name.clone(),
                            sequence: rule.sequence,
                            field,
                        });
                    }
                }
            }
        }
        refs
    }

    fn check_unreferenced(&self, kind: PolicyKind, name: &str) -> PolicyResult<()> {
        let referrers = self.referrers(kind, name);
        if referrers.is_empty() {
            return Ok(());
        }
        Err(PolicyError::DanglingReference {
            kind,
            name: name.to_string(),
            referrers,
        })
    }

    fn log_deleted(&self, kind: PolicyKind, name: &str, dangling: &[Reference]) {
        info!("{} {} deleted", kind, name);
        for reference in dangling {
            warn!("{} {} deleted while referenced by {}", kind, name, reference);
        }
    }

    /// Every route-map reference to a missing list, grouped by list.
    pub fn dangling(&self) -> Vec<PolicyError> {
        let mut missing: BTreeMap<(PolicyKind, String), Vec<Reference>> = BTreeMap::new();
        for rmap in self.route_maps.values() {
            for rule in rmap.rules.values() {
                let Some(m) = &rule.r#match else {
                    continue;
                };
                let prefix = m
                    .prefix_list_refs()
                    .into_iter()
                    .filter(|(_, list)| !self.prefix_lists.contains_key(*list))
                    .map(|(field, list)| (PolicyKind::PrefixList, field, list));
                let community = m
                    .community_list_refs()
                    .into_iter()
                    .filter(|(_, list)| !self.community_lists.contains_key(*list))
                    .map(|(field, list)| (PolicyKind::CommunityList, field, list));
                for (kind, field, list) in prefix.chain(community) {
                    missing
                        .entry((kind, list.to_string()))
                        .or_default()
                        .push(Reference {
                            route_map: rmap.name.clone(),
                            sequence: rule.sequence,
                            field,
                        });
                }
            }
        }
        missing
            .into_iter()
            .map(|((kind, name), referrers)| PolicyError::DanglingReference {
                kind,
                name,
                referrers,
            })
            .collect()
    }
}
