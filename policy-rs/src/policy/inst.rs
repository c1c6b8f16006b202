use std::collections::HashMap;
use std::fmt;

use anyhow::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{info, warn};

use super::{
    Args, CommunityListRule, CommunityListType, DeviceApi, DeviceError, PolicyError, PolicyKind,
    PolicyResult, PolicyStore, PrefixListRule, RawFields, Reference, RouteMapRule, Snapshot,
};

pub type ShowCallback = fn(&PolicyStore, Args, bool) -> Result<String, Error>;

/// One store mutation. Purge deletes a list even when route-maps still
/// reference it.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    CreatePrefixList(String),
    DeletePrefixList(String),
    PurgePrefixList(String),
    AddPrefixListRule(String, PrefixListRule),
    DeletePrefixListRule(String, u32),
    CreateCommunityList(String, CommunityListType),
    DeleteCommunityList(String),
    PurgeCommunityList(String),
    AddCommunityListRule(String, CommunityListRule),
    DeleteCommunityListRule(String, u32),
    CreateRouteMap(String),
    DeleteRouteMap(String),
    AddRouteMapRule(String, RouteMapRule),
    DeleteRouteMapRule(String, u32),
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Request::*;
        match self {
            CreatePrefixList(name) => write!(f, "create prefix-list {}", name),
            DeletePrefixList(name) => write!(f, "delete prefix-list {}", name),
            PurgePrefixList(name) => write!(f, "purge prefix-list {}", name),
            AddPrefixListRule(name, rule) => {
                write!(f, "add prefix-list {} rule {}", name, rule.sequence)
            }
            DeletePrefixListRule(name, seq) => {
                write!(f, "delete prefix-list {} rule {}", name, seq)
            }
            CreateCommunityList(name, list_type) => {
                write!(f, "create community-list {} {}", list_type, name)
            }
            DeleteCommunityList(name) => write!(f, "delete community-list {}", name),
            PurgeCommunityList(name) => write!(f, "purge community-list {}", name),
            AddCommunityListRule(name, rule) => {
                write!(f, "add community-list {} rule {}", name, rule.sequence)
            }
            DeleteCommunityListRule(name, seq) => {
                write!(f, "delete community-list {} rule {}", name, seq)
            }
            CreateRouteMap(name) => write!(f, "create route-map {}", name),
            DeleteRouteMap(name) => write!(f, "delete route-map {}", name),
            AddRouteMapRule(name, rule) => {
                write!(f, "add route-map {} rule {}", name, rule.sequence)
            }
            DeleteRouteMapRule(name, seq) => write!(f, "delete route-map {} rule {}", name, seq),
        }
    }
}

impl Request {
    /// Add-rule request from raw form fields.
    pub fn add_rule(kind: PolicyKind, name: &str, fields: &RawFields) -> PolicyResult<Self> {
        let name = name.to_string();
        Ok(match kind {
            PolicyKind::PrefixList => {
                Request::AddPrefixListRule(name, PrefixListRule::from_fields(fields)?)
            }
            PolicyKind::CommunityList => {
                Request::AddCommunityListRule(name, CommunityListRule::from_fields(fields)?)
            }
            PolicyKind::RouteMap => {
                Request::AddRouteMapRule(name, RouteMapRule::from_fields(fields)?)
            }
        })
    }

    /// Apply to the store. Returns the references a purge left dangling.
    pub fn apply(&self, store: &mut PolicyStore) -> PolicyResult<Vec<Reference>> {
        use Request::*;
        match self {
            CreatePrefixList(name) => store.create_prefix_list(name)?,
            DeletePrefixList(name) => {
                store.delete_prefix_list(name)?;
            }
            PurgePrefixList(name) => return Ok(store.purge_prefix_list(name)?.1),
            AddPrefixListRule(name, rule) => store.add_prefix_list_rule(name, rule.clone())?,
            DeletePrefixListRule(name, seq) => {
                store.delete_prefix_list_rule(name, *seq)?;
            }
            CreateCommunityList(name, list_type) => {
                store.create_community_list(name, *list_type)?
            }
            DeleteCommunityList(name) => {
                store.delete_community_list(name)?;
            }
            PurgeCommunityList(name) => return Ok(store.purge_community_list(name)?.1),
            AddCommunityListRule(name, rule) => {
                store.add_community_list_rule(name, rule.clone())?
            }
            DeleteCommunityListRule(name, seq) => {
                store.delete_community_list_rule(name, *seq)?;
            }
            CreateRouteMap(name) => store.create_route_map(name)?,
            DeleteRouteMap(name) => {
                store.delete_route_map(name)?;
            }
            AddRouteMapRule(name, rule) => store.add_route_map_rule(name, rule.clone())?,
            DeleteRouteMapRule(name, seq) => {
                store.delete_route_map_rule(name, *seq)?;
            }
        }
        Ok(Vec::new())
    }

    async fn send(&self, device: &dyn DeviceApi) -> Result<(), DeviceError> {
        use Request::*;
        match self {
            CreatePrefixList(name) => device.create_prefix_list(name).await,
            DeletePrefixList(name) | PurgePrefixList(name) => device.delete_prefix_list(name).await,
            AddPrefixListRule(name, rule) => device.add_prefix_list_rule(name, rule).await,
            DeletePrefixListRule(name, seq) => device.delete_prefix_list_rule(name, *seq).await,
            CreateCommunityList(name, list_type) => {
                device.create_community_list(name, *list_type).await
            }
            DeleteCommunityList(name) | PurgeCommunityList(name) => {
                device.delete_community_list(name).await
            }
            AddCommunityListRule(name, rule) => device.add_community_list_rule(name, rule).await,
            DeleteCommunityListRule(name, seq) => {
                device.delete_community_list_rule(name, *seq).await
            }
            CreateRouteMap(name) => device.create_route_map(name).await,
            DeleteRouteMap(name) => device.delete_route_map(name).await,
            AddRouteMapRule(name, rule) => device.add_route_map_rule(name, rule).await,
            DeleteRouteMapRule(name, seq) => device.delete_route_map_rule(name, *seq).await,
        }
    }

    /// Requests reverting this one on the device, given the store as it was
    /// before.
    fn undo(&self, before: &PolicyStore) -> Vec<Request> {
        use Request::*;
        match self {
            CreatePrefixList(name) => vec![DeletePrefixList(name.clone())],
            CreateCommunityList(name, _) => vec![DeleteCommunityList(name.clone())],
            CreateRouteMap(name) => vec![DeleteRouteMap(name.clone())],
            AddPrefixListRule(name, rule) => {
                vec![DeletePrefixListRule(name.clone(), rule.sequence)]
            }
            AddCommunityListRule(name, rule) => {
                vec![DeleteCommunityListRule(name.clone(), rule.sequence)]
            }
            AddRouteMapRule(name, rule) => vec![DeleteRouteMapRule(name.clone(), rule.sequence)],
            DeletePrefixListRule(name, seq) => before
                .prefix_list(name)
                .and_then(|plist| plist.rules.get(seq))
                .map(|rule| AddPrefixListRule(name.clone(), rule.clone()))
                .into_iter()
                .collect(),
            DeleteCommunityListRule(name, seq) => before
                .community_list(name)
                .and_then(|clist| clist.rules.get(seq))
                .map(|rule| AddCommunityListRule(name.clone(), rule.clone()))
                .into_iter()
                .collect(),
            DeleteRouteMapRule(name, seq) => before
                .route_map(name)
                .and_then(|rmap| rmap.rules.get(seq))
                .map(|rule| AddRouteMapRule(name.clone(), rule.clone()))
                .into_iter()
                .collect(),
            DeletePrefixList(name) | PurgePrefixList(name) => {
                let Some(plist) = before.prefix_list(name) else {
                    return Vec::new();
                };
                let rules = plist
                    .rules
                    .values()
                    .map(|rule| AddPrefixListRule(name.clone(), rule.clone()));
                std::iter::once(CreatePrefixList(name.clone()))
                    .chain(rules)
                    .collect()
            }
            DeleteCommunityList(name) | PurgeCommunityList(name) => {
                let Some(clist) = before.community_list(name) else {
                    return Vec::new();
                };
                let rules = clist
                    .rules
                    .values()
                    .map(|rule| AddCommunityListRule(name.clone(), rule.clone()));
                std::iter::once(CreateCommunityList(name.clone(), clist.list_type))
                    .chain(rules)
                    .collect()
            }
            DeleteRouteMap(name) => {
                let Some(rmap) = before.route_map(name) else {
                    return Vec::new();
                };
                let rules = rmap
                    .rules
                    .values()
                    .map(|rule| AddRouteMapRule(name.clone(), rule.clone()));
                std::iter::once(CreateRouteMap(name.clone()))
                    .chain(rules)
                    .collect()
            }
        }
    }
}

#[derive(Debug)]
pub enum Message {
    Mutate {
        req: Request,
        resp: oneshot::Sender<PolicyResult<Vec<Reference>>>,
    },
    Show {
        path: String,
        args: Args,
        json: bool,
        resp: oneshot::Sender<String>,
    },
    Snapshot {
        resp: oneshot::Sender<Snapshot>,
    },
    Sync {
        resp: oneshot::Sender<PolicyResult<()>>,
    },
}

/// Owner of the policy store. Requests are served one at a time: local
/// validation, then the device, then the local commit.
pub struct PolicyManager {
    pub tx: UnboundedSender<Message>,
    pub rx: UnboundedReceiver<Message>,
    pub store: PolicyStore,
    pub device: Box<dyn DeviceApi>,
    pub show_cb: HashMap<String, ShowCallback>,
}

impl PolicyManager {
    pub fn new(device: Box<dyn DeviceApi>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut manager = Self {
            tx,
            rx,
            store: PolicyStore::new(),
            device,
            show_cb: HashMap::new(),
        };
        manager.show_build();
        manager
    }

    pub fn client(&self) -> PolicyClient {
        PolicyClient {
            tx: self.tx.clone(),
        }
    }

    async fn process_mutate(&mut self, req: Request) -> PolicyResult<Vec<Reference>> {
        let mut next = self.store.clone();
        let dangling = req.apply(&mut next)?;

        if let Err(err) = req.send(self.device.as_ref()).await {
            warn!("device rejected {}: {}", req, err);
            if err.applied {
                self.compensate(&req).await;
            }
            return Err(err.into());
        }

        self.store = next;
        info!("{}", req);
        Ok(dangling)
    }

    async fn compensate(&self, req: &Request) {
        for undo in req.undo(&self.store) {
            match undo.send(self.device.as_ref()).await {
                Ok(()) => info!("compensated {} with {}", req, undo),
                Err(err) => warn!("compensation {} failed: {}", undo, err),
            }
        }
    }

    async fn process_sync(&mut self) -> PolicyResult<()> {
        let mut snapshot = self.device.snapshot().await?;
        snapshot.reconcile(&self.store);
        self.store = PolicyStore::load(snapshot)?;
        info!(
            "synced {} prefix-lists, {} community-lists, {} route-maps",
            self.store.prefix_lists().count(),
            self.store.community_lists().count(),
            self.store.route_maps().count()
        );
        Ok(())
    }

    fn process_show(&self, path: &str, args: Args, json: bool) -> String {
        match self.show_cb.get(path) {
            Some(f) => match f(&self.store, args, json) {
                Ok(result) => result,
                Err(e) => format!("{}", e),
            },
            None => format!("unknown show command {}", path),
        }
    }

    async fn process_msg(&mut self, msg: Message) {
        match msg {
            Message::Mutate { req, resp } => {
                let result = self.process_mutate(req).await;
                let _ = resp.send(result);
            }
            Message::Show {
                path,
                args,
                json,
                resp,
            } => {
                let _ = resp.send(self.process_show(&path, args, json));
            }
            Message::Snapshot { resp } => {
                let _ = resp.send(self.store.snapshot());
            }
            Message::Sync { resp } => {
                let result = self.process_sync().await;
                if let Err(err) = &result {
                    warn!("sync failed: {}", err);
                }
                let _ = resp.send(result);
            }
        }
    }

    pub async fn event_loop(&mut self) {
        loop {
            tokio::select! {
                Some(msg) = self.rx.recv() => {
                    self.process_msg(msg).await;
                }
                else => break,
            }
        }
    }
}

pub fn serve(mut manager: PolicyManager) {
    tokio::spawn(async move {
        manager.event_loop().await;
    });
}

/// Handle for submitting requests to a running `PolicyManager`.
#[derive(Clone)]
pub struct PolicyClient {
    tx: UnboundedSender<Message>,
}

impl PolicyClient {
    async fn call<T>(&self, msg: impl FnOnce(oneshot::Sender<T>) -> Message) -> PolicyResult<T> {
        let (resp, rx) = oneshot::channel();
        self.tx
            .send(msg(resp))
            .map_err(|_| PolicyError::ManagerStopped)?;
        rx.await.map_err(|_| PolicyError::ManagerStopped)
    }

    pub async fn request(&self, req: Request) -> PolicyResult<Vec<Reference>> {
        self.call(|resp| Message::Mutate { req, resp }).await?
    }

    async fn mutate(&self, req: Request) -> PolicyResult<()> {
        self.request(req).await.map(|_| ())
    }

    pub async fn create_prefix_list(&self, name: &str) -> PolicyResult<()> {
        self.mutate(Request::CreatePrefixList(name.to_string()))
            .await
    }

    pub async fn delete_prefix_list(&self, name: &str) -> PolicyResult<()> {
        self.mutate(Request::DeletePrefixList(name.to_string()))
            .await
    }

    pub async fn purge_prefix_list(&self, name: &str) -> PolicyResult<Vec<Reference>> {
        self.request(Request::PurgePrefixList(name.to_string()))
            .await
    }

    pub async fn add_prefix_list_rule(&self, name: &str, rule: PrefixListRule) -> PolicyResult<()> {
        self.mutate(Request::AddPrefixListRule(name.to_string(), rule))
            .await
    }

    pub async fn delete_prefix_list_rule(&self, name: &str, sequence: u32) -> PolicyResult<()> {
        self.mutate(Request::DeletePrefixListRule(name.to_string(), sequence))
            .await
    }

    pub async fn create_community_list(
        &self,
        name: &str,
        list_type: CommunityListType,
    ) -> PolicyResult<()> {
        self.mutate(Request::CreateCommunityList(name.to_string(), list_type))
            .await
    }

    pub async fn delete_community_list(&self, name: &str) -> PolicyResult<()> {
        self.mutate(Request::DeleteCommunityList(name.to_string()))
            .await
    }

    pub async fn purge_community_list(&self, name: &str) -> PolicyResult<Vec<Reference>> {
        self.request(Request::PurgeCommunityList(name.to_string()))
            .await
    }

    pub async fn add_community_list_rule(
        &self,
        name: &str,
        rule: CommunityListRule,
    ) -> PolicyResult<()> {
        self.mutate(Request::AddCommunityListRule(name.to_string(), rule))
            .await
    }

    pub async fn delete_community_list_rule(&self, name: &str, sequence: u32) -> PolicyResult<()> {
        self.mutate(Request::DeleteCommunityListRule(name.to_string(), sequence))
            .await
    }

    pub async fn create_route_map(&self, name: &str) -> PolicyResult<()> {
        self.mutate(Request::CreateRouteMap(name.to_string())).await
    }

    pub async fn delete_route_map(&self, name: &str) -> PolicyResult<()> {
        self.mutate(Request::DeleteRouteMap(name.to_string())).await
    }

    pub async fn add_route_map_rule(&self, name: &str, rule: RouteMapRule) -> PolicyResult<()> {
        self.mutate(Request::AddRouteMapRule(name.to_string(), rule))
            .await
    }

    pub async fn delete_route_map_rule(&self, name: &str, sequence: u32) -> PolicyResult<()> {
        self.mutate(Request::DeleteRouteMapRule(name.to_string(), sequence))
            .await
    }

    /// Add a rule given as raw form fields.
    pub async fn add_rule_fields(
        &self,
        kind: PolicyKind,
        name: &str,
        fields: &RawFields,
    ) -> PolicyResult<()> {
        self.mutate(Request::add_rule(kind, name, fields)?).await
    }

    /// Push every entity of the snapshot, lists before route-maps. Stops at
    /// the first failure.
    pub async fn load(&self, snapshot: Snapshot) -> PolicyResult<()> {
        for plist in snapshot.prefix_lists {
            self.create_prefix_list(&plist.name).await?;
            for rule in plist.rules.into_values() {
                self.add_prefix_list_rule(&plist.name, rule).await?;
            }
        }
        for clist in snapshot.community_lists {
            self.create_community_list(&clist.name, clist.list_type)
                .await?;
            for rule in clist.rules.into_values() {
                self.add_community_list_rule(&clist.name, rule).await?;
            }
        }
        for rmap in snapshot.route_maps {
            self.create_route_map(&rmap.name).await?;
            for rule in rmap.rules.into_values() {
                self.add_route_map_rule(&rmap.name, rule).await?;
            }
        }
        Ok(())
    }

    pub async fn show(&self, path: &str, args: Args, json: bool) -> PolicyResult<String> {
        let path = path.to_string();
        self.call(|resp| Message::Show {
            path,
            args,
            json,
            resp,
        })
        .await
    }

    pub async fn snapshot(&self) -> PolicyResult<Snapshot> {
        self.call(|resp| Message::Snapshot { resp }).await
    }

    /// Replace the store with the device's running configuration.
    pub async fn sync(&self) -> PolicyResult<()> {
        self.call(|resp| Message::Sync { resp }).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Action, CommandDevice, Key, Match, Set};

    fn start() -> (CommandDevice, PolicyClient) {
        let device = CommandDevice::new();
        let manager = PolicyManager::new(Box::new(device.clone()));
        let client = manager.client();
        serve(manager);
        (device, client)
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let (device, client) = start();
        client.create_prefix_list("PL-1").await.unwrap();
        let err = client.create_prefix_list("PL-1").await.unwrap_err();
        assert_eq!(
            err,
            PolicyError::DuplicateKey(Key::entity(PolicyKind::PrefixList, "PL-1"))
        );
        // Local refusals never reach the device.
        assert_eq!(device.commands().await.len(), 2);
    }

    #[tokio::test]
    async fn device_refusal() {
        let (device, client) = start();
        client.create_route_map("RM-1").await.unwrap();
        device.reject_next("commit failed", false).await;
        let err = client
            .add_route_map_rule("RM-1", RouteMapRule::new(10, Action::Permit))
            .await
            .unwrap_err();
        assert_eq!(err, PolicyError::UpstreamRejected("commit failed".into()));
        assert!(!err.is_local());

        let snapshot = client.snapshot().await.unwrap();
        assert!(snapshot.route_maps[0].rules.is_empty());
    }

    #[tokio::test]
    async fn applied_refusal_is_compensated() {
        let (device, client) = start();
        client.create_prefix_list("PL-1").await.unwrap();
        device.reject_next("post-commit hook failed", true).await;
        let rule = PrefixListRule::new(10, Action::Permit, "10.0.0.0/8".parse().unwrap());
        assert!(client.add_prefix_list_rule("PL-1", rule).await.is_err());

        let cmds = device.commands().await;
        assert_eq!(
            cmds.last().map(String::as_str),
            Some("delete policy prefix-list PL-1 rule 10")
        );
        let plists = device.get_prefix_lists().await.unwrap();
        assert!(plists[0].rules.is_empty());
    }

    #[tokio::test]
    async fn applied_delete_is_restored() {
        let (device, client) = start();
        client.create_prefix_list("PL-1").await.unwrap();
        let rule = PrefixListRule::new(10, Action::Deny, "10.0.0.0/8".parse().unwrap()).le(16);
        client.add_prefix_list_rule("PL-1", rule.clone()).await.unwrap();

        device.reject_next("partial commit", true).await;
        assert!(client.delete_prefix_list("PL-1").await.is_err());

        let plists = device.get_prefix_lists().await.unwrap();
        assert_eq!(plists[0].rules[&10], rule);
        let snapshot = client.snapshot().await.unwrap();
        assert_eq!(snapshot.prefix_lists[0].rules[&10], rule);
    }

    #[tokio::test]
    async fn sync_from_device() {
        let (device, client) = start();
        device
            .create_community_list("CL-1", CommunityListType::Standard)
            .await
            .unwrap();
        let rule = CommunityListRule::new(10, Action::Permit, "65001:100");
        device.add_community_list_rule("CL-1", &rule).await.unwrap();
        device.create_route_map("RM-1").await.unwrap();
        let m = Match {
            community: Some("CL-1".into()),
            ..Default::default()
        };
        let rmap_rule = RouteMapRule::new(10, Action::Permit).with_match(m);
        device.add_route_map_rule("RM-1", &rmap_rule).await.unwrap();

        client.sync().await.unwrap();
        let snapshot = client.snapshot().await.unwrap();
        assert_eq!(snapshot.community_lists[0].rules[&10], rule);
        assert_eq!(snapshot.route_maps[0].rules[&10], rmap_rule);

        assert!(matches!(
            client.delete_community_list("CL-1").await,
            Err(PolicyError::DanglingReference { .. })
        ));
    }

    #[tokio::test]
    async fn sync_keeps_community_list_type() {
        let (_device, client) = start();
        client
            .create_community_list("CL-X", CommunityListType::Expanded)
            .await
            .unwrap();
        client.sync().await.unwrap();
        let snapshot = client.snapshot().await.unwrap();
        assert_eq!(snapshot.community_lists[0].list_type, CommunityListType::Expanded);

        let rule = CommunityListRule::new(10, Action::Permit, "^65001:.*$");
        client.add_community_list_rule("CL-X", rule).await.unwrap();
        let rule = CommunityListRule::new(20, Action::Deny, "65002:100");
        client.add_community_list_rule("CL-X", rule).await.unwrap();
        client.sync().await.unwrap();
        let snapshot = client.snapshot().await.unwrap();
        assert_eq!(snapshot.community_lists[0].list_type, CommunityListType::Expanded);
        assert_eq!(snapshot.community_lists[0].rules.len(), 2);
    }

    #[tokio::test]
    async fn sync_keeps_nexthop_peer_off() {
        let (_device, client) = start();
        client.create_route_map("RM-1").await.unwrap();
        let s = Set {
            ip_nexthop_peer: Some(false),
            ..Default::default()
        };
        let rule = RouteMapRule::new(10, Action::Permit).with_set(s);
        client.add_route_map_rule("RM-1", rule.clone()).await.unwrap();

        client.sync().await.unwrap();
        let snapshot = client.snapshot().await.unwrap();
        assert_eq!(snapshot.route_maps[0].rules[&10], rule);
    }

    #[tokio::test]
    async fn purge_reports_dangling() {
        let (_device, client) = start();
        client.create_prefix_list("PL-1").await.unwrap();
        client.create_route_map("RM-1").await.unwrap();
        let fields = RawFields::new()
            .with("sequence", "10")
            .with("action", "permit")
            .with("match/ip_address_prefix_list", "PL-1");
        client
            .add_rule_fields(PolicyKind::RouteMap, "RM-1", &fields)
            .await
            .unwrap();

        let dangling = client.purge_prefix_list("PL-1").await.unwrap();
        assert_eq!(
            dangling,
            vec![Reference {
                route_map: "RM-1".into(),
                sequence: 10,
                field: "ip_address_prefix_list",
            }]
        );
        let out = client
            .show("/show/dangling", Args::default(), false)
            .await
            .unwrap();
        assert!(out.contains("dangling reference to prefix-list PL-1 from route-map RM-1 rule 10"));
    }
}
