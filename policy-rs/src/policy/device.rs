use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use super::vyos::{commands, showcfg};
use super::{
    CommunityList, CommunityListRule, CommunityListType, PolicyError, PrefixList,
    PrefixListRule, RouteMap, RouteMapRule, Snapshot,
};

/// Refusal reported by the device. `applied` is set when the change took
/// effect on the device before the refusal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct DeviceError {
    pub reason: String,
    pub applied: bool,
}

impl DeviceError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            applied: false,
        }
    }
}

impl From<DeviceError> for PolicyError {
    fn from(err: DeviceError) -> Self {
        PolicyError::UpstreamRejected(err.reason)
    }
}

/// Device configuration API. Every call is one committed change.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn get_prefix_lists(&self) -> Result<Vec<PrefixList>, DeviceError>;
    async fn get_community_lists(&self) -> Result<Vec<CommunityList>, DeviceError>;
    async fn get_route_maps(&self) -> Result<Vec<RouteMap>, DeviceError>;

    async fn create_prefix_list(&self, name: &str) -> Result<(), DeviceError>;
    async fn delete_prefix_list(&self, name: &str) -> Result<(), DeviceError>;
    async fn add_prefix_list_rule(&self, name: &str, rule: &PrefixListRule)
    -> Result<(), DeviceError>;
    async fn delete_prefix_list_rule(&self, name: &str, sequence: u32)
    -> Result<(), DeviceError>;

    async fn create_community_list(
        &self,
        name: &str,
        list_type: CommunityListType,
    ) -> Result<(), DeviceError>;
    async fn delete_community_list(&self, name: &str) -> Result<(), DeviceError>;
    async fn add_community_list_rule(
        &self,
        name: &str,
        rule: &CommunityListRule,
    ) -> Result<(), DeviceError>;
    async fn delete_community_list_rule(
        &self,
        name: &str,
        sequence: u32,
    ) -> Result<(), DeviceError>;

    async fn create_route_map(&self, name: &str) -> Result<(), DeviceError>;
    async fn delete_route_map(&self, name: &str) -> Result<(), DeviceError>;
    async fn add_route_map_rule(&self, name: &str, rule: &RouteMapRule)
    -> Result<(), DeviceError>;
    async fn delete_route_map_rule(&self, name: &str, sequence: u32)
    -> Result<(), DeviceError>;

    async fn snapshot(&self) -> Result<Snapshot, DeviceError> {
        Ok(Snapshot {
            prefix_lists: self.get_prefix_lists().await?,
            community_lists: self.get_community_lists().await?,
            route_maps: self.get_route_maps().await?,
        })
    }
}

#[derive(Default)]
struct CommandLog {
    commands: Vec<String>,
    reject: Option<DeviceError>,
}

/// In-process device which renders every change into configuration
/// commands. The running configuration is the replay of the command log.
#[derive(Clone, Default)]
pub struct CommandDevice {
    log: Arc<Mutex<CommandLog>>,
}

impl CommandDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next change. With `applied` the commands are still
    /// recorded before the refusal.
    pub async fn reject_next(&self, reason: &str, applied: bool) {
        let mut log = self.log.lock().await;
        log.reject = Some(DeviceError {
            reason: reason.to_string(),
            applied,
        });
    }

    pub async fn commands(&self) -> Vec<String> {
        self.log.lock().await.commands.clone()
    }

    async fn commit(&self, cmds: Vec<String>) -> Result<(), DeviceError> {
        let mut log = self.log.lock().await;
        match log.reject.take() {
            Some(err) => {
                if err.applied {
                    log.commands.extend(cmds);
                }
                debug!("device rejected: {}", err.reason);
                Err(err)
            }
            None => {
                for cmd in &cmds {
                    debug!("{}", cmd);
                }
                log.commands.extend(cmds);
                Ok(())
            }
        }
    }

    async fn running(&self) -> Result<Snapshot, DeviceError> {
        let log = self.log.lock().await;
        showcfg::parse_commands(&log.commands).map_err(|e| DeviceError::new(e.to_string()))
    }
}

#[async_trait]
impl DeviceApi for CommandDevice {
    async fn get_prefix_lists(&self) -> Result<Vec<PrefixList>, DeviceError> {
        Ok(self.running().await?.prefix_lists)
    }

    async fn get_community_lists(&self) -> Result<Vec<CommunityList>, DeviceError> {
        Ok(self.running().await?.community_lists)
    }

    async fn get_route_maps(&self) -> Result<Vec<RouteMap>, DeviceError> {
        Ok(self.running().await?.route_maps)
    }

    async fn create_prefix_list(&self, name: &str) -> Result<(), DeviceError> {
        self.commit(commands::create_prefix_list(name)).await
    }

    async fn delete_prefix_list(&self, name: &str) -> Result<(), DeviceError> {
        self.commit(commands::delete_prefix_list(name)).await
    }

    async fn add_prefix_list_rule(
        &self,
        name: &str,
        rule: &PrefixListRule,
    ) -> Result<(), DeviceError> {
        self.commit(commands::prefix_list_rule(name, rule)).await
    }

    async fn delete_prefix_list_rule(&self, name: &str, sequence: u32) -> Result<(), DeviceError> {
        self.commit(commands::delete_prefix_list_rule(name, sequence))
            .await
    }

    async fn create_community_list(
        &self,
        name: &str,
        _list_type: CommunityListType,
    ) -> Result<(), DeviceError> {
        self.commit(commands::create_community_list(name)).await
    }

    async fn delete_community_list(&self, name: &str) -> Result<(), DeviceError> {
        self.commit(commands::delete_community_list(name)).await
    }

    async fn add_community_list_rule(
        &self,
        name: &str,
        rule: &CommunityListRule,
    ) -> Result<(), DeviceError> {
        self.commit(commands::community_list_rule(name, rule)).await
    }

    async fn delete_community_list_rule(
        &self,
        name: &str,
        sequence: u32,
    ) -> Result<(), DeviceError> {
        self.commit(commands::delete_community_list_rule(name, sequence))
            .await
    }

    async fn create_route_map(&self, name: &str) -> Result<(), DeviceError> {
        self.commit(commands::create_route_map(name)).await
    }

    async fn delete_route_map(&self, name: &str) -> Result<(), DeviceError> {
        self.commit(commands::delete_route_map(name)).await
    }

    async fn add_route_map_rule(&self, name: &str, rule: &RouteMapRule) -> Result<(), DeviceError> {
        self.commit(commands::route_map_rule(name, rule)).await
    }

    async fn delete_route_map_rule(&self, name: &str, sequence: u32) -> Result<(), DeviceError> {
        self.commit(commands::delete_route_map_rule(name, sequence))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Action;

    #[tokio::test]
    async fn records_commands() {
        let device = CommandDevice::new();
        device.create_prefix_list("PL-1").await.unwrap();
        let rule = PrefixListRule::new(10, Action::Permit, "10.0.0.0/8".parse().unwrap());
        device.add_prefix_list_rule("PL-1", &rule).await.unwrap();

        let plists = device.get_prefix_lists().await.unwrap();
        assert_eq!(plists.len(), 1);
        assert_eq!(plists[0].rules[&10], rule);
        assert_eq!(device.commands().await.len(), 4);
    }

    #[tokio::test]
    async fn reject() {
        let device = CommandDevice::new();
        device.reject_next("commit failed", false).await;
        let err = device.create_route_map("RM-1").await.unwrap_err();
        assert_eq!(err, DeviceError::new("commit failed"));
        assert!(device.commands().await.is_empty());

        // One refusal only.
        device.create_route_map("RM-1").await.unwrap();
        assert_eq!(device.get_route_maps().await.unwrap().len(), 1);

        device.reject_next("partial", true).await;
        let err = device.delete_route_map("RM-1").await.unwrap_err();
        assert!(err.applied);
        assert!(device.get_route_maps().await.unwrap().is_empty());
    }
}
