use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::policy::vyos::showcfg;
use crate::policy::{PolicyStore, Snapshot};

// 1. Option config path
// 2. HomeDir ~/.policy-rs/policy.yaml
// 3. System /etc/policy-rs/policy.yaml

pub fn policy_path(arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = arg {
        return Some(path.to_path_buf());
    }
    if let Some(mut home_dir) = dirs::home_dir() {
        home_dir.push(".policy-rs");
        home_dir.push("policy.yaml");
        if home_dir.exists() {
            return Some(home_dir);
        }
    }
    let path = Path::new("/etc/policy-rs/policy.yaml");
    if path.exists() {
        Some(path.to_path_buf())
    } else {
        None
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Policy document with `prefix_lists`, `community_lists` and `route_maps`,
/// in YAML or, for a `.json` file, JSON.
pub fn load_document(path: &Path) -> Result<Snapshot> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let snapshot = if is_json(path) {
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?
    } else {
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?
    };
    Ok(snapshot)
}

/// Load the document through the regular validation path.
pub fn load_store(path: &Path) -> Result<PolicyStore> {
    let snapshot = load_document(path)?;
    PolicyStore::load(snapshot).with_context(|| format!("invalid policy in {}", path.display()))
}

/// Device configuration text, either hierarchical or as configuration
/// commands.
pub fn import_device(path: &Path, commands: bool) -> Result<Snapshot> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let snapshot = if commands {
        showcfg::parse_commands(text.lines())
    } else {
        showcfg::parse(&text)
    };
    snapshot.with_context(|| format!("failed to import {}", path.display()))
}

pub fn to_document(snapshot: &Snapshot, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(snapshot)?)
    } else {
        Ok(serde_yaml::to_string(snapshot)?)
    }
}
