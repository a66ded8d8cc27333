use anyhow::{Context, Result};
use gasto_core::{Card, Destination, User};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub fn gasto_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".gasto"))
}

pub fn ensure_gasto_home() -> Result<PathBuf> {
    let dir = gasto_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn queue_path() -> Result<PathBuf> {
    Ok(ensure_gasto_home()?.join("queue.json"))
}

pub fn registry_path() -> Result<PathBuf> {
    Ok(ensure_gasto_home()?.join("registry.json"))
}

/// Local snapshot of the backend registries, refreshed by `gasto registry pull`.
/// An empty snapshot is fine: parsing still works, it just never matches a card
/// or a user.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
}

pub fn write_registry(snapshot: &RegistrySnapshot) -> Result<()> {
    let p = registry_path()?;
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(&p, json).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn read_registry() -> Result<RegistrySnapshot> {
    let p = registry_path()?;
    if !p.exists() {
        return Ok(RegistrySnapshot::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(serde_json::from_str(&s)?)
}
