use crate::localize::ResourceTable;
use crate::model::SoundCategory;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "chime";
const STATE_FILE: &str = "state.json";
const STRINGS_FILE: &str = "strings.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistedState {
    pub folders: Vec<PathBuf>,
    #[serde(default)]
    pub default_sounds: HashMap<SoundCategory, PathBuf>,
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("CHIME_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn state_path() -> Result<PathBuf> {
    Ok(config_root()?.join(STATE_FILE))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

pub fn load_state() -> Result<PersistedState> {
    let path = state_path()?;
    if !path.exists() {
        return Ok(PersistedState::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    let state: PersistedState = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse state file {}", path.display()))?;
    Ok(state)
}

pub fn save_state(state: &PersistedState) -> Result<()> {
    ensure_config_dir()?;
    let path = state_path()?;
    let json = serde_json::to_string_pretty(state)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn load_resource_table() -> Result<ResourceTable> {
    load_resource_table_from(&config_root()?.join(STRINGS_FILE))
}

pub fn load_resource_table_from(path: &Path) -> Result<ResourceTable> {
    let mut table = ResourceTable::builtin();
    if !path.exists() {
        return Ok(table);
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read strings file {}", path.display()))?;
    let overrides: BTreeMap<String, Value> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse strings file {}", path.display()))?;
    table.merge(overrides.into_iter().collect());
    Ok(table)
}
