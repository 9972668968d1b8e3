use crate::audio::SharedSound;
use crate::catalog::{CatalogError, SoundCatalog, SoundEntry};
use crate::model::{SoundCategory, SoundUri, StreamKind};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const SOUND_NAME_RES_PREFIX: &str = "sound_name_";

const ANCHOR_RESOURCE: &str = "notification_sound_default";
const BUILTIN_PACKAGE: &str = "chime";
const BUILTIN_TYPE: &str = "string";

#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    entries: BTreeMap<String, Value>,
}

impl ResourceTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (name, text) in [
            ("ringtone_picker_title", "Select sound"),
            ("ringtone_default", "Default ringtone"),
            ("notification_sound_default", "Default notification sound"),
            ("alarm_sound_default", "Default alarm sound"),
            ("ringtone_silent", "None"),
        ] {
            table.insert(
                format!("{BUILTIN_PACKAGE}:{BUILTIN_TYPE}/{name}"),
                Value::String(String::from(text)),
            );
        }
        table
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn merge(&mut self, overrides: ResourceTable) {
        self.entries.extend(overrides.entries);
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    // Finds the package and type of the entry carrying this resource name.
    pub fn locate(&self, name: &str) -> Option<(&str, &str)> {
        self.entries.keys().find_map(|key| {
            let (head, entry_name) = key.rsplit_once('/')?;
            if entry_name != name {
                return None;
            }
            head.split_once(':')
        })
    }

    pub fn string_or(&self, name: &str, fallback: &str) -> String {
        self.locate(name)
            .map(|(package, kind)| format!("{package}:{kind}/{name}"))
            .and_then(|key| self.value(&key))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| fallback.to_string())
    }
}

impl FromIterator<(String, Value)> for ResourceTable {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

pub struct NameLocalizer {
    table: ResourceTable,
    prefix: Option<String>,
}

impl NameLocalizer {
    pub fn new(table: ResourceTable) -> Self {
        let prefix = table
            .locate(ANCHOR_RESOURCE)
            .map(|(package, kind)| format!("{package}:{kind}/{SOUND_NAME_RES_PREFIX}"));
        if prefix.is_none() {
            warn!("anchor resource {ANCHOR_RESOURCE} missing; sound name localization disabled");
        }
        Self { table, prefix }
    }

    pub fn disabled(table: ResourceTable) -> Self {
        Self {
            table,
            prefix: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.prefix.is_some()
    }

    pub fn localize(&self, raw: &str) -> String {
        let Some(prefix) = &self.prefix else {
            return raw.to_string();
        };

        let key = format!("{prefix}{}", sanitize(raw));
        match self.table.value(&key) {
            None => raw.to_string(),
            Some(Value::String(localized)) => {
                debug!("replacing name {raw} with {localized}");
                localized.clone()
            }
            Some(_) => {
                warn!("non-textual value under {key}, keeping {raw}");
                raw.to_string()
            }
        }
    }
}

pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

pub struct LocalizedCatalog<C> {
    inner: C,
    namer: NameLocalizer,
}

impl<C: SoundCatalog> LocalizedCatalog<C> {
    pub fn new(inner: C, namer: NameLocalizer) -> Self {
        Self { inner, namer }
    }
}

impl<C: SoundCatalog> SoundCatalog for LocalizedCatalog<C> {
    fn set_category(&mut self, category: SoundCategory) {
        self.inner.set_category(category);
    }

    fn candidates(&self) -> Vec<SoundEntry> {
        self.inner
            .candidates()
            .into_iter()
            .map(|entry| SoundEntry {
                label: self.namer.localize(&entry.label),
                uri: entry.uri,
            })
            .collect()
    }

    fn position_of(&self, uri: &SoundUri) -> isize {
        self.inner.position_of(uri)
    }

    fn uri_at(&self, pos: isize) -> Option<SoundUri> {
        self.inner.uri_at(pos)
    }

    fn handle_at(&mut self, pos: isize) -> Result<SharedSound, CatalogError> {
        self.inner.handle_at(pos)
    }

    fn preferred_stream(&self) -> StreamKind {
        self.inner.preferred_stream()
    }

    fn stop_current(&mut self) {
        self.inner.stop_current()
    }

    fn deactivate(&mut self) {
        self.inner.deactivate()
    }
}
