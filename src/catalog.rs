use crate::audio::{SharedSound, SoundOpener};
use crate::model::{POS_UNKNOWN, SoundCategory, SoundUri, StreamKind};
use lofty::prelude::{Accessor, TaggedFileExt};
use lofty::probe::Probe;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"];

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog snapshot is stale")]
    StaleData,
    #[error("catalog is not in a queryable state")]
    InvalidState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundEntry {
    pub uri: SoundUri,
    pub label: String,
}

pub trait SoundCatalog {
    fn set_category(&mut self, category: SoundCategory);
    fn candidates(&self) -> Vec<SoundEntry>;
    fn position_of(&self, uri: &SoundUri) -> isize;
    fn uri_at(&self, pos: isize) -> Option<SoundUri>;
    fn handle_at(&mut self, pos: isize) -> Result<SharedSound, CatalogError>;
    fn preferred_stream(&self) -> StreamKind;
    fn stop_current(&mut self);
    fn deactivate(&mut self);
}

fn infer_stream(category: Option<SoundCategory>) -> StreamKind {
    match category {
        Some(SoundCategory::Notification) => StreamKind::Notification,
        Some(SoundCategory::Alarm) => StreamKind::Alarm,
        _ => StreamKind::Ring,
    }
}

pub struct FsCatalog {
    folders: Vec<PathBuf>,
    opener: Rc<dyn SoundOpener>,
    category: Option<SoundCategory>,
    entries: Vec<SoundEntry>,
    active: bool,
    previous: Option<SharedSound>,
}

impl FsCatalog {
    pub fn new(folders: Vec<PathBuf>, opener: Rc<dyn SoundOpener>) -> Self {
        Self {
            folders,
            opener,
            category: None,
            entries: Vec::new(),
            active: false,
            previous: None,
        }
    }

    fn entry_at(&self, pos: isize) -> Result<&SoundEntry, CatalogError> {
        if self.category.is_none() {
            return Err(CatalogError::InvalidState);
        }
        if !self.active {
            return Err(CatalogError::StaleData);
        }
        usize::try_from(pos)
            .ok()
            .and_then(|idx| self.entries.get(idx))
            .ok_or(CatalogError::InvalidState)
    }
}

impl SoundCatalog for FsCatalog {
    fn set_category(&mut self, category: SoundCategory) {
        self.category = Some(category);
        self.entries = scan_category(&self.folders, category);
        self.active = true;
        debug!(
            "catalog scanned {} {} sounds",
            self.entries.len(),
            category.key()
        );
    }

    fn candidates(&self) -> Vec<SoundEntry> {
        self.entries.clone()
    }

    fn position_of(&self, uri: &SoundUri) -> isize {
        self.entries
            .iter()
            .position(|entry| entry.uri == *uri)
            .map_or(POS_UNKNOWN, |idx| idx as isize)
    }

    fn uri_at(&self, pos: isize) -> Option<SoundUri> {
        usize::try_from(pos)
            .ok()
            .and_then(|idx| self.entries.get(idx))
            .map(|entry| entry.uri.clone())
    }

    fn handle_at(&mut self, pos: isize) -> Result<SharedSound, CatalogError> {
        let uri = self.entry_at(pos)?.uri.clone();
        let handle = self.opener.open(&uri).ok_or(CatalogError::InvalidState)?;
        handle.set_stream(self.preferred_stream());
        self.previous = Some(Rc::clone(&handle));
        Ok(handle)
    }

    fn preferred_stream(&self) -> StreamKind {
        infer_stream(self.category)
    }

    fn stop_current(&mut self) {
        if let Some(handle) = self.previous.take()
            && handle.is_playing()
        {
            handle.stop();
        }
    }

    fn deactivate(&mut self) {
        self.active = false;
    }
}

pub struct MemoryCatalog {
    entries: Vec<SoundEntry>,
    opener: Rc<dyn SoundOpener>,
    category: Option<SoundCategory>,
    active: bool,
    previous: Option<SharedSound>,
}

impl MemoryCatalog {
    pub fn new(entries: Vec<SoundEntry>, opener: Rc<dyn SoundOpener>) -> Self {
        Self {
            entries,
            opener,
            category: None,
            active: false,
            previous: None,
        }
    }

    fn entry_at(&self, pos: isize) -> Result<&SoundEntry, CatalogError> {
        if self.category.is_none() {
            return Err(CatalogError::InvalidState);
        }
        if !self.active {
            return Err(CatalogError::StaleData);
        }
        usize::try_from(pos)
            .ok()
            .and_then(|idx| self.entries.get(idx))
            .ok_or(CatalogError::InvalidState)
    }
}

impl SoundCatalog for MemoryCatalog {
    fn set_category(&mut self, category: SoundCategory) {
        self.category = Some(category);
        self.active = true;
    }

    fn candidates(&self) -> Vec<SoundEntry> {
        self.entries.clone()
    }

    fn position_of(&self, uri: &SoundUri) -> isize {
        self.entries
            .iter()
            .position(|entry| entry.uri == *uri)
            .map_or(POS_UNKNOWN, |idx| idx as isize)
    }

    fn uri_at(&self, pos: isize) -> Option<SoundUri> {
        usize::try_from(pos)
            .ok()
            .and_then(|idx| self.entries.get(idx))
            .map(|entry| entry.uri.clone())
    }

    fn handle_at(&mut self, pos: isize) -> Result<SharedSound, CatalogError> {
        let uri = self.entry_at(pos)?.uri.clone();
        let handle = self.opener.open(&uri).ok_or(CatalogError::InvalidState)?;
        handle.set_stream(self.preferred_stream());
        self.previous = Some(Rc::clone(&handle));
        Ok(handle)
    }

    fn preferred_stream(&self) -> StreamKind {
        infer_stream(self.category)
    }

    fn stop_current(&mut self) {
        if let Some(handle) = self.previous.take()
            && handle.is_playing()
        {
            handle.stop();
        }
    }

    fn deactivate(&mut self) {
        self.active = false;
    }
}

fn scan_category(folders: &[PathBuf], category: SoundCategory) -> Vec<SoundEntry> {
    let mut entries = Vec::new();

    for folder in folders {
        for subdir in category.subdirs() {
            let root = folder.join(subdir);
            if !root.is_dir() {
                continue;
            }

            for entry in WalkDir::new(&root)
                .follow_links(true)
                .into_iter()
                .filter_map(Result::ok)
            {
                let path = entry.path();
                if !entry.file_type().is_file() || !is_audio(path) {
                    continue;
                }

                entries.push(SoundEntry {
                    uri: SoundUri::for_path(path),
                    label: label_for(path),
                });
            }
        }
    }

    entries.sort_by_cached_key(|entry| {
        (
            entry.label.to_ascii_lowercase(),
            entry.uri.as_str().to_string(),
        )
    });
    entries.dedup_by(|a, b| a.uri == b.uri);
    entries
}

fn label_for(path: &Path) -> String {
    tag_title(path)
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| {
            path.file_stem()
                .and_then(OsStr::to_str)
                .unwrap_or("unknown")
                .to_string()
        })
}

fn tag_title(path: &Path) -> Option<String> {
    let tagged = Probe::open(path).ok()?.read().ok()?;
    let tag = tagged.primary_tag().or_else(|| tagged.first_tag())?;
    tag.title().map(|title| title.to_string())
}

fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}
