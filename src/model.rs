use crate::localize::ResourceTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const POS_UNKNOWN: isize = -1;

pub const FLAG_AUDIBILITY_ENFORCED: u32 = 1 << 0;
pub const FLAG_BYPASS_MUTE: u32 = 1 << 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCategory {
    Ringtone,
    Notification,
    Alarm,
    Unknown,
}

impl SoundCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ringtone" => Some(Self::Ringtone),
            "notification" => Some(Self::Notification),
            "alarm" => Some(Self::Alarm),
            _ => None,
        }
    }

    pub fn subdirs(self) -> &'static [&'static str] {
        match self {
            Self::Ringtone => &["ringtones"],
            Self::Notification => &["notifications"],
            Self::Alarm => &["alarms"],
            Self::Unknown => &["ringtones", "notifications", "alarms"],
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Ringtone => "ringtone",
            Self::Notification => "notification",
            Self::Alarm => "alarm",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Ring,
    Notification,
    Alarm,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundUri(String);

impl SoundUri {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn for_path(path: &Path) -> Self {
        Self(format!("file://{}", path.display()))
    }

    pub fn to_path(&self) -> Option<PathBuf> {
        self.0.strip_prefix("file://").map(PathBuf::from)
    }

    pub fn default_for(category: SoundCategory) -> Self {
        match category {
            SoundCategory::Notification => Self(String::from("default:notification")),
            SoundCategory::Alarm => Self(String::from("default:alarm")),
            SoundCategory::Ringtone | SoundCategory::Unknown => {
                Self(String::from("default:ringtone"))
            }
        }
    }

    pub fn is_default(&self) -> bool {
        self.0.starts_with("default:")
    }

    pub fn default_category(&self) -> Option<SoundCategory> {
        let name = self.0.strip_prefix("default:")?;
        SoundCategory::parse(name)
    }
}

impl fmt::Display for SoundUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct PickerRequest {
    pub category: SoundCategory,
    pub show_default: bool,
    pub show_silent: bool,
    pub default_uri: Option<SoundUri>,
    pub existing_uri: Option<SoundUri>,
    pub title: Option<String>,
    pub attribute_flags: u32,
    pub show_ok_cancel: bool,
}

impl Default for PickerRequest {
    fn default() -> Self {
        Self {
            category: SoundCategory::Unknown,
            show_default: true,
            show_silent: true,
            default_uri: None,
            existing_uri: None,
            title: None,
            attribute_flags: 0,
            show_ok_cancel: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PickerConfig {
    pub category: SoundCategory,
    pub show_default: bool,
    pub show_silent: bool,
    pub default_uri: SoundUri,
    pub existing_uri: Option<SoundUri>,
    pub title: String,
    pub attribute_flags: u32,
    pub show_ok_cancel: bool,
    pub default_label: String,
    pub silent_label: String,
}

impl PickerConfig {
    pub fn from_request(request: PickerRequest, table: &ResourceTable) -> Self {
        let default_uri = request
            .default_uri
            .unwrap_or_else(|| SoundUri::default_for(request.category));
        let title = request
            .title
            .unwrap_or_else(|| table.string_or("ringtone_picker_title", "Select sound"));
        let default_label = match request.category {
            SoundCategory::Notification => {
                table.string_or("notification_sound_default", "Default notification sound")
            }
            SoundCategory::Alarm => table.string_or("alarm_sound_default", "Default alarm sound"),
            SoundCategory::Ringtone | SoundCategory::Unknown => {
                table.string_or("ringtone_default", "Default ringtone")
            }
        };
        let silent_label = table.string_or("ringtone_silent", "None");

        Self {
            category: request.category,
            show_default: request.show_default,
            show_silent: request.show_silent,
            default_uri,
            existing_uri: request.existing_uri,
            title,
            attribute_flags: request.attribute_flags,
            show_ok_cancel: request.show_ok_cancel,
            default_label,
            silent_label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRow {
    Default { label: String },
    Silent { label: String },
    Sound { uri: SoundUri, label: String },
}

impl ListRow {
    pub fn label(&self) -> &str {
        match self {
            Self::Default { label } | Self::Silent { label } | Self::Sound { label, .. } => label,
        }
    }

    pub fn is_static(&self) -> bool {
        !matches!(self, Self::Sound { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerResult {
    Accepted { uri: Option<SoundUri> },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub clicked_pos: isize,
}
