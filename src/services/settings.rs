use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// User-tunable settings. Every field defaults so a missing or partial
/// file still loads.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppSettings {
    /// Global hotkey that hides the foreground window, as a
    /// `"mod+mod+key"` string.
    #[serde(default = "default_hotkey")]
    pub hotkey: String,

    /// Whether to start with Windows.
    #[serde(default)]
    pub run_on_startup: bool,
}

fn default_hotkey() -> String {
    "win+shift+z".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            hotkey: default_hotkey(),
            run_on_startup: false,
        }
    }
}

/// Loads and saves settings as JSON in %LOCALAPPDATA%\TrayNest.
pub struct SettingsService {
    file_path: PathBuf,
}

impl SettingsService {
    /// Creates the settings folder in %LOCALAPPDATA%\TrayNest if needed.
    pub fn new() -> Self {
        let app_data = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        let folder = app_data.join("TrayNest");
        if !folder.exists() {
            let _ = fs::create_dir_all(&folder);
        }
        Self {
            file_path: folder.join("settings.json"),
        }
    }

    pub fn with_file(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    /// Falls back to defaults when the file is missing or unreadable.
    pub fn load(&self) -> AppSettings {
        match fs::read_to_string(&self.file_path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(
                        event = "settings.parse_failed",
                        file = %self.file_path.display(),
                        error = %e,
                        "Settings file is malformed, using defaults"
                    );
                    AppSettings::default()
                }
            },
            Err(_) => AppSettings::default(),
        }
    }

    pub fn save(&self, settings: &AppSettings) {
        match serde_json::to_string_pretty(settings) {
            Ok(content) => {
                if let Err(e) = fs::write(&self.file_path, content) {
                    tracing::warn!(
                        event = "settings.save_failed",
                        file = %self.file_path.display(),
                        error = %e,
                        "Failed to write settings"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(event = "settings.serialize_failed", error = %e);
            }
        }
    }
}
