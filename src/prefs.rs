//! Display theme preference
//!
//! Stored as `{"theme": "dark"}` in `lotview-prefs.json`. Only the HTML
//! renderer reads it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub const PREFS_FILE: &str = "lotview-prefs.json";
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme '{}' (expected dark or light)", other)),
        }
    }
}

pub fn default_path() -> PathBuf {
    PathBuf::from(PREFS_FILE)
}

/// Saved theme, or the default when the file is missing or unreadable.
pub fn load_theme<P: AsRef<Path>>(path: P) -> Theme {
    let Ok(text) = std::fs::read_to_string(path.as_ref()) else {
        return Theme::default();
    };
    serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get(THEME_KEY).and_then(|t| t.as_str()).map(str::to_string))
        .and_then(|t| t.parse().ok())
        .unwrap_or_default()
}

/// Write the theme under its key, keeping any other keys in the file.
pub fn save_theme<P: AsRef<Path>>(path: P, theme: Theme) -> std::io::Result<()> {
    let path = path.as_ref();
    let mut doc = std::fs::read_to_string(path)
        .ok()
        .and_then(|t| serde_json::from_str::<serde_json::Value>(&t).ok())
        .filter(|v| v.is_object())
        .unwrap_or_else(|| serde_json::json!({}));

    doc[THEME_KEY] = serde_json::Value::String(theme.as_str().to_string());
    let text = serde_json::to_string_pretty(&doc)?;
    std::fs::write(path, text)?;
    debug!(path = %path.display(), %theme, "theme saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_defaults_to_dark() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_theme(dir.path().join("none.json")), Theme::Dark);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PREFS_FILE);
        save_theme(&path, Theme::Light).unwrap();
        assert_eq!(load_theme(&path), Theme::Light);
        save_theme(&path, Theme::Light.toggled()).unwrap();
        assert_eq!(load_theme(&path), Theme::Dark);
    }

    #[test]
    fn test_save_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PREFS_FILE);
        std::fs::write(&path, r#"{"other": 1, "theme": "dark"}"#).unwrap();
        save_theme(&path, Theme::Light).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["other"], 1);
        assert_eq!(doc["theme"], "light");
    }

    #[test]
    fn test_garbage_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PREFS_FILE);
        std::fs::write(&path, r#"{"theme": "sepia"}"#).unwrap();
        assert_eq!(load_theme(&path), Theme::Dark);
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(load_theme(&path), Theme::Dark);
    }

    #[test]
    fn test_parse_theme() {
        assert_eq!("Light".parse::<Theme>(), Ok(Theme::Light));
        assert!("blue".parse::<Theme>().is_err());
    }
}
