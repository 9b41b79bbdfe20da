use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    /// `COLORFGBG` is `fg;bg` (sometimes `fg;x;bg`); ANSI backgrounds 0-6 and 8 are dark.
    pub fn from_colorfgbg(value: &str) -> Option<Self> {
        let background = value.rsplit(';').next()?.trim().parse::<u8>().ok()?;
        if background <= 6 || background == 8 {
            Some(Theme::Dark)
        } else {
            Some(Theme::Light)
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                accent: Color::Rgb(37, 99, 235),
                highlight: Color::Rgb(255, 181, 92),
                text: Color::Black,
                muted: Color::Rgb(110, 110, 110),
                tag: Color::Rgb(59, 130, 246),
                background: Color::Reset,
            },
            Theme::Dark => Palette {
                accent: Color::Rgb(72, 166, 255),
                highlight: Color::Rgb(180, 120, 40),
                text: Color::Rgb(230, 230, 230),
                muted: Color::Rgb(150, 150, 150),
                tag: Color::Rgb(125, 180, 255),
                background: Color::Rgb(24, 24, 27),
            },
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub accent: Color,
    pub highlight: Color,
    pub text: Color,
    pub muted: Color,
    pub tag: Color,
    pub background: Color,
}

#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("failed to access {}: {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("failed to encode theme preference: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Default, Serialize, Deserialize)]
struct SavedState {
    #[serde(default)]
    theme: Option<Theme>,
}

/// The one persisted preference, kept as JSON in the user's state directory.
pub struct ThemeStore {
    path: PathBuf,
}

impl ThemeStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location(home: &Path) -> Self {
        let state_dir = env::var("XDG_STATE_HOME")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".local/state"));
        Self::new(state_dir.join("marklist/state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable state file means no saved preference.
    pub fn load(&self) -> Option<Theme> {
        let contents = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<SavedState>(&contents) {
            Ok(state) => state.theme,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "ignoring corrupt state file");
                None
            }
        }
    }

    pub fn save(&self, theme: Theme) -> Result<(), ThemeError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|error| ThemeError::Io {
                path: parent.to_path_buf(),
                error,
            })?;
        }
        let body = serde_json::to_string_pretty(&SavedState { theme: Some(theme) })?;
        fs::write(&self.path, body).map_err(|error| ThemeError::Io {
            path: self.path.clone(),
            error,
        })?;
        tracing::debug!(theme = theme.as_str(), "saved theme preference");
        Ok(())
    }

    /// Saved preference, then the terminal's background hint, then light.
    pub fn initial_theme(&self) -> Theme {
        self.load()
            .or_else(|| {
                env::var("COLORFGBG")
                    .ok()
                    .and_then(|value| Theme::from_colorfgbg(&value))
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_and_round_trips_through_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::new(dir.path().join("nested/state.json"));
        assert_eq!(store.load(), None);

        store.save(Theme::Light.toggle()).unwrap();
        assert_eq!(store.load(), Some(Theme::Dark));
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"dark\""));
    }

    #[test]
    fn corrupt_state_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{theme").unwrap();
        assert_eq!(ThemeStore::new(path).load(), None);
    }

    #[test]
    fn reads_terminal_background_hint() {
        assert_eq!(Theme::from_colorfgbg("15;0"), Some(Theme::Dark));
        assert_eq!(Theme::from_colorfgbg("0;default;15"), Some(Theme::Light));
        assert_eq!(Theme::from_colorfgbg("garbage"), None);
    }

    #[test]
    fn parses_names() {
        assert_eq!(Theme::parse("dark"), Some(Theme::Dark));
        assert_eq!(Theme::parse("sepia"), None);
    }
}
