// Light/dark theme preference

use crate::backend::Backend;
use crate::error::BackendError;
use std::str::FromStr;
use thiserror::Error;

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
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

    /// Read the stored preference. Only an exact `"dark"` selects dark.
    pub fn load<B: Backend + ?Sized>(backend: &B) -> Result<Self, BackendError> {
        let stored = backend.load(THEME_KEY)?;
        Ok(match stored.as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        })
    }

    pub fn save<B: Backend + ?Sized>(self, backend: &mut B) -> Result<(), BackendError> {
        backend.save(THEME_KEY, self.as_str())
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown theme '{0}' (expected dark or light)")]
pub struct ParseThemeError(String);

impl FromStr for Theme {
    type Err = ParseThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(ParseThemeError(other.to_string())),
        }
    }
}
