// Completion-status filtering for collection views

use crate::task::Task;
use std::str::FromStr;
use thiserror::Error;

/// Which tasks a view keeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    All,
    Active,    // completed == false
    Completed, // completed == true
}

impl FilterMode {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Active => !task.is_completed(),
            FilterMode::Completed => task.is_completed(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::Active => "active",
            FilterMode::Completed => "completed",
        }
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown filter mode '{0}' (expected all, active or completed)")]
pub struct ParseFilterModeError(String);

impl FromStr for FilterMode {
    type Err = ParseFilterModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterMode::All),
            "active" => Ok(FilterMode::Active),
            "completed" => Ok(FilterMode::Completed),
            other => Err(ParseFilterModeError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches() {
        let open = Task::new("1", "open");
        let done = Task::new("2", "done").with_completed(true);

        assert!(FilterMode::All.matches(&open));
        assert!(FilterMode::All.matches(&done));
        assert!(FilterMode::Active.matches(&open));
        assert!(!FilterMode::Active.matches(&done));
        assert!(!FilterMode::Completed.matches(&open));
        assert!(FilterMode::Completed.matches(&done));
    }

    #[test]
    fn test_filter_mode_from_str() {
        assert_eq!("all".parse::<FilterMode>().unwrap(), FilterMode::All);
        assert_eq!("Active".parse::<FilterMode>().unwrap(), FilterMode::Active);
        assert_eq!(" completed ".parse::<FilterMode>().unwrap(), FilterMode::Completed);
        assert!("done".parse::<FilterMode>().is_err());
    }

    #[test]
    fn test_filter_mode_display() {
        assert_eq!(FilterMode::All.to_string(), "all");
        assert_eq!(FilterMode::Active.to_string(), "active");
        assert_eq!(FilterMode::Completed.to_string(), "completed");
        assert_eq!(FilterMode::default(), FilterMode::All);
    }
}
