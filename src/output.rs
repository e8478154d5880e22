//! # Output Configuration
//!
//! Decides whether the CLI colors step statuses and lineage markers, and
//! renders them.
//!
//! With `--color=auto` the environment decides, in this order: `NO_COLOR`
//! (any value) turns colors off, `CLICOLOR=0` turns them off,
//! `CLICOLOR_FORCE` (non-empty, not `0`) turns them on and `TERM=dumb` turns
//! them off. Otherwise colors follow the terminal's capabilities.

use std::env;

use console::{style, StyledObject};

use crate::pipeline::StepStatus;

/// Whether CLI output is colored.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolves a `--color` value (`always`, `never` or `auto`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = if color_flag.eq_ignore_ascii_case("always") {
            true
        } else if color_flag.eq_ignore_ascii_case("never") {
            false
        } else {
            env_color_override()
                .unwrap_or_else(|| console::Term::stdout().features().colors_supported())
        };
        Self { use_color }
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }

    /// A step status, colored by outcome when colors are enabled.
    pub fn status(&self, status: StepStatus) -> String {
        let label = status.as_str();
        if !self.use_color {
            return label.to_string();
        }
        match status {
            StepStatus::Success => paint(label).green().to_string(),
            StepStatus::UpToDate => paint(label).cyan().to_string(),
            StepStatus::NotRun => paint(label).dim().to_string(),
        }
    }

    /// Lineage marker for a version listing.
    pub fn lineage(&self, mainline: bool) -> String {
        let label = if mainline { "mainline" } else { "branch" };
        if self.use_color && !mainline {
            paint(label).yellow().to_string()
        } else {
            label.to_string()
        }
    }

    /// Emphasized text, e.g. a version id in a summary line.
    pub fn emphasis(&self, text: &str) -> String {
        if self.use_color {
            paint(text).bold().to_string()
        } else {
            text.to_string()
        }
    }
}

/// An explicit color decision from the environment, if any.
fn env_color_override() -> Option<bool> {
    let set = |name: &str| env::var(name).ok();
    if env::var_os("NO_COLOR").is_some() {
        return Some(false);
    }
    if set("CLICOLOR").as_deref() == Some("0") {
        return Some(false);
    }
    if set("CLICOLOR_FORCE").is_some_and(|v| !v.is_empty() && v != "0") {
        return Some(true);
    }
    if set("TERM").as_deref() == Some("dumb") {
        return Some(false);
    }
    None
}

/// Styles unconditionally; callers have already decided to use color.
fn paint(text: &str) -> StyledObject<&str> {
    style(text).force_styling(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_always() {
        assert!(OutputConfig::from_env_and_flag("always").use_color);
        assert!(OutputConfig::from_env_and_flag("ALWAYS").use_color);
    }

    #[test]
    fn test_color_never() {
        assert!(!OutputConfig::from_env_and_flag("never").use_color);
    }

    #[test]
    fn test_plain_labels_without_color() {
        let config = OutputConfig::without_color();
        assert_eq!(config.status(StepStatus::UpToDate), "up-to-date");
        assert_eq!(config.lineage(true), "mainline");
        assert_eq!(config.lineage(false), "branch");
        assert_eq!(config.emphasis("1.14.4"), "1.14.4");
    }

    #[test]
    fn test_colored_labels_keep_text() {
        let config = OutputConfig::with_color();
        let status = config.status(StepStatus::Success);
        assert!(status.contains("success"));
        assert_ne!(status, "success");
        assert!(config.lineage(false).contains("branch"));
    }

    #[test]
    #[serial_test::serial]
    fn test_clicolor_force_enables_auto() {
        std::env::remove_var("NO_COLOR");
        std::env::remove_var("CLICOLOR");
        std::env::set_var("CLICOLOR_FORCE", "1");
        let decision = env_color_override();
        std::env::remove_var("CLICOLOR_FORCE");
        assert_eq!(decision, Some(true));
    }

    #[test]
    #[serial_test::serial]
    fn test_no_color_env_disables_auto() {
        std::env::set_var("NO_COLOR", "");
        let config = OutputConfig::from_env_and_flag("auto");
        std::env::remove_var("NO_COLOR");
        assert!(!config.use_color);
    }
}
