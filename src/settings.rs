//! Settings provider
//!
//! Console-level flags owned by the settings service. Read once at startup.

/// Read-only view of console settings
pub trait SettingsProvider: Send + Sync {
    fn debug_mode_enabled(&self) -> bool;
    fn show_debug_panel(&self) -> bool;
}

/// Settings taken from `DEBUG_MODE` / `SHOW_DEBUG_PANEL`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvSettings {
    debug_mode: bool,
    show_debug_panel: bool,
}

impl EnvSettings {
    pub fn new(debug_mode: bool, show_debug_panel: bool) -> Self {
        Self {
            debug_mode,
            show_debug_panel,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).map(|v| parse_flag(&v)).unwrap_or(false);
        let debug_mode = flag("DEBUG_MODE");
        Self {
            debug_mode,
            // The panel only exists in debug mode
            show_debug_panel: debug_mode && flag("SHOW_DEBUG_PANEL"),
        }
    }
}

impl SettingsProvider for EnvSettings {
    fn debug_mode_enabled(&self) -> bool {
        self.debug_mode
    }

    fn show_debug_panel(&self) -> bool {
        self.show_debug_panel
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let s = EnvSettings::from_lookup(|k| match k {
            "DEBUG_MODE" => Some("true".into()),
            "SHOW_DEBUG_PANEL" => Some("1".into()),
            _ => None,
        });
        assert!(s.debug_mode_enabled());
        assert!(s.show_debug_panel());

        let s = EnvSettings::from_lookup(|k| match k {
            "SHOW_DEBUG_PANEL" => Some("yes".into()),
            _ => None,
        });
        assert!(!s.debug_mode_enabled());
        assert!(!s.show_debug_panel());
    }
}
