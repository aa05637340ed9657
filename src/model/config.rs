use serde::{Deserialize, Serialize};

/// Configuration from config.toml in the data directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub habits: HabitConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Default: see src/templates/config.toml
    #[serde(default = "default_pomodoro_minutes")]
    pub pomodoro_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    /// Every Nth finished pomodoro is followed by a long break
    #[serde(default = "default_pomodoros_until_long_break")]
    pub pomodoros_until_long_break: u32,
    #[serde(default = "default_true")]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_pomodoros: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        TimerConfig {
            pomodoro_minutes: default_pomodoro_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            pomodoros_until_long_break: default_pomodoros_until_long_break(),
            auto_start_breaks: true,
            auto_start_pomodoros: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitConfig {
    /// Run the tomorrow sweep every time a workspace is opened for writing
    #[serde(default = "default_true")]
    pub regenerate_on_load: bool,
}

impl Default for HabitConfig {
    fn default() -> Self {
        HabitConfig {
            regenerate_on_load: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

/// Default: see src/templates/config.toml
fn default_true() -> bool {
    true
}

fn default_pomodoro_minutes() -> u32 {
    25
}

fn default_short_break_minutes() -> u32 {
    5
}

fn default_long_break_minutes() -> u32 {
    15
}

fn default_pomodoros_until_long_break() -> u32 {
    4
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timer.pomodoro_minutes, 25);
        assert!(config.timer.auto_start_breaks);
        assert!(!config.timer.auto_start_pomodoros);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn partial_timer_table_keeps_other_defaults() {
        let config: Config = toml::from_str("[timer]\npomodoro_minutes = 50\n").unwrap();
        assert_eq!(config.timer.pomodoro_minutes, 50);
        assert_eq!(config.timer.short_break_minutes, 5);
        assert!(config.habits.regenerate_on_load);
    }
}
