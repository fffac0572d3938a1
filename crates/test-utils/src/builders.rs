use std::path::Path;

use trigger::config::{Config, RawConfig};

/// `sh -c <script>` as an argv.
pub fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

/// Builder for `Config` to simplify test setup.
///
/// Starts with no patterns, `true` as both commands and `trigger` as the
/// program name (so the pattern variable is `TRIGGER_PATTERN`).
pub struct ConfigBuilder {
    config: RawConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfig {
                monitor: vec!["true".to_string()],
                trigger: vec!["true".to_string()],
                program: "trigger".to_string(),
                ..RawConfig::default()
            },
        }
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.config.patterns.push(pattern.to_string());
        self
    }

    pub fn monitor(mut self, argv: Vec<String>) -> Self {
        self.config.monitor = argv;
        self
    }

    pub fn trigger(mut self, argv: Vec<String>) -> Self {
        self.config.trigger = argv;
        self
    }

    pub fn retrigger(mut self, on: bool) -> Self {
        self.config.retrigger = on;
        self
    }

    pub fn program(mut self, name: &str) -> Self {
        self.config.program = name.to_string();
        self
    }

    pub fn monitor_output(mut self, path: &Path) -> Self {
        self.config.monitor_output.overwrite = Some(path.to_path_buf());
        self
    }

    pub fn monitor_append(mut self, path: &Path) -> Self {
        self.config.monitor_output.append = Some(path.to_path_buf());
        self
    }

    pub fn monitor_tee(mut self) -> Self {
        self.config.monitor_output.tee = true;
        self
    }

    pub fn trigger_output(mut self, path: &Path) -> Self {
        self.config.trigger_output.overwrite = Some(path.to_path_buf());
        self
    }

    pub fn trigger_append(mut self, path: &Path) -> Self {
        self.config.trigger_output.append = Some(path.to_path_buf());
        self
    }

    pub fn trigger_tee(mut self) -> Self {
        self.config.trigger_output.tee = true;
        self
    }

    pub fn raw(self) -> RawConfig {
        self.config
    }

    pub fn build(self) -> Config {
        Config::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
