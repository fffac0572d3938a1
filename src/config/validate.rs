// src/config/validate.rs

use tracing::debug;

use crate::config::model::{Config, RawConfig};
use crate::errors::{Result, TriggerError};
use crate::exec::command::CommandSpec;
use crate::exec::env::pattern_key;
use crate::exec::output::{Route, resolve_routes};
use crate::watch::patterns::PatternSet;

impl TryFrom<RawConfig> for Config {
    type Error = TriggerError;

    fn try_from(raw: RawConfig) -> std::result::Result<Self, Self::Error> {
        // Patterns first: a bad pattern must not leave a truncated file behind.
        let patterns = PatternSet::compile(&raw.patterns)?;
        ensure_command(&raw.monitor, "monitor")?;
        ensure_command(&raw.trigger, "trigger")?;

        let (monitor_route, trigger_route) =
            resolve_routes(&raw.monitor_output, &raw.trigger_output)?;
        let monitor = command_spec(raw.monitor, monitor_route)?;
        let trigger = command_spec(raw.trigger, trigger_route)?;
        let key = pattern_key(&raw.program);

        debug!(
            patterns = patterns.len(),
            monitor = %monitor,
            trigger = %trigger,
            retrigger = raw.retrigger,
            key = %key,
            "configuration validated"
        );

        Ok(Config::new_unchecked(
            patterns,
            monitor,
            trigger,
            raw.retrigger,
            key,
        ))
    }
}

fn ensure_command(argv: &[String], role: &str) -> Result<()> {
    match argv.first() {
        Some(program) if !program.is_empty() => Ok(()),
        _ => Err(TriggerError::Usage(format!("no {role} command specified"))),
    }
}

fn command_spec(argv: Vec<String>, route: Route) -> Result<CommandSpec> {
    let mut argv = argv.into_iter();
    let program = argv
        .next()
        .ok_or_else(|| TriggerError::Usage("empty command".to_string()))?;
    Ok(CommandSpec::new(program, argv.collect(), route))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::output::OutputOptions;
    use crate::watch::patterns::PatternError;

    fn raw(patterns: &[&str]) -> RawConfig {
        RawConfig {
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            monitor: vec!["echo".into(), "hi".into()],
            trigger: vec!["true".into()],
            program: "trigger".into(),
            ..RawConfig::default()
        }
    }

    #[test]
    fn builds_specs_and_pattern_key() {
        let cfg = Config::try_from(raw(&["ERROR*", "/x+/"])).unwrap();
        assert_eq!(cfg.patterns.len(), 2);
        assert_eq!(cfg.monitor.program, "echo");
        assert_eq!(cfg.monitor.args, vec!["hi"]);
        assert_eq!(cfg.trigger.to_string(), "true");
        assert_eq!(cfg.pattern_key, "TRIGGER_PATTERN");
        assert!(!cfg.retrigger);
    }

    #[test]
    fn invalid_regex_names_the_pattern() {
        let err = Config::try_from(raw(&["ok", "/(unclosed/"])).unwrap_err();
        match err {
            TriggerError::Pattern(PatternError::Regex { pattern, .. }) => {
                assert_eq!(pattern, "/(unclosed/")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_pattern_opens_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let mut cfg = raw(&["/(/"]);
        cfg.monitor_output = OutputOptions {
            overwrite: Some(path.clone()),
            ..OutputOptions::default()
        };
        assert!(Config::try_from(cfg).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn missing_commands_are_usage_errors() {
        let mut cfg = raw(&["x"]);
        cfg.trigger.clear();
        let err = Config::try_from(cfg).unwrap_err();
        assert_eq!(err.to_string(), "Command-line error: no trigger command specified");

        let mut cfg = raw(&["x"]);
        cfg.monitor = vec![String::new()];
        assert!(matches!(Config::try_from(cfg), Err(TriggerError::Usage(_))));
    }
}
