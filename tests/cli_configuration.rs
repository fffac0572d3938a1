// tests/cli_configuration.rs

use trigger::cli::{CliError, parse_from};
use trigger::config::{Config, RawConfig};
use trigger::errors::{TriggerError, exit_code};
use trigger::watch::PatternError;
use trigger_test_utils::ConfigBuilder;

fn argv(line: &str) -> Vec<String> {
    std::iter::once("trigger")
        .chain(line.split_whitespace())
        .map(str::to_string)
        .collect()
}

#[test]
fn full_command_line_becomes_a_config() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("mon.log");
    let line = format!("-r -o {} ERROR* -- tail -n 5 app.log ++ notify-send", log.display());

    let invocation = parse_from(argv(&line)).unwrap();
    let config = Config::try_from(RawConfig::from_invocation(invocation, "my-tool.v2")).unwrap();

    assert!(config.retrigger);
    assert_eq!(config.patterns.len(), 1);
    assert_eq!(config.monitor.to_string(), "tail -n 5 app.log");
    assert_eq!(config.trigger.to_string(), "notify-send");
    assert_eq!(config.pattern_key, "MY_TOOL_V2_PATTERN");
    assert!(log.exists());
}

#[test]
fn malformed_regex_is_rejected_before_anything_runs() {
    let invocation = parse_from(argv("/[unclosed/ -- echo hi ++ true")).unwrap();
    let err = Config::try_from(RawConfig::from_invocation(invocation, "trigger")).unwrap_err();

    assert_eq!(err.exit_code(), exit_code::USAGE);
    assert!(err.to_string().contains("/[unclosed/"));
    assert!(matches!(err, TriggerError::Pattern(PatternError::Regex { .. })));
}

#[test]
fn unopenable_output_file_has_its_own_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("missing-dir").join("out.log");
    let line = format!("-A {} x -- echo ++ true", bad.display());

    let invocation = parse_from(argv(&line)).unwrap();
    let err = Config::try_from(RawConfig::from_invocation(invocation, "trigger")).unwrap_err();

    assert_eq!(err.exit_code(), exit_code::OUTPUT_OPEN);
    assert!(err.to_string().contains("out.log"));
}

#[test]
fn version_request_uses_the_help_exit_code() {
    let err = parse_from(argv("--version")).unwrap_err();
    assert!(matches!(err, CliError::Display(_)));
    assert_eq!(err.exit_code(), exit_code::HELP);
}

#[test]
fn missing_trigger_delimiter_is_a_usage_error() {
    let err = parse_from(argv("x -- echo hi")).unwrap_err();
    assert!(matches!(err, CliError::Usage(_)));
    assert_eq!(err.exit_code(), exit_code::USAGE);
}

#[test]
fn blank_trigger_program_is_a_usage_error() {
    let raw = ConfigBuilder::new()
        .pattern("x")
        .trigger(vec![String::new(), "arg".to_string()])
        .raw();

    let err = Config::try_from(raw).unwrap_err();

    assert!(matches!(err, TriggerError::Usage(_)));
    assert_eq!(err.to_string(), "no trigger command specified");
    assert_eq!(err.exit_code(), exit_code::USAGE);
}
