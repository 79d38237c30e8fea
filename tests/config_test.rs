#![cfg(feature = "toml")]

use sge_accounting::config::Config;
use std::env;
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

/// Serializes tests that read or write process environment variables.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const OVERRIDE_VARS: [&str; 7] = [
    "LOG_LEVEL",
    "LOG_FORMAT",
    "LOG_OUTPUT",
    "SGE_ACCOUNTING_MAX_DATE",
    "SGE_ACCOUNTING_CORES",
    "SGE_ACCOUNTING_LIMIT_USERS",
    "SGE_ACCOUNTING_LOG_DIR",
];

fn clear_overrides() {
    for var in OVERRIDE_VARS {
        env::remove_var(var);
    }
}

#[test]
fn test_load_from_toml_file() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_overrides();

    let dir = tempdir().unwrap();
    let path = dir.path().join("sge-accounting.toml");
    fs::write(
        &path,
        r#"
[logging]
level = "DEBUG"
format = "json"

[report]
max_date = "30000101"
reports = ["totals", "owners"]
cores = 5000

[paths]
accounting_files = ["/var/sge/accounting", "/var/sge/accounting.1"]

[[memory.hostname_rules]]
pattern = "^node"
node_memory = "64G"
cores = 16

[[memory.hostname_rules]]
pattern = "^bigmem"
node_memory = "1T"
cores = 32
label = "large memory"

[owners]
core_owners = ["ENV"]
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.logging.level, "DEBUG");
    assert_eq!(config.logging.format, "json");
    // unspecified keys keep their defaults
    assert_eq!(config.logging.output, "console");
    assert_eq!(config.report.max_date, "30000101");
    assert_eq!(config.report.cores, 5000);
    assert_eq!(config.report.limit_users, None);
    assert_eq!(config.paths.accounting_files.len(), 2);

    let rules = config.memory.compile_rules().unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].memory_per_core(), 4 * 1024 * 1024 * 1024);
    assert_eq!(rules[1].pattern(), "^bigmem");

    assert_eq!(config.owners.core_owners, vec!["ENV"]);
    assert_eq!(config.owners.owner_owner.get("ISS").map(String::as_str), Some("ARC"));

    let kinds: Vec<&str> = config.report_kinds().unwrap().iter().map(|k| k.name()).collect();
    assert_eq!(kinds, vec!["totals", "owners"]);
}

#[test]
fn test_invalid_file_is_rejected() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_overrides();

    let dir = tempdir().unwrap();

    let bad_pattern = dir.path().join("bad_pattern.toml");
    fs::write(
        &bad_pattern,
        "[[memory.hostname_rules]]\npattern = \"^node[\"\nnode_memory = \"64G\"\ncores = 16\n",
    )
    .unwrap();
    let err = Config::load(Some(&bad_pattern)).unwrap_err();
    assert!(format!("{:#}", err).contains("^node["));

    let bad_report = dir.path().join("bad_report.toml");
    fs::write(&bad_report, "[report]\nreports = [\"histogram\"]\n").unwrap();
    assert!(Config::load(Some(&bad_report)).is_err());

    let not_toml = dir.path().join("broken.toml");
    fs::write(&not_toml, "[report\ncores = ").unwrap();
    assert!(Config::load(Some(&not_toml)).is_err());

    assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
}

#[test]
fn test_env_variable_override() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_overrides();

    env::set_var("LOG_LEVEL", "TRACE");
    env::set_var("LOG_OUTPUT", "both");
    env::set_var("SGE_ACCOUNTING_MAX_DATE", "2100");
    env::set_var("SGE_ACCOUNTING_CORES", "1024");
    env::set_var("SGE_ACCOUNTING_LIMIT_USERS", "20");
    env::set_var("SGE_ACCOUNTING_LOG_DIR", "/tmp/sge-logs");

    let mut config = Config::default();
    config.apply_env_overrides().unwrap();

    assert_eq!(config.logging.level, "TRACE");
    assert_eq!(config.logging.output, "both");
    assert_eq!(config.report.max_date, "2100");
    assert_eq!(config.report.cores, 1024);
    assert_eq!(config.report.limit_users, Some(20));
    assert_eq!(config.paths.log_directory.to_str(), Some("/tmp/sge-logs"));
    assert!(config.validate().is_ok());

    env::set_var("SGE_ACCOUNTING_CORES", "many");
    assert!(Config::default().apply_env_overrides().is_err());

    clear_overrides();
}

#[test]
fn test_env_overrides_win_over_file() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_overrides();

    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[report]\ncores = 100\n").unwrap();

    env::set_var("SGE_ACCOUNTING_CORES", "200");
    let config = Config::load(Some(&path));
    clear_overrides();

    assert_eq!(config.unwrap().report.cores, 200);
}

#[test]
fn test_save_and_reload() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_overrides();

    let dir = tempdir().unwrap();
    let path = dir.path().join("saved.toml");

    let mut config = Config::default();
    config.report.cores = 4096;
    config.report.limit_users = Some(15);
    config.save_to_file(&path).unwrap();

    let reloaded = Config::load(Some(&path)).unwrap();
    assert_eq!(reloaded.report.cores, 4096);
    assert_eq!(reloaded.report.limit_users, Some(15));
    assert_eq!(reloaded.memory.hostname_rules.len(), 10);
    assert_eq!(reloaded.owners.owner_parent.get("chem").map(String::as_str), Some("MAPS"));
}
