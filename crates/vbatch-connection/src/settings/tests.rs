//! Tests for node settings

use super::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::time::Duration;

const SETTINGS: &str = r#"
[tool.formatting]
width = 100

[analytics.connection]
driver = "postgres"
host = "db.internal"
port = 5432
dbname = "warehouse"
user = "loader"
password = "p ss'w\\rd"
sslmode = "require"

[analytics.connection_pool]
host = "db.internal"
dbname = "warehouse"
min_size = 2
max_size = 8
timeout_ms = 1500
max_waiting = 10
name = "analytics-pool"

[scratch.connection]
driver = "sqlite"
path = "/tmp/scratch.db"
"#;

fn analytics() -> NodeSettings {
    NodeSettings::from_toml_str(SETTINGS, "analytics").unwrap()
}

#[test]
fn test_conninfo_is_space_delimited_and_sorted() {
    let settings = analytics();
    assert_eq!(
        settings.connection().to_conninfo(),
        r"dbname=warehouse host=db.internal password='p ss\'w\\rd' port=5432 sslmode=require user=loader"
    );
}

#[test]
fn test_pool_keys_stay_out_of_conninfo() {
    let settings = analytics();
    assert_eq!(
        settings.connection_pool().to_conninfo(),
        "dbname=warehouse host=db.internal"
    );
}

#[rstest]
#[case("plain", "plain")]
#[case("", "''")]
#[case("two words", "'two words'")]
#[case(r"back\slash", r"'back\\slash'")]
fn test_conninfo_quoting(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(quote_conninfo_value(raw), expected);
}

#[test]
fn test_overrides_replace_file_values() {
    let section = analytics()
        .connection()
        .clone()
        .with_overrides([("dbname", "staging"), ("application_name", "vbatch")]);

    assert_eq!(section.get("dbname"), Some("staging"));
    assert_eq!(
        section.to_conninfo(),
        r"application_name=vbatch dbname=staging host=db.internal password='p ss\'w\\rd' port=5432 sslmode=require user=loader"
    );
}

#[test]
fn test_pool_config_from_section() {
    let config = analytics().connection_pool().pool_config().unwrap();
    assert_eq!(config.min_size(), 2);
    assert_eq!(config.max_size(), 8);
    assert_eq!(config.acquire_timeout(), Duration::from_millis(1500));
    assert_eq!(config.max_waiting(), Some(10));
    assert_eq!(config.max_lifetime(), Some(Duration::from_secs(3600)));
    assert_eq!(config.name(), "analytics-pool");
}

#[test]
fn test_pool_config_defaults_when_keys_absent() {
    let config = ConnectionSection::default().pool_config().unwrap();
    assert_eq!(config, PoolConfig::default());
}

#[test]
fn test_invalid_pool_value() {
    let section = ConnectionSection::default().with_override("min_size", "lots");
    let err = section.pool_config().unwrap_err();
    assert!(matches!(err, VbatchError::Configuration(_)));
    assert!(err.to_string().contains("min_size"));

    let inverted = ConnectionSection::default()
        .with_override("min_size", "9")
        .with_override("max_size", "3");
    assert!(matches!(
        inverted.pool_config(),
        Err(VbatchError::Configuration(_))
    ));
}

#[test]
fn test_connection_config_for_driver() {
    let settings = NodeSettings::from_toml_str(SETTINGS, "scratch").unwrap();
    let config = settings.connection().to_connection_config("scratch");

    assert_eq!(config.driver, "sqlite");
    assert_eq!(config.get_string("path").as_deref(), Some("/tmp/scratch.db"));
    assert!(!config.params.contains_key("driver"));
}

#[test]
fn test_postgres_is_the_default_driver() {
    let config = analytics().connection_pool().to_connection_config("pool");
    assert_eq!(config.driver, "postgres");
    assert_eq!(config.get_string("host").as_deref(), Some("db.internal"));
    assert!(!config.params.contains_key("min_size"));
}

#[test]
fn test_missing_pool_section_reuses_connection() {
    let settings = NodeSettings::from_toml_str(SETTINGS, "scratch").unwrap();
    assert_eq!(settings.connection_pool(), settings.connection());
    assert_eq!(
        settings.section(SectionKind::ConnectionPool).driver(),
        "sqlite"
    );
}

#[test]
fn test_unknown_node() {
    let err = NodeSettings::from_toml_str(SETTINGS, "billing").unwrap_err();
    assert!(matches!(err, VbatchError::Configuration(_)));
    assert!(err.to_string().contains("billing"));
}

#[test]
fn test_node_without_sections() {
    let err = NodeSettings::from_toml_str(SETTINGS, "tool").unwrap_err();
    assert!(matches!(err, VbatchError::Configuration(_)));
}

#[test]
fn test_nested_values_are_rejected() {
    let doc = "[n.connection]\nhost = \"h\"\noptions = { a = 1 }\n";
    assert!(matches!(
        NodeSettings::from_toml_str(doc, "n"),
        Err(VbatchError::Configuration(_))
    ));
}

#[test]
fn test_malformed_toml() {
    assert!(matches!(
        NodeSettings::from_toml_str("[n.connection\nhost=", "n"),
        Err(VbatchError::Toml(_))
    ));
}

#[test]
fn test_node_is_required() {
    let dir = tempfile::tempdir().unwrap();
    let err = NodeSettings::resolve(None, None, dir.path()).unwrap_err();
    assert!(err.to_string().contains(NODE_ENV));
}

#[test]
fn test_project_file_is_found_in_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(PROJECT_FILE), SETTINGS).unwrap();
    let nested = dir.path().join("jobs").join("nightly");
    std::fs::create_dir_all(&nested).unwrap();

    assert_eq!(
        find_project_file(&nested),
        Some(dir.path().join(PROJECT_FILE))
    );

    let settings = NodeSettings::resolve(Some("analytics".into()), None, &nested).unwrap();
    assert_eq!(settings.node(), "analytics");
    assert_eq!(settings.source(), Some(dir.path().join(PROJECT_FILE).as_path()));
}

#[test]
fn test_explicit_settings_path_wins() {
    let dir = tempfile::tempdir().unwrap();
    let explicit = dir.path().join("nodes.toml");
    std::fs::write(&explicit, SETTINGS).unwrap();

    let settings =
        NodeSettings::resolve(Some("scratch".into()), Some(explicit.clone()), dir.path()).unwrap();
    assert_eq!(settings.source(), Some(explicit.as_path()));
    assert_eq!(settings.connection().driver(), "sqlite");
}

#[test]
fn test_missing_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = NodeSettings::resolve(
        Some("analytics".into()),
        Some(dir.path().join("absent.toml")),
        dir.path(),
    )
    .unwrap_err();
    assert!(matches!(err, VbatchError::Configuration(_)));
}
