use diode_graph_base::{Config, ConfigSection, ResolverConfig, Tracing, TracingConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::NamedTempFile;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct OutputConfig {
    format: String,
    indent: u32,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
struct ReportSection {
    #[serde(default)]
    name: String,
    #[serde(default)]
    verbose: bool,
}

impl ConfigSection for ReportSection {
    fn key() -> &'static str {
        "report"
    }
}

#[tokio::test]
async fn test_config_new() {
    let config = Config::new();
    assert!(config.is_empty());
    assert_eq!(config.len(), 0);
}

#[tokio::test]
async fn test_config_set_and_get() {
    let mut config = Config::new();
    let output = OutputConfig {
        format: "json".to_string(),
        indent: 2,
    };

    config.set("output", &output).unwrap();

    let retrieved: OutputConfig = config.get("output").unwrap();
    assert_eq!(retrieved, output);
    assert_eq!(config.len(), 1);
}

#[tokio::test]
async fn test_config_get_nonexistent() {
    let config = Config::new();

    let result: Option<String> = config.get("nonexistent").unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
async fn test_config_with() {
    let config = Config::new().with("report", ReportSection {
        name: "graph".to_string(),
        verbose: true,
    });

    let report: ReportSection = config.section().unwrap();
    assert_eq!(report.name, "graph");
    assert!(report.verbose);
}

#[tokio::test]
async fn test_config_section_default() {
    let config = Config::parse(r#"{"other": {}}"#).unwrap();

    let report: ReportSection = config.section().unwrap();
    assert_eq!(report, ReportSection::default());
    let resolver: ResolverConfig = config.section().unwrap();
    assert!(!resolver.full_binding_graph);
}

#[tokio::test]
async fn test_resolver_config() {
    let config = Config::parse(r#"{"resolver": {"full_binding_graph": true}}"#).unwrap();

    let resolver: ResolverConfig = config.section().unwrap();
    assert!(resolver.full_binding_graph);
}

#[tokio::test]
async fn test_config_parse_invalid_json() {
    let invalid_json = r#"{ "invalid": json }"#;

    let result = Config::parse(invalid_json);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_config_type_conversion_error() {
    let config = Config::parse(r#"{"resolver": {"full_binding_graph": "yes"}}"#).unwrap();

    let result = config.section::<ResolverConfig>();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_config_parse_file() {
    let json_content = r#"
    {
        "resolver": {
            "full_binding_graph": true
        },
        "output": {
            "format": "text",
            "indent": 4
        }
    }
    "#;

    let temp_file = NamedTempFile::new().unwrap();
    fs::write(temp_file.path(), json_content).unwrap();

    let config = Config::parse_file(temp_file.path()).await.unwrap();
    let resolver: ResolverConfig = config.section().unwrap();
    let output: OutputConfig = config.get("output").unwrap();

    assert!(resolver.full_binding_graph);
    assert_eq!(output.format, "text");
    assert_eq!(output.indent, 4);
}

#[tokio::test]
async fn test_config_parse_file_not_found() {
    let result = Config::parse_file("nonexistent_file.json").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_config_load_with_overrides() {
    let base = NamedTempFile::new().unwrap();
    fs::write(
        base.path(),
        r#"{"output": {"format": "text", "indent": 2}, "tags": ["base"]}"#,
    )
    .unwrap();
    let first = NamedTempFile::new().unwrap();
    fs::write(first.path(), r#"{"output": {"format": "json"}, "tags": ["first"]}"#).unwrap();
    let second = NamedTempFile::new().unwrap();
    fs::write(second.path(), r#"{"output": {"indent": 8}}"#).unwrap();

    let config = Config::load(Some(base.path()), [first.path(), second.path()])
        .await
        .unwrap();

    let output: OutputConfig = config.get("output").unwrap();
    assert_eq!(output.format, "json");
    assert_eq!(output.indent, 8);
    let tags: Vec<String> = config.get("tags").unwrap();
    assert_eq!(tags, vec!["base", "first"]);
}

#[tokio::test]
async fn test_config_load_without_base() {
    let config = Config::load(None::<&str>, []).await.unwrap();
    assert!(config.is_empty());
}

#[tokio::test]
async fn test_config_merge_objects() {
    let mut base_config = Config::parse(
        r#"
    {
        "output": {
            "format": "text",
            "indent": 2
        }
    }
    "#,
    )
    .unwrap();

    let override_config = Config::parse(
        r#"
    {
        "output": {
            "indent": 4
        },
        "resolver": {
            "full_binding_graph": true
        }
    }
    "#,
    )
    .unwrap();

    base_config.merge_from(override_config).unwrap();

    let output: OutputConfig = base_config.get("output").unwrap();
    assert_eq!(output.format, "text");
    assert_eq!(output.indent, 4);
    let resolver: ResolverConfig = base_config.section().unwrap();
    assert!(resolver.full_binding_graph);
}

#[tokio::test]
async fn test_config_merge_replace_primitives() {
    let mut base_config = Config::parse(r#"{"level": "info", "tags": ["a"]}"#).unwrap();
    let override_config = Config::parse(r#"{"level": "debug", "tags": "none"}"#).unwrap();

    base_config.merge_from(override_config).unwrap();

    let level: String = base_config.get("level").unwrap();
    assert_eq!(level, "debug");
    let tags: String = base_config.get("tags").unwrap();
    assert_eq!(tags, "none");
}

#[tokio::test]
async fn test_tracing_config() {
    let config = Config::parse(
        r#"{"tracing": {"level": "info", "directives": ["diode_graph=trace"]}}"#,
    )
    .unwrap();

    let tracing_config: TracingConfig = config.section().unwrap();
    assert_eq!(tracing_config.level, tracing::Level::INFO);
    let tracing = Tracing::from_config(tracing_config).unwrap();
    assert_eq!(tracing.level(), tracing::Level::INFO);
    assert_eq!(tracing.directives().len(), 1);
}

#[tokio::test]
async fn test_tracing_config_defaults() {
    let config = Config::parse(r#"{"tracing": {}}"#).unwrap();

    let tracing_config: TracingConfig = config.section().unwrap();
    assert_eq!(tracing_config.level, tracing::Level::WARN);
    assert!(tracing_config.directives.is_empty());
}

#[tokio::test]
async fn test_tracing_config_invalid_level() {
    let config = Config::parse(r#"{"tracing": {"level": "loud"}}"#).unwrap();

    assert!(config.section::<TracingConfig>().is_err());
}

#[tokio::test]
async fn test_tracing_without_section() {
    let config = Config::new();

    assert!(Tracing::init(&config).unwrap().is_none());
}
