use clap::{Arg, ArgMatches, Command as ClapCommand};
use diode_graph_base::{
    Command, CommandRegistry, ComponentsCommand, Config, ConfigCommand, Context, GraphSummary,
    ResolveCommand, ResolveTarget, Tool, load_program, summarize,
};
use serde_json::json;
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use tempfile::NamedTempFile;

struct MockCommand;

impl Command for MockCommand {
    fn command() -> ClapCommand {
        ClapCommand::new("mock")
            .about("Mock command for testing")
            .arg(Arg::new("test-arg").long("test-arg"))
    }

    async fn main(_ctx: Arc<Context>, matches: ArgMatches) -> ExitCode {
        if matches.get_one::<String>("test-arg").is_some() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

struct ConfigCheckCommand;

impl Command for ConfigCheckCommand {
    fn command() -> ClapCommand {
        ClapCommand::new("config-check")
    }

    async fn main(ctx: Arc<Context>, _matches: ArgMatches) -> ExitCode {
        match ctx.config().get::<Option<String>>("marker") {
            Ok(Some(v)) if v == "set" => ExitCode::SUCCESS,
            _ => ExitCode::FAILURE,
        }
    }
}

struct DefaultCommand;

impl Command for DefaultCommand {
    fn command() -> ClapCommand {
        ClapCommand::new("default")
    }
}

fn program() -> serde_json::Value {
    json!({
        "injectables": [
            {"name": "Engine", "constructor": {}},
            {"name": "Car", "constructor": {"params": [{"name": "engine", "type": "Engine"}]}},
            {"name": "Wheel", "constructor": {"params": [{"name": "tire", "type": "Tire"}]}}
        ],
        "modules": [{
            "name": "GarageModule",
            "methods": [{"name": "spare", "kind": "provides", "return_type": "Wheel"}]
        }],
        "components": [
            {
                "name": "Garage",
                "kind": "component",
                "methods": [
                    {"name": "car", "return_type": "Car"},
                    {"name": "workshop", "return_type": "Workshop"}
                ]
            },
            {
                "name": "Workshop",
                "kind": "subcomponent",
                "methods": [{"name": "wheel", "return_type": "Wheel"}]
            }
        ]
    })
}

fn program_file() -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    fs::write(file.path(), program().to_string()).unwrap();
    file
}

#[tokio::test]
async fn test_command_registry_new() {
    let registry = CommandRegistry::default();
    assert_eq!(registry.len(), 0);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_command_registry_add_command() {
    let mut registry = CommandRegistry::default();
    registry.add_command::<MockCommand>();
    registry.add_command::<MockCommand>();
    registry.add_command::<DefaultCommand>();

    assert_eq!(registry.len(), 2);
    assert!(registry.has_command::<MockCommand>());
    assert!(!registry.has_command::<ConfigCommand>());
}

#[tokio::test]
async fn test_command_registry_build_cli() {
    let mut registry = CommandRegistry::default();
    registry.add_command::<MockCommand>();
    registry.add_command::<DefaultCommand>();

    let cli = registry.build_cli();
    let names: Vec<_> = cli.get_subcommands().map(|v| v.get_name()).collect();
    assert_eq!(names, vec!["default", "mock"]);
    assert!(cli.get_arguments().any(|v| v.get_id() == "config"));
    assert!(cli.get_arguments().any(|v| v.get_id() == "config-override"));
}

#[tokio::test]
async fn test_command_registry_run_main() {
    let mut registry = CommandRegistry::default();
    registry.add_command::<MockCommand>();
    registry.add_command::<DefaultCommand>();
    let ctx = Arc::new(Context::default());

    let matches = registry
        .build_cli()
        .try_get_matches_from(["diode-graph", "mock", "--test-arg", "value"])
        .unwrap();
    assert_eq!(registry.run_main(ctx.clone(), matches).await, ExitCode::SUCCESS);

    let matches = registry
        .build_cli()
        .try_get_matches_from(["diode-graph", "mock"])
        .unwrap();
    assert_eq!(registry.run_main(ctx.clone(), matches).await, ExitCode::FAILURE);

    let matches = registry
        .build_cli()
        .try_get_matches_from(["diode-graph", "default"])
        .unwrap();
    assert_eq!(registry.run_main(ctx, matches).await, ExitCode::FAILURE);
}

#[tokio::test]
async fn test_tool_default_commands() {
    let tool = Tool::new();
    assert!(tool.has_command::<ResolveCommand>());
    assert!(tool.has_command::<ComponentsCommand>());
    assert!(tool.has_command::<ConfigCommand>());
    assert!(!tool.has_command::<MockCommand>());
}

#[tokio::test]
async fn test_tool_requires_subcommand() {
    let code = Tool::new().run_from(["diode-graph"]).await;
    assert_eq!(code, ExitCode::FAILURE);
}

#[tokio::test]
async fn test_tool_loads_config_overrides() {
    let base = NamedTempFile::new().unwrap();
    fs::write(base.path(), r#"{"marker": "unset"}"#).unwrap();
    let overrides = NamedTempFile::new().unwrap();
    fs::write(overrides.path(), r#"{"marker": "set"}"#).unwrap();
    let mut tool = Tool::new();
    tool.add_command::<ConfigCheckCommand>();

    let code = tool
        .run_from([
            "diode-graph",
            "config-check",
            "--config",
            base.path().to_str().unwrap(),
            "--config-override",
            overrides.path().to_str().unwrap(),
        ])
        .await;
    assert_eq!(code, ExitCode::SUCCESS);
}

#[tokio::test]
async fn test_tool_with_config() {
    let mut tool = Tool::new();
    tool.add_command::<ConfigCheckCommand>();
    let tool = tool.with_config(Config::new().with("marker", "set"));

    let code = tool.run_from(["diode-graph", "config-check"]).await;
    assert_eq!(code, ExitCode::SUCCESS);
}

#[tokio::test]
async fn test_tool_missing_config_file() {
    let code = Tool::new()
        .run_from(["diode-graph", "config", "--config", "nonexistent_file.json"])
        .await;
    assert_eq!(code, ExitCode::FAILURE);
}

#[tokio::test]
async fn test_resolve_command() {
    let file = program_file();
    let path = file.path().to_str().unwrap();

    let code = Tool::new()
        .run_from(["diode-graph", "resolve", path, "--component", "Garage"])
        .await;
    assert_eq!(code, ExitCode::SUCCESS);

    let code = Tool::new()
        .run_from(["diode-graph", "resolve", path, "--json", "--full"])
        .await;
    assert_eq!(code, ExitCode::SUCCESS);

    let code = Tool::new()
        .run_from(["diode-graph", "resolve", path, "--module", "GarageModule"])
        .await;
    assert_eq!(code, ExitCode::SUCCESS);
}

#[tokio::test]
async fn test_resolve_command_unknown_component() {
    let file = program_file();
    let path = file.path().to_str().unwrap();

    let code = Tool::new()
        .run_from(["diode-graph", "resolve", path, "--component", "Unknown"])
        .await;
    assert_eq!(code, ExitCode::FAILURE);
}

#[tokio::test]
async fn test_resolve_command_conflicting_targets() {
    let file = program_file();
    let path = file.path().to_str().unwrap();

    let code = Tool::new()
        .run_from([
            "diode-graph",
            "resolve",
            path,
            "--component",
            "Garage",
            "--module",
            "GarageModule",
        ])
        .await;
    assert_eq!(code, ExitCode::FAILURE);
}

#[tokio::test]
async fn test_components_command() {
    let file = program_file();
    let path = file.path().to_str().unwrap();

    let code = Tool::new().run_from(["diode-graph", "components", path]).await;
    assert_eq!(code, ExitCode::SUCCESS);

    let code = Tool::new()
        .run_from(["diode-graph", "components", "nonexistent_file.json"])
        .await;
    assert_eq!(code, ExitCode::FAILURE);
}

#[tokio::test]
async fn test_load_program() {
    let file = program_file();

    let program = load_program(file.path()).await.unwrap();
    let names: Vec<_> = program.root_components().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["Garage"]);
}

#[tokio::test]
async fn test_summarize_component() {
    let program = serde_json::from_value(program()).unwrap();

    let summaries = summarize(program, &ResolveTarget::Component("Garage".into()), false).unwrap();
    assert_eq!(summaries.len(), 1);
    let garage = &summaries[0];
    assert_eq!(garage.component, "Garage");
    assert!(!garage.full_binding_graph);
    assert_eq!(garage.entry_points, vec!["Car"]);
    let mut keys: Vec<_> = garage.bindings.iter().map(|v| v.key.as_str()).collect();
    keys.sort();
    assert_eq!(keys, vec!["Car", "Engine"]);
    let car = garage.bindings.iter().find(|v| v.key == "Car").unwrap();
    assert_eq!(car.dependencies, vec!["Engine"]);
    assert!(garage.cycles.is_empty());

    assert_eq!(garage.subcomponents.len(), 1);
    let workshop = &garage.subcomponents[0];
    assert_eq!(workshop.component, "Garage → Workshop");
    assert_eq!(workshop.missing_bindings, vec!["Tire"]);
    assert!(garage.has_missing_bindings());
}

#[tokio::test]
async fn test_summarize_serializes() {
    let program = serde_json::from_value(program()).unwrap();

    let summaries = summarize(program, &ResolveTarget::RootComponents, false).unwrap();
    let value = serde_json::to_value(&summaries).unwrap();
    let parsed: Vec<GraphSummary> = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, summaries);
    assert!(summaries[0].to_string().starts_with("Garage\n"));
}

#[tokio::test]
async fn test_summarize_cycle() {
    let program = serde_json::from_value(json!({
        "injectables": [
            {"name": "Chicken", "constructor": {"params": [{"name": "egg", "type": "Egg"}]}},
            {"name": "Egg", "constructor": {"params": [{"name": "chicken", "type": "Chicken"}]}}
        ],
        "components": [{
            "name": "Farm",
            "kind": "component",
            "methods": [{"name": "chicken", "return_type": "Chicken"}]
        }]
    }))
    .unwrap();

    let summaries = summarize(program, &ResolveTarget::Component("Farm".into()), false).unwrap();
    assert_eq!(summaries[0].cycles.len(), 1);
    assert_eq!(summaries[0].cycles[0].len(), 2);
}
