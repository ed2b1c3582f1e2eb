//! Command line interface of the `diode-graph` tool.
//!
//! # Core Concepts
//!
//! - **Command**: A trait for defining CLI subcommands
//! - **CommandRegistry**: Container for all registered commands
//! - **Tool**: Parses arguments, loads the configuration, installs tracing
//!   and dispatches to the selected command
//!
//! # Examples
//!
//! ```rust
//! use diode_graph_base::{Command, Context};
//! use clap::{ArgMatches, Command as ClapCommand};
//! use std::process::ExitCode;
//! use std::sync::Arc;
//!
//! struct HelloCommand;
//!
//! impl Command for HelloCommand {
//!     fn command() -> ClapCommand {
//!         ClapCommand::new("hello").about("Prints a greeting")
//!     }
//!
//!     async fn main(_ctx: Arc<Context>, _matches: ArgMatches) -> ExitCode {
//!         println!("Hello, World!");
//!         ExitCode::SUCCESS
//!     }
//! }
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::ffi::OsString;
use std::marker::PhantomData;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches};
use diode_graph::{GraphError, Program, Session};
use tracing::{debug, error};

use crate::{Config, GraphSummary, ResolverConfig, StdError, Tracing};

/// State shared by every command of one tool invocation.
#[derive(Debug, Default)]
pub struct Context {
    config: Config,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// A subcommand of the tool.
pub trait Command {
    /// Defines the name, arguments and help of the subcommand.
    fn command() -> clap::Command
    where
        Self: Sized;

    /// Runs the subcommand with its parsed arguments.
    fn main(ctx: Arc<Context>, matches: ArgMatches) -> impl std::future::Future<Output = ExitCode> {
        let _ = (ctx, matches);
        async move { ExitCode::FAILURE }
    }
}

#[async_trait(?Send)]
trait DynCommand {
    fn command(&self) -> clap::Command;

    async fn main(&self, ctx: Arc<Context>, matches: ArgMatches) -> ExitCode;
}

#[async_trait(?Send)]
impl<T> DynCommand for T
where
    T: Command,
{
    fn command(&self) -> clap::Command {
        T::command()
    }

    async fn main(&self, ctx: Arc<Context>, matches: ArgMatches) -> ExitCode {
        T::main(ctx, matches).await
    }
}

#[derive(Default)]
#[doc(hidden)]
pub struct CommandRegistry {
    commands: HashMap<TypeId, Box<dyn DynCommand>>,
}

impl CommandRegistry {
    pub fn add_command<T>(&mut self)
    where
        T: Command + 'static,
    {
        let type_id = TypeId::of::<T>();
        self.commands
            .insert(type_id, Box::new(CommandWrapper::<T>(PhantomData)));
    }

    pub fn has_command<T>(&self) -> bool
    where
        T: Command + 'static,
    {
        let type_id = TypeId::of::<T>();
        self.commands.contains_key(&type_id)
    }

    /// Root command with one subcommand per registered command.
    pub fn build_cli(&self) -> clap::Command {
        let mut commands: Vec<clap::Command> =
            self.commands.values().map(|v| v.command()).collect();
        commands.sort_by(|a, b| a.get_name().cmp(b.get_name()));
        clap::Command::new("diode-graph")
            .about("Resolves dependency injection binding graphs")
            .subcommand_required(true)
            .arg(Arg::new("config").long("config").short('c').global(true))
            .arg(
                Arg::new("config-override")
                    .long("config-override")
                    .short('o')
                    .action(ArgAction::Append)
                    .global(true),
            )
            .subcommands(commands)
    }

    pub async fn run_main(&self, ctx: Arc<Context>, mut matches: ArgMatches) -> ExitCode {
        let Some((name, matches)) = matches.remove_subcommand() else {
            return ExitCode::FAILURE;
        };
        let Some(command) = self
            .commands
            .values()
            .find(|v| v.command().get_name() == name)
        else {
            eprintln!("unknown command: {name}");
            return ExitCode::FAILURE;
        };
        debug!(command = %name, "running command");
        command.main(ctx, matches).await
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

struct CommandWrapper<T>(PhantomData<T>)
where
    T: Command;

impl<T> Command for CommandWrapper<T>
where
    T: Command,
{
    fn command() -> clap::Command
    where
        Self: Sized,
    {
        T::command()
    }

    async fn main(ctx: Arc<Context>, matches: ArgMatches) -> ExitCode {
        T::main(ctx, matches).await
    }
}

/// Entry point of the tool.
pub struct Tool {
    registry: CommandRegistry,
    config: Option<Config>,
}

impl Default for Tool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool {
    /// Tool with the built-in `resolve`, `components` and `config` commands.
    pub fn new() -> Self {
        let mut tool = Self {
            registry: CommandRegistry::default(),
            config: None,
        };
        tool.add_command::<ResolveCommand>()
            .add_command::<ComponentsCommand>()
            .add_command::<ConfigCommand>();
        tool
    }

    pub fn add_command<T>(&mut self) -> &mut Self
    where
        T: Command + 'static,
    {
        self.registry.add_command::<T>();
        self
    }

    pub fn has_command<T>(&self) -> bool
    where
        T: Command + 'static,
    {
        self.registry.has_command::<T>()
    }

    /// Uses `config` instead of loading `--config` files.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub async fn run_main(self) -> ExitCode {
        self.run_from(std::env::args_os()).await
    }

    pub async fn run_from<I, T>(self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = match self.registry.build_cli().try_get_matches_from(args) {
            Ok(v) => v,
            Err(err) => {
                let _ = err.print();
                return if err.use_stderr() {
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                };
            }
        };
        let config = match self.config {
            Some(v) => v,
            None => {
                let overrides = matches
                    .get_many::<String>("config-override")
                    .unwrap_or_default();
                match Config::load(matches.get_one::<String>("config"), overrides).await {
                    Ok(v) => v,
                    Err(err) => {
                        eprintln!("cannot load config: {err}");
                        return ExitCode::FAILURE;
                    }
                }
            }
        };
        if let Err(err) = Tracing::init(&config) {
            eprintln!("cannot setup tracing: {err}");
            return ExitCode::FAILURE;
        }
        self.registry
            .run_main(Arc::new(Context::new(config)), matches)
            .await
    }
}

/// Reads a JSON program description.
pub async fn load_program(path: impl AsRef<Path>) -> Result<Program, StdError> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}

/// What the `resolve` command builds graphs for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveTarget {
    Component(String),
    Module(String),
    /// Every component that is not a subcomponent.
    RootComponents,
}

/// Resolves the graphs of `target` in a fresh session.
pub fn summarize(
    program: Program,
    target: &ResolveTarget,
    full_binding_graph: bool,
) -> Result<Vec<GraphSummary>, GraphError> {
    let session = Session::new(program);
    let graphs = match target {
        ResolveTarget::Component(name) => {
            vec![session.create_binding_graph(name, full_binding_graph)?]
        }
        ResolveTarget::Module(name) => vec![session.create_module_binding_graph(name)?],
        ResolveTarget::RootComponents => {
            let names: Vec<String> = session
                .program()
                .root_components()
                .map(|v| v.name.clone())
                .collect();
            let mut graphs = Vec::new();
            for name in names {
                graphs.push(session.create_binding_graph(&name, full_binding_graph)?);
            }
            graphs
        }
    };
    Ok(graphs.iter().map(GraphSummary::new).collect())
}

pub struct ResolveCommand;

impl Command for ResolveCommand {
    fn command() -> clap::Command
    where
        Self: Sized,
    {
        clap::Command::new("resolve")
            .about("Resolves binding graphs and prints them")
            .arg(Arg::new("program").required(true).help("Program description in JSON"))
            .arg(
                Arg::new("component")
                    .long("component")
                    .help("Component to resolve, all root components by default"),
            )
            .arg(
                Arg::new("module")
                    .long("module")
                    .conflicts_with("component")
                    .help("Module to resolve as if installed in a component"),
            )
            .arg(
                Arg::new("full")
                    .long("full")
                    .action(ArgAction::SetTrue)
                    .help("Resolve every installed binding"),
            )
            .arg(Arg::new("json").long("json").action(ArgAction::SetTrue))
    }

    async fn main(ctx: Arc<Context>, matches: ArgMatches) -> ExitCode {
        let Some(path) = matches.get_one::<String>("program") else {
            return ExitCode::FAILURE;
        };
        let program = match load_program(path).await {
            Ok(v) => v,
            Err(err) => {
                eprintln!("cannot load program {path}: {err}");
                return ExitCode::FAILURE;
            }
        };
        let resolver = match ctx.config().section::<ResolverConfig>() {
            Ok(v) => v,
            Err(err) => {
                eprintln!("invalid resolver config: {err}");
                return ExitCode::FAILURE;
            }
        };
        let target = match (
            matches.get_one::<String>("component"),
            matches.get_one::<String>("module"),
        ) {
            (Some(name), _) => ResolveTarget::Component(name.clone()),
            (None, Some(name)) => ResolveTarget::Module(name.clone()),
            (None, None) => ResolveTarget::RootComponents,
        };
        let full_binding_graph = matches.get_flag("full") || resolver.full_binding_graph;
        let summaries = match summarize(program, &target, full_binding_graph) {
            Ok(v) => v,
            Err(err) => {
                error!(program = %path, %err, "cannot resolve binding graph");
                eprintln!("cannot resolve binding graph: {err}");
                return ExitCode::FAILURE;
            }
        };
        if matches.get_flag("json") {
            match serde_json::to_string_pretty(&summaries) {
                Ok(v) => println!("{v}"),
                Err(err) => {
                    eprintln!("cannot serialize summary: {err}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            for summary in &summaries {
                print!("{summary}");
            }
        }
        ExitCode::SUCCESS
    }
}

pub struct ComponentsCommand;

impl Command for ComponentsCommand {
    fn command() -> clap::Command
    where
        Self: Sized,
    {
        clap::Command::new("components")
            .about("Lists the root components of a program")
            .arg(Arg::new("program").required(true))
    }

    async fn main(_ctx: Arc<Context>, matches: ArgMatches) -> ExitCode {
        let Some(path) = matches.get_one::<String>("program") else {
            return ExitCode::FAILURE;
        };
        match load_program(path).await {
            Ok(program) => {
                for component in program.root_components() {
                    println!("{}", component.name);
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("cannot load program {path}: {err}");
                ExitCode::FAILURE
            }
        }
    }
}

pub struct ConfigCommand;

impl Command for ConfigCommand {
    fn command() -> clap::Command
    where
        Self: Sized,
    {
        clap::Command::new("config").about("Prints the merged configuration")
    }

    async fn main(ctx: Arc<Context>, _matches: ArgMatches) -> ExitCode {
        match serde_json::to_string_pretty(&ctx.config().configs) {
            Ok(v) => {
                println!("{v}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("cannot serialize config: {err}");
                ExitCode::FAILURE
            }
        }
    }
}
