//! # diode-graph-base
//!
//! Tooling around [`diode_graph`]: configuration, tracing setup, graph
//! summaries and the `diode-graph` command line tool.
//!
//! ## Core Components
//!
//! - **Configuration System**: JSON config files made of named sections,
//!   merged from a base file and overrides
//! - **Tracing Integration**: `tracing-subscriber` setup from the `tracing`
//!   section
//! - **Command System**: CLI subcommands that resolve programs and print
//!   their binding graphs
//! - **Graph Summary**: A serializable digest of a resolved binding graph
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use diode_graph_base::Tool;
//! use std::process::ExitCode;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> ExitCode {
//!     Tool::new().run_main().await
//! }
//! ```
//!
//! ## Configuration Example
//!
//! ```rust
//! use diode_graph_base::{Config, ResolverConfig};
//!
//! let config = Config::parse(r#"{"resolver": {"full_binding_graph": true}}"#).unwrap();
//! let resolver: ResolverConfig = config.section().unwrap();
//! assert!(resolver.full_binding_graph);
//! ```

mod command;
mod config;
mod summary;
mod tracing;

pub use command::*;
pub use config::*;
pub use summary::*;
pub use tracing::*;

pub use async_trait::async_trait;

pub type StdError = Box<dyn std::error::Error + Send + Sync>;
