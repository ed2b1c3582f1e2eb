//! # diode-graph
//!
//! Binding graph construction for compile-time dependency injection.
//!
//! The crate takes a declarative description of a program (injectable types,
//! modules, components and their methods), resolves every key a component
//! needs to the binding that satisfies it, and returns the result as one
//! network of component, binding and missing binding nodes.
//!
//! ## Core Concepts
//!
//! - **Key**: A type, an optional qualifier and, for multibinding
//!   contributions, the identifier of the contributing method
//! - **Binding**: How a key is satisfied: an `@Inject` constructor, a module
//!   method, a component dependency, a synthetic multibinding and so on
//! - **Component**: A root of the graph. Subcomponents inherit the bindings
//!   of their ancestors
//! - **Resolver**: Resolves keys for one component and decides which
//!   component of the tree owns each binding
//! - **BindingGraph**: A per-component view of the resolved network
//!
//! Missing bindings, duplicates, scope mismatches and dependency cycles are
//! not errors. They stay in the graph for validation to report.
//!
//! ## Basic Usage
//!
//! ```rust
//! use diode_graph::{Key, Program, Session, TypeName};
//!
//! let program: Program = serde_json::from_value(serde_json::json!({
//!     "injectables": [
//!         {"name": "Engine", "constructor": {"params": []}},
//!         {"name": "Car", "constructor": {"params": [{"name": "engine", "type": "Engine"}]}}
//!     ],
//!     "components": [
//!         {
//!             "name": "Garage",
//!             "kind": "component",
//!             "methods": [{"name": "car", "return_type": "Car"}]
//!         }
//!     ]
//! }))
//! .unwrap();
//!
//! let session = Session::new(program);
//! let graph = session.create_binding_graph("Garage", false).unwrap();
//! let engine = graph.binding(&Key::of(TypeName::simple("Engine"))).unwrap();
//! assert_eq!(engine.component_path().current_component(), "Garage");
//! assert!(graph.missing_bindings().is_empty());
//! ```

mod binding;
mod binding_factory;
mod component;
mod converter;
mod declarations;
mod error;
mod graph_factory;
mod key;
mod model;
mod network;
mod request;
mod resolver;
mod session;
mod types;

pub use binding::*;
pub use binding_factory::BindingFactory;
pub use component::*;
pub use converter::*;
pub use declarations::{
    DelegateDeclaration, ModuleDescriptor, ModuleKind, MultibindingDeclaration,
    OptionalBindingDeclaration, SubcomponentDeclaration,
};
pub use error::*;
pub use graph_factory::*;
pub use key::{Key, MultibindingContributionIdentifier, Qualifier};
pub use model::*;
pub use network::*;
pub use request::*;
pub use resolver::{ResolvedBindings, ResolverId, Resolvers};
pub use session::*;
pub use types::*;
