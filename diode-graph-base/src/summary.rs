use std::fmt;

use diode_graph::BindingGraph;
use serde::{Deserialize, Serialize};

/// Printable digest of a resolved component and its subcomponents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub component: String,
    pub full_binding_graph: bool,
    pub entry_points: Vec<String>,
    pub bindings: Vec<BindingSummary>,
    pub missing_bindings: Vec<String>,
    /// Dependency cycles among the bindings owned by this component, each
    /// listed by node.
    pub cycles: Vec<Vec<String>>,
    pub requirements: Vec<String>,
    pub subcomponents: Vec<GraphSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSummary {
    pub key: String,
    pub kind: String,
    pub dependencies: Vec<String>,
}

impl GraphSummary {
    pub fn new(graph: &BindingGraph) -> Self {
        let top_level = graph.top_level();
        let entry_points = graph
            .entry_point_edges()
            .into_iter()
            .map(|(edge, _)| edge.request.key.to_string())
            .collect();
        let bindings = graph
            .binding_nodes()
            .into_iter()
            .map(|v| BindingSummary {
                key: v.key().to_string(),
                kind: v.binding().kind().name().to_owned(),
                dependencies: v
                    .binding()
                    .dependencies()
                    .iter()
                    .map(|v| v.key.to_string())
                    .collect(),
            })
            .collect();
        let missing_bindings = graph
            .missing_bindings()
            .into_iter()
            .map(|v| v.key().to_string())
            .collect();
        let cycles = graph
            .strongly_connected_components()
            .into_iter()
            .filter(|v| {
                v.len() > 1 || v.iter().any(|node| top_level.network().contains_edge(*node, *node))
            })
            .map(|v| v.iter().map(|node| top_level.node(*node).to_string()).collect())
            .collect();
        let requirements = graph
            .component_requirements()
            .into_iter()
            .map(|v| v.type_name())
            .collect();
        Self {
            component: graph.component_path().to_string(),
            full_binding_graph: graph.is_full_binding_graph(),
            entry_points,
            bindings,
            missing_bindings,
            cycles,
            requirements,
            subcomponents: graph.subgraphs().iter().map(Self::new).collect(),
        }
    }

    /// Whether this component or any subcomponent has a missing binding.
    pub fn has_missing_bindings(&self) -> bool {
        !self.missing_bindings.is_empty()
            || self.subcomponents.iter().any(|v| v.has_missing_bindings())
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        writeln!(f, "{indent}{}", self.component)?;
        for binding in &self.bindings {
            write!(f, "{indent}  {} [{}]", binding.key, binding.kind)?;
            if !binding.dependencies.is_empty() {
                write!(f, " <- {}", binding.dependencies.join(", "))?;
            }
            writeln!(f)?;
        }
        for key in &self.missing_bindings {
            writeln!(f, "{indent}  missing: {key}")?;
        }
        for cycle in &self.cycles {
            writeln!(f, "{indent}  cycle: {}", cycle.join(" -> "))?;
        }
        if !self.requirements.is_empty() {
            writeln!(f, "{indent}  requires: {}", self.requirements.join(", "))?;
        }
        for subcomponent in &self.subcomponents {
            subcomponent.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for GraphSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
