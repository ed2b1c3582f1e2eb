use std::collections::HashMap;
use std::rc::Rc;

use petgraph::stable_graph::NodeIndex;
use petgraph::visit::{Dfs, EdgeRef, NodeIndexable};
use petgraph::Direction;
use tracing::debug;

use crate::binding::{Binding, BindingKind};
use crate::component::ComponentPath;
use crate::graph_factory::LegacyBindingGraph;
use crate::key::Key;
use crate::network::{
    BindingGraph, BindingNode, ChildFactoryMethodEdge, ComponentNode, DependencyEdge, Edge,
    MissingBinding, Network, Node, SubcomponentCreatorBindingEdge, TopLevelBindingGraph,
};
use crate::request::DependencyRequest;
use crate::resolver::ResolvedBindings;

/// Converts a tree of per-component resolution results into one network.
#[derive(Default)]
pub struct BindingGraphConverter {}

impl BindingGraphConverter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn convert(&self, legacy: &LegacyBindingGraph, full_binding_graph: bool) -> BindingGraph {
        let mut traverser = Traverser::new(legacy.component_path().clone());
        traverser.visit_component(legacy, None);
        let mut network = traverser.network;
        let root = traverser.root.unwrap_or_else(|| panic!("root component was not visited"));
        if !full_binding_graph {
            let mut reachable = vec![false; network.node_bound()];
            let mut dfs = Dfs::new(&network, root);
            while let Some(node) = dfs.next(&network) {
                reachable[node.index()] = true;
            }
            let unreachable: Vec<NodeIndex> = network
                .node_indices()
                .filter(|v| !reachable[v.index()])
                .collect();
            for node in &unreachable {
                network.remove_node(*node);
            }
            debug!(removed = unreachable.len(), "pruned unreachable nodes");
        }
        debug!(
            component = %legacy.component_path(),
            nodes = network.node_count(),
            edges = network.edge_count(),
            "converted binding graph"
        );
        let top_level = Rc::new(TopLevelBindingGraph::new(network, full_binding_graph));
        BindingGraph::new(top_level, legacy.component_path().clone())
    }
}

struct Traverser {
    network: Network,
    root_path: ComponentPath,
    root: Option<NodeIndex>,
    component_nodes: HashMap<ComponentPath, NodeIndex>,
    binding_nodes: HashMap<(ComponentPath, Rc<Binding>), NodeIndex>,
    missing_nodes: HashMap<Key, NodeIndex>,
}

impl Traverser {
    fn new(root_path: ComponentPath) -> Self {
        Self {
            network: Network::default(),
            root_path,
            root: None,
            component_nodes: HashMap::new(),
            binding_nodes: HashMap::new(),
            missing_nodes: HashMap::new(),
        }
    }

    fn visit_component(&mut self, graph: &LegacyBindingGraph, parent: Option<NodeIndex>) {
        let path = graph.component_path().clone();
        let current = self.component_node(&path, graph);
        if parent.is_none() {
            self.root = Some(current);
        }
        for method in graph.component_descriptor().entry_point_methods() {
            if let Some(request) = &method.dependency_request {
                self.add_dependency_edges(graph, current, request);
            }
        }
        let resolved: Vec<&Rc<ResolvedBindings>> = graph
            .members_injection_bindings()
            .values()
            .chain(graph.contribution_bindings().values())
            .collect();
        for bindings in resolved {
            for node in self.binding_nodes(graph, bindings) {
                let Node::Binding(binding) = &self.network[node] else {
                    continue;
                };
                if binding.binding().kind() == BindingKind::SubcomponentCreator
                    && *binding.component_path() == path
                {
                    let creator = binding.key().clone();
                    let child = self.subcomponent_node(graph, &creator);
                    let declaring_modules = bindings
                        .subcomponent_declarations()
                        .iter()
                        .map(|v| v.contributing_module.clone())
                        .collect();
                    let exists = self.has_edge(node, child, |v| {
                        matches!(v, Edge::SubcomponentCreatorBinding(_))
                    });
                    if !exists {
                        let edge = SubcomponentCreatorBindingEdge { declaring_modules };
                        self.network
                            .add_edge(node, child, Edge::SubcomponentCreatorBinding(edge));
                    }
                }
            }
        }
        for subgraph in graph.subgraphs() {
            self.visit_component(subgraph, Some(current));
            let child = self.component_node(subgraph.component_path(), subgraph);
            if let Some(method) = graph
                .component_descriptor()
                .get_factory_method_for_child_component(subgraph.component_descriptor())
            {
                self.network.add_edge(
                    current,
                    child,
                    Edge::ChildFactoryMethod(ChildFactoryMethodEdge {
                        factory_method: method.element.clone(),
                    }),
                );
            }
        }
    }

    fn component_node(&mut self, path: &ComponentPath, graph: &LegacyBindingGraph) -> NodeIndex {
        if let Some(&node) = self.component_nodes.get(path) {
            return node;
        }
        let node = self.network.add_node(Node::Component(ComponentNode::new(
            path.clone(),
            graph.component_descriptor().clone(),
        )));
        self.component_nodes.insert(path.clone(), node);
        node
    }

    /// Node of the child created by the creator bound to `creator`.
    fn subcomponent_node(&mut self, graph: &LegacyBindingGraph, creator: &Key) -> NodeIndex {
        let Some(name) = creator.ty().name() else {
            panic!("{creator} is not a creator type");
        };
        let child = graph.component_descriptor().get_child_component_with_builder_type(name);
        let path = graph.component_path().child_path(child.type_name());
        if let Some(&node) = self.component_nodes.get(&path) {
            return node;
        }
        let node = self
            .network
            .add_node(Node::Component(ComponentNode::new(path.clone(), child)));
        self.component_nodes.insert(path, node);
        node
    }

    fn add_dependency_edges(
        &mut self,
        graph: &LegacyBindingGraph,
        source: NodeIndex,
        request: &DependencyRequest,
    ) {
        let resolved = graph.resolved_bindings(request.kind, &request.key);
        match resolved {
            Some(bindings) if !bindings.is_empty() => {
                for target in self.binding_nodes(graph, bindings) {
                    self.add_dependency_edge(source, request, target);
                }
            }
            _ => {
                let target = self.missing_binding_node(&request.key);
                self.add_dependency_edge(source, request, target);
            }
        }
    }

    fn add_dependency_edge(
        &mut self,
        source: NodeIndex,
        request: &DependencyRequest,
        target: NodeIndex,
    ) {
        let exists = self.has_edge(source, target, |v| {
            matches!(v, Edge::Dependency(edge) if edge.request == *request)
        });
        if !exists {
            let entry_point = matches!(self.network[source], Node::Component(_));
            self.network.add_edge(
                source,
                target,
                Edge::Dependency(DependencyEdge {
                    request: request.clone(),
                    entry_point,
                }),
            );
        }
    }

    fn has_edge(
        &self,
        source: NodeIndex,
        target: NodeIndex,
        predicate: impl Fn(&Edge) -> bool,
    ) -> bool {
        self.network
            .edges_directed(source, Direction::Outgoing)
            .any(|v| v.target() == target && predicate(v.weight()))
    }

    /// Nodes of the bindings in `bindings`, adding new nodes and their
    /// dependency edges.
    fn binding_nodes(
        &mut self,
        graph: &LegacyBindingGraph,
        bindings: &ResolvedBindings,
    ) -> Vec<NodeIndex> {
        let mut nodes = Vec::new();
        for (owner, owned) in bindings.all_bindings() {
            let path = self.path_to_ancestor(graph.component_path(), owner);
            for binding in owned {
                let memo = (path.clone(), binding.clone());
                if let Some(&node) = self.binding_nodes.get(&memo) {
                    nodes.push(node);
                    continue;
                }
                let node = self.network.add_node(Node::Binding(BindingNode::new(
                    path.clone(),
                    binding.clone(),
                    bindings.multibinding_declarations().to_vec(),
                    bindings.optional_binding_declarations().to_vec(),
                    bindings.subcomponent_declarations().to_vec(),
                )));
                self.binding_nodes.insert(memo, node);
                for request in binding.dependencies() {
                    self.add_dependency_edges(graph, node, request);
                }
                nodes.push(node);
            }
        }
        nodes
    }

    /// Missing bindings are anchored at the root so that every dependent of a
    /// missing key points at the same node.
    fn missing_binding_node(&mut self, key: &Key) -> NodeIndex {
        if let Some(&node) = self.missing_nodes.get(key) {
            return node;
        }
        let missing = MissingBinding::new(self.root_path.clone(), key.clone());
        let node = self.network.add_node(Node::MissingBinding(missing));
        self.missing_nodes.insert(key.clone(), node);
        node
    }

    /// Prefix of `path` ending at the component named `ancestor`.
    fn path_to_ancestor(&self, path: &ComponentPath, ancestor: &str) -> ComponentPath {
        match path.prefix_to(ancestor) {
            Some(path) => path,
            None => panic!("{ancestor} is not an ancestor of {path}"),
        }
    }
}
