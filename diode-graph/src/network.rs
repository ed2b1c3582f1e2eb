//! The resolved binding graph as a network of component, binding and
//! missing binding nodes.

use std::cell::OnceCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::binding::Binding;
use crate::component::{
    ComponentDescriptor, ComponentPath, ComponentRequirement, ComponentRequirementKind,
};
use crate::declarations::{
    MultibindingDeclaration, OptionalBindingDeclaration, SubcomponentDeclaration,
};
use crate::key::Key;
use crate::request::{DependencyRequest, ElementId};

#[derive(Clone, Debug)]
pub struct ComponentNode {
    component_path: ComponentPath,
    descriptor: Rc<ComponentDescriptor>,
}

impl ComponentNode {
    pub(crate) fn new(component_path: ComponentPath, descriptor: Rc<ComponentDescriptor>) -> Self {
        Self {
            component_path,
            descriptor,
        }
    }

    pub fn component_path(&self) -> &ComponentPath {
        &self.component_path
    }

    pub fn descriptor(&self) -> &Rc<ComponentDescriptor> {
        &self.descriptor
    }

    pub fn is_subcomponent(&self) -> bool {
        !self.component_path.at_root()
    }

    pub fn is_real_component(&self) -> bool {
        self.descriptor.is_real_component()
    }

    pub fn entry_points(&self) -> impl Iterator<Item = &DependencyRequest> {
        self.descriptor
            .entry_point_methods()
            .filter_map(|v| v.dependency_request.as_ref())
    }
}

/// A binding owned by the component at `component_path`.
#[derive(Clone, Debug)]
pub struct BindingNode {
    component_path: ComponentPath,
    binding: Rc<Binding>,
    multibinding_declarations: Vec<Rc<MultibindingDeclaration>>,
    optional_binding_declarations: Vec<Rc<OptionalBindingDeclaration>>,
    subcomponent_declarations: Vec<Rc<SubcomponentDeclaration>>,
}

impl BindingNode {
    pub(crate) fn new(
        component_path: ComponentPath,
        binding: Rc<Binding>,
        multibinding_declarations: Vec<Rc<MultibindingDeclaration>>,
        optional_binding_declarations: Vec<Rc<OptionalBindingDeclaration>>,
        subcomponent_declarations: Vec<Rc<SubcomponentDeclaration>>,
    ) -> Self {
        Self {
            component_path,
            binding,
            multibinding_declarations,
            optional_binding_declarations,
            subcomponent_declarations,
        }
    }

    pub fn component_path(&self) -> &ComponentPath {
        &self.component_path
    }

    pub fn binding(&self) -> &Rc<Binding> {
        &self.binding
    }

    pub fn key(&self) -> &Key {
        self.binding.key()
    }

    pub fn multibinding_declarations(&self) -> &[Rc<MultibindingDeclaration>] {
        &self.multibinding_declarations
    }

    pub fn optional_binding_declarations(&self) -> &[Rc<OptionalBindingDeclaration>] {
        &self.optional_binding_declarations
    }

    pub fn subcomponent_declarations(&self) -> &[Rc<SubcomponentDeclaration>] {
        &self.subcomponent_declarations
    }
}

/// A key requested somewhere in the graph that nothing binds.
#[derive(Clone, Debug)]
pub struct MissingBinding {
    component_path: ComponentPath,
    key: Key,
}

impl MissingBinding {
    pub(crate) fn new(component_path: ComponentPath, key: Key) -> Self {
        Self { component_path, key }
    }

    pub fn component_path(&self) -> &ComponentPath {
        &self.component_path
    }

    pub fn key(&self) -> &Key {
        &self.key
    }
}

#[derive(Clone, Debug)]
pub enum Node {
    Component(ComponentNode),
    Binding(BindingNode),
    MissingBinding(MissingBinding),
}

impl Node {
    pub fn component_path(&self) -> &ComponentPath {
        match self {
            Node::Component(v) => v.component_path(),
            Node::Binding(v) => v.component_path(),
            Node::MissingBinding(v) => v.component_path(),
        }
    }

    pub fn as_component(&self) -> Option<&ComponentNode> {
        match self {
            Node::Component(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_binding(&self) -> Option<&BindingNode> {
        match self {
            Node::Binding(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_missing_binding(&self) -> Option<&MissingBinding> {
        match self {
            Node::MissingBinding(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Component(v) => write!(f, "component {}", v.component_path),
            Node::Binding(v) => write!(f, "{} in {}", v.binding, v.component_path),
            Node::MissingBinding(v) => write!(f, "missing {}", v.key),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyEdge {
    pub request: DependencyRequest,
    /// The source is a component node, so the request is an entry point.
    pub entry_point: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubcomponentCreatorBindingEdge {
    pub declaring_modules: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildFactoryMethodEdge {
    pub factory_method: ElementId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edge {
    Dependency(DependencyEdge),
    SubcomponentCreatorBinding(SubcomponentCreatorBindingEdge),
    ChildFactoryMethod(ChildFactoryMethodEdge),
}

impl Edge {
    pub fn as_dependency(&self) -> Option<&DependencyEdge> {
        match self {
            Edge::Dependency(v) => Some(v),
            _ => None,
        }
    }
}

pub type Network = StableDiGraph<Node, Edge>;

/// The whole network of a root component and every descendant.
pub struct TopLevelBindingGraph {
    network: Network,
    full_binding_graph: bool,
    root: NodeIndex,
    component_nodes: IndexMap<ComponentPath, NodeIndex>,
    strongly_connected_components: OnceCell<Vec<Vec<NodeIndex>>>,
}

impl TopLevelBindingGraph {
    /// Seals `network`.
    ///
    /// # Panics
    ///
    /// Panics if the network has no component node at a root path or more
    /// than one.
    pub(crate) fn new(network: Network, full_binding_graph: bool) -> Self {
        let mut component_nodes = IndexMap::new();
        let mut roots = Vec::new();
        for index in network.node_indices() {
            if let Node::Component(node) = &network[index] {
                if node.component_path.at_root() {
                    roots.push(index);
                }
                component_nodes.insert(node.component_path.clone(), index);
            }
        }
        assert_eq!(roots.len(), 1, "binding graph must have exactly one root component node");
        Self {
            network,
            full_binding_graph,
            root: roots[0],
            component_nodes,
            strongly_connected_components: OnceCell::new(),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn is_full_binding_graph(&self) -> bool {
        self.full_binding_graph
    }

    pub fn root_component_node(&self) -> &ComponentNode {
        self.component_node_at(self.root)
    }

    pub fn root_index(&self) -> NodeIndex {
        self.root
    }

    pub fn component_index(&self, path: &ComponentPath) -> Option<NodeIndex> {
        self.component_nodes.get(path).copied()
    }

    pub fn component_paths(&self) -> impl Iterator<Item = &ComponentPath> {
        self.component_nodes.keys()
    }

    fn component_node_at(&self, index: NodeIndex) -> &ComponentNode {
        match &self.network[index] {
            Node::Component(node) => node,
            node => panic!("{node} is not a component node"),
        }
    }

    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.network[index]
    }

    pub fn binding_nodes(&self) -> impl Iterator<Item = (NodeIndex, &BindingNode)> {
        self.network
            .node_indices()
            .filter_map(|v| self.network[v].as_binding().map(|node| (v, node)))
    }

    pub fn missing_binding_nodes(&self) -> impl Iterator<Item = (NodeIndex, &MissingBinding)> {
        self.network
            .node_indices()
            .filter_map(|v| self.network[v].as_missing_binding().map(|node| (v, node)))
    }

    pub fn dependency_edges(&self) -> impl Iterator<Item = (EdgeIndex, &DependencyEdge)> {
        self.network
            .edge_indices()
            .filter_map(|v| self.network[v].as_dependency().map(|edge| (v, edge)))
    }

    /// Strongly connected components of the network, each component after
    /// every component it depends on.
    pub fn strongly_connected_components(&self) -> &[Vec<NodeIndex>] {
        self.strongly_connected_components
            .get_or_init(|| tarjan_scc(&self.network))
    }

    /// Whether `component` lies on a dependency cycle.
    fn is_cyclic(&self, component: &[NodeIndex]) -> bool {
        match component {
            [node] => self.network.find_edge(*node, *node).is_some(),
            _ => true,
        }
    }
}

impl fmt::Debug for TopLevelBindingGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopLevelBindingGraph")
            .field("nodes", &self.network.node_count())
            .field("edges", &self.network.edge_count())
            .field("full_binding_graph", &self.full_binding_graph)
            .finish()
    }
}

/// View of the network from one component.
#[derive(Clone)]
pub struct BindingGraph {
    top_level: Rc<TopLevelBindingGraph>,
    component_path: ComponentPath,
    subgraphs: OnceCell<Vec<BindingGraph>>,
}

impl BindingGraph {
    pub(crate) fn new(top_level: Rc<TopLevelBindingGraph>, component_path: ComponentPath) -> Self {
        Self {
            top_level,
            component_path,
            subgraphs: OnceCell::new(),
        }
    }

    pub fn top_level(&self) -> &TopLevelBindingGraph {
        &self.top_level
    }

    pub fn component_path(&self) -> &ComponentPath {
        &self.component_path
    }

    pub fn is_full_binding_graph(&self) -> bool {
        self.top_level.full_binding_graph
    }

    pub fn component_index(&self) -> NodeIndex {
        match self.top_level.component_index(&self.component_path) {
            Some(index) => index,
            None => panic!("no component node for {}", self.component_path),
        }
    }

    pub fn component_node(&self) -> &ComponentNode {
        self.top_level.component_node_at(self.component_index())
    }

    pub fn root_component_node(&self) -> &ComponentNode {
        self.top_level.root_component_node()
    }

    pub fn component_descriptor(&self) -> &Rc<ComponentDescriptor> {
        self.component_node().descriptor()
    }

    /// Binding nodes owned by this component.
    pub fn binding_nodes(&self) -> Vec<&BindingNode> {
        self.top_level
            .binding_nodes()
            .filter(|(_, v)| v.component_path == self.component_path)
            .map(|(_, v)| v)
            .collect()
    }

    /// Bindings for `key` visible from this component, nearest owner first.
    pub fn bindings(&self, key: &Key) -> Vec<&BindingNode> {
        let mut nodes: Vec<&BindingNode> = self
            .top_level
            .binding_nodes()
            .map(|(_, v)| v)
            .filter(|v| v.key() == key && self.is_visible(&v.component_path))
            .collect();
        nodes.sort_by_key(|v| std::cmp::Reverse(v.component_path.components().len()));
        nodes
    }

    /// The binding for `key` owned nearest to this component.
    pub fn binding(&self, key: &Key) -> Option<&BindingNode> {
        self.bindings(key).into_iter().next()
    }

    fn is_visible(&self, owner: &ComponentPath) -> bool {
        self.component_path.components().starts_with(owner.components())
    }

    /// Missing bindings requested by this component or its bindings.
    pub fn missing_bindings(&self) -> Vec<&MissingBinding> {
        let network = self.top_level.network();
        let mut result: IndexSet<NodeIndex> = IndexSet::new();
        for source in self.owned_node_indices() {
            for edge in network.edges_directed(source, Direction::Outgoing) {
                if network[edge.target()].as_missing_binding().is_some() {
                    result.insert(edge.target());
                }
            }
        }
        result
            .into_iter()
            .filter_map(|v| network[v].as_missing_binding())
            .collect()
    }

    fn owned_node_indices(&self) -> Vec<NodeIndex> {
        let mut nodes = vec![self.component_index()];
        nodes.extend(
            self.top_level
                .binding_nodes()
                .filter(|(_, v)| v.component_path == self.component_path)
                .map(|(index, _)| index),
        );
        nodes
    }

    /// Entry point edges from the component node to what they request.
    pub fn entry_point_edges(&self) -> Vec<(&DependencyEdge, NodeIndex)> {
        self.dependency_edges_from(self.component_index())
            .into_iter()
            .filter(|(edge, _)| edge.entry_point)
            .collect()
    }

    pub fn dependency_edges_from(&self, source: NodeIndex) -> Vec<(&DependencyEdge, NodeIndex)> {
        let network = self.top_level.network();
        let mut edges: Vec<(&DependencyEdge, NodeIndex)> = network
            .edges_directed(source, Direction::Outgoing)
            .filter_map(|v| v.weight().as_dependency().map(|edge| (edge, v.target())))
            .collect();
        // Petgraph walks outgoing edges newest first.
        edges.reverse();
        edges
    }

    /// Views of the direct children of this component.
    pub fn subgraphs(&self) -> &[BindingGraph] {
        self.subgraphs.get_or_init(|| {
            self.top_level
                .component_paths()
                .filter(|v| v.parent().as_ref() == Some(&self.component_path))
                .map(|v| BindingGraph::new(self.top_level.clone(), v.clone()))
                .collect()
        })
    }

    /// The parent's method creating this component, if there is one.
    pub fn factory_method(&self) -> Option<&ChildFactoryMethodEdge> {
        let network = self.top_level.network();
        network
            .edges_directed(self.component_index(), Direction::Incoming)
            .find_map(|v| match v.weight() {
                Edge::ChildFactoryMethod(edge) => Some(edge),
                _ => None,
            })
    }

    /// Modules passed as parameters of the factory method, with the
    /// parameter each one is passed as.
    pub fn factory_method_parameters(&self) -> IndexMap<ComponentRequirement, ElementId> {
        let mut parameters = IndexMap::new();
        let Some(edge) = self.factory_method() else {
            return parameters;
        };
        let Some(parent) = self.component_path.parent() else {
            return parameters;
        };
        let Some(parent_index) = self.top_level.component_index(&parent) else {
            return parameters;
        };
        let parent = self.top_level.component_node_at(parent_index).descriptor();
        let Some(method) = parent
            .component_methods()
            .iter()
            .find(|v| v.element == edge.factory_method)
        else {
            return parameters;
        };
        for param in &method.method.params {
            let requirement = ComponentRequirement::for_module(param.ty.clone());
            let element = ElementId::new(edge.factory_method.to_string(), &param.name);
            parameters.insert(requirement, element);
        }
        parameters
    }

    /// Modules, dependencies and bound instances the generated component
    /// needs to be created with.
    ///
    /// Modules are only required when some binding of this component or a
    /// descendant uses one this component installs and no ancestor does.
    pub fn component_requirements(&self) -> Vec<ComponentRequirement> {
        let owned_modules = self.owned_modules();
        let mut used_modules: HashSet<String> = HashSet::new();
        self.collect_binding_modules(&mut used_modules);
        let mut requirements: IndexSet<ComponentRequirement> = self
            .component_descriptor()
            .requirements()
            .into_iter()
            .filter(|v| {
                v.kind != ComponentRequirementKind::Module || {
                    let name = v.type_name();
                    owned_modules.contains(&name) && used_modules.contains(&name)
                }
            })
            .collect();
        requirements.extend(self.factory_method_parameters().into_keys());
        requirements.into_iter().collect()
    }

    fn owned_modules(&self) -> HashSet<String> {
        let mut inherited: HashSet<&str> = HashSet::new();
        let mut path = self.component_path.parent();
        while let Some(ancestor) = path {
            if let Some(index) = self.top_level.component_index(&ancestor) {
                let descriptor = self.top_level.component_node_at(index).descriptor();
                inherited.extend(descriptor.modules().iter().map(|v| v.module_type.as_str()));
            }
            path = ancestor.parent();
        }
        self.component_descriptor()
            .modules()
            .iter()
            .map(|v| v.module_type.clone())
            .filter(|v| !inherited.contains(v.as_str()))
            .collect()
    }

    fn collect_binding_modules(&self, modules: &mut HashSet<String>) {
        for node in self.binding_nodes() {
            if node.binding.requires_module_instance()
                && let Some(module) = node.binding.contributing_module()
            {
                modules.insert(module.to_owned());
            }
        }
        for subgraph in self.subgraphs() {
            subgraph.collect_binding_modules(modules);
        }
    }

    /// Strongly connected components containing nodes of this component,
    /// dependencies first.
    pub fn strongly_connected_components(&self) -> Vec<&[NodeIndex]> {
        let owned: HashSet<NodeIndex> = self.owned_node_indices().into_iter().collect();
        self.top_level
            .strongly_connected_components()
            .iter()
            .filter(|v| v.iter().any(|node| owned.contains(node)))
            .map(|v| v.as_slice())
            .collect()
    }

    /// Whether the bindings of this component can be ordered so that every
    /// binding comes after its dependencies.
    pub fn has_cycle_free_order(&self) -> bool {
        !self
            .strongly_connected_components()
            .into_iter()
            .any(|v| self.top_level.is_cyclic(v))
    }
}

impl fmt::Debug for BindingGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingGraph")
            .field("component_path", &self.component_path)
            .field("top_level", &self.top_level)
            .finish()
    }
}
