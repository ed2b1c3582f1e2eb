use std::collections::HashSet;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::binding::{Binding, BindingKind};
use crate::component::{ComponentDescriptor, ComponentPath};
use crate::converter::BindingGraphConverter;
use crate::declarations::ModuleDescriptor;
use crate::key::Key;
use crate::network::BindingGraph;
use crate::request::RequestKind;
use crate::resolver::{ResolvedBindings, ResolverId, Resolvers};
use crate::session::Session;
use crate::GraphError;

/// Resolution results of one component and, recursively, its children.
#[derive(Debug)]
pub struct LegacyBindingGraph {
    component: Rc<ComponentDescriptor>,
    component_path: ComponentPath,
    contribution_bindings: IndexMap<Key, Rc<ResolvedBindings>>,
    members_injection_bindings: IndexMap<Key, Rc<ResolvedBindings>>,
    subgraphs: Vec<LegacyBindingGraph>,
}

impl LegacyBindingGraph {
    pub fn component_descriptor(&self) -> &Rc<ComponentDescriptor> {
        &self.component
    }

    pub fn component_path(&self) -> &ComponentPath {
        &self.component_path
    }

    /// Contribution bindings resolved for a request, or the members injection
    /// bindings for a members injection request.
    pub fn resolved_bindings(&self, kind: RequestKind, key: &Key) -> Option<&Rc<ResolvedBindings>> {
        match kind {
            RequestKind::MembersInjection => self.members_injection_bindings.get(key),
            _ => self.contribution_bindings.get(key),
        }
    }

    pub fn contribution_bindings(&self) -> &IndexMap<Key, Rc<ResolvedBindings>> {
        &self.contribution_bindings
    }

    pub fn members_injection_bindings(&self) -> &IndexMap<Key, Rc<ResolvedBindings>> {
        &self.members_injection_bindings
    }

    pub fn subgraphs(&self) -> &[LegacyBindingGraph] {
        &self.subgraphs
    }
}

/// Drives one resolver per component of the tree rooted at a component.
pub struct BindingGraphFactory<'s> {
    session: &'s Session,
    resolvers: Resolvers<'s>,
}

struct ResolverTree {
    id: ResolverId,
    children: Vec<ResolverTree>,
}

impl<'s> BindingGraphFactory<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self {
            session,
            resolvers: Resolvers::new(session),
        }
    }

    pub fn resolvers(&self) -> &Resolvers<'s> {
        &self.resolvers
    }

    pub fn resolvers_mut(&mut self) -> &mut Resolvers<'s> {
        &mut self.resolvers
    }

    /// Resolves the component tree of `descriptor` and converts it to a
    /// network.
    pub fn create(
        mut self,
        descriptor: &Rc<ComponentDescriptor>,
        full_binding_graph: bool,
    ) -> Result<BindingGraph, GraphError> {
        let legacy = self.create_legacy_binding_graph(descriptor, full_binding_graph)?;
        Ok(BindingGraphConverter::new().convert(&legacy, full_binding_graph))
    }

    pub fn create_legacy_binding_graph(
        &mut self,
        descriptor: &Rc<ComponentDescriptor>,
        full_binding_graph: bool,
    ) -> Result<LegacyBindingGraph, GraphError> {
        let tree = self.resolve_tree(None, descriptor, full_binding_graph)?;
        Ok(self.collect(tree))
    }

    /// Creates the resolver of `descriptor` with every explicit binding and
    /// declaration the component installs.
    pub fn create_resolver(
        &mut self,
        parent: Option<ResolverId>,
        descriptor: &Rc<ComponentDescriptor>,
    ) -> Result<ResolverId, GraphError> {
        let factory = self.session.binding_factory();
        let mut explicit_bindings: Vec<Rc<Binding>> = Vec::new();
        if descriptor.is_real_component() {
            explicit_bindings.push(Rc::new(factory.component_binding(descriptor.type_name())));
        }
        for dependency in descriptor.dependencies() {
            explicit_bindings.push(Rc::new(factory.component_dependency_binding(dependency)));
            let name = dependency.type_name();
            let program = self.session.program();
            let methods = match (program.dependency_type(&name), program.component(&name)) {
                (Some(decl), _) => decl.methods.as_slice(),
                (None, Some(decl)) => decl.methods.as_slice(),
                (None, None) => return Err(GraphError::TypeNotPresent(name)),
            };
            let mut seen: HashSet<(String, Key, BindingKind)> = HashSet::new();
            let provisions = methods
                .iter()
                .filter(|v| v.params.is_empty() && v.return_type.is_some());
            for method in provisions {
                let binding = factory.component_dependency_method_binding(
                    descriptor.is_production(),
                    &name,
                    method,
                )?;
                if seen.insert((method.name.clone(), binding.key().clone(), binding.kind())) {
                    explicit_bindings.push(Rc::new(binding));
                }
            }
        }
        if let Some(creator) = descriptor.creator() {
            for (requirement, element) in creator.bound_instance_requirements() {
                explicit_bindings.push(Rc::new(
                    factory.bound_instance_binding(requirement, element.clone()),
                ));
            }
        }
        for (method, child) in descriptor.child_components_declared_by_builder_entry_points() {
            if descriptor.child_components_declared_by_modules().contains(child) {
                continue;
            }
            if let Some(creator) = &method.method.return_type {
                let binding = factory
                    .subcomponent_creator_binding_for_method(method.element.clone(), creator);
                explicit_bindings.push(Rc::new(binding));
            }
        }
        let mut modules: Vec<Rc<ModuleDescriptor>> = descriptor.modules().to_vec();
        if self.should_include_implicit_production_modules(parent, descriptor) {
            modules.extend(self.session.implicit_production_modules(descriptor.type_name())?);
        }
        let id = self
            .resolvers
            .add(parent, descriptor.clone(), explicit_bindings, &modules);
        debug!(
            component = %self.resolvers.component_path(id),
            modules = modules.len(),
            "created resolver"
        );
        Ok(id)
    }

    fn should_include_implicit_production_modules(
        &self,
        parent: Option<ResolverId>,
        descriptor: &ComponentDescriptor,
    ) -> bool {
        if !descriptor.is_production() {
            return false;
        }
        match parent {
            None => descriptor.is_real_component() && !descriptor.is_subcomponent(),
            Some(parent) => !self.resolvers.component(parent).is_production(),
        }
    }

    fn resolve_tree(
        &mut self,
        parent: Option<ResolverId>,
        descriptor: &Rc<ComponentDescriptor>,
        full_binding_graph: bool,
    ) -> Result<ResolverTree, GraphError> {
        let id = self.create_resolver(parent, descriptor)?;
        for method in descriptor.entry_point_methods() {
            let Some(request) = &method.dependency_request else {
                continue;
            };
            if request.kind == RequestKind::MembersInjection {
                self.resolvers.resolve_members_injection(id, &request.key);
            } else {
                self.resolvers.resolve(id, &request.key);
            }
        }
        if full_binding_graph {
            let keys: IndexSet<Key> = descriptor
                .modules()
                .iter()
                .flat_map(|v| v.all_binding_keys())
                .map(|v| v.without_contribution())
                .collect();
            for key in &keys {
                self.resolvers.resolve(id, key);
            }
            for child in descriptor.child_components_declared_by_modules() {
                self.resolvers.enqueue_subcomponent(id, child.clone());
            }
        }
        let mut children = Vec::new();
        let mut resolved: HashSet<String> = HashSet::new();
        while let Some(child) = self.resolvers.pop_subcomponent_to_resolve(id) {
            if resolved.insert(child.type_name().to_owned()) {
                children.push(self.resolve_tree(Some(id), &child, full_binding_graph)?);
            }
        }
        Ok(ResolverTree { id, children })
    }

    fn collect(&mut self, tree: ResolverTree) -> LegacyBindingGraph {
        let (contribution_bindings, members_injection_bindings) = self.resolvers.take(tree.id);
        let subgraphs = tree
            .children
            .into_iter()
            .map(|child| self.collect(child))
            .collect();
        LegacyBindingGraph {
            component: self.resolvers.component(tree.id).clone(),
            component_path: self.resolvers.component_path(tree.id).clone(),
            contribution_bindings,
            members_injection_bindings,
            subgraphs,
        }
    }
}
