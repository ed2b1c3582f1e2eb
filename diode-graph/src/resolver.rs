//! Per-component resolution of keys to bindings.
//!
//! Every component of the tree gets one [`Resolver`] stored in the
//! [`Resolvers`] arena. A child resolver sees the explicit bindings of all
//! its ancestors and reuses what they already resolved unless the binding
//! must be resolved again because it depends on something declared locally.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::binding::{Binding, BindingKind};
use crate::binding_factory::BindingFactory;
use crate::component::{ComponentDescriptor, ComponentPath};
use crate::declarations::{
    DelegateDeclaration, ModuleDescriptor, MultibindingDeclaration, OptionalBindingDeclaration,
    SubcomponentDeclaration,
};
use crate::key::Key;
use crate::request::{request_kind_of, RequestKind};
use crate::session::Session;

/// Bindings found for one key in one component.
///
/// Bindings are grouped by the component that owns them. A valid graph has
/// exactly one binding in total; more are duplicates.
#[derive(Debug)]
pub struct ResolvedBindings {
    component_path: ComponentPath,
    key: Key,
    all_bindings: IndexMap<String, IndexSet<Rc<Binding>>>,
    multibinding_declarations: Vec<Rc<MultibindingDeclaration>>,
    subcomponent_declarations: Vec<Rc<SubcomponentDeclaration>>,
    optional_binding_declarations: Vec<Rc<OptionalBindingDeclaration>>,
}

impl ResolvedBindings {
    fn no_bindings(component_path: ComponentPath, key: Key) -> Self {
        Self {
            component_path,
            key,
            all_bindings: IndexMap::new(),
            multibinding_declarations: Vec::new(),
            subcomponent_declarations: Vec::new(),
            optional_binding_declarations: Vec::new(),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn component_path(&self) -> &ComponentPath {
        &self.component_path
    }

    pub fn is_empty(&self) -> bool {
        self.all_bindings.is_empty()
    }

    /// Bindings grouped by owning component, in resolution order.
    pub fn all_bindings(&self) -> &IndexMap<String, IndexSet<Rc<Binding>>> {
        &self.all_bindings
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Rc<Binding>> {
        self.all_bindings.values().flatten()
    }

    pub fn bindings_owned_by(&self, component: &str) -> impl Iterator<Item = &Rc<Binding>> {
        self.all_bindings.get(component).into_iter().flatten()
    }

    pub fn owning_component(&self, binding: &Binding) -> Option<&str> {
        self.all_bindings
            .iter()
            .find(|(_, v)| v.contains(binding))
            .map(|(k, _)| k.as_str())
    }

    pub fn contains(&self, binding: &Binding) -> bool {
        self.all_bindings.values().any(|v| v.contains(binding))
    }

    pub fn multibinding_declarations(&self) -> &[Rc<MultibindingDeclaration>] {
        &self.multibinding_declarations
    }

    pub fn subcomponent_declarations(&self) -> &[Rc<SubcomponentDeclaration>] {
        &self.subcomponent_declarations
    }

    pub fn optional_binding_declarations(&self) -> &[Rc<OptionalBindingDeclaration>] {
        &self.optional_binding_declarations
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolverId(usize);

/// Keys being resolved, with their nesting counts.
#[derive(Default)]
struct CycleStack {
    keys: Vec<Key>,
    counts: HashMap<Key, usize>,
}

impl CycleStack {
    fn push(&mut self, key: Key) {
        *self.counts.entry(key.clone()).or_default() += 1;
        self.keys.push(key);
    }

    fn pop(&mut self) {
        let Some(key) = self.keys.pop() else {
            return;
        };
        if let Some(count) = self.counts.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&key);
            }
        }
    }

    fn contains(&self, key: &Key) -> bool {
        self.counts.contains_key(key)
    }
}

type Index<T> = HashMap<Key, IndexSet<Rc<T>>>;

fn index_by<T: Eq + Hash>(index: &mut Index<T>, key: Key, value: Rc<T>) {
    index.entry(key).or_default().insert(value);
}

fn lookup<'a, T>(index: &'a Index<T>, key: &Key) -> impl Iterator<Item = &'a Rc<T>> + use<'a, T> {
    index.get(key).into_iter().flatten()
}

/// Resolution state of one component.
pub(crate) struct Resolver {
    parent: Option<ResolverId>,
    component: Rc<ComponentDescriptor>,
    component_path: ComponentPath,
    explicit_bindings: Index<Binding>,
    explicit_multibindings: Index<Binding>,
    multibinding_declarations: Index<MultibindingDeclaration>,
    subcomponent_declarations: Index<SubcomponentDeclaration>,
    delegate_declarations: Index<DelegateDeclaration>,
    delegate_multibinding_declarations: Index<DelegateDeclaration>,
    optional_binding_declarations: Index<OptionalBindingDeclaration>,
    pub(crate) resolved_contribution_bindings: IndexMap<Key, Rc<ResolvedBindings>>,
    pub(crate) resolved_members_injection_bindings: IndexMap<Key, Rc<ResolvedBindings>>,
    cycle_stack: CycleStack,
    key_depends_on_local_bindings: HashMap<Key, bool>,
    binding_depends_on_local_bindings: HashMap<Rc<Binding>, bool>,
    subcomponents_to_resolve: VecDeque<Rc<ComponentDescriptor>>,
}

impl Resolver {
    fn new(
        parent: Option<ResolverId>,
        component_path: ComponentPath,
        component: Rc<ComponentDescriptor>,
        explicit_bindings: Vec<Rc<Binding>>,
        modules: &[Rc<ModuleDescriptor>],
    ) -> Self {
        let mut resolver = Self {
            parent,
            component,
            component_path,
            explicit_bindings: HashMap::new(),
            explicit_multibindings: HashMap::new(),
            multibinding_declarations: HashMap::new(),
            subcomponent_declarations: HashMap::new(),
            delegate_declarations: HashMap::new(),
            delegate_multibinding_declarations: HashMap::new(),
            optional_binding_declarations: HashMap::new(),
            resolved_contribution_bindings: IndexMap::new(),
            resolved_members_injection_bindings: IndexMap::new(),
            cycle_stack: CycleStack::default(),
            key_depends_on_local_bindings: HashMap::new(),
            binding_depends_on_local_bindings: HashMap::new(),
            subcomponents_to_resolve: VecDeque::new(),
        };
        let module_bindings = modules.iter().flat_map(|v| v.bindings.iter().cloned());
        for binding in explicit_bindings.into_iter().chain(module_bindings) {
            if binding.contribution_type().is_multibinding() {
                index_by(
                    &mut resolver.explicit_multibindings,
                    binding.key().without_contribution(),
                    binding.clone(),
                );
            }
            index_by(&mut resolver.explicit_bindings, binding.key().clone(), binding);
        }
        for module in modules {
            for declaration in &module.multibinding_declarations {
                index_by(
                    &mut resolver.multibinding_declarations,
                    declaration.key.clone(),
                    declaration.clone(),
                );
            }
            for declaration in &module.subcomponent_declarations {
                index_by(
                    &mut resolver.subcomponent_declarations,
                    declaration.key.clone(),
                    declaration.clone(),
                );
            }
            for declaration in &module.delegate_declarations {
                if declaration.contribution_type.is_multibinding() {
                    index_by(
                        &mut resolver.delegate_multibinding_declarations,
                        declaration.key.without_contribution(),
                        declaration.clone(),
                    );
                }
                index_by(
                    &mut resolver.delegate_declarations,
                    declaration.key.clone(),
                    declaration.clone(),
                );
            }
            for declaration in &module.optional_declarations {
                index_by(
                    &mut resolver.optional_binding_declarations,
                    declaration.key.clone(),
                    declaration.clone(),
                );
            }
        }
        let component = resolver.component.clone();
        resolver.subcomponents_to_resolve.extend(
            component
                .child_components_declared_by_factory_methods()
                .map(|(_, v)| v.clone()),
        );
        resolver.subcomponents_to_resolve.extend(
            component
                .child_components_declared_by_builder_entry_points()
                .map(|(_, v)| v.clone()),
        );
        resolver
    }

    fn has_local_explicit_bindings(&self, key: &Key) -> bool {
        self.explicit_bindings.contains_key(key)
            || self.delegate_declarations.contains_key(&key.unwrap_map_value_type())
    }
}

/// Multibinding delegates apply to sets, raw maps and maps of framework
/// values.
fn accepts_delegate_multibindings(key: &Key) -> bool {
    if !key.is_map() {
        return true;
    }
    match key.map_types() {
        None => true,
        Some((_, value)) => request_kind_of(value) != RequestKind::Instance,
    }
}

/// Arena of the resolvers of one graph factory invocation.
pub struct Resolvers<'s> {
    session: &'s Session,
    factory: BindingFactory<'s>,
    arena: Vec<Resolver>,
}

impl<'s> Resolvers<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self {
            session,
            factory: session.binding_factory(),
            arena: Vec::new(),
        }
    }

    pub(crate) fn add(
        &mut self,
        parent: Option<ResolverId>,
        component: Rc<ComponentDescriptor>,
        explicit_bindings: Vec<Rc<Binding>>,
        modules: &[Rc<ModuleDescriptor>],
    ) -> ResolverId {
        let component_path = match parent {
            Some(parent) => self.arena[parent.0]
                .component_path
                .child_path(component.type_name()),
            None => ComponentPath::root(component.type_name()),
        };
        let id = ResolverId(self.arena.len());
        self.arena.push(Resolver::new(
            parent,
            component_path,
            component,
            explicit_bindings,
            modules,
        ));
        id
    }

    fn get(&self, id: ResolverId) -> &Resolver {
        &self.arena[id.0]
    }

    fn get_mut(&mut self, id: ResolverId) -> &mut Resolver {
        &mut self.arena[id.0]
    }

    pub(crate) fn take(
        &mut self,
        id: ResolverId,
    ) -> (
        IndexMap<Key, Rc<ResolvedBindings>>,
        IndexMap<Key, Rc<ResolvedBindings>>,
    ) {
        let resolver = self.get_mut(id);
        (
            std::mem::take(&mut resolver.resolved_contribution_bindings),
            std::mem::take(&mut resolver.resolved_members_injection_bindings),
        )
    }

    pub fn component(&self, id: ResolverId) -> &Rc<ComponentDescriptor> {
        &self.get(id).component
    }

    pub fn component_path(&self, id: ResolverId) -> &ComponentPath {
        &self.get(id).component_path
    }

    /// Contribution bindings resolved for `key` by this resolver.
    pub fn resolved_bindings(&self, id: ResolverId, key: &Key) -> Option<Rc<ResolvedBindings>> {
        self.get(id).resolved_contribution_bindings.get(key).cloned()
    }

    pub fn resolved_members_injection_bindings(
        &self,
        id: ResolverId,
        key: &Key,
    ) -> Option<Rc<ResolvedBindings>> {
        self.get(id).resolved_members_injection_bindings.get(key).cloned()
    }

    pub(crate) fn pop_subcomponent_to_resolve(
        &mut self,
        id: ResolverId,
    ) -> Option<Rc<ComponentDescriptor>> {
        self.get_mut(id).subcomponents_to_resolve.pop_front()
    }

    pub(crate) fn enqueue_subcomponent(&mut self, id: ResolverId, child: Rc<ComponentDescriptor>) {
        self.get_mut(id).subcomponents_to_resolve.push_back(child);
    }

    /// Resolvers from the root to `id`.
    fn lineage(&self, id: ResolverId) -> Vec<ResolverId> {
        let mut lineage = vec![id];
        let mut current = self.get(id).parent;
        while let Some(parent) = current {
            lineage.push(parent);
            current = self.get(parent).parent;
        }
        lineage.reverse();
        lineage
    }

    /// Resolves `key` and, recursively, the dependencies of the bindings this
    /// component owns for it.
    pub fn resolve(&mut self, id: ResolverId, key: &Key) {
        if self.get(id).cycle_stack.contains(key) {
            return;
        }
        if self.get(id).resolved_contribution_bindings.contains_key(key) {
            return;
        }
        if let Some(parent) = self.get(id).parent
            && self.previously_resolved_bindings(parent, key).is_some()
            && !self.session.is_component_or_creator_key(key)
        {
            self.resolve(parent, key);
            if let Some(previous) = self.previously_resolved_bindings(parent, key) {
                let is_assisted_injection = previous
                    .bindings()
                    .any(|v| v.kind() == BindingKind::AssistedInjection);
                if !is_assisted_injection
                    && !self.requires_resolution(id, key)
                    && !self.get(id).has_local_explicit_bindings(key)
                {
                    trace!(
                        %key,
                        component = %self.get(id).component_path,
                        "reusing bindings of parent"
                    );
                    self.get_mut(id)
                        .resolved_contribution_bindings
                        .insert(key.clone(), previous);
                    return;
                }
            }
        }
        self.get_mut(id).cycle_stack.push(key.clone());
        let bindings = Rc::new(self.look_up_bindings(id, key));
        trace!(
            %key,
            component = %self.get(id).component_path,
            bindings = bindings.bindings().count(),
            "resolved key"
        );
        self.get_mut(id)
            .resolved_contribution_bindings
            .insert(key.clone(), bindings.clone());
        self.resolve_dependencies(id, &bindings);
        self.get_mut(id).cycle_stack.pop();
    }

    /// Resolves the members injection binding of a `void inject(T)` entry point.
    pub fn resolve_members_injection(&mut self, id: ResolverId, key: &Key) {
        if self.get(id).resolved_members_injection_bindings.contains_key(key) {
            return;
        }
        let resolver = self.get(id);
        let mut bindings =
            ResolvedBindings::no_bindings(resolver.component_path.clone(), key.clone());
        if let Some(binding) = self.session.members_injection_binding(key) {
            bindings
                .all_bindings
                .entry(resolver.component.type_name().to_owned())
                .or_default()
                .insert(binding);
        }
        let bindings = Rc::new(bindings);
        self.get_mut(id)
            .resolved_members_injection_bindings
            .insert(key.clone(), bindings.clone());
        self.resolve_dependencies(id, &bindings);
    }

    fn resolve_dependencies(&mut self, id: ResolverId, bindings: &ResolvedBindings) {
        let component = self.get(id).component.clone();
        let keys: Vec<Key> = bindings
            .bindings_owned_by(component.type_name())
            .flat_map(|v| v.dependencies().iter().map(|d| d.key.clone()))
            .collect();
        for key in keys {
            self.resolve(id, &key);
        }
    }

    fn previously_resolved_bindings(
        &self,
        id: ResolverId,
        key: &Key,
    ) -> Option<Rc<ResolvedBindings>> {
        let mut current = Some(id);
        while let Some(resolver) = current {
            if let Some(bindings) = self.get(resolver).resolved_contribution_bindings.get(key) {
                return Some(bindings.clone());
            }
            current = self.get(resolver).parent;
        }
        None
    }

    fn requires_resolution(&mut self, id: ResolverId, key: &Key) -> bool {
        LocalDependencyChecker::default().depends_on_local_key(self, id, key)
    }

    /// Every binding and declaration for `key` visible from this component.
    fn look_up_bindings(&mut self, id: ResolverId, key: &Key) -> ResolvedBindings {
        let lineage = self.lineage(id);
        let optional_key = key.unwrap_optional();
        let mut bindings: IndexSet<Rc<Binding>> = IndexSet::new();
        let mut multibinding_contributions: IndexSet<Rc<Binding>> = IndexSet::new();
        let mut multibinding_declarations: IndexSet<Rc<MultibindingDeclaration>> = IndexSet::new();
        let mut subcomponent_declarations: IndexSet<Rc<SubcomponentDeclaration>> = IndexSet::new();
        let mut optional_declarations: IndexSet<Rc<OptionalBindingDeclaration>> = IndexSet::new();
        for &resolver in &lineage {
            bindings.extend(self.get_local_explicit_bindings(resolver, key));
            multibinding_contributions.extend(self.get_local_explicit_multibindings(resolver, key));
            multibinding_declarations
                .extend(self.get_local_multibinding_declarations(resolver, key));
            subcomponent_declarations
                .extend(lookup(&self.get(resolver).subcomponent_declarations, key).cloned());
            if let Some(optional_key) = &optional_key {
                let declarations = &self.get(resolver).optional_binding_declarations;
                optional_declarations.extend(lookup(declarations, optional_key).cloned());
            }
        }
        if !multibinding_contributions.is_empty() || !multibinding_declarations.is_empty() {
            let contributions: Vec<Rc<Binding>> = multibinding_contributions.into_iter().collect();
            bindings.insert(Rc::new(self.factory.synthetic_multibinding(key, &contributions)));
        }
        if let Some(optional_key) = &optional_key
            && !optional_declarations.is_empty()
        {
            let underlying: Vec<Rc<Binding>> = self
                .look_up_bindings(id, optional_key)
                .bindings()
                .cloned()
                .collect();
            bindings.insert(Rc::new(self.factory.synthetic_optional_binding(key, &underlying)));
        }
        if let Some(declaration) = subcomponent_declarations.first() {
            let binding = Rc::new(self.factory.subcomponent_creator_binding(declaration));
            bindings.insert(binding.clone());
            self.add_subcomponent_to_owning_resolver(id, &binding);
        }
        if let Some(binding) = self.session.members_injector_binding(key) {
            bindings.insert(binding);
        }
        if let Some(binding) = self.session.assisted_factory_binding(key) {
            bindings.insert(binding);
        }
        if bindings.is_empty()
            && let Some(binding) = self.session.injection_binding(key)
            && self.is_correctly_scoped_in_subcomponent(id, &binding)
        {
            bindings.insert(binding);
        }
        let mut all_bindings: IndexMap<String, IndexSet<Rc<Binding>>> = IndexMap::new();
        for binding in bindings {
            let owner = self.get_owning_component(id, key, &binding);
            all_bindings.entry(owner).or_default().insert(binding);
        }
        ResolvedBindings {
            component_path: self.get(id).component_path.clone(),
            key: key.clone(),
            all_bindings,
            multibinding_declarations: multibinding_declarations.into_iter().collect(),
            subcomponent_declarations: subcomponent_declarations.into_iter().collect(),
            optional_binding_declarations: optional_declarations.into_iter().collect(),
        }
    }

    /// Explicit bindings for `key` in one resolver, `@Binds` included.
    fn get_local_explicit_bindings(&mut self, id: ResolverId, key: &Key) -> Vec<Rc<Binding>> {
        let resolver = self.get(id);
        let mut bindings: Vec<Rc<Binding>> =
            lookup(&resolver.explicit_bindings, key).cloned().collect();
        let delegates: Vec<Rc<DelegateDeclaration>> =
            lookup(&resolver.delegate_declarations, &key.unwrap_map_value_type())
                .cloned()
                .collect();
        for delegate in delegates {
            bindings.push(Rc::new(self.create_delegate_binding(id, &delegate)));
        }
        bindings
    }

    /// Contributions to the multibinding `key` in one resolver.
    fn get_local_explicit_multibindings(&mut self, id: ResolverId, key: &Key) -> Vec<Rc<Binding>> {
        let keys = self.session.keys_matching_request(key);
        let resolver = self.get(id);
        let mut bindings: Vec<Rc<Binding>> = keys
            .iter()
            .flat_map(|k| lookup(&resolver.explicit_multibindings, k).cloned())
            .collect();
        if accepts_delegate_multibindings(key) {
            let delegates: Vec<Rc<DelegateDeclaration>> = lookup(
                &resolver.delegate_multibinding_declarations,
                &key.unwrap_map_value_type(),
            )
            .cloned()
            .collect();
            for delegate in delegates {
                bindings.push(Rc::new(self.create_delegate_binding(id, &delegate)));
            }
        }
        bindings
    }

    fn get_local_multibinding_declarations(
        &self,
        id: ResolverId,
        key: &Key,
    ) -> Vec<Rc<MultibindingDeclaration>> {
        let resolver = self.get(id);
        self.session
            .keys_matching_request(key)
            .iter()
            .flat_map(|k| lookup(&resolver.multibinding_declarations, k).cloned())
            .collect()
    }

    fn has_local_multibinding_contributions(&self, id: ResolverId, key: &Key) -> bool {
        let resolver = self.get(id);
        self.session
            .keys_matching_request(key)
            .iter()
            .any(|k| resolver.explicit_multibindings.contains_key(k))
            || (accepts_delegate_multibindings(key)
                && resolver
                    .delegate_multibinding_declarations
                    .contains_key(&key.unwrap_map_value_type()))
    }

    fn has_local_optional_binding_contribution(
        &self,
        id: ResolverId,
        previous: &ResolvedBindings,
    ) -> bool {
        let Some(optional_key) = previous.key().unwrap_optional() else {
            return false;
        };
        let resolver = self.get(id);
        if previous.bindings().any(|v| v.kind() == BindingKind::Optional) {
            resolver.has_local_explicit_bindings(&optional_key)
        } else {
            resolver.optional_binding_declarations.contains_key(&optional_key)
        }
    }

    /// Binding of a `@Binds` declaration, or the unresolved delegate marker
    /// if its target resolves to nothing or is already being resolved.
    fn create_delegate_binding(
        &mut self,
        id: ResolverId,
        delegate: &DelegateDeclaration,
    ) -> Binding {
        let delegate_key = delegate.delegate_request.key.clone();
        if self.get(id).cycle_stack.contains(&delegate_key) {
            return self.factory.unresolved_delegate_binding(delegate);
        }
        self.get_mut(id).cycle_stack.push(delegate_key.clone());
        let resolved = self.look_up_bindings(id, &delegate_key);
        self.get_mut(id).cycle_stack.pop();
        match resolved.bindings().next() {
            Some(binding) => self.factory.delegate_binding(delegate, binding),
            None => self.factory.unresolved_delegate_binding(delegate),
        }
    }

    /// The resolver of the component that should own `binding`, if it is
    /// not simply the current one.
    fn get_owning_resolver(&self, id: ResolverId, binding: &Binding) -> Option<ResolverId> {
        let lineage = self.lineage(id);
        if binding.scope().is_some_and(|v| v.is_production_scope()) || binding.is_production() {
            for &resolver in &lineage {
                if binding.kind() == BindingKind::Injection
                    && self.get(resolver).component.is_production()
                {
                    return Some(resolver);
                }
                if self.contains_explicit_binding(resolver, binding) {
                    return Some(resolver);
                }
            }
        }
        if binding.scope().is_some_and(|v| v.is_reusable()) {
            for &resolver in lineage.iter().rev() {
                if self
                    .get(resolver)
                    .resolved_contribution_bindings
                    .get(binding.key())
                    .is_some_and(|v| v.contains(binding))
                {
                    return Some(resolver);
                }
            }
            return None;
        }
        for &resolver in lineage.iter().rev() {
            if self.contains_explicit_binding(resolver, binding) {
                return Some(resolver);
            }
        }
        if let Some(scope) = binding.scope() {
            for &resolver in lineage.iter().rev() {
                if self.get(resolver).component.scopes().contains(scope) {
                    return Some(resolver);
                }
            }
        }
        None
    }

    fn contains_explicit_binding(&self, id: ResolverId, binding: &Binding) -> bool {
        let resolver = self.get(id);
        lookup(&resolver.explicit_bindings, binding.key()).any(|v| **v == *binding)
            || self.contains_delegate_declaration_for_binding(id, binding)
            || resolver.subcomponent_declarations.contains_key(binding.key())
    }

    fn contains_delegate_declaration_for_binding(&self, id: ResolverId, binding: &Binding) -> bool {
        if binding.kind() != BindingKind::Delegate {
            return false;
        }
        lookup(
            &self.get(id).delegate_declarations,
            &binding.key().unwrap_map_value_type(),
        )
        .any(|v| {
            v.contribution_type == binding.contribution_type()
                && Some(&v.binding_element) == binding.binding_element()
                && Some(v.contributing_module.as_str()) == binding.contributing_module()
        })
    }

    fn get_owning_component(
        &mut self,
        id: ResolverId,
        request_key: &Key,
        binding: &Rc<Binding>,
    ) -> String {
        if self.is_resolved_in_parent(id, request_key, binding)
            && !LocalDependencyChecker::default().depends_on_local_binding(self, id, binding)
            && let Some(parent) = self.get(id).parent
            && let Some(bindings) = self.get(parent).resolved_contribution_bindings.get(request_key)
            && let Some(owner) = bindings.owning_component(binding)
        {
            return owner.to_owned();
        }
        self.get(id).component.type_name().to_owned()
    }

    /// Resolves `key` in the parent if an ancestor should own `binding`.
    fn is_resolved_in_parent(&mut self, id: ResolverId, key: &Key, binding: &Binding) -> bool {
        match self.get_owning_resolver(id, binding) {
            Some(owner) if owner != id => {
                let Some(parent) = self.get(id).parent else {
                    return false;
                };
                self.resolve(parent, key);
                true
            }
            _ => false,
        }
    }

    /// Queues the child whose creator `binding` provides on the resolver
    /// owning the creator binding.
    fn add_subcomponent_to_owning_resolver(&mut self, id: ResolverId, binding: &Binding) {
        let owner = self.get_owning_resolver(id, binding).unwrap_or(id);
        let Some(creator) = binding.key().ty().name() else {
            return;
        };
        let child = self.get(owner).component.get_child_component_with_builder_type(creator);
        self.enqueue_subcomponent(owner, child);
    }

    /// Scoped implicit bindings resolved from a subcomponent root must match
    /// a scope of the component that will own them.
    fn is_correctly_scoped_in_subcomponent(&self, id: ResolverId, binding: &Binding) -> bool {
        let lineage = self.lineage(id);
        if !self.get(lineage[0]).component.is_subcomponent() {
            return true;
        }
        let Some(scope) = binding.scope() else {
            return true;
        };
        if scope.is_reusable() {
            return true;
        }
        let owner = self.get_owning_resolver(id, binding).unwrap_or(id);
        self.get(owner).component.scopes().contains(scope)
    }
}

/// Answers whether a key or binding already resolved by an ancestor has to
/// be resolved again in the current component.
///
/// The visited sets cut cycles within one query. Answers are memoized per
/// resolver.
#[derive(Default)]
struct LocalDependencyChecker {
    keys: HashSet<Key>,
    bindings: HashSet<Rc<Binding>>,
}

impl LocalDependencyChecker {
    fn depends_on_local_key(
        &mut self,
        resolvers: &mut Resolvers<'_>,
        id: ResolverId,
        key: &Key,
    ) -> bool {
        if !self.keys.insert(key.clone()) {
            return false;
        }
        if let Some(&cached) = resolvers.get(id).key_depends_on_local_bindings.get(key) {
            return cached;
        }
        let value = self.key_depends_on_local_bindings(resolvers, id, key);
        resolvers
            .get_mut(id)
            .key_depends_on_local_bindings
            .insert(key.clone(), value);
        value
    }

    fn key_depends_on_local_bindings(
        &mut self,
        resolvers: &mut Resolvers<'_>,
        id: ResolverId,
        key: &Key,
    ) -> bool {
        let Some(previous) = resolvers.previously_resolved_bindings(id, key) else {
            return false;
        };
        if resolvers.has_local_multibinding_contributions(id, key)
            || resolvers.has_local_optional_binding_contribution(id, &previous)
        {
            return true;
        }
        previous
            .bindings()
            .any(|binding| self.depends_on_local_binding(resolvers, id, binding))
    }

    fn depends_on_local_binding(
        &mut self,
        resolvers: &mut Resolvers<'_>,
        id: ResolverId,
        binding: &Rc<Binding>,
    ) -> bool {
        if !self.bindings.insert(binding.clone()) {
            return false;
        }
        if let Some(&cached) = resolvers.get(id).binding_depends_on_local_bindings.get(binding) {
            return cached;
        }
        let value = self.binding_depends_on_local_bindings(resolvers, id, binding);
        resolvers
            .get_mut(id)
            .binding_depends_on_local_bindings
            .insert(binding.clone(), value);
        value
    }

    fn binding_depends_on_local_bindings(
        &mut self,
        resolvers: &mut Resolvers<'_>,
        id: ResolverId,
        binding: &Binding,
    ) -> bool {
        if binding.scope().is_some_and(|v| !v.is_reusable()) || binding.is_production() {
            return false;
        }
        binding
            .dependencies()
            .iter()
            .any(|request| self.depends_on_local_key(resolvers, id, &request.key))
    }
}
