use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::binding::Binding;
use crate::binding_factory::BindingFactory;
use crate::component::ComponentDescriptor;
use crate::declarations::{self, ModuleDescriptor};
use crate::graph_factory::BindingGraphFactory;
use crate::key::Key;
use crate::model::{ModuleDecl, Program};
use crate::network::BindingGraph;
use crate::types::FrameworkType;
use crate::GraphError;

/// State of one compilation: the program model and every memoized
/// descriptor, binding and key lookup derived from it.
///
/// Resolving graphs never fails on graph shapes. Errors raised while
/// building implicit bindings during resolution are recorded here and
/// returned by [`Session::create_binding_graph`].
pub struct Session {
    program: Program,
    module_descriptors: RefCell<HashMap<String, Rc<ModuleDescriptor>>>,
    component_descriptors: RefCell<HashMap<String, Rc<ComponentDescriptor>>>,
    module_validation_descriptors: RefCell<HashMap<String, Rc<ComponentDescriptor>>>,
    in_progress: RefCell<HashSet<String>>,
    injection_bindings: RefCell<HashMap<Key, Option<Rc<Binding>>>>,
    members_injection_bindings: RefCell<HashMap<Key, Option<Rc<Binding>>>>,
    keys_matching_request: RefCell<HashMap<Key, Rc<[Key]>>>,
    errors: RefCell<Vec<GraphError>>,
}

impl Session {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            module_descriptors: RefCell::default(),
            component_descriptors: RefCell::default(),
            module_validation_descriptors: RefCell::default(),
            in_progress: RefCell::default(),
            injection_bindings: RefCell::default(),
            members_injection_bindings: RefCell::default(),
            keys_matching_request: RefCell::default(),
            errors: RefCell::default(),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn binding_factory(&self) -> BindingFactory<'_> {
        BindingFactory::new(&self.program)
    }

    /// Drops every memoized value.
    pub fn clear_cache(&self) {
        self.module_descriptors.borrow_mut().clear();
        self.component_descriptors.borrow_mut().clear();
        self.module_validation_descriptors.borrow_mut().clear();
        self.in_progress.borrow_mut().clear();
        self.injection_bindings.borrow_mut().clear();
        self.members_injection_bindings.borrow_mut().clear();
        self.keys_matching_request.borrow_mut().clear();
        self.errors.borrow_mut().clear();
    }

    pub fn component_descriptor(&self, name: &str) -> Result<Rc<ComponentDescriptor>, GraphError> {
        if let Some(descriptor) = self.component_descriptors.borrow().get(name) {
            return Ok(descriptor.clone());
        }
        let decl = self
            .program
            .component(name)
            .ok_or_else(|| GraphError::TypeNotPresent(name.to_owned()))?;
        if !self.in_progress.borrow_mut().insert(name.to_owned()) {
            return Err(GraphError::invalid(name, "component is its own descendant"));
        }
        let descriptor = ComponentDescriptor::create(self, decl);
        self.in_progress.borrow_mut().remove(name);
        let descriptor = Rc::new(descriptor?);
        debug!(component = name, "created component descriptor");
        self.component_descriptors
            .borrow_mut()
            .insert(name.to_owned(), descriptor.clone());
        Ok(descriptor)
    }

    /// Descriptor validating `module` as if a component installed only it.
    pub fn module_validation_descriptor(
        &self,
        module: &str,
    ) -> Result<Rc<ComponentDescriptor>, GraphError> {
        if let Some(descriptor) = self.module_validation_descriptors.borrow().get(module) {
            return Ok(descriptor.clone());
        }
        let descriptor = Rc::new(ComponentDescriptor::for_module(self, module)?);
        self.module_validation_descriptors
            .borrow_mut()
            .insert(module.to_owned(), descriptor.clone());
        Ok(descriptor)
    }

    pub fn module_descriptor(&self, name: &str) -> Result<Rc<ModuleDescriptor>, GraphError> {
        let decl = self
            .program
            .module(name)
            .ok_or_else(|| GraphError::TypeNotPresent(name.to_owned()))?;
        self.module_descriptor_for(decl)
    }

    fn module_descriptor_for(&self, decl: &ModuleDecl) -> Result<Rc<ModuleDescriptor>, GraphError> {
        if let Some(descriptor) = self.module_descriptors.borrow().get(&decl.name) {
            return Ok(descriptor.clone());
        }
        let descriptor = Rc::new(ModuleDescriptor::create(&self.program, decl)?);
        self.module_descriptors
            .borrow_mut()
            .insert(decl.name.clone(), descriptor.clone());
        Ok(descriptor)
    }

    /// Modules installed by a production component on top of its own.
    pub(crate) fn implicit_production_modules(
        &self,
        component: &str,
    ) -> Result<Vec<Rc<ModuleDescriptor>>, GraphError> {
        Ok(vec![
            self.module_descriptor_for(&declarations::production_executor_module())?,
            self.module_descriptor_for(&declarations::monitoring_module(component))?,
        ])
    }

    /// `modules` and everything they include, depth first.
    pub fn transitive_modules(
        &self,
        modules: &[String],
    ) -> Result<Vec<Rc<ModuleDescriptor>>, GraphError> {
        let mut visited: IndexSet<String> = IndexSet::new();
        let mut result = Vec::new();
        let mut stack: Vec<String> = modules.iter().rev().cloned().collect();
        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let descriptor = self.module_descriptor(&name)?;
            stack.extend(descriptor.included_modules.iter().rev().cloned());
            result.push(descriptor);
        }
        Ok(result)
    }

    /// Keys whose bindings can satisfy a request for `key`.
    pub fn keys_matching_request(&self, key: &Key) -> Rc<[Key]> {
        if let Some(keys) = self.keys_matching_request.borrow().get(key) {
            return keys.clone();
        }
        let mut keys: IndexSet<Key> = IndexSet::new();
        keys.insert(key.clone());
        keys.extend(key.unwrap_set_key(FrameworkType::Produced));
        keys.extend(key.rewrap_map_key(FrameworkType::Producer, FrameworkType::Provider));
        keys.extend(key.rewrap_map_key(FrameworkType::Provider, FrameworkType::Producer));
        keys.extend(key.implicit_framework_map_keys());
        let keys: Rc<[Key]> = keys.into_iter().collect();
        self.keys_matching_request
            .borrow_mut()
            .insert(key.clone(), keys.clone());
        keys
    }

    /// Implicit `@Inject` constructor binding for `key`, if its type has one.
    pub fn injection_binding(&self, key: &Key) -> Option<Rc<Binding>> {
        if let Some(binding) = self.injection_bindings.borrow().get(key) {
            return binding.clone();
        }
        let binding = self.record(self.find_injection_binding(key))?;
        self.injection_bindings
            .borrow_mut()
            .insert(key.clone(), binding.clone());
        binding
    }

    fn find_injection_binding(&self, key: &Key) -> Result<Option<Rc<Binding>>, GraphError> {
        if key.qualifier().is_some() || key.contribution().is_some() {
            return Ok(None);
        }
        let Some(injectable) = key.ty().name().and_then(|v| self.program.injectable(v)) else {
            return Ok(None);
        };
        if injectable.constructor.is_none() {
            return Ok(None);
        }
        if key.ty().args().len() != injectable.type_params.len() {
            trace!(%key, "raw use of a generic injectable type");
            return Ok(None);
        }
        let binding = self
            .binding_factory()
            .injection_binding(injectable, Some(key.ty()))?;
        Ok(Some(Rc::new(binding)))
    }

    /// Binding injecting the members of an instance of the key's type.
    pub fn members_injection_binding(&self, key: &Key) -> Option<Rc<Binding>> {
        if let Some(binding) = self.members_injection_bindings.borrow().get(key) {
            return binding.clone();
        }
        let binding = if key.qualifier().is_none() && key.ty().is_declared() {
            Some(Rc::new(self.record(
                self.binding_factory().members_injection_binding(key.ty()),
            )?))
        } else {
            None
        };
        self.members_injection_bindings
            .borrow_mut()
            .insert(key.clone(), binding.clone());
        binding
    }

    /// `MembersInjector<T>` binding for a key of that type.
    pub fn members_injector_binding(&self, key: &Key) -> Option<Rc<Binding>> {
        let injected = key.ty().unwrap_type(FrameworkType::MembersInjector)?;
        let members_injection =
            self.members_injection_binding(&Key::for_members_injected_type(injected.clone()))?;
        Some(Rc::new(
            self.binding_factory()
                .members_injector_binding(key, &members_injection),
        ))
    }

    /// Binding of an unqualified `@AssistedFactory` type.
    pub fn assisted_factory_binding(&self, key: &Key) -> Option<Rc<Binding>> {
        if key.qualifier().is_some() {
            return None;
        }
        let factory = self.program.assisted_factory(key.ty().name()?)?;
        Some(Rc::new(self.binding_factory().assisted_factory_binding(factory, key)))
    }

    /// Whether `key` is an unqualified component or component creator type.
    pub fn is_component_or_creator_key(&self, key: &Key) -> bool {
        if key.qualifier().is_some() {
            return false;
        }
        match key.ty().name() {
            Some(name) => {
                self.program.component(name).is_some()
                    || self.program.component_for_creator(name).is_some()
            }
            None => false,
        }
    }

    /// Resolves the graph of the component `name`.
    pub fn create_binding_graph(
        &self,
        name: &str,
        full_binding_graph: bool,
    ) -> Result<BindingGraph, GraphError> {
        let descriptor = self.component_descriptor(name)?;
        self.create_binding_graph_for(&descriptor, full_binding_graph)
    }

    /// Resolves the full graph of a single module.
    pub fn create_module_binding_graph(&self, module: &str) -> Result<BindingGraph, GraphError> {
        let descriptor = self.module_validation_descriptor(module)?;
        self.create_binding_graph_for(&descriptor, true)
    }

    pub fn create_binding_graph_for(
        &self,
        descriptor: &Rc<ComponentDescriptor>,
        full_binding_graph: bool,
    ) -> Result<BindingGraph, GraphError> {
        let graph = BindingGraphFactory::new(self).create(descriptor, full_binding_graph)?;
        self.take_error()?;
        Ok(graph)
    }

    /// Keeps the error for [`Session::take_error`]. Failed lookups are not
    /// memoized.
    fn record<T>(&self, result: Result<T, GraphError>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(err) => {
                debug!(%err, "failed to create implicit binding");
                self.errors.borrow_mut().push(err);
                None
            }
        }
    }

    /// Returns the first error recorded during resolution, if any.
    pub fn take_error(&self) -> Result<(), GraphError> {
        let mut errors = self.errors.borrow_mut();
        if errors.is_empty() {
            return Ok(());
        }
        let err = errors.remove(0);
        errors.clear();
        Err(err)
    }
}
