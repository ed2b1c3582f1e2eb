use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexSet;

use crate::binding::Scope;
use crate::declarations::ModuleDescriptor;
use crate::key::Key;
use crate::model::{
    ComponentDecl, ComponentDeclKind, ComponentMethodDecl, CreatorKind, CreatorParamKind,
};
use crate::request::{DependencyRequest, ElementId};
use crate::session::Session;
use crate::types::TypeName;
use crate::GraphError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Component,
    Subcomponent,
    ProductionComponent,
    ProductionSubcomponent,
    /// A module treated as a component to validate its bindings in isolation.
    Module,
}

impl ComponentKind {
    pub fn is_subcomponent(self) -> bool {
        matches!(self, ComponentKind::Subcomponent | ComponentKind::ProductionSubcomponent)
    }

    pub fn is_production(self) -> bool {
        matches!(
            self,
            ComponentKind::ProductionComponent | ComponentKind::ProductionSubcomponent
        )
    }

    pub fn is_real_component(self) -> bool {
        self != ComponentKind::Module
    }
}

impl From<ComponentDeclKind> for ComponentKind {
    fn from(value: ComponentDeclKind) -> Self {
        match value {
            ComponentDeclKind::Component => ComponentKind::Component,
            ComponentDeclKind::Subcomponent => ComponentKind::Subcomponent,
            ComponentDeclKind::ProductionComponent => ComponentKind::ProductionComponent,
            ComponentDeclKind::ProductionSubcomponent => ComponentKind::ProductionSubcomponent,
        }
    }
}

/// Chain of component type names from the root component to a component.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentPath(Rc<[String]>);

impl ComponentPath {
    pub fn new(components: Vec<String>) -> Self {
        assert!(!components.is_empty(), "component path must not be empty");
        Self(components.into())
    }

    pub fn root(component: impl Into<String>) -> Self {
        Self::new(vec![component.into()])
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    pub fn current_component(&self) -> &str {
        &self.0[self.0.len() - 1]
    }

    pub fn root_component(&self) -> &str {
        &self.0[0]
    }

    pub fn at_root(&self) -> bool {
        self.0.len() == 1
    }

    pub fn child_path(&self, child: impl Into<String>) -> Self {
        let mut components = self.0.to_vec();
        components.push(child.into());
        Self(components.into())
    }

    pub fn parent(&self) -> Option<Self> {
        if self.at_root() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].into()))
    }

    /// Prefix of this path that ends at `ancestor`.
    pub fn prefix_to(&self, ancestor: &str) -> Option<Self> {
        let position = self.0.iter().position(|v| v == ancestor)?;
        Some(Self(self.0[..=position].into()))
    }
}

impl fmt::Display for ComponentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" → "))
    }
}

impl fmt::Debug for ComponentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentPath({self})")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentRequirementKind {
    Dependency,
    Module,
    BoundInstance,
}

/// Something the generated component's constructor must be handed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentRequirement {
    pub kind: ComponentRequirementKind,
    pub ty: TypeName,
    pub key: Key,
    pub nullable: bool,
}

impl ComponentRequirement {
    pub fn for_dependency(ty: TypeName) -> Self {
        Self {
            kind: ComponentRequirementKind::Dependency,
            key: Key::of(ty.clone()),
            ty,
            nullable: false,
        }
    }

    pub fn for_module(ty: TypeName) -> Self {
        Self {
            kind: ComponentRequirementKind::Module,
            key: Key::of(ty.clone()),
            ty,
            nullable: false,
        }
    }

    pub fn for_bound_instance(key: Key, nullable: bool) -> Self {
        Self {
            kind: ComponentRequirementKind::BoundInstance,
            ty: key.ty().clone(),
            key,
            nullable,
        }
    }

    pub fn type_name(&self) -> String {
        self.ty.to_string()
    }
}

/// An abstract method of a component.
///
/// Entry points carry a dependency request. Child factory methods carry the
/// child but no request, and methods returning a child's creator carry both.
#[derive(Clone, Debug)]
pub struct ComponentMethodDescriptor {
    pub method: ComponentMethodDecl,
    pub element: ElementId,
    pub dependency_request: Option<DependencyRequest>,
    pub subcomponent: Option<Rc<ComponentDescriptor>>,
}

impl ComponentMethodDescriptor {
    pub fn is_entry_point(&self) -> bool {
        self.dependency_request.is_some()
    }

    pub fn is_child_factory_method(&self) -> bool {
        self.subcomponent.is_some() && self.dependency_request.is_none()
    }

    pub fn is_builder_entry_point(&self) -> bool {
        self.subcomponent.is_some() && self.dependency_request.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct ComponentCreatorDescriptor {
    pub type_name: String,
    pub kind: CreatorKind,
    pub requirements: Vec<(ComponentRequirement, ElementId)>,
}

impl ComponentCreatorDescriptor {
    pub fn bound_instance_requirements(
        &self,
    ) -> impl Iterator<Item = &(ComponentRequirement, ElementId)> {
        self.requirements
            .iter()
            .filter(|(v, _)| v.kind == ComponentRequirementKind::BoundInstance)
    }

    pub fn element_for_requirement(
        &self,
        requirement: &ComponentRequirement,
    ) -> Option<&ElementId> {
        self.requirements
            .iter()
            .find(|(v, _)| v == requirement)
            .map(|(_, element)| element)
    }
}

/// Static shape of a component, subcomponent or module validated as a
/// component. Descriptors are identified by their type name.
#[derive(Debug)]
pub struct ComponentDescriptor {
    kind: ComponentKind,
    type_name: String,
    dependencies: Vec<ComponentRequirement>,
    modules: Vec<Rc<ModuleDescriptor>>,
    scopes: Vec<Scope>,
    component_methods: Vec<ComponentMethodDescriptor>,
    children_declared_by_modules: Vec<Rc<ComponentDescriptor>>,
    creator: Option<ComponentCreatorDescriptor>,
}

impl ComponentDescriptor {
    pub(crate) fn create(session: &Session, decl: &ComponentDecl) -> Result<Self, GraphError> {
        let program = session.program();
        let kind = ComponentKind::from(decl.kind);
        let mut dependencies = Vec::new();
        for dependency in &decl.dependencies {
            if program.dependency_type(dependency).is_none()
                && program.component(dependency).is_none()
            {
                return Err(GraphError::TypeNotPresent(dependency.clone()));
            }
            dependencies.push(ComponentRequirement::for_dependency(TypeName::simple(dependency)));
        }
        let modules = session.transitive_modules(&decl.modules)?;
        let children_declared_by_modules = children_declared_by_modules(session, &modules)?;
        let mut component_methods = Vec::new();
        for method in &decl.methods {
            component_methods.push(component_method(session, decl, kind, method)?);
        }
        let creator = match &decl.creator {
            Some(creator) => Some(ComponentCreatorDescriptor {
                type_name: creator.name.clone(),
                kind: creator.kind,
                requirements: creator
                    .params
                    .iter()
                    .map(|param| {
                        let requirement = match param.kind {
                            CreatorParamKind::Module => {
                                ComponentRequirement::for_module(param.ty.clone())
                            }
                            CreatorParamKind::Dependency => {
                                ComponentRequirement::for_dependency(param.ty.clone())
                            }
                            CreatorParamKind::BoundInstance => {
                                let key = Key::for_qualified_type(
                                    param.qualifier.clone(),
                                    param.ty.clone(),
                                );
                                ComponentRequirement::for_bound_instance(key, param.nullable)
                            }
                        };
                        (requirement, ElementId::new(&creator.name, &param.name))
                    })
                    .collect(),
            }),
            None => None,
        };
        let mut scopes: Vec<Scope> = decl.scopes.iter().cloned().map(Scope::new).collect();
        if kind.is_production() {
            scopes.push(Scope::new("ProductionScope"));
        }
        Ok(Self {
            kind,
            type_name: decl.name.clone(),
            dependencies,
            modules,
            scopes,
            component_methods,
            children_declared_by_modules,
            creator,
        })
    }

    /// Descriptor of a module validated as if it were a component installing
    /// only that module.
    pub(crate) fn for_module(session: &Session, module: &str) -> Result<Self, GraphError> {
        let modules = session.transitive_modules(&[module.to_owned()])?;
        let children_declared_by_modules = children_declared_by_modules(session, &modules)?;
        Ok(Self {
            kind: ComponentKind::Module,
            type_name: module.to_owned(),
            dependencies: Vec::new(),
            modules,
            scopes: Vec::new(),
            component_methods: Vec::new(),
            children_declared_by_modules,
            creator: None,
        })
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_subcomponent(&self) -> bool {
        self.kind.is_subcomponent()
    }

    pub fn is_production(&self) -> bool {
        self.kind.is_production()
    }

    pub fn is_real_component(&self) -> bool {
        self.kind.is_real_component()
    }

    pub fn dependencies(&self) -> &[ComponentRequirement] {
        &self.dependencies
    }

    /// Installed modules, including transitively included ones.
    pub fn modules(&self) -> &[Rc<ModuleDescriptor>] {
        &self.modules
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn component_methods(&self) -> &[ComponentMethodDescriptor] {
        &self.component_methods
    }

    pub fn creator(&self) -> Option<&ComponentCreatorDescriptor> {
        self.creator.as_ref()
    }

    pub fn entry_point_methods(&self) -> impl Iterator<Item = &ComponentMethodDescriptor> {
        self.component_methods.iter().filter(|v| v.is_entry_point())
    }

    pub fn child_components_declared_by_modules(&self) -> &[Rc<ComponentDescriptor>] {
        &self.children_declared_by_modules
    }

    pub fn child_components_declared_by_factory_methods(
        &self,
    ) -> impl Iterator<Item = (&ComponentMethodDescriptor, &Rc<ComponentDescriptor>)> {
        self.component_methods.iter().filter_map(|v| match &v.subcomponent {
            Some(child) if v.is_child_factory_method() => Some((v, child)),
            _ => None,
        })
    }

    pub fn child_components_declared_by_builder_entry_points(
        &self,
    ) -> impl Iterator<Item = (&ComponentMethodDescriptor, &Rc<ComponentDescriptor>)> {
        self.component_methods.iter().filter_map(|v| match &v.subcomponent {
            Some(child) if v.is_builder_entry_point() => Some((v, child)),
            _ => None,
        })
    }

    /// Every distinct child component, however it is declared.
    pub fn child_components(&self) -> Vec<Rc<ComponentDescriptor>> {
        let mut children: IndexSet<Rc<ComponentDescriptor>> = IndexSet::new();
        children.extend(
            self.child_components_declared_by_factory_methods()
                .map(|(_, v)| v.clone()),
        );
        children.extend(
            self.child_components_declared_by_builder_entry_points()
                .map(|(_, v)| v.clone()),
        );
        children.extend(self.children_declared_by_modules.iter().cloned());
        children.into_iter().collect()
    }

    /// The child component whose creator has type `creator`.
    ///
    /// # Panics
    ///
    /// Panics if no child component has such a creator.
    pub fn get_child_component_with_builder_type(&self, creator: &str) -> Rc<ComponentDescriptor> {
        self.child_components()
            .into_iter()
            .find(|v| v.creator.as_ref().is_some_and(|c| c.type_name == creator))
            .unwrap_or_else(|| {
                panic!("no child component with creator {creator} in {}", self.type_name)
            })
    }

    pub fn get_factory_method_for_child_component(
        &self,
        child: &ComponentDescriptor,
    ) -> Option<&ComponentMethodDescriptor> {
        self.child_components_declared_by_factory_methods()
            .find(|(_, v)| v.type_name == child.type_name)
            .map(|(method, _)| method)
    }

    /// Modules, dependencies and bound instances the component is created with.
    pub fn requirements(&self) -> Vec<ComponentRequirement> {
        let mut requirements: IndexSet<ComponentRequirement> = IndexSet::new();
        for module in &self.modules {
            if module.requires_module_instance() {
                requirements.insert(ComponentRequirement::for_module(TypeName::simple(
                    &module.module_type,
                )));
            }
        }
        requirements.extend(self.dependencies.iter().cloned());
        if let Some(creator) = &self.creator {
            requirements.extend(creator.bound_instance_requirements().map(|(v, _)| v.clone()));
        }
        requirements.into_iter().collect()
    }
}

impl PartialEq for ComponentDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

impl Eq for ComponentDescriptor {}

impl Hash for ComponentDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_name.hash(state);
    }
}

fn children_declared_by_modules(
    session: &Session,
    modules: &[Rc<ModuleDescriptor>],
) -> Result<Vec<Rc<ComponentDescriptor>>, GraphError> {
    let mut children: IndexSet<Rc<ComponentDescriptor>> = IndexSet::new();
    for module in modules {
        for declaration in &module.subcomponent_declarations {
            children.insert(session.component_descriptor(&declaration.subcomponent)?);
        }
    }
    Ok(children.into_iter().collect())
}

fn component_method(
    session: &Session,
    component: &ComponentDecl,
    kind: ComponentKind,
    method: &ComponentMethodDecl,
) -> Result<ComponentMethodDescriptor, GraphError> {
    let program = session.program();
    let element = ElementId::new(&component.name, &method.name);
    let mut descriptor = ComponentMethodDescriptor {
        method: method.clone(),
        element: element.clone(),
        dependency_request: None,
        subcomponent: None,
    };
    if let Some(name) = method.return_type.as_ref().and_then(|v| v.name())
        && method.qualifier.is_none()
    {
        if let Some(child) = program.component(name)
            && child.kind.is_subcomponent()
        {
            descriptor.subcomponent = Some(session.component_descriptor(name)?);
            return Ok(descriptor);
        }
        if let Some(child) = program.component_for_creator(name) {
            descriptor.subcomponent = Some(session.component_descriptor(&child.name)?);
        }
    }
    let owner = component.name.as_str();
    descriptor.dependency_request = Some(match (method.params.as_slice(), &method.return_type) {
        ([], None) => {
            return Err(GraphError::invalid(element.to_string(), "component method cannot be void"));
        }
        ([], Some(return_type)) if kind.is_production() => {
            DependencyRequest::for_component_production_method(method, return_type, owner)
        }
        ([], Some(return_type)) => {
            DependencyRequest::for_component_provision_method(method, return_type, owner)
        }
        ([param], return_type) if return_type.as_ref().is_none_or(|v| *v == param.ty) => {
            DependencyRequest::for_component_members_injection_method(method, &param.ty, owner)
        }
        ([_], _) => {
            return Err(GraphError::invalid(
                element.to_string(),
                "members injection methods must return void or their parameter type",
            ));
        }
        _ => {
            return Err(GraphError::invalid(
                element.to_string(),
                "component method has too many parameters",
            ));
        }
    });
    Ok(descriptor)
}
