use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::key::Key;
use crate::model::{ContributionDecl, MapKeyDecl};
use crate::request::{DependencyRequest, ElementId};
use crate::types::TypeName;

/// How a binding contributes to its key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContributionType {
    #[default]
    Unique,
    Set,
    SetValues,
    Map,
}

impl ContributionType {
    pub fn is_multibinding(self) -> bool {
        self != ContributionType::Unique
    }
}

impl From<ContributionDecl> for ContributionType {
    fn from(value: ContributionDecl) -> Self {
        match value {
            ContributionDecl::Unique => ContributionType::Unique,
            ContributionDecl::IntoSet => ContributionType::Set,
            ContributionDecl::ElementsIntoSet => ContributionType::SetValues,
            ContributionDecl::IntoMap => ContributionType::Map,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingType {
    Provision,
    Production,
    MembersInjection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingKind {
    Injection,
    AssistedInjection,
    AssistedFactory,
    Provision,
    Production,
    Component,
    ComponentProvision,
    ComponentProduction,
    ComponentDependency,
    BoundInstance,
    SubcomponentCreator,
    Delegate,
    MultiboundSet,
    MultiboundMap,
    Optional,
    MembersInjector,
    MembersInjection,
}

impl BindingKind {
    pub fn name(self) -> &'static str {
        match self {
            BindingKind::Injection => "INJECTION",
            BindingKind::AssistedInjection => "ASSISTED_INJECTION",
            BindingKind::AssistedFactory => "ASSISTED_FACTORY",
            BindingKind::Provision => "PROVISION",
            BindingKind::Production => "PRODUCTION",
            BindingKind::Component => "COMPONENT",
            BindingKind::ComponentProvision => "COMPONENT_PROVISION",
            BindingKind::ComponentProduction => "COMPONENT_PRODUCTION",
            BindingKind::ComponentDependency => "COMPONENT_DEPENDENCY",
            BindingKind::BoundInstance => "BOUND_INSTANCE",
            BindingKind::SubcomponentCreator => "SUBCOMPONENT_CREATOR",
            BindingKind::Delegate => "DELEGATE",
            BindingKind::MultiboundSet => "MULTIBOUND_SET",
            BindingKind::MultiboundMap => "MULTIBOUND_MAP",
            BindingKind::Optional => "OPTIONAL",
            BindingKind::MembersInjector => "MEMBERS_INJECTOR",
            BindingKind::MembersInjection => "MEMBERS_INJECTION",
        }
    }

    /// Bindings that are not backed by a user declaration.
    pub fn is_synthetic(self) -> bool {
        matches!(
            self,
            BindingKind::MultiboundSet
                | BindingKind::MultiboundMap
                | BindingKind::Optional
                | BindingKind::MembersInjector
                | BindingKind::SubcomponentCreator
                | BindingKind::Component
        )
    }

    pub fn is_multibound(self) -> bool {
        matches!(self, BindingKind::MultiboundSet | BindingKind::MultiboundMap)
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scope annotation, e.g. `Singleton`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_reusable(&self) -> bool {
        self.0 == "Reusable" || self.0 == "dagger.Reusable"
    }

    pub fn is_production_scope(&self) -> bool {
        self.0 == "ProductionScope" || self.0 == "dagger.producers.ProductionScope"
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MapKey {
    pub ty: TypeName,
    pub value: String,
}

impl From<&MapKeyDecl> for MapKey {
    fn from(value: &MapKeyDecl) -> Self {
        Self {
            ty: value.ty.clone(),
            value: value.value.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProductionKind {
    /// Returns the value directly.
    Immediate,
    /// Returns `ListenableFuture<T>`.
    Future,
    /// `@ElementsIntoSet` returning `Set<ListenableFuture<T>>`.
    SetOfFuture,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Production {
    pub kind: ProductionKind,
    pub thrown_types: Vec<TypeName>,
}

/// One mechanism that satisfies a key.
///
/// All binding families share this record; `kind` tells them apart and the
/// kind-specific accessors panic when called on another kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Binding {
    key: Key,
    kind: BindingKind,
    contribution_type: ContributionType,
    binding_element: Option<ElementId>,
    contributing_module: Option<String>,
    explicit_dependencies: Vec<DependencyRequest>,
    implicit_dependencies: Vec<DependencyRequest>,
    dependencies: Vec<DependencyRequest>,
    scope: Option<Scope>,
    nullable: bool,
    map_key: Option<MapKey>,
    production: Option<Production>,
    requires_module_instance: bool,
    unresolved: Option<Rc<Binding>>,
}

impl Binding {
    pub fn builder(kind: BindingKind, key: Key) -> BindingBuilder {
        BindingBuilder {
            key,
            kind,
            contribution_type: ContributionType::Unique,
            binding_element: None,
            contributing_module: None,
            explicit_dependencies: Vec::new(),
            implicit_dependencies: Vec::new(),
            scope: None,
            nullable: false,
            map_key: None,
            production: None,
            requires_module_instance: false,
            unresolved: None,
        }
    }

    pub fn to_builder(&self) -> BindingBuilder {
        BindingBuilder {
            key: self.key.clone(),
            kind: self.kind,
            contribution_type: self.contribution_type,
            binding_element: self.binding_element.clone(),
            contributing_module: self.contributing_module.clone(),
            explicit_dependencies: self.explicit_dependencies.clone(),
            implicit_dependencies: self.implicit_dependencies.clone(),
            scope: self.scope.clone(),
            nullable: self.nullable,
            map_key: self.map_key.clone(),
            production: self.production.clone(),
            requires_module_instance: self.requires_module_instance,
            unresolved: self.unresolved.clone(),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    pub fn binding_type(&self) -> BindingType {
        if self.kind == BindingKind::MembersInjection {
            BindingType::MembersInjection
        } else if self.production.is_some() {
            BindingType::Production
        } else {
            BindingType::Provision
        }
    }

    pub fn is_production(&self) -> bool {
        self.binding_type() == BindingType::Production
    }

    pub fn contribution_type(&self) -> ContributionType {
        self.contribution_type
    }

    pub fn binding_element(&self) -> Option<&ElementId> {
        self.binding_element.as_ref()
    }

    pub fn contributing_module(&self) -> Option<&str> {
        self.contributing_module.as_deref()
    }

    pub fn explicit_dependencies(&self) -> &[DependencyRequest] {
        &self.explicit_dependencies
    }

    pub fn implicit_dependencies(&self) -> &[DependencyRequest] {
        &self.implicit_dependencies
    }

    /// Explicit then implicit requests, without duplicates.
    pub fn dependencies(&self) -> &[DependencyRequest] {
        &self.dependencies
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn map_key(&self) -> Option<&MapKey> {
        self.map_key.as_ref()
    }

    pub fn requires_module_instance(&self) -> bool {
        self.requires_module_instance
    }

    /// The binding built against the bare declared type of a generic element.
    pub fn unresolved(&self) -> Option<&Rc<Binding>> {
        self.unresolved.as_ref()
    }

    pub fn production_kind(&self) -> ProductionKind {
        match &self.production {
            Some(production) => production.kind,
            None => panic!("{} binding for {} is not a production binding", self.kind, self.key),
        }
    }

    pub fn thrown_types(&self) -> &[TypeName] {
        match &self.production {
            Some(production) => &production.thrown_types,
            None => panic!("{} binding for {} is not a production binding", self.kind, self.key),
        }
    }

    /// The request for the bound key of a `@Binds` binding.
    pub fn delegate_request(&self) -> Option<&DependencyRequest> {
        assert_eq!(
            self.kind,
            BindingKind::Delegate,
            "delegate_request() called on {} binding for {}",
            self.kind,
            self.key
        );
        self.explicit_dependencies.first()
    }

    /// A `@Binds` binding whose target resolved to nothing.
    pub fn is_unresolved_delegate(&self) -> bool {
        self.kind == BindingKind::Delegate && self.dependencies.is_empty()
    }

    /// Whether a present or absent `Optional` binding.
    pub fn is_present_optional(&self) -> bool {
        assert_eq!(
            self.kind,
            BindingKind::Optional,
            "is_present_optional() called on {} binding for {}",
            self.kind,
            self.key
        );
        !self.dependencies.is_empty()
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.key)?;
        if let Some(element) = &self.binding_element {
            write!(f, " [{element}]")?;
        }
        Ok(())
    }
}

pub struct BindingBuilder {
    key: Key,
    kind: BindingKind,
    contribution_type: ContributionType,
    binding_element: Option<ElementId>,
    contributing_module: Option<String>,
    explicit_dependencies: Vec<DependencyRequest>,
    implicit_dependencies: Vec<DependencyRequest>,
    scope: Option<Scope>,
    nullable: bool,
    map_key: Option<MapKey>,
    production: Option<Production>,
    requires_module_instance: bool,
    unresolved: Option<Rc<Binding>>,
}

impl BindingBuilder {
    pub fn key(mut self, key: Key) -> Self {
        self.key = key;
        self
    }

    pub fn contribution_type(mut self, contribution_type: ContributionType) -> Self {
        self.contribution_type = contribution_type;
        self
    }

    pub fn binding_element(mut self, element: ElementId) -> Self {
        self.binding_element = Some(element);
        self
    }

    pub fn contributing_module(mut self, module: impl Into<String>) -> Self {
        self.contributing_module = Some(module.into());
        self
    }

    pub fn dependencies(mut self, dependencies: Vec<DependencyRequest>) -> Self {
        self.explicit_dependencies = dependencies;
        self
    }

    pub fn implicit_dependencies(mut self, dependencies: Vec<DependencyRequest>) -> Self {
        self.implicit_dependencies = dependencies;
        self
    }

    pub fn scope(mut self, scope: Option<Scope>) -> Self {
        self.scope = scope;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn map_key(mut self, map_key: Option<MapKey>) -> Self {
        self.map_key = map_key;
        self
    }

    pub fn production(mut self, kind: ProductionKind, thrown_types: Vec<TypeName>) -> Self {
        self.production = Some(Production { kind, thrown_types });
        self
    }

    pub fn requires_module_instance(mut self, value: bool) -> Self {
        self.requires_module_instance = value;
        self
    }

    pub fn unresolved(mut self, unresolved: Option<Rc<Binding>>) -> Self {
        self.unresolved = unresolved;
        self
    }

    pub fn build(self) -> Binding {
        let mut dependencies: Vec<DependencyRequest> = Vec::new();
        for request in self.explicit_dependencies.iter().chain(&self.implicit_dependencies) {
            if !dependencies.contains(request) {
                dependencies.push(request.clone());
            }
        }
        Binding {
            key: self.key,
            kind: self.kind,
            contribution_type: self.contribution_type,
            binding_element: self.binding_element,
            contributing_module: self.contributing_module,
            explicit_dependencies: self.explicit_dependencies,
            implicit_dependencies: self.implicit_dependencies,
            dependencies,
            scope: self.scope,
            nullable: self.nullable,
            map_key: self.map_key,
            production: self.production,
            requires_module_instance: self.requires_module_instance,
            unresolved: self.unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestKind;

    #[test]
    fn test_dependencies_deduplicated() {
        let foo = DependencyRequest::new(Key::of(TypeName::simple("Foo")), RequestKind::Instance);
        let bar = DependencyRequest::new(Key::of(TypeName::simple("Bar")), RequestKind::Provider);
        let binding = Binding::builder(BindingKind::Production, Key::of(TypeName::simple("Baz")))
            .dependencies(vec![foo.clone(), bar.clone()])
            .implicit_dependencies(vec![bar.clone(), foo.clone()])
            .production(ProductionKind::Immediate, Vec::new())
            .build();
        assert_eq!(binding.dependencies(), &[foo, bar]);
        assert_eq!(binding.binding_type(), BindingType::Production);
    }

    #[test]
    #[should_panic]
    fn test_wrong_kind_accessor() {
        let binding =
            Binding::builder(BindingKind::Injection, Key::of(TypeName::simple("Foo"))).build();
        binding.delegate_request();
    }
}
