//! Declarative program model.
//!
//! This is what the front-end hands over after it has validated annotation
//! usage: every injectable type, module, component, component dependency and
//! assisted factory, with their types and parameter lists. The model is
//! plain data and can be loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::key::Qualifier;
use crate::types::TypeName;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Program {
    pub injectables: Vec<InjectableDecl>,
    pub modules: Vec<ModuleDecl>,
    pub components: Vec<ComponentDecl>,
    pub dependency_types: Vec<DependencyTypeDecl>,
    pub assisted_factories: Vec<AssistedFactoryDecl>,
}

impl Program {
    pub fn injectable(&self, name: &str) -> Option<&InjectableDecl> {
        self.injectables.iter().find(|v| v.name == name)
    }

    pub fn module(&self, name: &str) -> Option<&ModuleDecl> {
        self.modules.iter().find(|v| v.name == name)
    }

    pub fn component(&self, name: &str) -> Option<&ComponentDecl> {
        self.components.iter().find(|v| v.name == name)
    }

    pub fn dependency_type(&self, name: &str) -> Option<&DependencyTypeDecl> {
        self.dependency_types.iter().find(|v| v.name == name)
    }

    pub fn assisted_factory(&self, name: &str) -> Option<&AssistedFactoryDecl> {
        self.assisted_factories.iter().find(|v| v.name == name)
    }

    /// Returns the component whose creator has the given type name.
    pub fn component_for_creator(&self, creator: &str) -> Option<&ComponentDecl> {
        self.components
            .iter()
            .find(|v| v.creator.as_ref().is_some_and(|c| c.name == creator))
    }

    /// Root components: every component that is not a subcomponent.
    pub fn root_components(&self) -> impl Iterator<Item = &ComponentDecl> {
        self.components.iter().filter(|v| !v.kind.is_subcomponent())
    }
}

/// A parameter of a constructor, method or creator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeName,
    #[serde(default)]
    pub qualifier: Option<Qualifier>,
    /// Supplied by the caller of an assisted factory, not by the graph.
    #[serde(default)]
    pub assisted: bool,
    #[serde(default)]
    pub nullable: bool,
}

/// A class with an `@Inject`/`@AssistedInject` constructor and/or injected members.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InjectableDecl {
    pub name: String,
    #[serde(default)]
    pub type_params: Vec<String>,
    #[serde(default)]
    pub constructor: Option<ConstructorDecl>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub injection_sites: Vec<InjectionSiteDecl>,
    /// Parameterized supertype whose injection sites are inherited.
    #[serde(default)]
    pub supertype: Option<TypeName>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConstructorDecl {
    /// `@AssistedInject` rather than `@Inject`.
    #[serde(default)]
    pub assisted: bool,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionSiteKind {
    Field,
    Method,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InjectionSiteDecl {
    pub kind: InjectionSiteKind,
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleDecl {
    pub name: String,
    #[serde(default)]
    pub type_params: Vec<String>,
    /// Parameterized parent module whose methods are inherited.
    #[serde(default)]
    pub supertype: Option<TypeName>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub subcomponents: Vec<String>,
    /// `@ProducerModule` rather than `@Module`.
    #[serde(default)]
    pub producer: bool,
    #[serde(default)]
    pub methods: Vec<ModuleMethodDecl>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleMethodKind {
    Provides,
    Produces,
    Binds,
    Multibinds,
    BindsOptionalOf,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionDecl {
    #[default]
    Unique,
    IntoSet,
    ElementsIntoSet,
    IntoMap,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapKeyDecl {
    #[serde(rename = "type")]
    pub ty: TypeName,
    pub value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleMethodDecl {
    pub name: String,
    pub kind: ModuleMethodKind,
    pub return_type: TypeName,
    #[serde(default)]
    pub qualifier: Option<Qualifier>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub contribution: ContributionDecl,
    #[serde(default)]
    pub map_key: Option<MapKeyDecl>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub thrown_types: Vec<TypeName>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentDeclKind {
    Component,
    Subcomponent,
    ProductionComponent,
    ProductionSubcomponent,
}

impl ComponentDeclKind {
    pub fn is_subcomponent(self) -> bool {
        matches!(
            self,
            ComponentDeclKind::Subcomponent | ComponentDeclKind::ProductionSubcomponent
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentDecl {
    pub name: String,
    pub kind: ComponentDeclKind,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub methods: Vec<ComponentMethodDecl>,
    #[serde(default)]
    pub creator: Option<CreatorDecl>,
}

/// An abstract method of a component or of a component dependency type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentMethodDecl {
    pub name: String,
    /// `None` for `void` methods.
    #[serde(default)]
    pub return_type: Option<TypeName>,
    #[serde(default)]
    pub qualifier: Option<Qualifier>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub nullable: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatorKind {
    Builder,
    Factory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreatorDecl {
    pub name: String,
    pub kind: CreatorKind,
    #[serde(default)]
    pub params: Vec<CreatorParamDecl>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatorParamKind {
    Module,
    Dependency,
    BoundInstance,
}

/// A builder setter or factory method parameter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreatorParamDecl {
    pub name: String,
    pub kind: CreatorParamKind,
    #[serde(rename = "type")]
    pub ty: TypeName,
    #[serde(default)]
    pub qualifier: Option<Qualifier>,
    #[serde(default)]
    pub nullable: bool,
}

/// A type listed in a component's `dependencies`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DependencyTypeDecl {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<ComponentMethodDecl>,
}

/// An `@AssistedFactory` interface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssistedFactoryDecl {
    pub name: String,
    pub method: String,
    pub return_type: TypeName,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}
