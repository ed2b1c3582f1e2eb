use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::binding::ContributionType;
use crate::model::{ModuleMethodDecl, ModuleMethodKind};
use crate::types::{FrameworkType, TypeName};
use crate::GraphError;

/// A qualifier annotation such as `@Named("db")`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Qualifier {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl Qualifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn named(value: impl Into<String>) -> Self {
        Self {
            name: "Named".to_owned(),
            value: Some(value.into()),
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "@{}({value:?})", self.name),
            None => write!(f, "@{}", self.name),
        }
    }
}

/// Identifies one contribution to a multibinding, so that two modules
/// contributing the same element type produce distinct keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MultibindingContributionIdentifier {
    pub module: String,
    pub binding_element: String,
}

impl fmt::Display for MultibindingContributionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.module, self.binding_element)
    }
}

#[derive(Debug)]
struct KeyInner {
    ty: TypeName,
    qualifier: Option<Qualifier>,
    contribution: Option<MultibindingContributionIdentifier>,
    hash: u64,
}

/// Lookup identity of a binding.
///
/// Keys are cheap to clone and cache their hash, since every resolver map
/// is keyed by them.
#[derive(Clone)]
pub struct Key(Rc<KeyInner>);

impl Key {
    fn from_parts(
        ty: TypeName,
        qualifier: Option<Qualifier>,
        contribution: Option<MultibindingContributionIdentifier>,
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        ty.hash(&mut hasher);
        qualifier.hash(&mut hasher);
        contribution.hash(&mut hasher);
        Self(Rc::new(KeyInner {
            ty,
            qualifier,
            contribution,
            hash: hasher.finish(),
        }))
    }

    /// Builds a key for the boxed form of `ty`.
    pub fn for_qualified_type(qualifier: Option<Qualifier>, ty: TypeName) -> Self {
        Self::from_parts(ty.boxed(), qualifier, None)
    }

    pub fn of(ty: TypeName) -> Self {
        Self::for_qualified_type(None, ty)
    }

    pub fn ty(&self) -> &TypeName {
        &self.0.ty
    }

    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.0.qualifier.as_ref()
    }

    pub fn contribution(&self) -> Option<&MultibindingContributionIdentifier> {
        self.0.contribution.as_ref()
    }

    pub fn with_type(&self, ty: TypeName) -> Self {
        Self::from_parts(ty.boxed(), self.0.qualifier.clone(), self.0.contribution.clone())
    }

    pub fn with_contribution(&self, contribution: MultibindingContributionIdentifier) -> Self {
        Self::from_parts(self.0.ty.clone(), self.0.qualifier.clone(), Some(contribution))
    }

    /// The key a multibinding contribution contributes to.
    pub fn without_contribution(&self) -> Self {
        if self.0.contribution.is_none() {
            return self.clone();
        }
        Self::from_parts(self.0.ty.clone(), self.0.qualifier.clone(), None)
    }

    pub fn for_component(ty: TypeName) -> Self {
        Self::of(ty)
    }

    pub fn for_subcomponent_creator(ty: TypeName) -> Self {
        Self::of(ty)
    }

    pub fn for_members_injected_type(ty: TypeName) -> Self {
        Self::of(ty)
    }

    pub fn for_members_injector(ty: TypeName) -> Self {
        Self::of(TypeName::wrap(FrameworkType::MembersInjector, ty))
    }

    /// `@Production Executor`, requested by every production binding.
    pub fn for_production_executor() -> Self {
        Self::for_qualified_type(Some(Qualifier::new("Production")), TypeName::simple(EXECUTOR))
    }

    /// `@ProductionImplementation Executor`, the user supplied executor.
    pub fn for_production_implementation_executor() -> Self {
        Self::for_qualified_type(
            Some(Qualifier::new("ProductionImplementation")),
            TypeName::simple(EXECUTOR),
        )
    }

    pub fn for_production_component_monitor() -> Self {
        Self::of(TypeName::simple(PRODUCTION_COMPONENT_MONITOR))
    }

    /// Key of a `@Provides` method.
    pub fn for_provides_method(
        method: &ModuleMethodDecl,
        return_type: &TypeName,
        module: &str,
    ) -> Result<Self, GraphError> {
        Self::for_binding_method(method, return_type, module, Some(FrameworkType::Provider))
    }

    /// Key of a `@Produces` method. A `ListenableFuture<T>` return type
    /// contributes `T`, and `Set<ListenableFuture<T>>` elements contribute
    /// `Set<T>`.
    pub fn for_produces_method(
        method: &ModuleMethodDecl,
        return_type: &TypeName,
        module: &str,
    ) -> Result<Self, GraphError> {
        let unwrapped = if let Some(inner) =
            return_type.unwrap_type(FrameworkType::ListenableFuture)
        {
            inner.clone()
        } else if ContributionType::from(method.contribution) == ContributionType::SetValues
            && let Some(inner) = return_type
                .unwrap_type(FrameworkType::Set)
                .and_then(|v| v.unwrap_type(FrameworkType::ListenableFuture))
        {
            TypeName::set_of(inner.clone())
        } else {
            return_type.clone()
        };
        Self::for_binding_method(method, &unwrapped, module, Some(FrameworkType::Producer))
    }

    /// Key of a `@Binds` method. Map contributions keep their plain value type.
    pub fn for_binds_method(
        method: &ModuleMethodDecl,
        return_type: &TypeName,
        module: &str,
    ) -> Result<Self, GraphError> {
        Self::for_binding_method(method, return_type, module, None)
    }

    fn for_binding_method(
        method: &ModuleMethodDecl,
        return_type: &TypeName,
        module: &str,
        framework: Option<FrameworkType>,
    ) -> Result<Self, GraphError> {
        let contribution = ContributionType::from(method.contribution);
        let ty = match contribution {
            ContributionType::Unique => return_type.clone(),
            ContributionType::Set => TypeName::set_of(return_type.boxed()),
            ContributionType::SetValues => {
                if !return_type.is_type_of(FrameworkType::Set) {
                    return Err(GraphError::invalid(
                        &method.name,
                        "@ElementsIntoSet must return a Set",
                    ));
                }
                return_type.clone()
            }
            ContributionType::Map => {
                let map_key = method.map_key.as_ref().ok_or_else(|| {
                    GraphError::invalid(&method.name, "@IntoMap requires a map key")
                })?;
                let value = match framework {
                    Some(framework) => TypeName::wrap(framework, return_type.boxed()),
                    None => return_type.boxed(),
                };
                TypeName::map_of(map_key.ty.boxed(), value)
            }
        };
        let key = Self::for_qualified_type(method.qualifier.clone(), ty);
        Ok(if contribution.is_multibinding() {
            key.with_contribution(MultibindingContributionIdentifier {
                module: module.to_owned(),
                binding_element: method.name.clone(),
            })
        } else {
            key
        })
    }

    /// Key of a `@Multibinds` declaration. Map declarations are keyed by the
    /// provider-valued map.
    pub fn for_multibinds_method(method: &ModuleMethodDecl, return_type: &TypeName) -> Self {
        debug_assert_eq!(method.kind, ModuleMethodKind::Multibinds);
        let key = Self::for_qualified_type(method.qualifier.clone(), return_type.clone());
        key.wrap_map_key(FrameworkType::Provider).unwrap_or(key)
    }

    /// Key under which a delegate binding is stored. Map contributions are
    /// stored under the framework-valued map.
    pub fn for_delegate_binding(
        key: &Key,
        contribution: ContributionType,
        framework: FrameworkType,
    ) -> Self {
        if contribution == ContributionType::Map {
            if let Some((k, v)) = key.map_types() {
                let value = TypeName::wrap(framework, v.clone());
                return key.with_type(TypeName::map_of(k.clone(), value));
            }
        }
        key.clone()
    }

    /// `Optional<T>` request key to the key of `T`, looking through request
    /// wrappers such as `Provider<T>`.
    pub fn unwrap_optional(&self) -> Option<Key> {
        let inner = self.ty().unwrap_type(FrameworkType::Optional)?;
        let ty = crate::request::extract_key_type(inner);
        Some(Self::from_parts(ty.boxed(), self.0.qualifier.clone(), None))
    }

    /// `Map<K, Provider<V>>` (or another framework value) to `Map<K, V>`.
    pub fn unwrap_map_value_type(&self) -> Key {
        if let Some((k, v)) = self.map_types()
            && v.framework_type().is_some_and(is_map_value_framework_type)
            && let Some(inner) = v.type_argument(0)
        {
            return self.with_type(TypeName::map_of(k.clone(), inner.clone()));
        }
        self.clone()
    }

    /// `Set<Wrapper<T>>` to `Set<T>`.
    pub fn unwrap_set_key(&self, wrapper: FrameworkType) -> Option<Key> {
        let element = self.ty().unwrap_type(FrameworkType::Set)?;
        let inner = element.unwrap_type(wrapper)?;
        Some(self.with_type(TypeName::set_of(inner.clone())))
    }

    /// `Map<K, From<V>>` to `Map<K, To<V>>`.
    pub fn rewrap_map_key(&self, from: FrameworkType, to: FrameworkType) -> Option<Key> {
        let (k, v) = self.map_types()?;
        let inner = v.unwrap_type(from)?;
        Some(self.with_type(TypeName::map_of(k.clone(), TypeName::wrap(to, inner.clone()))))
    }

    /// `Map<K, V>` to `Map<K, Wrapper<V>>` unless the values already are
    /// `Wrapper`s.
    pub fn wrap_map_key(&self, wrapper: FrameworkType) -> Option<Key> {
        let (k, v) = self.map_types()?;
        if v.is_type_of(wrapper) {
            return None;
        }
        Some(self.with_type(TypeName::map_of(k.clone(), TypeName::wrap(wrapper, v.clone()))))
    }

    /// Framework-valued map keys whose contributions also satisfy this map.
    pub fn implicit_framework_map_keys(&self) -> Vec<Key> {
        let provider = self
            .rewrap_map_key(FrameworkType::Produced, FrameworkType::Provider)
            .or_else(|| self.wrap_map_key(FrameworkType::Provider));
        let producer = self
            .rewrap_map_key(FrameworkType::Produced, FrameworkType::Producer)
            .or_else(|| self.wrap_map_key(FrameworkType::Producer));
        let mut keys = Vec::new();
        for key in [provider, producer].into_iter().flatten() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Key and value types of a non-raw `Map`.
    pub fn map_types(&self) -> Option<(&TypeName, &TypeName)> {
        let ty = self.ty();
        if !ty.is_type_of(FrameworkType::Map) {
            return None;
        }
        match ty.args() {
            [k, v] => Some((k, v)),
            _ => None,
        }
    }

    pub fn is_map(&self) -> bool {
        self.ty().is_type_of(FrameworkType::Map)
    }

    pub fn is_set(&self) -> bool {
        self.ty().is_type_of(FrameworkType::Set)
    }
}

pub(crate) const EXECUTOR: &str = "java.util.concurrent.Executor";
pub(crate) const PRODUCTION_COMPONENT_MONITOR: &str =
    "dagger.producers.monitoring.ProductionComponentMonitor";

fn is_map_value_framework_type(framework: FrameworkType) -> bool {
    matches!(
        framework,
        FrameworkType::Provider | FrameworkType::Producer | FrameworkType::Produced
    )
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
            || (self.0.hash == other.0.hash
                && self.0.ty == other.0.ty
                && self.0.qualifier == other.0.qualifier
                && self.0.contribution == other.0.contribution)
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(qualifier) = &self.0.qualifier {
            write!(f, "{qualifier} ")?;
        }
        write!(f, "{}", self.0.ty)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.contribution {
            Some(contribution) => write!(f, "Key({self} [{contribution}])"),
            None => write!(f, "Key({self})"),
        }
    }
}
