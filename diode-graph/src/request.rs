use std::fmt;
use std::rc::Rc;

use crate::binding::{Binding, ContributionType};
use crate::key::Key;
use crate::model::{ComponentMethodDecl, ParamDecl};
use crate::types::{FrameworkType, TypeName};

/// The calling convention of a dependency request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestKind {
    Instance,
    Provider,
    Lazy,
    ProviderOfLazy,
    MembersInjection,
    Producer,
    Produced,
    Future,
}

impl RequestKind {
    pub fn framework_type(self) -> Option<FrameworkType> {
        match self {
            RequestKind::Provider => Some(FrameworkType::Provider),
            RequestKind::Lazy => Some(FrameworkType::Lazy),
            RequestKind::Producer => Some(FrameworkType::Producer),
            RequestKind::Produced => Some(FrameworkType::Produced),
            RequestKind::Future => Some(FrameworkType::ListenableFuture),
            _ => None,
        }
    }

    /// Whether the request can be satisfied without running the binding
    /// synchronously, which breaks dependency cycles.
    pub fn breaks_cycles(self) -> bool {
        matches!(
            self,
            RequestKind::Provider
                | RequestKind::Lazy
                | RequestKind::ProviderOfLazy
                | RequestKind::Producer
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            RequestKind::Instance => "INSTANCE",
            RequestKind::Provider => "PROVIDER",
            RequestKind::Lazy => "LAZY",
            RequestKind::ProviderOfLazy => "PROVIDER_OF_LAZY",
            RequestKind::MembersInjection => "MEMBERS_INJECTION",
            RequestKind::Producer => "PRODUCER",
            RequestKind::Produced => "PRODUCED",
            RequestKind::Future => "FUTURE",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classifies a declared parameter or return type.
///
/// `ListenableFuture<T>` is only a request kind on production entry points,
/// so it is classified as an instance request here.
pub fn request_kind_of(ty: &TypeName) -> RequestKind {
    if ty.args().len() != 1 {
        return RequestKind::Instance;
    }
    match ty.framework_type() {
        Some(FrameworkType::Provider) => {
            match ty.type_argument(0) {
                Some(inner) if inner.is_type_of(FrameworkType::Lazy) && inner.args().len() == 1 => {
                    RequestKind::ProviderOfLazy
                }
                _ => RequestKind::Provider,
            }
        }
        Some(FrameworkType::Lazy) => RequestKind::Lazy,
        Some(FrameworkType::Producer) => RequestKind::Producer,
        Some(FrameworkType::Produced) => RequestKind::Produced,
        _ => RequestKind::Instance,
    }
}

/// Unwraps the framework wrappers of a request type to the type of its key.
pub fn extract_key_type(ty: &TypeName) -> TypeName {
    match request_kind_of(ty) {
        RequestKind::Instance => ty.clone(),
        RequestKind::ProviderOfLazy => ty
            .type_argument(0)
            .and_then(|v| v.type_argument(0))
            .cloned()
            .unwrap_or_else(|| ty.clone()),
        _ => ty.type_argument(0).cloned().unwrap_or_else(|| ty.clone()),
    }
}

/// A program element: a method, parameter or field named within its owner.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    pub owner: String,
    pub name: String,
}

impl ElementId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// A type element, such as a component or an injected class.
    pub fn for_type(name: impl Into<String>) -> Self {
        Self {
            owner: name.into(),
            name: String::new(),
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            f.write_str(&self.owner)
        } else {
            write!(f, "{}.{}", self.owner, self.name)
        }
    }
}

/// A request for a key in a specific calling convention.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DependencyRequest {
    pub key: Key,
    pub kind: RequestKind,
    pub request_element: Option<ElementId>,
    pub nullable: bool,
}

impl DependencyRequest {
    pub fn new(key: Key, kind: RequestKind) -> Self {
        Self {
            key,
            kind,
            request_element: None,
            nullable: false,
        }
    }

    pub fn with_element(mut self, element: ElementId) -> Self {
        self.request_element = Some(element);
        self
    }

    /// Request for a constructor, method or injection site parameter whose
    /// type has already been resolved against the enclosing type.
    pub fn for_required_resolved_variable(
        param: &ParamDecl,
        resolved_type: &TypeName,
        owner: &str,
    ) -> Self {
        let kind = request_kind_of(resolved_type);
        Self {
            key: Key::for_qualified_type(param.qualifier.clone(), extract_key_type(resolved_type)),
            kind,
            request_element: Some(ElementId::new(owner, &param.name)),
            nullable: param.nullable,
        }
    }

    /// Requests for every parameter that is not `@Assisted`.
    pub fn for_required_resolved_variables<'a>(
        params: impl IntoIterator<Item = (&'a ParamDecl, TypeName)>,
        owner: &str,
    ) -> Vec<Self> {
        params
            .into_iter()
            .filter(|(param, _)| !param.assisted)
            .map(|(param, ty)| Self::for_required_resolved_variable(param, &ty, owner))
            .collect()
    }

    pub fn for_component_provision_method(
        method: &ComponentMethodDecl,
        return_type: &TypeName,
        owner: &str,
    ) -> Self {
        Self {
            key: Key::for_qualified_type(method.qualifier.clone(), extract_key_type(return_type)),
            kind: request_kind_of(return_type),
            request_element: Some(ElementId::new(owner, &method.name)),
            nullable: method.nullable,
        }
    }

    /// Entry point of a production component, where `ListenableFuture<T>`
    /// requests a future of `T`.
    pub fn for_component_production_method(
        method: &ComponentMethodDecl,
        return_type: &TypeName,
        owner: &str,
    ) -> Self {
        match return_type.unwrap_type(FrameworkType::ListenableFuture) {
            Some(inner) => Self {
                key: Key::for_qualified_type(method.qualifier.clone(), inner.clone()),
                kind: RequestKind::Future,
                request_element: Some(ElementId::new(owner, &method.name)),
                nullable: false,
            },
            None => Self::for_component_provision_method(method, return_type, owner),
        }
    }

    /// `void inject(T)` and `T inject(T)` entry points.
    pub fn for_component_members_injection_method(
        method: &ComponentMethodDecl,
        injected_type: &TypeName,
        owner: &str,
    ) -> Self {
        Self {
            key: Key::for_members_injected_type(injected_type.clone()),
            kind: RequestKind::MembersInjection,
            request_element: Some(ElementId::new(owner, &method.name)),
            nullable: false,
        }
    }

    /// Requests of a synthetic multibinding for its individual contributions.
    pub fn for_multibinding_contributions<'a>(
        multibinding_key: &Key,
        contributions: impl IntoIterator<Item = &'a Rc<Binding>>,
    ) -> Vec<Self> {
        let map_value_kind = multibinding_key.map_types().and_then(|(_, v)| {
            if v.is_type_of(FrameworkType::Provider) {
                Some(RequestKind::Provider)
            } else if v.is_type_of(FrameworkType::Producer) {
                Some(RequestKind::Producer)
            } else {
                None
            }
        });
        let mut requests: Vec<Self> = Vec::new();
        for contribution in contributions {
            assert!(
                contribution.key().contribution().is_some(),
                "{} is not a multibinding contribution",
                contribution.key()
            );
            let kind = match contribution.contribution_type() {
                ContributionType::Map => map_value_kind.unwrap_or(RequestKind::Instance),
                ContributionType::Set | ContributionType::SetValues => RequestKind::Instance,
                ContributionType::Unique => {
                    panic!("{} must be a multibinding contribution", contribution.key())
                }
            };
            let request = Self::new(contribution.key().clone(), kind);
            if !requests.contains(&request) {
                requests.push(request);
            }
        }
        requests
    }

    /// Request of a present `Optional<T>` binding for `T`.
    pub fn for_synthetic_present_optional_binding(optional_key: &Key) -> Self {
        let key = optional_key
            .unwrap_optional()
            .unwrap_or_else(|| panic!("{optional_key} is not an Optional key"));
        let kind = optional_key
            .ty()
            .type_argument(0)
            .map(request_kind_of)
            .unwrap_or(RequestKind::Instance);
        Self::new(key, kind)
    }

    pub fn for_production_implementation_executor() -> Self {
        Self::new(Key::for_production_implementation_executor(), RequestKind::Provider)
    }

    pub fn for_production_executor() -> Self {
        Self::new(Key::for_production_executor(), RequestKind::Provider)
    }

    pub fn for_production_component_monitor() -> Self {
        Self::new(Key::for_production_component_monitor(), RequestKind::Provider)
    }
}

impl fmt::Display for DependencyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RequestKind::Instance => write!(f, "{}", self.key),
            kind => write!(f, "{} ({kind})", self.key),
        }
    }
}
