use std::collections::HashMap;
use std::rc::Rc;

use crate::binding::{Binding, BindingKind, ContributionType, MapKey, ProductionKind, Scope};
use crate::component::ComponentRequirement;
use crate::declarations::{DelegateDeclaration, SubcomponentDeclaration};
use crate::key::Key;
use crate::model::{
    AssistedFactoryDecl, ComponentMethodDecl, InjectableDecl, ModuleMethodDecl, Program,
};
use crate::request::{DependencyRequest, ElementId, RequestKind};
use crate::types::{FrameworkType, TypeName};
use crate::GraphError;

/// Builds bindings from declared elements.
///
/// The factory itself keeps no state: caching of injection bindings lives in
/// the [`Session`](crate::Session).
pub struct BindingFactory<'p> {
    program: &'p Program,
}

impl<'p> BindingFactory<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    /// Binding of a `@Provides` method.
    ///
    /// `declaring` is the module that declares the method, `contributing` the
    /// installed module it is reached through, and `bindings` the
    /// substitution of the declaring module's type parameters.
    pub fn provides_method_binding(
        &self,
        method: &ModuleMethodDecl,
        declaring: &str,
        contributing: &str,
        bindings: &HashMap<String, TypeName>,
    ) -> Result<Binding, GraphError> {
        self.binding_method(BindingKind::Provision, method, declaring, contributing, bindings)
    }

    /// Binding of a `@Produces` method.
    pub fn produces_method_binding(
        &self,
        method: &ModuleMethodDecl,
        declaring: &str,
        contributing: &str,
        bindings: &HashMap<String, TypeName>,
    ) -> Result<Binding, GraphError> {
        self.binding_method(BindingKind::Production, method, declaring, contributing, bindings)
    }

    fn binding_method(
        &self,
        kind: BindingKind,
        method: &ModuleMethodDecl,
        declaring: &str,
        contributing: &str,
        bindings: &HashMap<String, TypeName>,
    ) -> Result<Binding, GraphError> {
        let return_type = method.return_type.substitute(bindings);
        let param_types: Vec<_> = method.params.iter().map(|p| p.ty.substitute(bindings)).collect();
        let key = match kind {
            BindingKind::Production => {
                Key::for_produces_method(method, &return_type, contributing)?
            }
            _ => Key::for_provides_method(method, &return_type, contributing)?,
        };
        let owner = format!("{declaring}.{}", method.name);
        let mut builder = Binding::builder(kind, key)
            .contribution_type(method.contribution.into())
            .binding_element(ElementId::new(declaring, &method.name))
            .contributing_module(contributing)
            .dependencies(DependencyRequest::for_required_resolved_variables(
                method.params.iter().zip(param_types.iter().cloned()),
                &owner,
            ))
            .scope(method.scope.clone().map(Scope::new))
            .nullable(method.nullable)
            .map_key(method.map_key.as_ref().map(MapKey::from))
            .requires_module_instance(!method.is_static);
        if kind == BindingKind::Production {
            builder = builder
                .implicit_dependencies(vec![
                    DependencyRequest::for_production_implementation_executor(),
                    DependencyRequest::for_production_component_monitor(),
                ])
                .production(
                    production_kind(method, &return_type),
                    method.thrown_types.iter().map(|v| v.substitute(bindings)).collect(),
                );
        }
        // Reached through a generic parent module: keep the parent-shaped
        // binding for duplicate detection.
        let changed = return_type != method.return_type
            || param_types.iter().zip(&method.params).any(|(ty, p)| *ty != p.ty);
        if declaring != contributing && changed {
            let unresolved =
                self.binding_method(kind, method, declaring, declaring, &HashMap::new())?;
            builder = builder.unresolved(Some(Rc::new(unresolved)));
        }
        Ok(builder.build())
    }

    /// Binding of an `@Inject` or `@AssistedInject` constructor.
    ///
    /// With a `resolved_type` different from the declared type the binding
    /// carries the binding of the bare declared type as `unresolved()`.
    pub fn injection_binding(
        &self,
        injectable: &InjectableDecl,
        resolved_type: Option<&TypeName>,
    ) -> Result<Binding, GraphError> {
        let constructor = injectable.constructor.as_ref().ok_or_else(|| {
            GraphError::invalid(&injectable.name, "type has no injectable constructor")
        })?;
        let declared = declared_type(&injectable.name, &injectable.type_params);
        let ty = resolved_type.cloned().unwrap_or_else(|| declared.clone());
        let bindings = ty.bind_type_params(&injectable.type_params).unwrap_or_default();
        let kind = if constructor.assisted {
            BindingKind::AssistedInjection
        } else {
            BindingKind::Injection
        };
        let owner = format!("{}.<init>", injectable.name);
        let dependencies = DependencyRequest::for_required_resolved_variables(
            constructor.params.iter().map(|p| (p, p.ty.substitute(&bindings))),
            &owner,
        );
        let unresolved = match resolved_type {
            Some(resolved) if *resolved != declared => {
                Some(Rc::new(self.injection_binding(injectable, None)?))
            }
            _ => None,
        };
        Ok(Binding::builder(kind, Key::of(ty.clone()))
            .binding_element(ElementId::for_type(&injectable.name))
            .dependencies(dependencies)
            .implicit_dependencies(self.injection_site_dependencies(&ty)?)
            .scope(injectable.scope.clone().map(Scope::new))
            .unresolved(unresolved)
            .build())
    }

    /// Dependencies of the injected members of `ty` and its supertypes,
    /// supertype members first.
    pub fn injection_site_dependencies(
        &self,
        ty: &TypeName,
    ) -> Result<Vec<DependencyRequest>, GraphError> {
        let mut chain: Vec<(&InjectableDecl, HashMap<String, TypeName>)> = Vec::new();
        let mut current = ty.clone();
        while let Some(injectable) = current.name().and_then(|v| self.program.injectable(v)) {
            if chain.iter().any(|(v, _)| v.name == injectable.name) {
                return Err(GraphError::invalid(&injectable.name, "cyclic supertype chain"));
            }
            let bindings = current.bind_type_params(&injectable.type_params).unwrap_or_default();
            let supertype = injectable.supertype.as_ref().map(|v| v.substitute(&bindings));
            chain.push((injectable, bindings));
            match supertype {
                Some(supertype) => current = supertype,
                None => break,
            }
        }
        let mut dependencies: Vec<DependencyRequest> = Vec::new();
        for (injectable, bindings) in chain.iter().rev() {
            for site in &injectable.injection_sites {
                let owner = format!("{}.{}", injectable.name, site.name);
                let requests = DependencyRequest::for_required_resolved_variables(
                    site.params.iter().map(|p| (p, p.ty.substitute(bindings))),
                    &owner,
                );
                for request in requests {
                    if !dependencies.contains(&request) {
                        dependencies.push(request);
                    }
                }
            }
        }
        Ok(dependencies)
    }

    /// Binding for injecting the members of an existing instance of `ty`.
    pub fn members_injection_binding(&self, ty: &TypeName) -> Result<Binding, GraphError> {
        let injectable = ty.name().and_then(|v| self.program.injectable(v));
        let unresolved = match injectable {
            Some(injectable) if !injectable.type_params.is_empty() => {
                let declared = declared_type(&injectable.name, &injectable.type_params);
                if declared != *ty {
                    Some(Rc::new(self.members_injection_binding(&declared)?))
                } else {
                    None
                }
            }
            _ => None,
        };
        let element = ty.name().map(|v| ElementId::for_type(v));
        let key = Key::for_members_injected_type(ty.clone());
        let mut builder = Binding::builder(BindingKind::MembersInjection, key)
            .dependencies(self.injection_site_dependencies(ty)?)
            .unresolved(unresolved);
        if let Some(element) = element {
            builder = builder.binding_element(element);
        }
        Ok(builder.build())
    }

    /// `MembersInjector<T>` binding backed by the members injection binding of `T`.
    pub fn members_injector_binding(&self, key: &Key, members_injection: &Binding) -> Binding {
        let mut builder = Binding::builder(BindingKind::MembersInjector, key.clone())
            .dependencies(members_injection.dependencies().to_vec());
        if let Some(element) = members_injection.binding_element() {
            builder = builder.binding_element(element.clone());
        }
        builder.build()
    }

    pub fn assisted_factory_binding(&self, factory: &AssistedFactoryDecl, key: &Key) -> Binding {
        Binding::builder(BindingKind::AssistedFactory, key.clone())
            .binding_element(ElementId::for_type(&factory.name))
            .dependencies(vec![DependencyRequest::new(
                Key::of(factory.return_type.clone()),
                RequestKind::Provider,
            )])
            .build()
    }

    pub fn component_binding(&self, component: &str) -> Binding {
        Binding::builder(BindingKind::Component, Key::for_component(TypeName::simple(component)))
            .binding_element(ElementId::for_type(component))
            .build()
    }

    pub fn component_dependency_binding(&self, requirement: &ComponentRequirement) -> Binding {
        Binding::builder(BindingKind::ComponentDependency, requirement.key.clone())
            .binding_element(ElementId::for_type(requirement.type_name()))
            .build()
    }

    /// Binding of a provision method of a component dependency.
    ///
    /// A production component treats `ListenableFuture<T>` methods as
    /// production methods for `T`.
    pub fn component_dependency_method_binding(
        &self,
        production_component: bool,
        dependency: &str,
        method: &ComponentMethodDecl,
    ) -> Result<Binding, GraphError> {
        let return_type = method.return_type.as_ref().ok_or_else(|| {
            GraphError::invalid(format!("{dependency}.{}", method.name), "method returns void")
        })?;
        let element = ElementId::new(dependency, &method.name);
        if production_component
            && let Some(inner) = return_type.unwrap_type(FrameworkType::ListenableFuture)
        {
            return Ok(Binding::builder(
                BindingKind::ComponentProduction,
                Key::for_qualified_type(method.qualifier.clone(), inner.clone()),
            )
            .binding_element(element)
            .production(ProductionKind::Future, Vec::new())
            .build());
        }
        Ok(Binding::builder(
            BindingKind::ComponentProvision,
            Key::for_qualified_type(method.qualifier.clone(), return_type.clone()),
        )
        .binding_element(element)
        .nullable(method.nullable)
        .build())
    }

    pub fn bound_instance_binding(
        &self,
        requirement: &ComponentRequirement,
        element: ElementId,
    ) -> Binding {
        Binding::builder(BindingKind::BoundInstance, requirement.key.clone())
            .binding_element(element)
            .nullable(requirement.nullable)
            .build()
    }

    /// Creator binding for a component method returning a subcomponent creator.
    pub fn subcomponent_creator_binding_for_method(
        &self,
        method: ElementId,
        creator: &TypeName,
    ) -> Binding {
        Binding::builder(
            BindingKind::SubcomponentCreator,
            Key::for_subcomponent_creator(creator.clone()),
        )
        .binding_element(method)
        .build()
    }

    /// Creator binding for the module `subcomponents` declarations of one key.
    pub fn subcomponent_creator_binding(&self, declaration: &SubcomponentDeclaration) -> Binding {
        Binding::builder(BindingKind::SubcomponentCreator, declaration.key.clone()).build()
    }

    /// Binding of a `@Binds` method whose target resolved to `delegate`.
    pub fn delegate_binding(
        &self,
        declaration: &DelegateDeclaration,
        delegate: &Binding,
    ) -> Binding {
        let framework = if delegate.is_production() {
            FrameworkType::Producer
        } else {
            FrameworkType::Provider
        };
        let builder = Binding::builder(
            BindingKind::Delegate,
            Key::for_delegate_binding(&declaration.key, declaration.contribution_type, framework),
        )
        .contribution_type(declaration.contribution_type)
        .binding_element(declaration.binding_element.clone())
        .contributing_module(&declaration.contributing_module)
        .dependencies(vec![declaration.delegate_request.clone()])
        .nullable(delegate.is_nullable())
        .map_key(declaration.map_key.clone())
        .scope(declaration.scope.clone());
        if delegate.is_production() {
            builder.production(ProductionKind::Immediate, Vec::new()).build()
        } else {
            builder.build()
        }
    }

    /// Marker binding for a `@Binds` method whose target has no binding.
    pub fn unresolved_delegate_binding(&self, declaration: &DelegateDeclaration) -> Binding {
        Binding::builder(BindingKind::Delegate, declaration.key.clone())
            .contribution_type(declaration.contribution_type)
            .binding_element(declaration.binding_element.clone())
            .contributing_module(&declaration.contributing_module)
            .map_key(declaration.map_key.clone())
            .build()
    }

    /// Synthetic `Set` or `Map` binding that assembles `contributions`.
    pub fn synthetic_multibinding(&self, key: &Key, contributions: &[Rc<Binding>]) -> Binding {
        let kind = if key.is_map() {
            BindingKind::MultiboundMap
        } else if key.is_set() {
            BindingKind::MultiboundSet
        } else {
            panic!("unexpected type in multibinding key: {key}")
        };
        let builder = Binding::builder(kind, key.clone())
            .dependencies(DependencyRequest::for_multibinding_contributions(key, contributions));
        if multibinding_requires_production(key, contributions) {
            builder.production(ProductionKind::Immediate, Vec::new()).build()
        } else {
            builder.build()
        }
    }

    /// Synthetic `Optional<T>` binding, absent when `contributions` is empty.
    pub fn synthetic_optional_binding(&self, key: &Key, contributions: &[Rc<Binding>]) -> Binding {
        let builder = Binding::builder(BindingKind::Optional, key.clone());
        if contributions.is_empty() {
            return builder.build();
        }
        let request = DependencyRequest::for_synthetic_present_optional_binding(key);
        let production = contributions.iter().any(|v| v.is_production())
            || matches!(request.kind, RequestKind::Producer | RequestKind::Produced);
        let builder = builder.dependencies(vec![request]);
        if production {
            builder.production(ProductionKind::Immediate, Vec::new()).build()
        } else {
            builder.build()
        }
    }
}

/// `Name<T1, T2>` for a type declared with type parameters `T1, T2`.
pub(crate) fn declared_type(name: &str, type_params: &[String]) -> TypeName {
    TypeName::declared(name, type_params.iter().map(TypeName::simple).collect())
}

fn production_kind(method: &ModuleMethodDecl, return_type: &TypeName) -> ProductionKind {
    if return_type.is_type_of(FrameworkType::ListenableFuture) {
        ProductionKind::Future
    } else if ContributionType::from(method.contribution) == ContributionType::SetValues
        && return_type
            .unwrap_type(FrameworkType::Set)
            .is_some_and(|v| v.is_type_of(FrameworkType::ListenableFuture))
    {
        ProductionKind::SetOfFuture
    } else {
        ProductionKind::Immediate
    }
}

fn multibinding_requires_production(key: &Key, contributions: &[Rc<Binding>]) -> bool {
    if let Some((_, value)) = key.map_types() {
        if value.is_type_of(FrameworkType::Producer) || value.is_type_of(FrameworkType::Produced) {
            return true;
        }
    } else if key
        .ty()
        .unwrap_type(FrameworkType::Set)
        .is_some_and(|v| v.is_type_of(FrameworkType::Produced))
    {
        return true;
    }
    contributions.iter().any(|v| v.is_production())
}
