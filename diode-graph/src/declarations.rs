//! Per-module indices of declared bindings.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::binding::{Binding, ContributionType, MapKey, Scope};
use crate::binding_factory::BindingFactory;
use crate::key::{Key, Qualifier, EXECUTOR, PRODUCTION_COMPONENT_MONITOR};
use crate::model::{
    ContributionDecl, ModuleDecl, ModuleMethodDecl, ModuleMethodKind, ParamDecl, Program,
};
use crate::request::{DependencyRequest, ElementId};
use crate::types::{FrameworkType, TypeName};
use crate::GraphError;

/// A `@Binds` method.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DelegateDeclaration {
    /// Key of the bound type, with a plain value type for map contributions.
    pub key: Key,
    pub contribution_type: ContributionType,
    pub binding_element: ElementId,
    pub contributing_module: String,
    pub delegate_request: DependencyRequest,
    pub scope: Option<Scope>,
    pub map_key: Option<MapKey>,
}

impl DelegateDeclaration {
    pub fn create(
        method: &ModuleMethodDecl,
        declaring: &str,
        contributing: &str,
        bindings: &HashMap<String, TypeName>,
    ) -> Result<Self, GraphError> {
        let [param] = method.params.as_slice() else {
            return Err(GraphError::invalid(
                format!("{declaring}.{}", method.name),
                "@Binds methods must have exactly one parameter",
            ));
        };
        let return_type = method.return_type.substitute(bindings);
        Ok(Self {
            key: Key::for_binds_method(method, &return_type, contributing)?,
            contribution_type: method.contribution.into(),
            binding_element: ElementId::new(declaring, &method.name),
            contributing_module: contributing.to_owned(),
            delegate_request: DependencyRequest::for_required_resolved_variable(
                param,
                &param.ty.substitute(bindings),
                &format!("{declaring}.{}", method.name),
            ),
            scope: method.scope.clone().map(Scope::new),
            map_key: method.map_key.as_ref().map(MapKey::from),
        })
    }
}

/// A child component listed in a module's `subcomponents`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubcomponentDeclaration {
    /// Key of the child's creator type.
    pub key: Key,
    pub subcomponent: String,
    pub contributing_module: String,
}

impl SubcomponentDeclaration {
    pub fn for_module(program: &Program, module: &ModuleDecl) -> Result<Vec<Self>, GraphError> {
        let mut declarations = Vec::new();
        for subcomponent in &module.subcomponents {
            let decl = program
                .component(subcomponent)
                .ok_or_else(|| GraphError::TypeNotPresent(subcomponent.clone()))?;
            if !decl.kind.is_subcomponent() {
                return Err(GraphError::invalid(
                    &module.name,
                    format!("{subcomponent} is not a subcomponent"),
                ));
            }
            let creator = decl.creator.as_ref().ok_or_else(|| {
                GraphError::invalid(
                    &module.name,
                    format!("subcomponent {subcomponent} has no creator"),
                )
            })?;
            declarations.push(Self {
                key: Key::for_subcomponent_creator(TypeName::simple(&creator.name)),
                subcomponent: subcomponent.clone(),
                contributing_module: module.name.clone(),
            });
        }
        Ok(declarations)
    }
}

/// A `@Multibinds` method declaring a possibly empty multibinding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MultibindingDeclaration {
    pub key: Key,
    pub contribution_type: ContributionType,
    pub binding_element: ElementId,
    pub contributing_module: String,
}

impl MultibindingDeclaration {
    pub fn for_multibinds_method(
        method: &ModuleMethodDecl,
        declaring: &str,
        contributing: &str,
        bindings: &HashMap<String, TypeName>,
    ) -> Result<Self, GraphError> {
        let return_type = method.return_type.substitute(bindings);
        let contribution_type = if return_type.is_type_of(FrameworkType::Map) {
            ContributionType::Map
        } else if return_type.is_type_of(FrameworkType::Set) {
            ContributionType::Set
        } else {
            return Err(GraphError::invalid(
                format!("{declaring}.{}", method.name),
                "@Multibinds methods must return a Set or a Map",
            ));
        };
        Ok(Self {
            key: Key::for_multibinds_method(method, &return_type),
            contribution_type,
            binding_element: ElementId::new(declaring, &method.name),
            contributing_module: contributing.to_owned(),
        })
    }
}

/// A `@BindsOptionalOf` method. Keyed by the optional's value type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OptionalBindingDeclaration {
    pub key: Key,
    pub binding_element: ElementId,
    pub contributing_module: String,
}

impl OptionalBindingDeclaration {
    pub fn for_method(
        method: &ModuleMethodDecl,
        declaring: &str,
        contributing: &str,
        bindings: &HashMap<String, TypeName>,
    ) -> Self {
        Self {
            key: Key::for_qualified_type(
                method.qualifier.clone(),
                method.return_type.substitute(bindings),
            ),
            binding_element: ElementId::new(declaring, &method.name),
            contributing_module: contributing.to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Module,
    ProducerModule,
}

/// Everything one module declares, including what it inherits from its
/// parent modules.
#[derive(Debug)]
pub struct ModuleDescriptor {
    pub module_type: String,
    pub kind: ModuleKind,
    pub bindings: Vec<Rc<Binding>>,
    pub multibinding_declarations: Vec<Rc<MultibindingDeclaration>>,
    pub subcomponent_declarations: Vec<Rc<SubcomponentDeclaration>>,
    pub delegate_declarations: Vec<Rc<DelegateDeclaration>>,
    pub optional_declarations: Vec<Rc<OptionalBindingDeclaration>>,
    pub included_modules: Vec<String>,
}

impl ModuleDescriptor {
    pub fn create(program: &Program, module: &ModuleDecl) -> Result<Self, GraphError> {
        let factory = BindingFactory::new(program);
        let mut descriptor = Self {
            module_type: module.name.clone(),
            kind: if module.producer {
                ModuleKind::ProducerModule
            } else {
                ModuleKind::Module
            },
            bindings: Vec::new(),
            multibinding_declarations: Vec::new(),
            subcomponent_declarations: SubcomponentDeclaration::for_module(program, module)?
                .into_iter()
                .map(Rc::new)
                .collect(),
            delegate_declarations: Vec::new(),
            optional_declarations: Vec::new(),
            included_modules: Vec::new(),
        };
        let contributing = module.name.as_str();
        for (declaring, method, bindings) in all_methods(program, module)? {
            let declaring = declaring.name.as_str();
            match method.kind {
                ModuleMethodKind::Provides => descriptor.bindings.push(Rc::new(
                    factory.provides_method_binding(method, declaring, contributing, &bindings)?,
                )),
                ModuleMethodKind::Produces => descriptor.bindings.push(Rc::new(
                    factory.produces_method_binding(method, declaring, contributing, &bindings)?,
                )),
                ModuleMethodKind::Binds => descriptor.delegate_declarations.push(Rc::new(
                    DelegateDeclaration::create(method, declaring, contributing, &bindings)?,
                )),
                ModuleMethodKind::Multibinds => descriptor.multibinding_declarations.push(Rc::new(
                    MultibindingDeclaration::for_multibinds_method(
                        method,
                        declaring,
                        contributing,
                        &bindings,
                    )?,
                )),
                ModuleMethodKind::BindsOptionalOf => {
                    descriptor.optional_declarations.push(Rc::new(
                        OptionalBindingDeclaration::for_method(
                            method,
                            declaring,
                            contributing,
                            &bindings,
                        ),
                    ))
                }
            }
        }
        let mut included = IndexSet::new();
        let mut current = Some(module);
        while let Some(decl) = current {
            included.extend(decl.includes.iter().cloned());
            current = match &decl.supertype {
                Some(supertype) => Some(parent_module(program, decl, supertype)?),
                None => None,
            };
        }
        descriptor.included_modules = included.into_iter().collect();
        Ok(descriptor)
    }

    /// Keys of every binding and declaration of the module.
    pub fn all_binding_keys(&self) -> Vec<Key> {
        let mut keys = IndexSet::new();
        keys.extend(self.bindings.iter().map(|v| v.key().clone()));
        keys.extend(self.multibinding_declarations.iter().map(|v| v.key.clone()));
        keys.extend(self.subcomponent_declarations.iter().map(|v| v.key.clone()));
        keys.extend(self.delegate_declarations.iter().map(|v| v.key.clone()));
        keys.extend(self.optional_declarations.iter().map(|v| v.key.clone()));
        keys.into_iter().collect()
    }

    pub fn requires_module_instance(&self) -> bool {
        self.bindings.iter().any(|v| v.requires_module_instance())
    }
}

fn parent_module<'p>(
    program: &'p Program,
    module: &ModuleDecl,
    supertype: &TypeName,
) -> Result<&'p ModuleDecl, GraphError> {
    let name = supertype.name().ok_or_else(|| {
        GraphError::invalid(&module.name, "module supertype is not a declared type")
    })?;
    program
        .module(name)
        .ok_or_else(|| GraphError::TypeNotPresent(name.to_owned()))
}

type ModuleMethod<'p> = (&'p ModuleDecl, &'p ModuleMethodDecl, HashMap<String, TypeName>);

/// Methods of `module` and of its parent modules, each with the
/// substitution of its declaring module's type parameters. A method
/// redeclared in a subtype hides the parent's method.
fn all_methods<'p>(
    program: &'p Program,
    module: &'p ModuleDecl,
) -> Result<Vec<ModuleMethod<'p>>, GraphError> {
    let mut methods: Vec<ModuleMethod<'p>> = Vec::new();
    let mut visited = Vec::new();
    let mut current = module;
    let mut bindings = HashMap::new();
    loop {
        if visited.contains(&current.name) {
            return Err(GraphError::invalid(&module.name, "cyclic module supertype chain"));
        }
        visited.push(current.name.clone());
        for method in &current.methods {
            if !methods.iter().any(|(_, v, _)| v.name == method.name) {
                methods.push((current, method, bindings.clone()));
            }
        }
        let Some(supertype) = &current.supertype else {
            break;
        };
        let parent = parent_module(program, current, supertype)?;
        bindings = supertype
            .substitute(&bindings)
            .bind_type_params(&parent.type_params)
            .unwrap_or_default();
        current = parent;
    }
    Ok(methods)
}

/// Module that turns the user's `@Production Executor` into the executor
/// production bindings run on.
pub(crate) fn production_executor_module() -> ModuleDecl {
    let executor = TypeName::simple(EXECUTOR);
    ModuleDecl {
        name: "dagger.producers.internal.ProductionExecutorModule".to_owned(),
        type_params: Vec::new(),
        supertype: None,
        includes: Vec::new(),
        subcomponents: Vec::new(),
        producer: false,
        methods: vec![ModuleMethodDecl {
            name: "productionImplementationExecutor".to_owned(),
            kind: ModuleMethodKind::Binds,
            return_type: executor.clone(),
            qualifier: Some(Qualifier::new("ProductionImplementation")),
            scope: None,
            params: vec![ParamDecl {
                name: "executor".to_owned(),
                ty: executor,
                qualifier: Some(Qualifier::new("Production")),
                assisted: false,
                nullable: false,
            }],
            contribution: ContributionDecl::Unique,
            map_key: None,
            nullable: false,
            is_static: false,
            thrown_types: Vec::new(),
        }],
    }
}

/// Module providing the `ProductionComponentMonitor` of a production component.
pub(crate) fn monitoring_module(component: &str) -> ModuleDecl {
    let factories = TypeName::set_of(TypeName::simple(format!(
        "{PRODUCTION_COMPONENT_MONITOR}.Factory"
    )));
    let param = |name: &str, ty: TypeName| ParamDecl {
        name: name.to_owned(),
        ty,
        qualifier: None,
        assisted: false,
        nullable: false,
    };
    let method = |name: &str, kind, return_type, params| ModuleMethodDecl {
        name: name.to_owned(),
        kind,
        return_type,
        qualifier: None,
        scope: None,
        params,
        contribution: ContributionDecl::Unique,
        map_key: None,
        nullable: false,
        is_static: true,
        thrown_types: Vec::new(),
    };
    let mut monitor = method(
        "monitor",
        ModuleMethodKind::Provides,
        TypeName::simple(PRODUCTION_COMPONENT_MONITOR),
        vec![
            param(
                "component",
                TypeName::wrap(FrameworkType::Provider, TypeName::simple(component)),
            ),
            param(
                "factories",
                TypeName::wrap(FrameworkType::Provider, factories.clone()),
            ),
        ],
    );
    monitor.scope = Some("ProductionScope".to_owned());
    ModuleDecl {
        name: format!("{component}_MonitoringModule"),
        type_params: Vec::new(),
        supertype: None,
        includes: Vec::new(),
        subcomponents: Vec::new(),
        producer: false,
        methods: vec![
            method("setOfFactories", ModuleMethodKind::Multibinds, factories, Vec::new()),
            monitor,
        ],
    }
}
