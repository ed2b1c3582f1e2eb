use std::rc::Rc;

use diode_graph::{BindingGraphFactory, BindingKind, ComponentPath, Key, Session, TypeName};
use serde_json::json;

fn session(program: serde_json::Value) -> Session {
    Session::new(serde_json::from_value(program).unwrap())
}

fn key(ty: &str) -> Key {
    Key::of(ty.parse::<TypeName>().unwrap())
}

#[test]
fn test_resolve_is_idempotent() {
    let session = session(json!({
        "injectables": [
            {"name": "Bar", "constructor": {}},
            {"name": "Foo", "constructor": {"params": [{"name": "bar", "type": "Bar"}]}}
        ],
        "components": [{
            "name": "App",
            "kind": "component",
            "methods": [{"name": "foo", "return_type": "Foo"}]
        }]
    }));
    let descriptor = session.component_descriptor("App").unwrap();
    let mut factory = BindingGraphFactory::new(&session);
    let id = factory.create_resolver(None, &descriptor).unwrap();

    factory.resolvers_mut().resolve(id, &key("Foo"));
    let first = factory.resolvers().resolved_bindings(id, &key("Foo")).unwrap();
    factory.resolvers_mut().resolve(id, &key("Foo"));
    let second = factory.resolvers().resolved_bindings(id, &key("Foo")).unwrap();
    assert!(Rc::ptr_eq(&first, &second));

    assert_eq!(first.component_path(), &ComponentPath::root("App"));
    assert_eq!(first.bindings().count(), 1);
    assert_eq!(first.bindings_owned_by("App").count(), 1);
    let bar = factory.resolvers().resolved_bindings(id, &key("Bar")).unwrap();
    assert_eq!(bar.bindings().next().unwrap().kind(), BindingKind::Injection);
    assert!(factory.resolvers().resolved_bindings(id, &key("Baz")).is_none());
}

#[test]
fn test_unresolvable_key_is_empty() {
    let session = session(json!({
        "components": [{"name": "App", "kind": "component"}]
    }));
    let descriptor = session.component_descriptor("App").unwrap();
    let mut factory = BindingGraphFactory::new(&session);
    let id = factory.create_resolver(None, &descriptor).unwrap();

    factory.resolvers_mut().resolve(id, &key("Nothing"));
    let resolved = factory.resolvers().resolved_bindings(id, &key("Nothing")).unwrap();
    assert!(resolved.is_empty());

    factory.resolvers_mut().resolve(id, &key("App"));
    let component = factory.resolvers().resolved_bindings(id, &key("App")).unwrap();
    assert_eq!(component.bindings().next().unwrap().kind(), BindingKind::Component);
}

fn reusable_program(root_requests: bool) -> serde_json::Value {
    let mut root_methods = vec![json!({"name": "sub", "return_type": "Sub"})];
    if root_requests {
        root_methods.push(json!({"name": "cache", "return_type": "Cache"}));
    }
    json!({
        "injectables": [{"name": "Cache", "constructor": {}, "scope": "Reusable"}],
        "components": [
            {"name": "App", "kind": "component", "methods": root_methods},
            {
                "name": "Sub",
                "kind": "subcomponent",
                "methods": [{"name": "cache", "return_type": "Cache"}]
            }
        ]
    })
}

#[test]
fn test_reusable_binding_owned_by_root_when_requested_there() {
    let session = session(reusable_program(true));
    let graph = session.create_binding_graph("App", false).unwrap();

    let sub = &graph.subgraphs()[0];
    let cache = sub.binding(&key("Cache")).unwrap();
    assert_eq!(cache.component_path(), &ComponentPath::root("App"));
    let caches = graph
        .top_level()
        .binding_nodes()
        .filter(|(_, v)| *v.key() == key("Cache"))
        .count();
    assert_eq!(caches, 1);
}

#[test]
fn test_reusable_binding_owned_by_subcomponent_otherwise() {
    let session = session(reusable_program(false));
    let graph = session.create_binding_graph("App", false).unwrap();

    assert!(graph.binding_nodes().is_empty());
    let sub = &graph.subgraphs()[0];
    let cache = sub.binding(&key("Cache")).unwrap();
    assert_eq!(cache.component_path().to_string(), "App → Sub");
}

#[test]
fn test_local_explicit_binding_is_resolved_again() {
    let session = session(json!({
        "injectables": [
            {"name": "Service", "constructor": {"params": [{"name": "name", "type": "String"}]}}
        ],
        "modules": [
            {
                "name": "RootModule",
                "methods": [{"name": "name", "kind": "provides", "return_type": "String"}]
            },
            {
                "name": "SubModule",
                "methods": [{"name": "name", "kind": "provides", "return_type": "String"}]
            }
        ],
        "components": [
            {
                "name": "App",
                "kind": "component",
                "modules": ["RootModule"],
                "methods": [
                    {"name": "service", "return_type": "Service"},
                    {"name": "sub", "return_type": "Sub"}
                ]
            },
            {
                "name": "Sub",
                "kind": "subcomponent",
                "modules": ["SubModule"],
                "methods": [
                    {"name": "service", "return_type": "Service"},
                    {"name": "name", "return_type": "String"}
                ]
            }
        ]
    }));
    let graph = session.create_binding_graph("App", false).unwrap();
    assert_eq!(graph.bindings(&key("String")).len(), 1);

    let sub = &graph.subgraphs()[0];
    let service = sub.binding(&key("Service")).unwrap();
    assert_eq!(service.component_path(), &ComponentPath::root("App"));
    let names = sub.bindings(&key("String"));
    assert_eq!(names.len(), 2);
    assert_eq!(names[0].component_path().to_string(), "App → Sub");
    assert_eq!(names[1].component_path(), &ComponentPath::root("App"));
}

#[test]
fn test_set_multibinding_contributions_are_local() {
    let session = session(json!({
        "injectables": [
            {
                "name": "Consumer",
                "constructor": {"params": [{"name": "values", "type": "Set<String>"}]}
            }
        ],
        "modules": [
            {
                "name": "RootModule",
                "methods": [{"name": "values", "kind": "multibinds", "return_type": "Set<String>"}]
            },
            {
                "name": "SubModule",
                "methods": [{
                    "name": "value",
                    "kind": "provides",
                    "return_type": "String",
                    "contribution": "into_set",
                    "is_static": true
                }]
            }
        ],
        "components": [
            {
                "name": "Root",
                "kind": "component",
                "modules": ["RootModule"],
                "methods": [
                    {"name": "consumer", "return_type": "Consumer"},
                    {"name": "sub", "return_type": "Sub"}
                ]
            },
            {
                "name": "Sub",
                "kind": "subcomponent",
                "modules": ["SubModule"],
                "methods": [{"name": "consumer", "return_type": "Consumer"}]
            }
        ]
    }));
    let graph = session.create_binding_graph("Root", false).unwrap();

    let root_set = graph.binding(&key("Set<String>")).unwrap();
    assert_eq!(root_set.binding().kind(), BindingKind::MultiboundSet);
    assert!(root_set.binding().dependencies().is_empty());
    assert_eq!(root_set.multibinding_declarations().len(), 1);

    let sub = &graph.subgraphs()[0];
    let sub_set = sub.binding(&key("Set<String>")).unwrap();
    assert_eq!(sub_set.component_path().to_string(), "Root → Sub");
    assert_eq!(sub_set.binding().dependencies().len(), 1);
    let consumer = sub.binding(&key("Consumer")).unwrap();
    assert_eq!(consumer.component_path().to_string(), "Root → Sub");
    assert!(sub.missing_bindings().is_empty());
}

#[test]
fn test_map_multibinding() {
    let session = session(json!({
        "modules": [{
            "name": "HandlerModule",
            "methods": [
                {
                    "name": "get",
                    "kind": "provides",
                    "return_type": "Handler",
                    "contribution": "into_map",
                    "map_key": {"type": "String", "value": "get"}
                },
                {
                    "name": "post",
                    "kind": "provides",
                    "return_type": "Handler",
                    "contribution": "into_map",
                    "map_key": {"type": "String", "value": "post"}
                }
            ]
        }],
        "components": [{
            "name": "Server",
            "kind": "component",
            "modules": ["HandlerModule"],
            "methods": [
                {"name": "handlers", "return_type": "Map<String, Handler>"},
                {"name": "providers", "return_type": "Map<String, Provider<Handler>>"}
            ]
        }]
    }));
    let graph = session.create_binding_graph("Server", false).unwrap();

    let handlers = graph.binding(&key("Map<String, Handler>")).unwrap();
    assert_eq!(handlers.binding().kind(), BindingKind::MultiboundMap);
    assert_eq!(handlers.binding().dependencies().len(), 2);
    let providers = graph.binding(&key("Map<String, Provider<Handler>>")).unwrap();
    assert_eq!(providers.binding().kind(), BindingKind::MultiboundMap);
    assert_eq!(providers.binding().dependencies().len(), 2);

    let contributions = graph
        .binding_nodes()
        .into_iter()
        .filter(|v| v.binding().kind() == BindingKind::Provision)
        .count();
    assert_eq!(contributions, 2);
    assert!(graph.missing_bindings().is_empty());
}

#[test]
fn test_generic_injection_binding() {
    let session = session(json!({
        "injectables": [
            {"name": "Gift", "constructor": {}},
            {
                "name": "Box",
                "type_params": ["T"],
                "constructor": {"params": [{"name": "value", "type": "T"}]}
            }
        ],
        "components": [{
            "name": "App",
            "kind": "component",
            "methods": [{"name": "box", "return_type": "Box<Gift>"}]
        }]
    }));
    let graph = session.create_binding_graph("App", false).unwrap();

    let boxed = graph.binding(&key("Box<Gift>")).unwrap();
    let binding = boxed.binding();
    assert_eq!(binding.kind(), BindingKind::Injection);
    assert_eq!(binding.dependencies().len(), 1);
    assert_eq!(binding.dependencies()[0].key, key("Gift"));
    let unresolved = binding.unresolved().unwrap();
    assert_eq!(unresolved.key(), &key("Box<T>"));
    assert!(graph.binding(&key("Gift")).is_some());
}

#[test]
fn test_component_dependency_bindings() {
    let session = session(json!({
        "dependency_types": [{
            "name": "Database",
            "methods": [
                {"name": "url", "return_type": "String"},
                {"name": "reset", "params": [{"name": "force", "type": "boolean"}]}
            ]
        }],
        "components": [{
            "name": "App",
            "kind": "component",
            "dependencies": ["Database"],
            "methods": [
                {"name": "url", "return_type": "String"},
                {"name": "database", "return_type": "Database"}
            ]
        }]
    }));
    let graph = session.create_binding_graph("App", false).unwrap();

    let url = graph.binding(&key("String")).unwrap();
    assert_eq!(url.binding().kind(), BindingKind::ComponentProvision);
    let database = graph.binding(&key("Database")).unwrap();
    assert_eq!(database.binding().kind(), BindingKind::ComponentDependency);
    let requirements: Vec<_> = graph
        .component_requirements()
        .iter()
        .map(|v| v.type_name())
        .collect();
    assert_eq!(requirements, vec!["Database"]);
}

#[test]
fn test_bound_instance_binding() {
    let session = session(json!({
        "components": [{
            "name": "App",
            "kind": "component",
            "methods": [{"name": "port", "return_type": "Integer"}],
            "creator": {
                "name": "App.Factory",
                "kind": "factory",
                "params": [{"name": "port", "kind": "bound_instance", "type": "int"}]
            }
        }]
    }));
    let graph = session.create_binding_graph("App", false).unwrap();

    let port = graph.binding(&key("Integer")).unwrap();
    assert_eq!(port.binding().kind(), BindingKind::BoundInstance);
    assert!(graph.missing_bindings().is_empty());
}

#[test]
fn test_members_injection() {
    let session = session(json!({
        "injectables": [
            {"name": "Logger", "constructor": {}},
            {
                "name": "Activity",
                "injection_sites": [
                    {
                        "kind": "field",
                        "name": "logger",
                        "params": [{"name": "logger", "type": "Logger"}]
                    }
                ]
            }
        ],
        "components": [{
            "name": "App",
            "kind": "component",
            "methods": [{"name": "inject", "params": [{"name": "activity", "type": "Activity"}]}]
        }]
    }));
    let graph = session.create_binding_graph("App", false).unwrap();

    let activity = graph
        .binding_nodes()
        .into_iter()
        .find(|v| v.binding().kind() == BindingKind::MembersInjection)
        .unwrap();
    assert_eq!(activity.key(), &key("Activity"));
    assert_eq!(activity.binding().dependencies().len(), 1);
    assert!(graph.binding(&key("Logger")).is_some());
    let entry_points = graph.entry_point_edges();
    assert_eq!(entry_points.len(), 1);
}

#[test]
fn test_production_component() {
    let session = session(json!({
        "modules": [{
            "name": "ProducerModule",
            "producer": true,
            "methods": [{
                "name": "page",
                "kind": "produces",
                "return_type": "String",
                "is_static": true
            }]
        }],
        "components": [{
            "name": "Crawler",
            "kind": "production_component",
            "modules": ["ProducerModule"],
            "methods": [{"name": "page", "return_type": "ListenableFuture<String>"}]
        }]
    }));
    let descriptor = session.component_descriptor("Crawler").unwrap();
    assert!(descriptor.is_production());
    assert!(descriptor.scopes().iter().any(|v| v.is_production_scope()));

    let graph = session.create_binding_graph("Crawler", false).unwrap();
    let page = graph.binding(&key("String")).unwrap();
    assert_eq!(page.binding().kind(), BindingKind::Production);
    assert!(page.binding().is_production());
    assert!(!page.binding().implicit_dependencies().is_empty());
}

#[test]
fn test_descriptor_cycle_is_an_error() {
    let session = session(json!({
        "components": [
            {
                "name": "A",
                "kind": "subcomponent",
                "methods": [{"name": "b", "return_type": "B"}]
            },
            {
                "name": "B",
                "kind": "subcomponent",
                "methods": [{"name": "a", "return_type": "A"}]
            }
        ]
    }));
    assert!(session.component_descriptor("A").is_err());
}

#[test]
fn test_clear_cache() {
    let session = session(json!({
        "injectables": [{"name": "Bar", "constructor": {}}],
        "components": [{
            "name": "App",
            "kind": "component",
            "methods": [{"name": "bar", "return_type": "Bar"}]
        }]
    }));
    let first = session.component_descriptor("App").unwrap();
    assert!(Rc::ptr_eq(&first, &session.component_descriptor("App").unwrap()));
    assert!(session.injection_binding(&key("Bar")).is_some());

    session.clear_cache();
    let second = session.component_descriptor("App").unwrap();
    assert!(!Rc::ptr_eq(&first, &second));
    assert!(session.injection_binding(&key("Bar")).is_some());
}
