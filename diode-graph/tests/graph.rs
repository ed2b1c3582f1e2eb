use diode_graph::{
    BindingGraph, BindingKind, ComponentPath, ComponentRequirement, ElementId, Key, Session,
    TypeName,
};
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde_json::json;

fn session(program: serde_json::Value) -> Session {
    Session::new(serde_json::from_value(program).unwrap())
}

fn key(ty: &str) -> Key {
    Key::of(ty.parse::<TypeName>().unwrap())
}

fn binding_index(graph: &BindingGraph, ty: &str) -> NodeIndex {
    let key = key(ty);
    graph
        .top_level()
        .binding_nodes()
        .find(|(_, v)| *v.key() == key)
        .map(|(index, _)| index)
        .unwrap()
}

fn provides_foo(bar_injectable: bool) -> serde_json::Value {
    let injectables = if bar_injectable {
        json!([{"name": "Bar", "constructor": {}}])
    } else {
        json!([])
    };
    json!({
        "injectables": injectables,
        "modules": [{
            "name": "M",
            "methods": [{
                "name": "provideFoo",
                "kind": "provides",
                "return_type": "Foo",
                "params": [{"name": "b", "type": "Bar"}]
            }]
        }],
        "components": [{
            "name": "App",
            "kind": "component",
            "modules": ["M"],
            "methods": [{"name": "getFoo", "return_type": "Foo"}]
        }]
    })
}

#[test]
fn test_provision_and_injection() {
    let session = session(provides_foo(true));
    let graph = session.create_binding_graph("App", false).unwrap();

    let nodes = graph.binding_nodes();
    assert_eq!(nodes.len(), 2);
    let foo = graph.binding(&key("Foo")).unwrap();
    assert_eq!(foo.binding().kind(), BindingKind::Provision);
    assert_eq!(foo.component_path(), &ComponentPath::root("App"));
    let bar = graph.binding(&key("Bar")).unwrap();
    assert_eq!(bar.binding().kind(), BindingKind::Injection);
    assert_eq!(bar.component_path(), &ComponentPath::root("App"));

    let foo_index = binding_index(&graph, "Foo");
    let bar_index = binding_index(&graph, "Bar");
    let entry_points = graph.entry_point_edges();
    assert_eq!(entry_points.len(), 1);
    assert_eq!(entry_points[0].1, foo_index);
    let edges = graph.dependency_edges_from(foo_index);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].1, bar_index);
    assert!(!edges[0].0.entry_point);
    assert_eq!(graph.top_level().dependency_edges().count(), 2);

    assert!(graph.missing_bindings().is_empty());
    assert_eq!(graph.top_level().missing_binding_nodes().count(), 0);
}

#[test]
fn test_missing_binding() {
    let session = session(provides_foo(false));
    let graph = session.create_binding_graph("App", false).unwrap();

    assert_eq!(graph.binding_nodes().len(), 1);
    let missing = graph.missing_bindings();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].key(), &key("Bar"));
    assert_eq!(missing[0].component_path(), &ComponentPath::root("App"));

    let network = graph.top_level().network();
    let (missing_index, _) = graph.top_level().missing_binding_nodes().next().unwrap();
    let incoming: Vec<_> = network
        .edges_directed(missing_index, Direction::Incoming)
        .collect();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].source(), binding_index(&graph, "Foo"));
}

#[test]
fn test_subcomponent_uses_ancestor_scoped_binding() {
    let session = session(json!({
        "injectables": [{"name": "Bar", "constructor": {}, "scope": "Singleton"}],
        "components": [
            {
                "name": "App",
                "kind": "component",
                "scopes": ["Singleton"],
                "methods": [
                    {"name": "bar", "return_type": "Bar"},
                    {"name": "sub", "return_type": "Sub"}
                ]
            },
            {
                "name": "Sub",
                "kind": "subcomponent",
                "methods": [{"name": "bar", "return_type": "Bar"}]
            }
        ]
    }));
    let graph = session.create_binding_graph("App", false).unwrap();

    let bar = key("Bar");
    let bars: Vec<_> = graph
        .top_level()
        .binding_nodes()
        .filter(|(_, v)| *v.key() == bar)
        .collect();
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].1.component_path(), &ComponentPath::root("App"));

    let subgraphs = graph.subgraphs();
    assert_eq!(subgraphs.len(), 1);
    let sub = &subgraphs[0];
    assert_eq!(sub.component_path().to_string(), "App → Sub");
    assert!(sub.binding_nodes().is_empty());
    let entry_points = sub.entry_point_edges();
    assert_eq!(entry_points.len(), 1);
    assert_eq!(entry_points[0].1, bars[0].0);
}

#[test]
fn test_scoped_binding_first_requested_by_subcomponent() {
    let session = session(json!({
        "injectables": [{"name": "Bar", "constructor": {}, "scope": "Singleton"}],
        "components": [
            {
                "name": "App",
                "kind": "component",
                "scopes": ["Singleton"],
                "methods": [{"name": "sub", "return_type": "Sub"}]
            },
            {
                "name": "Sub",
                "kind": "subcomponent",
                "methods": [{"name": "bar", "return_type": "Bar"}]
            }
        ]
    }));
    let graph = session.create_binding_graph("App", false).unwrap();

    let sub = &graph.subgraphs()[0];
    let bar = sub.binding(&key("Bar")).unwrap();
    assert_eq!(bar.component_path(), &ComponentPath::root("App"));
    assert_eq!(graph.binding_nodes().len(), 1);
}

#[test]
fn test_child_factory_method_edge() {
    let session = session(json!({
        "modules": [{
            "name": "SubModule",
            "methods": [{"name": "name", "kind": "provides", "return_type": "String"}]
        }],
        "components": [
            {
                "name": "App",
                "kind": "component",
                "methods": [{
                    "name": "sub",
                    "return_type": "Sub",
                    "params": [{"name": "module", "type": "SubModule"}]
                }]
            },
            {
                "name": "Sub",
                "kind": "subcomponent",
                "modules": ["SubModule"],
                "methods": [{"name": "name", "return_type": "String"}]
            }
        ]
    }));
    let graph = session.create_binding_graph("App", false).unwrap();

    let sub = &graph.subgraphs()[0];
    let factory_method = sub.factory_method().unwrap();
    assert_eq!(factory_method.factory_method, ElementId::new("App", "sub"));
    assert!(graph.factory_method().is_none());

    let module = ComponentRequirement::for_module(TypeName::simple("SubModule"));
    let parameters = sub.factory_method_parameters();
    assert_eq!(parameters.len(), 1);
    assert_eq!(parameters[&module], ElementId::new("App.sub", "module"));
    assert_eq!(sub.component_requirements(), vec![module]);
    assert!(graph.component_requirements().is_empty());
}

#[test]
fn test_module_declared_subcomponent() {
    let session = session(json!({
        "modules": [{"name": "AppModule", "subcomponents": ["Sub"]}],
        "injectables": [{
            "name": "Launcher",
            "constructor": {"params": [{"name": "builder", "type": "Sub.Builder"}]}
        }],
        "components": [
            {
                "name": "App",
                "kind": "component",
                "modules": ["AppModule"],
                "methods": [{"name": "launcher", "return_type": "Launcher"}]
            },
            {
                "name": "Sub",
                "kind": "subcomponent",
                "methods": [{"name": "app", "return_type": "App"}],
                "creator": {"name": "Sub.Builder", "kind": "builder"}
            }
        ]
    }));
    let graph = session.create_binding_graph("App", false).unwrap();

    let creator = graph.binding(&key("Sub.Builder")).unwrap();
    assert_eq!(creator.binding().kind(), BindingKind::SubcomponentCreator);
    assert_eq!(creator.subcomponent_declarations().len(), 1);

    let subgraphs = graph.subgraphs();
    assert_eq!(subgraphs.len(), 1);
    let sub = &subgraphs[0];
    assert!(sub.factory_method().is_none());
    let app = sub.binding(&key("App")).unwrap();
    assert_eq!(app.binding().kind(), BindingKind::Component);
    assert_eq!(app.component_path(), &ComponentPath::root("App"));

    let network = graph.top_level().network();
    let creator_index = binding_index(&graph, "Sub.Builder");
    let targets: Vec<_> = network
        .edges_directed(creator_index, Direction::Outgoing)
        .map(|v| v.target())
        .collect();
    assert_eq!(targets, vec![sub.component_index()]);
}

#[test]
fn test_dependency_cycle_terminates() {
    for size in [2, 5] {
        let injectables: Vec<_> = (0..size)
            .map(|i| {
                json!({
                    "name": format!("N{i}"),
                    "constructor": {
                        "params": [{"name": "next", "type": format!("N{}", (i + 1) % size)}]
                    }
                })
            })
            .collect();
        let session = session(json!({
            "injectables": injectables,
            "components": [{
                "name": "App",
                "kind": "component",
                "methods": [{"name": "first", "return_type": "N0"}]
            }]
        }));
        let graph = session.create_binding_graph("App", false).unwrap();

        assert_eq!(graph.binding_nodes().len(), size);
        assert!(!graph.has_cycle_free_order());
        assert!(
            graph
                .strongly_connected_components()
                .iter()
                .any(|v| v.len() == size)
        );
    }
}

#[test]
fn test_strongly_connected_components_order() {
    let session = session(provides_foo(true));
    let graph = session.create_binding_graph("App", false).unwrap();

    assert!(graph.has_cycle_free_order());
    let components = graph.strongly_connected_components();
    let position = |index: NodeIndex| components.iter().position(|v| v.contains(&index)).unwrap();
    assert!(position(binding_index(&graph, "Bar")) < position(binding_index(&graph, "Foo")));
}

#[test]
fn test_delegate_cycle_terminates() {
    let session = session(json!({
        "modules": [{
            "name": "M",
            "methods": [
                {
                    "name": "a",
                    "kind": "binds",
                    "return_type": "A",
                    "params": [{"name": "b", "type": "B"}]
                },
                {
                    "name": "b",
                    "kind": "binds",
                    "return_type": "B",
                    "params": [{"name": "a", "type": "A"}]
                }
            ]
        }],
        "components": [{
            "name": "App",
            "kind": "component",
            "modules": ["M"],
            "methods": [{"name": "a", "return_type": "A"}]
        }]
    }));
    let graph = session.create_binding_graph("App", false).unwrap();

    let a = graph.binding(&key("A")).unwrap();
    assert_eq!(a.binding().kind(), BindingKind::Delegate);
    assert!(!a.binding().is_unresolved_delegate());
    let b = graph.binding(&key("B")).unwrap();
    assert!(b.binding().is_unresolved_delegate());
}

#[test]
fn test_optional_bindings() {
    let session = session(json!({
        "injectables": [{"name": "Present", "constructor": {}}],
        "modules": [{
            "name": "M",
            "methods": [
                {"name": "present", "kind": "binds_optional_of", "return_type": "Present"},
                {"name": "absent", "kind": "binds_optional_of", "return_type": "Absent"}
            ]
        }],
        "components": [{
            "name": "App",
            "kind": "component",
            "modules": ["M"],
            "methods": [
                {"name": "present", "return_type": "Optional<Present>"},
                {"name": "absent", "return_type": "Optional<Absent>"}
            ]
        }]
    }));
    let graph = session.create_binding_graph("App", false).unwrap();

    let present = graph.binding(&key("Optional<Present>")).unwrap();
    assert_eq!(present.binding().kind(), BindingKind::Optional);
    assert!(present.binding().is_present_optional());
    assert_eq!(present.optional_binding_declarations().len(), 1);
    assert!(graph.binding(&key("Present")).is_some());

    let absent = graph.binding(&key("Optional<Absent>")).unwrap();
    assert!(!absent.binding().is_present_optional());
    assert!(graph.missing_bindings().is_empty());
}

#[test]
fn test_duplicate_bindings_kept() {
    let session = session(json!({
        "modules": [
            {
                "name": "A",
                "methods": [{"name": "one", "kind": "provides", "return_type": "String"}]
            },
            {
                "name": "B",
                "methods": [{"name": "two", "kind": "provides", "return_type": "String"}]
            }
        ],
        "components": [{
            "name": "App",
            "kind": "component",
            "modules": ["A", "B"],
            "methods": [{"name": "name", "return_type": "String"}]
        }]
    }));
    let graph = session.create_binding_graph("App", false).unwrap();

    let bindings = graph.bindings(&key("String"));
    assert_eq!(bindings.len(), 2);
    assert!(bindings.iter().all(|v| v.component_path() == &ComponentPath::root("App")));
    assert_eq!(graph.entry_point_edges().len(), 2);
}

#[test]
fn test_full_binding_graph_keeps_unused_bindings() {
    let program = json!({
        "modules": [{
            "name": "M",
            "methods": [
                {"name": "used", "kind": "provides", "return_type": "String"},
                {"name": "unused", "kind": "provides", "return_type": "Integer"}
            ]
        }],
        "components": [{
            "name": "App",
            "kind": "component",
            "modules": ["M"],
            "methods": [{"name": "name", "return_type": "String"}]
        }]
    });
    let session = session(program);

    let graph = session.create_binding_graph("App", false).unwrap();
    assert!(!graph.is_full_binding_graph());
    assert!(graph.binding(&key("Integer")).is_none());

    let full = session.create_binding_graph("App", true).unwrap();
    assert!(full.is_full_binding_graph());
    assert!(full.binding(&key("Integer")).is_some());
    assert_eq!(full.entry_point_edges().len(), 1);
}

#[test]
fn test_module_binding_graph() {
    let session = session(json!({
        "injectables": [{"name": "Bar", "constructor": {}}],
        "modules": [{
            "name": "M",
            "methods": [{
                "name": "provideFoo",
                "kind": "provides",
                "return_type": "Foo",
                "params": [{"name": "b", "type": "Bar"}]
            }]
        }]
    }));
    let graph = session.create_module_binding_graph("M").unwrap();

    assert!(!graph.component_node().is_real_component());
    assert!(graph.binding(&key("Foo")).is_some());
    assert!(graph.binding(&key("Bar")).is_some());
    assert!(graph.binding(&key("M")).is_none());
}

#[test]
fn test_unknown_component_defers() {
    let session = session(json!({
        "components": [{"name": "App", "kind": "component", "modules": ["Missing"]}]
    }));
    let err = session.create_binding_graph("App", false).unwrap_err();
    assert!(err.is_deferral());
    assert!(session.create_binding_graph("Other", false).unwrap_err().is_deferral());
}

fn assisted_foo(sub: bool) -> serde_json::Value {
    let mut components = vec![json!({
        "name": "App",
        "kind": "component",
        "methods": [{"name": "f", "return_type": "FooFactory"}]
    })];
    if sub {
        components[0]["methods"]
            .as_array_mut()
            .unwrap()
            .push(json!({"name": "sub", "return_type": "Sub"}));
        components.push(json!({
            "name": "Sub",
            "kind": "subcomponent",
            "methods": [{"name": "foo", "return_type": "Foo"}]
        }));
    }
    json!({
        "injectables": [
            {"name": "Bar", "constructor": {}},
            {
                "name": "Foo",
                "constructor": {
                    "assisted": true,
                    "params": [
                        {"name": "x", "type": "int", "assisted": true},
                        {"name": "b", "type": "Bar"}
                    ]
                }
            }
        ],
        "assisted_factories": [{
            "name": "FooFactory",
            "method": "create",
            "return_type": "Foo",
            "params": [{"name": "x", "type": "int"}]
        }],
        "components": components
    })
}

#[test]
fn test_assisted_injection() {
    let session = session(assisted_foo(false));
    let graph = session.create_binding_graph("App", false).unwrap();

    let factory = graph.binding(&key("FooFactory")).unwrap();
    assert_eq!(factory.binding().kind(), BindingKind::AssistedFactory);
    let foo = graph.binding(&key("Foo")).unwrap();
    assert_eq!(foo.binding().kind(), BindingKind::AssistedInjection);
    let dependencies: Vec<_> = foo.binding().dependencies().iter().map(|v| &v.key).collect();
    assert_eq!(dependencies, vec![&key("Bar")]);
    assert!(graph.missing_bindings().is_empty());
    assert_eq!(graph.top_level().missing_binding_nodes().count(), 0);
}

#[test]
fn test_assisted_injection_is_not_reused_by_subcomponent() {
    let session = session(assisted_foo(true));
    let graph = session.create_binding_graph("App", false).unwrap();

    let foo = key("Foo");
    let mut owners: Vec<_> = graph
        .top_level()
        .binding_nodes()
        .filter(|(_, v)| *v.key() == foo)
        .map(|(_, v)| v.component_path().to_string())
        .collect();
    owners.sort();
    assert_eq!(owners, vec!["App", "App → Sub"]);

    let sub = &graph.subgraphs()[0];
    let sub_foo = sub.binding(&foo).unwrap();
    assert_eq!(sub_foo.binding().kind(), BindingKind::AssistedInjection);
    assert_eq!(sub_foo.component_path().to_string(), "App → Sub");
    let bar = sub.binding(&key("Bar")).unwrap();
    assert_eq!(bar.component_path(), &ComponentPath::root("App"));
    assert!(sub.missing_bindings().is_empty());
}

#[test]
fn test_scoped_injection_rejected_in_unscoped_subcomponent_root() {
    let session = session(json!({
        "injectables": [{"name": "Bar", "constructor": {}, "scope": "Singleton"}],
        "components": [{
            "name": "Sub",
            "kind": "subcomponent",
            "methods": [{"name": "bar", "return_type": "Bar"}]
        }]
    }));
    let graph = session.create_binding_graph("Sub", false).unwrap();

    assert!(graph.binding(&key("Bar")).is_none());
    let missing = graph.missing_bindings();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].key(), &key("Bar"));
    assert_eq!(missing[0].component_path(), &ComponentPath::root("Sub"));
    assert_eq!(graph.top_level().missing_binding_nodes().count(), 1);
}
