//! Loading, configuring, bounding and reporting an analysis run

use codegraph_pta::shared::models::{FieldRef, ProcedureId, ValueId};
use codegraph_pta::{
    AnalysisDump, CallGraphBuilder, ContextPolicy, EntrySeeding, NodeId, PointerKey, Preset,
    Program, ProgramBuilder, PtaConfig, PtaError, ThreadEscapeAnalysis,
};
use pretty_assertions::assert_eq;
use std::io::Write;

const LINKED_PAIR: &str = r#"{
  "classes": [
    { "name": "A", "fields": [{ "name": "next" }] },
    { "name": "Main", "methods": { "main()": 0 } }
  ],
  "procedures": [
    {
      "id": 0,
      "declaring": "Main",
      "selector": "main()",
      "is_static": true,
      "instructions": [
        { "op": "new", "def": 1, "site": 0, "ty": "A" },
        { "op": "new", "def": 2, "site": 1, "ty": "A" },
        { "op": "put_field", "base": 1, "field": { "declaring": "A", "name": "next" }, "value": 2 },
        { "op": "get_field", "def": 3, "base": 1, "field": { "declaring": "A", "name": "next" } },
        { "op": "return" }
      ]
    }
  ],
  "entry_points": [0]
}"#;

#[test]
fn test_json_program_to_text_dump() {
    let program = Program::from_json(LINKED_PAIR).unwrap();
    let analysis = CallGraphBuilder::new(program, PtaConfig::from_preset(Preset::Balanced))
        .build()
        .unwrap();
    let dump = AnalysisDump::from_analysis(&analysis);
    let text = dump.to_text();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "status complete");
    assert!(lines.contains(&"node Main.main()[]"));
    assert!(lines.contains(&"pts Main.main()[]:v3 -> A@p0#new1[]"));
    assert!(lines.contains(&"pts A@p0#new0[].A.next -> A@p0#new1[]"));
    assert!(lines
        .iter()
        .any(|line| line.starts_with("edge ") && line.ends_with(" 0 Main.main()[]")));

    let node = analysis.call_graph().nodes_for(ProcedureId(0))[0];
    let local = |value| {
        analysis
            .find_location(&PointerKey::Local {
                node,
                value: ValueId(value),
            })
            .unwrap()
    };
    assert!(analysis.may_alias(local(2), local(3)));
    assert!(!analysis.may_alias(local(1), local(3)));
    assert!(analysis.location_count() > 3);

    let restored = AnalysisDump::from_json(&dump.to_json().unwrap()).unwrap();
    assert_eq!(restored, dump);
}

#[test]
fn test_malformed_json_program_is_rejected() {
    let err = Program::from_json(r#"{ "procedures": [ { "id": 0 } ] }"#).unwrap_err();
    assert!(matches!(err, PtaError::Serialization(_)));
}

fn call_chain(length: usize) -> Program {
    let mut b = ProgramBuilder::new();
    let ids: Vec<_> = (0..length)
        .map(|i| b.declare_static("Chain", &format!("f{}()", i)))
        .collect();
    for (i, id) in ids.iter().enumerate() {
        b.define(*id, |p| {
            if i + 1 < length {
                p.call_static("Chain", &format!("f{}()", i + 1), &[]);
            }
        });
    }
    b.entry_point(ids[0]);
    b.build()
}

#[test]
fn test_node_budget_aborts_the_run() {
    let config = PtaConfig::default().max_nodes(Some(5));
    let err = CallGraphBuilder::new(call_chain(10), config)
        .build()
        .unwrap_err();
    assert!(err.is_resource_exhaustion());
    assert!(matches!(
        err,
        PtaError::BudgetExceeded {
            resource: "call graph nodes",
            limit: 5
        }
    ));

    let roomy = PtaConfig::default().max_nodes(Some(12));
    let analysis = CallGraphBuilder::new(call_chain(10), roomy).build().unwrap();
    assert!(analysis.is_complete());
    assert_eq!(analysis.stats().nodes, 12);
}

#[test]
fn test_instance_budget_aborts_the_run() {
    let mut b = ProgramBuilder::new();
    b.class("A");
    let main = b.declare_static("Main", "main()");
    b.define(main, |p| {
        for _ in 0..6 {
            p.new_object("A");
        }
    });
    b.entry_point(main);
    let err = CallGraphBuilder::new(b.build(), PtaConfig::default().max_instances(Some(3)))
        .build()
        .unwrap_err();
    assert!(matches!(err, PtaError::BudgetExceeded { resource: "abstract objects", .. }));
}

fn entry_with_param() -> (Program, ProcedureId) {
    let mut b = ProgramBuilder::new();
    b.class("A");
    b.class("Service");
    let m = b.declare_method("Service", "m()");
    b.define(m, |_| {});
    let main = b.declare_static("Main", "main(Service,int)");
    b.define(main, |p| {
        let service = p.param(Some("Service"));
        p.param(Some("int"));
        p.call_virtual("Service", "m()", &[service]);
    });
    b.entry_point(main);
    (b.build(), main)
}

#[test]
fn test_entry_parameters_get_declared_type_objects() {
    let (program, main) = entry_with_param();
    let analysis = CallGraphBuilder::new(program, PtaConfig::default())
        .build()
        .unwrap();
    let node = analysis.call_graph().nodes_for(main)[0];
    let procedure = analysis.program().procedure(main).unwrap();

    let service = analysis.local_points_to(node, procedure.params[0]);
    assert_eq!(service.len(), 1);
    let name = analysis.instance_name(service[0]);
    assert!(name.starts_with("Service@") && name.contains("#entry0.0"), "{}", name);
    assert!(analysis.local_points_to(node, procedure.params[1]).is_empty());
    assert_eq!(
        codegraph_pta::CallGraphProvider::get_callees(&analysis, "Main.main(Service,int)"),
        vec!["Service.m()"]
    );
}

#[test]
fn test_unknown_entry_seeding_reaches_unknown_node() {
    let (program, main) = entry_with_param();
    let config = PtaConfig::default().entry_seeding(EntrySeeding::Unknown);
    let analysis = CallGraphBuilder::new(program, config).build().unwrap();
    let call_graph = analysis.call_graph();
    let node = call_graph.nodes_for(main)[0];

    assert_eq!(call_graph.targets_at(node, 0), vec![NodeId::UNKNOWN]);
    let unknown = analysis.points_to_key(&PointerKey::Unknown);
    assert_eq!(unknown.len(), 1);
    assert_eq!(analysis.instance_name(unknown[0]), "<unknown>");
}

#[test]
fn test_reflective_instantiation_allocates_named_class() {
    let mut b = ProgramBuilder::new();
    b.class("Widget");
    let main = b.declare_static("Main", "main()");
    let mut created = None;
    b.define(main, |p| {
        let name = p.constant("String", "Widget");
        created = Some(p.call_static("Reflect", "newInstance(String)", &[name]));
    });
    b.entry_point(main);
    let config = PtaConfig::default().reflective_new_instance("Reflect.newInstance(String)");

    let analysis = CallGraphBuilder::new(b.build(), config).build().unwrap();
    let objects = analysis.points_to_value(main, created.unwrap());
    assert_eq!(objects.len(), 1);
    let name = analysis.instance_name(objects[0]);
    assert!(name.starts_with("Widget@") && name.contains("#reflect0"), "{}", name);
    let caller = analysis.call_graph().nodes_for(main)[0];
    assert!(analysis.call_graph().edges_from(caller).is_empty());
}

#[test]
fn test_static_fields_feed_escape_report() {
    let mut b = ProgramBuilder::new();
    b.class("Registry").static_field("current");
    b.class("Entry").field("payload");
    b.class("Payload");
    b.class("Scratch");
    let main = b.declare_static("Main", "main()");
    b.define(main, |p| {
        let entry = p.new_object("Entry");
        let payload = p.new_object("Payload");
        p.put_field(entry, "Entry", "payload", payload);
        p.put_static("Registry", "current", entry);
        p.new_object("Scratch");
    });
    b.entry_point(main);
    let analysis = CallGraphBuilder::new(b.build(), PtaConfig::default())
        .build()
        .unwrap();

    let stored = analysis.points_to_key(&PointerKey::StaticField {
        field: FieldRef::new("Registry", "current"),
    });
    assert_eq!(stored.len(), 1);

    let report = ThreadEscapeAnalysis::default().analyze(&analysis);
    let types: Vec<_> = report.types.iter().map(|ty| ty.name().to_string()).collect();
    assert_eq!(types, vec!["Entry", "Payload"]);
    assert!(report.escapes(stored[0]));
}

#[test]
fn test_yaml_configuration_drives_the_run() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "context_policy:\n  kind: call_string\n  k: 1\nworklist_order: lifo\nmax_nodes: 64"
    )
    .unwrap();
    let config = PtaConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.context_policy, ContextPolicy::CallString { k: 1 });

    let mut b = ProgramBuilder::new();
    let main = b.declare_static("Main", "main()");
    let g = b.declare_static("Main", "g()");
    b.define(main, |p| {
        p.call_static("Main", "g()", &[]);
        p.call_static("Main", "g()", &[]);
    });
    b.define(g, |_| {});
    b.entry_point(main);

    let analysis = CallGraphBuilder::new(b.build(), config).build().unwrap();
    assert_eq!(analysis.call_graph().nodes_for(g).len(), 2);
}

#[test]
fn test_shadowed_fields_stay_apart_in_dump() {
    let mut b = ProgramBuilder::new();
    b.class("A").field("f");
    b.class("B").extends("A").field("f");
    b.class("X");
    b.class("Y");
    let main = b.declare_static("Main", "main()");
    b.define(main, |p| {
        let obj = p.new_object("B");
        let x = p.new_object("X");
        let y = p.new_object("Y");
        p.put_field(obj, "A", "f", x);
        p.put_field(obj, "B", "f", y);
    });
    b.entry_point(main);
    let analysis = CallGraphBuilder::new(b.build(), PtaConfig::default())
        .build()
        .unwrap();

    let dump = AnalysisDump::from_analysis(&analysis);
    let text = dump.to_text();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines.contains(&"pts B@p0#new0[].A.f -> X@p0#new1[]"));
    assert!(lines.contains(&"pts B@p0#new0[].B.f -> Y@p0#new2[]"));
    assert_eq!(AnalysisDump::from_json(&dump.to_json().unwrap()).unwrap(), dump);
}
