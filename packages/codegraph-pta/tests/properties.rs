//! Fixpoint properties over generated programs
//!
//! Programs are built from a small class family (`Base` with subclasses
//! `K0..K2`, each overriding `m(Object)`) and a random `main` body.

use codegraph_pta::features::points_to::infrastructure::SelectorChain;
use codegraph_pta::features::points_to::ports::ContextRequest;
use codegraph_pta::shared::models::{Instruction, InvokeKind, Program};
use codegraph_pta::{
    AnalysisDump, AnalysisStatus, CallGraphBuilder, CallGraphProvider, CancellationToken, Context,
    ContextPolicy, ContextSelector, PointerAnalysis, ProgramBuilder, PtaConfig, WorklistOrder,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::BTreeSet;

const SUBCLASSES: [&str; 3] = ["K0", "K1", "K2"];

#[derive(Debug, Clone, Copy)]
enum Op {
    New(usize),
    Copy(usize),
    Store(usize, usize),
    Load(usize),
    Call(usize, usize),
    Phi(usize, usize),
    Cast(usize, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..3).prop_map(Op::New),
        any::<usize>().prop_map(Op::Copy),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Store(a, b)),
        any::<usize>().prop_map(Op::Load),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Call(a, b)),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Phi(a, b)),
        (any::<usize>(), 0usize..3).prop_map(|(a, b)| Op::Cast(a, b)),
    ]
}

fn program_from(ops: &[Op]) -> Program {
    let mut b = ProgramBuilder::new();
    b.class("Base").field("f");
    for name in SUBCLASSES {
        b.class(name).extends("Base");
    }

    let base_m = b.declare_method("Base", "m(Object)");
    b.define(base_m, |p| {
        let v = p.param(Some("Object"));
        p.ret(Some(v));
    });
    let k0 = b.declare_method("K0", "m(Object)");
    b.define(k0, |p| {
        p.param(Some("Object"));
        let fresh = p.new_object("K1");
        p.ret(Some(fresh));
    });
    let k1 = b.declare_method("K1", "m(Object)");
    b.define(k1, |p| {
        let this = p.this();
        p.param(Some("Object"));
        let v = p.get_field(this, "Base", "f");
        p.ret(Some(v));
    });
    let k2 = b.declare_method("K2", "m(Object)");
    b.define(k2, |p| {
        let this = p.this();
        let v = p.param(Some("Object"));
        p.put_field(this, "Base", "f", v);
        let wrapped = p.new_object("K2");
        p.put_field(wrapped, "Base", "f", this);
        p.ret(Some(wrapped));
    });

    let main = b.declare_static("Main", "main()");
    b.define(main, |p| {
        let mut vars = vec![p.new_object("K0")];
        for op in ops {
            let pick = |i: usize| vars[i % vars.len()];
            let defined = match *op {
                Op::New(k) => Some(p.new_object(SUBCLASSES[k])),
                Op::Copy(a) => Some(p.copy(pick(a))),
                Op::Store(a, v) => {
                    p.put_field(pick(a), "Base", "f", pick(v));
                    None
                }
                Op::Load(a) => Some(p.get_field(pick(a), "Base", "f")),
                Op::Call(r, a) => Some(p.call_virtual("Base", "m(Object)", &[pick(r), pick(a)])),
                Op::Phi(a, c) => Some(p.phi(&[pick(a), pick(c)])),
                Op::Cast(a, k) => Some(p.cast(pick(a), SUBCLASSES[k])),
            };
            vars.extend(defined);
        }
    });
    b.entry_point(main);
    b.build()
}

fn solve(program: &Program, config: PtaConfig) -> PointerAnalysis {
    CallGraphBuilder::new(program.clone(), config).build().unwrap()
}

/// Delegates to the configured chain and cancels `token` after `limit` selections
#[derive(Debug)]
struct CancelAfter {
    chain: SelectorChain,
    token: CancellationToken,
    limit: usize,
    calls: Cell<usize>,
}

impl ContextSelector for CancelAfter {
    fn select_context(&self, base: Context, request: &ContextRequest<'_>) -> Context {
        self.calls.set(self.calls.get() + 1);
        if self.calls.get() >= self.limit {
            self.token.cancel();
        }
        self.chain.select_context(base, request)
    }
}

fn solve_cancelled(program: &Program, config: PtaConfig, limit: usize) -> PointerAnalysis {
    let token = CancellationToken::new();
    let selector = CancelAfter {
        chain: SelectorChain::from_config(&config),
        token: token.clone(),
        limit,
        calls: Cell::new(0),
    };
    CallGraphBuilder::new(program.clone(), config)
        .with_context_selector(selector)
        .with_cancellation(token)
        .build()
        .unwrap()
}

/// Every resolvable receiver of a virtual call has an edge to its target
fn assert_dispatch_is_sound(analysis: &PointerAnalysis) {
    let call_graph = analysis.call_graph();
    for node in call_graph.nodes() {
        let Some(procedure) = node.procedure().and_then(|id| analysis.program().procedure(id))
        else {
            continue;
        };
        for instruction in &procedure.instructions {
            let Instruction::Invoke {
                site,
                kind: InvokeKind::Virtual,
                target,
                args,
                ..
            } = instruction
            else {
                continue;
            };
            let targets: BTreeSet<_> = call_graph
                .targets_at(node.id, *site)
                .into_iter()
                .filter_map(|callee| call_graph.node(callee).and_then(|n| n.procedure()))
                .collect();
            for object in analysis.local_points_to(node.id, args[0]) {
                let ty = analysis.instance(object).and_then(|key| key.concrete_type());
                let resolved =
                    ty.and_then(|ty| analysis.hierarchy().resolve_method(ty, &target.selector));
                if let Some(callee) = resolved {
                    assert!(
                        targets.contains(&callee),
                        "{} site {} misses {} for {}",
                        analysis.node_name(node.id),
                        site,
                        callee,
                        analysis.instance_name(object)
                    );
                }
            }
        }
    }
}

/// Every node is an entry node or the target of some recorded edge chain
fn assert_nodes_reachable_from_entries(analysis: &PointerAnalysis) {
    let call_graph = analysis.call_graph();
    let mut reached: BTreeSet<_> = call_graph.entry_nodes().into_iter().collect();
    let mut stack: Vec<_> = reached.iter().copied().collect();
    while let Some(node) = stack.pop() {
        for callee in call_graph.successors(node) {
            if reached.insert(callee) {
                stack.push(callee);
            }
        }
    }
    for node in call_graph.nodes() {
        assert!(reached.contains(&node.id), "{} is unreachable", analysis.node_name(node.id));
    }
}

fn assert_dump_contained_in(partial: &AnalysisDump, full: &AnalysisDump) {
    let full_nodes: BTreeSet<_> = full.nodes.iter().collect();
    let full_edges: BTreeSet<_> = full.edges.iter().collect();
    for node in &partial.nodes {
        assert!(full_nodes.contains(node), "extra node {}", node.name);
    }
    for edge in &partial.edges {
        assert!(full_edges.contains(edge), "extra edge {:?}", edge);
    }
    for entry in &partial.points_to {
        let complete = full
            .points_to
            .iter()
            .find(|other| other.location == entry.location)
            .map(|other| other.objects.iter().collect::<BTreeSet<_>>())
            .unwrap_or_default();
        for object in &entry.objects {
            assert!(complete.contains(object), "{} gained {}", entry.location, object);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_worklist_order_does_not_change_fixpoint(
        ops in prop::collection::vec(op_strategy(), 1..24),
        k in 1usize..3,
    ) {
        let program = program_from(&ops);
        let base = PtaConfig::default().context_policy(ContextPolicy::ObjectSensitive { k });
        let fifo = solve(&program, base.clone().worklist_order(WorklistOrder::Fifo));
        let lifo = solve(&program, base.clone().worklist_order(WorklistOrder::Lifo));
        let flushing = solve(&program, base.soft_cache_flush_interval(Some(1)));
        let fifo = AnalysisDump::from_analysis(&fifo);
        prop_assert_eq!(&fifo, &AnalysisDump::from_analysis(&lifo));
        prop_assert_eq!(&fifo, &AnalysisDump::from_analysis(&flushing));
    }

    #[test]
    fn test_virtual_dispatch_is_sound(
        ops in prop::collection::vec(op_strategy(), 1..24),
        k in 1usize..3,
    ) {
        let program = program_from(&ops);
        assert_dispatch_is_sound(&solve(&program, PtaConfig::default()));
        let call_string = PtaConfig::default().context_policy(ContextPolicy::CallString { k });
        assert_dispatch_is_sound(&solve(&program, call_string));
        let zero_cfa = PtaConfig::default().context_policy(ContextPolicy::ZeroCfa);
        let zero_cfa = solve(&program, zero_cfa);
        assert_dispatch_is_sound(&zero_cfa);
        assert_nodes_reachable_from_entries(&zero_cfa);
    }

    #[test]
    fn test_cancelled_run_is_a_consistent_prefix(
        ops in prop::collection::vec(op_strategy(), 4..24),
        limit in 1usize..12,
    ) {
        let program = program_from(&ops);
        let full = AnalysisDump::from_analysis(&solve(&program, PtaConfig::default()));
        let partial = solve_cancelled(&program, PtaConfig::default(), limit);

        let call_graph = partial.call_graph();
        for (caller, _, callee) in call_graph.edges() {
            prop_assert!(call_graph.contains(caller) && call_graph.contains(callee));
        }
        assert_nodes_reachable_from_entries(&partial);
        assert_dump_contained_in(&AnalysisDump::from_analysis(&partial), &full);
    }
}

#[test]
fn test_cancellation_marks_result_incomplete() {
    let ops = [Op::Call(0, 0), Op::New(2), Op::Call(1, 0), Op::Call(2, 1)];
    let program = program_from(&ops);
    let partial = solve_cancelled(&program, PtaConfig::default(), 1);
    assert!(!partial.is_complete());
    assert!(matches!(partial.status(), AnalysisStatus::Incomplete(_)));
    let dump = AnalysisDump::from_analysis(&partial);
    assert!(dump.to_text().starts_with("status incomplete"));
}

#[test]
fn test_dispatch_follows_stored_receiver() {
    // r = new K2; r.m(r) wraps r in a fresh K2 whose f is r
    let ops = [Op::New(2), Op::Call(1, 1), Op::Load(2), Op::Call(3, 0)];
    let program = program_from(&ops);
    let analysis = solve(&program, PtaConfig::default());
    assert!(analysis.is_complete());
    assert_dispatch_is_sound(&analysis);

    let called: BTreeSet<String> = analysis
        .call_graph()
        .nodes()
        .filter_map(|node| node.procedure())
        .filter_map(|id| analysis.program().procedure(id))
        .map(|procedure| procedure.name())
        .collect();
    assert!(called.contains("K2.m(Object)"));
    assert!(!called.contains("Base.m(Object)"));
    assert_eq!(analysis.get_callees("Main.main()"), vec!["K2.m(Object)"]);
}
