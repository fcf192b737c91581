//! Constraint generation
//!
//! Walks every instruction of one call-graph node exactly once and returns
//! its [`NodeConstraints`]. Generation is deterministic: walking the same
//! node twice yields equal output, because locations and objects are
//! interned. The solver memoizes which nodes it already expanded.
//!
//! Field, array and dispatched-call instructions cannot be resolved here;
//! they become standing [`Dependency`] records on their base location.

use super::heap_model::HeapModel;
use super::location_table::LocationTable;
use crate::features::call_graph::domain::{CGNode, CallGraph};
use crate::features::points_to::domain::{
    CallSiteRecord, CallTarget, Dependency, DirectCall, FlowEdge, InstanceId, LocationId,
    NodeConstraints, PointerKey, Seed, SiteKind,
};
use crate::features::points_to::ports::{CallSummary, SummaryEffect, SummaryRequest};
use crate::shared::models::{
    FieldRef, Instruction, InvokeKind, MethodRef, Procedure, Program, ValueId,
};
use crate::shared::ports::{is_primitive, ClassHierarchy};

/// Mutable interning state the generator writes into
pub struct GeneratorTables<'t> {
    pub locations: &'t mut LocationTable,
    pub heap: &'t mut HeapModel,
    pub call_graph: &'t CallGraph,
}

pub struct ConstraintGenerator<'a> {
    program: &'a Program,
    hierarchy: &'a dyn ClassHierarchy,
    summaries: &'a [Box<dyn CallSummary>],
}

impl<'a> ConstraintGenerator<'a> {
    pub fn new(
        program: &'a Program,
        hierarchy: &'a dyn ClassHierarchy,
        summaries: &'a [Box<dyn CallSummary>],
    ) -> Self {
        Self {
            program,
            hierarchy,
            summaries,
        }
    }

    /// Constraints of `node`; synthetic nodes have none
    pub fn generate(&self, node: &CGNode, tables: &mut GeneratorTables<'_>) -> NodeConstraints {
        let procedure = match node.procedure().and_then(|id| self.program.procedure(id)) {
            Some(procedure) => procedure,
            None => return NodeConstraints::default(),
        };
        let mut visitor = NodeVisitor {
            generator: self,
            node,
            procedure,
            tables,
            out: NodeConstraints::default(),
        };
        if procedure.is_native {
            visitor.summarize_native();
        } else {
            for instruction in &procedure.instructions {
                visitor.visit(instruction);
            }
        }
        visitor.out
    }
}

struct NodeVisitor<'g, 'a, 't, 'x> {
    generator: &'g ConstraintGenerator<'a>,
    node: &'g CGNode,
    procedure: &'a Procedure,
    tables: &'x mut GeneratorTables<'t>,
    out: NodeConstraints,
}

impl NodeVisitor<'_, '_, '_, '_> {
    fn location(&mut self, key: PointerKey) -> LocationId {
        self.tables
            .locations
            .location_for(key, self.tables.call_graph)
            .0
    }

    #[inline]
    fn local(&mut self, value: ValueId) -> LocationId {
        self.location(PointerKey::Local {
            node: self.node.id,
            value,
        })
    }

    fn flow(&mut self, src: LocationId, dst: LocationId) {
        self.out.edges.push(FlowEdge::copy(src, dst));
    }

    fn seed(&mut self, location: LocationId, instance: InstanceId) {
        self.out.seeds.push(Seed { location, instance });
    }

    /// Field reference rewritten to its declaring class, so accesses through
    /// subclasses share one location; unresolvable references are kept as
    /// written
    fn field(&self, field: &FieldRef) -> FieldRef {
        self.generator
            .hierarchy
            .resolve_field(field)
            .unwrap_or_else(|| field.clone())
    }

    fn depend(&mut self, base: LocationId, dependency: Dependency) {
        self.out.dependencies.push((base, dependency));
    }

    /// Native bodies are modeled as returning a fresh object of their
    /// declared reference return type
    fn summarize_native(&mut self) {
        let ty = match &self.procedure.return_type {
            Some(ty) if !is_primitive(ty) => ty.clone(),
            _ => return,
        };
        let instance = self.tables.heap.synthetic_allocation(
            self.node,
            SiteKind::NativeReturn,
            &ty,
            self.generator.hierarchy,
        );
        let ret = self.location(PointerKey::Return { node: self.node.id });
        self.seed(ret, instance);
    }

    fn visit(&mut self, instruction: &Instruction) {
        match instruction {
            Instruction::New { def, site, ty } => {
                let instance = self.tables.heap.allocation(
                    self.node,
                    self.procedure,
                    *site,
                    ty,
                    self.generator.hierarchy,
                );
                let def = self.local(*def);
                self.seed(def, instance);
            }
            Instruction::NewClosure {
                def,
                site,
                procedure,
            } => {
                let instance = self.tables.heap.closure(self.node, *procedure, *site);
                let def = self.local(*def);
                self.seed(def, instance);
            }
            Instruction::Constant { def, ty, value } => {
                let instance = self.tables.heap.constant(ty, value);
                let def = self.local(*def);
                self.seed(def, instance);
            }
            Instruction::Copy { def, src } => {
                let (src, def) = (self.local(*src), self.local(*def));
                self.flow(src, def);
            }
            Instruction::Phi { def, uses } => {
                let def = self.local(*def);
                for used in uses {
                    let src = self.local(*used);
                    self.flow(src, def);
                }
            }
            Instruction::CheckCast { def, src, ty } => {
                let (src, def) = (self.local(*src), self.local(*def));
                self.out.edges.push(FlowEdge::filtered(src, def, ty.clone()));
            }
            Instruction::GetField { def, base, field } => {
                let (base, def) = (self.local(*base), self.local(*def));
                let field = self.field(field);
                self.depend(base, Dependency::FieldLoad { field, def });
            }
            Instruction::PutField { base, field, value } => {
                let (base, value) = (self.local(*base), self.local(*value));
                let field = self.field(field);
                self.depend(base, Dependency::FieldStore { field, value });
            }
            Instruction::GetStatic { def, field } => {
                let field = self.field(field);
                let src = self.location(PointerKey::StaticField { field });
                let def = self.local(*def);
                self.flow(src, def);
            }
            Instruction::PutStatic { field, value } => {
                let value = self.local(*value);
                let field = self.field(field);
                let dst = self.location(PointerKey::StaticField { field });
                self.flow(value, dst);
            }
            Instruction::ArrayLoad { def, array } => {
                let (array, def) = (self.local(*array), self.local(*def));
                self.depend(array, Dependency::ArrayLoad { def });
            }
            Instruction::ArrayStore { array, value } => {
                let (array, value) = (self.local(*array), self.local(*value));
                self.depend(array, Dependency::ArrayStore { value });
            }
            Instruction::LexicalRead { def, definer, name } => {
                let src = self.location(PointerKey::Lexical {
                    definer: *definer,
                    name: name.clone(),
                });
                let def = self.local(*def);
                self.flow(src, def);
            }
            Instruction::LexicalWrite {
                definer,
                name,
                value,
            } => {
                let value = self.local(*value);
                let dst = self.location(PointerKey::Lexical {
                    definer: *definer,
                    name: name.clone(),
                });
                self.flow(value, dst);
            }
            Instruction::Invoke {
                def,
                exception,
                site,
                kind,
                target,
                args,
            } => self.visit_invoke(*def, *exception, *site, *kind, target, args),
            Instruction::Return { value } => {
                if let Some(value) = value {
                    let value = self.local(*value);
                    let ret = self.location(PointerKey::Return { node: self.node.id });
                    self.flow(value, ret);
                }
            }
            Instruction::Throw { value } => {
                let value = self.local(*value);
                let exc = self.location(PointerKey::ExceptionalReturn { node: self.node.id });
                self.flow(value, exc);
            }
        }
    }

    fn visit_invoke(
        &mut self,
        def: Option<ValueId>,
        exception: Option<ValueId>,
        site: u32,
        kind: InvokeKind,
        target: &MethodRef,
        args: &[ValueId],
    ) {
        let def = def.map(|value| self.local(value));
        let exception = exception.map(|value| self.local(value));

        let generator = self.generator;
        let summary = generator
            .summaries
            .iter()
            .filter(|summary| summary.applies_to(target))
            .find_map(|summary| {
                summary.summarize(&SummaryRequest {
                    caller: self.procedure,
                    kind,
                    target,
                    args,
                    hierarchy: generator.hierarchy,
                })
            });
        if let Some(effect) = summary {
            if let Some(def) = def {
                let instance = match effect {
                    SummaryEffect::Allocate { ty } => self.tables.heap.synthetic_allocation(
                        self.node,
                        SiteKind::Reflective(site),
                        &ty,
                        generator.hierarchy,
                    ),
                    SummaryEffect::ReturnUnknown => InstanceId::UNKNOWN,
                };
                self.seed(def, instance);
            }
            return;
        }

        let record = CallSiteRecord {
            caller: self.node.id,
            site,
            kind,
            target: target.clone(),
            args: args.iter().map(|value| self.local(*value)).collect(),
            def,
            exception,
            constant_args: args
                .iter()
                .map(|value| self.procedure.constant_string(*value).map(str::to_string))
                .collect(),
        };

        match (kind, record.args.first().copied()) {
            (InvokeKind::Static, _) => {
                let target = generator
                    .hierarchy
                    .resolve_static(target)
                    .map(CallTarget::Procedure)
                    .unwrap_or(CallTarget::Unknown);
                self.out.calls.push(DirectCall { target, record });
            }
            (_, Some(receiver)) => self.depend(receiver, Dependency::Dispatch(record)),
            (_, None) => self.out.calls.push(DirectCall {
                target: CallTarget::Unknown,
                record,
            }),
        }
    }
}
