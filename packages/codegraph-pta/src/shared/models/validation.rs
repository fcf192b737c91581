//! Input IR validation
//!
//! Malformed input is rejected before the solver runs; no fixpoint over an
//! inconsistent program is meaningful.

use super::ir::{Instruction, Procedure, Program, ValueId};
use crate::errors::{PtaError, Result};
use crate::shared::ports::ClassHierarchy;
use rustc_hash::FxHashSet;

/// Check every structural precondition the analysis relies on
pub fn validate_program(program: &Program, hierarchy: &dyn ClassHierarchy) -> Result<()> {
    for (index, procedure) in program.procedures.iter().enumerate() {
        if procedure.id.index() != index {
            return Err(PtaError::malformed(
                procedure.name(),
                format!("id {} stored at index {}", procedure.id, index),
            ));
        }
        validate_procedure(program, hierarchy, procedure)?;
    }

    for entry in &program.entry_points {
        if program.procedure(*entry).is_none() {
            return Err(PtaError::UnknownEntryPoint(entry.to_string()));
        }
    }

    for class in &program.classes {
        for (selector, id) in &class.methods {
            if program.procedure(*id).is_none() {
                return Err(PtaError::malformed(
                    format!("{}.{}", class.name, selector),
                    format!("class method table references unknown procedure {}", id),
                ));
            }
        }
    }

    Ok(())
}

fn validate_procedure(
    program: &Program,
    hierarchy: &dyn ClassHierarchy,
    procedure: &Procedure,
) -> Result<()> {
    let name = procedure.name();
    let fail = |detail: String| Err(PtaError::malformed(name.clone(), detail));

    if procedure.params.len() != procedure.param_types.len() {
        return fail(format!(
            "{} params but {} param types",
            procedure.params.len(),
            procedure.param_types.len()
        ));
    }

    let mut defined: FxHashSet<ValueId> = FxHashSet::default();
    for param in &procedure.params {
        if !defined.insert(*param) {
            return fail(format!("parameter {} declared twice", param));
        }
    }
    for instruction in &procedure.instructions {
        for def in instruction.defs() {
            if !defined.insert(def) {
                return fail(format!("value {} defined more than once", def));
            }
        }
    }

    for instruction in &procedure.instructions {
        // Phi operands may refer to values defined later in program order
        for used in instruction.uses() {
            if !defined.contains(&used) {
                return fail(format!("use of undefined value {}", used));
            }
        }
        for referenced in instruction.referenced_procedures() {
            if program.procedure(referenced).is_none() {
                return fail(format!("reference to unknown procedure {}", referenced));
            }
        }
        match instruction {
            Instruction::New { ty, .. } | Instruction::CheckCast { ty, .. } => {
                if !hierarchy.is_declared(ty) {
                    return fail(format!("undeclared type {}", ty));
                }
            }
            Instruction::Invoke { kind, args, .. } if kind.has_receiver() && args.is_empty() => {
                return fail(format!("{:?} call without receiver argument", kind));
            }
            _ => {}
        }
    }

    Ok(())
}
