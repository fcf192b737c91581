//! Shared program model
//!
//! The SSA IR the analysis consumes, a builder for it, and input validation.

pub mod builder;
pub mod ir;
pub mod validation;

pub use builder::{CallResult, ClassBuilder, ProcedureBuilder, ProgramBuilder};
pub use ir::{
    ClassDecl, FieldDecl, FieldRef, Instruction, InvokeKind, MethodRef, Procedure, ProcedureId,
    Program, TypeRef, ValueId,
};
pub use validation::validate_program;
