//! SSA Intermediate Representation
//!
//! The read-only program model consumed by the pointer analysis. Front-ends
//! (one per source language) lower their ASTs into this form; the analysis
//! never produces or mutates it.
//!
//! Every procedure is in SSA form: each [`ValueId`] is defined at most once,
//! either as a parameter or by exactly one instruction.

use crate::index_type;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

index_type!(
    /// Procedure identifier (index into [`Program::procedures`])
    ProcedureId,
    "p"
);

index_type!(
    /// SSA value number, local to one procedure
    ValueId,
    "v"
);

/// Suffix marking an array type name (`A[]`)
const ARRAY_SUFFIX: &str = "[]";

/// Name of a class, interface or array type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Array type whose elements are `element`
    pub fn array_of(element: &TypeRef) -> Self {
        Self(format!("{}{}", element.0, ARRAY_SUFFIX))
    }

    /// Synthetic type carried by closure objects
    pub fn function() -> Self {
        Self("<function>".to_string())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.0.ends_with(ARRAY_SUFFIX)
    }

    /// Element type for array types
    pub fn element_type(&self) -> Option<TypeRef> {
        self.0
            .strip_suffix(ARRAY_SUFFIX)
            .map(|element| TypeRef(element.to_string()))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::new(name)
    }
}

/// Reference to a field, static or instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldRef {
    pub declaring: TypeRef,
    pub name: String,
}

impl FieldRef {
    pub fn new(declaring: impl Into<TypeRef>, name: impl Into<String>) -> Self {
        Self {
            declaring: declaring.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring, self.name)
    }
}

/// Symbolic method reference as written at a call site
///
/// The selector is the name plus whatever signature the front-end uses to
/// distinguish overloads (e.g. `m(I)V` or `m/2`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodRef {
    pub declaring: TypeRef,
    pub selector: String,
}

impl MethodRef {
    pub fn new(declaring: impl Into<TypeRef>, selector: impl Into<String>) -> Self {
        Self {
            declaring: declaring.into(),
            selector: selector.into(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring, self.selector)
    }
}

/// Call dispatch flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvokeKind {
    /// Static call: target known from the method reference alone
    Static,
    /// Non-virtual instance call (constructors, super calls)
    Special,
    /// Virtual/interface call: target depends on the receiver's type
    Virtual,
    /// Call through a function value (`args[0]` is the callee closure)
    Closure,
}

impl InvokeKind {
    /// Whether `args[0]` is a receiver / function value
    #[inline]
    pub fn has_receiver(self) -> bool {
        !matches!(self, InvokeKind::Static)
    }
}

/// A single SSA instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    /// `def = new ty` (arrays use an `ty` ending in `[]`)
    New { def: ValueId, site: u32, ty: TypeRef },

    /// `def = function-object(procedure)`
    NewClosure {
        def: ValueId,
        site: u32,
        procedure: ProcedureId,
    },

    /// Reference constant such as a string literal
    Constant {
        def: ValueId,
        ty: TypeRef,
        value: String,
    },

    /// `def = src`
    Copy { def: ValueId, src: ValueId },

    /// `def = φ(uses...)`
    Phi { def: ValueId, uses: Vec<ValueId> },

    /// `def = (ty) src`
    CheckCast {
        def: ValueId,
        src: ValueId,
        ty: TypeRef,
    },

    /// `def = base.field`
    GetField {
        def: ValueId,
        base: ValueId,
        field: FieldRef,
    },

    /// `base.field = value`
    PutField {
        base: ValueId,
        field: FieldRef,
        value: ValueId,
    },

    /// `def = T.field`
    GetStatic { def: ValueId, field: FieldRef },

    /// `T.field = value`
    PutStatic { field: FieldRef, value: ValueId },

    /// `def = array[_]`
    ArrayLoad { def: ValueId, array: ValueId },

    /// `array[_] = value`
    ArrayStore { array: ValueId, value: ValueId },

    /// Read of a variable captured from the lexical scope of `definer`
    LexicalRead {
        def: ValueId,
        definer: ProcedureId,
        name: String,
    },

    /// Write of a variable captured from the lexical scope of `definer`
    LexicalWrite {
        definer: ProcedureId,
        name: String,
        value: ValueId,
    },

    /// Call; `exception` receives whatever the callee may throw
    Invoke {
        #[serde(default)]
        def: Option<ValueId>,
        #[serde(default)]
        exception: Option<ValueId>,
        site: u32,
        kind: InvokeKind,
        target: MethodRef,
        #[serde(default)]
        args: Vec<ValueId>,
    },

    Return {
        #[serde(default)]
        value: Option<ValueId>,
    },

    Throw { value: ValueId },
}

impl Instruction {
    /// Value defined by this instruction (exceptional defs included)
    pub fn defs(&self) -> Vec<ValueId> {
        match self {
            Instruction::New { def, .. }
            | Instruction::NewClosure { def, .. }
            | Instruction::Constant { def, .. }
            | Instruction::Copy { def, .. }
            | Instruction::Phi { def, .. }
            | Instruction::CheckCast { def, .. }
            | Instruction::GetField { def, .. }
            | Instruction::GetStatic { def, .. }
            | Instruction::ArrayLoad { def, .. }
            | Instruction::LexicalRead { def, .. } => vec![*def],
            Instruction::Invoke { def, exception, .. } => def.iter().chain(exception).copied().collect(),
            Instruction::PutField { .. }
            | Instruction::PutStatic { .. }
            | Instruction::ArrayStore { .. }
            | Instruction::LexicalWrite { .. }
            | Instruction::Return { .. }
            | Instruction::Throw { .. } => Vec::new(),
        }
    }

    /// Values read by this instruction
    pub fn uses(&self) -> Vec<ValueId> {
        match self {
            Instruction::New { .. }
            | Instruction::NewClosure { .. }
            | Instruction::Constant { .. }
            | Instruction::GetStatic { .. }
            | Instruction::LexicalRead { .. } => Vec::new(),
            Instruction::Copy { src, .. } | Instruction::CheckCast { src, .. } => vec![*src],
            Instruction::Phi { uses, .. } => uses.clone(),
            Instruction::GetField { base, .. } => vec![*base],
            Instruction::PutField { base, value, .. } => vec![*base, *value],
            Instruction::PutStatic { value, .. } | Instruction::LexicalWrite { value, .. } => {
                vec![*value]
            }
            Instruction::ArrayLoad { array, .. } => vec![*array],
            Instruction::ArrayStore { array, value } => vec![*array, *value],
            Instruction::Invoke { args, .. } => args.clone(),
            Instruction::Return { value } => value.iter().copied().collect(),
            Instruction::Throw { value } => vec![*value],
        }
    }

    /// Procedures referenced directly by id
    pub fn referenced_procedures(&self) -> Vec<ProcedureId> {
        match self {
            Instruction::NewClosure { procedure, .. } => vec![*procedure],
            Instruction::LexicalRead { definer, .. } | Instruction::LexicalWrite { definer, .. } => {
                vec![*definer]
            }
            _ => Vec::new(),
        }
    }
}

/// A procedure (method or function) with its SSA body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    pub id: ProcedureId,
    pub declaring: TypeRef,
    pub selector: String,
    #[serde(default)]
    pub is_static: bool,
    /// Native procedures have no body; their effect is summarized
    #[serde(default)]
    pub is_native: bool,
    /// Formal parameters; `params[0]` is the receiver for instance methods
    #[serde(default)]
    pub params: Vec<ValueId>,
    /// Declared parameter types, parallel to `params`
    #[serde(default)]
    pub param_types: Vec<Option<TypeRef>>,
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl Procedure {
    /// Qualified name (`Type.selector`)
    pub fn name(&self) -> String {
        format!("{}.{}", self.declaring, self.selector)
    }

    pub fn method_ref(&self) -> MethodRef {
        MethodRef::new(self.declaring.clone(), self.selector.clone())
    }

    /// Whether the procedure takes a receiver as `params[0]`
    #[inline]
    pub fn has_receiver(&self) -> bool {
        !self.is_static && !self.params.is_empty()
    }

    /// Find the instruction defining `value`, if any
    pub fn definition_of(&self, value: ValueId) -> Option<&Instruction> {
        self.instructions
            .iter()
            .find(|instruction| instruction.defs().contains(&value))
    }

    /// String constant bound to `value`, if it is defined by a `Constant`
    pub fn constant_string(&self, value: ValueId) -> Option<&str> {
        match self.definition_of(value) {
            Some(Instruction::Constant { value: text, .. }) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Field declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(default)]
    pub is_static: bool,
    /// Whether the field holds references (primitive fields never point anywhere)
    #[serde(default = "default_true")]
    pub is_reference: bool,
}

fn default_true() -> bool {
    true
}

/// Class / interface declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: TypeRef,
    #[serde(default)]
    pub superclass: Option<TypeRef>,
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
    /// Selector → implementing procedure declared in this class
    #[serde(default)]
    pub methods: BTreeMap<String, ProcedureId>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

impl ClassDecl {
    pub fn new(name: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            interfaces: Vec::new(),
            methods: BTreeMap::new(),
            fields: Vec::new(),
        }
    }
}

/// Whole program: class declarations, procedures, entry points
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub classes: Vec<ClassDecl>,
    pub procedures: Vec<Procedure>,
    pub entry_points: Vec<ProcedureId>,
}

impl Program {
    #[inline]
    pub fn procedure(&self, id: ProcedureId) -> Option<&Procedure> {
        self.procedures.get(id.index())
    }

    pub fn procedure_by_name(&self, declaring: &str, selector: &str) -> Option<&Procedure> {
        self.procedures
            .iter()
            .find(|p| p.declaring.name() == declaring && p.selector == selector)
    }

    pub fn class(&self, name: &TypeRef) -> Option<&ClassDecl> {
        self.classes.iter().find(|c| &c.name == name)
    }

    /// Load a program from its JSON form
    pub fn from_json(text: &str) -> crate::errors::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_types() {
        let a = TypeRef::new("A");
        let arr = TypeRef::array_of(&a);
        assert!(arr.is_array());
        assert!(!a.is_array());
        assert_eq!(arr.element_type(), Some(a));
    }

    #[test]
    fn test_defs_and_uses() {
        let invoke = Instruction::Invoke {
            def: Some(ValueId(5)),
            exception: Some(ValueId(6)),
            site: 0,
            kind: InvokeKind::Virtual,
            target: MethodRef::new("A", "m()"),
            args: vec![ValueId(1), ValueId(2)],
        };
        assert_eq!(invoke.defs(), vec![ValueId(5), ValueId(6)]);
        assert_eq!(invoke.uses(), vec![ValueId(1), ValueId(2)]);

        let store = Instruction::PutField {
            base: ValueId(1),
            field: FieldRef::new("A", "f"),
            value: ValueId(3),
        };
        assert!(store.defs().is_empty());
        assert_eq!(store.uses(), vec![ValueId(1), ValueId(3)]);
    }

    #[test]
    fn test_json_round_trip_shape() {
        let json = r#"{
            "procedures": [{
                "id": 0, "declaring": "Main", "selector": "main()", "is_static": true,
                "instructions": [
                    {"op": "new", "def": 1, "site": 0, "ty": "A"},
                    {"op": "return", "value": null}
                ]
            }],
            "entry_points": [0]
        }"#;
        let program = Program::from_json(json).unwrap();
        assert_eq!(program.procedures.len(), 1);
        assert_eq!(program.procedures[0].name(), "Main.main()");
        assert!(matches!(
            program.procedures[0].instructions[0],
            Instruction::New { def: ValueId(1), .. }
        ));
    }
}
