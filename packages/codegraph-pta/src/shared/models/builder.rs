//! Fluent construction of [`Program`]s
//!
//! Used by tests and by clients that synthesize IR directly instead of going
//! through a front-end.
//!
//! ```text
//! let mut b = ProgramBuilder::new();
//! let main = b.declare_static("Main", "main()");
//! let f = b.declare_static("Main", "f()");
//! b.define(main, |p| {
//!     let x = p.new_object("A");
//!     p.call_static("Main", "f()", &[]);
//!     p.ret(Some(x));
//! });
//! b.entry_point(main);
//! let program = b.build();
//! ```

use super::ir::{
    ClassDecl, FieldDecl, FieldRef, Instruction, InvokeKind, MethodRef, ProcedureId, Procedure,
    Program, TypeRef, ValueId,
};

/// Result of an [`ProcedureBuilder::invoke`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallResult {
    pub def: ValueId,
    pub exception: ValueId,
}

/// Builder for a whole program
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn class_mut(&mut self, name: &str) -> &mut ClassDecl {
        let ty = TypeRef::new(name);
        let position = match self.program.classes.iter().position(|c| c.name == ty) {
            Some(position) => position,
            None => {
                self.program.classes.push(ClassDecl::new(ty));
                self.program.classes.len() - 1
            }
        };
        &mut self.program.classes[position]
    }

    /// Open (creating if needed) a class declaration
    pub fn class(&mut self, name: &str) -> ClassBuilder<'_> {
        ClassBuilder {
            class: self.class_mut(name),
        }
    }

    fn declare(
        &mut self,
        declaring: &str,
        selector: &str,
        is_static: bool,
        is_native: bool,
    ) -> ProcedureId {
        let id = ProcedureId::from_index(self.program.procedures.len());
        let mut procedure = Procedure {
            id,
            declaring: TypeRef::new(declaring),
            selector: selector.to_string(),
            is_static,
            is_native,
            params: Vec::new(),
            param_types: Vec::new(),
            return_type: None,
            instructions: Vec::new(),
        };
        if !is_static {
            procedure.params.push(ValueId(1));
            procedure.param_types.push(Some(TypeRef::new(declaring)));
        }
        self.program.procedures.push(procedure);
        self.class_mut(declaring)
            .methods
            .insert(selector.to_string(), id);
        id
    }

    /// Declare a static procedure; its body is supplied later with [`define`](Self::define)
    pub fn declare_static(&mut self, declaring: &str, selector: &str) -> ProcedureId {
        self.declare(declaring, selector, true, false)
    }

    /// Declare an instance method; `v1` is the receiver
    pub fn declare_method(&mut self, declaring: &str, selector: &str) -> ProcedureId {
        self.declare(declaring, selector, false, false)
    }

    /// Declare a native static procedure returning `return_type`
    pub fn declare_native(
        &mut self,
        declaring: &str,
        selector: &str,
        return_type: Option<&str>,
    ) -> ProcedureId {
        let id = self.declare(declaring, selector, true, true);
        self.program.procedures[id.index()].return_type = return_type.map(TypeRef::new);
        id
    }

    /// Fill in the body of a declared procedure
    pub fn define(&mut self, id: ProcedureId, body: impl FnOnce(&mut ProcedureBuilder<'_>)) {
        let procedure = &mut self.program.procedures[id.index()];
        let next_value = procedure
            .params
            .iter()
            .map(|v| v.0 + 1)
            .max()
            .unwrap_or(1);
        let mut builder = ProcedureBuilder {
            procedure,
            next_value,
            next_alloc_site: 0,
            next_call_site: 0,
        };
        body(&mut builder);
    }

    pub fn entry_point(&mut self, id: ProcedureId) -> &mut Self {
        self.program.entry_points.push(id);
        self
    }

    pub fn build(self) -> Program {
        self.program
    }
}

/// Builder for a class declaration
pub struct ClassBuilder<'a> {
    class: &'a mut ClassDecl,
}

impl<'a> ClassBuilder<'a> {
    pub fn extends(self, superclass: &str) -> Self {
        self.class.superclass = Some(TypeRef::new(superclass));
        self
    }

    pub fn implements(self, interface: &str) -> Self {
        self.class.interfaces.push(TypeRef::new(interface));
        self
    }

    pub fn field(self, name: &str) -> Self {
        self.push_field(name, false, true)
    }

    pub fn static_field(self, name: &str) -> Self {
        self.push_field(name, true, true)
    }

    pub fn primitive_field(self, name: &str) -> Self {
        self.push_field(name, false, false)
    }

    fn push_field(self, name: &str, is_static: bool, is_reference: bool) -> Self {
        self.class.fields.push(FieldDecl {
            name: name.to_string(),
            is_static,
            is_reference,
        });
        self
    }
}

/// Builder for one procedure body; hands out fresh SSA values and sites
pub struct ProcedureBuilder<'a> {
    procedure: &'a mut Procedure,
    next_value: u32,
    next_alloc_site: u32,
    next_call_site: u32,
}

impl<'a> ProcedureBuilder<'a> {
    fn fresh(&mut self) -> ValueId {
        let value = ValueId(self.next_value);
        self.next_value += 1;
        value
    }

    fn push(&mut self, instruction: Instruction) {
        self.procedure.instructions.push(instruction);
    }

    /// Receiver of an instance method
    pub fn this(&self) -> ValueId {
        assert!(!self.procedure.is_static, "static procedures have no receiver");
        self.procedure.params[0]
    }

    /// Append a formal parameter
    pub fn param(&mut self, ty: Option<&str>) -> ValueId {
        let value = self.fresh();
        self.procedure.params.push(value);
        self.procedure.param_types.push(ty.map(TypeRef::new));
        value
    }

    pub fn returns(&mut self, ty: &str) {
        self.procedure.return_type = Some(TypeRef::new(ty));
    }

    pub fn new_object(&mut self, ty: &str) -> ValueId {
        let def = self.fresh();
        let site = self.next_alloc_site;
        self.next_alloc_site += 1;
        self.push(Instruction::New {
            def,
            site,
            ty: TypeRef::new(ty),
        });
        def
    }

    pub fn new_array(&mut self, element: &str) -> ValueId {
        self.new_object(&format!("{}[]", element))
    }

    pub fn new_closure(&mut self, procedure: ProcedureId) -> ValueId {
        let def = self.fresh();
        let site = self.next_alloc_site;
        self.next_alloc_site += 1;
        self.push(Instruction::NewClosure {
            def,
            site,
            procedure,
        });
        def
    }

    pub fn constant(&mut self, ty: &str, value: &str) -> ValueId {
        let def = self.fresh();
        self.push(Instruction::Constant {
            def,
            ty: TypeRef::new(ty),
            value: value.to_string(),
        });
        def
    }

    pub fn copy(&mut self, src: ValueId) -> ValueId {
        let def = self.fresh();
        self.push(Instruction::Copy { def, src });
        def
    }

    pub fn phi(&mut self, uses: &[ValueId]) -> ValueId {
        let def = self.fresh();
        self.push(Instruction::Phi {
            def,
            uses: uses.to_vec(),
        });
        def
    }

    pub fn cast(&mut self, src: ValueId, ty: &str) -> ValueId {
        let def = self.fresh();
        self.push(Instruction::CheckCast {
            def,
            src,
            ty: TypeRef::new(ty),
        });
        def
    }

    pub fn get_field(&mut self, base: ValueId, declaring: &str, name: &str) -> ValueId {
        let def = self.fresh();
        self.push(Instruction::GetField {
            def,
            base,
            field: FieldRef::new(declaring, name),
        });
        def
    }

    pub fn put_field(&mut self, base: ValueId, declaring: &str, name: &str, value: ValueId) {
        self.push(Instruction::PutField {
            base,
            field: FieldRef::new(declaring, name),
            value,
        });
    }

    pub fn get_static(&mut self, declaring: &str, name: &str) -> ValueId {
        let def = self.fresh();
        self.push(Instruction::GetStatic {
            def,
            field: FieldRef::new(declaring, name),
        });
        def
    }

    pub fn put_static(&mut self, declaring: &str, name: &str, value: ValueId) {
        self.push(Instruction::PutStatic {
            field: FieldRef::new(declaring, name),
            value,
        });
    }

    pub fn array_load(&mut self, array: ValueId) -> ValueId {
        let def = self.fresh();
        self.push(Instruction::ArrayLoad { def, array });
        def
    }

    pub fn array_store(&mut self, array: ValueId, value: ValueId) {
        self.push(Instruction::ArrayStore { array, value });
    }

    pub fn lexical_read(&mut self, definer: ProcedureId, name: &str) -> ValueId {
        let def = self.fresh();
        self.push(Instruction::LexicalRead {
            def,
            definer,
            name: name.to_string(),
        });
        def
    }

    pub fn lexical_write(&mut self, definer: ProcedureId, name: &str, value: ValueId) {
        self.push(Instruction::LexicalWrite {
            definer,
            name: name.to_string(),
            value,
        });
    }

    /// Emit a call and return its value and exception defs
    pub fn invoke(
        &mut self,
        kind: InvokeKind,
        declaring: &str,
        selector: &str,
        args: &[ValueId],
    ) -> CallResult {
        let def = self.fresh();
        let exception = self.fresh();
        let site = self.next_call_site;
        self.next_call_site += 1;
        self.push(Instruction::Invoke {
            def: Some(def),
            exception: Some(exception),
            site,
            kind,
            target: MethodRef::new(declaring, selector),
            args: args.to_vec(),
        });
        CallResult { def, exception }
    }

    pub fn call_static(&mut self, declaring: &str, selector: &str, args: &[ValueId]) -> ValueId {
        self.invoke(InvokeKind::Static, declaring, selector, args).def
    }

    pub fn call_special(&mut self, declaring: &str, selector: &str, args: &[ValueId]) -> ValueId {
        self.invoke(InvokeKind::Special, declaring, selector, args).def
    }

    pub fn call_virtual(&mut self, declaring: &str, selector: &str, args: &[ValueId]) -> ValueId {
        self.invoke(InvokeKind::Virtual, declaring, selector, args).def
    }

    /// Call through a function value; `function` becomes `args[0]`
    pub fn call_closure(&mut self, function: ValueId, args: &[ValueId]) -> ValueId {
        let mut all = Vec::with_capacity(args.len() + 1);
        all.push(function);
        all.extend_from_slice(args);
        self.invoke(InvokeKind::Closure, "<function>", "call", &all).def
    }

    pub fn ret(&mut self, value: Option<ValueId>) {
        self.push(Instruction::Return { value });
    }

    pub fn throw(&mut self, value: ValueId) {
        self.push(Instruction::Throw { value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_simple_program() {
        let mut b = ProgramBuilder::new();
        b.class("A").field("f");
        let main = b.declare_static("Main", "main()");
        let m = b.declare_method("A", "m()");
        b.define(main, |p| {
            let x = p.new_object("A");
            p.call_virtual("A", "m()", &[x]);
            p.ret(None);
        });
        b.define(m, |p| {
            let this = p.this();
            p.ret(Some(this));
        });
        b.entry_point(main);
        let program = b.build();

        assert_eq!(program.procedures.len(), 2);
        assert_eq!(program.entry_points, vec![main]);
        let class_a = program.class(&TypeRef::new("A")).unwrap();
        assert_eq!(class_a.methods.get("m()"), Some(&m));
        assert_eq!(class_a.fields.len(), 1);

        // values never collide with the receiver
        let main_proc = program.procedure(main).unwrap();
        assert!(matches!(
            main_proc.instructions[0],
            Instruction::New { def: ValueId(1), site: 0, .. }
        ));
        let m_proc = program.procedure(m).unwrap();
        assert_eq!(m_proc.params, vec![ValueId(1)]);
    }

    #[test]
    fn test_call_sites_are_numbered() {
        let mut b = ProgramBuilder::new();
        let main = b.declare_static("Main", "main()");
        b.define(main, |p| {
            p.call_static("Main", "f()", &[]);
            p.call_static("Main", "f()", &[]);
        });
        let program = b.build();
        let sites: Vec<u32> = program.procedures[0]
            .instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Invoke { site, .. } => Some(*site),
                _ => None,
            })
            .collect();
        assert_eq!(sites, vec![0, 1]);
    }
}
