use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::vm::error::VmFault;

/// Identifies a code image for debugger breakpoints and profiler samples.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ScriptId(pub u32);

/// One instruction of the stack machine.
///
/// Stack effects are described top-first. Branch offsets are relative to the instruction
/// following the branch; a target equal to the code length ends the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Op {
    PushConst(u32),
    PushUndefined,
    PushNull,
    PushTrue,
    PushFalse,
    PushRegister(u8),
    /// Copies the top of stack into a register without popping.
    StoreRegister(u8),
    Pop,
    PushDuplicate,
    StackSwap,

    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Increment,
    Decrement,
    Negate,

    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    ShiftRightUnsigned,

    Not,
    Equals,
    StrictEquals,
    Less,
    Greater,
    And,
    Or,

    StringAdd,
    StringEquals,
    StringLength,
    TypeOf,
    /// Pops constructor, object.
    InstanceOf,

    /// Pops name.
    GetVariable,
    /// Pops value, name.
    SetVariable,
    /// Pops value, name.
    DefineLocal,
    /// Pops name.
    DefineLocalUndefined,

    /// Pops name, object.
    GetMember,
    /// Pops value, name, object.
    SetMember,
    /// Pops name, object.
    DeleteMember,

    /// Pops count, then `count` (value, name) pairs.
    InitObject,
    /// Pops count, then `count` elements, first element on top.
    InitArray,
    /// Pops constructor name, argc, args.
    NewObject,
    /// Pops method name, object, argc, args.
    NewMethod,
    /// Pops superclass, subclass.
    Extends,

    /// Pops function name, argc, args.
    CallFunction,
    /// Pops method name, object, argc, args.
    CallMethod,
    DefineFunction(u32),
    /// Pops the return value.
    Return,

    Jump(i32),
    /// Pops condition; branches when truthy.
    If(i32),

    Trace,
    GetTime,
    /// Pops max; pushes an integer in `0..max`.
    RandomNumber,

    Play,
    Stop,
    GotoFrame(u32),
    NextFrame,
    PrevFrame,
    /// Pops depth, instance name, export name.
    AttachMovie,
    /// Pops the clip to remove.
    RemoveClip,
}

impl Op {
    pub fn name(self) -> &'static str {
        match self {
            Op::PushConst(_) => "PushConst",
            Op::PushUndefined => "PushUndefined",
            Op::PushNull => "PushNull",
            Op::PushTrue => "PushTrue",
            Op::PushFalse => "PushFalse",
            Op::PushRegister(_) => "PushRegister",
            Op::StoreRegister(_) => "StoreRegister",
            Op::Pop => "Pop",
            Op::PushDuplicate => "PushDuplicate",
            Op::StackSwap => "StackSwap",
            Op::Add => "Add",
            Op::Subtract => "Subtract",
            Op::Multiply => "Multiply",
            Op::Divide => "Divide",
            Op::Modulo => "Modulo",
            Op::Increment => "Increment",
            Op::Decrement => "Decrement",
            Op::Negate => "Negate",
            Op::BitAnd => "BitAnd",
            Op::BitOr => "BitOr",
            Op::BitXor => "BitXor",
            Op::ShiftLeft => "ShiftLeft",
            Op::ShiftRight => "ShiftRight",
            Op::ShiftRightUnsigned => "ShiftRightUnsigned",
            Op::Not => "Not",
            Op::Equals => "Equals",
            Op::StrictEquals => "StrictEquals",
            Op::Less => "Less",
            Op::Greater => "Greater",
            Op::And => "And",
            Op::Or => "Or",
            Op::StringAdd => "StringAdd",
            Op::StringEquals => "StringEquals",
            Op::StringLength => "StringLength",
            Op::TypeOf => "TypeOf",
            Op::InstanceOf => "InstanceOf",
            Op::GetVariable => "GetVariable",
            Op::SetVariable => "SetVariable",
            Op::DefineLocal => "DefineLocal",
            Op::DefineLocalUndefined => "DefineLocalUndefined",
            Op::GetMember => "GetMember",
            Op::SetMember => "SetMember",
            Op::DeleteMember => "DeleteMember",
            Op::InitObject => "InitObject",
            Op::InitArray => "InitArray",
            Op::NewObject => "NewObject",
            Op::NewMethod => "NewMethod",
            Op::Extends => "Extends",
            Op::CallFunction => "CallFunction",
            Op::CallMethod => "CallMethod",
            Op::DefineFunction(_) => "DefineFunction",
            Op::Return => "Return",
            Op::Jump(_) => "Jump",
            Op::If(_) => "If",
            Op::Trace => "Trace",
            Op::GetTime => "GetTime",
            Op::RandomNumber => "RandomNumber",
            Op::Play => "Play",
            Op::Stop => "Stop",
            Op::GotoFrame(_) => "GotoFrame",
            Op::NextFrame => "NextFrame",
            Op::PrevFrame => "PrevFrame",
            Op::AttachMovie => "AttachMovie",
            Op::RemoveClip => "RemoveClip",
        }
    }

    /// Operands the op pops before any argument-count driven pops.
    pub fn min_stack(self) -> usize {
        match self {
            Op::PushConst(_)
            | Op::PushUndefined
            | Op::PushNull
            | Op::PushTrue
            | Op::PushFalse
            | Op::PushRegister(_)
            | Op::DefineFunction(_)
            | Op::Jump(_)
            | Op::GetTime
            | Op::Play
            | Op::Stop
            | Op::GotoFrame(_)
            | Op::NextFrame
            | Op::PrevFrame => 0,

            Op::StoreRegister(_)
            | Op::Pop
            | Op::PushDuplicate
            | Op::Increment
            | Op::Decrement
            | Op::Negate
            | Op::Not
            | Op::StringLength
            | Op::TypeOf
            | Op::GetVariable
            | Op::DefineLocalUndefined
            | Op::InitObject
            | Op::InitArray
            | Op::Return
            | Op::If(_)
            | Op::Trace
            | Op::RandomNumber
            | Op::RemoveClip => 1,

            Op::StackSwap
            | Op::Add
            | Op::Subtract
            | Op::Multiply
            | Op::Divide
            | Op::Modulo
            | Op::BitAnd
            | Op::BitOr
            | Op::BitXor
            | Op::ShiftLeft
            | Op::ShiftRight
            | Op::ShiftRightUnsigned
            | Op::Equals
            | Op::StrictEquals
            | Op::Less
            | Op::Greater
            | Op::And
            | Op::Or
            | Op::StringAdd
            | Op::StringEquals
            | Op::InstanceOf
            | Op::SetVariable
            | Op::DefineLocal
            | Op::GetMember
            | Op::DeleteMember
            | Op::NewObject
            | Op::Extends
            | Op::CallFunction => 2,

            Op::SetMember | Op::NewMethod | Op::CallMethod | Op::AttachMovie => 3,
        }
    }

    fn branch_offset(self) -> Option<i32> {
        match self {
            Op::Jump(o) | Op::If(o) => Some(o),
            _ => None,
        }
    }
}

/// Literal table entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Const {
    Number(f64),
    String(Rc<str>),
}

impl Const {
    /// Bitwise identity, so `-0` and `0` stay distinct entries.
    fn same_literal(&self, other: &Const) -> bool {
        match (self, other) {
            (Const::Number(a), Const::Number(b)) => a.to_bits() == b.to_bits(),
            (Const::String(a), Const::String(b)) => a == b,
            _ => false,
        }
    }
}

/// Declared parameter of a function prototype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    /// Register preloaded with this argument, if any.
    #[serde(default)]
    pub register: Option<u8>,
    /// Bind the argument as a named local.
    #[serde(default = "default_true")]
    pub hoist: bool,
}

/// Compiled body of a script function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionProto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    pub body: Rc<CodeImage>,
}

impl FunctionProto {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Executable instruction stream with its constant table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeImage {
    #[serde(default)]
    pub script_id: ScriptId,
    #[serde(default)]
    pub name: String,
    pub ops: Vec<Op>,
    #[serde(default)]
    pub consts: Vec<Const>,
    /// Source line per op. May be empty or shorter than `ops`.
    #[serde(default)]
    pub lines: Vec<u32>,
    #[serde(default = "default_register_count")]
    pub register_count: u8,
    #[serde(default)]
    pub functions: Vec<Rc<FunctionProto>>,
}

fn default_register_count() -> u8 {
    4
}

fn default_true() -> bool {
    true
}

impl CodeImage {
    pub fn line_at(&self, pc: usize) -> Option<u32> {
        self.lines.get(pc).copied()
    }

    /// Check every static reference: branch targets, constants, registers and nested functions.
    pub fn validate(&self) -> Result<(), VmFault> {
        let len = self.ops.len();
        for (pc, op) in self.ops.iter().enumerate() {
            if let Some(offset) = op.branch_offset() {
                let target = pc as i64 + 1 + i64::from(offset);
                if target < 0 || target > len as i64 {
                    return Err(VmFault::InvalidJump { target, len });
                }
            }
            match *op {
                Op::PushConst(i) if i as usize >= self.consts.len() => {
                    return Err(VmFault::InvalidConstant(i));
                }
                Op::PushRegister(r) | Op::StoreRegister(r) if r >= self.register_count => {
                    return Err(VmFault::InvalidRegister(r));
                }
                Op::DefineFunction(i) if i as usize >= self.functions.len() => {
                    return Err(VmFault::InvalidFunction(i));
                }
                _ => {}
            }
        }
        for f in &self.functions {
            for p in &f.params {
                if let Some(r) = p.register
                    && r >= f.body.register_count
                {
                    return Err(VmFault::InvalidRegister(r));
                }
            }
            f.body.validate()?;
        }
        Ok(())
    }
}

/// Incremental [`CodeImage`] construction, mainly for embedders and tests.
#[derive(Debug, Default)]
pub struct CodeImageBuilder {
    script_id: ScriptId,
    name: String,
    ops: Vec<Op>,
    consts: Vec<Const>,
    lines: Vec<u32>,
    register_count: Option<u8>,
    functions: Vec<Rc<FunctionProto>>,
    line: u32,
}

impl CodeImageBuilder {
    pub fn new(script_id: u32) -> Self {
        Self {
            script_id: ScriptId(script_id),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn registers(mut self, n: u8) -> Self {
        self.register_count = Some(n);
        self
    }

    /// Subsequent ops are attributed to `line`.
    pub fn line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn op(mut self, op: Op) -> Self {
        self.ops.push(op);
        self.lines.push(self.line);
        self
    }

    pub fn ops(mut self, ops: impl IntoIterator<Item = Op>) -> Self {
        for op in ops {
            self = self.op(op);
        }
        self
    }

    /// Push a string literal, deduplicating the constant table.
    pub fn push_str(self, s: &str) -> Self {
        let idx = self.const_index(Const::String(Rc::from(s)));
        self.with_const(idx)
    }

    pub fn push_num(self, n: f64) -> Self {
        let idx = self.const_index(Const::Number(n));
        self.with_const(idx)
    }

    pub fn function(mut self, proto: FunctionProto) -> Self {
        self.functions.push(Rc::new(proto));
        self
    }

    pub fn build(self) -> CodeImage {
        CodeImage {
            script_id: self.script_id,
            name: self.name,
            ops: self.ops,
            consts: self.consts,
            lines: self.lines,
            register_count: self.register_count.unwrap_or_else(default_register_count),
            functions: self.functions,
        }
    }

    fn const_index(&self, c: Const) -> Result<u32, Const> {
        match self.consts.iter().position(|x| x.same_literal(&c)) {
            Some(i) => Ok(i as u32),
            None => Err(c),
        }
    }

    fn with_const(mut self, idx: Result<u32, Const>) -> Self {
        let i = match idx {
            Ok(i) => i,
            Err(c) => {
                self.consts.push(c);
                (self.consts.len() - 1) as u32
            }
        };
        self.op(Op::PushConst(i))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/vm/bytecode.rs"]
mod tests;
