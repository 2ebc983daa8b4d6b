use std::collections::HashMap;
use std::rc::Rc;

use crate::vm::bytecode::CodeImage;
use crate::vm::error::VmFault;
use crate::vm::heap::ObjectRef;
use crate::vm::strings::NameId;
use crate::vm::value::Value;

/// Lifecycle of one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Ready,
    Running,
    /// Control is inside a nested call made by this frame.
    Suspended,
    Halted,
}

/// Activation record: code pointer, registers, locals and evaluation stack.
#[derive(Debug)]
pub struct Frame {
    pub(crate) image: Rc<CodeImage>,
    pub(crate) pc: usize,
    pub(crate) registers: Vec<Value>,
    pub(crate) locals: HashMap<NameId, Value>,
    pub(crate) stack: Vec<Value>,
    /// Stack height below which a falling-off-the-end result is not taken.
    pub(crate) base: usize,
    pub(crate) function: Option<ObjectRef>,
    pub(crate) this: Value,
    /// Timeline object that receives non-local variable writes.
    pub(crate) scope: Option<ObjectRef>,
    pub(crate) is_function: bool,
    pub(crate) state: FrameState,
}

impl Frame {
    fn blank(image: Rc<CodeImage>) -> Self {
        Self {
            image,
            pc: 0,
            registers: Vec::new(),
            locals: HashMap::new(),
            stack: Vec::new(),
            base: 0,
            function: None,
            this: Value::Undefined,
            scope: None,
            is_function: false,
            state: FrameState::Ready,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn local(&self, name: NameId) -> Option<&Value> {
        self.locals.get(&name)
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn push(&mut self, v: Value) {
        self.stack.push(v);
    }

    /// Pop after the op's `min_stack` was verified; an empty stack yields `undefined`.
    pub(crate) fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or_default()
    }

    pub(crate) fn require(&self, op: &'static str, needed: usize) -> Result<(), VmFault> {
        if self.stack.len() < needed {
            return Err(VmFault::StackUnderflow {
                op,
                needed,
                available: self.stack.len(),
            });
        }
        Ok(())
    }

    /// Pop a count operand followed by that many values, first popped first.
    pub(crate) fn pop_args(&mut self, op: &'static str) -> Result<Vec<Value>, VmFault> {
        let n = self.pop().to_number();
        let n = if n.is_finite() && n > 0.0 { n as usize } else { 0 };
        self.require(op, n)?;
        let mut args = Vec::with_capacity(n);
        for _ in 0..n {
            args.push(self.pop());
        }
        Ok(args)
    }

    /// Values a garbage collector would need to see if this frame were live.
    pub fn roots(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.registers
            .iter()
            .chain(self.locals.values())
            .chain(self.stack.iter())
            .chain(std::iter::once(&self.this))
            .filter_map(Value::strong_ref)
            .chain(self.function)
            .chain(self.scope)
    }
}

/// Recycles frame buffers so calls do not allocate stacks and maps each time.
#[derive(Debug, Default)]
pub struct FramePool {
    free: Vec<Frame>,
    pub(crate) acquired: u64,
    pub(crate) reused: u64,
}

impl FramePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, image: Rc<CodeImage>) -> Frame {
        self.acquired += 1;
        let registers = usize::from(image.register_count);
        let mut frame = match self.free.pop() {
            Some(mut f) => {
                self.reused += 1;
                f.image = image;
                f
            }
            None => Frame::blank(image),
        };
        frame.registers.resize(registers, Value::Undefined);
        frame
    }

    /// Return a frame; its contents are cleared and its buffers kept.
    pub fn release(&mut self, mut frame: Frame) {
        frame.pc = 0;
        frame.registers.clear();
        frame.locals.clear();
        frame.stack.clear();
        frame.base = 0;
        frame.function = None;
        frame.this = Value::Undefined;
        frame.scope = None;
        frame.is_function = false;
        frame.state = FrameState::Ready;
        self.free.push(frame);
    }

    pub fn idle(&self) -> usize {
        self.free.len()
    }
}
