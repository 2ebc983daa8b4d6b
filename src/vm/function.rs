use std::rc::Rc;

use crate::vm::bytecode::FunctionProto;
use crate::vm::context::ExecutionContext;
use crate::vm::error::VmFault;
use crate::vm::frame::FrameState;
use crate::vm::heap::{ObjectRef, Trace, Visitor};
use crate::vm::interp::run_frame;
use crate::vm::strings::{NameId, names};
use crate::vm::value::Value;

/// Host function: `(context, this, args) -> result`.
pub type NativeFn = fn(&mut ExecutionContext, &Value, &[Value]) -> Result<Value, VmFault>;

/// Native trampoline, optionally bound to a fixed receiver.
#[derive(Debug, Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub func: NativeFn,
    pub receiver: Option<Value>,
}

/// Script function plus the locals it closed over.
#[derive(Debug, Clone)]
pub struct Closure {
    pub proto: Rc<FunctionProto>,
    /// Snapshot of the defining frame's locals.
    pub captured: Vec<(NameId, Value)>,
    /// Timeline object of the defining frame.
    pub scope: Option<ObjectRef>,
}

#[derive(Debug, Clone)]
pub enum Function {
    Closure(Closure),
    Native(NativeFunction),
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Closure(c) => &c.proto.name,
            Function::Native(n) => n.name,
        }
    }

    /// Declared parameter count. Natives report 0.
    pub fn arity(&self) -> usize {
        match self {
            Function::Closure(c) => c.proto.arity(),
            Function::Native(_) => 0,
        }
    }
}

impl Trace for Function {
    fn trace(&self, visitor: &mut dyn Visitor) {
        match self {
            Function::Closure(c) => {
                for (_, v) in &c.captured {
                    visitor.visit_value(v);
                }
                if let Some(s) = c.scope {
                    visitor.visit(s);
                }
            }
            Function::Native(n) => {
                if let Some(r) = &n.receiver {
                    visitor.visit_value(r);
                }
            }
        }
    }

    fn dereference(&mut self) {
        match self {
            Function::Closure(c) => {
                c.captured.clear();
                c.scope = None;
            }
            Function::Native(n) => n.receiver = None,
        }
    }
}

impl Closure {
    /// Run the closure in a pooled frame.
    ///
    /// Missing arguments are `undefined`. Without an explicit `super`, the receiver's
    /// `__proto__.__proto__` is bound, or `undefined` for non-object receivers.
    pub(crate) fn invoke(
        &self,
        ctx: &mut ExecutionContext,
        callee: Option<ObjectRef>,
        this: Value,
        super_obj: Option<Value>,
        args: &[Value],
    ) -> Result<Value, VmFault> {
        let limit = ctx.opts().max_call_depth;
        if ctx.call_depth >= limit {
            return Err(VmFault::CallDepthExceeded(limit));
        }

        let proto = &self.proto;
        let mut frame = ctx.frames.acquire(Rc::clone(&proto.body));
        frame.is_function = true;
        frame.function = callee;
        frame.scope = self.scope;
        frame.this = this.clone();
        frame.locals.extend(self.captured.iter().cloned());

        let arity = proto.arity().max(args.len());
        let arg_at = |i: usize| args.get(i).cloned().unwrap_or_default();
        for i in (0..arity).rev() {
            frame.push(arg_at(i));
        }
        frame.base = frame.stack.len();

        for (i, param) in proto.params.iter().enumerate() {
            if let Some(r) = param.register
                && let Some(slot) = frame.registers.get_mut(usize::from(r))
            {
                *slot = arg_at(i);
            }
            if param.hoist {
                let name = ctx.intern(&param.name);
                frame.locals.insert(name, arg_at(i));
            }
        }

        let super_value = match super_obj {
            Some(s) => s,
            None => ctx.default_super(&this),
        };
        let global = ctx.global();
        let arguments = ctx.new_array(args.to_vec());
        frame.locals.insert(names::THIS, this);
        frame.locals.insert(names::SUPER, super_value);
        frame.locals.insert(names::GLOBAL, Value::Object(global));
        frame.locals.insert(names::ARGUMENTS, Value::Object(arguments));

        let script = proto.body.script_id;
        if ctx.call_depth == 0 {
            ctx.fault_script = None;
        }
        ctx.profiler.enter(script, &proto.name);
        ctx.debugger.enter(script, &proto.name);
        ctx.call_depth += 1;
        let result = run_frame(ctx, &mut frame);
        ctx.call_depth -= 1;
        ctx.debugger.exit(script, &proto.name);
        ctx.profiler.exit();
        debug_assert_eq!(frame.state, FrameState::Halted);
        ctx.frames.release(frame);
        result
    }
}

#[cfg(test)]
#[path = "../../tests/unit/vm/function.rs"]
mod tests;
