use std::rc::Rc;

use crate::foundation::core::{Depth, FrameIndex};
use crate::vm::bytecode::{CodeImage, Const, Op};
use crate::vm::context::{ExecutionContext, TimelineAction};
use crate::vm::debug::{DebugAction, StopLocation};
use crate::vm::error::VmFault;
use crate::vm::frame::{Frame, FrameState};
use crate::vm::function::Closure;
use crate::vm::heap::ObjectRef;
use crate::vm::host::Warning;
use crate::vm::object::SetOutcome;
use crate::vm::strings::{NameId, names};
use crate::vm::value::{Value, to_int32};

enum Flow {
    Next,
    Return(Value),
}

/// Execute `frame` until it returns, falls off the end, or faults.
///
/// Falling off the end yields the top of stack if anything was pushed above the arguments,
/// otherwise `undefined`.
pub(crate) fn run_frame(ctx: &mut ExecutionContext, frame: &mut Frame) -> Result<Value, VmFault> {
    frame.state = FrameState::Running;
    let result = dispatch(ctx, frame);
    frame.state = FrameState::Halted;
    if let Err(fault) = &result {
        ctx.fault_script.get_or_insert(frame.image.script_id.0);
        tracing::debug!(
            script = frame.image.script_id.0,
            pc = frame.pc,
            %fault,
            "frame halted"
        );
    }
    result
}

fn dispatch(ctx: &mut ExecutionContext, frame: &mut Frame) -> Result<Value, VmFault> {
    let image = Rc::clone(&frame.image);
    let len = image.ops.len();
    while frame.pc < len {
        let pc = frame.pc;
        let op = image.ops[pc];
        if ctx.debugger.is_active() {
            let at = StopLocation {
                script: image.script_id,
                line: image.line_at(pc).unwrap_or(0),
                pc,
            };
            if ctx.debugger.check(at) == DebugAction::Break {
                return Err(VmFault::DebuggerBreak {
                    script: at.script.0,
                    line: at.line,
                });
            }
        }
        frame.require(op.name(), op.min_stack())?;
        frame.pc = pc + 1;
        tracing::trace!(pc, op = op.name(), depth = frame.stack.len(), "step");
        if let Flow::Return(v) = step(ctx, frame, &image, op)? {
            return Ok(v);
        }
    }
    Ok(if frame.stack.len() > frame.base {
        frame.pop()
    } else {
        Value::Undefined
    })
}

fn step(
    ctx: &mut ExecutionContext,
    frame: &mut Frame,
    image: &CodeImage,
    op: Op,
) -> Result<Flow, VmFault> {
    let version = ctx.swf_version();
    match op {
        Op::PushConst(i) => {
            let v = match image.consts.get(i as usize) {
                Some(Const::Number(n)) => Value::Number(*n),
                Some(Const::String(s)) => Value::String(Rc::clone(s)),
                None => return Err(VmFault::InvalidConstant(i)),
            };
            frame.push(v);
        }
        Op::PushUndefined => frame.push(Value::Undefined),
        Op::PushNull => frame.push(Value::Null),
        Op::PushTrue => frame.push(Value::Bool(true)),
        Op::PushFalse => frame.push(Value::Bool(false)),
        Op::PushRegister(r) => {
            let v = frame
                .registers
                .get(usize::from(r))
                .cloned()
                .ok_or(VmFault::InvalidRegister(r))?;
            frame.push(v);
        }
        Op::StoreRegister(r) => {
            let top = frame.stack.last().cloned().unwrap_or_default();
            let slot = frame
                .registers
                .get_mut(usize::from(r))
                .ok_or(VmFault::InvalidRegister(r))?;
            *slot = top;
        }
        Op::Pop => {
            frame.pop();
        }
        Op::PushDuplicate => {
            let top = frame.stack.last().cloned().unwrap_or_default();
            frame.push(top);
        }
        Op::StackSwap => {
            let n = frame.stack.len();
            frame.stack.swap(n - 1, n - 2);
        }

        Op::Add => {
            let b = frame.pop();
            let a = frame.pop();
            let v = if version >= 5
                && (matches!(a, Value::String(_)) || matches!(b, Value::String(_)))
            {
                concat(ctx, &a, &b)
            } else {
                Value::Number(ctx.num(&a) + ctx.num(&b))
            };
            frame.push(v);
        }
        Op::Subtract => arith(ctx, frame, |a, b| a - b),
        Op::Multiply => arith(ctx, frame, |a, b| a * b),
        Op::Divide => {
            let b = ctx.num(&frame.pop());
            let a = ctx.num(&frame.pop());
            if b == 0.0 && version < 5 {
                frame.push(Value::string("#ERROR#"));
            } else {
                frame.push(Value::Number(a / b));
            }
        }
        Op::Modulo => arith(ctx, frame, |a, b| a % b),
        Op::Increment => unary(ctx, frame, |a| a + 1.0),
        Op::Decrement => unary(ctx, frame, |a| a - 1.0),
        Op::Negate => unary(ctx, frame, |a| -a),

        Op::BitAnd => bitwise(ctx, frame, |a, b| f64::from(a & b)),
        Op::BitOr => bitwise(ctx, frame, |a, b| f64::from(a | b)),
        Op::BitXor => bitwise(ctx, frame, |a, b| f64::from(a ^ b)),
        Op::ShiftLeft => bitwise(ctx, frame, |a, b| f64::from(a.wrapping_shl(b as u32 & 31))),
        Op::ShiftRight => bitwise(ctx, frame, |a, b| f64::from(a.wrapping_shr(b as u32 & 31))),
        Op::ShiftRightUnsigned => {
            bitwise(ctx, frame, |a, b| f64::from((a as u32) >> (b as u32 & 31)))
        }

        Op::Not => {
            let a = frame.pop();
            frame.push(Value::legacy_bool(!a.to_boolean(), version));
        }
        Op::And | Op::Or => {
            let b = frame.pop().to_boolean();
            let a = frame.pop().to_boolean();
            let r = if op == Op::And { a && b } else { a || b };
            frame.push(Value::legacy_bool(r, version));
        }
        Op::Equals => {
            let b = frame.pop();
            let a = frame.pop();
            let eq = if version >= 5 {
                a.loose_equals(&b)
            } else {
                ctx.num(&a) == ctx.num(&b)
            };
            frame.push(Value::legacy_bool(eq, version));
        }
        Op::StrictEquals => {
            let b = frame.pop();
            let a = frame.pop();
            frame.push(Value::Bool(a.strict_equals(&b)));
        }
        Op::Less | Op::Greater => {
            let b = frame.pop();
            let a = frame.pop();
            let (a, b) = if op == Op::Greater { (b, a) } else { (a, b) };
            let v = compare_less(ctx, &a, &b);
            frame.push(v);
        }

        Op::StringAdd => {
            let b = frame.pop();
            let a = frame.pop();
            frame.push(concat(ctx, &a, &b));
        }
        Op::StringEquals => {
            let b = frame.pop();
            let a = frame.pop();
            let eq = ctx.coerce_string(&a) == ctx.coerce_string(&b);
            frame.push(Value::legacy_bool(eq, version));
        }
        Op::StringLength => {
            let a = frame.pop();
            let n = ctx.coerce_string(&a).chars().count();
            frame.push(Value::Number(n as f64));
        }
        Op::TypeOf => {
            let a = frame.pop();
            frame.push(Value::string(ctx.type_of(&a)));
        }
        Op::InstanceOf => {
            let ctor = frame.pop();
            let obj = frame.pop();
            frame.push(Value::Bool(ctx.instance_of(&obj, &ctor)));
        }

        Op::GetVariable => {
            let name = frame.pop();
            let id = ctx.intern_value(&name);
            let v = get_variable(ctx, frame, id)?;
            frame.push(v);
        }
        Op::SetVariable => {
            let value = frame.pop();
            let name = frame.pop();
            let id = ctx.intern_value(&name);
            set_variable(ctx, frame, id, value)?;
        }
        Op::DefineLocal => {
            let value = frame.pop();
            let name = frame.pop();
            let id = ctx.intern_value(&name);
            define_local(ctx, frame, id, value)?;
        }
        Op::DefineLocalUndefined => {
            let name = frame.pop();
            let id = ctx.intern_value(&name);
            if frame.is_function {
                frame.locals.entry(id).or_default();
            } else {
                let target = frame.scope.unwrap_or_else(|| ctx.global());
                if !ctx.has_property(target, id) {
                    store(ctx, target, id, Value::Undefined)?;
                }
            }
        }

        Op::GetMember => {
            let name = frame.pop();
            let obj = frame.pop();
            let v = ctx.get_property(&obj, &name)?;
            frame.push(v);
        }
        Op::SetMember => {
            let value = frame.pop();
            let name = frame.pop();
            let obj = frame.pop();
            if ctx.set_property(&obj, &name, value)? == SetOutcome::ReadOnly {
                let name = ctx.coerce_string(&name).to_string();
                ctx.host().warn(&Warning::ReadOnlyWrite(name));
            }
        }
        Op::DeleteMember => {
            let name = frame.pop();
            let obj = frame.pop();
            let removed = ctx.delete_property(&obj, &name);
            frame.push(Value::Bool(removed));
        }

        Op::InitObject => {
            let n = count(&frame.pop());
            frame.require("InitObject", n.saturating_mul(2))?;
            let obj = ctx.new_object();
            for _ in 0..n {
                let value = frame.pop();
                let name = frame.pop();
                let id = ctx.intern_value(&name);
                ctx.set_member(obj, id, value)?;
            }
            frame.push(Value::Object(obj));
        }
        Op::InitArray => {
            let items = frame.pop_args("InitArray")?;
            let arr = ctx.new_array(items);
            frame.push(Value::Object(arr));
        }
        Op::NewObject => {
            let name = frame.pop();
            let args = frame.pop_args("NewObject")?;
            let id = ctx.intern_value(&name);
            let ctor = get_variable(ctx, frame, id)?;
            let v = nested(frame, || ctx.construct(&ctor, &args))?;
            frame.push(v);
        }
        Op::NewMethod => {
            let method = frame.pop();
            let obj = frame.pop();
            let args = frame.pop_args("NewMethod")?;
            let ctor = if is_blank_name(&method) {
                obj
            } else {
                ctx.get_property(&obj, &method)?
            };
            let v = nested(frame, || ctx.construct(&ctor, &args))?;
            frame.push(v);
        }
        Op::Extends => {
            let superclass = frame.pop();
            let subclass = frame.pop();
            ctx.extends(&subclass, &superclass)?;
        }

        Op::CallFunction => {
            let name = frame.pop();
            let args = frame.pop_args("CallFunction")?;
            let id = ctx.intern_value(&name);
            let func = get_variable(ctx, frame, id)?;
            let v = nested(frame, || ctx.call(&func, Value::Undefined, &args))?;
            frame.push(v);
        }
        Op::CallMethod => {
            let method = frame.pop();
            let obj = frame.pop();
            let args = frame.pop_args("CallMethod")?;
            let v = if is_blank_name(&method) {
                nested(frame, || ctx.call(&obj, Value::Undefined, &args))?
            } else {
                let func = ctx.get_property(&obj, &method)?;
                let this = ctx.upgrade(&obj);
                nested(frame, || ctx.call(&func, this, &args))?
            };
            frame.push(v);
        }
        Op::DefineFunction(i) => {
            let proto = image
                .functions
                .get(i as usize)
                .cloned()
                .ok_or(VmFault::InvalidFunction(i))?;
            let captured = frame
                .locals
                .iter()
                .map(|(k, v)| (*k, v.clone()))
                .collect();
            let name = proto.name.clone();
            let f = ctx.new_closure(Closure {
                proto,
                captured,
                scope: frame.scope,
            });
            if name.is_empty() {
                frame.push(Value::Object(f));
            } else {
                let id = ctx.intern(&name);
                define_local(ctx, frame, id, Value::Object(f))?;
            }
        }
        Op::Return => return Ok(Flow::Return(frame.pop())),

        Op::Jump(offset) => jump(frame, offset, image.ops.len())?,
        Op::If(offset) => {
            if frame.pop().to_boolean() {
                jump(frame, offset, image.ops.len())?;
            }
        }

        Op::Trace => {
            let v = frame.pop();
            // `undefined` traces by name in every version.
            let msg = if v.is_undefined() {
                Rc::from("undefined")
            } else {
                ctx.coerce_string(&v)
            };
            ctx.host().trace(&msg);
        }
        Op::GetTime => frame.push(Value::Number(ctx.elapsed_ms())),
        Op::RandomNumber => {
            let max = ctx.num(&frame.pop());
            frame.push(Value::Number(ctx.random_below(max)));
        }

        Op::Play => timeline(ctx, frame, TimelineAction::Play),
        Op::Stop => timeline(ctx, frame, TimelineAction::Stop),
        Op::GotoFrame(f) => timeline(ctx, frame, TimelineAction::Goto(FrameIndex(f))),
        Op::NextFrame => timeline(ctx, frame, TimelineAction::Next),
        Op::PrevFrame => timeline(ctx, frame, TimelineAction::Prev),
        Op::AttachMovie => {
            let depth = ctx.num(&frame.pop());
            let name = frame.pop();
            let export = frame.pop();
            let action = TimelineAction::Attach {
                export: ctx.coerce_string(&export).to_string(),
                name: ctx.coerce_string(&name).to_string(),
                depth: Depth(to_int32(depth)),
            };
            timeline(ctx, frame, action);
        }
        Op::RemoveClip => {
            let clip = frame.pop();
            match clip.as_object().and_then(|r| ctx.host_of(r)) {
                Some(target) => ctx.push_command(Some(target), TimelineAction::Remove),
                None => ctx.host().warn(&Warning::TargetNotFound),
            }
        }
    }
    Ok(Flow::Next)
}

/// Mark the frame suspended around a nested call.
fn nested<T>(
    frame: &mut Frame,
    call: impl FnOnce() -> Result<T, VmFault>,
) -> Result<T, VmFault> {
    frame.state = FrameState::Suspended;
    let r = call();
    frame.state = FrameState::Running;
    r
}

fn jump(frame: &mut Frame, offset: i32, len: usize) -> Result<(), VmFault> {
    let target = frame.pc as i64 + i64::from(offset);
    if target < 0 || target > len as i64 {
        return Err(VmFault::InvalidJump { target, len });
    }
    frame.pc = target as usize;
    Ok(())
}

fn arith(ctx: &ExecutionContext, frame: &mut Frame, f: impl Fn(f64, f64) -> f64) {
    let b = ctx.num(&frame.pop());
    let a = ctx.num(&frame.pop());
    frame.push(Value::Number(f(a, b)));
}

fn unary(ctx: &ExecutionContext, frame: &mut Frame, f: impl Fn(f64) -> f64) {
    let a = ctx.num(&frame.pop());
    frame.push(Value::Number(f(a)));
}

fn bitwise(ctx: &ExecutionContext, frame: &mut Frame, f: impl Fn(i32, i32) -> f64) {
    let b = to_int32(ctx.num(&frame.pop()));
    let a = to_int32(ctx.num(&frame.pop()));
    frame.push(Value::Number(f(a, b)));
}

fn concat(ctx: &ExecutionContext, a: &Value, b: &Value) -> Value {
    let mut s = ctx.coerce_string(a).to_string();
    s.push_str(&ctx.coerce_string(b));
    Value::string(s)
}

fn compare_less(ctx: &ExecutionContext, a: &Value, b: &Value) -> Value {
    let version = ctx.swf_version();
    if let (Value::String(x), Value::String(y)) = (a, b)
        && version >= 5
    {
        return Value::Bool(x < y);
    }
    let (x, y) = (ctx.num(a), ctx.num(b));
    if (x.is_nan() || y.is_nan()) && version >= 5 {
        return Value::Undefined;
    }
    Value::legacy_bool(x < y, version)
}

fn count(v: &Value) -> usize {
    let n = v.to_number();
    if n.is_finite() && n > 0.0 { n as usize } else { 0 }
}

fn is_blank_name(v: &Value) -> bool {
    match v {
        Value::Undefined => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn timeline(ctx: &mut ExecutionContext, frame: &Frame, action: TimelineAction) {
    let target = frame
        .scope
        .or_else(|| frame.this.as_object())
        .and_then(|r| ctx.host_of(r));
    ctx.push_command(target, action);
}

/// Resolve a name: locals, then the timeline object and its prototypes, then globals.
fn get_variable(
    ctx: &mut ExecutionContext,
    frame: &Frame,
    id: NameId,
) -> Result<Value, VmFault> {
    if let Some(v) = frame.locals.get(&id) {
        return Ok(ctx.upgrade(v));
    }
    match id {
        names::THIS => return Ok(frame.this.clone()),
        names::GLOBAL => return Ok(Value::Object(ctx.global())),
        names::ROOT => return Ok(ctx.root_movie().map_or(Value::Undefined, Value::Object)),
        _ => {}
    }
    if let Some(scope) = frame.scope
        && ctx.has_property(scope, id)
    {
        return ctx.get_member(scope, id);
    }
    let global = ctx.global();
    if ctx.has_property(global, id) {
        return ctx.get_member(global, id);
    }
    Ok(Value::Undefined)
}

fn set_variable(
    ctx: &mut ExecutionContext,
    frame: &mut Frame,
    id: NameId,
    value: Value,
) -> Result<(), VmFault> {
    if let Some(slot) = frame.locals.get_mut(&id) {
        *slot = value;
        return Ok(());
    }
    let global = ctx.global();
    let target = match frame.scope {
        Some(scope) if ctx.has_property(scope, id) || !ctx.has_property(global, id) => scope,
        _ => global,
    };
    store(ctx, target, id, value)
}

fn define_local(
    ctx: &mut ExecutionContext,
    frame: &mut Frame,
    id: NameId,
    value: Value,
) -> Result<(), VmFault> {
    if frame.is_function {
        frame.locals.insert(id, value);
        return Ok(());
    }
    let target = frame.scope.unwrap_or_else(|| ctx.global());
    store(ctx, target, id, value)
}

fn store(
    ctx: &mut ExecutionContext,
    target: ObjectRef,
    id: NameId,
    value: Value,
) -> Result<(), VmFault> {
    if ctx.set_member(target, id, value)? == SetOutcome::ReadOnly {
        let name = ctx.resolve(id).unwrap_or_default().to_string();
        ctx.host().warn(&Warning::ReadOnlyWrite(name));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/vm/interp.rs"]
mod tests;
