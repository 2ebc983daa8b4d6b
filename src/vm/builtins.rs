//! Core constructors and prototype methods installed into every context.

use crate::vm::context::{ExecutionContext, MAX_ARRAY_LEN};
use crate::vm::error::VmFault;
use crate::vm::heap::ObjectRef;
use crate::vm::object::Object;
use crate::vm::strings::names;
use crate::vm::value::Value;

pub(crate) fn install(ctx: &mut ExecutionContext) {
    let object_proto = ctx.object_proto();
    let array_proto = ctx.array_proto();
    let function_proto = ctx.function_proto();

    ctx.define_native(object_proto, "toString", object_to_string);
    ctx.define_native(object_proto, "valueOf", object_value_of);
    ctx.define_native(array_proto, "push", array_push);
    ctx.define_native(array_proto, "pop", array_pop);
    ctx.define_native(array_proto, "join", array_join);
    ctx.define_native(array_proto, "toString", object_to_string);
    ctx.define_native(function_proto, "call", function_call);
    ctx.define_native(function_proto, "apply", function_apply);

    let object_ctor = ctx.new_native_function("Object", object_constructor);
    link_constructor(ctx, object_ctor, object_proto);
    ctx.set_global("Object", Value::Object(object_ctor));

    let array_ctor = ctx.new_native_function("Array", array_constructor);
    link_constructor(ctx, array_ctor, array_proto);
    ctx.set_global("Array", Value::Object(array_ctor));

    let function_ctor = ctx.new_native_function("Function", function_constructor);
    link_constructor(ctx, function_ctor, function_proto);
    ctx.set_global("Function", Value::Object(function_ctor));
}

fn link_constructor(ctx: &mut ExecutionContext, ctor: ObjectRef, proto: ObjectRef) {
    let heap = ctx.heap_mut();
    if let Some(c) = heap.get_mut(ctor) {
        c.set_own(names::PROTOTYPE, Value::Object(proto));
    }
    if let Some(p) = heap.get_mut(proto) {
        p.set_own(names::CONSTRUCTOR, Value::Object(ctor));
    }
}

fn this_array<'a>(ctx: &'a mut ExecutionContext, this: &Value) -> Option<&'a mut Vec<Value>> {
    let r = this.as_object()?;
    ctx.heap_mut().get_mut(r).and_then(Object::as_array_mut)
}

fn object_constructor(
    ctx: &mut ExecutionContext,
    this: &Value,
    args: &[Value],
) -> Result<Value, VmFault> {
    if let Some(v @ Value::Object(_)) = args.first() {
        return Ok(v.clone());
    }
    match this {
        Value::Object(_) => Ok(this.clone()),
        _ => Ok(Value::Object(ctx.new_object())),
    }
}

fn object_to_string(
    ctx: &mut ExecutionContext,
    this: &Value,
    _args: &[Value],
) -> Result<Value, VmFault> {
    Ok(Value::String(ctx.coerce_string(this)))
}

fn object_value_of(
    _ctx: &mut ExecutionContext,
    this: &Value,
    _args: &[Value],
) -> Result<Value, VmFault> {
    Ok(this.clone())
}

/// `Array(n)` preallocates `n` holes; any other argument list becomes the elements.
fn array_constructor(
    ctx: &mut ExecutionContext,
    _this: &Value,
    args: &[Value],
) -> Result<Value, VmFault> {
    let items = match args {
        [Value::Number(n)] if n.fract() == 0.0 && *n >= 0.0 && *n <= MAX_ARRAY_LEN as f64 => {
            vec![Value::Undefined; *n as usize]
        }
        _ => args.to_vec(),
    };
    Ok(Value::Object(ctx.new_array(items)))
}

fn array_push(ctx: &mut ExecutionContext, this: &Value, args: &[Value]) -> Result<Value, VmFault> {
    let Some(items) = this_array(ctx, this) else {
        return Ok(Value::Undefined);
    };
    items.extend_from_slice(args);
    Ok(Value::Number(items.len() as f64))
}

fn array_pop(ctx: &mut ExecutionContext, this: &Value, _args: &[Value]) -> Result<Value, VmFault> {
    Ok(this_array(ctx, this)
        .and_then(|items| items.pop())
        .unwrap_or_default())
}

fn array_join(ctx: &mut ExecutionContext, this: &Value, args: &[Value]) -> Result<Value, VmFault> {
    let sep = match args.first() {
        None | Some(Value::Undefined) => ",".into(),
        Some(v) => ctx.coerce_string(v),
    };
    let Some(items) = this
        .as_object()
        .and_then(|r| ctx.heap().get(r))
        .and_then(Object::as_array)
    else {
        return Ok(Value::string(""));
    };
    let parts: Vec<_> = items.iter().map(|v| ctx.coerce_string(v)).collect();
    Ok(Value::string(parts.join(&*sep)))
}

fn function_constructor(
    _ctx: &mut ExecutionContext,
    _this: &Value,
    _args: &[Value],
) -> Result<Value, VmFault> {
    Err(VmFault::native("functions cannot be compiled at runtime"))
}

/// `f.call(thisArg, ...args)`.
fn function_call(
    ctx: &mut ExecutionContext,
    this: &Value,
    args: &[Value],
) -> Result<Value, VmFault> {
    let (receiver, rest) = match args.split_first() {
        Some((r, rest)) => (r.clone(), rest),
        None => (Value::Undefined, &[][..]),
    };
    ctx.call(this, receiver, rest)
}

/// `f.apply(thisArg, argsArray)`.
fn function_apply(
    ctx: &mut ExecutionContext,
    this: &Value,
    args: &[Value],
) -> Result<Value, VmFault> {
    let receiver = args.first().cloned().unwrap_or_default();
    let spread = args
        .get(1)
        .and_then(Value::as_object)
        .and_then(|r| ctx.heap().get(r))
        .and_then(Object::as_array)
        .cloned()
        .unwrap_or_default();
    ctx.call(this, receiver, &spread)
}
