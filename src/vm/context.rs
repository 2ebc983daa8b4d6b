use std::rc::Rc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::display::movie::MovieLoader;
use crate::foundation::core::{Depth, FrameIndex};
use crate::foundation::math::XorShift64;
use crate::vm::builtins;
use crate::vm::bytecode::CodeImage;
use crate::vm::debug::{CallProfiler, Debugger};
use crate::vm::error::VmFault;
use crate::vm::frame::FramePool;
use crate::vm::function::{Closure, Function, NativeFn, NativeFunction};
use crate::vm::heap::{GcStats, Heap, ObjectRef};
use crate::vm::host::{Host, NativeHost, Warning};
use crate::vm::interp::run_frame;
use crate::vm::object::{
    Accessor, ChainHit, HostHandle, Object, ObjectKind, SetOutcome, Slot, chain_contains,
    lookup_chain,
};
use crate::vm::strings::{NameId, StringTable, names};
use crate::vm::value::{Value, format_number};

/// Interpreter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmOpts {
    /// Dialect version; selects the legacy coercion rules below 5 and 7.
    pub swf_version: u8,
    pub max_call_depth: usize,
    /// Minimum register file size for top-level scripts.
    pub register_count: u8,
    /// Seed for `RandomNumber`. Zero picks a fixed default.
    pub seed: u64,
    pub max_prototype_chain: usize,
}

impl Default for VmOpts {
    fn default() -> Self {
        Self {
            swf_version: 8,
            max_call_depth: 256,
            register_count: 4,
            seed: 0,
            max_prototype_chain: 256,
        }
    }
}

/// Timeline operation requested by a script.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineAction {
    Play,
    Stop,
    Goto(FrameIndex),
    Next,
    Prev,
    Attach {
        export: String,
        name: String,
        depth: Depth,
    },
    Remove,
}

/// Queued timeline operation and the instance it applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineCommand {
    /// `None` targets the root timeline.
    pub target: Option<HostHandle>,
    pub action: TimelineAction,
}

/// Per-movie script state: heap, names, globals, listeners and host capabilities.
pub struct ExecutionContext {
    opts: VmOpts,
    heap: Heap,
    strings: StringTable,
    global: ObjectRef,
    object_proto: ObjectRef,
    function_proto: ObjectRef,
    array_proto: ObjectRef,
    pub(crate) frames: FramePool,
    listeners: Vec<ObjectRef>,
    root_movie: Option<ObjectRef>,
    loader: Option<Box<dyn MovieLoader>>,
    host: Rc<dyn Host>,
    rng: XorShift64,
    started: Instant,
    pub(crate) call_depth: usize,
    // Innermost script frame of the fault currently unwinding.
    pub(crate) fault_script: Option<u32>,
    gc_pending: bool,
    commands: Vec<TimelineCommand>,
    pub(crate) debugger: Debugger,
    pub(crate) profiler: CallProfiler,
    unloaded: bool,
}

impl ExecutionContext {
    pub fn new(opts: VmOpts) -> Self {
        Self::with_host(opts, Rc::new(NativeHost))
    }

    pub fn with_host(opts: VmOpts, host: Rc<dyn Host>) -> Self {
        let mut heap = Heap::new();
        let object_proto = heap.alloc(Object::new(None));
        let function_proto = heap.alloc(Object::new(Some(object_proto)));
        let array_proto = heap.alloc(Object::new(Some(object_proto)));
        let global = heap.alloc(Object::new(Some(object_proto)));
        let mut ctx = Self {
            opts,
            heap,
            strings: StringTable::new(),
            global,
            object_proto,
            function_proto,
            array_proto,
            frames: FramePool::new(),
            listeners: Vec::new(),
            root_movie: None,
            loader: None,
            host,
            rng: XorShift64::new(opts.seed),
            started: Instant::now(),
            call_depth: 0,
            fault_script: None,
            gc_pending: false,
            commands: Vec::new(),
            debugger: Debugger::default(),
            profiler: CallProfiler::default(),
            unloaded: false,
        };
        builtins::install(&mut ctx);
        ctx
    }

    pub fn opts(&self) -> &VmOpts {
        &self.opts
    }

    pub fn swf_version(&self) -> u8 {
        self.opts.swf_version
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub(crate) fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn intern(&mut self, s: &str) -> NameId {
        self.strings.intern(s)
    }

    pub fn resolve(&self, id: NameId) -> Option<&str> {
        self.strings.resolve(id)
    }

    /// Intern the string form of an arbitrary value, as member and variable names are.
    pub fn intern_value(&mut self, v: &Value) -> NameId {
        match v {
            Value::String(s) => self.strings.intern(s),
            other => {
                let s = self.coerce_string(other);
                self.strings.intern(&s)
            }
        }
    }

    pub fn global(&self) -> ObjectRef {
        self.global
    }

    pub fn object_proto(&self) -> ObjectRef {
        self.object_proto
    }

    pub fn function_proto(&self) -> ObjectRef {
        self.function_proto
    }

    pub fn array_proto(&self) -> ObjectRef {
        self.array_proto
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        let id = self.intern(name);
        if let Some(g) = self.heap.get_mut(self.global) {
            g.set_own(id, value);
        }
    }

    pub fn get_global(&mut self, name: &str) -> Value {
        let id = self.intern(name);
        self.heap
            .get(self.global)
            .and_then(|g| g.get_own(id))
            .cloned()
            .unwrap_or_default()
    }

    /// Constructor registered on the global object under `name`, if any.
    pub fn find_class(&mut self, name: &str) -> Option<ObjectRef> {
        match self.get_global(name) {
            Value::Object(r) if self.is_function(r) => Some(r),
            _ => None,
        }
    }

    pub fn root_movie(&self) -> Option<ObjectRef> {
        self.root_movie
    }

    pub fn set_root_movie(&mut self, root: Option<ObjectRef>) {
        self.root_movie = root;
    }

    pub fn set_loader(&mut self, loader: Box<dyn MovieLoader>) {
        self.loader = Some(loader);
    }

    pub fn loader_mut(&mut self) -> Option<&mut (dyn MovieLoader + 'static)> {
        self.loader.as_deref_mut()
    }

    pub fn host(&self) -> &dyn Host {
        &*self.host
    }

    pub fn debugger_mut(&mut self) -> &mut Debugger {
        &mut self.debugger
    }

    pub fn profiler(&self) -> &CallProfiler {
        &self.profiler
    }

    pub fn profiler_mut(&mut self) -> &mut CallProfiler {
        &mut self.profiler
    }

    pub fn is_unloaded(&self) -> bool {
        self.unloaded
    }

    // Allocation.

    pub fn new_object(&mut self) -> ObjectRef {
        self.heap.alloc(Object::new(Some(self.object_proto)))
    }

    pub fn new_object_with_proto(&mut self, proto: Option<ObjectRef>) -> ObjectRef {
        self.heap.alloc(Object::new(proto))
    }

    pub fn new_array(&mut self, items: Vec<Value>) -> ObjectRef {
        self.heap.alloc(Object::with_kind(
            Some(self.array_proto),
            ObjectKind::Array(items),
        ))
    }

    pub fn new_native_function(&mut self, name: &'static str, func: NativeFn) -> ObjectRef {
        self.heap.alloc(Object::with_kind(
            Some(self.function_proto),
            ObjectKind::Function(Function::Native(NativeFunction {
                name,
                func,
                receiver: None,
            })),
        ))
    }

    /// Allocate a closure object together with its `prototype` object.
    pub fn new_closure(&mut self, closure: Closure) -> ObjectRef {
        let func = self.heap.alloc(Object::with_kind(
            Some(self.function_proto),
            ObjectKind::Function(Function::Closure(closure)),
        ));
        let proto = self.new_object();
        if let Some(p) = self.heap.get_mut(proto) {
            p.set_own(names::CONSTRUCTOR, Value::Object(func));
        }
        if let Some(f) = self.heap.get_mut(func) {
            f.set_own(names::PROTOTYPE, Value::Object(proto));
        }
        func
    }

    /// Install a native method on `obj`.
    pub fn define_native(&mut self, obj: ObjectRef, name: &'static str, func: NativeFn) {
        let f = self.new_native_function(name, func);
        let id = self.intern(name);
        if let Some(o) = self.heap.get_mut(obj) {
            o.set_own(id, Value::Object(f));
        }
    }

    pub fn define_accessor(
        &mut self,
        obj: ObjectRef,
        name: &str,
        getter: Option<ObjectRef>,
        setter: Option<ObjectRef>,
    ) {
        let id = self.intern(name);
        if let Some(o) = self.heap.get_mut(obj) {
            o.define_accessor(id, Accessor { getter, setter });
        }
    }

    pub fn set_host_handle(&mut self, obj: ObjectRef, handle: Option<HostHandle>) {
        if let Some(o) = self.heap.get_mut(obj) {
            o.set_host(handle);
        }
    }

    pub fn host_of(&self, obj: ObjectRef) -> Option<HostHandle> {
        self.heap.get(obj).and_then(Object::host)
    }

    // Coercion.

    pub fn num(&self, v: &Value) -> f64 {
        v.to_number_for(self.opts.swf_version)
    }

    /// ToString without running script code. Never fails.
    pub fn coerce_string(&self, v: &Value) -> Rc<str> {
        self.stringify(v, 0)
    }

    fn stringify(&self, v: &Value, depth: usize) -> Rc<str> {
        match v {
            Value::Undefined if self.opts.swf_version < 7 => Rc::from(""),
            Value::Undefined => Rc::from("undefined"),
            Value::Null => Rc::from("null"),
            Value::Bool(b) => Rc::from(if *b { "true" } else { "false" }),
            Value::Number(n) => Rc::from(format_number(*n)),
            Value::String(s) => Rc::clone(s),
            Value::Object(r) | Value::WeakObject(r) => match self.heap.get(*r) {
                None => Rc::from(""),
                Some(o) => match &o.kind {
                    ObjectKind::Array(items) if depth < 8 => {
                        let parts: Vec<Rc<str>> =
                            items.iter().map(|i| self.stringify(i, depth + 1)).collect();
                        Rc::from(parts.join(","))
                    }
                    ObjectKind::Array(_) => Rc::from(""),
                    ObjectKind::Function(_) => Rc::from("[type Function]"),
                    ObjectKind::Plain => Rc::from("[object Object]"),
                },
            },
        }
    }

    pub fn type_of(&self, v: &Value) -> &'static str {
        match v {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(r) | Value::WeakObject(r) => match self.heap.get(*r) {
                None => "undefined",
                Some(o) if o.as_function().is_some() => "function",
                Some(o) if o.host().is_some() => "movieclip",
                Some(_) => "object",
            },
        }
    }

    /// Validate a weak handle: live objects become strong, dead ones `undefined`.
    pub fn upgrade(&self, v: &Value) -> Value {
        match v {
            Value::WeakObject(r) if self.heap.contains(*r) => Value::Object(*r),
            Value::WeakObject(_) => Value::Undefined,
            other => other.clone(),
        }
    }

    fn live_object(&self, v: &Value) -> Option<ObjectRef> {
        v.as_object().filter(|r| self.heap.contains(*r))
    }

    fn is_function(&self, r: ObjectRef) -> bool {
        self.heap
            .get(r)
            .is_some_and(|o| o.as_function().is_some())
    }

    // Members.

    pub fn has_property(&self, obj: ObjectRef, id: NameId) -> bool {
        if id == names::PROTO {
            return self.heap.contains(obj);
        }
        if id == names::LENGTH && self.heap.get(obj).and_then(Object::as_array).is_some() {
            return true;
        }
        lookup_chain(&self.heap, obj, id, self.opts.max_prototype_chain).is_some()
    }

    /// Read through the prototype chain, invoking a getter when one is found.
    pub fn get_member(&mut self, obj: ObjectRef, id: NameId) -> Result<Value, VmFault> {
        if id == names::PROTO {
            return Ok(self
                .heap
                .get(obj)
                .and_then(Object::proto)
                .map_or(Value::Undefined, Value::Object));
        }
        if id == names::LENGTH
            && let Some(items) = self.heap.get(obj).and_then(Object::as_array)
        {
            return Ok(Value::Number(items.len() as f64));
        }
        match lookup_chain(&self.heap, obj, id, self.opts.max_prototype_chain) {
            Some(ChainHit {
                slot: Slot::Value(v),
                ..
            }) => Ok(self.upgrade(&v)),
            Some(ChainHit {
                slot:
                    Slot::Accessor(Accessor {
                        getter: Some(g), ..
                    }),
                ..
            }) => self.call(&Value::Object(g), Value::Object(obj), &[]),
            _ => Ok(Value::Undefined),
        }
    }

    /// Write to the receiver, or run the nearest setter on its chain.
    pub fn set_member(
        &mut self,
        obj: ObjectRef,
        id: NameId,
        value: Value,
    ) -> Result<SetOutcome, VmFault> {
        if id == names::PROTO {
            let proto = value.as_object();
            return Ok(match self.heap.get_mut(obj) {
                Some(o) if o.is_read_only() => SetOutcome::ReadOnly,
                Some(o) => {
                    o.set_proto(proto);
                    SetOutcome::Stored
                }
                None => SetOutcome::Stored,
            });
        }
        if let Some(ChainHit {
            slot: Slot::Accessor(a),
            ..
        }) = lookup_chain(&self.heap, obj, id, self.opts.max_prototype_chain)
        {
            return match a.setter {
                Some(s) => {
                    self.call(&Value::Object(s), Value::Object(obj), &[value])?;
                    Ok(SetOutcome::InvokedSetter)
                }
                None => Ok(SetOutcome::ReadOnly),
            };
        }
        let Some(o) = self.heap.get_mut(obj) else {
            return Ok(SetOutcome::Stored);
        };
        if id == names::LENGTH && !o.is_read_only() {
            let len = value.to_number();
            if let Some(items) = o.as_array_mut() {
                if len.is_finite() && len >= 0.0 && len <= MAX_ARRAY_LEN as f64 {
                    items.resize(len as usize, Value::Undefined);
                } else if len.is_finite() && len > 0.0 {
                    self.host.warn(&Warning::ArrayLengthOutOfRange(len));
                }
                return Ok(SetOutcome::Stored);
            }
        }
        Ok(if o.set_own(id, value) {
            SetOutcome::Stored
        } else {
            SetOutcome::ReadOnly
        })
    }

    /// `target[key]` for arbitrary values, including array indices and string length.
    pub fn get_property(&mut self, target: &Value, key: &Value) -> Result<Value, VmFault> {
        if let Value::String(s) = target {
            let is_length = matches!(key, Value::String(k) if &**k == "length");
            return Ok(if is_length {
                Value::Number(s.chars().count() as f64)
            } else {
                Value::Undefined
            });
        }
        let Some(obj) = self.live_object(target) else {
            return Ok(Value::Undefined);
        };
        if let Some(i) = array_index(key)
            && let Some(items) = self.heap.get(obj).and_then(Object::as_array)
        {
            let v = items.get(i).cloned().unwrap_or_default();
            return Ok(self.upgrade(&v));
        }
        let id = self.intern_value(key);
        self.get_member(obj, id)
    }

    pub fn set_property(
        &mut self,
        target: &Value,
        key: &Value,
        value: Value,
    ) -> Result<SetOutcome, VmFault> {
        let Some(obj) = self.live_object(target) else {
            return Ok(SetOutcome::Stored);
        };
        if let Some(i) = array_index(key)
            && let Some(o) = self.heap.get_mut(obj)
            && !o.is_read_only()
            && let Some(items) = o.as_array_mut()
        {
            if i >= items.len() {
                items.resize(i + 1, Value::Undefined);
            }
            items[i] = value;
            return Ok(SetOutcome::Stored);
        }
        let id = self.intern_value(key);
        self.set_member(obj, id, value)
    }

    pub fn delete_property(&mut self, target: &Value, key: &Value) -> bool {
        let Some(obj) = self.live_object(target) else {
            return false;
        };
        let id = self.intern_value(key);
        self.heap.get_mut(obj).is_some_and(|o| o.delete(id))
    }

    // Calls.

    pub fn call(&mut self, callee: &Value, this: Value, args: &[Value]) -> Result<Value, VmFault> {
        self.call_with_super(callee, this, None, args)
    }

    /// Call with an explicit `super` binding for script closures.
    pub fn call_with_super(
        &mut self,
        callee: &Value,
        this: Value,
        super_obj: Option<Value>,
        args: &[Value],
    ) -> Result<Value, VmFault> {
        let func = self
            .live_object(callee)
            .and_then(|r| Some((r, self.heap.get(r)?.as_function()?.clone())));
        let Some((fref, func)) = func else {
            let what = self.coerce_string(callee).to_string();
            return Err(VmFault::NotCallable(format!(
                "{what} ({})",
                self.type_of(callee)
            )));
        };
        match func {
            Function::Native(n) => {
                if self.call_depth >= self.opts.max_call_depth {
                    return Err(VmFault::CallDepthExceeded(self.opts.max_call_depth));
                }
                let this = n.receiver.clone().unwrap_or(this);
                self.call_depth += 1;
                let r = (n.func)(self, &this, args);
                self.call_depth -= 1;
                r
            }
            Function::Closure(c) => c.invoke(self, Some(fref), this, super_obj, args),
        }
    }

    /// Call `target.name(args)`; a missing method is not an error and yields `undefined`.
    pub fn call_method(
        &mut self,
        target: ObjectRef,
        name: NameId,
        args: &[Value],
    ) -> Result<Value, VmFault> {
        let f = self.get_member(target, name)?;
        if f.is_nullish() {
            return Ok(Value::Undefined);
        }
        self.call(&f, Value::Object(target), args)
    }

    /// `new ctor(args)`: fresh object delegating to `ctor.prototype`.
    pub fn construct(&mut self, ctor: &Value, args: &[Value]) -> Result<Value, VmFault> {
        let Some(cref) = self.live_object(ctor).filter(|r| self.is_function(*r)) else {
            return Err(VmFault::NotCallable(format!(
                "{} is not a constructor",
                self.coerce_string(ctor)
            )));
        };
        let proto = match self.get_member(cref, names::PROTOTYPE)? {
            Value::Object(p) => p,
            _ => self.object_proto,
        };
        let obj = self.heap.alloc(Object::new(Some(proto)));
        let result = self.call(ctor, Value::Object(obj), args)?;
        Ok(match result {
            Value::Object(r) => Value::Object(r),
            _ => Value::Object(obj),
        })
    }

    /// `subclass.prototype = { __proto__: superclass.prototype, constructor: superclass }`.
    pub fn extends(&mut self, subclass: &Value, superclass: &Value) -> Result<(), VmFault> {
        let (Some(sub), Some(sup)) = (self.live_object(subclass), self.live_object(superclass))
        else {
            return Ok(());
        };
        let parent = self.get_member(sup, names::PROTOTYPE)?.as_object();
        let proto = self.heap.alloc(Object::new(parent));
        if let Some(p) = self.heap.get_mut(proto) {
            p.set_own(names::CONSTRUCTOR, Value::Object(sup));
        }
        self.set_member(sub, names::PROTOTYPE, Value::Object(proto))?;
        Ok(())
    }

    pub fn instance_of(&self, obj: &Value, ctor: &Value) -> bool {
        let (Some(o), Some(c)) = (self.live_object(obj), self.live_object(ctor)) else {
            return false;
        };
        let Some(proto) = self
            .heap
            .get(c)
            .and_then(|c| c.get_own(names::PROTOTYPE))
            .and_then(Value::as_object)
        else {
            return false;
        };
        chain_contains(&self.heap, o, proto, self.opts.max_prototype_chain)
    }

    /// `this.__proto__.__proto__`, or `undefined` when either link is missing.
    pub fn default_super(&self, this: &Value) -> Value {
        self.live_object(this)
            .and_then(|r| self.heap.get(r)?.proto())
            .and_then(|p| self.heap.get(p)?.proto())
            .map_or(Value::Undefined, Value::Object)
    }

    /// Run a top-level code image with `this` and a timeline scope.
    pub fn run_script(
        &mut self,
        image: Rc<CodeImage>,
        this: Value,
        scope: Option<ObjectRef>,
    ) -> Result<Value, VmFault> {
        if self.call_depth >= self.opts.max_call_depth {
            return Err(VmFault::CallDepthExceeded(self.opts.max_call_depth));
        }
        let script = image.script_id;
        let name = image.name.clone();
        if self.call_depth == 0 {
            self.fault_script = None;
        }
        let mut frame = self.frames.acquire(image);
        let min_registers = usize::from(self.opts.register_count);
        if frame.registers.len() < min_registers {
            frame.registers.resize(min_registers, Value::Undefined);
        }
        frame.this = this;
        frame.scope = scope;

        self.profiler.enter(script, &name);
        self.debugger.enter(script, &name);
        self.call_depth += 1;
        let result = run_frame(self, &mut frame);
        self.call_depth -= 1;
        self.debugger.exit(script, &name);
        self.profiler.exit();
        self.frames.release(frame);
        result
    }

    // Host services.

    pub fn elapsed_ms(&self) -> f64 {
        (self.started.elapsed().as_secs_f64() * 1000.0).floor()
    }

    pub fn random_below(&mut self, max: f64) -> f64 {
        if !max.is_finite() || max < 1.0 {
            return 0.0;
        }
        self.rng.below(max as u64) as f64
    }

    pub fn push_command(&mut self, target: Option<HostHandle>, action: TimelineAction) {
        self.commands.push(TimelineCommand { target, action });
    }

    pub fn drain_commands(&mut self) -> Vec<TimelineCommand> {
        std::mem::take(&mut self.commands)
    }

    // Frame listeners.

    pub fn add_frame_listener(&mut self, listener: ObjectRef) -> bool {
        if self.listeners.contains(&listener) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    pub fn remove_frame_listener(&mut self, listener: ObjectRef) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| *l != listener);
        before != self.listeners.len()
    }

    pub fn frame_listeners(&self) -> &[ObjectRef] {
        &self.listeners
    }

    /// Dispatch to the listeners registered when the call starts.
    ///
    /// Function listeners are called with `time`; other objects get `onEnterFrame(time)`.
    /// A faulting listener is reported and the rest still run. Returns the number notified.
    pub fn notify_frame_listeners(&mut self, time: f64) -> usize {
        let snapshot = self.listeners.clone();
        let args = [Value::Number(time)];
        let mut notified = 0;
        for l in snapshot {
            if !self.heap.contains(l) {
                continue;
            }
            self.fault_script = None;
            let r = if self.is_function(l) {
                self.call(&Value::Object(l), Value::Undefined, &args)
            } else {
                self.call_method(l, names::ON_ENTER_FRAME, &args)
            };
            if let Err(fault) = r {
                self.report_fault(0, &fault);
            }
            notified += 1;
        }
        notified
    }

    /// Report a fault against the innermost script frame it halted, else `fallback`.
    pub(crate) fn report_fault(&mut self, fallback: u32, fault: &VmFault) {
        let script = self.fault_script.take().unwrap_or(fallback);
        tracing::warn!(script, %fault, "script halted");
        self.host.warn(&Warning::ScriptFault {
            script,
            message: fault.to_string(),
        });
    }

    // Lifetime.

    pub fn gc_pending(&self) -> bool {
        self.gc_pending
    }

    /// Collect from the context roots plus `extra_roots`.
    ///
    /// Returns `None` when called while script frames are active; the request is then kept
    /// pending for the embedder to retry.
    pub fn collect_garbage(
        &mut self,
        extra_roots: impl IntoIterator<Item = ObjectRef>,
    ) -> Option<GcStats> {
        if self.call_depth > 0 {
            self.gc_pending = true;
            tracing::debug!(depth = self.call_depth, "gc deferred");
            return None;
        }
        self.gc_pending = false;
        let roots: Vec<ObjectRef> = [
            self.global,
            self.object_proto,
            self.function_proto,
            self.array_proto,
        ]
        .into_iter()
        .chain(self.listeners.iter().copied())
        .chain(self.root_movie)
        .chain(extra_roots)
        .collect();
        Some(self.heap.collect(roots))
    }

    /// Drop every root and collect. The context must not run scripts afterwards.
    pub fn unload(&mut self) -> GcStats {
        self.listeners.clear();
        self.root_movie = None;
        self.commands.clear();
        self.loader = None;
        self.unloaded = true;
        let stats = self.heap.collect(std::iter::empty());
        tracing::debug!(collected = stats.collected_last, "context unloaded");
        stats
    }
}

/// Longest array a script can grow; indices past it are treated as named members.
pub(crate) const MAX_ARRAY_LEN: usize = 1 << 24;

fn array_index(key: &Value) -> Option<usize> {
    let i = match key {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => *n as usize,
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().ok()?
        }
        _ => return None,
    };
    (i < MAX_ARRAY_LEN).then_some(i)
}

#[cfg(test)]
#[path = "../../tests/unit/vm/context.rs"]
mod tests;
