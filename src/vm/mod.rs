//! Stack-machine interpreter, object model and tracing collector.

pub(crate) mod builtins;
pub mod bytecode;
pub mod context;
pub mod debug;
pub mod error;
pub mod frame;
pub mod function;
pub mod heap;
pub mod host;
pub(crate) mod interp;
pub mod object;
pub mod strings;
pub mod value;

pub use bytecode::{CodeImage, CodeImageBuilder, Const, FunctionProto, Op, Param, ScriptId};
pub use context::{ExecutionContext, TimelineAction, TimelineCommand, VmOpts};
pub use debug::{CallProfiler, CallSample, DebugAction, DebugHooks, Debugger, StopLocation};
pub use error::VmFault;
pub use function::{Closure, Function, NativeFn, NativeFunction};
pub use heap::{GcStats, Heap, ObjectRef, Trace, Visitor};
pub use host::{Host, LoggedHost, NativeHost, NoOpHost, Warning};
pub use object::{Accessor, HostHandle, Object, ObjectKind, SetOutcome};
pub use strings::{NameId, StringTable, names};
pub use value::Value;
