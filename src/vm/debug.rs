use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::vm::bytecode::ScriptId;

/// What the interpreter does after a debugger stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugAction {
    /// Run until the next breakpoint.
    Continue,
    /// Stop again at the next op boundary.
    Step,
    /// Halt the current script.
    Break,
}

/// Where execution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopLocation {
    pub script: ScriptId,
    pub line: u32,
    pub pc: usize,
}

/// Callbacks fired from the interpreter thread.
pub trait DebugHooks {
    fn on_stop(&mut self, at: StopLocation) -> DebugAction;

    fn on_enter(&mut self, _script: ScriptId, _function: &str) {}

    fn on_exit(&mut self, _script: ScriptId, _function: &str) {}
}

/// Breakpoint table plus single-step state.
#[derive(Default)]
pub struct Debugger {
    breakpoints: HashSet<(ScriptId, u32)>,
    stepping: bool,
    last_line: Option<(ScriptId, u32)>,
    hooks: Option<Box<dyn DebugHooks>>,
}

impl std::fmt::Debug for Debugger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debugger")
            .field("breakpoints", &self.breakpoints)
            .field("stepping", &self.stepping)
            .field("attached", &self.hooks.is_some())
            .finish()
    }
}

impl Debugger {
    pub fn attach(&mut self, hooks: Box<dyn DebugHooks>) {
        self.hooks = Some(hooks);
    }

    pub fn detach(&mut self) -> Option<Box<dyn DebugHooks>> {
        self.stepping = false;
        self.hooks.take()
    }

    pub fn set_breakpoint(&mut self, script: ScriptId, line: u32) -> bool {
        self.breakpoints.insert((script, line))
    }

    pub fn clear_breakpoint(&mut self, script: ScriptId, line: u32) -> bool {
        self.breakpoints.remove(&(script, line))
    }

    pub fn has_breakpoint(&self, script: ScriptId, line: u32) -> bool {
        self.breakpoints.contains(&(script, line))
    }

    /// Pause at the next op boundary.
    pub fn request_step(&mut self) {
        self.stepping = true;
    }

    pub fn is_active(&self) -> bool {
        self.hooks.is_some() && (self.stepping || !self.breakpoints.is_empty())
    }

    /// Op-boundary check. Breakpoints fire once when execution enters their line.
    pub(crate) fn check(&mut self, at: StopLocation) -> DebugAction {
        let key = (at.script, at.line);
        let entered_line = self.last_line != Some(key);
        self.last_line = Some(key);
        if !self.stepping && !(entered_line && self.breakpoints.contains(&key)) {
            return DebugAction::Continue;
        }
        let Some(hooks) = self.hooks.as_mut() else {
            return DebugAction::Continue;
        };
        let action = hooks.on_stop(at);
        self.stepping = action == DebugAction::Step;
        action
    }

    pub(crate) fn enter(&mut self, script: ScriptId, function: &str) {
        self.last_line = None;
        if let Some(h) = self.hooks.as_mut() {
            h.on_enter(script, function);
        }
    }

    pub(crate) fn exit(&mut self, script: ScriptId, function: &str) {
        self.last_line = None;
        if let Some(h) = self.hooks.as_mut() {
            h.on_exit(script, function);
        }
    }
}

/// Aggregated timing for one (script, function) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallSample {
    pub count: u64,
    pub inclusive: Duration,
    pub exclusive: Duration,
}

#[derive(Debug)]
struct OpenCall {
    key: (ScriptId, String),
    started: Instant,
    children: Duration,
}

/// Call-sample aggregation by script id and function name.
#[derive(Debug, Default)]
pub struct CallProfiler {
    enabled: bool,
    samples: HashMap<(ScriptId, String), CallSample>,
    open: Vec<OpenCall>,
}

impl CallProfiler {
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.open.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn enter(&mut self, script: ScriptId, function: &str) {
        if !self.enabled {
            return;
        }
        self.open.push(OpenCall {
            key: (script, function.to_string()),
            started: Instant::now(),
            children: Duration::ZERO,
        });
    }

    pub(crate) fn exit(&mut self) {
        let Some(call) = self.open.pop() else {
            return;
        };
        let elapsed = call.started.elapsed();
        if let Some(parent) = self.open.last_mut() {
            parent.children += elapsed;
        }
        let sample = self.samples.entry(call.key).or_default();
        sample.count += 1;
        sample.inclusive += elapsed;
        sample.exclusive += elapsed.saturating_sub(call.children);
    }

    pub fn sample(&self, script: ScriptId, function: &str) -> Option<CallSample> {
        self.samples.get(&(script, function.to_string())).copied()
    }

    pub fn samples(&self) -> impl Iterator<Item = (&(ScriptId, String), &CallSample)> {
        self.samples.iter()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.open.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/vm/debug.rs"]
mod tests;
