use super::*;
use std::cell::RefCell;
use std::rc::Rc;

struct Script {
    stops: Rc<RefCell<Vec<StopLocation>>>,
    replies: Vec<DebugAction>,
}

impl DebugHooks for Script {
    fn on_stop(&mut self, at: StopLocation) -> DebugAction {
        self.stops.borrow_mut().push(at);
        if self.replies.is_empty() {
            DebugAction::Continue
        } else {
            self.replies.remove(0)
        }
    }
}

fn at(line: u32, pc: usize) -> StopLocation {
    StopLocation {
        script: ScriptId(1),
        line,
        pc,
    }
}

#[test]
fn breakpoint_fires_once_per_line_entry() {
    let stops = Rc::new(RefCell::new(Vec::new()));
    let mut d = Debugger::default();
    d.attach(Box::new(Script {
        stops: Rc::clone(&stops),
        replies: vec![],
    }));
    assert!(d.set_breakpoint(ScriptId(1), 2));
    assert!(d.is_active());

    for (pc, line) in [1, 2, 2, 2, 3].into_iter().enumerate() {
        assert_eq!(d.check(at(line, pc)), DebugAction::Continue);
    }
    assert_eq!(stops.borrow().len(), 1);
    assert_eq!(stops.borrow()[0].pc, 1);

    assert!(d.clear_breakpoint(ScriptId(1), 2));
    assert!(!d.is_active());
}

#[test]
fn step_stops_at_every_op_until_continue() {
    let stops = Rc::new(RefCell::new(Vec::new()));
    let mut d = Debugger::default();
    d.attach(Box::new(Script {
        stops: Rc::clone(&stops),
        replies: vec![DebugAction::Step, DebugAction::Continue],
    }));
    d.request_step();
    d.check(at(1, 0));
    d.check(at(1, 1));
    d.check(at(1, 2));
    assert_eq!(stops.borrow().len(), 2);
}

#[test]
fn break_is_reported() {
    let stops = Rc::new(RefCell::new(Vec::new()));
    let mut d = Debugger::default();
    d.attach(Box::new(Script {
        stops,
        replies: vec![DebugAction::Break],
    }));
    d.set_breakpoint(ScriptId(1), 5);
    assert_eq!(d.check(at(5, 0)), DebugAction::Break);
}

#[test]
fn profiler_splits_inclusive_and_exclusive() {
    let mut p = CallProfiler::default();
    p.set_enabled(true);
    p.enter(ScriptId(1), "outer");
    p.enter(ScriptId(1), "inner");
    std::thread::sleep(Duration::from_millis(2));
    p.exit();
    p.exit();

    let outer = p.sample(ScriptId(1), "outer").unwrap();
    let inner = p.sample(ScriptId(1), "inner").unwrap();
    assert_eq!(outer.count, 1);
    assert_eq!(inner.count, 1);
    assert!(outer.inclusive >= inner.inclusive);
    assert!(outer.exclusive <= outer.inclusive - inner.inclusive + Duration::from_micros(1));
}

#[test]
fn disabled_profiler_records_nothing() {
    let mut p = CallProfiler::default();
    p.enter(ScriptId(1), "f");
    p.exit();
    assert_eq!(p.samples().count(), 0);
}
