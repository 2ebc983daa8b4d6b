use super::*;
use crate::vm::bytecode::CodeImageBuilder;
use crate::vm::context::VmOpts;
use crate::vm::host::LoggedHost;
use crate::vm::HostHandle;

fn setup(swf_version: u8) -> (ExecutionContext, Rc<LoggedHost>) {
    let host = Rc::new(LoggedHost::new());
    let ctx = ExecutionContext::with_host(
        VmOpts {
            swf_version,
            ..VmOpts::default()
        },
        host.clone(),
    );
    (ctx, host)
}

fn run(ctx: &mut ExecutionContext, b: CodeImageBuilder) -> Result<Value, VmFault> {
    ctx.run_script(Rc::new(b.build()), Value::Undefined, None)
}

#[test]
fn arithmetic_and_trace() {
    let (mut ctx, host) = setup(8);
    run(
        &mut ctx,
        CodeImageBuilder::new(1)
            .push_num(2.0)
            .push_num(3.0)
            .op(Op::Add)
            .op(Op::Trace)
            .push_num(7.0)
            .push_num(2.0)
            .op(Op::Modulo)
            .op(Op::Trace)
            .push_num(-1.0)
            .push_num(28.0)
            .op(Op::ShiftRightUnsigned)
            .op(Op::Trace),
    )
    .unwrap();
    assert_eq!(host.lines(), vec!["5", "1", "15"]);
}

#[test]
fn add_concatenates_strings() {
    let (mut ctx, host) = setup(8);
    run(
        &mut ctx,
        CodeImageBuilder::new(1)
            .push_str("a")
            .push_num(1.0)
            .op(Op::Add)
            .op(Op::Trace),
    )
    .unwrap();
    assert_eq!(host.lines(), vec!["a1"]);
}

#[test]
fn legacy_dialect_coercions() {
    let (mut ctx, host) = setup(4);
    run(
        &mut ctx,
        CodeImageBuilder::new(1)
            .push_num(1.0)
            .push_num(0.0)
            .op(Op::Divide)
            .op(Op::Trace)
            .push_num(1.0)
            .push_num(2.0)
            .op(Op::Less)
            .op(Op::Trace)
            .op(Op::PushUndefined)
            .push_num(1.0)
            .op(Op::Add)
            .op(Op::Trace),
    )
    .unwrap();
    assert_eq!(host.lines(), vec!["#ERROR#", "1", "1"]);
}

#[test]
fn modern_comparison_with_nan_is_undefined() {
    let (mut ctx, host) = setup(8);
    run(
        &mut ctx,
        CodeImageBuilder::new(1)
            .push_str("abc")
            .push_num(1.0)
            .op(Op::Less)
            .op(Op::Trace)
            .push_str("a")
            .push_str("b")
            .op(Op::Less)
            .op(Op::Trace),
    )
    .unwrap();
    assert_eq!(host.lines(), vec!["undefined", "true"]);
}

#[test]
fn trace_of_undefined_prints_undefined_in_old_versions() {
    let (mut ctx, host) = setup(6);
    run(
        &mut ctx,
        CodeImageBuilder::new(1)
            .op(Op::PushUndefined)
            .op(Op::Trace)
            .op(Op::PushUndefined)
            .push_str("")
            .op(Op::StringAdd)
            .op(Op::Trace),
    )
    .unwrap();
    assert_eq!(host.lines(), vec!["undefined", ""]);
}

#[test]
fn loop_with_registers_and_branches() {
    let (mut ctx, host) = setup(8);
    run(
        &mut ctx,
        CodeImageBuilder::new(1)
            .push_num(0.0)
            .op(Op::StoreRegister(0))
            .op(Op::Pop)
            .op(Op::PushRegister(0))
            .op(Op::Increment)
            .op(Op::StoreRegister(0))
            .push_num(3.0)
            .op(Op::Less)
            .op(Op::If(-6))
            .op(Op::PushRegister(0))
            .op(Op::Trace),
    )
    .unwrap();
    assert_eq!(host.lines(), vec!["3"]);
}

#[test]
fn underflow_is_a_fault() {
    let (mut ctx, _) = setup(8);
    let err = run(&mut ctx, CodeImageBuilder::new(1).push_num(1.0).op(Op::Add)).unwrap_err();
    assert_eq!(
        err,
        VmFault::StackUnderflow {
            op: "Add",
            needed: 2,
            available: 1
        }
    );
    assert_eq!(ctx.call_depth, 0);
    assert_eq!(ctx.frames.idle(), 1);
}

#[test]
fn huge_object_counts_underflow_instead_of_overflowing() {
    let (mut ctx, _) = setup(8);
    let err = run(
        &mut ctx,
        CodeImageBuilder::new(1).push_num(1e19).op(Op::InitObject),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        VmFault::StackUnderflow {
            op: "InitObject",
            available: 0,
            ..
        }
    ));
    assert_eq!(ctx.call_depth, 0);
}

#[test]
fn negative_zero_literals_keep_their_sign() {
    let (mut ctx, host) = setup(8);
    run(
        &mut ctx,
        CodeImageBuilder::new(1)
            .push_num(0.0)
            .op(Op::Pop)
            .push_num(1.0)
            .push_num(-0.0)
            .op(Op::Divide)
            .op(Op::Trace),
    )
    .unwrap();
    assert_eq!(host.take(), vec!["-Infinity"]);
}

#[test]
fn unvalidated_bad_jump_is_a_fault() {
    let (mut ctx, _) = setup(8);
    let err = run(&mut ctx, CodeImageBuilder::new(1).op(Op::Jump(-5))).unwrap_err();
    assert_eq!(err, VmFault::InvalidJump { target: -4, len: 1 });
}

#[test]
fn top_level_locals_land_on_scope_object() {
    let (mut ctx, _) = setup(8);
    let scope = ctx.new_object();
    let img = CodeImageBuilder::new(1)
        .push_str("x")
        .push_num(1.0)
        .op(Op::DefineLocal)
        .push_str("y")
        .push_str("x")
        .op(Op::GetVariable)
        .op(Op::SetVariable)
        .build();
    ctx.run_script(Rc::new(img), Value::Object(scope), Some(scope))
        .unwrap();
    let x = ctx.intern("x");
    let y = ctx.intern("y");
    assert!(matches!(ctx.get_member(scope, x).unwrap(), Value::Number(n) if n == 1.0));
    assert!(matches!(ctx.get_member(scope, y).unwrap(), Value::Number(n) if n == 1.0));
    assert!(ctx.get_global("x").is_undefined());
}

#[test]
fn arrays_and_method_calls() {
    let (mut ctx, host) = setup(8);
    run(
        &mut ctx,
        CodeImageBuilder::new(1)
            .push_num(3.0)
            .push_num(2.0)
            .push_num(1.0)
            .push_num(3.0)
            .op(Op::InitArray)
            .op(Op::StoreRegister(0))
            .op(Op::Pop)
            .push_str("-")
            .push_num(1.0)
            .op(Op::PushRegister(0))
            .push_str("join")
            .op(Op::CallMethod)
            .op(Op::Trace)
            .op(Op::PushRegister(0))
            .push_str("length")
            .op(Op::GetMember)
            .op(Op::Trace)
            .op(Op::PushRegister(0))
            .push_num(1.0)
            .op(Op::GetMember)
            .op(Op::Trace),
    )
    .unwrap();
    assert_eq!(host.lines(), vec!["1-2-3", "3", "2"]);
}

#[test]
fn init_object_and_members() {
    let (mut ctx, host) = setup(8);
    run(
        &mut ctx,
        CodeImageBuilder::new(1)
            .push_str("a")
            .push_num(10.0)
            .push_num(1.0)
            .op(Op::InitObject)
            .op(Op::PushDuplicate)
            .push_str("a")
            .op(Op::GetMember)
            .op(Op::Trace)
            .op(Op::TypeOf)
            .op(Op::Trace),
    )
    .unwrap();
    assert_eq!(host.lines(), vec!["10", "object"]);
}

#[test]
fn calling_a_non_function_faults() {
    let (mut ctx, _) = setup(8);
    let err = run(
        &mut ctx,
        CodeImageBuilder::new(1)
            .push_num(0.0)
            .push_str("missing")
            .op(Op::CallFunction),
    )
    .unwrap_err();
    assert!(matches!(err, VmFault::NotCallable(_)));
}

#[test]
fn timeline_ops_enqueue_commands_for_scope_host() {
    let (mut ctx, _) = setup(8);
    let clip = ctx.new_object();
    ctx.set_host_handle(clip, Some(HostHandle(9)));
    let img = CodeImageBuilder::new(1)
        .op(Op::Stop)
        .op(Op::GotoFrame(2))
        .push_str("Box")
        .push_str("box1")
        .push_num(5.0)
        .op(Op::AttachMovie)
        .build();
    ctx.run_script(Rc::new(img), Value::Object(clip), Some(clip))
        .unwrap();
    let cmds = ctx.drain_commands();
    assert_eq!(cmds.len(), 3);
    assert!(cmds.iter().all(|c| c.target == Some(HostHandle(9))));
    assert_eq!(cmds[1].action, TimelineAction::Goto(FrameIndex(2)));
    assert_eq!(
        cmds[2].action,
        TimelineAction::Attach {
            export: "Box".into(),
            name: "box1".into(),
            depth: Depth(5),
        }
    );
    assert!(ctx.drain_commands().is_empty());
}

#[test]
fn random_number_is_seeded() {
    let a = {
        let (mut ctx, host) = setup(8);
        for _ in 0..4 {
            run(
                &mut ctx,
                CodeImageBuilder::new(1)
                    .push_num(100.0)
                    .op(Op::RandomNumber)
                    .op(Op::Trace),
            )
            .unwrap();
        }
        host.take()
    };
    let (mut ctx, host) = setup(8);
    for _ in 0..4 {
        run(
            &mut ctx,
            CodeImageBuilder::new(1)
                .push_num(100.0)
                .op(Op::RandomNumber)
                .op(Op::Trace),
        )
        .unwrap();
    }
    assert_eq!(a, host.take());
}
