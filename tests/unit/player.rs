use super::*;
use std::collections::{BTreeMap, HashMap};

use crate::display::character::{
    ButtonAction, ButtonDef, ButtonRecord, ButtonStates, EditTextDef, FontDef, ShapeDef, SpriteDef,
};
use crate::display::cxform::ColorTransform;
use crate::display::movie::{ClipEventHandler, StaticLoader};
use crate::foundation::core::{BezPath, CharacterId};
use crate::render::device::RecordingDevice;
use crate::vm::bytecode::{CodeImageBuilder, Op};
use crate::vm::host::LoggedHost;

const SHAPE: CharacterId = CharacterId(1);
const FONT: CharacterId = CharacterId(2);
const BUTTON: CharacterId = CharacterId(3);
const TEXT: CharacterId = CharacterId(4);
const SPRITE: CharacterId = CharacterId(5);

fn trace(id: u32, msg: &str) -> Rc<CodeImage> {
    Rc::new(CodeImageBuilder::new(id).push_str(msg).op(Op::Trace).build())
}

fn action(script: Rc<CodeImage>) -> ControlTag {
    ControlTag::DoAction { script }
}

fn place(depth: i32, character: CharacterId) -> PlaceObject {
    PlaceObject {
        depth: Depth(depth),
        character: Some(character),
        ..Default::default()
    }
}

fn frame(tags: Vec<ControlTag>) -> Frame {
    Frame { label: None, tags }
}

fn square() -> ShapeDef {
    ShapeDef::filled(
        BezPath::from_svg("M0,0 L10,0 L10,10 L0,10 Z").unwrap(),
        Rgba8::BLACK,
    )
}

fn movie(frames: Vec<Frame>) -> MovieDef {
    let mut characters = BTreeMap::new();
    characters.insert(SHAPE, CharacterDef::Shape(square()));
    characters.insert(FONT, CharacterDef::Font(FontDef::new(1024.0, vec![])));
    characters.insert(
        BUTTON,
        CharacterDef::Button(ButtonDef {
            records: vec![ButtonRecord {
                states: ButtonStates::UP | ButtonStates::OVER | ButtonStates::DOWN | ButtonStates::HIT,
                character: SHAPE,
                depth: Depth(1),
                matrix: Affine::IDENTITY,
                cxform: ColorTransform::IDENTITY,
                clip_depth: None,
            }],
            actions: vec![
                ButtonAction {
                    on: vec![ButtonEvent::Press],
                    script: trace(90, "press"),
                },
                ButtonAction {
                    on: vec![ButtonEvent::Release],
                    script: trace(91, "release"),
                },
            ],
        }),
    );
    characters.insert(
        TEXT,
        CharacterDef::EditText(EditTextDef {
            bounds: Rect::new(0.0, 0.0, 100.0, 20.0),
            font: FONT,
            height: 12.0,
            color: Rgba8::BLACK,
            initial_text: "initial".to_string(),
            multiline: false,
            word_wrap: false,
            leading: 0.0,
            variable: Some("msg".to_string()),
        }),
    );
    characters.insert(
        SPRITE,
        CharacterDef::Sprite(SpriteDef {
            frames: vec![
                frame(vec![action(trace(50, "s0"))]),
                frame(vec![action(trace(51, "s1"))]),
            ],
        }),
    );
    let mut exports = HashMap::new();
    exports.insert("box".to_string(), SHAPE);
    MovieDef {
        frame_rate: 24.0,
        stage: Rect::new(0.0, 0.0, 200.0, 200.0),
        background: Rgba8::WHITE,
        version: 8,
        characters,
        exports,
        frames,
    }
}

fn player(frames: Vec<Frame>) -> (Player, Rc<LoggedHost>) {
    player_with(frames, PlayerOpts::default())
}

fn player_with(frames: Vec<Frame>, opts: PlayerOpts) -> (Player, Rc<LoggedHost>) {
    let host = Rc::new(LoggedHost::new());
    let p = Player::with_host(Rc::new(movie(frames)), opts, host.clone()).unwrap();
    (p, host)
}

fn tick(p: &mut Player) -> u32 {
    let period = p.movie().frame_period();
    p.progress(period)
}

fn run(p: &mut Player, script: Rc<CodeImage>) {
    let root = p.root();
    p.queue.push_back(Job::Script {
        instance: root,
        script,
    });
    p.run_queue();
}

#[test]
fn removed_clip_is_unloaded_and_collected() {
    let mut clip = place(1, SHAPE);
    clip.events = vec![ClipEventHandler {
        events: vec![ClipEvent::Load],
        script: Rc::new(
            CodeImageBuilder::new(7)
                .push_str("x")
                .push_num(1.0)
                .op(Op::DefineLocal)
                .build(),
        ),
    }];
    let (mut p, _) = player(vec![
        frame(vec![ControlTag::Place(clip)]),
        frame(vec![ControlTag::Remove { depth: Depth(1) }]),
    ]);

    let child = p.child_at(p.root(), Depth(1)).unwrap();
    let obj = p.arena().get(child).unwrap().object.unwrap();
    let x = p.context_mut().intern("x");
    let value = p.context_mut().get_member(obj, x).unwrap();
    assert!(matches!(value, Value::Number(n) if n == 1.0));

    assert_eq!(tick(&mut p), 1);
    assert_eq!(p.child_at(p.root(), Depth(1)), None);
    assert!(p.arena().get(child).is_none());
    assert_eq!(p.context().host_of(obj), None);

    let stats = p.collect_garbage().unwrap();
    assert!(stats.collected_last >= 1);
    assert!(!p.context().heap().contains(obj));
}

#[test]
fn frame_actions_run_once_per_entry_and_loop() {
    let (mut p, host) = player(vec![
        frame(vec![action(trace(1, "f0"))]),
        frame(vec![action(trace(2, "f1"))]),
        frame(vec![action(trace(3, "f2"))]),
    ]);
    assert_eq!(host.take(), vec!["f0"]);
    for _ in 0..3 {
        tick(&mut p);
    }
    assert_eq!(host.take(), vec!["f1", "f2", "f0"]);
    assert_eq!(p.current_frame(), Some(FrameIndex(0)));
    assert_eq!(p.stats().frames, 3);
}

#[test]
fn stop_holds_the_timeline() {
    let stop = Rc::new(CodeImageBuilder::new(1).op(Op::Stop).build());
    let (mut p, host) = player(vec![
        frame(vec![action(stop)]),
        frame(vec![action(trace(2, "f1"))]),
    ]);
    tick(&mut p);
    tick(&mut p);
    assert_eq!(p.current_frame(), Some(FrameIndex(0)));
    assert!(host.lines().is_empty());
}

#[test]
fn backward_goto_rebuilds_the_display_list() {
    let goto = Rc::new(CodeImageBuilder::new(3).op(Op::GotoFrame(0)).build());
    let (mut p, _) = player(vec![
        frame(vec![ControlTag::Place(place(1, SHAPE))]),
        frame(vec![]),
        frame(vec![action(goto)]),
    ]);
    let first = p.child_at(p.root(), Depth(1)).unwrap();
    tick(&mut p);
    assert_eq!(p.child_at(p.root(), Depth(1)), Some(first));
    tick(&mut p);

    let second = p.child_at(p.root(), Depth(1)).unwrap();
    assert_ne!(first, second);
    assert_eq!(p.current_frame(), Some(FrameIndex(0)));
    assert_eq!(p.stats().instances_created, 2);
    assert_eq!(p.stats().instances_removed, 1);
}

#[test]
fn placing_the_same_character_modifies_in_place() {
    let mut moved = place(1, SHAPE);
    moved.matrix = Some(Affine::translate((5.0, 0.0)));
    let (mut p, _) = player(vec![
        frame(vec![ControlTag::Place(place(1, SHAPE))]),
        frame(vec![ControlTag::Place(moved)]),
    ]);
    let id = p.child_at(p.root(), Depth(1)).unwrap();
    tick(&mut p);
    assert_eq!(p.child_at(p.root(), Depth(1)), Some(id));
    assert_eq!(
        p.arena().get(id).unwrap().transform,
        Affine::translate((5.0, 0.0))
    );
}

#[test]
fn deep_sprite_chains_stop_at_the_nesting_limit() {
    let mut m = movie(vec![frame(vec![ControlTag::Place(place(1, CharacterId(100)))])]);
    for id in 100..200u16 {
        let tags = if id < 199 {
            vec![ControlTag::Place(place(1, CharacterId(id + 1)))]
        } else {
            Vec::new()
        };
        m.characters.insert(
            CharacterId(id),
            CharacterDef::Sprite(SpriteDef {
                frames: vec![frame(tags)],
            }),
        );
    }
    let p = Player::new(Rc::new(m), PlayerOpts::default()).unwrap();
    assert_eq!(p.arena().len(), MAX_NESTING);
}

#[test]
fn sprites_play_their_own_timeline() {
    let (mut p, host) = player(vec![frame(vec![ControlTag::Place(place(1, SPRITE))])]);
    assert_eq!(host.take(), vec!["s0"]);
    tick(&mut p);
    tick(&mut p);
    assert_eq!(host.take(), vec!["s1", "s0"]);
    assert_eq!(p.current_frame(), Some(FrameIndex(0)));
}

#[test]
fn attach_and_remove_by_script() {
    let attach = Rc::new(
        CodeImageBuilder::new(1)
            .push_str("box")
            .push_str("b1")
            .push_num(5.0)
            .op(Op::AttachMovie)
            .build(),
    );
    let (mut p, _) = player(vec![frame(vec![action(attach)])]);
    let child = p.child_at(p.root(), Depth(5)).unwrap();
    assert_eq!(p.arena().get(child).unwrap().name.as_deref(), Some("b1"));
    let root_obj = p.arena().get(p.root()).unwrap().object.unwrap();
    let b1 = p.context_mut().intern("b1");
    assert!(p.context_mut().get_member(root_obj, b1).unwrap().as_object().is_some());

    let remove = Rc::new(
        CodeImageBuilder::new(2)
            .push_str("b1")
            .op(Op::GetVariable)
            .op(Op::RemoveClip)
            .build(),
    );
    run(&mut p, remove);
    assert_eq!(p.child_at(p.root(), Depth(5)), None);
    assert!(matches!(
        p.context_mut().get_member(root_obj, b1).unwrap(),
        Value::Undefined
    ));
}

#[test]
fn attach_falls_back_to_the_loader() {
    let attach = Rc::new(
        CodeImageBuilder::new(1)
            .push_str("ext.json")
            .push_str("ext")
            .push_num(2.0)
            .op(Op::AttachMovie)
            .build(),
    );
    let (mut p, host) = player(vec![frame(vec![])]);
    let mut loader = StaticLoader::new();
    loader.insert("ext.json", movie(vec![frame(vec![ControlTag::Place(place(1, SHAPE))])]));
    p.set_loader(Box::new(loader));
    run(&mut p, attach);

    let sub = p.child_at(p.root(), Depth(2)).unwrap();
    assert!(p.arena().get(sub).unwrap().timeline().is_some());
    assert!(p.child_at(sub, Depth(1)).is_some());
    assert!(host.lines().is_empty());
}

#[test]
fn missing_export_is_reported() {
    let attach = Rc::new(
        CodeImageBuilder::new(1)
            .push_str("nope")
            .push_str("n")
            .push_num(1.0)
            .op(Op::AttachMovie)
            .build(),
    );
    let (p, host) = player(vec![frame(vec![action(attach)])]);
    assert_eq!(p.child_at(p.root(), Depth(1)), None);
    assert_eq!(host.lines(), vec!["export `nope` not found"]);
}

#[test]
fn faulting_script_does_not_stop_the_frame() {
    let bad = Rc::new(
        CodeImageBuilder::new(4)
            .push_num(1.0)
            .op(Op::PushUndefined)
            .op(Op::CallFunction)
            .build(),
    );
    let (p, host) = player(vec![frame(vec![action(bad), action(trace(5, "after"))])]);
    assert_eq!(p.stats().script_faults, 1);
    assert_eq!(host.lines().last().map(String::as_str), Some("after"));
}

#[test]
fn enter_frame_and_key_handlers_fire() {
    let mut clip = place(1, SHAPE);
    clip.events = vec![
        ClipEventHandler {
            events: vec![ClipEvent::EnterFrame],
            script: trace(10, "tick"),
        },
        ClipEventHandler {
            events: vec![ClipEvent::KeyDown, ClipEvent::KeyUp],
            script: trace(11, "key"),
        },
    ];
    let (mut p, host) = player(vec![frame(vec![ControlTag::Place(clip)])]);
    tick(&mut p);
    tick(&mut p);
    p.post_key_down(65);
    p.post_key_up(65);
    assert_eq!(host.take(), vec!["tick", "tick", "key", "key"]);
}

#[test]
fn faulting_methods_are_reported_with_their_script() {
    let (mut p, host) = player(vec![frame(vec![ControlTag::Place(place(1, SHAPE))])]);
    let clip = p.child_at(p.root(), Depth(1)).unwrap();
    let obj = p.arena().get(clip).unwrap().object.unwrap();
    let method = p.context_mut().new_closure(crate::vm::function::Closure {
        proto: Rc::new(crate::vm::bytecode::FunctionProto {
            name: "onEnterFrame".into(),
            params: vec![],
            body: Rc::new(CodeImageBuilder::new(77).op(Op::CallFunction).build()),
        }),
        captured: vec![],
        scope: None,
    });
    p.set_member(obj, names::ON_ENTER_FRAME, Value::Object(method));

    tick(&mut p);
    let lines = host.take();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("script 77 halted:"), "{lines:?}");
    assert_eq!(p.stats().script_faults, 1);
}

fn button_player() -> (Player, Rc<LoggedHost>, InstanceId) {
    let mut b = place(1, BUTTON);
    b.matrix = Some(Affine::translate((100.0, 100.0)));
    let (p, host) = player(vec![frame(vec![ControlTag::Place(b)])]);
    let id = p.child_at(p.root(), Depth(1)).unwrap();
    (p, host, id)
}

fn state(p: &Player, id: InstanceId) -> ButtonState {
    match p.arena().get(id).unwrap().kind {
        InstanceKind::Button { state } => state,
        _ => panic!("not a button"),
    }
}

#[test]
fn button_press_and_release() {
    let (mut p, host, id) = button_player();
    assert_eq!(p.hit_test(Point::new(105.0, 105.0)), Some(id));
    assert_eq!(p.hit_test(Point::new(50.0, 50.0)), None);

    p.post_mouse_move(105.0, 105.0);
    assert_eq!(state(&p, id), ButtonState::Over);
    p.post_mouse_down(105.0, 105.0);
    assert_eq!(state(&p, id), ButtonState::Down);
    p.post_mouse_up(105.0, 105.0);
    assert_eq!(state(&p, id), ButtonState::Over);
    p.post_mouse_move(0.0, 0.0);
    assert_eq!(state(&p, id), ButtonState::Up);
    assert_eq!(host.take(), vec!["press", "release"]);
}

#[test]
fn release_outside_skips_release_actions() {
    let (mut p, host, id) = button_player();
    p.post_mouse_down(105.0, 105.0);
    assert_eq!(state(&p, id), ButtonState::Down);
    p.post_mouse_up(0.0, 0.0);
    assert_eq!(state(&p, id), ButtonState::Up);
    assert_eq!(host.take(), vec!["press"]);
}

#[test]
fn hidden_buttons_are_not_hit() {
    let (mut p, _, id) = button_player();
    p.arena.get_mut(id).unwrap().visible = false;
    assert_eq!(p.hit_test(Point::new(105.0, 105.0)), None);
}

#[test]
fn edit_text_mirrors_its_variable() {
    let define = Rc::new(
        CodeImageBuilder::new(1)
            .push_str("msg")
            .push_str("hi")
            .op(Op::DefineLocal)
            .build(),
    );
    let (mut p, _) = player(vec![frame(vec![
        ControlTag::Place(place(1, TEXT)),
        action(define),
    ])]);
    let id = p.child_at(p.root(), Depth(1)).unwrap();
    tick(&mut p);
    match &p.arena().get(id).unwrap().kind {
        InstanceKind::EditText { text } => assert_eq!(text, "hi"),
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn progress_caps_the_backlog() {
    let (mut p, _) = player(vec![frame(vec![]), frame(vec![])]);
    assert_eq!(p.progress(1.0), 8);
    assert_eq!(p.progress(0.0), 0);
    assert_eq!(p.stats().frames, 8);
}

#[test]
fn gc_runs_on_the_frame_interval() {
    let opts = PlayerOpts {
        gc_interval_frames: 2,
        ..PlayerOpts::default()
    };
    let (mut p, _) = player_with(vec![frame(vec![])], opts);
    tick(&mut p);
    assert_eq!(p.stats().gc_runs, 0);
    tick(&mut p);
    assert_eq!(p.stats().gc_runs, 1);
}

#[test]
fn render_draws_the_live_tree() {
    let (mut p, _) = player(vec![frame(vec![
        ControlTag::Place(place(1, SHAPE)),
        ControlTag::Place(place(2, SHAPE)),
    ])]);
    let mut r = p.create_renderer(RecordingDevice::new());
    let stats = p.render(&mut r);
    assert_eq!(stats.shapes, 2);
    assert_eq!(r.mesh_count(), 1);
}

#[test]
fn unload_runs_unload_handlers_and_stops_playback() {
    let mut clip = place(1, SHAPE);
    clip.events = vec![ClipEventHandler {
        events: vec![ClipEvent::Unload],
        script: trace(9, "bye"),
    }];
    let (mut p, host) = player(vec![frame(vec![ControlTag::Place(clip)])]);
    p.unload();
    assert_eq!(host.take(), vec!["bye"]);
    assert!(p.arena().get(p.root()).is_some());
    assert_eq!(tick(&mut p), 0);
}
