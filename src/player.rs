//! Frame driver: advances timelines, dispatches events and scripts, and renders.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::display::character::{ButtonEvent, CharacterDef};
use crate::display::instance::{
    ButtonState, CharacterInstance, InstanceArena, InstanceId, InstanceKind, TimelineSource,
};
use crate::display::movie::{ClipEvent, ControlTag, EventMask, Frame, MovieDef, MovieLoader, PlaceObject};
use crate::foundation::core::{Affine, Depth, FrameIndex, Point, Rect, Rgba8};
use crate::foundation::error::{MarqueeError, MarqueeResult};
use crate::render::accelerated::AcceleratedRenderer;
use crate::render::device::GpuDevice;
use crate::render::movie_renderer::{MovieRenderer, RenderStats};
use crate::render::renderer::{RenderOpts, Renderer};
use crate::render::vertex_pool::VertexPoolOpts;
use crate::vm::bytecode::CodeImage;
use crate::vm::context::{ExecutionContext, TimelineAction, TimelineCommand, VmOpts};
use crate::vm::heap::{GcStats, ObjectRef};
use crate::vm::host::{Host, NativeHost, Warning};
use crate::vm::strings::{NameId, names};
use crate::vm::value::Value;

// Scripts run per drain before the queue is abandoned (runaway goto loops).
const MAX_JOBS_PER_DRAIN: usize = 1 << 16;
// Containers nested deeper than this are not instantiated.
const MAX_NESTING: usize = 64;

/// Player configuration.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlayerOpts {
    /// Interpreter options. `swf_version` is taken from the movie.
    pub vm: VmOpts,
    pub vertex_pool: VertexPoolOpts,
    pub render: RenderOpts,
    /// Collect garbage every this many frames; 0 only collects on request.
    pub gc_interval_frames: u32,
    /// Frames one `progress` call may advance before dropping the backlog.
    pub max_frames_per_progress: u32,
}

impl Default for PlayerOpts {
    fn default() -> Self {
        Self {
            vm: VmOpts::default(),
            vertex_pool: VertexPoolOpts::default(),
            render: RenderOpts::default(),
            gc_interval_frames: 60,
            max_frames_per_progress: 8,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerStats {
    pub frames: u64,
    pub scripts_run: u64,
    pub script_faults: u64,
    pub instances_created: u64,
    pub instances_removed: u64,
    pub gc_runs: u64,
}

/// Deferred script work, resolved against the arena when it runs.
#[derive(Clone, Debug)]
enum Job {
    Script {
        instance: InstanceId,
        script: Rc<CodeImage>,
    },
    Method {
        instance: InstanceId,
        name: NameId,
        args: Vec<Value>,
    },
}

/// One loaded movie with its script context, instance tree and input state.
pub struct Player {
    movie: Rc<MovieDef>,
    ctx: ExecutionContext,
    arena: InstanceArena,
    root: InstanceId,
    opts: PlayerOpts,
    renderer: MovieRenderer,
    background: Rgba8,
    queue: VecDeque<Job>,
    released: Vec<InstanceId>,
    accumulator: f64,
    time_ms: f64,
    frames_since_gc: u32,
    mouse: Point,
    hover: Option<InstanceId>,
    pressed: Option<InstanceId>,
    stats: PlayerStats,
}

impl Player {
    pub fn new(movie: Rc<MovieDef>, opts: PlayerOpts) -> MarqueeResult<Self> {
        Self::with_host(movie, opts, Rc::new(NativeHost))
    }

    /// Validate `movie`, build the root instance and enter its first frame.
    pub fn with_host(
        movie: Rc<MovieDef>,
        opts: PlayerOpts,
        host: Rc<dyn Host>,
    ) -> MarqueeResult<Self> {
        movie.validate()?;
        let vm = VmOpts {
            swf_version: movie.version,
            ..opts.vm
        };
        let mut ctx = ExecutionContext::with_host(vm, host);
        let mut arena = InstanceArena::new();
        let root = arena.insert(CharacterInstance::root(movie.clone()));
        let obj = ctx.new_object();
        ctx.set_host_handle(obj, Some(root.to_host()));
        ctx.set_root_movie(Some(obj));
        if let Some(inst) = arena.get_mut(root) {
            inst.object = Some(obj);
        }
        tracing::debug!(
            frames = movie.frames.len(),
            characters = movie.characters.len(),
            frame_rate = movie.frame_rate,
            "movie loaded"
        );

        let mut player = Self {
            background: movie.background,
            movie,
            ctx,
            arena,
            root,
            opts,
            renderer: MovieRenderer::new(opts.render),
            queue: VecDeque::new(),
            released: Vec::new(),
            accumulator: 0.0,
            time_ms: 0.0,
            frames_since_gc: 0,
            mouse: Point::ZERO,
            hover: None,
            pressed: None,
            stats: PlayerStats::default(),
        };
        player.goto_frame(root, FrameIndex(0));
        player.run_queue();
        Ok(player)
    }

    pub fn movie(&self) -> &Rc<MovieDef> {
        &self.movie
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.ctx
    }

    pub fn arena(&self) -> &InstanceArena {
        &self.arena
    }

    pub fn root(&self) -> InstanceId {
        self.root
    }

    pub fn opts(&self) -> &PlayerOpts {
        &self.opts
    }

    pub fn stats(&self) -> PlayerStats {
        self.stats
    }

    pub fn background(&self) -> Rgba8 {
        self.background
    }

    pub fn set_loader(&mut self, loader: Box<dyn MovieLoader>) {
        self.ctx.set_loader(loader);
    }

    /// Last entered frame of the root timeline.
    pub fn current_frame(&self) -> Option<FrameIndex> {
        self.arena
            .get(self.root)
            .and_then(|i| i.timeline())
            .and_then(|t| t.current)
    }

    /// Instance at `depth` in `container`'s display list.
    pub fn child_at(&self, container: InstanceId, depth: Depth) -> Option<InstanceId> {
        self.arena
            .get(container)?
            .display_list()?
            .get(depth)
            .map(|l| l.instance)
    }

    /// An accelerated renderer sized by this player's vertex pool and render options.
    pub fn create_renderer<D: GpuDevice>(&self, device: D) -> AcceleratedRenderer<D> {
        AcceleratedRenderer::new(device, self.opts.vertex_pool, self.opts.render)
    }

    /// Advance by `dt` seconds, running one tick per elapsed frame period.
    ///
    /// Returns the number of frames advanced.
    #[tracing::instrument(skip(self))]
    pub fn progress(&mut self, dt: f64) -> u32 {
        if self.ctx.is_unloaded() || !dt.is_finite() || dt < 0.0 {
            return 0;
        }
        let period = self.movie.frame_period();
        let max = self.opts.max_frames_per_progress.max(1);
        if period <= 0.0 {
            self.tick(0.0);
            return 1;
        }
        self.accumulator += dt;
        let mut ticks = 0;
        // Tolerate rounding in callers that step by exactly one period.
        while self.accumulator + 1e-9 >= period && ticks < max {
            self.accumulator -= period;
            self.tick(period);
            ticks += 1;
        }
        if ticks == max && self.accumulator >= period {
            tracing::debug!(dropped = self.accumulator / period, "frame backlog dropped");
            self.accumulator = 0.0;
        }
        self.accumulator = self.accumulator.max(0.0);
        ticks
    }

    /// Render the current state. Geometry of removed instances is released first.
    #[tracing::instrument(skip_all)]
    pub fn render(&mut self, renderer: &mut dyn Renderer) -> RenderStats {
        for id in self.released.drain(..) {
            renderer.release_instance(id);
        }
        self.renderer.render(
            &self.arena,
            self.root,
            self.background,
            self.movie.stage,
            renderer,
        )
    }

    /// Collect every script object not reachable from a live instance or context root.
    ///
    /// `None` while scripts are on the stack; the request is then retried on the next frame.
    #[tracing::instrument(skip(self))]
    pub fn collect_garbage(&mut self) -> Option<GcStats> {
        let roots: Vec<ObjectRef> = self.arena.iter().filter_map(|(_, i)| i.object).collect();
        let stats = self.ctx.collect_garbage(roots)?;
        self.frames_since_gc = 0;
        self.stats.gc_runs += 1;
        tracing::debug!(
            live = stats.live,
            collected = stats.collected_last,
            "gc pass"
        );
        Some(stats)
    }

    /// Unload every instance and drop the script heap. The player is inert afterwards.
    pub fn unload(&mut self) -> GcStats {
        self.clear_timeline(self.root);
        self.run_queue();
        self.ctx.unload()
    }

    // Input.

    pub fn post_mouse_move(&mut self, x: f64, y: f64) {
        self.mouse = Point::new(x, y);
        self.broadcast(ClipEvent::MouseMove, Vec::new());
        self.update_hover();
        self.run_queue();
    }

    pub fn post_mouse_down(&mut self, x: f64, y: f64) {
        self.mouse = Point::new(x, y);
        self.broadcast(ClipEvent::MouseDown, Vec::new());
        self.update_hover();
        if let Some(target) = self.hover {
            self.pressed = Some(target);
            self.set_button_state(target, ButtonState::Down);
            self.fire_button_event(target, ButtonEvent::Press);
        }
        self.run_queue();
    }

    pub fn post_mouse_up(&mut self, x: f64, y: f64) {
        self.mouse = Point::new(x, y);
        self.broadcast(ClipEvent::MouseUp, Vec::new());
        self.update_hover();
        if let Some(target) = self.pressed.take() {
            if self.hover == Some(target) {
                self.set_button_state(target, ButtonState::Over);
                self.fire_button_event(target, ButtonEvent::Release);
            } else {
                self.set_button_state(target, ButtonState::Up);
                self.fire_button_event(target, ButtonEvent::ReleaseOutside);
            }
        }
        self.run_queue();
    }

    pub fn post_key_down(&mut self, code: u32) {
        self.broadcast(ClipEvent::KeyDown, vec![Value::Number(f64::from(code))]);
        self.run_queue();
    }

    pub fn post_key_up(&mut self, code: u32) {
        self.broadcast(ClipEvent::KeyUp, vec![Value::Number(f64::from(code))]);
        self.run_queue();
    }

    /// Topmost interactive instance under `point`, in stage coordinates.
    pub fn hit_test(&self, point: Point) -> Option<InstanceId> {
        self.arena
            .subtree(self.root)
            .into_iter()
            .rev()
            .find(|&id| self.hits(id, point))
    }

    // Frame loop.

    fn tick(&mut self, period: f64) {
        self.stats.frames += 1;
        for id in self.arena.subtree(self.root) {
            if self.arena.contains(id) {
                self.advance_timeline(id);
            }
        }
        self.run_queue();

        self.broadcast(ClipEvent::EnterFrame, Vec::new());
        self.run_queue();

        self.time_ms += period * 1000.0;
        self.ctx.notify_frame_listeners(self.time_ms);
        self.run_queue();

        self.sync_text_variables();
        self.frames_since_gc += 1;
        let interval = self.opts.gc_interval_frames;
        if self.ctx.gc_pending() || (interval > 0 && self.frames_since_gc >= interval) {
            self.collect_garbage();
        }
        tracing::trace!(
            frame = ?self.current_frame().map(|f| f.0),
            instances = self.arena.len(),
            "frame advanced"
        );
    }

    fn advance_timeline(&mut self, id: InstanceId) {
        let Some((current, playing)) = self
            .arena
            .get(id)
            .and_then(|i| i.timeline())
            .map(|t| (t.current, t.playing))
        else {
            return;
        };
        let count = self.frame_count(id);
        match current {
            _ if count == 0 => {}
            None => self.goto_frame(id, FrameIndex(0)),
            Some(_) if !playing => {}
            Some(f) if (f.0 as usize) + 1 < count => self.goto_frame(id, FrameIndex(f.0 + 1)),
            // Single-frame timelines hold instead of replaying.
            Some(_) if count > 1 => self.goto_frame(id, FrameIndex(0)),
            Some(_) => {}
        }
    }

    fn frame_count(&self, id: InstanceId) -> usize {
        self.arena.get(id).map_or(0, |i| i.frames().len())
    }

    /// Move `id`'s timeline to `target`. Backward moves clear the display list and replay
    /// from the first frame; only the target frame's actions are queued.
    fn goto_frame(&mut self, id: InstanceId, target: FrameIndex) {
        let count = self.frame_count(id);
        if count == 0 {
            return;
        }
        let target = FrameIndex(target.0.min(count as u32 - 1));
        let current = self
            .arena
            .get(id)
            .and_then(|i| i.timeline())
            .and_then(|t| t.current);
        let start = match current {
            Some(c) if c == target => return,
            Some(c) if c < target => c.0 + 1,
            Some(_) => {
                self.clear_timeline(id);
                0
            }
            None => 0,
        };
        for f in start..=target.0 {
            self.apply_frame(id, FrameIndex(f), f == target.0);
        }
    }

    fn apply_frame(&mut self, id: InstanceId, index: FrameIndex, run_actions: bool) {
        let Some((movie, source)) = self
            .arena
            .get(id)
            .and_then(|i| Some((i.movie.clone(), i.timeline()?.source)))
        else {
            return;
        };
        let Some(frame) = frames_of(&movie, source).get(index.0 as usize) else {
            return;
        };
        if let Some(t) = self.arena.get_mut(id).and_then(|i| i.timeline_mut()) {
            t.current = Some(index);
        }
        tracing::trace!(?id, frame = index.0, "enter frame");
        for tag in &frame.tags {
            match tag {
                ControlTag::Place(p) => self.place(id, &movie, p),
                ControlTag::Remove { depth } => self.remove_at(id, *depth),
                ControlTag::SetBackground { color } => {
                    if id == self.root {
                        self.background = *color;
                    }
                }
                ControlTag::DoAction { script } if run_actions => {
                    self.queue.push_back(Job::Script {
                        instance: id,
                        script: script.clone(),
                    });
                }
                ControlTag::DoAction { .. } => {}
            }
        }
    }

    fn clear_timeline(&mut self, id: InstanceId) {
        let layers = match self.arena.get_mut(id).and_then(|i| i.timeline_mut()) {
            Some(t) => {
                t.current = None;
                t.display_list.clear()
            }
            None => return,
        };
        for layer in layers {
            self.destroy(layer.instance);
        }
    }

    // Display list edits.

    /// Apply a place record: new character, replacement, or modification in place.
    fn place(&mut self, parent: InstanceId, movie: &Rc<MovieDef>, p: &PlaceObject) {
        let existing = self
            .arena
            .get(parent)
            .and_then(|i| i.display_list())
            .and_then(|l| l.get(p.depth))
            .copied();
        match (p.character, existing) {
            (Some(cid), layer) if layer.is_none_or(|l| l.character != Some(cid)) => {
                let mut inst = CharacterInstance::from_definition(movie, cid);
                inst.transform = p.matrix.unwrap_or(Affine::IDENTITY);
                if let Some(cx) = p.cxform {
                    inst.cxform = cx;
                }
                if let (Some(r), InstanceKind::MorphShape { ratio }) = (p.ratio, &mut inst.kind) {
                    *ratio = r;
                }
                inst.name = p.name.clone();
                inst.events = p
                    .events
                    .iter()
                    .map(|h| (EventMask::from_events(&h.events), h.script.clone()))
                    .collect();
                self.insert_child(parent, p.depth, inst, p.clip_depth);
            }
            (_, Some(layer)) => {
                if let Some(inst) = self.arena.get_mut(layer.instance) {
                    if let Some(m) = p.matrix {
                        inst.transform = m;
                    }
                    if let Some(cx) = p.cxform {
                        inst.cxform = cx;
                    }
                    if let (Some(r), InstanceKind::MorphShape { ratio }) =
                        (p.ratio, &mut inst.kind)
                    {
                        *ratio = r;
                    }
                }
                if p.clip_depth.is_some()
                    && let Some(l) = self
                        .arena
                        .get_mut(parent)
                        .and_then(|i| i.timeline_mut())
                        .and_then(|t| t.display_list.get_mut(p.depth))
                {
                    l.clip_depth = p.clip_depth;
                }
            }
            (_, None) => {
                tracing::trace!(depth = p.depth.0, "modify of an empty depth ignored");
            }
        }
    }

    /// Add `inst` under `parent` at `depth`, replacing any occupant, and give it a script
    /// object. Sprites enter their first frame immediately.
    fn insert_child(
        &mut self,
        parent: InstanceId,
        depth: Depth,
        mut inst: CharacterInstance,
        clip_depth: Option<Depth>,
    ) -> Option<InstanceId> {
        let nesting =
            std::iter::successors(Some(parent), |id| self.arena.get(*id).and_then(|i| i.parent))
                .count();
        if nesting >= MAX_NESTING {
            tracing::warn!(?parent, depth = depth.0, "display nesting too deep, placement skipped");
            return None;
        }
        let parent_obj = self.object_of(parent)?;
        inst.parent = Some(parent);
        inst.depth = depth;
        let character = inst.character;
        let name = inst.name.clone();
        let is_container = inst.timeline().is_some();
        let child = self.arena.insert(inst);
        self.stats.instances_created += 1;

        let replaced = self
            .arena
            .get_mut(parent)
            .and_then(|i| i.timeline_mut())
            .and_then(|t| {
                t.display_list
                    .show_object(depth, character, child, clip_depth)
            });
        if let Some(old) = replaced {
            self.destroy(old.instance);
        }

        let obj = self.ctx.new_object();
        self.ctx.set_host_handle(obj, Some(child.to_host()));
        self.set_member(obj, names::PARENT, Value::WeakObject(parent_obj));
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.set_member(obj, names::NAME, Value::String(name.as_str().into()));
            let key = self.ctx.intern(&name);
            self.set_member(parent_obj, key, Value::Object(obj));
        }
        if let Some(i) = self.arena.get_mut(child) {
            i.object = Some(obj);
        }

        self.queue_clip_event(child, ClipEvent::Init);
        if is_container {
            self.goto_frame(child, FrameIndex(0));
        }
        self.queue_clip_event(child, ClipEvent::Load);
        Some(child)
    }

    fn remove_at(&mut self, parent: InstanceId, depth: Depth) {
        let removed = self
            .arena
            .get_mut(parent)
            .and_then(|i| i.timeline_mut())
            .and_then(|t| t.display_list.remove_depth(depth));
        if let Some(layer) = removed {
            self.destroy(layer.instance);
        }
    }

    /// Script-initiated removal of a placed or attached clip. The root stays.
    fn remove_clip(&mut self, id: InstanceId) {
        let Some(parent) = self.arena.get(id).and_then(|i| i.parent) else {
            tracing::debug!(?id, "remove of root or dead clip ignored");
            return;
        };
        if let Some(t) = self.arena.get_mut(parent).and_then(|i| i.timeline_mut()) {
            t.display_list.remove_object(id);
        }
        self.destroy(id);
    }

    /// Unload `id` and its descendants and drop them from the arena.
    fn destroy(&mut self, id: InstanceId) {
        let ids = self.arena.subtree(id);
        for &i in &ids {
            for job in self.clip_event_jobs(i, ClipEvent::Unload, &[]) {
                self.run_job(job);
            }
        }

        if let Some(inst) = self.arena.get(id)
            && let (Some(name), Some(obj)) = (inst.name.clone(), inst.object)
            && let Some(parent_obj) = inst.parent.and_then(|p| self.object_of(p))
        {
            let key = self.ctx.intern(&name);
            let linked = self
                .ctx
                .get_member(parent_obj, key)
                .ok()
                .and_then(|v| v.as_object());
            if linked == Some(obj) {
                self.ctx.delete_property(
                    &Value::Object(parent_obj),
                    &Value::String(name.as_str().into()),
                );
            }
        }

        for i in ids.into_iter().rev() {
            let Some(inst) = self.arena.remove(i) else {
                continue;
            };
            if let Some(obj) = inst.object {
                self.ctx.set_host_handle(obj, None);
                self.ctx.remove_frame_listener(obj);
            }
            if self.hover == Some(i) {
                self.hover = None;
            }
            if self.pressed == Some(i) {
                self.pressed = None;
            }
            self.released.push(i);
            self.stats.instances_removed += 1;
        }
    }

    // Scripts.

    fn object_of(&self, id: InstanceId) -> Option<ObjectRef> {
        self.arena.get(id)?.object
    }

    fn set_member(&mut self, obj: ObjectRef, key: NameId, value: Value) {
        if let Err(fault) = self.ctx.set_member(obj, key, value) {
            self.ctx.report_fault(0, &fault);
        }
    }

    fn clip_event_jobs(&self, id: InstanceId, event: ClipEvent, args: &[Value]) -> Vec<Job> {
        let Some(inst) = self.arena.get(id) else {
            return Vec::new();
        };
        let mut jobs: Vec<Job> = inst
            .handlers(event)
            .map(|script| Job::Script {
                instance: id,
                script: script.clone(),
            })
            .collect();
        if let Some(name) = method_for(event) {
            jobs.push(Job::Method {
                instance: id,
                name,
                args: args.to_vec(),
            });
        }
        jobs
    }

    fn queue_clip_event(&mut self, id: InstanceId, event: ClipEvent) {
        let jobs = self.clip_event_jobs(id, event, &[]);
        self.queue.extend(jobs);
    }

    /// Queue `event` for every live instance in render order.
    fn broadcast(&mut self, event: ClipEvent, args: Vec<Value>) {
        for id in self.arena.subtree(self.root) {
            let jobs = self.clip_event_jobs(id, event, &args);
            self.queue.extend(jobs);
        }
    }

    fn run_queue(&mut self) {
        let mut budget = MAX_JOBS_PER_DRAIN;
        loop {
            self.apply_commands();
            let Some(job) = self.queue.pop_front() else {
                break;
            };
            if budget == 0 {
                tracing::warn!(dropped = self.queue.len() + 1, "script queue budget exhausted");
                self.queue.clear();
                break;
            }
            budget -= 1;
            self.run_job(job);
        }
    }

    /// Run one job. A fault halts only that script.
    fn run_job(&mut self, job: Job) {
        match job {
            Job::Script { instance, script } => {
                let Some(obj) = self.object_of(instance) else {
                    return;
                };
                let script_id = script.script_id.0;
                self.stats.scripts_run += 1;
                if let Err(fault) = self.ctx.run_script(script, Value::Object(obj), Some(obj)) {
                    self.stats.script_faults += 1;
                    self.ctx.report_fault(script_id, &fault);
                }
            }
            Job::Method {
                instance,
                name,
                args,
            } => {
                let Some(obj) = self.object_of(instance) else {
                    return;
                };
                if let Err(fault) = self.ctx.call_method(obj, name, &args) {
                    self.stats.script_faults += 1;
                    self.ctx.report_fault(0, &fault);
                }
            }
        }
    }

    fn apply_commands(&mut self) {
        for TimelineCommand { target, action } in self.ctx.drain_commands() {
            let target = match target {
                Some(handle) => InstanceId::from_host(handle),
                None => self.root,
            };
            if let TimelineAction::Remove = action {
                self.remove_clip(target);
                continue;
            }
            let Some(owner) = self.timeline_owner(target) else {
                self.ctx.host().warn(&Warning::TargetNotFound);
                continue;
            };
            match action {
                TimelineAction::Play => self.set_playing(owner, true),
                TimelineAction::Stop => self.set_playing(owner, false),
                TimelineAction::Goto(frame) => self.goto_frame(owner, frame),
                TimelineAction::Next => self.step(owner, 1),
                TimelineAction::Prev => self.step(owner, -1),
                TimelineAction::Attach {
                    export,
                    name,
                    depth,
                } => self.attach(owner, export, name, depth),
                TimelineAction::Remove => {}
            }
        }
    }

    /// Nearest container at or above `id`.
    fn timeline_owner(&self, id: InstanceId) -> Option<InstanceId> {
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            let inst = self.arena.get(c)?;
            if inst.timeline().is_some() {
                return Some(c);
            }
            cursor = inst.parent;
        }
        None
    }

    fn set_playing(&mut self, id: InstanceId, playing: bool) {
        if let Some(t) = self.arena.get_mut(id).and_then(|i| i.timeline_mut()) {
            t.playing = playing;
        }
    }

    /// Next/previous frame: move one frame and stop.
    fn step(&mut self, id: InstanceId, delta: i64) {
        let current = self
            .arena
            .get(id)
            .and_then(|i| i.timeline())
            .and_then(|t| t.current)
            .map_or(0, |f| i64::from(f.0));
        let last = self.frame_count(id) as i64 - 1;
        let target = (current + delta).clamp(0, last.max(0));
        self.set_playing(id, false);
        self.goto_frame(id, FrameIndex(target as u32));
    }

    fn attach(&mut self, parent: InstanceId, export: String, name: String, depth: Depth) {
        let Some(movie) = self.arena.get(parent).map(|i| i.movie.clone()) else {
            return;
        };
        let mut inst = match movie.export(&export) {
            Some(cid) => CharacterInstance::from_definition(&movie, cid),
            None => match self.load_external(&export) {
                Ok(sub) => CharacterInstance::root(sub),
                Err(err) => {
                    tracing::warn!(%export, error = %err, "attach failed");
                    self.ctx.host().warn(&Warning::MissingExport(export));
                    return;
                }
            },
        };
        inst.name = Some(name);
        self.insert_child(parent, depth, inst, None);
    }

    fn load_external(&mut self, url: &str) -> MarqueeResult<Rc<MovieDef>> {
        let loader = self
            .ctx
            .loader_mut()
            .ok_or_else(|| MarqueeError::load(format!("no loader for `{url}`")))?;
        let movie = loader.load(url)?;
        movie.validate()?;
        Ok(movie)
    }

    fn sync_text_variables(&mut self) {
        for id in self.arena.subtree(self.root) {
            let Some(inst) = self.arena.get(id) else {
                continue;
            };
            let Some(CharacterDef::EditText(def)) = inst.def() else {
                continue;
            };
            let (Some(var), Some(scope)) = (
                def.variable.clone(),
                inst.parent.and_then(|p| self.object_of(p)),
            ) else {
                continue;
            };
            let key = self.ctx.intern(&var);
            let value = match self.ctx.get_member(scope, key) {
                Ok(Value::Undefined) => continue,
                Ok(v) => v,
                Err(fault) => {
                    self.ctx.report_fault(0, &fault);
                    continue;
                }
            };
            let text = self.ctx.coerce_string(&value).to_string();
            if let Some(InstanceKind::EditText { text: t }) =
                self.arena.get_mut(id).map(|i| &mut i.kind)
            {
                *t = text;
            }
        }
    }

    // Buttons and hit testing.

    fn update_hover(&mut self) {
        let hit = self.hit_test(self.mouse);
        if hit == self.hover {
            return;
        }
        if let Some(old) = self.hover.take() {
            self.set_button_state(old, ButtonState::Up);
            self.fire_button_event(old, ButtonEvent::RollOut);
        }
        if let Some(new) = hit {
            let state = if self.pressed == Some(new) {
                ButtonState::Down
            } else {
                ButtonState::Over
            };
            self.set_button_state(new, state);
            self.fire_button_event(new, ButtonEvent::RollOver);
        }
        self.hover = hit;
    }

    fn set_button_state(&mut self, id: InstanceId, state: ButtonState) {
        if let Some(InstanceKind::Button { state: s }) = self.arena.get_mut(id).map(|i| &mut i.kind) {
            *s = state;
        }
    }

    /// Queue button condition actions (run in the enclosing timeline) and the matching clip
    /// event of the instance itself.
    fn fire_button_event(&mut self, id: InstanceId, event: ButtonEvent) {
        let Some(inst) = self.arena.get(id) else {
            return;
        };
        let mut jobs = Vec::new();
        if let Some(CharacterDef::Button(def)) = inst.def()
            && let Some(scope) = inst.parent.and_then(|p| self.timeline_owner(p))
        {
            jobs.extend(
                def.actions
                    .iter()
                    .filter(|a| a.on.contains(&event))
                    .map(|a| Job::Script {
                        instance: scope,
                        script: a.script.clone(),
                    }),
            );
        }
        let clip = match event {
            ButtonEvent::RollOver => Some(ClipEvent::RollOver),
            ButtonEvent::RollOut => Some(ClipEvent::RollOut),
            ButtonEvent::Press => Some(ClipEvent::Press),
            ButtonEvent::Release => Some(ClipEvent::Release),
            ButtonEvent::ReleaseOutside => None,
        };
        if let Some(clip) = clip {
            jobs.extend(self.clip_event_jobs(id, clip, &[]));
        }
        self.queue.extend(jobs);
    }

    fn hits(&self, id: InstanceId, point: Point) -> bool {
        let Some(inst) = self.arena.get(id) else {
            return false;
        };
        let pointer_events = EventMask::from_events(&[
            ClipEvent::Press,
            ClipEvent::Release,
            ClipEvent::RollOver,
            ClipEvent::RollOut,
        ]);
        let interactive = matches!(inst.kind, InstanceKind::Button { .. })
            || inst.event_mask().0 & pointer_events.0 != 0;
        if !interactive || !self.visible_chain(id) {
            return false;
        }
        let xf = self.arena.world_transform(id);
        if xf.determinant() == 0.0 {
            return false;
        }
        let local = xf.inverse() * point;
        self.bounds_of(id).is_some_and(|b| b.contains(local))
    }

    fn visible_chain(&self, id: InstanceId) -> bool {
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            let Some(inst) = self.arena.get(c) else {
                return false;
            };
            if !inst.visible {
                return false;
            }
            cursor = inst.parent;
        }
        true
    }

    /// Local bounds; containers use the union of their children.
    fn bounds_of(&self, id: InstanceId) -> Option<Rect> {
        let inst = self.arena.get(id)?;
        let Some(list) = inst.display_list() else {
            return inst.local_bounds();
        };
        list.iter()
            .filter_map(|(_, layer)| {
                let child = self.arena.get(layer.instance)?;
                let b = self.bounds_of(layer.instance)?;
                Some(child.transform.transform_rect_bbox(b))
            })
            .reduce(|a, b| a.union(b))
    }
}

fn frames_of(movie: &MovieDef, source: TimelineSource) -> &[Frame] {
    match source {
        TimelineSource::Movie => &movie.frames,
        TimelineSource::Sprite(id) => match movie.character(id) {
            Some(CharacterDef::Sprite(s)) => &s.frames,
            _ => &[],
        },
    }
}

fn method_for(event: ClipEvent) -> Option<NameId> {
    Some(match event {
        ClipEvent::Init => return None,
        ClipEvent::Load => names::ON_LOAD,
        ClipEvent::Unload => names::ON_UNLOAD,
        ClipEvent::EnterFrame => names::ON_ENTER_FRAME,
        ClipEvent::MouseDown => names::ON_MOUSE_DOWN,
        ClipEvent::MouseUp => names::ON_MOUSE_UP,
        ClipEvent::MouseMove => names::ON_MOUSE_MOVE,
        ClipEvent::KeyDown => names::ON_KEY_DOWN,
        ClipEvent::KeyUp => names::ON_KEY_UP,
        ClipEvent::Press => names::ON_PRESS,
        ClipEvent::Release => names::ON_RELEASE,
        ClipEvent::RollOver => names::ON_ROLL_OVER,
        ClipEvent::RollOut => names::ON_ROLL_OUT,
    })
}

#[cfg(test)]
#[path = "../tests/unit/player.rs"]
mod tests;
