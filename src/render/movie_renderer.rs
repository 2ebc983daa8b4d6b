use std::rc::Rc;

use crate::display::character::{
    ButtonDef, ButtonRecord, CharacterDef, EditTextDef, FontDef, ShapeDef, StaticTextDef,
};
use crate::display::cxform::ColorTransform;
use crate::display::instance::{ButtonState, InstanceArena, InstanceId, InstanceKind};
use crate::display::movie::MovieDef;
use crate::foundation::core::{Affine, CharacterId, Depth, Rect, Rgba8, Vec2};
use crate::render::renderer::{DrawShape, MeshKey, RenderOpts, Renderer};

/// Counters for one rendered frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub shapes: u64,
    pub skipped_transparent: u64,
    pub masks: u64,
    pub failures: u64,
    pub unsupported: u64,
}

/// A glyph positioned on its baseline, in the text field's local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphPlacement {
    pub glyph: u16,
    pub x: f64,
    pub y: f64,
}

/// Lay out `text` in an edit field.
///
/// Lines advance by the font's ascent plus descent at the field height, plus the field's
/// leading. Newlines only break lines in multiline fields. With word wrap, words move to the
/// next line when they would overflow the field width and the separating space is dropped.
/// Characters the font has no glyph for are skipped.
pub fn layout_edit_text(def: &EditTextDef, font: &FontDef, text: &str) -> Vec<GlyphPlacement> {
    let scale = font.scale_for(def.height);
    let line_height = (font.ascent + font.descent) * scale + def.leading;
    let max_width = def.bounds.width();
    let space = font.glyph_for(' ');
    let space_advance = space.map_or(font.em_size * 0.25, |g| font.advance(g)) * scale;

    let lines: Vec<&str> = if def.multiline {
        text.split('\n').collect()
    } else {
        vec![text]
    };
    let mut out = Vec::new();
    let mut y = def.bounds.y0 + font.ascent * scale;
    for line in lines {
        let mut x = 0.0;
        let mut line_start = true;
        for word in line.trim_end_matches('\r').split(' ') {
            let glyphs: Vec<u16> = word.chars().filter_map(|c| font.glyph_for(c)).collect();
            let width: f64 = glyphs.iter().map(|g| font.advance(*g) * scale).sum();
            if !line_start {
                if def.word_wrap && x + space_advance + width > max_width {
                    x = 0.0;
                    y += line_height;
                } else {
                    if let Some(glyph) = space {
                        out.push(GlyphPlacement {
                            glyph,
                            x: def.bounds.x0 + x,
                            y,
                        });
                    }
                    x += space_advance;
                }
            }
            for glyph in glyphs {
                out.push(GlyphPlacement {
                    glyph,
                    x: def.bounds.x0 + x,
                    y,
                });
                x += font.advance(glyph) * scale;
            }
            line_start = false;
        }
        y += line_height;
    }
    out
}

/// One entry of a depth-ordered layer run: a container child or an active button record.
#[derive(Clone, Copy, Debug)]
enum LayerNode<'a> {
    Instance(InstanceId),
    Record(&'a ButtonRecord),
}

#[derive(Clone, Copy, Debug)]
struct LayerEntry<'a> {
    depth: Depth,
    clip_depth: Option<Depth>,
    node: LayerNode<'a>,
}

/// Walks display lists in depth order and drives a [`Renderer`].
#[derive(Debug, Default)]
pub struct MovieRenderer {
    opts: RenderOpts,
    stats: RenderStats,
}

impl MovieRenderer {
    pub fn new(opts: RenderOpts) -> Self {
        Self {
            opts,
            stats: RenderStats::default(),
        }
    }

    /// Stats of the last rendered frame.
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Render `root` and everything below it as one frame.
    pub fn render(
        &mut self,
        arena: &InstanceArena,
        root: InstanceId,
        background: Rgba8,
        stage: Rect,
        renderer: &mut dyn Renderer,
    ) -> RenderStats {
        self.stats = RenderStats::default();
        renderer.begin_frame(background, stage);
        if let Some(inst) = arena.get(root) {
            self.render_container(arena, root, inst.transform, inst.cxform, renderer, false);
        }
        renderer.end_frame();
        self.stats
    }

    fn render_container(
        &mut self,
        arena: &InstanceArena,
        id: InstanceId,
        xf: Affine,
        cx: ColorTransform,
        r: &mut dyn Renderer,
        as_mask: bool,
    ) {
        let Some(list) = arena.get(id).and_then(|i| i.display_list()) else {
            return;
        };
        let entries: Vec<LayerEntry<'_>> = list
            .iter()
            .map(|(depth, layer)| LayerEntry {
                depth,
                clip_depth: layer.clip_depth,
                node: LayerNode::Instance(layer.instance),
            })
            .collect();
        self.render_layers(arena, None, &entries, xf, cx, r, as_mask);
    }

    /// Draw `entries` in order. A mask entry writes the stencil, draws the following entries
    /// up to its clip depth, then clears what it wrote.
    #[allow(clippy::too_many_arguments)]
    fn render_layers(
        &mut self,
        arena: &InstanceArena,
        movie: Option<&Rc<MovieDef>>,
        entries: &[LayerEntry<'_>],
        xf: Affine,
        cx: ColorTransform,
        r: &mut dyn Renderer,
        as_mask: bool,
    ) {
        let mut i = 0;
        while i < entries.len() {
            let entry = entries[i];
            let Some(clip) = entry.clip_depth else {
                self.render_entry(arena, movie, entry, xf, cx, r, as_mask);
                i += 1;
                continue;
            };
            let end = entries[i + 1..]
                .iter()
                .position(|e| e.depth > clip)
                .map_or(entries.len(), |p| i + 1 + p);
            if as_mask {
                // Masks nested in a mask pass contribute no coverage of their own.
                self.render_layers(arena, movie, &entries[i + 1..end], xf, cx, r, true);
                i = end;
                continue;
            }
            self.stats.masks += 1;
            r.begin_mask_write();
            self.render_entry(arena, movie, entry, xf, cx, r, true);
            r.end_mask_write();
            self.render_layers(arena, movie, &entries[i + 1..end], xf, cx, r, false);
            r.begin_mask_clear();
            self.render_entry(arena, movie, entry, xf, cx, r, true);
            r.end_mask_clear();
            i = end;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_entry(
        &mut self,
        arena: &InstanceArena,
        movie: Option<&Rc<MovieDef>>,
        entry: LayerEntry<'_>,
        xf: Affine,
        cx: ColorTransform,
        r: &mut dyn Renderer,
        as_mask: bool,
    ) {
        match entry.node {
            LayerNode::Instance(id) => self.render_instance(arena, id, xf, cx, r, as_mask),
            LayerNode::Record(record) => {
                let Some(movie) = movie else {
                    return;
                };
                let xf = xf * record.matrix;
                let cx = cx.concat(&record.cxform);
                if self.is_transparent(&cx, as_mask) {
                    return;
                }
                self.render_record(movie, record.character, xf, cx, r);
            }
        }
    }

    fn is_transparent(&mut self, cx: &ColorTransform, as_mask: bool) -> bool {
        if !as_mask && cx.alpha() < self.opts.alpha_epsilon {
            self.stats.skipped_transparent += 1;
            return true;
        }
        false
    }

    fn render_instance(
        &mut self,
        arena: &InstanceArena,
        id: InstanceId,
        xf: Affine,
        cx: ColorTransform,
        r: &mut dyn Renderer,
        as_mask: bool,
    ) {
        let Some(inst) = arena.get(id) else {
            return;
        };
        if !inst.visible && !as_mask {
            return;
        }
        let xf = xf * inst.transform;
        let cx = cx.concat(&inst.cxform);
        if self.is_transparent(&cx, as_mask) {
            return;
        }
        let movie = &inst.movie;
        match (&inst.kind, inst.def()) {
            (InstanceKind::Sprite(_), _) => self.render_container(arena, id, xf, cx, r, as_mask),
            (InstanceKind::Shape, Some(CharacterDef::Shape(shape))) => {
                let key = character_key(movie, inst.character);
                self.draw(r, key, 0, shape, xf, cx);
            }
            (InstanceKind::MorphShape { ratio }, Some(CharacterDef::MorphShape(morph))) => {
                let shape = morph.interpolate(*ratio);
                self.draw(r, MeshKey::Instance(id), ratio.to_bits(), &shape, xf, cx);
            }
            (InstanceKind::StaticText, Some(CharacterDef::StaticText(text))) => {
                self.render_static_text(movie, text, xf, cx, r);
            }
            (InstanceKind::EditText { text }, Some(CharacterDef::EditText(def))) => {
                self.render_edit_text(movie, def, text, xf, cx, r);
            }
            (InstanceKind::Button { state }, Some(CharacterDef::Button(button))) => {
                self.render_button(arena, movie, button, *state, xf, cx, r, as_mask);
            }
            _ => {
                self.stats.unsupported += 1;
                tracing::trace!(?id, "instance has nothing to draw");
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_button(
        &mut self,
        arena: &InstanceArena,
        movie: &Rc<MovieDef>,
        button: &ButtonDef,
        state: ButtonState,
        xf: Affine,
        cx: ColorTransform,
        r: &mut dyn Renderer,
        as_mask: bool,
    ) {
        let active = state.states();
        let mut entries: Vec<LayerEntry<'_>> = button
            .records
            .iter()
            .rev()
            .filter(|rec| rec.states.intersects(active))
            .map(|rec| LayerEntry {
                depth: rec.depth,
                clip_depth: rec.clip_depth,
                node: LayerNode::Record(rec),
            })
            .collect();
        entries.sort_by_key(|e| e.depth);
        self.render_layers(arena, Some(movie), &entries, xf, cx, r, as_mask);
    }

    /// Draw a button record's character straight from its definition.
    fn render_record(
        &mut self,
        movie: &Rc<MovieDef>,
        id: CharacterId,
        xf: Affine,
        cx: ColorTransform,
        r: &mut dyn Renderer,
    ) {
        match movie.character(id) {
            Some(CharacterDef::Shape(shape)) => {
                self.draw(r, character_key(movie, Some(id)), 0, shape, xf, cx);
            }
            Some(CharacterDef::MorphShape(morph)) => {
                self.draw(r, character_key(movie, Some(id)), 0, &morph.start, xf, cx);
            }
            Some(CharacterDef::StaticText(text)) => self.render_static_text(movie, text, xf, cx, r),
            Some(CharacterDef::EditText(def)) => {
                self.render_edit_text(movie, def, &def.initial_text, xf, cx, r);
            }
            other => {
                self.stats.unsupported += 1;
                tracing::trace!(
                    id = id.0,
                    kind = other.map(CharacterDef::kind_name),
                    "button record has nothing to draw"
                );
            }
        }
    }

    fn render_static_text(
        &mut self,
        movie: &Rc<MovieDef>,
        text: &StaticTextDef,
        xf: Affine,
        cx: ColorTransform,
        r: &mut dyn Renderer,
    ) {
        let base = xf * text.matrix;
        for record in &text.records {
            let Some(CharacterDef::Font(font)) = movie.character(record.font) else {
                self.stats.unsupported += 1;
                continue;
            };
            let scale = font.scale_for(record.height);
            let tint = cx.concat(&ColorTransform::tint(record.color));
            let mut pen = record.x;
            for &glyph in &record.glyphs {
                let at = base * Affine::translate(Vec2::new(pen, record.y)) * Affine::scale(scale);
                self.draw_glyph(r, movie, record.font, font, glyph, at, tint);
                pen += font.advance(glyph) * scale;
            }
        }
    }

    fn render_edit_text(
        &mut self,
        movie: &Rc<MovieDef>,
        def: &EditTextDef,
        text: &str,
        xf: Affine,
        cx: ColorTransform,
        r: &mut dyn Renderer,
    ) {
        let Some(CharacterDef::Font(font)) = movie.character(def.font) else {
            self.stats.unsupported += 1;
            return;
        };
        let scale = font.scale_for(def.height);
        let tint = cx.concat(&ColorTransform::tint(def.color));
        for g in layout_edit_text(def, font, text) {
            let at = xf * Affine::translate(Vec2::new(g.x, g.y)) * Affine::scale(scale);
            self.draw_glyph(r, movie, def.font, font, g.glyph, at, tint);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_glyph(
        &mut self,
        r: &mut dyn Renderer,
        movie: &Rc<MovieDef>,
        font_id: CharacterId,
        font: &FontDef,
        glyph: u16,
        xf: Affine,
        cx: ColorTransform,
    ) {
        let Some(shape) = font.glyph_shape(glyph) else {
            return;
        };
        let key = MeshKey::Glyph {
            movie: movie_key(movie),
            font: font_id,
            glyph,
        };
        self.draw(r, key, 0, shape, xf, cx);
    }

    fn draw(
        &mut self,
        r: &mut dyn Renderer,
        key: MeshKey,
        revision: u64,
        shape: &ShapeDef,
        transform: Affine,
        cxform: ColorTransform,
    ) {
        let draw = DrawShape {
            key,
            revision,
            shape,
            transform,
            cxform,
        };
        match r.draw_shape(&draw) {
            Ok(()) => self.stats.shapes += 1,
            Err(err) => {
                self.stats.failures += 1;
                tracing::warn!(?key, error = %err, "shape skipped for this frame");
            }
        }
    }
}

fn movie_key(movie: &Rc<MovieDef>) -> usize {
    Rc::as_ptr(movie) as usize
}

fn character_key(movie: &Rc<MovieDef>, id: Option<CharacterId>) -> MeshKey {
    MeshKey::Character {
        movie: movie_key(movie),
        id: id.unwrap_or(CharacterId(0)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/movie_renderer.rs"]
mod tests;
