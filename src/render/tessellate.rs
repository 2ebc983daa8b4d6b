use std::cmp::Ordering;

use crate::display::character::ShapeDef;
use crate::foundation::core::{BezPath, PathEl, Point, Rect};
use crate::render::device::Primitive;

// Geometry closer than this is treated as coincident.
const EPS: f64 = 1e-9;
// Above this many edges per fill, self-intersections are not split out.
const MAX_CROSSING_EDGES: usize = 4096;

/// Which style of the source shape a geometry group is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleRef {
    Fill(usize),
    Line(usize),
}

/// Vertices for one style: triangle lists or line pairs.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleGeometry {
    pub style: StyleRef,
    pub primitive: Primitive,
    pub points: Vec<Point>,
}

/// CPU-side geometry for a shape, in the shape's local space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tessellation {
    pub groups: Vec<StyleGeometry>,
    pub bounds: Rect,
}

impl Tessellation {
    pub fn triangle_count(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| g.primitive == Primitive::Triangles)
            .map(|g| g.points.len() / 3)
            .sum()
    }

    pub fn line_count(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| g.primitive == Primitive::Lines)
            .map(|g| g.points.len() / 2)
            .sum()
    }

    /// Vertex slots needed to upload every group.
    pub fn vertex_count(&self) -> usize {
        self.groups.iter().map(|g| g.points.len()).sum()
    }
}

/// Flatten every path of `shape` and triangulate fills (even-odd) and strokes.
///
/// Strokes become one quad per flattened segment without joins or caps; zero-width strokes
/// become hairline segments.
pub fn tessellate(shape: &ShapeDef, tolerance: f64) -> Tessellation {
    let tolerance = if tolerance.is_finite() && tolerance > 0.0 {
        tolerance
    } else {
        0.25
    };
    let mut groups = Vec::new();
    for p in &shape.paths {
        let contours = flatten_contours(&p.path, tolerance);
        if let Some(fill) = p.fill
            && fill < shape.fill_styles.len()
        {
            let points = fill_triangles(&contours);
            if !points.is_empty() {
                groups.push(StyleGeometry {
                    style: StyleRef::Fill(fill),
                    primitive: Primitive::Triangles,
                    points,
                });
            }
        }
        if let Some(line) = p.line
            && let Some(style) = shape.line_styles.get(line)
        {
            let (primitive, points) = stroke(&contours, style.width);
            if !points.is_empty() {
                groups.push(StyleGeometry {
                    style: StyleRef::Line(line),
                    primitive,
                    points,
                });
            }
        }
    }
    let bounds = groups
        .iter()
        .flat_map(|g| g.points.iter().copied())
        .fold(None, |acc: Option<Rect>, p| {
            Some(acc.map_or(Rect::from_points(p, p), |r| r.union_pt(p)))
        })
        .unwrap_or(Rect::ZERO);
    Tessellation { groups, bounds }
}

/// A flattened subpath. `closed` contours repeat their first point at the end.
#[derive(Clone, Debug, Default)]
struct Contour {
    points: Vec<Point>,
}

fn flatten_contours(path: &BezPath, tolerance: f64) -> Vec<Contour> {
    let mut contours = Vec::new();
    let mut current = Contour::default();
    kurbo::flatten(path.iter(), tolerance, |el| match el {
        PathEl::MoveTo(p) => {
            if current.points.len() > 1 {
                contours.push(std::mem::take(&mut current));
            }
            current.points.clear();
            current.points.push(p);
        }
        PathEl::LineTo(p) => {
            if current.points.last() != Some(&p) {
                current.points.push(p);
            }
        }
        PathEl::ClosePath => {
            if let Some(first) = current.points.first().copied()
                && current.points.len() > 1
                && current.points.last() != Some(&first)
            {
                current.points.push(first);
            }
        }
        // Flattening only emits line segments.
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
    });
    if current.points.len() > 1 {
        contours.push(current);
    }
    contours
}

#[derive(Clone, Copy, Debug)]
struct Edge {
    top: Point,
    bottom: Point,
}

impl Edge {
    fn new(a: Point, b: Point) -> Option<Self> {
        match a.y.partial_cmp(&b.y)? {
            Ordering::Less => Some(Self { top: a, bottom: b }),
            Ordering::Greater => Some(Self { top: b, bottom: a }),
            Ordering::Equal => None,
        }
    }

    fn x_at(&self, y: f64) -> f64 {
        let t = (y - self.top.y) / (self.bottom.y - self.top.y);
        self.top.x + (self.bottom.x - self.top.x) * t
    }

    fn spans(&self, y: f64) -> bool {
        self.top.y < y && y < self.bottom.y
    }

    /// Height at which two edges strictly cross, if they do.
    fn crossing_y(&self, other: &Edge) -> Option<f64> {
        let lo = self.top.y.max(other.top.y);
        let hi = self.bottom.y.min(other.bottom.y);
        if hi - lo <= EPS {
            return None;
        }
        let d0 = self.x_at(lo) - other.x_at(lo);
        let d1 = self.x_at(hi) - other.x_at(hi);
        if d0 * d1 >= 0.0 {
            return None;
        }
        Some(lo + (hi - lo) * (d0 / (d0 - d1)))
    }
}

/// Trapezoidal sweep: split at every vertex and crossing height, then pair the active edges
/// of each slab left to right (even-odd). Spans that continue an edge of the slab above grow
/// the same y-monotone region; each region is triangulated once it closes.
fn fill_triangles(contours: &[Contour]) -> Vec<Point> {
    let mut edges = Vec::new();
    for c in contours {
        let n = c.points.len();
        if n < 3 {
            continue;
        }
        for i in 0..n {
            let a = c.points[i];
            let b = c.points[(i + 1) % n];
            if let Some(e) = Edge::new(a, b) {
                edges.push(e);
            }
        }
    }
    if edges.len() < 2 {
        return Vec::new();
    }

    let mut ys: Vec<f64> = edges.iter().flat_map(|e| [e.top.y, e.bottom.y]).collect();
    if edges.len() <= MAX_CROSSING_EDGES {
        for (i, a) in edges.iter().enumerate() {
            for b in &edges[i + 1..] {
                if let Some(y) = a.crossing_y(b) {
                    ys.push(y);
                }
            }
        }
    }
    ys.sort_by(f64::total_cmp);
    ys.dedup_by(|a, b| (*a - *b).abs() <= EPS);

    let mut out = Vec::new();
    let mut open: Vec<Region> = Vec::new();
    let mut active: Vec<(f64, usize)> = Vec::new();
    for w in ys.windows(2) {
        let (y0, y1) = (w[0], w[1]);
        let ym = (y0 + y1) * 0.5;
        active.clear();
        active.extend(
            edges
                .iter()
                .enumerate()
                .filter(|(_, e)| e.spans(ym))
                .map(|(i, e)| (e.x_at(ym), i)),
        );
        active.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut above = std::mem::take(&mut open);
        for pair in active.chunks_exact(2) {
            let (l, r) = (pair[0].1, pair[1].1);
            let (el, er) = (&edges[l], &edges[r]);
            let (tl, tr) = (Point::new(el.x_at(y0), y0), Point::new(er.x_at(y0), y0));
            let mut region =
                Region::continue_from(&mut above, (l, r), (tl, tr)).unwrap_or_default();
            region.left.extend(l, tl, Point::new(el.x_at(y1), y1));
            region.right.extend(r, tr, Point::new(er.x_at(y1), y1));
            open.push(region);
        }
        for region in above {
            region.triangulate(&mut out);
        }
    }
    for region in open {
        region.triangulate(&mut out);
    }
    out
}

fn near(a: Point, b: Point) -> bool {
    (a - b).hypot() <= EPS
}

/// One side of a y-monotone region, top to bottom.
#[derive(Debug, Default)]
struct Chain {
    points: Vec<Point>,
    edge: Option<usize>,
}

impl Chain {
    fn extend(&mut self, edge: usize, top: Point, bottom: Point) {
        if self.edge == Some(edge)
            && let Some(last) = self.points.last_mut()
        {
            *last = bottom;
            return;
        }
        if self.points.last().is_none_or(|p| !near(*p, top)) {
            self.points.push(top);
        }
        self.points.push(bottom);
        self.edge = Some(edge);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Default)]
struct Region {
    left: Chain,
    right: Chain,
}

impl Region {
    /// Takes the region above that the span with edges `(l, r)` and top corners `(tl, tr)`
    /// extends: same edges, then either shared edge, then a bottom that meets the span's top.
    fn continue_from(
        above: &mut Vec<Region>,
        (l, r): (usize, usize),
        (tl, tr): (Point, Point),
    ) -> Option<Region> {
        let pos = above
            .iter()
            .position(|g| g.left.edge == Some(l) && g.right.edge == Some(r))
            .or_else(|| above.iter().position(|g| g.left.edge == Some(l)))
            .or_else(|| above.iter().position(|g| g.right.edge == Some(r)))
            .or_else(|| {
                if tr.x - tl.x <= EPS {
                    return None;
                }
                above.iter().position(|g| {
                    g.left.points.last().is_some_and(|p| near(*p, tl))
                        && g.right.points.last().is_some_and(|p| near(*p, tr))
                })
            })?;
        Some(above.swap_remove(pos))
    }

    /// Monotone stack triangulation; a simple n-vertex region yields n - 2 triangles.
    fn triangulate(self, out: &mut Vec<Point>) {
        let left = self.left.points;
        let mut right = self.right.points;
        if let (Some(a), Some(b)) = (left.first(), right.first())
            && near(*a, *b)
        {
            right.remove(0);
        }
        if let (Some(a), Some(b)) = (left.last(), right.last())
            && near(*a, *b)
        {
            right.pop();
        }

        let mut u = Vec::with_capacity(left.len() + right.len());
        let (mut i, mut j) = (0, 0);
        while i < left.len() || j < right.len() {
            if j >= right.len() || (i < left.len() && left[i].y <= right[j].y) {
                u.push((left[i], Side::Left));
                i += 1;
            } else {
                u.push((right[j], Side::Right));
                j += 1;
            }
        }
        let n = u.len();
        if n < 3 {
            return;
        }

        let mut stack = vec![u[0], u[1]];
        for k in 2..n - 1 {
            let (p, side) = u[k];
            let Some(&(_, top_side)) = stack.last() else {
                break;
            };
            if side != top_side {
                for w in stack.windows(2) {
                    push_triangle(out, p, w[0].0, w[1].0);
                }
                stack.clear();
                stack.push(u[k - 1]);
            } else if let Some(mut last) = stack.pop() {
                while let Some(&top) = stack.last() {
                    let c = (p - top.0).cross(last.0 - top.0);
                    let inside = match side {
                        Side::Left => c > EPS,
                        Side::Right => c < -EPS,
                    };
                    if !inside {
                        break;
                    }
                    push_triangle(out, p, last.0, top.0);
                    last = top;
                    stack.pop();
                }
                stack.push(last);
            }
            stack.push(u[k]);
        }
        let p = u[n - 1].0;
        for w in stack.windows(2) {
            push_triangle(out, p, w[0].0, w[1].0);
        }
    }
}

fn push_triangle(out: &mut Vec<Point>, a: Point, b: Point, c: Point) {
    if (b - a).cross(c - a).abs() > EPS {
        out.extend([a, b, c]);
    }
}

fn stroke(contours: &[Contour], width: f64) -> (Primitive, Vec<Point>) {
    let mut out = Vec::new();
    if width <= 0.0 || !width.is_finite() {
        for c in contours {
            for seg in c.points.windows(2) {
                out.extend([seg[0], seg[1]]);
            }
        }
        return (Primitive::Lines, out);
    }
    let half = width * 0.5;
    for c in contours {
        for seg in c.points.windows(2) {
            let (a, b) = (seg[0], seg[1]);
            let d = b - a;
            let len = d.hypot();
            if len <= EPS {
                continue;
            }
            let n = kurbo::Vec2::new(-d.y, d.x) * (half / len);
            let (p0, p1, p2, p3) = (a + n, b + n, b - n, a - n);
            out.extend([p0, p1, p2, p0, p2, p3]);
        }
    }
    (Primitive::Triangles, out)
}

#[cfg(test)]
#[path = "../../tests/unit/render/tessellate.rs"]
mod tests;
