use super::*;
use crate::display::character::{FillStyle, LineStyle, ShapePath};
use crate::foundation::core::Rgba8;

fn shape(d: &str, fill: bool, line_width: Option<f64>) -> ShapeDef {
    ShapeDef {
        fill_styles: vec![FillStyle::Solid {
            color: Rgba8::BLACK,
        }],
        line_styles: line_width
            .map(|width| LineStyle {
                width,
                color: Rgba8::BLACK,
            })
            .into_iter()
            .collect(),
        paths: vec![ShapePath {
            fill: fill.then_some(0),
            line: line_width.map(|_| 0),
            path: BezPath::from_svg(d).unwrap(),
        }],
    }
}

/// Sum of absolute triangle areas.
fn area(points: &[Point]) -> f64 {
    points
        .chunks_exact(3)
        .map(|t| ((t[1] - t[0]).cross(t[2] - t[0])).abs() * 0.5)
        .sum()
}

#[test]
fn single_triangle_yields_one_triangle() {
    let t = tessellate(&shape("M0,0 L10,0 L0,10 Z", true, None), 0.25);
    assert_eq!(t.groups.len(), 1);
    assert_eq!(t.triangle_count(), 1);
    assert_eq!(t.line_count(), 0);
    assert_eq!(t.bounds, Rect::new(0.0, 0.0, 10.0, 10.0));
}

#[test]
fn slanted_triangle_is_not_split_at_its_middle_vertex() {
    let t = tessellate(&shape("M0,0 L10,5 L0,10 Z", true, None), 0.25);
    assert_eq!(t.triangle_count(), 1);
    assert!((area(&t.groups[0].points) - 50.0).abs() < 1e-9);
}

#[test]
fn simple_polygons_yield_n_minus_two_triangles() {
    // Concave chevron: the notch vertex shares a height with the tip.
    let t = tessellate(&shape("M0,0 L10,5 L0,10 L4,5 Z", true, None), 0.25);
    assert_eq!(t.triangle_count(), 2);
    assert!((area(&t.groups[0].points) - 30.0).abs() < 1e-9);

    // Pentagon with every vertex at a different height.
    let t = tessellate(&shape("M5,0 L10,4 L8,10 L2,9 L0,3 Z", true, None), 0.25);
    assert_eq!(t.triangle_count(), 3);
    assert!((area(&t.groups[0].points) - 65.5).abs() < 1e-9);
}

#[test]
fn stroked_segment_is_one_quad() {
    let t = tessellate(&shape("M0,0 L10,0", false, Some(2.0)), 0.25);
    assert_eq!(t.groups.len(), 1);
    assert_eq!(t.groups[0].primitive, Primitive::Triangles);
    assert_eq!(t.groups[0].points.len(), 6);
    assert_eq!(t.bounds, Rect::new(0.0, -1.0, 10.0, 1.0));
    assert!((area(&t.groups[0].points) - 20.0).abs() < 1e-9);
}

#[test]
fn hairlines_are_line_pairs() {
    let t = tessellate(&shape("M0,0 L10,0 L10,10", false, Some(0.0)), 0.25);
    assert_eq!(t.line_count(), 2);
    assert_eq!(t.triangle_count(), 0);
    assert_eq!(t.vertex_count(), 4);
}

#[test]
fn square_covers_its_area() {
    let t = tessellate(&shape("M0,0 L10,0 L10,10 L0,10 Z", true, None), 0.25);
    assert_eq!(t.triangle_count(), 2);
    assert!((area(&t.groups[0].points) - 100.0).abs() < 1e-9);
}

#[test]
fn even_odd_leaves_holes_empty() {
    let t = tessellate(
        &shape(
            "M0,0 L10,0 L10,10 L0,10 Z M3,3 L7,3 L7,7 L3,7 Z",
            true,
            None,
        ),
        0.25,
    );
    assert!((area(&t.groups[0].points) - 84.0).abs() < 1e-9);
}

#[test]
fn self_intersecting_bowtie_splits_at_the_crossing() {
    // Two triangles meeting at (5,5).
    let t = tessellate(&shape("M0,0 L10,0 L0,10 L10,10 Z", true, None), 0.25);
    assert!((area(&t.groups[0].points) - 50.0).abs() < 1e-9);
}

#[test]
fn curves_are_flattened_within_tolerance() {
    let t = tessellate(&shape("M0,0 Q50,100 100,0 Z", true, None), 0.1);
    assert!(t.triangle_count() > 4);
    // Exact area under the parabola is 2/3 * 100 * 50.
    let a = area(&t.groups[0].points);
    assert!((a - 10000.0 / 3.0).abs() < 30.0, "area {a}");
    assert!(t.bounds.y1 <= 50.0 + 1e-9);
}

#[test]
fn open_and_degenerate_paths_produce_nothing() {
    let t = tessellate(&shape("M0,0 L10,0", true, None), 0.25);
    assert!(t.groups.is_empty());
    assert_eq!(t.bounds, Rect::ZERO);
}
