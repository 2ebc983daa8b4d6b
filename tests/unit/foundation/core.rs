use super::*;

#[test]
fn depth_next_saturates() {
    assert_eq!(Depth(4).next(), Depth(5));
    assert_eq!(Depth(i32::MAX).next(), Depth(i32::MAX));
}

#[test]
fn rgba_lerp_endpoints_and_midpoint() {
    let a = Rgba8::new(0, 0, 0, 0);
    let b = Rgba8::new(200, 100, 50, 255);
    assert_eq!(a.lerp(b, 0.0), a);
    assert_eq!(a.lerp(b, 1.0), b);
    assert_eq!(a.lerp(b, 0.5), Rgba8::new(100, 50, 25, 128));
}

#[test]
fn lerp_affine_identity_to_translation() {
    let t = lerp_affine(
        Affine::IDENTITY,
        Affine::translate(Vec2::new(10.0, -4.0)),
        0.5,
    );
    assert_eq!(t, Affine::translate(Vec2::new(5.0, -2.0)));
}
