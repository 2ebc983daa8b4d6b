use super::*;

#[test]
fn identity_is_neutral() {
    let c = ColorTransform {
        mult: [0.5, 1.0, 1.0, 0.25],
        add: [0.1, 0.0, 0.0, 0.0],
    };
    assert_eq!(ColorTransform::IDENTITY.concat(&c), c);
    assert_eq!(c.concat(&ColorTransform::IDENTITY), c);
    assert_eq!(ColorTransform::default().apply([0.2, 0.4, 0.6, 0.8]), [0.2, 0.4, 0.6, 0.8]);
}

#[test]
fn composition_multiplies_then_adds_and_clamps() {
    let outer = ColorTransform {
        mult: [2.0, 0.5, 1.0, 1.0],
        add: [0.0, 0.0, 0.9, 0.0],
    };
    let inner = ColorTransform {
        mult: [0.75, 1.0, 1.0, 1.0],
        add: [0.0, 0.0, 0.5, 0.0],
    };
    let c = outer.concat(&inner);
    assert_eq!(c.mult, [1.0, 0.5, 1.0, 1.0]);
    assert_eq!(c.add[2], 1.0);
}

#[test]
fn apply_clamps_channels() {
    let c = ColorTransform {
        mult: [1.0; 4],
        add: [0.5, -0.5, 0.0, 0.0],
    };
    assert_eq!(c.apply([0.8, 0.2, 0.5, 1.0]), [1.0, 0.0, 0.5, 1.0]);
}

#[test]
fn tint_and_alpha() {
    let c = ColorTransform::tint(Rgba8::new(255, 0, 0, 128));
    assert_eq!(c.apply_rgba8(Rgba8::WHITE), Rgba8::new(255, 0, 0, 128));
    let faded = ColorTransform {
        mult: [1.0, 1.0, 1.0, 0.0],
        add: [0.0; 4],
    };
    assert_eq!(faded.alpha(), 0.0);
    assert!(!faded.is_identity());
}
