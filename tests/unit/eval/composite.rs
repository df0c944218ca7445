use super::*;

fn s(color: f32, alpha: f32) -> PixelSample {
    PixelSample::new(color, alpha)
}

#[test]
fn transparent_source_keeps_destination() {
    let dst = s(0.3, 0.7);
    assert_eq!(over(dst, PixelSample::TRANSPARENT), dst);
}

#[test]
fn opaque_source_replaces_destination() {
    assert_eq!(over(s(0.3, 0.7), s(0.9, 1.0)), s(0.9, 1.0));
}

#[test]
fn half_alpha_blend() {
    let out = over(s(0.0, 1.0), s(1.0, 0.5));
    assert!((out.alpha - 1.0).abs() < 1e-6);
    assert!((out.color - 0.5).abs() < 1e-6);
}

#[test]
fn composite_pixel_inverts_the_transform_layer() {
    // Black transform sample over a black base reads as white.
    let out = composite_pixel(s(0.0, 1.0), s(0.0, 1.0));
    assert_eq!(out, s(1.0, 1.0));
    // Zero-alpha transform: base unchanged.
    let base = s(0.0, 0.8);
    assert_eq!(composite_pixel(base, s(0.0, 0.0)), base);
}

#[test]
fn inversion_commutes_with_over() {
    let a = s(0.2, 0.6);
    let b = s(0.9, 0.3);
    let lhs = over(a, b).inverted();
    let rhs = over(a.inverted(), b.inverted());
    assert!((lhs.color - rhs.color).abs() < 1e-6);
    assert!((lhs.alpha - rhs.alpha).abs() < 1e-6);
}

#[test]
fn overlap_rules_differ_on_partial_overlap() {
    let early = s(0.0, 0.9);
    let late = s(1.0, 0.4);
    let fold = |rule| {
        let acc = accumulate_copy(PixelSample::TRANSPARENT, early, rule);
        accumulate_copy(acc, late, rule)
    };
    let draw = fold(OverlapRule::DrawOrder);
    let max = fold(OverlapRule::MaxAlpha);
    assert_eq!(max, early);
    assert!(draw.color > 0.0 && draw.alpha > early.alpha);
}

#[test]
fn overlap_rules_agree_on_opaque_disjoint_copies() {
    let copies = [s(0.0, 0.0), s(1.0, 1.0), s(0.0, 0.0)];
    let fold = |rule| {
        copies
            .iter()
            .fold(PixelSample::TRANSPARENT, |acc, c| accumulate_copy(acc, *c, rule))
    };
    assert_eq!(fold(OverlapRule::DrawOrder), fold(OverlapRule::MaxAlpha));
}

#[test]
fn average_weights_color_by_alpha() {
    let out = average([s(1.0, 1.0), s(0.0, 0.0), s(0.0, 0.0), s(0.0, 0.0)]);
    assert!((out.alpha - 0.25).abs() < 1e-6);
    assert!((out.color - 1.0).abs() < 1e-6);
    assert_eq!(average(std::iter::empty()), PixelSample::TRANSPARENT);
}
