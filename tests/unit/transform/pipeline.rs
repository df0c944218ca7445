use super::*;

/// Small deterministic generator so the sweep is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 11) as f64) / ((1u64 << 53) as f64)
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

fn params(scale: f64, rotation: f64, radial_count: u32, radial_radius: f64) -> NodeParams {
    NodeParams {
        scale,
        radial_radius,
        radial_count,
        rotation,
    }
}

#[test]
fn forward_inverse_roundtrip_sweep() {
    let mut rng = Lcg(0x1234_5678);
    for &count in &[0u32, 1, 2, 6] {
        for _ in 0..200 {
            let scale = rng.range(1e-3, 10.0);
            let rotation = rng.range(0.0, 360.0);
            let radius = rng.range(0.0, 5.0);
            let t = NodeTransform::new(params(scale, rotation, count, radius));
            for copy in 0..t.copy_count() {
                let p = Point::new(rng.range(-3.0, 3.0), rng.range(-3.0, 3.0));
                let there = t.forward(p, copy);
                let back = t.inverse(there, copy).unwrap();
                assert!(
                    (back - p).hypot() < 1e-4,
                    "inverse(forward) drift: count={count} copy={copy} p={p:?} back={back:?}"
                );
                let q = t.forward(t.inverse(p, copy).unwrap(), copy);
                assert!(
                    (q - p).hypot() < 1e-4,
                    "forward(inverse) drift: count={count} copy={copy}"
                );
            }
        }
    }
}

#[test]
fn first_copy_sits_at_the_top() {
    let t = NodeTransform::new(params(0.3, 0.0, 4, 0.6));
    let c0 = t.forward(Point::ZERO, 0);
    assert!(c0.x.abs() < 1e-12 && (c0.y + 0.6).abs() < 1e-12);
    // Clockwise on screen: second copy to the right.
    let c1 = t.forward(Point::ZERO, 1);
    assert!((c1.x - 0.6).abs() < 1e-12 && c1.y.abs() < 1e-12);
    let c2 = t.forward(Point::ZERO, 2);
    assert!((c2.y - 0.6).abs() < 1e-12);
}

#[test]
fn non_radial_has_one_copy_and_ignores_radius() {
    let t = NodeTransform::new(params(2.0, 90.0, 0, 3.0));
    assert_eq!(t.copy_count(), 1);
    assert_eq!(t.copy_offset(0), Vec2::ZERO);
    let p = t.forward(Point::new(1.0, 0.0), 0);
    assert!(p.x.abs() < 1e-12 && (p.y - 2.0).abs() < 1e-12);
}

#[test]
fn single_copy_has_no_self_rotation() {
    let t = NodeTransform::new(params(1.0, 0.0, 1, 1.0));
    // Offset to the top, orientation untouched.
    let p = t.forward(Point::new(0.5, 0.0), 0);
    assert!((p.x - 0.5).abs() < 1e-12 && (p.y + 1.0).abs() < 1e-12);
}

#[test]
fn copies_self_rotate_by_their_angle() {
    let t = NodeTransform::new(params(1.0, 0.0, 4, 0.0));
    // Copy 1 is rotated 90° clockwise on screen: +x maps to +y.
    let p = t.forward(Point::new(1.0, 0.0), 1);
    assert!(p.x.abs() < 1e-12 && (p.y - 1.0).abs() < 1e-12);
}

#[test]
fn zero_scale_is_not_invertible() {
    let t = NodeTransform::new(params(0.0, 0.0, 3, 1.0));
    assert!(t.inverse(Point::new(0.1, 0.1), 0).is_none());
    assert!(t.copies().iter().all(|c| c.inverse.is_none()));
}

#[test]
fn precomputed_copies_match_direct_math() {
    let t = NodeTransform::new(params(0.7, 33.0, 6, 1.5));
    let copies = t.copies();
    assert_eq!(copies.len(), 6);
    let p = Point::new(0.25, -0.4);
    for c in &copies {
        assert!((c.forward * p - t.forward(p, c.index)).hypot() < 1e-12);
        let inv = c.inverse.unwrap();
        assert!((inv * p - t.inverse(p, c.index).unwrap()).hypot() < 1e-12);
    }
}
