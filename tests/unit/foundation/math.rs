use super::*;

#[test]
fn stable_hash_is_deterministic() {
    let mut a = StableHasher::new();
    a.write_u32(7);
    a.write_opt_u32(None);
    a.write_f64(0.5);
    let mut b = StableHasher::new();
    b.write_u32(7);
    b.write_opt_u32(None);
    b.write_f64(0.5);
    assert_eq!(a.finish(), b.finish());

    let mut c = StableHasher::new();
    c.write_u32(7);
    c.write_opt_u32(Some(0));
    c.write_f64(0.5);
    let mut d = StableHasher::new();
    d.write_u32(7);
    d.write_opt_u32(None);
    d.write_f64(0.5);
    assert_ne!(c.finish(), d.finish());
}

#[test]
fn coverage_is_half_on_the_edge() {
    assert!((coverage(0.0, 0.1) - 0.5).abs() < 1e-6);
    assert_eq!(coverage(-1.0, 0.1), 1.0);
    assert_eq!(coverage(1.0, 0.1), 0.0);
    assert_eq!(coverage(0.0, 0.0), 1.0);
}

#[test]
fn unit_to_u8_clamps() {
    assert_eq!(unit_to_u8(-1.0), 0);
    assert_eq!(unit_to_u8(0.5), 128);
    assert_eq!(unit_to_u8(2.0), 255);
}
