use super::*;

#[test]
fn inversion_keeps_alpha() {
    let s = PixelSample::new(0.25, 0.6);
    let inv = s.inverted();
    assert!((inv.color - 0.75).abs() < 1e-6);
    assert_eq!(inv.alpha, 0.6);
    assert_eq!(inv.inverted(), s);
}

#[test]
fn viewport_maps_center_to_origin() {
    let v = Viewport::new(100, 50, 2.0).unwrap();
    let c = v.raster_to_world(50.0, 25.0);
    assert!(c.x.abs() < 1e-12 && c.y.abs() < 1e-12);
    // Shorter side spans [-extent, extent].
    let top = v.raster_to_world(50.0, 0.0);
    assert!((top.y + 2.0).abs() < 1e-12);
}

#[test]
fn viewport_world_raster_roundtrip() {
    let v = Viewport::new(64, 48, 1.25).unwrap();
    let p = Point::new(0.3, -0.7);
    let back = v.raster_to_world(v.world_to_raster(p).x, v.world_to_raster(p).y);
    assert!((back - p).hypot() < 1e-12);
}

#[test]
fn viewport_rejects_empty_and_bad_extent() {
    assert!(Viewport::new(0, 10, 1.0).is_err());
    assert!(Viewport::new(10, 10, 0.0).is_err());
    assert!(Viewport::new(10, 10, f64::NAN).is_err());
}

#[test]
fn canvas_covering_snaps_to_the_raster_lattice() {
    let v = Viewport::new(10, 10, 1.0).unwrap();
    assert_eq!(v.canvas_covering(v.world_rect()), v.canvas());

    // One pixel is 0.2 world units; a rect reaching half a pixel past the raster grows by one.
    let wide = v.canvas_covering(Rect::new(-1.1, -0.15, 1.1, 0.15));
    assert_eq!(
        wide,
        Canvas {
            x: -1,
            y: 4,
            width: 12,
            height: 2,
        }
    );
    assert_eq!(v.canvas_covering(Rect::ZERO), Canvas::EMPTY);
}

#[test]
fn canvas_indexing_and_containment() {
    let v = Viewport::new(4, 4, 1.0).unwrap();
    let c = Canvas {
        x: -2,
        y: -1,
        width: 8,
        height: 6,
    };
    assert!(c.contains(&v.canvas()));
    assert!(!v.canvas().contains(&c));
    assert!(v.canvas().contains(&Canvas::EMPTY));
    assert_eq!(c.index(-2, -1), Some(0));
    assert_eq!(c.index(0, 0), Some(10));
    assert_eq!(c.index(6, 0), None);

    // Window pixels line up with raster pixels.
    let p = c.pixel_center(&v, 2, 1);
    assert!((p - v.pixel_center(0, 0)).hypot() < 1e-12);
    let r = c.world_rect(&v);
    assert!((r.x0 + 2.0).abs() < 1e-12 && (r.y1 - 1.5).abs() < 1e-12);
}
