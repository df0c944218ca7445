use super::*;
use serde_json::json;

fn close(a: Color, b: Color) -> bool {
    [(a.r, b.r), (a.g, b.g), (a.b, b.b), (a.a, b.a)]
        .iter()
        .all(|(x, y)| (x - y).abs() < 1e-9)
}

fn de(v: serde_json::Value) -> Result<Color, serde_json::Error> {
    serde_json::from_value(v)
}

#[test]
fn hex_strings_parse_with_optional_hash_and_alpha() {
    let teal: Color = "#008080".parse().unwrap();
    assert!(close(teal, Color::rgb(0.0, 128.0 / 255.0, 128.0 / 255.0)));
    assert_eq!("00808040".parse::<Color>().unwrap().a, 64.0 / 255.0);
    assert_eq!(de(json!(" #FFFFFF ")).unwrap(), Color::WHITE);

    for bad in ["#fff", "#12345g", "#+1234567", "#1234567890"] {
        assert!(bad.parse::<Color>().is_err(), "{bad}");
    }
}

#[test]
fn every_document_form_yields_the_same_color() {
    let expected = Color::rgba(1.0, 0.0, 0.0, 0.5);
    for v in [
        json!("#ff000080"),
        json!({ "r": 1.0, "g": 0.0, "b": 0.0, "a": 0.5 }),
        json!({ "h": 360.0, "s": 1.0, "l": 0.5, "a": 0.5 }),
        json!([1.0, 0.0, 0.0, 0.5]),
    ] {
        let c = de(v.clone()).unwrap();
        assert!((c.r - 1.0).abs() < 1e-9 && c.g.abs() < 1e-9, "{v}");
        assert!((c.a - expected.a).abs() < 0.01, "{v}");
    }
    assert_eq!(de(json!([0.1, 0.2, 0.3])).unwrap().a, 1.0);
    assert!(de(json!([0.1, 0.2])).is_err());
    assert!(de(json!(true)).is_err());
}

#[test]
fn serialized_color_reads_back() {
    let c = Color::rgba(0.2, 0.4, 0.6, 0.8);
    assert_eq!(de(serde_json::to_value(c).unwrap()).unwrap(), c);
}

#[test]
fn hsl_sextants_and_roundtrip() {
    let primaries = [
        (0.0, Color::rgb(1.0, 0.0, 0.0)),
        (120.0, Color::rgb(0.0, 1.0, 0.0)),
        (240.0, Color::rgb(0.0, 0.0, 1.0)),
        (-60.0, Color::rgb(1.0, 0.0, 1.0)),
    ];
    for (h, rgb) in primaries {
        assert!(close(Color::from_hsl(Hsl { h, s: 1.0, l: 0.5 }), rgb), "hue {h}");
    }

    for c in [
        Color::rgb(0.85, 0.33, 0.24),
        Color::rgb(0.1, 0.6, 0.3),
        Color::rgb(0.2, 0.3, 0.9),
        Color::gray(0.4),
    ] {
        assert!(close(Color::from_hsl(c.to_hsl()), c), "{c:?}");
    }
}

#[test]
fn desaturating_keeps_lightness_and_alpha() {
    let c = Color::rgba(0.9, 0.2, 0.1, 0.3);
    let gray = c.desaturated(0.0);
    assert!((gray.r - gray.g).abs() < 1e-9 && (gray.g - gray.b).abs() < 1e-9);
    assert!((gray.to_hsl().l - c.to_hsl().l).abs() < 1e-9);
    assert_eq!(gray.a, 0.3);
}

#[test]
fn premultiplied_conversion_applies_coverage() {
    assert_eq!(Color::WHITE.to_rgba8_premul(0.5).to_array(), [128, 128, 128, 128]);
    assert_eq!(
        Color::rgba(1.0, 0.5, 0.0, 0.5).to_rgba8_premul(1.0).to_array(),
        [128, 64, 0, 128]
    );
}
