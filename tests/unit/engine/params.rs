use approx::assert_relative_eq;

use super::*;

#[test]
fn defaults_are_within_range() {
    EffectParameters::default().validate().unwrap();
}

#[test]
fn out_of_range_values_are_reported_not_clamped() {
    let p = EffectParameters {
        chromatic: 501.0,
        ..EffectParameters::default()
    };
    let err = p.validate().unwrap_err();
    assert!(err.to_string().contains("chromatic"));
    assert_eq!(p.chromatic, 501.0);

    let nan = EffectParameters {
        exposure: f64::NAN,
        ..EffectParameters::default()
    };
    assert!(nan.validate().is_err());

    let low = EffectParameters {
        tonal_smoothness: 0.0,
        ..EffectParameters::default()
    };
    assert!(low.validate().is_err());
}

#[test]
fn layers_round_to_nearest() {
    let mut p = EffectParameters::default();
    for (raw, want) in [(1.0, 1), (2.4, 2), (2.5, 3), (4.6, 5)] {
        p.layers = raw;
        assert_eq!(p.engine_layers(), want);
        assert_eq!(p.to_engine(1.0).layers, want);
    }
}

#[test]
fn grain_scale_only_touches_size() {
    let p = EffectParameters {
        size: 40.0,
        ..EffectParameters::default()
    };
    let proxy = p.to_engine(0.6);
    let full = p.to_engine(1.0);

    assert_relative_eq!(proxy.size, 24.0);
    assert_relative_eq!(full.size, 40.0);
    assert_eq!(
        EngineParams {
            size: full.size,
            ..proxy
        },
        full
    );
}

#[test]
fn json_is_camel_case_with_defaults_and_alias() {
    let json = r#"{"size": 10, "crystalSharpness": 3.5, "shadowGrain": 0.2, "layers": 2}"#;
    let p: EffectParameters = serde_json::from_str(json).unwrap();
    assert_eq!(p.size, 10.0);
    assert_eq!(p.sharpness, 3.5);
    assert_eq!(p.shadow_grain, 0.2);
    assert_eq!(p.layers, 2.0);
    assert_eq!(p.relief, EffectParameters::default().relief);

    let json = serde_json::to_value(EffectParameters::default()).unwrap();
    assert!(json.get("tonalSmoothness").is_some());
    assert!(json.get("highlightGrain").is_some());
}
