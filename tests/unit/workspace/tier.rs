use std::sync::atomic::{AtomicUsize, Ordering};

use approx::assert_relative_eq;
use image::Rgb;

use super::*;
use crate::engine::params::EngineParams;

fn source(w: u32, h: u32) -> SourceImage {
    SourceImage::from_rgb(RgbImage::from_fn(w, h, |x, y| {
        Rgb([(x % 251) as u8, (y % 241) as u8, ((x ^ y) % 239) as u8])
    }))
    .unwrap()
}

fn copy_engine(
    input: &[u8],
    output: &mut [u8],
    _w: u32,
    _h: u32,
    _p: &EngineParams,
) -> LarmResult<()> {
    output.copy_from_slice(input);
    Ok(())
}

#[test]
fn proxy_downscales_wide_sources_to_threshold() {
    let src = source(2000, 1500);
    let proxy = Tier::proxy(&src, 1200);
    assert_eq!((proxy.width(), proxy.height()), (1200, 900));
    assert_relative_eq!(proxy.scale_factor(), 0.6);
    assert_relative_eq!(proxy.grain_scale(), 0.6);
    assert_eq!(proxy.input().len(), 1200 * 900 * 3);
}

#[test]
fn proxy_of_narrow_source_is_the_original() {
    let src = source(800, 600);
    let proxy = Tier::proxy(&src, 1200);
    assert_eq!((proxy.width(), proxy.height()), (800, 600));
    assert_eq!(proxy.scale_factor(), 1.0);
    assert_eq!(proxy.input_image().unwrap(), *src.pixels());

    let at_threshold = Tier::proxy(&source(1200, 10), 1200);
    assert_eq!(at_threshold.scale_factor(), 1.0);
}

#[test]
fn proxy_width_never_exceeds_threshold() {
    for w in [1201, 1333, 1999, 4001, 6000] {
        let proxy = Tier::proxy(&source(w, 7), 1200);
        assert!(proxy.width() <= 1200, "width {w} -> {}", proxy.width());
        assert!(proxy.scale_factor() <= 1.0);
        assert_eq!(
            proxy.height(),
            (7.0 * proxy.scale_factor()).round().max(1.0) as u32
        );
    }
}

#[test]
fn loupe_is_native_resolution_center_crop() {
    let src = source(1000, 800);
    let loupe = Tier::loupe(&src, 512);
    assert_eq!((loupe.width(), loupe.height()), (512, 512));
    assert_eq!(loupe.scale_factor(), 1.0);
    assert_eq!(loupe.grain_scale(), 1.0);
    assert_eq!((loupe.region().x, loupe.region().y), (244, 144));

    let img = loupe.input_image().unwrap();
    assert_eq!(img.get_pixel(0, 0), src.pixels().get_pixel(244, 144));
    assert_eq!(img.get_pixel(511, 511), src.pixels().get_pixel(755, 655));
}

#[test]
fn loupe_origin_rounds_odd_margins_down() {
    let src = source(1001, 801);
    let loupe = Tier::loupe(&src, 512);
    assert_eq!((loupe.region().x, loupe.region().y), (244, 144));
    assert_eq!((loupe.width(), loupe.height()), (512, 512));
    let img = loupe.input_image().unwrap();
    assert_eq!(img.get_pixel(0, 0), src.pixels().get_pixel(244, 144));
}

#[test]
fn proxy_downscale_blends_neighbouring_pixels() {
    let checker = RgbImage::from_fn(2400, 4, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let proxy = Tier::proxy(&SourceImage::from_rgb(checker).unwrap(), 1200);
    assert_eq!((proxy.width(), proxy.height()), (1200, 2));

    let img = proxy.input_image().unwrap();
    for px in img.pixels() {
        for &c in &px.0 {
            assert!(c > 0 && c < 255, "unfiltered channel value {c}");
        }
    }
}

#[test]
fn loupe_clamps_to_small_sources() {
    let src = source(300, 200);
    let loupe = Tier::loupe(&src, 512);
    assert_eq!((loupe.width(), loupe.height()), (300, 200));
    assert_eq!(loupe.input_image().unwrap(), *src.pixels());
}

#[test]
fn crop_follows_focus() {
    let src = source(1000, 800);
    let crop = Tier::crop(&src, FocusPoint::new(1.0, 1.0), 512);
    assert_eq!(crop.kind(), TierKind::Crop);
    assert_eq!((crop.region().x, crop.region().y), (488, 288));
    let img = crop.input_image().unwrap();
    assert_eq!(img.get_pixel(0, 0), src.pixels().get_pixel(488, 288));
}

#[test]
fn renders_pass_scaled_size_only_for_proxy() {
    let seen = std::sync::Mutex::new(Vec::<f64>::new());
    let engine = |input: &[u8],
                  output: &mut [u8],
                  _w: u32,
                  _h: u32,
                  p: &EngineParams|
     -> LarmResult<()> {
        seen.lock().unwrap().push(p.size);
        output.copy_from_slice(input);
        Ok(())
    };
    let params = EffectParameters {
        size: 50.0,
        ..EffectParameters::default()
    };

    let src = source(2000, 100);
    Tier::proxy(&src, 1200)
        .render_in_place(&engine, &params)
        .unwrap();
    Tier::loupe(&src, 64).render_in_place(&engine, &params).unwrap();
    Tier::crop(&src, FocusPoint::CENTER, 64)
        .render_detached(&engine, &params)
        .unwrap();
    Tier::original(&src)
        .render_detached(&engine, &params)
        .unwrap();

    let seen = seen.into_inner().unwrap();
    assert_relative_eq!(seen[0], 30.0);
    assert_eq!(&seen[1..], &[50.0, 50.0, 50.0]);
}

#[test]
fn in_place_render_reuses_buffers_and_returns_fresh_result_each_time() {
    let calls = AtomicUsize::new(0);
    let engine = |input: &[u8],
                  output: &mut [u8],
                  _w: u32,
                  _h: u32,
                  _p: &EngineParams|
     -> LarmResult<()> {
        let n = calls.fetch_add(1, Ordering::SeqCst) as u8;
        for (o, i) in output.iter_mut().zip(input) {
            *o = i.wrapping_add(n);
        }
        Ok(())
    };
    let src = source(16, 8);
    let tier = Tier::original(&src);
    let params = EffectParameters::default();

    let first = tier.render_in_place(&engine, &params).unwrap();
    let second = tier.render_in_place(&engine, &params).unwrap();
    assert_eq!(first, *src.pixels());
    assert_eq!(
        second.get_pixel(3, 2).0[0],
        src.pixels().get_pixel(3, 2).0[0].wrapping_add(1)
    );
    // Input stays pristine across renders.
    assert_eq!(tier.input_image().unwrap(), *src.pixels());
}

#[test]
fn identity_engine_round_trips_through_tiers() {
    let src = source(40, 30);
    let out = Tier::original(&src)
        .render_detached(&copy_engine, &EffectParameters::default())
        .unwrap();
    assert_eq!(out, *src.pixels());
}

#[test]
fn zero_geometry_is_rejected() {
    assert!(TierOpts::default().validate().is_ok());
    let bad = TierOpts {
        proxy_max_width: 0,
        ..TierOpts::default()
    };
    assert!(bad.validate().is_err());
}

#[test]
fn detached_renders_never_allocate_the_tier_output() {
    let src = source(400, 300);
    let tier = Tier::original(&src);
    assert!(!tier.holds_output_buffer());

    let out = tier
        .render_detached(&copy_engine, &EffectParameters::default())
        .unwrap();
    assert_eq!(out.dimensions(), (400, 300));
    assert!(!tier.holds_output_buffer());

    tier.render_in_place(&copy_engine, &EffectParameters::default())
        .unwrap();
    let own = tier.output.lock().unwrap();
    assert_eq!(own.as_ref().map(RgbBuffer::len), Some(400 * 300 * 3));
}
