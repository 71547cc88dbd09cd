use super::*;

#[test]
fn corners_clamp_to_source_extent() {
    let top_left = crop_bounds(1000, 800, FocusPoint::new(0.0, 0.0), 512);
    assert_eq!((top_left.x, top_left.y), (0, 0));
    assert_eq!((top_left.width, top_left.height), (512, 512));

    let bottom_right = crop_bounds(1000, 800, FocusPoint::new(1.0, 1.0), 512);
    assert_eq!((bottom_right.x, bottom_right.y), (488, 288));
    assert_eq!((bottom_right.width, bottom_right.height), (512, 512));
}

#[test]
fn crop_is_always_full_size_when_source_is_larger() {
    for fx in [0.0, 0.1, 0.33, 0.5, 0.77, 1.0] {
        for fy in [0.0, 0.25, 0.5, 0.9, 1.0] {
            let r = crop_bounds(1000, 800, FocusPoint::new(fx, fy), 512);
            assert_eq!((r.width, r.height), (512, 512));
            assert!(r.fits_within(1000, 800));
        }
    }
}

#[test]
fn small_sources_shrink_the_crop() {
    let r = crop_bounds(300, 200, FocusPoint::CENTER, 512);
    assert_eq!(r, CropRect::full(300, 200));

    let mixed = crop_bounds(2000, 100, FocusPoint::new(0.5, 0.5), 512);
    assert_eq!((mixed.x, mixed.y), (744, 0));
    assert_eq!((mixed.width, mixed.height), (512, 100));
}

#[test]
fn out_of_range_focus_is_clamped_not_rejected() {
    let r = crop_bounds(1000, 800, FocusPoint { x: -4.0, y: 9.0 }, 512);
    assert_eq!((r.x, r.y), (0, 288));
}

#[test]
fn center_crop_matches_center_focus() {
    let r = center_crop(1000, 800, 512);
    assert_eq!((r.x, r.y), (244, 144));
    assert_eq!(r, crop_bounds(1000, 800, FocusPoint::CENTER, 512));
}

#[test]
fn center_crop_rounds_odd_margins_down() {
    let r = center_crop(1001, 801, 512);
    assert_eq!((r.x, r.y), (244, 144));
    assert_eq!((r.width, r.height), (512, 512));
    assert!(r.fits_within(1001, 801));

    let focused = crop_bounds(1001, 801, FocusPoint::CENTER, 512);
    assert_eq!((focused.x, focused.y), (245, 145));

    assert_eq!(center_crop(300, 200, 512), CropRect::full(300, 200));
}
