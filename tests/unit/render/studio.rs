use std::sync::atomic::AtomicUsize;

use image::Rgb;

use super::*;
use crate::assets::source::SourceImage;
use crate::engine::params::EngineParams;

const WAIT: Duration = Duration::from_secs(5);

struct Counting {
    calls: AtomicUsize,
    sizes: Mutex<Vec<(u32, u32, f64)>>,
}

impl GrainEngine for Counting {
    fn apply(
        &self,
        input: &[u8],
        output: &mut [u8],
        width: u32,
        height: u32,
        params: &EngineParams,
    ) -> LarmResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sizes
            .lock()
            .unwrap()
            .push((width, height, params.size));
        output.copy_from_slice(input);
        Ok(())
    }
}

fn studio() -> (Studio, Arc<Counting>) {
    let engine = Arc::new(Counting {
        calls: AtomicUsize::new(0),
        sizes: Mutex::new(Vec::new()),
    });
    let opts = StudioOpts {
        coordinator: CoordinatorOpts {
            debounce: Duration::from_millis(10),
        },
        ..StudioOpts::default()
    };
    (Studio::new(engine.clone(), opts).unwrap(), engine)
}

fn workspace(w: u32, h: u32) -> Workspace {
    let img = RgbImage::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, 7]));
    Workspace::from_source(SourceImage::from_rgb(img).unwrap(), TierOpts::default()).unwrap()
}

#[test]
fn edits_before_load_are_recorded_not_rendered() {
    let (studio, engine) = studio();
    assert!(
        studio
            .set_params(EffectParameters {
                size: 9.0,
                ..EffectParameters::default()
            })
            .is_none()
    );
    assert!(!studio.has_workspace());
    assert_eq!(studio.request().params.size, 9.0);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    assert!(studio.export(&EffectParameters::default()).is_err());
}

#[test]
fn install_renders_current_request() {
    let (studio, engine) = studio();
    studio.set_params(EffectParameters {
        size: 10.0,
        ..EffectParameters::default()
    });
    let summary = studio.install(workspace(2400, 600));
    assert_eq!((summary.proxy_width, summary.proxy_height), (1200, 300));

    assert!(studio.wait_idle(WAIT));
    let frame = studio.latest_preview().unwrap();
    assert_eq!(frame.output.view, ViewMode::Proxy);
    assert_eq!(frame.output.generation, 1);
    assert_eq!(frame.output.image.dimensions(), (1200, 300));
    assert_eq!(engine.sizes.lock().unwrap().as_slice(), &[(1200, 300, 5.0)]);
}

#[test]
fn toggling_view_renders_loupe_at_native_resolution() {
    let (studio, engine) = studio();
    studio.install(workspace(2000, 1000));
    assert!(studio.wait_idle(WAIT));

    let seq = studio.toggle_view().unwrap();
    let frame = studio.wait_for_preview(seq, WAIT).unwrap();
    assert_eq!(frame.output.view, ViewMode::Loupe);
    assert_eq!(frame.output.image.dimensions(), (512, 512));
    let (_, _, size) = *engine.sizes.lock().unwrap().last().unwrap();
    assert_eq!(size, EffectParameters::default().size);

    let seq = studio.set_view(ViewMode::Proxy).unwrap();
    let frame = studio.wait_for_preview(seq, WAIT).unwrap();
    assert_eq!(frame.output.view, ViewMode::Proxy);
}

#[test]
fn reload_bumps_generation() {
    let (studio, _) = studio();
    studio.install(workspace(100, 50));
    assert!(studio.wait_idle(WAIT));
    studio.install(workspace(60, 40));
    assert!(studio.wait_idle(WAIT));
    let frame = studio.latest_preview().unwrap();
    assert_eq!(frame.output.generation, 2);
    assert_eq!(frame.output.image.dimensions(), (60, 40));
    assert_eq!(studio.workspace_summary().unwrap().width, 60);
}

#[test]
fn background_export_writes_full_resolution_png() {
    let (studio, _) = studio();
    studio.install(workspace(300, 120));
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("export.png");

    let handle = studio
        .export_in_background(out.clone(), EffectParameters::default())
        .unwrap();
    handle.join().unwrap().unwrap();

    let back = image::open(&out).unwrap().into_rgb8();
    assert_eq!(back.dimensions(), (300, 120));
}

#[test]
fn concurrent_edits_settle_on_the_recorded_request() {
    let (studio, _) = studio();
    studio.install(workspace(40, 30));
    let studio = Arc::new(studio);

    let editors: Vec<_> = (0..2)
        .map(|t| {
            let studio = studio.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    studio.set_params(EffectParameters {
                        size: f64::from(t * 1000 + i) / 10.0 + 0.1,
                        ..EffectParameters::default()
                    });
                }
            })
        })
        .collect();
    for e in editors {
        e.join().unwrap();
    }

    assert!(studio.wait_idle(WAIT));
    let frame = studio.latest_preview().unwrap();
    assert_eq!(frame.request, studio.request());
}
