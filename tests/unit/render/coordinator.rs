use std::sync::Arc;
use std::thread::sleep;

use super::*;
use crate::engine::params::EffectParameters;
use crate::foundation::core::ViewMode;

const WAIT: Duration = Duration::from_secs(5);

fn request(size: f64) -> RenderRequest {
    RenderRequest::new(
        EffectParameters {
            size,
            ..EffectParameters::default()
        },
        ViewMode::Proxy,
    )
}

fn recording(
    opts: CoordinatorOpts,
    delay: Duration,
) -> (RenderCoordinator<f64>, Arc<Mutex<Vec<f64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let coordinator = RenderCoordinator::spawn(opts, move |req: &RenderRequest| -> LarmResult<f64> {
        let size = req.params.size;
        if size == 13.0 {
            panic!("unlucky size");
        }
        if size < 0.0 {
            return Err(LarmError::processing("negative size"));
        }
        sleep(delay);
        log.lock().unwrap().push(size);
        Ok(size)
    })
    .unwrap();
    (coordinator, seen)
}

fn wait_for_phase(c: &RenderCoordinator<f64>, phase: CoordinatorPhase) {
    let deadline = Instant::now() + WAIT;
    while c.phase() != phase {
        assert!(Instant::now() < deadline, "never reached {phase:?}");
        sleep(Duration::from_millis(1));
    }
}

#[test]
fn starts_idle_with_no_result() {
    let (c, _) = recording(CoordinatorOpts::default(), Duration::ZERO);
    assert_eq!(c.phase(), CoordinatorPhase::Idle);
    assert!(c.latest().is_none());
    assert_eq!(c.stats(), CoordinatorStats::default());
    assert_eq!(c.debounce(), DEFAULT_DEBOUNCE);
}

#[test]
fn burst_within_debounce_window_renders_once_with_newest_params() {
    let (c, seen) = recording(
        CoordinatorOpts {
            debounce: Duration::from_millis(100),
        },
        Duration::ZERO,
    );

    c.submit(request(1.0));
    c.submit(request(2.0));
    let last = c.submit(request(3.0));
    assert_eq!(c.phase(), CoordinatorPhase::Pending);

    let done = c.wait_for(last, WAIT).expect("render published");
    assert_eq!(done.seq, last);
    assert_eq!(done.output, 3.0);
    assert!(c.wait_idle(WAIT));

    assert_eq!(*seen.lock().unwrap(), vec![3.0]);
    let stats = c.stats();
    assert_eq!(stats.submitted, 3);
    assert_eq!(stats.superseded, 2);
    assert_eq!(stats.dispatched, 1);
    assert_eq!(stats.completed, 1);
}

#[test]
fn request_during_render_is_buffered_then_dispatched() {
    let (c, seen) = recording(
        CoordinatorOpts {
            debounce: Duration::from_millis(5),
        },
        Duration::from_millis(150),
    );

    let first = c.submit(request(1.0));
    wait_for_phase(&c, CoordinatorPhase::Running);
    c.submit(request(2.0));
    let newest = c.submit(request(3.0));
    // The in-flight render keeps the coordinator in Running.
    assert_eq!(c.phase(), CoordinatorPhase::Running);

    let r = c.wait_for(first, WAIT).unwrap();
    assert!(r.seq >= first);
    let r = c.wait_for(newest, WAIT).unwrap();
    assert_eq!(r.seq, newest);
    assert_eq!(r.request.params.size, 3.0);
    assert!(c.wait_idle(WAIT));

    assert_eq!(*seen.lock().unwrap(), vec![1.0, 3.0]);
    let stats = c.stats();
    assert_eq!(stats.dispatched, 2);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.superseded, 1);
}

#[test]
fn waiting_on_superseded_request_yields_newer_result() {
    let (c, _) = recording(
        CoordinatorOpts {
            debounce: Duration::from_millis(50),
        },
        Duration::ZERO,
    );
    let old = c.submit(request(4.0));
    let new = c.submit(request(5.0));
    let r = c.wait_for(old, WAIT).unwrap();
    assert_eq!(r.seq, new);
    assert_eq!(r.output, 5.0);
}

#[test]
fn failed_render_is_not_published_and_worker_keeps_going() {
    let (c, _) = recording(
        CoordinatorOpts {
            debounce: Duration::from_millis(1),
        },
        Duration::ZERO,
    );

    c.submit(request(-1.0));
    assert!(c.wait_idle(WAIT));
    assert!(c.latest().is_none());
    assert_eq!(c.stats().failed, 1);
    assert!(c.last_error().unwrap().contains("negative size"));

    let ok = c.submit(request(2.0));
    let r = c.wait_for(ok, WAIT).unwrap();
    assert_eq!(r.output, 2.0);
    assert!(c.wait_idle(WAIT));
    assert!(c.last_error().is_none());
}

#[test]
fn panicking_render_counts_as_failure() {
    let (c, _) = recording(
        CoordinatorOpts {
            debounce: Duration::from_millis(1),
        },
        Duration::ZERO,
    );

    c.submit(request(13.0));
    assert!(c.wait_idle(WAIT));
    assert_eq!(c.stats().failed, 1);
    assert!(c.last_error().unwrap().contains("unlucky size"));

    let ok = c.submit(request(6.0));
    assert_eq!(c.wait_for(ok, WAIT).unwrap().output, 6.0);
}

#[test]
fn wait_times_out_without_result() {
    let (c, _) = recording(
        CoordinatorOpts {
            debounce: Duration::from_secs(60),
        },
        Duration::ZERO,
    );
    let seq = c.submit(request(1.0));
    assert!(c.wait_for(seq, Duration::from_millis(20)).is_none());
    assert!(!c.wait_idle(Duration::from_millis(20)));
}

#[test]
fn drop_discards_pending_request() {
    let (c, seen) = recording(
        CoordinatorOpts {
            debounce: Duration::from_secs(60),
        },
        Duration::ZERO,
    );
    c.submit(request(1.0));
    let started = Instant::now();
    drop(c);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn result_slot_ignores_stale_results() {
    let slot = ResultSlot::default();
    assert!(slot.publish(Rendered {
        seq: 2,
        request: request(2.0),
        output: 2,
    }));
    assert!(!slot.publish(Rendered {
        seq: 1,
        request: request(1.0),
        output: 1,
    }));
    assert_eq!(slot.latest().unwrap().output, 2);
    assert!(slot.wait_until(3, Duration::from_millis(5)).is_none());
}
