//! Concurrency tests: edges from several threads (also into one encoder),
//! facade calls racing edge delivery, and cancellation while a handler is
//! running.

use parking_lot::Mutex;
use qdec_common::config::Mode;
use qdec_common::gpio::{ChannelId, EdgeLevel};
use qdec_decoder::backends::simulation::SimulatedGpio;
use qdec_decoder::notifier::Notifier;
use qdec_decoder::{Encoder, EncoderOptions};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const CLICKS: i64 = 500;

fn counter() -> (Arc<AtomicUsize>, Arc<dyn Notifier>) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    let notifier: Arc<dyn Notifier> = Arc::new(move |_p: i64| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    (count, notifier)
}

#[test]
fn encoders_driven_from_separate_threads() {
    let gpio = Arc::new(SimulatedGpio::new());
    let (count_a, na) = counter();
    let (count_b, nb) = counter();
    let a = Encoder::create(gpio.clone(), &EncoderOptions::new(23, 24, Mode::Detent), na)
        .expect("create a");
    let b = Encoder::create(gpio.clone(), &EncoderOptions::new(17, 27, Mode::Raw), nb)
        .expect("create b");

    let ga = Arc::clone(&gpio);
    let gb = Arc::clone(&gpio);
    let ta = thread::spawn(move || ga.rotate(23, 24, 4 * CLICKS));
    let tb = thread::spawn(move || gb.rotate(17, 27, -4 * CLICKS));
    ta.join().unwrap();
    tb.join().unwrap();

    assert_eq!(a.get_position(), CLICKS);
    assert_eq!(b.get_position(), -4 * CLICKS);
    assert_eq!(count_a.load(Ordering::SeqCst), CLICKS as usize);
    assert_eq!(count_b.load(Ordering::SeqCst), 4 * CLICKS as usize);
}

#[test]
fn one_encoder_fed_from_two_threads() {
    let gpio = Arc::new(SimulatedGpio::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let notifier: Arc<dyn Notifier> = Arc::new(move |p: i64| sink.lock().push(p));
    let encoder = Encoder::create(gpio.clone(), &EncoderOptions::new(5, 6, Mode::Raw), notifier)
        .expect("create");

    // Each thread toggles one line; edges of A and B interleave freely.
    let toggler = |channel: ChannelId| {
        let gpio = Arc::clone(&gpio);
        thread::spawn(move || {
            for i in 0..2 * CLICKS {
                let level = if i % 2 == 0 { EdgeLevel::Low } else { EdgeLevel::High };
                gpio.inject(channel, level);
            }
        })
    };
    let ta = toggler(5);
    let tb = toggler(6);
    ta.join().unwrap();
    tb.join().unwrap();

    // Every notification is one accepted quarter-step from the previous one.
    let seen = seen.lock();
    let mut last = 0;
    for &position in seen.iter() {
        assert_eq!((position - last).abs(), 1, "jump from {last} to {position}");
        last = position;
    }
    assert_eq!(encoder.steps(), last);
    assert_eq!(encoder.get_position(), last);
}

#[test]
fn slow_notifier_does_not_hold_up_other_encoder() {
    let gpio = Arc::new(SimulatedGpio::new());

    let entered = Arc::new(AtomicBool::new(false));
    let released = Arc::new(AtomicBool::new(false));
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let slow: Arc<dyn Notifier> = {
        let entered = Arc::clone(&entered);
        let released = Arc::clone(&released);
        Arc::new(move |_p: i64| {
            if !entered.swap(true, Ordering::SeqCst) {
                let ok = release_rx.lock().recv_timeout(Duration::from_secs(5)).is_ok();
                released.store(ok, Ordering::SeqCst);
            }
        })
    };
    let a = Encoder::create(gpio.clone(), &EncoderOptions::new(23, 24, Mode::Raw), slow)
        .expect("create a");

    let seen_b = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen_b);
    let fast: Arc<dyn Notifier> = Arc::new(move |p: i64| sink.lock().push(p));
    let b = Encoder::create(gpio.clone(), &EncoderOptions::new(17, 27, Mode::Raw), fast)
        .expect("create b");

    let driver = {
        let gpio = Arc::clone(&gpio);
        thread::spawn(move || gpio.rotate(23, 24, 1))
    };
    while !entered.load(Ordering::SeqCst) {
        thread::yield_now();
    }

    // Encoder A is parked in its notifier; B still decodes at full speed.
    gpio.rotate(17, 27, 4);
    assert_eq!(*seen_b.lock(), vec![1, 2, 3, 4]);
    assert_eq!(b.get_position(), 4);

    release_tx.send(()).unwrap();
    driver.join().unwrap();
    assert!(released.load(Ordering::SeqCst), "encoder B waited for encoder A");
    assert_eq!(a.get_position(), 1);
}

#[test]
fn readers_see_monotonic_position_during_forward_rotation() {
    let gpio = Arc::new(SimulatedGpio::new());
    let (_, notifier) = counter();
    let encoder = Arc::new(
        Encoder::create(gpio.clone(), &EncoderOptions::new(5, 6, Mode::Raw), notifier)
            .expect("create"),
    );

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let encoder = Arc::clone(&encoder);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut last = encoder.get_position();
            while !done.load(Ordering::SeqCst) {
                let now = encoder.get_position();
                assert!(now >= last, "position went back from {last} to {now}");
                last = now;
            }
        })
    };

    gpio.rotate(5, 6, 4 * CLICKS);
    done.store(true, Ordering::SeqCst);
    reader.join().unwrap();
    assert_eq!(encoder.steps(), 4 * CLICKS);
}

#[test]
fn set_position_races_edges_without_losing_steps() {
    let gpio = Arc::new(SimulatedGpio::new());
    let (_, notifier) = counter();
    let encoder = Arc::new(
        Encoder::create(gpio.clone(), &EncoderOptions::new(5, 6, Mode::Raw), notifier)
            .expect("create"),
    );

    let driver = {
        let gpio = Arc::clone(&gpio);
        thread::spawn(move || gpio.rotate(5, 6, 4 * CLICKS))
    };
    encoder.set_position(1_000_000);
    driver.join().unwrap();

    // Whatever arrived after the reset was counted on top of it.
    let steps = encoder.steps();
    assert!(
        (1_000_000..=1_000_000 + 4 * CLICKS).contains(&steps),
        "unexpected steps {steps}"
    );
}

#[test]
fn no_notification_after_cancel_returns() {
    let gpio = Arc::new(SimulatedGpio::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    // Slow notifier widens the window in which cancel overlaps a delivery.
    let notifier: Arc<dyn Notifier> = Arc::new(move |p: i64| {
        thread::sleep(Duration::from_micros(200));
        sink.lock().push(p);
    });
    let encoder = Encoder::create(gpio.clone(), &EncoderOptions::new(5, 6, Mode::Raw), notifier)
        .expect("create");

    let stop = Arc::new(AtomicBool::new(false));
    let driver = {
        let gpio = Arc::clone(&gpio);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                gpio.rotate(5, 6, 1);
            }
        })
    };

    while seen.lock().len() < 20 {
        thread::yield_now();
    }
    encoder.cancel();
    let at_cancel = seen.lock().len();

    thread::sleep(Duration::from_millis(20));
    stop.store(true, Ordering::SeqCst);
    driver.join().unwrap();

    assert_eq!(seen.lock().len(), at_cancel);
    assert!(!encoder.is_live());
}

#[test]
fn concurrent_cancel_and_drop() {
    let gpio = Arc::new(SimulatedGpio::new());
    let (_, notifier) = counter();
    let encoder = Arc::new(
        Encoder::create(gpio.clone(), &EncoderOptions::new(5, 6, Mode::Detent), notifier)
            .expect("create"),
    );

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let encoder = Arc::clone(&encoder);
            thread::spawn(move || encoder.cancel())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Two subscriptions, removed exactly once.
    assert_eq!(gpio.unsubscribe_calls(), 2);
    drop(encoder);
    assert_eq!(gpio.unsubscribe_calls(), 2);
}
