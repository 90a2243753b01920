//! Decode hot-path micro-benchmark.
//!
//! - `lookup` alone
//! - `DecoderState::on_edge` over a forward Gray cycle (raw and detent)
//! - full edge delivery through the simulation backend into an `Encoder`

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use qdec_common::config::Mode;
use qdec_common::gpio::Level;
use qdec_decoder::backends::simulation::SimulatedGpio;
use qdec_decoder::decoder::{Channel, DecoderState};
use qdec_decoder::encoder::{Encoder, EncoderOptions};
use qdec_decoder::notifier::Notifier;
use qdec_decoder::transitions::{QuadState, lookup};

/// One forward cycle starting from 00: (channel, new level).
const FORWARD_CYCLE: [(Channel, Level); 4] = [
    (Channel::B, Level::High),
    (Channel::A, Level::High),
    (Channel::B, Level::Low),
    (Channel::A, Level::Low),
];

fn bench_lookup(c: &mut Criterion) {
    let mut i = 0u8;
    c.bench_function("lookup", |b| {
        b.iter(|| {
            i = i.wrapping_add(1);
            lookup(black_box(QuadState::new(i >> 2)), black_box(QuadState::new(i)))
        });
    });
}

fn bench_on_edge(c: &mut Criterion) {
    for mode in [Mode::Raw, Mode::Detent] {
        let mut state = DecoderState::new(mode, Level::Low, Level::Low);
        let mut step = 0usize;
        c.bench_function(&format!("on_edge_{mode:?}").to_lowercase(), |b| {
            b.iter(|| {
                let (channel, level) = FORWARD_CYCLE[step & 3];
                step += 1;
                state.on_edge(black_box(channel), black_box(level))
            });
        });
    }
}

fn bench_encoder_delivery(c: &mut Criterion) {
    let gpio = Arc::new(SimulatedGpio::new());
    let notifier: Arc<dyn Notifier> = Arc::new(|p: i64| {
        black_box(p);
    });
    let encoder = Encoder::create(
        gpio.clone(),
        &EncoderOptions::new(23, 24, Mode::Detent),
        notifier,
    )
    .expect("create encoder");

    c.bench_function("encoder_quarter_step", |b| {
        b.iter(|| gpio.rotate(23, 24, 1));
    });

    black_box(encoder.get_position());
}

criterion_group!(benches, bench_lookup, bench_on_edge, bench_encoder_delivery);
criterion_main!(benches);
