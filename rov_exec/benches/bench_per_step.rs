//! # Perception Step Benchmark

use criterion::{criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use nalgebra::Vector2;

use rov_lib::{
    decision::{DecisionCtrl, DecisionParams},
    per::{PerMgr, PerMgrParams},
    rover::RoverState,
};

fn per_step_benchmark(c: &mut Criterion) {
    // ---- Build a synthetic frame ----

    // Sand in the centre, rock walls on either side and a sample on the right
    let frame = RgbImage::from_fn(320, 160, |x, y| {
        if x < 60 || x > 260 {
            Rgb([60, 50, 40])
        } else if (200..210).contains(&x) && (120..130).contains(&y) {
            Rgb([180, 160, 30])
        } else {
            Rgb([200, 180, 170])
        }
    });

    let per_mgr = PerMgr::new(PerMgrParams::default()).unwrap();
    let decision = DecisionCtrl::new(DecisionParams::default()).unwrap();
    let mut world_map = per_mgr.new_world_map();

    let mut rover = RoverState::default();
    rover.position = Vector2::new(100.0, 100.0);
    rover.vel = 1.0;

    c.bench_function("per_step", |b| {
        b.iter(|| per_mgr.step(&frame, &mut rover, &mut world_map).unwrap())
    });

    c.bench_function("per_and_decision_step", |b| {
        b.iter(|| {
            per_mgr.step(&frame, &mut rover, &mut world_map).unwrap();
            decision.step(&mut rover)
        })
    });
}

criterion_group!(benches, per_step_benchmark);
criterion_main!(benches);
