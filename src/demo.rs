//! Synthetic seat frames
//!
//! Deterministic 8×8 pressure frames for running the dashboard without a
//! sensor feed: a slow travelling wave over a baseline load plus a bump
//! centred on the seat. A seeded jitter of ±2 replaces sensor noise so the
//! same seed always yields the same sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::PressureGrid;

/// Side length of generated frames
pub const DEMO_GRID_SIZE: usize = 8;

const BASE_LOAD: f64 = 55.0;
const ROW_WAVE_AMPLITUDE: f64 = 25.0;
const COL_WAVE_AMPLITUDE: f64 = 15.0;
const BUMP_PEAK: f64 = 40.0;
const BUMP_FALLOFF: f64 = 6.0;
const JITTER: f64 = 2.0;

/// Frame generator; each call to [`DemoFeed::next_frame`] advances one second
#[derive(Debug, Clone)]
pub struct DemoFeed {
    step: u64,
    rng: StdRng,
}

impl Default for DemoFeed {
    fn default() -> Self {
        Self::new(0x5175_5e45)
    }
}

impl DemoFeed {
    pub fn new(seed: u64) -> Self {
        Self {
            step: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn next_frame(&mut self) -> PressureGrid {
        let t = self.step as f64;
        let n = DEMO_GRID_SIZE;
        let half = n as f64 / 2.0;

        let mut cells = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                let cx = i as f64 - half;
                let cy = j as f64 - half;
                let radius = (cx * cx + cy * cy).sqrt();

                let wave = BASE_LOAD
                    + ROW_WAVE_AMPLITUDE * (t / 15.0 + i as f64 / 3.0).sin()
                    + COL_WAVE_AMPLITUDE * (t / 18.0 + j as f64 / 2.0).cos();
                let bump = (BUMP_PEAK - radius * BUMP_FALLOFF).max(0.0);
                let noise = self.rng.gen_range(-JITTER..=JITTER);

                cells.push((wave + bump + noise).max(0.0));
            }
        }

        self.step += 1;
        PressureGrid::from_parts(n, n, cells)
    }
}

impl Iterator for DemoFeed {
    type Item = PressureGrid;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_frame())
    }
}
