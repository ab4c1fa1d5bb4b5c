/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Per-entity signal robustness tracker (C1): an EWMA of a median-of-three
//! prefiltered RSSI, plus a median-absolute-deviation derived confidence
//! score used to discount priority scoring for noisy entities.

const WINDOW_CAP: usize = 10;
const EWMA_ALPHA: f64 = 0.3;

/// Floor/ceiling applied to the returned robustness score.
pub const ROBUSTNESS_FLOOR: f64 = 0.1;
pub const ROBUSTNESS_CEIL: f64 = 1.0;

/// Circular 10-sample RSSI window plus the running EWMA level for one entity.
#[derive(Clone, Debug)]
pub struct SignalTracker {
    window: [f64; WINDOW_CAP],
    len: usize,
    next: usize,
    pub level: f64,
}

impl Default for SignalTracker {
    fn default() -> Self {
        Self { window: [0.0; WINDOW_CAP], len: 0, next: 0, level: 0.0 }
    }
}

impl SignalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one new RSSI sample and return the updated robustness score.
    pub fn update(&mut self, rssi: f64) -> f64 {
        self.window[self.next] = rssi;
        self.next = (self.next + 1) % WINDOW_CAP;
        if self.len < WINDOW_CAP {
            self.len += 1;
        }

        let filtered = if self.len >= 3 { self.median_of_last(3) } else { rssi };

        self.level = if self.len == 1 { filtered } else { EWMA_ALPHA * filtered + (1.0 - EWMA_ALPHA) * self.level };

        let values = self.values();
        let med = median(&values);
        let mad = median_absolute_deviation(&values, med);
        (1.0 / (1.0 + mad)).clamp(ROBUSTNESS_FLOOR, ROBUSTNESS_CEIL)
    }

    /// Samples currently held, oldest first, in insertion order.
    fn values(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len);
        let start = (self.next + WINDOW_CAP - self.len) % WINDOW_CAP;
        for i in 0..self.len {
            out.push(self.window[(start + i) % WINDOW_CAP]);
        }
        out
    }

    /// Median of the `n` most recently inserted samples.
    fn median_of_last(&self, n: usize) -> f64 {
        let n = n.min(self.len);
        let mut last = Vec::with_capacity(n);
        for i in 0..n {
            let idx = (self.next + WINDOW_CAP - 1 - i) % WINDOW_CAP;
            last.push(self.window[idx]);
        }
        median(&last)
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn median_absolute_deviation(values: &[f64], center: f64) -> f64 {
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}
