/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

use crate::random::Xorshift64;

/// Lower clamp on Beta-Bernoulli pseudo-counts (C2). Arms start at
/// `alpha = beta = 1` (uniform prior) and are never allowed to decay below
/// this floor, since a shape parameter of zero makes the Gamma sampler
/// degenerate.
pub const MIN_SHAPE: f64 = 0.01;

/// Sample `Gamma(shape, 1)` via the Marsaglia–Tsang method. Valid for
/// `shape > 0`; shapes below 1 are boosted by the standard
/// `Gamma(a) = Gamma(a+1) * U^(1/a)` trick.
pub fn sample_gamma(rng: &Xorshift64, shape: f64) -> f64 {
    let shape = shape.max(MIN_SHAPE);
    if shape < 1.0 {
        let u = rng.next_f64_open();
        return sample_gamma(rng, shape + 1.0) * u.powf(1.0 / shape);
    }
    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let (x, v) = loop {
            let x = standard_normal(rng);
            let v = 1.0 + c * x;
            if v > 0.0 {
                break (x, v * v * v);
            }
        };
        let u = rng.next_f64_open();
        if u < 1.0 - 0.0331 * x * x * x * x {
            return d * v;
        }
        if u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
            return d * v;
        }
    }
}

/// Standard normal deviate via the Box-Muller transform.
fn standard_normal(rng: &Xorshift64) -> f64 {
    let u1 = rng.next_f64_open();
    let u2 = rng.next_f64();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Thompson-sample a draw from `Beta(alpha, beta)` using two Gamma draws:
/// `X ~ Gamma(alpha, 1)`, `Y ~ Gamma(beta, 1)`, `X / (X + Y) ~ Beta(alpha, beta)`.
/// Each bandit arm (C3 AP selector, C4 channel selector, C5 mode selector)
/// calls this once per decision with its own posterior counts.
pub fn sample_beta(rng: &Xorshift64, alpha: f64, beta: f64) -> f64 {
    let x = sample_gamma(rng, alpha);
    let y = sample_gamma(rng, beta);
    if x + y <= 0.0 {
        0.5
    } else {
        x / (x + y)
    }
}

/// Posterior mean of `Beta(alpha, beta)`, used for status reporting (the
/// `status` CLI subcommand shows each arm's expected value alongside its
/// last Thompson draw).
pub fn beta_mean(alpha: f64, beta: f64) -> f64 {
    alpha / (alpha + beta).max(MIN_SHAPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beta_draws_land_in_unit_interval() {
        let rng = Xorshift64::seeded(1);
        for _ in 0..5000 {
            let v = sample_beta(&rng, 3.0, 7.0);
            assert!((0.0..=1.0).contains(&v), "draw {v} out of range");
        }
    }

    #[test]
    fn beta_mean_matches_expected_formula() {
        assert!((beta_mean(1.0, 1.0) - 0.5).abs() < 1e-9);
        assert!((beta_mean(3.0, 1.0) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn skewed_posterior_favors_higher_alpha() {
        let rng = Xorshift64::seeded(2);
        let n = 20_000;
        let mut sum = 0.0;
        for _ in 0..n {
            sum += sample_beta(&rng, 40.0, 2.0);
        }
        let avg = sum / n as f64;
        assert!(avg > 0.85, "average draw {avg} should track the strong alpha-heavy posterior");
    }

    #[test]
    fn gamma_sampler_handles_sub_unit_shape() {
        let rng = Xorshift64::seeded(3);
        for _ in 0..1000 {
            let v = sample_gamma(&rng, 0.05);
            assert!(v >= 0.0 && v.is_finite());
        }
    }
}
