//! Monte Carlo simulation of future trend paths.
//!
//! Future rate changes are assumed to arrive like the historical ones:
//! - count: `Poisson(S · (T - 1))` where `S` is the number of fitted changepoints
//! - position: uniform on `(1, T)` in scaled time
//! - size: `Laplace(0, mean|δ|)`
//!
//! Each path draws from its own `StdRng` derived from the run seed and the path
//! index, so paths can be generated in parallel and the result does not depend
//! on thread scheduling.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Exp, Normal, Poisson};
use rayon::prelude::*;

use crate::domain::TrendParams;
use crate::math::hinge;
use crate::models::trend_value;

/// Added to the Laplace scale so a changepoint-free fit still samples a valid distribution.
const LAPLACE_SCALE_FLOOR: f64 = 1e-8;

/// Derive the RNG seed for one path.
pub fn path_seed(seed: u64, path: usize) -> u64 {
    // splitmix64 step
    let mut z = seed.wrapping_add((path as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// One sampled set of future changepoints `(t, delta)`.
fn sample_future_changepoints(trend: &TrendParams, t_end: f64, rng: &mut StdRng) -> Vec<(f64, f64)> {
    let n_hist = trend.changepoints.len();
    if n_hist == 0 || t_end <= 1.0 {
        return Vec::new();
    }

    let rate = n_hist as f64 * (t_end - 1.0);
    let count = match Poisson::new(rate) {
        Ok(poisson) => poisson.sample(rng) as usize,
        Err(_) => 0,
    };
    if count == 0 {
        return Vec::new();
    }

    let mean_abs = trend.changepoints.iter().map(|c| c.delta.abs()).sum::<f64>() / n_hist as f64;
    let scale = mean_abs + LAPLACE_SCALE_FLOOR;
    let Ok(exp) = Exp::new(1.0 / scale) else {
        return Vec::new();
    };

    (0..count)
        .map(|_| {
            let t = rng.gen_range(1.0..t_end);
            let magnitude: f64 = exp.sample(rng);
            let delta = if rng.gen_bool(0.5) { magnitude } else { -magnitude };
            (t, delta)
        })
        .collect()
}

/// Simulated outcomes (scaled units, before noise) for every future time.
///
/// `compose_at(i, g)` maps a trend value at `future_t[i]` to the scaled
/// prediction. Returns one row per path, each of length `future_t.len()`,
/// with `Normal(0, sigma)` noise added.
pub fn simulate_paths<F>(
    trend: &TrendParams,
    future_t: &[f64],
    sigma: f64,
    n_paths: usize,
    seed: u64,
    compose_at: F,
) -> Vec<Vec<f64>>
where
    F: Fn(usize, f64) -> f64 + Sync,
{
    let t_end = future_t.iter().copied().fold(1.0_f64, f64::max);
    let noise = Normal::new(0.0, sigma.max(0.0)).ok();

    (0..n_paths)
        .into_par_iter()
        .map(|path| {
            let mut rng = StdRng::seed_from_u64(path_seed(seed, path));
            let extra = sample_future_changepoints(trend, t_end, &mut rng);
            future_t
                .iter()
                .enumerate()
                .map(|(i, &t)| {
                    let g = trend_value(trend, t) + extra.iter().map(|&(s, d)| d * hinge(t, s)).sum::<f64>();
                    let eps = noise.map(|n| n.sample(&mut rng)).unwrap_or(0.0);
                    compose_at(i, g) + eps
                })
                .collect()
        })
        .collect()
}

/// Standard-normal noise draws (sorted) used for historical bounds.
pub fn sorted_noise_draws(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(path_seed(seed, usize::MAX));
    let mut draws: Vec<f64> = match Normal::new(0.0, 1.0) {
        Ok(normal) => (0..n).map(|_| normal.sample(&mut rng)).collect(),
        Err(_) => vec![0.0; n],
    };
    draws.sort_by(f64::total_cmp);
    draws
}
