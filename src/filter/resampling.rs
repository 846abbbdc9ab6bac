use std::fmt;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use crate::error::{Result, TrackingError};
use crate::filter::belief::Particle;
use crate::numerics::kld_sample_bound;
use crate::Float;

#[derive(Debug,Clone,Copy,PartialEq)]
pub struct ResamplingParameters {
    pub max_kl_divergence: Float,
    /// Standard normal quantile of the KLD confidence, 2.326 for 99%.
    pub kld_upper_quantile: Float,
    pub min_particles: usize,
    pub max_particles: usize,
    /// Resample only when ESS <= ratio*N.
    pub resample_ess_ratio: Float
}

impl Default for ResamplingParameters {
    fn default() -> Self {
        ResamplingParameters { max_kl_divergence: 0.02, kld_upper_quantile: 2.326, min_particles: 50, max_particles: 2000, resample_ess_ratio: 1.0 }
    }
}

impl ResamplingParameters {
    pub fn validate(&self) -> Result<()> {
        match (self.max_kl_divergence > 0.0, self.min_particles >= 1 && self.min_particles <= self.max_particles, self.resample_ess_ratio >= 0.0) {
            (false, _, _) => Err(TrackingError::InvalidConfiguration(format!("max_kl_divergence must be positive, got {}", self.max_kl_divergence))),
            (_, false, _) => Err(TrackingError::InvalidConfiguration(format!("particle bounds [{}, {}] are invalid", self.min_particles, self.max_particles))),
            (_, _, false) => Err(TrackingError::InvalidConfiguration(format!("resample_ess_ratio must be non negative, got {}", self.resample_ess_ratio))),
            _ => Ok(())
        }
    }
}

impl fmt::Display for ResamplingParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kld eps: {}, quantile: {}, particles: [{}, {}], ess ratio: {}",
            self.max_kl_divergence, self.kld_upper_quantile, self.min_particles, self.max_particles, self.resample_ess_ratio)
    }
}

fn weighted_index(weights: &[Float]) -> Result<WeightedIndex<Float>> {
    WeightedIndex::new(weights).map_err(|_| TrackingError::DegenerateBelief { particles: weights.len() })
}

/**
 * KLD-sampling: draws parents proportional to `weights` into `target` until the sample count
 * reaches the bound for the number of distinct parents drawn, clamped to [min_particles, max_particles].
 * Returns the number of distinct parents.
 */
pub fn kld_resample<R: Rng + ?Sized>(particles: &[Particle], weights: &[Float], parameters: &ResamplingParameters, rng: &mut R, target: &mut Vec<Particle>) -> Result<usize> {
    let index = weighted_index(weights)?;
    let mut occupied = vec![false; particles.len()];
    let mut k = 0;
    let mut bound = 0;
    target.clear();

    loop {
        let parent = index.sample(rng);
        if !occupied[parent] {
            occupied[parent] = true;
            k += 1;
            bound = kld_sample_bound(k, parameters.max_kl_divergence, parameters.kld_upper_quantile);
        }
        target.push(Particle::new(particles[parent].state.clone()));

        let n = target.len();
        if n >= parameters.min_particles && (n >= bound || n >= parameters.max_particles) {
            break;
        }
    }
    Ok(k)
}

/**
 * Draws exactly `count` particles proportional to `weights`.
 */
pub fn resample<R: Rng + ?Sized>(particles: &[Particle], weights: &[Float], count: usize, rng: &mut R, target: &mut Vec<Particle>) -> Result<()> {
    let index = weighted_index(weights)?;
    target.clear();
    target.extend((0..count).map(|_| Particle::new(particles[index.sample(rng)].state.clone())));
    Ok(())
}
