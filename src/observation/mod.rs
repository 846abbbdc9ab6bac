extern crate nalgebra as na;

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::error::{Result, TrackingError};
use crate::sensors::camera::is_valid_depth;
use crate::state::State;
use crate::numerics::gauss_1d;
use crate::render::NO_HIT;
use crate::Float;

pub mod cpu;
#[cfg(feature = "gpu")]
pub mod device;

pub use self::cpu::CpuObservationModel;

/**
 * Scores depth images against hypothesized states. Candidates are deltas around the integrated pose
 * which the model owns for the whole tracking session.
 */
pub trait ObservationModel {
    /// One log-likelihood per candidate. Only internal render buffers are touched.
    fn loglikelihood(&mut self, image: &[Float], candidate_states: &[State]) -> Result<Vec<Float>>;
    fn integrated_poses(&self) -> &State;
    fn integrated_poses_mut(&mut self) -> &mut State;
    fn reset_integrated_poses(&mut self) {
        let part_count = self.integrated_poses().part_count();
        *self.integrated_poses_mut() = State::identity(part_count);
    }
    fn name(&self) -> &str;
}

impl fmt::Debug for dyn ObservationModel + Send + Sync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct PixelModelParameters {
    /// Constant part of the depth noise, meters.
    pub model_sigma: Float,
    /// Quadratic growth of the depth noise with distance.
    pub sigma_factor: Float,
    /// Probability mass of outliers, occlusions and missing returns.
    pub tail_weight: Float,
    /// Far end of the sensor range, meters.
    pub max_depth: Float,
    pub cull_back_faces: bool
}

impl Default for PixelModelParameters {
    fn default() -> Self {
        PixelModelParameters { model_sigma: 0.003, sigma_factor: 0.00142478, tail_weight: 0.01, max_depth: 6.0, cull_back_faces: true }
    }
}

impl PixelModelParameters {
    pub fn validate(&self) -> Result<()> {
        let valid = self.model_sigma > 0.0 && self.sigma_factor >= 0.0
            && self.tail_weight > 0.0 && self.tail_weight < 1.0
            && self.max_depth > 0.0 && self.max_depth.is_finite();
        match valid {
            true => Ok(()),
            false => Err(TrackingError::InvalidConfiguration(format!("pixel model parameters invalid: {:?}", self)))
        }
    }
}

/**
 * Log-likelihood ratio of one pixel against the background hypothesis.
 * Pixels where nothing is rendered are neutral, missing returns on rendered pixels get the tail mass,
 * measurements in front of the surface may come from an unmodeled occluder.
 */
pub fn pixel_loglikelihood(rendered: Float, measured: Float, parameters: &PixelModelParameters) -> Float {
    if rendered == NO_HIT {
        return 0.0;
    }
    if !is_valid_depth(measured) {
        return parameters.tail_weight.ln();
    }

    let sigma = parameters.model_sigma + parameters.sigma_factor*rendered*rendered;
    let surface = (1.0 - parameters.tail_weight)*gauss_1d(measured, rendered, sigma);
    let outlier = match measured < rendered {
        true => parameters.tail_weight/rendered,
        false => parameters.tail_weight/parameters.max_depth
    };
    (surface + outlier).ln() + parameters.max_depth.ln()
}

/**
 * Sum of pixel terms in row major order, independent of how candidates are scheduled.
 */
pub fn depth_loglikelihood(rendered: &[Float], measured: &[Float], parameters: &PixelModelParameters) -> Float {
    rendered.iter().zip(measured.iter()).map(|(&r, &z)| pixel_loglikelihood(r, z, parameters)).sum()
}

pub fn check_candidates(candidate_states: &[State], part_count: usize) -> Result<()> {
    match candidate_states.iter().find(|s| s.part_count() != part_count) {
        Some(s) => Err(TrackingError::InvalidConfiguration(format!("candidate state has {} parts, model has {}", s.part_count(), part_count))),
        None => Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_hit_pixels_are_neutral() {
        let parameters = PixelModelParameters::default();
        assert_eq!(pixel_loglikelihood(NO_HIT, 1.0, &parameters), 0.0);
        assert_eq!(pixel_loglikelihood(NO_HIT, 0.0, &parameters), 0.0);
        assert_eq!(pixel_loglikelihood(NO_HIT, Float::NAN, &parameters), 0.0);
    }

    #[test]
    fn missing_return_on_surface_gets_tail_mass() {
        let parameters = PixelModelParameters::default();
        let value = pixel_loglikelihood(1.0, Float::NAN, &parameters);
        assert!((value - parameters.tail_weight.ln()).abs() < 1e-12);
    }

    #[test]
    fn matching_depth_beats_offset_depth() {
        let parameters = PixelModelParameters::default();
        let hit = pixel_loglikelihood(1.0, 1.0, &parameters);
        let behind = pixel_loglikelihood(1.0, 1.1, &parameters);
        let occluded = pixel_loglikelihood(1.0, 0.5, &parameters);
        assert!(hit > behind);
        assert!(hit > occluded);
        assert!(occluded > behind);
        assert!([hit, behind, occluded].iter().all(|v| v.is_finite()));
    }
}
