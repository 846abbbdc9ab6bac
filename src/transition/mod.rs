extern crate nalgebra as na;
extern crate rand_distr;

use std::fmt;
use na::Vector6;
use rand::RngCore;
use rand_distr::{Normal, Distribution};
use serde::{Serialize, Deserialize};
use crate::error::{Result, TrackingError};
use crate::numerics::pose::Pose;
use crate::state::State;
use crate::Float;

/**
 * Control input: one twist (translation velocity, angular velocity) per part.
 */
#[derive(Debug,Clone,PartialEq)]
pub struct Input {
    pub velocities: Vec<Vector6<Float>>
}

impl Input {
    pub fn zero(part_count: usize) -> Input {
        Input { velocities: vec![Vector6::<Float>::zeros(); part_count] }
    }
}

pub trait StateTransition {
    /**
     * Draws a perturbed copy of `state` in which only the poses listed in `parts` move.
     */
    fn predict(&self, state: &State, parts: &[usize], delta_time: Float, input: &Input, rng: &mut dyn RngCore) -> State;
    fn name(&self) -> &str;
}

impl fmt::Debug for dyn StateTransition + Send + Sync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct TransitionParameters {
    /// Translation noise, meters per sqrt(second).
    pub linear_sigma: Float,
    /// Rotation noise, radians per sqrt(second).
    pub angular_sigma: Float,
    /// Scales the control input twist.
    pub velocity_factor: Float
}

impl Default for TransitionParameters {
    fn default() -> Self {
        TransitionParameters { linear_sigma: 0.002, angular_sigma: 0.01, velocity_factor: 1.0 }
    }
}

impl TransitionParameters {
    pub fn validate(&self) -> Result<()> {
        match self.linear_sigma >= 0.0 && self.angular_sigma >= 0.0 && self.velocity_factor.is_finite() {
            true => Ok(()),
            false => Err(TrackingError::InvalidConfiguration(format!("transition parameters invalid: {:?}", self)))
        }
    }
}

/**
 * Brownian motion on SE3 per part, optionally driven by the control twist:
 * pose <- exp(twist*dt*velocity_factor + noise*sqrt(dt)) ∘ pose
 */
#[derive(Debug,Clone)]
pub struct BrownianObjectTransition {
    parameters: TransitionParameters,
    linear_noise: Normal<Float>,
    angular_noise: Normal<Float>
}

impl BrownianObjectTransition {
    pub fn new(parameters: TransitionParameters) -> Result<BrownianObjectTransition> {
        parameters.validate()?;
        let linear_noise = Normal::new(0.0, parameters.linear_sigma).map_err(|e| TrackingError::InvalidConfiguration(e.to_string()))?;
        let angular_noise = Normal::new(0.0, parameters.angular_sigma).map_err(|e| TrackingError::InvalidConfiguration(e.to_string()))?;
        Ok(BrownianObjectTransition { parameters, linear_noise, angular_noise })
    }

    pub fn parameters(&self) -> &TransitionParameters {
        &self.parameters
    }
}

impl StateTransition for BrownianObjectTransition {
    fn predict(&self, state: &State, parts: &[usize], delta_time: Float, input: &Input, rng: &mut dyn RngCore) -> State {
        let mut predicted = state.clone();
        let noise_scale = delta_time.max(0.0).sqrt();

        for &part in parts {
            let mut twist = input.velocities.get(part).map_or(Vector6::<Float>::zeros(), |v| v*(delta_time*self.parameters.velocity_factor));
            for i in 0..3 {
                twist[i] += self.linear_noise.sample(rng)*noise_scale;
                twist[i+3] += self.angular_noise.sample(rng)*noise_scale;
            }
            predicted[part] = Pose::from_twist(&twist).compose(&state[part]);
        }

        predicted
    }

    fn name(&self) -> &str {
        "BrownianObjectTransition"
    }
}
