use crate::numerics::{log_sum_exp, normalize_log_weights, effective_sample_size};
use crate::state::State;
use crate::Float;

#[derive(Debug,Clone,PartialEq)]
pub struct Particle {
    pub state: State,
    /// Unnormalized, accumulates log-likelihoods between resampling steps.
    pub log_weight: Float
}

impl Particle {
    pub fn new(state: State) -> Particle {
        Particle { state, log_weight: 0.0 }
    }
}

/**
 * Contiguous arena of weighted particles. The count changes with every adaptive resampling step.
 */
#[derive(Debug,Clone)]
pub struct Belief {
    particles: Vec<Particle>,
    weights: Vec<Float>,
    log_weight_buffer: Vec<Float>,
    part_count: usize
}

impl Belief {
    pub fn new(states: Vec<State>, capacity: usize) -> Belief {
        let part_count = states.first().map_or(0, |s| s.part_count());
        let mut particles = Vec::<Particle>::with_capacity(capacity.max(states.len()));
        particles.extend(states.into_iter().map(Particle::new));
        let mut belief = Belief {
            particles,
            weights: Vec::<Float>::with_capacity(capacity),
            log_weight_buffer: Vec::<Float>::with_capacity(capacity),
            part_count
        };
        belief.set_uniform_weights();
        belief
    }

    pub fn size(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn part_count(&self) -> usize {
        self.part_count
    }

    pub fn particles(&self) -> &Vec<Particle> {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut Vec<Particle> {
        &mut self.particles
    }

    pub fn location(&self, index: usize) -> &State {
        &self.particles[index].state
    }

    pub fn location_mut(&mut self, index: usize) -> &mut State {
        &mut self.particles[index].state
    }

    pub fn states(&self) -> impl Iterator<Item = &State> + Clone {
        self.particles.iter().map(|p| &p.state)
    }

    /// Normalized weights, in particle order.
    pub fn weights(&self) -> &Vec<Float> {
        &self.weights
    }

    pub fn log_weights(&self) -> Vec<Float> {
        self.particles.iter().map(|p| p.log_weight).collect()
    }

    /**
     * Recomputes normalized weights from the accumulated log weights. Returns the log-sum-exp normalizer,
     * weights are only updated when it is finite.
     */
    pub fn normalize(&mut self) -> Float {
        self.log_weight_buffer.clear();
        self.log_weight_buffer.extend(self.particles.iter().map(|p| p.log_weight));
        let normalizer = log_sum_exp(&self.log_weight_buffer);
        if normalizer.is_finite() {
            normalize_log_weights(&self.log_weight_buffer, &mut self.weights);
        }
        normalizer
    }

    /**
     * Moves predicted states and their accumulated log weights into the arena, in particle order.
     * `states` is left empty with its capacity.
     */
    pub(crate) fn update(&mut self, states: &mut Vec<State>, log_weights: &[Float]) {
        assert_eq!(states.len(), self.particles.len());
        for ((particle, state), &log_weight) in self.particles.iter_mut().zip(states.drain(..)).zip(log_weights.iter()) {
            particle.state = state;
            particle.log_weight = log_weight;
        }
    }

    pub fn set_uniform_weights(&mut self) {
        let n = self.particles.len();
        for p in self.particles.iter_mut() {
            p.log_weight = 0.0;
        }
        self.weights.clear();
        self.weights.resize(n, 1.0/(n.max(1) as Float));
    }

    pub fn effective_sample_size(&self) -> Float {
        effective_sample_size(&self.weights)
    }

    /**
     * Weighted mean state using the current normalized weights.
     */
    pub fn mean(&self) -> State {
        State::weighted_mean(self.states(), &self.weights, self.part_count)
    }

    /**
     * Replaces the particles by the ones in `scratch`, keeping both allocations alive.
     */
    pub(crate) fn swap_particles(&mut self, scratch: &mut Vec<Particle>) {
        std::mem::swap(&mut self.particles, scratch);
        scratch.clear();
        self.set_uniform_weights();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::pose::Pose;
    use nalgebra::Vector3;

    #[test]
    fn normalized_weights_sum_to_one() {
        let mut belief = Belief::new(vec![State::identity(1); 4], 8);
        for (i, p) in belief.particles_mut().iter_mut().enumerate() {
            p.log_weight = -1000.0*(i as Float);
        }
        assert!(belief.normalize().is_finite());
        assert!((belief.weights().iter().sum::<Float>() - 1.0).abs() < 1e-12);
        assert!(belief.weights()[0] > 0.99);
    }

    #[test]
    fn collapse_keeps_previous_weights() {
        let mut belief = Belief::new(vec![State::identity(1); 2], 2);
        for p in belief.particles_mut().iter_mut() {
            p.log_weight = Float::NEG_INFINITY;
        }
        assert!(!belief.normalize().is_finite());
        assert_eq!(belief.weights(), &vec![0.5, 0.5]);
    }

    #[test]
    fn mean_of_translations() {
        let states = vec![
            State::new(vec![Pose::new(nalgebra::Matrix3::identity(), Vector3::new(1.0,0.0,0.0))]),
            State::new(vec![Pose::new(nalgebra::Matrix3::identity(), Vector3::new(3.0,0.0,0.0))])
        ];
        let mut belief = Belief::new(states, 2);
        let mean = belief.mean();
        assert!((mean[0].translation - Vector3::new(2.0,0.0,0.0)).norm() < 1e-12);

        belief.location_mut(1).center_around_zero(&mean);
        assert!((belief.location(1)[0].translation - Vector3::new(1.0,0.0,0.0)).norm() < 1e-12);
    }
}
