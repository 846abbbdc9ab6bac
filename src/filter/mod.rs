use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};
use crate::error::{Result, TrackingError};
use crate::numerics::log_sum_exp;
use crate::observation::ObservationModel;
use crate::state::State;
use crate::transition::{Input, StateTransition};
use crate::Float;

pub mod sampling_block;
pub mod belief;
pub mod resampling;

use self::belief::{Belief, Particle};
use self::resampling::{ResamplingParameters, kld_resample};
use self::sampling_block::{SamplingBlock, BlockSchedule, BlockScheduler, validate_sampling_blocks};

/**
 * What to do when every particle evaluates to zero likelihood.
 */
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub enum DegeneracyPolicy {
    /// Abort the step with `DegenerateBelief`, leaving the belief untouched.
    Fail,
    /// Continue with uniform weights over the predicted particles.
    Reseed
}

impl Default for DegeneracyPolicy {
    fn default() -> Self {
        DegeneracyPolicy::Fail
    }
}

#[derive(Debug)]
pub struct ParticleFilter {
    transition: Box<dyn StateTransition + Send + Sync>,
    observation_model: Box<dyn ObservationModel + Send + Sync>,
    sampling_blocks: Vec<SamplingBlock>,
    scheduler: BlockScheduler,
    resampling: ResamplingParameters,
    degeneracy_policy: DegeneracyPolicy,
    delta_time: Float,
    belief: Belief,
    scratch: Vec<Particle>,
    predicted: Vec<State>,
    log_weights: Vec<Float>,
    rng: SmallRng
}

impl ParticleFilter {
    pub fn new(transition: Box<dyn StateTransition + Send + Sync>, observation_model: Box<dyn ObservationModel + Send + Sync>,
               sampling_blocks: Vec<SamplingBlock>, schedule: BlockSchedule, resampling: ResamplingParameters,
               degeneracy_policy: DegeneracyPolicy, delta_time: Float, seed: u64) -> Result<ParticleFilter> {
        let part_count = observation_model.integrated_poses().part_count();
        validate_sampling_blocks(&sampling_blocks, part_count)?;
        resampling.validate()?;
        if !(delta_time > 0.0 && delta_time.is_finite()) {
            return Err(TrackingError::InvalidConfiguration(format!("delta time must be positive, got {}", delta_time)));
        }

        let scheduler = BlockScheduler::new(schedule, sampling_blocks.len());
        Ok(ParticleFilter {
            transition,
            observation_model,
            sampling_blocks,
            scheduler,
            resampling,
            degeneracy_policy,
            delta_time,
            belief: Belief::new(Vec::new(), resampling.max_particles),
            scratch: Vec::<Particle>::with_capacity(resampling.max_particles),
            predicted: Vec::<State>::with_capacity(resampling.max_particles),
            log_weights: Vec::<Float>::with_capacity(resampling.max_particles),
            rng: SmallRng::seed_from_u64(seed)
        })
    }

    pub fn part_count(&self) -> usize {
        self.observation_model.integrated_poses().part_count()
    }

    /**
     * Replaces the belief with one uniformly weighted particle per state.
     */
    pub fn set_particles(&mut self, states: Vec<State>) -> Result<()> {
        if states.is_empty() {
            return Err(TrackingError::InvalidConfiguration("at least one initial state is required".to_string()));
        }
        let part_count = self.part_count();
        if let Some(s) = states.iter().find(|s| s.part_count() != part_count) {
            return Err(TrackingError::InvalidConfiguration(format!("initial state has {} parts, model has {}", s.part_count(), part_count)));
        }
        self.belief = Belief::new(states, self.resampling.max_particles);
        self.scratch.clear();
        self.scheduler.reset();
        Ok(())
    }

    /**
     * One filter step: every scheduled block runs predict, evaluate, normalize and adaptive resample.
     */
    pub fn filter(&mut self, image: &[Float], input: &Input) -> Result<()> {
        if self.belief.is_empty() {
            return Err(TrackingError::NotInitialized);
        }
        for block_index in self.scheduler.next_blocks() {
            self.filter_block(image, input, block_index)?;
        }
        Ok(())
    }

    fn filter_block(&mut self, image: &[Float], input: &Input, block_index: usize) -> Result<()> {
        let parts = &self.sampling_blocks[block_index].parts;
        let transition = &self.transition;
        let delta_time = self.delta_time;
        let rng = &mut self.rng;
        self.predicted.clear();
        self.predicted.extend(self.belief.particles().iter().map(|p| transition.predict(&p.state, parts, delta_time, input, &mut *rng)));

        let loglikelihoods = self.observation_model.loglikelihood(image, &self.predicted)?;
        self.log_weights.clear();
        self.log_weights.extend(self.belief.particles().iter().zip(loglikelihoods.iter()).map(|(p, l)| p.log_weight + l));
        let normalizer = log_sum_exp(&self.log_weights);

        match normalizer.is_finite() {
            true => {
                self.belief.update(&mut self.predicted, &self.log_weights);
                self.belief.normalize();
            },
            false => match self.degeneracy_policy {
                DegeneracyPolicy::Fail => return Err(TrackingError::DegenerateBelief { particles: self.belief.size() }),
                DegeneracyPolicy::Reseed => {
                    warn!(particles = self.belief.size(), block = block_index, "likelihood collapse, continuing with uniform weights");
                    self.belief.update(&mut self.predicted, &self.log_weights);
                    self.belief.set_uniform_weights();
                }
            }
        }

        let particles_before = self.belief.size();
        let ess = self.belief.effective_sample_size();
        let resampled = match ess <= self.resampling.resample_ess_ratio*(particles_before as Float) {
            true => {
                let occupied = kld_resample(self.belief.particles(), self.belief.weights(), &self.resampling, &mut self.rng, &mut self.scratch)?;
                self.belief.swap_particles(&mut self.scratch);
                Some(occupied)
            },
            false => None
        };

        debug!(block = block_index, normalizer, ess, particles_before, particles_after = self.belief.size(), occupied = ?resampled, "filter step");
        Ok(())
    }

    /**
     * Resamples the current belief to exactly `count` particles.
     */
    pub fn resample(&mut self, count: usize) -> Result<()> {
        if self.belief.is_empty() {
            return Err(TrackingError::NotInitialized);
        }
        resampling::resample(self.belief.particles(), self.belief.weights(), count.max(1), &mut self.rng, &mut self.scratch)?;
        self.belief.swap_particles(&mut self.scratch);
        Ok(())
    }

    pub fn belief(&self) -> &Belief {
        &self.belief
    }

    pub fn belief_mut(&mut self) -> &mut Belief {
        &mut self.belief
    }

    pub fn observation_model(&self) -> &(dyn ObservationModel + Send + Sync) {
        self.observation_model.as_ref()
    }

    pub fn observation_model_mut(&mut self) -> &mut (dyn ObservationModel + Send + Sync) {
        self.observation_model.as_mut()
    }

    pub fn sampling_blocks(&self) -> &Vec<SamplingBlock> {
        &self.sampling_blocks
    }

    pub fn scheduler(&self) -> &BlockScheduler {
        &self.scheduler
    }

    pub fn resampling_parameters(&self) -> &ResamplingParameters {
        &self.resampling
    }

    pub fn degeneracy_policy(&self) -> DegeneracyPolicy {
        self.degeneracy_policy
    }

    pub fn delta_time(&self) -> Float {
        self.delta_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Vector3};
    use crate::numerics::pose::Pose;
    use crate::transition::{BrownianObjectTransition, TransitionParameters};
    use crate::filter::sampling_block::create_sampling_blocks;

    /// Scores candidates by the distance of the absolute translation to a target point.
    struct PointModel {
        target: Vector3<Float>,
        integrated_poses: State,
        collapse: bool
    }

    impl ObservationModel for PointModel {
        fn loglikelihood(&mut self, _image: &[Float], candidate_states: &[State]) -> Result<Vec<Float>> {
            Ok(candidate_states.iter().map(|c| match self.collapse {
                true => Float::NEG_INFINITY,
                false => -((self.integrated_poses[0].compose(&c[0]).translation - self.target).norm_squared())/(2.0*0.01*0.01)
            }).collect())
        }

        fn integrated_poses(&self) -> &State {
            &self.integrated_poses
        }

        fn integrated_poses_mut(&mut self) -> &mut State {
            &mut self.integrated_poses
        }

        fn name(&self) -> &str {
            "PointModel"
        }
    }

    fn filter_for(collapse: bool, policy: DegeneracyPolicy) -> ParticleFilter {
        let transition = BrownianObjectTransition::new(TransitionParameters { linear_sigma: 0.05, angular_sigma: 0.0, velocity_factor: 1.0 }).unwrap();
        let model = PointModel { target: Vector3::new(0.01, 0.0, 0.0), integrated_poses: State::identity(1), collapse };
        let resampling = ResamplingParameters { min_particles: 20, max_particles: 400, ..Default::default() };
        ParticleFilter::new(Box::new(transition), Box::new(model), create_sampling_blocks(1), BlockSchedule::All, resampling, policy, 1.0, 11).unwrap()
    }

    #[test]
    fn particle_count_stays_within_bounds() {
        let mut filter = filter_for(false, DegeneracyPolicy::Fail);
        filter.set_particles(vec![State::identity(1); 100]).unwrap();
        for _ in 0..5 {
            filter.filter(&[], &Input::zero(1)).unwrap();
            let size = filter.belief().size();
            assert!(size >= 20 && size <= 400, "size {}", size);
            assert!((filter.belief().weights().iter().sum::<Float>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn collapse_fails_and_keeps_belief() {
        let mut filter = filter_for(true, DegeneracyPolicy::Fail);
        let initial = vec![State::new(vec![Pose::new(Matrix3::identity(), Vector3::new(0.5,0.0,0.0))]); 30];
        filter.set_particles(initial.clone()).unwrap();
        let result = filter.filter(&[], &Input::zero(1));
        assert!(matches!(result, Err(TrackingError::DegenerateBelief { particles: 30 })));
        assert!(filter.belief().states().zip(initial.iter()).all(|(a, b)| a == b));
    }

    #[test]
    fn collapse_reseeds_with_uniform_weights() {
        let mut filter = filter_for(true, DegeneracyPolicy::Reseed);
        filter.set_particles(vec![State::identity(1); 30]).unwrap();
        filter.filter(&[], &Input::zero(1)).unwrap();
        let size = filter.belief().size();
        assert!(size >= 20);
        assert!(filter.belief().weights().iter().all(|&w| (w - 1.0/(size as Float)).abs() < 1e-12));
    }

    #[test]
    fn fixed_resample_sets_count() {
        let mut filter = filter_for(false, DegeneracyPolicy::Fail);
        filter.set_particles(vec![State::identity(1); 10]).unwrap();
        filter.resample(77).unwrap();
        assert_eq!(filter.belief().size(), 77);
    }

    #[test]
    fn step_buffers_are_reused() {
        let mut filter = filter_for(false, DegeneracyPolicy::Fail);
        filter.set_particles(vec![State::identity(1); 100]).unwrap();
        filter.filter(&[], &Input::zero(1)).unwrap();
        let buffers = (filter.predicted.as_ptr(), filter.log_weights.as_ptr(), filter.belief().weights().as_ptr());
        for _ in 0..5 {
            filter.filter(&[], &Input::zero(1)).unwrap();
            assert_eq!((filter.predicted.as_ptr(), filter.log_weights.as_ptr(), filter.belief().weights().as_ptr()), buffers);
            assert!(filter.predicted.is_empty());
        }
    }

    #[test]
    fn filter_without_particles_is_a_usage_error() {
        let mut filter = filter_for(false, DegeneracyPolicy::Fail);
        assert!(matches!(filter.filter(&[], &Input::zero(1)), Err(TrackingError::NotInitialized)));
    }
}
