use std::fmt;
use serde::{Serialize, Deserialize};
use tracing::info;
use crate::error::{Result, TrackingError};
use crate::filter::{ParticleFilter, DegeneracyPolicy};
use crate::filter::resampling::ResamplingParameters;
use crate::filter::sampling_block::{SamplingBlock, BlockSchedule};
use crate::io::MeshSource;
use crate::mesh::MeshStore;
use crate::observation::{ObservationModel, PixelModelParameters, CpuObservationModel};
use crate::sensors::camera::CameraData;
use crate::tracker::ObjectTracker;
use crate::transition::{BrownianObjectTransition, TransitionParameters};
use crate::Float;
#[cfg(feature = "gpu")]
use crate::observation::device::{DepthDevice, DeviceObservationModel};

pub use crate::filter::sampling_block::create_sampling_blocks;

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct TrackerParameters {
    pub use_gpu: bool,
    /// Particle budget across all parts; the initial resample keeps evaluation_count/part_count.
    pub evaluation_count: usize,
    /// Frames per second, the transition sees dt = 1/update_rate.
    pub update_rate: Float,
    pub max_kl_divergence: Float,
    pub kld_upper_quantile: Float,
    pub min_particles: usize,
    pub max_particles: usize,
    pub resample_ess_ratio: Float,
    pub block_schedule: BlockSchedule,
    /// None gives one block per part.
    pub sampling_blocks: Option<Vec<Vec<usize>>>,
    pub degeneracy_policy: DegeneracyPolicy,
    pub center_meshes: bool,
    pub seed: u64,
    pub observation: PixelModelParameters,
    pub transition: TransitionParameters
}

impl Default for TrackerParameters {
    fn default() -> Self {
        let resampling = ResamplingParameters::default();
        TrackerParameters {
            use_gpu: false,
            evaluation_count: 400,
            update_rate: 30.0,
            max_kl_divergence: resampling.max_kl_divergence,
            kld_upper_quantile: resampling.kld_upper_quantile,
            min_particles: resampling.min_particles,
            max_particles: resampling.max_particles,
            resample_ess_ratio: resampling.resample_ess_ratio,
            block_schedule: BlockSchedule::default(),
            sampling_blocks: None,
            degeneracy_policy: DegeneracyPolicy::default(),
            center_meshes: true,
            seed: 0x0DDB1A5ECBAD5EED,
            observation: PixelModelParameters::default(),
            transition: TransitionParameters::default()
        }
    }
}

impl TrackerParameters {
    pub fn resampling_parameters(&self) -> ResamplingParameters {
        ResamplingParameters {
            max_kl_divergence: self.max_kl_divergence,
            kld_upper_quantile: self.kld_upper_quantile,
            min_particles: self.min_particles,
            max_particles: self.max_particles,
            resample_ess_ratio: self.resample_ess_ratio
        }
    }

    pub fn delta_time(&self) -> Float {
        1.0/self.update_rate
    }

    pub fn validate(&self) -> Result<()> {
        if self.evaluation_count == 0 {
            return Err(TrackingError::InvalidConfiguration("evaluation_count must be positive".to_string()));
        }
        if !(self.update_rate > 0.0 && self.update_rate.is_finite()) {
            return Err(TrackingError::InvalidConfiguration(format!("update_rate must be positive, got {}", self.update_rate)));
        }
        self.resampling_parameters().validate()?;
        self.observation.validate()?;
        self.transition.validate()
    }
}

impl fmt::Display for TrackerParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut display = String::from(format!("eval_{}_rate_{}_kld_{:+e}_p_{}_{}", self.evaluation_count, self.update_rate, self.max_kl_divergence, self.min_particles, self.max_particles));
        match self.use_gpu {
            true => display.push_str("_gpu"),
            false => display.push_str("_cpu")
        }
        if self.block_schedule == BlockSchedule::RoundRobin {
            display.push_str("_rr");
        }
        display.push_str(format!("_s_{:+e}_{:+e}_t_{:+e}", self.observation.model_sigma, self.observation.sigma_factor, self.observation.tail_weight).as_str());
        write!(f, "{}", display)
    }
}

/**
 * Wires mesh store, transition, observation model and filter into an `ObjectTracker`.
 */
pub struct TrackerBuilder {
    parameters: TrackerParameters,
    camera_data: CameraData,
    #[cfg(feature = "gpu")]
    device: Option<Box<dyn DepthDevice + Send + Sync>>
}

impl TrackerBuilder {
    pub fn new(parameters: TrackerParameters, camera_data: CameraData) -> TrackerBuilder {
        TrackerBuilder {
            parameters,
            camera_data,
            #[cfg(feature = "gpu")]
            device: None
        }
    }

    /**
     * Device used when `use_gpu` is set.
     */
    #[cfg(feature = "gpu")]
    pub fn with_device(mut self, device: Box<dyn DepthDevice + Send + Sync>) -> TrackerBuilder {
        self.device = Some(device);
        self
    }

    pub fn parameters(&self) -> &TrackerParameters {
        &self.parameters
    }

    pub fn build(mut self, mesh_source: &dyn MeshSource) -> Result<ObjectTracker> {
        self.parameters.validate()?;
        self.check_backend()?;

        let mesh_store = MeshStore::load(mesh_source.load()?, self.parameters.center_meshes)?;
        let sampling_blocks = match &self.parameters.sampling_blocks {
            Some(blocks) => blocks.iter().cloned().map(SamplingBlock::new).collect::<Vec<SamplingBlock>>(),
            None => create_sampling_blocks(mesh_store.part_count())
        };

        let observation_model = self.create_observation_model(&mesh_store)?;
        let transition = Box::new(BrownianObjectTransition::new(self.parameters.transition)?);
        let filter = ParticleFilter::new(
            transition,
            observation_model,
            sampling_blocks,
            self.parameters.block_schedule,
            self.parameters.resampling_parameters(),
            self.parameters.degeneracy_policy,
            self.parameters.delta_time(),
            self.parameters.seed
        )?;

        info!(parts = mesh_store.part_count(), triangles = mesh_store.triangle_count(), backend = filter.observation_model().name(), parameters = %self.parameters, "tracker built");
        ObjectTracker::new(filter, mesh_store, self.camera_data, self.parameters.evaluation_count, self.parameters.update_rate)
    }

    #[cfg(feature = "gpu")]
    fn check_backend(&self) -> Result<()> {
        match (self.parameters.use_gpu, self.device.is_some()) {
            (true, false) => Err(TrackingError::BackendUnavailable("use_gpu is set but no depth device was supplied".to_string())),
            _ => Ok(())
        }
    }

    #[cfg(not(feature = "gpu"))]
    fn check_backend(&self) -> Result<()> {
        match self.parameters.use_gpu {
            true => Err(TrackingError::BackendUnavailable("use_gpu is set but the crate was built without the gpu feature".to_string())),
            false => Ok(())
        }
    }

    #[cfg(feature = "gpu")]
    fn create_observation_model(&mut self, mesh_store: &std::sync::Arc<MeshStore>) -> Result<Box<dyn ObservationModel + Send + Sync>> {
        match (self.parameters.use_gpu, self.device.take()) {
            (true, Some(device)) => Ok(Box::new(DeviceObservationModel::new(device, mesh_store.clone(), &self.camera_data, self.parameters.observation)?)),
            (true, None) => Err(TrackingError::BackendUnavailable("no depth device supplied".to_string())),
            (false, _) => Ok(Box::new(CpuObservationModel::new(mesh_store.clone(), &self.camera_data, self.parameters.observation)?))
        }
    }

    #[cfg(not(feature = "gpu"))]
    fn create_observation_model(&mut self, mesh_store: &std::sync::Arc<MeshStore>) -> Result<Box<dyn ObservationModel + Send + Sync>> {
        Ok(Box::new(CpuObservationModel::new(mesh_store.clone(), &self.camera_data, self.parameters.observation)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let parameters = TrackerParameters::default();
        assert!(parameters.validate().is_ok());
        assert!((parameters.delta_time() - 1.0/30.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_rate() {
        let parameters = TrackerParameters { update_rate: 0.0, ..Default::default() };
        assert!(parameters.validate().is_err());
    }

    #[test]
    fn display_names_backend() {
        let parameters = TrackerParameters { use_gpu: true, ..Default::default() };
        assert!(parameters.to_string().contains("_gpu"));
    }
}
