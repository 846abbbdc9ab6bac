extern crate nalgebra as na;

use std::sync::Arc;
use tracing::info;
use crate::error::{Result, TrackingError};
use crate::filter::ParticleFilter;
use crate::mesh::MeshStore;
use crate::numerics::pose::Pose;
use crate::sensors::camera::CameraData;
use crate::state::State;
use crate::transition::Input;
use crate::Float;

pub mod builder;

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum TrackerStatus {
    Uninitialized,
    Tracking
}

/**
 * Runs the particle filter over a sequence of depth frames. Particles hold small deltas around
 * the integrated pose of the observation model; after every step the belief mean is folded into
 * the integrated pose and the particles are re-centered around it.
 * Poses passed in and returned are in the model frame of the meshes.
 */
#[derive(Debug)]
pub struct ObjectTracker {
    filter: ParticleFilter,
    mesh_store: Arc<MeshStore>,
    camera_data: CameraData,
    evaluation_count: usize,
    update_rate: Float,
    status: TrackerStatus
}

impl ObjectTracker {
    pub fn new(filter: ParticleFilter, mesh_store: Arc<MeshStore>, camera_data: CameraData, evaluation_count: usize, update_rate: Float) -> Result<ObjectTracker> {
        if filter.part_count() != mesh_store.part_count() {
            return Err(TrackingError::InvalidConfiguration(format!("filter tracks {} parts, mesh store holds {}", filter.part_count(), mesh_store.part_count())));
        }
        if evaluation_count == 0 {
            return Err(TrackingError::InvalidConfiguration("evaluation_count must be positive".to_string()));
        }
        Ok(ObjectTracker { filter, mesh_store, camera_data, evaluation_count, update_rate, status: TrackerStatus::Uninitialized })
    }

    /**
     * Seeds the filter with `initial_states` and evaluates them against the current depth image of the camera data.
     * Can be called again at any time, the integrated pose restarts from identity.
     */
    pub fn initialize(&mut self, initial_states: Vec<State>) -> Result<State> {
        self.status = TrackerStatus::Uninitialized;
        let part_count = self.part_count();
        let centered_states = initial_states.iter().map(|s| self.to_center_coordinate_system(s)).collect::<Result<Vec<State>>>()?;

        self.filter.observation_model_mut().reset_integrated_poses();
        self.filter.set_particles(centered_states)?;
        self.filter.filter(&self.camera_data.depth_image, &Input::zero(part_count))?;
        self.filter.resample(self.initial_particle_count())?;

        let integrated = self.integrate_belief_mean();
        self.status = TrackerStatus::Tracking;
        info!(seeds = initial_states.len(), particles = self.filter.belief().size(), "tracker initialized");
        self.to_model_coordinate_system(&integrated)
    }

    /**
     * `evaluation_count` split over the parts, kept within the resampling bounds.
     */
    pub fn initial_particle_count(&self) -> usize {
        let resampling = self.filter.resampling_parameters();
        (self.evaluation_count/self.part_count()).clamp(resampling.min_particles, resampling.max_particles)
    }

    pub fn track(&mut self, image: &[Float]) -> Result<State> {
        let input = Input::zero(self.part_count());
        self.track_with_input(image, &input)
    }

    /**
     * Like `track` with a control twist per part driving the transition.
     */
    pub fn track_with_input(&mut self, image: &[Float], input: &Input) -> Result<State> {
        if self.status != TrackerStatus::Tracking {
            return Err(TrackingError::NotInitialized);
        }
        self.filter.filter(image, input)?;
        let integrated = self.integrate_belief_mean();
        self.to_model_coordinate_system(&integrated)
    }

    fn integrate_belief_mean(&mut self) -> State {
        let delta_mean = self.filter.belief().mean();
        for particle in self.filter.belief_mut().particles_mut().iter_mut() {
            particle.state.center_around_zero(&delta_mean);
        }
        let integrated_poses = self.filter.observation_model_mut().integrated_poses_mut();
        integrated_poses.apply_delta(&delta_mean);
        integrated_poses.clone()
    }

    /**
     * Model frame pose (R, t) to the frame centered on each part's center of mass: (R, t + R*offset).
     */
    pub fn to_center_coordinate_system(&self, state: &State) -> Result<State> {
        self.check_part_count(state)?;
        Ok(State::new(state.poses().iter().enumerate().map(|(i, p)| Pose::new(p.rotation, p.translation + p.rotation*self.mesh_store.model_offset(i))).collect()))
    }

    /**
     * Inverse of `to_center_coordinate_system`: (R, t - R*offset).
     */
    pub fn to_model_coordinate_system(&self, state: &State) -> Result<State> {
        self.check_part_count(state)?;
        Ok(State::new(state.poses().iter().enumerate().map(|(i, p)| Pose::new(p.rotation, p.translation - p.rotation*self.mesh_store.model_offset(i))).collect()))
    }

    fn check_part_count(&self, state: &State) -> Result<()> {
        match state.part_count() == self.part_count() {
            true => Ok(()),
            false => Err(TrackingError::InvalidConfiguration(format!("state has {} parts, object has {}", state.part_count(), self.part_count())))
        }
    }

    /**
     * Current integrated pose in the model frame.
     */
    pub fn current_state(&self) -> Result<State> {
        self.to_model_coordinate_system(self.filter.observation_model().integrated_poses())
    }

    pub fn status(&self) -> TrackerStatus {
        self.status
    }

    pub fn part_count(&self) -> usize {
        self.mesh_store.part_count()
    }

    pub fn filter(&self) -> &ParticleFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut ParticleFilter {
        &mut self.filter
    }

    pub fn mesh_store(&self) -> &Arc<MeshStore> {
        &self.mesh_store
    }

    pub fn camera_data(&self) -> &CameraData {
        &self.camera_data
    }

    pub fn camera_data_mut(&mut self) -> &mut CameraData {
        &mut self.camera_data
    }

    pub fn evaluation_count(&self) -> usize {
        self.evaluation_count
    }

    pub fn update_rate(&self) -> Float {
        self.update_rate
    }
}
