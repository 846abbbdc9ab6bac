extern crate nalgebra as na;

use std::sync::Arc;
use na::Matrix3;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use crate::error::Result;
use crate::mesh::MeshStore;
use crate::numerics::pose::Pose;
use crate::observation::{ObservationModel, PixelModelParameters, check_candidates, depth_loglikelihood};
use crate::render::RigidBodyRenderer;
use crate::sensors::camera::{CameraData, check_image_size};
use crate::state::State;
use crate::Float;

/**
 * Renders every candidate with the software renderer and sums the pixel log-likelihoods.
 * With the `rayon` feature candidates are scored in parallel, each worker owning its renderer and depth buffer.
 */
#[derive(Debug)]
pub struct CpuObservationModel {
    renderer: RigidBodyRenderer,
    camera_matrix: Matrix3<Float>,
    rows: usize,
    cols: usize,
    parameters: PixelModelParameters,
    integrated_poses: State,
    #[cfg(not(feature = "rayon"))]
    depth_buffer: Vec<Float>
}

impl CpuObservationModel {
    pub fn new(mesh_store: Arc<MeshStore>, camera_data: &CameraData, parameters: PixelModelParameters) -> Result<CpuObservationModel> {
        parameters.validate()?;
        let part_count = mesh_store.part_count();
        Ok(CpuObservationModel {
            renderer: RigidBodyRenderer::new(mesh_store, parameters.cull_back_faces),
            camera_matrix: camera_data.projection_matrix,
            rows: camera_data.height,
            cols: camera_data.width,
            parameters,
            integrated_poses: State::identity(part_count),
            #[cfg(not(feature = "rayon"))]
            depth_buffer: Vec::<Float>::with_capacity(camera_data.pixel_count())
        })
    }

    pub fn parameters(&self) -> &PixelModelParameters {
        &self.parameters
    }

    pub fn renderer(&self) -> &RigidBodyRenderer {
        &self.renderer
    }
}

/**
 * Absolute poses of a candidate delta: integrated_i ∘ candidate_i.
 */
pub fn absolute_poses(integrated_poses: &State, candidate: &State) -> Vec<Pose> {
    integrated_poses.poses().iter().zip(candidate.poses().iter()).map(|(i, c)| i.compose(c)).collect()
}

fn score_candidate(renderer: &mut RigidBodyRenderer, buffer: &mut Vec<Float>, camera_matrix: &Matrix3<Float>, rows: usize, cols: usize,
                   integrated_poses: &State, candidate: &State, image: &[Float], parameters: &PixelModelParameters) -> Float {
    renderer.set_pose_list(&absolute_poses(integrated_poses, candidate));
    renderer.render_into(camera_matrix, rows, cols, buffer, None);
    depth_loglikelihood(buffer, image, parameters)
}

impl ObservationModel for CpuObservationModel {
    fn loglikelihood(&mut self, image: &[Float], candidate_states: &[State]) -> Result<Vec<Float>> {
        check_image_size(image, self.cols, self.rows)?;
        check_candidates(candidate_states, self.integrated_poses.part_count())?;

        let (camera_matrix, rows, cols) = (self.camera_matrix, self.rows, self.cols);
        let parameters = self.parameters;
        let integrated_poses = &self.integrated_poses;

        #[cfg(feature = "rayon")]
        let loglikelihoods = {
            let prototype = &self.renderer;
            candidate_states.par_iter().map_init(
                || (prototype.clone(), Vec::<Float>::with_capacity(rows*cols)),
                |(renderer, buffer), candidate| score_candidate(renderer, buffer, &camera_matrix, rows, cols, integrated_poses, candidate, image, &parameters)
            ).collect::<Vec<Float>>()
        };

        #[cfg(not(feature = "rayon"))]
        let loglikelihoods = {
            let renderer = &mut self.renderer;
            let buffer = &mut self.depth_buffer;
            candidate_states.iter().map(|candidate| score_candidate(renderer, buffer, &camera_matrix, rows, cols, integrated_poses, candidate, image, &parameters)).collect::<Vec<Float>>()
        };

        Ok(loglikelihoods)
    }

    fn integrated_poses(&self) -> &State {
        &self.integrated_poses
    }

    fn integrated_poses_mut(&mut self) -> &mut State {
        &mut self.integrated_poses
    }

    fn name(&self) -> &str {
        "CpuObservationModel"
    }
}
