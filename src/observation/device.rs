extern crate nalgebra as na;

use std::sync::Arc;
use na::Matrix3;
use crate::error::{Result, TrackingError};
use crate::mesh::MeshStore;
use crate::numerics::pose::Pose;
use crate::observation::{ObservationModel, PixelModelParameters, check_candidates, depth_loglikelihood};
use crate::observation::cpu::absolute_poses;
use crate::sensors::camera::{CameraData, check_image_size};
use crate::state::State;
use crate::Float;

/**
 * Compute device that renders many pose sets in one dispatch. Kernel compilation and memory
 * management belong to the implementor.
 */
pub trait DepthDevice {
    fn upload_meshes(&mut self, mesh_store: &MeshStore) -> Result<()>;
    /**
     * Depth buffers of all pose sets back to back, each rows*cols long, row major, +inf where nothing was hit.
     */
    fn render_batch(&mut self, camera_matrix: &Matrix3<Float>, rows: usize, cols: usize, pose_sets: &[Vec<Pose>]) -> Result<Vec<Float>>;
    fn name(&self) -> &str;
}

/**
 * Observation model that delegates rendering of all candidates to a device in one batch.
 * Scores are reduced on the host in pixel order, so they match the cpu model for identical depth buffers.
 */
pub struct DeviceObservationModel {
    device: Box<dyn DepthDevice + Send + Sync>,
    camera_matrix: Matrix3<Float>,
    rows: usize,
    cols: usize,
    parameters: PixelModelParameters,
    integrated_poses: State
}

impl DeviceObservationModel {
    pub fn new(mut device: Box<dyn DepthDevice + Send + Sync>, mesh_store: Arc<MeshStore>, camera_data: &CameraData, parameters: PixelModelParameters) -> Result<DeviceObservationModel> {
        parameters.validate()?;
        device.upload_meshes(&mesh_store)?;
        Ok(DeviceObservationModel {
            device,
            camera_matrix: camera_data.projection_matrix,
            rows: camera_data.height,
            cols: camera_data.width,
            parameters,
            integrated_poses: State::identity(mesh_store.part_count())
        })
    }
}

impl ObservationModel for DeviceObservationModel {
    fn loglikelihood(&mut self, image: &[Float], candidate_states: &[State]) -> Result<Vec<Float>> {
        check_image_size(image, self.cols, self.rows)?;
        check_candidates(candidate_states, self.integrated_poses.part_count())?;

        let pose_sets = candidate_states.iter().map(|c| absolute_poses(&self.integrated_poses, c)).collect::<Vec<Vec<Pose>>>();
        let depth = self.device.render_batch(&self.camera_matrix, self.rows, self.cols, &pose_sets)?;
        let pixel_count = self.rows*self.cols;
        if depth.len() != pixel_count*candidate_states.len() {
            return Err(TrackingError::BackendUnavailable(format!("{} returned {} depth values for {} candidates", self.device.name(), depth.len(), candidate_states.len())));
        }

        Ok(depth.chunks(pixel_count.max(1)).take(candidate_states.len()).map(|rendered| depth_loglikelihood(rendered, image, &self.parameters)).collect())
    }

    fn integrated_poses(&self) -> &State {
        &self.integrated_poses
    }

    fn integrated_poses_mut(&mut self) -> &mut State {
        &mut self.integrated_poses
    }

    fn name(&self) -> &str {
        "DeviceObservationModel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::generators::cube;
    use crate::observation::CpuObservationModel;
    use crate::render::RigidBodyRenderer;

    /// Renders on the host, standing in for a compute device.
    struct HostDevice {
        renderer: Option<RigidBodyRenderer>
    }

    impl DepthDevice for HostDevice {
        fn upload_meshes(&mut self, mesh_store: &MeshStore) -> Result<()> {
            self.renderer = Some(RigidBodyRenderer::new(Arc::new(mesh_store.clone()), true));
            Ok(())
        }

        fn render_batch(&mut self, camera_matrix: &Matrix3<Float>, rows: usize, cols: usize, pose_sets: &[Vec<Pose>]) -> Result<Vec<Float>> {
            let renderer = self.renderer.as_mut().ok_or_else(|| TrackingError::BackendUnavailable("meshes not uploaded".to_string()))?;
            let mut depth = Vec::<Float>::with_capacity(rows*cols*pose_sets.len());
            for poses in pose_sets {
                renderer.set_pose_list(poses);
                depth.extend(renderer.render(camera_matrix, rows, cols));
            }
            Ok(depth)
        }

        fn name(&self) -> &str {
            "HostDevice"
        }
    }

    #[test]
    fn batched_scores_match_cpu_scores() {
        let mesh_store = MeshStore::load(vec![cube(0.2)], true).unwrap();
        let k = Matrix3::<Float>::new(60.0,0.0,16.0, 0.0,60.0,12.0, 0.0,0.0,1.0);
        let camera_data = CameraData::new(k, 32, 24, vec![0.95; 32*24]).unwrap();
        let mut device_model = DeviceObservationModel::new(Box::new(HostDevice { renderer: None }), mesh_store.clone(), &camera_data, PixelModelParameters::default()).unwrap();
        let mut cpu_model = CpuObservationModel::new(mesh_store, &camera_data, PixelModelParameters::default()).unwrap();

        let candidates = [0.9, 1.0, 1.1].iter().map(|&z| State::new(vec![Pose::new(Matrix3::identity(), nalgebra::Vector3::new(0.0, 0.0, z))])).collect::<Vec<State>>();
        let device_scores = device_model.loglikelihood(&camera_data.depth_image, &candidates).unwrap();
        let cpu_scores = cpu_model.loglikelihood(&camera_data.depth_image, &candidates).unwrap();
        assert_eq!(device_scores, cpu_scores);
    }
}
