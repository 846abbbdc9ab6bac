extern crate nalgebra as na;
use color_eyre::eyre::Result;

use na::{Matrix3, Vector3};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_distr::{Normal, Distribution};
use depth_tracking::{Float, Pose, State, CameraData, TrackerBuilder, TrackerParameters};
use depth_tracking::io::InMemoryMeshSource;
use depth_tracking::mesh::{MeshStore, generators::cube};
use depth_tracking::render::RigidBodyRenderer;

fn main() -> Result<()> {
    color_eyre::install()?;

    let (width, height) = (160, 120);
    let camera_matrix = Matrix3::<Float>::new(
        150.0, 0.0, 80.0,
        0.0, 150.0, 60.0,
        0.0, 0.0, 1.0);
    let mesh_source = InMemoryMeshSource::new(vec![cube(0.2)]);

    // Ground truth drifts sideways and spins slowly around y.
    let true_pose = |frame: usize| {
        let t = frame as Float;
        Pose::from_axis_angle(&Vector3::new(0.0, 0.01*t, 0.0), Vector3::new(0.002*t, 0.0, 1.0))
    };

    let truth_renderer = RigidBodyRenderer::new(MeshStore::load(vec![cube(0.2)], true)?, true);
    let mut noise_rng = SmallRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.002)?;
    let mut observe = |frame: usize| {
        let mut renderer = truth_renderer.clone();
        renderer.set_pose_list(&[true_pose(frame)]);
        renderer.render(&camera_matrix, height, width).into_iter().map(|d| match d.is_finite() {
            true => d + noise.sample(&mut noise_rng),
            false => 0.0
        }).collect::<Vec<Float>>()
    };

    let parameters = TrackerParameters { evaluation_count: 200, min_particles: 50, max_particles: 300, ..Default::default() };
    println!("parameters: {}", parameters);
    let camera_data = CameraData::new(camera_matrix, width, height, observe(0))?;
    let mut tracker = TrackerBuilder::new(parameters, camera_data).build(&mesh_source)?;

    let guess = State::new(vec![Pose::new(Matrix3::identity(), Vector3::new(0.01, -0.01, 1.02))]);
    let estimate = tracker.initialize(vec![guess; 50])?;
    println!("frame 0: t = {:?}", estimate[0].translation.as_slice());

    for frame in 1..30 {
        let estimate = tracker.track(&observe(frame))?;
        let truth = true_pose(frame);
        println!("frame {}: particles {} translation error {:.4} rotation error {:.4}",
            frame,
            tracker.filter().belief().size(),
            (estimate[0].translation - truth.translation).norm(),
            truth.inverse().compose(&estimate[0]).rotation_angle());
    }

    Ok(())
}
