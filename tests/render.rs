use nalgebra as na;

use approx::assert_relative_eq;
use na::{Matrix3, Vector3};
use depth_tracking::Float;
use depth_tracking::mesh::{MeshStore, generators::{cube, quad}};
use depth_tracking::numerics::pose::Pose;
use depth_tracking::render::{RigidBodyRenderer, NO_HIT, NO_PART};

const ROWS: usize = 48;
const COLS: usize = 64;

fn camera_matrix() -> Matrix3<Float> {
    Matrix3::<Float>::new(
        80.0, 0.0, 32.0,
        0.0, 80.0, 24.0,
        0.0, 0.0, 1.0)
}

fn at(z: Float) -> Pose {
    Pose::new(Matrix3::identity(), Vector3::new(0.0, 0.0, z))
}

#[test]
fn nearer_surface_wins_regardless_of_part_order() {
    let store = MeshStore::load(vec![quad(0.5, 0.5), quad(0.5, 0.5)], false).unwrap();
    let center = (ROWS/2)*COLS + COLS/2;

    let mut renderer = RigidBodyRenderer::new(store, true);
    renderer.set_pose_list(&[at(2.0), at(1.0)]);
    let (ids_far_first, depth_far_first) = renderer.render_with_part_ids(&camera_matrix(), ROWS, COLS);
    renderer.set_pose_list(&[at(1.0), at(2.0)]);
    let (ids_near_first, depth_near_first) = renderer.render_with_part_ids(&camera_matrix(), ROWS, COLS);

    assert_relative_eq!(depth_far_first[center], 1.0, epsilon = 1e-9);
    assert_relative_eq!(depth_near_first[center], 1.0, epsilon = 1e-9);
    assert_eq!(ids_far_first[center], 1);
    assert_eq!(ids_near_first[center], 0);
}

#[test]
fn equal_depth_goes_to_the_last_part() {
    let store = MeshStore::load(vec![quad(0.5, 0.5), quad(0.5, 0.5)], false).unwrap();
    let mut renderer = RigidBodyRenderer::new(store, true);
    renderer.set_pose_list(&[at(1.0), at(1.0)]);
    let (ids, depth) = renderer.render_with_part_ids(&camera_matrix(), ROWS, COLS);

    let center = (ROWS/2)*COLS + COLS/2;
    assert_relative_eq!(depth[center], 1.0, epsilon = 1e-9);
    assert_eq!(ids[center], 1);
    assert!(ids.iter().all(|&id| id == 1 || id == NO_PART));
}

#[test]
fn uncovered_pixels_are_no_hit() {
    let store = MeshStore::load(vec![quad(0.1, 0.1)], false).unwrap();
    let mut renderer = RigidBodyRenderer::new(store, true);
    renderer.set_pose_list(&[at(1.0)]);
    let (ids, depth) = renderer.render_with_part_ids(&camera_matrix(), ROWS, COLS);

    assert_eq!(depth[0], NO_HIT);
    assert_eq!(ids[0], NO_PART);
    assert!(depth.iter().zip(ids.iter()).all(|(&d, &id)| (d == NO_HIT) == (id == NO_PART)));
    assert!(depth.iter().any(|&d| d != NO_HIT));
}

#[test]
fn objects_behind_the_camera_are_not_drawn() {
    let store = MeshStore::load(vec![cube(0.2)], true).unwrap();
    let mut renderer = RigidBodyRenderer::new(store, true);
    renderer.set_pose_list(&[at(-1.0)]);
    assert!(renderer.render(&camera_matrix(), ROWS, COLS).iter().all(|&d| d == NO_HIT));
}

#[test]
fn repeated_renders_are_identical() {
    let store = MeshStore::load(vec![cube(0.2), cube(0.1)], true).unwrap();
    let mut renderer = RigidBodyRenderer::new(store, true);
    renderer.set_pose_list(&[
        Pose::from_axis_angle(&Vector3::new(0.3, 0.2, 0.1), Vector3::new(0.05, 0.0, 1.0)),
        Pose::from_axis_angle(&Vector3::new(-0.1, 0.4, 0.0), Vector3::new(-0.05, 0.02, 0.9))
    ]);
    let first = renderer.render(&camera_matrix(), ROWS, COLS);
    let mut buffer = vec![0.0; 7];
    renderer.render_into(&camera_matrix(), ROWS, COLS, &mut buffer, None);
    assert_eq!(first.len(), ROWS*COLS);
    assert!(first.iter().zip(buffer.iter()).all(|(a, b)| a.to_bits() == b.to_bits()));
}

#[test]
fn cube_front_face_depth() {
    let store = MeshStore::load(vec![cube(0.2)], true).unwrap();
    let mut renderer = RigidBodyRenderer::new(store, true);
    renderer.set_pose_list(&[at(1.0)]);
    let depth = renderer.render(&camera_matrix(), ROWS, COLS);
    assert_relative_eq!(depth[(ROWS/2)*COLS + COLS/2], 0.9, epsilon = 1e-9);
    assert_relative_eq!(renderer.object_center(0), Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
}

#[test]
fn culling_hides_faces_pointing_away() {
    let store = MeshStore::load(vec![quad(0.5, 0.5)], false).unwrap();
    let flipped = Pose::from_axis_angle(&Vector3::new(0.0, std::f64::consts::PI, 0.0), Vector3::new(0.0, 0.0, 1.0));

    let mut culled = RigidBodyRenderer::new(store.clone(), true);
    culled.set_pose_list(&[flipped]);
    assert!(culled.render(&camera_matrix(), ROWS, COLS).iter().all(|&d| d == NO_HIT));

    let mut unculled = RigidBodyRenderer::new(store, false);
    unculled.set_pose_list(&[flipped]);
    assert!(unculled.render(&camera_matrix(), ROWS, COLS).iter().any(|&d| d != NO_HIT));
}
