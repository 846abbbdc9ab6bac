extern crate nalgebra as na;

use std::sync::Arc;
use na::{Matrix3,Vector2,Vector3};
use crate::mesh::MeshStore;
use crate::numerics::pose::Pose;
use crate::sensors::camera::{Camera, pinhole::Pinhole};
use crate::{Float,float};

/// Depth written to pixels that no triangle covers.
pub const NO_HIT: Float = float::INFINITY;
/// Part id written to pixels that no triangle covers.
pub const NO_PART: i32 = -1;
/// Triangles with a vertex closer than this (camera z) are skipped.
pub const NEAR_PLANE: Float = 1e-3;

/**
 * Software z-buffer renderer over all parts of a mesh store.
 *
 * Depth is the camera frame z of the nearest surface. A pixel is covered when its center (c+0.5,r+0.5)
 * lies inside the projected triangle. Parts and triangles are processed in index order and the depth test
 * is `new <= stored`, so on equal depth the last processed triangle wins. This makes repeated renders bit identical.
 */
#[derive(Debug,Clone)]
pub struct RigidBodyRenderer {
    mesh_store: Arc<MeshStore>,
    poses: Vec<Pose>,
    cull_back_faces: bool
}

struct ProjectedVertex {
    pixel: Vector2<Float>,
    inverse_depth: Float
}

impl RigidBodyRenderer {
    pub fn new(mesh_store: Arc<MeshStore>, cull_back_faces: bool) -> RigidBodyRenderer {
        let poses = vec![Pose::identity(); mesh_store.part_count()];
        RigidBodyRenderer { mesh_store, poses, cull_back_faces }
    }

    pub fn mesh_store(&self) -> &Arc<MeshStore> {
        &self.mesh_store
    }

    pub fn part_count(&self) -> usize {
        self.mesh_store.part_count()
    }

    pub fn poses(&self) -> &Vec<Pose> {
        &self.poses
    }

    /**
     * Replaces the working pose of every part. Lengths must match the part count.
     */
    pub fn set_poses(&mut self, rotations: &[Matrix3<Float>], translations: &[Vector3<Float>]) {
        assert_eq!(rotations.len(), self.poses.len());
        assert_eq!(translations.len(), self.poses.len());
        for ((pose, rotation), translation) in self.poses.iter_mut().zip(rotations.iter()).zip(translations.iter()) {
            pose.rotation = *rotation;
            pose.translation = *translation;
        }
    }

    pub fn set_pose_list(&mut self, poses: &[Pose]) {
        assert_eq!(poses.len(), self.poses.len());
        self.poses.copy_from_slice(poses);
    }

    /**
     * Cached center of mass of a part, transformed by its current pose.
     */
    pub fn object_center(&self, part_index: usize) -> Vector3<Float> {
        self.poses[part_index].transform_point(&self.mesh_store.mesh(part_index).center_of_mass)
    }

    pub fn render(&self, camera_matrix: &Matrix3<Float>, rows: usize, cols: usize) -> Vec<Float> {
        let mut depth = Vec::<Float>::new();
        self.render_into(camera_matrix, rows, cols, &mut depth, None);
        depth
    }

    /**
     * Returns (part id buffer, depth buffer); the part id is -1 where nothing was hit.
     */
    pub fn render_with_part_ids(&self, camera_matrix: &Matrix3<Float>, rows: usize, cols: usize) -> (Vec<i32>, Vec<Float>) {
        let mut depth = Vec::<Float>::new();
        let mut part_ids = Vec::<i32>::new();
        self.render_into(camera_matrix, rows, cols, &mut depth, Some(&mut part_ids));
        (part_ids, depth)
    }

    /**
     * Renders into caller owned buffers, resizing them to rows*cols. Reusing the buffers across calls avoids allocation.
     * Skew in `camera_matrix` is ignored.
     */
    pub fn render_into(&self, camera_matrix: &Matrix3<Float>, rows: usize, cols: usize, depth: &mut Vec<Float>, mut part_ids: Option<&mut Vec<i32>>) {
        depth.clear();
        depth.resize(rows*cols, NO_HIT);
        if let Some(ids) = part_ids.as_mut() {
            ids.clear();
            ids.resize(rows*cols, NO_PART);
        }

        let camera = Pinhole::from_matrix(camera_matrix);
        let mut transformed = Vec::<Vector3<Float>>::new();
        for (part_index, (mesh, pose)) in self.mesh_store.meshes().iter().zip(self.poses.iter()).enumerate() {
            transformed.clear();
            transformed.extend(mesh.vertices.iter().map(|v| pose.transform_point(v)));

            for (triangle, normal) in mesh.triangle_indices.iter().zip(mesh.normals.iter()) {
                let corners = [transformed[triangle[0]], transformed[triangle[1]], transformed[triangle[2]]];
                if corners.iter().any(|c| c[2] <= NEAR_PLANE) {
                    continue;
                }
                // camera sits at the origin, so the view ray to the triangle is the corner itself
                if self.cull_back_faces && (pose.rotation*normal).dot(&corners[0]) > 0.0 {
                    continue;
                }

                let projected = match (camera.project(&corners[0]), camera.project(&corners[1]), camera.project(&corners[2])) {
                    (Some(p0), Some(p1), Some(p2)) => [
                        ProjectedVertex { pixel: p0, inverse_depth: 1.0/corners[0][2] },
                        ProjectedVertex { pixel: p1, inverse_depth: 1.0/corners[1][2] },
                        ProjectedVertex { pixel: p2, inverse_depth: 1.0/corners[2][2] }
                    ],
                    _ => continue
                };
                rasterize_triangle(&projected, rows, cols, part_index as i32, depth, part_ids.as_mut().map(|ids| ids.as_mut_slice()));
            }
        }
    }
}

fn edge_function(a: &Vector2<Float>, b: &Vector2<Float>, p: &Vector2<Float>) -> Float {
    (b[0] - a[0])*(p[1] - a[1]) - (b[1] - a[1])*(p[0] - a[0])
}

/**
 * Edge function scan fill over the bounding box. Works for both windings; depth is perspective correct
 * by interpolating 1/z with screen space barycentrics.
 */
fn rasterize_triangle(vertices: &[ProjectedVertex;3], rows: usize, cols: usize, part_index: i32, depth: &mut [Float], mut part_ids: Option<&mut [i32]>) {
    let [v0, v1, v2] = vertices;
    let area = edge_function(&v0.pixel, &v1.pixel, &v2.pixel);
    if area == 0.0 || !area.is_finite() {
        return;
    }

    let min_x = v0.pixel[0].min(v1.pixel[0]).min(v2.pixel[0]);
    let max_x = v0.pixel[0].max(v1.pixel[0]).max(v2.pixel[0]);
    let min_y = v0.pixel[1].min(v1.pixel[1]).min(v2.pixel[1]);
    let max_y = v0.pixel[1].max(v1.pixel[1]).max(v2.pixel[1]);

    if max_x < 0.0 || max_y < 0.0 || min_x >= cols as Float || min_y >= rows as Float {
        return;
    }

    let c_start = (min_x - 0.5).ceil().max(0.0) as usize;
    let c_end = ((max_x - 0.5).floor().min(cols as Float - 1.0)) as isize;
    let r_start = (min_y - 0.5).ceil().max(0.0) as usize;
    let r_end = ((max_y - 0.5).floor().min(rows as Float - 1.0)) as isize;
    if c_end < 0 || r_end < 0 {
        return;
    }

    for r in r_start..=(r_end as usize) {
        for c in c_start..=(c_end as usize) {
            let p = Vector2::<Float>::new(c as Float + 0.5, r as Float + 0.5);
            let w0 = edge_function(&v1.pixel, &v2.pixel, &p)/area;
            let w1 = edge_function(&v2.pixel, &v0.pixel, &p)/area;
            let w2 = edge_function(&v0.pixel, &v1.pixel, &p)/area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            let inverse_depth = w0*v0.inverse_depth + w1*v1.inverse_depth + w2*v2.inverse_depth;
            if inverse_depth <= 0.0 {
                continue;
            }
            let z = 1.0/inverse_depth;
            let idx = r*cols + c;
            if z > 0.0 && z <= depth[idx] {
                depth[idx] = z;
                if let Some(ids) = part_ids.as_mut() {
                    ids[idx] = part_index;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MeshData, generators};

    fn camera() -> Matrix3<Float> {
        Matrix3::<Float>::new(50.0,0.0,16.0, 0.0,50.0,12.0, 0.0,0.0,1.0)
    }

    #[test]
    fn edge_function_sign_follows_winding() {
        let a = Vector2::new(0.0,0.0);
        let b = Vector2::new(1.0,0.0);
        let c = Vector2::new(0.0,1.0);
        assert!(edge_function(&a,&b,&c) > 0.0);
        assert!(edge_function(&a,&c,&b) < 0.0);
    }

    #[test]
    fn empty_scene_is_all_no_hit() {
        let store = MeshStore::load(vec![generators::quad(0.1,0.1)], false).unwrap();
        let mut renderer = RigidBodyRenderer::new(store, true);
        renderer.set_pose_list(&[Pose::new(Matrix3::identity(), Vector3::new(0.0,0.0,-1.0))]);
        let (ids, depth) = renderer.render_with_part_ids(&camera(), 24, 32);
        assert!(depth.iter().all(|&d| d == NO_HIT));
        assert!(ids.iter().all(|&i| i == NO_PART));
    }

    #[test]
    fn tilted_plane_depth_is_perspective_correct() {
        let data = MeshData {
            vertices: vec![Vector3::new(-1.0,-1.0,1.0), Vector3::new(1.0,-1.0,3.0), Vector3::new(1.0,1.0,3.0), Vector3::new(-1.0,1.0,1.0)],
            triangle_indices: vec![[0,2,1],[0,3,2]]
        };
        let store = MeshStore::load(vec![data], false).unwrap();
        let renderer = RigidBodyRenderer::new(store, false);
        let k = camera();
        let depth = renderer.render(&k, 24, 32);

        // plane z = 2 + x; ray through pixel center (u,v) has x = z*(u-cx)/fx
        let (r, c) = (12usize, 20usize);
        let u = c as Float + 0.5;
        let a = (u - 16.0)/50.0;
        let expected = 2.0/(1.0 - a);
        assert!((depth[r*32 + c] - expected).abs() < 1e-9);
    }
}
