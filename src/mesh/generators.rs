//! Procedural meshes for tests and synthetic scenes.

extern crate nalgebra as na;

use na::Vector3;
use crate::mesh::MeshData;
use crate::Float;

/// Axis aligned cube with edge length `size`, centered at the origin.
pub fn cube(size: Float) -> MeshData {
    box_mesh(size, size, size, &Vector3::<Float>::zeros())
}

/// Axis aligned box centered at `center`. Triangles wind counter clockwise seen from outside,
/// so the derived normals point outwards.
pub fn box_mesh(width: Float, height: Float, depth: Float, center: &Vector3<Float>) -> MeshData {
    let (hx, hy, hz) = (0.5*width, 0.5*height, 0.5*depth);
    let vertices = [
        (-hx,-hy,-hz), ( hx,-hy,-hz), ( hx, hy,-hz), (-hx, hy,-hz),
        (-hx,-hy, hz), ( hx,-hy, hz), ( hx, hy, hz), (-hx, hy, hz)
    ].iter().map(|&(x,y,z)| Vector3::<Float>::new(x,y,z) + center).collect::<Vec<Vector3<Float>>>();

    let triangle_indices = vec![
        [0,2,1], [0,3,2], // -z
        [4,5,6], [4,6,7], // +z
        [0,1,5], [0,5,4], // -y
        [3,6,2], [3,7,6], // +y
        [0,4,7], [0,7,3], // -x
        [1,2,6], [1,6,5]  // +x
    ];

    MeshData { vertices, triangle_indices }
}

/// Single quad in the z = 0 plane facing -z (towards a camera looking down +z).
pub fn quad(width: Float, height: Float) -> MeshData {
    let (hx, hy) = (0.5*width, 0.5*height);
    MeshData {
        vertices: vec![
            Vector3::<Float>::new(-hx,-hy,0.0),
            Vector3::<Float>::new( hx,-hy,0.0),
            Vector3::<Float>::new( hx, hy,0.0),
            Vector3::<Float>::new(-hx, hy,0.0)
        ],
        triangle_indices: vec![[0,2,1],[0,3,2]]
    }
}
