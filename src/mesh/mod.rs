extern crate nalgebra as na;

use std::sync::Arc;
use na::Vector3;
use serde::{Serialize, Deserialize};
use crate::error::{Result, TrackingError};
use crate::Float;

pub mod generators;

/**
 * Raw geometry of one rigid part as delivered by a mesh source.
 */
#[derive(Debug,Clone,Serialize,Deserialize)]
pub struct MeshData {
    pub vertices: Vec<Vector3<Float>>,
    pub triangle_indices: Vec<[usize;3]>
}

/**
 * Immutable geometry of one rigid part. Normals are per triangle, unit length,
 * and follow the counter clockwise winding of the indices. Degenerate triangles carry a zero normal.
 */
#[derive(Debug,Clone)]
pub struct Mesh {
    pub vertices: Vec<Vector3<Float>>,
    pub triangle_indices: Vec<[usize;3]>,
    pub normals: Vec<Vector3<Float>>,
    pub center_of_mass: Vector3<Float>,
    pub mass_weight: Float
}

impl Mesh {
    pub fn new(data: MeshData) -> Result<Mesh> {
        let vertex_count = data.vertices.len();
        if let Some((idx, tri)) = data.triangle_indices.iter().enumerate().find(|(_, tri)| tri.iter().any(|&i| i >= vertex_count)) {
            return Err(TrackingError::InvalidMesh(format!("triangle {} references {:?} but only {} vertices exist", idx, tri, vertex_count)));
        }

        let normals = data.triangle_indices.iter().map(|&[a,b,c]| {
            let n = (data.vertices[b] - data.vertices[a]).cross(&(data.vertices[c] - data.vertices[a]));
            match n.norm() {
                norm if norm > 0.0 => n/norm,
                _ => Vector3::<Float>::zeros()
            }
        }).collect::<Vec<Vector3<Float>>>();

        let (center_of_mass, mass_weight) = surface_center_of_mass(&data.vertices, &data.triangle_indices);

        Ok(Mesh {
            vertices: data.vertices,
            triangle_indices: data.triangle_indices,
            normals,
            center_of_mass,
            mass_weight
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_indices.len()
    }

    /**
     * Shifts all vertices by -offset. Normals are translation invariant.
     */
    fn translate(&mut self, offset: &Vector3<Float>) {
        for v in self.vertices.iter_mut() {
            *v -= offset;
        }
        self.center_of_mass -= offset;
    }
}

/**
 * Area weighted mean of the triangle centroids. The weight is the total surface area.
 * Falls back to the vertex mean with zero weight for meshes without surface.
 */
pub fn surface_center_of_mass(vertices: &Vec<Vector3<Float>>, triangle_indices: &Vec<[usize;3]>) -> (Vector3<Float>, Float) {
    let (weighted_sum, total_area) = triangle_indices.iter().fold((Vector3::<Float>::zeros(), 0.0), |(acc, area_acc), &[a,b,c]| {
        let area = 0.5*(vertices[b] - vertices[a]).cross(&(vertices[c] - vertices[a])).norm();
        let centroid = (vertices[a] + vertices[b] + vertices[c])/3.0;
        (acc + area*centroid, area_acc + area)
    });

    match total_area {
        area if area > 0.0 => (weighted_sum/area, area),
        _ if !vertices.is_empty() => (vertices.iter().sum::<Vector3<Float>>()/(vertices.len() as Float), 0.0),
        _ => (Vector3::<Float>::zeros(), 0.0)
    }
}

/**
 * Owns the geometry of all parts. Shared read only between the renderer and every evaluation task.
 */
#[derive(Debug,Clone)]
pub struct MeshStore {
    meshes: Vec<Mesh>,
    model_offsets: Vec<Vector3<Float>>
}

impl MeshStore {
    /**
     * When `center` is set, each part is shifted so that its center of mass is the local origin.
     * The removed offsets are kept so poses can be converted back into the model frame.
     */
    pub fn load(parts: Vec<MeshData>, center: bool) -> Result<Arc<MeshStore>> {
        if parts.is_empty() {
            return Err(TrackingError::InvalidMesh("mesh source delivered no parts".to_string()));
        }

        let mut meshes = parts.into_iter().map(Mesh::new).collect::<Result<Vec<Mesh>>>()?;
        let model_offsets = meshes.iter_mut().map(|mesh| {
            match center {
                true => {
                    let offset = mesh.center_of_mass;
                    mesh.translate(&offset);
                    offset
                },
                false => Vector3::<Float>::zeros()
            }
        }).collect::<Vec<Vector3<Float>>>();

        Ok(Arc::new(MeshStore { meshes, model_offsets }))
    }

    pub fn part_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn mesh(&self, part_index: usize) -> &Mesh {
        &self.meshes[part_index]
    }

    pub fn meshes(&self) -> &Vec<Mesh> {
        &self.meshes
    }

    /**
     * Position of the centered frame's origin expressed in the original model frame.
     */
    pub fn model_offset(&self, part_index: usize) -> &Vector3<Float> {
        &self.model_offsets[part_index]
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangle_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_indices() {
        let data = MeshData {
            vertices: vec![Vector3::new(0.0,0.0,0.0), Vector3::new(1.0,0.0,0.0)],
            triangle_indices: vec![[0,1,2]]
        };
        assert!(matches!(Mesh::new(data), Err(TrackingError::InvalidMesh(_))));
    }

    #[test]
    fn centering_moves_center_of_mass_to_origin() {
        let data = generators::box_mesh(0.2, 0.1, 0.4, &Vector3::new(1.0,2.0,3.0));
        let store = MeshStore::load(vec![data], true).unwrap();
        assert!(store.mesh(0).center_of_mass.norm() < 1e-12);
        assert!((store.model_offset(0) - Vector3::new(1.0,2.0,3.0)).norm() < 1e-12);
    }

    #[test]
    fn surface_area_of_unit_cube() {
        let store = MeshStore::load(vec![generators::cube(1.0)], false).unwrap();
        assert!((store.mesh(0).mass_weight - 6.0).abs() < 1e-12);
        assert_eq!(store.triangle_count(), 12);
    }
}
