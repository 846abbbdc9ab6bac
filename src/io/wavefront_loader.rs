extern crate nalgebra as na;

use std::fs;
use std::path::PathBuf;
use na::Vector3;
use crate::error::{Result, TrackingError};
use crate::io::MeshSource;
use crate::mesh::MeshData;
use crate::Float;

/**
 * One `.obj` file per part. Only vertex positions and faces are read, polygons are fan triangulated.
 */
#[derive(Debug,Clone)]
pub struct WavefrontObjSource {
    pub file_paths: Vec<PathBuf>
}

impl WavefrontObjSource {
    pub fn new(file_paths: Vec<PathBuf>) -> WavefrontObjSource {
        WavefrontObjSource { file_paths }
    }
}

impl MeshSource for WavefrontObjSource {
    fn load(&self) -> Result<Vec<MeshData>> {
        self.file_paths.iter().map(|path| {
            let contents = fs::read_to_string(path)?;
            parse_obj(&contents).map_err(|e| match e {
                TrackingError::Parse(msg) => TrackingError::Parse(format!("{}: {}", path.display(), msg)),
                other => other
            })
        }).collect()
    }
}

pub fn parse_obj(contents: &str) -> Result<MeshData> {
    let mut vertices = Vec::<Vector3<Float>>::new();
    let mut triangle_indices = Vec::<[usize;3]>::new();

    for (line_idx, line) in contents.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let coordinates = tokens.take(3).map(|t| t.parse::<Float>()).collect::<std::result::Result<Vec<Float>, _>>()
                    .map_err(|e| TrackingError::Parse(format!("line {}: {}", line_idx + 1, e)))?;
                match coordinates.len() {
                    3 => vertices.push(Vector3::new(coordinates[0], coordinates[1], coordinates[2])),
                    n => return Err(TrackingError::Parse(format!("line {}: vertex has {} coordinates", line_idx + 1, n)))
                }
            },
            Some("f") => {
                let polygon = tokens.map(|t| parse_face_index(t, vertices.len(), line_idx + 1)).collect::<Result<Vec<usize>>>()?;
                if polygon.len() < 3 {
                    return Err(TrackingError::Parse(format!("line {}: face has {} vertices", line_idx + 1, polygon.len())));
                }
                for i in 1..polygon.len()-1 {
                    triangle_indices.push([polygon[0], polygon[i], polygon[i+1]]);
                }
            },
            _ => ()
        }
    }

    Ok(MeshData { vertices, triangle_indices })
}

/**
 * `a`, `a/b`, `a//c` or `a/b/c`; 1-based, negative values count back from the last vertex read so far.
 */
fn parse_face_index(token: &str, vertex_count: usize, line: usize) -> Result<usize> {
    let position = token.split('/').next().unwrap_or("");
    let index = position.parse::<i64>().map_err(|e| TrackingError::Parse(format!("line {}: face index '{}': {}", line, token, e)))?;
    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => vertex_count as i64 + i,
        _ => -1
    };
    match resolved >= 0 && (resolved as usize) < vertex_count {
        true => Ok(resolved as usize),
        false => Err(TrackingError::Parse(format!("line {}: face index {} out of range for {} vertices", line, index, vertex_count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_is_fan_triangulated() {
        let obj = "# quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1 4/4/1\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.triangle_indices, vec![[0,1,2],[0,2,3]]);
    }

    #[test]
    fn negative_indices_are_relative() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        assert_eq!(parse_obj(obj).unwrap().triangle_indices, vec![[0,1,2]]);
    }

    #[test]
    fn out_of_range_and_malformed_faces_fail() {
        assert!(parse_obj("v 0 0 0\nf 1 2 3\n").is_err());
        assert!(parse_obj("v 0 0 0\nv 1 0 0\nf 1 2\n").is_err());
        assert!(parse_obj("v 0 zero 0\n").is_err());
    }
}
