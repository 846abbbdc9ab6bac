extern crate image as image_rs;

use std::fs;
use std::path::Path;
use image_rs::{ImageBuffer, Luma};
use crate::error::{Result, TrackingError};
use crate::mesh::MeshData;
use crate::tracker::builder::TrackerParameters;
use crate::Float;

pub mod wavefront_loader;

/**
 * Delivers the raw geometry of every part, in part index order.
 */
pub trait MeshSource {
    fn load(&self) -> Result<Vec<MeshData>>;
}

#[derive(Debug,Clone)]
pub struct InMemoryMeshSource {
    pub parts: Vec<MeshData>
}

impl InMemoryMeshSource {
    pub fn new(parts: Vec<MeshData>) -> InMemoryMeshSource {
        InMemoryMeshSource { parts }
    }
}

impl MeshSource for InMemoryMeshSource {
    fn load(&self) -> Result<Vec<MeshData>> {
        Ok(self.parts.clone())
    }
}

/**
 * Loads a 16 bit depth png, row major. Raw values are divided by `scale` (1000 for millimeter sensors),
 * zero stays zero and is treated as a missing return.
 * Returns (depth, width, height).
 */
pub fn load_depth_image(file_path: &Path, scale: Float) -> Result<(Vec<Float>, usize, usize)> {
    if scale <= 0.0 {
        return Err(TrackingError::InvalidConfiguration(format!("depth scale must be positive, got {}", scale)));
    }
    let depth_image = image_rs::open(file_path)?.to_luma16();
    let (width, height) = depth_image.dimensions();
    let depth = depth_image.pixels().map(|p| (p.0[0] as Float)/scale).collect::<Vec<Float>>();
    Ok((depth, width as usize, height as usize))
}

/**
 * Inverse of `load_depth_image`. Invalid depths and values out of the 16 bit range are written as zero.
 */
pub fn save_depth_image(file_path: &Path, depth: &[Float], width: usize, height: usize, scale: Float) -> Result<()> {
    crate::sensors::camera::check_image_size(depth, width, height)?;
    let raw = depth.iter().map(|&d| {
        let v = (d*scale).round();
        match v.is_finite() && v > 0.0 && v <= u16::MAX as Float {
            true => v as u16,
            false => 0
        }
    }).collect::<Vec<u16>>();
    let buffer = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| TrackingError::Image(format!("could not allocate {}x{} depth image", width, height)))?;
    buffer.save(file_path)?;
    Ok(())
}

pub fn load_parameters(file_path: &Path) -> Result<TrackerParameters> {
    let contents = fs::read_to_string(file_path)?;
    parse_parameters(&contents)
}

/**
 * Omitted fields take their defaults.
 */
pub fn parse_parameters(contents: &str) -> Result<TrackerParameters> {
    let parameters = serde_yaml::from_str::<TrackerParameters>(contents)?;
    parameters.validate()?;
    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_uses_defaults() {
        let parameters = parse_parameters("evaluation_count: 100\nobservation:\n  tail_weight: 0.05\n").unwrap();
        assert_eq!(parameters.evaluation_count, 100);
        assert_eq!(parameters.observation.tail_weight, 0.05);
        assert_eq!(parameters.observation.max_depth, 6.0);
        assert_eq!(parameters.update_rate, 30.0);
    }

    #[test]
    fn invalid_yaml_values_are_rejected() {
        assert!(parse_parameters("max_kl_divergence: -1.0\n").is_err());
        assert!(matches!(parse_parameters("evaluation_count: [1,2]\n"), Err(TrackingError::Parse(_))));
    }

    #[test]
    fn depth_png_round_trip() {
        let path = std::env::temp_dir().join("depth_tracking_round_trip.png");
        let depth = vec![0.5, 1.0, 0.0, Float::NAN, 2.25, 6.0];
        save_depth_image(&path, &depth, 3, 2, 1000.0).unwrap();
        let (loaded, width, height) = load_depth_image(&path, 1000.0).unwrap();
        assert_eq!((width, height), (3, 2));
        assert_eq!(loaded, vec![0.5, 1.0, 0.0, 0.0, 2.25, 6.0]);
        let _ = fs::remove_file(&path);
    }
}
