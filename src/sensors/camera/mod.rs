extern crate nalgebra as na;

use na::{U1,U3,Vector,Vector2,Matrix3, base::storage::Storage};
use crate::error::{Result, TrackingError};
use crate::sensors::camera::pinhole::Pinhole;
use crate::{Float, GenericFloat};

pub mod pinhole;

pub trait Camera<F: GenericFloat> {
    fn get_projection(&self) -> Matrix3<F>;
    /// None for points at or behind the image plane.
    fn project<T>(&self, position: &Vector<F,U3,T>) -> Option<Vector2<F>> where T: Storage<F,U3,U1>;
}

/**
 * Measured depth is valid when it is finite and strictly positive. Everything else is a no-return.
 */
pub fn is_valid_depth(depth: Float) -> bool {
    depth.is_finite() && depth > 0.0
}

/**
 * Fixed session intrinsics plus the most recent depth frame, row major with `width` columns.
 */
#[derive(Debug,Clone)]
pub struct CameraData {
    pub projection_matrix: Matrix3<Float>,
    pub width: usize,
    pub height: usize,
    pub depth_image: Vec<Float>
}

impl CameraData {
    pub fn new(projection_matrix: Matrix3<Float>, width: usize, height: usize, depth_image: Vec<Float>) -> Result<CameraData> {
        check_image_size(&depth_image, width, height)?;
        Ok(CameraData { projection_matrix, width, height, depth_image })
    }

    pub fn pinhole(&self) -> Pinhole<Float> {
        Pinhole::from_matrix(&self.projection_matrix)
    }

    pub fn pixel_count(&self) -> usize {
        self.width*self.height
    }

    pub fn set_depth_image(&mut self, depth_image: Vec<Float>) -> Result<()> {
        check_image_size(&depth_image, self.width, self.height)?;
        self.depth_image = depth_image;
        Ok(())
    }

    /**
     * Keeps every `factor`-th pixel in both directions and rescales the intrinsics accordingly.
     */
    pub fn downsampled(&self, factor: usize) -> Result<CameraData> {
        if factor == 0 {
            return Err(TrackingError::InvalidConfiguration("downsampling factor must be positive".to_string()));
        }
        let width = self.width/factor;
        let height = self.height/factor;
        let depth_image = downsample_image(&self.depth_image, self.width, factor, width, height);
        let projection_matrix = self.pinhole().downscale(factor).get_projection();
        Ok(CameraData { projection_matrix, width, height, depth_image })
    }
}

pub fn downsample_image(image: &Vec<Float>, cols: usize, factor: usize, new_cols: usize, new_rows: usize) -> Vec<Float> {
    let mut new_image = Vec::<Float>::with_capacity(new_cols*new_rows);
    for r in 0..new_rows {
        for c in 0..new_cols {
            new_image.push(image[(r*factor)*cols + c*factor]);
        }
    }
    new_image
}

pub fn check_image_size(image: &[Float], width: usize, height: usize) -> Result<()> {
    match image.len() == width*height {
        true => Ok(()),
        false => Err(TrackingError::InvalidConfiguration(format!("depth image has {} pixels, camera expects {}x{}", image.len(), width, height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn downsampling_keeps_projection_consistent() {
        let k = Matrix3::<Float>::new(500.0,0.0,319.5, 0.0,500.0,239.5, 0.0,0.0,1.0);
        let data = CameraData::new(k, 640, 480, vec![1.0; 640*480]).unwrap();
        let small = data.downsampled(2).unwrap();
        assert_eq!((small.width, small.height), (320, 240));
        assert_eq!(small.depth_image.len(), 320*240);

        let point = Vector3::<Float>::new(0.1,-0.05,1.0);
        let full = data.pinhole().project(&point).unwrap();
        let half = small.pinhole().project(&point).unwrap();
        assert!(((full[0] - 0.5)/2.0 + 0.5 - half[0]).abs() < 1e-9);
        assert!(((full[1] - 0.5)/2.0 + 0.5 - half[1]).abs() < 1e-9);
    }

    #[test]
    fn rejects_mismatched_image() {
        assert!(CameraData::new(Matrix3::identity(), 4, 4, vec![0.0; 15]).is_err());
    }

    #[test]
    fn depth_validity() {
        assert!(is_valid_depth(0.5));
        assert!(!is_valid_depth(0.0));
        assert!(!is_valid_depth(Float::NAN));
        assert!(!is_valid_depth(Float::INFINITY));
    }
}
