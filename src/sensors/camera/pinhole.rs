extern crate nalgebra as na;

use na::{convert, U1,U3, Matrix3, Vector, Vector2, base::storage::Storage};
use crate::sensors::camera::Camera;
use crate::GenericFloat;

#[derive(Debug,Copy,Clone,PartialEq)]
pub struct Pinhole<F: GenericFloat> {
    pub projection: Matrix3<F>
}

impl<F: GenericFloat> Pinhole<F> {
    pub fn new(fx: F, fy: F, cx: F, cy: F) -> Pinhole<F> {
       let projection = Matrix3::<F>::new(
        fx, F::zero(), cx,
       F::zero(), fy, cy,
       F::zero(), F::zero(), F::one());

      Pinhole{projection}
    }

    /**
     * Skew is ignored, depth sensors report rectified images.
     */
    pub fn from_matrix(mat: &Matrix3<F>) -> Pinhole<F> {
        Pinhole::new(mat[(0,0)],mat[(1,1)],mat[(0,2)],mat[(1,2)])
    }

    pub fn get_fx(&self) -> F {
        self.projection[(0,0)]
    }

    pub fn get_fy(&self) -> F {
        self.projection[(1,1)]
    }

    pub fn get_cx(&self) -> F {
        self.projection[(0,2)]
    }

    pub fn get_cy(&self) -> F {
        self.projection[(1,2)]
    }

    /**
     * Intrinsics for an image that keeps every `factor`-th pixel, pixel centers sit at +0.5.
     */
    pub fn downscale(&self, factor: usize) -> Pinhole<F> {
        let f: F = convert(factor as f64);
        let half: F = convert(0.5);
        Pinhole::new(self.get_fx()/f, self.get_fy()/f, (self.get_cx() - half)/f + half, (self.get_cy() - half)/f + half)
    }
}

impl<F: GenericFloat> Camera<F> for Pinhole<F> {
    fn get_projection(&self) -> Matrix3<F> {
        self.projection
    }

    fn project<T>(&self, position: &Vector<F,U3,T>) -> Option<Vector2<F>> where T: Storage<F,U3,U1> {
        let z = position[2];
        match z > F::zero() {
            true => {
                let homogeneous = position/z;
                let projected_coordiantes = self.projection*homogeneous;
                Some(Vector2::<F>::new(projected_coordiantes[0],projected_coordiantes[1]))
            },
            false => None
        }
    }
}
