extern crate nalgebra as na;

use na::{Vector3,Vector6,Matrix3,Matrix4,UnitQuaternion,Quaternion,Rotation3,SymmetricEigen};
use serde::{Serialize, Deserialize};
use crate::numerics::lie;
use crate::Float;

/**
 * Rigid transform from a part's local frame into the camera frame: x_c = R*x + t.
 */
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct Pose {
    pub rotation: Matrix3<Float>,
    pub translation: Vector3<Float>
}

impl Default for Pose {
    fn default() -> Self {
        Pose::identity()
    }
}

impl Pose {
    pub fn new(rotation: Matrix3<Float>, translation: Vector3<Float>) -> Pose {
        Pose { rotation, translation }
    }

    pub fn identity() -> Pose {
        Pose { rotation: Matrix3::<Float>::identity(), translation: Vector3::<Float>::zeros() }
    }

    pub fn from_axis_angle(axis_angle: &Vector3<Float>, translation: Vector3<Float>) -> Pose {
        Pose { rotation: lie::exp_r(axis_angle), translation }
    }

    /**
     * Twist layout is (translation, axis angle).
     */
    pub fn from_twist(twist: &Vector6<Float>) -> Pose {
        let (rotation, translation) = lie::exp_twist(twist);
        Pose { rotation, translation }
    }

    pub fn to_twist(&self) -> Vector6<Float> {
        let w = lie::ln_r(&self.rotation);
        Vector6::<Float>::new(self.translation[0],self.translation[1],self.translation[2],w[0],w[1],w[2])
    }

    /**
     * self ∘ other, i.e. other is applied first. The result is projected back onto SO3.
     */
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            rotation: optimal_correction_of_rotation(&(self.rotation*other.rotation)),
            translation: self.rotation*other.translation + self.translation
        }
    }

    pub fn inverse(&self) -> Pose {
        let rotation_transpose = self.rotation.transpose();
        Pose { rotation: rotation_transpose, translation: -(rotation_transpose*self.translation) }
    }

    pub fn transform_point(&self, point: &Vector3<Float>) -> Vector3<Float> {
        self.rotation*point + self.translation
    }

    pub fn to_homogeneous(&self) -> Matrix4<Float> {
        se3(&self.translation, &self.rotation)
    }

    pub fn to_quaternion(&self) -> UnitQuaternion<Float> {
        UnitQuaternion::<Float>::from_rotation_matrix(&Rotation3::from_matrix_unchecked(self.rotation))
    }

    pub fn rotation_angle(&self) -> Float {
        lie::ln_r(&self.rotation).norm()
    }

    pub fn is_close(&self, other: &Pose, tolerance: Float) -> bool {
        (self.rotation - other.rotation).amax() <= tolerance && (self.translation - other.translation).amax() <= tolerance
    }
}

pub fn se3(t: &Vector3<Float>, rotation: &Matrix3<Float>) -> Matrix4<Float> {
    let mut res = Matrix4::<Float>::identity();
    res.fixed_view_mut::<3,3>(0,0).copy_from(rotation);
    res.fixed_view_mut::<3,1>(0,3).copy_from(t);
    res
}

/**
 * Transform from a to b
 */
pub fn pose_difference(a: &Pose, b: &Pose) -> Pose {
    b.compose(&a.inverse())
}

/**
 * 3D Rotations - Kanatani p.35
 * Closest rotation in the Frobenius sense. Returns the input unchanged if the SVD does not converge.
 */
pub fn optimal_correction_of_rotation(rotation: &Matrix3<Float>) -> Matrix3<Float> {
    let svd = rotation.svd(true,true);
    match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => {
            let det = (u*v_t).determinant();
            let correction = Matrix3::<Float>::from_diagonal(&Vector3::<Float>::new(1.0,1.0,det.signum()));
            u*correction*v_t
        },
        _ => *rotation
    }
}

/**
 * Weighted rotation average via the dominant eigenvector of sum(w_i q_i q_i^T) (Markley et al. 2007).
 * Sign ambiguity of the quaternions does not matter for the outer product.
 */
pub fn rotation_mean(rotations: &[Matrix3<Float>], weights: &[Float]) -> Matrix3<Float> {
    assert_eq!(rotations.len(), weights.len());
    if rotations.is_empty() {
        return Matrix3::<Float>::identity();
    }

    let accumulated = rotations.iter().zip(weights.iter()).fold(Matrix4::<Float>::zeros(), |acc, (r, &w)| {
        let q = UnitQuaternion::<Float>::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*r));
        let c = q.coords;
        acc + w*c*c.transpose()
    });

    let eigen = SymmetricEigen::new(accumulated);
    let (max_idx, _) = eigen.eigenvalues.argmax();
    let c = eigen.eigenvectors.column(max_idx);
    let q = UnitQuaternion::<Float>::from_quaternion(Quaternion::<Float>::new(c[3],c[0],c[1],c[2]));
    optimal_correction_of_rotation(q.to_rotation_matrix().matrix())
}
