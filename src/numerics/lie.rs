extern crate nalgebra as na;

use na::{Vector,Vector3,Vector6,Matrix3,U3,U1,base::storage::Storage};
use crate::{Float,float};

const SMALL_ANGLE: Float = 1e-8;

pub fn skew_symmetric<T>(w: &Vector<Float,U3,T>) -> Matrix3<Float> where T: Storage<Float,U3,U1>  {
    Matrix3::<Float>::new(0.0, -w[2], w[1],
                          w[2], 0.0, -w[0],
                          -w[1], w[0], 0.0)
}

pub fn vector_from_skew_symmetric(w_x: &Matrix3<Float>) -> Vector3<Float> {
    Vector3::<Float>::new(w_x[(2,1)],w_x[(0,2)],w_x[(1,0)])
}

/**
 * Rodrigues formula, falls back to the second order taylor expansion near identity.
 */
#[allow(non_snake_case)]
pub fn exp_r<T>(w: &Vector<Float,U3,T>) -> Matrix3<Float> where T: Storage<Float,U3,U1> {
    let omega_sqr = w.norm_squared();
    let omega = omega_sqr.sqrt();
    let (A, B) = match omega {
        o if o < SMALL_ANGLE => (1.0 - omega_sqr/6.0, 0.5 - omega_sqr/24.0),
        o => (o.sin()/o, (1.0 - o.cos())/omega_sqr)
    };

    let w_x = skew_symmetric(w);
    let w_x_sqr = w_x*w_x;
    let I = Matrix3::<Float>::identity();
    I + A*w_x + B*w_x_sqr
}

/**
 * Logarithm of SO3 as an axis-angle vector. Handles both the identity and the
 * angle = pi cases, where the antisymmetric part vanishes.
 */
#[allow(non_snake_case)]
pub fn ln_r(R: &Matrix3<Float>) -> Vector3<Float> {
    let cos_omega = ((R.trace() - 1.0)/2.0).clamp(-1.0, 1.0);
    let antisymmetric = vector_from_skew_symmetric(&(R - R.transpose()));
    let omega = (0.5*antisymmetric.norm()).atan2(cos_omega);

    match omega {
        o if o < SMALL_ANGLE => 0.5*antisymmetric,
        o if (float::consts::PI - o) < 1e-6 => {
            // R = 2aa^T - I for a rotation by pi, pick the best conditioned column
            let B = (R + Matrix3::<Float>::identity())*0.5;
            let (idx, _) = B.diagonal().argmax();
            let axis = B.column(idx)/B[(idx,idx)].max(SMALL_ANGLE).sqrt();
            axis.normalize()*o
        },
        o => (o/(2.0*o.sin()))*antisymmetric
    }
}

/**
 * Exponential of a twist (translation,rotation) into a rotation and translation.
 * The translation is applied as is, which is sufficient for the small per-step perturbations of the filter.
 */
pub fn exp_twist(twist: &Vector6<Float>) -> (Matrix3<Float>, Vector3<Float>) {
    let u = twist.fixed_rows::<3>(0).into_owned();
    let w = twist.fixed_rows::<3>(3).into_owned();
    (exp_r(&w), u)
}
