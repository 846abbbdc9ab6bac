extern crate nalgebra as na;
extern crate num_traits;

use na::RealField;
use num_traits::NumAssign;

pub mod error;
pub mod numerics;
pub mod mesh;
pub mod sensors;
pub mod render;
pub mod state;
pub mod transition;
pub mod observation;
pub mod filter;
pub mod tracker;
pub mod io;

macro_rules! define_float {
    ($f:tt) => {
        pub use std::$f as float;
        pub type Float = $f;
    }
}

define_float!(f64);

pub trait GenericFloat: num_traits::Float + RealField + NumAssign + Copy {}
impl<T> GenericFloat for T where T: num_traits::Float + RealField + NumAssign + Copy {}

pub use error::{Result, TrackingError};
pub use state::State;
pub use numerics::pose::Pose;
pub use sensors::camera::CameraData;
pub use tracker::{ObjectTracker, TrackerStatus};
pub use tracker::builder::{TrackerBuilder, TrackerParameters};
