extern crate nalgebra as na;

use std::ops::{Index, IndexMut};
use na::{Matrix3, Vector3};
use serde::{Serialize, Deserialize};
use crate::numerics::pose::{Pose, rotation_mean};
use crate::Float;

/**
 * One pose per rigid part. Used both for absolute poses and for deltas around the integrated pose.
 */
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct State {
    poses: Vec<Pose>
}

impl State {
    pub fn new(poses: Vec<Pose>) -> State {
        State { poses }
    }

    pub fn identity(part_count: usize) -> State {
        State { poses: vec![Pose::identity(); part_count] }
    }

    pub fn part_count(&self) -> usize {
        self.poses.len()
    }

    pub fn poses(&self) -> &Vec<Pose> {
        &self.poses
    }

    pub fn poses_mut(&mut self) -> &mut Vec<Pose> {
        &mut self.poses
    }

    pub fn rotations(&self) -> Vec<Matrix3<Float>> {
        self.poses.iter().map(|p| p.rotation).collect()
    }

    pub fn translations(&self) -> Vec<Vector3<Float>> {
        self.poses.iter().map(|p| p.translation).collect()
    }

    /**
     * Re-expresses this state relative to `reference`: p_i <- ref_i^-1 ∘ p_i.
     */
    pub fn center_around_zero(&mut self, reference: &State) {
        assert_eq!(self.part_count(), reference.part_count());
        for (pose, reference_pose) in self.poses.iter_mut().zip(reference.poses.iter()) {
            *pose = reference_pose.inverse().compose(pose);
        }
    }

    /**
     * Composes a delta onto this state in each part's own frame: p_i <- p_i ∘ d_i.
     */
    pub fn apply_delta(&mut self, delta: &State) {
        assert_eq!(self.part_count(), delta.part_count());
        for (pose, delta_pose) in self.poses.iter_mut().zip(delta.poses.iter()) {
            *pose = pose.compose(delta_pose);
        }
    }

    /**
     * Part wise self ∘ other. apply_delta(a) followed by apply_delta(b) equals apply_delta(a.compose(b)).
     */
    pub fn compose(&self, other: &State) -> State {
        assert_eq!(self.part_count(), other.part_count());
        State { poses: self.poses.iter().zip(other.poses.iter()).map(|(a, b)| a.compose(b)).collect() }
    }

    pub fn is_close(&self, other: &State, tolerance: Float) -> bool {
        self.part_count() == other.part_count() && self.poses.iter().zip(other.poses.iter()).all(|(a, b)| a.is_close(b, tolerance))
    }

    /**
     * Weighted mean per part: arithmetic mean of translations, quaternion eigen average of rotations.
     * Weights are expected to be normalized.
     */
    pub fn weighted_mean<'a, I>(states: I, weights: &[Float], part_count: usize) -> State where I: Iterator<Item = &'a State> + Clone {
        let poses = (0..part_count).map(|part| {
            let translation = states.clone().zip(weights.iter()).fold(Vector3::<Float>::zeros(), |acc, (s, &w)| acc + w*s.poses[part].translation);
            let rotations = states.clone().map(|s| s.poses[part].rotation).collect::<Vec<Matrix3<Float>>>();
            Pose::new(rotation_mean(&rotations, weights), translation)
        }).collect::<Vec<Pose>>();
        State { poses }
    }
}

impl Index<usize> for State {
    type Output = Pose;

    fn index(&self, part: usize) -> &Pose {
        &self.poses[part]
    }
}

impl IndexMut<usize> for State {
    fn index_mut(&mut self, part: usize) -> &mut Pose {
        &mut self.poses[part]
    }
}
