//! 骨骼关键帧动画

use crate::skeleton::RigidTransform;
use crate::{Result, SkinningError};

/// 骨骼关键帧动画
///
/// 每个关键帧是一整套关节局部变换，时间严格递增。
#[derive(Clone, Debug)]
pub struct SkeletonAnimation {
    times: Vec<f32>,
    local_poses: Vec<Vec<RigidTransform>>,
}

impl SkeletonAnimation {
    pub fn new(times: Vec<f32>, local_poses: Vec<Vec<RigidTransform>>) -> Result<Self> {
        if times.is_empty() {
            return Err(SkinningError::Animation("animation has no keyframes".into()));
        }
        if times.len() != local_poses.len() {
            return Err(SkinningError::Animation(format!(
                "{} keyframe times but {} poses",
                times.len(),
                local_poses.len()
            )));
        }
        if let Some(k) = times.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(SkinningError::Animation(format!(
                "keyframe times must be strictly increasing (index {})",
                k + 1
            )));
        }
        let joint_count = local_poses[0].len();
        if let Some(k) = local_poses.iter().position(|p| p.len() != joint_count) {
            return Err(SkinningError::Animation(format!(
                "keyframe {} has {} joints, expected {}",
                k,
                local_poses[k].len(),
                joint_count
            )));
        }
        Ok(Self { times, local_poses })
    }

    pub fn joint_count(&self) -> usize {
        self.local_poses[0].len()
    }

    pub fn keyframe_count(&self) -> usize {
        self.times.len()
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn start_time(&self) -> f32 {
        self.times[0]
    }

    pub fn end_time(&self) -> f32 {
        self.times[self.times.len() - 1]
    }

    pub fn duration(&self) -> f32 {
        self.end_time() - self.start_time()
    }

    /// 在时间 t 采样局部姿态
    ///
    /// t 超出范围时夹到首/尾关键帧，NaN 视为起点。
    pub fn evaluate_local(&self, t: f32) -> Vec<RigidTransform> {
        let last = self.times.len() - 1;
        if last == 0 || t.is_nan() || t <= self.times[0] {
            return self.local_poses[0].clone();
        }
        if t >= self.times[last] {
            return self.local_poses[last].clone();
        }

        // times[k] <= t < times[k + 1]
        let k = self.times.partition_point(|&time| time <= t) - 1;
        let t0 = self.times[k];
        let t1 = self.times[k + 1];
        let alpha = (t - t0) / (t1 - t0);

        self.local_poses[k]
            .iter()
            .zip(self.local_poses[k + 1].iter())
            .map(|(a, b)| a.interpolate(b, alpha))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    fn bend_z() -> SkeletonAnimation {
        let tx = Vec3::new(0.5, 0.0, 0.0);
        let rest = vec![
            RigidTransform::IDENTITY,
            RigidTransform::from_translation(tx),
        ];
        let bent = vec![
            RigidTransform::IDENTITY,
            RigidTransform::new(Quat::from_rotation_z(FRAC_PI_2), tx),
        ];
        SkeletonAnimation::new(vec![0.0, 1.0, 2.0], vec![rest.clone(), bent, rest]).unwrap()
    }

    #[test]
    fn test_evaluate_midpoint_slerps() {
        let anim = bend_z();
        let pose = anim.evaluate_local(0.5);
        let expected = Quat::from_rotation_z(FRAC_PI_4);
        assert!(pose[1].rotation.abs_diff_eq(expected, 1e-5));
        assert!(pose[1].translation.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_evaluate_clamps_outside_range() {
        let anim = bend_z();
        assert_eq!(anim.evaluate_local(-3.0), anim.evaluate_local(0.0));
        assert_eq!(anim.evaluate_local(10.0), anim.evaluate_local(2.0));
        assert_eq!(anim.evaluate_local(f32::NAN), anim.evaluate_local(0.0));
        assert!((anim.duration() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_evaluate_exact_keyframe() {
        let anim = bend_z();
        let pose = anim.evaluate_local(1.0);
        assert!(pose[1]
            .rotation
            .abs_diff_eq(Quat::from_rotation_z(FRAC_PI_2), 1e-5));
    }

    #[test]
    fn test_rejects_unsorted_times() {
        let pose = vec![RigidTransform::IDENTITY];
        let result = SkeletonAnimation::new(vec![0.0, 0.0], vec![pose.clone(), pose]);
        assert!(matches!(result, Err(SkinningError::Animation(_))));
    }

    #[test]
    fn test_rejects_ragged_keyframes() {
        let result = SkeletonAnimation::new(
            vec![0.0, 1.0],
            vec![vec![RigidTransform::IDENTITY], vec![]],
        );
        assert!(result.is_err());
    }
}
