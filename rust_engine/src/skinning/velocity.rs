//! 关节速度状态与速度变形

use glam::{Quat, Vec3};

use crate::rig::Rig;
use crate::skeleton::RigidTransform;

/// 旋转滞后角的经验增益
pub const ROTATION_LAG_GAIN: f32 = 5.0;

/// 增量旋转四元数虚部长度低于此值视为没有旋转
pub const ROTATION_EPSILON: f32 = 0.001;

/// 关节速度历史
///
/// 每次加载新的网格/骨骼后回到 `Uninitialized`，下一帧只做初始化。
#[derive(Clone, Debug, Default, PartialEq)]
pub enum JointVelocityState {
    #[default]
    Uninitialized,
    Ready {
        /// 上一帧关节全局变换
        previous_pose: Vec<RigidTransform>,
        /// 平滑后的关节平移速度
        filtered_velocity: Vec<Vec3>,
    },
}

impl JointVelocityState {
    /// 以当前姿态为上一帧、速度为零
    pub fn seeded(current: &[RigidTransform]) -> Self {
        JointVelocityState::Ready {
            previous_pose: current.to_vec(),
            filtered_velocity: vec![Vec3::ZERO; current.len()],
        }
    }

    pub fn reset(&mut self) {
        *self = JointVelocityState::Uninitialized;
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, JointVelocityState::Ready { .. })
    }

    pub fn previous_pose(&self) -> Option<&[RigidTransform]> {
        match self {
            JointVelocityState::Ready { previous_pose, .. } => Some(previous_pose),
            JointVelocityState::Uninitialized => None,
        }
    }

    pub fn filtered_velocity(&self) -> Option<&[Vec3]> {
        match self {
            JointVelocityState::Ready {
                filtered_velocity, ..
            } => Some(filtered_velocity),
            JointVelocityState::Uninitialized => None,
        }
    }
}

/// 关节在两帧之间的增量旋转
#[derive(Clone, Copy, Debug)]
pub(crate) struct JointRotation {
    pub axis: Vec3,
    pub angle: f32,
}

/// current * previous^-1 的旋转轴和角度；接近单位旋转时为 None
///
/// q 与 -q 表示同一旋转，先取 w >= 0 的一支，角度落在 [0, π]。
pub(crate) fn incremental_rotation(
    current: &RigidTransform,
    previous: &RigidTransform,
) -> Option<JointRotation> {
    let diff = *current * previous.inverse();
    let q = if diff.rotation.w < 0.0 {
        -diff.rotation
    } else {
        diff.rotation
    };
    let xyz = q.xyz();
    let norm = xyz.length();
    if norm < ROTATION_EPSILON {
        return None;
    }
    Some(JointRotation {
        axis: xyz / norm,
        angle: 2.0 * norm.atan2(q.w),
    })
}

/// 指数平滑：(1 - s) * 当前速度 + s * 历史速度
#[inline]
pub(crate) fn blend_velocity(instant: Vec3, filtered: Vec3, speed_blending: f32) -> Vec3 {
    (1.0 - speed_blending) * instant + speed_blending * filtered
}

/// 顶点的平移速度变形量（未乘强度）
pub(crate) fn linear_velocity_deformation(
    vertex: usize,
    velocity_rig: &Rig,
    translation_velocity: &[Vec3],
    filtered_velocity: &[Vec3],
    speed_blending: f32,
) -> Vec3 {
    velocity_rig
        .influences(vertex)
        .map(|(joint, weight)| {
            weight
                * blend_velocity(
                    translation_velocity[joint],
                    filtered_velocity[joint],
                    speed_blending,
                )
        })
        .fold(Vec3::ZERO, |acc, d| acc + d)
}

/// 顶点的旋转速度变形量（未乘强度）
///
/// 离旋转轴越远的点滞后角越大：lag = |axis × p⊥| · θ · ROTATION_LAG_GAIN。
pub(crate) fn rotational_velocity_deformation(
    position: Vec3,
    vertex: usize,
    velocity_rig: &Rig,
    skeleton_current: &[RigidTransform],
    joint_rotation: &[Option<JointRotation>],
) -> Vec3 {
    let mut deformation = Vec3::ZERO;
    for (joint, weight) in velocity_rig.influences(vertex) {
        let Some(rotation) = joint_rotation[joint] else {
            continue;
        };
        let offset = position - skeleton_current[joint].translation;
        // 到过关节、沿旋转轴直线的垂直分量
        let perpendicular = offset - offset.dot(rotation.axis) * rotation.axis;
        let lag_angle = rotation.axis.cross(perpendicular).length() * rotation.angle * ROTATION_LAG_GAIN;
        let lag = Quat::from_axis_angle(rotation.axis, lag_angle);
        deformation += (lag * perpendicular - perpendicular) * weight;
    }
    deformation
}
