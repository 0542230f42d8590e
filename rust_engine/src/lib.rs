//! Velocity Skinning - 带速度二次运动的线性混合蒙皮
//!
//! 在标准 LBS 的基础上叠加基于关节速度的变形：
//! - 骨骼层级与姿态合成
//! - 顶点权重（Rig）与速度权重（Velocity Rig）
//! - 关键帧采样和播放计时
//! - LBS + 平移/旋转速度变形 + 速度时间滤波
//! - 动画会话（一个网格/骨骼绑定的全部运行时状态）

pub mod animation;
pub mod model;
pub mod rig;
pub mod skeleton;
pub mod skinning;

pub use animation::{AnimationTimer, SkeletonAnimation};
pub use model::{SkinnedMesh, VelocitySkinnedModel};
pub use rig::{build_velocity_rig, normalize_weights, Rig};
pub use skeleton::{JointHierarchy, RigidTransform, Skeleton, ROOT_PARENT};
pub use skinning::{
    compute_linear_blend_skinning, velocity_skinning_compute, JointVelocityState, SkinningInput,
    VelocitySkinningParams,
};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkinningError {
    #[error("Topology error: {0}")]
    Topology(String),

    #[error("Malformed rig: vertex {vertex} has total weight {sum}")]
    MalformedRig { vertex: usize, sum: f32 },

    #[error("Vertex {vertex} references joint {joint}, skeleton has {joint_count} joints")]
    JointOutOfRange {
        vertex: usize,
        joint: usize,
        joint_count: usize,
    },

    #[error("Mesh mismatch: {0}")]
    MeshMismatch(String),

    #[error("Animation error: {0}")]
    Animation(String),
}

pub type Result<T> = std::result::Result<T, SkinningError>;
