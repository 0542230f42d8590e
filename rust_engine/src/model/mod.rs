//! 蒙皮网格与运行时会话

mod runtime;

pub use runtime::VelocitySkinnedModel;

use glam::Vec3;

use crate::rig::Rig;
use crate::{Result, SkinningError};

/// 静止姿态的蒙皮网格
#[derive(Clone, Debug, Default)]
pub struct SkinnedMesh {
    pub position_rest_pose: Vec<Vec3>,
    pub normal_rest_pose: Vec<Vec3>,
    pub rig: Rig,
}

impl SkinnedMesh {
    pub fn new(position_rest_pose: Vec<Vec3>, normal_rest_pose: Vec<Vec3>, rig: Rig) -> Self {
        Self {
            position_rest_pose,
            normal_rest_pose,
            rig,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.position_rest_pose.len()
    }

    /// 校验顶点数组与权重一一对应，且权重引用的关节都存在
    pub fn validate(&self, joint_count: usize) -> Result<()> {
        let vertex_count = self.vertex_count();
        if self.normal_rest_pose.len() != vertex_count {
            return Err(SkinningError::MeshMismatch(format!(
                "{} positions but {} normals",
                vertex_count,
                self.normal_rest_pose.len()
            )));
        }
        if self.rig.vertex_count() != vertex_count {
            return Err(SkinningError::MeshMismatch(format!(
                "{} positions but rig covers {} vertices",
                vertex_count,
                self.rig.vertex_count()
            )));
        }
        self.rig.validate(joint_count)
    }
}
