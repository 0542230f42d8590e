//! 骨骼：层级 + 静止姿态

use crate::animation::SkeletonAnimation;
use crate::{Result, SkinningError};

use super::{JointHierarchy, RigidTransform};

/// 骨骼
///
/// 静止姿态的全局变换在构造时合成一次并缓存，绑定期间不变。
#[derive(Clone, Debug)]
pub struct Skeleton {
    hierarchy: JointHierarchy,
    rest_pose_local: Vec<RigidTransform>,
    rest_pose_global: Vec<RigidTransform>,
}

impl Skeleton {
    pub fn new(parent_index: Vec<i32>, rest_pose_local: Vec<RigidTransform>) -> Result<Self> {
        let hierarchy = JointHierarchy::new(parent_index)?;
        Self::from_hierarchy(hierarchy, rest_pose_local)
    }

    pub fn from_hierarchy(
        hierarchy: JointHierarchy,
        rest_pose_local: Vec<RigidTransform>,
    ) -> Result<Self> {
        if rest_pose_local.len() != hierarchy.joint_count() {
            return Err(SkinningError::Topology(format!(
                "rest pose has {} transforms, hierarchy has {} joints",
                rest_pose_local.len(),
                hierarchy.joint_count()
            )));
        }
        let rest_pose_global = hierarchy.compose_global(&rest_pose_local);
        Ok(Self {
            hierarchy,
            rest_pose_local,
            rest_pose_global,
        })
    }

    pub fn hierarchy(&self) -> &JointHierarchy {
        &self.hierarchy
    }

    pub fn joint_count(&self) -> usize {
        self.hierarchy.joint_count()
    }

    pub fn parent_index(&self) -> &[i32] {
        self.hierarchy.parent_index()
    }

    pub fn rest_pose_local(&self) -> &[RigidTransform] {
        &self.rest_pose_local
    }

    pub fn rest_pose_global(&self) -> &[RigidTransform] {
        &self.rest_pose_global
    }

    /// 由局部姿态合成全局姿态
    pub fn compose_global(&self, local: &[RigidTransform]) -> Vec<RigidTransform> {
        self.hierarchy.compose_global(local)
    }

    /// 在时间 t 采样动画并合成全局姿态
    pub fn evaluate_global(&self, animation: &SkeletonAnimation, t: f32) -> Vec<RigidTransform> {
        self.compose_global(&animation.evaluate_local(t))
    }
}
