//! 顶点权重（Rig）
//!
//! 每个顶点一组 (关节索引, 权重)。同一结构也用于速度权重（Velocity Rig），
//! 两者关节列表相同，只有权重不同。

mod velocity_rig;

pub use velocity_rig::build_velocity_rig;

use crate::{Result, SkinningError};

/// 归一化前权重和的下限
pub const WEIGHT_SUM_EPSILON: f32 = 1e-5;

/// 顶点权重
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Rig {
    /// 每个顶点受影响的关节索引
    pub joint: Vec<Vec<usize>>,
    /// 与 `joint` 一一对应的权重
    pub weight: Vec<Vec<f32>>,
}

impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize) -> Self {
        Self {
            joint: Vec::with_capacity(vertex_count),
            weight: Vec::with_capacity(vertex_count),
        }
    }

    /// 追加一个顶点的影响列表
    pub fn push_vertex(&mut self, influences: &[(usize, f32)]) {
        self.joint.push(influences.iter().map(|&(j, _)| j).collect());
        self.weight.push(influences.iter().map(|&(_, w)| w).collect());
    }

    pub fn vertex_count(&self) -> usize {
        self.joint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joint.is_empty()
    }

    /// 顶点 i 的 (关节, 权重) 迭代器
    pub fn influences(&self, vertex: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.joint[vertex]
            .iter()
            .copied()
            .zip(self.weight[vertex].iter().copied())
    }

    /// 顶点 i 在关节 joint 上的权重，未受影响返回 None
    pub fn weight_of(&self, vertex: usize, joint: usize) -> Option<f32> {
        self.joint[vertex]
            .iter()
            .position(|&j| j == joint)
            .map(|k| self.weight[vertex][k])
    }

    /// 校验结构：关节/权重列表等长、关节索引不越界、权重非负且和不为零
    pub fn validate(&self, joint_count: usize) -> Result<()> {
        if self.joint.len() != self.weight.len() {
            return Err(SkinningError::MeshMismatch(format!(
                "rig has {} joint lists but {} weight lists",
                self.joint.len(),
                self.weight.len()
            )));
        }
        for (vertex, (joints, weights)) in self.joint.iter().zip(&self.weight).enumerate() {
            if joints.len() != weights.len() {
                return Err(SkinningError::MeshMismatch(format!(
                    "vertex {} has {} joints but {} weights",
                    vertex,
                    joints.len(),
                    weights.len()
                )));
            }
            if let Some(&joint) = joints.iter().find(|&&j| j >= joint_count) {
                return Err(SkinningError::JointOutOfRange {
                    vertex,
                    joint,
                    joint_count,
                });
            }
            let sum: f32 = weights.iter().sum();
            if weights.iter().any(|&w| w < 0.0) || !(sum > WEIGHT_SUM_EPSILON) {
                return Err(SkinningError::MalformedRig { vertex, sum });
            }
        }
        Ok(())
    }

    pub fn normalize(&mut self) {
        normalize_weights(&mut self.weight);
    }
}

/// 将每个顶点的权重缩放到和为 1
///
/// # Panics
/// 某个顶点的权重和不大于 [`WEIGHT_SUM_EPSILON`] 时（零影响的顶点）。
pub fn normalize_weights(weights: &mut [Vec<f32>]) {
    for (vertex, w) in weights.iter_mut().enumerate() {
        let sum: f32 = w.iter().sum();
        assert!(
            sum > WEIGHT_SUM_EPSILON,
            "vertex {} has near-zero total weight {}",
            vertex,
            sum
        );
        for value in w.iter_mut() {
            *value /= sum;
        }
    }
}
