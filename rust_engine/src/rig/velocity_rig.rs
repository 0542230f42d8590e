//! 速度权重构建

use crate::skeleton::JointHierarchy;

use super::Rig;

/// 由骨骼层级和标准权重构建速度权重
///
/// 顶点 i 在关节 j 上的速度权重 = 顶点 i 在 j 的所有后代（含 j）上的标准权重之和。
/// 关节列表保持不变；结果不做归一化，沿父链的后代集合互相重叠，总和可以大于 1。
pub fn build_velocity_rig(rig: &Rig, hierarchy: &JointHierarchy) -> Rig {
    let descendants = hierarchy.descendants();

    let weight: Vec<Vec<f32>> = rig
        .joint
        .iter()
        .zip(&rig.weight)
        .map(|(joints, weights)| {
            joints
                .iter()
                .map(|&joint| {
                    descendants[joint]
                        .iter()
                        .filter_map(|child| joints.iter().position(|j| j == child))
                        .map(|k| weights[k])
                        .sum::<f32>()
                })
                .collect()
        })
        .collect();

    log::info!(
        "velocity rig built: {} vertices, {} joints",
        rig.vertex_count(),
        hierarchy.joint_count()
    );

    Rig {
        joint: rig.joint.clone(),
        weight,
    }
}
