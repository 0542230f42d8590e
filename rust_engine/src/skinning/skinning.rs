//! 顶点蒙皮计算

use glam::{Mat4, Vec3};

use super::config::VelocitySkinningParams;
use super::velocity::{
    blend_velocity, incremental_rotation, linear_velocity_deformation,
    rotational_velocity_deformation, JointRotation, JointVelocityState,
};
use super::{for_each_vertex, for_each_vertex_with_normal, SkinningInput};

/// 标准线性混合蒙皮
///
/// 每个顶点：M = Σ w · current(j) · rest(j)^-1，位置和法线都用 M 变换。
/// 关节变换是刚体变换，法线不需要逆转置。
pub fn compute_linear_blend_skinning(
    input: &SkinningInput,
    position_skinned: &mut [Vec3],
    normal_skinned: &mut [Vec3],
) {
    let vertex_count = input.position_rest_pose.len();
    assert_eq!(position_skinned.len(), vertex_count);
    assert_eq!(normal_skinned.len(), vertex_count);
    assert_eq!(input.normal_rest_pose.len(), vertex_count);
    assert_eq!(input.rig.vertex_count(), vertex_count);

    // 蒙皮矩阵（已乘以静止姿态的逆）
    let joint_matrices: Vec<Mat4> = input
        .skeleton_current
        .iter()
        .zip(input.skeleton_rest_pose)
        .map(|(current, rest)| current.to_matrix() * rest.inverse().to_matrix())
        .collect();

    let rig = input.rig;
    let rest_positions = input.position_rest_pose;
    let rest_normals = input.normal_rest_pose;

    for_each_vertex_with_normal(position_skinned, normal_skinned, |i, pos_out, norm_out| {
        let mut m = Mat4::ZERO;
        for (joint, weight) in rig.influences(i) {
            m += joint_matrices[joint] * weight;
        }
        *pos_out = m.transform_point3(rest_positions[i]);
        *norm_out = m.transform_vector3(rest_normals[i]).normalize_or_zero();
    });
}

/// 速度蒙皮：LBS + 平移速度变形 + 旋转速度变形 + 历史更新
///
/// - 状态为 `Uninitialized` 时只做 LBS，并用当前姿态初始化历史
/// - 速度权重尚未构建时只做 LBS，历史不更新
///
/// # Panics
/// 需要计算速度时 `dt <= 0`，或关节数与历史不一致。
pub fn velocity_skinning_compute(
    input: &SkinningInput,
    position_skinned: &mut [Vec3],
    normal_skinned: &mut [Vec3],
    state: &mut JointVelocityState,
    dt: f32,
    params: &VelocitySkinningParams,
) {
    compute_linear_blend_skinning(input, position_skinned, normal_skinned);

    let skeleton_current = input.skeleton_current;
    let joint_count = skeleton_current.len();

    if !state.is_ready() {
        log::debug!("initialising joint velocity state ({} joints)", joint_count);
        *state = JointVelocityState::seeded(skeleton_current);
        return;
    }

    let Some(velocity_rig) = input.velocity_rig else {
        return;
    };

    let JointVelocityState::Ready {
        previous_pose,
        filtered_velocity,
    } = state
    else {
        return;
    };

    assert!(dt > 0.0, "velocity skinning requires dt > 0, got {}", dt);
    assert_eq!(
        previous_pose.len(),
        joint_count,
        "joint velocity state does not match skeleton"
    );

    let speed_blending = params.speed_blending;

    // 平移速度（有限差分）
    let translation_velocity: Vec<Vec3> = skeleton_current
        .iter()
        .zip(previous_pose.iter())
        .map(|(current, previous)| (current.translation - previous.translation) / dt)
        .collect();

    // 平移速度变形
    {
        let filtered: &[Vec3] = filtered_velocity;
        let intensity = params.linear_deformation_intensity;
        for_each_vertex(position_skinned, |i, pos| {
            let deformation = linear_velocity_deformation(
                i,
                velocity_rig,
                &translation_velocity,
                filtered,
                speed_blending,
            );
            *pos -= deformation * intensity;
        });
    }

    // 旋转速度变形（叠加在平移变形结果上）
    {
        let joint_rotation: Vec<Option<JointRotation>> = skeleton_current
            .iter()
            .zip(previous_pose.iter())
            .map(|(current, previous)| incremental_rotation(current, previous))
            .collect();
        let intensity = params.rotational_deformation_intensity;
        for_each_vertex(position_skinned, |i, pos| {
            let deformation = rotational_velocity_deformation(
                *pos,
                i,
                velocity_rig,
                skeleton_current,
                &joint_rotation,
            );
            *pos -= deformation * intensity;
        });
    }

    // 更新历史
    for ((previous, filtered), (current, velocity)) in previous_pose
        .iter_mut()
        .zip(filtered_velocity.iter_mut())
        .zip(skeleton_current.iter().zip(&translation_velocity))
    {
        *previous = *current;
        *filtered = blend_velocity(*velocity, *filtered, speed_blending);
    }
}
