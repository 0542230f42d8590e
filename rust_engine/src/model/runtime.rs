//! 速度蒙皮运行时模型

use glam::Vec3;

use crate::animation::{AnimationTimer, SkeletonAnimation};
use crate::rig::{build_velocity_rig, Rig};
use crate::skeleton::{RigidTransform, Skeleton};
use crate::skinning::{
    get_config, velocity_skinning_compute, JointVelocityState, SkinningInput,
    VelocitySkinningParams,
};
use crate::{Result, SkinningError};

use super::SkinnedMesh;

/// 速度蒙皮运行时模型
///
/// 持有一个网格/骨骼绑定的全部运行时状态。速度权重和关节速度历史的生命周期与绑定相同，
/// 重新加载时一起替换。多个模型之间不共享任何状态。
pub struct VelocitySkinnedModel {
    // 静态数据
    skeleton: Skeleton,
    mesh: SkinnedMesh,
    velocity_rig: Option<Rig>,

    // 动画
    animation: Option<SkeletonAnimation>,
    pub timer: AnimationTimer,

    // 运行时数据
    velocity_state: JointVelocityState,
    params: VelocitySkinningParams,
    skeleton_current: Vec<RigidTransform>,
    update_positions: Vec<Vec3>,
    update_normals: Vec<Vec3>,
    /// 渲染上传用平铺缓冲区
    update_positions_raw: Vec<f32>,
    update_normals_raw: Vec<f32>,

    debug_log: bool,
}

impl VelocitySkinnedModel {
    /// 创建模型：校验绑定、归一化权重、构建速度权重
    pub fn new(skeleton: Skeleton, mut mesh: SkinnedMesh) -> Result<Self> {
        let velocity_rig = prepare_binding(&skeleton, &mut mesh)?;
        let config = get_config();
        let mut model = Self {
            skeleton_current: skeleton.rest_pose_global().to_vec(),
            update_positions: mesh.position_rest_pose.clone(),
            update_normals: mesh.normal_rest_pose.clone(),
            skeleton,
            mesh,
            velocity_rig: Some(velocity_rig),
            animation: None,
            timer: AnimationTimer::default(),
            velocity_state: JointVelocityState::Uninitialized,
            params: config.params(),
            update_positions_raw: Vec::new(),
            update_normals_raw: Vec::new(),
            debug_log: config.debug_log,
        };
        model.sync_raw_buffers();
        model.log_loaded();
        Ok(model)
    }

    /// 替换网格/骨骼绑定
    ///
    /// 校验失败时保留原绑定。成功后速度历史被清空，下一帧视为初始化帧；
    /// 当前动画与新骨骼关节数不一致时被移除。
    pub fn load(&mut self, skeleton: Skeleton, mut mesh: SkinnedMesh) -> Result<()> {
        let velocity_rig = prepare_binding(&skeleton, &mut mesh)?;

        if let Some(animation) = &self.animation {
            if animation.joint_count() != skeleton.joint_count() {
                log::warn!(
                    "animation has {} joints, new skeleton has {}; animation removed",
                    animation.joint_count(),
                    skeleton.joint_count()
                );
                self.animation = None;
            }
        }

        self.skeleton_current = skeleton.rest_pose_global().to_vec();
        self.update_positions = mesh.position_rest_pose.clone();
        self.update_normals = mesh.normal_rest_pose.clone();
        self.skeleton = skeleton;
        self.mesh = mesh;
        self.velocity_rig = Some(velocity_rig);
        self.velocity_state.reset();
        self.sync_raw_buffers();
        self.log_loaded();
        Ok(())
    }

    fn log_loaded(&self) {
        log::info!(
            "skinned model loaded: vertex_count={}, joint_count={}",
            self.mesh.vertex_count(),
            self.skeleton.joint_count()
        );
    }

    /// 设置动画，计时器区间同步为动画时间范围
    pub fn set_animation(&mut self, animation: Option<SkeletonAnimation>) -> Result<()> {
        if let Some(anim) = &animation {
            if anim.joint_count() != self.skeleton.joint_count() {
                return Err(SkinningError::Animation(format!(
                    "animation has {} joints, skeleton has {}",
                    anim.joint_count(),
                    self.skeleton.joint_count()
                )));
            }
            self.timer.set_range(anim.start_time(), anim.end_time());
        }
        self.animation = animation;
        Ok(())
    }

    pub fn animation(&self) -> Option<&SkeletonAnimation> {
        self.animation.as_ref()
    }

    /// 重新构建速度权重
    pub fn build_velocity_rig(&mut self) {
        self.velocity_rig = Some(build_velocity_rig(&self.mesh.rig, self.skeleton.hierarchy()));
    }

    /// 移除速度权重，之后每帧只做 LBS
    pub fn clear_velocity_rig(&mut self) {
        self.velocity_rig = None;
    }

    /// 按真实时间推进计时器并更新一帧
    pub fn tick(&mut self) {
        let dt = self.timer.tick();
        self.update(dt);
    }

    /// 推进 elapsed 秒后更新一帧
    pub fn advance(&mut self, elapsed: f32) {
        let dt = self.timer.advance(elapsed);
        self.update(dt);
    }

    /// 在计时器当前时间采样动画并计算蒙皮
    ///
    /// dt <= 0（暂停）或非有限值时跳过本帧，输出和历史都保持不变。
    pub fn update(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let pose = match &self.animation {
            Some(animation) => self.skeleton.evaluate_global(animation, self.timer.t),
            None => self.skeleton.rest_pose_global().to_vec(),
        };
        self.compute_deformation(pose, dt);
    }

    /// 用外部给定的当前全局姿态计算蒙皮
    pub fn compute_deformation(&mut self, skeleton_current: Vec<RigidTransform>, dt: f32) {
        assert_eq!(
            skeleton_current.len(),
            self.skeleton.joint_count(),
            "pose joint count must match skeleton"
        );
        self.skeleton_current = skeleton_current;

        let input = SkinningInput {
            skeleton_current: &self.skeleton_current,
            skeleton_rest_pose: self.skeleton.rest_pose_global(),
            position_rest_pose: &self.mesh.position_rest_pose,
            normal_rest_pose: &self.mesh.normal_rest_pose,
            rig: &self.mesh.rig,
            velocity_rig: self.velocity_rig.as_ref(),
        };
        velocity_skinning_compute(
            &input,
            &mut self.update_positions,
            &mut self.update_normals,
            &mut self.velocity_state,
            dt,
            &self.params,
        );
        self.sync_raw_buffers();

        if self.debug_log {
            let max_offset = self
                .update_positions
                .iter()
                .zip(&self.mesh.position_rest_pose)
                .map(|(p, rest)| (*p - *rest).length())
                .fold(0.0f32, f32::max);
            log::debug!(
                "velocity skinning: t={:.3}, dt={:.4}, max_offset={:.4}",
                self.timer.t,
                dt,
                max_offset
            );
        }
    }

    fn sync_raw_buffers(&mut self) {
        let raw_len = self.update_positions.len() * 3;
        self.update_positions_raw.resize(raw_len, 0.0);
        self.update_normals_raw.resize(raw_len, 0.0);
        for (chunk, p) in self
            .update_positions_raw
            .chunks_mut(3)
            .zip(&self.update_positions)
        {
            chunk.copy_from_slice(&p.to_array());
        }
        for (chunk, n) in self
            .update_normals_raw
            .chunks_mut(3)
            .zip(&self.update_normals)
        {
            chunk.copy_from_slice(&n.to_array());
        }
    }

    // ========== 参数 ==========

    pub fn params(&self) -> &VelocitySkinningParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut VelocitySkinningParams {
        &mut self.params
    }

    pub fn set_params(&mut self, params: VelocitySkinningParams) {
        self.params = params;
    }

    pub fn set_debug_log(&mut self, enabled: bool) {
        self.debug_log = enabled;
    }

    // ========== 访问器 ==========

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn mesh(&self) -> &SkinnedMesh {
        &self.mesh
    }

    pub fn velocity_rig(&self) -> Option<&Rig> {
        self.velocity_rig.as_ref()
    }

    pub fn velocity_state(&self) -> &JointVelocityState {
        &self.velocity_state
    }

    pub fn current_pose(&self) -> &[RigidTransform] {
        &self.skeleton_current
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.update_positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.update_normals
    }

    pub fn positions_raw(&self) -> &[f32] {
        &self.update_positions_raw
    }

    pub fn normals_raw(&self) -> &[f32] {
        &self.update_normals_raw
    }
}

/// 校验绑定并归一化权重，返回新的速度权重
fn prepare_binding(skeleton: &Skeleton, mesh: &mut SkinnedMesh) -> Result<Rig> {
    mesh.validate(skeleton.joint_count())?;
    mesh.rig.normalize();
    Ok(build_velocity_rig(&mesh.rig, skeleton.hierarchy()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use std::f32::consts::FRAC_PI_2;

    fn chain_skeleton() -> Skeleton {
        let offset = RigidTransform::from_translation(Vec3::new(0.5, 0.0, 0.0));
        Skeleton::new(vec![-1, 0, 1], vec![RigidTransform::IDENTITY, offset, offset]).unwrap()
    }

    /// 沿 x 轴的一排顶点，权重随 x 从关节 0 过渡到关节 1
    fn strip_mesh() -> SkinnedMesh {
        let mut rig = Rig::new();
        let mut positions = Vec::new();
        for k in 0..5 {
            let x = k as f32 * 0.25;
            positions.push(Vec3::new(x, 0.1, 0.0));
            let w1 = x.min(1.0);
            rig.push_vertex(&[(0, 2.0 * (1.0 - w1) + 0.01), (1, 2.0 * w1)]);
        }
        let normals = vec![Vec3::Y; positions.len()];
        SkinnedMesh::new(positions, normals, rig)
    }

    fn bend_animation() -> SkeletonAnimation {
        let tx = Vec3::new(0.5, 0.0, 0.0);
        let rest = vec![
            RigidTransform::IDENTITY,
            RigidTransform::from_translation(tx),
            RigidTransform::from_translation(tx),
        ];
        let bent = vec![
            RigidTransform::IDENTITY,
            RigidTransform::new(Quat::from_rotation_z(FRAC_PI_2), tx),
            RigidTransform::from_translation(tx),
        ];
        SkeletonAnimation::new(vec![0.0, 1.0, 2.0], vec![rest.clone(), bent, rest]).unwrap()
    }

    #[test]
    fn test_new_normalizes_and_builds_velocity_rig() {
        let model = VelocitySkinnedModel::new(chain_skeleton(), strip_mesh()).unwrap();
        for w in &model.mesh().rig.weight {
            let sum: f32 = w.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
        let velocity_rig = model.velocity_rig().unwrap();
        assert_eq!(velocity_rig.joint, model.mesh().rig.joint);
        // 关节 0 是根，速度权重为全部权重之和
        for w in &velocity_rig.weight {
            assert!((w[0] - 1.0).abs() < 1e-5);
        }
        assert!(!model.velocity_state().is_ready());
        assert_eq!(model.positions(), model.mesh().position_rest_pose.as_slice());
    }

    #[test]
    fn test_new_rejects_bad_rig() {
        let mut mesh = strip_mesh();
        mesh.rig.joint[2][1] = 7;
        assert!(matches!(
            VelocitySkinnedModel::new(chain_skeleton(), mesh),
            Err(SkinningError::JointOutOfRange { vertex: 2, joint: 7, .. })
        ));

        let mut mesh = strip_mesh();
        mesh.rig.weight[0] = vec![0.0, 0.0];
        assert!(matches!(
            VelocitySkinnedModel::new(chain_skeleton(), mesh),
            Err(SkinningError::MalformedRig { vertex: 0, .. })
        ));

        let mut mesh = strip_mesh();
        mesh.normal_rest_pose.pop();
        assert!(matches!(
            VelocitySkinnedModel::new(chain_skeleton(), mesh),
            Err(SkinningError::MeshMismatch(_))
        ));
    }

    #[test]
    fn test_animation_frames() {
        let mut model = VelocitySkinnedModel::new(chain_skeleton(), strip_mesh()).unwrap();
        model.set_animation(Some(bend_animation())).unwrap();
        model.set_params(VelocitySkinningParams {
            speed_blending: 0.2,
            linear_deformation_intensity: 1.0,
            rotational_deformation_intensity: 1.0,
        });

        // 初始化帧：纯 LBS
        model.advance(0.25);
        assert!(model.velocity_state().is_ready());
        let pose = model.current_pose().to_vec();
        let lbs_only = {
            let mut reference = VelocitySkinnedModel::new(chain_skeleton(), strip_mesh()).unwrap();
            reference.clear_velocity_rig();
            reference.compute_deformation(pose, 0.25);
            reference.positions().to_vec()
        };
        assert_eq!(model.positions(), lbs_only.as_slice());

        // 第二帧有旋转运动，末端顶点偏离 LBS
        model.advance(0.25);
        let pose = model.current_pose().to_vec();
        let mut reference = VelocitySkinnedModel::new(chain_skeleton(), strip_mesh()).unwrap();
        reference.clear_velocity_rig();
        reference.compute_deformation(pose, 0.25);
        let last = model.vertex_count() - 1;
        assert!((model.positions()[last] - reference.positions()[last]).length() > 1e-3);
        assert!(model.positions().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_load_resets_history() {
        let mut model = VelocitySkinnedModel::new(chain_skeleton(), strip_mesh()).unwrap();
        model.set_animation(Some(bend_animation())).unwrap();
        model.advance(0.1);
        model.advance(0.1);
        assert!(model.velocity_state().is_ready());

        model.load(chain_skeleton(), strip_mesh()).unwrap();
        assert!(!model.velocity_state().is_ready());
        assert!(model.animation().is_some());

        // 新骨骼关节数不同，动画被移除
        let single = Skeleton::new(vec![-1], vec![RigidTransform::IDENTITY]).unwrap();
        let mut rig = Rig::new();
        rig.push_vertex(&[(0, 1.0)]);
        let mesh = SkinnedMesh::new(vec![Vec3::X], vec![Vec3::Y], rig);
        model.load(single, mesh).unwrap();
        assert!(model.animation().is_none());
        assert_eq!(model.vertex_count(), 1);
    }

    #[test]
    fn test_failed_load_keeps_binding() {
        let mut model = VelocitySkinnedModel::new(chain_skeleton(), strip_mesh()).unwrap();
        let mut mesh = strip_mesh();
        mesh.rig.joint[0][0] = 9;
        assert!(model.load(chain_skeleton(), mesh).is_err());
        assert_eq!(model.vertex_count(), 5);
        assert!(model.velocity_rig().is_some());
    }

    #[test]
    fn test_set_animation_joint_mismatch() {
        let mut model = VelocitySkinnedModel::new(chain_skeleton(), strip_mesh()).unwrap();
        let anim = SkeletonAnimation::new(vec![0.0], vec![vec![RigidTransform::IDENTITY]]).unwrap();
        assert!(matches!(
            model.set_animation(Some(anim)),
            Err(SkinningError::Animation(_))
        ));
        model.set_animation(Some(bend_animation())).unwrap();
        assert_eq!(model.timer.t_min, 0.0);
        assert_eq!(model.timer.t_max, 2.0);
    }

    #[test]
    fn test_paused_frame_is_skipped() {
        let mut model = VelocitySkinnedModel::new(chain_skeleton(), strip_mesh()).unwrap();
        model.set_animation(Some(bend_animation())).unwrap();
        model.advance(0.5);
        let before = model.positions().to_vec();
        model.timer.pause();
        model.advance(0.5);
        assert_eq!(model.positions(), before.as_slice());
        model.update(0.0);
        assert_eq!(model.positions(), before.as_slice());
        model.update(f32::NAN);
        assert_eq!(model.positions(), before.as_slice());

        model.timer.resume();
        model.advance(f32::NAN);
        assert_eq!(model.positions(), before.as_slice());
        assert!(model.timer.t.is_finite());
    }

    /// 关节 1 的关键帧只差四元数符号
    fn sign_flipped_animation(flip: bool) -> SkeletonAnimation {
        let tx = Vec3::new(0.5, 0.0, 0.0);
        let key = |q: Quat| {
            vec![
                RigidTransform::IDENTITY,
                RigidTransform::new(q, tx),
                RigidTransform::from_translation(tx),
            ]
        };
        let middle = if flip {
            -Quat::from_rotation_z(0.5)
        } else {
            Quat::from_rotation_z(0.5)
        };
        SkeletonAnimation::new(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![
                key(Quat::IDENTITY),
                key(middle),
                key(Quat::from_rotation_z(1.0)),
                key(Quat::from_rotation_z(1.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_quaternion_sign_across_keyframes() {
        let run = |flip: bool| {
            let mut model = VelocitySkinnedModel::new(chain_skeleton(), strip_mesh()).unwrap();
            model.set_animation(Some(sign_flipped_animation(flip))).unwrap();
            model.advance(0.9);
            model.advance(0.2);
            model.positions().to_vec()
        };
        let plain = run(false);
        let flipped = run(true);
        for (a, b) in plain.iter().zip(&flipped) {
            assert!(a.abs_diff_eq(*b, 1e-4), "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_raw_buffers_follow_positions() {
        let mut model = VelocitySkinnedModel::new(chain_skeleton(), strip_mesh()).unwrap();
        model.set_animation(Some(bend_animation())).unwrap();
        model.advance(0.3);
        model.advance(0.3);
        let raw = model.positions_raw();
        assert_eq!(raw.len(), model.vertex_count() * 3);
        for (i, p) in model.positions().iter().enumerate() {
            assert_eq!(&raw[i * 3..i * 3 + 3], &p.to_array());
        }
        assert_eq!(model.normals_raw().len(), raw.len());
    }
}
