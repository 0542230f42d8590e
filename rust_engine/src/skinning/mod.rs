//! 顶点蒙皮计算
//!
//! LBS 之后叠加两个基于关节速度的变形：平移（拖拽/挤压）和旋转（惯性滞后）。

mod config;
mod skinning;
mod velocity;

pub use config::{
    get_config, reset_config, set_config, SkinningConfig, VelocitySkinningParams,
    LINEAR_INTENSITY_RANGE, ROTATIONAL_INTENSITY_RANGE, SPEED_BLENDING_RANGE,
};
pub use skinning::{compute_linear_blend_skinning, velocity_skinning_compute};
pub use velocity::{JointVelocityState, ROTATION_EPSILON, ROTATION_LAG_GAIN};

use glam::Vec3;

use crate::rig::Rig;
use crate::skeleton::RigidTransform;

/// 蒙皮输入数据
pub struct SkinningInput<'a> {
    /// 当前帧关节全局变换
    pub skeleton_current: &'a [RigidTransform],
    /// 静止姿态关节全局变换
    pub skeleton_rest_pose: &'a [RigidTransform],
    /// 静止姿态顶点位置
    pub position_rest_pose: &'a [Vec3],
    /// 静止姿态顶点法线
    pub normal_rest_pose: &'a [Vec3],
    /// 顶点权重
    pub rig: &'a Rig,
    /// 速度权重，尚未构建时为 None（退化为纯 LBS）
    pub velocity_rig: Option<&'a Rig>,
}

#[cfg(feature = "parallel")]
fn for_each_vertex<F>(positions: &mut [Vec3], f: F)
where
    F: Fn(usize, &mut Vec3) + Sync + Send,
{
    use rayon::prelude::*;
    positions
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, p)| f(i, p));
}

#[cfg(not(feature = "parallel"))]
fn for_each_vertex<F>(positions: &mut [Vec3], f: F)
where
    F: Fn(usize, &mut Vec3) + Sync + Send,
{
    positions.iter_mut().enumerate().for_each(|(i, p)| f(i, p));
}

#[cfg(feature = "parallel")]
fn for_each_vertex_with_normal<F>(positions: &mut [Vec3], normals: &mut [Vec3], f: F)
where
    F: Fn(usize, &mut Vec3, &mut Vec3) + Sync + Send,
{
    use rayon::prelude::*;
    positions
        .par_iter_mut()
        .zip(normals.par_iter_mut())
        .enumerate()
        .for_each(|(i, (p, n))| f(i, p, n));
}

#[cfg(not(feature = "parallel"))]
fn for_each_vertex_with_normal<F>(positions: &mut [Vec3], normals: &mut [Vec3], f: F)
where
    F: Fn(usize, &mut Vec3, &mut Vec3) + Sync + Send,
{
    positions
        .iter_mut()
        .zip(normals.iter_mut())
        .enumerate()
        .for_each(|(i, (p, n))| f(i, p, n));
}
