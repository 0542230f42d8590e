//! 速度蒙皮配置
//!
//! 所有参数扁平化。全局配置只提供新会话的默认值，会话创建后各自持有参数副本。

use once_cell::sync::Lazy;
use std::ops::RangeInclusive;
use std::sync::RwLock;

/// 速度平滑系数的推荐范围
pub const SPEED_BLENDING_RANGE: RangeInclusive<f32> = 0.01..=1.0;
/// 平移变形强度的推荐范围
pub const LINEAR_INTENSITY_RANGE: RangeInclusive<f32> = 0.01..=10.0;
/// 旋转变形强度的推荐范围
pub const ROTATIONAL_INTENSITY_RANGE: RangeInclusive<f32> = 0.1..=10.0;

/// 每帧使用的三个可调参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocitySkinningParams {
    /// 速度指数平滑系数 [0, 1]，越大越依赖历史速度
    pub speed_blending: f32,
    /// 平移速度变形强度（>= 0）
    pub linear_deformation_intensity: f32,
    /// 旋转速度变形强度（>= 0）
    pub rotational_deformation_intensity: f32,
}

impl Default for VelocitySkinningParams {
    fn default() -> Self {
        SkinningConfig::default().params()
    }
}

impl VelocitySkinningParams {
    /// 夹到控制面板的推荐范围
    pub fn clamped(self) -> Self {
        Self {
            speed_blending: clamp_to(self.speed_blending, &SPEED_BLENDING_RANGE),
            linear_deformation_intensity: clamp_to(
                self.linear_deformation_intensity,
                &LINEAR_INTENSITY_RANGE,
            ),
            rotational_deformation_intensity: clamp_to(
                self.rotational_deformation_intensity,
                &ROTATIONAL_INTENSITY_RANGE,
            ),
        }
    }
}

fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> f32 {
    value.clamp(*range.start(), *range.end())
}

/// 速度蒙皮全局配置
#[derive(Debug, Clone)]
pub struct SkinningConfig {
    // ========== 速度滤波 ==========
    /// 速度平滑系数，默认 0.5
    /// 0 = 只用当前帧速度，1 = 完全沿用历史速度
    pub speed_blending: f32,

    // ========== 变形强度 ==========
    /// 平移速度变形强度，默认 1.0
    /// 越大 → 拖拽/挤压越明显
    pub linear_deformation_intensity: f32,
    /// 旋转速度变形强度，默认 1.0
    /// 越大 → 远离旋转轴的部分滞后越明显
    pub rotational_deformation_intensity: f32,

    // ========== 调试 ==========
    /// 是否输出每帧调试日志，默认 false
    pub debug_log: bool,
}

impl Default for SkinningConfig {
    fn default() -> Self {
        Self {
            speed_blending: 0.5,
            linear_deformation_intensity: 1.0,
            rotational_deformation_intensity: 1.0,
            debug_log: false,
        }
    }
}

impl SkinningConfig {
    pub fn params(&self) -> VelocitySkinningParams {
        VelocitySkinningParams {
            speed_blending: self.speed_blending,
            linear_deformation_intensity: self.linear_deformation_intensity,
            rotational_deformation_intensity: self.rotational_deformation_intensity,
        }
    }
}

/// 全局配置实例
static SKINNING_CONFIG: Lazy<RwLock<SkinningConfig>> =
    Lazy::new(|| RwLock::new(SkinningConfig::default()));

/// 获取当前配置（只读）
pub fn get_config() -> SkinningConfig {
    match SKINNING_CONFIG.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: SkinningConfig) {
    match SKINNING_CONFIG.write() {
        Ok(mut guard) => *guard = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

/// 重置为默认配置
pub fn reset_config() {
    set_config(SkinningConfig::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped() {
        let params = VelocitySkinningParams {
            speed_blending: 3.0,
            linear_deformation_intensity: 0.0,
            rotational_deformation_intensity: 20.0,
        }
        .clamped();
        assert_eq!(params.speed_blending, 1.0);
        assert_eq!(params.linear_deformation_intensity, 0.01);
        assert_eq!(params.rotational_deformation_intensity, 10.0);
    }

    #[test]
    fn test_default_params_match_config() {
        assert_eq!(
            VelocitySkinningParams::default(),
            SkinningConfig::default().params()
        );
    }
}
