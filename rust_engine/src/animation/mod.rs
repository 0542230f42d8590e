//! 动画系统
//!
//! 提供关键帧采样和循环播放计时，为每帧生成关节局部姿态。

mod skeleton_animation;
mod timer;

pub use skeleton_animation::SkeletonAnimation;
pub use timer::AnimationTimer;
