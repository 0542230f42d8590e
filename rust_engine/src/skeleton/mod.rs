//! 骨骼层级与姿态合成

mod hierarchy;
mod skeleton;
mod transform;

pub use hierarchy::{JointHierarchy, ROOT_PARENT};
pub use skeleton::Skeleton;
pub use transform::RigidTransform;
