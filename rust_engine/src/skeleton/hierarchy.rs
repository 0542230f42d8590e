//! 关节层级（父索引数组）

use crate::{Result, SkinningError};

use super::RigidTransform;

/// 根关节的父索引
pub const ROOT_PARENT: i32 = -1;

/// 关节层级
///
/// 以扁平的父索引数组保存。构造时校验：
/// - 恰好一个根关节（父索引为 -1）
/// - 父索引不越界
/// - 沿父链向上必然在有限步内到达根（无环）
#[derive(Clone, Debug)]
pub struct JointHierarchy {
    parent_index: Vec<i32>,
    /// 父关节总在子关节之前的处理顺序
    sorted_indices: Vec<usize>,
    root: usize,
}

impl JointHierarchy {
    pub fn new(parent_index: Vec<i32>) -> Result<Self> {
        let joint_count = parent_index.len();
        if joint_count == 0 {
            return Err(SkinningError::Topology("hierarchy has no joints".into()));
        }

        let roots: Vec<usize> = parent_index
            .iter()
            .enumerate()
            .filter(|(_, &p)| p == ROOT_PARENT)
            .map(|(i, _)| i)
            .collect();
        if roots.len() != 1 {
            return Err(SkinningError::Topology(format!(
                "expected exactly one root, found {}",
                roots.len()
            )));
        }

        for (joint, &parent) in parent_index.iter().enumerate() {
            if parent == ROOT_PARENT {
                continue;
            }
            if parent < 0 || parent as usize >= joint_count {
                return Err(SkinningError::Topology(format!(
                    "joint {} has invalid parent index {}",
                    joint, parent
                )));
            }
            if parent as usize == joint {
                return Err(SkinningError::Topology(format!(
                    "joint {} is its own parent",
                    joint
                )));
            }
        }

        // 计算深度，同时检测环：步数超过关节数说明存在环
        let mut depth = vec![0usize; joint_count];
        for joint in 0..joint_count {
            let mut steps = 0;
            let mut current = parent_index[joint];
            while current != ROOT_PARENT {
                steps += 1;
                if steps > joint_count {
                    return Err(SkinningError::Topology(format!(
                        "cycle detected through joint {}",
                        joint
                    )));
                }
                current = parent_index[current as usize];
            }
            depth[joint] = steps;
        }

        let mut sorted_indices: Vec<usize> = (0..joint_count).collect();
        sorted_indices.sort_by_key(|&i| depth[i]);

        Ok(Self {
            parent_index,
            sorted_indices,
            root: roots[0],
        })
    }

    pub fn joint_count(&self) -> usize {
        self.parent_index.len()
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn parent_index(&self) -> &[i32] {
        &self.parent_index
    }

    pub fn parent(&self, joint: usize) -> Option<usize> {
        match self.parent_index.get(joint) {
            Some(&p) if p != ROOT_PARENT => Some(p as usize),
            _ => None,
        }
    }

    /// 父关节先于子关节的遍历顺序
    pub fn sorted_indices(&self) -> &[usize] {
        &self.sorted_indices
    }

    /// 每个关节的后代集合（包含自身）
    ///
    /// 对每个关节沿父链向上走，把它加入途经的每个祖先（以及它自己）的集合。
    pub fn descendants(&self) -> Vec<Vec<usize>> {
        let mut descendants = vec![Vec::new(); self.joint_count()];
        for child in 0..self.joint_count() {
            let mut current = child as i32;
            while current != ROOT_PARENT {
                descendants[current as usize].push(child);
                current = self.parent_index[current as usize];
            }
        }
        descendants
    }

    /// 将局部变换沿层级合成为全局变换
    pub fn compose_global(&self, local: &[RigidTransform]) -> Vec<RigidTransform> {
        assert_eq!(
            local.len(),
            self.joint_count(),
            "local pose count must match joint count"
        );
        let mut global = vec![RigidTransform::IDENTITY; self.joint_count()];
        for &joint in &self.sorted_indices {
            global[joint] = match self.parent(joint) {
                Some(parent) => global[parent] * local[joint],
                None => local[joint],
            };
        }
        global
    }
}
