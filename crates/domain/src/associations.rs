//! 资源关联
//!
//! 集群↔命令、命令↔应用的多对多关系以显式的边表示，两侧都不持有对方的引用。
//! 所有增删都经由 [`AssociationTable::set`] 一个入口完成。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssociationKind {
    /// 左侧为集群，右侧为命令
    ClusterCommand,
    /// 左侧为命令，右侧为应用
    CommandApplication,
}

impl AssociationKind {
    pub fn table_name(&self) -> &'static str {
        match self {
            AssociationKind::ClusterCommand => "cluster_commands",
            AssociationKind::CommandApplication => "command_applications",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Association {
    pub kind: AssociationKind,
    pub left: String,
    pub right: String,
}

impl Association {
    pub fn cluster_command(cluster_id: &str, command_id: &str) -> Self {
        Self {
            kind: AssociationKind::ClusterCommand,
            left: cluster_id.to_string(),
            right: command_id.to_string(),
        }
    }

    pub fn command_application(command_id: &str, application_id: &str) -> Self {
        Self {
            kind: AssociationKind::CommandApplication,
            left: command_id.to_string(),
            right: application_id.to_string(),
        }
    }
}

/// 关联查询方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// 内存中的边表，供内存仓储与测试使用
#[derive(Debug, Clone, Default)]
pub struct AssociationTable {
    edges: BTreeSet<Association>,
}

impl AssociationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建立或移除一条关联，返回边表是否发生变化
    pub fn set(&mut self, association: Association, present: bool) -> bool {
        if present {
            self.edges.insert(association)
        } else {
            self.edges.remove(&association)
        }
    }

    pub fn contains(&self, association: &Association) -> bool {
        self.edges.contains(association)
    }

    /// 已知一侧的 id，按插入无关的稳定顺序返回另一侧的 id
    pub fn linked(&self, kind: AssociationKind, known: Side, id: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|edge| edge.kind == kind)
            .filter_map(|edge| match known {
                Side::Left if edge.left == id => Some(edge.right.clone()),
                Side::Right if edge.right == id => Some(edge.left.clone()),
                _ => None,
            })
            .collect()
    }

    /// 删除涉及某个 id 的所有边
    pub fn remove_all(&mut self, kind: AssociationKind, side: Side, id: &str) -> usize {
        let before = self.edges.len();
        self.edges.retain(|edge| {
            edge.kind != kind
                || match side {
                    Side::Left => edge.left != id,
                    Side::Right => edge.right != id,
                }
        });
        before - self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_visible_from_both_sides() {
        let mut table = AssociationTable::new();
        assert!(table.set(Association::cluster_command("c1", "cmd1"), true));
        assert!(table.set(Association::cluster_command("c2", "cmd1"), true));

        assert_eq!(
            table.linked(AssociationKind::ClusterCommand, Side::Left, "c1"),
            vec!["cmd1"]
        );
        assert_eq!(
            table.linked(AssociationKind::ClusterCommand, Side::Right, "cmd1"),
            vec!["c1", "c2"]
        );
    }

    #[test]
    fn test_set_is_idempotent() {
        let mut table = AssociationTable::new();
        let edge = Association::command_application("cmd1", "app1");
        assert!(table.set(edge.clone(), true));
        assert!(!table.set(edge.clone(), true));
        assert!(table.set(edge.clone(), false));
        assert!(!table.set(edge, false));
    }

    #[test]
    fn test_kinds_are_separate() {
        let mut table = AssociationTable::new();
        table.set(Association::cluster_command("x", "y"), true);
        assert!(table
            .linked(AssociationKind::CommandApplication, Side::Left, "x")
            .is_empty());
    }

    #[test]
    fn test_remove_all_for_id() {
        let mut table = AssociationTable::new();
        table.set(Association::cluster_command("c1", "cmd1"), true);
        table.set(Association::cluster_command("c1", "cmd2"), true);
        table.set(Association::cluster_command("c2", "cmd2"), true);
        assert_eq!(table.remove_all(AssociationKind::ClusterCommand, Side::Left, "c1"), 2);
        assert_eq!(
            table.linked(AssociationKind::ClusterCommand, Side::Right, "cmd2"),
            vec!["c2"]
        );
    }
}
