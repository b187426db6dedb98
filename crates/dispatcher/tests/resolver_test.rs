#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fedexec_dispatcher::resolver::CriteriaResolver;
    use fedexec_dispatcher::selection::{ClusterSelector, FirstMatchSelector, RandomSelector};
    use fedexec_domain::entities::{ClusterStatus, CommandStatus};
    use fedexec_domain::tags::{tag_set, ClusterCriteria, Criterion};
    use fedexec_testing_utils::{
        ClusterBuilder, CommandBuilder, JobBuilder, MockRegistry,
    };

    fn criteria(tiers: &[&[&str]]) -> ClusterCriteria {
        ClusterCriteria::new(
            tiers
                .iter()
                .map(|t| Criterion::from_strs(t.iter().copied()).unwrap())
                .collect(),
        )
        .unwrap()
    }

    fn criterion(tags: &[&str]) -> Criterion {
        Criterion::from_strs(tags.iter().copied()).unwrap()
    }

    /// 集群 A {prod, hadoop} 上有命令 C1 {hive}
    fn hadoop_registry() -> MockRegistry {
        let registry = MockRegistry::new();
        registry.add_cluster(ClusterBuilder::new("A").with_tags(&["prod", "hadoop"]).build());
        registry.add_command(CommandBuilder::new("C1").with_tags(&["hive"]).build());
        registry.link("A", "C1");
        registry
    }

    fn resolver(registry: &MockRegistry) -> CriteriaResolver {
        CriteriaResolver::new(Arc::new(registry.clone()), Arc::new(registry.clone()))
    }

    #[tokio::test]
    async fn test_single_criterion_match() {
        let registry = hadoop_registry();
        let matches = resolver(&registry)
            .resolve(&criteria(&[&["prod", "hadoop"]]), &criterion(&["hive"]))
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].cluster.id, "A");
        let command_ids: Vec<&str> = matches[0].commands.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(command_ids, vec!["C1"]);
    }

    #[tokio::test]
    async fn test_falls_through_to_second_criterion() {
        let registry = hadoop_registry();
        let matches = resolver(&registry)
            .resolve(
                &criteria(&[&["prod", "spark"], &["prod", "hadoop"]]),
                &criterion(&["hive"]),
            )
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].cluster.id, "A");
        assert_eq!(
            registry.cluster_queries(),
            vec![
                tag_set(["prod", "spark"]).unwrap(),
                tag_set(["prod", "hadoop"]).unwrap()
            ]
        );
    }

    #[tokio::test]
    async fn test_first_matching_tier_wins() {
        let registry = hadoop_registry();
        registry.add_cluster(ClusterBuilder::new("B").with_tags(&["prod", "spark"]).build());
        registry.add_command(CommandBuilder::new("C2").with_tags(&["hive"]).build());
        registry.link("B", "C2");

        let matches = resolver(&registry)
            .resolve(
                &criteria(&[&["spark"], &["prod"]]),
                &criterion(&["hive"]),
            )
            .await
            .unwrap();

        // 第二层会同时命中 A 和 B，但第一层已经有结果
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].cluster.id, "B");
        assert_eq!(registry.cluster_queries().len(), 1);
    }

    #[tokio::test]
    async fn test_no_match_returns_empty() {
        let registry = hadoop_registry();
        let matches = resolver(&registry)
            .resolve(&criteria(&[&["gpu"]]), &criterion(&["hive"]))
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_inactive_resources_are_ignored() {
        let registry = MockRegistry::new();
        registry.add_cluster(
            ClusterBuilder::new("down")
                .with_tags(&["prod"])
                .with_status(ClusterStatus::OutOfService)
                .build(),
        );
        registry.add_cluster(ClusterBuilder::new("up").with_tags(&["prod"]).build());
        registry.add_command(
            CommandBuilder::new("old")
                .with_tags(&["hive"])
                .with_status(CommandStatus::Deprecated)
                .build(),
        );
        registry.add_command(CommandBuilder::new("new").with_tags(&["hive"]).build());
        registry.link("down", "new");
        registry.link("up", "old");

        let matches = resolver(&registry)
            .resolve(&criteria(&[&["prod"]]), &criterion(&["hive"]))
            .await
            .unwrap();
        assert!(matches.is_empty());

        registry.link("up", "new");
        let matches = resolver(&registry)
            .resolve(&criteria(&[&["prod"]]), &criterion(&["hive"]))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].cluster.id, "up");
        assert_eq!(matches[0].commands.len(), 1);
        assert_eq!(matches[0].commands[0].id, "new");
    }

    #[tokio::test]
    async fn test_cluster_addressable_by_system_tags() {
        let registry = hadoop_registry();
        let matches = resolver(&registry)
            .resolve(&criteria(&[&["id:A"]]), &criterion(&["name:C1-name"]))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_for_job_records_criterion() {
        let registry = hadoop_registry();
        let mut job = JobBuilder::new("job-1").build();
        let cluster_criteria = criteria(&[&["prod", "spark"], &["prod", "hadoop"]]);

        resolver(&registry)
            .resolve_for_job(&mut job, &cluster_criteria, &criterion(&["hive"]))
            .await
            .unwrap();
        assert_eq!(job.matched_criterion, Some(criterion(&["prod", "hadoop"])));
    }

    #[tokio::test]
    async fn test_selectors() {
        let registry = MockRegistry::new();
        for id in ["c1", "c2", "c3"] {
            registry.add_cluster(ClusterBuilder::new(id).with_tags(&["prod"]).build());
            registry.add_command(CommandBuilder::new(&format!("{id}-cmd")).with_tags(&["hive"]).build());
            registry.link(id, &format!("{id}-cmd"));
        }
        let matches = resolver(&registry)
            .resolve(&criteria(&[&["prod"]]), &criterion(&["hive"]))
            .await
            .unwrap();
        assert_eq!(matches.len(), 3);

        assert_eq!(FirstMatchSelector.select(&matches).unwrap().cluster.id, "c1");
        for _ in 0..20 {
            let picked = RandomSelector.select(&matches).unwrap();
            assert!(matches.iter().any(|m| m.cluster.id == picked.cluster.id));
        }
        assert!(RandomSelector.select(&[]).is_none());
        assert!(FirstMatchSelector.select(&[]).is_none());
    }
}
