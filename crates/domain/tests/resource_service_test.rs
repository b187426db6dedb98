#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fedexec_core::ErrorKind;
    use fedexec_domain::entities::{ClusterStatus, CommandStatus};
    use fedexec_domain::services::ResourceService;
    use fedexec_domain::tags::tag_set;
    use fedexec_testing_utils::{ApplicationBuilder, ClusterBuilder, CommandBuilder, MockRegistry};

    fn service(registry: &MockRegistry) -> ResourceService {
        ResourceService::new(
            Arc::new(registry.clone()),
            Arc::new(registry.clone()),
            Arc::new(registry.clone()),
            Arc::new(registry.clone()),
        )
    }

    #[tokio::test]
    async fn test_create_cluster_adds_system_tags() {
        let registry = MockRegistry::new();
        let cluster = service(&registry)
            .create_cluster(
                ClusterBuilder::new("c1")
                    .with_name("alpha")
                    .with_tags(&["prod"])
                    .build_raw(),
            )
            .await
            .unwrap();

        assert_eq!(cluster.tags, tag_set(["prod", "id:c1", "name:alpha"]).unwrap());
        assert_eq!(cluster.audit.version, 0);
        assert_eq!(registry.cluster_count(), 1);
    }

    #[tokio::test]
    async fn test_create_assigns_id_when_blank() {
        let registry = MockRegistry::new();
        let cluster = service(&registry)
            .create_cluster(ClusterBuilder::new("").with_name("alpha").build_raw())
            .await
            .unwrap();
        assert!(!cluster.id.is_empty());
        assert!(cluster
            .tags
            .contains(&fedexec_domain::tags::Tag::id_tag(&cluster.id).unwrap()));
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let registry = MockRegistry::new();
        let svc = service(&registry);
        svc.create_cluster(ClusterBuilder::new("c1").build_raw())
            .await
            .unwrap();
        let err = svc
            .create_cluster(ClusterBuilder::new("c1").build_raw())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_user_system_tags_rejected() {
        let registry = MockRegistry::new();
        let err = service(&registry)
            .create_command(CommandBuilder::new("cmd").with_tags(&["name:fake"]).build_raw())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    }

    #[tokio::test]
    async fn test_rename_replaces_name_tag() {
        let registry = MockRegistry::new();
        let svc = service(&registry);
        svc.create_cluster(
            ClusterBuilder::new("c1")
                .with_name("alpha")
                .with_tags(&["prod"])
                .build_raw(),
        )
        .await
        .unwrap();

        let renamed = svc.rename_cluster("c1", "beta").await.unwrap();
        assert_eq!(renamed.name, "beta");
        assert_eq!(renamed.tags, tag_set(["prod", "id:c1", "name:beta"]).unwrap());
        assert_eq!(renamed.audit.version, 1);
        assert_eq!(svc.get_cluster("c1").await.unwrap(), renamed);
    }

    #[tokio::test]
    async fn test_retag_keeps_system_tags() {
        let registry = MockRegistry::new();
        let svc = service(&registry);
        svc.create_command(CommandBuilder::new("cmd").with_name("hive").with_tags(&["sql"]).build_raw())
            .await
            .unwrap();

        let command = svc
            .retag_command("cmd", tag_set(["etl", "batch"]).unwrap())
            .await
            .unwrap();
        assert_eq!(
            command.tags,
            tag_set(["etl", "batch", "id:cmd", "name:hive"]).unwrap()
        );
    }

    #[tokio::test]
    async fn test_status_change_and_missing_resource() {
        let registry = MockRegistry::new();
        let svc = service(&registry);
        svc.create_cluster(ClusterBuilder::new("c1").build_raw())
            .await
            .unwrap();

        let cluster = svc
            .set_cluster_status("c1", ClusterStatus::OutOfService)
            .await
            .unwrap();
        assert_eq!(cluster.status, ClusterStatus::OutOfService);

        let err = svc
            .set_command_status("nope", CommandStatus::Inactive)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_link_and_unlink() {
        let registry = MockRegistry::new();
        let svc = service(&registry);
        svc.create_cluster(ClusterBuilder::new("c1").build_raw()).await.unwrap();
        svc.create_command(CommandBuilder::new("cmd").build_raw()).await.unwrap();
        svc.create_application(ApplicationBuilder::new("app").build_raw())
            .await
            .unwrap();

        assert!(svc.set_cluster_command_link("c1", "cmd", true).await.unwrap());
        assert!(!svc.set_cluster_command_link("c1", "cmd", true).await.unwrap());
        assert!(svc
            .set_command_application_link("cmd", "app", true)
            .await
            .unwrap());

        assert_eq!(svc.commands_of_cluster("c1").await.unwrap(), vec!["cmd"]);
        assert_eq!(svc.clusters_of_command("cmd").await.unwrap(), vec!["c1"]);
        assert_eq!(svc.applications_of_command("cmd").await.unwrap(), vec!["app"]);

        assert!(svc.set_cluster_command_link("c1", "cmd", false).await.unwrap());
        assert!(svc.commands_of_cluster("c1").await.unwrap().is_empty());

        let err = svc
            .set_cluster_command_link("c1", "missing", true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_removes_links() {
        let registry = MockRegistry::new();
        let svc = service(&registry);
        svc.create_cluster(ClusterBuilder::new("c1").build_raw()).await.unwrap();
        svc.create_command(CommandBuilder::new("cmd").build_raw()).await.unwrap();
        svc.set_cluster_command_link("c1", "cmd", true).await.unwrap();

        svc.delete_command("cmd").await.unwrap();
        assert!(svc.commands_of_cluster("c1").await.unwrap().is_empty());

        let err = svc.delete_command("cmd").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
