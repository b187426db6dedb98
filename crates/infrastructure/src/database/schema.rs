/// 建表语句，按顺序执行，可重复执行
pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS clusters (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        user_name TEXT NOT NULL,
        version TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '[]',
        config_files TEXT NOT NULL DEFAULT '[]',
        dependency_files TEXT NOT NULL DEFAULT '[]',
        created INTEGER NOT NULL,
        updated INTEGER NOT NULL,
        entity_version INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS commands (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        user_name TEXT NOT NULL,
        version TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL,
        executable TEXT NOT NULL,
        check_delay_ms INTEGER NOT NULL,
        tags TEXT NOT NULL DEFAULT '[]',
        config_files TEXT NOT NULL DEFAULT '[]',
        dependency_files TEXT NOT NULL DEFAULT '[]',
        created INTEGER NOT NULL,
        updated INTEGER NOT NULL,
        entity_version INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS applications (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        user_name TEXT NOT NULL,
        version TEXT NOT NULL,
        status TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '[]',
        config_files TEXT NOT NULL DEFAULT '[]',
        dependency_files TEXT NOT NULL DEFAULT '[]',
        created INTEGER NOT NULL,
        updated INTEGER NOT NULL,
        entity_version INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cluster_commands (
        cluster_id TEXT NOT NULL,
        command_id TEXT NOT NULL,
        PRIMARY KEY (cluster_id, command_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_cluster_commands_command ON cluster_commands(command_id)",
    r#"
    CREATE TABLE IF NOT EXISTS command_applications (
        command_id TEXT NOT NULL,
        application_id TEXT NOT NULL,
        PRIMARY KEY (command_id, application_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_command_applications_application ON command_applications(application_id)",
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        user_name TEXT NOT NULL,
        version TEXT NOT NULL,
        description TEXT,
        command_args TEXT NOT NULL DEFAULT '[]',
        tags TEXT NOT NULL DEFAULT '[]',
        status TEXT NOT NULL,
        status_msg TEXT NOT NULL DEFAULT '',
        started INTEGER,
        finished INTEGER,
        host_name TEXT NOT NULL DEFAULT '',
        kill_uri TEXT NOT NULL DEFAULT '',
        output_uri TEXT NOT NULL DEFAULT '',
        archive_location TEXT,
        process_handle INTEGER NOT NULL DEFAULT -1,
        exit_code INTEGER,
        cluster_id TEXT,
        cluster_name TEXT,
        command_id TEXT,
        command_name TEXT,
        matched_criterion TEXT,
        disable_log_archival INTEGER NOT NULL DEFAULT 0,
        forwarded INTEGER NOT NULL DEFAULT 0,
        created INTEGER NOT NULL,
        updated INTEGER NOT NULL,
        entity_version INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_jobs_status_updated ON jobs(status, updated)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_host_status ON jobs(host_name, status)",
];

/// 非终态作业状态，供 SQL 过滤使用
pub const ACTIVE_JOB_STATUSES: &str = "('INIT', 'RUNNING')";
