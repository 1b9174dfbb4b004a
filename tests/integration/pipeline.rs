use crate::common::{TestProject, depends_on, read_trimmed, tool_archive};
use anyhow::Result;
use bz_cli::core::BzError;
use bz_cli::environment::{EnvironmentComposer, resolve_alias};
use bz_cli::lockfile::LockedConfigContent;
use bz_cli::resolver::{Collaborators, DependencyResolver};
use bz_cli::test_utils::ArchiveFixture;

#[tokio::test]
async fn test_resolve_compose_alias_exec() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("tool", "1.0.0", &tool_archive("hello", "echo \"$GREETING $*\" > \"$CURDIR/out.txt\""))?;
    project.publish("tool", "1.5.0", &tool_archive("hello", "echo \"$GREETING $*\" > \"$CURDIR/out.txt\""))?;
    project.publish("tool", "2.0.0", &tool_archive("hello", "exit 1"))?;
    project.write_config(
        r#"
deps = ["example.com/acme/tool@1"]

[env]
GREETING = "hi from $TOOL_DIR"

[alias]
greet = "hello --loud"
"#,
    )?;

    let context = project.context();
    let collaborators = Collaborators::from_context(&context)?;
    let tree = DependencyResolver::new(&context, &collaborators).resolve_project(&project.project).await?;

    assert_eq!(tree.sub.len(), 1);
    assert_eq!(tree.sub[0].coord.to_string(), "example.com/acme/tool@1.5.0");
    assert_eq!(tree.sub[0].dir, project.installed_dir("tool", "1.5.0"));

    let runtime = EnvironmentComposer::new(collaborators.triggers.as_ref(), &project.project)
        .with_curdir(&project.project)
        .compose(&tree)
        .await?;
    let argv = resolve_alias(&tree, &runtime.env, &["greet".to_string(), "world".to_string()])?;
    assert_eq!(argv, vec!["hello", "--loud", "world"]);

    let code = bz_cli::exec::run(&argv, &runtime, &project.project).await?;
    assert_eq!(code, 0);
    assert_eq!(
        read_trimmed(&project.project.join("out.txt")),
        format!("hi from {} --loud world", tree.sub[0].dir.display())
    );
    Ok(())
}

#[tokio::test]
async fn test_lock_pins_versions_across_new_releases() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("tool", "1.0.0", &tool_archive("tool", "exit 0"))?;
    project.write_config("deps = [\"example.com/acme/tool\"]\n")?;

    let context = project.context();
    let collaborators = Collaborators::from_context(&context)?;
    let resolver = DependencyResolver::new(&context, &collaborators);

    let first = resolver.resolve_project(&project.project).await?;
    assert_eq!(first.sub[0].coord.to_string(), "example.com/acme/tool@1.0.0");
    assert!(project.read_lock()?.contains("example.com"));

    // A newer release appears; the lock is newer than the config, so it wins
    project.publish("tool", "1.1.0", &tool_archive("tool", "exit 0"))?;
    let second = resolver.resolve_project(&project.project).await?;
    assert_eq!(second, first);
    Ok(())
}

#[tokio::test]
async fn test_transitive_tgz_dependency() -> Result<()> {
    let project = TestProject::new()?;
    project.publish(
        "app",
        "1.0.0",
        &ArchiveFixture::new()
            .lock(&depends_on(&[("runtime", "3.1.0")]))
            .executable("bin/app", "#!/bin/sh\n\"$RUNTIME_BINDIR/rt\"\n"),
    )?;
    project.publish_tgz(
        "runtime",
        "3.1.0",
        &ArchiveFixture::new()
            .lock(&LockedConfigContent::default())
            .executable("bin/rt", "#!/bin/sh\nexit 5\n"),
    )?;
    project.write_config("deps = [\"example.com/acme/app@1.0.0\"]\n")?;

    let context = project.context();
    let collaborators = Collaborators::from_context(&context)?;
    let tree = DependencyResolver::new(&context, &collaborators).resolve_project(&project.project).await?;

    let rendered = tree.render_tree();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(
        lines,
        vec![
            project.project.display().to_string().as_str(),
            "  example.com/acme/app@1.0.0",
            "    example.com/acme/runtime@3.1.0",
        ]
    );

    let runtime = EnvironmentComposer::new(collaborators.triggers.as_ref(), &project.project)
        .compose(&tree)
        .await?;
    let runtime_bin = project.installed_dir("runtime", "3.1.0").join("bin");
    assert_eq!(runtime.env["RUNTIME_BINDIR"], runtime_bin.display().to_string());
    assert_eq!(runtime.path[0], project.project.join("bin").display().to_string());
    assert_eq!(runtime.path[2], runtime_bin.display().to_string());

    let code = bz_cli::exec::run(&["app".to_string()], &runtime, &project.project).await?;
    assert_eq!(code, 5);

    // Only the project's direct dependency is recorded in its lock
    let lock = LockedConfigContent::load(&project.lock_file()).await?;
    assert_eq!(lock.deps.len(), 1);
    assert_eq!(lock.deps[0].repo, "app");
    Ok(())
}

#[tokio::test]
async fn test_cycle_between_releases() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("a", "1.0.0", &ArchiveFixture::new().lock(&depends_on(&[("b", "1.0.0")])))?;
    project.publish("b", "1.0.0", &ArchiveFixture::new().lock(&depends_on(&[("a", "2.0.0")])))?;
    project.publish("a", "2.0.0", &ArchiveFixture::new().lock(&LockedConfigContent::default()))?;
    project.write_config("deps = [\"example.com/acme/a@1\"]\n")?;

    let context = project.context();
    let collaborators = Collaborators::from_context(&context)?;
    let err = DependencyResolver::new(&context, &collaborators)
        .resolve_project(&project.project)
        .await
        .unwrap_err();

    match err.downcast_ref::<BzError>() {
        Some(BzError::CircularDependency {
            chain,
        }) => assert_eq!(chain, "example.com/acme/a->example.com/acme/b->example.com/acme/a"),
        other => panic!("expected a cycle, got {other:?}: {err:#}"),
    }
    assert!(!project.lock_file().exists());
    Ok(())
}

#[tokio::test]
async fn test_triggers_run_from_dependency_dir() -> Result<()> {
    let project = TestProject::new()?;
    let triggers = LockedConfigContent {
        triggers: bz_cli::config::Triggers {
            install_script: Some("echo done > installed.txt".to_string()),
            pre_run_script: Some("cat > /dev/null && cat replacement.json".to_string()),
        },
        ..Default::default()
    };
    project.publish(
        "tool",
        "1.0.0",
        &ArchiveFixture::new()
            .lock(&triggers)
            .file("replacement.json", r#"{"path": ["/opt/custom/bin"], "env": {"FROM_TRIGGER": "yes"}}"#),
    )?;
    project.write_config("deps = [\"example.com/acme/tool\"]\n")?;

    let context = project.context();
    let collaborators = Collaborators::from_context(&context)?;
    let resolver = DependencyResolver::new(&context, &collaborators);
    let tree = resolver.resolve_project(&project.project).await?;

    let marker = tree.sub[0].dir.join("installed.txt");
    assert_eq!(read_trimmed(&marker), "done");

    // Installed dependencies are not set up again
    std::fs::remove_file(&marker)?;
    resolver.resolve_project(&project.project).await?;
    assert!(!marker.exists());

    let runtime = EnvironmentComposer::new(collaborators.triggers.as_ref(), &project.project)
        .with_base_path(None)
        .compose(&tree)
        .await?;
    assert_eq!(runtime.env.get("FROM_TRIGGER").map(String::as_str), Some("yes"));
    assert!(!runtime.env.contains_key("TOOL_DIR"));
    assert_eq!(runtime.path, vec![project.project.join("bin").display().to_string(), "/opt/custom/bin".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_traversal_archive_is_rejected_and_cleaned_up() -> Result<()> {
    let project = TestProject::new()?;
    let release = project.mirror.join("example.com/acme/evil/v1.0.0/evil.tgz");
    bz_cli::test_utils::raw_tgz(&release, &[(".bz.lock", b"{}".as_slice()), ("../../escape.txt", b"owned".as_slice())])?;
    project.write_config("deps = [\"example.com/acme/evil\"]\n")?;

    let context = project.context();
    let collaborators = Collaborators::from_context(&context)?;
    let err = DependencyResolver::new(&context, &collaborators)
        .resolve_project(&project.project)
        .await
        .unwrap_err();

    assert!(
        matches!(err.downcast_ref::<BzError>(), Some(BzError::UnsafeArchiveEntry { .. })),
        "unexpected error: {err:#}"
    );
    let extracted = project.installed_dir("evil", "1.0.0");
    assert!(!extracted.exists());
    assert!(!extracted.join("../../escape.txt").exists());
    Ok(())
}
