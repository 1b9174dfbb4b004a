use crate::common::{TestProject, tool_archive};
use anyhow::Result;
use predicates::prelude::*;

fn project_with_tool(script: &str) -> Result<TestProject> {
    let project = TestProject::new()?;
    project.publish("tool", "1.0.0", &tool_archive("hello", script))?;
    project.write_config(
        r#"
deps = ["example.com/acme/tool"]

[env]
GREETING = "hello"

[alias]
greet = "hello --loud"
"#,
    )?;
    Ok(project)
}

#[test]
fn test_no_command_resolves_and_writes_lock() -> Result<()> {
    let project = project_with_tool("exit 0")?;

    project.bz().assert().success().stdout("");

    let lock = project.read_lock()?;
    assert!(lock.contains("example.com"), "lock file: {lock}");
    assert!(lock.contains("tool"), "lock file: {lock}");
    assert!(project.installed_dir("tool", "1.0.0").join("bin/hello").exists());
    Ok(())
}

#[test]
fn test_print_tree() -> Result<()> {
    let project = project_with_tool("exit 0")?;

    let expected = format!("{}\n  example.com/acme/tool@1.0.0\n", project.project.display());
    project.bz().arg("--print-tree").assert().success().stdout(expected);
    Ok(())
}

#[test]
fn test_print_env_is_sorted() -> Result<()> {
    let project = project_with_tool("exit 0")?;

    let output = project.bz().arg("--print-env").output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;

    let keys: Vec<&str> = stdout.lines().filter_map(|l| l.split_once('=')).map(|(k, _)| k).collect();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(keys, sorted);

    let dir = project.installed_dir("tool", "1.0.0");
    assert!(stdout.contains(&format!("TOOL_DIR={}\n", dir.display())), "{stdout}");
    assert!(stdout.contains(&format!("BZ_PROJECT_DIR={}\n", project.project.display())), "{stdout}");
    assert!(stdout.contains("GREETING=hello\n"), "{stdout}");
    Ok(())
}

#[test]
fn test_exit_code_is_passed_through() -> Result<()> {
    let project = project_with_tool("exit 42")?;

    project.bz().arg("hello").assert().code(42);
    Ok(())
}

#[test]
fn test_alias_with_extra_args() -> Result<()> {
    let project = project_with_tool("echo \"$GREETING: $*\"")?;

    project.bz().args(["greet", "-x", "world"]).assert().success().stdout("hello: --loud -x world\n");
    Ok(())
}

#[test]
fn test_dir_option_from_elsewhere() -> Result<()> {
    let project = project_with_tool("pwd")?;
    let nested = project.project.join("sub/dir");
    std::fs::create_dir_all(&nested)?;

    project
        .bz()
        .current_dir(&project.home)
        .arg("-C")
        .arg(&nested)
        .arg("hello")
        .assert()
        .success()
        .stdout(format!("{}\n", nested.display()));

    // The project root was found by walking up from the nested directory
    assert!(project.lock_file().exists());
    Ok(())
}

#[test]
fn test_unknown_command() -> Result<()> {
    let project = project_with_tool("exit 0")?;

    project
        .bz()
        .arg("no-such-tool-anywhere")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Command not found: no-such-tool-anywhere"));
    Ok(())
}

#[test]
fn test_unresolvable_dependency() -> Result<()> {
    let project = TestProject::new()?;
    project.write_config("deps = [\"example.com/acme/missing@1.0\"]\n")?;

    project
        .bz()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unable to resolve dependency 'example.com/acme/missing@1.0'"));
    assert!(!project.lock_file().exists());
    Ok(())
}

#[test]
fn test_invalid_config() -> Result<()> {
    let project = TestProject::new()?;
    project.write_config("deps = [\n")?;

    project.bz().assert().code(1).stderr(predicate::str::contains("Invalid config file"));
    Ok(())
}
