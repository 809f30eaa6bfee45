use assert_cmd::Command;

fn bookshelf(config_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("bookshelf").unwrap();
    cmd.env("BOOKSHELF_CONFIG_DIR", config_dir)
        .env("BOOKSHELF_ENV", "local")
        .env("RUST_LOG", "error");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    let output = bookshelf(dir.path()).arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    for command in ["serve", "migrate", "config"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn migrate_applies_books_schema_once() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("books.db").display());

    let first = bookshelf(dir.path())
        .args(["--database-url", &url, "migrate"])
        .output()
        .unwrap();
    assert!(first.status.success());
    let stdout = String::from_utf8(first.stdout).unwrap();
    assert!(stdout.contains("applied 2 migration(s)"));
    assert!(stdout.contains("books/001_init"));

    let second = bookshelf(dir.path())
        .args(["--database-url", &url, "migrate"])
        .output()
        .unwrap();
    assert!(second.status.success());
    assert!(String::from_utf8(second.stdout)
        .unwrap()
        .contains("applied 0 migration(s)"));
}

#[test]
fn config_reads_environment_overlay() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("local.toml"), "[server]\nport = 9123\n").unwrap();

    let output = bookshelf(dir.path()).arg("config").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout).unwrap().contains("9123"));
}

#[test]
fn unknown_environment_fails() {
    let dir = tempfile::tempdir().unwrap();
    bookshelf(dir.path())
        .env("BOOKSHELF_ENV", "qa")
        .arg("config")
        .assert()
        .failure();
}
