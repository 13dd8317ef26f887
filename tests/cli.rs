use assert_cmd::Command;

#[test]
fn help_lists_serve_subcommand() {
    let output = Command::cargo_bin("typometer")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("--no-mirror"));
}

#[test]
fn client_refuses_non_tty_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::cargo_bin("typometer")
        .unwrap()
        .args(["-p", "hi", "--no-mirror", "--log-file"])
        .arg(dir.path().join("progress.csv"))
        .write_stdin("hi")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("stdin must be a tty"));
    // nothing was written
    assert!(!dir.path().join("progress.csv").exists());
}
