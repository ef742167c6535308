use assert_cmd::cargo::cargo_bin_cmd;

#[test]
fn help_mentions_scan_options() {
    let mut cmd = cargo_bin_cmd!("rediscan");
    let output = cmd
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    for flag in [
        "--cmd",
        "--url",
        "--match",
        "--key-regexp",
        "--value-regexp",
        "--ignore-value",
        "--round",
        "--limit",
        "--ttl-gte",
        "--ttl-lte",
        "--wait",
    ] {
        assert!(text.contains(flag), "help missing {flag}");
    }
}

#[test]
fn invalid_key_regexp_exits_before_connecting() {
    let mut cmd = cargo_bin_cmd!("rediscan");
    cmd.env_remove("RUST_LOG")
        .arg("--url")
        .arg("redis://127.0.0.1:1/0")
        .arg("--key-regexp")
        .arg("(unclosed")
        .assert()
        .code(2);
}

#[test]
fn inverted_ttl_range_is_a_configuration_error() {
    let mut cmd = cargo_bin_cmd!("rediscan");
    cmd.arg("--url")
        .arg("redis://127.0.0.1:1/0")
        .arg("--ttl-gte")
        .arg("1h")
        .arg("--ttl-lte")
        .arg("1m")
        .assert()
        .code(2);
}

#[test]
fn unknown_action_is_rejected_by_the_parser() {
    let mut cmd = cargo_bin_cmd!("rediscan");
    cmd.arg("--cmd").arg("flush").assert().failure();
}
