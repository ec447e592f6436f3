use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
    work: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");
        let work = base.join("work");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");
        fs::create_dir_all(&work).expect("failed to create work dir");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_config,
            xdg_state,
            work,
        }
    }

    fn write_config(&self, content: &str) {
        let dir = self.xdg_config.join("satisbot");
        fs::create_dir_all(&dir).expect("failed to create config dir");
        fs::write(dir.join("config.toml"), content).expect("failed to write config");
    }

    fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.work.join(name);
        fs::write(&path, content).expect("failed to write file");
        path
    }
}

fn log_fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../satisbot-core/tests/fixtures/FactoryGame.log")
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("satisbot"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("SATISBOT_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute satisbot: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "satisbot {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

const HISTORY: &str = r#"[
  {"id": "m0", "authorIsSelf": true,  "createdAt": "2024-06-01T01:00:00Z"},
  {"id": "m1", "authorIsSelf": true,  "createdAt": "2024-05-31T00:00:00Z"},
  {"id": "u1", "authorIsSelf": false, "createdAt": "2024-01-01T00:00:00Z"},
  {"id": "m2", "authorIsSelf": true,  "createdAt": "2024-05-20T00:00:00Z"},
  {"id": "m3", "authorIsSelf": true,  "createdAt": "2024-04-01T00:00:00Z"}
]"#;

#[test]
fn parse_prints_one_json_event_per_recognized_line() {
    let env = CliTestEnv::new();
    let fixture = log_fixture();
    let args = ["parse", fixture.to_str().expect("fixture path is UTF-8")];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect();
    assert_eq!(events.len(), 8);
    assert_eq!(events[0]["type"], "Log file open");
    assert_eq!(events[2]["type"], "Login request");
    assert_eq!(events[2]["name"], "Pioneer");
    assert_eq!(events[2]["userId"], "EOS:0002a1b2c3d4");
    assert_eq!(events[7]["type"], "Connection close");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Warning: Line 9:"),
        "expected malformed line warning, got:\n{stderr}"
    );
}

#[test]
fn purge_plan_selects_by_count_and_age() {
    let env = CliTestEnv::new();
    let history = env.write_file("history.json", HISTORY);
    let history = history.to_str().expect("history path is UTF-8");

    let args = [
        "purge-plan",
        "--history",
        history,
        "--now",
        "2024-06-01T02:00:00Z",
        "--after-lines",
        "3",
        "--after-days",
        "7",
    ];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let selected: Vec<&str> = stdout.lines().collect();
    assert_eq!(selected, vec!["m2", "m3"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("2 of 5 messages selected"));
}

#[test]
fn purge_plan_uses_config_policy() {
    let env = CliTestEnv::new();
    env.write_config(
        r#"
[purge]
channel_name = "server-status"
after_lines = 1
"#,
    );
    let history = env.write_file("history.json", HISTORY);
    let history = history.to_str().expect("history path is UTF-8");

    let args = ["purge-plan", "--history", history, "--now", "2024-06-01T02:00:00Z"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["m1", "m2", "m3"]);
}

#[test]
fn purge_plan_with_purging_disabled_selects_nothing() {
    let env = CliTestEnv::new();
    let history = env.write_file("history.json", HISTORY);
    let history = history.to_str().expect("history path is UTF-8");

    let args = [
        "purge-plan",
        "--history",
        history,
        "--after-lines",
        "-1",
        "--after-days",
        "-1",
    ];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);
    assert!(output.stdout.is_empty());
}

#[test]
fn next_purge_follows_configured_hour() {
    let env = CliTestEnv::new();
    let config = env.write_file(
        "custom.toml",
        r#"
[purge]
channel_name = "server-status"
after_days = 30
hour = 4
"#,
    );
    let config = config.to_str().expect("config path is UTF-8");

    let args = ["--config", config, "next-purge", "--now", "2024-06-01T22:15:00Z"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "2024-06-02T04:00:00+00:00");
    assert!(output.stderr.is_empty());
}

#[test]
fn invalid_config_is_rejected() {
    let env = CliTestEnv::new();
    env.write_config("[purge]\nhour = 30\n");

    let output = run_bin(&env, &["next-purge"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("purge.hour"),
        "expected validation error, got:\n{stderr}"
    );
}

#[test]
fn watch_without_log_location_fails() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, &["watch"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no log file to watch"));
}
