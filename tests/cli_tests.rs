//! CLI integration tests

use std::path::Path;
use std::process::Command;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chatstream_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_chatstream"))
}

/// Binary with config and keys isolated under `home`
fn isolated_bin(home: &Path) -> Command {
    let mut cmd = chatstream_bin();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("CHATSTREAM_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_output() {
    let output = chatstream_bin()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("OpenAI-compatible"));
    assert!(stdout.contains("--model"));
    assert!(stdout.contains("--proxy"));
    assert!(stdout.contains("config"));
    assert!(stdout.contains("models"));
}

#[test]
fn version_output() {
    let output = chatstream_bin()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("chatstream"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn config_path_command() {
    let home = tempfile::tempdir().unwrap();
    let output = isolated_bin(home.path())
        .args(["config", "path"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("chatstream"));
    assert!(stdout.contains("config.toml"));
}

#[test]
fn config_help() {
    let output = chatstream_bin()
        .args(["config", "--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("init"));
    assert!(stdout.contains("set"));
    assert!(stdout.contains("get"));
    assert!(stdout.contains("list"));
    assert!(stdout.contains("path"));
}

#[test]
fn config_set_then_get() {
    let home = tempfile::tempdir().unwrap();

    let output = isolated_bin(home.path())
        .args(["config", "set", "max_retries", "5"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let output = isolated_bin(home.path())
        .args(["config", "get", "max_retries"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "5");
}

#[test]
fn config_list_masks_api_key() {
    let home = tempfile::tempdir().unwrap();

    let output = isolated_bin(home.path())
        .args(["config", "set", "api_key", "sk-secret-value-1234"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let output = isolated_bin(home.path())
        .args(["config", "list"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sk-s...1234"));
    assert!(!stdout.contains("secret-value"));
}

#[test]
fn models_add_list_use() {
    let home = tempfile::tempdir().unwrap();

    let output = isolated_bin(home.path())
        .args([
            "models",
            "add",
            "local",
            "--base-url",
            "http://localhost:11434",
            "--model",
            "llama3",
        ])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let output = isolated_bin(home.path())
        .args(["models", "list"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("local"));
    assert!(stdout.contains("http://localhost:11434/v1/chat/completions"));
    assert!(stdout.contains("gpt-4o"));

    let output = isolated_bin(home.path())
        .args(["models", "use", "gpt-4o"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let output = isolated_bin(home.path())
        .args(["config", "get", "current_model"])
        .output()
        .expect("Failed to execute command");
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "gpt-4o");
}

#[tokio::test(flavor = "multi_thread")]
async fn oneshot_streams_reply_to_stdout() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"there\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-from-env"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let config_dir = home.path().join("chatstream");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        format!(
            "current_model = \"mock\"\n\n[[models]]\nname = \"mock\"\nmodel = \"mock-model\"\nurl = \"{}/v1/chat/completions\"\n",
            server.uri()
        ),
    )
    .unwrap();

    let home_path = home.path().to_path_buf();
    let output = tokio::task::spawn_blocking(move || {
        isolated_bin(&home_path)
            .env("CHATSTREAM_API_KEY", "sk-from-env")
            .arg("hello")
            .output()
            .expect("Failed to execute command")
    })
    .await
    .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Hi there");
}
