use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gridchat() -> Command {
    let mut cmd = Command::cargo_bin("gridchat").unwrap();
    // Keep a developer's real credentials and .env overrides out of the tests.
    cmd.current_dir(std::env::temp_dir())
        .env_remove("GEMINI_API_KEY")
        .env_remove("GEMINI_MODEL")
        .env_remove("GEMINI_API_BASE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    gridchat()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: gridchat [OPTIONS] <COMMAND>"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("--api-key"))
        .stdout(predicate::str::contains("GEMINI_MODEL"))
        .stdout(predicate::str::contains("GEMINI_API_BASE"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_cli_serve_help() {
    gridchat()
        .arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: gridchat serve"))
        .stdout(predicate::str::contains("--port <PORT>"))
        .stdout(predicate::str::contains("[default: 8501]"))
        .stdout(predicate::str::contains("--templates-dir"))
        .stdout(predicate::str::contains("--session-idle-secs"))
        .stdout(predicate::str::contains("[default: 1800]"));
}

#[test]
fn test_cli_ask_help() {
    gridchat()
        .arg("ask")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: gridchat ask [OPTIONS] <QUESTION>"));
}

#[test]
fn test_cli_no_command() {
    // Running without a command should show help/usage
    gridchat()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: gridchat [OPTIONS] <COMMAND>"));
}

#[test]
fn test_cli_missing_api_key_fails_fast() {
    gridchat()
        .args(["ask", "What is a smart meter?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY is not set"))
        .stdout(predicate::str::contains("You asked").not());
}

#[test]
fn test_cli_invalid_api_base() {
    gridchat()
        .args(["--api-key", "k", "--api-base", "not a url", "ask", "q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid Gemini API base URL"));
}

#[tokio::test]
async fn test_cli_ask_prints_answer_and_chart() {
    let server = MockServer::start().await;
    let reply = json!({
        "explanation": "Peak load balancing involves...",
        "data": [10, 20, 30],
        "labels": ["Morning", "Afternoon", "Evening"]
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": reply}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let assert = tokio::task::spawn_blocking(move || {
        gridchat()
            .env("GEMINI_API_KEY", "test-key")
            .args(["--model", "gemini-test", "--api-base", uri.as_str()])
            .args(["ask", "What is peak load balancing?"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("You asked: What is peak load balancing?"))
        .stdout(predicate::str::contains("Response: Peak load balancing involves..."))
        .stdout(predicate::str::contains("Smart Grid Metrics"))
        .stdout(predicate::str::contains("Afternoon |"));
}

#[tokio::test]
async fn test_cli_ask_reports_unreadable_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Sorry, I cannot help."}]}}]
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let assert = tokio::task::spawn_blocking(move || {
        gridchat()
            .env("GEMINI_API_KEY", "test-key")
            .args(["--api-base", uri.as_str(), "ask", "Explain smart meters"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .failure()
        .stderr(predicate::str::contains("could not read"));
}

#[tokio::test]
async fn test_cli_reads_model_and_api_base_from_env() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-from-env:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"explanation\": \"Feeders carry power.\"}"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let assert = tokio::task::spawn_blocking(move || {
        gridchat()
            .env("GEMINI_API_KEY", "test-key")
            .env("GEMINI_MODEL", "gemini-from-env")
            .env("GEMINI_API_BASE", uri)
            .args(["ask", "What is a feeder?"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("Response: Feeders carry power."));
}
