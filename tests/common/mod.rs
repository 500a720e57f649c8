#![allow(dead_code)]

use assert_cmd::cargo_bin;
use serde_json::{Value, json};
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

const CONFIG_ENV: [&str; 9] = [
    "MQ_CONNECTION",
    "MQ_QMGR",
    "APP_USER",
    "APP_PASSWORD",
    "QUEUE_NAME",
    "REPLY_QUEUE_NAME",
    "MQ_MAX_RETRIES",
    "MQ_WAIT_INTERVAL_MS",
    "RESPONDER_INSTANCE",
];

/// One seed line: a request body with an optional reply queue and hex correlation id.
pub fn request_line(body: Value, reply_to: Option<&str>, correlation_id: Option<&str>) -> String {
    let mut line = json!({ "body": body });
    if let Some(queue) = reply_to {
        line["reply_to"] = json!(queue);
    }
    if let Some(id) = correlation_id {
        line["correlation_id"] = json!(id);
    }
    line.to_string()
}

pub fn write_requests(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
    file
}

/// The responder binary with a clean environment and a short idle budget.
pub fn responder_command() -> Command {
    let mut cmd = Command::new(cargo_bin!("mq-responder"));
    for var in CONFIG_ENV {
        cmd.env_remove(var);
    }
    cmd.env("RUST_LOG", "info")
        .args(["--max-retries", "2", "--wait-interval-ms", "10"]);
    cmd
}

/// Parses the JSON lines the binary prints for delivered replies.
pub fn reply_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
