#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CmdResult {
    /// Parse stdout as a single JSON document.
    pub fn json(&self) -> Value {
        serde_json::from_str(self.stdout.trim()).unwrap_or_else(|e| {
            panic!(
                "stdout is not JSON ({e}): {:?}; log: {}",
                self.stdout,
                self.log_path.display()
            )
        })
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Some(path) = option_env!("CARGO_BIN_EXE_dashpanel") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) {
        "dashpanel.exe"
    } else {
        "dashpanel"
    };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve dashpanel binary path for integration test"),
    }
}

/// Run the CLI with a scrubbed environment and keep a per-case log.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let root = std::env::temp_dir().join("dashpanel-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command.args(args).env("RUST_BACKTRACE", "1");
    for (key, _) in std::env::vars() {
        if key.starts_with("DASHPANEL_") {
            command.env_remove(key);
        }
    }
    let output = command.output().expect("execute dashpanel command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Write `(event, payload)` pairs as a JSON-lines frame file.
pub fn write_frames(dir: &Path, frames: &[(&str, Value)]) -> PathBuf {
    let path = dir.join("frames.jsonl");
    let body: String = frames
        .iter()
        .map(|(event, payload)| format!("{}\n", json!({"event": event, "payload": payload})))
        .collect();
    fs::write(&path, body).expect("write frames file");
    path
}

/// Config whose storage file and journal live inside `dir`, so replay never
/// touches the user's data directory.
pub fn isolated_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.toml");
    let toml = |p: PathBuf| p.display().to_string().replace('\\', "/");
    let body = format!(
        "[storage]\nfile = \"{}\"\n\n[paths]\njournal = \"{}\"\n",
        toml(dir.join("storage.json")),
        toml(dir.join("activity.jsonl")),
    );
    fs::write(&path, body).expect("write config file");
    path
}
