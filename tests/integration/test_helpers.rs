//! Fake search tools for process-level tests.
//!
//! Each fake tool is a `/bin/sh` script written into a temp directory. The
//! placeholder `@LOG@` in a script body is replaced with the path of a log
//! file the script can append received lines to.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use issue_search::tool::runner::SessionConfig;
use issue_search::tool::spawner::SpawnConfig;
use issue_search::SearchClient;

/// `initialize` result written by well-behaved fake tools.
pub const INIT_RESPONSE: &str = r#"{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2025-06-18","capabilities":{"tools":{}},"serverInfo":{"name":"fake-tool","version":"0.0.1"}}}"#;

/// Payload from the reference example: two records, the second sparse.
pub const SAMPLE_PAYLOAD: &str = "## Fix crash on startup\n- URL: https://github.com/org/repo/issues/1\n- Repository: org/repo\n- Type: issue\n- State: open\n- Author: alice\n- Created at: 2024-01-01\n---\n## Add dark mode\n- URL: https://github.com/org/repo/pull/2\n- Type: pull_request\n- State: merged";

/// A fake tool script on disk.
pub struct FakeTool {
    /// Keeps the directory alive for the duration of the test.
    pub dir: TempDir,
    /// Path of the executable script.
    pub path: PathBuf,
    /// File the script appends to via `@LOG@`.
    pub log: PathBuf,
}

impl FakeTool {
    /// Write `body` as an executable shell script.
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fake-tool");
        let log = dir.path().join("received.log");

        let script = format!(
            "#!/bin/sh\n{}\n",
            body.replace("@LOG@", &shell_quote(&log.display().to_string()))
        );
        std::fs::write(&path, script).expect("write script");
        let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");

        Self { dir, path, log }
    }

    /// Script that completes the handshake and answers the search call with
    /// `payload`, logging every received line.
    pub fn answering(payload: &str) -> Self {
        Self::new(&format!(
            r#"printf 'ARGS %s\n' "$*" >> @LOG@
read -r line; printf '%s\n' "$line" >> @LOG@
printf '%s\n' {init}
read -r line; printf '%s\n' "$line" >> @LOG@
read -r line; printf '%s\n' "$line" >> @LOG@
printf '%s\n' {response}
read -r line"#,
            init = shell_quote(INIT_RESPONSE),
            response = shell_quote(&search_response(payload)),
        ))
    }

    /// Lines the script appended to its log.
    pub fn received(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Client running this tool with the given deadline.
    pub fn client(&self, timeout: Duration) -> SearchClient {
        SearchClient::from_session_config(self.session_config(timeout))
    }

    /// Session configuration running this tool.
    pub fn session_config(&self, timeout: Duration) -> SessionConfig {
        SessionConfig {
            timeout,
            ..SessionConfig::new(SpawnConfig {
                executable: self.path.clone(),
                home_dir: None,
            })
        }
    }
}

/// JSON line answering the search call with `text`.
pub fn search_response(text: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": 2,
        "result": { "content": [{ "type": "text", "text": text }] }
    })
    .to_string()
}

/// Single-quote `raw` for `/bin/sh`.
pub fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}
