// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wallet provider backed by the external wallet generator executable.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::process::Command;

use super::{parse_collaborator_output, WalletError, WalletProvider};
use crate::model::WalletAssignment;

// Cap on stderr kept for error reports
const MAX_STDERR_BYTES: usize = 4096;

/// How to invoke the wallet collaborator.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Executable to run.
    pub program: String,
    /// Arguments placed before the stream arguments.
    pub args: Vec<String>,
    /// Working directory for the collaborator.
    pub working_dir: Option<PathBuf>,
    /// Hard limit on one invocation.
    pub timeout: Duration,
    /// Value passed to `--mode`.
    pub mode: String,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            program: "npx".to_string(),
            args: vec![
                "ts-node".to_string(),
                "scripts/generateStreamWallet.ts".to_string(),
            ],
            working_dir: None,
            timeout: Duration::from_secs(30),
            mode: "simple".to_string(),
        }
    }
}

/// Runs the collaborator once per stream:
/// `<program> <args..> --streamId <id> --streamName <name> --mode <mode>`.
#[derive(Debug, Clone)]
pub struct ProcessWalletAssigner {
    config: ProcessConfig,
}

impl ProcessWalletAssigner {
    /// Create an assigner.
    ///
    /// Without a configured working directory the collaborator runs in the
    /// directory current at construction time, so every invocation of one run
    /// resolves relative script paths the same way.
    #[must_use]
    pub fn new(mut config: ProcessConfig) -> Self {
        if config.working_dir.is_none() {
            let relative = relative_path_args(&config.args);
            if !relative.is_empty() {
                warn!(
                    "No wallet working directory configured; resolving {} against the current directory",
                    relative.join(", ")
                );
            }
            config.working_dir = std::env::current_dir().ok();
        }
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    fn command(&self, stream_id: &str, stream_name: &str) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg("--streamId")
            .arg(stream_id)
            .arg("--streamName")
            .arg(stream_name)
            .arg("--mode")
            .arg(&self.config.mode)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        command
    }
}

/// Arguments that look like relative file paths (`scripts/x.ts`).
fn relative_path_args(args: &[String]) -> Vec<&str> {
    args.iter()
        .map(String::as_str)
        .filter(|arg| {
            arg.contains('/')
                && !arg.starts_with('-')
                && !arg.contains(char::is_whitespace)
                && Path::new(arg).is_relative()
        })
        .collect()
}

#[async_trait]
impl WalletProvider for ProcessWalletAssigner {
    async fn assign_wallet(
        &self,
        stream_id: &str,
        stream_name: &str,
    ) -> Result<WalletAssignment, WalletError> {
        debug!("Requesting wallet for stream {stream_id}");

        let child = self
            .command(stream_id, stream_name)
            .spawn()
            .map_err(|source| WalletError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        // Dropping the pending future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Ok(result) => result.map_err(WalletError::Io)?,
            Err(_elapsed) => return Err(WalletError::Timeout(self.config.timeout.as_secs())),
        };

        if !output.status.success() {
            let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if stderr.len() > MAX_STDERR_BYTES {
                let mut cut = MAX_STDERR_BYTES;
                while !stderr.is_char_boundary(cut) {
                    cut -= 1;
                }
                stderr.truncate(cut);
            }
            return Err(WalletError::Exit {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        parse_collaborator_output(&String::from_utf8_lossy(&output.stdout))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Collaborator stand-in: `sh -c <script> wallet --streamId <id> ...`,
    /// so the stream id is `$2` and the name is `$4` inside the script.
    fn shell(script: &str, timeout: Duration) -> ProcessWalletAssigner {
        ProcessWalletAssigner::new(ProcessConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "wallet".to_string()],
            working_dir: None,
            timeout,
            mode: "simple".to_string(),
        })
    }

    #[tokio::test]
    async fn test_wallet_from_collaborator_stdout() {
        let assigner = shell(
            r#"echo "Stream Wallet Generator for $2 ($4)"
echo JSON_OUTPUT_START
echo '{"walletAddress":"0xabc","mode":"'"$6"'","createdAt":"2025-10-23T19:50:45.000Z"}'
echo JSON_OUTPUT_END
echo done"#,
            Duration::from_secs(10),
        );

        let wallet = assigner
            .assign_wallet("ri-3344-abc", "Fire Dispatch")
            .await
            .unwrap();
        assert_eq!(wallet.address, "0xabc");
        assert_eq!(wallet.mode, "simple");
    }

    #[tokio::test]
    async fn test_stream_arguments_are_passed() {
        let assigner = shell(
            r#"echo JSON_OUTPUT_START
echo '{"walletAddress":"'"$2"'","mode":"'"$4"'","createdAt":"now"}'
echo JSON_OUTPUT_END"#,
            Duration::from_secs(10),
        );

        let wallet = assigner
            .assign_wallet("ri-3344-abc", "Fire Dispatch")
            .await
            .unwrap();
        assert_eq!(wallet.address, "ri-3344-abc");
        assert_eq!(wallet.mode, "Fire Dispatch");
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let assigner = shell("echo broken >&2; exit 3", Duration::from_secs(10));
        let err = assigner.assign_wallet("s-1-a", "Channel 1").await.unwrap_err();
        assert!(matches!(
            err,
            WalletError::Exit { code: Some(3), ref stderr } if stderr == "broken"
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let assigner = shell("sleep 5", Duration::from_millis(200));
        let err = assigner.assign_wallet("s-1-a", "Channel 1").await.unwrap_err();
        assert!(matches!(err, WalletError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let assigner = ProcessWalletAssigner::new(ProcessConfig {
            program: "/nonexistent/generate-stream-wallet".to_string(),
            args: Vec::new(),
            ..ProcessConfig::default()
        });
        let err = assigner.assign_wallet("s-1-a", "Channel 1").await.unwrap_err();
        assert!(matches!(err, WalletError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_output_without_sentinels() {
        let assigner = shell("echo just logging", Duration::from_secs(10));
        let err = assigner.assign_wallet("s-1-a", "Channel 1").await.unwrap_err();
        assert!(matches!(err, WalletError::MissingSentinel));
    }

    #[test]
    fn test_relative_script_detection() {
        let defaults = ProcessConfig::default();
        assert_eq!(
            relative_path_args(&defaults.args),
            ["scripts/generateStreamWallet.ts"]
        );
        assert!(relative_path_args(&["/opt/wallet/generate.ts".to_string()]).is_empty());
        assert!(relative_path_args(&["-c".to_string(), "cat a/b; exit 1".to_string()]).is_empty());
    }

    #[test]
    fn test_working_directory_is_pinned() {
        let assigner = ProcessWalletAssigner::new(ProcessConfig::default());
        assert_eq!(
            assigner.config().working_dir,
            std::env::current_dir().ok()
        );

        let configured = ProcessWalletAssigner::new(ProcessConfig {
            working_dir: Some(PathBuf::from("/srv/backend")),
            ..ProcessConfig::default()
        });
        assert_eq!(
            configured.config().working_dir,
            Some(PathBuf::from("/srv/backend"))
        );
    }
}
