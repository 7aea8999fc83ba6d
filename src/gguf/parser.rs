//! gguf-parser invocation with timeout, retry and error classification
//!
//! The external `gguf-parser` tool reads GGUF headers straight from a hub
//! (ranged HTTP requests) or from a local file and prints a JSON summary.
//! [`ExtractionClient`] wraps it: one process per attempt, a fixed wall-clock
//! limit, exponential backoff between transient failures, and no retries once
//! the hub reports the file as missing.

use super::metadata::{ModelMetadataRecord, parse_tool_output};
use crate::config::ParserConfig;
use crate::error::ExtractError;
use crate::hub::HubBackend;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

// ============================================================================
// Locators
// ============================================================================

/// Where gguf-parser should read a file from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Remote {
        backend: HubBackend,
        repo_id: String,
        filename: String,
    },
    Local {
        path: PathBuf,
    },
}

impl Locator {
    /// Command line arguments selecting this file, `--json` included
    pub fn args(&self) -> Vec<String> {
        let mut args = match self {
            Locator::Remote {
                backend,
                repo_id,
                filename,
            } => {
                let (repo_flag, file_flag) = match backend {
                    HubBackend::HuggingFace => ("--hf-repo", "--hf-file"),
                    HubBackend::ModelScope => ("--ms-repo", "--ms-file"),
                };
                // ModelScope filenames are case sensitive, pass them verbatim
                vec![
                    repo_flag.to_string(),
                    repo_id.clone(),
                    file_flag.to_string(),
                    filename.clone(),
                ]
            }
            Locator::Local { path } => {
                vec!["--path".to_string(), path.to_string_lossy().into_owned()]
            }
        };
        args.push("--json".to_string());
        args
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Remote {
                backend,
                repo_id,
                filename,
            } => write!(f, "{}:{}/{}", backend, repo_id, filename),
            Locator::Local { path } => write!(f, "{}", path.display()),
        }
    }
}

// ============================================================================
// Process runner
// ============================================================================

/// Captured result of one finished tool invocation
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Trait for running the parser executable
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the tool once with the given arguments
    ///
    /// Errors cover conditions where no output was captured at all
    /// (missing binary, spawn failure, timeout).
    async fn run(&self, args: &[String]) -> Result<ToolOutput, ExtractError>;
}

/// Production runner using tokio::process
pub struct SystemToolRunner {
    tool_path: PathBuf,
    timeout: Duration,
}

impl SystemToolRunner {
    pub fn new(tool_path: PathBuf, timeout: Duration) -> Self {
        Self { tool_path, timeout }
    }
}

#[async_trait]
impl ToolRunner for SystemToolRunner {
    async fn run(&self, args: &[String]) -> Result<ToolOutput, ExtractError> {
        if !self.tool_path.exists() {
            return Err(ExtractError::ToolUnavailable {
                path: self.tool_path.clone(),
            });
        }

        tracing::debug!(tool = ?self.tool_path, args = ?args, "Running gguf-parser");

        let child = Command::new(&self.tool_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractError::Spawn {
                reason: e.to_string(),
            })?;

        // Dropping the wait future on timeout kills the child
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ExtractError::Spawn {
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(ExtractError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        Ok(ToolOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

// ============================================================================
// Extraction client
// ============================================================================

/// Metadata extraction client
pub struct ExtractionClient {
    runner: Arc<dyn ToolRunner>,
    config: ParserConfig,
}

impl ExtractionClient {
    /// Create a client that spawns the configured gguf-parser binary
    pub fn new(config: ParserConfig) -> Self {
        let runner = Arc::new(SystemToolRunner::new(
            config.tool_path.clone(),
            config.timeout(),
        ));
        Self::with_runner(config, runner)
    }

    /// Create a client with a custom runner
    pub fn with_runner(config: ParserConfig, runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner, config }
    }

    /// Configured attempts for remote locators
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Extract metadata for a file hosted on a hub
    pub async fn extract_from_remote(
        &self,
        backend: HubBackend,
        repo_id: &str,
        filename: &str,
        max_attempts: u32,
    ) -> Option<ModelMetadataRecord> {
        let locator = Locator::Remote {
            backend,
            repo_id: repo_id.to_string(),
            filename: filename.to_string(),
        };
        self.try_extract(&locator, max_attempts).await.ok()
    }

    /// Extract metadata for a local file; never retried
    pub async fn extract_from_local(&self, path: &Path) -> Option<ModelMetadataRecord> {
        let locator = Locator::Local {
            path: path.to_path_buf(),
        };
        self.try_extract(&locator, 1).await.ok()
    }

    /// Run up to `max_attempts` attempts, returning the last error on failure
    pub async fn try_extract(
        &self,
        locator: &Locator,
        max_attempts: u32,
    ) -> Result<ModelMetadataRecord, ExtractError> {
        let max_attempts = max_attempts.max(1);
        let mut delay = self.config.initial_backoff();
        let mut attempt = 1;

        loop {
            let result = self.attempt(locator).await;
            crate::metrics::record_extraction_attempt(match &result {
                Ok(_) => "success",
                Err(e) => e.kind(),
            });

            let error = match result {
                Ok(record) => {
                    if attempt > 1 {
                        tracing::info!(locator = %locator, attempt, "Extraction succeeded after retry");
                    }
                    return Ok(record);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                match &error {
                    ExtractError::NotFound { message } => {
                        tracing::error!(locator = %locator, stderr = %message, "File not found (404)");
                    }
                    ExtractError::ToolUnavailable { path } => {
                        tracing::error!(path = ?path, "gguf-parser not available");
                    }
                    _ => tracing::error!(locator = %locator, error = %error, "Extraction failed"),
                }
                return Err(error);
            }

            if attempt >= max_attempts {
                tracing::warn!(
                    locator = %locator,
                    attempts = attempt,
                    error = %error,
                    "Extraction failed, giving up"
                );
                return Err(error);
            }

            tracing::warn!(
                locator = %locator,
                attempt,
                delay_secs = delay.as_secs_f64(),
                error = %error,
                "Extraction attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
            delay *= 2;
            attempt += 1;
        }
    }

    /// A single attempt: run the tool and classify its result
    pub async fn attempt(&self, locator: &Locator) -> Result<ModelMetadataRecord, ExtractError> {
        let output = self.runner.run(&locator.args()).await?;
        classify_output(output)
    }
}

fn classify_output(output: ToolOutput) -> Result<ModelMetadataRecord, ExtractError> {
    if !output.success {
        if output.stderr.contains("404") {
            return Err(ExtractError::NotFound {
                message: output.stderr,
            });
        }
        return Err(ExtractError::ToolFailed {
            code: output.exit_code,
            stderr: output.stderr,
        });
    }

    parse_tool_output(&output.stdout)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Runner replaying a fixed sequence of results
    pub(crate) struct ScriptedRunner {
        script: Mutex<VecDeque<Result<ToolOutput, ExtractError>>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        pub(crate) fn new(script: Vec<Result<ToolOutput, ExtractError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolRunner for ScriptedRunner {
        async fn run(&self, args: &[String]) -> Result<ToolOutput, ExtractError> {
            self.calls.lock().unwrap().push(args.to_vec());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ExtractError::Timeout { secs: 60 }))
        }
    }

    pub(crate) fn success(json: &str) -> Result<ToolOutput, ExtractError> {
        Ok(ToolOutput {
            success: true,
            exit_code: Some(0),
            stdout: json.to_string(),
            stderr: String::new(),
        })
    }

    pub(crate) fn failure(stderr: &str) -> Result<ToolOutput, ExtractError> {
        Ok(ToolOutput {
            success: false,
            exit_code: Some(1),
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }

    const OUTPUT: &str = r#"{"metadata": {"architecture": "llama", "fileTypeDetail": "Q4_K_M"}}"#;

    fn client(runner: Arc<ScriptedRunner>) -> ExtractionClient {
        ExtractionClient::with_runner(ParserConfig::default(), runner)
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_retried() {
        let runner = ScriptedRunner::new(vec![
            failure("failed to get model: HTTP 404 Not Found"),
            success(OUTPUT),
        ]);
        let client = client(runner.clone());

        let start = tokio::time::Instant::now();
        let result = client
            .extract_from_remote(HubBackend::HuggingFace, "org/model-GGUF", "m.gguf", 3)
            .await;

        assert!(result.is_none());
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_back_off_then_succeed() {
        let runner = ScriptedRunner::new(vec![
            failure("connection reset by peer"),
            Err(ExtractError::Timeout { secs: 60 }),
            success(OUTPUT),
        ]);
        let client = client(runner.clone());

        let start = tokio::time::Instant::now();
        let record = client
            .extract_from_remote(HubBackend::HuggingFace, "org/model-GGUF", "m.gguf", 3)
            .await
            .unwrap();

        assert_eq!(record.architecture.as_deref(), Some("llama"));
        assert_eq!(runner.calls().len(), 3);
        // 2s after the first failure, 4s after the second
        assert_eq!(start.elapsed().as_secs(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let runner = ScriptedRunner::new(vec![
            success("not json"),
            failure("dial tcp: i/o timeout"),
            failure("dial tcp: i/o timeout"),
            success(OUTPUT),
        ]);
        let client = client(runner.clone());

        let start = tokio::time::Instant::now();
        let locator = Locator::Remote {
            backend: HubBackend::HuggingFace,
            repo_id: "org/model-GGUF".to_string(),
            filename: "m.gguf".to_string(),
        };
        let err = client.try_extract(&locator, 3).await.unwrap_err();

        assert!(matches!(err, ExtractError::ToolFailed { .. }));
        assert_eq!(runner.calls().len(), 3);
        // No sleep after the final attempt
        assert_eq!(start.elapsed().as_secs(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_tool_fails_fast() {
        let runner = ScriptedRunner::new(vec![
            Err(ExtractError::ToolUnavailable {
                path: PathBuf::from("tools/gguf-parser"),
            }),
            success(OUTPUT),
        ]);
        let client = client(runner.clone());

        let result = client
            .extract_from_remote(HubBackend::ModelScope, "org/model", "m.gguf", 3)
            .await;

        assert!(result.is_none());
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_extraction_is_single_attempt() {
        let runner = ScriptedRunner::new(vec![failure("read error"), success(OUTPUT)]);
        let client = client(runner.clone());

        let result = client
            .extract_from_local(Path::new("/models/llama.Q4_K_M.gguf"))
            .await;

        assert!(result.is_none());
        assert_eq!(
            runner.calls(),
            vec![vec![
                "--path".to_string(),
                "/models/llama.Q4_K_M.gguf".to_string(),
                "--json".to_string(),
            ]]
        );
    }

    #[test]
    fn test_backend_flags() {
        let hf = Locator::Remote {
            backend: HubBackend::HuggingFace,
            repo_id: "TheBloke/Llama-2-7B-GGUF".to_string(),
            filename: "llama-2-7b.Q4_K_M.gguf".to_string(),
        };
        assert_eq!(
            hf.args(),
            vec![
                "--hf-repo",
                "TheBloke/Llama-2-7B-GGUF",
                "--hf-file",
                "llama-2-7b.Q4_K_M.gguf",
                "--json"
            ]
        );

        let ms = Locator::Remote {
            backend: HubBackend::ModelScope,
            repo_id: "Xorbits/Qwen-7B-Chat-GGUF".to_string(),
            filename: "Qwen-7B-Chat.Q4_K_M.gguf".to_string(),
        };
        assert_eq!(
            ms.args(),
            vec![
                "--ms-repo",
                "Xorbits/Qwen-7B-Chat-GGUF",
                "--ms-file",
                "Qwen-7B-Chat.Q4_K_M.gguf",
                "--json"
            ]
        );
    }

    #[test]
    fn test_classify_output() {
        let err = classify_output(failure("error: 404 page not found").unwrap()).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound { .. }));

        let err = classify_output(failure("rate limited").unwrap()).unwrap_err();
        assert!(matches!(err, ExtractError::ToolFailed { code: Some(1), .. }));

        let err = classify_output(success("{").unwrap()).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedOutput { .. }));

        let record = classify_output(success(OUTPUT).unwrap()).unwrap();
        assert_eq!(record.quantization.as_deref(), Some("Q4_K_M"));
    }

    #[tokio::test]
    async fn test_system_runner_missing_binary() {
        let runner = SystemToolRunner::new(
            PathBuf::from("/nonexistent/gguf-parser"),
            Duration::from_secs(1),
        );
        let err = runner.run(&["--json".to_string()]).await.unwrap_err();
        assert!(matches!(err, ExtractError::ToolUnavailable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_end_to_end() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let tool = dir.path().join("gguf-parser");
        std::fs::write(
            &tool,
            "#!/bin/sh\n\
             case \"$1\" in\n\
               --hf-repo) echo '{\"metadata\": {\"architecture\": \"llama\"}}' ;;\n\
               --ms-repo) echo 'HTTP 404 Not Found' >&2; exit 1 ;;\n\
               *) sleep 5 ;;\n\
             esac\n",
        )
        .unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = ParserConfig {
            tool_path: tool,
            timeout_secs: 1,
            max_attempts: 1,
            initial_backoff_secs: 0,
        };
        let client = ExtractionClient::new(config);

        let record = client
            .extract_from_remote(HubBackend::HuggingFace, "org/m", "m.gguf", 1)
            .await
            .unwrap();
        assert_eq!(record.architecture.as_deref(), Some("llama"));

        let locator = Locator::Remote {
            backend: HubBackend::ModelScope,
            repo_id: "org/m".to_string(),
            filename: "M.gguf".to_string(),
        };
        let err = client.try_extract(&locator, 1).await.unwrap_err();
        assert!(matches!(err, ExtractError::NotFound { .. }));

        let locator = Locator::Local {
            path: PathBuf::from("/tmp/m.gguf"),
        };
        let err = client.try_extract(&locator, 1).await.unwrap_err();
        assert!(matches!(err, ExtractError::Timeout { secs: 1 }));
    }
}
