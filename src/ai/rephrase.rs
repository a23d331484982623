//! Local AI rephrase client
//!
//! The rephrase service is reached through the [`RephraseClient`] trait:
//! - `CommandRephraseClient`: runs a local process, request JSON on stdin,
//!   response JSON on stdout
//! - `MockRephraseClient`: preconfigured responses (testing)
//!
//! Nothing here touches the Document Model. Callers apply a successful
//! result themselves; a failure leaves their state as it was.

use crate::session::CancellationToken;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

const OPEN_TAG: &str = "<RefinedText>";
const CLOSE_TAG: &str = "</RefinedText>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RephraseRequest {
    pub text_to_rephrase: Vec<String>,
    #[serde(default)]
    pub custom_instructions: String,
    pub llm_model: String,
}

impl RephraseRequest {
    /// Build a request from free text, one entry per paragraph
    pub fn from_text(text: &str, llm_model: impl Into<String>) -> Self {
        Self {
            text_to_rephrase: split_paragraphs(text),
            custom_instructions: String::new(),
            llm_model: llm_model.into(),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.custom_instructions = instructions.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text_to_rephrase.iter().all(|p| p.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RephraseResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rephrased_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RephraseResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            rephrased_text: Some(text.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            rephrased_text: None,
            error: Some(error.into()),
        }
    }
}

/// Errors from rephrase operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RephraseError {
    #[error("nothing to rephrase")]
    EmptyInput,
    #[error("rephrase service not available: {0}")]
    Unavailable(String),
    #[error("rephrase failed: {0}")]
    Failed(String),
    #[error("response parse error: {0}")]
    ParseError(String),
    #[error("rephrase cancelled")]
    Cancelled,
}

/// Client trait for the local rephrase service.
#[async_trait]
pub trait RephraseClient: Send + Sync {
    /// Check if the service is reachable.
    async fn is_available(&self) -> bool;

    /// Send one request. A `success=false` reply is returned as `Ok`.
    async fn rephrase(&self, request: &RephraseRequest) -> Result<RephraseResponse, RephraseError>;
}

/// Validate, send and await a rephrase, giving up as soon as `token` is cancelled
///
/// Returns the rephrased text; `success=false` replies become
/// [`RephraseError::Failed`].
pub async fn rephrase(
    client: &dyn RephraseClient,
    request: &RephraseRequest,
    token: &CancellationToken,
) -> Result<String, RephraseError> {
    if request.is_empty() {
        return Err(RephraseError::EmptyInput);
    }
    if token.is_cancelled() {
        return Err(RephraseError::Cancelled);
    }

    let response = tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!("rephrase cancelled while in flight");
            return Err(RephraseError::Cancelled);
        }
        result = client.rephrase(request) => result?,
    };

    if !response.success {
        let reason = response.error.unwrap_or_else(|| "unknown error".to_string());
        warn!(error = %reason, "rephrase service reported failure");
        return Err(RephraseError::Failed(reason));
    }
    response
        .rephrased_text
        .ok_or_else(|| RephraseError::ParseError("success without rephrased_text".to_string()))
}

/// Split text into trimmed, non-empty paragraphs on line breaks
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Text shown while a response is still streaming in
///
/// Empty until the opening tag arrives; runs to the closing tag or to the
/// end of what has arrived so far.
pub fn streaming_refined_text(raw: &str) -> &str {
    let Some(start) = raw.find(OPEN_TAG) else {
        return "";
    };
    let content = &raw[start + OPEN_TAG.len()..];
    match content.find(CLOSE_TAG) {
        Some(end) => &content[..end],
        None => content,
    }
}

/// Final text of a complete response: the tagged content, or the whole
/// response when the model did not use the tags
pub fn refined_text(raw: &str) -> String {
    if let Some(start) = raw.find(OPEN_TAG) {
        let content = &raw[start + OPEN_TAG.len()..];
        if let Some(end) = content.find(CLOSE_TAG) {
            return content[..end].trim().to_string();
        }
    }
    warn!("response not wrapped in refined-text tags; using raw output");
    raw.trim().to_string()
}

/// Rephrase client that runs a local program per request
pub struct CommandRephraseClient {
    program: String,
    args: Vec<String>,
}

impl CommandRephraseClient {
    /// `argv[0]` is the program, the rest are its arguments
    pub fn new(argv: &[String]) -> Result<Self, RephraseError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| RephraseError::Unavailable("no rephrase command configured".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn resolve_program(&self) -> Option<std::path::PathBuf> {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file().then(|| program.to_path_buf());
        }
        std::env::var_os("PATH").and_then(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join(program))
                .find(|candidate| candidate.is_file())
        })
    }
}

#[async_trait]
impl RephraseClient for CommandRephraseClient {
    async fn is_available(&self) -> bool {
        self.resolve_program().is_some()
    }

    async fn rephrase(&self, request: &RephraseRequest) -> Result<RephraseResponse, RephraseError> {
        let input =
            serde_json::to_vec(request).map_err(|e| RephraseError::ParseError(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RephraseError::Unavailable(format!("{}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .await
                .map_err(|e| RephraseError::Failed(format!("writing request: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RephraseError::Failed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RephraseError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| RephraseError::ParseError(e.to_string()))
    }
}

/// Mock client for testing; echoes the input unless configured otherwise
pub struct MockRephraseClient {
    available: bool,
    response: Option<RephraseResponse>,
    delay: Option<Duration>,
}

impl MockRephraseClient {
    /// Create a mock client that reports as available and echoes input.
    pub fn available() -> Self {
        Self {
            available: true,
            response: None,
            delay: None,
        }
    }

    /// Create a mock client that reports as unavailable.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            response: None,
            delay: None,
        }
    }

    pub fn with_response(mut self, text: impl Into<String>) -> Self {
        self.response = Some(RephraseResponse::ok(text));
        self
    }

    pub fn with_failure(mut self, error: impl Into<String>) -> Self {
        self.response = Some(RephraseResponse::failed(error));
        self
    }

    /// Wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl RephraseClient for MockRephraseClient {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn rephrase(&self, request: &RephraseRequest) -> Result<RephraseResponse, RephraseError> {
        if !self.available {
            return Err(RephraseError::Unavailable(
                "mock client configured as unavailable".to_string(),
            ));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .response
            .clone()
            .unwrap_or_else(|| RephraseResponse::ok(request.text_to_rephrase.join("\n"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> RephraseRequest {
        RephraseRequest::from_text(text, "default")
    }

    #[test]
    fn splits_on_line_breaks_and_drops_blanks() {
        assert_eq!(
            split_paragraphs("First line.\n\n  Second line.  \r\n\n\nThird"),
            vec!["First line.", "Second line.", "Third"]
        );
        assert!(split_paragraphs(" \n\n ").is_empty());
    }

    #[test]
    fn request_serializes_with_service_field_names() {
        let json = serde_json::to_value(request("a\nb").with_instructions("darker")).unwrap();
        assert_eq!(json["text_to_rephrase"], serde_json::json!(["a", "b"]));
        assert_eq!(json["custom_instructions"], "darker");
        assert_eq!(json["llm_model"], "default");
    }

    #[test]
    fn streaming_text_tolerates_missing_close_tag() {
        assert_eq!(streaming_refined_text("thinking..."), "");
        assert_eq!(streaming_refined_text("x <RefinedText>The sea"), "The sea");
        assert_eq!(
            streaming_refined_text("<RefinedText>The sea</RefinedText> trailing"),
            "The sea"
        );
    }

    #[test]
    fn final_text_falls_back_to_raw_output() {
        assert_eq!(refined_text("<RefinedText> Calm. </RefinedText>"), "Calm.");
        assert_eq!(refined_text("  untagged answer "), "untagged answer");
    }

    #[tokio::test]
    async fn mock_available_client_returns_response() {
        let client = MockRephraseClient::available().with_response("Rewritten.");
        let token = CancellationToken::new();

        assert!(client.is_available().await);
        let text = rephrase(&client, &request("Original."), &token).await.unwrap();
        assert_eq!(text, "Rewritten.");
    }

    #[tokio::test]
    async fn empty_input_is_rejected_before_calling_service() {
        let client = MockRephraseClient::unavailable();
        let token = CancellationToken::new();
        let err = rephrase(&client, &request("\n  \n"), &token).await.unwrap_err();
        assert_eq!(err, RephraseError::EmptyInput);
    }

    #[tokio::test]
    async fn service_failure_maps_to_error() {
        let client = MockRephraseClient::available().with_failure("model not loaded");
        let token = CancellationToken::new();
        let err = rephrase(&client, &request("text"), &token).await.unwrap_err();
        assert_eq!(err, RephraseError::Failed("model not loaded".into()));
    }

    #[tokio::test]
    async fn unavailable_client_reports_unavailable() {
        let client = MockRephraseClient::unavailable();
        let token = CancellationToken::new();
        assert!(!client.is_available().await);
        let err = rephrase(&client, &request("text"), &token).await.unwrap_err();
        assert!(matches!(err, RephraseError::Unavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_abandons_in_flight_request() {
        let client = MockRephraseClient::available().with_delay(Duration::from_secs(30));
        let token = CancellationToken::new();

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                token.cancel();
            })
        };

        let err = rephrase(&client, &request("text"), &token).await.unwrap_err();
        assert_eq!(err, RephraseError::Cancelled);
        canceller.await.unwrap();
    }

    #[test]
    fn command_client_requires_a_program() {
        assert!(matches!(
            CommandRephraseClient::new(&[]),
            Err(RephraseError::Unavailable(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_client_exchanges_json_over_stdio() {
        let script = r#"cat > /dev/null; printf '{"success":true,"rephrased_text":"From the process."}'"#;
        let argv = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        let client = CommandRephraseClient::new(&argv).unwrap();
        let token = CancellationToken::new();

        assert!(client.is_available().await);
        let text = rephrase(&client, &request("text"), &token).await.unwrap();
        assert_eq!(text, "From the process.");
    }
}
