//! Remote score submission.
//!
//! [`RemoteScores`] is the seam the router and the drainer call through;
//! [`HttpScoresClient`] implements it against the rounds API.

use std::time::Duration;

use futures::future::{self, BoxFuture};
use reqwest::StatusCode;
use scorecard_engine::{HoleNumber, ScoreEntry, Strokes};
use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;

/// Errors from a remote submission.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Invalid submission: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Round not found: {0}")]
    RoundNotFound(String),

    #[error("Rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Server error: status {0}")]
    Server(u16),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RemoteError {
    /// Whether a later attempt could succeed without changing the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Server(_) | RemoteError::Transport(_))
    }
}

/// Submits one hole's scores for a round. A call either applies every entry
/// or none.
pub trait RemoteScores: Send + Sync {
    fn submit_scores(
        &self,
        round_id: &str,
        scores: Vec<ScoreEntry>,
    ) -> BoxFuture<'static, Result<(), RemoteError>>;
}

/// Reject submissions that cannot succeed before any request is made.
pub fn validate_submission(round_id: &str, scores: &[ScoreEntry]) -> Result<(), RemoteError> {
    if round_id.trim().is_empty() {
        return Err(RemoteError::Validation("round id is required".into()));
    }
    if scores.is_empty() {
        return Err(RemoteError::Validation("scores must not be empty".into()));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct SubmitScoresBody<'a> {
    scores: Vec<WireScore<'a>>,
}

#[derive(Debug, Serialize)]
struct WireScore<'a> {
    hole: HoleNumber,
    player_id: &'a str,
    score: Strokes,
}

impl<'a> SubmitScoresBody<'a> {
    fn new(scores: &'a [ScoreEntry]) -> Self {
        Self {
            scores: scores
                .iter()
                .map(|entry| WireScore {
                    hole: entry.hole_number,
                    player_id: &entry.player_id,
                    score: entry.strokes,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn classify(status: StatusCode, message: Option<String>) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED => {
            RemoteError::Unauthorized(message.unwrap_or_else(|| "authentication required".into()))
        }
        StatusCode::NOT_FOUND => {
            RemoteError::RoundNotFound(message.unwrap_or_else(|| "round not found".into()))
        }
        status if status.is_server_error() => RemoteError::Server(status.as_u16()),
        status => RemoteError::Rejected {
            status: status.as_u16(),
            message: message.unwrap_or_else(|| "request rejected".into()),
        },
    }
}

/// HTTP client for `POST /api/rounds/{roundId}/scores`.
#[derive(Debug, Clone)]
pub struct HttpScoresClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpScoresClient {
    /// Create a client for the given API base URL.
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            auth_token,
        })
    }

    /// Create a client from runtime configuration.
    pub fn from_config(config: &SyncConfig) -> Result<Self, RemoteError> {
        Self::new(
            config.api_url.clone(),
            config.auth_token.clone(),
            config.request_timeout,
        )
    }

    /// Endpoint for a round's scores.
    pub fn scores_url(&self, round_id: &str) -> String {
        format!("{}/api/rounds/{}/scores", self.base_url, round_id.trim())
    }
}

impl RemoteScores for HttpScoresClient {
    fn submit_scores(
        &self,
        round_id: &str,
        scores: Vec<ScoreEntry>,
    ) -> BoxFuture<'static, Result<(), RemoteError>> {
        if let Err(e) = validate_submission(round_id, &scores) {
            return Box::pin(future::ready(Err(e)));
        }

        let url = self.scores_url(round_id);
        let body = match serde_json::to_value(SubmitScoresBody::new(&scores)) {
            Ok(body) => body,
            Err(e) => return Box::pin(future::ready(Err(RemoteError::Validation(e.to_string())))),
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let round_id = round_id.to_string();
        let count = scores.len();

        Box::pin(async move {
            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                tracing::debug!(round_id = %round_id, scores = count, "scores submitted");
                return Ok(());
            }

            let message = response
                .json::<ErrorBody>()
                .await
                .unwrap_or_default()
                .message;
            Err(classify(status, message))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        let scores = vec![ScoreEntry::new("p1", 1, 3)];
        assert!(validate_submission("r1", &scores).is_ok());
        assert!(matches!(
            validate_submission("  ", &scores),
            Err(RemoteError::Validation(_))
        ));
        assert!(matches!(
            validate_submission("r1", &[]),
            Err(RemoteError::Validation(_))
        ));
    }

    #[test]
    fn wire_body_uses_api_field_names() {
        let scores = vec![ScoreEntry::new("p2", 7, 4), ScoreEntry::new("p1", 7, 3)];
        let body = serde_json::to_value(SubmitScoresBody::new(&scores)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "scores": [
                    {"hole": 7, "player_id": "p2", "score": 4},
                    {"hole": 7, "player_id": "p1", "score": 3},
                ]
            })
        );
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, None),
            RemoteError::Unauthorized(_)
        ));
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, Some("no round r9".into())),
            RemoteError::RoundNotFound(m) if m == "no round r9"
        ));
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, Some("hole out of range".into())),
            RemoteError::Rejected { status: 400, .. }
        ));
        assert!(matches!(
            classify(StatusCode::CONFLICT, None),
            RemoteError::Rejected { status: 409, .. }
        ));
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, None),
            RemoteError::Server(502)
        ));
        assert!(RemoteError::Server(503).is_transient());
        assert!(!RemoteError::Validation("x".into()).is_transient());
    }

    #[test]
    fn url_building() {
        let client =
            HttpScoresClient::new("http://api.test/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(client.scores_url("r1"), "http://api.test/api/rounds/r1/scores");
    }

    #[tokio::test]
    async fn invalid_submission_makes_no_request() {
        // Unroutable base: a request would fail with Transport, not Validation.
        let client =
            HttpScoresClient::new("http://127.0.0.1:9", None, Duration::from_millis(200)).unwrap();
        let err = client.submit_scores("r1", Vec::new()).await.unwrap_err();
        assert!(matches!(err, RemoteError::Validation(_)));
    }
}
