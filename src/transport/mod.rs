//! HTTPS transport to the array.
//!
//! Sends one CDMI-flavored REST command at a time and classifies the raw
//! response into a [`CommandOutcome`]. Expected-but-empty results and
//! asynchronous accepts are outcomes, not errors; only authentication
//! failures and transport-level failures surface as [`Error`] here.

use crate::error::{Error, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Certificate, Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, error, warn};

/// Maximum attempts against an array reporting 503.
pub const CONNECTION_RETRY: u32 = 10;

const CDMI_CONTENT_TYPE: &str = "application/cdmi-container";
const CDMI_SPEC_VERSION: &str = "1.0.2";

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for one array. Read-only after construction.
#[derive(Debug, Clone)]
pub struct DplConfig {
    /// Array management address
    pub address: String,
    /// Array management port
    pub port: u16,
    /// Basic-auth username
    pub username: String,
    /// Basic-auth password (should use secrets in production)
    pub password: String,
    /// Verify the array TLS certificate
    pub cert_verify: bool,
    /// PEM bundle to pin when verification is enabled
    pub cert_path: Option<PathBuf>,
}

impl Default for DplConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8357,
            username: "admin".to_string(),
            password: String::new(),
            cert_verify: false,
            cert_path: None,
        }
    }
}

// =============================================================================
// Command Outcome
// =============================================================================

/// Normalized result of one array command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Expected status; decoded body (`Value::Null` when the operation
    /// legitimately returns no content)
    Success(Value),
    /// HTTP 202: work accepted, event handle in the body
    Accepted(Value),
    /// HTTP 404 inside the expected set: valid empty result
    NoData,
    /// A body was expected but did not decode as JSON
    Malformed,
    /// Unexpected status code (generic I/O failure)
    Failed(StatusCode),
    /// The request payload could not be serialized; nothing was sent
    InvalidRequest,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success(_))
    }
}

#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

// =============================================================================
// Transport Client
// =============================================================================

/// One HTTPS client bound to one array endpoint.
#[derive(Debug)]
pub struct DplTransport {
    config: DplConfig,
    client: Client,
    base_url: String,
}

impl DplTransport {
    /// Build the client. Reads and pins the configured certificate when
    /// verification is enabled; otherwise accepts any certificate, as
    /// arrays commonly ship self-signed ones.
    pub fn new(config: DplConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if config.cert_verify {
            let path = config.cert_path.as_ref().ok_or_else(|| {
                Error::Configuration(
                    "cert_verify is enabled but cert_path is missing".to_string(),
                )
            })?;
            let pem = std::fs::read(path)?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        } else {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build()?;
        let base_url = format!("https://{}:{}", config.address, config.port);
        Ok(Self {
            config,
            client,
            base_url,
        })
    }

    /// Send one command and classify the response.
    ///
    /// A 503 is retried immediately up to [`CONNECTION_RETRY`] times; any
    /// other response ends the retry loop. Transport-level failures are
    /// never retried.
    pub async fn send<P: Serialize>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&P>,
        expected: &[StatusCode],
    ) -> Result<CommandOutcome> {
        let body = match encode_payload(payload) {
            Ok(body) => body,
            Err(e) => {
                error!(%path, error = %e, "failed to encode request payload");
                return Ok(CommandOutcome::InvalidRequest);
            }
        };

        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "sending array command");

        let raw =
            send_with_retry(CONNECTION_RETRY, || self.execute(&method, &url, &body)).await?;
        classify(raw.status, &raw.body, expected)
    }

    async fn execute(
        &self,
        method: &Method,
        url: &str,
        body: &Option<Vec<u8>>,
    ) -> Result<RawResponse> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(CONTENT_TYPE, CDMI_CONTENT_TYPE)
            .header(ACCEPT, CDMI_CONTENT_TYPE)
            .header("x-cdmi-specification-version", CDMI_SPEC_VERSION)
            .basic_auth(&self.config.username, Some(&self.config.password));
        if let Some(body) = body {
            request = request.body(body.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok(RawResponse { status, body })
    }
}

fn encode_payload<P: Serialize>(
    payload: Option<&P>,
) -> std::result::Result<Option<Vec<u8>>, serde_json::Error> {
    match payload {
        None => Ok(None),
        Some(p) => serde_json::to_vec(p).map(Some),
    }
}

/// Retry `attempt` while the array reports 503, up to `budget` attempts.
/// Errors from `attempt` itself abort immediately.
pub(crate) async fn send_with_retry<F, Fut>(budget: u32, mut attempt: F) -> Result<RawResponse>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RawResponse>>,
{
    for n in 1..=budget {
        let response = attempt().await?;
        if response.status == StatusCode::SERVICE_UNAVAILABLE {
            warn!(attempt = n, "array service unavailable, retrying");
            continue;
        }
        return Ok(response);
    }
    Err(Error::ServiceUnavailable { attempts: budget })
}

/// Status classification rules. Evaluated once a non-503 response (or the
/// exhausted retry budget) is in hand.
pub(crate) fn classify(
    status: StatusCode,
    body: &[u8],
    expected: &[StatusCode],
) -> Result<CommandOutcome> {
    let in_expected = expected.contains(&status);

    if in_expected && status == StatusCode::NOT_FOUND {
        return Ok(CommandOutcome::NoData);
    }
    if !in_expected {
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        warn!(%status, ?expected, "unexpected array response status");
        return Ok(CommandOutcome::Failed(status));
    }
    if status == StatusCode::ACCEPTED {
        return Ok(match decode(body) {
            Some(value) => CommandOutcome::Accepted(value),
            None => CommandOutcome::Malformed,
        });
    }
    if (status == StatusCode::OK || status == StatusCode::CREATED)
        && !expected.contains(&StatusCode::NO_CONTENT)
    {
        return Ok(match decode(body) {
            Some(value) => CommandOutcome::Success(value),
            None => CommandOutcome::Malformed,
        });
    }
    Ok(CommandOutcome::Success(Value::Null))
}

fn decode(body: &[u8]) -> Option<Value> {
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            error!(error = %e, "array response body is not valid JSON");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde::Serializer;
    use std::sync::atomic::{AtomicU32, Ordering};

    const EXPECTED_CRUD: &[StatusCode] = &[
        StatusCode::OK,
        StatusCode::ACCEPTED,
        StatusCode::CREATED,
    ];

    fn ok_response(status: StatusCode, body: &str) -> RawResponse {
        RawResponse {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_classify_expected_not_found_is_no_data() {
        let expected = &[StatusCode::OK, StatusCode::NOT_FOUND];
        let out = classify(StatusCode::NOT_FOUND, b"", expected).unwrap();
        assert_eq!(out, CommandOutcome::NoData);
    }

    #[test]
    fn test_classify_unexpected_unauthorized_raises() {
        let err = classify(StatusCode::UNAUTHORIZED, b"", EXPECTED_CRUD).unwrap_err();
        assert_matches!(err, Error::Unauthorized);
    }

    #[test]
    fn test_classify_unexpected_status_is_io_failure() {
        let out = classify(StatusCode::INTERNAL_SERVER_ERROR, b"", EXPECTED_CRUD).unwrap();
        assert_eq!(
            out,
            CommandOutcome::Failed(StatusCode::INTERNAL_SERVER_ERROR)
        );
    }

    #[test]
    fn test_classify_accepted_decodes_event_body() {
        let body = r#"{"metadata":{"event_uuid":"e1"}}"#;
        let out = classify(StatusCode::ACCEPTED, body.as_bytes(), EXPECTED_CRUD).unwrap();
        assert_matches!(out, CommandOutcome::Accepted(v) => {
            assert_eq!(v["metadata"]["event_uuid"], "e1");
        });
    }

    #[test]
    fn test_classify_accepted_bad_json_is_malformed() {
        let out = classify(StatusCode::ACCEPTED, b"not json", EXPECTED_CRUD).unwrap();
        assert_eq!(out, CommandOutcome::Malformed);
    }

    #[test]
    fn test_classify_ok_decodes_body() {
        let out = classify(StatusCode::OK, br#"{"children":[]}"#, EXPECTED_CRUD).unwrap();
        assert_matches!(out, CommandOutcome::Success(v) => {
            assert!(v["children"].as_array().unwrap().is_empty());
        });
    }

    #[test]
    fn test_classify_ok_with_no_content_expected_skips_decode() {
        // Delete-style expected sets include 204; bodies are not decoded
        // even when the array answers 200.
        let expected = &[
            StatusCode::OK,
            StatusCode::NO_CONTENT,
            StatusCode::NOT_FOUND,
        ];
        let out = classify(StatusCode::OK, b"ignored", expected).unwrap();
        assert_eq!(out, CommandOutcome::Success(Value::Null));
    }

    #[test]
    fn test_classify_no_content_is_empty_success() {
        let expected = &[StatusCode::NO_CONTENT, StatusCode::NOT_FOUND];
        let out = classify(StatusCode::NO_CONTENT, b"", expected).unwrap();
        assert_eq!(out, CommandOutcome::Success(Value::Null));
    }

    #[tokio::test]
    async fn test_retry_returns_first_non_unavailable_response() {
        // Three 503s, then 201: four attempts total.
        let calls = AtomicU32::new(0);
        let out = send_with_retry(CONNECTION_RETRY, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Ok(ok_response(StatusCode::SERVICE_UNAVAILABLE, ""))
                } else {
                    Ok(ok_response(StatusCode::CREATED, "{}"))
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out.status, StatusCode::CREATED);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_is_transport_error() {
        let calls = AtomicU32::new(0);
        let err = send_with_retry(CONNECTION_RETRY, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(ok_response(StatusCode::SERVICE_UNAVAILABLE, "")) }
        })
        .await
        .unwrap_err();
        assert_matches!(err, Error::ServiceUnavailable { attempts: CONNECTION_RETRY });
        assert_eq!(calls.load(Ordering::SeqCst), CONNECTION_RETRY);
    }

    #[tokio::test]
    async fn test_transport_error_aborts_without_retry() {
        let calls = AtomicU32::new(0);
        let err = send_with_retry(CONNECTION_RETRY, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Configuration("connection refused".into())) }
        })
        .await
        .unwrap_err();
        assert_matches!(err, Error::Configuration(_));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(
            &self,
            _serializer: S,
        ) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not representable"))
        }
    }

    #[test]
    fn test_encode_payload_failure() {
        assert!(encode_payload(Some(&Unserializable)).is_err());
        assert_eq!(encode_payload::<Value>(None).unwrap(), None);
    }

    #[test]
    fn test_cert_verify_requires_path() {
        let config = DplConfig {
            cert_verify: true,
            cert_path: None,
            ..DplConfig::default()
        };
        assert_matches!(DplTransport::new(config), Err(Error::Configuration(_)));
    }
}
