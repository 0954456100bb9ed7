//! Authenticated HTTP transport.
//!
//! The single wrapper every request to the ledger service flows through.
//! It attaches the current access token, shapes outgoing payloads (JSON vs
//! multipart), and handles authorization expiry: the first 401 on a logical
//! request triggers one token refresh and one replay; a second 401 is
//! terminal and ends the session.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::SessionManager;
use crate::error::{ApiError, FieldErrors, Result};

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| ApiError::Network(e.to_string()))
}

// =============================================================================
// Payloads
// =============================================================================

/// One file part of a multipart body, held as owned bytes so the request
/// can be rebuilt when a 401 forces a replay.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Form field name.
    pub name: String,
    /// Original file name sent to the service.
    pub file_name: String,
    /// MIME type, when known.
    pub mime: Option<String>,
    /// File contents.
    pub data: Vec<u8>,
}

/// A rebuildable multipart body: plain text fields plus file parts.
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    pub texts: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartBody {
    /// Empty multipart body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.texts.push((name.into(), value.into()));
        self
    }

    /// Add a file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<String>,
        data: Vec<u8>,
    ) -> Self {
        self.files.push(FilePart {
            name: name.into(),
            file_name: file_name.into(),
            mime,
            data,
        });
        self
    }

    fn to_form(&self) -> reqwest::multipart::Form {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &self.texts {
            form = form.text(name.clone(), value.clone());
        }
        for file in &self.files {
            let mut part = reqwest::multipart::Part::bytes(file.data.clone())
                .file_name(file.file_name.clone());
            if let Some(mime) = &file.mime {
                // An unparseable MIME string falls back to the default type.
                part = match part.mime_str(mime) {
                    Ok(with_mime) => with_mime,
                    Err(_) => reqwest::multipart::Part::bytes(file.data.clone())
                        .file_name(file.file_name.clone()),
                };
            }
            form = form.part(file.name.clone(), part);
        }
        form
    }
}

/// Outgoing request body, shaped uniformly for every request.
///
/// JSON bodies are marked as such; multipart bodies carry no explicit
/// content type so the underlying client computes the boundary.
#[derive(Debug, Clone)]
pub enum Payload {
    /// No body.
    Empty,
    /// Structured JSON body.
    Json(Value),
    /// Binary/multipart body (file upload).
    Multipart(MultipartBody),
}

// =============================================================================
// Transport
// =============================================================================

/// Authenticated HTTP transport over the ledger service.
pub struct ApiTransport {
    http: Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl ApiTransport {
    /// Create a transport for a base URL.
    pub fn new(http: Client, base_url: impl Into<String>, session: Arc<SessionManager>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            session,
        }
    }

    /// The session manager this transport escalates to.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// GET a JSON resource.
    ///
    /// # Errors
    /// Network, authorization, or service errors; see [`ApiError`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        let response = self
            .execute(Method::GET, path, query, &Payload::Empty)
            .await?;
        decode(response).await
    }

    /// POST a JSON body and decode the JSON response.
    ///
    /// # Errors
    /// Network, authorization, or service errors; see [`ApiError`].
    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let payload = Payload::Json(serde_json::to_value(body)?);
        let response = self.execute(Method::POST, path, &[], &payload).await?;
        decode(response).await
    }

    /// PUT a JSON body and decode the JSON response.
    ///
    /// # Errors
    /// Network, authorization, or service errors; see [`ApiError`].
    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let payload = Payload::Json(serde_json::to_value(body)?);
        let response = self.execute(Method::PUT, path, &[], &payload).await?;
        decode(response).await
    }

    /// DELETE a resource. The response body, if any, is discarded.
    ///
    /// # Errors
    /// Network, authorization, or service errors; see [`ApiError`].
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(Method::DELETE, path, &[], &Payload::Empty)
            .await?;
        Ok(())
    }

    /// POST a multipart body (file upload) and decode the JSON response.
    ///
    /// # Errors
    /// Network, authorization, or service errors; see [`ApiError`].
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        body: MultipartBody,
    ) -> Result<T> {
        let payload = Payload::Multipart(body);
        let response = self.execute(Method::POST, path, &[], &payload).await?;
        decode(response).await
    }

    /// PUT a multipart body and decode the JSON response.
    ///
    /// # Errors
    /// Network, authorization, or service errors; see [`ApiError`].
    pub async fn put_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        body: MultipartBody,
    ) -> Result<T> {
        let payload = Payload::Multipart(body);
        let response = self.execute(Method::PUT, path, &[], &payload).await?;
        decode(response).await
    }

    /// Send one logical request, replaying at most once after a refresh.
    ///
    /// The attempt counter is explicit and local to this call: concurrent
    /// requests each get their own single replay, with no shared flags.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        payload: &Payload,
    ) -> Result<Response> {
        let mut attempt: u8 = 0;
        loop {
            let response = self
                .dispatch(method.clone(), path, query, payload)
                .await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                if response.status().is_success() {
                    return Ok(response);
                }
                return Err(error_from_response(response).await);
            }

            if attempt == 0 {
                attempt += 1;
                tracing::debug!(path, "401 received; refreshing token and replaying once");
                // A failed refresh has already terminated the session.
                self.session.refresh().await?;
                continue;
            }

            // Second 401 on the same logical request: terminal.
            tracing::warn!(path, "replayed request rejected again; ending session");
            self.session.terminate();
            return Err(ApiError::SessionExpired);
        }
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        payload: &Payload,
    ) -> Result<Response> {
        let url = join_url(&self.base_url, path);
        let mut request = self.http.request(method, &url);

        if let Some(token) = self.session.access_token() {
            request = request.bearer_auth(token);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        request = match payload {
            Payload::Empty => request,
            Payload::Json(value) => request.json(value),
            Payload::Multipart(body) => request.multipart(body.to_form()),
        };

        request.send().await.map_err(map_send_error)
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Join a base URL and a path with exactly one slash between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Map a reqwest send failure onto the error taxonomy.
pub(crate) fn map_send_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(e.to_string())
    }
}

/// Normalize a non-success response into an [`ApiError`], preserving the
/// service's structured field errors when the body carries them.
pub(crate) async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound { resource: url };
    }

    let (message, field_errors) = parse_error_body(&body);
    ApiError::Service {
        status: status.as_u16(),
        message,
        field_errors,
    }
}

/// Extract a display message and per-field messages from an error body.
///
/// Handles the service's two error shapes: `{"detail": "..."}` and
/// `{"field": ["msg", ...]}` (single strings are wrapped). Anything else
/// gets a generic message.
fn parse_error_body(body: &str) -> (String, FieldErrors) {
    let mut field_errors = FieldErrors::new();
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return ("request failed".to_string(), field_errors);
    };

    let mut message = None;
    for (key, value) in map {
        match value {
            Value::String(s) if key == "detail" || key == "message" => {
                message = Some(s);
            }
            Value::String(s) => {
                field_errors.insert(key, vec![s]);
            }
            Value::Array(items) => {
                let messages: Vec<String> = items
                    .into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                if !messages.is_empty() {
                    field_errors.insert(key, messages);
                }
            }
            _ => {}
        }
    }

    let message = message.unwrap_or_else(|| {
        if field_errors.is_empty() {
            "request failed".to_string()
        } else {
            "validation failed".to_string()
        }
    });
    (message, field_errors)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| ApiError::ParseResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(
            join_url("http://x/", "/api/transactions/"),
            "http://x/api/transactions/"
        );
        assert_eq!(
            join_url("http://x", "api/transactions/"),
            "http://x/api/transactions/"
        );
    }

    #[test]
    fn parse_error_body_detail_shape() {
        let (message, fields) = parse_error_body(r#"{"detail":"No active account"}"#);
        assert_eq!(message, "No active account");
        assert!(fields.is_empty());
    }

    #[test]
    fn parse_error_body_field_shape() {
        let (message, fields) =
            parse_error_body(r#"{"amount":["must be positive"],"typeId":"unknown type"}"#);
        assert_eq!(message, "validation failed");
        assert_eq!(fields["amount"], vec!["must be positive".to_string()]);
        assert_eq!(fields["typeId"], vec!["unknown type".to_string()]);
    }

    #[test]
    fn parse_error_body_garbage_gets_generic_message() {
        let (message, fields) = parse_error_body("<html>gateway error</html>");
        assert_eq!(message, "request failed");
        assert!(fields.is_empty());
    }

    #[test]
    fn multipart_body_is_rebuildable() {
        let body = MultipartBody::new()
            .text("description", "receipt")
            .file("attachment", "receipt.png", Some("image/png".into()), vec![1, 2, 3]);
        // Building the form twice must work from the same owned body.
        let _first = body.to_form();
        let _second = body.to_form();
        assert_eq!(body.files.len(), 1);
        assert_eq!(body.texts.len(), 1);
    }
}
