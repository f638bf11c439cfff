//! Media-provider token client
//!
//! One `POST` to the token endpoint before connecting. The response carries
//! the provider URL and a short-lived participant token.

use serde::{Deserialize, Serialize};
use vroom_core::{VroomError, VroomResult};

/// Room joined when none is given
pub const DEFAULT_ROOM_NAME: &str = "vroom-demo";

/// Token request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    pub room_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_name: Option<String>,
    #[serde(default)]
    pub is_guest: bool,
}

impl TokenRequest {
    pub fn account(room_name: impl Into<String>) -> Self {
        TokenRequest {
            room_name: room_name.into(),
            participant_name: None,
            is_guest: false,
        }
    }

    pub fn guest(room_name: impl Into<String>, name: impl Into<String>) -> Self {
        TokenRequest {
            room_name: room_name.into(),
            participant_name: Some(name.into()),
            is_guest: true,
        }
    }
}

/// Token response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub server_url: String,
    pub participant_token: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// HTTP client for the token endpoint
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    endpoint: String,
}

impl TokenClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        TokenClient {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch a token. A blank room name joins [`DEFAULT_ROOM_NAME`]. Error
    /// bodies of the form `{"error": "..."}` become the message of the
    /// returned [`VroomError::Token`].
    pub async fn fetch(&self, request: &TokenRequest) -> VroomResult<TokenResponse> {
        let room_name = match request.room_name.trim() {
            "" => DEFAULT_ROOM_NAME,
            trimmed => trimmed,
        };
        let body = TokenRequest {
            room_name: room_name.to_string(),
            ..request.clone()
        };

        tracing::debug!(room = room_name, guest = body.is_guest, "Requesting media token");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| VroomError::Token(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("Token request failed: {}", status.as_u16()));
            tracing::warn!(status = status.as_u16(), "Token endpoint refused: {}", message);
            return Err(VroomError::Token(message));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| VroomError::Token(format!("malformed token response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/token")
    }

    #[test]
    fn test_request_body_shape() {
        let account = serde_json::to_value(TokenRequest::account("vroom-demo")).unwrap();
        assert_eq!(account, json!({"room_name": "vroom-demo", "is_guest": false}));

        let guest = serde_json::to_value(TokenRequest::guest("abcd-efgh", "Guest")).unwrap();
        assert_eq!(
            guest,
            json!({"room_name": "abcd-efgh", "participant_name": "Guest", "is_guest": true})
        );
    }

    #[tokio::test]
    async fn test_fetch_token() {
        let app = Router::new().route(
            "/api/token",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["room_name"], "abcd-efgh");
                assert_eq!(body["is_guest"], true);
                Json(json!({
                    "server_url": "wss://media.example",
                    "participant_token": format!("token-for-{}", body["participant_name"].as_str().unwrap_or("")),
                }))
            }),
        );
        let client = TokenClient::new(serve(app).await);

        let token = client
            .fetch(&TokenRequest::guest("  abcd-efgh ", "Bo"))
            .await
            .unwrap();

        assert_eq!(token.server_url, "wss://media.example");
        assert_eq!(token.participant_token, "token-for-Bo");
    }

    #[tokio::test]
    async fn test_error_body_surfaced() {
        let app = Router::new().route(
            "/api/token",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Failed to generate token"})),
                )
            }),
        );
        let client = TokenClient::new(serve(app).await);

        let err = client
            .fetch(&TokenRequest::account("vroom-demo"))
            .await
            .unwrap_err();

        assert_eq!(err, VroomError::Token("Failed to generate token".into()));
        assert!(err.is_user_visible());
    }

    #[tokio::test]
    async fn test_status_without_error_body() {
        let app = Router::new().route("/api/token", post(|| async { StatusCode::BAD_GATEWAY }));
        let client = TokenClient::new(serve(app).await);

        let err = client
            .fetch(&TokenRequest::account("vroom-demo"))
            .await
            .unwrap_err();

        assert_eq!(err, VroomError::Token("Token request failed: 502".into()));
    }

    #[tokio::test]
    async fn test_blank_room_joins_default() {
        let app = Router::new().route(
            "/api/token",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "server_url": "wss://media.example",
                    "participant_token": body["room_name"],
                }))
            }),
        );
        let client = TokenClient::new(serve(app).await);

        let token = client.fetch(&TokenRequest::account("   ")).await.unwrap();
        assert_eq!(token.participant_token, DEFAULT_ROOM_NAME);
    }
}
