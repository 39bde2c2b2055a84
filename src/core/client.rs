//! Authenticated HTTP client for the Repolens API.
//!
//! Every outbound call goes through [`ApiClient::execute`], which
//! attaches the stored bearer token and, on a 401, coordinates a
//! single-flight token refresh through the [`RefreshGate`]: one refresh
//! call per expiry event no matter how many requests are in flight, with
//! every parked request replayed against the same new token.
//!
//! Refresh failure surfaces as [`ApiError::Unauthenticated`]; the client
//! clears the credential store but performs no navigation of its own.
//! The shell decides how to send the user back to login.

use std::fmt;
use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::models::RepoBasicInfo;
use crate::api::{
    AnalyseData, AnalyseRequest, ChatAnswer, ChatHistoryData, Envelope, LoginData, LoginRequest,
    Paginated, QuestionRequest, RefreshResponse, RegisterRequest, RepoFacet, UserProfile,
};
use crate::auth::{CredentialStoreError, TokenStore};
use crate::core::refresh::{GateRole, RefreshFailed, RefreshGate};
use crate::utils::url::construct_api_url;

#[derive(Debug)]
pub enum ApiError {
    /// No valid session: the token refresh failed or no credentials are
    /// stored. The caller owns the "log in again" reaction.
    Unauthenticated,
    /// The wire failed: connection, TLS, or a body that was not JSON.
    Transport(reqwest::Error),
    /// A request payload could not be encoded as JSON.
    Encode(serde_json::Error),
    Store(CredentialStoreError),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthenticated => write!(f, "not authenticated; please log in again"),
            ApiError::Transport(err) => write!(f, "request failed: {}", err),
            ApiError::Encode(err) => write!(f, "could not encode request payload: {}", err),
            ApiError::Store(err) => write!(f, "credential store error: {}", err),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Unauthenticated => None,
            ApiError::Transport(err) => Some(err),
            ApiError::Encode(err) => Some(err),
            ApiError::Store(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err)
    }
}

impl From<CredentialStoreError> for ApiError {
    fn from(err: CredentialStoreError) -> Self {
        ApiError::Store(err)
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
    gate: RefreshGate,
}

impl ApiClient {
    pub fn new(base_url: String, tokens: Arc<TokenStore>) -> Self {
        ApiClient {
            http: reqwest::Client::new(),
            base_url,
            tokens,
            gate: RefreshGate::new(),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = self
            .http
            .request(method, url)
            .header("Content-Type", "application/json")
            .header("Cache-Control", "no-cache");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Perform a request with bearer attachment and transparent
    /// single-flight refresh on 401.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = construct_api_url(&self.base_url, path);
        let used_token = self.tokens.access_token()?;
        let response = self
            .dispatch(method.clone(), &url, query, body.as_ref(), used_token.as_deref())
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        match self.gate.begin() {
            GateRole::Leader => {
                // A sibling may have rotated the pair between our failed
                // send and winning the gate; reuse its token instead of
                // burning another single-use refresh token.
                let current = self.tokens.access_token()?;
                if let Some(token) =
                    current.filter(|current| Some(current.as_str()) != used_token.as_deref())
                {
                    self.gate.complete(Ok(token.clone()));
                    return self
                        .dispatch(method, &url, query, body.as_ref(), Some(&token))
                        .await;
                }

                debug!("access token rejected; refreshing");
                match self.refresh_tokens().await {
                    Ok(access) => {
                        self.gate.complete(Ok(access.clone()));
                        self.dispatch(method, &url, query, body.as_ref(), Some(&access))
                            .await
                    }
                    Err(err) => {
                        warn!("token refresh failed: {err}");
                        if let Err(err) = self.tokens.clear() {
                            warn!("could not clear credential store: {err}");
                        }
                        self.gate.complete(Err(RefreshFailed));
                        Err(ApiError::Unauthenticated)
                    }
                }
            }
            GateRole::Queued(rx) => match rx.await {
                Ok(Ok(token)) => {
                    self.dispatch(method, &url, query, body.as_ref(), Some(&token))
                        .await
                }
                Ok(Err(_)) | Err(_) => Err(ApiError::Unauthenticated),
            },
        }
    }

    async fn refresh_tokens(&self) -> Result<String, ApiError> {
        let Some(refresh_token) = self.tokens.refresh_token()? else {
            return Err(ApiError::Unauthenticated);
        };

        let url = construct_api_url(&self.base_url, "users/refresh-token");
        let response = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Unauthenticated);
        }

        let rotated: RefreshResponse = response.json().await?;
        self.tokens
            .set_pair(&rotated.access_token, &rotated.refresh_token)?;
        Ok(rotated.access_token)
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Envelope<T>, ApiError> {
        let response = self.execute(Method::GET, path, query, None).await?;
        Ok(response.json().await?)
    }

    async fn post_envelope<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ApiError> {
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(ApiError::Encode)?;
        let response = self.execute(Method::POST, path, &[], body).await?;
        Ok(response.json().await?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Envelope<LoginData>, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post_envelope("users/login", Some(&body)).await
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Envelope<UserProfile>, ApiError> {
        let body = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post_envelope("users/register", Some(&body)).await
    }

    pub async fn logout(&self) -> Result<Envelope<Value>, ApiError> {
        self.post_envelope("users/logout", None::<&Value>).await
    }

    pub async fn repo_history(
        &self,
        query: Option<&str>,
    ) -> Result<Envelope<Paginated<RepoBasicInfo>>, ApiError> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(term) = query {
            params.push(("query", term));
        }
        self.get_envelope("users/repo-history", &params).await
    }

    pub async fn analyse(&self, repo_url: &str) -> Result<Envelope<AnalyseData>, ApiError> {
        let body = AnalyseRequest {
            url: repo_url.to_string(),
        };
        self.post_envelope("repository/analyse", Some(&body)).await
    }

    /// Fetch repository info, untyped: which facet shape comes back is
    /// only known after classification.
    pub async fn repo_info(
        &self,
        repo_id: &str,
        facet: Option<RepoFacet>,
    ) -> Result<Envelope<Value>, ApiError> {
        let path = format!("repository/getRepoInfo/{repo_id}");
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(facet) = facet {
            params.push(("info", facet.query_value()));
        }
        self.get_envelope(&path, &params).await
    }

    pub async fn ask(&self, repo_id: &str, question: &str) -> Result<Envelope<ChatAnswer>, ApiError> {
        let body = QuestionRequest {
            question: question.to_string(),
        };
        self.post_envelope(&format!("aiChat/chat/{repo_id}"), Some(&body))
            .await
    }

    pub async fn chat_history(&self, repo_id: &str) -> Result<Envelope<ChatHistoryData>, ApiError> {
        self.get_envelope(&format!("aiChat/chat-history/{repo_id}"), &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_server::{CannedResponse, RecordedRequest, TestApiServer};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn empty_history_envelope() -> String {
        json!({
            "statusCode": 200,
            "success": true,
            "message": "",
            "data": { "messages": [], "chatId": "c1" }
        })
        .to_string()
    }

    fn client_with_tokens(base_url: &str, access: &str, refresh: &str) -> (Arc<ApiClient>, Arc<TokenStore>) {
        let store = Arc::new(TokenStore::in_memory());
        store.set_pair(access, refresh).unwrap();
        let client = Arc::new(ApiClient::new(base_url.to_string(), Arc::clone(&store)));
        (client, store)
    }

    #[tokio::test]
    async fn attaches_bearer_token_and_disables_caching() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_handler = Arc::clone(&seen);
        let server = TestApiServer::start(Arc::new(move |req: RecordedRequest| {
            seen_in_handler
                .lock()
                .unwrap()
                .push((req.path.clone(), req.authorization.clone()));
            CannedResponse::json(200, empty_history_envelope())
        }))
        .await;

        let (client, _store) = client_with_tokens(&server.base_url, "t1", "r1");
        client.chat_history("abc").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "/aiChat/chat-history/abc");
        assert_eq!(seen[0].1.as_deref(), Some("Bearer t1"));
    }

    #[tokio::test]
    async fn omits_authorization_without_a_stored_token() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_handler = Arc::clone(&seen);
        let server = TestApiServer::start(Arc::new(move |req: RecordedRequest| {
            seen_in_handler.lock().unwrap().push(req.authorization.clone());
            CannedResponse::json(200, empty_history_envelope())
        }))
        .await;

        let client = ApiClient::new(server.base_url.clone(), Arc::new(TokenStore::in_memory()));
        client.chat_history("abc").await.unwrap();
        assert_eq!(seen.lock().unwrap()[0], None);
    }

    #[tokio::test]
    async fn concurrent_401s_trigger_exactly_one_refresh() {
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let refresh_in_handler = Arc::clone(&refresh_calls);
        let server = TestApiServer::start(Arc::new(move |req: RecordedRequest| {
            match req.path.as_str() {
                "/users/refresh-token" => {
                    refresh_in_handler.fetch_add(1, Ordering::SeqCst);
                    // Slow refresh so sibling 401s pile up behind the gate.
                    CannedResponse::json(
                        200,
                        json!({ "accessToken": "fresh", "refreshToken": "r2" }).to_string(),
                    )
                    .with_delay(Duration::from_millis(50))
                }
                _ if req.authorization.as_deref() == Some("Bearer fresh") => {
                    CannedResponse::json(200, empty_history_envelope())
                }
                _ => CannedResponse::json(
                    401,
                    json!({ "success": false, "message": "jwt expired" }).to_string(),
                ),
            }
        }))
        .await;

        let (client, store) = client_with_tokens(&server.base_url, "stale", "r1");

        let mut tasks = Vec::new();
        for _ in 0..3 {
            let client = Arc::clone(&client);
            tasks.push(tokio::spawn(async move { client.chat_history("abc").await }));
        }
        for task in tasks {
            let envelope = task.await.unwrap().unwrap();
            assert!(envelope.success);
        }

        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.access_token().unwrap().as_deref(), Some("fresh"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn refresh_failure_clears_credentials_and_reports_unauthenticated() {
        let server = TestApiServer::start(Arc::new(|req: RecordedRequest| {
            if req.path == "/users/refresh-token" {
                CannedResponse::json(
                    401,
                    json!({ "success": false, "message": "Refresh token expired" }).to_string(),
                )
            } else {
                CannedResponse::json(
                    401,
                    json!({ "success": false, "message": "jwt expired" }).to_string(),
                )
            }
        }))
        .await;

        let (client, store) = client_with_tokens(&server.base_url, "stale", "dead");

        let err = client.chat_history("abc").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
        assert!(store.access_token().unwrap().is_none());
        assert!(store.refresh_token().unwrap().is_none());
    }

    #[tokio::test]
    async fn business_failures_come_back_as_envelopes_not_errors() {
        let server = TestApiServer::start(Arc::new(|_req| {
            CannedResponse::json(
                200,
                json!({
                    "statusCode": 200,
                    "success": false,
                    "message": "AI could not generate a response right now.",
                    "data": null
                })
                .to_string(),
            )
        }))
        .await;

        let (client, _store) = client_with_tokens(&server.base_url, "t1", "r1");
        let envelope = client.ask("abc", "why?").await.unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.message, "AI could not generate a response right now.");
        assert!(envelope.data.is_none());
    }
}
