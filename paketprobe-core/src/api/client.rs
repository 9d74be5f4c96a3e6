use std::time::Duration;

use bytes::Bytes;
use paketprobe_http::{HttpClient, HttpRequest, HttpResponse};
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::types::{
    Credentials, FavoriteRequest, NewPaket, PaketQuery, PasswordChange, ProfileUpdate,
    Registration,
};
use crate::{Error, Result};

pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(10);

/// Bearer token obtained from register or login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    /// Parsed JSON body; non-JSON bodies are wrapped as `{"raw": text}`.
    pub body: Value,
}

impl ApiReply {
    fn from_response(res: &HttpResponse) -> Self {
        let body = serde_json::from_slice::<Value>(&res.body).unwrap_or_else(|_| {
            json!({ "raw": String::from_utf8_lossy(&res.body) })
        });
        Self {
            status: res.status,
            body,
        }
    }

    /// The body's `success` flag.
    pub fn success(&self) -> bool {
        self.body
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn data(&self) -> &Value {
        self.body.get("data").unwrap_or(&Value::Null)
    }

    pub fn message(&self) -> Option<&str> {
        self.body
            .get("message")
            .or_else(|| self.body.get("error"))
            .and_then(Value::as_str)
    }

    /// Short status line used in step reports.
    pub fn describe(&self) -> String {
        match self.message() {
            Some(msg) => format!("status {} success={} ({msg})", self.status, self.success()),
            None => format!("status {} success={}", self.status, self.success()),
        }
    }
}

/// Reply of register/login; carries a session when authentication succeeded.
#[derive(Debug, Clone)]
pub struct AuthReply {
    pub reply: ApiReply,
    pub session: Option<Session>,
}

impl AuthReply {
    fn new(reply: ApiReply, expected_status: u16) -> Self {
        let session = (reply.status == expected_status && reply.success())
            .then(|| reply.body.get("token").and_then(Value::as_str))
            .flatten()
            .map(Session::new);
        Self { reply, session }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, req: HttpRequest, session: Option<&Session>) -> Result<ApiReply> {
        let mut req = req
            .with_header("content-type", "application/json")
            .with_timeout(self.timeout);
        if let Some(session) = session {
            req = req.with_bearer(session.token());
        }

        let method = req.method.clone();
        let url = req.url.clone();
        let res = self.http.request(req).await?;
        let reply = ApiReply::from_response(&res);
        tracing::debug!(%method, %url, status = reply.status, success = reply.success(), "api call");
        Ok(reply)
    }

    async fn get(&self, path: &str, session: Option<&Session>) -> Result<ApiReply> {
        self.send(HttpRequest::get(self.url(path)), session).await
    }

    async fn delete(&self, path: &str, session: Option<&Session>) -> Result<ApiReply> {
        self.send(HttpRequest::delete(self.url(path)), session).await
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        session: Option<&Session>,
    ) -> Result<ApiReply> {
        let body = Bytes::from(serde_json::to_vec(body)?);
        self.send(HttpRequest::post(self.url(path), body), session)
            .await
    }

    async fn put<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        session: Option<&Session>,
    ) -> Result<ApiReply> {
        let body = Bytes::from(serde_json::to_vec(body)?);
        self.send(HttpRequest::put(self.url(path), body), session)
            .await
    }

    pub async fn health(&self) -> Result<ApiReply> {
        self.get("/health", None).await
    }

    pub async fn api_docs(&self) -> Result<ApiReply> {
        self.get("/api", None).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<AuthReply> {
        let reply = self.post("/api/auth/register", registration, None).await?;
        Ok(AuthReply::new(reply, 201))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthReply> {
        let reply = self
            .post("/api/auth/login", &Credentials { email, password }, None)
            .await?;
        Ok(AuthReply::new(reply, 200))
    }

    pub async fn profile(&self, session: &Session) -> Result<ApiReply> {
        self.get("/api/users/profile", Some(session)).await
    }

    pub async fn update_profile(&self, session: &Session, update: &ProfileUpdate) -> Result<ApiReply> {
        self.put("/api/users/profile", update, Some(session)).await
    }

    pub async fn change_password(
        &self,
        session: &Session,
        change: &PasswordChange,
    ) -> Result<ApiReply> {
        self.put("/api/users/change-password", change, Some(session))
            .await
    }

    pub async fn delete_account(&self, session: &Session) -> Result<ApiReply> {
        self.delete("/api/users/account", Some(session)).await
    }

    pub async fn list_paket(&self, query: &PaketQuery) -> Result<ApiReply> {
        let url = url::Url::parse_with_params(&self.url("/api/paket"), query.pairs())
            .map_err(|_| Error::InvalidBaseUrl(self.base_url.clone()))?;
        self.send(HttpRequest::get(url.as_str()), None).await
    }

    pub async fn get_paket(&self, id: u64) -> Result<ApiReply> {
        self.get(&format!("/api/paket/{id}"), None).await
    }

    pub async fn create_paket(&self, paket: &NewPaket) -> Result<ApiReply> {
        self.post("/api/paket", paket, None).await
    }

    /// Partial update; only the given fields change.
    pub async fn update_paket(&self, id: u64, fields: &Map<String, Value>) -> Result<ApiReply> {
        self.put(&format!("/api/paket/{id}"), fields, None).await
    }

    pub async fn delete_paket(&self, id: u64) -> Result<ApiReply> {
        self.delete(&format!("/api/paket/{id}"), None).await
    }

    pub async fn favorites(&self, session: &Session) -> Result<ApiReply> {
        self.get("/api/favorites", Some(session)).await
    }

    pub async fn add_favorite(&self, session: &Session, request: &FavoriteRequest) -> Result<ApiReply> {
        self.post("/api/favorites", request, Some(session)).await
    }

    pub async fn remove_favorite(&self, session: &Session, md5_hash: &str) -> Result<ApiReply> {
        self.delete(&format!("/api/favorites/{md5_hash}"), Some(session))
            .await
    }

    pub async fn check_favorite(&self, session: &Session, md5_hash: &str) -> Result<ApiReply> {
        self.get(&format!("/api/favorites/check/{md5_hash}"), Some(session))
            .await
    }

    pub async fn favorites_stats(&self, session: &Session) -> Result<ApiReply> {
        self.get("/api/favorites/stats", Some(session)).await
    }

    pub async fn clear_favorites(&self, session: &Session) -> Result<ApiReply> {
        self.delete("/api/favorites", Some(session)).await
    }
}
