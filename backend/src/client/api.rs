//! HTTP adapter for the HomeStock API.
//!
//! `ApiClient` owns a cookie-carrying `reqwest::Client`, so the session
//! token set by the login endpoint is replayed on every later request and
//! never surfaces to the caller. Every 401 outside of login invalidates the
//! shared `SessionHandle` and drops the cookie from the jar.

use super::error::{ClientError, ClientResult, ErrorKind};
use super::optimistic::InventoryRemote;
use super::session::SessionHandle;
use crate::api::common::{ApiResponse, PaginatedData};
use crate::auth::cookie::SESSION_COOKIE;
use crate::auth::models::{LoginResponse, MessageResponse, UserInfo};
use crate::database::models::{
    Category, CreateCategory, CreateItem, CreateUnit, Item, ItemPatch, StockPatch, Unit,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{RequestBuilder, StatusCode, Url, cookie::Jar, header::IF_UNMODIFIED_SINCE};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Page size used when walking the whole item list.
const FETCH_ALL_PAGE_SIZE: u32 = 100;

pub struct ApiClient {
    http: reqwest::Client,
    cookies: Arc<Jar>,
    base_url: String,
    origin: Url,
    session: SessionHandle,
    request_timeout: Duration,
}

impl ApiClient {
    /// Creates an adapter for `base_url` (scheme, host and port, no trailing
    /// path). `request_timeout` bounds the login, logout and session check calls.
    pub fn new(
        base_url: impl Into<String>,
        session: SessionHandle,
        request_timeout: Duration,
    ) -> ClientResult<Self> {
        Self::with_cookie_jar(base_url, session, request_timeout, Arc::new(Jar::default()))
    }

    /// Like [`ApiClient::new`], but keeps cookies in `cookies`, which may be
    /// shared with other clients of the same host.
    pub fn with_cookie_jar(
        base_url: impl Into<String>,
        session: SessionHandle,
        request_timeout: Duration,
        cookies: Arc<Jar>,
    ) -> ClientResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let origin = Url::parse(&base_url).map_err(|e| {
            ClientError::new(ErrorKind::Unexpected, format!("Invalid base URL: {}", e))
        })?;
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .build()?;

        Ok(Self {
            http,
            cookies,
            base_url,
            origin,
            session,
            request_timeout,
        })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Submits the login form. On success the session becomes
    /// `Authenticated`; on any failure it returns to `Anonymous`.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<String> {
        self.session.begin_authentication();

        let request = self
            .http
            .post(self.url("/api/auth/token"))
            .form(&[("username", username), ("password", password)])
            .timeout(self.request_timeout);

        match self.submit_login(request).await {
            Ok(username) => {
                self.session.set_authenticated(&username);
                Ok(username)
            }
            Err(error) => {
                debug!(error = %error, "Login failed");
                self.session.reset();
                Err(error)
            }
        }
    }

    async fn submit_login(&self, request: RequestBuilder) -> ClientResult<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let parsed: LoginResponse = parse_body(&body)?;
            return Ok(parsed.username);
        }

        let mut error = ClientError::from_response(status, &body);
        if status == StatusCode::UNAUTHORIZED {
            error.kind = ErrorKind::InvalidCredentials;
        }
        Err(error)
    }

    /// Ends the session on the server and locally. Never fails: when the
    /// server cannot be reached the cookie is still dropped from the jar and
    /// the local state reset.
    pub async fn logout(&self) {
        let request = self
            .http
            .post(self.url("/api/auth/logout"))
            .timeout(self.request_timeout);

        if let Err(error) = self.send_json::<MessageResponse>(request).await {
            warn!(error = %error, "Server logout failed, local session cleared anyway");
        }
        self.forget_session_cookie();
        self.session.reset();
    }

    /// Checks the current session. Adopts the username if the cookie is
    /// still valid, e.g. on application start.
    pub async fn me(&self) -> ClientResult<UserInfo> {
        let request = self
            .http
            .get(self.url("/api/auth/me"))
            .timeout(self.request_timeout);

        let user: UserInfo = self.send_json(request).await?;
        if self.session.username().as_deref() != Some(user.username.as_str()) {
            self.session.set_authenticated(&user.username);
        }
        Ok(user)
    }

    pub async fn register(&self, username: &str, password: &str) -> ClientResult<UserInfo> {
        let request = self
            .http
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": username, "password": password }));
        self.send_json(request).await
    }

    /// Changes the password. The server revokes every session of the user,
    /// so the local session ends with an `Invalidated` event.
    pub async fn change_password(&self, current: &str, new: &str) -> ClientResult<()> {
        let request = self
            .http
            .patch(self.url("/api/auth/me/password"))
            .json(&json!({ "current_password": current, "new_password": new }));

        self.send_json::<MessageResponse>(request).await?;
        self.end_session();
        Ok(())
    }

    pub async fn change_username(&self, current: &str, new: &str) -> ClientResult<UserInfo> {
        let request = self
            .http
            .patch(self.url("/api/auth/me/username"))
            .json(&json!({ "current_password": current, "new_username": new }));

        let user = self.send_json(request).await?;
        self.end_session();
        Ok(user)
    }

    pub async fn delete_account(&self, current: &str) -> ClientResult<()> {
        let request = self
            .http
            .delete(self.url("/api/auth/me"))
            .json(&json!({ "current_password": current }));

        self.send_json::<MessageResponse>(request).await?;
        self.end_session();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    pub async fn list_items(
        &self,
        page: u32,
        per_page: u32,
        search: Option<&str>,
    ) -> ClientResult<PaginatedData<Item>> {
        let mut query = vec![
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        if let Some(q) = search {
            query.push(("q", q.to_string()));
        }

        let request = self.http.get(self.url("/api/items")).query(&query);
        self.send_envelope(request).await
    }

    /// Walks every page of the item list.
    pub async fn fetch_all_items(&self) -> ClientResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.list_items(page, FETCH_ALL_PAGE_SIZE, None).await?;
            let done = batch.items.is_empty() || items.len() + batch.items.len() >= batch.total as usize;
            items.extend(batch.items);
            if done {
                return Ok(items);
            }
            page += 1;
        }
    }

    pub async fn get_item(&self, id: i64) -> ClientResult<Item> {
        let request = self.http.get(self.url(&format!("/api/items/{}", id)));
        self.send_envelope(request).await
    }

    pub async fn create_item(&self, item: &CreateItem) -> ClientResult<Item> {
        let request = self.http.post(self.url("/api/items")).json(item);
        self.send_envelope(request).await
    }

    pub async fn update_item(
        &self,
        id: i64,
        patch: &ItemPatch,
        since: Option<DateTime<Utc>>,
    ) -> ClientResult<Item> {
        let request = self
            .http
            .patch(self.url(&format!("/api/items/{}", id)))
            .json(patch);
        self.send_envelope(with_precondition(request, since)).await
    }

    pub async fn patch_stock(
        &self,
        id: i64,
        patch: &StockPatch,
        since: Option<DateTime<Utc>>,
    ) -> ClientResult<Item> {
        let request = self
            .http
            .patch(self.url(&format!("/api/items/{}/stock", id)))
            .json(patch);
        self.send_envelope(with_precondition(request, since)).await
    }

    pub async fn delete_item(&self, id: i64) -> ClientResult<()> {
        let request = self.http.delete(self.url(&format!("/api/items/{}", id)));
        self.send_json::<ApiResponse<Value>>(request).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reference data
    // ------------------------------------------------------------------

    pub async fn list_categories(&self) -> ClientResult<Vec<Category>> {
        let request = self
            .http
            .get(self.url("/api/data/categories"))
            .query(&[("per_page", FETCH_ALL_PAGE_SIZE)]);
        let page: PaginatedData<Category> = self.send_envelope(request).await?;
        Ok(page.items)
    }

    pub async fn create_category(&self, category: &CreateCategory) -> ClientResult<Category> {
        let request = self
            .http
            .post(self.url("/api/data/categories"))
            .json(category);
        self.send_envelope(request).await
    }

    pub async fn list_units(&self) -> ClientResult<Vec<Unit>> {
        let request = self
            .http
            .get(self.url("/api/data/units"))
            .query(&[("per_page", FETCH_ALL_PAGE_SIZE)]);
        let page: PaginatedData<Unit> = self.send_envelope(request).await?;
        Ok(page.items)
    }

    pub async fn create_unit(&self, unit: &CreateUnit) -> ClientResult<Unit> {
        let request = self.http.post(self.url("/api/data/units")).json(unit);
        self.send_envelope(request).await
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return parse_body(&body);
        }

        let error = ClientError::from_response(status, &body);
        if error.is(ErrorKind::Unauthenticated) {
            self.end_session();
        }
        Err(error)
    }

    /// The server no longer honours this session.
    fn end_session(&self) {
        self.forget_session_cookie();
        self.session.invalidate();
    }

    fn forget_session_cookie(&self) {
        let expired = format!("{}=; Path=/; Max-Age=0", SESSION_COOKIE);
        self.cookies.add_cookie_str(&expired, &self.origin);
    }

    async fn send_envelope<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let envelope: ApiResponse<T> = self.send_json(request).await?;
        envelope
            .data
            .ok_or_else(|| ClientError::new(ErrorKind::Unexpected, "Response carried no data"))
    }
}

fn with_precondition(request: RequestBuilder, since: Option<DateTime<Utc>>) -> RequestBuilder {
    match since {
        Some(timestamp) => request.header(
            IF_UNMODIFIED_SINCE,
            timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ),
        None => request,
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> ClientResult<T> {
    serde_json::from_str(body).map_err(|e| {
        ClientError::new(ErrorKind::Unexpected, format!("Malformed response: {}", e))
    })
}

#[async_trait]
impl InventoryRemote for ApiClient {
    async fn fetch_items(&self) -> ClientResult<Vec<Item>> {
        self.fetch_all_items().await
    }

    async fn update_item(
        &self,
        id: i64,
        patch: &ItemPatch,
        since: Option<DateTime<Utc>>,
    ) -> ClientResult<Item> {
        ApiClient::update_item(self, id, patch, since).await
    }

    async fn patch_stock(
        &self,
        id: i64,
        patch: &StockPatch,
        since: Option<DateTime<Utc>>,
    ) -> ClientResult<Item> {
        ApiClient::patch_stock(self, id, patch, since).await
    }

    async fn delete_item(&self, id: i64) -> ClientResult<()> {
        ApiClient::delete_item(self, id).await
    }
}
