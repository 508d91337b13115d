/// HTTP backend for the hosted service
///
/// Talks to a PostgREST table API under `/rest/v1` and a GoTrue auth API
/// under `/auth/v1`. Every request carries the project's anon key as
/// `apikey`; table requests also carry the session token (or the anon key
/// when signed out) as a bearer token.
///
/// # Error mapping
///
/// | Service code            | Error                          |
/// |-------------------------|--------------------------------|
/// | `42703`, `PGRST204`     | [`RemoteError::SchemaMismatch`] |
/// | `PGRST116`              | [`RemoteError::NotFound`]       |
/// | `23505`                 | [`RemoteError::Conflict`]       |
/// | HTTP 401                | [`RemoteError::NotAuthenticated`] |
/// | auth endpoint 4xx       | [`RemoteError::Auth`]           |

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use reqwest::header::{HeaderValue, CONTENT_RANGE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::query::{Query, Table};
use super::{RemoteError, RemoteResult, RemoteService, Row, SignUpOutcome};
use crate::auth::jwt::inspect_token;
use crate::auth::session::{AuthUser, Session};

/// Connection settings for [`RestRemote`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestConfig {
    /// Project base URL, e.g. `https://xyz.example.co`
    pub url: String,

    /// Public anon key
    pub anon_key: String,

    /// Per-request timeout
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<chrono::DateTime<Utc>>,
}

impl From<GoTrueUser> for AuthUser {
    fn from(user: GoTrueUser) -> Self {
        AuthUser {
            id: user.id,
            email: user.email.unwrap_or_default(),
            email_confirmed_at: user.email_confirmed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: GoTrueUser,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(|| Utc::now() + Duration::seconds(token.expires_in));

        Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user.into(),
        }
    }
}

/// Client for the hosted PostgREST + GoTrue service
#[derive(Debug)]
pub struct RestRemote {
    config: RestConfig,
    http: Client,
    session: RwLock<Option<Session>>,
}

impl RestRemote {
    pub fn new(config: RestConfig) -> RemoteResult<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            http,
            session: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn base(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base(), table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base(), path)
    }

    async fn bearer(&self) -> String {
        match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.config.anon_key.clone(),
        }
    }

    async fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer().await)
    }

    async fn table_request(&self, method: Method, query: &Query) -> RequestBuilder {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(query.to_params());
        self.request(method, self.table_url(query.table))
            .await
            .query(&params)
    }

    async fn send_table(&self, table: Table, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = map_rest_error(table, status.as_u16(), &body);
        debug!(table = %table, status = status.as_u16(), error = %err, "Table request failed");
        Err(err)
    }

    async fn send_auth(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_auth_error(status.as_u16(), &body))
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> RemoteResult<Session> {
        let request = self
            .http
            .post(self.auth_url("token"))
            .header("apikey", &self.config.anon_key)
            .query(&[("grant_type", grant_type)])
            .json(&body);

        let token: TokenResponse = self.send_auth(request).await?.json().await?;
        let session = Session::from(token);
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }
}

#[async_trait]
impl RemoteService for RestRemote {
    fn name(&self) -> &str {
        "rest"
    }

    async fn sign_up(&self, email: &str, password: &str) -> RemoteResult<SignUpOutcome> {
        let request = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.config.anon_key)
            .json(&json!({ "email": email, "password": password }));

        let body: Value = self.send_auth(request).await?.json().await?;

        // With auto-confirm the service answers with a full session,
        // otherwise with the bare user
        if body.get("access_token").is_some() {
            let session = Session::from(serde_json::from_value::<TokenResponse>(body)?);
            *self.session.write().await = Some(session.clone());
            Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            })
        } else {
            let user: GoTrueUser = serde_json::from_value(body)?;
            Ok(SignUpOutcome {
                user: user.into(),
                session: None,
            })
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> RemoteResult<Session> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn sign_out(&self) -> RemoteResult<()> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };

        let request = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&session.access_token);

        // The local session is gone either way
        if let Err(e) = self.send_auth(request).await {
            warn!(error = %e, "Remote sign-out failed");
        }
        Ok(())
    }

    async fn get_user(&self) -> RemoteResult<Option<AuthUser>> {
        if self.session.read().await.is_none() {
            return Ok(None);
        }

        let response = self
            .request(Method::GET, self.auth_url("user"))
            .await
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let user: GoTrueUser = response.json().await?;
                Ok(Some(user.into()))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(map_auth_error(status.as_u16(), &body))
            }
        }
    }

    async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    async fn set_session(&self, session: Session) -> RemoteResult<()> {
        let claims = inspect_token(&session.access_token)
            .map_err(|e| RemoteError::Auth(format!("Invalid session: {}", e)))?;
        if claims.sub != session.user.id {
            return Err(RemoteError::Auth("Invalid session".to_string()));
        }

        if session.is_expired() {
            debug!(user_id = %session.user.id, "Refreshing expired session");
            self.token_grant(
                "refresh_token",
                json!({ "refresh_token": session.refresh_token }),
            )
            .await?;
            return Ok(());
        }

        *self.session.write().await = Some(session);
        Ok(())
    }

    async fn resend_verification_email(&self, email: &str) -> RemoteResult<()> {
        let request = self
            .http
            .post(self.auth_url("resend"))
            .header("apikey", &self.config.anon_key)
            .json(&json!({ "type": "signup", "email": email }));

        self.send_auth(request).await?;
        Ok(())
    }

    async fn select(&self, query: Query) -> RemoteResult<Vec<Row>> {
        if query.is_trivially_empty() {
            return Ok(Vec::new());
        }

        let request = self.table_request(Method::GET, &query).await;
        Ok(self.send_table(query.table, request).await?.json().await?)
    }

    async fn count(&self, query: Query) -> RemoteResult<u64> {
        if query.is_trivially_empty() {
            return Ok(0);
        }

        let query = Query {
            order: None,
            limit: None,
            ..query
        };
        let request = self
            .table_request(Method::HEAD, &query)
            .await
            .header("Prefer", "count=exact");

        let response = self.send_table(query.table, request).await?;
        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v: &HeaderValue| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| RemoteError::Decode("missing Content-Range count".to_string()))
    }

    async fn insert(&self, table: Table, row: Row) -> RemoteResult<Row> {
        let request = self
            .request(Method::POST, self.table_url(table))
            .await
            .header("Prefer", "return=representation")
            .json(&row);

        let mut rows: Vec<Row> = self.send_table(table, request).await?.json().await?;
        if rows.is_empty() {
            return Err(RemoteError::Decode(format!("insert into {} returned no row", table)));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(&self, query: Query, patch: Row) -> RemoteResult<Vec<Row>> {
        if query.is_trivially_empty() {
            return Ok(Vec::new());
        }

        let request = self
            .table_request(Method::PATCH, &query)
            .await
            .header("Prefer", "return=representation")
            .json(&patch);

        Ok(self.send_table(query.table, request).await?.json().await?)
    }

    async fn delete(&self, query: Query) -> RemoteResult<u64> {
        if query.is_trivially_empty() {
            return Ok(0);
        }

        let request = self
            .table_request(Method::DELETE, &query)
            .await
            .header("Prefer", "return=representation");

        let rows: Vec<Row> = self.send_table(query.table, request).await?.json().await?;
        Ok(rows.len() as u64)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    /// String for PostgREST, number for GoTrue
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn text(&self, fallback: &str) -> String {
        self.message
            .as_ref()
            .or(self.msg.as_ref())
            .or(self.error_description.as_ref())
            .or(self.error.as_ref())
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Maps a failed table response to an error
fn map_rest_error(table: Table, status: u16, body: &str) -> RemoteError {
    let parsed = ErrorBody::parse(body);
    let message = parsed.text(body);

    match parsed.code.as_ref().and_then(Value::as_str) {
        Some("42703") | Some("PGRST204") => RemoteError::SchemaMismatch {
            table,
            column: missing_column(&message).unwrap_or_else(|| "unknown".to_string()),
        },
        Some("PGRST116") => RemoteError::NotFound(table),
        Some("23505") => RemoteError::Conflict(message),
        _ if status == 401 => RemoteError::NotAuthenticated,
        _ => RemoteError::Service { status, message },
    }
}

/// Maps a failed auth response to an error
fn map_auth_error(status: u16, body: &str) -> RemoteError {
    let message = ErrorBody::parse(body).text(body);
    if (400..500).contains(&status) {
        RemoteError::Auth(message)
    } else {
        RemoteError::Service { status, message }
    }
}

/// Pulls the column name out of a missing-column message
///
/// Handles `column chores.archived does not exist` and
/// `Could not find the 'archived' column of 'chores' in the schema cache`.
fn missing_column(message: &str) -> Option<String> {
    if let Some(rest) = message.strip_prefix("column ") {
        let qualified = rest.split(" does not exist").next()?;
        let column = qualified.rsplit('.').next()?;
        return Some(column.trim_matches('"').to_string());
    }

    let mut quoted = message.split('\'');
    quoted.next()?;
    quoted.next().map(str::to_string)
}

/// Reads the total from a `Content-Range` header such as `0-9/42` or `*/0`
fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}
