//! REST client

use crate::error::{RestError, RestResult};
use crate::models::{
    ApiErrorBody, CreateThreadRequest, Invite, LoginOutcome, LoginRequest, LoginResponse, Thread,
    TokenResponse, TotpRequest, THREAD_TYPE_PUBLIC,
};
use cord_common::RestConfig;
use cord_core::{CreateMessage, Message, Snowflake};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for one account
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl RestClient {
    /// Build a client from configuration
    ///
    /// # Errors
    /// Returns [`RestError::Http`] if the TLS backend cannot be initialized
    pub fn new(config: &RestConfig) -> RestResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("cord/", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::info!(base_url = %config.base_url, "REST client initialized");

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // === Authentication ===

    /// Log in with an account name and password
    ///
    /// The returned token is not stored; pass it to [`set_token`](Self::set_token).
    pub async fn login(&self, login: &str, password: &str) -> RestResult<LoginOutcome> {
        let body = LoginRequest {
            login,
            password,
            undelete: false,
            captcha_key: None,
            login_source: None,
            gift_code_sku_id: None,
        };

        let response = self.http.post(self.url("/auth/login")).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        let parsed: LoginResponse = serde_json::from_str(&text).unwrap_or_default();

        if parsed.captcha_key.is_some() {
            tracing::warn!(status = %status, "Login requires a captcha");
            return Ok(LoginOutcome::CaptchaRequired {
                sitekey: parsed.captcha_sitekey,
            });
        }
        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        if let Some(token) = parsed.token {
            tracing::info!("Logged in");
            return Ok(LoginOutcome::Token(token));
        }
        match parsed.ticket {
            Some(ticket) if parsed.mfa => {
                tracing::info!("Login requires a TOTP code");
                Ok(LoginOutcome::MfaRequired { ticket })
            }
            _ => Err(RestError::Api {
                status,
                message: parsed
                    .message
                    .unwrap_or_else(|| "login response carried no token".to_string()),
            }),
        }
    }

    /// Finish an MFA login with a TOTP code; returns the token
    pub async fn submit_totp(&self, code: &str, ticket: &str) -> RestResult<String> {
        let body = TotpRequest {
            code,
            ticket,
            login_source: None,
            gift_code_sku_id: None,
        };

        let response = self.http.post(self.url("/auth/mfa/totp")).json(&body).send().await?;
        let TokenResponse { token } = parse_json(response, StatusCode::OK).await?;
        tracing::info!("TOTP accepted");
        Ok(token)
    }

    // === Messages ===

    /// Post a message; a plain string becomes `{ "content": ... }`
    pub async fn send_message(
        &self,
        channel_id: Snowflake,
        message: impl Into<CreateMessage>,
    ) -> RestResult<Message> {
        let body = message.into();
        let request = self
            .authorized_post(&format!("/channels/{channel_id}/messages"))?
            .json(&body);

        let message: Message = parse_json(request.send().await?, StatusCode::OK).await?;
        tracing::debug!(channel_id = %channel_id, message_id = %message.id, "Message sent");
        Ok(message)
    }

    /// Show the typing indicator in a channel
    pub async fn send_typing(&self, channel_id: Snowflake) -> RestResult<()> {
        let response = self
            .authorized_post(&format!("/channels/{channel_id}/typing"))?
            .send()
            .await?;
        expect_status(response, StatusCode::NO_CONTENT).await
    }

    /// Start a public thread from an existing message
    pub async fn create_thread(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        name: &str,
        auto_archive_minutes: u32,
    ) -> RestResult<Thread> {
        let body = CreateThreadRequest {
            name,
            kind: THREAD_TYPE_PUBLIC,
            auto_archive_duration: auto_archive_minutes,
            location: "Message",
        };
        let request = self
            .authorized_post(&format!("/channels/{channel_id}/messages/{message_id}/threads"))?
            .json(&body);

        let thread: Thread = parse_json(request.send().await?, StatusCode::CREATED).await?;
        tracing::debug!(channel_id = %channel_id, thread_id = %thread.id, "Thread created");
        Ok(thread)
    }

    // === Guilds ===

    /// Accept an invite given as a URL or a bare code
    pub async fn join_guild(&self, invite: &str) -> RestResult<Invite> {
        let code = parse_invite_code(invite)?;
        let request = self
            .authorized_post(&format!("/invites/{code}"))?
            .json(&serde_json::json!({}));

        let invite: Invite = parse_json(request.send().await?, StatusCode::OK).await?;
        tracing::info!(
            code = %invite.code,
            guild = invite.guild.as_ref().map_or("", |g| g.name.as_str()),
            "Joined guild"
        );
        Ok(invite)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized_post(&self, path: &str) -> RestResult<RequestBuilder> {
        let token = self.token.as_deref().ok_or(RestError::MissingToken)?;
        Ok(self.http.post(self.url(path)).header(AUTHORIZATION, token))
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

/// Extract the invite code from `https://discord.gg/abc`, `discord.gg/abc` or `abc`
///
/// # Errors
/// Returns [`RestError::InvalidInvite`] if no code can be found
pub fn parse_invite_code(invite: &str) -> RestResult<String> {
    let trimmed = invite.trim();
    let invalid = || RestError::InvalidInvite(invite.to_string());

    let candidate = if trimmed.contains("://") {
        let url = Url::parse(trimmed).map_err(|_| invalid())?;
        url.path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .map(str::to_string)
            .ok_or_else(invalid)?
    } else {
        trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .split('/')
            .rfind(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(invalid)?
    };

    // A bare host such as "discord.gg" is not a code
    if candidate.is_empty() || !candidate.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid());
    }
    Ok(candidate)
}

async fn parse_json<T: DeserializeOwned>(response: Response, expected: StatusCode) -> RestResult<T> {
    let status = response.status();
    if status != expected {
        let text = response.text().await.unwrap_or_default();
        return Err(api_error(status, &text));
    }
    Ok(response.json().await?)
}

async fn expect_status(response: Response, expected: StatusCode) -> RestResult<()> {
    let status = response.status();
    if status == expected {
        return Ok(());
    }
    let text = response.text().await.unwrap_or_default();
    Err(api_error(status, &text))
}

fn api_error(status: StatusCode, body: &str) -> RestError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        });
    tracing::warn!(status = %status, message = %message, "API request failed");
    RestError::Api { status, message }
}
