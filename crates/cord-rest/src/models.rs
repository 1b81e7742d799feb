//! Request and response bodies

use cord_core::Snowflake;
use serde::{Deserialize, Serialize};

/// Channel type of a public thread
pub const THREAD_TYPE_PUBLIC: u8 = 11;

/// Result of a password login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Logged in; the token is also stored on the client
    Token(String),
    /// A TOTP code must be submitted with this ticket
    MfaRequired { ticket: String },
    /// The platform wants a captcha solved first
    CaptchaRequired { sitekey: Option<String> },
}

/// Invite as returned by `POST /invites/{code}`
#[derive(Debug, Clone, Deserialize)]
pub struct Invite {
    pub code: String,
    #[serde(default)]
    pub guild: Option<InviteGuild>,
    #[serde(default)]
    pub channel: Option<InviteChannel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteGuild {
    pub id: Snowflake,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteChannel {
    pub id: Snowflake,
    #[serde(default)]
    pub name: Option<String>,
}

/// Thread channel created from a message
#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: Snowflake,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
}

// === Wire bodies ===

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub login: &'a str,
    pub password: &'a str,
    pub undelete: bool,
    pub captcha_key: Option<&'a str>,
    pub login_source: Option<&'a str>,
    pub gift_code_sku_id: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub mfa: bool,
    #[serde(default)]
    pub ticket: Option<String>,
    #[serde(default)]
    pub captcha_key: Option<Vec<String>>,
    #[serde(default)]
    pub captcha_sitekey: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TotpRequest<'a> {
    pub code: &'a str,
    pub ticket: &'a str,
    pub login_source: Option<&'a str>,
    pub gift_code_sku_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateThreadRequest<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub kind: u8,
    pub auto_archive_duration: u32,
    pub location: &'a str,
}

/// Error body the API sends with 4xx/5xx responses
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
