//! Login handshake payloads.
//!
//! The captcha/slider UI flow lives outside this crate; the engine only
//! carries the challenge bytes to the embedder and the solution back.

use serde::{Deserialize, Serialize};

use crate::session::SigInfo;

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub uin: i64,
    pub password_digest: [u8; 16],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CaptchaSubmitRequest {
    pub result: String,
    pub sign: Vec<u8>,
}

/// Captcha challenge forwarded to the embedder for solving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaChallenge {
    pub image: Vec<u8>,
    pub sign: Vec<u8>,
}

/// Wire-level login answer. The credential bundle is stored into the
/// session by the decoder; the public [`LoginResponse`] carries only
/// what the caller acts on.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LoginRspWire {
    pub success: bool,
    pub nickname: Option<String>,
    pub captcha: Option<CaptchaChallenge>,
    pub error_message: Option<String>,
    pub sig: Option<SigInfo>,
}

/// Outcome of a login (or captcha-submission) round.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub success: bool,
    /// Present when the server demands captcha verification before
    /// completing the login.
    pub captcha: Option<CaptchaChallenge>,
    pub error_message: Option<String>,
}
