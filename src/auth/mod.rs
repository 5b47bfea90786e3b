//! Google Drive 認証
//!
//! [`Authenticator`] が認証済みセッションを返す。実装は2種類:
//! - [`StaticToken`]: 既存のアクセストークンをそのまま使う（環境変数・設定・テスト用）
//! - [`InstalledAppFlow`]: ブラウザ + ローカルコールバックによる OAuth 認可

mod oauth;

pub use oauth::{callback_outcome, receive_callback, ClientSecrets, InstalledAppFlow, DRIVE_READONLY_SCOPE};

use crate::config::Config;
use crate::error::{LinkerError, Result};
use async_trait::async_trait;

/// 認証済みセッション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    access_token: String,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<Session>;
}

/// 固定トークン
pub struct StaticToken(pub String);

#[async_trait]
impl Authenticator for StaticToken {
    async fn authenticate(&self) -> Result<Session> {
        if self.0.is_empty() {
            return Err(LinkerError::Auth("アクセストークンが空です".into()));
        }
        Ok(Session::new(self.0.clone()))
    }
}

/// 設定から認証方法を選ぶ（トークンがあればそれを使い、なければ OAuth フロー）
pub fn authenticator_from_config(config: &Config) -> Box<dyn Authenticator> {
    match config.drive_token() {
        Some(token) => {
            tracing::debug!("using preconfigured Drive access token");
            Box::new(StaticToken(token))
        }
        None => Box::new(InstalledAppFlow::new(
            config.drive.credentials_file.clone(),
            config.drive.callback_port,
        )),
    }
}
