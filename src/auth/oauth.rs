//! インストールアプリ向け OAuth 認可フロー
//!
//! 1. クライアントシークレットJSONを読み込む
//! 2. 同意画面URLをブラウザで開く（PKCE S256 + state）
//! 3. `127.0.0.1:<port>` でリダイレクトを1回だけ受け取る（axum）
//! 4. 認可コードをアクセストークンに交換する

use super::{Authenticator, Session};
use crate::error::{LinkerError, Result};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// コールバックを待ち受けるアドレス（リダイレクトURIと一致させる）
const LOOPBACK_HOST: &str = "127.0.0.1";

const SUCCESS_PAGE: &str = "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>sku-linker</title></head>\
<body><p>The authentication flow has completed. You may close this window.</p></body></html>";

const FAILURE_PAGE: &str = "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>sku-linker</title></head>\
<body><p>The authentication flow has failed. Check the terminal for details.</p></body></html>";

/// 応答送信後にサーバーの終了を待つ上限
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// クライアントシークレット（`installed` / `web` セクション）
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.into()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.into()
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretsFile = serde_json::from_str(json)
            .map_err(|e| LinkerError::Auth(format!("クライアントシークレットが不正: {}", e)))?;
        file.installed.or(file.web).ok_or_else(|| {
            LinkerError::Auth("クライアントシークレットに installed / web セクションがありません".into())
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LinkerError::Auth(format!(
                "クライアントシークレットを読み込めません ({}): {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

struct Pkce {
    verifier: String,
    challenge: String,
}

impl Pkce {
    fn generate() -> Self {
        let verifier = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self { verifier, challenge }
    }
}

pub struct InstalledAppFlow {
    credentials_file: PathBuf,
    port: u16,
    client: reqwest::Client,
}

impl InstalledAppFlow {
    pub fn new(credentials_file: PathBuf, port: u16) -> Self {
        Self {
            credentials_file,
            port,
            client: reqwest::Client::new(),
        }
    }

    fn redirect_uri(&self) -> String {
        format!("http://{}:{}/", LOOPBACK_HOST, self.port)
    }

    fn authorization_url(
        &self,
        secrets: &ClientSecrets,
        state: &str,
        pkce: &Pkce,
    ) -> Result<url::Url> {
        let redirect_uri = self.redirect_uri();
        url::Url::parse_with_params(
            &secrets.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("scope", DRIVE_READONLY_SCOPE),
                ("state", state),
                ("access_type", "offline"),
                ("code_challenge", pkce.challenge.as_str()),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| LinkerError::Auth(format!("auth_uri が不正: {}", e)))
    }

    async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        pkce: &Pkce,
    ) -> Result<Session> {
        let redirect_uri = self.redirect_uri();
        let mut form = vec![
            ("code", code),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("code_verifier", pkce.verifier.as_str()),
        ];
        if let Some(secret) = secrets.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let resp = self
            .client
            .post(&secrets.token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| LinkerError::Auth(format!("トークン交換に失敗: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LinkerError::Auth(format!(
                "トークン交換に失敗 ({}): {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| LinkerError::Auth(format!("トークン応答が不正: {}", e)))?;
        Ok(Session::new(token.access_token))
    }
}

#[async_trait]
impl Authenticator for InstalledAppFlow {
    async fn authenticate(&self) -> Result<Session> {
        let secrets = ClientSecrets::load(&self.credentials_file)?;
        let state = uuid::Uuid::new_v4().simple().to_string();
        let pkce = Pkce::generate();
        let auth_url = self.authorization_url(&secrets, &state, &pkce)?;

        let listener = TcpListener::bind((LOOPBACK_HOST, self.port))
            .await
            .map_err(|e| {
                LinkerError::Auth(format!("ポート {} を開けません: {}", self.port, e))
            })?;

        println!("ブラウザで以下のURLを開いて認可してください:\n{}\n", auth_url);
        if let Err(e) = open::that(auth_url.as_str()) {
            tracing::warn!(error = %e, "failed to open browser");
        }

        let code = receive_callback(listener, state).await?;
        tracing::info!("authorization code received");
        self.exchange_code(&secrets, &code, &pkce).await
    }
}

/// コールバックのクエリを解釈
///
/// # Returns
/// * `Ok(Some(code))` - 認可コードを受け取った
/// * `Ok(None)` - 認可と無関係なリクエスト
/// * `Err` - 認可拒否または state 不一致
pub fn callback_outcome(
    params: &HashMap<String, String>,
    expected_state: &str,
) -> Result<Option<String>> {
    if let Some(error) = params.get("error") {
        return Err(LinkerError::Auth(format!("認可が拒否されました: {}", error)));
    }
    let Some(code) = params.get("code") else {
        return Ok(None);
    };
    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(LinkerError::Auth("state が一致しません".into()));
    }
    Ok(Some(code.clone()))
}

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    result_tx: Arc<Mutex<Option<oneshot::Sender<Result<String>>>>>,
}

async fn handle_callback(
    State(callback): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Html<String>) {
    let outcome = match callback_outcome(&params, &callback.expected_state) {
        Ok(None) => return (StatusCode::NOT_FOUND, Html(String::new())),
        outcome => outcome,
    };

    let response = match &outcome {
        Ok(_) => (StatusCode::OK, Html(SUCCESS_PAGE.to_string())),
        Err(_) => (StatusCode::BAD_REQUEST, Html(FAILURE_PAGE.to_string())),
    };

    // 最初の1回だけ結果を渡す
    let sender = callback.result_tx.lock().ok().and_then(|mut tx| tx.take());
    if let Some(tx) = sender {
        let _ = tx.send(outcome.and_then(|code| {
            code.ok_or_else(|| LinkerError::Auth("認可コードがありません".into()))
        }));
    }
    response
}

/// リダイレクトを1回受け取って認可コードを返す
pub async fn receive_callback(listener: TcpListener, expected_state: String) -> Result<String> {
    let (result_tx, result_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = Router::new()
        .route("/", get(handle_callback))
        .with_state(CallbackState {
            expected_state: expected_state.into(),
            result_tx: Arc::new(Mutex::new(Some(result_tx))),
        });

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown_rx.await;
    });
    let mut server = tokio::spawn(async move { server.await });

    let outcome = tokio::select! {
        received = result_rx => received
            .map_err(|_| LinkerError::Auth("コールバックサーバーが停止しました".into()))?,
        finished = &mut server => {
            return Err(LinkerError::Auth(format!(
                "コールバックサーバーが終了しました: {:?}",
                finished
            )));
        }
    };

    let _ = shutdown_tx.send(());
    if tokio::time::timeout(SHUTDOWN_GRACE, server).await.is_err() {
        tracing::debug!("callback server did not shut down in time");
    }
    tracing::debug!(ok = outcome.is_ok(), "oauth callback");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_secrets_installed() {
        let json = r#"{"installed": {"client_id": "id.apps", "client_secret": "s3cret",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["http://localhost"]}}"#;
        let secrets = ClientSecrets::from_json(json).unwrap();
        assert_eq!(secrets.client_id, "id.apps");
        assert_eq!(secrets.client_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_client_secrets_web_with_defaults() {
        let secrets = ClientSecrets::from_json(r#"{"web": {"client_id": "w"}}"#).unwrap();
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
        assert_eq!(secrets.auth_uri, DEFAULT_AUTH_URI);
    }

    #[test]
    fn test_client_secrets_invalid() {
        assert!(matches!(ClientSecrets::from_json("{}"), Err(LinkerError::Auth(_))));
        assert!(matches!(ClientSecrets::from_json("nope"), Err(LinkerError::Auth(_))));
    }

    #[test]
    fn test_client_secrets_missing_file() {
        let result = ClientSecrets::load(Path::new("/nonexistent/client_secret.json"));
        assert!(matches!(result, Err(LinkerError::Auth(_))));
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_callback_outcome_code() {
        let params = query(&[("state", "abc"), ("code", "4/0Ad"), ("scope", "drive")]);
        assert_eq!(callback_outcome(&params, "abc").unwrap(), Some("4/0Ad".to_string()));
    }

    #[test]
    fn test_callback_outcome_state_mismatch() {
        let params = query(&[("state", "evil"), ("code", "x")]);
        assert!(matches!(callback_outcome(&params, "abc"), Err(LinkerError::Auth(_))));

        let params = query(&[("code", "x")]);
        assert!(matches!(callback_outcome(&params, "abc"), Err(LinkerError::Auth(_))));
    }

    #[test]
    fn test_callback_outcome_denied() {
        let params = query(&[("error", "access_denied"), ("state", "abc")]);
        assert!(matches!(callback_outcome(&params, "abc"), Err(LinkerError::Auth(_))));
    }

    #[test]
    fn test_callback_outcome_unrelated_request() {
        assert_eq!(callback_outcome(&HashMap::new(), "abc").unwrap(), None);
    }

    async fn callback_server(state: &str) -> (String, tokio::task::JoinHandle<Result<String>>) {
        let listener = TcpListener::bind((LOOPBACK_HOST, 0)).await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(receive_callback(listener, state.to_string()));
        (base, handle)
    }

    #[tokio::test]
    async fn test_receive_callback_returns_code() {
        let (base, handle) = callback_server("abc").await;
        let client = reqwest::Client::new();

        let favicon = client.get(format!("{}/favicon.ico", base)).send().await.unwrap();
        assert_eq!(favicon.status(), reqwest::StatusCode::NOT_FOUND);
        let bare = client.get(format!("{}/", base)).send().await.unwrap();
        assert_eq!(bare.status(), reqwest::StatusCode::NOT_FOUND);

        let resp = client
            .get(format!("{}/?state=abc&code=4%2F0Ad&scope=drive", base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let content_type = resp.headers()[reqwest::header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
        assert!(resp.text().await.unwrap().contains("You may close this window"));

        assert_eq!(handle.await.unwrap().unwrap(), "4/0Ad");
    }

    #[tokio::test]
    async fn test_receive_callback_denied() {
        let (base, handle) = callback_server("abc").await;

        let resp = reqwest::get(format!("{}/?error=access_denied&state=abc", base))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

        assert!(matches!(handle.await.unwrap(), Err(LinkerError::Auth(_))));
    }

    #[test]
    fn test_authorization_url_carries_pkce() {
        let flow = InstalledAppFlow::new(PathBuf::from("unused.json"), 8080);
        let secrets = ClientSecrets::from_json(r#"{"installed": {"client_id": "cid"}}"#).unwrap();
        let pkce = Pkce::generate();

        let url = flow.authorization_url(&secrets, "st", &pkce).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(pairs["client_id"], "cid");
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:8080/");
        assert_eq!(pairs["scope"], DRIVE_READONLY_SCOPE);
        assert_eq!(pairs["state"], "st");
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["code_challenge"], pkce.challenge);
        assert_eq!(pkce.verifier.len(), 64);
    }
}
