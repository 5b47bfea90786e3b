use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkerError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("XML解析エラー: {0}")]
    Parse(String),

    #[error("認証エラー: {0}")]
    Auth(String),

    #[error("リモート取得エラー: {0}")]
    Remote(String),

    #[error("画像ダウンロードエラー: {0}")]
    Download(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("CSV出力エラー: {0}")]
    Csv(#[from] csv::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] sku_image_common::Error),
}

impl LinkerError {
    /// HTTPエラーをリモート取得エラーに変換
    pub fn remote(context: &str, err: reqwest::Error) -> Self {
        LinkerError::Remote(format!("{}: {}", context, err))
    }

    /// 文書の解読・解析エラーを Parse に変換（`origin` はファイルパスやURL）
    pub fn parse(origin: &str, err: sku_image_common::Error) -> Self {
        match err {
            sku_image_common::Error::Xml(_) | sku_image_common::Error::Encoding(_) => {
                LinkerError::Parse(format!("{}: {}", origin, err))
            }
            other => other.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkerError>;
