use crate::error::{LinkerError, Result};
use serde::{Deserialize, Serialize};
use sku_image_common::DEFAULT_RECORD_ELEMENT;
use std::path::{Path, PathBuf};

/// アクセストークンを直接渡す環境変数（設定ファイルより優先）
pub const TOKEN_ENV: &str = "GOOGLE_DRIVE_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog_path: PathBuf,
    pub record_element: String,
    /// 省略時は公開の有無で決まる
    pub output_csv: Option<PathBuf>,
    /// 省略時は公開の有無で決まる
    pub link_column: Option<String>,
    pub drive: DriveConfig,
    pub sitemap_url: Option<String>,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Google OAuth クライアントシークレット（JSON）
    pub credentials_file: PathBuf,
    pub folder_ids: Vec<String>,
    /// OAuth コールバックを受けるローカルポート
    pub callback_port: u16,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub enabled: bool,
    pub download_folder: PathBuf,
    pub username: String,
    pub repository: String,
    pub branch: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("products.xml"),
            record_element: DEFAULT_RECORD_ELEMENT.into(),
            output_csv: None,
            link_column: None,
            drive: DriveConfig::default(),
            sitemap_url: None,
            publish: PublishConfig::default(),
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from("client_secret.json"),
            folder_ids: Vec::new(),
            callback_port: 8080,
            access_token: None,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            download_folder: PathBuf::from("images"),
            username: String::new(),
            repository: String::new(),
            branch: "main".into(),
        }
    }
}

impl Config {
    /// 設定を読み込み（`path` 省略時は既定パス、ファイルがなければ既定値）
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            tracing::debug!(path = %config_path.display(), "loaded config");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| LinkerError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("sku-image-linker").join("config.json"))
    }

    /// Drive アクセストークン（環境変数を優先）
    pub fn drive_token(&self) -> Option<String> {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.is_empty() {
                return Some(token);
            }
        }

        self.drive.access_token.clone()
    }

    /// 出力CSVのパス
    pub fn output_path(&self) -> PathBuf {
        self.output_csv.clone().unwrap_or_else(|| {
            if self.publish.enabled {
                PathBuf::from("sku_ean_github_links.csv")
            } else {
                PathBuf::from("sku_ean_image_links.csv")
            }
        })
    }

    /// CSVのリンク列名
    pub fn link_column(&self) -> String {
        self.link_column.clone().unwrap_or_else(|| {
            if self.publish.enabled {
                "GitHubLink".into()
            } else {
                "ImageURL".into()
            }
        })
    }

    /// 公開設定が揃っているか確認
    pub fn validate_publish(&self) -> Result<()> {
        if !self.publish.enabled {
            return Ok(());
        }
        if self.publish.username.is_empty() || self.publish.repository.is_empty() {
            return Err(LinkerError::Config(
                "画像公開にはユーザー名とリポジトリが必要です。`sku-linker config --set-hosting USER/REPO` で設定してください".into(),
            ));
        }
        Ok(())
    }
}
