//! 画像リソースの列挙
//!
//! どちらのソースも [`ResourceSource`] として (label, url) の列を返す:
//! - drive: Google Drive フォルダ内の画像（ページング）
//! - sitemap: image 拡張付きサイトマップ

pub mod drive;
pub mod sitemap;

pub use drive::{DriveClient, DriveFile, DriveSource, FileListing, FilePage};
pub use sitemap::SitemapSource;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::error::{LinkerError, Result};
use async_trait::async_trait;
use sku_image_common::ResourceEntry;

#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// ログ表示用の名前
    fn name(&self) -> &'static str;

    /// リソースを列挙（途中で失敗したら即エラー、再試行なし）
    async fn enumerate(&self) -> Result<Vec<ResourceEntry>>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceKind {
    #[default]
    Drive,
    Sitemap,
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drive" | "gdrive" => Ok(SourceKind::Drive),
            "sitemap" => Ok(SourceKind::Sitemap),
            _ => Err(format!("Unknown source: {}. Use drive or sitemap", s)),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Drive => write!(f, "drive"),
            SourceKind::Sitemap => write!(f, "sitemap"),
        }
    }
}

/// 設定に従ってソースを用意する（Drive の場合はここで認証する）
pub async fn open_source(
    kind: SourceKind,
    config: &Config,
    authenticator: &dyn Authenticator,
) -> Result<Box<dyn ResourceSource>> {
    match kind {
        SourceKind::Drive => {
            if config.drive.folder_ids.is_empty() {
                return Err(LinkerError::Config(
                    "Drive フォルダIDが設定されていません。`sku-linker config --add-folder ID` で追加してください".into(),
                ));
            }
            let session = authenticator.authenticate().await?;
            Ok(Box::new(DriveSource::new(
                DriveClient::new(session),
                config.drive.folder_ids.clone(),
            )))
        }
        SourceKind::Sitemap => {
            let url = config.sitemap_url.clone().ok_or_else(|| {
                LinkerError::Config(
                    "サイトマップURLが設定されていません。`--sitemap-url` か `config --set-sitemap-url` で指定してください".into(),
                )
            })?;
            Ok(Box::new(SitemapSource::new(url)))
        }
    }
}
