//! 画像の保存と公開URLへの置き換え
//!
//! 照合した画像を `{SKU}.jpg` としてダウンロードフォルダに保存し、
//! リンクを静的ホスティング（GitHub raw）のURLに書き換える。
//! ダウンロード失敗は1件ごとに報告し、処理は継続する。

use crate::config::PublishConfig;
use crate::error::{LinkerError, Result};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use sku_image_common::MatchRecord;
use std::path::{Component, Path, PathBuf};

/// 公開URLテンプレート
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostingTemplate {
    pub username: String,
    pub repository: String,
    pub branch: String,
}

impl HostingTemplate {
    pub fn url_for(&self, file_name: &str) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/refs/heads/{}/{}",
            self.username, self.repository, self.branch, file_name
        )
    }
}

impl From<&PublishConfig> for HostingTemplate {
    fn from(config: &PublishConfig) -> Self {
        Self {
            username: config.username.clone(),
            repository: config.repository.clone(),
            branch: config.branch.clone(),
        }
    }
}

/// 保存ファイル名（実際の形式に関わらず .jpg）
pub fn image_file_name(sku: &str) -> String {
    format!("{}.jpg", sku)
}

/// 保存先パス（SKUがフォルダ外を指す場合はエラー）
pub fn image_destination(folder: &Path, sku: &str) -> Result<PathBuf> {
    let file_name = image_file_name(sku);
    let mut components = Path::new(&file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(folder.join(file_name)),
        _ => Err(LinkerError::Download(format!(
            "{}: 保存先がダウンロードフォルダの外になります",
            file_name
        ))),
    }
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LinkerError::Download(format!("{}: {}", url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LinkerError::Download(format!("{}: HTTP {}", url, status.as_u16())));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| LinkerError::Download(format!("{}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }
}

/// 1件分の公開結果
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub record: MatchRecord,
    /// ダウンロード失敗時のメッセージ
    pub error: Option<String>,
}

pub struct Publisher<F> {
    fetcher: F,
    folder: PathBuf,
    hosting: HostingTemplate,
}

impl<F: ImageFetcher> Publisher<F> {
    pub fn new(fetcher: F, folder: PathBuf, hosting: HostingTemplate) -> Self {
        Self {
            fetcher,
            folder,
            hosting,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    async fn download(&self, record: &MatchRecord) -> Result<PathBuf> {
        let dest = image_destination(&self.folder, &record.sku)?;
        let bytes = self.fetcher.fetch(&record.link).await?;
        tokio::fs::write(&dest, bytes)
            .await
            .map_err(|e| LinkerError::Download(format!("{}: {}", dest.display(), e)))?;
        Ok(dest)
    }

    /// 1件を保存してリンクを置き換える（失敗してもリンクは置き換える）
    pub async fn publish(&self, record: &MatchRecord) -> PublishOutcome {
        let file_name = image_file_name(&record.sku);

        let error = match self.download(record).await {
            Ok(dest) => {
                tracing::debug!(sku = %record.sku, path = %dest.display(), "downloaded image");
                None
            }
            Err(e) => Some(e.to_string()),
        };

        PublishOutcome {
            record: MatchRecord {
                sku: record.sku.clone(),
                ean: record.ean.clone(),
                link: self.hosting.url_for(&file_name),
            },
            error,
        }
    }

    /// 全件を順に公開（フォルダ作成失敗のみ致命的）
    pub async fn publish_all(&self, records: &[MatchRecord]) -> Result<Vec<PublishOutcome>> {
        tokio::fs::create_dir_all(&self.folder).await?;

        let pb = ProgressBar::new(records.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("  {bar:30} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            pb.set_message(record.sku.clone());
            let outcome = self.publish(record).await;
            if let Some(err) = &outcome.error {
                pb.suspend(|| tracing::warn!(sku = %record.sku, error = %err, "image download failed"));
            }
            outcomes.push(outcome);
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(outcomes)
    }
}
