use super::ResourceSource;
use crate::error::{LinkerError, Result};
use async_trait::async_trait;
use sku_image_common::{decode_xml, parse_sitemap_images, ResourceEntry};

/// image 拡張付きサイトマップ
pub struct SitemapSource {
    client: reqwest::Client,
    url: String,
}

impl SitemapSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LinkerError::remote("サイトマップの取得に失敗", e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LinkerError::Remote(format!(
                "サイトマップの取得に失敗 ({}): {}",
                status.as_u16(),
                self.url
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| LinkerError::remote("サイトマップの読み込みに失敗", e))?;
        Ok(body.to_vec())
    }
}

/// サイトマップ本文をリソースに変換（XML不正は Parse エラー）
pub fn sitemap_entries(url: &str, body: &[u8]) -> Result<Vec<ResourceEntry>> {
    decode_xml(body)
        .and_then(|xml| parse_sitemap_images(&xml))
        .map_err(|e| LinkerError::parse(url, e))
}

#[async_trait]
impl ResourceSource for SitemapSource {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    async fn enumerate(&self) -> Result<Vec<ResourceEntry>> {
        let body = self.fetch().await?;
        let entries = sitemap_entries(&self.url, &body)?;
        tracing::info!(url = %self.url, images = entries.len(), "parsed sitemap");
        Ok(entries)
    }
}
