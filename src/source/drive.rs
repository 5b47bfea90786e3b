//! Google Drive フォルダ一覧
//!
//! フォルダごとに `files.list` を `nextPageToken` がなくなるまで呼び出し、
//! 画像ファイル (id, name) をダウンロードURL付きのリソースに変換する。

use super::ResourceSource;
use crate::auth::Session;
use crate::error::{LinkerError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use sku_image_common::ResourceEntry;

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, webContentLink)";

/// 一覧APIの1ページ
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePage {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl DriveFile {
    /// 認証なしで取得できる直接ダウンロードURL
    pub fn download_url(&self) -> String {
        format!("https://drive.google.com/uc?export=download&id={}", self.id)
    }
}

/// フォルダ内画像の1ページ取得
#[async_trait]
pub trait FileListing: Send + Sync {
    async fn list_page(&self, folder_id: &str, page_token: Option<&str>) -> Result<FilePage>;
}

/// Drive API v3 クライアント
pub struct DriveClient {
    client: reqwest::Client,
    session: Session,
    files_url: String,
}

impl DriveClient {
    pub fn new(session: Session) -> Self {
        Self::with_endpoint(session, FILES_URL)
    }

    /// 一覧エンドポイントを差し替える（ローカルサーバーでのテスト用）
    pub fn with_endpoint(session: Session, files_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            session,
            files_url: files_url.into(),
        }
    }
}

fn image_query(folder_id: &str) -> String {
    format!("'{}' in parents and mimeType contains 'image/'", folder_id)
}

#[async_trait]
impl FileListing for DriveClient {
    async fn list_page(&self, folder_id: &str, page_token: Option<&str>) -> Result<FilePage> {
        let q = image_query(folder_id);
        let mut params = vec![("q", q.as_str()), ("spaces", "drive"), ("fields", LIST_FIELDS)];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let resp = self
            .client
            .get(&self.files_url)
            .bearer_auth(self.session.access_token())
            .query(&params)
            .send()
            .await
            .map_err(|e| LinkerError::remote("Drive 一覧の取得に失敗", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LinkerError::Remote(format!(
                "Drive 一覧の取得に失敗 ({}): {}",
                status.as_u16(),
                body
            )));
        }

        resp.json()
            .await
            .map_err(|e| LinkerError::remote("Drive 一覧の応答が不正", e))
    }
}

pub struct DriveSource<L> {
    listing: L,
    folder_ids: Vec<String>,
}

impl<L: FileListing> DriveSource<L> {
    pub fn new(listing: L, folder_ids: Vec<String>) -> Self {
        Self {
            listing,
            folder_ids,
        }
    }

    /// 1フォルダ分を全ページ取得
    async fn list_folder(&self, folder_id: &str, out: &mut Vec<ResourceEntry>) -> Result<()> {
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .listing
                .list_page(folder_id, page_token.as_deref())
                .await?;
            pages += 1;
            tracing::debug!(folder_id, page = pages, files = page.files.len(), "drive page");

            out.extend(
                page.files
                    .iter()
                    .map(|file| ResourceEntry::new(file.name.clone(), file.download_url())),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<L: FileListing> ResourceSource for DriveSource<L> {
    fn name(&self) -> &'static str {
        "drive"
    }

    async fn enumerate(&self) -> Result<Vec<ResourceEntry>> {
        let mut entries = Vec::new();
        for folder_id in &self.folder_ids {
            let before = entries.len();
            self.list_folder(folder_id, &mut entries).await?;
            tracing::info!(folder_id = %folder_id, files = entries.len() - before, "listed drive folder");
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// (folder, page_token) ごとに決まったページを返す
    struct ScriptedListing {
        pages: HashMap<(String, Option<String>), FilePage>,
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedListing {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn page(mut self, folder: &str, token: Option<&str>, names: &[&str], next: Option<&str>) -> Self {
            let files = names
                .iter()
                .map(|n| DriveFile {
                    id: format!("id-{}", n),
                    name: n.to_string(),
                })
                .collect();
            self.pages.insert(
                (folder.to_string(), token.map(String::from)),
                FilePage {
                    files,
                    next_page_token: next.map(String::from),
                },
            );
            self
        }
    }

    #[async_trait]
    impl FileListing for ScriptedListing {
        async fn list_page(&self, folder_id: &str, page_token: Option<&str>) -> Result<FilePage> {
            let key = (folder_id.to_string(), page_token.map(String::from));
            self.calls.lock().unwrap().push(key.clone());
            self.pages
                .get(&key)
                .cloned()
                .ok_or_else(|| LinkerError::Remote(format!("unexpected request: {:?}", key)))
        }
    }

    #[tokio::test]
    async fn test_three_pages_accumulate_in_order() {
        let listing = ScriptedListing::new()
            .page("f1", None, &["a.jpg", "b.jpg"], Some("t1"))
            .page("f1", Some("t1"), &["c.jpg"], Some("t2"))
            .page("f1", Some("t2"), &["d.jpg", "e.jpg"], None);
        let source = DriveSource::new(listing, vec!["f1".into()]);

        let entries = source.enumerate().await.unwrap();
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"]);
        assert_eq!(source.listing.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_multiple_folders_sequential() {
        let listing = ScriptedListing::new()
            .page("f1", None, &["one.jpg"], None)
            .page("f2", None, &[], Some("x"))
            .page("f2", Some("x"), &["two.jpg"], None);
        let source = DriveSource::new(listing, vec!["f1".into(), "f2".into()]);

        let entries = source.enumerate().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "https://drive.google.com/uc?export=download&id=id-one.jpg");
        assert_eq!(entries[1].label, "two.jpg");
        assert!(entries.iter().all(|e| e.parent.is_none()));

        let calls = source.listing.calls.lock().unwrap();
        assert_eq!(calls[0].0, "f1");
        assert_eq!(calls[2], ("f2".to_string(), Some("x".to_string())));
    }

    #[tokio::test]
    async fn test_page_failure_propagates() {
        let listing = ScriptedListing::new().page("f1", None, &["a.jpg"], Some("missing"));
        let source = DriveSource::new(listing, vec!["f1".into()]);

        let result = source.enumerate().await;
        assert!(matches!(result, Err(LinkerError::Remote(_))));
    }

    #[test]
    fn test_file_page_deserialize() {
        let json = r#"{"nextPageToken": "tok", "files": [{"id": "1AbC", "name": "SKU1.jpg"}]}"#;
        let page: FilePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("tok"));
        assert_eq!(page.files[0].name, "SKU1.jpg");

        let last: FilePage = serde_json::from_str("{}").unwrap();
        assert!(last.files.is_empty());
        assert!(last.next_page_token.is_none());
    }

    #[test]
    fn test_image_query() {
        assert_eq!(
            image_query("1mkRG"),
            "'1mkRG' in parents and mimeType contains 'image/'"
        );
    }
}
