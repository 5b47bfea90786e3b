use crate::config::Config;
use crate::source::SourceKind;
use clap::{Args, Parser, Subcommand};
use sku_image_common::MatchMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sku-linker")]
#[command(about = "商品カタログ(SKU/EAN)と画像URLを照合してCSVを生成", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 設定ファイル（デフォルト: ~/.config/sku-image-linker/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// 画像ソースの指定
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// 画像ソース (drive/sitemap)
    #[arg(short, long, default_value = "drive")]
    pub source: SourceKind,

    /// Drive フォルダID（複数指定可、設定より優先）
    #[arg(short, long = "folder")]
    pub folders: Vec<String>,

    /// サイトマップURL（設定より優先）
    #[arg(long)]
    pub sitemap_url: Option<String>,
}

impl SourceArgs {
    pub fn apply(&self, config: &mut Config) {
        if !self.folders.is_empty() {
            config.drive.folder_ids = self.folders.clone();
        }
        if let Some(url) = &self.sitemap_url {
            config.sitemap_url = Some(url.clone());
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// カタログと画像を照合してCSVを出力
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// 商品カタログXML
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// 出力CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 画像をダウンロードして公開URLに置き換える
        #[arg(short, long)]
        download: bool,

        /// 照合モード (substring/token)
        #[arg(short, long, default_value = "substring")]
        match_mode: MatchMode,

        /// CSVのリンク列名
        #[arg(long)]
        link_column: Option<String>,
    },

    /// 画像リソースを一覧表示
    List {
        #[command(flatten)]
        source: SourceArgs,

        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 設定を表示/編集
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// Drive フォルダIDを追加
        #[arg(long)]
        add_folder: Vec<String>,

        /// サイトマップURLを設定
        #[arg(long)]
        set_sitemap_url: Option<String>,

        /// 公開先を設定 (USER/REPO)
        #[arg(long)]
        set_hosting: Option<String>,

        /// 公開先ブランチ
        #[arg(long)]
        branch: Option<String>,

        /// OAuth クライアントシークレットJSON
        #[arg(long)]
        credentials: Option<PathBuf>,
    },
}

/// `USER/REPO` を分解
pub fn parse_hosting(value: &str) -> Result<(String, String), String> {
    match value.split_once('/') {
        Some((user, repo)) if !user.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((user.to_string(), repo.to_string()))
        }
        _ => Err(format!("Invalid hosting: {}. Use USER/REPO", value)),
    }
}
