//! SKU Image Linker
//!
//! 商品カタログ（SKU/EAN）と Google Drive / サイトマップの画像を照合し、
//! 商品ごとの画像リンクをCSVに出力する。

pub mod auth;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod publish;
pub mod source;
