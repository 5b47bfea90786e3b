//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use sku_image_common::DEFAULT_RECORD_ELEMENT;
use sku_image_linker::catalog;
use sku_image_linker::error::LinkerError;
use std::path::Path;
use tempfile::tempdir;

/// 存在しないカタログを読み込んだ場合
#[test]
fn test_load_nonexistent_catalog() {
    let result = catalog::load_products(Path::new("/nonexistent/path/products.xml"), DEFAULT_RECORD_ELEMENT);
    assert!(result.is_err());

    let err = result.unwrap_err();
    assert!(matches!(err, LinkerError::FileNotFound(_)));
}

/// 商品のないカタログ
#[test]
fn test_load_empty_catalog() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("products.xml");
    std::fs::write(&path, "<ArrayOfProductXmlModel />").unwrap();

    // 空カタログはエラーではなく空のマップを返す
    let result = catalog::load_products(&path, DEFAULT_RECORD_ELEMENT);
    assert!(result.is_ok());
    assert!(result.unwrap().is_empty());
}

/// XMLでないカタログ
#[test]
fn test_load_catalog_not_xml() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("products.xml");
    std::fs::write(&path, "SKU,EAN\nA,1\n").unwrap();

    let err = catalog::load_products(&path, DEFAULT_RECORD_ELEMENT).unwrap_err();
    assert!(matches!(err, LinkerError::Parse(_)));
    assert!(format!("{}", err).contains("products.xml"));
}

/// LinkerErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        LinkerError::Config("テスト設定エラー".to_string()),
        LinkerError::FileNotFound("products.xml".to_string()),
        LinkerError::Parse("不正なXML".to_string()),
        LinkerError::Auth("トークン交換に失敗".to_string()),
        LinkerError::Remote("HTTP 500".to_string()),
        LinkerError::Download("HTTP 404".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: LinkerError = io_err.into();

    assert!(matches!(err, LinkerError::Io(_)));
    assert!(format!("{}", err).contains("IO"));
}

/// common::Errorからの変換（透過的エラー）
#[test]
fn test_common_error_conversion() {
    let common_err = sku_image_common::Error::Config("設定エラー".to_string());
    let err: LinkerError = common_err.into();

    assert!(matches!(err, LinkerError::Common(_)));
    assert!(format!("{}", err).contains("設定エラー"));
}
