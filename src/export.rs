//! CSV出力

use crate::error::Result;
use sku_image_common::MatchRecord;
use std::path::Path;

/// 照合結果をCSVに書き出す（既存ファイルは上書き）
///
/// ヘッダーは `SKU,EAN,<link_column>`、以降は入力順に1件1行。
pub fn write_csv(records: &[MatchRecord], path: &Path, link_column: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["SKU", "EAN", link_column])?;
    for record in records {
        writer.write_record([&record.sku, &record.ean, &record.link])?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = records.len(), "wrote csv");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkerError;
    use tempfile::tempdir;

    #[test]
    fn test_write_csv_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        write_csv(&[], &path, "ImageURL").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "SKU,EAN,ImageURL\n");
    }

    #[test]
    fn test_write_csv_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale,content\nmore,rows\n").unwrap();

        let rows = vec![MatchRecord {
            sku: "A".into(),
            ean: "1".into(),
            link: "https://x/a.jpg".into(),
        }];
        write_csv(&rows, &path, "GitHubLink").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "SKU,EAN,GitHubLink\nA,1,https://x/a.jpg\n"
        );
    }

    #[test]
    fn test_write_csv_quotes_commas() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let rows = vec![MatchRecord {
            sku: "A,B".into(),
            ean: "1".into(),
            link: "u".into(),
        }];

        write_csv(&rows, &path, "ImageURL").unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("\"A,B\",1,u"));
    }

    #[test]
    fn test_write_csv_unwritable_path() {
        let result = write_csv(&[], Path::new("/nonexistent/dir/out.csv"), "ImageURL");
        assert!(matches!(result, Err(LinkerError::Csv(_)) | Err(LinkerError::Io(_))));
    }
}
