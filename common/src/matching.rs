//! SKU/EAN と画像リソースの照合
//!
//! 商品ごとにリソースを列挙順に走査し、最初に条件を満たしたリソースを採用する。
//!
//! ## 照合ルール
//! - label（あれば parent も）に SKU または EAN が含まれれば一致
//! - 大文字小文字は区別する
//! - SKU一致とEAN一致に優先度はない
//! - 1商品につき最大1件。一致しない商品は出力しない
//!
//! 部分一致なので、短いSKUが無関係なファイル名に含まれると誤一致する。
//! 既存の出力との互換のため既定はこの動作のまま。区切り文字で囲まれた
//! トークンのみを一致とみなす場合は [`MatchMode::Token`] を使う。

use crate::types::{Catalog, MatchRecord, ResourceEntry};

/// 照合モード
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// 部分文字列一致（既定）
    #[default]
    Substring,
    /// 英数字以外の文字（または文字列端）で区切られた一致のみ
    Token,
}

impl MatchMode {
    /// `haystack` に `needle` が含まれるか
    pub fn contains(&self, haystack: &str, needle: &str) -> bool {
        match self {
            MatchMode::Substring => haystack.contains(needle),
            MatchMode::Token => contains_token(haystack, needle),
        }
    }
}

impl std::str::FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "substring" | "sub" => Ok(MatchMode::Substring),
            "token" | "word" => Ok(MatchMode::Token),
            _ => Err(format!("Unknown match mode: {}. Use substring or token", s)),
        }
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMode::Substring => write!(f, "substring"),
            MatchMode::Token => write!(f, "token"),
        }
    }
}

fn contains_token(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    // 重なり合う出現も調べるため、全ての開始位置を試す
    haystack.char_indices().any(|(start, _)| {
        if !haystack[start..].starts_with(needle) {
            return false;
        }
        let end = start + needle.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// 1件のリソースが商品に一致するか
pub fn is_match(resource: &ResourceEntry, sku: &str, ean: &str, mode: MatchMode) -> bool {
    resource
        .candidates()
        .any(|candidate| mode.contains(candidate, sku) || mode.contains(candidate, ean))
}

/// カタログとリソース一覧を照合
///
/// # Arguments
/// * `catalog` - 商品カタログ（この順で出力される）
/// * `resources` - 列挙順のリソース一覧
/// * `mode` - 照合モード
///
/// # Returns
/// 一致した商品ごとに1件の [`MatchRecord`]
///
/// # Examples
/// ```
/// use sku_image_common::{match_products, Catalog, MatchMode, ResourceEntry};
///
/// let catalog: Catalog = vec![("SKU1", "EAN1")].into_iter().collect();
/// let resources = vec![ResourceEntry::new("SKU1_front.jpg", "url1")];
/// let rows = match_products(&catalog, &resources, MatchMode::Substring);
/// assert_eq!(rows[0].link, "url1");
/// ```
pub fn match_products(
    catalog: &Catalog,
    resources: &[ResourceEntry],
    mode: MatchMode,
) -> Vec<MatchRecord> {
    catalog
        .iter()
        .filter_map(|product| {
            resources
                .iter()
                .find(|resource| is_match(resource, &product.sku, &product.ean, mode))
                .map(|resource| MatchRecord {
                    sku: product.sku.clone(),
                    ean: product.ean.clone(),
                    link: resource.url.clone(),
                })
        })
        .collect()
}
