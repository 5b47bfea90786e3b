//! XMLパーサー
//!
//! 商品カタログXMLとサイトマップXML（image拡張）を解析する。
//! ファイル読み込みやHTTP取得は呼び出し側で行い、ここではバイト列と文字列のみを扱う。

use crate::error::{Error, Result};
use crate::types::{Catalog, ResourceEntry};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use std::borrow::Cow;

/// 商品レコード要素の既定名
pub const DEFAULT_RECORD_ELEMENT: &str = "ProductXmlModel";

/// サイトマップ名前空間
pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// サイトマップ image 拡張の名前空間
pub const SITEMAP_IMAGE_NS: &str = "http://www.google.com/schemas/sitemap-image/1.1";

/// XML宣言を探す範囲
const DECLARATION_SCAN_LIMIT: usize = 1024;

fn parse_document(xml: &str) -> Result<roxmltree::Document<'_>> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    Ok(roxmltree::Document::parse_with_options(xml, options)?)
}

/// XML宣言の `encoding` 属性
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(DECLARATION_SCAN_LIMIT)];
    if !head.starts_with(b"<?xml") {
        return None;
    }
    let end = head.windows(2).position(|w| w == b"?>")?;
    let declaration = std::str::from_utf8(&head[..end]).ok()?;

    let rest = &declaration[declaration.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    let label = &value[..value.find(quote)?];

    // ASCII互換で読めた宣言が UTF-16 を名乗る場合は UTF-8 とみなす
    Encoding::for_label(label.as_bytes()).map(Encoding::output_encoding)
}

fn strip_declaration(text: &str) -> &str {
    match text.strip_prefix("<?xml") {
        Some(rest) if rest.starts_with(char::is_whitespace) => match rest.find("?>") {
            Some(end) => &rest[end + 2..],
            None => text,
        },
        _ => text,
    }
}

/// XMLバイト列を文字列に復号
///
/// BOM、BOMなしUTF-16の先頭パターン、XML宣言の `encoding` の順で文字コードを決め、
/// どれもなければ UTF-8 とする。UTF-8 以外から復号した場合は宣言を取り除く。
///
/// # Examples
/// ```
/// use sku_image_common::decode_xml;
///
/// let bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><SKU>S\xe91</SKU>";
/// assert_eq!(decode_xml(bytes).unwrap(), "<SKU>S\u{e9}1</SKU>");
/// ```
pub fn decode_xml(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let (encoding, body) = if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        (encoding, &bytes[bom_len..])
    } else if bytes.starts_with(&[0x3C, 0x00, 0x3F, 0x00]) {
        (UTF_16LE, bytes)
    } else if bytes.starts_with(&[0x00, 0x3C, 0x00, 0x3F]) {
        (UTF_16BE, bytes)
    } else {
        (declared_encoding(bytes).unwrap_or(UTF_8), bytes)
    };

    let text = encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| Error::Encoding(format!("{} として復号できません", encoding.name())))?;

    if encoding == UTF_8 {
        Ok(text)
    } else {
        Ok(Cow::Owned(strip_declaration(&text).to_string()))
    }
}

fn child_text<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|c| c.has_tag_name(name))
        .and_then(|c| c.text())
}

/// 商品カタログXMLをパース
///
/// `record_element` 要素（深さは問わない）ごとに直下の `SKU` と `EAN` を読む。
/// どちらかが欠けている・空のレコードは読み飛ばす。
///
/// # Arguments
/// * `xml` - カタログXML文字列
/// * `record_element` - 商品レコードの要素名（通常は `ProductXmlModel`）
///
/// # Returns
/// * `Ok(Catalog)` - SKU → EAN の挿入順マップ
/// * `Err` - XMLが不正な場合（DTD宣言は許可する）
///
/// # Examples
/// ```
/// use sku_image_common::parse_catalog;
///
/// let xml = "<Products><ProductXmlModel><SKU>A1</SKU><EAN>871</EAN></ProductXmlModel></Products>";
/// let catalog = parse_catalog(xml, "ProductXmlModel").unwrap();
/// assert_eq!(catalog.get("A1"), Some("871"));
/// ```
pub fn parse_catalog(xml: &str, record_element: &str) -> Result<Catalog> {
    if record_element.is_empty() {
        return Err(Error::Config("レコード要素名が空です".into()));
    }

    let doc = parse_document(xml)?;
    let mut catalog = Catalog::new();

    for record in doc
        .descendants()
        .filter(|n| n.has_tag_name(record_element))
    {
        let sku = child_text(record, "SKU").unwrap_or_default();
        let ean = child_text(record, "EAN").unwrap_or_default();
        if sku.is_empty() || ean.is_empty() {
            continue;
        }
        catalog.insert(sku, ean);
    }

    Ok(catalog)
}

/// サイトマップXMLから画像リソースを抽出
///
/// `<url>` ごとに `<loc>` を親URLとし、`<image:image><image:loc>` の画像URLを
/// 1件ずつ [`ResourceEntry`] にする。画像が複数あれば同じ親で複数件になる。
pub fn parse_sitemap_images(xml: &str) -> Result<Vec<ResourceEntry>> {
    let doc = parse_document(xml)?;
    let mut entries = Vec::new();

    for url in doc
        .descendants()
        .filter(|n| n.has_tag_name((SITEMAP_NS, "url")))
    {
        let page = url
            .children()
            .find(|c| c.has_tag_name((SITEMAP_NS, "loc")))
            .and_then(|c| c.text());

        let image_urls = url
            .children()
            .filter(|c| c.has_tag_name((SITEMAP_IMAGE_NS, "image")))
            .flat_map(|image| image.children())
            .filter(|c| c.has_tag_name((SITEMAP_IMAGE_NS, "loc")))
            .filter_map(|c| c.text())
            .filter(|text| !text.is_empty());

        for image_url in image_urls {
            let entry = ResourceEntry::new(image_url, image_url);
            entries.push(match page {
                Some(page) => entry.with_parent(page),
                None => entry,
            });
        }
    }

    Ok(entries)
}
