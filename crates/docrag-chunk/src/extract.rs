//! Text extraction from uploaded and preloaded files.
//!
//! Plain text must be UTF-8. Word documents are read as Office Open XML:
//! body paragraphs first, then table cells, one per line.

use std::io::{Cursor, Read};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use docrag_core::{DocumentFormat, RagError, Result};

static RE_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:tbl>.*?</w:tbl>").unwrap());
static RE_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:tc[ >].*?</w:tc>").unwrap());
static RE_PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:p[ >].*?</w:p>").unwrap());
static RE_RUN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab/>|<w:br/>|<w:cr/>").unwrap()
});

/// Text decoded from a file.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Detected format.
    pub format: DocumentFormat,

    /// Decoded text.
    pub text: String,
}

/// Decode `bytes` according to the extension of `filename`.
///
/// Fails with `UnsupportedFormat` for unknown extensions, `Encoding` for
/// non-UTF-8 text, `Decode` for unreadable Word files and `EmptyDocument`
/// when nothing but whitespace remains.
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<ExtractedText> {
    let format = DocumentFormat::from_filename(filename).ok_or_else(|| {
        RagError::UnsupportedFormat {
            filename: filename.to_string(),
        }
    })?;

    let text = match format {
        DocumentFormat::Text => decode_utf8(filename, bytes)?,
        DocumentFormat::Word => extract_docx(filename, bytes)?,
    };

    if text.trim().is_empty() {
        return Err(RagError::EmptyDocument {
            filename: filename.to_string(),
        });
    }

    debug!(filename, format = %format, chars = text.chars().count(), "Extracted text");

    Ok(ExtractedText { format, text })
}

fn decode_utf8(filename: &str, bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|_| RagError::Encoding {
        filename: filename.to_string(),
    })
}

fn extract_docx(filename: &str, bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| RagError::decode(filename, format!("not a Word document: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| RagError::decode(filename, format!("missing document body: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| RagError::decode(filename, format!("unreadable document body: {e}")))?;

    Ok(document_xml_to_text(&xml))
}

/// Non-empty body paragraphs, then non-empty table cells, joined by newlines.
fn document_xml_to_text(xml: &str) -> String {
    let body = RE_TABLE.replace_all(xml, "");
    let mut lines: Vec<String> = RE_PARAGRAPH
        .find_iter(&body)
        .map(|p| paragraph_text(p.as_str()))
        .filter(|t| !t.trim().is_empty())
        .collect();

    for table in RE_TABLE.find_iter(xml) {
        for cell in RE_CELL.find_iter(table.as_str()) {
            let text = RE_PARAGRAPH
                .find_iter(cell.as_str())
                .map(|p| paragraph_text(p.as_str()))
                .collect::<Vec<_>>()
                .join("\n");
            if !text.trim().is_empty() {
                lines.push(text);
            }
        }
    }

    lines.join("\n")
}

fn paragraph_text(paragraph: &str) -> String {
    let mut text = String::new();
    for caps in RE_RUN_TEXT.captures_iter(paragraph) {
        match caps.get(1) {
            Some(run) => text.push_str(&unescape_xml(run.as_str())),
            None => match &caps[0] {
                "<w:tab/>" => text.push('\t'),
                _ => text.push('\n'),
            },
        }
    }
    text
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{inner}</w:body></w:document>"#
        )
    }

    #[test]
    fn test_plain_text() {
        let extracted = extract_text("test.txt", b"Test Document for Upload").unwrap();
        assert_eq!(extracted.format, DocumentFormat::Text);
        assert_eq!(extracted.text, "Test Document for Upload");
    }

    #[test]
    fn test_plain_text_strips_bom() {
        let extracted = extract_text("bom.txt", b"\xEF\xBB\xBFhello").unwrap();
        assert_eq!(extracted.text, "hello");
    }

    #[test]
    fn test_invalid_utf8() {
        let err = extract_text("latin1.txt", &[0x66, 0x6f, 0xe9, 0xff]).unwrap_err();
        assert!(matches!(err, RagError::Encoding { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = extract_text("report.pdf", b"%PDF").unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_empty_text() {
        let err = extract_text("blank.txt", b"  \n\n ").unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument { .. }));
    }

    #[test]
    fn test_docx_paragraphs_and_tables() {
        let xml = body(concat!(
            r#"<w:p w:rsidR="001"><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Employee </w:t></w:r><w:r><w:t xml:space="preserve">Handbook &amp; Policies</w:t></w:r></w:p>"#,
            r#"<w:p/>"#,
            r#"<w:p><w:r><w:t>   </w:t></w:r></w:p>"#,
            r#"<w:tbl><w:tr><w:tc><w:tcPr/><w:p><w:r><w:t>Days</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>25</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            r#"<w:p><w:r><w:t>Remote</w:t><w:tab/><w:t>allowed</w:t></w:r></w:p>"#,
        ));

        let extracted = extract_text("handbook.docx", &docx(&xml)).unwrap();
        assert_eq!(extracted.format, DocumentFormat::Word);
        assert_eq!(
            extracted.text,
            "Employee Handbook & Policies\nRemote\tallowed\nDays\n25"
        );
    }

    #[test]
    fn test_docx_without_text() {
        let xml = body("<w:p/><w:p><w:pPr/></w:p>");
        let err = extract_text("empty.docx", &docx(&xml)).unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument { .. }));
    }

    #[test]
    fn test_legacy_doc_is_decode_error() {
        // OLE compound file header, not a zip archive
        let err = extract_text("old.doc", &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]).unwrap_err();
        assert!(matches!(err, RagError::Decode { .. }));
        assert!(err.is_client_error());
    }
}
