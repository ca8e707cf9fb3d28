//! Plain-text extraction for ingested files.
//!
//! Upstream adapters supply raw bytes; this module returns UTF-8 text.
//! Text-like formats decode with a lossy fallback, binary formats go
//! through pdf-extract (PDF) or zip + quick-xml (DOCX).

use std::io::Read;
use std::path::Path;

use crate::errors::RagError;

/// Largest decompressed DOCX XML entry we will read.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Markdown,
    Pdf,
    Docx,
}

impl FileKind {
    /// Map an object key to its file kind by extension. `None` means the
    /// type is unsupported and the file must be rejected, not guessed.
    pub fn from_key(key: &str) -> Option<Self> {
        let ext = Path::new(key).extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Markdown => "md",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

pub fn extract_text(bytes: &[u8], kind: FileKind) -> Result<String, RagError> {
    match kind {
        FileKind::Text | FileKind::Markdown => Ok(decode_utf8(bytes)),
        FileKind::Pdf => extract_pdf(bytes),
        FileKind::Docx => extract_docx(bytes),
    }
}

/// UTF-8 with a best-effort lossy fallback for other encodings.
fn decode_utf8(bytes: &[u8]) -> String {
    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, RagError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| RagError::Extraction(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, RagError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| RagError::Extraction(e.to_string()))?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| RagError::Extraction("word/document.xml not found".to_string()))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| RagError::Extraction(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(RagError::Extraction(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    docx_text_runs(&xml)
}

/// Collect `w:t` text runs; paragraph ends become newlines so the indexed
/// text keeps its reading order.
fn docx_text_runs(xml: &[u8]) -> Result<String, RagError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut out = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                in_text_run = e.local_name().as_ref() == b"t";
            }
            Ok(quick_xml::events::Event::Text(t)) if in_text_run => {
                out.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = false;
                } else if e.local_name().as_ref() == b"p" {
                    out.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(RagError::Extraction(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    #[test]
    fn kind_is_derived_from_extension() {
        assert_eq!(FileKind::from_key("guide/s3.txt"), Some(FileKind::Text));
        assert_eq!(FileKind::from_key("notes.MD"), Some(FileKind::Markdown));
        assert_eq!(FileKind::from_key("manual.pdf"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_key("report.docx"), Some(FileKind::Docx));
        assert_eq!(FileKind::from_key("archive.tar.gz"), None);
        assert_eq!(FileKind::from_key("no-extension"), None);
    }

    #[test]
    fn plain_text_decodes_utf8() {
        let text = extract_text("S3 is object storage".as_bytes(), FileKind::Text).unwrap();
        assert_eq!(text, "S3 is object storage");
    }

    #[test]
    fn invalid_utf8_falls_back_lossy() {
        let bytes = vec![b'o', b'k', 0xFF, b'!'];
        let text = extract_text(&bytes, FileKind::Text).unwrap();
        assert!(text.starts_with("ok"));
        assert!(text.ends_with('!'));
    }

    #[test]
    fn docx_text_runs_are_extracted() {
        let xml = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>
    <w:p><w:r><w:t>Second paragraph.</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }

        let text = extract_text(&cursor.into_inner(), FileKind::Docx).unwrap();
        assert!(text.contains("First paragraph."));
        assert!(text.contains("Second paragraph."));
        let first = text.find("First").unwrap();
        let second = text.find("Second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn docx_without_document_xml_is_rejected() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .start_file("unrelated.xml", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"<x/>").unwrap();
            writer.finish().unwrap();
        }

        let err = extract_text(&cursor.into_inner(), FileKind::Docx).unwrap_err();
        assert!(matches!(err, RagError::Extraction(_)));
    }
}
