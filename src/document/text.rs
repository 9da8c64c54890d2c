//! Text read straight from uploads that need no rasterizing

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

/// Main body part of a WordprocessingML package
const DOCX_BODY: &str = "word/document.xml";

/// Ceiling on the decompressed body part
const MAX_DOCX_BODY_BYTES: u64 = 32 * 1024 * 1024;

/// Text extraction error type
#[derive(Debug, Error)]
pub enum TextError {
    #[error("Not a readable Word document: {0}")]
    Archive(String),

    #[error("Word document has no word/document.xml part")]
    MissingBody,

    #[error("Word document body exceeds the size limit")]
    TooLarge,

    #[error("Malformed Word document body: {0}")]
    Xml(String),
}

/// Paragraph text of a `.docx`, one paragraph per line
pub fn docx_text(data: &[u8]) -> Result<String, TextError> {
    let mut archive =
        ZipArchive::new(Cursor::new(data)).map_err(|e| TextError::Archive(e.to_string()))?;

    let mut body = archive.by_name(DOCX_BODY).map_err(|e| match e {
        ZipError::FileNotFound => TextError::MissingBody,
        other => TextError::Archive(other.to_string()),
    })?;

    let mut xml = String::new();
    (&mut body)
        .take(MAX_DOCX_BODY_BYTES + 1)
        .read_to_string(&mut xml)
        .map_err(|e| TextError::Xml(e.to_string()))?;
    if xml.len() as u64 > MAX_DOCX_BODY_BYTES {
        return Err(TextError::TooLarge);
    }

    paragraphs(&xml)
}

fn paragraphs(xml: &str) -> Result<String, TextError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run => {
                let run = e.unescape().map_err(|e| TextError::Xml(e.to_string()))?;
                text.push_str(&run);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TextError::Xml(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(text)
}

/// A minimal `.docx` whose body holds `paragraphs`
#[cfg(test)]
pub fn sample_docx(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(DOCX_BODY, SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}
