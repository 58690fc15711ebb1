//! Document loaders.
//!
//! An uploaded file is classified by extension into a closed set of
//! [`DocumentKind`]s. Each kind knows how to turn raw bytes into ordered
//! [`Segment`]s; anything else is [`DocumentKind::Unsupported`] and is
//! rejected before any processing happens.
//!
//! | Extension | Segments |
//! |-----------|----------|
//! | `pdf` | one, the extracted text |
//! | `docx` | one, paragraphs separated by newlines |
//! | `txt` | one, the file contents |
//! | `csv` | one per record, as `header: value` lines |
//! | `xlsx` | one per worksheet, cells separated by spaces |
//!
//! Loaders never panic on malformed input; they return [`LoadError::Parse`].

use std::io::Read;
use std::path::Path;

use kira_core::models::Segment;

use crate::error::LoadError;

/// Extensions accepted by the upload surfaces, lower case.
pub const ACCEPTED_EXTENSIONS: [&str; 5] = ["pdf", "csv", "txt", "xlsx", "docx"];

/// Comma-separated accepted extensions, for messages shown to users.
pub fn accepted_formats() -> String {
    ACCEPTED_EXTENSIONS.join(", ")
}

/// Maximum sheets to process in an xlsx.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum cells to process per sheet.
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
    Csv,
    Xlsx,
    Unsupported(String),
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => DocumentKind::Pdf,
            "docx" => DocumentKind::Docx,
            "txt" => DocumentKind::Text,
            "csv" => DocumentKind::Csv,
            "xlsx" => DocumentKind::Xlsx,
            other => DocumentKind::Unsupported(other.to_string()),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, DocumentKind::Unsupported(_))
    }

    fn label(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Text => "txt",
            DocumentKind::Csv => "csv",
            DocumentKind::Xlsx => "xlsx",
            DocumentKind::Unsupported(_) => "unsupported",
        }
    }

    /// Read `path` and load it.
    pub fn load(&self, path: &Path) -> Result<Vec<Segment>, LoadError> {
        if let DocumentKind::Unsupported(ext) = self {
            return Err(LoadError::Unsupported(ext.clone()));
        }
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load_bytes(&bytes, &path.display().to_string())
    }

    /// Load already-read bytes; `source` is recorded in segment metadata.
    pub fn load_bytes(&self, bytes: &[u8], source: &str) -> Result<Vec<Segment>, LoadError> {
        let texts = match self {
            DocumentKind::Pdf => vec![extract_pdf(bytes)?],
            DocumentKind::Docx => vec![extract_docx(bytes)?],
            DocumentKind::Text => vec![String::from_utf8_lossy(bytes).into_owned()],
            DocumentKind::Csv => extract_csv_rows(bytes)?,
            DocumentKind::Xlsx => extract_xlsx_sheets(bytes)?,
            DocumentKind::Unsupported(ext) => return Err(LoadError::Unsupported(ext.clone())),
        };

        let segments: Vec<Segment> = texts
            .into_iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(position, text)| Segment::new(text, source, position))
            .collect();

        if segments.is_empty() {
            return Err(LoadError::Empty(source.to_string()));
        }

        tracing::debug!(
            source,
            kind = self.label(),
            segments = segments.len(),
            "document loaded"
        );
        Ok(segments)
    }
}

/// Classify `path` by extension and load it.
pub fn load_document(path: &Path) -> Result<Vec<Segment>, LoadError> {
    let kind = DocumentKind::from_path(path);
    tracing::info!("Loading {}", path.display());
    kind.load(path)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, LoadError> {
    // pdf-extract panics on some malformed fonts and encodings.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(result) => result.map_err(|e| LoadError::parse("pdf", e)),
        Err(_) => Err(LoadError::parse("pdf", "extractor panicked on malformed input")),
    }
}

fn read_zip_entry_bounded(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>, LoadError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| LoadError::parse("ooxml", e))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| LoadError::parse("ooxml", e))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(LoadError::parse(
            "ooxml",
            format!(
                "ZIP entry {} exceeds size limit ({} bytes)",
                name, MAX_XML_ENTRY_BYTES
            ),
        ));
    }
    Ok(out)
}

fn open_archive(bytes: &[u8]) -> Result<Archive<'_>, LoadError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| LoadError::parse("ooxml", e))
}

fn extract_docx(bytes: &[u8]) -> Result<String, LoadError> {
    let mut archive = open_archive(bytes)?;
    if !archive.file_names().any(|n| n == "word/document.xml") {
        return Err(LoadError::parse("docx", "word/document.xml not found"));
    }
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml")?;
    extract_docx_paragraphs(&xml)
}

/// Concatenate `<w:t>` runs, one line per `<w:p>` paragraph.
fn extract_docx_paragraphs(xml: &[u8]) -> Result<String, LoadError> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(LoadError::parse("docx", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}

/// One `header: value` block per record.
fn extract_csv_rows(bytes: &[u8]) -> Result<Vec<String>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| LoadError::parse("csv", e))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| LoadError::parse("csv", e))?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| format!("{}: {}", h.trim(), v.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        rows.push(row);
    }
    Ok(rows)
}

fn extract_xlsx_sheets(bytes: &[u8]) -> Result<Vec<String>, LoadError> {
    let mut archive = open_archive(bytes)?;
    let shared_strings = read_shared_strings(&mut archive)?;
    let sheet_names = list_worksheet_names(&archive);
    if sheet_names.is_empty() {
        return Err(LoadError::parse("xlsx", "workbook has no worksheets"));
    }

    let mut sheets = Vec::new();
    for name in sheet_names.into_iter().take(XLSX_MAX_SHEETS) {
        let sheet_xml = read_zip_entry_bounded(&mut archive, &name)?;
        sheets.push(extract_xlsx_sheet_cells(&sheet_xml, &shared_strings)?);
    }
    Ok(sheets)
}

/// Shared string table; a workbook without text cells has none.
fn read_shared_strings(archive: &mut Archive<'_>) -> Result<Vec<String>, LoadError> {
    use quick_xml::events::Event;

    if !archive.file_names().any(|n| n == "xl/sharedStrings.xml") {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml")?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(LoadError::parse("xlsx", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn list_worksheet_names(archive: &Archive<'_>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

fn extract_xlsx_sheet_cells(xml: &[u8], shared_strings: &[String]) -> Result<String, LoadError> {
    use quick_xml::events::Event;

    let mut cells: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_v = false;
    let mut cell_is_shared_str = false;
    // Inline strings: <c t="inlineStr"><is><t>..</t></is></c>, possibly in several runs.
    let mut in_inline = false;
    let mut in_inline_t = false;
    let mut inline = String::new();
    loop {
        if cells.len() >= XLSX_MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"c" => {
                    cell_is_shared_str = e.attributes().any(|a| {
                        a.as_ref()
                            .map(|a| a.key.as_ref() == b"t" && a.value.as_ref() == b"s")
                            .unwrap_or(false)
                    });
                }
                b"v" => in_v = true,
                b"is" => {
                    in_inline = true;
                    inline.clear();
                }
                b"t" if in_inline => in_inline_t = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_v => {
                let v = te.unescape().unwrap_or_default();
                let s = v.trim();
                if cell_is_shared_str {
                    if let Some(text) = s.parse::<usize>().ok().and_then(|i| shared_strings.get(i)) {
                        cells.push(text.clone());
                    }
                } else if !s.is_empty() {
                    cells.push(s.to_string());
                }
            }
            Ok(Event::Text(te)) if in_inline_t => {
                inline.push_str(&te.unescape().unwrap_or_default());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" => in_v = false,
                b"c" => cell_is_shared_str = false,
                b"t" => in_inline_t = false,
                b"is" => {
                    in_inline = false;
                    let text = inline.trim();
                    if !text.is_empty() {
                        cells.push(text.to_string());
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(LoadError::parse("xlsx", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(cells.join(" "))
}
