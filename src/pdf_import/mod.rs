//! Page text sources for note import.
//!
//! Notes arrive either as PDF files or as plain-text dumps with one page
//! per form feed (the `pdftotext` convention). Both yield per-page text in
//! reading order; a page that cannot be read yields an empty string.

use lopdf::Document;
use std::fs;
use std::panic;
use std::path::{Path, PathBuf};

use crate::error::{ImportError, Result};

/// PDF magic bytes
const PDF_MAGIC: &[u8] = b"%PDF";
/// Maximum PDF file size (100 MB)
const MAX_PDF_SIZE: usize = 100 * 1024 * 1024;
/// Page separator of text dumps
pub const PAGE_SEPARATOR: &str = "\x0c";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
}

impl DocumentFormat {
    /// Format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

/// A document file and its page texts
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub path: PathBuf,
    pub pages: Vec<String>,
}

/// Reads page text and writes page subsets back in the same format
pub trait PageTextSource {
    fn read_pages(&self, path: &Path) -> Result<Vec<String>>;

    /// Write the pages at `keep` (0-based, in order) of `source` to `dest`
    fn write_pages(&self, source: &Path, pages: &[String], keep: &[usize], dest: &Path) -> Result<()>;

    fn read_document(&self, path: &Path) -> Result<RawDocument> {
        Ok(RawDocument {
            path: path.to_path_buf(),
            pages: self.read_pages(path)?,
        })
    }
}

/// Default source: `.pdf` via pdf-extract / lopdf, `.txt` dumps as they are
#[derive(Debug, Default, Clone, Copy)]
pub struct FileTextSource;

impl PageTextSource for FileTextSource {
    fn read_pages(&self, path: &Path) -> Result<Vec<String>> {
        match DocumentFormat::from_path(path) {
            Some(DocumentFormat::Pdf) => read_pdf_pages(path),
            Some(DocumentFormat::Text) => read_text_pages(path),
            None => Err(ImportError::UnsupportedFile(path.to_path_buf())),
        }
    }

    fn write_pages(&self, source: &Path, pages: &[String], keep: &[usize], dest: &Path) -> Result<()> {
        match DocumentFormat::from_path(source) {
            Some(DocumentFormat::Pdf) => write_pdf_pages(source, keep, dest),
            Some(DocumentFormat::Text) => {
                let selected: Vec<&str> = keep
                    .iter()
                    .filter_map(|i| pages.get(*i).map(String::as_str))
                    .collect();
                fs::write(dest, selected.join(PAGE_SEPARATOR))
                    .map_err(|e| ImportError::SplitWrite {
                        path: dest.to_path_buf(),
                        reason: e.to_string(),
                    })
            }
            None => Err(ImportError::UnsupportedFile(source.to_path_buf())),
        }
    }
}

pub fn validate_pdf(bytes: &[u8]) -> std::result::Result<(), String> {
    if bytes.len() < 8 {
        return Err("file too small to be a PDF".to_string());
    }

    if bytes.len() > MAX_PDF_SIZE {
        return Err(format!(
            "PDF too large ({} MB), maximum is {} MB",
            bytes.len() / (1024 * 1024),
            MAX_PDF_SIZE / (1024 * 1024)
        ));
    }

    if !bytes.starts_with(PDF_MAGIC) {
        return Err("missing PDF header".to_string());
    }

    Ok(())
}

/// Split a text dump into pages; a trailing form feed does not add a page
pub fn split_text_pages(content: &str) -> Vec<String> {
    let content = content.strip_suffix(PAGE_SEPARATOR).unwrap_or(content);
    content.split(PAGE_SEPARATOR).map(str::to_string).collect()
}

fn read_text_pages(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| ImportError::io(path, e))?;
    Ok(split_text_pages(&content))
}

fn read_pdf_pages(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path).map_err(|e| ImportError::io(path, e))?;
    validate_pdf(&bytes).map_err(|reason| ImportError::InvalidPdf {
        path: path.to_path_buf(),
        reason,
    })?;

    // pdf-extract panics on some malformed fonts
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(&bytes)) {
        Ok(Ok(pages)) => return Ok(pages),
        Ok(Err(e)) => log::warn!("pdf-extract failed on {}: {}", path.display(), e),
        Err(_) => log::warn!("pdf-extract panicked on {}", path.display()),
    }

    let doc = Document::load_mem(&bytes).map_err(|e| ImportError::Extraction {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let pages = doc
        .get_pages()
        .keys()
        .map(|number| {
            doc.extract_text(&[*number]).unwrap_or_else(|e| {
                log::warn!("Page {} of {} unreadable: {}", number, path.display(), e);
                String::new()
            })
        })
        .collect();

    Ok(pages)
}

fn write_pdf_pages(source: &Path, keep: &[usize], dest: &Path) -> Result<()> {
    let split_error = |reason: String| ImportError::SplitWrite {
        path: dest.to_path_buf(),
        reason,
    };

    let mut doc = Document::load(source).map_err(|e| split_error(e.to_string()))?;
    let drop: Vec<u32> = doc
        .get_pages()
        .keys()
        .copied()
        .filter(|number| !keep.contains(&(*number as usize - 1)))
        .collect();

    doc.delete_pages(&drop);
    doc.prune_objects();
    doc.save(dest).map_err(|e| split_error(e.to_string()))?;
    Ok(())
}
