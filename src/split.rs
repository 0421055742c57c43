//! Splitting of files that bundle several notes.
//!
//! Brokers often deliver a month of notes in one file, sometimes mixing
//! spot and futures notes. Every page is tagged with its trading date and
//! record kind; each run of contiguous pages sharing a tag becomes one
//! sub-document, written to the batch temp directory.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::classify::classify;
use crate::extract::ParseContext;
use crate::models::MarketKind;
use crate::normalize::remove_accents;
use crate::pdf_import::{PageTextSource, RawDocument};

/// Most specific first
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)Data\s+preg[aã]o\s*(\d{2}/\d{2}/\d{4})").unwrap(),
        Regex::new(r"(\d{2}/\d{2}/\d{4})").unwrap(),
    ]
});

/// Trading date and record kind of one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTag {
    pub date: Option<String>,
    pub kind: MarketKind,
}

impl PageTag {
    /// Pages without a date or with an unknown kind belong to no group
    fn key(&self) -> Option<(&str, MarketKind)> {
        match (&self.date, self.kind) {
            (Some(date), kind) if kind.is_known() => Some((date.as_str(), kind)),
            _ => None,
        }
    }
}

/// Contiguous pages (0-based indices) sharing a date and kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageGroup {
    pub date: String,
    pub kind: MarketKind,
    pub pages: Vec<usize>,
}

/// One logical note ready for parsing
#[derive(Debug, Clone)]
pub struct SubDocument {
    /// File holding exactly these pages
    pub path: PathBuf,
    /// File the pages came from
    pub origin: PathBuf,
    pub pages: Vec<String>,
    pub date: Option<String>,
    pub kind: MarketKind,
}

pub fn page_date(text: &str) -> Option<String> {
    let text = remove_accents(text);
    DATE_PATTERNS
        .iter()
        .find_map(|re| re.captures(&text))
        .map(|caps| caps[1].to_string())
}

pub fn extract_date_and_kind_per_page(pages: &[String]) -> Vec<PageTag> {
    pages
        .iter()
        .map(|page| PageTag {
            date: page_date(page),
            kind: classify(page),
        })
        .collect()
}

/// Merge contiguous pages with the same key.
///
/// A key that differs from the previous kept page opens a new group, even
/// when it already appeared earlier in the file.
pub fn group_pages_by_date_and_kind(tags: &[PageTag]) -> Vec<PageGroup> {
    let mut groups: Vec<PageGroup> = Vec::new();

    for (index, tag) in tags.iter().enumerate() {
        let Some((date, kind)) = tag.key() else {
            continue;
        };

        match groups.last_mut() {
            Some(last) if last.date == date && last.kind == kind => last.pages.push(index),
            _ => groups.push(PageGroup {
                date: date.to_string(),
                kind,
                pages: vec![index],
            }),
        }
    }

    groups
}

fn distinct_keys(groups: &[PageGroup]) -> usize {
    let mut keys: Vec<(&str, MarketKind)> = groups.iter().map(|g| (g.date.as_str(), g.kind)).collect();
    keys.sort();
    keys.dedup();
    keys.len()
}

/// `<stem>_<date with '-'>_<kind>.<ext>`, suffixed when the name is taken
fn split_file_name(origin: &Path, group: &PageGroup, temp_dir: &Path) -> PathBuf {
    let stem = origin
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "nota".to_string());
    let ext = origin
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pdf".to_string());
    let base = format!("{}_{}_{}", stem, group.date.replace('/', "-"), group.kind.tag());

    let mut candidate = temp_dir.join(format!("{}.{}", base, ext));
    let mut n = 2;
    while candidate.exists() {
        candidate = temp_dir.join(format!("{}_{}.{}", base, n, ext));
        n += 1;
    }
    candidate
}

/// Split one document into sub-documents.
pub fn split_document(
    doc: RawDocument,
    source: &dyn PageTextSource,
    temp_dir: &Path,
    ctx: &mut ParseContext,
) -> Vec<SubDocument> {
    let tags = extract_date_and_kind_per_page(&doc.pages);
    let groups = group_pages_by_date_and_kind(&tags);

    if distinct_keys(&groups) <= 1 {
        let (date, kind) = match groups.first() {
            Some(group) => (Some(group.date.clone()), group.kind),
            None => (None, classify(&doc.pages.join("\n"))),
        };
        return vec![SubDocument {
            path: doc.path.clone(),
            origin: doc.path,
            pages: doc.pages,
            date,
            kind,
        }];
    }

    log::info!(
        "Splitting {} into {} notes",
        doc.path.display(),
        groups.len()
    );

    let mut documents = Vec::with_capacity(groups.len());
    for group in &groups {
        let dest = split_file_name(&doc.path, group, temp_dir);
        if let Err(e) = source.write_pages(&doc.path, &doc.pages, &group.pages, &dest) {
            ctx.warn("split", &e.to_string(), &doc.path.display().to_string());
            continue;
        }

        documents.push(SubDocument {
            path: dest,
            origin: doc.path.clone(),
            pages: group.pages.iter().map(|i| doc.pages[*i].clone()).collect(),
            date: Some(group.date.clone()),
            kind: group.kind,
        });
    }

    documents
}

/// Read and split every file; unreadable files are skipped with a warning.
pub fn prepare_for_processing(
    files: &[PathBuf],
    source: &dyn PageTextSource,
    temp_dir: &Path,
    ctx: &mut ParseContext,
) -> Vec<SubDocument> {
    let mut documents = Vec::new();

    for file in files {
        match source.read_document(file) {
            Ok(doc) => documents.extend(split_document(doc, source, temp_dir, ctx)),
            Err(e) => ctx.warn("document", &e.to_string(), &file.display().to_string()),
        }
    }

    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_import::FileTextSource;
    use std::fs;
    use tempfile::TempDir;

    fn tag(date: &str, kind: MarketKind) -> PageTag {
        PageTag {
            date: Some(date.to_string()),
            kind,
        }
    }

    fn spot_page(date: &str) -> String {
        format!("Data pregão {}\nNegócios realizados\nResumo dos Negócios\n", date)
    }

    #[test]
    fn test_page_date_prefers_label() {
        assert_eq!(
            page_date("emitido 01/01/2024\nData pregão 04/01/2024"),
            Some("04/01/2024".to_string())
        );
        assert_eq!(page_date("Liquido para 08/01/2024"), Some("08/01/2024".to_string()));
        assert_eq!(page_date("sem data"), None);
    }

    #[test]
    fn test_two_dates_two_groups() {
        let tags = vec![
            tag("04/01/2024", MarketKind::Spot),
            tag("04/01/2024", MarketKind::Spot),
            tag("05/01/2024", MarketKind::Spot),
            tag("05/01/2024", MarketKind::Spot),
        ];
        let groups = group_pages_by_date_and_kind(&tags);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].pages, vec![0, 1]);
        assert_eq!(groups[1].pages, vec![2, 3]);
        assert_eq!(groups[1].date, "05/01/2024");
    }

    #[test]
    fn test_repeated_key_is_not_merged() {
        let tags = vec![
            tag("04/01/2024", MarketKind::Spot),
            tag("04/01/2024", MarketKind::Futures),
            tag("04/01/2024", MarketKind::Spot),
        ];
        let groups = group_pages_by_date_and_kind(&tags);
        assert_eq!(groups.len(), 3);
        assert_eq!(distinct_keys(&groups), 2);
    }

    #[test]
    fn test_untagged_pages_are_dropped() {
        let tags = vec![
            tag("04/01/2024", MarketKind::Spot),
            PageTag { date: None, kind: MarketKind::Spot },
            tag("04/01/2024", MarketKind::Unknown),
            tag("04/01/2024", MarketKind::Spot),
        ];
        let groups = group_pages_by_date_and_kind(&tags);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].pages, vec![0, 3]);
    }

    #[test]
    fn test_single_key_passes_through() {
        let dir = TempDir::new().unwrap();
        let doc = RawDocument {
            path: PathBuf::from("/notas/janeiro.txt"),
            pages: vec![spot_page("04/01/2024"), "rodape sem data".to_string()],
        };
        let mut ctx = ParseContext::new();
        let docs = split_document(doc, &FileTextSource, dir.path(), &mut ctx);

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].path, PathBuf::from("/notas/janeiro.txt"));
        assert_eq!(docs[0].pages.len(), 2);
        assert_eq!(docs[0].kind, MarketKind::Spot);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_split_writes_one_file_per_group() {
        let dir = TempDir::new().unwrap();
        let origin = dir.path().join("janeiro.txt");
        let pages = vec![
            spot_page("04/01/2024"),
            spot_page("04/01/2024"),
            spot_page("05/01/2024"),
            spot_page("05/01/2024"),
        ];
        fs::write(&origin, pages.join("\x0c")).unwrap();

        let out = TempDir::new().unwrap();
        let mut ctx = ParseContext::new();
        let docs = prepare_for_processing(&[origin.clone()], &FileTextSource, out.path(), &mut ctx);

        assert_eq!(docs.len(), 2);
        assert!(ctx.warnings.is_empty());
        assert_eq!(docs[0].path, out.path().join("janeiro_04-01-2024_avista.txt"));
        assert_eq!(docs[1].path, out.path().join("janeiro_05-01-2024_avista.txt"));
        for doc in &docs {
            assert_eq!(doc.pages.len(), 2);
            assert_eq!(doc.origin, origin);
            assert_eq!(FileTextSource.read_pages(&doc.path).unwrap(), doc.pages);
        }
        assert!(docs[1].pages[0].contains("05/01/2024"));
    }

    /// One-font PDF with a text line per `Tj`, one page per entry of `pages`
    fn write_pdf(path: &Path, pages: &[Vec<String>]) {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in pages {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("TL", vec![16.into()]),
                Operation::new("Td", vec![50.into(), 780.into()]),
            ];
            for line in lines {
                operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn pdf_spot_page(marker: &str, date: &str) -> Vec<String> {
        vec![
            marker.to_string(),
            format!("Data pregao {}", date),
            "Negocios realizados".to_string(),
            "Resumo dos Negocios".to_string(),
        ]
    }

    #[test]
    fn test_pdf_bundle_split_keeps_page_order() {
        let dir = TempDir::new().unwrap();
        let origin = dir.path().join("bundle.pdf");
        write_pdf(
            &origin,
            &[
                pdf_spot_page("PAGE-A", "04/01/2024"),
                pdf_spot_page("PAGE-B", "04/01/2024"),
                pdf_spot_page("PAGE-C", "05/01/2024"),
                pdf_spot_page("PAGE-D", "05/01/2024"),
            ],
        );

        let tags = extract_date_and_kind_per_page(&FileTextSource.read_pages(&origin).unwrap());
        assert_eq!(
            tags,
            vec![
                tag("04/01/2024", MarketKind::Spot),
                tag("04/01/2024", MarketKind::Spot),
                tag("05/01/2024", MarketKind::Spot),
                tag("05/01/2024", MarketKind::Spot),
            ]
        );

        let out = TempDir::new().unwrap();
        let mut ctx = ParseContext::new();
        let docs = prepare_for_processing(&[origin.clone()], &FileTextSource, out.path(), &mut ctx);

        assert!(ctx.warnings.is_empty());
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].path, out.path().join("bundle_04-01-2024_avista.pdf"));
        assert_eq!(docs[1].path, out.path().join("bundle_05-01-2024_avista.pdf"));

        let expected = [["PAGE-A", "PAGE-B"], ["PAGE-C", "PAGE-D"]];
        for (doc, markers) in docs.iter().zip(expected) {
            let written = FileTextSource.read_pages(&doc.path).unwrap();
            assert_eq!(written.len(), 2);
            assert_eq!(written, doc.pages);
            for (page, marker) in written.iter().zip(markers) {
                assert!(page.contains(marker), "{:?} lacks {}", page, marker);
            }
        }
    }

    #[test]
    fn test_unreadable_file_is_a_warning() {
        let out = TempDir::new().unwrap();
        let mut ctx = ParseContext::new();
        let docs = prepare_for_processing(
            &[PathBuf::from("/nao/existe.txt")],
            &FileTextSource,
            out.path(),
            &mut ctx,
        );
        assert!(docs.is_empty());
        assert_eq!(ctx.warnings.len(), 1);
    }
}
