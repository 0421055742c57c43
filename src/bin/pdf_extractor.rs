//! Standalone page text dumper for brokerage notes.
//!
//! Prints every page of a note with the date and record kind the splitter
//! sees on it, separated by form feeds. The output is itself a valid text
//! dump, so it can be edited and fed back to `notas`.
//!
//! Usage: pdf_extractor <path_to_pdf_or_txt>
//! Output: page text on stdout, page tags and errors on stderr
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments
//!   2 - Read or extraction error
//!   3 - Write error

use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use notas_lib::pdf_import::{FileTextSource, PageTextSource, PAGE_SEPARATOR};
use notas_lib::split::extract_date_and_kind_per_page;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: pdf_extractor <path_to_pdf_or_txt>");
        return ExitCode::from(1);
    }

    let pages = match FileTextSource.read_pages(Path::new(&args[1])) {
        Ok(pages) => pages,
        Err(e) => {
            eprintln!("READ_ERROR:{}", e);
            return ExitCode::from(2);
        }
    };

    for (index, tag) in extract_date_and_kind_per_page(&pages).iter().enumerate() {
        eprintln!(
            "PAGE {}: date={} kind={}",
            index + 1,
            tag.date.as_deref().unwrap_or("-"),
            tag.kind.label()
        );
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = handle.write_all(pages.join(PAGE_SEPARATOR).as_bytes()) {
        eprintln!("WRITE_ERROR:{}", e);
        return ExitCode::from(3);
    }

    ExitCode::SUCCESS
}
