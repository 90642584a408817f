//! Extracts a bundled sample document from a zip archive and parses it
//! repeatedly, reporting per-run and aggregate timings. Exits non-zero if
//! the parse itself fails; takes no flags.

use std::io::Read;
use std::time::Instant;

const ARCHIVE: &[u8] = include_bytes!("assets/sample.zip");
const RUNS: u32 = 200;

fn main() {
    let text = match load_sample(ARCHIVE) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("failed to read bundled sample: {}", e);
            std::process::exit(1);
        }
    };

    let mut total = std::time::Duration::ZERO;
    let mut node_count = 0usize;
    for _ in 0..RUNS {
        let start = Instant::now();
        match sgmltree::parse_str(&text, sgmltree::ParserOptions::default()) {
            Ok(doc) => {
                node_count = doc.filter(doc.root(), &|_| true, None).len();
                total += start.elapsed();
            }
            Err(e) => {
                eprintln!("parse failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    println!("parsed {} runs, {} nodes per run", RUNS, node_count);
    println!("total: {:?}, average: {:?}", total, total / RUNS);
}

fn load_sample(archive_bytes: &[u8]) -> std::io::Result<String> {
    let reader = std::io::Cursor::new(archive_bytes);
    let mut archive =
        zip::ZipArchive::new(reader).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let mut entry = archive
        .by_name("sample.xml")
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(text)
}
