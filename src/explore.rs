//! Print the sections of a USLM file (or release ZIP) whose identifier
//! contains a substring, as JSON.

use std::fs::File;
use std::io::BufReader;
use uslm_ingest::runtime::logging::init_tracing;
use uslm_ingest::source::parse_title_archive;
use uslm_ingest::{ParsedSection, UslmParser};

type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn main() -> Result<(), DynError> {
    init_tracing("info");

    let mut args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.len() != 2 {
        eprintln!("Usage: explore <xml_or_zip_file> <identifier_substring>");
        std::process::exit(2);
    }
    let path = args.remove(0);
    let needle = args.remove(0);

    let parser = UslmParser::new();
    let mut matches: Vec<ParsedSection> = Vec::new();
    let collect = |section: ParsedSection| {
        if section.identifier.contains(&needle) {
            matches.push(section);
        }
    };

    let file = File::open(&path)?;
    let stats = if path.ends_with(".zip") {
        parse_title_archive(&parser, file, collect)?
    } else {
        parser.parse_stream(BufReader::new(file), collect)?
    };

    eprintln!(
        "{} of {} sections matched {needle:?}",
        matches.len(),
        stats.sections_emitted
    );
    println!("{}", serde_json::to_string_pretty(&matches)?);
    Ok(())
}
