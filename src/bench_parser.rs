use quick_xml::events::Event;
use quick_xml::Reader;
use std::time::Instant;
use uslm_ingest::runtime::logging::init_tracing;
use uslm_ingest::UslmParser;

type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn count_xml_events(xml: &[u8]) -> Result<usize, DynError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(_) => count += 1,
            Err(e) => {
                return Err(format!("XML error at position {}: {e}", reader.error_position()).into())
            }
        }
        buf.clear();
    }
    Ok(count)
}

fn summarize(label: &str, durations: &[f64]) -> f64 {
    let avg = durations.iter().sum::<f64>() / durations.len() as f64;
    let min = durations.iter().copied().fold(f64::INFINITY, f64::min);
    println!("{label} avg: {avg:.3}s, min: {min:.3}s");
    avg
}

fn main() -> Result<(), DynError> {
    init_tracing("warn");

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: bench_parser <xml_file>");
        std::process::exit(2);
    };
    let xml = std::fs::read(&path)?;
    let iterations = 5;

    // Baseline: raw quick-xml event iteration
    count_xml_events(&xml)?;
    let mut baseline = Vec::with_capacity(iterations);
    for i in 0..iterations {
        let start = Instant::now();
        let events = count_xml_events(&xml)?;
        let elapsed = start.elapsed().as_secs_f64();
        baseline.push(elapsed);
        println!("Baseline {}: {elapsed:.3}s ({events} XML events)", i + 1);
    }
    let baseline_avg = summarize("Baseline", &baseline);
    println!();

    let parser = UslmParser::new();
    parser.parse_stream(xml.as_slice(), |_| {})?;
    let mut durations = Vec::with_capacity(iterations);
    for i in 0..iterations {
        let start = Instant::now();
        let mut content_bytes = 0usize;
        let stats = parser.parse_stream(xml.as_slice(), |section| {
            content_bytes += section.content_xml.len();
        })?;
        let elapsed = start.elapsed().as_secs_f64();
        durations.push(elapsed);
        println!(
            "Iteration {}: {elapsed:.3}s ({} sections, {} skipped, {content_bytes} bytes of content XML)",
            i + 1,
            stats.sections_emitted,
            stats.sections_skipped,
        );
    }

    println!();
    let avg = summarize("Parser", &durations);
    println!("Overhead vs baseline: {:.1}x", avg / baseline_avg);
    Ok(())
}
