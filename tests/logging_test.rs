use std::io;
use std::sync::{Arc, Mutex};
use uslm_ingest::runtime::logging::init_tracing;
use uslm_ingest::UslmParser;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture<F: FnOnce()>(f: F) -> String {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    logs.contents()
}

#[test]
fn test_skipped_section_is_logged_as_warning() {
    let output = capture(|| {
        UslmParser::new()
            .parse(r#"<uslm><section><num>§ 1</num></section></uslm>"#.as_bytes())
            .unwrap();
    });
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("Skipping section without identifier attribute"), "{output}");
    assert!(output.contains("Parsed 0 sections from USLM XML (1 skipped)"), "{output}");
}

#[test]
fn test_emitted_sections_are_logged_at_debug() {
    let output = capture(|| {
        UslmParser::new()
            .parse(r#"<uslm><section identifier="/us/usc/t5/s101"/></uslm>"#.as_bytes())
            .unwrap();
    });
    assert!(output.contains("DEBUG"), "{output}");
    assert!(output.contains("/us/usc/t5/s101"), "{output}");
}

#[test]
fn test_init_tracing_can_be_called_twice() {
    init_tracing("info");
    init_tracing("debug");
    tracing::info!("still logging");
}
