//! Read-layout extraction from `RunInfo.xml`.
//!
//! Only the `<Read>` elements are of interest; the rest of the document is
//! ignored. Parsing is deliberately lenient - a malformed or partially
//! written file yields an empty layout, which the caller treats as
//! "metadata not yet available" and retries on the next poll.

use std::sync::OnceLock;

use regex::Regex;

use super::ReadSegment;

fn read_element_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<Read\s+([^>/]*)/?>").expect("static pattern"))
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"([A-Za-z]+)\s*=\s*"([^"]*)""#).expect("static pattern"))
}

/// Extract the ordered read segments from `RunInfo.xml` content.
///
/// Returns an empty vector if no well-formed `<Read>` elements are found.
pub fn parse_read_layout(xml: &str) -> Vec<ReadSegment> {
    let mut reads = Vec::new();
    for element in read_element_pattern().captures_iter(xml) {
        let mut cycles = None;
        let mut is_index = false;
        for attr in attribute_pattern().captures_iter(&element[1]) {
            match &attr[1] {
                "NumCycles" => cycles = attr[2].parse::<u32>().ok(),
                "IsIndexedRead" => is_index = attr[2].eq_ignore_ascii_case("Y"),
                _ => {}
            }
        }
        match cycles {
            Some(cycles) if cycles > 0 => reads.push(ReadSegment { cycles, is_index }),
            // A Read element without a usable cycle count means the file is
            // malformed or mid-write; discard the whole layout.
            _ => return Vec::new(),
        }
    }
    reads
}
