//! Run identifiers.
//!
//! Run directories follow the instrument naming convention
//! `NNNNNN_<INSTRUMENT>_<suffix>`: a six-digit date, the instrument serial
//! number, and a free-form suffix (flowcell position, flowcell id). The
//! directory name doubles as the stable run identifier.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::instrument::InstrumentClass;

fn run_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9]{6}_([A-Za-z0-9]+)_[A-Z0-9_-]+$").expect("static pattern")
    })
}

/// Stable identifier for one run, derived from its directory name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId {
    name: String,
    instrument_end: usize,
    instrument_start: usize,
}

impl RunId {
    /// Parse a directory name into a run identifier.
    ///
    /// Returns `None` for names that do not follow the run naming
    /// convention (other directories under the storage roots are ignored).
    pub fn parse(name: &str) -> Option<Self> {
        let captures = run_name_pattern().captures(name)?;
        let field = captures.get(1)?;
        Some(Self {
            name: name.to_string(),
            instrument_start: field.start(),
            instrument_end: field.end(),
        })
    }

    /// The full run identifier, identical to the directory name.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The instrument serial field of the identifier.
    pub fn instrument_id(&self) -> &str {
        &self.name[self.instrument_start..self.instrument_end]
    }

    /// The instrument class, derived from the serial prefix.
    pub fn instrument_class(&self) -> InstrumentClass {
        InstrumentClass::from_instrument_id(self.instrument_id())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
