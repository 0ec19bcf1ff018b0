//! Instrument classes and per-class tuning profiles.
//!
//! Run directories encode the instrument serial number in their second
//! underscore-separated field. The serial prefix identifies the instrument
//! class, which selects a tuning profile: a nominal output rate used before
//! enough timing samples exist, and the extra slack granted to the first
//! cycle of a read before the stall heuristic fires.
//!
//! The numeric constants here are empirically tuned and intentionally kept
//! as named, overridable values rather than derived quantities.

use std::time::Duration;

/// Multiplier on the observed per-cycle time before a run is flagged as
/// stalled.
pub const STALL_FACTOR: f64 = 3.0;

/// Absolute ceiling on the time since the last cycle arrived. Beyond this a
/// run is flagged as stalled regardless of its observed pace.
pub const STALL_CEILING: Duration = Duration::from_secs(7 * 60 * 60);

/// Extra slack, in cycle-time units, granted when the run is working on the
/// first cycle of a read. Chemistry steps between reads take materially
/// longer than a steady-state cycle.
pub const FIRST_CYCLE_SLACK: u32 = 25;

/// Instrument classes recognized from run directory names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstrumentClass {
    MiSeq,
    NextSeq,
    HiSeq,
    NovaSeq,
    /// Unrecognized serial prefix; tracked with conservative defaults.
    Unknown,
}

impl InstrumentClass {
    /// Classify an instrument from its serial number field.
    ///
    /// Prefix conventions: `M` MiSeq, `NS`/`NB` NextSeq, `A` NovaSeq,
    /// `D`/`K`/`SN` HiSeq.
    pub fn from_instrument_id(id: &str) -> Self {
        if id.starts_with("NS") || id.starts_with("NB") {
            Self::NextSeq
        } else if id.starts_with("SN") {
            Self::HiSeq
        } else if id.starts_with('M') {
            Self::MiSeq
        } else if id.starts_with('A') {
            Self::NovaSeq
        } else if id.starts_with('D') || id.starts_with('K') {
            Self::HiSeq
        } else {
            Self::Unknown
        }
    }

    /// Returns the tuning profile for this class.
    pub fn profile(self) -> InstrumentProfile {
        match self {
            Self::MiSeq => InstrumentProfile {
                class: self,
                nominal_rate: 50_000.0,
                first_cycle_slack: FIRST_CYCLE_SLACK,
            },
            Self::NextSeq => InstrumentProfile {
                class: self,
                nominal_rate: 1_500_000.0,
                first_cycle_slack: FIRST_CYCLE_SLACK,
            },
            Self::HiSeq => InstrumentProfile {
                class: self,
                nominal_rate: 5_000_000.0,
                first_cycle_slack: FIRST_CYCLE_SLACK,
            },
            Self::NovaSeq => InstrumentProfile {
                class: self,
                nominal_rate: 15_000_000.0,
                first_cycle_slack: FIRST_CYCLE_SLACK,
            },
            Self::Unknown => InstrumentProfile {
                class: self,
                nominal_rate: 1_000_000.0,
                first_cycle_slack: FIRST_CYCLE_SLACK,
            },
        }
    }
}

/// Per-class tuning values consulted by the run tracker.
#[derive(Clone, Copy, Debug)]
pub struct InstrumentProfile {
    /// The class this profile belongs to.
    pub class: InstrumentClass,
    /// Nominal output in bases per second, used as a fallback rate before
    /// enough cycle-arrival samples exist.
    pub nominal_rate: f64,
    /// Slack in cycle-time units applied on the first cycle of a read.
    pub first_cycle_slack: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_serial_prefixes() {
        assert_eq!(
            InstrumentClass::from_instrument_id("M01132"),
            InstrumentClass::MiSeq
        );
        assert_eq!(
            InstrumentClass::from_instrument_id("NS500336"),
            InstrumentClass::NextSeq
        );
        assert_eq!(
            InstrumentClass::from_instrument_id("NB501273"),
            InstrumentClass::NextSeq
        );
        assert_eq!(
            InstrumentClass::from_instrument_id("A00943"),
            InstrumentClass::NovaSeq
        );
        assert_eq!(
            InstrumentClass::from_instrument_id("D00132"),
            InstrumentClass::HiSeq
        );
        assert_eq!(
            InstrumentClass::from_instrument_id("SN7001334"),
            InstrumentClass::HiSeq
        );
        assert_eq!(
            InstrumentClass::from_instrument_id("X1234"),
            InstrumentClass::Unknown
        );
    }

    #[test]
    fn every_class_has_a_positive_nominal_rate() {
        for class in [
            InstrumentClass::MiSeq,
            InstrumentClass::NextSeq,
            InstrumentClass::HiSeq,
            InstrumentClass::NovaSeq,
            InstrumentClass::Unknown,
        ] {
            assert!(class.profile().nominal_rate > 0.0);
        }
    }
}
