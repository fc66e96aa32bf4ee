use std::fmt;
use std::ops::AddAssign;

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Parse and write counters for one file or a whole run.
///
/// Counters only ever increase. `lines_parsed` counts every line read, including the ones that
/// failed to parse, so `lines_parsed - parse_failures` is the number of decoded records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestionStats {
    pub lines_parsed: u64,
    pub parse_failures: u64,
    pub rows_attempted: u64,
    pub write_failures: u64,
}

impl IngestionStats {
    pub fn record_parsed(&mut self) {
        self.lines_parsed += 1;
    }

    pub fn record_parse_failure(&mut self) {
        self.lines_parsed += 1;
        self.parse_failures += 1;
    }

    /// Count one insert attempt and whether it persisted.
    pub fn record_write(&mut self, succeeded: bool) {
        self.rows_attempted += 1;
        if !succeeded {
            self.write_failures += 1;
        }
    }

    /// Accumulate another set of counters into this one.
    pub fn merge(&mut self, other: &IngestionStats) {
        self.lines_parsed += other.lines_parsed;
        self.parse_failures += other.parse_failures;
        self.rows_attempted += other.rows_attempted;
        self.write_failures += other.write_failures;
    }

    /// `parse_failures / lines_parsed`; NaN when no line was read.
    pub fn parse_failure_ratio(&self) -> f64 {
        self.parse_failures as f64 / self.lines_parsed as f64
    }

    /// `write_failures / rows_attempted`; NaN when no row was attempted.
    pub fn write_failure_ratio(&self) -> f64 {
        self.write_failures as f64 / self.rows_attempted as f64
    }

    pub fn has_failures(&self) -> bool {
        self.parse_failures > 0 || self.write_failures > 0
    }
}

impl AddAssign<&IngestionStats> for IngestionStats {
    fn add_assign(&mut self, rhs: &IngestionStats) {
        self.merge(rhs);
    }
}

// Ratios are included; NaN serializes as JSON `null`.
impl Serialize for IngestionStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("IngestionStats", 6)?;
        st.serialize_field("lines_parsed", &self.lines_parsed)?;
        st.serialize_field("parse_failures", &self.parse_failures)?;
        st.serialize_field("rows_attempted", &self.rows_attempted)?;
        st.serialize_field("write_failures", &self.write_failures)?;
        st.serialize_field("parse_failure_ratio", &self.parse_failure_ratio())?;
        st.serialize_field("write_failure_ratio", &self.write_failure_ratio())?;
        st.end()
    }
}

impl fmt::Display for IngestionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "JSON: total lines: {}, total errors: {}, failure ratio: {:.2}",
            self.lines_parsed,
            self.parse_failures,
            self.parse_failure_ratio()
        )?;
        write!(
            f,
            "DB: total lines: {}, total errors: {}, failure ratio: {:.2}",
            self.rows_attempted,
            self.write_failures,
            self.write_failure_ratio()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios_are_nan_without_input() {
        let stats = IngestionStats::default();
        assert!(stats.parse_failure_ratio().is_nan());
        assert!(stats.write_failure_ratio().is_nan());
        assert!(stats.to_string().contains("failure ratio: NaN"));
    }

    #[test]
    fn merge_sums_counters() {
        let mut a = IngestionStats::default();
        a.record_parsed();
        a.record_write(true);
        let mut b = IngestionStats::default();
        b.record_parse_failure();
        b.record_parsed();
        b.record_write(false);

        a += &b;
        assert_eq!(
            a,
            IngestionStats {
                lines_parsed: 3,
                parse_failures: 1,
                rows_attempted: 2,
                write_failures: 1,
            }
        );
        assert_eq!(a.write_failure_ratio(), 0.5);
        assert!(a.has_failures());
    }
}
