use crate::error::AnalysisError;
use crate::states::StateSetIndex;
use std::io::{self, Write};

// =#========================================================================#=
// TIME BIN HISTOGRAM
// =#========================================================================#=
/// Counts of jumps per (from set, to set, time bin).
///
/// The bins have width `delta = (max − min) / (bins − 1)` and start at
/// `min`, so `max` itself falls into the last bin. Times are those of the
/// run's [TimeScale](crate::walker::TimeScale).
///
/// # Example
/// ```
/// use jumphistory::aggregate::TimeBinHistogram;
/// use jumphistory::states::{SetMode, StateSetIndex};
/// use std::collections::BTreeSet;
///
/// let states = BTreeSet::from(["X".to_string(), "Y".to_string()]);
/// let index = StateSetIndex::build(&[], SetMode::Iterate, &states);
/// let mut histogram = TimeBinHistogram::new(0.0, 10.0, 5, index.clone(), index).unwrap();
/// assert!(histogram.record(6.0, "X", "Y"));
/// assert_eq!(histogram.count(0, 1, 2), 1);
/// ```
#[derive(Debug, Clone)]
pub struct TimeBinHistogram {
    min: f64,
    max: f64,
    bins: usize,
    delta: f64,
    from_index: StateSetIndex,
    to_index: StateSetIndex,
    /// Flattened `[from][to][bin]`
    counts: Vec<u64>,
    num_recorded: u64,
    num_trees: usize,
}

impl TimeBinHistogram {
    /// Creates an empty histogram over `[min, max]`.
    ///
    /// # Errors
    /// Returns [AnalysisError::Configuration] if `bins < 2` or `min >= max`.
    pub fn new(
        min: f64,
        max: f64,
        bins: usize,
        from_index: StateSetIndex,
        to_index: StateSetIndex,
    ) -> Result<Self, AnalysisError> {
        if bins < 2 {
            return Err(AnalysisError::Configuration(format!(
                "histogram needs at least 2 bins, got {bins}"
            )));
        }
        if !(min < max) {
            return Err(AnalysisError::Configuration(format!(
                "histogram minimum {min} must be below maximum {max}"
            )));
        }
        let size = from_index.len() * to_index.len() * bins;
        Ok(TimeBinHistogram {
            min,
            max,
            bins,
            delta: (max - min) / (bins - 1) as f64,
            from_index,
            to_index,
            counts: vec![0; size],
            num_recorded: 0,
            num_trees: 0,
        })
    }

    /// Counts a jump at `time` from raw state `from` to raw state `to`.
    ///
    /// # Returns
    /// Whether the jump was counted; jumps outside `[min, max]` or between
    /// states not in the from/to sets are ignored.
    pub fn record(&mut self, time: f64, from: &str, to: &str) -> bool {
        if time < self.min || time > self.max {
            return false;
        }
        let (Some(f), Some(t)) = (self.from_index.index_of(from), self.to_index.index_of(to)) else {
            return false;
        };
        let bin = (((time - self.min) / self.delta).floor() as usize).min(self.bins - 1);
        let offset = self.offset(f, t, bin);
        self.counts[offset] += 1;
        self.num_recorded += 1;
        true
    }

    /// Notes that one more tree contributed, for per-tree normalisation.
    pub fn mark_tree(&mut self) {
        self.num_trees += 1;
    }

    pub fn count(&self, from: usize, to: usize, bin: usize) -> u64 {
        self.counts[self.offset(from, to, bin)]
    }

    /// Sum over all bins of one (from, to) pair.
    pub fn total(&self, from: usize, to: usize) -> u64 {
        let start = self.offset(from, to, 0);
        self.counts[start..start + self.bins].iter().sum()
    }

    pub fn num_recorded(&self) -> u64 {
        self.num_recorded
    }

    pub fn num_trees(&self) -> usize {
        self.num_trees
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Time at which `bin` starts.
    pub fn bin_start(&self, bin: usize) -> f64 {
        self.min + bin as f64 * self.delta
    }

    fn offset(&self, from: usize, to: usize, bin: usize) -> usize {
        (from * self.to_index.len() + to) * self.bins + bin
    }

    /// Writes one row per bin, keyed by its start time, with one
    /// tab-separated column per `from->to` pair.
    ///
    /// With `normalize`, counts are divided by the number of trees marked.
    ///
    /// # Errors
    /// Propagates write errors.
    pub fn write_tsv<W: Write + ?Sized>(&self, out: &mut W, normalize: bool) -> io::Result<()> {
        let mut pairs = Vec::new();
        write!(out, "time")?;
        for (f, from) in self.from_index.iter().enumerate() {
            for (t, to) in self.to_index.iter().enumerate() {
                write!(out, "\t{from}->{to}")?;
                pairs.push((f, t));
            }
        }
        writeln!(out)?;

        let trees = self.num_trees.max(1) as f64;
        for bin in 0..self.bins {
            write!(out, "{}", self.bin_start(bin))?;
            for &(f, t) in &pairs {
                let count = self.count(f, t, bin);
                if normalize {
                    write!(out, "\t{}", count as f64 / trees)?;
                } else {
                    write!(out, "\t{count}")?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::SetMode;
    use std::collections::BTreeSet;

    fn histogram(bins: usize) -> TimeBinHistogram {
        let states: BTreeSet<String> = ["X", "Y", "Z"].map(String::from).into();
        let index = StateSetIndex::build(&[], SetMode::Iterate, &states);
        TimeBinHistogram::new(0.0, 10.0, bins, index.clone(), index).unwrap()
    }

    #[test]
    fn test_single_event_lands_in_one_bin() {
        let mut histogram = histogram(5);
        assert_eq!(histogram.delta(), 2.5);
        assert!(histogram.record(6.0, "X", "Y"));
        for bin in 0..5 {
            assert_eq!(histogram.count(0, 1, bin), if bin == 2 { 1 } else { 0 });
        }
        assert_eq!(histogram.total(1, 0), 0);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let mut histogram = histogram(5);
        assert!(histogram.record(0.0, "X", "Y"));
        assert!(histogram.record(10.0, "X", "Y"));
        assert!(!histogram.record(10.5, "X", "Y"));
        assert!(!histogram.record(-0.1, "X", "Y"));
        assert!(!histogram.record(5.0, "X", "Unknown"));
        assert_eq!(histogram.count(0, 1, 0), 1);
        assert_eq!(histogram.count(0, 1, 4), 1);
        assert_eq!(histogram.num_recorded(), 2);
    }

    #[test]
    fn test_invalid_parameters() {
        let index = StateSetIndex::default();
        assert!(TimeBinHistogram::new(0.0, 10.0, 1, index.clone(), index.clone()).is_err());
        assert!(TimeBinHistogram::new(10.0, 10.0, 5, index.clone(), index).is_err());
    }

    #[test]
    fn test_write_normalized() {
        let states: BTreeSet<String> = ["X", "Y"].map(String::from).into();
        let from = StateSetIndex::build(&["X".to_string()], SetMode::Iterate, &states);
        let to = StateSetIndex::build(&["Y".to_string()], SetMode::Iterate, &states);
        let mut histogram = TimeBinHistogram::new(0.0, 2.0, 3, from, to).unwrap();
        histogram.record(1.2, "X", "Y");
        histogram.mark_tree();
        histogram.mark_tree();

        let mut out = Vec::new();
        histogram.write_tsv(&mut out, true).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "time\tX->Y\n0\t0\n1\t0.5\n2\t0\n"
        );
    }
}
