use crate::model::VertexIndex;
use crate::walker::TimeScale;

/// A stretch of a lineage spent in one state.
///
/// `start` is the tipward end, `end` the rootward end, both as reported by
/// the walk's [TimeScale].
#[derive(Debug, Clone, PartialEq)]
pub struct StateInterval {
    pub state: String,
    pub start: f64,
    pub end: f64,
}

/// A jump taken by a lineage, in the order the walk met it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub time: f64,
    pub from: String,
    pub to: String,
    /// Child vertex of the branch carrying the jump
    pub branch: VertexIndex,
}

/// Why a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Root,
    EndState,
    EndTime,
    StopVertex,
}

/// State history of one lineage, from its start vertex up to where the walk stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct LineagePath {
    pub start: VertexIndex,
    pub stop: VertexIndex,
    pub stop_reason: StopReason,
    pub start_time: f64,
    pub stop_time: f64,
    /// Tipward first; never empty
    pub intervals: Vec<StateInterval>,
    /// One per boundary between consecutive intervals
    pub transitions: Vec<Transition>,
    pub time_scale: TimeScale,
}

impl LineagePath {
    /// State the lineage was in at its start vertex.
    pub fn start_state(&self) -> &str {
        &self.intervals[0].state
    }

    /// State the lineage was in where the walk stopped.
    pub fn stop_state(&self) -> &str {
        &self.intervals[self.intervals.len() - 1].state
    }

    /// Checks that the intervals chain without gaps or overlaps from
    /// `start_time` to `stop_time` and that every transition leaves the
    /// state of the interval before it and enters the state of the one after.
    ///
    /// # Errors
    /// Describes the first violation found.
    pub fn check_continuity(&self) -> Result<(), String> {
        let (Some(first), Some(last)) = (self.intervals.first(), self.intervals.last()) else {
            return Err("path has no intervals".to_string());
        };
        if first.start != self.start_time {
            return Err(format!("first interval starts at {} not {}", first.start, self.start_time));
        }
        if last.end != self.stop_time {
            return Err(format!("last interval ends at {} not {}", last.end, self.stop_time));
        }
        if self.transitions.len() + 1 != self.intervals.len() {
            return Err(format!(
                "{} intervals but {} transitions",
                self.intervals.len(),
                self.transitions.len()
            ));
        }

        for (i, interval) in self.intervals.iter().enumerate() {
            let start = self.time_scale.to_height(interval.start);
            let end = self.time_scale.to_height(interval.end);
            if end < start {
                return Err(format!("interval {i} runs backwards from {} to {}", interval.start, interval.end));
            }
        }

        for (i, (pair, transition)) in self.intervals.windows(2).zip(&self.transitions).enumerate() {
            let (before, after) = (&pair[0], &pair[1]);
            if before.end != after.start || transition.time != before.end {
                return Err(format!("gap or overlap between intervals {i} and {}", i + 1));
            }
            if transition.from != before.state || transition.to != after.state {
                return Err(format!(
                    "transition {i} goes {} -> {} between states {} and {}",
                    transition.from, transition.to, before.state, after.state
                ));
            }
        }
        Ok(())
    }
}
