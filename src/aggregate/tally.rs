/// Count of events whose time falls into a closed window.
///
/// The window bounds may be given in either order, as calendar windows are
/// naturally written oldest first while heights grow into the past.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalTally {
    lower: f64,
    upper: f64,
    count: u64,
}

impl IntervalTally {
    pub fn new(start: f64, end: f64) -> Self {
        IntervalTally {
            lower: start.min(end),
            upper: start.max(end),
            count: 0,
        }
    }

    pub fn contains(&self, time: f64) -> bool {
        self.lower <= time && time <= self.upper
    }

    /// Counts `time` if inside the window and returns whether it was.
    pub fn record(&mut self, time: f64) -> bool {
        let inside = self.contains(time);
        if inside {
            self.count += 1;
        }
        inside
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}
