/// Conversion between vertex heights and reported times.
///
/// Heights count backwards from the youngest tip. With a most recent sampling
/// date (mrsd) configured, times are calendar dates `mrsd − height` and thus
/// decrease towards the root; otherwise times are the heights themselves.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeScale {
    mrsd: Option<f64>,
}

impl TimeScale {
    /// Times are heights.
    pub fn heights() -> Self {
        TimeScale { mrsd: None }
    }

    /// Times are calendar dates relative to `mrsd`.
    ///
    /// An unset date as written by some tools (`f64::MAX`) or any
    /// non-finite value gives [heights](Self::heights) instead.
    pub fn calendar(mrsd: f64) -> Self {
        Self::from_mrsd(Some(mrsd))
    }

    pub fn from_mrsd(mrsd: Option<f64>) -> Self {
        TimeScale {
            mrsd: mrsd.filter(|d| d.is_finite() && *d != f64::MAX),
        }
    }

    pub fn mrsd(&self) -> Option<f64> {
        self.mrsd
    }

    /// Returns whether times are calendar dates.
    pub fn is_calendar(&self) -> bool {
        self.mrsd.is_some()
    }

    /// Converts a height to a time.
    pub fn adjust(&self, height: f64) -> f64 {
        match self.mrsd {
            Some(mrsd) => mrsd - height,
            None => height,
        }
    }

    /// Converts a time back to a height.
    pub fn to_height(&self, time: f64) -> f64 {
        // mrsd − (mrsd − h) = h, so the conversion is its own inverse
        self.adjust(time)
    }
}
