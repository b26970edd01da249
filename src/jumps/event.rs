use std::fmt;

/// A Markov jump: an instantaneous change of a discrete trait on a branch.
///
/// `time` is a height (time before the youngest tip), as logged by BEAST.
#[derive(Debug, Clone, PartialEq)]
pub struct JumpEvent {
    pub time: f64,
    pub from: String,
    pub to: String,
    /// State after the jump as logged separately by some tools;
    /// redundant with `to` and used for cross-checking
    pub current: Option<String>,
    /// Codon site for per-site (N/S) histories
    pub site: Option<u32>,
}

impl JumpEvent {
    /// Creates a jump without site or current state.
    pub fn new(time: f64, from: impl Into<String>, to: impl Into<String>) -> Self {
        JumpEvent {
            time,
            from: from.into(),
            to: to.into(),
            current: None,
            site: None,
        }
    }

    pub fn with_site(mut self, site: u32) -> Self {
        self.site = Some(site);
        self
    }

    pub fn with_current(mut self, current: impl Into<String>) -> Self {
        self.current = Some(current.into());
        self
    }
}

impl fmt::Display for JumpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(site) = self.site {
            write!(f, "{{{site},{},{},{}}}", self.time, self.from, self.to)
        } else {
            write!(f, "{{{},{},{}}}", self.time, self.from, self.to)
        }
    }
}

/// Field order of one jump tuple in a history annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JumpLayout {
    /// `{time, from, to}` or `{time, from, to, current}`
    #[default]
    Standard,
    /// `{site, time, from, to}`, as logged for codon histories
    SiteFirst,
}
