//! TOML configuration of an analysis run.
//!
//! ```toml
//! input = "h7n9.trees"
//! burn_in = 1000
//! mrsd = 2017.25
//! merge_states = "provinces.tsv"
//!
//! [selection]
//! taxa_to_process = ["Hubei"]
//! match_mode = "contains"
//!
//! [analysis]
//! kind = "taxa_jumps"
//! end_state = "Guangdong"
//! ```

use crate::aggregate::{
    AncestralPropagationAggregator, EvaluationPoint, GeneticCode, PersistenceChainAggregator,
    PersistenceTimeAggregator, TimeBinHistogram,
};
use crate::analysis::{
    AncestralStateAnalysis, EventCountAnalysis, JumpHistogramAnalysis, LineageSelection, MismatchPolicy,
    PersistenceTimeAnalysis, TaxaJumpAnalysis, TransmissionChainAnalysis, TreeAnalysis,
};
use crate::error::AnalysisError;
use crate::jumps::{DEFAULT_HISTORY_ATTRIBUTE, DEFAULT_STATE_ATTRIBUTE, JumpHistoryDecoder};
use crate::nexus::Burnin;
use crate::states::{SetMode, StateMerger, StateSetIndex, discover_states};
use crate::stream::TreeStream;
use crate::walker::{LineageWalker, StopCondition, TimeScale};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

fn default_state_annotation() -> String {
    DEFAULT_STATE_ATTRIBUTE.to_string()
}

fn default_history_annotation() -> String {
    DEFAULT_HISTORY_ATTRIBUTE.to_string()
}

fn default_true() -> bool {
    true
}

/// Settings shared by all analyses plus the analysis itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Tree file, NEXUS or Newick
    pub input: PathBuf,
    /// Table destination; standard output if unset
    pub output: Option<PathBuf>,
    /// Number of trees to discard
    #[serde(default)]
    pub burn_in: usize,
    /// Most recent sampling date, turning heights into calendar times
    pub mrsd: Option<f64>,
    #[serde(default = "default_state_annotation")]
    pub state_annotation: String,
    #[serde(default = "default_history_annotation")]
    pub history_annotation: String,
    /// Two-column TSV mapping raw states onto merged states
    pub merge_states: Option<PathBuf>,
    #[serde(default)]
    pub on_mismatch: MismatchPolicy,
    #[serde(default)]
    pub selection: LineageSelection,
    pub analysis: AnalysisKind,
}

/// The analysis to run and its own settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisKind {
    TaxaJumps {
        end_state: Option<String>,
        /// Calendar time; needs `mrsd`
        end_time: Option<f64>,
    },
    TransmissionChains {
        states: Vec<String>,
        /// Calendar time with `mrsd`, height otherwise
        time_slice: Option<f64>,
    },
    PersistenceTimes {
        /// Calendar times with `mrsd`, heights otherwise
        evaluation_times: Vec<f64>,
        /// One limit per evaluation time; unlimited if empty
        #[serde(default)]
        ancestral_times: Vec<f64>,
    },
    JumpHistogram {
        bins: usize,
        min: f64,
        max: f64,
        /// All observed states if empty
        #[serde(default)]
        from_states: Vec<String>,
        #[serde(default)]
        to_states: Vec<String>,
        #[serde(default = "default_true")]
        iterate_from: bool,
        #[serde(default = "default_true")]
        iterate_to: bool,
        #[serde(default)]
        normalize: bool,
    },
    AncestralStates {
        #[serde(default)]
        translate_codons: bool,
    },
    EventCounts {
        window_start: f64,
        window_end: f64,
    },
}

impl AnalysisConfig {
    /// Reads and parses the configuration file at `path`.
    ///
    /// # Errors
    /// * [AnalysisError::Io] if the file cannot be read
    /// * [AnalysisError::Configuration] if it is not a valid configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration.
    ///
    /// # Errors
    /// Returns [AnalysisError::Configuration] if `content` is not a valid configuration.
    pub fn from_toml_str(content: &str) -> Result<Self, AnalysisError> {
        toml::from_str(content).map_err(|e| AnalysisError::Configuration(e.to_string()))
    }

    /// Checks the settings for contradictions.
    ///
    /// Settings that cannot take effect are logged and returned as warnings;
    /// the run then goes ahead without them.
    ///
    /// # Errors
    /// Returns [AnalysisError::Configuration] for settings no run can use.
    pub fn validate(&self) -> Result<Vec<String>, AnalysisError> {
        let mut warnings = Vec::new();
        if let Some(mrsd) = self.mrsd
            && !mrsd.is_finite()
        {
            return Err(AnalysisError::Configuration(format!("mrsd {mrsd} is not a date")));
        }

        match &self.analysis {
            AnalysisKind::TaxaJumps { end_time, .. } => {
                if end_time.is_some() && !self.time_scale().is_calendar() {
                    warnings.push("end_time is ignored without mrsd".to_string());
                }
            }
            AnalysisKind::TransmissionChains { states, time_slice } => {
                if states.is_empty() {
                    return Err(AnalysisError::Configuration(
                        "transmission_chains needs at least one state".to_string(),
                    ));
                }
                if time_slice.is_some() && !self.time_scale().is_calendar() {
                    warnings.push("time_slice is read as a height since mrsd is unset".to_string());
                }
            }
            AnalysisKind::PersistenceTimes {
                evaluation_times,
                ancestral_times,
            } => {
                if evaluation_times.is_empty() {
                    return Err(AnalysisError::Configuration(
                        "persistence_times needs at least one evaluation time".to_string(),
                    ));
                }
                if !ancestral_times.is_empty() && ancestral_times.len() != evaluation_times.len() {
                    return Err(AnalysisError::Configuration(format!(
                        "persistence_times has {} evaluation times but {} ancestral times",
                        evaluation_times.len(),
                        ancestral_times.len()
                    )));
                }
            }
            AnalysisKind::JumpHistogram { bins, min, max, .. } => {
                if *bins < 2 {
                    return Err(AnalysisError::Configuration(format!(
                        "jump_histogram needs at least 2 bins, got {bins}"
                    )));
                }
                if !(min < max) {
                    return Err(AnalysisError::Configuration(format!(
                        "jump_histogram min {min} must be below max {max}"
                    )));
                }
            }
            AnalysisKind::AncestralStates { .. } => {
                if !self.selection.is_empty() {
                    warnings.push("ancestral_states covers all vertices; selection is ignored".to_string());
                }
            }
            AnalysisKind::EventCounts {
                window_start,
                window_end,
            } => {
                if window_start > window_end {
                    return Err(AnalysisError::Configuration(format!(
                        "event_counts window starts at {window_start} after its end {window_end}"
                    )));
                }
            }
        }

        for warning in &warnings {
            log::warn!("{warning}");
        }
        Ok(warnings)
    }

    pub fn time_scale(&self) -> TimeScale {
        TimeScale::from_mrsd(self.mrsd)
    }

    pub fn burn_in(&self) -> Burnin {
        Burnin::Count(self.burn_in)
    }

    /// Loads the state merge table, if configured.
    ///
    /// # Errors
    /// See [StateMerger::from_tsv_file].
    pub fn merger(&self) -> Result<Option<StateMerger>, AnalysisError> {
        self.merge_states
            .as_ref()
            .map(|path| {
                let merger = StateMerger::from_tsv_file(path)?;
                log::info!("Merging {} states from {}", merger.len(), path.display());
                Ok(merger)
            })
            .transpose()
    }

    /// Creates the decoder for the configured annotations and merge table.
    ///
    /// # Errors
    /// See [merger](Self::merger).
    pub fn decoder(&self) -> Result<JumpHistoryDecoder, AnalysisError> {
        let decoder = JumpHistoryDecoder::new()
            .with_state_attribute(&self.state_annotation)
            .with_history_attribute(&self.history_annotation);
        Ok(match self.merger()? {
            Some(merger) => decoder.with_merger(merger),
            None => decoder,
        })
    }

    /// Opens the input as a stream with the burn-in discarded.
    ///
    /// # Errors
    /// See [TreeStream::open].
    pub fn open_stream(&self) -> Result<TreeStream, AnalysisError> {
        TreeStream::open(&self.input, self.burn_in())
    }

    /// Builds the configured analysis.
    ///
    /// A histogram without explicit states first scans the input for all
    /// states.
    ///
    /// # Errors
    /// * [AnalysisError::Configuration] for invalid settings
    /// * [AnalysisError::Io] if the merge table or input cannot be read
    pub fn build_analysis(&self) -> Result<Box<dyn TreeAnalysis>, AnalysisError> {
        let time_scale = self.time_scale();
        let policy = self.on_mismatch;

        let analysis: Box<dyn TreeAnalysis> = match &self.analysis {
            AnalysisKind::TaxaJumps { end_state, end_time } => {
                let mut stop = StopCondition::at_root();
                stop.end_state = end_state.clone();
                stop.end_time = *end_time;
                let walker = LineageWalker::new(self.decoder()?, stop, time_scale);
                Box::new(TaxaJumpAnalysis::new(walker, self.selection.clone()).with_policy(policy))
            }
            AnalysisKind::TransmissionChains { states, time_slice } => {
                let mut aggregator = PersistenceChainAggregator::new(self.decoder()?, states.clone());
                if let Some(slice) = time_slice {
                    aggregator = aggregator.with_time_slice(time_scale.to_height(*slice));
                }
                Box::new(TransmissionChainAnalysis::new(aggregator).with_policy(policy))
            }
            AnalysisKind::PersistenceTimes {
                evaluation_times,
                ancestral_times,
            } => {
                let points = evaluation_times
                    .iter()
                    .enumerate()
                    .map(|(i, &time)| match ancestral_times.get(i) {
                        Some(&ancestral) => EvaluationPoint::new(time).with_ancestral_time(ancestral),
                        None => EvaluationPoint::new(time),
                    })
                    .collect();
                let aggregator =
                    PersistenceTimeAggregator::new(self.decoder()?, points).with_time_scale(time_scale);
                Box::new(PersistenceTimeAnalysis::new(aggregator).with_policy(policy))
            }
            AnalysisKind::JumpHistogram {
                bins,
                min,
                max,
                from_states,
                to_states,
                iterate_from,
                iterate_to,
                normalize,
            } => {
                let decoder = self.decoder()?;
                let observed = if from_states.is_empty() || to_states.is_empty() {
                    self.observed_states()?
                } else {
                    BTreeSet::new()
                };
                let from_index = StateSetIndex::build(from_states, set_mode(*iterate_from), &observed);
                let to_index = StateSetIndex::build(to_states, set_mode(*iterate_to), &observed);
                log::info!(
                    "Counting jumps from {} to {} state sets",
                    from_index.len(),
                    to_index.len()
                );
                let histogram = TimeBinHistogram::new(*min, *max, *bins, from_index, to_index)?;
                let walker = LineageWalker::new(decoder, StopCondition::at_root(), time_scale);
                Box::new(
                    JumpHistogramAnalysis::new(walker, self.selection.clone(), histogram)
                        .with_normalization(*normalize)
                        .with_policy(policy),
                )
            }
            AnalysisKind::AncestralStates { translate_codons } => {
                let aggregator = AncestralPropagationAggregator::new(&self.history_annotation);
                let mut analysis = AncestralStateAnalysis::new(aggregator).with_policy(policy);
                if *translate_codons {
                    analysis = analysis.with_genetic_code(GeneticCode::universal());
                }
                Box::new(analysis)
            }
            AnalysisKind::EventCounts {
                window_start,
                window_end,
            } => Box::new(
                EventCountAnalysis::new(self.decoder()?, time_scale, *window_start, *window_end)
                    .with_policy(policy),
            ),
        };
        Ok(analysis)
    }

    /// All states in the input after merging.
    fn observed_states(&self) -> Result<BTreeSet<String>, AnalysisError> {
        let raw = discover_states(&self.input, &self.state_annotation)?;
        Ok(match self.merger()? {
            Some(merger) => raw.iter().map(|state| merger.merge(state)).collect(),
            None => raw,
        })
    }
}

fn set_mode(iterate: bool) -> SetMode {
    if iterate { SetMode::Iterate } else { SetMode::Combine }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            input = "run.trees"

            [analysis]
            kind = "taxa_jumps"
            end_state = "Guangdong"
            "#,
        )
        .unwrap();
        assert_eq!(config.burn_in, 0);
        assert_eq!(config.state_annotation, "location");
        assert_eq!(config.history_annotation, "history");
        assert_eq!(config.on_mismatch, MismatchPolicy::Abort);
        assert!(config.selection.is_empty());
        assert!(!config.time_scale().is_calendar());
        assert_eq!(
            config.analysis,
            AnalysisKind::TaxaJumps {
                end_state: Some("Guangdong".to_string()),
                end_time: None
            }
        );
    }

    #[test]
    fn test_histogram_and_selection() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            input = "run.trees"
            mrsd = 2020.0
            on_mismatch = "skip_lineage"

            [selection]
            taxa_to_process = ["Hubei"]
            match_mode = "contains"

            [analysis]
            kind = "jump_histogram"
            bins = 5
            min = 2010.0
            max = 2020.0
            from_states = ["Hubei"]
            iterate_to = false
            "#,
        )
        .unwrap();
        assert_eq!(config.on_mismatch, MismatchPolicy::SkipLineage);
        assert_eq!(config.selection.taxa_to_process, vec!["Hubei"]);
        let AnalysisKind::JumpHistogram {
            iterate_from,
            iterate_to,
            to_states,
            ..
        } = &config.analysis
        else {
            panic!("expected a jump histogram");
        };
        assert!(iterate_from);
        assert!(!iterate_to);
        assert!(to_states.is_empty());
        assert_eq!(config.validate().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_validation() {
        let parse = |analysis: &str| {
            AnalysisConfig::from_toml_str(&format!("input = \"t\"\n[analysis]\n{analysis}")).unwrap()
        };

        let bins = parse("kind = \"jump_histogram\"\nbins = 1\nmin = 0.0\nmax = 1.0");
        assert!(matches!(bins.validate(), Err(AnalysisError::Configuration(_))));

        let states = parse("kind = \"transmission_chains\"\nstates = []");
        assert!(states.validate().is_err());

        let window = parse("kind = \"event_counts\"\nwindow_start = 5.0\nwindow_end = 1.0");
        assert!(window.validate().is_err());

        let points = parse("kind = \"persistence_times\"\nevaluation_times = [1.0, 2.0]\nancestral_times = [3.0]");
        assert!(points.validate().is_err());
        let points = parse("kind = \"persistence_times\"\nevaluation_times = [1.0, 2.0]");
        assert_eq!(points.validate().unwrap().len(), 0);

        let end_time = parse("kind = \"taxa_jumps\"\nend_time = 2015.0");
        assert_eq!(end_time.validate().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result = AnalysisConfig::from_toml_str("input = \"t\"\n[analysis]\nkind = \"skyline\"\n");
        assert!(matches!(result, Err(AnalysisError::Configuration(_))));
    }
}
