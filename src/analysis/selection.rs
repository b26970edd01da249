use crate::error::AnalysisError;
use crate::model::{Tree, VertexIndex};
use serde::{Deserialize, Serialize};

/// How taxon patterns are compared to leaf labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Exact,
    /// The label contains the pattern
    Contains,
}

impl MatchMode {
    pub fn matches(self, pattern: &str, label: &str) -> bool {
        match self {
            MatchMode::Exact => pattern == label,
            MatchMode::Contains => label.contains(pattern),
        }
    }
}

/// What to do with a lineage whose jumps contradict its states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    /// Fail the run
    #[default]
    Abort,
    /// Log the problem and leave the lineage (or tree) out
    SkipLineage,
}

impl MismatchPolicy {
    /// Decides whether `error`, raised while processing `unit`, ends the run.
    ///
    /// Missing annotations are always skipped with a warning; state
    /// mismatches and misplaced jumps are skipped only under
    /// [SkipLineage](Self::SkipLineage).
    ///
    /// # Errors
    /// Returns `error` if it is not skipped.
    pub fn recover(self, error: AnalysisError, unit: &str) -> Result<(), AnalysisError> {
        let skip = match &error {
            AnalysisError::MissingAnnotation { .. } => true,
            e => e.is_lineage_local() && self == MismatchPolicy::SkipLineage,
        };
        if skip {
            log::warn!("Skipping {unit}: {error}");
            Ok(())
        } else {
            Err(error)
        }
    }
}

/// A vertex a lineage walk starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageStart {
    pub vertex: VertexIndex,
    /// Taxon label, or the clade name for an MRCA start
    pub label: String,
}

/// Which lineages of each tree an analysis follows.
///
/// Leaves are selected by `taxa_to_process` (all leaves if empty) minus
/// `taxa_to_ignore`. If `mrca_taxa` is given, the lineage of the most
/// recent common ancestor of the matching leaves is followed instead.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LineageSelection {
    pub taxa_to_process: Vec<String>,
    pub taxa_to_ignore: Vec<String>,
    pub mrca_taxa: Vec<String>,
    pub match_mode: MatchMode,
}

impl LineageSelection {
    /// Returns whether every leaf is followed: nothing is selected or ignored.
    pub fn is_empty(&self) -> bool {
        self.taxa_to_process.is_empty() && self.taxa_to_ignore.is_empty() && self.mrca_taxa.is_empty()
    }

    fn matches_any(&self, patterns: &[String], label: &str) -> bool {
        patterns.iter().any(|p| self.match_mode.matches(p, label))
    }

    pub fn is_ignored(&self, label: &str) -> bool {
        self.matches_any(&self.taxa_to_ignore, label)
    }

    /// Returns the selected leaves of `tree`, by vertex index.
    pub fn selected_leaves(&self, tree: &Tree) -> Vec<VertexIndex> {
        self.filtered_leaves(tree, &self.taxa_to_process)
    }

    fn filtered_leaves(&self, tree: &Tree, patterns: &[String]) -> Vec<VertexIndex> {
        tree.leaves()
            .filter(|&leaf| {
                let label = tree.label(leaf).unwrap_or_default();
                (patterns.is_empty() || self.matches_any(patterns, label)) && !self.is_ignored(label)
            })
            .collect()
    }

    /// Returns the leaves matching `mrca_taxa` and their MRCA.
    ///
    /// # Returns
    /// `None` if no MRCA taxa are configured or none occurs in `tree`.
    pub fn clade(&self, tree: &Tree) -> Option<(VertexIndex, Vec<VertexIndex>)> {
        if self.mrca_taxa.is_empty() {
            return None;
        }
        let members = self.filtered_leaves(tree, &self.mrca_taxa);
        match tree.mrca(&members) {
            Some(mrca) => Some((mrca, members)),
            None => {
                log::warn!("No MRCA taxa found in tree {}", tree.id());
                None
            }
        }
    }

    /// Returns the vertices to walk from in `tree`.
    pub fn starts(&self, tree: &Tree) -> Vec<LineageStart> {
        if !self.mrca_taxa.is_empty() {
            return self
                .clade(tree)
                .map(|(mrca, _)| LineageStart {
                    vertex: mrca,
                    label: format!("MRCA({})", self.mrca_taxa.join("+")),
                })
                .into_iter()
                .collect();
        }
        self.selected_leaves(tree)
            .into_iter()
            .map(|leaf| LineageStart {
                vertex: leaf,
                label: tree.label(leaf).unwrap_or_default().to_string(),
            })
            .collect()
    }
}
