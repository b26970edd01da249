use crate::error::AnalysisError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Case-insensitive mapping of raw states onto merged states,
/// e.g. `guangzhou -> Guangdong`.
///
/// States without an entry are kept as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateMerger {
    /// Lowercased raw state -> merged state
    merged: HashMap<String, String>,
}

impl StateMerger {
    /// Creates a merger from `(raw, merged)` pairs.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: Into<String>,
    {
        StateMerger {
            merged: pairs
                .into_iter()
                .map(|(raw, merged)| (raw.as_ref().to_lowercase(), merged.into()))
                .collect(),
        }
    }

    /// Loads a two-column tab-separated table `State\tNew_State`; the first
    /// line is a header and skipped.
    ///
    /// # Errors
    /// * [AnalysisError::Io] if the file cannot be read
    /// * [AnalysisError::Configuration] if a row does not have two columns
    pub fn from_tsv_file<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let content = fs::read_to_string(path)?;
        Self::from_tsv_str(&content)
    }

    /// Parses the table format of [from_tsv_file](Self::from_tsv_file).
    ///
    /// # Errors
    /// Returns [AnalysisError::Configuration] if a row does not have two columns.
    pub fn from_tsv_str(content: &str) -> Result<Self, AnalysisError> {
        let mut pairs = Vec::new();
        for (line_number, line) in content.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let columns: Vec<&str> = line.split('\t').map(str::trim).collect();
            let [raw, merged] = columns.as_slice() else {
                return Err(AnalysisError::Configuration(format!(
                    "merge table line {} should have two columns: State and New_State",
                    line_number + 1
                )));
            };
            pairs.push((raw.to_string(), merged.to_string()));
        }
        Ok(Self::from_pairs(pairs))
    }

    /// Returns the merged state for `raw`, or `raw` itself.
    pub fn merge(&self, raw: &str) -> String {
        self.merged
            .get(&raw.to_lowercase())
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }

    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_case_insensitive() {
        let merger = StateMerger::from_tsv_str("State\tNew_State\nGuangzhou\tGuangdong\nshenzhen\tGuangdong\n")
            .unwrap();
        assert_eq!(merger.len(), 2);
        assert_eq!(merger.merge("GUANGZHOU"), "Guangdong");
        assert_eq!(merger.merge("Shenzhen"), "Guangdong");
        assert_eq!(merger.merge("Hubei"), "Hubei");
    }

    #[test]
    fn test_bad_row_rejected() {
        let result = StateMerger::from_tsv_str("State\tNew_State\nGuangzhou\n");
        assert!(matches!(result, Err(AnalysisError::Configuration(_))));
    }
}
