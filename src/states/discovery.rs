use crate::error::AnalysisError;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

/// A single jump tuple: one or two leading numbers (time, or site and time),
/// then the `from` and `to` states and an optional current state.
static JUMP_TUPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{\s*(?:[-+0-9.eE]+\s*,\s*){1,2}"?([^,{}"\s]+)"?\s*,\s*"?([^,{}"\s]+)"?\s*(?:,\s*"?[^,{}"\s]+"?\s*)?\}"#,
    )
    .unwrap()
});

/// Collects every state named in the tree file at `path` by scanning its raw
/// text, without parsing any tree.
///
/// Both the `from`/`to` fields of jump tuples and the values of
/// `state_annotation` are collected. Used to resolve "all states" before the
/// main pass over the sample.
///
/// # Errors
/// Returns [AnalysisError::Io] if the file cannot be read.
pub fn discover_states<P: AsRef<Path>>(
    path: P,
    state_annotation: &str,
) -> Result<BTreeSet<String>, AnalysisError> {
    let path = path.as_ref();
    log::info!("Scanning {} for states", path.display());
    let scanner = StateScanner::new(state_annotation)?;
    let reader = BufReader::new(File::open(path)?);

    let mut states = BTreeSet::new();
    for line in reader.lines() {
        scanner.scan(&line?, &mut states);
    }
    log::info!("Found {} distinct states", states.len());
    Ok(states)
}

/// Same as [discover_states] over text held in memory.
pub fn discover_states_in_str(
    content: &str,
    state_annotation: &str,
) -> Result<BTreeSet<String>, AnalysisError> {
    let scanner = StateScanner::new(state_annotation)?;
    let mut states = BTreeSet::new();
    for line in content.lines() {
        scanner.scan(line, &mut states);
    }
    Ok(states)
}

struct StateScanner {
    state_value: Regex,
}

impl StateScanner {
    fn new(state_annotation: &str) -> Result<Self, AnalysisError> {
        let pattern = format!(
            r#"[\[&,]\s*{}\s*=\s*(?:"([^"]*)"|([^,\[\]{{}}\s"]+))"#,
            regex::escape(state_annotation)
        );
        let state_value = Regex::new(&pattern).map_err(|e| {
            AnalysisError::Configuration(format!(
                "cannot match state annotation '{state_annotation}': {e}"
            ))
        })?;
        Ok(StateScanner { state_value })
    }

    fn scan(&self, line: &str, states: &mut BTreeSet<String>) {
        for captures in JUMP_TUPLE.captures_iter(line) {
            states.insert(captures[1].to_string());
            states.insert(captures[2].to_string());
        }
        for captures in self.state_value.captures_iter(line) {
            if let Some(value) = captures.get(1).or_else(|| captures.get(2)) {
                states.insert(value.as_str().to_string());
            }
        }
    }
}
