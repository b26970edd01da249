use crate::error::AnalysisError;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Separator of member names in the name of a combined set.
const COMBINED_NAME_SEPARATOR: &str = "+";

/// How a list of states is turned into sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetMode {
    /// One set per state
    #[default]
    Iterate,
    /// All states in a single set
    Combine,
}

// =#========================================================================#=
// STATE SET
// =#========================================================================#=
/// A named set of raw state labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSet {
    name: String,
    members: BTreeSet<String>,
}

impl StateSet {
    pub fn new(name: impl Into<String>, members: impl IntoIterator<Item = String>) -> Self {
        StateSet {
            name: name.into(),
            members: members.into_iter().collect(),
        }
    }

    /// Creates a set holding only `state`, named after it.
    pub fn singleton(state: impl Into<String>) -> Self {
        let state = state.into();
        StateSet {
            name: state.clone(),
            members: BTreeSet::from([state]),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the members in sorted order.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.members.contains(raw)
    }
}

impl fmt::Display for StateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// =#========================================================================#=
// STATE SET INDEX
// =#========================================================================#=
/// Ordered list of disjoint [StateSet]s with lookup from raw label to set.
///
/// The position of a set is its index into aggregation tables, e.g. the
/// `from`/`to` axes of a [TimeBinHistogram](crate::aggregate::TimeBinHistogram).
///
/// # Example
/// ```
/// use jumphistory::states::{SetMode, StateSetIndex};
/// use std::collections::BTreeSet;
///
/// let observed = BTreeSet::from(["Hubei".to_string(), "Fujian".to_string()]);
/// let index = StateSetIndex::build(&[], SetMode::Iterate, &observed);
/// assert_eq!(index.names(), vec!["Fujian", "Hubei"]);
/// assert_eq!(index.index_of("Hubei"), Some(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StateSetIndex {
    sets: Vec<StateSet>,
    /// Raw label -> position in `sets`
    positions: HashMap<String, usize>,
}

impl StateSetIndex {
    /// Builds the sets for `explicit` states, or for all `observed` states
    /// if `explicit` is empty.
    ///
    /// [SetMode::Iterate] gives one singleton set per distinct state in
    /// sorted order; [SetMode::Combine] gives one set named by joining its
    /// states with `+`.
    pub fn build(explicit: &[String], mode: SetMode, observed: &BTreeSet<String>) -> Self {
        let labels: BTreeSet<String> = if explicit.is_empty() {
            observed.clone()
        } else {
            explicit.iter().cloned().collect()
        };
        if labels.is_empty() {
            return Self::default();
        }

        let sets = match mode {
            SetMode::Iterate => labels.into_iter().map(StateSet::singleton).collect(),
            SetMode::Combine => {
                let name = labels
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(COMBINED_NAME_SEPARATOR);
                vec![StateSet::new(name, labels)]
            }
        };
        Self::from_disjoint_sets(sets)
    }

    /// Builds an index from explicitly named groups, keeping their order.
    ///
    /// # Errors
    /// Returns [AnalysisError::Configuration] if a state belongs to more than one group.
    pub fn from_groups<I, M>(groups: I) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = (String, M)>,
        M: IntoIterator<Item = String>,
    {
        let sets: Vec<StateSet> = groups
            .into_iter()
            .map(|(name, members)| StateSet::new(name, members))
            .collect();

        let mut seen: HashMap<&str, &str> = HashMap::new();
        for set in &sets {
            for member in set.members() {
                if let Some(other) = seen.insert(member, set.name()) {
                    return Err(AnalysisError::Configuration(format!(
                        "state '{member}' belongs to both '{other}' and '{}'",
                        set.name()
                    )));
                }
            }
        }
        Ok(Self::from_disjoint_sets(sets))
    }

    fn from_disjoint_sets(sets: Vec<StateSet>) -> Self {
        let positions = sets
            .iter()
            .enumerate()
            .flat_map(|(i, set)| set.members().map(move |m| (m.to_string(), i)))
            .collect();
        StateSetIndex { sets, positions }
    }

    /// Returns the set containing `raw`.
    pub fn lookup(&self, raw: &str) -> Option<&StateSet> {
        self.index_of(raw).map(|i| &self.sets[i])
    }

    /// Returns the position of the set containing `raw`.
    pub fn index_of(&self, raw: &str) -> Option<usize> {
        self.positions.get(raw).copied()
    }

    pub fn get(&self, index: usize) -> Option<&StateSet> {
        self.sets.get(index)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Returns the set names in index order.
    pub fn names(&self) -> Vec<&str> {
        self.sets.iter().map(StateSet::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateSet> {
        self.sets.iter()
    }
}
