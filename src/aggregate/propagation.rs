use crate::error::AnalysisError;
use crate::jumps::{JumpEvent, JumpLayout, decode};
use crate::model::{Tree, VertexIndex};
use std::collections::{BTreeMap, HashMap};

/// Codon bases in the order of [UNIVERSAL_AMINO_ACIDS].
const BASES: [u8; 4] = *b"TCAG";
/// Amino acids of the 64 codons, first base slowest; `*` marks stop codons.
const UNIVERSAL_AMINO_ACIDS: &[u8; 64] =
    b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

// ============================================================================
// Genetic Code (pub)
// ============================================================================
/// Translation of codons to amino acids.
#[derive(Debug, Clone)]
pub struct GeneticCode {
    amino_acids: HashMap<String, char>,
}

impl GeneticCode {
    /// The standard nuclear code.
    pub fn universal() -> Self {
        let mut amino_acids = HashMap::with_capacity(64);
        for (i, &first) in BASES.iter().enumerate() {
            for (j, &second) in BASES.iter().enumerate() {
                for (k, &third) in BASES.iter().enumerate() {
                    let codon = String::from_utf8_lossy(&[first, second, third]).into_owned();
                    let amino_acid = UNIVERSAL_AMINO_ACIDS[i * 16 + j * 4 + k] as char;
                    amino_acids.insert(codon, amino_acid);
                }
            }
        }
        GeneticCode { amino_acids }
    }

    /// Translates a codon such as `GCA` (case-insensitive, `U` read as `T`).
    ///
    /// # Returns
    /// `None` for anything that is not a codon of unambiguous bases.
    pub fn translate(&self, codon: &str) -> Option<char> {
        let codon = codon.to_ascii_uppercase().replace('U', "T");
        self.amino_acids.get(&codon).copied()
    }
}

// ============================================================================
// Site States (pub)
// ============================================================================
/// Resolved state of every site at every vertex of one tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteStates {
    /// Indexed by vertex; site -> state
    states: Vec<BTreeMap<u32, String>>,
}

impl SiteStates {
    pub fn state(&self, vertex: VertexIndex, site: u32) -> Option<&str> {
        self.states.get(vertex)?.get(&site).map(String::as_str)
    }

    /// Returns the sites and their states at `vertex`, by site.
    pub fn states_at(&self, vertex: VertexIndex) -> impl Iterator<Item = (u32, &str)> {
        self.states
            .get(vertex)
            .into_iter()
            .flat_map(|sites| sites.iter().map(|(site, state)| (*site, state.as_str())))
    }
}

// =#========================================================================#=
// ANCESTRAL PROPAGATION AGGREGATOR
// =#========================================================================#=
/// Derives per-site states at all vertices from per-site jump histories
/// (`{site, time, from, to}` tuples).
///
/// The root state of a site is a supplied one, else the `from` state of the
/// oldest jump at that site anywhere in the tree. States then flow from the
/// root to the tips: a vertex inherits its parent's states and applies the
/// jumps of its branch oldest first. Sites that never jump and have no
/// supplied root state stay unresolved.
#[derive(Debug, Clone)]
pub struct AncestralPropagationAggregator {
    history_attribute: String,
    root_states: BTreeMap<u32, String>,
}

impl AncestralPropagationAggregator {
    pub fn new(history_attribute: impl Into<String>) -> Self {
        AncestralPropagationAggregator {
            history_attribute: history_attribute.into(),
            root_states: BTreeMap::new(),
        }
    }

    /// Fixes the root state of `site`.
    pub fn with_root_state(mut self, site: u32, state: impl Into<String>) -> Self {
        self.root_states.insert(site, state.into());
        self
    }

    /// Resolves the states of all sites at all vertices of `tree`.
    ///
    /// # Errors
    /// * [AnalysisError::MalformedJump] if a history is not made of site jumps
    /// * [AnalysisError::StateMismatch] if a jump does not start in the state
    ///   its site is in at that point
    pub fn propagate(&self, tree: &Tree) -> Result<SiteStates, AnalysisError> {
        let mut branch_jumps: Vec<Vec<JumpEvent>> = Vec::with_capacity(tree.num_vertices());
        for vertex in 0..tree.num_vertices() {
            let mut jumps = if tree.is_root(vertex) {
                Vec::new()
            } else {
                decode(tree, vertex, &self.history_attribute, JumpLayout::SiteFirst)?.unwrap_or_default()
            };
            // Oldest (greatest height) first
            jumps.sort_by(|a, b| b.time.total_cmp(&a.time));
            branch_jumps.push(jumps);
        }

        let mut states = vec![BTreeMap::new(); tree.num_vertices()];
        states[tree.root_index()] = self.root_states_of(&branch_jumps);

        for vertex in tree.pre_order_iter().map(|v| v.index()) {
            let Some(parent) = tree.parent(vertex) else {
                continue;
            };
            let mut sites = states[parent].clone();
            for jump in &branch_jumps[vertex] {
                let site = jump.site.unwrap_or_default();
                if let Some(current) = sites.get(&site)
                    && *current != jump.from
                {
                    return Err(AnalysisError::StateMismatch {
                        tree_id: tree.id().to_string(),
                        vertex,
                        expected: current.clone(),
                        found: jump.from.clone(),
                    });
                }
                sites.insert(site, jump.to.clone());
            }
            states[vertex] = sites;
        }
        Ok(SiteStates { states })
    }

    fn root_states_of(&self, branch_jumps: &[Vec<JumpEvent>]) -> BTreeMap<u32, String> {
        let mut oldest: BTreeMap<u32, &JumpEvent> = BTreeMap::new();
        for jump in branch_jumps.iter().flatten() {
            let site = jump.site.unwrap_or_default();
            let older = oldest.get(&site).is_none_or(|known| jump.time > known.time);
            if older {
                oldest.insert(site, jump);
            }
        }

        let mut roots: BTreeMap<u32, String> = oldest
            .into_iter()
            .map(|(site, jump)| (site, jump.from.clone()))
            .collect();
        roots.extend(self.root_states.clone());
        roots
    }
}
