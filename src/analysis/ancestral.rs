use crate::aggregate::{AncestralPropagationAggregator, GeneticCode};
use crate::analysis::{MismatchPolicy, TreeAnalysis};
use crate::error::AnalysisError;
use crate::model::Tree;
use std::io::Write;

/// Per-site states at every vertex, optionally translated to amino acids.
pub struct AncestralStateAnalysis {
    aggregator: AncestralPropagationAggregator,
    genetic_code: Option<GeneticCode>,
    policy: MismatchPolicy,
}

impl AncestralStateAnalysis {
    pub const HEADER: &'static str = "treeId\tvertex\ttaxon\tsite\tstate\taminoAcid";

    pub fn new(aggregator: AncestralPropagationAggregator) -> Self {
        AncestralStateAnalysis {
            aggregator,
            genetic_code: None,
            policy: MismatchPolicy::default(),
        }
    }

    /// Translates codon states with `code`.
    pub fn with_genetic_code(mut self, code: GeneticCode) -> Self {
        self.genetic_code = Some(code);
        self
    }

    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl TreeAnalysis for AncestralStateAnalysis {
    fn write_header(&mut self, out: &mut dyn Write) -> Result<(), AnalysisError> {
        writeln!(out, "{}", Self::HEADER)?;
        Ok(())
    }

    fn process_tree(&mut self, tree: &Tree, out: &mut dyn Write) -> Result<(), AnalysisError> {
        let sites = match self.aggregator.propagate(tree) {
            Ok(sites) => sites,
            Err(e) => return self.policy.recover(e, &format!("tree {}", tree.id())),
        };

        for vertex in 0..tree.num_vertices() {
            let taxon = tree.label(vertex).unwrap_or("NA");
            for (site, state) in sites.states_at(vertex) {
                let amino_acid = self
                    .genetic_code
                    .as_ref()
                    .and_then(|code| code.translate(state))
                    .map_or_else(|| "NA".to_string(), |aa| aa.to_string());
                writeln!(out, "{}\t{vertex}\t{taxon}\t{site}\t{state}\t{amino_acid}", tree.id())?;
            }
        }
        Ok(())
    }
}
