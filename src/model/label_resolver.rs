//! Label resolution for Newick strings read from plain files or Nexus TREES blocks.
//!
//! A BEAST Nexus file usually abbreviates taxa with TRANSLATE keys
//! (`1 'A/Hubei/1/2013'`); the [LabelResolver] maps those keys back to
//! the full taxon names while leaves are added.

use std::collections::HashMap;
use std::fmt;

// =#========================================================================#=
// LABEL RESOLVER
// =#========================================================================#=
/// Resolves labels parsed from Newick strings into taxon names.
#[derive(Debug, Clone, Default)]
pub enum LabelResolver {
    /// Passes labels through unchanged.
    ///
    /// Use for raw Newick files and Nexus files without TRANSLATE command.
    #[default]
    Verbatim,

    /// Resolves labels with a Nexus TRANSLATE mapping.
    ///
    /// Tries in order:
    /// 1. Key of the TRANSLATE map (e.g. "12" -> "A/Hubei/1/2013")
    /// 2. Integer as 1-based index into the TAXA block
    /// 3. Verbatim match against a taxon of the TAXA block
    Translate {
        /// TRANSLATE key -> taxon name
        translation: HashMap<String, String>,
        /// Taxa in TAXA block order (may be empty)
        taxa: Vec<String>,
    },
}

impl LabelResolver {
    /// Creates a resolver for a TRANSLATE mapping, with the taxa of an
    /// optional TAXA block for index and verbatim fallbacks.
    pub fn with_translation(translation: HashMap<String, String>, taxa: Vec<String>) -> Self {
        LabelResolver::Translate { translation, taxa }
    }

    /// Resolves a parsed leaf label into the taxon name.
    ///
    /// # Errors
    /// Returns a [LabelResolvingError] if a [Translate](Self::Translate)
    /// resolver has no match for `parsed_label`.
    pub fn resolve_label(&self, parsed_label: &str) -> Result<String, LabelResolvingError> {
        match self {
            LabelResolver::Verbatim => Ok(parsed_label.to_string()),

            LabelResolver::Translate { translation, taxa } => {
                if let Some(label) = translation.get(parsed_label) {
                    return Ok(label.clone());
                }

                if let Ok(nexus_index) = parsed_label.parse::<usize>() {
                    if nexus_index == 0 || nexus_index > taxa.len() {
                        return Err(LabelResolvingError(format!(
                            "Nexus label index {nexus_index} out of bounds (1-based indexing, max {})",
                            taxa.len()
                        )));
                    }
                    return Ok(taxa[nexus_index - 1].clone());
                }

                if taxa.iter().any(|taxon| taxon == parsed_label) {
                    return Ok(parsed_label.to_string());
                }

                Err(LabelResolvingError(format!(
                    "No translation for label '{parsed_label}'"
                )))
            }
        }
    }
}

impl fmt::Display for LabelResolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LabelResolver::Verbatim => writeln!(f, "LabelResolver::Verbatim"),
            LabelResolver::Translate { translation, .. } => {
                writeln!(f, "LabelResolver::Translate with mapping:")?;
                for (key, value) in translation {
                    writeln!(f, "  {key} -> {value}")?;
                }
                Ok(())
            }
        }
    }
}

// =#========================================================================#=
// LABEL RESOLVING ERROR
// =#========================================================================#=
/// Error returned when [LabelResolver::resolve_label] cannot resolve a label.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct LabelResolvingError(String);

#[cfg(test)]
mod tests {
    use super::*;

    fn translate_resolver() -> LabelResolver {
        let translation = HashMap::from([
            ("1".to_string(), "Hubei/1".to_string()),
            ("fj".to_string(), "Fujian/7".to_string()),
        ]);
        let taxa = vec!["Hubei/1".to_string(), "Fujian/7".to_string()];
        LabelResolver::with_translation(translation, taxa)
    }

    #[test]
    fn test_translate_key_index_and_verbatim() {
        let resolver = translate_resolver();
        assert_eq!(resolver.resolve_label("1").unwrap(), "Hubei/1");
        assert_eq!(resolver.resolve_label("fj").unwrap(), "Fujian/7");
        assert_eq!(resolver.resolve_label("2").unwrap(), "Fujian/7");
        assert_eq!(resolver.resolve_label("Hubei/1").unwrap(), "Hubei/1");
    }

    #[test]
    fn test_unknown_label_fails() {
        let resolver = translate_resolver();
        assert!(resolver.resolve_label("3").is_err());
        assert!(resolver.resolve_label("Guangxi/2").is_err());
        assert_eq!(LabelResolver::Verbatim.resolve_label("x").unwrap(), "x");
    }
}
