//! Free-text to catalog normalization for areas and motives.
//!
//! Reception types whatever the visitor says ("AC", "situacion de calle",
//! "Dirección General de Políticas Alimentarias"...). The normalizer maps it to
//! a canonical catalog key in fixed stages, first hit wins:
//!
//! 1. exact catalog key
//! 2. exact variant (case-sensitive)
//! 3. case-insensitive variant, then catalog display name
//! 4. substring in either direction against variants
//! 5. ordered keyword heuristics ([`rules`])
//!
//! A stage whose key is missing from the catalog falls through to the next one.
//! Case-insensitive stages also ignore diacritics. The result depends only on
//! the input and the injected [`Catalog`].

pub mod rules;

use serde::Serialize;
use std::sync::Arc;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use utoipa::ToSchema;

use crate::models::catalog::{Catalog, VariantEntry};

use rules::{KeywordRule, AREA_RULES, MOTIVE_RULES};

/// Sentinel key for areas outside the catalog
pub const UNKNOWN_AREA_KEY: &str = "UNKNOWN";
pub const UNKNOWN_AREA_NAME: &str = "Unknown area";

/// Stage that produced a normalization result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    CatalogKey,
    Exact,
    CaseInsensitive,
    CatalogName,
    Substring,
    Heuristic,
    /// Nothing matched; callers should flag the turn for review
    Unresolved,
}

/// Normalized area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AreaMatch {
    pub key: String,
    pub display_name: String,
    pub floor: Option<String>,
    pub resolved_by: MatchKind,
}

impl AreaMatch {
    pub fn is_unknown(&self) -> bool {
        self.key == UNKNOWN_AREA_KEY
    }
}

/// Normalized motive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MotiveMatch {
    pub key: Option<String>,
    /// Trimmed original text
    pub text: String,
    pub resolved_by: MatchKind,
}

/// Lowercase and strip diacritics ("Niñez" -> "ninez")
pub fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Catalog entry as seen by the resolver: key plus human label
struct Term<'a> {
    key: &'a str,
    label: &'a str,
}

/// Runs the stages against one vocabulary (areas or motives)
fn resolve(
    input: &str,
    terms: &[Term<'_>],
    variants: &[VariantEntry],
    heuristics: &[KeywordRule],
) -> Option<(String, MatchKind)> {
    let folded = fold(input);
    let known = |key: &str| terms.iter().any(|t| t.key == key);

    let stages: [(MatchKind, Option<&str>); 6] = [
        (
            MatchKind::CatalogKey,
            terms.iter().find(|t| t.key == input).map(|t| t.key),
        ),
        (
            MatchKind::Exact,
            variants
                .iter()
                .find(|v| v.variant == input)
                .map(|v| v.key.as_str()),
        ),
        (
            MatchKind::CaseInsensitive,
            variants
                .iter()
                .find(|v| fold(&v.variant) == folded)
                .map(|v| v.key.as_str()),
        ),
        (
            MatchKind::CatalogName,
            terms
                .iter()
                .find(|t| fold(t.label) == folded || fold(t.key) == folded)
                .map(|t| t.key),
        ),
        (
            MatchKind::Substring,
            // Folding can empty a non-blank input (combining marks only)
            if folded.is_empty() {
                None
            } else {
                variants
                    .iter()
                    .find(|v| {
                        let variant = fold(&v.variant);
                        folded.contains(&variant) || variant.contains(&folded)
                    })
                    .map(|v| v.key.as_str())
            },
        ),
        (
            MatchKind::Heuristic,
            if folded.is_empty() {
                None
            } else {
                rules::first_match(heuristics, &folded)
            },
        ),
    ];

    for (kind, key) in stages {
        match key {
            Some(key) if known(key) => return Some((key.to_string(), kind)),
            Some(key) => {
                tracing::debug!(input, key, stage = ?kind, "Stale catalog key, trying next stage");
            }
            None => {}
        }
    }
    None
}

/// Area/motive normalizer over an injected catalog
#[derive(Debug, Clone)]
pub struct Normalizer {
    catalog: Arc<Catalog>,
}

impl Normalizer {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Map free text to `(key, display_name, floor)`. Never fails: unmatched
    /// input yields the UNKNOWN key with the trimmed text as display name.
    pub fn normalize_area(&self, raw: &str) -> AreaMatch {
        let input = raw.trim();
        if input.is_empty() {
            return AreaMatch {
                key: UNKNOWN_AREA_KEY.to_string(),
                display_name: UNKNOWN_AREA_NAME.to_string(),
                floor: None,
                resolved_by: MatchKind::Unresolved,
            };
        }

        let terms: Vec<Term<'_>> = self
            .catalog
            .areas
            .iter()
            .map(|a| Term {
                key: &a.key,
                label: &a.display_name,
            })
            .collect();

        let resolved = resolve(input, &terms, &self.catalog.area_variants, AREA_RULES)
            .and_then(|(key, kind)| self.catalog.area(&key).map(|entry| (entry, kind)));

        match resolved {
            Some((entry, kind)) => AreaMatch {
                key: entry.key.clone(),
                display_name: entry.display_name.clone(),
                floor: entry.floor.clone(),
                resolved_by: kind,
            },
            None => AreaMatch {
                key: UNKNOWN_AREA_KEY.to_string(),
                display_name: input.to_string(),
                floor: None,
                resolved_by: MatchKind::Unresolved,
            },
        }
    }

    /// Map free text to `(key?, original_text)`
    pub fn normalize_motive(&self, raw: &str) -> MotiveMatch {
        let input = raw.trim();
        if input.is_empty() {
            return MotiveMatch {
                key: None,
                text: String::new(),
                resolved_by: MatchKind::Unresolved,
            };
        }

        let terms: Vec<Term<'_>> = self
            .catalog
            .motives
            .iter()
            .map(|m| Term {
                key: &m.key,
                label: &m.label,
            })
            .collect();

        match resolve(input, &terms, &self.catalog.motive_variants, MOTIVE_RULES) {
            Some((key, kind)) => MotiveMatch {
                key: Some(key),
                text: input.to_string(),
                resolved_by: kind,
            },
            None => MotiveMatch {
                key: None,
                text: input.to_string(),
                resolved_by: MatchKind::Unresolved,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(Arc::new(Catalog::default()))
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("Dirección de Niñez"), "direccion de ninez");
        assert_eq!(fold("SITUACIÓN"), "situacion");
    }

    #[test]
    fn test_empty_area() {
        let n = normalizer();
        for raw in ["", "   "] {
            let m = n.normalize_area(raw);
            assert_eq!(m.key, UNKNOWN_AREA_KEY);
            assert_eq!(m.display_name, UNKNOWN_AREA_NAME);
            assert_eq!(m.floor, None);
        }
    }

    #[test]
    fn test_variant_abbreviation() {
        let m = normalizer().normalize_area("AC");
        assert_eq!(m.key, "EMERGENCIA_ASISTENCIA_CRITICA");
        assert_eq!(m.floor.as_deref(), Some("1"));
        assert_eq!(m.resolved_by, MatchKind::Exact);
    }

    #[test]
    fn test_catalog_key_resolves_to_itself() {
        let n = normalizer();
        for area in &n.catalog().areas {
            let m = n.normalize_area(&area.key);
            assert_eq!(m.key, area.key);
            assert_eq!(m.resolved_by, MatchKind::CatalogKey);
        }
    }

    #[test]
    fn test_display_names_are_idempotent() {
        let n = normalizer();
        for area in &n.catalog().areas {
            let first = n.normalize_area(&area.display_name);
            assert_eq!(first.key, area.key, "display name {:?}", area.display_name);
            let second = n.normalize_area(&first.display_name);
            assert_eq!(second.key, first.key);
        }
    }

    #[test]
    fn test_case_and_accent_insensitive() {
        let m = normalizer().normalize_area("Situación de Calle");
        assert_eq!(m.key, "SITUACION_DE_CALLE");
        assert_eq!(m.resolved_by, MatchKind::CaseInsensitive);
    }

    #[test]
    fn test_substring_match() {
        let m = normalizer().normalize_area("Oficina de Trabajo Social");
        assert_eq!(m.key, "TRABAJO_SOCIAL");
        assert_eq!(m.resolved_by, MatchKind::Substring);
    }

    #[test]
    fn test_substring_first_hit_wins() {
        // "AC" is the first short variant contained in "alimentacion"
        let m = normalizer().normalize_area("alimentacion");
        assert_eq!(m.key, "EMERGENCIA_ASISTENCIA_CRITICA");
        assert_eq!(m.resolved_by, MatchKind::Substring);
    }

    #[test]
    fn test_combining_marks_only_is_unresolved() {
        let n = normalizer();
        let m = n.normalize_area("\u{0301}");
        assert!(m.is_unknown());
        assert_eq!(m.resolved_by, MatchKind::Unresolved);

        let m = n.normalize_motive("\u{0301}\u{0308}");
        assert_eq!(m.key, None);
        assert_eq!(m.resolved_by, MatchKind::Unresolved);
    }

    #[test]
    fn test_heuristic_fallback() {
        let n = normalizer();
        let m = n.normalize_area("Emergencias");
        assert_eq!(m.key, "EMERGENCIA_ASISTENCIA_CRITICA");
        assert_eq!(m.resolved_by, MatchKind::Heuristic);

        let m = n.normalize_area("chicos en la calle");
        assert_eq!(m.key, "SITUACION_DE_CALLE");
        assert_eq!(m.resolved_by, MatchKind::Heuristic);
    }

    #[test]
    fn test_unresolved_area_keeps_input() {
        let m = normalizer().normalize_area("  Tesorería ");
        assert_eq!(m.key, UNKNOWN_AREA_KEY);
        assert_eq!(m.display_name, "Tesorería");
        assert_eq!(m.floor, None);
        assert!(m.is_unknown());
    }

    #[test]
    fn test_stale_keys_fall_through() {
        let mut catalog = Catalog::default();
        catalog.areas.retain(|a| a.key != "TRABAJO_SOCIAL");
        let n = Normalizer::new(Arc::new(catalog));

        let m = n.normalize_area("trabajo social");
        assert_eq!(m.key, UNKNOWN_AREA_KEY);
        assert_eq!(m.display_name, "trabajo social");
        assert_eq!(m.floor, None);
    }

    #[test]
    fn test_deterministic() {
        let n = normalizer();
        for raw in ["AC", "comedor", "algo raro", "Niñez"] {
            assert_eq!(n.normalize_area(raw), n.normalize_area(raw));
            assert_eq!(n.normalize_motive(raw), n.normalize_motive(raw));
        }
    }

    #[test]
    fn test_motive_exact() {
        let m = normalizer().normalize_motive("SOLICITUD DE MATERIALES");
        assert_eq!(m.key.as_deref(), Some("MATERIALES"));
        assert_eq!(m.text, "SOLICITUD DE MATERIALES");
        assert_eq!(m.resolved_by, MatchKind::Exact);
    }

    #[test]
    fn test_motive_case_insensitive() {
        let m = normalizer().normalize_motive(" solicitud de materiales ");
        assert_eq!(m.key.as_deref(), Some("MATERIALES"));
        assert_eq!(m.text, "solicitud de materiales");
    }

    #[test]
    fn test_motive_substring_and_heuristic() {
        let n = normalizer();
        let m = n.normalize_motive("Quiero hablar por el comedor");
        assert_eq!(m.key.as_deref(), Some("COMEDOR"));
        assert_eq!(m.resolved_by, MatchKind::Substring);

        let m = n.normalize_motive("planillas del plan");
        assert_eq!(m.key.as_deref(), Some("DOCUMENTACION"));
        assert_eq!(m.resolved_by, MatchKind::Heuristic);
    }

    #[test]
    fn test_motive_unrecognized() {
        let n = normalizer();
        let m = n.normalize_motive("Trámite de pensión");
        assert_eq!(m.key, None);
        assert_eq!(m.text, "Trámite de pensión");

        let empty = n.normalize_motive("");
        assert_eq!(empty.key, None);
        assert_eq!(empty.text, "");
    }
}
