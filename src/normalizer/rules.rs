//! Ordered keyword heuristics used when no variant matches.
//!
//! Keywords are written folded (lowercase, no diacritics) because they are
//! tested against folded input. The first matching rule wins.

/// Matches when every keyword occurs in the folded input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordRule {
    pub keywords: &'static [&'static str],
    pub key: &'static str,
}

impl KeywordRule {
    pub fn matches(&self, folded: &str) -> bool {
        self.keywords.iter().all(|k| folded.contains(k))
    }
}

const fn rule(keywords: &'static [&'static str], key: &'static str) -> KeywordRule {
    KeywordRule { keywords, key }
}

pub const AREA_RULES: &[KeywordRule] = &[
    rule(&["politi", "aliment"], "POLITICAS_ALIMENTARIAS"),
    rule(&["emerg"], "EMERGENCIA_ASISTENCIA_CRITICA"),
    rule(&["critica"], "EMERGENCIA_ASISTENCIA_CRITICA"),
    rule(&["calle"], "SITUACION_DE_CALLE"),
    rule(&["ninez"], "NINEZ_Y_ADOLESCENCIA"),
    rule(&["adolesc"], "NINEZ_Y_ADOLESCENCIA"),
    rule(&["integracion"], "INTEGRACION_SOCIAL"),
    rule(&["articulacion"], "ARTICULACION_OPERATIVA"),
    rule(&["inclusion"], "INCLUSION_SOCIAL"),
    rule(&["trabajo social"], "TRABAJO_SOCIAL"),
];

pub const MOTIVE_RULES: &[KeywordRule] = &[
    rule(&["materia"], "MATERIALES"),
    rule(&["documen"], "DOCUMENTACION"),
    rule(&["planilla"], "DOCUMENTACION"),
    rule(&["incend"], "INCENDIO"),
    rule(&["tarjeta"], "TARJETA"),
    rule(&["comedor"], "COMEDOR"),
    rule(&["reun"], "REUNION"),
    rule(&["vida", "mas"], "PLAN_MAS_VIDA"),
    rule(&["habitac"], "HABITACIONAL"),
    rule(&["recla"], "RECLAMO"),
    rule(&["consult"], "CONSULTA_GENERAL"),
];

/// First rule matching the folded input
pub fn first_match(rules: &[KeywordRule], folded: &str) -> Option<&'static str> {
    rules.iter().find(|r| r.matches(folded)).map(|r| r.key)
}
