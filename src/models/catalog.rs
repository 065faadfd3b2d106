//! Area and motive catalog (static configuration)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// A municipal area a visitor can be routed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AreaCatalogEntry {
    pub key: String,
    pub display_name: String,
    /// Physical floor ("1", "2", "3", "PB")
    pub floor: Option<String>,
    pub icon: Option<String>,
}

/// A canonical visit motive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MotiveCatalogEntry {
    pub key: String,
    pub label: String,
}

/// Free-text variant mapped to a canonical key. Order matters: the first hit wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VariantEntry {
    pub variant: String,
    pub key: String,
}

/// Read-only catalog, built once at startup and shared by reference
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Catalog {
    pub areas: Vec<AreaCatalogEntry>,
    pub motives: Vec<MotiveCatalogEntry>,
    pub area_variants: Vec<VariantEntry>,
    pub motive_variants: Vec<VariantEntry>,
}

impl Catalog {
    pub fn area(&self, key: &str) -> Option<&AreaCatalogEntry> {
        self.areas.iter().find(|a| a.key == key)
    }

    pub fn motive(&self, key: &str) -> Option<&MotiveCatalogEntry> {
        self.motives.iter().find(|m| m.key == key)
    }

    /// Areas located on a floor
    pub fn areas_on_floor(&self, floor: &str) -> Vec<&AreaCatalogEntry> {
        self.areas
            .iter()
            .filter(|a| a.floor.as_deref() == Some(floor))
            .collect()
    }

    /// Reject catalogs with blank or duplicate keys. Variants pointing at keys
    /// missing from the catalog are only logged: the normalizer skips them.
    pub fn validate(&self) -> AppResult<()> {
        let mut seen = HashSet::new();
        for area in &self.areas {
            if area.key.trim().is_empty() || area.display_name.trim().is_empty() {
                return Err(AppError::Validation("Catalog area with empty key or name".to_string()));
            }
            if area.key == crate::normalizer::UNKNOWN_AREA_KEY {
                return Err(AppError::Validation(format!(
                    "{} is reserved and cannot be a catalog area",
                    area.key
                )));
            }
            if !seen.insert(area.key.as_str()) {
                return Err(AppError::Validation(format!("Duplicate area key {}", area.key)));
            }
        }

        let mut seen = HashSet::new();
        for motive in &self.motives {
            if motive.key.trim().is_empty() {
                return Err(AppError::Validation("Catalog motive with empty key".to_string()));
            }
            if !seen.insert(motive.key.as_str()) {
                return Err(AppError::Validation(format!("Duplicate motive key {}", motive.key)));
            }
        }

        for variant in &self.area_variants {
            if self.area(&variant.key).is_none() {
                tracing::warn!(variant = %variant.variant, key = %variant.key, "Area variant points at unknown key");
            }
        }
        for variant in &self.motive_variants {
            if self.motive(&variant.key).is_none() {
                tracing::warn!(variant = %variant.variant, key = %variant.key, "Motive variant points at unknown key");
            }
        }

        Ok(())
    }
}

fn area(key: &str, display_name: &str, floor: &str, icon: &str) -> AreaCatalogEntry {
    AreaCatalogEntry {
        key: key.to_string(),
        display_name: display_name.to_string(),
        floor: Some(floor.to_string()),
        icon: Some(icon.to_string()),
    }
}

fn motive(key: &str, label: &str) -> MotiveCatalogEntry {
    MotiveCatalogEntry {
        key: key.to_string(),
        label: label.to_string(),
    }
}

fn variants(pairs: &[(&str, &str)]) -> Vec<VariantEntry> {
    pairs
        .iter()
        .map(|(variant, key)| VariantEntry {
            variant: variant.to_string(),
            key: key.to_string(),
        })
        .collect()
}

impl Default for Catalog {
    /// Municipal building layout of the Secretaría de Desarrollo Social
    fn default() -> Self {
        Self {
            areas: vec![
                area("TRABAJO_SOCIAL", "Área de Trabajo Social", "1", "🧩"),
                area("POLITICAS_ALIMENTARIAS", "Dirección de Políticas Alimentarias", "1", "🍎"),
                area("SITUACION_DE_CALLE", "Situación de Calle", "1", "🚶"),
                area(
                    "EMERGENCIA_ASISTENCIA_CRITICA",
                    "Dirección de Emergencia y Asistencia Crítica",
                    "1",
                    "🚨",
                ),
                area("NINEZ_Y_ADOLESCENCIA", "Dirección de Niñez y Adolescencia", "2", "👶"),
                area("SECRETARIA", "Secretaría de Desarrollo Social", "3", "🏢"),
                area("INTEGRACION_SOCIAL", "Dirección de Integración Social", "3", "🤝"),
                area("ARTICULACION_OPERATIVA", "Dirección de Articulación Operativa", "3", "🧭"),
                area("INCLUSION_SOCIAL", "Subsecretaría de Inclusión Social", "3", "🧑‍🤝‍🧑"),
            ],
            motives: vec![
                motive("CONSULTA_GENERAL", "Consulta general"),
                motive("RECLAMO", "Reclamo"),
                motive("MATERIALES", "Solicitud de materiales"),
                motive("DOCUMENTACION", "Entrega de documentación"),
                motive("INCENDIO", "Incendio"),
                motive("PLAN_MAS_VIDA", "Plan Más Vida"),
                motive("TARJETA", "Tarjeta alimentaria"),
                motive("COMEDOR", "Comedor"),
                motive("HABITACIONAL", "Habitacional"),
                motive("REUNION", "Reunión"),
            ],
            area_variants: variants(&[
                ("DIRECCION GENERAL DE EMERGENCIA Y ASISTENCIA CRITICA", "EMERGENCIA_ASISTENCIA_CRITICA"),
                ("ASISTENCIA CRITICA", "EMERGENCIA_ASISTENCIA_CRITICA"),
                ("AC", "EMERGENCIA_ASISTENCIA_CRITICA"),
                ("DIRECCIO GENERAL DE ARTICULACION OPERATIVA", "ARTICULACION_OPERATIVA"),
                ("DIRECCION GENERAL DE ARTICULACION OPERATIVA", "ARTICULACION_OPERATIVA"),
                ("DIRECCION DE ARTICULACION", "ARTICULACION_OPERATIVA"),
                ("POLITICAS ALIMENTARIAS", "POLITICAS_ALIMENTARIAS"),
                ("Politicias Alimentarias", "POLITICAS_ALIMENTARIAS"),
                ("DIRECCION GENERAL DE POLITICA ALIMENTARIA", "POLITICAS_ALIMENTARIAS"),
                ("DIRECCION GENERAL DE POLITICAS ALIMENTARIAS", "POLITICAS_ALIMENTARIAS"),
                ("DIRECCIONGENERALDEPOLITICASALIMENTARIAS", "POLITICAS_ALIMENTARIAS"),
                ("direccion general de politica alimentarias", "POLITICAS_ALIMENTARIAS"),
                ("SUBSECRETARIA DE INCLUSION SOCIAL", "INCLUSION_SOCIAL"),
                ("SUBSECRETARIADEINCLUSIONSOCIAL", "INCLUSION_SOCIAL"),
                ("INCLUSION", "INCLUSION_SOCIAL"),
                ("SITUACION DE CALLE", "SITUACION_DE_CALLE"),
                ("situacion de calle", "SITUACION_DE_CALLE"),
                ("DIRECCION GENERAL DE POLITICAS DE NIÑEZ Y ADOLESCENCIA", "NINEZ_Y_ADOLESCENCIA"),
                ("TRABAJO SOCIAL", "TRABAJO_SOCIAL"),
                ("AREA TRABAJO SOCIAL", "TRABAJO_SOCIAL"),
                ("DIRECCION DE INTEGRACION SOCIAL", "INTEGRACION_SOCIAL"),
                ("DIRECION GENERAL DE INTEGRACION SOCIAL", "INTEGRACION_SOCIAL"),
                ("SECRETARIA DE DESARROLLO SOCIAL", "SECRETARIA"),
                ("SECRETARIA DESARROLLO SOCIAL", "SECRETARIA"),
                ("3er piso", "SECRETARIA"),
            ]),
            motive_variants: variants(&[
                ("CONSULTA", "CONSULTA_GENERAL"),
                ("RECLAMO", "RECLAMO"),
                ("SOLICITUD DE MATERIALES", "MATERIALES"),
                ("MATERIALES", "MATERIALES"),
                ("ENTREGA DE DOCUMENTACION", "DOCUMENTACION"),
                ("ENTREGA DOCUMENTACION", "DOCUMENTACION"),
                ("DOCUMENTACION", "DOCUMENTACION"),
                ("INCENDIO", "INCENDIO"),
                ("PLAN MAS VIDA", "PLAN_MAS_VIDA"),
                ("TARJETA", "TARJETA"),
                ("CONSULTA TARJETA", "TARJETA"),
                ("CONSULTA POR TARJETA", "TARJETA"),
                ("COMEDOR", "COMEDOR"),
                ("HABITACIONAL", "HABITACIONAL"),
                ("REUNION", "REUNION"),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = Catalog::default();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.areas_on_floor("3").len(), 4);
        assert!(catalog.area("SECRETARIA").is_some());
    }

    #[test]
    fn test_duplicate_area_is_rejected() {
        let mut catalog = Catalog::default();
        let dup = catalog.areas[0].clone();
        catalog.areas.push(dup);
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_unknown_key_is_reserved() {
        let mut catalog = Catalog::default();
        catalog.areas.push(AreaCatalogEntry {
            key: "UNKNOWN".to_string(),
            display_name: "Whatever".to_string(),
            floor: None,
            icon: None,
        });
        assert!(catalog.validate().is_err());
    }
}
