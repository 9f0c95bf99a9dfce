use crate::validation::FormatValidator;
use lazy_static::lazy_static;
use regex::Regex;

/// One key of a document schema.
#[derive(Debug)]
pub struct FieldSpec {
    pub key: &'static str,
    pub default: &'static str,
    /// Printed labels the value sits next to, in lookup order
    pub labels: &'static [&'static str],
}

/// Extraction passes a schema runs, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    Patterns,
    Keywords,
    LabelAnchored,
}

/// Fixed vocabulary for one field. Table order is priority order.
#[derive(Debug)]
pub struct KeywordTable {
    pub field: &'static str,
    pub entries: &'static [&'static str],
    /// Whole-word match when set, plain substring otherwise
    pub whole_word: bool,
}

/// Ordered regex patterns for one field. The first match that survives
/// `transform` and `validate` is taken.
pub struct PatternRule {
    pub field: &'static str,
    pub patterns: Vec<Regex>,
    pub transform: Option<fn(&str) -> String>,
    pub validate: Option<fn(&str) -> bool>,
}

impl std::fmt::Debug for PatternRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternRule")
            .field("field", &self.field)
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    pub extractors: &'static [ExtractorKind],
    pub keywords: &'static [KeywordTable],
    pub patterns: fn() -> &'static [PatternRule],
}

impl Schema {
    pub fn pattern_rules(&self) -> &'static [PatternRule] {
        (self.patterns)()
    }

    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }
}

const fn field(key: &'static str, default: &'static str, labels: &'static [&'static str]) -> FieldSpec {
    FieldSpec { key, default, labels }
}

fn strip_spaces(value: &str) -> String {
    value.replace(' ', "")
}

fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub static PROPERTY_CARD: Schema = Schema {
    name: "propiedad",
    fields: &[
        field("placa", "", &["PLACA"]),
        field("marca", "", &["MARCA"]),
        field("linea", "", &["LINEA"]),
        field("clase", "", &["CLASE"]),
        field("servicio", "", &["SERVICIO"]),
        field("numero_licencia", "", &["LICENCIA"]),
        field("cilindraje", "", &["CILINDR"]),
        field("modelo", "", &["MODELO"]),
        field("numero_vin", "", &["VIN"]),
        field("numero_motor", "", &["MOTOR"]),
        field("no_ejes", "", &[]),
        field("combustible", "", &["COMBUSTIBLE"]),
        field("chasis", "", &["CHASIS"]),
        field("ref_llanta", "", &[]),
        field("pais", "COLOMBIA", &[]),
        field("departamento", "", &[]),
        field("ciudad", "", &[]),
        field("tipo_vehiculo", "", &[]),
        field("matricula", "", &[]),
        field("color_primario", "", &["COLOR"]),
        field("kilometraje", "", &[]),
        field("potencia", "", &["POTENCIA"]),
        field("tipo_motor", "", &[]),
        field("tipo_carroceria", "", &["CARROCERIA"]),
        field("no_pax", "", &["CAPACIDAD"]),
        field("blindado", "NO", &[]),
        field("identificacion", "", &["IDENTIFICACION"]),
        field("numero_serie", "", &["SERIE"]),
    ],
    extractors: &[
        ExtractorKind::Patterns,
        ExtractorKind::Keywords,
        ExtractorKind::LabelAnchored,
    ],
    keywords: &[
        KeywordTable {
            field: "marca",
            entries: &[
                "HONDA", "YAMAHA", "SUZUKI", "KAWASAKI", "AKT", "VICTORY", "CHEVROLET", "RENAULT",
                "MAZDA", "TOYOTA", "HYUNDAI", "KIA", "FORD", "VOLKSWAGEN", "NISSAN", "BMW", "AUDI",
                "MERCEDES", "DUCATI", "BAJAJ", "FIAT", "JEEP", "PEUGEOT",
            ],
            whole_word: true,
        },
        KeywordTable {
            field: "color_primario",
            entries: &[
                "BLANCO", "NEGRO", "ROJO", "AZUL", "GRIS", "PLATA", "DORADO", "VERDE", "AMARILLO",
                "NARANJA", "BEIGE", "MARRON",
            ],
            whole_word: true,
        },
        KeywordTable {
            field: "clase",
            entries: &["MOTOCICLETA", "AUTOMOVIL", "CAMIONETA", "CAMPERO", "BUS", "MOTOCARRO"],
            whole_word: true,
        },
        KeywordTable {
            field: "servicio",
            entries: &["PARTICULAR", "PUBLICO"],
            whole_word: false,
        },
        KeywordTable {
            field: "combustible",
            entries: &["GASOLINA", "DIESEL", "ELECTRICO", "HIBRIDO", "GNV", "GAS"],
            whole_word: true,
        },
    ],
    patterns: property_card_patterns,
};

pub static ID_CARD: Schema = Schema {
    name: "cedula",
    fields: &[
        field("tipo_documento", "CÉDULA", &[]),
        field("numero", "", &["NUMERO"]),
        field("nombres", "", &["NOMBRES"]),
        field("apellidos", "", &["APELLIDOS"]),
        field("fecha_nacimiento", "", &["FECHA DE NACIMIENTO"]),
        field("lugar_nacimiento", "", &["LUGAR DE NACIMIENTO"]),
        field("fecha_expedicion", "", &["FECHA Y LUGAR DE EXPEDICION"]),
        field("lugar_expedicion", "", &["EXPEDICION"]),
        field("sexo", "", &["SEXO"]),
        field("estatura", "", &["ESTATURA"]),
    ],
    extractors: &[ExtractorKind::LabelAnchored, ExtractorKind::Patterns],
    keywords: &[],
    patterns: id_card_patterns,
};

fn property_card_patterns() -> &'static [PatternRule] {
    &PROPERTY_CARD_PATTERNS
}

fn id_card_patterns() -> &'static [PatternRule] {
    &ID_CARD_PATTERNS
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("built-in field pattern must compile"))
        .collect()
}

lazy_static! {
    static ref PROPERTY_CARD_PATTERNS: Vec<PatternRule> = vec![
        PatternRule {
            field: "placa",
            patterns: compile(&[r"\b([A-Z]{3}\s?[0-9]{3})\b", r"\b([A-Z]{3}[0-9]{2}[A-Z])\b"]),
            transform: Some(strip_spaces),
            validate: None,
        },
        PatternRule {
            field: "modelo",
            patterns: compile(&[r"\b(19[8-9][0-9]|20[0-3][0-9])\b"]),
            transform: None,
            validate: None,
        },
        PatternRule {
            field: "cilindraje",
            patterns: compile(&[
                r"CILINDRAJE\s*(?:CC)?\s*[:\-]?\s*(\d{2,5})",
                r"\b(\d{2,5})\s*(?:CC|C\.C\.|CM3)?\b",
            ]),
            transform: None,
            validate: Some(FormatValidator::displacement_in_range),
        },
        PatternRule {
            field: "numero_vin",
            patterns: compile(&[r"\b([A-HJ-NPR-Z0-9]{17})\b"]),
            transform: None,
            validate: None,
        },
        PatternRule {
            field: "numero_motor",
            patterns: compile(&[r"(?:MOTOR|NO\.?\s*MOTOR|NRO\.?\s*MOTOR)\s*[:\-]?\s*([A-Z0-9\-]{5,25})"]),
            transform: None,
            validate: None,
        },
        PatternRule {
            field: "numero_licencia",
            patterns: compile(&[
                r"(?:LICENCIA|LICENCI\w*)\s*(?:DE\s*TRANSITO)?\s*[:\-]?\s*([A-Z0-9\-]{6,20})",
            ]),
            transform: None,
            validate: None,
        },
        PatternRule {
            field: "matricula",
            patterns: compile(&[r"(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})"]),
            transform: None,
            validate: None,
        },
        PatternRule {
            field: "no_ejes",
            patterns: compile(&[r"(?:NO\.?\s*EJES|NUMERO\s*EJES)\s*[:\-]?\s*(\d{1,2})"]),
            transform: None,
            validate: None,
        },
        PatternRule {
            field: "potencia",
            patterns: compile(&[r"POTENCIA\s*(?:HP)?\s*[:\-]?\s*(\d{2,4})"]),
            transform: None,
            validate: None,
        },
        PatternRule {
            field: "no_pax",
            patterns: compile(&[r"(?:CAPACIDAD|PASAJEROS)\s*(?:KG\s*/\s*PSJ)?\s*[:\-]?\s*(\d{1,2})\b"]),
            transform: None,
            validate: None,
        },
    ];

    static ref ID_CARD_PATTERNS: Vec<PatternRule> = vec![
        PatternRule {
            field: "numero",
            patterns: compile(&[r"\b(\d{1,3}(?:[.,]\d{3}){1,3})\b", r"\b(\d{6,10})\b"]),
            transform: Some(digits_only),
            validate: Some(FormatValidator::is_plausible_id_number),
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_consistent(schema: &Schema) {
        let keys: HashSet<&str> = schema.fields.iter().map(|f| f.key).collect();
        assert_eq!(keys.len(), schema.fields.len(), "duplicate key in {}", schema.name);
        for rule in schema.pattern_rules() {
            assert!(keys.contains(rule.field), "{} has no field {}", schema.name, rule.field);
            assert!(!rule.patterns.is_empty());
        }
        for table in schema.keywords {
            assert!(keys.contains(table.field), "{} has no field {}", schema.name, table.field);
        }
    }

    #[test]
    fn test_tables_reference_declared_fields() {
        assert_consistent(&PROPERTY_CARD);
        assert_consistent(&ID_CARD);
    }

    #[test]
    fn test_pattern_groups_capture_values() {
        for rule in PROPERTY_CARD.pattern_rules().iter().chain(ID_CARD.pattern_rules()) {
            for pattern in &rule.patterns {
                assert!(pattern.captures_len() >= 2, "{} pattern lacks a group", rule.field);
            }
        }
    }

    #[test]
    fn test_field_lookup() {
        assert_eq!(PROPERTY_CARD.field("pais").map(|f| f.default), Some("COLOMBIA"));
        assert_eq!(ID_CARD.field("apellidos").map(|f| f.labels), Some(&["APELLIDOS"][..]));
        assert!(ID_CARD.field("placa").is_none());
    }
}
