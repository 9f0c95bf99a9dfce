// Schema-driven field extraction over recognized text and tokens
use crate::config::SpatialConfig;
use crate::models::{ExtractorKind, FieldRecord, KeywordTable, PatternRule, Schema, Token};
use crate::processing::normalize::normalize;
use crate::processing::spatial::TokenAssembler;
use log::debug;

/// What a recognition strategy hands the extractor: joined text for the
/// pattern and keyword passes, positioned tokens for label lookup.
#[derive(Debug, Clone, Default)]
pub struct ExtractionInput {
    pub text: String,
    pub tokens: Vec<Token>,
}

impl ExtractionInput {
    pub fn new(text: impl Into<String>, tokens: Vec<Token>) -> Self {
        ExtractionInput {
            text: text.into(),
            tokens,
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }
}

pub struct FieldExtractor;

impl FieldExtractor {
    /// Run the schema's extractors in precedence order. Each pass only fills
    /// fields that still hold their default, so an earlier pass always wins.
    /// The result carries every schema key whatever the input.
    pub fn extract(schema: &'static Schema, input: &ExtractionInput, spatial: &SpatialConfig) -> FieldRecord {
        let mut record = FieldRecord::new(schema);
        let text = normalize(&input.text);

        for kind in schema.extractors {
            let filled = match kind {
                ExtractorKind::Patterns => Self::apply_patterns(&mut record, schema.pattern_rules(), &text),
                ExtractorKind::Keywords => Self::apply_keywords(&mut record, schema.keywords, &text),
                ExtractorKind::LabelAnchored => Self::apply_labels(&mut record, &input.tokens, spatial),
            };
            debug!("{:?} pass filled {} fields of {}", kind, filled, schema.name);
        }
        record
    }

    pub fn apply_patterns(record: &mut FieldRecord, rules: &[PatternRule], text: &str) -> usize {
        let mut filled = 0;
        for rule in rules {
            if !record.is_default(rule.field) {
                continue;
            }
            if let Some(value) = Self::match_rule(rule, text) {
                record.set(rule.field, value);
                filled += 1;
            }
        }
        filled
    }

    /// Each pattern in order contributes only its leftmost match. A match that
    /// fails the validator moves on to the next pattern, never to a later
    /// match of the same one.
    pub fn match_rule(rule: &PatternRule, text: &str) -> Option<String> {
        for pattern in &rule.patterns {
            let Some(matched) = pattern.captures(text).and_then(|c| c.get(1)) else {
                continue;
            };
            let value = match rule.transform {
                Some(transform) => transform(matched.as_str().trim()),
                None => matched.as_str().trim().to_string(),
            };
            if value.is_empty() {
                continue;
            }
            if rule.validate.map_or(true, |valid| valid(value.as_str())) {
                return Some(value);
            }
        }
        None
    }

    pub fn apply_keywords(record: &mut FieldRecord, tables: &[KeywordTable], text: &str) -> usize {
        let mut filled = 0;
        for table in tables {
            if !record.is_default(table.field) {
                continue;
            }
            let found = table.entries.iter().find(|entry| {
                if table.whole_word {
                    contains_word(text, entry)
                } else {
                    text.contains(*entry)
                }
            });
            if let Some(entry) = found {
                record.set(table.field, *entry);
                filled += 1;
            }
        }
        filled
    }

    pub fn apply_labels(record: &mut FieldRecord, tokens: &[Token], spatial: &SpatialConfig) -> usize {
        if tokens.is_empty() {
            return 0;
        }
        let mut filled = 0;
        for field in record.schema().fields {
            if !record.is_default(field.key) {
                continue;
            }
            let value = field
                .labels
                .iter()
                .map(|label| TokenAssembler::find_value(tokens, label, spatial))
                .find(|value| !value.is_empty());
            if let Some(value) = value {
                record.set(field.key, value);
                filled += 1;
            }
        }
        filled
    }
}

/// `word` occurs in `text` with no letter or digit touching either end.
fn contains_word(text: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    text.match_indices(word).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + word.len()..].chars().next();
        !before.map_or(false, |c| c.is_alphanumeric()) && !after.map_or(false, |c| c.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ID_CARD, PROPERTY_CARD};

    fn extract_text(schema: &'static Schema, text: &str) -> FieldRecord {
        FieldExtractor::extract(schema, &ExtractionInput::from_text(text), &SpatialConfig::default())
    }

    fn token(x: i32, y: i32, text: &str) -> Token {
        Token { x, y, text: text.to_string() }
    }

    #[test]
    fn test_plate_shapes() {
        assert_eq!(extract_text(&PROPERTY_CARD, "PLACA ABC 123").get("placa"), Some("ABC123"));
        assert_eq!(extract_text(&PROPERTY_CARD, "placa abc12d").get("placa"), Some("ABC12D"));
        assert_eq!(extract_text(&PROPERTY_CARD, "AB1234").get("placa"), Some(""));
    }

    #[test]
    fn test_displacement_validation() {
        assert_eq!(extract_text(&PROPERTY_CARD, "CILINDRAJE 150 CC").get("cilindraje"), Some("150"));
        assert_eq!(extract_text(&PROPERTY_CARD, "99999").get("cilindraje"), Some(""));
        assert_eq!(extract_text(&PROPERTY_CARD, "99999 CC 125 CC").get("cilindraje"), Some(""));
    }

    #[test]
    fn test_rejected_match_does_not_fall_through_to_later_numbers() {
        let record = extract_text(&PROPERTY_CARD, "PESO 99999 KG MODELO 2018");
        assert_eq!(record.get("cilindraje"), Some(""));
        assert_eq!(record.get("modelo"), Some("2018"));
    }

    #[test]
    fn test_labelled_then_bare_displacement() {
        let record = extract_text(&PROPERTY_CARD, "CILINDRAJE 99999 MOTO 125 CC");
        assert_eq!(record.get("cilindraje"), Some(""));
        let record = extract_text(&PROPERTY_CARD, "CILINDRAJE 12 150 CC");
        assert_eq!(record.get("cilindraje"), Some(""));
        let record = extract_text(&PROPERTY_CARD, "CILINDRAJE 9 KG 150 CC");
        assert_eq!(record.get("cilindraje"), Some("150"));
    }

    #[test]
    fn test_empty_text_is_schema_complete() {
        for schema in [&PROPERTY_CARD, &ID_CARD] {
            let record = extract_text(schema, "");
            assert_eq!(record.iter().count(), schema.fields.len());
            for field in schema.fields {
                assert_eq!(record.get(field.key), Some(field.default));
            }
        }
    }

    #[test]
    fn test_property_card_patterns() {
        let text = "LICENCIA DE TRANSITO NO. 10012345678 MODELO 2018 \
                    MOTOR: KC08E-2345678 VIN 9C2KC0810JR123456 FECHA MATRICULA 12/03/2018 \
                    POTENCIA HP 15 CAPACIDAD 2";
        let record = extract_text(&PROPERTY_CARD, text);
        assert_eq!(record.get("modelo"), Some("2018"));
        assert_eq!(record.get("numero_motor"), Some("KC08E-2345678"));
        assert_eq!(record.get("numero_vin"), Some("9C2KC0810JR123456"));
        assert_eq!(record.get("matricula"), Some("12/03/2018"));
        assert_eq!(record.get("potencia"), Some("15"));
        assert_eq!(record.get("no_pax"), Some("2"));
        assert_eq!(record.get("pais"), Some("COLOMBIA"));
    }

    #[test]
    fn test_keywords_follow_table_order() {
        let record = extract_text(&PROPERTY_CARD, "COLOR ROJO BLANCO MARCA YAMAHA HONDA");
        assert_eq!(record.get("color_primario"), Some("BLANCO"));
        assert_eq!(record.get("marca"), Some("HONDA"));
    }

    #[test]
    fn test_keywords_whole_word_and_substring() {
        let record = extract_text(&PROPERTY_CARD, "HONDAS GASOLINA SERVICIO PARTICULARES");
        assert_eq!(record.get("marca"), Some(""));
        assert_eq!(record.get("combustible"), Some("GASOLINA"));
        assert_eq!(record.get("servicio"), Some("PARTICULAR"));
    }

    #[test]
    fn test_labels_fill_only_what_patterns_missed() {
        let tokens = vec![
            token(10, 100, "PLACA"),
            token(200, 105, "ZZZ999"),
            token(10, 200, "LINEA"),
            token(200, 204, "CB 190R"),
        ];
        let input = ExtractionInput::new("PLACA ABC123 LINEA CB 190R", tokens);
        let record = FieldExtractor::extract(&PROPERTY_CARD, &input, &SpatialConfig::default());
        assert_eq!(record.get("placa"), Some("ABC123"));
        assert_eq!(record.get("linea"), Some("CB 190R"));
    }

    #[test]
    fn test_id_card_labels_take_precedence() {
        let tokens = vec![
            token(10, 50, "NUMERO"),
            token(200, 52, "1.020.304.050"),
            token(10, 150, "APELLIDOS"),
            token(10, 190, "PEREZ GOMEZ"),
            token(10, 300, "NOMBRES"),
            token(10, 340, "ANA MARIA"),
        ];
        let text = TokenAssembler::joined_text(&tokens);
        let record = FieldExtractor::extract(&ID_CARD, &ExtractionInput::new(text, tokens), &SpatialConfig::default());
        assert_eq!(record.get("numero"), Some("1.020.304.050"));
        assert_eq!(record.get("apellidos"), Some("PEREZ GOMEZ"));
        assert_eq!(record.get("nombres"), Some("ANA MARIA"));
        assert_eq!(record.get("tipo_documento"), Some("CÉDULA"));
    }

    #[test]
    fn test_id_number_pattern_fallback() {
        let record = extract_text(&ID_CARD, "REPUBLICA DE COLOMBIA 79.845.123 IDENTIFICACION PERSONAL");
        assert_eq!(record.get("numero"), Some("79845123"));
        assert_eq!(extract_text(&ID_CARD, "AÑO 2015").get("numero"), Some(""));
    }

    #[test]
    fn test_contains_word_boundaries() {
        assert!(contains_word("MARCA HONDA", "HONDA"));
        assert!(contains_word("HONDA/AKT", "AKT"));
        assert!(!contains_word("GASOLINA", "GAS"));
        assert!(!contains_word("KIAS", "KIA"));
    }
}
