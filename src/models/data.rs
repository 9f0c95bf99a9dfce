use crate::models::rules::{Schema, ID_CARD, PROPERTY_CARD};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

/// One recognized text fragment as returned by a recognizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Clockwise from the top-left corner
    pub polygon: [Point; 4],
    pub text: String,
    /// Always within [0, 1]
    pub confidence: f32,
}

impl Detection {
    pub fn new(polygon: [Point; 4], text: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Detection {
            polygon,
            text: text.into(),
            confidence,
        }
    }

    pub fn from_rect(x: i32, y: i32, width: i32, height: i32, text: impl Into<String>, confidence: f32) -> Self {
        let polygon = [
            Point::new(x, y),
            Point::new(x + width, y),
            Point::new(x + width, y + height),
            Point::new(x, y + height),
        ];
        Self::new(polygon, text, confidence)
    }

    pub fn top_left(&self) -> Point {
        self.polygon[0]
    }

    /// Shift into the coordinate space of an enclosing image.
    pub fn translated(mut self, dx: i32, dy: i32) -> Self {
        for point in self.polygon.iter_mut() {
            point.x += dx;
            point.y += dy;
        }
        self
    }
}

/// A normalized, positioned text fragment. Ordered by `(y, x)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub x: i32,
    pub y: i32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentType {
    /// Vehicle registration ("tarjeta de propiedad")
    PropertyCard,
    /// National ID ("cédula")
    IdCard,
    Other(String),
}

impl DocumentType {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "propiedad" | "tarjeta" | "property-card" | "property_card" => DocumentType::PropertyCard,
            "cedula" | "cédula" | "id-card" | "id_card" => DocumentType::IdCard,
            other => DocumentType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DocumentType::PropertyCard => "propiedad",
            DocumentType::IdCard => "cedula",
            DocumentType::Other(name) => name,
        }
    }

    /// Field schema for structured types; `None` means the generic text shape.
    pub fn schema(&self) -> Option<&'static Schema> {
        match self {
            DocumentType::PropertyCard => Some(&PROPERTY_CARD),
            DocumentType::IdCard => Some(&ID_CARD),
            DocumentType::Other(_) => None,
        }
    }
}

/// Schema-complete set of string fields. Every key of the schema is present
/// from construction on; extraction only ever replaces values.
#[derive(Debug, Clone)]
pub struct FieldRecord {
    schema: &'static Schema,
    values: Vec<String>,
}

impl PartialEq for FieldRecord {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.values == other.values
    }
}

impl FieldRecord {
    pub fn new(schema: &'static Schema) -> Self {
        let values = schema.fields.iter().map(|f| f.default.to_string()).collect();
        FieldRecord { schema, values }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.schema.fields.iter().position(|f| f.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index_of(key).map(|i| self.values[i].as_str())
    }

    /// Returns false when the schema has no such key.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
        match self.index_of(key) {
            Some(i) => {
                self.values[i] = value.into();
                true
            }
            None => false,
        }
    }

    pub fn is_default(&self, key: &str) -> bool {
        match self.index_of(key) {
            Some(i) => self.values[i] == self.schema.fields[i].default,
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.schema
            .fields
            .iter()
            .zip(self.values.iter())
            .map(|(f, v)| (f.key, v.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    Fields(FieldRecord),
    /// Shape used for document types without a field schema
    Text { text: String, lines: Vec<String> },
}

/// What one processing call hands back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub body: RecordBody,
    pub average_confidence: Option<f64>,
    pub error: Option<String>,
}

impl DocumentRecord {
    /// The default-valued record for a document type.
    pub fn empty(document_type: &DocumentType) -> Self {
        let body = match document_type.schema() {
            Some(schema) => RecordBody::Fields(FieldRecord::new(schema)),
            None => RecordBody::Text {
                text: String::new(),
                lines: Vec::new(),
            },
        };
        DocumentRecord {
            body,
            average_confidence: None,
            error: None,
        }
    }

    pub fn fallback(document_type: &DocumentType, error: impl Into<String>) -> Self {
        let mut record = Self::empty(document_type);
        record.error = Some(error.into());
        record
    }

    pub fn fields(&self) -> Option<&FieldRecord> {
        match &self.body {
            RecordBody::Fields(fields) => Some(fields),
            RecordBody::Text { .. } => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields().and_then(|f| f.get(key))
    }
}

impl Serialize for DocumentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match &self.body {
            RecordBody::Fields(fields) => {
                for (key, value) in fields.iter() {
                    map.serialize_entry(key, value)?;
                }
            }
            RecordBody::Text { text, lines } => {
                map.serialize_entry("texto", text)?;
                map.serialize_entry("lineas", lines)?;
            }
        }
        if let Some(confidence) = self.average_confidence {
            map.serialize_entry("_ocr_confianza_promedio", &confidence)?;
        }
        if let Some(error) = &self.error {
            map.serialize_entry("_error", error)?;
        }
        map.end()
    }
}

/// Result of a multi-document submission (ID front/back plus the vehicle card).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRecord {
    pub cedula: DocumentRecord,
    pub tarjeta: DocumentRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_confidence_is_clamped() {
        assert_eq!(Detection::from_rect(0, 0, 1, 1, "AB", 1.7).confidence, 1.0);
        assert_eq!(Detection::from_rect(0, 0, 1, 1, "AB", -0.2).confidence, 0.0);
        assert_eq!(Detection::from_rect(0, 0, 1, 1, "AB", f32::NAN).confidence, 0.0);
    }

    #[test]
    fn test_detection_translation() {
        let detection = Detection::from_rect(5, 7, 10, 4, "PLACA", 0.9).translated(100, 200);
        assert_eq!(detection.top_left(), Point::new(105, 207));
        assert_eq!(detection.polygon[2], Point::new(115, 211));
    }

    #[test]
    fn test_document_type_parsing() {
        assert_eq!(DocumentType::parse("propiedad"), DocumentType::PropertyCard);
        assert_eq!(DocumentType::parse(" CEDULA "), DocumentType::IdCard);
        assert_eq!(DocumentType::parse("soat"), DocumentType::Other("soat".to_string()));
    }

    #[test]
    fn test_record_is_schema_complete_from_construction() {
        let record = FieldRecord::new(&PROPERTY_CARD);
        assert_eq!(record.iter().count(), PROPERTY_CARD.fields.len());
        assert_eq!(record.get("pais"), Some("COLOMBIA"));
        assert_eq!(record.get("blindado"), Some("NO"));
        assert_eq!(record.get("placa"), Some(""));
        assert!(record.is_default("placa"));
    }

    #[test]
    fn test_set_rejects_unknown_keys() {
        let mut record = FieldRecord::new(&ID_CARD);
        assert!(record.set("nombres", "ANA MARIA"));
        assert!(!record.set("placa", "ABC123"));
        assert!(!record.is_default("nombres"));
        assert_eq!(record.iter().count(), ID_CARD.fields.len());
    }

    #[test]
    fn test_fallback_serialization() {
        let record = DocumentRecord::fallback(&DocumentType::PropertyCard, "boom");
        let json = serde_json::to_value(&record).unwrap();
        let object = json.as_object().unwrap();
        for field in PROPERTY_CARD.fields {
            assert!(object.contains_key(field.key), "missing {}", field.key);
        }
        assert_eq!(object["_error"], "boom");
        assert!(!object.contains_key("_ocr_confianza_promedio"));
    }

    #[test]
    fn test_generic_shape_serialization() {
        let mut record = DocumentRecord::empty(&DocumentType::Other("soat".to_string()));
        record.average_confidence = Some(0.5);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["texto"], "");
        assert!(json["lineas"].as_array().unwrap().is_empty());
        assert_eq!(json["_ocr_confianza_promedio"], 0.5);
        assert!(json.get("_error").is_none());
    }

    #[test]
    fn test_serialization_keeps_schema_order() {
        let record = DocumentRecord::empty(&DocumentType::IdCard);
        let json = serde_json::to_value(&record).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys[0], "tipo_documento");
        assert_eq!(keys[1], "numero");
    }
}
