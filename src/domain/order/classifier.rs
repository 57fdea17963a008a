use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use super::value_objects::{Material, OrderItem, OrderItemFields, RawTagReading};

// ============================================================================
// Tag Classifier - Rule Tables
// ============================================================================
//
// Turns a raw tag reading into material / category / reference / size.
//
// Every decision is an ordered table of (pattern, outcome) rows; the first
// matching row wins, so row order is the tie-break. The classifier never
// fails: anything that matches no row ends up as "Desconocido".
//
// ============================================================================

pub const UNKNOWN_CATEGORY: &str = "Desconocido";

/// A compiled code pattern and what it resolves to.
pub struct CodeRule<T> {
    pub pattern: Regex,
    pub outcome: T,
}

impl<T: Copy> CodeRule<T> {
    fn compile(pattern: &str, outcome: T) -> Self {
        Self {
            pattern: Regex::new(pattern)
                .unwrap_or_else(|e| panic!("classifier rule {pattern} should compile - this is a bug: {e}")),
            outcome,
        }
    }

    pub fn matches(&self, code: &str) -> bool {
        self.pattern.is_match(code)
    }
}

fn first_match<T: Copy>(rules: &[CodeRule<T>], code: &str) -> Option<T> {
    rules.iter().find(|rule| rule.matches(code)).map(|rule| rule.outcome)
}

/// Tag colour keywords, checked as case-insensitive substrings in this order.
pub const COLOR_RULES: &[(&[&str], Material)] = &[
    (&["verde", "green"], Material::Oro),
    (&["rosa", "pink"], Material::Rodio),
    (&["naranja", "orange"], Material::Acero),
];

/// Material fallback when the tag colour says nothing.
pub static MATERIAL_RULES: Lazy<Vec<CodeRule<Material>>> = Lazy::new(|| {
    vec![
        CodeRule::compile(r"^3\d{3}-\d$", Material::Oro),
        CodeRule::compile(r"^[A-Z]\d{3}$", Material::Oro),
        CodeRule::compile(r"^2\d{3}-\d$", Material::Rodio),
        CodeRule::compile(r"^9\+\d{3}$", Material::Rodio),
        CodeRule::compile(r"^11\d{2}$", Material::Acero),
        CodeRule::compile(r"^15\d{2}$", Material::Acero),
        CodeRule::compile(r"^13\d{2}$", Material::Acero),
        CodeRule::compile(r"^(19|18)\d{2}$", Material::Acero),
        CodeRule::compile(r"^39\d{2}$", Material::Acero),
    ]
});

static ORO_CATEGORIES: Lazy<Vec<CodeRule<&'static str>>> = Lazy::new(|| {
    vec![
        CodeRule::compile(r"^3\d{3}-1$", "Pulseras de Oro"),
        CodeRule::compile(r"^3\d{3}-2$", "Colgantes de Oro"),
        CodeRule::compile(r"^3\d{3}-3$", "Tobilleras de Oro"),
        CodeRule::compile(r"^[A-Z]\d{3}$", "Cadenas por Metro de Oro"),
    ]
});

static RODIO_CATEGORIES: Lazy<Vec<CodeRule<&'static str>>> = Lazy::new(|| {
    vec![
        CodeRule::compile(r"^2\d{3}-1$", "Pulseras de Rodio"),
        CodeRule::compile(r"^2\d{3}-2$", "Colgantes de Rodio"),
        CodeRule::compile(r"^2\d{3}-3$", "Tobilleras de Rodio"),
        CodeRule::compile(r"^9\+\d{3}$", "Cadenas por Metro de Rodio"),
    ]
});

static ACERO_CATEGORIES: Lazy<Vec<CodeRule<&'static str>>> = Lazy::new(|| {
    vec![
        CodeRule::compile(r"^11\d{2}$", "Pulseras de Acero"),
        CodeRule::compile(r"^15\d{2}$", "Colgantes de Acero"),
        CodeRule::compile(r"^13\d{2}$", "Tobilleras de Acero"),
        CodeRule::compile(r"^(19|18)\d{2}$", "Pieza Terminada de Acero Dorado"),
        CodeRule::compile(r"^39\d{2}$", "Cadenas por Metro de Acero"),
    ]
});

static RING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)-(\d+)$").expect("RING_PATTERN should compile - this is a bug")
});

// ============================================================================
// Individual Stages
// ============================================================================

/// Stage A.1: material from the tag colour, if the colour is recognised.
pub fn material_from_tag_color(tag_color: &str) -> Option<Material> {
    let color = tag_color.to_lowercase();
    COLOR_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| color.contains(k)))
        .map(|(_, material)| *material)
}

/// Stage A.2: material from the shape of the product code.
pub fn material_from_code(code: &str) -> Option<Material> {
    first_match(MATERIAL_RULES.as_slice(), code)
}

/// Colour wins; the code is only consulted when the colour is absent or unrecognised.
pub fn infer_material(code: &str, tag_color: Option<&str>) -> Material {
    tag_color
        .and_then(material_from_tag_color)
        .or_else(|| material_from_code(code))
        .unwrap_or(Material::Desconocido)
}

/// `(reference, size)` for two all-digit segments such as `1234-5`.
pub fn ring_segments(code: &str) -> Option<(String, String)> {
    RING_PATTERN
        .captures(code)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
}

/// Category from the material's own sub-pattern table.
pub fn material_category(material: Material, code: &str) -> Option<&'static str> {
    let rules = match material {
        Material::Oro => ORO_CATEGORIES.as_slice(),
        Material::Rodio => RODIO_CATEGORIES.as_slice(),
        Material::Acero => ACERO_CATEGORIES.as_slice(),
        Material::Desconocido => return None,
    };
    first_match(rules, code)
}

pub fn ring_category(material: Material) -> String {
    if material.is_known() {
        format!("Anillo de {}", material)
    } else {
        "Anillo".to_string()
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Classify one reading. Pure and total: the same reading always yields the
/// same fields, and unmatched codes degrade to "Desconocido".
pub fn classify(reading: &RawTagReading) -> OrderItemFields {
    let code = reading.usable_code().unwrap_or_default();
    let material = infer_material(code, reading.tag_color.as_deref());
    let ring = ring_segments(code);

    // A material sub-pattern is more specific than the generic ring shape.
    let category = match (material_category(material, code), &ring) {
        (Some(category), _) => category.to_string(),
        (None, Some(_)) => ring_category(material),
        (None, None) => UNKNOWN_CATEGORY.to_string(),
    };

    let (reference, size) = ring.unwrap_or_default();

    OrderItemFields {
        code: code.to_string(),
        reference,
        size,
        category,
        material,
        price: reading.price,
    }
}

/// Item id: code, wall-clock millis and a random suffix, so repeated codes in
/// one batch still get distinct ids.
pub fn generate_item_id(code: &str) -> String {
    format!("{}-{}-{:08x}", code, Utc::now().timestamp_millis(), rand::random::<u32>())
}

/// Classify a batch, dropping readings without a code and keeping input order.
pub fn classify_batch(readings: &[RawTagReading]) -> Vec<OrderItem> {
    let items: Vec<OrderItem> = readings
        .iter()
        .filter(|reading| reading.usable_code().is_some())
        .map(|reading| {
            let fields = classify(reading);
            OrderItem::from_fields(generate_item_id(&fields.code), fields)
        })
        .collect();

    let dropped = readings.len() - items.len();
    if dropped > 0 {
        tracing::debug!(dropped = dropped, kept = items.len(), "Dropped readings without a code");
    }

    items
}

// ============================================================================
// Unit Tests
// ============================================================================
