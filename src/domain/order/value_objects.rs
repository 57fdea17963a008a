use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Metal or finish inferred for a tagged piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    Oro,
    Rodio,
    Acero,
    Desconocido,
}

impl Material {
    /// Order in which materials appear on a printed order sheet
    pub const SHEET_ORDER: [Material; 4] = [
        Material::Oro,
        Material::Rodio,
        Material::Acero,
        Material::Desconocido,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Material::Oro => "Oro",
            Material::Rodio => "Rodio",
            Material::Acero => "Acero",
            Material::Desconocido => "Desconocido",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Material::Desconocido)
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One price tag as reported by the image analysis service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTagReading {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub tag_color: Option<String>,
}

impl RawTagReading {
    pub fn new(code: impl Into<String>, price: Option<f64>, tag_color: Option<&str>) -> Self {
        Self {
            code: Some(code.into()),
            price,
            tag_color: tag_color.map(str::to_string),
        }
    }

    /// The product code, or `None` when the tag had no readable code
    pub fn usable_code(&self) -> Option<&str> {
        self.code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

/// Classification result for a single reading (everything but the id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemFields {
    pub code: String,
    pub reference: String,
    pub size: String,
    pub category: String,
    pub material: Material,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub code: String,
    pub reference: String,
    pub size: String,
    pub category: String,
    pub material: Material,
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl OrderItem {
    pub fn from_fields(id: impl Into<String>, fields: OrderItemFields) -> Self {
        Self {
            id: id.into(),
            code: fields.code,
            reference: fields.reference,
            size: fields.size,
            category: fields.category,
            material: fields.material,
            price: fields.price,
            photo_url: None,
        }
    }

    pub fn is_ring(&self) -> bool {
        !self.reference.is_empty() && !self.size.is_empty()
    }
}

/// Salesperson stamped on a finalized order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRef {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// What the order flow needs to know about a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub id: String,
    pub name: String,
    pub client_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Building,
    AwaitingSignature,
    Finalized,
}

/// A signed order. Built once when a session finalizes and never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub client_code: String,
    pub date: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub notes: String,
    pub signature: String,
    pub worker: WorkerRef,
}

impl Order {
    pub fn total_items(&self) -> usize {
        self.items.len()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_display_matches_labels() {
        assert_eq!(Material::Oro.to_string(), "Oro");
        assert_eq!(Material::Desconocido.to_string(), "Desconocido");
        assert!(Material::Acero.is_known());
        assert!(!Material::Desconocido.is_known());
    }

    #[test]
    fn test_reading_deserializes_service_payload() {
        let json = r#"{"code":"3001-1","price":25.5,"tagColor":"verde"}"#;
        let reading: RawTagReading = serde_json::from_str(json).unwrap();

        assert_eq!(reading.code.as_deref(), Some("3001-1"));
        assert_eq!(reading.price, Some(25.5));
        assert_eq!(reading.tag_color.as_deref(), Some("verde"));
    }

    #[test]
    fn test_reading_missing_fields_default_to_none() {
        let reading: RawTagReading = serde_json::from_str(r#"{"price":null}"#).unwrap();
        assert_eq!(reading, RawTagReading::default());
        assert_eq!(reading.usable_code(), None);
    }

    #[test]
    fn test_blank_code_is_not_usable() {
        let reading = RawTagReading::new("   ", Some(3.0), None);
        assert_eq!(reading.usable_code(), None);

        let reading = RawTagReading::new(" A123 ", None, None);
        assert_eq!(reading.usable_code(), Some("A123"));
    }

    #[test]
    fn test_order_item_serializes_camel_case() {
        let item = OrderItem::from_fields("x-1", OrderItemFields {
            code: "1234-5".to_string(),
            reference: "1234".to_string(),
            size: "5".to_string(),
            category: "Anillo".to_string(),
            material: Material::Desconocido,
            price: None,
        });

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["material"], "Desconocido");
        assert!(value.get("photoUrl").is_none());
        assert!(item.is_ring());
    }
}
