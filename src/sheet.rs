use std::collections::BTreeMap;
use std::fmt::Write;

use crate::domain::order::{Material, Order, OrderItem};

// ============================================================================
// Order Sheet
// ============================================================================
//
// Printable layout of a finalized order: one block per material (fixed
// order), categories alphabetical inside a material, items by code inside a
// category.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SheetLine {
    pub code: String,
    pub material: Material,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBlock {
    pub category: String,
    pub lines: Vec<SheetLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialBlock {
    pub material: Material,
    pub categories: Vec<CategoryBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderSheet {
    pub client_name: String,
    pub client_code: String,
    pub worker_name: String,
    pub date: String,
    pub blocks: Vec<MaterialBlock>,
    pub total_items: usize,
    pub notes: Option<String>,
    pub signature: String,
}

impl OrderSheet {
    pub fn build(order: &Order) -> Self {
        let blocks = Material::SHEET_ORDER
            .iter()
            .filter_map(|material| material_block(*material, &order.items))
            .collect();

        Self {
            client_name: order.client_name.clone(),
            client_code: order.client_code.clone(),
            worker_name: order.worker.name.clone(),
            date: order.date.format("%d/%m/%Y %H:%M").to_string(),
            blocks,
            total_items: order.total_items(),
            notes: Some(order.notes.trim())
                .filter(|notes| !notes.is_empty())
                .map(str::to_string),
            signature: order.signature.clone(),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();

        // Writing into a String cannot fail
        let _ = writeln!(out, "HOJA DE PEDIDO");
        let _ = writeln!(out, "{} ({})", self.client_name, self.client_code);
        let _ = writeln!(out, "Vendedor: {}   Fecha: {}", self.worker_name, self.date);

        for block in &self.blocks {
            let _ = writeln!(out);
            let _ = writeln!(out, "== {} ==", block.material.as_str().to_uppercase());
            for category in &block.categories {
                let _ = writeln!(out, "-- {} (Total Piezas: {})", category.category, category.lines.len());
                for line in &category.lines {
                    let _ = writeln!(out, "   {:<12} {}", line.code, format_price(line.price));
                }
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Total Artículos del Pedido: {}", self.total_items);

        if let Some(notes) = &self.notes {
            let _ = writeln!(out);
            let _ = writeln!(out, "Observaciones:");
            let _ = writeln!(out, "{}", notes);
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Firma del Cliente: {}", self.signature);
        let _ = writeln!(out, "Vendedor: {}", self.worker_name);

        out
    }
}

fn material_block(material: Material, items: &[OrderItem]) -> Option<MaterialBlock> {
    let mut by_category: BTreeMap<&str, Vec<SheetLine>> = BTreeMap::new();

    for item in items.iter().filter(|item| item.material == material) {
        by_category
            .entry(item.category.as_str())
            .or_default()
            .push(SheetLine {
                code: item.code.clone(),
                material: item.material,
                price: item.price,
            });
    }

    if by_category.is_empty() {
        return None;
    }

    let categories = by_category
        .into_iter()
        .map(|(category, mut lines)| {
            lines.sort_by(|a, b| a.code.cmp(&b.code));
            CategoryBlock {
                category: category.to_string(),
                lines,
            }
        })
        .collect();

    Some(MaterialBlock { material, categories })
}

pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(price) => format!("€{:.2}", price),
        None => "N/A".to_string(),
    }
}
