//! Documents exchanged with the application around the costing engine.
//!
//! Numbers in these documents come from user-edited data and are not trusted:
//! every numeric field is a [`Loose`] value, which accepts JSON numbers and
//! numeric strings alike. Conversion into engine types happens in the caller.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A number as found in stored documents: `12.5`, `"12.5"` or `"12,50"`.
///
/// `null` and missing fields deserialize as `None` on the `Option<Loose>`
/// fields that carry it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Number(f64),
    Text(String),
}

impl From<f64> for Loose {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Loose {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

pub mod catalog {
    use super::*;

    /// Both reference collections, as exported by the catalog owner.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CatalogDocument {
        #[serde(default)]
        pub items: Vec<SaleItemDoc>,
        #[serde(default)]
        pub materials: Vec<MaterialDoc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SaleItemDoc {
        pub id: Uuid,
        pub name: String,
        /// `fixed` or `measured`; anything else is treated as `fixed`.
        pub item_type: Option<String>,
        pub price: Option<Loose>,
        /// Unit code such as `m`, `sqm` or `ft`.
        pub unit: Option<String>,
        #[serde(default)]
        pub add_ons: Vec<AddOnDoc>,
        /// Item whose add-ons this one inherits.
        pub parent_id: Option<Uuid>,
        #[serde(default)]
        pub linked_materials: Vec<LinkedMaterialDoc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AddOnDoc {
        /// Generated when absent.
        pub id: Option<Uuid>,
        pub name: String,
        pub price: Option<Loose>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LinkedMaterialDoc {
        pub material_id: Uuid,
        pub description: Option<String>,
        pub cost_vat_rate: Option<Loose>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MaterialDoc {
        pub id: Uuid,
        pub name: String,
        pub item_type: Option<String>,
        /// Price of one whole unit, i.e. one sheet for sheet stock.
        pub price: Option<Loose>,
        pub sheet_length: Option<Loose>,
        pub sheet_width: Option<Loose>,
        pub unit: Option<String>,
        pub price_per_area_m2: Option<Loose>,
        /// Defaults to `true` for sheet stock.
        pub include_wastage: Option<bool>,
    }
}

pub mod job {
    use super::*;

    /// A job as stored by the application, lines in display order.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct JobDocument {
        pub id: Option<Uuid>,
        pub name: Option<String>,
        /// `exclusive`, `inclusive` or `none`.
        pub tax_mode: Option<String>,
        /// Percentage; falls back to the configured default.
        pub default_vat_rate: Option<Loose>,
        /// ISO code used for display and snapshots.
        pub currency: Option<String>,
        #[serde(default)]
        pub lines: Vec<LineDoc>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct LineDoc {
        pub id: Option<Uuid>,
        pub catalog_item_id: Option<Uuid>,
        pub description: Option<String>,
        pub quantity: Option<Loose>,
        pub manual_unit_price: Option<Loose>,
        pub length: Option<Loose>,
        pub width: Option<Loose>,
        pub unit: Option<String>,
        pub discount: Option<DiscountDoc>,
        /// Percentage; catalog lines fall back to the job default.
        pub vat_rate: Option<Loose>,
        #[serde(default)]
        pub selected_add_ons: Vec<Uuid>,
        /// `None` seeds the cost items from the catalog item's linked
        /// materials; an empty list means the line has no costs.
        pub cost_items: Option<Vec<CostItemDoc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DiscountDoc {
        /// `fixed` or `percentage`.
        #[serde(rename = "type")]
        pub kind: String,
        pub value: Option<Loose>,
    }

    /// A cost attached to a line: `material_id` for a linked material,
    /// otherwise `manual_cost`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CostItemDoc {
        pub id: Option<Uuid>,
        pub material_id: Option<Uuid>,
        pub manual_cost: Option<Loose>,
        pub description: Option<String>,
        pub cost_vat_rate: Option<Loose>,
    }
}
