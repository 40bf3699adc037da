//! Read-only reference data: the sale catalog and the supplier material
//! catalog.
//!
//! Both are owned by collaborators outside the engine. The engine only looks
//! items up by id through [`CatalogSource`]; [`Catalog`] is the in-memory
//! implementation used by callers that already hold the collections.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{MeasurementUnit, VatRate, coerce, units::to_base_units};

/// Selects the pricing formula of a catalog item or a material.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Flat price per unit.
    #[default]
    Fixed,
    /// Priced per unit of length or area.
    Measured,
}

/// An optional priced extra on a sale item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddOnOption {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
}

impl AddOnOption {
    #[must_use]
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            price,
        }
    }

    /// Identity used for deduplication: two options with the same name and
    /// price are the same option.
    pub(crate) fn key(&self) -> AddOnKey {
        let name: String = self
            .name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .nfc()
            .collect();
        let price = coerce::amount(Some(self.price));
        // 0.0 and -0.0 are the same price.
        let price = if price == 0.0 { 0.0 } else { price };
        AddOnKey {
            name,
            price_bits: price.to_bits(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct AddOnKey {
    name: String,
    price_bits: u64,
}

/// A material a sale item consumes, cloned into a cost item when the sale
/// item is put on a line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkedMaterial {
    pub material_id: Uuid,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cost_vat_rate: Option<VatRate>,
}

impl LinkedMaterial {
    #[must_use]
    pub fn new(material_id: Uuid) -> Self {
        Self {
            material_id,
            description: None,
            cost_vat_rate: None,
        }
    }
}

/// An item of the sale catalog.
///
/// For [`ItemType::Fixed`] `price` is the unit price. For
/// [`ItemType::Measured`] it is the price per `unit`, which is either a length
/// unit (length-priced) or an area unit (area-priced).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleCatalogItem {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub item_type: ItemType,
    pub price: f64,
    #[serde(default)]
    pub unit: MeasurementUnit,
    #[serde(default)]
    pub add_ons: Vec<AddOnOption>,
    /// Add-ons of the parent item are offered on this item too.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub linked_materials: Vec<LinkedMaterial>,
}

impl SaleCatalogItem {
    #[must_use]
    pub fn fixed(name: impl Into<String>, price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            item_type: ItemType::Fixed,
            price,
            unit: MeasurementUnit::default(),
            add_ons: Vec::new(),
            parent_id: None,
            linked_materials: Vec::new(),
        }
    }

    #[must_use]
    pub fn measured(name: impl Into<String>, price: f64, unit: MeasurementUnit) -> Self {
        Self {
            item_type: ItemType::Measured,
            unit,
            ..Self::fixed(name, price)
        }
    }

    #[must_use]
    pub fn add_on(mut self, option: AddOnOption) -> Self {
        self.add_ons.push(option);
        self
    }

    #[must_use]
    pub fn parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub fn linked_material(mut self, link: LinkedMaterial) -> Self {
        self.linked_materials.push(link);
        self
    }

    /// `true` when a measured item is priced per area.
    #[must_use]
    pub fn is_area_priced(&self) -> bool {
        self.item_type == ItemType::Measured && self.unit.is_area()
    }

    /// Price per metre or square metre.
    #[must_use]
    pub fn price_per_base_unit(&self) -> f64 {
        coerce::amount(Some(self.price)) / to_base_units(1.0, &self.unit)
    }
}

/// An item of the supplier material catalog.
///
/// Measured materials are bought in stock sheets of `sheet_length` ×
/// `sheet_width` (in `unit`) at `price` per sheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplierMaterialItem {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub item_type: ItemType,
    pub price: f64,
    #[serde(default)]
    pub sheet_length: Option<f64>,
    #[serde(default)]
    pub sheet_width: Option<f64>,
    #[serde(default)]
    pub unit: MeasurementUnit,
    /// Overrides the price per m² derived from the sheet price.
    #[serde(default)]
    pub price_per_area_m2: Option<f64>,
    #[serde(default)]
    pub include_wastage: bool,
}

impl SupplierMaterialItem {
    #[must_use]
    pub fn fixed(name: impl Into<String>, price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            item_type: ItemType::Fixed,
            price,
            sheet_length: None,
            sheet_width: None,
            unit: MeasurementUnit::default(),
            price_per_area_m2: None,
            include_wastage: false,
        }
    }

    /// A measured material sold in sheets, with wastage tracking on.
    #[must_use]
    pub fn sheet(
        name: impl Into<String>,
        sheet_price: f64,
        sheet_length: f64,
        sheet_width: f64,
        unit: MeasurementUnit,
    ) -> Self {
        Self {
            item_type: ItemType::Measured,
            sheet_length: Some(sheet_length),
            sheet_width: Some(sheet_width),
            unit,
            include_wastage: true,
            ..Self::fixed(name, sheet_price)
        }
    }

    #[must_use]
    pub fn price_per_area(mut self, price_per_m2: f64) -> Self {
        self.price_per_area_m2 = Some(price_per_m2);
        self
    }

    #[must_use]
    pub fn without_wastage(mut self) -> Self {
        self.include_wastage = false;
        self
    }

    /// Sheet length and width in metres, when both are usable.
    #[must_use]
    pub fn sheet_dimensions_m(&self) -> Option<(f64, f64)> {
        let length = coerce::dimension(self.sheet_length)?;
        let width = coerce::dimension(self.sheet_width)?;
        Some((
            to_base_units(length, &self.unit),
            to_base_units(width, &self.unit),
        ))
    }

    /// Price per m²: the explicit value when set, otherwise the sheet price
    /// spread over the sheet area.
    #[must_use]
    pub fn effective_price_per_area_m2(&self) -> Option<f64> {
        if let Some(explicit) = self.price_per_area_m2.filter(|p| p.is_finite() && *p >= 0.0) {
            return Some(explicit);
        }
        let (length, width) = self.sheet_dimensions_m()?;
        Some(coerce::amount(Some(self.price)) / (length * width))
    }
}

/// Read access to the reference collections.
pub trait CatalogSource {
    fn sale_item(&self, id: Uuid) -> Option<&SaleCatalogItem>;
    fn material(&self, id: Uuid) -> Option<&SupplierMaterialItem>;
}

/// In-memory reference collections keyed by id.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    items: HashMap<Uuid, SaleCatalogItem>,
    materials: HashMap<Uuid, SupplierMaterialItem>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_items(
        items: impl IntoIterator<Item = SaleCatalogItem>,
        materials: impl IntoIterator<Item = SupplierMaterialItem>,
    ) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
            materials: materials.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    /// Inserts or replaces a sale item, returning its id.
    pub fn insert_item(&mut self, item: SaleCatalogItem) -> Uuid {
        let id = item.id;
        self.items.insert(id, item);
        id
    }

    /// Inserts or replaces a material, returning its id.
    pub fn insert_material(&mut self, material: SupplierMaterialItem) -> Uuid {
        let id = material.id;
        self.materials.insert(id, material);
        id
    }

    pub fn remove_item(&mut self, id: Uuid) -> Option<SaleCatalogItem> {
        self.items.remove(&id)
    }

    pub fn remove_material(&mut self, id: Uuid) -> Option<SupplierMaterialItem> {
        self.materials.remove(&id)
    }

    pub fn item_mut(&mut self, id: Uuid) -> Option<&mut SaleCatalogItem> {
        self.items.get_mut(&id)
    }

    pub fn material_mut(&mut self, id: Uuid) -> Option<&mut SupplierMaterialItem> {
        self.materials.get_mut(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &SaleCatalogItem> {
        self.items.values()
    }

    pub fn materials(&self) -> impl Iterator<Item = &SupplierMaterialItem> {
        self.materials.values()
    }
}

impl CatalogSource for Catalog {
    fn sale_item(&self, id: Uuid) -> Option<&SaleCatalogItem> {
        self.items.get(&id)
    }

    fn material(&self, id: Uuid) -> Option<&SupplierMaterialItem> {
        self.materials.get(&id)
    }
}
