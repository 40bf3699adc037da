//! Line items and their recomputation.
//!
//! [`recompute_line`] is a pure function of the line, the reference data and
//! the job context. Callers run it after every edit to the line or to the
//! reference data it points at.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CatalogSource, CostItem, CostResult, CostingContext, Discount, MeasurementUnit,
    SaleCatalogItem, VatRate,
    discount::apply_discount,
    materials::{CutRequirement, allocate_costs},
    pricing::{PricingFormula, base_price},
    tax::decompose,
};

/// A row of a job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    #[serde(default)]
    pub catalog_item_id: Option<Uuid>,
    #[serde(default)]
    pub description: String,
    pub quantity: u32,
    /// Used when no catalog item is referenced.
    #[serde(default)]
    pub manual_unit_price: Option<f64>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub unit: MeasurementUnit,
    #[serde(default)]
    pub discount: Discount,
    #[serde(default)]
    pub vat_rate: VatRate,
    #[serde(default)]
    pub selected_add_ons: Vec<Uuid>,
    #[serde(default)]
    pub cost_items: Vec<CostItem>,
}

impl LineItem {
    /// A line priced by hand, with no catalog item.
    #[must_use]
    pub fn manual(description: impl Into<String>, unit_price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            catalog_item_id: None,
            description: description.into(),
            quantity: 1,
            manual_unit_price: Some(unit_price),
            length: None,
            width: None,
            unit: MeasurementUnit::default(),
            discount: Discount::default(),
            vat_rate: VatRate::ZERO,
            selected_add_ons: Vec::new(),
            cost_items: Vec::new(),
        }
    }

    /// A line for a catalog item. Dimensions are entered in the length unit
    /// matching the item's unit (`ft` for an item sold per `sqft`).
    ///
    /// Cost items are not seeded; see [`seed_cost_items`](crate::seed_cost_items).
    #[must_use]
    pub fn for_catalog_item(item: &SaleCatalogItem) -> Self {
        Self {
            catalog_item_id: Some(item.id),
            manual_unit_price: None,
            unit: item.unit.length_counterpart(),
            ..Self::manual(item.name.clone(), 0.0)
        }
    }

    #[must_use]
    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    #[must_use]
    pub fn dimensions(mut self, length: f64, width: f64) -> Self {
        self.length = Some(length);
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: MeasurementUnit) -> Self {
        self.unit = unit;
        self
    }

    #[must_use]
    pub fn discount(mut self, discount: Discount) -> Self {
        self.discount = discount;
        self
    }

    #[must_use]
    pub fn vat_rate(mut self, rate: VatRate) -> Self {
        self.vat_rate = rate;
        self
    }

    #[must_use]
    pub fn select_add_on(mut self, add_on_id: Uuid) -> Self {
        self.selected_add_ons.push(add_on_id);
        self
    }

    #[must_use]
    pub fn cost_item(mut self, item: CostItem) -> Self {
        self.cost_items.push(item);
        self
    }

    /// Quantity used in calculations; 0 counts as 1.
    #[must_use]
    pub fn effective_quantity(&self) -> u32 {
        self.quantity.max(1)
    }

    fn cut_requirement(&self) -> CutRequirement<'_> {
        CutRequirement {
            length: self.length,
            width: self.width,
            unit: &self.unit,
            quantity: self.effective_quantity(),
        }
    }
}

/// Everything computed for one line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineResult {
    pub line_id: Uuid,
    pub formula: PricingFormula,
    pub add_on_total: f64,
    pub base_price: f64,
    pub discount_amount: f64,
    pub price_after_discount: f64,
    pub sale_ex_vat: f64,
    pub vat_amount: f64,
    pub gross_total: f64,
    pub costs: Vec<CostResult>,
}

impl LineResult {
    #[must_use]
    pub fn total_material_cost(&self) -> f64 {
        self.costs.iter().map(|c| c.total_material_cost).sum()
    }

    #[must_use]
    pub fn total_wastage_cost(&self) -> f64 {
        self.costs.iter().map(|c| c.wastage_cost).sum()
    }

    #[must_use]
    pub fn total_cost_vat(&self) -> f64 {
        self.costs.iter().map(|c| c.cost_vat).sum()
    }

    /// Ex-VAT sale minus material cost.
    #[must_use]
    pub fn profit(&self) -> f64 {
        self.sale_ex_vat - self.total_material_cost()
    }

    #[must_use]
    pub fn cost(&self, cost_item_id: Uuid) -> Option<&CostResult> {
        self.costs.iter().find(|c| c.cost_item_id == cost_item_id)
    }
}

/// Recomputes price, discount, tax and every cost item of `line`.
pub fn recompute_line<C: CatalogSource + ?Sized>(
    line: &LineItem,
    catalog: &C,
    ctx: &CostingContext,
) -> LineResult {
    if !line.unit.is_recognized() {
        tracing::warn!(line_id = %line.id, unit = %line.unit, "unrecognized line unit, converting with factor 1");
    }
    let price = base_price(line, catalog, &ctx.policy);
    let discount = apply_discount(
        price.base_price,
        &line.discount,
        ctx.policy.clamp_negative_price,
    );
    let tax = decompose(discount.price_after_discount, line.vat_rate, ctx.tax_mode);
    let costs = allocate_costs(
        &line.cost_items,
        &line.cut_requirement(),
        catalog,
        ctx.default_vat_rate,
    );

    tracing::debug!(
        line_id = %line.id,
        base_price = price.base_price,
        sale_ex_vat = tax.sale_ex_vat,
        cost_items = costs.len(),
        "line recomputed"
    );

    LineResult {
        line_id: line.id,
        formula: price.formula,
        add_on_total: price.add_on_total,
        base_price: price.base_price,
        discount_amount: discount.discount_amount,
        price_after_discount: discount.price_after_discount,
        sale_ex_vat: tax.sale_ex_vat,
        vat_amount: tax.vat_amount,
        gross_total: tax.gross_total,
        costs,
    }
}
