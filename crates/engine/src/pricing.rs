//! Base price of a line item, before discount and tax.
//!
//! Exactly one formula applies to a line:
//!
//! - **Fixed**: `unit price × quantity + add-ons`
//! - **Measured, area-priced**: `area (m²) × price per m² × quantity + add-ons`
//! - **Measured, length-priced**: `length (m) × price per m × quantity + add-ons`
//! - **Manual** (no catalog item, or the reference no longer resolves):
//!   `manual unit price × quantity`

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AddOnCharging, AddOnOption, CatalogSource, ItemType, LineItem, MeasurementUnit, PricingPolicy,
    SaleCatalogItem,
    catalog::AddOnKey,
    coerce,
    units::{is_area_unit, to_base_units},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingFormula {
    Fixed,
    MeasuredArea,
    MeasuredLength,
    Manual,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub formula: PricingFormula,
    /// Price of the item itself, without add-ons.
    pub item_total: f64,
    pub add_on_total: f64,
    pub base_price: f64,
}

/// The add-ons visible on an item, deduplicated, with every id that resolves
/// to one of them.
struct AddOnIndex {
    options: Vec<AddOnOption>,
    by_id: HashMap<Uuid, usize>,
}

impl AddOnIndex {
    fn build<C: CatalogSource + ?Sized>(item: &SaleCatalogItem, catalog: &C) -> Self {
        let mut options: Vec<AddOnOption> = Vec::new();
        let mut by_key: HashMap<AddOnKey, usize> = HashMap::new();
        let mut by_id = HashMap::new();

        for option in add_on_chain(item, catalog) {
            let index = *by_key.entry(option.key()).or_insert_with(|| {
                options.push(option.clone());
                options.len() - 1
            });
            by_id.entry(option.id).or_insert(index);
        }

        Self { options, by_id }
    }

    /// Indexes of the selected options, in selection order, each at most once.
    fn resolve(&self, selected: &[Uuid]) -> Vec<usize> {
        let mut seen = HashSet::new();
        selected
            .iter()
            .filter_map(|id| self.by_id.get(id).copied())
            .filter(|index| seen.insert(*index))
            .collect()
    }
}

/// Own add-ons first, then each ancestor's. A cycle in parent references
/// stops the walk.
fn add_on_chain<'a, C: CatalogSource + ?Sized>(
    item: &'a SaleCatalogItem,
    catalog: &'a C,
) -> Vec<&'a AddOnOption> {
    let mut chain: Vec<&AddOnOption> = item.add_ons.iter().collect();
    let mut visited = HashSet::from([item.id]);
    let mut parent_id = item.parent_id;

    while let Some(id) = parent_id {
        if !visited.insert(id) {
            tracing::warn!(item_id = %item.id, parent_id = %id, "cycle in catalog parent chain");
            break;
        }
        let Some(parent) = catalog.sale_item(id) else {
            break;
        };
        chain.extend(parent.add_ons.iter());
        parent_id = parent.parent_id;
    }

    chain
}

/// The add-ons a line using `item` may select: the item's own merged with
/// those inherited from its parents, deduplicated by name and price.
pub fn available_add_ons<C: CatalogSource + ?Sized>(
    item: &SaleCatalogItem,
    catalog: &C,
) -> Vec<AddOnOption> {
    AddOnIndex::build(item, catalog).options
}

/// Rewrites a selection to canonical ids of the visible add-on set.
///
/// Unknown ids are dropped. Ids of duplicate options map to the option that
/// is kept, so a duplicated add-on can never be selected twice.
pub fn normalize_selection<C: CatalogSource + ?Sized>(
    selected: &[Uuid],
    item: &SaleCatalogItem,
    catalog: &C,
) -> Vec<Uuid> {
    let index = AddOnIndex::build(item, catalog);
    index
        .resolve(selected)
        .into_iter()
        .map(|i| index.options[i].id)
        .collect()
}

/// Sum of the prices of the selected add-ons, each counted once.
pub fn selected_add_on_total<C: CatalogSource + ?Sized>(
    selected: &[Uuid],
    item: &SaleCatalogItem,
    catalog: &C,
) -> f64 {
    let index = AddOnIndex::build(item, catalog);
    index
        .resolve(selected)
        .into_iter()
        .map(|i| coerce::amount(Some(index.options[i].price)))
        .sum()
}

/// Area in m² described by a line's dimensions.
///
/// With a length unit the area is `length × width`. With an area unit the
/// entered length already is the area and `width` is ignored. `None` when a
/// needed dimension is missing or not positive.
#[must_use]
pub fn measured_area_m2(
    length: Option<f64>,
    width: Option<f64>,
    unit: &MeasurementUnit,
) -> Option<f64> {
    let length = coerce::dimension(length)?;
    if is_area_unit(unit) {
        return Some(to_base_units(length, unit));
    }
    let width = coerce::dimension(width)?;
    Some(to_base_units(length, unit) * to_base_units(width, unit))
}

/// Computes the base price of `line`.
pub fn base_price<C: CatalogSource + ?Sized>(
    line: &LineItem,
    catalog: &C,
    policy: &PricingPolicy,
) -> PriceBreakdown {
    let quantity = f64::from(line.effective_quantity());

    let item = match line.catalog_item_id {
        Some(id) => {
            let item = catalog.sale_item(id);
            if item.is_none() {
                tracing::warn!(line_id = %line.id, item_id = %id, "catalog item not found, using manual price");
            }
            item
        }
        None => None,
    };

    let Some(item) = item else {
        let item_total = coerce::amount(line.manual_unit_price) * quantity;
        return PriceBreakdown {
            formula: PricingFormula::Manual,
            item_total,
            add_on_total: 0.0,
            base_price: item_total,
        };
    };

    if item.item_type == ItemType::Measured && !item.unit.is_recognized() {
        tracing::warn!(item_id = %item.id, unit = %item.unit, "unrecognized catalog unit, converting with factor 1");
    }
    let (formula, item_total) = match item.item_type {
        ItemType::Fixed => (
            PricingFormula::Fixed,
            coerce::amount(Some(item.price)) * quantity,
        ),
        ItemType::Measured if item.unit.is_area() => {
            let area = measured_area_m2(line.length, line.width, &line.unit).unwrap_or(0.0);
            (
                PricingFormula::MeasuredArea,
                area * item.price_per_base_unit() * quantity,
            )
        }
        ItemType::Measured => {
            let length = coerce::dimension(line.length)
                .map(|l| to_base_units(l, &line.unit))
                .unwrap_or(0.0);
            (
                PricingFormula::MeasuredLength,
                length * item.price_per_base_unit() * quantity,
            )
        }
    };

    let mut add_on_total = selected_add_on_total(&line.selected_add_ons, item, catalog);
    if policy.add_on_charging == AddOnCharging::PerUnit {
        add_on_total *= quantity;
    }

    PriceBreakdown {
        formula,
        item_total,
        add_on_total,
        base_price: item_total + add_on_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Catalog;

    fn policy() -> PricingPolicy {
        PricingPolicy::default()
    }

    #[test]
    fn fixed_price_times_quantity() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_item(SaleCatalogItem::fixed("Hinge", 10.0));
        let line = LineItem::for_catalog_item(catalog.sale_item(id).unwrap()).quantity(3);

        let price = base_price(&line, &catalog, &policy());
        assert_eq!(price.formula, PricingFormula::Fixed);
        assert_eq!(price.base_price, 30.0);
    }

    #[test]
    fn area_price() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_item(SaleCatalogItem::measured(
            "Worktop",
            5.0,
            MeasurementUnit::SquareMetre,
        ));
        let line = LineItem::for_catalog_item(catalog.sale_item(id).unwrap())
            .dimensions(2.0, 3.0)
            .unit(MeasurementUnit::Metre);

        let price = base_price(&line, &catalog, &policy());
        assert_eq!(price.formula, PricingFormula::MeasuredArea);
        assert_eq!(price.base_price, 30.0);
    }

    #[test]
    fn area_price_with_dimensions_in_millimetres() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_item(SaleCatalogItem::measured(
            "Glass",
            100.0,
            MeasurementUnit::SquareMetre,
        ));
        let line = LineItem::for_catalog_item(catalog.sale_item(id).unwrap())
            .dimensions(500.0, 400.0)
            .unit(MeasurementUnit::Millimetre)
            .quantity(2);

        let price = base_price(&line, &catalog, &policy());
        assert!((price.base_price - 40.0).abs() < 1e-9);
    }

    #[test]
    fn area_entered_directly() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_item(SaleCatalogItem::measured(
            "Paint",
            8.0,
            MeasurementUnit::SquareMetre,
        ));
        let line = LineItem::for_catalog_item(catalog.sale_item(id).unwrap())
            .unit(MeasurementUnit::SquareMetre);
        let line = LineItem {
            length: Some(12.5),
            width: None,
            ..line
        };

        assert_eq!(base_price(&line, &catalog, &policy()).base_price, 100.0);
    }

    #[test]
    fn length_price_ignores_width() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_item(SaleCatalogItem::measured(
            "Skirting",
            4.0,
            MeasurementUnit::Metre,
        ));
        let line = LineItem::for_catalog_item(catalog.sale_item(id).unwrap())
            .dimensions(250.0, 15.0)
            .unit(MeasurementUnit::Centimetre)
            .quantity(2);

        let price = base_price(&line, &catalog, &policy());
        assert_eq!(price.formula, PricingFormula::MeasuredLength);
        assert!((price.base_price - 20.0).abs() < 1e-9);
    }

    #[test]
    fn missing_dimensions_price_at_zero() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_item(SaleCatalogItem::measured(
            "Worktop",
            5.0,
            MeasurementUnit::SquareMetre,
        ));
        let line = LineItem::for_catalog_item(catalog.sale_item(id).unwrap());
        assert_eq!(base_price(&line, &catalog, &policy()).base_price, 0.0);
    }

    #[test]
    fn manual_price_without_catalog_item() {
        let catalog = Catalog::new();
        let line = LineItem::manual("Call-out", 45.0).quantity(2);
        let price = base_price(&line, &catalog, &policy());
        assert_eq!(price.formula, PricingFormula::Manual);
        assert_eq!(price.base_price, 90.0);
    }

    #[test]
    fn dangling_catalog_reference_falls_back_to_manual_price() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_item(SaleCatalogItem::fixed("Hinge", 10.0));
        let mut line = LineItem::for_catalog_item(catalog.sale_item(id).unwrap()).quantity(2);
        line.manual_unit_price = Some(7.0);
        catalog.remove_item(id);

        let price = base_price(&line, &catalog, &policy());
        assert_eq!(price.formula, PricingFormula::Manual);
        assert_eq!(price.base_price, 14.0);
    }

    #[test]
    fn add_ons_added_once_per_line() {
        let mut catalog = Catalog::new();
        let glazing = AddOnOption::new("Glazing", 15.0);
        let glazing_id = glazing.id;
        let id = catalog.insert_item(SaleCatalogItem::fixed("Door", 100.0).add_on(glazing));
        let line = LineItem::for_catalog_item(catalog.sale_item(id).unwrap())
            .quantity(3)
            .select_add_on(glazing_id);

        let price = base_price(&line, &catalog, &policy());
        assert_eq!(price.add_on_total, 15.0);
        assert_eq!(price.base_price, 315.0);

        let per_unit = PricingPolicy {
            add_on_charging: AddOnCharging::PerUnit,
            ..policy()
        };
        assert_eq!(base_price(&line, &catalog, &per_unit).base_price, 345.0);
    }

    #[test]
    fn inherited_add_ons_are_deduplicated() {
        let mut catalog = Catalog::new();
        let parent_handle = AddOnOption::new("Brass handle", 12.0);
        let parent_lock = AddOnOption::new("Lock", 30.0);
        let parent_handle_id = parent_handle.id;
        let parent = SaleCatalogItem::fixed("Door", 100.0)
            .add_on(parent_handle)
            .add_on(parent_lock.clone());
        let parent_id = catalog.insert_item(parent);

        let own_handle = AddOnOption::new("Brass handle", 12.0);
        let own_handle_id = own_handle.id;
        let child = SaleCatalogItem::fixed("Fire door", 180.0)
            .add_on(own_handle)
            .parent(parent_id);
        let child_id = catalog.insert_item(child);
        let child = catalog.sale_item(child_id).unwrap();

        let options = available_add_ons(child, &catalog);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].id, own_handle_id);
        assert_eq!(options[1].id, parent_lock.id);

        // Selecting both copies of the handle counts it once.
        let selected = [own_handle_id, parent_handle_id, parent_lock.id];
        assert_eq!(selected_add_on_total(&selected, child, &catalog), 42.0);
        assert_eq!(
            normalize_selection(&selected, child, &catalog),
            vec![own_handle_id, parent_lock.id]
        );
    }

    #[test]
    fn unknown_selection_is_dropped() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_item(SaleCatalogItem::fixed("Door", 100.0));
        let item = catalog.sale_item(id).unwrap();
        assert!(normalize_selection(&[Uuid::new_v4()], item, &catalog).is_empty());
    }

    #[test]
    fn parent_cycle_terminates() {
        let mut catalog = Catalog::new();
        let mut a = SaleCatalogItem::fixed("A", 1.0).add_on(AddOnOption::new("x", 1.0));
        let b = SaleCatalogItem::fixed("B", 1.0)
            .add_on(AddOnOption::new("y", 2.0))
            .parent(a.id);
        a.parent_id = Some(b.id);
        let a_id = catalog.insert_item(a);
        catalog.insert_item(b);

        let options = available_add_ons(catalog.sale_item(a_id).unwrap(), &catalog);
        assert_eq!(options.len(), 2);
    }
}
