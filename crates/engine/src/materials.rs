//! Material cost allocation.
//!
//! Each cost item of a line resolves to a cost figure split in two parts:
//!
//! - the **proportional cost**, the material actually consumed;
//! - the **wastage cost**, offcuts left over when the required piece is cut
//!   from whole stock sheets.
//!
//! Sheet usage is estimated for a single rectangular piece per line, trying
//! both orientations of the piece on the sheet. Pieces of different lines, or
//! several small pieces of the same line, are never nested on a shared sheet,
//! so the estimate errs on the high side.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CatalogSource, ItemType, MeasurementUnit, SaleCatalogItem, SupplierMaterialItem, VatRate,
    coerce, pricing::measured_area_m2, units::to_base_units,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostKind {
    /// Priced from a supplier material.
    Linked { material_id: Uuid },
    /// A cost typed in by the user.
    Manual { manual_cost: f64 },
}

/// A cost attached to a line item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostItem {
    pub id: Uuid,
    pub kind: CostKind,
    #[serde(default)]
    pub description: String,
    /// When unset, linked items use the job default rate and manual items 0.
    #[serde(default)]
    pub cost_vat_rate: Option<VatRate>,
}

impl CostItem {
    #[must_use]
    pub fn linked(material_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: CostKind::Linked { material_id },
            description: String::new(),
            cost_vat_rate: None,
        }
    }

    #[must_use]
    pub fn manual(description: impl Into<String>, manual_cost: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: CostKind::Manual { manual_cost },
            description: description.into(),
            cost_vat_rate: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn vat_rate(mut self, rate: VatRate) -> Self {
        self.cost_vat_rate = Some(rate);
        self
    }
}

/// The piece a line needs cut, in the line's own unit.
#[derive(Clone, Copy, Debug)]
pub struct CutRequirement<'a> {
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub unit: &'a MeasurementUnit,
    pub quantity: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CostResult {
    pub cost_item_id: Uuid,
    pub proportional_cost: f64,
    pub wastage_cost: f64,
    pub total_material_cost: f64,
    /// Sheets per piece, when the sheet heuristic ran.
    pub sheets_consumed: Option<u64>,
    pub cost_vat_rate: VatRate,
    pub cost_vat: f64,
}

/// Whole sheets needed to cut one `part_length × part_width` piece from
/// `sheet_length × sheet_width` stock, taking the better of the two
/// orientations. All dimensions in the same unit.
#[must_use]
pub fn sheets_required(
    part_length: f64,
    part_width: f64,
    sheet_length: f64,
    sheet_width: f64,
) -> u64 {
    let along = sheets_along(part_length, sheet_length) * sheets_along(part_width, sheet_width);
    let rotated = sheets_along(part_length, sheet_width) * sheets_along(part_width, sheet_length);
    along.min(rotated) as u64
}

/// Sheets needed side by side to cover `part` along one edge.
///
/// Unit conversion leaves exact multiples a few ulps off (1000 mm is
/// `1.0000000000000002` sheets of 1 m), so ratios within a relative
/// tolerance of a whole number count as that number.
fn sheets_along(part: f64, sheet: f64) -> f64 {
    const TOLERANCE: f64 = 1e-9;

    let ratio = part / sheet;
    let nearest = ratio.round();
    let ratio = if (ratio - nearest).abs() <= TOLERANCE * nearest.max(1.0) {
        nearest
    } else {
        ratio
    };
    ratio.ceil().max(1.0)
}

struct Allocation {
    proportional: f64,
    total: f64,
    sheets: Option<u64>,
}

impl Allocation {
    fn flat(cost: f64) -> Self {
        Self {
            proportional: cost,
            total: cost,
            sheets: None,
        }
    }
}

fn allocate_material(material: &SupplierMaterialItem, req: &CutRequirement<'_>) -> Allocation {
    let quantity = f64::from(req.quantity.max(1));
    let price = coerce::amount(Some(material.price));

    if material.item_type == ItemType::Fixed {
        return Allocation::flat(price * quantity);
    }

    if !material.unit.is_recognized() {
        tracing::warn!(material_id = %material.id, unit = %material.unit, "unrecognized material unit, converting with factor 1");
    }
    let (Some(price_per_m2), Some(area)) = (
        material.effective_price_per_area_m2(),
        measured_area_m2(req.length, req.width, req.unit),
    ) else {
        return Allocation::flat(price * quantity);
    };
    let proportional = area * price_per_m2 * quantity;

    let part = match (
        coerce::dimension(req.length),
        coerce::dimension(req.width),
    ) {
        (Some(length), Some(width)) if !req.unit.is_area() => Some((
            to_base_units(length, req.unit),
            to_base_units(width, req.unit),
        )),
        _ => None,
    };
    let sheet = material.sheet_dimensions_m();

    let (true, Some((part_l, part_w)), Some((sheet_l, sheet_w))) =
        (material.include_wastage, part, sheet)
    else {
        return Allocation::flat(proportional);
    };

    let sheets = sheets_required(part_l, part_w, sheet_l, sheet_w);
    let mut total = sheets as f64 * quantity * price;
    if total < proportional {
        // An explicit price per m² above the sheet rate, or rounding on an
        // exact fit.
        tracing::debug!(material_id = %material.id, total, proportional, "sheet cost below proportional cost");
        total = proportional;
    }

    Allocation {
        proportional,
        total,
        sheets: Some(sheets),
    }
}

/// Computes the cost figures of one cost item.
///
/// A linked item whose material no longer exists costs 0.
pub fn allocate_cost<C: CatalogSource + ?Sized>(
    item: &CostItem,
    req: &CutRequirement<'_>,
    catalog: &C,
    default_vat_rate: VatRate,
) -> CostResult {
    let (allocation, cost_vat_rate) = match &item.kind {
        CostKind::Linked { material_id } => {
            let rate = item.cost_vat_rate.unwrap_or(default_vat_rate);
            match catalog.material(*material_id) {
                Some(material) => (allocate_material(material, req), rate),
                None => {
                    tracing::warn!(cost_item_id = %item.id, material_id = %material_id, "material not found, costing at zero");
                    (Allocation::flat(0.0), rate)
                }
            }
        }
        CostKind::Manual { manual_cost } => (
            Allocation::flat(coerce::amount(Some(*manual_cost))),
            item.cost_vat_rate.unwrap_or(VatRate::ZERO),
        ),
    };

    CostResult {
        cost_item_id: item.id,
        proportional_cost: allocation.proportional,
        wastage_cost: allocation.total - allocation.proportional,
        total_material_cost: allocation.total,
        sheets_consumed: allocation.sheets,
        cost_vat_rate,
        cost_vat: cost_vat_rate.apply(allocation.total),
    }
}

/// Computes every cost item of a line, in order.
pub fn allocate_costs<C: CatalogSource + ?Sized>(
    items: &[CostItem],
    req: &CutRequirement<'_>,
    catalog: &C,
    default_vat_rate: VatRate,
) -> Vec<CostResult> {
    items
        .iter()
        .map(|item| allocate_cost(item, req, catalog, default_vat_rate))
        .collect()
}

/// Clones a sale item's linked-material declarations into fresh cost items.
///
/// The description is the declaration's override, else the material name.
pub fn seed_cost_items<C: CatalogSource + ?Sized>(
    item: &SaleCatalogItem,
    catalog: &C,
) -> Vec<CostItem> {
    item.linked_materials
        .iter()
        .map(|link| {
            let description = link.description.clone().unwrap_or_else(|| {
                catalog
                    .material(link.material_id)
                    .map(|m| m.name.clone())
                    .unwrap_or_default()
            });
            CostItem {
                cost_vat_rate: link.cost_vat_rate,
                ..CostItem::linked(link.material_id).description(description)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Catalog, LinkedMaterial};

    fn rate(percent: f64) -> VatRate {
        VatRate::new(percent).unwrap()
    }

    fn req<'a>(length: f64, width: f64, unit: &'a MeasurementUnit, quantity: u32) -> CutRequirement<'a> {
        CutRequirement {
            length: Some(length),
            width: Some(width),
            unit,
            quantity,
        }
    }

    #[test]
    fn sheet_count_tries_both_orientations() {
        assert_eq!(sheets_required(1.5, 0.5, 1.0, 1.0), 2);
        // 2.4 × 0.5 along a 2.44 × 1.22 sheet fits once; rotated it needs two.
        assert_eq!(sheets_required(2.4, 0.5, 2.44, 1.22), 1);
        assert_eq!(sheets_required(0.5, 2.4, 2.44, 1.22), 1);
        assert_eq!(sheets_required(3.0, 3.0, 2.0, 1.0), 6);
        assert_eq!(sheets_required(1.8, 0.9, 1.0, 2.0), 1);
    }

    #[test]
    fn exact_multiples_do_not_round_up() {
        // 0.57 / 0.19 is 3.0000000000000004 in f64.
        assert_eq!(sheets_required(0.57, 0.1, 0.19, 0.1), 3);
        assert_eq!(sheets_required(1.0, 0.41, 1.0, 0.41), 1);

        let mm = MeasurementUnit::Millimetre;
        assert_eq!(
            sheets_required(
                to_base_units(570.0, &mm),
                to_base_units(100.0, &mm),
                to_base_units(190.0, &mm),
                to_base_units(100.0, &mm),
            ),
            3
        );
    }

    #[test]
    fn piece_matching_sheet_in_other_unit_uses_one_sheet() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_material(SupplierMaterialItem::sheet(
            "Shelf board",
            20.0,
            1.0,
            0.41,
            MeasurementUnit::Metre,
        ));
        let result = allocate_cost(
            &CostItem::linked(id),
            &req(1000.0, 410.0, &MeasurementUnit::Millimetre, 1),
            &catalog,
            VatRate::ZERO,
        );
        assert_eq!(result.sheets_consumed, Some(1));
        assert!((result.total_material_cost - 20.0).abs() < 1e-9);
        assert!(result.wastage_cost.abs() < 1e-9);
        assert!(result.total_material_cost >= result.proportional_cost);
    }

    #[test]
    fn wastage_from_square_sheet() {
        let mut catalog = Catalog::new();
        let board = SupplierMaterialItem::sheet("MDF", 20.0, 1.0, 1.0, MeasurementUnit::Metre);
        let id = catalog.insert_material(board);
        let item = CostItem::linked(id);

        let result = allocate_cost(&item, &req(1.5, 0.5, &MeasurementUnit::Metre, 1), &catalog, rate(20.0));
        assert_eq!(result.proportional_cost, 15.0);
        assert_eq!(result.sheets_consumed, Some(2));
        assert_eq!(result.total_material_cost, 40.0);
        assert_eq!(result.wastage_cost, 25.0);
        assert_eq!(result.cost_vat_rate.percent(), 20.0);
        assert_eq!(result.cost_vat, 8.0);
    }

    #[test]
    fn wastage_scales_with_quantity() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_material(SupplierMaterialItem::sheet(
            "MDF",
            20.0,
            1.0,
            1.0,
            MeasurementUnit::Metre,
        ));
        let result = allocate_cost(
            &CostItem::linked(id),
            &req(1.5, 0.5, &MeasurementUnit::Metre, 3),
            &catalog,
            VatRate::ZERO,
        );
        assert_eq!(result.proportional_cost, 45.0);
        assert_eq!(result.total_material_cost, 120.0);
        assert_eq!(result.wastage_cost, 75.0);
    }

    #[test]
    fn no_wastage_when_disabled() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_material(
            SupplierMaterialItem::sheet("MDF", 20.0, 1.0, 1.0, MeasurementUnit::Metre)
                .without_wastage(),
        );
        let result = allocate_cost(
            &CostItem::linked(id),
            &req(1.5, 0.5, &MeasurementUnit::Metre, 1),
            &catalog,
            VatRate::ZERO,
        );
        assert_eq!(result.total_material_cost, 15.0);
        assert_eq!(result.wastage_cost, 0.0);
        assert_eq!(result.sheets_consumed, None);
    }

    #[test]
    fn no_wastage_for_area_units() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_material(SupplierMaterialItem::sheet(
            "MDF",
            20.0,
            1.0,
            1.0,
            MeasurementUnit::Metre,
        ));
        let result = allocate_cost(
            &CostItem::linked(id),
            &req(0.75, 0.0, &MeasurementUnit::SquareMetre, 1),
            &catalog,
            VatRate::ZERO,
        );
        assert_eq!(result.proportional_cost, 15.0);
        assert_eq!(result.total_material_cost, 15.0);
    }

    #[test]
    fn sheet_in_millimetres() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_material(SupplierMaterialItem::sheet(
            "Ply",
            48.8,
            2440.0,
            1220.0,
            MeasurementUnit::Millimetre,
        ));
        let result = allocate_cost(
            &CostItem::linked(id),
            &req(1300.0, 1300.0, &MeasurementUnit::Millimetre, 1),
            &catalog,
            VatRate::ZERO,
        );
        assert_eq!(result.sheets_consumed, Some(2));
        assert!((result.total_material_cost - 97.6).abs() < 1e-9);
        assert!(result.total_material_cost >= result.proportional_cost);
    }

    #[test]
    fn fixed_material_is_unit_price_times_quantity() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_material(SupplierMaterialItem::fixed("Hinge", 2.5));
        let result = allocate_cost(
            &CostItem::linked(id),
            &req(1.5, 0.5, &MeasurementUnit::Metre, 4),
            &catalog,
            VatRate::ZERO,
        );
        assert_eq!(result.proportional_cost, 10.0);
        assert_eq!(result.total_material_cost, 10.0);
        assert_eq!(result.wastage_cost, 0.0);
    }

    #[test]
    fn measured_material_without_dimensions_costs_per_unit() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_material(SupplierMaterialItem::sheet(
            "MDF",
            20.0,
            1.0,
            1.0,
            MeasurementUnit::Metre,
        ));
        let requirement = CutRequirement {
            length: None,
            width: None,
            unit: &MeasurementUnit::Metre,
            quantity: 2,
        };
        let result = allocate_cost(&CostItem::linked(id), &requirement, &catalog, VatRate::ZERO);
        assert_eq!(result.total_material_cost, 40.0);
        assert_eq!(result.wastage_cost, 0.0);
    }

    #[test]
    fn explicit_area_price_above_sheet_rate_keeps_invariant() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_material(
            SupplierMaterialItem::sheet("Oak", 20.0, 1.0, 1.0, MeasurementUnit::Metre)
                .price_per_area(60.0),
        );
        let result = allocate_cost(
            &CostItem::linked(id),
            &req(1.5, 0.5, &MeasurementUnit::Metre, 1),
            &catalog,
            VatRate::ZERO,
        );
        assert_eq!(result.proportional_cost, 45.0);
        assert_eq!(result.total_material_cost, 45.0);
        assert_eq!(result.wastage_cost, 0.0);
    }

    #[test]
    fn dangling_material_costs_zero() {
        let catalog = Catalog::new();
        let result = allocate_cost(
            &CostItem::linked(Uuid::new_v4()),
            &req(1.5, 0.5, &MeasurementUnit::Metre, 1),
            &catalog,
            rate(20.0),
        );
        assert_eq!(result.total_material_cost, 0.0);
        assert_eq!(result.wastage_cost, 0.0);
        assert_eq!(result.cost_vat, 0.0);
    }

    #[test]
    fn manual_cost_defaults_to_zero_vat() {
        let catalog = Catalog::new();
        let requirement = req(1.0, 1.0, &MeasurementUnit::Metre, 5);
        let item = CostItem::manual("Labour", 80.0);
        let result = allocate_cost(&item, &requirement, &catalog, rate(20.0));
        assert_eq!(result.proportional_cost, 80.0);
        assert_eq!(result.total_material_cost, 80.0);
        assert_eq!(result.cost_vat, 0.0);

        let item = item.vat_rate(rate(20.0));
        assert_eq!(allocate_cost(&item, &requirement, &catalog, VatRate::ZERO).cost_vat, 16.0);
    }

    #[test]
    fn allocation_is_idempotent() {
        let mut catalog = Catalog::new();
        let id = catalog.insert_material(SupplierMaterialItem::sheet(
            "MDF",
            23.17,
            2.44,
            1.22,
            MeasurementUnit::Metre,
        ));
        let items = vec![CostItem::linked(id), CostItem::manual("Fixings", 3.3)];
        let requirement = req(1.37, 0.91, &MeasurementUnit::Metre, 3);

        let first = allocate_costs(&items, &requirement, &catalog, rate(20.0));
        let second = allocate_costs(&items, &requirement, &catalog, rate(20.0));
        assert_eq!(first, second);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.total_material_cost.to_bits(), b.total_material_cost.to_bits());
        }
    }

    #[test]
    fn seeds_cost_items_from_linked_materials() {
        let mut catalog = Catalog::new();
        let board = catalog.insert_material(SupplierMaterialItem::sheet(
            "MDF 18mm",
            20.0,
            1.0,
            1.0,
            MeasurementUnit::Metre,
        ));
        let edging = catalog.insert_material(SupplierMaterialItem::fixed("Edging", 1.0));
        let item = SaleCatalogItem::measured("Shelf", 40.0, MeasurementUnit::SquareMetre)
            .linked_material(LinkedMaterial::new(board))
            .linked_material(LinkedMaterial {
                description: Some("ABS edge".to_string()),
                cost_vat_rate: Some(VatRate::ZERO),
                ..LinkedMaterial::new(edging)
            });

        let seeded = seed_cost_items(&item, &catalog);
        assert_eq!(seeded.len(), 2);
        assert_eq!(seeded[0].kind, CostKind::Linked { material_id: board });
        assert_eq!(seeded[0].description, "MDF 18mm");
        assert_eq!(seeded[0].cost_vat_rate, None);
        assert_eq!(seeded[1].description, "ABS edge");
        assert_eq!(seeded[1].cost_vat_rate, Some(VatRate::ZERO));
        assert_ne!(seeded[0].id, seeded[1].id);
    }
}
