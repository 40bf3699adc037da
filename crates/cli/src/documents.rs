//! Conversion of stored documents into engine types.
//!
//! Malformed numbers and units are coerced, never rejected. Only an unknown
//! tax mode, discount type or currency fails the load.

use api_types::{
    Loose,
    catalog::{CatalogDocument, MaterialDoc, SaleItemDoc},
    job::{CostItemDoc, JobDocument, LineDoc},
};
use costing_engine::{
    AddOnOption, Catalog, CatalogSource, CostItem, CostingContext, Currency, Discount, ItemType,
    Job, LineItem, LinkedMaterial, MeasurementUnit, SaleCatalogItem, SupplierMaterialItem,
    coerce, seed_cost_items,
};
use uuid::Uuid;

use crate::error::Result;

/// A job ready to be priced, with the currency its document asked for.
pub struct LoadedJob {
    pub job: Job,
    pub currency: Option<Currency>,
}

fn number(value: &Option<Loose>) -> Option<f64> {
    match value.as_ref()? {
        Loose::Number(n) => Some(*n),
        Loose::Text(raw) => coerce::parse_number(raw),
    }
}

fn vat_rate(value: &Option<Loose>) -> Option<costing_engine::VatRate> {
    number(value).map(|rate| coerce::vat_rate(Some(rate)))
}

fn item_type(raw: Option<&str>) -> ItemType {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("measured") => ItemType::Measured,
        _ => ItemType::Fixed,
    }
}

fn unit(raw: Option<String>) -> MeasurementUnit {
    raw.map(MeasurementUnit::from).unwrap_or_default()
}

fn sale_item(doc: SaleItemDoc) -> SaleCatalogItem {
    SaleCatalogItem {
        id: doc.id,
        name: doc.name,
        item_type: item_type(doc.item_type.as_deref()),
        price: coerce::amount(number(&doc.price)),
        unit: unit(doc.unit),
        add_ons: doc
            .add_ons
            .into_iter()
            .map(|add_on| AddOnOption {
                id: add_on.id.unwrap_or_else(Uuid::new_v4),
                name: add_on.name,
                price: coerce::amount(number(&add_on.price)),
            })
            .collect(),
        parent_id: doc.parent_id,
        linked_materials: doc
            .linked_materials
            .into_iter()
            .map(|link| LinkedMaterial {
                material_id: link.material_id,
                description: link.description,
                cost_vat_rate: vat_rate(&link.cost_vat_rate),
            })
            .collect(),
    }
}

fn material(doc: MaterialDoc) -> SupplierMaterialItem {
    let item_type = item_type(doc.item_type.as_deref());
    let sheet_length = number(&doc.sheet_length);
    let sheet_width = number(&doc.sheet_width);
    let is_sheet = item_type == ItemType::Measured
        && coerce::dimension(sheet_length).is_some()
        && coerce::dimension(sheet_width).is_some();

    SupplierMaterialItem {
        id: doc.id,
        name: doc.name,
        item_type,
        price: coerce::amount(number(&doc.price)),
        sheet_length,
        sheet_width,
        unit: unit(doc.unit),
        price_per_area_m2: number(&doc.price_per_area_m2),
        include_wastage: doc.include_wastage.unwrap_or(is_sheet),
    }
}

pub fn catalog_from_document(doc: CatalogDocument) -> Catalog {
    Catalog::with_items(
        doc.items.into_iter().map(sale_item),
        doc.materials.into_iter().map(material),
    )
}

fn cost_item(doc: CostItemDoc, catalog: &Catalog) -> CostItem {
    let item = match doc.material_id {
        Some(material_id) => {
            let name = catalog
                .material(material_id)
                .map(|m| m.name.clone())
                .unwrap_or_default();
            CostItem::linked(material_id).description(name)
        }
        None => CostItem::manual(String::new(), coerce::amount(number(&doc.manual_cost))),
    };
    CostItem {
        id: doc.id.unwrap_or(item.id),
        description: doc.description.unwrap_or(item.description),
        cost_vat_rate: vat_rate(&doc.cost_vat_rate),
        kind: item.kind,
    }
}

fn line_item(doc: LineDoc, catalog: &Catalog, ctx: &CostingContext) -> Result<LineItem> {
    let item = doc.catalog_item_id.and_then(|id| catalog.sale_item(id));
    let mut line = match item {
        Some(item) => LineItem::for_catalog_item(item).vat_rate(ctx.default_vat_rate),
        None => LineItem::manual(String::new(), 0.0),
    };

    if let Some(id) = doc.id {
        line.id = id;
    }
    // A reference to a deleted item is kept; the line is then priced by hand.
    line.catalog_item_id = doc.catalog_item_id;
    if let Some(description) = doc.description {
        line.description = description;
    }
    line.quantity = coerce::quantity(number(&doc.quantity));
    line.manual_unit_price = number(&doc.manual_unit_price);
    line.length = number(&doc.length);
    line.width = number(&doc.width);
    if let Some(code) = doc.unit {
        line.unit = MeasurementUnit::from(code);
    }
    if let Some(discount) = doc.discount {
        line.discount = Discount::from_parts(&discount.kind, number(&discount.value))?;
    }
    if let Some(rate) = vat_rate(&doc.vat_rate) {
        line.vat_rate = rate;
    }
    line.selected_add_ons = doc.selected_add_ons;
    line.cost_items = match doc.cost_items {
        Some(items) => items
            .into_iter()
            .map(|cost| cost_item(cost, catalog))
            .collect(),
        None => item
            .map(|item| seed_cost_items(item, catalog))
            .unwrap_or_default(),
    };
    Ok(line)
}

/// Builds and computes a job. Document fields override `ctx`.
pub fn job_from_document(
    doc: JobDocument,
    catalog: &Catalog,
    mut ctx: CostingContext,
) -> Result<LoadedJob> {
    if let Some(mode) = doc.tax_mode.as_deref() {
        ctx.tax_mode = mode.parse()?;
    }
    if let Some(rate) = vat_rate(&doc.default_vat_rate) {
        ctx.default_vat_rate = rate;
    }
    let currency = doc
        .currency
        .as_deref()
        .map(Currency::try_from)
        .transpose()?;

    let mut job = Job::with_id(doc.id.unwrap_or_else(Uuid::new_v4), ctx);
    for line in doc.lines {
        let line = line_item(line, catalog, &ctx)?;
        job.add_line(line, catalog)?;
    }
    tracing::info!(job_id = %job.id(), lines = job.lines().len(), "job loaded");

    Ok(LoadedJob { job, currency })
}
