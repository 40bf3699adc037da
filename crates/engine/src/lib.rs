//! Job costing engine.
//!
//! Given a job's line items and the read-only sale and material catalogs, the
//! engine computes for each line its base price, discount, ex-VAT sale, VAT
//! and gross amounts, and the material cost of every attached cost item
//! (including offcut wastage from stock sheets). Job totals and gross profit
//! are aggregated from the line results.
//!
//! The engine is synchronous and performs no I/O. Every input it depends on,
//! including the job's tax mode and default VAT rate, is passed in through a
//! [`CostingContext`].
//!
//! ```rust
//! use costing_engine::{
//!     Catalog, CostingContext, Job, LineItem, MeasurementUnit, SaleCatalogItem, TaxMode, VatRate,
//! };
//!
//! let mut catalog = Catalog::new();
//! let worktop = catalog.insert_item(SaleCatalogItem::measured(
//!     "Worktop",
//!     5.0,
//!     MeasurementUnit::SquareMetre,
//! ));
//!
//! let ctx = CostingContext::new(TaxMode::Exclusive, VatRate::new(20.0).unwrap());
//! let mut job = Job::new(ctx);
//! job.add_catalog_line(worktop, &catalog, |line| line.dimensions(2.0, 3.0))
//!     .unwrap();
//!
//! assert_eq!(job.totals().total_sale, 30.0);
//! ```

pub use catalog::{
    AddOnOption, Catalog, CatalogSource, ItemType, LinkedMaterial, SaleCatalogItem,
    SupplierMaterialItem,
};
pub use context::{AddOnCharging, CostingContext, PricingPolicy};
pub use currency::Currency;
pub use discount::{Discount, DiscountOutcome, apply_discount};
pub use error::EngineError;
pub use job::{Job, JobSnapshot, JobTotals};
pub use line::{LineItem, LineResult, recompute_line};
pub use materials::{
    CostItem, CostKind, CostResult, CutRequirement, allocate_cost, allocate_costs,
    seed_cost_items, sheets_required,
};
pub use money::{DisplayMoney, MoneyCents};
pub use pricing::{
    PriceBreakdown, PricingFormula, available_add_ons, base_price, measured_area_m2,
    normalize_selection, selected_add_on_total,
};
pub use tax::{TaxBreakdown, TaxMode, VatRate, decompose};
pub use units::{MeasurementUnit, is_area_unit, to_base_units};

mod catalog;
pub mod coerce;
mod context;
mod currency;
mod discount;
mod error;
mod job;
mod line;
mod materials;
mod money;
mod pricing;
mod tax;
pub mod units;

type ResultEngine<T> = Result<T, EngineError>;
