//! A job being quoted: its lines, their committed results, and the totals
//! derived from them.
//!
//! Totals are never stored on the job. They are aggregated from the committed
//! line results whenever asked for, and only frozen into a [`JobSnapshot`]
//! when the job is saved.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CatalogSource, CostItem, CostingContext, Currency, EngineError, LineItem, LineResult,
    MoneyCents, ResultEngine, TaxMode, VatRate, line::recompute_line, pricing::normalize_selection,
    seed_cost_items,
};

/// Job-level figures.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobTotals {
    /// Sum of ex-VAT sale amounts.
    pub total_sale: f64,
    pub total_vat: f64,
    pub total_gross: f64,
    /// Sum of total material cost over every cost item.
    pub total_cost: f64,
    pub total_cost_vat: f64,
    pub gross_profit: f64,
    /// Gross profit as a percentage of total sale; `None` when nothing is sold.
    pub margin_percent: Option<f64>,
}

impl JobTotals {
    pub fn aggregate<'a>(results: impl IntoIterator<Item = &'a LineResult>) -> Self {
        let mut totals = Self::default();
        for result in results {
            totals.total_sale += result.sale_ex_vat;
            totals.total_vat += result.vat_amount;
            totals.total_gross += result.gross_total;
            totals.total_cost += result.total_material_cost();
            totals.total_cost_vat += result.total_cost_vat();
        }
        totals.gross_profit = totals.total_sale - totals.total_cost;
        totals.margin_percent =
            (totals.total_sale != 0.0).then(|| totals.gross_profit / totals.total_sale * 100.0);
        totals
    }
}

/// Totals recorded when a job is saved.
///
/// The snapshot does not follow later catalog price changes; compare it with
/// fresh totals using [`JobSnapshot::is_stale`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub tax_mode: TaxMode,
    pub currency: Currency,
    pub total_sale: MoneyCents,
    pub total_vat: MoneyCents,
    pub total_gross: MoneyCents,
    pub total_cost: MoneyCents,
    pub gross_profit: MoneyCents,
    pub saved_at: DateTime<Utc>,
}

impl JobSnapshot {
    #[must_use]
    pub fn new(
        job_id: Uuid,
        tax_mode: TaxMode,
        totals: &JobTotals,
        currency: Currency,
        saved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id,
            tax_mode,
            currency,
            total_sale: MoneyCents::from_major(totals.total_sale),
            total_vat: MoneyCents::from_major(totals.total_vat),
            total_gross: MoneyCents::from_major(totals.total_gross),
            total_cost: MoneyCents::from_major(totals.total_cost),
            gross_profit: MoneyCents::from_major(totals.gross_profit),
            saved_at,
        }
    }

    /// `true` when `current` no longer rounds to the recorded figures.
    #[must_use]
    pub fn is_stale(&self, current: &JobTotals) -> bool {
        self.total_sale != MoneyCents::from_major(current.total_sale)
            || self.total_vat != MoneyCents::from_major(current.total_vat)
            || self.total_gross != MoneyCents::from_major(current.total_gross)
            || self.total_cost != MoneyCents::from_major(current.total_cost)
    }
}

/// A job and the results of its lines.
///
/// Every mutating call recomputes what it touched before returning, so the
/// committed results always reflect the latest inputs. Calls that recompute
/// report whether a committed result actually changed.
#[derive(Clone, Debug)]
pub struct Job {
    id: Uuid,
    ctx: CostingContext,
    lines: Vec<LineItem>,
    results: HashMap<Uuid, LineResult>,
}

impl Job {
    #[must_use]
    pub fn new(ctx: CostingContext) -> Self {
        Self::with_id(Uuid::new_v4(), ctx)
    }

    #[must_use]
    pub fn with_id(id: Uuid, ctx: CostingContext) -> Self {
        Self {
            id,
            ctx,
            lines: Vec::new(),
            results: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn context(&self) -> &CostingContext {
        &self.ctx
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn line(&self, line_id: Uuid) -> ResultEngine<&LineItem> {
        self.lines
            .iter()
            .find(|line| line.id == line_id)
            .ok_or_else(|| EngineError::KeyNotFound(line_id.to_string()))
    }

    /// Committed result of a line.
    pub fn result(&self, line_id: Uuid) -> Option<&LineResult> {
        self.results.get(&line_id)
    }

    /// Committed results in line order.
    pub fn results(&self) -> impl Iterator<Item = &LineResult> {
        self.lines
            .iter()
            .filter_map(|line| self.results.get(&line.id))
    }

    fn position(&self, line_id: Uuid) -> ResultEngine<usize> {
        self.lines
            .iter()
            .position(|line| line.id == line_id)
            .ok_or_else(|| EngineError::KeyNotFound(line_id.to_string()))
    }

    /// Stores `result` unless an identical one is already committed.
    fn commit(&mut self, result: LineResult) -> bool {
        match self.results.get(&result.line_id) {
            Some(existing) if *existing == result => false,
            _ => {
                self.results.insert(result.line_id, result);
                true
            }
        }
    }

    /// Recomputes the line at `index`, first pruning its add-on selection to
    /// the options its catalog item still offers.
    fn recompute_at<C: CatalogSource + ?Sized>(&mut self, index: usize, catalog: &C) -> bool {
        let line = &mut self.lines[index];
        line.selected_add_ons = match line.catalog_item_id.and_then(|id| catalog.sale_item(id)) {
            Some(item) => normalize_selection(&line.selected_add_ons, item, catalog),
            None => Vec::new(),
        };
        let result = recompute_line(&self.lines[index], catalog, &self.ctx);
        self.commit(result)
    }

    /// Appends a line and computes it.
    pub fn add_line<C: CatalogSource + ?Sized>(
        &mut self,
        line: LineItem,
        catalog: &C,
    ) -> ResultEngine<Uuid> {
        if self.lines.iter().any(|l| l.id == line.id) {
            return Err(EngineError::ExistingKey(line.id.to_string()));
        }

        let id = line.id;
        self.lines.push(line);
        let index = self.lines.len() - 1;
        self.recompute_at(index, catalog);
        tracing::debug!(job_id = %self.id, line_id = %id, "line added");
        Ok(id)
    }

    /// Appends a line for a catalog item with its linked materials seeded as
    /// cost items.
    pub fn add_catalog_line<C: CatalogSource + ?Sized>(
        &mut self,
        item_id: Uuid,
        catalog: &C,
        edit: impl FnOnce(LineItem) -> LineItem,
    ) -> ResultEngine<Uuid> {
        let item = catalog
            .sale_item(item_id)
            .ok_or_else(|| EngineError::KeyNotFound(item_id.to_string()))?;
        let mut line = LineItem::for_catalog_item(item).vat_rate(self.ctx.default_vat_rate);
        line.cost_items = seed_cost_items(item, catalog);
        self.add_line(edit(line), catalog)
    }

    /// Applies `edit` to a line and recomputes it.
    pub fn update_line<C, F>(&mut self, line_id: Uuid, catalog: &C, edit: F) -> ResultEngine<bool>
    where
        C: CatalogSource + ?Sized,
        F: FnOnce(&mut LineItem),
    {
        let index = self.position(line_id)?;
        let line = &mut self.lines[index];
        edit(line);
        // The id is the key of the committed result.
        line.id = line_id;
        Ok(self.recompute_at(index, catalog))
    }

    pub fn remove_line(&mut self, line_id: Uuid) -> ResultEngine<LineItem> {
        let index = self.position(line_id)?;
        self.results.remove(&line_id);
        tracing::debug!(job_id = %self.id, line_id = %line_id, "line removed");
        Ok(self.lines.remove(index))
    }

    /// Adds a cost item to a line, returning the cost item id.
    pub fn add_cost_item<C: CatalogSource + ?Sized>(
        &mut self,
        line_id: Uuid,
        item: CostItem,
        catalog: &C,
    ) -> ResultEngine<Uuid> {
        let index = self.position(line_id)?;
        let line = &mut self.lines[index];
        if line.cost_items.iter().any(|c| c.id == item.id) {
            return Err(EngineError::ExistingKey(item.id.to_string()));
        }
        let id = item.id;
        line.cost_items.push(item);
        self.recompute_at(index, catalog);
        Ok(id)
    }

    pub fn remove_cost_item<C: CatalogSource + ?Sized>(
        &mut self,
        line_id: Uuid,
        cost_item_id: Uuid,
        catalog: &C,
    ) -> ResultEngine<CostItem> {
        let index = self.position(line_id)?;
        let line = &mut self.lines[index];
        let position = line
            .cost_items
            .iter()
            .position(|c| c.id == cost_item_id)
            .ok_or_else(|| EngineError::KeyNotFound(cost_item_id.to_string()))?;
        let removed = line.cost_items.remove(position);
        self.recompute_at(index, catalog);
        Ok(removed)
    }

    pub fn recompute_line<C: CatalogSource + ?Sized>(
        &mut self,
        line_id: Uuid,
        catalog: &C,
    ) -> ResultEngine<bool> {
        let index = self.position(line_id)?;
        Ok(self.recompute_at(index, catalog))
    }

    /// Recomputes every line, e.g. after reference prices changed. Returns how
    /// many committed results changed.
    pub fn recompute_all<C: CatalogSource + ?Sized>(&mut self, catalog: &C) -> usize {
        let changed = (0..self.lines.len())
            .filter(|&index| self.recompute_at(index, catalog))
            .count();
        tracing::debug!(job_id = %self.id, changed, "job recomputed");
        changed
    }

    pub fn set_tax_mode<C: CatalogSource + ?Sized>(&mut self, mode: TaxMode, catalog: &C) -> usize {
        self.ctx.tax_mode = mode;
        self.recompute_all(catalog)
    }

    pub fn set_default_vat_rate<C: CatalogSource + ?Sized>(
        &mut self,
        rate: VatRate,
        catalog: &C,
    ) -> usize {
        self.ctx.default_vat_rate = rate;
        self.recompute_all(catalog)
    }

    pub fn totals(&self) -> JobTotals {
        JobTotals::aggregate(self.results())
    }

    /// Freezes the current totals.
    pub fn save(&self, currency: Currency, saved_at: DateTime<Utc>) -> JobSnapshot {
        let snapshot = JobSnapshot::new(self.id, self.ctx.tax_mode, &self.totals(), currency, saved_at);
        tracing::info!(
            job_id = %self.id,
            total_sale = %snapshot.total_sale,
            total_cost = %snapshot.total_cost,
            "job totals saved"
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{
        AddOnOption, Catalog, Discount, MeasurementUnit, SaleCatalogItem, SupplierMaterialItem,
    };

    fn ctx() -> CostingContext {
        CostingContext::new(TaxMode::Exclusive, VatRate::new(20.0).unwrap())
    }

    fn catalog() -> (Catalog, Uuid, Uuid) {
        let mut catalog = Catalog::new();
        let board = catalog.insert_material(SupplierMaterialItem::sheet(
            "MDF",
            20.0,
            1.0,
            1.0,
            MeasurementUnit::Metre,
        ));
        let panel = catalog.insert_item(
            SaleCatalogItem::measured("Panel", 100.0, MeasurementUnit::SquareMetre)
                .linked_material(crate::LinkedMaterial::new(board)),
        );
        (catalog, board, panel)
    }

    #[test]
    fn totals_sum_lines() {
        let (catalog, _, panel) = catalog();
        let mut job = Job::new(ctx());
        job.add_catalog_line(panel, &catalog, |line| line.dimensions(1.5, 0.5))
            .unwrap();
        job.add_line(
            LineItem::manual("Fitting", 50.0).cost_item(CostItem::manual("Labour", 30.0)),
            &catalog,
        )
        .unwrap();

        let totals = job.totals();
        assert_eq!(totals.total_sale, 125.0);
        assert_eq!(totals.total_cost, 70.0);
        assert_eq!(totals.gross_profit, 55.0);
        assert_eq!(totals.margin_percent, Some(44.0));
        // Catalog line inherits the job rate, the manual line has none.
        assert!((totals.total_vat - 15.0).abs() < 1e-9);
        assert!((totals.total_cost_vat - 8.0).abs() < 1e-9);
    }

    #[test]
    fn empty_job_has_no_margin() {
        let job = Job::new(ctx());
        let totals = job.totals();
        assert_eq!(totals, JobTotals::default());
        assert_eq!(totals.margin_percent, None);
    }

    #[test]
    fn unchanged_recompute_is_not_committed() {
        let (catalog, _, panel) = catalog();
        let mut job = Job::new(ctx());
        let line = job
            .add_catalog_line(panel, &catalog, |line| line.dimensions(1.5, 0.5))
            .unwrap();
        let before = job.result(line).cloned();

        assert!(!job.recompute_line(line, &catalog).unwrap());
        assert_eq!(job.recompute_all(&catalog), 0);
        assert_eq!(job.result(line).cloned(), before);
    }

    #[test]
    fn edits_recompute_line() {
        let (catalog, _, panel) = catalog();
        let mut job = Job::new(ctx());
        let line = job
            .add_catalog_line(panel, &catalog, |line| line.dimensions(1.5, 0.5))
            .unwrap();

        let changed = job
            .update_line(line, &catalog, |line| {
                line.discount = Discount::percentage(10.0);
            })
            .unwrap();
        assert!(changed);
        assert_eq!(job.result(line).unwrap().price_after_discount, 67.5);

        let changed = job.update_line(line, &catalog, |_| {}).unwrap();
        assert!(!changed);
    }

    #[test]
    fn catalog_price_change_flows_into_totals() {
        let (mut catalog, board, panel) = catalog();
        let mut job = Job::new(ctx());
        job.add_catalog_line(panel, &catalog, |line| line.dimensions(1.5, 0.5))
            .unwrap();
        assert_eq!(job.totals().total_cost, 40.0);

        if let Some(material) = catalog.material_mut(board) {
            material.price = 30.0;
        }
        assert_eq!(job.recompute_all(&catalog), 1);
        assert_eq!(job.totals().total_cost, 60.0);
    }

    #[test]
    fn recompute_prunes_withdrawn_add_ons() {
        let mut catalog = Catalog::new();
        let glazing = AddOnOption::new("Glazing bar", 12.0);
        let glazing_id = glazing.id;
        let door = catalog.insert_item(SaleCatalogItem::fixed("Door", 150.0).add_on(glazing));
        let mut job = Job::new(ctx());
        let line = job
            .add_catalog_line(door, &catalog, |line| line.select_add_on(glazing_id))
            .unwrap();
        assert_eq!(job.line(line).unwrap().selected_add_ons, vec![glazing_id]);
        assert_eq!(job.result(line).unwrap().base_price, 162.0);

        if let Some(item) = catalog.item_mut(door) {
            item.add_ons.clear();
        }
        assert_eq!(job.recompute_all(&catalog), 1);
        assert!(job.line(line).unwrap().selected_add_ons.is_empty());
        assert_eq!(job.result(line).unwrap().base_price, 150.0);
    }

    #[test]
    fn dangling_item_clears_selection() {
        let mut catalog = Catalog::new();
        let glazing = AddOnOption::new("Glazing bar", 12.0);
        let glazing_id = glazing.id;
        let door = catalog.insert_item(SaleCatalogItem::fixed("Door", 150.0).add_on(glazing));
        let mut job = Job::new(ctx());
        let line = job
            .add_catalog_line(door, &catalog, |line| line.select_add_on(glazing_id))
            .unwrap();

        catalog.remove_item(door);
        job.recompute_line(line, &catalog).unwrap();
        assert!(job.line(line).unwrap().selected_add_ons.is_empty());
    }

    #[test]
    fn deleted_material_costs_zero() {
        let (mut catalog, board, panel) = catalog();
        let mut job = Job::new(ctx());
        job.add_catalog_line(panel, &catalog, |line| line.dimensions(1.5, 0.5))
            .unwrap();
        catalog.remove_material(board);
        job.recompute_all(&catalog);
        assert_eq!(job.totals().total_cost, 0.0);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let (catalog, _, _) = catalog();
        let mut job = Job::new(ctx());
        let missing = Uuid::new_v4();
        assert_eq!(
            job.remove_line(missing),
            Err(EngineError::KeyNotFound(missing.to_string()))
        );
        assert!(job.update_line(missing, &catalog, |_| {}).is_err());
        assert!(job.add_catalog_line(missing, &catalog, |l| l).is_err());

        let line = job.add_line(LineItem::manual("Fee", 10.0), &catalog).unwrap();
        assert_eq!(
            job.remove_cost_item(line, missing, &catalog),
            Err(EngineError::KeyNotFound(missing.to_string()))
        );
    }

    #[test]
    fn duplicate_line_is_rejected() {
        let catalog = Catalog::new();
        let mut job = Job::new(ctx());
        let line = LineItem::manual("Fee", 10.0);
        job.add_line(line.clone(), &catalog).unwrap();
        assert_eq!(
            job.add_line(line.clone(), &catalog),
            Err(EngineError::ExistingKey(line.id.to_string()))
        );
    }

    #[test]
    fn cost_items_can_be_added_and_removed() {
        let catalog = Catalog::new();
        let mut job = Job::new(ctx());
        let line = job.add_line(LineItem::manual("Fee", 100.0), &catalog).unwrap();
        let cost = job
            .add_cost_item(line, CostItem::manual("Labour", 40.0), &catalog)
            .unwrap();
        assert_eq!(job.totals().total_cost, 40.0);

        job.remove_cost_item(line, cost, &catalog).unwrap();
        assert_eq!(job.totals().total_cost, 0.0);
        assert!(job.result(line).unwrap().costs.is_empty());
    }

    #[test]
    fn removing_a_line_drops_its_result() {
        let catalog = Catalog::new();
        let mut job = Job::new(ctx());
        let line = job.add_line(LineItem::manual("Fee", 100.0), &catalog).unwrap();
        job.remove_line(line).unwrap();
        assert!(job.result(line).is_none());
        assert_eq!(job.totals().total_sale, 0.0);
    }

    #[test]
    fn tax_mode_change_recomputes() {
        let catalog = Catalog::new();
        let mut job = Job::new(ctx());
        job.add_line(
            LineItem::manual("Fee", 120.0).vat_rate(VatRate::new(20.0).unwrap()),
            &catalog,
        )
        .unwrap();
        assert!((job.totals().total_gross - 144.0).abs() < 1e-9);

        assert_eq!(job.set_tax_mode(TaxMode::Inclusive, &catalog), 1);
        assert!((job.totals().total_sale - 100.0).abs() < 1e-9);

        job.set_tax_mode(TaxMode::None, &catalog);
        assert_eq!(job.totals().total_vat, 0.0);
    }

    #[test]
    fn snapshot_records_rounded_totals() {
        let (mut catalog, board, panel) = catalog();
        let mut job = Job::new(ctx());
        job.add_catalog_line(panel, &catalog, |line| line.dimensions(1.5, 0.5))
            .unwrap();
        let saved_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let snapshot = job.save(Currency::Gbp, saved_at);

        assert_eq!(snapshot.job_id, job.id());
        assert_eq!(snapshot.total_sale, MoneyCents::new(7500));
        assert_eq!(snapshot.total_cost, MoneyCents::new(4000));
        assert_eq!(snapshot.gross_profit, MoneyCents::new(3500));
        assert!(!snapshot.is_stale(&job.totals()));

        if let Some(material) = catalog.material_mut(board) {
            material.price = 25.0;
        }
        job.recompute_all(&catalog);
        assert!(snapshot.is_stale(&job.totals()));
    }
}
