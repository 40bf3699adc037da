use std::fmt;

use costing_engine::{Currency, Job, JobTotals, LineResult, MoneyCents, TaxMode, VatRate};
use serde::Serialize;
use uuid::Uuid;

fn money(amount: f64, currency: Currency) -> impl fmt::Display {
    MoneyCents::from_major(amount).display(currency)
}

/// Plain-text quote: one block per line, then the job totals.
pub struct Quote<'a> {
    job: &'a Job,
    currency: Currency,
}

impl<'a> Quote<'a> {
    pub fn new(job: &'a Job, currency: Currency) -> Self {
        Self { job, currency }
    }
}

impl fmt::Display for Quote<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.currency;
        let ctx = self.job.context();
        writeln!(
            f,
            "Job {} (tax {}, default VAT {})",
            self.job.id(),
            ctx.tax_mode,
            ctx.default_vat_rate
        )?;

        for line in self.job.lines() {
            let Some(result) = self.job.result(line.id) else {
                continue;
            };
            writeln!(f)?;
            write!(
                f,
                "{} x{}  base {}",
                line.description,
                line.effective_quantity(),
                money(result.base_price, c),
            )?;
            let discount = MoneyCents::from_major(result.discount_amount);
            if !discount.is_zero() {
                write!(f, "  discount {}", discount.display(c))?;
            }
            writeln!(
                f,
                "  ex VAT {}  VAT {}  gross {}",
                money(result.sale_ex_vat, c),
                money(result.vat_amount, c),
                money(result.gross_total, c),
            )?;
            if result.add_on_total != 0.0 {
                writeln!(f, "    add-ons {}", money(result.add_on_total, c))?;
            }
            for cost in &line.cost_items {
                let Some(figures) = result.cost(cost.id) else {
                    continue;
                };
                write!(
                    f,
                    "    cost {}: {}",
                    cost.description,
                    money(figures.total_material_cost, c)
                )?;
                if let Some(sheets) = figures.sheets_consumed {
                    write!(
                        f,
                        " ({sheets} sheet(s), wastage {})",
                        money(figures.wastage_cost, c)
                    )?;
                }
                writeln!(f, "  VAT {}", money(figures.cost_vat, c))?;
            }
        }

        let totals = self.job.totals();
        writeln!(f)?;
        writeln!(
            f,
            "Sale {}  VAT {}  Gross {}",
            money(totals.total_sale, c),
            money(totals.total_vat, c),
            money(totals.total_gross, c)
        )?;
        write!(
            f,
            "Cost {}  Profit {}",
            money(totals.total_cost, c),
            money(totals.gross_profit, c)
        )?;
        match totals.margin_percent {
            Some(margin) => writeln!(f, "  Margin {margin:.1}%"),
            None => writeln!(f),
        }
    }
}

/// Quote rendered as JSON.
#[derive(Serialize)]
pub struct QuoteJson<'a> {
    job_id: Uuid,
    tax_mode: TaxMode,
    default_vat_rate: VatRate,
    currency: Currency,
    lines: Vec<&'a LineResult>,
    totals: JobTotals,
}

impl<'a> QuoteJson<'a> {
    pub fn new(job: &'a Job, currency: Currency) -> Self {
        Self {
            job_id: job.id(),
            tax_mode: job.context().tax_mode,
            default_vat_rate: job.context().default_vat_rate,
            currency,
            lines: job.results().collect(),
            totals: job.totals(),
        }
    }
}
