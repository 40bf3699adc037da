//! Settings: `config/jobcost.toml`, then `JOBCOST_*` environment variables,
//! then command line flags.

use clap::Args;
use costing_engine::{AddOnCharging, CostingContext, Currency, TaxMode, VatRate};
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/jobcost.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level for the `jobcost` and `costing_engine` targets.
    pub level: String,
    pub currency: String,
    /// Used by jobs that do not set their own default rate.
    pub default_vat_rate: f64,
    pub tax_mode: String,
    pub add_on_charging: AddOnCharging,
    pub clamp_negative_price: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            currency: Currency::default().code().to_string(),
            default_vat_rate: 20.0,
            tax_mode: TaxMode::default().as_str().to_string(),
            add_on_charging: AddOnCharging::default(),
            clamp_negative_price: true,
        }
    }
}

#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Override the log level (e.g. debug).
    #[arg(long, global = true)]
    pub level: Option<String>,
    /// Override the tax mode: exclusive, inclusive or none.
    #[arg(long, global = true)]
    pub tax_mode: Option<String>,
    /// Override the default VAT rate, in percent.
    #[arg(long = "vat", global = true)]
    pub default_vat_rate: Option<f64>,
    /// Override the display currency (GBP, EUR, USD).
    #[arg(long, global = true)]
    pub currency: Option<String>,
}

impl Settings {
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let config_path = overrides.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let mut builder = config::Config::builder();
        builder = builder.add_source(config::File::with_name(config_path).required(false));
        builder = builder.add_source(config::Environment::with_prefix("JOBCOST"));
        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.apply(overrides);
        Ok(settings)
    }

    fn apply(&mut self, overrides: &Overrides) {
        if let Some(level) = &overrides.level {
            self.level = level.clone();
        }
        if let Some(tax_mode) = &overrides.tax_mode {
            self.tax_mode = tax_mode.clone();
        }
        if let Some(rate) = overrides.default_vat_rate {
            self.default_vat_rate = rate;
        }
        if let Some(currency) = &overrides.currency {
            self.currency = currency.clone();
        }
    }

    pub fn currency(&self) -> Result<Currency> {
        Ok(Currency::try_from(self.currency.as_str())?)
    }

    /// Validates the settings into the context jobs start from.
    pub fn context(&self) -> Result<CostingContext> {
        let tax_mode: TaxMode = self.tax_mode.parse()?;
        let default_vat_rate = VatRate::new(self.default_vat_rate)?;
        Ok(CostingContext::new(tax_mode, default_vat_rate)
            .add_on_charging(self.add_on_charging)
            .clamp_negative_price(self.clamp_negative_price))
    }
}
