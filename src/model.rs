//! Input and output data of a proposal build.
//!
//! The input types deserialize from the JSON payload handed over by the request
//! layer. Field names are English, the Portuguese payload keys are accepted as
//! aliases so existing clients keep working.

use std::fmt;
use std::path::PathBuf;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Month slot of a production sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Month {
    /// Calendar month, 1 to 12.
    Calendar(u8),
    /// The yearly average entry.
    Average,
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Month::Calendar(month) => serializer.serialize_u8(*month),
            Month::Average => serializer.serialize_str("average"),
        }
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MonthVisitor;

        impl<'de> Visitor<'de> for MonthVisitor {
            type Value = Month;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a month number or an average marker")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Month, E> {
                u8::try_from(value)
                    .map(Month::Calendar)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Month, E> {
                u8::try_from(value)
                    .map(Month::Calendar)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
            }

            fn visit_str<E: de::Error>(self, _value: &str) -> Result<Month, E> {
                Ok(Month::Average)
            }
        }

        deserializer.deserialize_any(MonthVisitor)
    }
}

/// Estimated generation for one month (or the average).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionSample {
    #[serde(alias = "mes")]
    pub month: Month,
    #[serde(alias = "geracao_total")]
    pub total_generation_kwh: f64,
}

/// One year of the 25-year payback schedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaybackYear {
    #[serde(alias = "ano")]
    pub year: u32,
    #[serde(alias = "saldo")]
    pub balance: f64,
    #[serde(alias = "economia_mensal")]
    pub avg_monthly_savings: f64,
    #[serde(alias = "economia_anual")]
    pub annual_savings: f64,
}

/// Everything a proposal is built from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposalInput {
    #[serde(alias = "nome")]
    pub client_name: String,
    #[serde(alias = "modulos_quantidade")]
    pub modules_quantity: u32,
    #[serde(alias = "especificacoes_modulo")]
    pub module_spec: String,
    #[serde(alias = "inversores_quantidade")]
    pub inverter_quantity: u32,
    #[serde(alias = "especificacoes_inversores")]
    pub inverter_spec: String,
    #[serde(alias = "investimento_kit_fotovoltaico")]
    pub kit_investment: f64,
    #[serde(alias = "investimento_mao_de_obra")]
    pub labor_investment: f64,
    #[serde(alias = "producao_mensal")]
    pub monthly_production: Vec<ProductionSample>,
    #[serde(alias = "retorno_investimento")]
    pub payback_schedule: Vec<PaybackYear>,
}

/// Contract violations found by [`ProposalInput::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be at least 1")]
    QuantityTooLow { field: &'static str },
    #[error("{field} must be a finite value >= 0, got {value}")]
    NegativeAmount { field: &'static str, value: f64 },
    #[error("production sample {index} has invalid month {month}")]
    InvalidMonth { index: usize, month: u8 },
    #[error("payback entry {index} has year {year}, expected 1..=25")]
    YearOutOfRange { index: usize, year: u32 },
    #[error("payback years must be strictly ascending (entry {index})")]
    YearsNotAscending { index: usize },
    #[error("payback entry {index} has a non-finite balance")]
    NonFiniteBalance { index: usize },
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NegativeAmount { field, value })
    }
}

impl ProposalInput {
    /// Checks the input contract the build pipeline relies on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.modules_quantity < 1 {
            return Err(ValidationError::QuantityTooLow {
                field: "modules_quantity",
            });
        }
        if self.inverter_quantity < 1 {
            return Err(ValidationError::QuantityTooLow {
                field: "inverter_quantity",
            });
        }
        non_negative("kit_investment", self.kit_investment)?;
        non_negative("labor_investment", self.labor_investment)?;

        for (index, sample) in self.monthly_production.iter().enumerate() {
            if let Month::Calendar(month) = sample.month {
                if !(1..=12).contains(&month) {
                    return Err(ValidationError::InvalidMonth { index, month });
                }
            }
            non_negative("total_generation_kwh", sample.total_generation_kwh)?;
        }

        let mut previous_year = 0;
        for (index, entry) in self.payback_schedule.iter().enumerate() {
            if !(1..=25).contains(&entry.year) {
                return Err(ValidationError::YearOutOfRange {
                    index,
                    year: entry.year,
                });
            }
            if entry.year <= previous_year {
                return Err(ValidationError::YearsNotAscending { index });
            }
            previous_year = entry.year;
            if !entry.balance.is_finite() {
                return Err(ValidationError::NonFiniteBalance { index });
            }
            non_negative("avg_monthly_savings", entry.avg_monthly_savings)?;
            non_negative("annual_savings", entry.annual_savings)?;
        }

        Ok(())
    }
}

/// Figures derived from the input before anything is rendered.
///
/// Serialized under the keys the download API has always reported.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DerivedMetrics {
    #[serde(rename = "investimento_total")]
    pub total_investment: f64,
    #[serde(rename = "ano_payback")]
    pub payback_year: Option<u32>,
    #[serde(rename = "valor_payback")]
    pub payback_value: Option<f64>,
    #[serde(rename = "economia_25_anos")]
    pub cumulative_savings_25y: f64,
}

/// A raster written to the scratch directory for a single build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub path: PathBuf,
    pub pixel_width: u32,
    pub pixel_height: u32,
}
