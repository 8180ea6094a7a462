//! Submission and edit payloads: the deserialized JSON bodies of the
//! estimation endpoints, plus their field-level validation.
//!
//! The submission types mirror the wire format of the front end (camelCase
//! keys, declared totals included). Declared subtotals and totals are
//! accepted for shape compatibility but always re-derived server-side
//! before anything is persisted.

use serde::{Deserialize, Serialize};

use crate::error::{EstimateError, Result};
use crate::estimate::CostedLine;
use crate::summary::{Approval, SummaryCategory};

/// Payloads that must be checked before any business logic runs.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(EstimateError::validation(
            field,
            format!("must be a non-negative number, got {value}"),
        ));
    }
    Ok(())
}

pub fn validate_percentage(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(EstimateError::validation(
            field,
            format!("must be between 0 and 100, got {value}"),
        ));
    }
    Ok(())
}

/// Markups are multipliers on a base cost; anything below 1.0 would bill
/// under cost.
pub fn validate_markup(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 1.0 {
        return Err(EstimateError::validation(
            field,
            format!("markup must be at least 1.0, got {value}"),
        ));
    }
    Ok(())
}

/// One wire or conduit line item as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireItem {
    pub name: String,
    pub cost: f64,
    pub length: f64,
    pub subtotal: f64,
}

impl CostedLine for WireItem {
    fn unit_cost(&self) -> f64 {
        self.cost
    }

    fn unit_count(&self) -> f64 {
        self.length
    }

    fn set_subtotal(&mut self, subtotal: f64) {
        self.subtotal = subtotal;
    }
}

/// Wire & conduit estimation step submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireConduitSubmission {
    pub awg_data: Vec<WireItem>,
    pub conduit_data: Vec<WireItem>,
    pub tax: f64,
    pub tax_amount: f64,
    pub awg_total: f64,
    pub conduit_total: f64,
    pub grand_total: f64,
    // The form posts the two notes fields in snake_case, unlike the rest of
    // the body.
    #[serde(rename = "notes_awg")]
    pub notes_awg: Option<String>,
    #[serde(rename = "notes_conduit")]
    pub notes_conduit: Option<String>,
}

impl Validate for WireConduitSubmission {
    fn validate(&self) -> Result<()> {
        if self.awg_data.is_empty() && self.conduit_data.is_empty() {
            return Err(EstimateError::validation(
                "awgData/conduitData",
                "at least one section (AWG or Conduit) must have entries",
            ));
        }
        validate_percentage("tax", self.tax)?;
        for (field, items) in [("awgData", &self.awg_data), ("conduitData", &self.conduit_data)] {
            for item in items {
                validate_non_negative(&format!("{field}.cost"), item.cost)?;
                validate_non_negative(&format!("{field}.length"), item.length)?;
            }
        }
        Ok(())
    }
}

/// One miscellaneous or equipment line item as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MiscItem {
    pub name: String,
    pub cost: f64,
    pub quantity: f64,
    pub subtotal: f64,
}

impl CostedLine for MiscItem {
    fn unit_cost(&self) -> f64 {
        self.cost
    }

    fn unit_count(&self) -> f64 {
        self.quantity
    }

    fn set_subtotal(&mut self, subtotal: f64) {
        self.subtotal = subtotal;
    }
}

/// Miscellaneous & equipment estimation step submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MiscEquipmentSubmission {
    pub misc_data: Vec<MiscItem>,
    pub equipment_data: Vec<MiscItem>,
    pub tax: f64,
    pub tax_amount: f64,
    pub misc_total: f64,
    pub equipment_total: f64,
    pub grand_total: f64,
    // Posted in snake_case, unlike the rest of the body.
    #[serde(rename = "notes_misc")]
    pub notes_misc: Option<String>,
    #[serde(rename = "notes_equip")]
    pub notes_equip: Option<String>,
}

impl Validate for MiscEquipmentSubmission {
    fn validate(&self) -> Result<()> {
        if self.misc_data.is_empty() && self.equipment_data.is_empty() {
            return Err(EstimateError::validation(
                "miscData/equipmentData",
                "at least one section (Miscellaneous or Equipment) must have entries",
            ));
        }
        validate_percentage("tax", self.tax)?;
        for (field, items) in [
            ("miscData", &self.misc_data),
            ("equipmentData", &self.equipment_data),
        ] {
            for item in items {
                validate_non_negative(&format!("{field}.cost"), item.cost)?;
                validate_non_negative(&format!("{field}.quantity"), item.quantity)?;
            }
        }
        Ok(())
    }
}

/// One labor line item as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LaborItem {
    pub position: String,
    pub rate: f64,
    pub workers: i64,
    pub hours: f64,
    pub days: f64,
    pub subtotal: f64,
    pub notes: Option<String>,
}

impl LaborItem {
    /// Blank rows from the labor grid are dropped rather than stored.
    pub fn is_blank(&self) -> bool {
        self.rate == 0.0 && self.workers == 0 && self.hours == 0.0 && self.days == 0.0
    }
}

impl CostedLine for LaborItem {
    fn unit_cost(&self) -> f64 {
        self.rate
    }

    fn unit_count(&self) -> f64 {
        self.workers as f64 * self.hours * self.days
    }

    fn set_subtotal(&mut self, subtotal: f64) {
        self.subtotal = subtotal;
    }
}

/// Charger information of the labor step; the low-voltage total derives as
/// `chargers_count × charger_price`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LowVoltageInfo {
    pub chargers_count: i64,
    pub charger_price: f64,
}

/// Labor cost estimation step submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaborSubmission {
    pub labor_data: Vec<LaborItem>,
    pub low_voltage_data: LowVoltageInfo,
    pub labor_total: f64,
    pub low_voltage_total: f64,
    pub grand_total: f64,
}

impl Validate for LaborSubmission {
    fn validate(&self) -> Result<()> {
        if self.labor_data.is_empty() {
            return Err(EstimateError::validation(
                "laborData",
                "at least one labor entry is required",
            ));
        }
        for item in &self.labor_data {
            validate_non_negative("laborData.rate", item.rate)?;
            validate_non_negative("laborData.hours", item.hours)?;
            validate_non_negative("laborData.days", item.days)?;
            if item.workers < 0 {
                return Err(EstimateError::validation(
                    "laborData.workers",
                    format!("must be non-negative, got {}", item.workers),
                ));
            }
        }
        if self.low_voltage_data.chargers_count < 0 {
            return Err(EstimateError::validation(
                "lowVoltageData.chargersCount",
                format!("must be non-negative, got {}", self.low_voltage_data.chargers_count),
            ));
        }
        validate_non_negative("lowVoltageData.chargerPrice", self.low_voltage_data.charger_price)
    }
}

/// One edited line on the review page (wire/conduit and misc/equipment
/// share the shape; `quantity` is the run length for wire entries).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineEdit {
    pub id: i64,
    pub cost: f64,
    pub quantity: f64,
}

/// Review-page edit of the current wire/conduit or misc/equipment snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryEdits {
    pub entries: Vec<LineEdit>,
    pub tax_percentage: f64,
}

impl Validate for EntryEdits {
    fn validate(&self) -> Result<()> {
        validate_percentage("tax_percentage", self.tax_percentage)?;
        for edit in &self.entries {
            validate_non_negative("entries.cost", edit.cost)?;
            validate_non_negative("entries.quantity", edit.quantity)?;
        }
        Ok(())
    }
}

/// One edited labor line on the review page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LaborLineEdit {
    pub id: i64,
    pub rate: f64,
    pub workers: i64,
    pub hours: f64,
    pub days: f64,
}

/// Review-page edit of the current labor snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LaborEdits {
    pub entries: Vec<LaborLineEdit>,
    pub chargers_count: i64,
    pub charger_price: f64,
}

impl Validate for LaborEdits {
    fn validate(&self) -> Result<()> {
        for edit in &self.entries {
            validate_non_negative("entries.rate", edit.rate)?;
            validate_non_negative("entries.hours", edit.hours)?;
            validate_non_negative("entries.days", edit.days)?;
            if edit.workers < 0 {
                return Err(EstimateError::validation(
                    "entries.workers",
                    format!("must be non-negative, got {}", edit.workers),
                ));
            }
        }
        if self.chargers_count < 0 {
            return Err(EstimateError::validation(
                "chargers_count",
                format!("must be non-negative, got {}", self.chargers_count),
            ));
        }
        validate_non_negative("charger_price", self.charger_price)
    }
}

/// Markups, percentages and bookkeeping fields applied to a summary sheet
/// before recalculation. Field names match the review form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryInput {
    pub awg_markup: f64,
    pub conduit_markup: f64,
    pub misc_markup: f64,
    pub equipment_markup: f64,
    pub labor_markup: f64,
    pub low_voltage_markup: f64,
    pub permits_markup: f64,
    pub permits_base_cost: f64,
    pub tax_percentage: f64,
    pub overhead_percentage: f64,
    pub approval: Approval,
    pub price_per_charger_submitted: f64,
    pub total_submitted: f64,
    pub approved_amount: f64,
    pub notes: Option<String>,
}

impl Default for SummaryInput {
    fn default() -> Self {
        SummaryInput {
            awg_markup: 1.0,
            conduit_markup: 1.0,
            misc_markup: 1.0,
            equipment_markup: 1.0,
            labor_markup: 1.0,
            low_voltage_markup: 1.0,
            permits_markup: 1.0,
            permits_base_cost: 0.0,
            tax_percentage: 0.0,
            overhead_percentage: 0.0,
            approval: Approval::Pending,
            price_per_charger_submitted: 0.0,
            total_submitted: 0.0,
            approved_amount: 0.0,
            notes: None,
        }
    }
}

impl SummaryInput {
    pub fn markup(&self, category: SummaryCategory) -> f64 {
        match category {
            SummaryCategory::Awg => self.awg_markup,
            SummaryCategory::Conduit => self.conduit_markup,
            SummaryCategory::Misc => self.misc_markup,
            SummaryCategory::Equipment => self.equipment_markup,
            SummaryCategory::Labor => self.labor_markup,
            SummaryCategory::LowVoltage => self.low_voltage_markup,
            SummaryCategory::Permits => self.permits_markup,
        }
    }

    fn markup_field(category: SummaryCategory) -> &'static str {
        match category {
            SummaryCategory::Awg => "awg_markup",
            SummaryCategory::Conduit => "conduit_markup",
            SummaryCategory::Misc => "misc_markup",
            SummaryCategory::Equipment => "equipment_markup",
            SummaryCategory::Labor => "labor_markup",
            SummaryCategory::LowVoltage => "low_voltage_markup",
            SummaryCategory::Permits => "permits_markup",
        }
    }
}

impl Validate for SummaryInput {
    fn validate(&self) -> Result<()> {
        for category in SummaryCategory::ALL {
            validate_markup(Self::markup_field(category), self.markup(category))?;
        }
        validate_percentage("tax_percentage", self.tax_percentage)?;
        validate_percentage("overhead_percentage", self.overhead_percentage)?;
        validate_non_negative("permits_base_cost", self.permits_base_cost)?;
        validate_non_negative("price_per_charger_submitted", self.price_per_charger_submitted)?;
        validate_non_negative("total_submitted", self.total_submitted)?;
        validate_non_negative("approved_amount", self.approved_amount)
    }
}
