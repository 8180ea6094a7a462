//! Summary recalculation engine.
//!
//! Given current base costs, markups and the two percentages, every
//! dependent field of a summary sheet is derived in one pass over the seven
//! cost categories. The engine is pure arithmetic over already-validated
//! numbers: it never fails, and running it twice with unchanged inputs
//! yields identical outputs.

use serde::{Deserialize, Serialize};

use crate::error::EstimateError;
use crate::estimate::round2;

/// The seven cost categories of a project summary, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryCategory {
    Awg,
    Conduit,
    Misc,
    Equipment,
    Labor,
    LowVoltage,
    Permits,
}

impl SummaryCategory {
    pub const ALL: [SummaryCategory; 7] = [
        SummaryCategory::Awg,
        SummaryCategory::Conduit,
        SummaryCategory::Misc,
        SummaryCategory::Equipment,
        SummaryCategory::Labor,
        SummaryCategory::LowVoltage,
        SummaryCategory::Permits,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SummaryCategory::Awg => "awg",
            SummaryCategory::Conduit => "conduit",
            SummaryCategory::Misc => "misc",
            SummaryCategory::Equipment => "equipment",
            SummaryCategory::Labor => "labor",
            SummaryCategory::LowVoltage => "low_voltage",
            SummaryCategory::Permits => "permits",
        }
    }
}

impl TryFrom<i64> for SummaryCategory {
    type Error = EstimateError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        SummaryCategory::ALL
            .get(usize::try_from(value).unwrap_or(usize::MAX))
            .copied()
            .ok_or_else(|| {
                EstimateError::validation("category", format!("invalid category code {value}"))
            })
    }
}

impl From<SummaryCategory> for i64 {
    fn from(category: SummaryCategory) -> Self {
        category.index() as i64
    }
}

/// One category block of the summary: raw cost, markup multiplier and the
/// two derived figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryLine {
    pub base_cost: f64,
    pub markup: f64,
    pub subtotal: f64,
    pub profit: f64,
}

impl Default for CategoryLine {
    fn default() -> Self {
        CategoryLine {
            base_cost: 0.0,
            markup: 1.0,
            subtotal: 0.0,
            profit: 0.0,
        }
    }
}

/// Approval state of a submitted summary.
///
/// An explicit three-variant state rather than a nullable boolean; a sheet
/// that has never been acted on is `Pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl Approval {
    pub const fn as_str(self) -> &'static str {
        match self {
            Approval::Pending => "pending",
            Approval::Approved => "approved",
            Approval::Rejected => "rejected",
        }
    }
}

impl TryFrom<i64> for Approval {
    type Error = EstimateError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Approval::Pending),
            1 => Ok(Approval::Approved),
            2 => Ok(Approval::Rejected),
            other => Err(EstimateError::validation(
                "approval",
                format!("invalid approval code {other}"),
            )),
        }
    }
}

impl From<Approval> for i64 {
    fn from(approval: Approval) -> Self {
        match approval {
            Approval::Pending => 0,
            Approval::Approved => 1,
            Approval::Rejected => 2,
        }
    }
}

/// The full derivable state of a project summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySheet {
    pub lines: [CategoryLine; 7],
    pub tax_percentage: f64,
    pub tax_subtotal: f64,
    pub overhead_percentage: f64,
    pub overhead_subtotal: f64,
    pub grand_subtotal: f64,
    pub grand_total: f64,
    pub chargers_count: i64,
    pub price_per_charger: f64,
}

impl Default for SummarySheet {
    fn default() -> Self {
        SummarySheet {
            lines: [CategoryLine::default(); 7],
            tax_percentage: 0.0,
            tax_subtotal: 0.0,
            overhead_percentage: 0.0,
            overhead_subtotal: 0.0,
            grand_subtotal: 0.0,
            grand_total: 0.0,
            chargers_count: 0,
            price_per_charger: 0.0,
        }
    }
}

impl SummarySheet {
    pub fn line(&self, category: SummaryCategory) -> &CategoryLine {
        &self.lines[category.index()]
    }

    pub fn line_mut(&mut self, category: SummaryCategory) -> &mut CategoryLine {
        &mut self.lines[category.index()]
    }

    /// Derive every dependent field from the base costs, markups and
    /// percentages currently on the sheet.
    ///
    /// Tax applies to the summed profit, overhead to the grand subtotal.
    /// Price per charger excludes the low-voltage subtotal (chargers are
    /// billed through it already) and is zero when no chargers are on the
    /// project.
    pub fn recalculate(&mut self) {
        for line in &mut self.lines {
            line.subtotal = round2(line.base_cost * line.markup);
            line.profit = round2(line.subtotal - line.base_cost);
        }

        let taxable_profit = round2(self.lines.iter().map(|line| line.profit).sum());
        self.tax_subtotal = round2(taxable_profit * self.tax_percentage / 100.0);

        self.grand_subtotal = round2(self.lines.iter().map(|line| line.subtotal).sum());
        self.overhead_subtotal = round2(self.grand_subtotal * self.overhead_percentage / 100.0);
        self.grand_total = round2(self.grand_subtotal + self.tax_subtotal + self.overhead_subtotal);

        self.price_per_charger = if self.chargers_count > 0 {
            let low_voltage = self.line(SummaryCategory::LowVoltage).subtotal;
            round2((self.grand_total - low_voltage) / self.chargers_count as f64)
        } else {
            0.0
        };
    }
}
