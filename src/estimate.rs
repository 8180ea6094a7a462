//! Line-item arithmetic shared by the three estimation steps.
//!
//! Every monetary value is rounded to 2 decimal places at each derivation
//! step, not just at display time, so repeated recalculation is stable.

/// Round a monetary amount to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A line item whose subtotal is derived as `unit_cost × unit_count`.
///
/// For wire/conduit the count is the run length, for misc/equipment the
/// quantity, and for labor the `workers × hours × days` factor applied to
/// the hourly rate.
pub trait CostedLine {
    fn unit_cost(&self) -> f64;
    fn unit_count(&self) -> f64;
    fn set_subtotal(&mut self, subtotal: f64);
}

/// Recompute `subtotal = round(cost × count, 2)` for every line, mutating
/// each line in place, and return the category total rounded to 2 decimals.
///
/// Client-declared subtotals are deliberately overwritten: after an edit an
/// entry is not trusted to carry a consistent pre-computed subtotal.
pub fn recompute_subtotals<T: CostedLine>(lines: &mut [T]) -> f64 {
    let mut total = 0.0;
    for line in lines.iter_mut() {
        let subtotal = round2(line.unit_cost() * line.unit_count());
        line.set_subtotal(subtotal);
        total += subtotal;
    }
    round2(total)
}

/// Derived amounts for one estimation snapshot: entry totals plus tax.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotTotals {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub grand_total: f64,
}

/// Apply `tax_percentage` on top of a snapshot subtotal.
pub fn snapshot_totals(subtotal: f64, tax_percentage: f64) -> SnapshotTotals {
    let subtotal = round2(subtotal);
    let tax_amount = round2(subtotal * tax_percentage / 100.0);
    SnapshotTotals {
        subtotal,
        tax_amount,
        grand_total: round2(subtotal + tax_amount),
    }
}
