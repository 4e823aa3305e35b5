use std::collections::BTreeMap;

use super::types::{FlexibleLoanType, MortgageInputs};

/// Bond products carrying a statutory contribution surcharge.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LoanProduct {
    F3,
    F5,
    F30,
}

impl From<FlexibleLoanType> for LoanProduct {
    fn from(value: FlexibleLoanType) -> Self {
        match value {
            FlexibleLoanType::F3 => LoanProduct::F3,
            FlexibleLoanType::F5 => LoanProduct::F5,
        }
    }
}

/// Statutory bidragssats in percentage points.
pub fn bidragssats(product: LoanProduct, with_repayments: bool) -> f64 {
    match (product, with_repayments) {
        (LoanProduct::F3, true) => 1.05,
        (LoanProduct::F3, false) => 1.38,
        (LoanProduct::F5, true) => 0.85,
        (LoanProduct::F5, false) => 0.77,
        (LoanProduct::F30, true) => 0.68,
        (LoanProduct::F30, false) => 1.57,
    }
}

/// The adjustment is a percentage discount on the surcharge itself, not a
/// subtraction of percentage points.
pub fn discounted_bidragssats(product: LoanProduct, with_repayments: bool, adjustment: f64) -> f64 {
    let base = bidragssats(product, with_repayments);
    base - base * adjustment / 100.0
}

pub fn fixed_bidragssats(inputs: &MortgageInputs) -> f64 {
    discounted_bidragssats(
        LoanProduct::F30,
        inputs.with_repayments,
        inputs.bidragssats_adjustment,
    )
}

pub fn variable_bidragssats(inputs: &MortgageInputs) -> f64 {
    discounted_bidragssats(
        inputs.flexible_loan_type.into(),
        inputs.with_repayments,
        inputs.bidragssats_adjustment,
    )
}

pub fn variable_base_rate(inputs: &MortgageInputs) -> f64 {
    match inputs.flexible_loan_type {
        FlexibleLoanType::F3 => inputs.interest_rate_f3,
        FlexibleLoanType::F5 => inputs.interest_rate_f5,
    }
}

/// Sparse base-rate resets for the variable tranche, keyed by 1-based loan
/// year. Any positive year is accepted; restricting keys to reset years is
/// the caller's business.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableRateOverrides {
    rates: BTreeMap<u32, f64>,
}

impl VariableRateOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, year: u32, rate: f64) -> Option<f64> {
        self.rates.insert(year, rate)
    }

    pub fn remove(&mut self, year: u32) -> Option<f64> {
        self.rates.remove(&year)
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.rates.iter().map(|(&year, &rate)| (year, rate))
    }

    /// Most recent override registered at or before `year`.
    pub fn rate_in_force(&self, year: u32) -> Option<f64> {
        self.rates.range(..=year).next_back().map(|(_, &rate)| rate)
    }
}

impl FromIterator<(u32, f64)> for VariableRateOverrides {
    fn from_iter<T: IntoIterator<Item = (u32, f64)>>(iter: T) -> Self {
        Self {
            rates: iter.into_iter().collect(),
        }
    }
}

pub fn variable_rate_for_year(
    inputs: &MortgageInputs,
    overrides: &VariableRateOverrides,
    year: u32,
) -> f64 {
    overrides
        .rate_in_force(year)
        .unwrap_or_else(|| variable_base_rate(inputs))
}

pub fn effective_variable_rate_for_year(
    inputs: &MortgageInputs,
    overrides: &VariableRateOverrides,
    year: u32,
) -> f64 {
    variable_rate_for_year(inputs, overrides, year) + variable_bidragssats(inputs)
}
