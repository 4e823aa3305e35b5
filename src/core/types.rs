use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LoanPeriod {
    Ten,
    Twenty,
    Thirty,
}

impl LoanPeriod {
    pub fn years(self) -> u32 {
        match self {
            LoanPeriod::Ten => 10,
            LoanPeriod::Twenty => 20,
            LoanPeriod::Thirty => 30,
        }
    }

    pub fn from_years(years: u32) -> Option<Self> {
        match years {
            10 => Some(LoanPeriod::Ten),
            20 => Some(LoanPeriod::Twenty),
            30 => Some(LoanPeriod::Thirty),
            _ => None,
        }
    }
}

/// Variable tranche product. Selects the base rate and the reset cadence.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum FlexibleLoanType {
    F3,
    F5,
}

impl FlexibleLoanType {
    /// Years between contractual rate resets.
    pub fn reset_interval(self) -> u32 {
        match self {
            FlexibleLoanType::F3 => 3,
            FlexibleLoanType::F5 => 5,
        }
    }

    /// Years in which the variable base rate may be renegotiated: the first
    /// reset falls one year after the initial fixation ends.
    pub fn is_editable_year(self, year: u32) -> bool {
        let interval = self.reset_interval();
        year > interval && (year - 1) % interval == 0
    }

    pub fn editable_years(self, horizon: u32) -> Vec<u32> {
        (1..=horizon)
            .filter(|&year| self.is_editable_year(year))
            .collect()
    }
}

/// One calculation's parameters. Amounts are in the smallest currency unit
/// the caller works in; rates and shares are percentages (5.0 means 5%).
#[derive(Debug, Clone, PartialEq)]
pub struct MortgageInputs {
    pub property_value: f64,
    pub downpayment: f64,
    pub ejerudgift: f64,
    pub heating: f64,
    pub water: f64,
    pub repairs: f64,
    pub rent_expenses: f64,
    pub loan_period_fixed: LoanPeriod,
    pub loan_period_variable: LoanPeriod,
    pub fixed_mortgage_percentage: u32,
    pub flexible_loan_type: FlexibleLoanType,
    pub with_repayments: bool,
    pub interest_rate_f3: f64,
    pub interest_rate_f5: f64,
    pub interest_rate_f30: f64,
    pub bidragssats_adjustment: f64,
    pub f30_no_repay: u32,
    pub f30_with_repay: u32,
    pub bank_loan_interest: f64,
    pub bank_loan_period: u32,
    pub inflation_ejerudgift: f64,
    pub inflation_heating: f64,
    pub inflation_water: f64,
    pub inflation_repairs: f64,
    pub inflation_rent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyBreakdown {
    pub year: u32,
    pub fixed_balance: f64,
    pub variable_balance: f64,
    pub bank_balance: f64,
    pub total_balance: f64,
    pub fixed_principal: f64,
    pub fixed_interest: f64,
    pub fixed_payment: f64,
    pub variable_principal: f64,
    pub variable_interest: f64,
    pub variable_payment: f64,
    pub bank_principal: f64,
    pub bank_interest: f64,
    pub bank_payment: f64,
    pub total_payment: f64,
    pub monthly_payment: f64,
    pub monthly_housing_cost: f64,
    pub ejerudgift: f64,
    pub heating: f64,
    pub water: f64,
    pub repairs: f64,
    pub rent: f64,
    pub variable_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MortgageSummary {
    pub total_loan_amount: f64,
    pub fixed_loan_amount: f64,
    pub variable_loan_amount: f64,
    pub bank_loan_amount: f64,
    pub fixed_loan_plus_bond: f64,
    pub monthly_utilities: f64,
    pub total_interest_paid: f64,
    pub fixed_interest_paid: f64,
    pub variable_interest_paid: f64,
    pub bank_interest_paid: f64,
    pub total_amount_paid: f64,
    pub average_monthly_payment: f64,
    pub average_monthly_housing_cost: f64,
    pub first_year_monthly_cost: f64,
    pub years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MortgageSimulation {
    pub breakdown: Vec<YearlyBreakdown>,
    pub summary: MortgageSummary,
}
