use super::rates::{
    VariableRateOverrides, effective_variable_rate_for_year, fixed_bidragssats,
    variable_base_rate, variable_bidragssats,
};
use super::types::{MortgageInputs, MortgageSimulation, MortgageSummary, YearlyBreakdown};

const MAX_LOAN_TO_VALUE: f64 = 0.8;
const MIN_EQUITY_SHARE: f64 = 0.2;
const INTEREST_ONLY_YEARS: u32 = 10;

/// Quantities derived directly from the inputs, before any simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedAmounts {
    pub total_loan_amount: f64,
    pub fixed_loan_amount: f64,
    pub variable_loan_amount: f64,
    pub bank_loan_amount: f64,
    pub variable_base_rate: f64,
    pub fixed_bidragssats: f64,
    pub variable_bidragssats: f64,
    pub fixed_effective_rate: f64,
    pub variable_effective_rate: f64,
    /// Bond principal owed on the fixed tranche once the below-par issue
    /// price is grossed up. This, not `fixed_loan_amount`, is amortized.
    pub fixed_loan_plus_bond: f64,
    pub monthly_utilities: f64,
}

impl DerivedAmounts {
    pub fn from_inputs(inputs: &MortgageInputs) -> Self {
        let total_loan_amount = (inputs.property_value - inputs.downpayment)
            .min(inputs.property_value * MAX_LOAN_TO_VALUE)
            .max(0.0);
        let fixed_loan_amount =
            total_loan_amount * f64::from(inputs.fixed_mortgage_percentage) / 100.0;
        let variable_loan_amount = total_loan_amount - fixed_loan_amount;
        let bank_loan_amount =
            (inputs.property_value * MIN_EQUITY_SHARE - inputs.downpayment).max(0.0);

        let variable_base_rate = variable_base_rate(inputs);
        let fixed_bidragssats = fixed_bidragssats(inputs);
        let variable_bidragssats = variable_bidragssats(inputs);

        Self {
            total_loan_amount,
            fixed_loan_amount,
            variable_loan_amount,
            bank_loan_amount,
            variable_base_rate,
            fixed_bidragssats,
            variable_bidragssats,
            fixed_effective_rate: inputs.interest_rate_f30 + fixed_bidragssats,
            variable_effective_rate: variable_base_rate + variable_bidragssats,
            fixed_loan_plus_bond: bond_gross_up(fixed_loan_amount, bond_price(inputs)),
            monthly_utilities: inputs.ejerudgift + inputs.heating + inputs.water + inputs.repairs,
        }
    }
}

fn bond_price(inputs: &MortgageInputs) -> u32 {
    if inputs.with_repayments {
        inputs.f30_with_repay
    } else {
        inputs.f30_no_repay
    }
}

fn bond_gross_up(loan_amount: f64, price: u32) -> f64 {
    if price == 0 {
        return loan_amount;
    }
    (100.0 * loan_amount / f64::from(price)).round()
}

/// Yearly principal for a straight-line schedule; 0 when there is nothing
/// to repay or no years to repay it over.
pub fn straight_line_principal(principal: f64, years: u32) -> f64 {
    if principal <= 0.0 || years == 0 {
        return 0.0;
    }
    principal / f64::from(years)
}

pub fn interest_for_year(balance: f64, annual_rate: f64) -> f64 {
    if balance <= 0.0 {
        return 0.0;
    }
    balance * annual_rate / 100.0
}

#[derive(Debug, Clone, Copy, Default)]
struct TrancheYear {
    principal: f64,
    interest: f64,
}

impl TrancheYear {
    fn payment(self) -> f64 {
        self.principal + self.interest
    }
}

#[derive(Debug)]
struct Tranche {
    balance: f64,
    period: u32,
    interest_only_years: u32,
    scheduled_principal: f64,
}

impl Tranche {
    fn amortizing(start: f64, period: u32) -> Self {
        Self {
            balance: start.max(0.0),
            period,
            interest_only_years: 0,
            scheduled_principal: straight_line_principal(start, period),
        }
    }

    fn with_interest_only_window(start: f64, period: u32, window: u32) -> Self {
        Self {
            balance: start.max(0.0),
            period,
            interest_only_years: window,
            scheduled_principal: straight_line_principal(start, period.saturating_sub(window)),
        }
    }

    fn is_active(&self, year: u32) -> bool {
        self.balance > 0.0 && year <= self.period
    }

    fn step(&mut self, year: u32, annual_rate: f64) -> TrancheYear {
        if !self.is_active(year) {
            return TrancheYear::default();
        }

        let interest = interest_for_year(self.balance, annual_rate);
        let mut principal = if year <= self.interest_only_years {
            0.0
        } else {
            self.scheduled_principal.min(self.balance)
        };
        // The last repayment year clears whatever straight-line rounding left.
        if year == self.period && principal > 0.0 {
            principal = self.balance;
        }
        self.balance = (self.balance - principal).max(0.0);

        TrancheYear {
            principal,
            interest,
        }
    }
}

/// Household expense lines at a yearly level, each compounding at its own
/// inflation rate.
#[derive(Debug, Clone, Copy)]
struct ExpenseLines {
    ejerudgift: f64,
    heating: f64,
    water: f64,
    repairs: f64,
    rent: f64,
}

impl ExpenseLines {
    fn first_year(inputs: &MortgageInputs) -> Self {
        Self {
            ejerudgift: inputs.ejerudgift * 12.0,
            heating: inputs.heating * 12.0,
            water: inputs.water * 12.0,
            repairs: inputs.repairs * 12.0,
            rent: inputs.rent_expenses * 12.0,
        }
    }

    fn inflate(&mut self, inputs: &MortgageInputs) {
        self.ejerudgift *= 1.0 + inputs.inflation_ejerudgift / 100.0;
        self.heating *= 1.0 + inputs.inflation_heating / 100.0;
        self.water *= 1.0 + inputs.inflation_water / 100.0;
        self.repairs *= 1.0 + inputs.inflation_repairs / 100.0;
        self.rent *= 1.0 + inputs.inflation_rent / 100.0;
    }

    // Rent is tracked alongside but is not a cost of owning.
    fn utilities(&self) -> f64 {
        self.ejerudgift + self.heating + self.water + self.repairs
    }
}

pub fn simulate(inputs: &MortgageInputs, overrides: &VariableRateOverrides) -> MortgageSimulation {
    let derived = DerivedAmounts::from_inputs(inputs);
    let breakdown = run_yearly_breakdown(inputs, overrides, &derived);
    let summary = summarize(&breakdown, &derived);

    log::debug!(
        "simulated mortgage: fixed={:.0} (bond {:.0}) variable={:.0} bank={:.0} years={}",
        derived.fixed_loan_amount,
        derived.fixed_loan_plus_bond,
        derived.variable_loan_amount,
        derived.bank_loan_amount,
        breakdown.len()
    );

    MortgageSimulation { breakdown, summary }
}

pub fn run_yearly_breakdown(
    inputs: &MortgageInputs,
    overrides: &VariableRateOverrides,
    derived: &DerivedAmounts,
) -> Vec<YearlyBreakdown> {
    if derived.total_loan_amount <= 0.0 {
        return Vec::new();
    }

    let fixed_period = inputs.loan_period_fixed.years();
    let variable_period = inputs.loan_period_variable.years();
    let (mut fixed, mut variable) = if inputs.with_repayments {
        (
            Tranche::amortizing(derived.fixed_loan_plus_bond, fixed_period),
            Tranche::amortizing(derived.variable_loan_amount, variable_period),
        )
    } else {
        (
            Tranche::with_interest_only_window(
                derived.fixed_loan_plus_bond,
                fixed_period,
                INTEREST_ONLY_YEARS,
            ),
            Tranche::with_interest_only_window(
                derived.variable_loan_amount,
                variable_period,
                INTEREST_ONLY_YEARS,
            ),
        )
    };
    let mut bank = Tranche::amortizing(derived.bank_loan_amount, inputs.bank_loan_period);

    let max_years = fixed_period.max(variable_period).max(inputs.bank_loan_period);
    let mut expenses = ExpenseLines::first_year(inputs);
    let mut breakdown = Vec::with_capacity(max_years as usize);

    for year in 1..=max_years {
        if year > 1 {
            expenses.inflate(inputs);
        }

        let variable_rate = effective_variable_rate_for_year(inputs, overrides, year);
        let fixed_year = fixed.step(year, derived.fixed_effective_rate);
        let variable_year = variable.step(year, variable_rate);
        let bank_year = bank.step(year, inputs.bank_loan_interest);

        let total_payment = fixed_year.payment() + variable_year.payment() + bank_year.payment();
        let monthly_payment = total_payment / 12.0;

        breakdown.push(YearlyBreakdown {
            year,
            fixed_balance: fixed.balance,
            variable_balance: variable.balance,
            bank_balance: bank.balance,
            total_balance: fixed.balance + variable.balance + bank.balance,
            fixed_principal: fixed_year.principal,
            fixed_interest: fixed_year.interest,
            fixed_payment: fixed_year.payment(),
            variable_principal: variable_year.principal,
            variable_interest: variable_year.interest,
            variable_payment: variable_year.payment(),
            bank_principal: bank_year.principal,
            bank_interest: bank_year.interest,
            bank_payment: bank_year.payment(),
            total_payment,
            monthly_payment,
            monthly_housing_cost: monthly_payment + expenses.utilities() / 12.0,
            ejerudgift: expenses.ejerudgift,
            heating: expenses.heating,
            water: expenses.water,
            repairs: expenses.repairs,
            rent: expenses.rent,
            variable_rate,
        });

        if fixed.balance <= 0.0 && variable.balance <= 0.0 && bank.balance <= 0.0 {
            break;
        }
    }

    breakdown
}

/// Folds a breakdown into totals. Bank interest is reported on its own and
/// left out of `total_interest_paid`, while `total_amount_paid` covers all
/// three tranches.
pub fn summarize(breakdown: &[YearlyBreakdown], derived: &DerivedAmounts) -> MortgageSummary {
    if breakdown.is_empty() {
        return MortgageSummary::default();
    }

    let mut summary = MortgageSummary {
        total_loan_amount: derived.total_loan_amount,
        fixed_loan_amount: derived.fixed_loan_amount,
        variable_loan_amount: derived.variable_loan_amount,
        bank_loan_amount: derived.bank_loan_amount,
        fixed_loan_plus_bond: derived.fixed_loan_plus_bond,
        monthly_utilities: derived.monthly_utilities,
        first_year_monthly_cost: breakdown[0].monthly_housing_cost,
        years: breakdown.len() as u32,
        ..MortgageSummary::default()
    };

    let mut monthly_payment_sum = 0.0;
    for row in breakdown {
        summary.fixed_interest_paid += row.fixed_interest;
        summary.variable_interest_paid += row.variable_interest;
        summary.bank_interest_paid += row.bank_interest;
        summary.total_amount_paid += row.total_payment;
        monthly_payment_sum += row.monthly_payment;
    }
    summary.total_interest_paid = summary.fixed_interest_paid + summary.variable_interest_paid;
    summary.average_monthly_payment = monthly_payment_sum / breakdown.len() as f64;
    summary.average_monthly_housing_cost =
        summary.average_monthly_payment + derived.monthly_utilities;

    summary
}
