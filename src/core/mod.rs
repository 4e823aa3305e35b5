mod engine;
mod rates;
mod types;

pub use engine::{
    DerivedAmounts, interest_for_year, run_yearly_breakdown, simulate, straight_line_principal,
    summarize,
};
pub use rates::{
    LoanProduct, VariableRateOverrides, bidragssats, discounted_bidragssats,
    effective_variable_rate_for_year, fixed_bidragssats, variable_base_rate, variable_bidragssats,
    variable_rate_for_year,
};
pub use types::{
    FlexibleLoanType, LoanPeriod, MortgageInputs, MortgageSimulation, MortgageSummary,
    YearlyBreakdown,
};
