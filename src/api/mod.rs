use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    DerivedAmounts, FlexibleLoanType, LoanPeriod, MortgageInputs, MortgageSummary,
    VariableRateOverrides, YearlyBreakdown, simulate,
};

const DEFAULT_RESET_HORIZON: u32 = 30;
const MAX_RESET_HORIZON: u32 = 100;

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{field} must be >= 0")]
    NegativeAmount { field: &'static str },
    #[error("{field} must be 10, 20 or 30 years, got {years}")]
    InvalidLoanPeriod { field: &'static str, years: u32 },
    #[error("{field} must be F3 or F5, got {value:?}")]
    InvalidLoanType { field: &'static str, value: String },
    #[error("variable rate override for year {year} is invalid: {reason}")]
    InvalidOverride { year: u32, reason: String },
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("failed to render result: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliLoanType {
    #[value(name = "F3", alias = "f3")]
    F3,
    #[value(name = "F5", alias = "f5")]
    F5,
}

impl From<CliLoanType> for FlexibleLoanType {
    fn from(value: CliLoanType) -> Self {
        match value {
            CliLoanType::F3 => FlexibleLoanType::F3,
            CliLoanType::F5 => FlexibleLoanType::F5,
        }
    }
}

fn parse_loan_type(field: &'static str, value: &str) -> Result<CliLoanType, InputError> {
    CliLoanType::from_str(value, true).map_err(|_| InputError::InvalidLoanType {
        field,
        value: value.to_string(),
    })
}

fn parse_rate_override(raw: &str) -> Result<(u32, f64), String> {
    let (year, rate) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected YEAR=RATE, got {raw:?}"))?;
    let year = year
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid year {year:?}: {e}"))?;
    let rate = rate
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid rate {rate:?}: {e}"))?;
    Ok((year, rate))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    property_value: Option<f64>,
    downpayment: Option<f64>,

    ejerudgift: Option<f64>,
    heating: Option<f64>,
    water: Option<f64>,
    repairs: Option<f64>,
    rent_expenses: Option<f64>,

    loan_period_fixed: Option<u32>,
    loan_period_variable: Option<u32>,
    fixed_mortgage_percentage: Option<u32>,
    flexible_loan_type: Option<String>,
    with_repayments: Option<bool>,

    bank_loan_interest: Option<f64>,
    bank_loan_period: Option<u32>,

    interest_rate_f3: Option<f64>,
    interest_rate_f5: Option<f64>,
    interest_rate_f30: Option<f64>,
    bidragssats_adjustment: Option<f64>,
    f30_no_repay: Option<u32>,
    f30_with_repay: Option<u32>,

    inflation_ejerudgift: Option<f64>,
    inflation_heating: Option<f64>,
    inflation_water: Option<f64>,
    inflation_repairs: Option<f64>,
    inflation_rent: Option<f64>,

    variable_rate_overrides: Option<BTreeMap<u32, f64>>,
}

#[derive(Parser, Debug)]
#[command(
    name = "realkredit",
    about = "Year-by-year amortization of a fixed + variable + bank loan mortgage"
)]
struct Cli {
    #[arg(long)]
    property_value: f64,
    #[arg(long)]
    downpayment: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly ejerudgift")]
    ejerudgift: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly heating")]
    heating: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly water")]
    water: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly repairs")]
    repairs: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly rent, tracked for comparison")]
    rent_expenses: f64,
    #[arg(long, default_value_t = 30)]
    loan_period_fixed: u32,
    #[arg(long, default_value_t = 30)]
    loan_period_variable: u32,
    #[arg(
        long,
        default_value_t = 100,
        help = "Share of the loan in the fixed tranche (%)"
    )]
    fixed_mortgage_percentage: u32,
    #[arg(long, value_enum, default_value_t = CliLoanType::F5)]
    flexible_loan_type: CliLoanType,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    with_repayments: bool,
    #[arg(long, default_value_t = 6.0)]
    bank_loan_interest: f64,
    #[arg(long, default_value_t = 10)]
    bank_loan_period: u32,
    #[arg(long, default_value_t = 3.59)]
    interest_rate_f3: f64,
    #[arg(long, default_value_t = 3.49)]
    interest_rate_f5: f64,
    #[arg(long, default_value_t = 5.0)]
    interest_rate_f30: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Discount on the bidragssats surcharge (%)"
    )]
    bidragssats_adjustment: f64,
    #[arg(long, default_value_t = 91, help = "F30 bond price without repayments")]
    f30_no_repay: u32,
    #[arg(long, default_value_t = 96, help = "F30 bond price with repayments")]
    f30_with_repay: u32,
    #[arg(long, default_value_t = 2.0)]
    inflation_ejerudgift: f64,
    #[arg(long, default_value_t = 2.0)]
    inflation_heating: f64,
    #[arg(long, default_value_t = 2.0)]
    inflation_water: f64,
    #[arg(long, default_value_t = 2.0)]
    inflation_repairs: f64,
    #[arg(long, default_value_t = 2.0)]
    inflation_rent: f64,
    #[arg(
        long = "rate-override",
        value_name = "YEAR=RATE",
        value_parser = parse_rate_override,
        help = "Variable base rate from the given loan year onward; repeatable"
    )]
    variable_rate_overrides: Vec<(u32, f64)>,
}

#[derive(Debug)]
struct CalculationRequest {
    inputs: MortgageInputs,
    overrides: VariableRateOverrides,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    flexible_loan_type: FlexibleLoanType,
    with_repayments: bool,
    fixed_effective_rate: f64,
    variable_effective_rate: f64,
    fixed_bidragssats: f64,
    variable_bidragssats: f64,
    editable_years: Vec<u32>,
    variable_rate_overrides: BTreeMap<u32, f64>,
    summary: MortgageSummary,
    breakdown: Vec<YearlyBreakdown>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ResetYearsQuery {
    loan_type: Option<String>,
    horizon: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetYearsResponse {
    loan_type: FlexibleLoanType,
    reset_interval: u32,
    horizon: u32,
    years: Vec<u32>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn check_amount(field: &'static str, value: f64) -> Result<f64, InputError> {
    if !value.is_finite() || value < 0.0 {
        return Err(InputError::NegativeAmount { field });
    }
    Ok(value)
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64, InputError> {
    if !value.is_finite() || !(min..=max).contains(&value) {
        return Err(InputError::OutOfRange { field, min, max });
    }
    Ok(value)
}

fn check_percentage(field: &'static str, value: f64) -> Result<f64, InputError> {
    check_range(field, value, 0.0, 100.0)
}

fn check_whole_percentage(field: &'static str, value: u32) -> Result<u32, InputError> {
    check_percentage(field, f64::from(value))?;
    Ok(value)
}

fn check_loan_period(field: &'static str, years: u32) -> Result<LoanPeriod, InputError> {
    LoanPeriod::from_years(years).ok_or(InputError::InvalidLoanPeriod { field, years })
}

fn build_overrides(entries: &[(u32, f64)]) -> Result<VariableRateOverrides, InputError> {
    let mut overrides = VariableRateOverrides::new();
    for &(year, rate) in entries {
        if year == 0 {
            return Err(InputError::InvalidOverride {
                year,
                reason: "years start at 1".to_string(),
            });
        }
        if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
            return Err(InputError::InvalidOverride {
                year,
                reason: format!("rate {rate} must be between 0 and 100"),
            });
        }
        overrides.insert(year, rate);
    }
    Ok(overrides)
}

fn build_inputs(cli: Cli) -> Result<CalculationRequest, InputError> {
    let bank_loan_period = cli.bank_loan_period;
    check_range("--bank-loan-period", f64::from(bank_loan_period), 1.0, 30.0)?;

    let inputs = MortgageInputs {
        property_value: check_amount("--property-value", cli.property_value)?,
        downpayment: check_amount("--downpayment", cli.downpayment)?,
        ejerudgift: check_amount("--ejerudgift", cli.ejerudgift)?,
        heating: check_amount("--heating", cli.heating)?,
        water: check_amount("--water", cli.water)?,
        repairs: check_amount("--repairs", cli.repairs)?,
        rent_expenses: check_amount("--rent-expenses", cli.rent_expenses)?,
        loan_period_fixed: check_loan_period("--loan-period-fixed", cli.loan_period_fixed)?,
        loan_period_variable: check_loan_period(
            "--loan-period-variable",
            cli.loan_period_variable,
        )?,
        fixed_mortgage_percentage: check_whole_percentage(
            "--fixed-mortgage-percentage",
            cli.fixed_mortgage_percentage,
        )?,
        flexible_loan_type: cli.flexible_loan_type.into(),
        with_repayments: cli.with_repayments,
        interest_rate_f3: check_percentage("--interest-rate-f3", cli.interest_rate_f3)?,
        interest_rate_f5: check_percentage("--interest-rate-f5", cli.interest_rate_f5)?,
        interest_rate_f30: check_percentage("--interest-rate-f30", cli.interest_rate_f30)?,
        bidragssats_adjustment: check_percentage(
            "--bidragssats-adjustment",
            cli.bidragssats_adjustment,
        )?,
        f30_no_repay: check_whole_percentage("--f30-no-repay", cli.f30_no_repay)?,
        f30_with_repay: check_whole_percentage("--f30-with-repay", cli.f30_with_repay)?,
        bank_loan_interest: check_percentage("--bank-loan-interest", cli.bank_loan_interest)?,
        bank_loan_period,
        inflation_ejerudgift: check_percentage(
            "--inflation-ejerudgift",
            cli.inflation_ejerudgift,
        )?,
        inflation_heating: check_percentage("--inflation-heating", cli.inflation_heating)?,
        inflation_water: check_percentage("--inflation-water", cli.inflation_water)?,
        inflation_repairs: check_percentage("--inflation-repairs", cli.inflation_repairs)?,
        inflation_rent: check_percentage("--inflation-rent", cli.inflation_rent)?,
    };
    let overrides = build_overrides(&cli.variable_rate_overrides)?;

    Ok(CalculationRequest { inputs, overrides })
}

/// Parses command-line flags, runs one calculation and renders it as JSON.
/// Exits the process through clap on `--help` or malformed flags.
pub fn run_cli_calculation<I, T>(args: I) -> Result<String, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let request = build_inputs(Cli::parse_from(args))?;
    let response = build_simulate_response(&request);
    Ok(serde_json::to_string_pretty(&response)?)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/reset-years", get(reset_years_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("mortgage calculator API listening on http://{addr}");
    log::info!("local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(
    payload: Result<Query<SimulatePayload>, QueryRejection>,
) -> Response {
    let payload = payload
        .map(|Query(payload)| payload)
        .map_err(|rejection| InputError::InvalidPayload(rejection.body_text()));
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(payload: Result<Json<SimulatePayload>, JsonRejection>) -> Response {
    let payload = payload
        .map(|Json(payload)| payload)
        .map_err(|rejection| InputError::InvalidPayload(rejection.body_text()));
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: Result<SimulatePayload, InputError>) -> Response {
    let request = match payload.and_then(request_from_payload) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("rejected simulation request: {e}");
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    json_response(StatusCode::OK, build_simulate_response(&request))
}

async fn reset_years_handler(query: Result<Query<ResetYearsQuery>, QueryRejection>) -> Response {
    let response = query
        .map_err(|rejection| InputError::InvalidPayload(rejection.body_text()))
        .and_then(|Query(query)| build_reset_years_response(query));
    match response {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => {
            log::warn!("rejected reset-years request: {e}");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn request_from_json(json: &str) -> Result<CalculationRequest, InputError> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| InputError::InvalidPayload(e.to_string()))?;
    request_from_payload(payload)
}

fn request_from_payload(payload: SimulatePayload) -> Result<CalculationRequest, InputError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.property_value {
        cli.property_value = v;
    }
    if let Some(v) = payload.downpayment {
        cli.downpayment = v;
    }

    if let Some(v) = payload.ejerudgift {
        cli.ejerudgift = v;
    }
    if let Some(v) = payload.heating {
        cli.heating = v;
    }
    if let Some(v) = payload.water {
        cli.water = v;
    }
    if let Some(v) = payload.repairs {
        cli.repairs = v;
    }
    if let Some(v) = payload.rent_expenses {
        cli.rent_expenses = v;
    }

    if let Some(v) = payload.loan_period_fixed {
        cli.loan_period_fixed = v;
    }
    if let Some(v) = payload.loan_period_variable {
        cli.loan_period_variable = v;
    }
    if let Some(v) = payload.fixed_mortgage_percentage {
        cli.fixed_mortgage_percentage = v;
    }
    if let Some(v) = payload.flexible_loan_type.as_deref() {
        cli.flexible_loan_type = parse_loan_type("flexibleLoanType", v)?;
    }
    if let Some(v) = payload.with_repayments {
        cli.with_repayments = v;
    }

    if let Some(v) = payload.bank_loan_interest {
        cli.bank_loan_interest = v;
    }
    if let Some(v) = payload.bank_loan_period {
        cli.bank_loan_period = v;
    }

    if let Some(v) = payload.interest_rate_f3 {
        cli.interest_rate_f3 = v;
    }
    if let Some(v) = payload.interest_rate_f5 {
        cli.interest_rate_f5 = v;
    }
    if let Some(v) = payload.interest_rate_f30 {
        cli.interest_rate_f30 = v;
    }
    if let Some(v) = payload.bidragssats_adjustment {
        cli.bidragssats_adjustment = v;
    }
    if let Some(v) = payload.f30_no_repay {
        cli.f30_no_repay = v;
    }
    if let Some(v) = payload.f30_with_repay {
        cli.f30_with_repay = v;
    }

    if let Some(v) = payload.inflation_ejerudgift {
        cli.inflation_ejerudgift = v;
    }
    if let Some(v) = payload.inflation_heating {
        cli.inflation_heating = v;
    }
    if let Some(v) = payload.inflation_water {
        cli.inflation_water = v;
    }
    if let Some(v) = payload.inflation_repairs {
        cli.inflation_repairs = v;
    }
    if let Some(v) = payload.inflation_rent {
        cli.inflation_rent = v;
    }

    if let Some(v) = payload.variable_rate_overrides {
        cli.variable_rate_overrides = v.into_iter().collect();
    }

    build_inputs(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        property_value: 5_000_000.0,
        downpayment: 1_000_000.0,
        ejerudgift: 4_000.0,
        heating: 1_000.0,
        water: 200.0,
        repairs: 500.0,
        rent_expenses: 15_000.0,
        loan_period_fixed: 30,
        loan_period_variable: 30,
        fixed_mortgage_percentage: 100,
        flexible_loan_type: CliLoanType::F5,
        with_repayments: true,
        bank_loan_interest: 6.0,
        bank_loan_period: 10,
        interest_rate_f3: 3.59,
        interest_rate_f5: 3.49,
        interest_rate_f30: 5.0,
        bidragssats_adjustment: 0.0,
        f30_no_repay: 91,
        f30_with_repay: 96,
        inflation_ejerudgift: 2.0,
        inflation_heating: 2.0,
        inflation_water: 2.0,
        inflation_repairs: 2.0,
        inflation_rent: 2.0,
        variable_rate_overrides: Vec::new(),
    }
}

fn build_simulate_response(request: &CalculationRequest) -> SimulateResponse {
    let inputs = &request.inputs;
    let derived = DerivedAmounts::from_inputs(inputs);
    let simulation = simulate(inputs, &request.overrides);

    SimulateResponse {
        flexible_loan_type: inputs.flexible_loan_type,
        with_repayments: inputs.with_repayments,
        fixed_effective_rate: derived.fixed_effective_rate,
        variable_effective_rate: derived.variable_effective_rate,
        fixed_bidragssats: derived.fixed_bidragssats,
        variable_bidragssats: derived.variable_bidragssats,
        editable_years: inputs
            .flexible_loan_type
            .editable_years(inputs.loan_period_variable.years()),
        variable_rate_overrides: request.overrides.iter().collect(),
        summary: simulation.summary,
        breakdown: simulation.breakdown,
    }
}

fn build_reset_years_response(query: ResetYearsQuery) -> Result<ResetYearsResponse, InputError> {
    let loan_type: FlexibleLoanType = match query.loan_type.as_deref() {
        Some(v) => parse_loan_type("loanType", v)?.into(),
        None => FlexibleLoanType::F5,
    };
    let horizon = query.horizon.unwrap_or(DEFAULT_RESET_HORIZON);
    check_range(
        "horizon",
        f64::from(horizon),
        1.0,
        f64::from(MAX_RESET_HORIZON),
    )?;

    Ok(ResetYearsResponse {
        loan_type,
        reset_interval: loan_type.reset_interval(),
        horizon,
        years: loan_type.editable_years(horizon),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn build_inputs_accepts_defaults() {
        let request = build_inputs(sample_cli()).expect("valid inputs");
        let inputs = request.inputs;
        assert_approx(inputs.property_value, 5_000_000.0);
        assert_eq!(inputs.loan_period_fixed, LoanPeriod::Thirty);
        assert_eq!(inputs.flexible_loan_type, FlexibleLoanType::F5);
        assert!(inputs.with_repayments);
        assert_eq!(inputs.f30_with_repay, 96);
        assert!(request.overrides.is_empty());
    }

    #[test]
    fn build_inputs_rejects_negative_amounts() {
        let mut cli = sample_cli();
        cli.downpayment = -1.0;
        let err = build_inputs(cli).expect_err("must reject negative downpayment");
        assert_eq!(
            err,
            InputError::NegativeAmount {
                field: "--downpayment"
            }
        );
        assert_eq!(err.to_string(), "--downpayment must be >= 0");
    }

    #[test]
    fn build_inputs_rejects_unsupported_loan_period() {
        let mut cli = sample_cli();
        cli.loan_period_variable = 25;
        let err = build_inputs(cli).expect_err("must reject 25 years");
        assert!(err.to_string().contains("--loan-period-variable"));
    }

    #[test]
    fn build_inputs_rejects_out_of_range_percentages() {
        let mut cli = sample_cli();
        cli.fixed_mortgage_percentage = 101;
        let err = build_inputs(cli).expect_err("must reject 101%");
        assert_eq!(
            err.to_string(),
            "--fixed-mortgage-percentage must be between 0 and 100"
        );

        let mut cli = sample_cli();
        cli.inflation_water = f64::NAN;
        let err = build_inputs(cli).expect_err("must reject NaN");
        assert!(err.to_string().contains("--inflation-water"));
    }

    #[test]
    fn build_inputs_rejects_bank_loan_period_outside_one_to_thirty() {
        for period in [0, 31] {
            let mut cli = sample_cli();
            cli.bank_loan_period = period;
            let err = build_inputs(cli).expect_err("must reject bank period");
            assert!(err.to_string().contains("--bank-loan-period"));
        }
    }

    #[test]
    fn build_inputs_rejects_bad_overrides() {
        let mut cli = sample_cli();
        cli.variable_rate_overrides = vec![(0, 4.0)];
        let err = build_inputs(cli).expect_err("must reject year 0");
        assert!(matches!(err, InputError::InvalidOverride { year: 0, .. }));

        let mut cli = sample_cli();
        cli.variable_rate_overrides = vec![(6, 120.0)];
        let err = build_inputs(cli).expect_err("must reject 120%");
        assert!(matches!(err, InputError::InvalidOverride { year: 6, .. }));
    }

    #[test]
    fn parse_rate_override_reads_year_and_rate() {
        assert_eq!(parse_rate_override("6=4.5"), Ok((6, 4.5)));
        assert_eq!(parse_rate_override(" 11 = 5 "), Ok((11, 5.0)));
        assert!(parse_rate_override("6:4.5").is_err());
        assert!(parse_rate_override("x=4.5").is_err());
    }

    #[test]
    fn cli_parses_flags_and_repeated_overrides() {
        let cli = Cli::try_parse_from([
            "realkredit",
            "--property-value",
            "6000000",
            "--downpayment",
            "1000000",
            "--flexible-loan-type",
            "F3",
            "--with-repayments",
            "false",
            "--rate-override",
            "4=4.0",
            "--rate-override",
            "7=4.25",
        ])
        .expect("flags should parse");
        let request = build_inputs(cli).expect("valid inputs");

        assert_eq!(request.inputs.flexible_loan_type, FlexibleLoanType::F3);
        assert!(!request.inputs.with_repayments);
        assert_eq!(request.inputs.loan_period_fixed, LoanPeriod::Thirty);
        assert_eq!(request.overrides.len(), 2);
        assert_eq!(request.overrides.rate_in_force(8), Some(4.25));
    }

    #[test]
    fn request_from_json_parses_web_keys() {
        let json = r#"{
          "propertyValue": 6000000,
          "downpayment": 1000000,
          "ejerudgift": 3000,
          "loanPeriodFixed": 20,
          "loanPeriodVariable": 10,
          "fixedMortgagePercentage": 60,
          "flexibleLoanType": "f3",
          "withRepayments": false,
          "bankLoanPeriod": 5,
          "interestRateF30": 4.5,
          "bidragssatsAdjustment": 25,
          "f30NoRepay": 90,
          "inflationRent": 3,
          "variableRateOverrides": { "4": 4.1, "7": 4.6 }
        }"#;
        let request = request_from_json(json).expect("json should parse");
        let inputs = request.inputs;

        assert_approx(inputs.property_value, 6_000_000.0);
        assert_approx(inputs.ejerudgift, 3_000.0);
        assert_approx(inputs.heating, 1_000.0);
        assert_eq!(inputs.loan_period_fixed, LoanPeriod::Twenty);
        assert_eq!(inputs.loan_period_variable, LoanPeriod::Ten);
        assert_eq!(inputs.fixed_mortgage_percentage, 60);
        assert_eq!(inputs.flexible_loan_type, FlexibleLoanType::F3);
        assert!(!inputs.with_repayments);
        assert_eq!(inputs.bank_loan_period, 5);
        assert_approx(inputs.interest_rate_f30, 4.5);
        assert_approx(inputs.bidragssats_adjustment, 25.0);
        assert_eq!(inputs.f30_no_repay, 90);
        assert_approx(inputs.inflation_rent, 3.0);
        assert_eq!(request.overrides.rate_in_force(5), Some(4.1));
        assert_eq!(request.overrides.rate_in_force(30), Some(4.6));
    }

    #[test]
    fn request_from_json_rejects_unknown_loan_type() {
        let err = request_from_json(r#"{ "flexibleLoanType": "F10" }"#)
            .expect_err("must reject F10");
        assert_eq!(
            err,
            InputError::InvalidLoanType {
                field: "flexibleLoanType",
                value: "F10".to_string()
            }
        );
    }

    #[test]
    fn request_from_json_reports_malformed_payload() {
        let err = request_from_json(r#"{ "propertyValue": "lots" }"#)
            .expect_err("must reject string amount");
        assert!(matches!(err, InputError::InvalidPayload(_)));
    }

    async fn response_json(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let value = serde_json::from_slice(&bytes).expect("json body");
        (status, value)
    }

    #[tokio::test]
    async fn malformed_post_body_gets_json_bad_request() {
        let payload = Json::<SimulatePayload>::from_bytes(br#"{ "propertyValue": "lots" }"#);
        assert!(payload.is_err());

        let (status, body) = response_json(simulate_post_handler(payload).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let msg = body["error"].as_str().expect("error message");
        assert!(msg.starts_with("invalid payload:"), "unexpected error {msg}");
    }

    #[tokio::test]
    async fn malformed_query_gets_json_bad_request() {
        let uri: Uri = "/api/simulate?propertyValue=abc"
            .parse()
            .expect("valid uri");
        let payload = Query::<SimulatePayload>::try_from_uri(&uri);
        assert!(payload.is_err());

        let (status, body) = response_json(simulate_get_handler(payload).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .expect("error message")
                .starts_with("invalid payload:")
        );

        let uri: Uri = "/api/reset-years?horizon=many".parse().expect("valid uri");
        let query = Query::<ResetYearsQuery>::try_from_uri(&uri);
        let (status, _) = response_json(reset_years_handler(query).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn valid_post_body_gets_simulation() {
        let payload = Json::<SimulatePayload>::from_bytes(br#"{ "propertyValue": 6000000 }"#);
        let (status, body) = response_json(simulate_post_handler(payload).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["totalLoanAmount"], 4_800_000.0);
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let request = request_from_json(
            r#"{ "propertyValue": 6000000, "variableRateOverrides": { "6": 4.5 } }"#,
        )
        .expect("json should parse");
        let response = build_simulate_response(&request);
        let value = serde_json::to_value(&response).expect("response serializes");

        assert_eq!(value["flexibleLoanType"], "F5");
        assert_eq!(value["withRepayments"], true);
        assert_eq!(
            value["editableYears"],
            serde_json::json!([6, 11, 16, 21, 26])
        );
        assert_eq!(value["variableRateOverrides"]["6"], 4.5);
        assert_eq!(value["summary"]["totalLoanAmount"], 4_800_000.0);
        assert_eq!(value["summary"]["bankLoanAmount"], 200_000.0);
        assert_eq!(value["summary"]["years"], 30);

        let breakdown = value["breakdown"].as_array().expect("breakdown array");
        assert_eq!(breakdown.len(), 30);
        let first = &breakdown[0];
        for key in [
            "year",
            "fixedBalance",
            "variableBalance",
            "bankBalance",
            "totalBalance",
            "fixedPrincipal",
            "variableInterest",
            "bankPayment",
            "monthlyPayment",
            "monthlyHousingCost",
            "ejerudgift",
            "rent",
            "variableRate",
        ] {
            assert!(first.get(key).is_some(), "missing breakdown field {key}");
        }
    }

    #[test]
    fn reset_years_defaults_to_f5_over_thirty_years() {
        let response =
            build_reset_years_response(ResetYearsQuery::default()).expect("valid query");
        assert_eq!(response.loan_type, FlexibleLoanType::F5);
        assert_eq!(response.reset_interval, 5);
        assert_eq!(response.years, vec![6, 11, 16, 21, 26]);
    }

    #[test]
    fn reset_years_for_f3_and_bad_horizon() {
        let response = build_reset_years_response(ResetYearsQuery {
            loan_type: Some("F3".to_string()),
            horizon: Some(10),
        })
        .expect("valid query");
        assert_eq!(response.years, vec![4, 7, 10]);

        let err = build_reset_years_response(ResetYearsQuery {
            loan_type: None,
            horizon: Some(0),
        })
        .expect_err("must reject zero horizon");
        assert!(err.to_string().contains("horizon"));
    }

    #[test]
    fn run_cli_calculation_renders_json() {
        let json = run_cli_calculation([
            "realkredit",
            "--property-value",
            "1000000",
            "--downpayment",
            "1000000",
        ])
        .expect("calculation succeeds");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["breakdown"], serde_json::json!([]));
        assert_eq!(value["summary"]["totalAmountPaid"], 0.0);
    }
}
