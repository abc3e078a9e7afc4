use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::payroll::{
    analytics::AnalyticsReport,
    bonus::BonusPatch,
    payment::PaymentUpdate,
    tax::{RegimeComparison, TaxBreakdown, TaxDeductionClaims, TaxRegime},
};

use super::*;

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct ListQuery {
    pub(super) month: Option<u32>,
    pub(super) year: Option<i32>,
    pub(super) employee_id: Option<Uuid>,
    pub(super) status: Option<PaymentStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct PayrollList {
    pub(super) count: usize,
    pub(super) month: u32,
    pub(super) year: i32,
    pub(super) last_calculated: DateTime<FixedOffset>,
    pub(super) payrolls: Vec<payroll::Model>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct GeneratePayroll {
    pub(super) employee_id: Option<Uuid>,
    pub(super) month: Option<u32>,
    pub(super) year: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct PayPeriodPayload {
    pub(super) month: Option<u32>,
    pub(super) year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BatchPaymentUpdate {
    #[serde(default)]
    pub(super) payroll_ids: Vec<String>,
    #[serde(flatten)]
    pub(super) update: PaymentUpdate,
}

/// Month and year arrive as raw strings so their validation can name them
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct SummaryQuery {
    pub(super) month: Option<String>,
    pub(super) year: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct ReportQuery {
    pub(super) start_date: Option<NaiveDate>,
    pub(super) end_date: Option<NaiveDate>,
    /// Comma separated
    pub(super) departments: Option<String>,
    pub(super) format: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct CompactPayroll {
    pub(super) id: Uuid,
    pub(super) employee_id: Uuid,
    pub(super) name: String,
    pub(super) department: String,
    pub(super) month: i32,
    pub(super) year: i32,
    pub(super) net_salary: f64,
    pub(super) payment_status: PaymentStatus,
}

impl From<payroll::Model> for CompactPayroll {
    fn from(payroll: payroll::Model) -> Self {
        Self {
            id: payroll.id,
            employee_id: payroll.employee_id,
            name: payroll.employee_details.name,
            department: payroll.employee_details.department,
            month: payroll.month,
            year: payroll.year,
            net_salary: payroll.net_salary,
            payment_status: payroll.payment_status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum ReportRows {
    Detailed(Vec<payroll::Model>),
    Compact(Vec<CompactPayroll>),
}

#[derive(Debug, Serialize)]
pub(super) struct ReportPeriod {
    pub(super) start_date: NaiveDate,
    pub(super) end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub(super) struct PayrollReport {
    pub(super) period: ReportPeriod,
    pub(super) analytics: AnalyticsReport,
    pub(super) payrolls: ReportRows,
}

#[derive(Debug, Deserialize)]
pub(super) struct TaxRequest {
    pub(super) employee_id: Option<Uuid>,
    pub(super) financial_year: Option<String>,
    /// Annual income, defaults to twelve monthly salaries
    pub(super) income: Option<f64>,
    #[serde(default)]
    pub(super) deductions: TaxDeductionClaims,
    #[serde(default)]
    pub(super) tax_regime: TaxRegime,
}

#[derive(Debug, Serialize)]
pub(super) struct TaxEmployee {
    pub(super) name: String,
    pub(super) employee_code: String,
    pub(super) department: String,
    pub(super) position: String,
}

#[derive(Debug, Serialize)]
pub(super) struct TaxReport {
    pub(super) employee: TaxEmployee,
    pub(super) financial_year: String,
    pub(super) regime_description: &'static str,
    #[serde(flatten)]
    pub(super) breakdown: TaxBreakdown,
    pub(super) comparison: RegimeComparison,
}

#[derive(Debug, Deserialize)]
pub(super) struct BonusRequest {
    pub(super) payroll_id: Option<String>,
    #[serde(default)]
    pub(super) bonus_details: BonusPatch,
    pub(super) description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BulkBonusRequest {
    #[serde(default)]
    pub(super) employees: Vec<Uuid>,
    pub(super) bonus_type: Option<String>,
    pub(super) bonus_amount: Option<f64>,
    pub(super) description: Option<String>,
    pub(super) month: Option<u32>,
    pub(super) year: Option<i32>,
}
