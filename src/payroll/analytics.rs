//! Aggregations over already fetched payrolls. Nothing here touches the store.

use std::collections::{BTreeMap, HashSet};

use chrono::Month;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    entity::{payroll, sea_orm_active_enums::PaymentStatus},
    utils::{self, percentage, round2},
};

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub paid: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn of<'a>(payrolls: impl IntoIterator<Item = &'a payroll::Model>) -> Self {
        let mut counts = Self::default();

        for payroll in payrolls {
            match payroll.payment_status {
                PaymentStatus::Pending => counts.pending += 1,
                PaymentStatus::Processing => counts.processing += 1,
                PaymentStatus::Paid => counts.paid += 1,
                PaymentStatus::Failed => counts.failed += 1,
            }
        }

        counts
    }

    pub fn total(&self) -> usize {
        self.pending + self.processing + self.paid + self.failed
    }
}

/// Month overview used by the payroll dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayrollSummary {
    pub month: u32,
    pub year: i32,
    pub total_employees: u64,
    pub processed_count: usize,
    pub not_processed_count: i64,
    pub pending_count: usize,
    pub processing_count: usize,
    pub paid_count: usize,
    pub failed_count: usize,
    pub total_net_payout: f64,
    pub total_deductions: f64,
}

pub fn summarize(payrolls: &[payroll::Model], active_employees: u64, month: u32, year: i32) -> PayrollSummary {
    let counts = StatusCounts::of(payrolls);

    PayrollSummary {
        month,
        year,
        total_employees: active_employees,
        processed_count: payrolls.len(),
        not_processed_count: active_employees as i64 - payrolls.len() as i64,
        pending_count: counts.pending,
        processing_count: counts.processing,
        paid_count: counts.paid,
        failed_count: counts.failed,
        total_net_payout: round2(payrolls.iter().map(|payroll| payroll.net_salary).sum()),
        total_deductions: round2(payrolls.iter().map(|payroll| payroll.total_deductions).sum()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub total_employees: usize,
    pub records: usize,
    /// Net salaries paid out
    pub total_payroll: f64,
    pub average_salary: Option<f64>,
    pub total_gross_salary: f64,
    pub total_net_salary: f64,
    pub total_basic_salary: f64,
    pub total_deductions: f64,
    pub tax_deductions: f64,
    pub pf_deductions: f64,
    /// Health insurance, professional tax, loan repayment and other
    pub other_deductions: f64,
    pub bonus_distributed: f64,
    pub incentives_distributed: f64,
    pub overtime_hours_total: f64,
    pub overtime_amount_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DepartmentStats {
    pub total: f64,
    pub average: Option<f64>,
    pub employees: usize,
    pub records: usize,
    pub gross_salary: f64,
    pub basic_salary: f64,
    pub deductions: f64,
    pub bonuses: f64,
    /// Share of the total net payroll, in percent
    pub cost_share: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PositionStats {
    pub total: f64,
    pub average: Option<f64>,
    pub employees: usize,
    pub records: usize,
    pub cost_share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub total_salary: Option<f64>,
    pub headcount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// `YYYY-MM`
    pub period: String,
    pub month_name: &'static str,
    pub month: u32,
    pub year: i32,
    pub quarter: String,
    pub total_salary: f64,
    pub gross_salary: f64,
    pub average_salary: Option<f64>,
    pub headcount: usize,
    pub records: usize,
    pub taxes: f64,
    pub bonus: f64,
    pub deductions: f64,
    pub overtime: f64,
    /// Against the previous entry of the trend
    pub mom: Option<Change>,
    /// Against the same month one year earlier
    pub yoy: Option<Change>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentShare {
    pub amount: f64,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeductionAmounts {
    pub tax: f64,
    pub pf: f64,
    pub other: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeductionShare {
    pub amount: f64,
    pub percentage: Option<f64>,
    pub breakdown: DeductionAmounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentAllocation {
    pub basic_salary: ComponentShare,
    pub deductions: DeductionShare,
    pub bonus: ComponentShare,
    pub overtime: ComponentShare,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeductionBreakdown {
    pub tax: Option<f64>,
    pub pf: Option<f64>,
    pub others: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusPercentages {
    pub pending: Option<f64>,
    pub processing: Option<f64>,
    pub paid: Option<f64>,
    pub failed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentStatusDistribution {
    pub counts: StatusCounts,
    pub percentages: StatusPercentages,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeePerformance {
    pub id: Uuid,
    pub name: String,
    pub department: String,
    pub position: String,
    /// Net salary of the most recent period
    pub latest_salary: f64,
    pub average_salary: f64,
    pub overtime_hours: f64,
    pub bonus_total: f64,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledValue<T> {
    pub label: T,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeriesPoint {
    pub period: String,
    pub salary: f64,
    pub employees: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub salary_distribution: Vec<LabeledValue<String>>,
    pub payment_status: Vec<LabeledValue<PaymentStatus>>,
    pub salary_trends: Vec<TrendSeriesPoint>,
    pub deduction_ratio: Vec<LabeledValue<&'static str>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    #[serde(flatten)]
    pub totals: Totals,
    pub salary_by_department: BTreeMap<String, DepartmentStats>,
    pub salary_by_position: BTreeMap<String, PositionStats>,
    pub salary_trend: Vec<TrendPoint>,
    pub allocation_by_component: ComponentAllocation,
    pub deduction_breakdown: DeductionBreakdown,
    pub payment_status_distribution: PaymentStatusDistribution,
    pub employee_performance: Vec<EmployeePerformance>,
    pub chart_data: ChartData,
}

fn label_or_unknown(value: &str) -> String {
    if value.is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

fn average(total: f64, count: usize) -> Option<f64> {
    (count > 0).then(|| total / count as f64)
}

/// Relative change in percent, `None` when there is nothing to compare against
fn change(current: f64, previous: f64) -> Option<f64> {
    percentage(current - previous, previous)
}

fn other_deductions(payroll: &payroll::Model) -> f64 {
    let deductions = &payroll.deductions;

    deductions.health_insurance + deductions.professional_tax + deductions.loan_repayment + deductions.other
}

pub fn totals(payrolls: &[payroll::Model]) -> Totals {
    let sum = |amount: fn(&payroll::Model) -> f64| payrolls.iter().map(amount).sum::<f64>();

    let total_net_salary = sum(|payroll| payroll.net_salary);

    Totals {
        total_employees: payrolls.iter().map(|payroll| payroll.employee_id).collect::<HashSet<_>>().len(),
        records: payrolls.len(),
        total_payroll: total_net_salary,
        average_salary: average(total_net_salary, payrolls.len()),
        total_gross_salary: sum(|payroll| payroll.gross_salary),
        total_net_salary,
        total_basic_salary: sum(|payroll| payroll.basic_salary),
        total_deductions: sum(|payroll| payroll.total_deductions),
        tax_deductions: sum(|payroll| payroll.deductions.income_tax),
        pf_deductions: sum(|payroll| payroll.deductions.provident_fund),
        other_deductions: sum(other_deductions),
        bonus_distributed: sum(|payroll| payroll.bonus),
        incentives_distributed: sum(|payroll| {
            payroll.bonus_details.as_ref().map_or(0.0, |bonus| bonus.incentives + bonus.commission)
        }),
        overtime_hours_total: sum(|payroll| payroll.overtime.hours),
        overtime_amount_total: sum(|payroll| payroll.overtime.amount),
    }
}

#[derive(Default)]
struct Group {
    records: usize,
    total: f64,
    gross_salary: f64,
    basic_salary: f64,
    deductions: f64,
    bonuses: f64,
    employees: HashSet<Uuid>,
}

impl Group {
    fn add(&mut self, payroll: &payroll::Model) {
        self.records += 1;
        self.total += payroll.net_salary;
        self.gross_salary += payroll.gross_salary;
        self.basic_salary += payroll.basic_salary;
        self.deductions += payroll.total_deductions;
        self.bonuses += payroll.bonus;
        self.employees.insert(payroll.employee_id);
    }
}

fn group_by(payrolls: &[payroll::Model], key: fn(&payroll::Model) -> &str) -> BTreeMap<String, Group> {
    let mut groups = BTreeMap::<String, Group>::new();

    for payroll in payrolls {
        groups.entry(label_or_unknown(key(payroll))).or_default().add(payroll);
    }

    groups
}

#[derive(Default)]
struct MonthBucket {
    month: u32,
    year: i32,
    records: usize,
    total: f64,
    gross_salary: f64,
    taxes: f64,
    bonus: f64,
    deductions: f64,
    overtime: f64,
    employees: HashSet<Uuid>,
}

/// Chronological month-by-month trend
pub fn salary_trend(payrolls: &[payroll::Model]) -> Vec<TrendPoint> {
    let mut buckets = BTreeMap::<i64, MonthBucket>::new();

    for payroll in payrolls {
        let month = payroll.month as u32;
        let bucket = buckets.entry(utils::month_index(month, payroll.year)).or_insert_with(|| MonthBucket {
            month,
            year: payroll.year,
            ..Default::default()
        });

        bucket.records += 1;
        bucket.total += payroll.net_salary;
        bucket.gross_salary += payroll.gross_salary;
        bucket.taxes += payroll.deductions.income_tax;
        bucket.bonus += payroll.bonus;
        bucket.deductions += payroll.total_deductions;
        bucket.overtime += payroll.overtime.amount;
        bucket.employees.insert(payroll.employee_id);
    }

    let compare = |current: &MonthBucket, previous: &MonthBucket| Change {
        total_salary: change(current.total, previous.total),
        headcount: change(current.employees.len() as f64, previous.employees.len() as f64),
    };

    let mut trend = Vec::with_capacity(buckets.len());
    let mut previous: Option<&MonthBucket> = None;

    for (index, bucket) in &buckets {
        let year_ago = buckets.get(&(index - 12));

        trend.push(TrendPoint {
            period: format!("{}-{:02}", bucket.year, bucket.month),
            month_name: Month::try_from(bucket.month as u8).map_or(UNKNOWN, |month| month.name()),
            month: bucket.month,
            year: bucket.year,
            quarter: format!("Q{} {}", bucket.month.div_ceil(3), bucket.year),
            total_salary: bucket.total,
            gross_salary: bucket.gross_salary,
            average_salary: average(bucket.total, bucket.records),
            headcount: bucket.employees.len(),
            records: bucket.records,
            taxes: bucket.taxes,
            bonus: bucket.bonus,
            deductions: bucket.deductions,
            overtime: bucket.overtime,
            mom: previous.map(|previous| compare(bucket, previous)),
            yoy: year_ago.map(|year_ago| compare(bucket, year_ago)),
        });

        previous = Some(bucket);
    }

    trend
}

/// Latest record and averages per employee, ordered by name
pub fn employee_performance(payrolls: &[payroll::Model]) -> Vec<EmployeePerformance> {
    let mut by_employee = BTreeMap::<Uuid, Vec<&payroll::Model>>::new();

    for payroll in payrolls {
        by_employee.entry(payroll.employee_id).or_default().push(payroll);
    }

    let mut performance = by_employee.into_iter()
        .filter_map(|(id, records)| {
            let latest = records.iter().max_by_key(|payroll| utils::month_index(payroll.month as u32, payroll.year))?;
            let total_net = records.iter().map(|payroll| payroll.net_salary).sum::<f64>();

            Some(EmployeePerformance {
                id,
                name: label_or_unknown(&latest.employee_details.name),
                department: label_or_unknown(&latest.employee_details.department),
                position: label_or_unknown(&latest.employee_details.position),
                latest_salary: latest.net_salary,
                average_salary: total_net / records.len() as f64,
                overtime_hours: records.iter().map(|payroll| payroll.overtime.hours).sum(),
                bonus_total: records.iter().map(|payroll| payroll.bonus).sum(),
                records: records.len(),
            })
        })
        .collect::<Vec<_>>();

    performance.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    performance
}

pub fn aggregate(payrolls: &[payroll::Model]) -> AnalyticsReport {
    let totals = totals(payrolls);
    let net = totals.total_net_salary;

    let salary_by_department = group_by(payrolls, |payroll| payroll.employee_details.department.as_str())
        .into_iter()
        .map(|(department, group)| (department, DepartmentStats {
            total: group.total,
            average: average(group.total, group.records),
            employees: group.employees.len(),
            records: group.records,
            gross_salary: group.gross_salary,
            basic_salary: group.basic_salary,
            deductions: group.deductions,
            bonuses: group.bonuses,
            cost_share: percentage(group.total, net),
        }))
        .collect::<BTreeMap<_, _>>();

    let salary_by_position = group_by(payrolls, |payroll| payroll.employee_details.position.as_str())
        .into_iter()
        .map(|(position, group)| (position, PositionStats {
            total: group.total,
            average: average(group.total, group.records),
            employees: group.employees.len(),
            records: group.records,
            cost_share: percentage(group.total, net),
        }))
        .collect::<BTreeMap<_, _>>();

    let allocated = totals.total_basic_salary + totals.total_deductions + totals.bonus_distributed + totals.overtime_amount_total;
    let share = |amount: f64| ComponentShare { amount, percentage: percentage(amount, allocated) };

    let allocation_by_component = ComponentAllocation {
        basic_salary: share(totals.total_basic_salary),
        deductions: DeductionShare {
            amount: totals.total_deductions,
            percentage: percentage(totals.total_deductions, allocated),
            breakdown: DeductionAmounts {
                tax: totals.tax_deductions,
                pf: totals.pf_deductions,
                other: totals.other_deductions,
            },
        },
        bonus: share(totals.bonus_distributed),
        overtime: share(totals.overtime_amount_total),
    };

    let deduction_breakdown = DeductionBreakdown {
        tax: percentage(totals.tax_deductions, totals.total_deductions),
        pf: percentage(totals.pf_deductions, totals.total_deductions),
        others: percentage(totals.other_deductions, totals.total_deductions),
    };

    let counts = StatusCounts::of(payrolls);
    let records = counts.total() as f64;
    let payment_status_distribution = PaymentStatusDistribution {
        percentages: StatusPercentages {
            pending: percentage(counts.pending as f64, records),
            processing: percentage(counts.processing as f64, records),
            paid: percentage(counts.paid as f64, records),
            failed: percentage(counts.failed as f64, records),
        },
        counts,
    };

    let salary_trend = salary_trend(payrolls);

    let chart_data = ChartData {
        salary_distribution: salary_by_department.iter()
            .map(|(department, stats)| LabeledValue { label: department.clone(), value: stats.cost_share })
            .collect(),
        payment_status: vec![
            LabeledValue { label: PaymentStatus::Paid, value: payment_status_distribution.percentages.paid },
            LabeledValue { label: PaymentStatus::Pending, value: payment_status_distribution.percentages.pending },
            LabeledValue { label: PaymentStatus::Failed, value: payment_status_distribution.percentages.failed },
            LabeledValue { label: PaymentStatus::Processing, value: payment_status_distribution.percentages.processing },
        ],
        salary_trends: salary_trend.iter()
            .map(|point| TrendSeriesPoint {
                period: point.period.clone(),
                salary: point.total_salary,
                employees: point.headcount,
            })
            .collect(),
        deduction_ratio: vec![
            LabeledValue { label: "Tax", value: deduction_breakdown.tax },
            LabeledValue { label: "Provident Fund", value: deduction_breakdown.pf },
            LabeledValue { label: "Other", value: deduction_breakdown.others },
        ],
    };

    AnalyticsReport {
        totals,
        salary_by_department,
        salary_by_position,
        salary_trend,
        allocation_by_component,
        deduction_breakdown,
        payment_status_distribution,
        employee_performance: employee_performance(payrolls),
        chart_data,
    }
}
