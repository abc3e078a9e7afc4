//! Explicit first generation of payrolls.
//!
//! Unlike the synchronizer, generation refuses to touch an existing payroll
//! and treats days without any attendance record as absences.

use std::collections::HashSet;

use futures_util::future::join_all;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    entity::{employee, payroll::{self, AttendanceSummary}, prelude::*},
};

use super::{
    calculator::{compute_salary, Carryover, HealthInsurance, SalaryInput},
    error::{BatchItemResult, PayrollError, PayrollResult},
    reconcile::{fetch_dated_records, has_joined, one_per_day, tally, tally_overtime, MissingDays, PayPeriod, Period},
    sync::{find_payroll, link_attendance, new_payroll, save, validate_period},
};

pub async fn generate_payroll<C: ConnectionTrait>(
    db: &C,
    clock: &dyn Clock,
    employee_id: Uuid,
    month: u32,
    year: i32,
    created_by: Option<Uuid>,
) -> PayrollResult<payroll::Model> {
    validate_period(month, year)?;

    if find_payroll(db, employee_id, month, year).await?.is_some() {
        return Err(PayrollError::conflict("Payroll already exists for this employee for the specified month"));
    }

    let employee = Employee::find_by_id(employee_id)
        .one(db).await?
        .ok_or(PayrollError::NotFound("Employee"))?;

    generate_for(db, clock, &employee, month, year, created_by).await
}

async fn generate_for<C: ConnectionTrait>(
    db: &C,
    clock: &dyn Clock,
    employee: &employee::Model,
    month: u32,
    year: i32,
    created_by: Option<Uuid>,
) -> PayrollResult<payroll::Model> {
    if !has_joined(employee, month, year) {
        return Err(PayrollError::validation(format!("{} had not joined by {month:02}/{year}", employee.name)));
    }

    let period = PayPeriod::new(month, year, clock.today());
    let days_in_month = period.days_in_month;

    let (summary, records) = match period.period {
        Period::Future => (AttendanceSummary::perfect(days_in_month), Vec::new()),
        Period::Past | Period::Current { .. } => {
            let records = one_per_day(&fetch_dated_records(db, employee.id, month, year).await?);

            (tally(&records, days_in_month, MissingDays::Absent, days_in_month), records)
        }
    };

    let overtime = tally_overtime(&records);

    let breakdown = compute_salary(&SalaryInput {
        base_salary: employee.salary,
        summary,
        days_in_month,
        proration_days: days_in_month,
        overtime_hours: overtime.hours,
        overtime_rate: overtime.rate,
        carryover: Carryover::default(),
        health_insurance: HealthInsurance::FixedProrated,
    });

    let mut payroll = new_payroll(employee, month, year, clock.now(), created_by);
    payroll.attendance_summary = summary;
    breakdown.apply_to(&mut payroll);

    let payroll = save(db, payroll, true).await?;

    let record_ids = records.iter().map(|record| record.id).collect::<Vec<_>>();
    link_attendance(db, payroll.id, &record_ids).await?;

    info!(payroll = %payroll.id, employee = %employee.id, month, year, "generated payroll");

    Ok(payroll)
}

#[derive(Debug, Serialize)]
pub struct BulkGeneration {
    pub processed: usize,
    /// Employees that already had a payroll for the period
    pub skipped: usize,
    /// Employees that joined after the period
    pub not_joined: usize,
    pub results: Vec<BatchItemResult>,
    pub payrolls: Vec<payroll::Model>,
}

impl BulkGeneration {
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|result| result.success)
    }
}

/// Generates payrolls concurrently for every employee lacking one
pub async fn generate_bulk<C: ConnectionTrait>(
    db: &C,
    clock: &dyn Clock,
    month: u32,
    year: i32,
    created_by: Option<Uuid>,
) -> PayrollResult<BulkGeneration> {
    validate_period(month, year)?;

    let employees = Employee::find().all(db).await?;

    if employees.is_empty() {
        return Err(PayrollError::NotFound("Employees"));
    }

    let existing = Payroll::find()
        .filter(payroll::Column::Month.eq(month as i32))
        .filter(payroll::Column::Year.eq(year))
        .all(db).await?
        .into_iter()
        .map(|payroll| payroll.employee_id)
        .collect::<HashSet<_>>();

    let (pending, not_joined): (Vec<_>, Vec<_>) = employees.iter()
        .filter(|employee| !existing.contains(&employee.id))
        .partition(|employee| has_joined(employee, month, year));

    if pending.is_empty() {
        return Err(PayrollError::conflict("All employees already have payrolls for this period"));
    }

    let outcomes = join_all(
        pending.iter().map(|employee|
            generate_for(db, clock, employee, month, year, created_by)
        )
    ).await;

    let mut results = Vec::with_capacity(outcomes.len());
    let mut payrolls = Vec::new();

    for (employee, outcome) in pending.iter().zip(outcomes) {
        match outcome {
            Ok(payroll) => {
                results.push(BatchItemResult::succeeded(employee.id));
                payrolls.push(payroll);
            }
            Err(err) => {
                warn!(employee = %employee.id, month, year, %err, "unable to generate payroll");
                results.push(BatchItemResult::failed(employee.id, &err));
            }
        }
    }

    Ok(BulkGeneration {
        processed: payrolls.len(),
        skipped: existing.len(),
        not_joined: not_joined.len(),
        results,
        payrolls,
    })
}
