//! Attendance reconciliation.
//!
//! Turns the raw daily attendance of one employee into the
//! [`AttendanceSummary`] stored on a payroll. Which rule applies depends on
//! where the requested month sits relative to the employee's joining month
//! and to "today":
//!
//! - before joining: no payroll at all
//! - future month: perfect attendance
//! - past month without a single record: a synthetic summary, flagged on the
//!   payroll as auto generated
//! - otherwise: recorded statuses, with unrecorded past days imputed

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike as _, NaiveDate};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use tracing::debug;
use uuid::Uuid;

use crate::{
    consts::{DEFAULT_OVERTIME_RATE, DEMO_ABSENT_SHARE, DEMO_LATE_SHARE, DEMO_PRESENT_SHARE},
    entity::{attendance, employee, payroll::AttendanceSummary, prelude::*, sea_orm_active_enums::AttendanceStatus},
    utils,
};

/// Where a month sits relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Past,
    /// The month containing today; `day` is today's day of month
    Current { day: u32 },
    Future,
}

impl Period {
    pub fn of(month: u32, year: i32, today: NaiveDate) -> Self {
        let requested = utils::month_index(month, year);
        let current = utils::month_index_of(today);

        match requested.cmp(&current) {
            std::cmp::Ordering::Less => Period::Past,
            std::cmp::Ordering::Equal => Period::Current { day: today.day() },
            std::cmp::Ordering::Greater => Period::Future,
        }
    }
}

/// Month a payroll is computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayPeriod {
    pub month: u32,
    pub year: i32,
    pub days_in_month: u32,
    pub period: Period,
}

impl PayPeriod {
    pub fn new(month: u32, year: i32, today: NaiveDate) -> Self {
        Self {
            month,
            year,
            days_in_month: utils::days_in_month(month, year),
            period: Period::of(month, year, today),
        }
    }

    /// Days the salary is prorated over: days elapsed for the current month,
    /// the whole month otherwise
    pub fn proration_days(&self) -> u32 {
        match self.period {
            Period::Current { day } => day.min(self.days_in_month),
            Period::Past | Period::Future => self.days_in_month,
        }
    }
}

/// Whether the employee had joined by the requested month
pub fn has_joined(employee: &employee::Model, month: u32, year: i32) -> bool {
    utils::month_index(month, year) >= utils::month_index_of(employee.joining_date)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OvertimeTally {
    pub hours: f64,
    /// Plain mean of the rates of records carrying overtime
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAttendance {
    pub summary: AttendanceSummary,
    pub overtime: OvertimeTally,
    /// Records folded into the summary, to be linked back to the payroll
    pub record_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Requested month is before the employee joined
    NotApplicable,
    Future(AttendanceSummary),
    /// Past month without any record, filled with a plausible mix
    Synthetic(AttendanceSummary),
    Recorded(RecordedAttendance),
}

/// How days without a record are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingDays {
    /// The first `through` days of the month starting on `first` count as
    /// leave when unrecorded. Records dated outside the month take the place
    /// of such days before any leave is imputed.
    OnLeave { first: NaiveDate, through: u32 },
    /// Whatever the records do not account for in the month counts as absence
    Absent,
}

pub async fn reconcile<C: ConnectionTrait>(
    db: &C,
    employee: &employee::Model,
    period: &PayPeriod,
) -> Result<Reconciliation, DbErr> {
    if !has_joined(employee, period.month, period.year) {
        return Ok(Reconciliation::NotApplicable);
    }

    let today_day = match period.period {
        Period::Future => return Ok(Reconciliation::Future(AttendanceSummary::perfect(period.days_in_month))),
        Period::Current { day } => Some(day),
        Period::Past => None,
    };

    let Some((first, _)) = utils::month_range(period.month, period.year) else {
        return Ok(Reconciliation::NotApplicable);
    };

    let mut records = fetch_month_records(db, employee.id, period.month, period.year).await?;

    if let Some(today) = today_day.and_then(|day| first.with_day(day)) {
        // Entries dated after today are data-entry mistakes
        records.retain(|record| record.date <= today);
    }

    debug!(employee = %employee.id, month = period.month, year = period.year, records = records.len(), "fetched attendance");

    if today_day.is_none() && records.is_empty() {
        return Ok(Reconciliation::Synthetic(synthetic_summary(period.days_in_month)));
    }

    // Today's missing record is not imputed, the day is not over yet
    let (through, total_working_days) = match today_day {
        Some(day) => (day.saturating_sub(1).min(period.days_in_month), day.min(period.days_in_month)),
        None => (period.days_in_month, period.days_in_month),
    };

    // Tagged records dated in another month only fill days left unrecorded
    let (mut kept, outside): (Vec<_>, Vec<_>) = one_per_day(&records).into_iter()
        .partition(|record| in_month(record.date, first));

    let room = total_working_days.saturating_sub(kept.len() as u32) as usize;
    kept.extend(outside.into_iter().take(room));

    let summary = tally(&kept, period.days_in_month, MissingDays::OnLeave { first, through }, total_working_days);

    debug!(employee = %employee.id, ?summary, "reconciled attendance");

    Ok(Reconciliation::Recorded(RecordedAttendance {
        summary,
        overtime: tally_overtime(&kept),
        record_ids: kept.iter().map(|record| record.id).collect(),
    }))
}

/// Records tagged with the payroll period, or failing that, the records
/// dated inside the month
pub async fn fetch_month_records<C: ConnectionTrait>(
    db: &C,
    employee_id: Uuid,
    month: u32,
    year: i32,
) -> Result<Vec<attendance::Model>, DbErr> {
    let tagged = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .filter(attendance::Column::PayrollMonth.eq(month as i32))
        .filter(attendance::Column::PayrollYear.eq(year))
        .order_by_asc(attendance::Column::Date)
        .all(db).await?;

    if !tagged.is_empty() {
        return Ok(tagged);
    }

    fetch_dated_records(db, employee_id, month, year).await
}

/// Records whose date falls inside the month
pub async fn fetch_dated_records<C: ConnectionTrait>(
    db: &C,
    employee_id: Uuid,
    month: u32,
    year: i32,
) -> Result<Vec<attendance::Model>, DbErr> {
    let Some((start, end)) = utils::month_range(month, year) else {
        return Ok(Vec::new());
    };

    Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .filter(attendance::Column::Date.between(start, end))
        .order_by_asc(attendance::Column::Date)
        .all(db).await
}

fn in_month(date: NaiveDate, first: NaiveDate) -> bool {
    date.year() == first.year() && date.month() == first.month()
}

/// Keeps the first record of every date
pub fn one_per_day(records: &[attendance::Model]) -> Vec<attendance::Model> {
    let mut days = BTreeMap::new();

    for record in records {
        days.entry(record.date).or_insert_with(|| record.clone());
    }

    days.into_values().collect()
}

/// Counts statuses of at most one record per day and accounts for the days
/// without one according to `missing`
pub fn tally(
    records: &[attendance::Model],
    days_in_month: u32,
    missing: MissingDays,
    total_working_days: u32,
) -> AttendanceSummary {
    let mut summary = AttendanceSummary {
        total_working_days,
        ..Default::default()
    };

    for record in records {
        match record.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::Late => summary.late += 1,
            AttendanceStatus::OnLeave => summary.on_leave += 1,
        }
    }

    match missing {
        MissingDays::OnLeave { first, through } => {
            let recorded = records.iter().map(|record| record.date).collect::<HashSet<_>>();
            let unrecorded = first.iter_days()
                .take(through as usize)
                .filter(|date| !recorded.contains(date))
                .count() as u32;
            let outside = records.iter().filter(|record| !in_month(record.date, first)).count() as u32;

            summary.on_leave += unrecorded.saturating_sub(outside);
        }
        MissingDays::Absent => {
            let accounted = summary.present + summary.absent + summary.late + summary.on_leave;

            summary.absent += days_in_month.saturating_sub(accounted);
        }
    }

    summary.working_days = summary.present + summary.absent + summary.late + summary.on_leave;
    summary
}

pub fn tally_overtime(records: &[attendance::Model]) -> OvertimeTally {
    let with_overtime = records.iter()
        .filter(|record| record.overtime_hours.unwrap_or_default() > 0.0)
        .collect::<Vec<_>>();

    if with_overtime.is_empty() {
        return OvertimeTally { hours: 0.0, rate: DEFAULT_OVERTIME_RATE };
    }

    let hours = with_overtime.iter().map(|record| record.overtime_hours.unwrap_or_default()).sum();
    let rate = with_overtime.iter()
        .map(|record| record.overtime_rate.unwrap_or(DEFAULT_OVERTIME_RATE))
        .sum::<f64>() / with_overtime.len() as f64;

    OvertimeTally { hours, rate }
}

/// 80% present, 10% absent, 5% late, the rest on leave, each rounded down
pub fn synthetic_summary(days_in_month: u32) -> AttendanceSummary {
    let share = |ratio: f64| (days_in_month as f64 * ratio).floor() as u32;

    let present = share(DEMO_PRESENT_SHARE);
    let absent = share(DEMO_ABSENT_SHARE);
    let late = share(DEMO_LATE_SHARE);

    AttendanceSummary {
        present,
        absent,
        late,
        on_leave: days_in_month - present - absent - late,
        working_days: days_in_month,
        total_working_days: days_in_month,
    }
}
