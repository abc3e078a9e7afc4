//! Keeps stored payrolls consistent with attendance and employee data.

use chrono::{DateTime, FixedOffset};
use futures_util::future::join_all;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait as _, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    IntoActiveModel as _, QueryFilter,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    consts::{DEFAULT_OVERTIME_RATE, DEFAULT_PAYMENT_METHOD},
    entity::{
        attendance, employee,
        payroll::{self, EmployeeDetails},
        prelude::*,
        sea_orm_active_enums::PaymentStatus,
    },
    utils,
};

use super::{
    calculator::{compute_salary, Carryover, HealthInsurance, SalaryInput},
    error::{PayrollError, PayrollResult},
    reconcile::{reconcile, OvertimeTally, PayPeriod, Reconciliation},
};

/// What automatic recalculation may touch on a stored payroll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    Unlocked,
    /// Figures were edited by hand and stay as stored
    ManuallyEdited,
    /// Paid out, figures are final
    Paid,
}

impl Lock {
    pub fn of(payroll: &payroll::Model) -> Self {
        if payroll.is_paid() {
            Lock::Paid
        } else if payroll.manually_edited {
            Lock::ManuallyEdited
        } else {
            Lock::Unlocked
        }
    }
}

pub fn validate_period(month: u32, year: i32) -> PayrollResult<()> {
    if !(1..=12).contains(&month) {
        return Err(PayrollError::validation("Month must be between 1 and 12"));
    }

    if year < 1 {
        return Err(PayrollError::validation("Year must be a positive number"));
    }

    Ok(())
}

pub async fn find_payroll<C: ConnectionTrait>(
    db: &C,
    employee_id: Uuid,
    month: u32,
    year: i32,
) -> Result<Option<payroll::Model>, DbErr> {
    Payroll::find()
        .filter(payroll::Column::EmployeeId.eq(employee_id))
        .filter(payroll::Column::Month.eq(month as i32))
        .filter(payroll::Column::Year.eq(year))
        .one(db).await
}

/// Pending payroll without any figures yet
pub fn new_payroll(
    employee: &employee::Model,
    month: u32,
    year: i32,
    now: DateTime<FixedOffset>,
    created_by: Option<Uuid>,
) -> payroll::Model {
    payroll::Model {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        employee_id: employee.id,
        month: month as i32,
        year,
        employee_details: EmployeeDetails::from(employee),
        original_salary: employee.salary,
        basic_salary: 0.0,
        allowances: Default::default(),
        deductions: Default::default(),
        leave_deduction: 0.0,
        overtime: Default::default(),
        bonus: 0.0,
        bonus_details: None,
        attendance_summary: Default::default(),
        gross_salary: 0.0,
        total_deductions: 0.0,
        net_salary: 0.0,
        payment_status: PaymentStatus::Pending,
        payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
        payment_date: None,
        remarks: None,
        manually_edited: false,
        is_auto_generated: false,
        last_calculated: now,
        created_by,
    }
}

/// Inserts or overwrites every column of the payroll
pub async fn save<C: ConnectionTrait>(db: &C, payroll: payroll::Model, is_new: bool) -> Result<payroll::Model, DbErr> {
    let active = payroll.into_active_model().reset_all();

    if is_new {
        active.insert(db).await
    } else {
        active.update(db).await
    }
}

/// Points the attendance records at the payroll they were folded into
pub async fn link_attendance<C: ConnectionTrait>(db: &C, payroll_id: Uuid, record_ids: &[Uuid]) -> Result<(), DbErr> {
    if record_ids.is_empty() {
        return Ok(());
    }

    Attendance::update_many()
        .col_expr(attendance::Column::PayrollId, Expr::value(payroll_id))
        .filter(attendance::Column::Id.is_in(record_ids.iter().copied()))
        .exec(db).await?;

    Ok(())
}

/// Syncs the payroll of one employee, see [`sync_employee_payroll`]
pub async fn sync_payroll<C: ConnectionTrait>(
    db: &C,
    clock: &dyn Clock,
    employee_id: Uuid,
    month: u32,
    year: i32,
) -> PayrollResult<Option<payroll::Model>> {
    let employee = Employee::find_by_id(employee_id)
        .one(db).await?
        .ok_or(PayrollError::NotFound("Employee"))?;

    sync_employee_payroll(db, clock, &employee, month, year).await
}

/// Creates or refreshes the payroll of `employee` for the period.
///
/// Returns `None` when the employee had not joined yet. Otherwise the
/// attendance summary, employee snapshot and calculation time are always
/// refreshed, while the monetary figures are only recomputed for payrolls
/// that are neither manually edited nor paid.
///
/// A past month without any attendance gets synthetic figures once, when
/// its payroll is created, and is marked auto generated.
pub async fn sync_employee_payroll<C: ConnectionTrait>(
    db: &C,
    clock: &dyn Clock,
    employee: &employee::Model,
    month: u32,
    year: i32,
) -> PayrollResult<Option<payroll::Model>> {
    validate_period(month, year)?;

    let now = clock.now();
    let period = PayPeriod::new(month, year, clock.today());

    let no_overtime = OvertimeTally { hours: 0.0, rate: DEFAULT_OVERTIME_RATE };

    let mut future = false;

    let (summary, overtime, record_ids, synthetic) = match reconcile(db, employee, &period).await? {
        Reconciliation::NotApplicable => {
            info!(employee = %employee.id, month, year, "employee had not joined yet, no payroll");
            return Ok(None);
        }
        Reconciliation::Future(summary) => {
            future = true;
            (summary, no_overtime, Vec::new(), false)
        }
        Reconciliation::Synthetic(summary) => (summary, no_overtime, Vec::new(), true),
        Reconciliation::Recorded(recorded) => (recorded.summary, recorded.overtime, recorded.record_ids, false),
    };

    let existing = find_payroll(db, employee.id, month, year).await?;
    let is_new = existing.is_none();
    let mut payroll = existing.unwrap_or_else(|| new_payroll(employee, month, year, now, None));

    if synthetic && !is_new {
        debug!(payroll = %payroll.id, "no attendance for a past month, keeping stored figures");
    } else {
        let breakdown = compute_salary(&SalaryInput {
            base_salary: employee.salary,
            summary,
            days_in_month: period.days_in_month,
            proration_days: period.proration_days(),
            overtime_hours: overtime.hours,
            overtime_rate: overtime.rate,
            carryover: Carryover::from(&payroll),
            health_insurance: if synthetic {
                HealthInsurance::FixedProrated
            } else {
                HealthInsurance::CappedShareOfBasic
            },
        });

        payroll.attendance_summary = summary;
        payroll.is_auto_generated |= synthetic;

        // Future months always show the full salary, unless already paid out
        if future && !payroll.is_paid() {
            payroll.manually_edited = false;
        }

        match Lock::of(&payroll) {
            Lock::Unlocked => breakdown.apply_to(&mut payroll),
            lock => info!(payroll = %payroll.id, ?lock, "payroll is locked, keeping stored figures"),
        }
    }

    payroll.employee_details = EmployeeDetails::from(employee);
    payroll.last_calculated = now;
    payroll.updated_at = now;

    let payroll = save(db, payroll, is_new).await?;
    link_attendance(db, payroll.id, &record_ids).await?;

    info!(
        payroll = %payroll.id, employee = %employee.id, month, year, created = is_new,
        net_salary = payroll.net_salary, "synced payroll"
    );

    Ok(Some(payroll))
}

/// Syncs every employee concurrently.
///
/// A failure only costs that employee's payroll for this round, it is logged
/// and left for the next read.
pub async fn sync_all<C: ConnectionTrait>(
    db: &C,
    clock: &dyn Clock,
    employees: &[employee::Model],
    month: u32,
    year: i32,
) -> Vec<payroll::Model> {
    let results = join_all(
        employees.iter().map(|employee|
            sync_employee_payroll(db, clock, employee, month, year)
        )
    ).await;

    employees.iter().zip(results)
        .filter_map(|(employee, result)| match result {
            Ok(payroll) => payroll,
            Err(err) => {
                warn!(employee = %employee.id, month, year, %err, "unable to sync payroll");
                None
            }
        })
        .collect()
}

/// Recomputes every figure from the stored attendance summary and clears
/// the manual edit flag. Paid payrolls are final.
pub async fn recalculate_payroll<C: ConnectionTrait>(
    db: &C,
    clock: &dyn Clock,
    mut payroll: payroll::Model,
) -> PayrollResult<payroll::Model> {
    if payroll.is_paid() {
        return Err(PayrollError::conflict("Cannot recalculate a payroll that has already been paid"));
    }

    let employee = Employee::find_by_id(payroll.employee_id)
        .one(db).await?
        .ok_or(PayrollError::NotFound("Employee"))?;

    let days_in_month = utils::days_in_month(payroll.month as u32, payroll.year);
    let base_salary = if payroll.original_salary > 0.0 {
        payroll.original_salary
    } else {
        employee.salary
    };

    let breakdown = compute_salary(&SalaryInput {
        base_salary,
        summary: payroll.attendance_summary,
        days_in_month,
        proration_days: days_in_month,
        overtime_hours: payroll.overtime.hours,
        overtime_rate: payroll.overtime.rate,
        carryover: Carryover::from(&payroll),
        health_insurance: HealthInsurance::FixedProrated,
    });

    breakdown.apply_to(&mut payroll);

    let now = clock.now();
    payroll.manually_edited = false;
    payroll.employee_details = EmployeeDetails::from(&employee);
    payroll.last_calculated = now;
    payroll.updated_at = now;

    let payroll = save(db, payroll, false).await?;

    info!(payroll = %payroll.id, net_salary = payroll.net_salary, "recalculated payroll");

    Ok(payroll)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{
        clock::FixedClock,
        entity::sea_orm_active_enums::AttendanceStatus,
        testing::{attendance_fixture, employee_fixture, insert_attendance, insert_employee, setup_db},
    };

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn assert_net_invariant(payroll: &payroll::Model) {
        assert!((payroll.net_salary - (payroll.gross_salary - payroll.total_deductions)).abs() < 1e-6);
    }

    #[test]
    fn test_validate_period() {
        assert!(validate_period(1, 2025).is_ok());
        assert!(validate_period(12, 2025).is_ok());
        assert!(matches!(validate_period(0, 2025), Err(PayrollError::Validation(_))));
        assert!(matches!(validate_period(13, 2025), Err(PayrollError::Validation(_))));
    }

    #[actix_web::test]
    async fn test_sync_before_joining() {
        let db = setup_db().await;
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let employee = insert_employee(&db, employee_fixture("Kiran", 20_000.0, (2025, 5, 12))).await;

        let payroll = sync_payroll(&db, &clock, employee.id, 4, 2025).await.unwrap();

        assert!(payroll.is_none());
        assert!(find_payroll(&db, employee.id, 4, 2025).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_sync_unknown_employee() {
        let db = setup_db().await;
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let result = sync_payroll(&db, &clock, Uuid::new_v4(), 4, 2025).await;

        assert!(matches!(result, Err(PayrollError::NotFound("Employee"))));
    }

    #[actix_web::test]
    async fn test_sync_future_month_pays_full_salary() {
        let db = setup_db().await;
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let employee = insert_employee(&db, employee_fixture("Kiran", 20_000.0, (2024, 5, 12))).await;

        let payroll = sync_payroll(&db, &clock, employee.id, 9, 2025).await.unwrap().unwrap();

        assert_eq!(payroll.attendance_summary.present, 30);
        assert_eq!(payroll.attendance_summary.total_working_days, 30);
        assert_eq!(payroll.basic_salary, payroll.original_salary);
        assert!(!payroll.manually_edited);
        assert_net_invariant(&payroll);
    }

    #[actix_web::test]
    async fn test_sync_past_month_with_records() {
        let db = setup_db().await;
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let employee = insert_employee(&db, employee_fixture("Kiran", 15_000.0, (2024, 5, 12))).await;

        let mut records = Vec::new();
        for day in 1..=20 {
            records.push(insert_attendance(&db, attendance_fixture(&employee, date(2025, 4, day), AttendanceStatus::Present)).await);
        }
        insert_attendance(&db, attendance_fixture(&employee, date(2025, 4, 21), AttendanceStatus::Absent)).await;
        insert_attendance(&db, attendance_fixture(&employee, date(2025, 4, 22), AttendanceStatus::Absent)).await;
        insert_attendance(&db, attendance_fixture(&employee, date(2025, 4, 23), AttendanceStatus::Late)).await;

        let payroll = sync_payroll(&db, &clock, employee.id, 4, 2025).await.unwrap().unwrap();

        assert_eq!(payroll.attendance_summary.present, 20);
        assert_eq!(payroll.attendance_summary.on_leave, 7);
        assert_eq!(payroll.attendance_summary.working_days, 30);
        assert_eq!(payroll.basic_salary, 10_500.0);
        assert_eq!(payroll.employee_details.name, "Kiran");
        assert!(!payroll.is_auto_generated);
        assert_net_invariant(&payroll);

        let linked = Attendance::find_by_id(records[0].id).one(&db).await.unwrap().unwrap();
        assert_eq!(linked.payroll_id, Some(payroll.id));
    }

    #[actix_web::test]
    async fn test_sync_is_idempotent() {
        let db = setup_db().await;
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let employee = insert_employee(&db, employee_fixture("Kiran", 15_000.0, (2024, 5, 12))).await;
        for day in 1..=12 {
            insert_attendance(&db, attendance_fixture(&employee, date(2025, 6, day), AttendanceStatus::Present)).await;
        }

        let first = sync_payroll(&db, &clock, employee.id, 6, 2025).await.unwrap().unwrap();
        let second = sync_payroll(&db, &clock, employee.id, 6, 2025).await.unwrap().unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.gross_salary, second.gross_salary);
        assert_eq!(first.net_salary, second.net_salary);
        assert_eq!(first.attendance_summary, second.attendance_summary);
        assert_eq!(Payroll::find().all(&db).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_sync_keeps_manual_edits() {
        let db = setup_db().await;
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let employee = insert_employee(&db, employee_fixture("Kiran", 15_000.0, (2024, 5, 12))).await;
        for day in 1..=10 {
            insert_attendance(&db, attendance_fixture(&employee, date(2025, 5, day), AttendanceStatus::Present)).await;
        }

        let mut payroll = sync_payroll(&db, &clock, employee.id, 5, 2025).await.unwrap().unwrap();
        payroll.allowances.special = 2_500.0;
        payroll.manually_edited = true;
        payroll.recompute_totals();
        let edited = save(&db, payroll, false).await.unwrap();

        // More attendance shows up later
        for day in 11..=20 {
            insert_attendance(&db, attendance_fixture(&employee, date(2025, 5, day), AttendanceStatus::Present)).await;
        }

        let synced = sync_payroll(&db, &clock, employee.id, 5, 2025).await.unwrap().unwrap();

        assert_eq!(synced.gross_salary, edited.gross_salary);
        assert_eq!(synced.net_salary, edited.net_salary);
        assert_eq!(synced.allowances, edited.allowances);
        assert_eq!(synced.deductions, edited.deductions);
        assert_eq!(synced.attendance_summary.present, 20);
        assert!(synced.manually_edited);
    }

    #[actix_web::test]
    async fn test_future_sync_restores_full_salary() {
        let db = setup_db().await;
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let employee = insert_employee(&db, employee_fixture("Kiran", 15_000.0, (2024, 5, 12))).await;

        let payroll = sync_payroll(&db, &clock, employee.id, 9, 2025).await.unwrap().unwrap();

        let mut edited = payroll.clone();
        edited.basic_salary = 1_000.0;
        edited.manually_edited = true;
        edited.recompute_totals();
        save(&db, edited, false).await.unwrap();

        let synced = sync_payroll(&db, &clock, employee.id, 9, 2025).await.unwrap().unwrap();

        assert!(!synced.manually_edited);
        assert_eq!(synced.basic_salary, payroll.basic_salary);
        assert_eq!(synced.net_salary, payroll.net_salary);
    }

    #[actix_web::test]
    async fn test_future_sync_keeps_paid_record_edited() {
        let db = setup_db().await;
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let employee = insert_employee(&db, employee_fixture("Kiran", 15_000.0, (2024, 5, 12))).await;

        let mut payroll = sync_payroll(&db, &clock, employee.id, 9, 2025).await.unwrap().unwrap();
        payroll.basic_salary = 1_000.0;
        payroll.manually_edited = true;
        payroll.payment_status = PaymentStatus::Paid;
        payroll.recompute_totals();
        let paid = save(&db, payroll, false).await.unwrap();

        let synced = sync_payroll(&db, &clock, employee.id, 9, 2025).await.unwrap().unwrap();

        assert!(synced.manually_edited);
        assert_eq!(synced.basic_salary, paid.basic_salary);
        assert_eq!(synced.net_salary, paid.net_salary);
    }

    #[actix_web::test]
    async fn test_sync_keeps_paid_figures() {
        let db = setup_db().await;
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let employee = insert_employee(&db, employee_fixture("Kiran", 15_000.0, (2024, 5, 12))).await;
        insert_attendance(&db, attendance_fixture(&employee, date(2025, 5, 2), AttendanceStatus::Present)).await;

        let mut payroll = sync_payroll(&db, &clock, employee.id, 5, 2025).await.unwrap().unwrap();
        payroll.payment_status = PaymentStatus::Paid;
        payroll.payment_date = Some(clock.now());
        let paid = save(&db, payroll, false).await.unwrap();

        insert_attendance(&db, attendance_fixture(&employee, date(2025, 5, 3), AttendanceStatus::Present)).await;

        let synced = sync_payroll(&db, &clock, employee.id, 5, 2025).await.unwrap().unwrap();

        assert_eq!(synced.net_salary, paid.net_salary);
        assert_eq!(synced.payment_status, PaymentStatus::Paid);
        assert_eq!(synced.payment_date, paid.payment_date);
        assert_eq!(synced.attendance_summary.present, 2);
    }

    #[actix_web::test]
    async fn test_sync_past_month_without_records_is_synthetic() {
        let db = setup_db().await;
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let employee = insert_employee(&db, employee_fixture("Kiran", 15_000.0, (2024, 5, 12))).await;

        let first = sync_payroll(&db, &clock, employee.id, 3, 2025).await.unwrap().unwrap();

        assert!(first.is_auto_generated);
        assert_eq!(first.attendance_summary.present, 24);
        assert_net_invariant(&first);

        let second = sync_payroll(&db, &clock, employee.id, 3, 2025).await.unwrap().unwrap();

        assert_eq!(second.net_salary, first.net_salary);
        assert_eq!(second.attendance_summary, first.attendance_summary);
    }

    #[actix_web::test]
    async fn test_sync_all_skips_employees_not_yet_joined() {
        let db = setup_db().await;
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let joined = insert_employee(&db, employee_fixture("Kiran", 15_000.0, (2024, 5, 12))).await;
        let late_joiner = insert_employee(&db, employee_fixture("Lata", 15_000.0, (2025, 6, 1))).await;

        let payrolls = sync_all(&db, &clock, &[joined.clone(), late_joiner], 5, 2025).await;

        assert_eq!(payrolls.len(), 1);
        assert_eq!(payrolls[0].employee_id, joined.id);
    }

    #[actix_web::test]
    async fn test_recalculate_clears_manual_edit() {
        let db = setup_db().await;
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let employee = insert_employee(&db, employee_fixture("Kiran", 30_000.0, (2024, 5, 12))).await;

        let mut payroll = sync_payroll(&db, &clock, employee.id, 9, 2025).await.unwrap().unwrap();
        payroll.basic_salary = 1.0;
        payroll.manually_edited = true;
        payroll.recompute_totals();
        let edited = save(&db, payroll, false).await.unwrap();

        let recalculated = recalculate_payroll(&db, &clock, edited).await.unwrap();

        assert!(!recalculated.manually_edited);
        assert_eq!(recalculated.basic_salary, 30_000.0);
        assert_eq!(recalculated.deductions.health_insurance, 20.0);
        assert_net_invariant(&recalculated);
    }

    #[actix_web::test]
    async fn test_recalculate_paid_fails() {
        let db = setup_db().await;
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let employee = insert_employee(&db, employee_fixture("Kiran", 30_000.0, (2024, 5, 12))).await;

        let mut payroll = sync_payroll(&db, &clock, employee.id, 9, 2025).await.unwrap().unwrap();
        payroll.payment_status = PaymentStatus::Paid;
        let paid = save(&db, payroll, false).await.unwrap();

        let result = recalculate_payroll(&db, &clock, paid).await;

        assert!(matches!(result, Err(PayrollError::Conflict(_))));
    }
}
