//! Payment status transitions.

use chrono::{DateTime, FixedOffset, NaiveDate};
use sea_orm::{ActiveEnum as _, ConnectionTrait, EntityTrait as _};
use serde::Deserialize;
use tracing::info;

use crate::{
    clock::Clock,
    entity::{payroll, prelude::*, sea_orm_active_enums::PaymentStatus},
};

use super::{
    error::{PayrollError, PayrollResult},
    sync::{save, sync_employee_payroll},
};

/// Parses one of `Pending`, `Processing`, `Paid` or `Failed`
pub fn parse_payment_status(value: &str) -> PayrollResult<PaymentStatus> {
    PaymentStatus::try_from_value(&value.to_string())
        .map_err(|_| PayrollError::validation("Invalid payment status"))
}

/// Accepts an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC)
pub fn parse_payment_date(value: &str) -> PayrollResult<DateTime<FixedOffset>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime);
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().fixed_offset())
        .ok_or_else(|| PayrollError::validation("Invalid payment date"))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentUpdate {
    pub payment_status: Option<String>,
    pub payment_method: Option<String>,
    pub remarks: Option<String>,
    /// An empty string clears the date unless the payroll becomes paid
    pub payment_date: Option<String>,
}

/// Applies the payment fields of `update` on top of the payroll.
///
/// Becoming `Paid` without a date stamps the current time, unless the payroll
/// already carried a payment date from an earlier payment.
pub fn apply_payment(
    payroll: &mut payroll::Model,
    status: PaymentStatus,
    update: &PaymentUpdate,
    now: DateTime<FixedOffset>,
) -> PayrollResult<()> {
    let was_paid = payroll.is_paid();

    payroll.payment_status = status;

    if let Some(method) = update.payment_method.as_deref().filter(|method| !method.is_empty()) {
        payroll.payment_method = method.to_string();
    }

    if let Some(remarks) = update.remarks.as_deref().filter(|remarks| !remarks.is_empty()) {
        payroll.remarks = Some(remarks.to_string());
    }

    match update.payment_date.as_deref() {
        Some("") if status != PaymentStatus::Paid => payroll.payment_date = None,
        Some(date) if !date.is_empty() => payroll.payment_date = Some(parse_payment_date(date)?),
        _ if status == PaymentStatus::Paid && (!was_paid || payroll.payment_date.is_none()) => {
            payroll.payment_date = Some(now);
        }
        _ => {}
    }

    Ok(())
}

/// Syncs the payroll with the latest attendance, then records the payment.
pub async fn update_payment_status<C: ConnectionTrait>(
    db: &C,
    clock: &dyn Clock,
    payroll: payroll::Model,
    update: &PaymentUpdate,
) -> PayrollResult<payroll::Model> {
    let status = match update.payment_status.as_deref() {
        Some(status) if !status.is_empty() => parse_payment_status(status)?,
        _ => return Err(PayrollError::validation("Payment status is required")),
    };

    let month = payroll.month as u32;
    let year = payroll.year;

    let mut payroll = match Employee::find_by_id(payroll.employee_id).one(db).await? {
        Some(employee) => sync_employee_payroll(db, clock, &employee, month, year).await?
            .unwrap_or(payroll),
        None => payroll,
    };

    apply_payment(&mut payroll, status, update, clock.now())?;
    payroll.updated_at = clock.now();

    let payroll = save(db, payroll, false).await?;

    info!(payroll = %payroll.id, status = ?payroll.payment_status, "updated payment status");

    Ok(payroll)
}
