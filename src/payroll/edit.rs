//! Hand edits of stored payrolls.
//!
//! An edited payroll is locked against automatic recalculation until it is
//! explicitly recalculated.

use sea_orm::{ConnectionTrait, EntityTrait as _};
use serde::Deserialize;
use tracing::info;

use crate::{clock::Clock, entity::{payroll, prelude::*}, utils::round2};

use super::{
    error::{PayrollError, PayrollResult},
    payment::{parse_payment_date, parse_payment_status},
    sync::save,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AllowancesPatch {
    pub house_rent: Option<f64>,
    pub medical: Option<f64>,
    pub travel: Option<f64>,
    pub food: Option<f64>,
    pub special: Option<f64>,
    pub other: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeductionsPatch {
    pub professional_tax: Option<f64>,
    pub income_tax: Option<f64>,
    pub provident_fund: Option<f64>,
    pub health_insurance: Option<f64>,
    pub loan_repayment: Option<f64>,
    pub absent_deduction: Option<f64>,
    pub late_deduction: Option<f64>,
    pub other: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OvertimePatch {
    pub hours: Option<f64>,
    pub rate: Option<f64>,
    /// Defaults to `hours * rate`
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PayrollPatch {
    pub basic_salary: Option<f64>,
    pub allowances: Option<AllowancesPatch>,
    pub deductions: Option<DeductionsPatch>,
    pub overtime: Option<OvertimePatch>,
    pub bonus: Option<f64>,
    pub leave_deduction: Option<f64>,
    pub payment_status: Option<String>,
    pub payment_method: Option<String>,
    pub payment_date: Option<String>,
    pub remarks: Option<String>,
}

fn patch(field: &mut f64, value: Option<f64>) {
    if let Some(value) = value {
        *field = value;
    }
}

impl PayrollPatch {
    /// Writes every supplied field and re-derives the totals
    pub fn apply(&self, payroll: &mut payroll::Model) -> PayrollResult<()> {
        patch(&mut payroll.basic_salary, self.basic_salary);

        if let Some(allowances) = &self.allowances {
            let target = &mut payroll.allowances;
            patch(&mut target.house_rent, allowances.house_rent);
            patch(&mut target.medical, allowances.medical);
            patch(&mut target.travel, allowances.travel);
            patch(&mut target.food, allowances.food);
            patch(&mut target.special, allowances.special);
            patch(&mut target.other, allowances.other);
        }

        if let Some(deductions) = &self.deductions {
            let target = &mut payroll.deductions;
            patch(&mut target.professional_tax, deductions.professional_tax);
            patch(&mut target.income_tax, deductions.income_tax);
            patch(&mut target.provident_fund, deductions.provident_fund);
            patch(&mut target.health_insurance, deductions.health_insurance);
            patch(&mut target.loan_repayment, deductions.loan_repayment);
            patch(&mut target.absent_deduction, deductions.absent_deduction);
            patch(&mut target.late_deduction, deductions.late_deduction);
            patch(&mut target.other, deductions.other);
        }

        if let Some(overtime) = &self.overtime {
            let target = &mut payroll.overtime;
            patch(&mut target.hours, overtime.hours);
            patch(&mut target.rate, overtime.rate);
            target.amount = overtime.amount.unwrap_or_else(|| round2(target.hours * target.rate));
        }

        patch(&mut payroll.bonus, self.bonus);
        patch(&mut payroll.leave_deduction, self.leave_deduction);

        if let Some(status) = self.payment_status.as_deref().filter(|status| !status.is_empty()) {
            payroll.payment_status = parse_payment_status(status)?;
        }

        if let Some(method) = self.payment_method.as_deref().filter(|method| !method.is_empty()) {
            payroll.payment_method = method.to_string();
        }

        match self.payment_date.as_deref() {
            Some("") if !payroll.is_paid() => payroll.payment_date = None,
            Some(date) if !date.is_empty() => payroll.payment_date = Some(parse_payment_date(date)?),
            _ => {}
        }

        if let Some(remarks) = &self.remarks {
            payroll.remarks = Some(remarks.clone());
        }

        payroll.manually_edited = true;
        payroll.recompute_totals();

        Ok(())
    }
}

pub async fn update_payroll<C: ConnectionTrait>(
    db: &C,
    clock: &dyn Clock,
    mut payroll: payroll::Model,
    patch: &PayrollPatch,
) -> PayrollResult<payroll::Model> {
    patch.apply(&mut payroll)?;
    payroll.updated_at = clock.now();

    let payroll = save(db, payroll, false).await?;

    info!(payroll = %payroll.id, net_salary = payroll.net_salary, "payroll edited by hand");

    Ok(payroll)
}

/// Removes an unpaid payroll. Its attendance records are released by the
/// store's `SET NULL` reference.
pub async fn delete_payroll<C: ConnectionTrait>(db: &C, payroll: &payroll::Model) -> PayrollResult<()> {
    if payroll.is_paid() {
        return Err(PayrollError::conflict("Cannot delete a payroll that has already been paid"));
    }

    Payroll::delete_by_id(payroll.id).exec(db).await?;

    info!(payroll = %payroll.id, employee = %payroll.employee_id, "deleted payroll");

    Ok(())
}
