//! Bonus and incentive management.

use std::str::FromStr;

use futures_util::future::join_all;
use sea_orm::{ConnectionTrait, EntityTrait as _};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    entity::{payroll::{self, BonusDetails}, prelude::*},
};

use super::{
    error::{PayrollError, PayrollResult},
    reconcile::Period,
    sync::{find_payroll, save, sync_employee_payroll, validate_period},
};

/// One component of [`BonusDetails`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    PerformanceBonus,
    FestivalBonus,
    Incentives,
    Commission,
    OneTimeBonus,
}

impl BonusKind {
    fn slot(self, details: &mut BonusDetails) -> &mut f64 {
        match self {
            BonusKind::PerformanceBonus => &mut details.performance_bonus,
            BonusKind::FestivalBonus => &mut details.festival_bonus,
            BonusKind::Incentives => &mut details.incentives,
            BonusKind::Commission => &mut details.commission,
            BonusKind::OneTimeBonus => &mut details.one_time_bonus,
        }
    }
}

impl FromStr for BonusKind {
    type Err = PayrollError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "performance_bonus" | "performanceBonus" => Ok(BonusKind::PerformanceBonus),
            "festival_bonus" | "festivalBonus" => Ok(BonusKind::FestivalBonus),
            "incentives" => Ok(BonusKind::Incentives),
            "commission" => Ok(BonusKind::Commission),
            "one_time_bonus" | "oneTimeBonus" => Ok(BonusKind::OneTimeBonus),
            _ => Err(PayrollError::validation("Invalid bonus type")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BonusPatch {
    pub performance_bonus: Option<f64>,
    pub festival_bonus: Option<f64>,
    pub incentives: Option<f64>,
    pub commission: Option<f64>,
    pub one_time_bonus: Option<f64>,
}

fn ensure_unpaid(payroll: &payroll::Model) -> PayrollResult<()> {
    if payroll.is_paid() {
        return Err(PayrollError::conflict("Cannot change the bonus of a paid payroll"));
    }

    Ok(())
}

/// Stores `details` and makes the bonus their total
fn settle(payroll: &mut payroll::Model, details: BonusDetails) {
    payroll.bonus = details.total();
    payroll.bonus_details = Some(details);
    payroll.recompute_totals();
}

/// Overwrites the supplied bonus components of one payroll
pub async fn set_bonus<C: ConnectionTrait>(
    db: &C,
    clock: &dyn Clock,
    mut payroll: payroll::Model,
    patch: &BonusPatch,
    description: Option<&str>,
) -> PayrollResult<payroll::Model> {
    ensure_unpaid(&payroll)?;

    let mut details = payroll.bonus_details.take().unwrap_or_default();

    for (kind, amount) in [
        (BonusKind::PerformanceBonus, patch.performance_bonus),
        (BonusKind::FestivalBonus, patch.festival_bonus),
        (BonusKind::Incentives, patch.incentives),
        (BonusKind::Commission, patch.commission),
        (BonusKind::OneTimeBonus, patch.one_time_bonus),
    ] {
        if let Some(amount) = amount {
            *kind.slot(&mut details) = amount;
        }
    }

    if let Some(description) = description {
        details.description = description.to_string();
    }

    settle(&mut payroll, details);
    payroll.updated_at = clock.now();

    let payroll = save(db, payroll, false).await?;

    info!(payroll = %payroll.id, bonus = payroll.bonus, "updated bonus");

    Ok(payroll)
}

/// Bonus of one kind given to many employees for the same month
#[derive(Debug, Clone)]
pub struct BonusAssignment {
    pub kind: BonusKind,
    pub amount: f64,
    /// Appended to any existing description
    pub description: Option<String>,
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonusAwarded {
    pub employee_id: Uuid,
    pub name: String,
    pub bonus_amount: f64,
    pub total_bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonusFailure {
    pub employee_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkBonus {
    pub success: Vec<BonusAwarded>,
    pub failed: Vec<BonusFailure>,
}

/// Sets the bonus of one employee, creating the month's payroll through the
/// synchronizer when there is none yet. Future months never get one.
pub async fn assign_bonus<C: ConnectionTrait>(
    db: &C,
    clock: &dyn Clock,
    employee_id: Uuid,
    assignment: &BonusAssignment,
) -> PayrollResult<payroll::Model> {
    let BonusAssignment { kind, amount, month, year, .. } = *assignment;

    let payroll = match find_payroll(db, employee_id, month, year).await? {
        Some(payroll) => payroll,
        None => {
            let employee = Employee::find_by_id(employee_id)
                .one(db).await?
                .ok_or(PayrollError::NotFound("Employee"))?;

            if Period::of(month, year, clock.today()) == Period::Future {
                return Err(PayrollError::validation("Cannot add bonus to future month"));
            }

            sync_employee_payroll(db, clock, &employee, month, year).await?
                .ok_or_else(|| PayrollError::validation(format!("{} had not joined by {month:02}/{year}", employee.name)))?
        }
    };

    ensure_unpaid(&payroll)?;

    let mut payroll = payroll;
    let mut details = payroll.bonus_details.take().unwrap_or_default();

    *kind.slot(&mut details) = amount;

    if let Some(description) = assignment.description.as_deref().filter(|description| !description.is_empty()) {
        details.description = if details.description.is_empty() {
            description.to_string()
        } else {
            format!("{}; {description}", details.description)
        };
    }

    settle(&mut payroll, details);
    payroll.updated_at = clock.now();

    Ok(save(db, payroll, false).await?)
}

/// Assigns the bonus to every employee concurrently, collecting failures
pub async fn assign_bulk_bonus<C: ConnectionTrait>(
    db: &C,
    clock: &dyn Clock,
    employee_ids: &[Uuid],
    assignment: &BonusAssignment,
) -> PayrollResult<BulkBonus> {
    validate_period(assignment.month, assignment.year)?;

    let outcomes = join_all(
        employee_ids.iter().map(|employee_id|
            assign_bonus(db, clock, *employee_id, assignment)
        )
    ).await;

    let mut bulk = BulkBonus::default();

    for (employee_id, outcome) in employee_ids.iter().zip(outcomes) {
        match outcome {
            Ok(payroll) => bulk.success.push(BonusAwarded {
                employee_id: *employee_id,
                name: payroll.employee_details.name,
                bonus_amount: assignment.amount,
                total_bonus: payroll.bonus,
            }),
            Err(err) => {
                warn!(employee = %employee_id, %err, "unable to assign bonus");
                bulk.failed.push(BonusFailure { employee_id: *employee_id, reason: err.to_string() });
            }
        }
    }

    info!(
        kind = ?assignment.kind, month = assignment.month, year = assignment.year,
        success = bulk.success.len(), failed = bulk.failed.len(), "assigned bulk bonus"
    );

    Ok(bulk)
}
