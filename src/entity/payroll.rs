use sea_orm::{entity::prelude::*, FromJsonQueryResult};
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::PaymentStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payroll")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub employee_id: Uuid,
    pub month: i32,
    pub year: i32,
    #[sea_orm(column_type = "JsonBinary")]
    pub employee_details: EmployeeDetails,
    pub original_salary: f64,
    pub basic_salary: f64,
    #[sea_orm(column_type = "JsonBinary")]
    pub allowances: Allowances,
    #[sea_orm(column_type = "JsonBinary")]
    pub deductions: Deductions,
    pub leave_deduction: f64,
    #[sea_orm(column_type = "JsonBinary")]
    pub overtime: Overtime,
    pub bonus: f64,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub bonus_details: Option<BonusDetails>,
    #[sea_orm(column_type = "JsonBinary")]
    pub attendance_summary: AttendanceSummary,
    pub gross_salary: f64,
    pub total_deductions: f64,
    pub net_salary: f64,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub payment_date: Option<DateTimeWithTimeZone>,
    pub remarks: Option<String>,
    pub manually_edited: bool,
    pub is_auto_generated: bool,
    pub last_calculated: DateTimeWithTimeZone,
    pub created_by: Option<Uuid>,
}

/// Employee data copied into the payroll when it is synced
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct EmployeeDetails {
    pub name: String,
    pub employee_code: String,
    pub department: String,
    pub position: String,
    pub joining_date: Date,
    pub bank_details: BankDetails,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_number: String,
    pub account_holder_name: String,
    pub ifsc_code: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Allowances {
    pub house_rent: f64,
    pub medical: f64,
    pub travel: f64,
    pub food: f64,
    pub special: f64,
    pub other: f64,
}

impl Allowances {
    pub fn total(&self) -> f64 {
        self.house_rent + self.medical + self.travel + self.food + self.special + self.other
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Deductions {
    pub professional_tax: f64,
    pub income_tax: f64,
    pub provident_fund: f64,
    pub health_insurance: f64,
    pub loan_repayment: f64,
    pub absent_deduction: f64,
    pub late_deduction: f64,
    pub other: f64,
}

impl Deductions {
    /// Sum of the itemised deductions. `leave_deduction` lives outside this map.
    pub fn total(&self) -> f64 {
        self.professional_tax
            + self.income_tax
            + self.provident_fund
            + self.health_insurance
            + self.loan_repayment
            + self.absent_deduction
            + self.late_deduction
            + self.other
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Overtime {
    pub hours: f64,
    pub rate: f64,
    pub amount: f64,
}

impl Default for Overtime {
    fn default() -> Self {
        Self {
            hours: 0.0,
            rate: crate::consts::DEFAULT_OVERTIME_RATE,
            amount: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct BonusDetails {
    pub performance_bonus: f64,
    pub festival_bonus: f64,
    pub incentives: f64,
    pub commission: f64,
    pub one_time_bonus: f64,
    pub description: String,
}

impl BonusDetails {
    pub fn total(&self) -> f64 {
        self.performance_bonus + self.festival_bonus + self.incentives + self.commission + self.one_time_bonus
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct AttendanceSummary {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub on_leave: u32,
    /// Recorded plus imputed days, always `present + absent + late + on_leave`
    pub working_days: u32,
    /// Days in the month, or days elapsed so far for the current month
    pub total_working_days: u32,
}

impl AttendanceSummary {
    /// Every day of the month attended
    pub fn perfect(days_in_month: u32) -> Self {
        Self {
            present: days_in_month,
            working_days: days_in_month,
            total_working_days: days_in_month,
            ..Default::default()
        }
    }

    /// Days that earn pay. Late days are paid, just flagged.
    pub fn paid_days(&self) -> u32 {
        self.present + self.late
    }
}

impl Model {
    /// Re-derives gross, total deductions and net from the stored components
    pub fn recompute_totals(&mut self) {
        use crate::utils::round2;

        self.gross_salary = round2(self.basic_salary + self.allowances.total() + self.overtime.amount + self.bonus);
        self.total_deductions = round2(self.deductions.total() + self.leave_deduction);
        self.net_salary = round2(self.gross_salary - self.total_deductions);
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Employee,
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendance,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
