use crate::{
    consts::*,
    entity::payroll::{self, Allowances, AttendanceSummary, Deductions, Overtime},
    utils::round2,
};

/// Health insurance formula, chosen by the computation path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthInsurance {
    /// Fixed monthly base scaled by the proration factor.
    /// Used when a payroll is generated or recalculated explicitly.
    FixedProrated,
    /// Share of the prorated basic salary up to a cap.
    /// Used when a payroll is kept in sync with attendance.
    CappedShareOfBasic,
}

/// Amounts carried over from an existing payroll that the formulas do not derive
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Carryover {
    pub special_allowance: f64,
    pub other_allowance: f64,
    pub income_tax: f64,
    pub loan_repayment: f64,
    pub other_deduction: f64,
    pub bonus: f64,
}

impl From<&payroll::Model> for Carryover {
    fn from(payroll: &payroll::Model) -> Self {
        Self {
            special_allowance: payroll.allowances.special,
            other_allowance: payroll.allowances.other,
            income_tax: payroll.deductions.income_tax,
            loan_repayment: payroll.deductions.loan_repayment,
            other_deduction: payroll.deductions.other,
            bonus: payroll.bonus,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalaryInput {
    pub base_salary: f64,
    pub summary: AttendanceSummary,
    pub days_in_month: u32,
    /// Days the paid days are measured against
    pub proration_days: u32,
    pub overtime_hours: f64,
    pub overtime_rate: f64,
    pub carryover: Carryover,
    pub health_insurance: HealthInsurance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalaryBreakdown {
    pub proration_factor: f64,
    pub original_salary: f64,
    pub basic_salary: f64,
    pub allowances: Allowances,
    pub deductions: Deductions,
    pub leave_deduction: f64,
    pub overtime: Overtime,
    pub bonus: f64,
    pub gross_salary: f64,
    pub total_deductions: f64,
    pub net_salary: f64,
}

/// Paid days over the proration days, never below the floor
pub fn proration_factor(summary: &AttendanceSummary, proration_days: u32) -> f64 {
    let factor = summary.paid_days() as f64 / proration_days.max(1) as f64;

    factor.max(MIN_PRORATION_FACTOR)
}

pub fn compute_salary(input: &SalaryInput) -> SalaryBreakdown {
    let factor = proration_factor(&input.summary, input.proration_days);
    let basic = input.base_salary * factor;

    let allowances = Allowances {
        house_rent: round2(basic * HOUSE_RENT_RATE),
        medical: round2(basic * MEDICAL_RATE),
        travel: round2(basic * TRAVEL_RATE),
        food: round2(basic * FOOD_RATE),
        special: input.carryover.special_allowance,
        other: input.carryover.other_allowance,
    };

    let daily_rate = match input.days_in_month {
        0 => 0.0,
        days => input.base_salary / days as f64,
    };

    let health_insurance = match input.health_insurance {
        HealthInsurance::FixedProrated => (HEALTH_INSURANCE_BASE * factor).round(),
        HealthInsurance::CappedShareOfBasic => round2((basic * HEALTH_INSURANCE_RATE).min(HEALTH_INSURANCE_CAP)),
    };

    let deductions = Deductions {
        professional_tax: (PROFESSIONAL_TAX_BASE * factor).round(),
        income_tax: input.carryover.income_tax,
        provident_fund: (PROVIDENT_FUND_BASE * factor).round(),
        health_insurance,
        loan_repayment: input.carryover.loan_repayment,
        absent_deduction: round2(input.summary.absent as f64 * ABSENT_DEDUCTION_PER_DAY),
        late_deduction: round2(input.summary.late as f64 * daily_rate * LATE_PENALTY_RATE),
        other: input.carryover.other_deduction,
    };

    let leave_deduction = round2(input.summary.on_leave as f64 * daily_rate * LEAVE_PENALTY_RATE);

    let (nominal_days, nominal_hours) = NOMINAL_MONTH;
    let overtime = Overtime {
        hours: input.overtime_hours,
        rate: input.overtime_rate,
        amount: round2(input.overtime_hours * input.overtime_rate * (basic / (nominal_days * nominal_hours))),
    };

    let basic_salary = round2(basic);
    let bonus = input.carryover.bonus;

    let gross_salary = round2(basic_salary + allowances.total() + overtime.amount + bonus);
    let total_deductions = round2(deductions.total() + leave_deduction);

    SalaryBreakdown {
        proration_factor: factor,
        original_salary: input.base_salary,
        basic_salary,
        allowances,
        deductions,
        leave_deduction,
        overtime,
        bonus,
        gross_salary,
        total_deductions,
        net_salary: round2(gross_salary - total_deductions),
    }
}

impl SalaryBreakdown {
    /// Overwrites every monetary field of the payroll
    pub fn apply_to(self, payroll: &mut payroll::Model) {
        payroll.original_salary = self.original_salary;
        payroll.basic_salary = self.basic_salary;
        payroll.allowances = self.allowances;
        payroll.deductions = self.deductions;
        payroll.leave_deduction = self.leave_deduction;
        payroll.overtime = self.overtime;
        payroll.bonus = self.bonus;
        payroll.gross_salary = self.gross_salary;
        payroll.total_deductions = self.total_deductions;
        payroll.net_salary = self.net_salary;
    }
}
