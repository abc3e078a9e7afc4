//! Business constants of the payroll engine, in rupees unless noted.

/// Allowances as a share of the prorated basic salary
pub const HOUSE_RENT_RATE: f64 = 0.40;
pub const MEDICAL_RATE: f64 = 0.10;
pub const TRAVEL_RATE: f64 = 0.05;
pub const FOOD_RATE: f64 = 0.05;

/// Monthly statutory deductions before proration
pub const PROFESSIONAL_TAX_BASE: f64 = 15.0;
pub const PROVIDENT_FUND_BASE: f64 = 48.0;
pub const HEALTH_INSURANCE_BASE: f64 = 20.0;

/// Health insurance as a share of basic salary, capped
pub const HEALTH_INSURANCE_RATE: f64 = 0.05;
pub const HEALTH_INSURANCE_CAP: f64 = 1000.0;

pub const ABSENT_DEDUCTION_PER_DAY: f64 = 100.0;
/// Share of the daily rate withheld per late day
pub const LATE_PENALTY_RATE: f64 = 0.25;
/// Share of the daily rate withheld per leave day
pub const LEAVE_PENALTY_RATE: f64 = 0.5;

/// Lowest share of the base salary ever paid out
pub const MIN_PRORATION_FACTOR: f64 = 0.1;

pub const DEFAULT_OVERTIME_RATE: f64 = 1.5;
/// Nominal month used to derive an hourly rate: (days, hours per day)
pub const NOMINAL_MONTH: (f64, f64) = (22.0, 8.0);

/// Synthetic attendance mix for past months without any record
pub const DEMO_PRESENT_SHARE: f64 = 0.80;
pub const DEMO_ABSENT_SHARE: f64 = 0.10;
pub const DEMO_LATE_SHARE: f64 = 0.05;

pub const DEFAULT_PAYMENT_METHOD: &str = "Bank Transfer";

/// Accepted range for summary queries
pub const SUMMARY_YEARS: std::ops::RangeInclusive<i32> = 2020..=2100;
