//! Slab based annual income tax for the old and new regimes.

use serde::{Deserialize, Serialize};

use crate::utils::{percentage, round2};

use super::error::PayrollError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxRegime {
    #[default]
    Old,
    New,
}

impl TaxRegime {
    pub fn slabs(self) -> &'static [TaxSlab] {
        match self {
            TaxRegime::Old => &OLD_REGIME_SLABS,
            TaxRegime::New => &NEW_REGIME_SLABS,
        }
    }

    pub fn other(self) -> Self {
        match self {
            TaxRegime::Old => TaxRegime::New,
            TaxRegime::New => TaxRegime::Old,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TaxRegime::Old => "Old regime: higher slab rates with deductions under 80C, 80D and loan interest",
            TaxRegime::New => "New regime: lower slab rates without deductions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaxSlab {
    pub start: f64,
    /// `None` for the open-ended top bracket
    pub end: Option<f64>,
    pub rate: f64,
    pub description: &'static str,
}

const fn slab(start: f64, end: Option<f64>, rate: f64, description: &'static str) -> TaxSlab {
    TaxSlab { start, end, rate, description }
}

pub const OLD_REGIME_SLABS: [TaxSlab; 7] = [
    slab(0.0, Some(250_000.0), 0.0, "Nil (0-2.5L)"),
    slab(250_000.0, Some(500_000.0), 0.05, "5% (2.5L-5L)"),
    slab(500_000.0, Some(750_000.0), 0.10, "10% (5L-7.5L)"),
    slab(750_000.0, Some(1_000_000.0), 0.15, "15% (7.5L-10L)"),
    slab(1_000_000.0, Some(1_250_000.0), 0.20, "20% (10L-12.5L)"),
    slab(1_250_000.0, Some(1_500_000.0), 0.25, "25% (12.5L-15L)"),
    slab(1_500_000.0, None, 0.30, "30% (>15L)"),
];

pub const NEW_REGIME_SLABS: [TaxSlab; 6] = [
    slab(0.0, Some(300_000.0), 0.0, "Nil (0-3L)"),
    slab(300_000.0, Some(600_000.0), 0.05, "5% (3L-6L)"),
    slab(600_000.0, Some(900_000.0), 0.10, "10% (6L-9L)"),
    slab(900_000.0, Some(1_200_000.0), 0.15, "15% (9L-12L)"),
    slab(1_200_000.0, Some(1_500_000.0), 0.20, "20% (12L-15L)"),
    slab(1_500_000.0, None, 0.30, "30% (>15L)"),
];

const SECTION_80C_CAP: f64 = 150_000.0;
const SECTION_80D_CAP: f64 = 25_000.0;
const HOUSING_LOAN_INTEREST_CAP: f64 = 200_000.0;
const TOTAL_DEDUCTIONS_CAP: f64 = 500_000.0;

/// `(taxable income above, rate)`, highest first
const SURCHARGE_TIERS: [(f64, f64); 3] = [
    (10_000_000.0, 0.15),
    (7_500_000.0, 0.10),
    (5_000_000.0, 0.05),
];

const CESS_RATE: f64 = 0.04;

/// Deductions claimed by the employee
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxDeductionClaims {
    pub section_80c: f64,
    pub section_80d: f64,
    pub housing_loan_interest: f64,
    pub education_loan_interest: f64,
    pub other: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeductionLine {
    pub claimed: f64,
    pub allowed: f64,
    pub max_limit: Option<f64>,
}

impl DeductionLine {
    fn capped(claimed: f64, cap: Option<f64>) -> Self {
        let claimed = claimed.max(0.0);
        let allowed = cap.map_or(claimed, |cap| claimed.min(cap));

        Self { claimed, allowed, max_limit: cap }
    }

    fn denied(claimed: f64, cap: Option<f64>) -> Self {
        Self { claimed: claimed.max(0.0), allowed: 0.0, max_limit: cap }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllowedDeductions {
    pub section_80c: DeductionLine,
    pub section_80d: DeductionLine,
    pub housing_loan_interest: DeductionLine,
    pub education_loan_interest: DeductionLine,
    pub other: DeductionLine,
    /// Sum of the allowed amounts after the overall cap
    pub total: f64,
}

impl AllowedDeductions {
    pub fn for_regime(claims: &TaxDeductionClaims, regime: TaxRegime) -> Self {
        let line = match regime {
            TaxRegime::Old => DeductionLine::capped,
            TaxRegime::New => DeductionLine::denied,
        };

        let section_80c = line(claims.section_80c, Some(SECTION_80C_CAP));
        let section_80d = line(claims.section_80d, Some(SECTION_80D_CAP));
        let housing_loan_interest = line(claims.housing_loan_interest, Some(HOUSING_LOAN_INTEREST_CAP));
        let education_loan_interest = line(claims.education_loan_interest, None);
        let other = line(claims.other, None);

        let total = [section_80c, section_80d, housing_loan_interest, education_loan_interest, other]
            .iter()
            .map(|line| line.allowed)
            .sum::<f64>()
            .min(TOTAL_DEDUCTIONS_CAP);

        Self { section_80c, section_80d, housing_loan_interest, education_loan_interest, other, total }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlabTax {
    pub bracket_start: f64,
    pub bracket_end: Option<f64>,
    pub tax_rate: f64,
    pub description: &'static str,
    pub taxable_amount: f64,
    pub tax_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxBreakdown {
    pub regime: TaxRegime,
    pub annual_income: f64,
    pub deductions: AllowedDeductions,
    pub taxable_income: f64,
    pub slabs: Vec<SlabTax>,
    pub base_tax: f64,
    pub surcharge_rate: f64,
    pub surcharge: f64,
    pub cess: f64,
    pub total_tax: f64,
    pub monthly_tax: f64,
    /// Total tax as a percentage of the annual income
    pub effective_rate: Option<f64>,
}

pub fn calculate_tax(annual_income: f64, claims: &TaxDeductionClaims, regime: TaxRegime) -> TaxBreakdown {
    let deductions = AllowedDeductions::for_regime(claims, regime);
    let taxable_income = (annual_income - deductions.total).max(0.0);

    let mut slabs = Vec::new();

    for slab in regime.slabs() {
        if taxable_income <= slab.start {
            break;
        }

        let width = slab.end.map_or(f64::INFINITY, |end| end - slab.start);
        let taxable_amount = (taxable_income - slab.start).min(width);

        slabs.push(SlabTax {
            bracket_start: slab.start,
            bracket_end: slab.end,
            tax_rate: slab.rate,
            description: slab.description,
            taxable_amount,
            tax_amount: taxable_amount * slab.rate,
        });

        if slab.end.is_none_or(|end| taxable_income <= end) {
            break;
        }
    }

    let base_tax = slabs.iter().map(|slab| slab.tax_amount).sum::<f64>();
    let surcharge_rate = surcharge_rate(taxable_income, regime);
    let surcharge = base_tax * surcharge_rate;
    let cess = (base_tax + surcharge) * CESS_RATE;
    let total_tax = base_tax + surcharge + cess;

    TaxBreakdown {
        regime,
        annual_income,
        deductions,
        taxable_income,
        slabs,
        base_tax: round2(base_tax),
        surcharge_rate,
        surcharge: round2(surcharge),
        cess: round2(cess),
        total_tax: round2(total_tax),
        monthly_tax: round2(total_tax / 12.0),
        effective_rate: percentage(total_tax, annual_income).map(round2),
    }
}

/// Surcharge only exists in the old regime
fn surcharge_rate(taxable_income: f64, regime: TaxRegime) -> f64 {
    if regime != TaxRegime::Old {
        return 0.0;
    }

    SURCHARGE_TIERS.iter()
        .find(|(threshold, _)| taxable_income > *threshold)
        .map_or(0.0, |(_, rate)| *rate)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimeComparison {
    pub regime: TaxRegime,
    pub total_tax: f64,
    pub effective_rate: Option<f64>,
    /// Positive when the requested regime is cheaper than this one
    pub savings: f64,
    pub recommended: TaxRegime,
}

/// Computes the tax under the other regime for comparison
pub fn compare_regimes(annual_income: f64, claims: &TaxDeductionClaims, chosen: &TaxBreakdown) -> RegimeComparison {
    let alternative = calculate_tax(annual_income, claims, chosen.regime.other());

    let recommended = if alternative.total_tax < chosen.total_tax {
        alternative.regime
    } else {
        chosen.regime
    };

    RegimeComparison {
        regime: alternative.regime,
        total_tax: alternative.total_tax,
        effective_rate: alternative.effective_rate,
        savings: round2(alternative.total_tax - chosen.total_tax),
        recommended,
    }
}

/// Indian financial year written as `2024-2025`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinancialYear {
    pub start: i32,
    pub end: i32,
}

impl std::str::FromStr for FinancialYear {
    type Err = PayrollError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || PayrollError::validation("Financial year must be in the format YYYY-YYYY");

        let (start, end) = value.trim().split_once('-').ok_or_else(invalid)?;

        if start.len() != 4 || end.len() != 4 {
            return Err(invalid());
        }

        let start = start.parse::<i32>().map_err(|_| invalid())?;
        let end = end.parse::<i32>().map_err(|_| invalid())?;

        if end != start + 1 {
            return Err(invalid());
        }

        Ok(Self { start, end })
    }
}
