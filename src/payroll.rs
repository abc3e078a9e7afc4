//! Payroll engine: attendance reconciliation, salary calculation and the
//! synchronizer that keeps stored payrolls up to date, plus the tax and
//! analytics calculators that work on their own.

pub mod analytics;
pub mod bonus;
pub mod calculator;
pub mod edit;
pub mod error;
pub mod generate;
pub mod payment;
pub mod reconcile;
pub mod snapshot;
pub mod sync;
pub mod tax;

pub use error::{BatchItemResult, PayrollError, PayrollResult};
