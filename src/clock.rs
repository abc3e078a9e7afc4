use chrono::{DateTime, FixedOffset, Local, NaiveDate};

/// Source of "now" for every date-dependent payroll rule
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock in the server's local timezone
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock frozen at a given instant
#[cfg(test)]
pub struct FixedClock(pub DateTime<FixedOffset>);

#[cfg(test)]
impl FixedClock {
    /// Noon UTC on the given day
    pub fn on(year: i32, month: u32, day: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let noon = date.and_hms_opt(12, 0, 0)?.and_utc().fixed_offset();

        Some(Self(noon))
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
