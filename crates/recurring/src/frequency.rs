use chrono::{DateTime, Days, Months, Utc};
use serde::{Deserialize, Serialize};

use docflow_core::DomainError;

/// How often a recurring schedule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "unit", content = "every", rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    EveryDays(u32),
}

impl Frequency {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Frequency::EveryDays(0) = self {
            return Err(DomainError::validation("frequency interval must be >= 1 day"));
        }
        Ok(())
    }

    /// One frequency unit after `from`.
    ///
    /// Calendar units clamp to the end of shorter months (Jan 31 + 1 month is
    /// Feb 29 in a leap year). Returns `None` on calendar overflow.
    pub fn advance(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Frequency::Daily => from.checked_add_days(Days::new(1)),
            Frequency::Weekly => from.checked_add_days(Days::new(7)),
            Frequency::Monthly => from.checked_add_months(Months::new(1)),
            Frequency::Quarterly => from.checked_add_months(Months::new(3)),
            Frequency::Yearly => from.checked_add_months(Months::new(12)),
            Frequency::EveryDays(n) => from.checked_add_days(Days::new(u64::from(*n))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn monthly_advances_by_calendar_month() {
        assert_eq!(Frequency::Monthly.advance(at(2024, 1, 1)), Some(at(2024, 2, 1)));
        assert_eq!(Frequency::Monthly.advance(at(2024, 1, 31)), Some(at(2024, 2, 29)));
        assert_eq!(Frequency::Quarterly.advance(at(2024, 11, 15)), Some(at(2025, 2, 15)));
    }

    #[test]
    fn day_based_units() {
        assert_eq!(Frequency::Weekly.advance(at(2024, 2, 26)), Some(at(2024, 3, 4)));
        assert_eq!(Frequency::EveryDays(10).advance(at(2024, 1, 1)), Some(at(2024, 1, 11)));
        assert!(Frequency::EveryDays(0).validate().is_err());
    }
}
