use chrono::{Datelike, NaiveDate, Weekday};

/// How forecast steps map onto calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForecastCalendar {
    /// Monday to Friday only
    #[default]
    BusinessDays,
    /// Every calendar day
    Daily,
}

impl ForecastCalendar {
    pub fn includes(&self, date: NaiveDate) -> bool {
        match self {
            ForecastCalendar::Daily => true,
            ForecastCalendar::BusinessDays => {
                !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
            }
        }
    }

    /// The `count` dates following `last_observed`, exclusive.
    /// Stops early only at the end of chrono's date range.
    pub fn dates_after(&self, last_observed: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut dates = Vec::with_capacity(count);
        let mut current = last_observed;

        while dates.len() < count {
            let Some(next) = current.succ_opt() else {
                break;
            };
            if self.includes(next) {
                dates.push(next);
            }
            current = next;
        }
        dates
    }
}
