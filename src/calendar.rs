use crate::data::{CalendarDef, Day, Weekday};
use std::collections::BTreeSet;

/// Weekday and holiday classification for one month.
#[derive(Debug, Clone)]
pub struct Calendar {
    month_days: usize,
    first_weekday: Weekday,
    public_holidays: BTreeSet<usize>,
    /// Answered by `is_holiday(-1)`. No compiled rule looks before day 0,
    /// so it only matters to callers of the classifier.
    holiday_before: bool,
    /// Read by the holiday-eve test on the last day of the month.
    holiday_after: bool,
}

impl Calendar {
    pub fn new(def: &CalendarDef) -> Self {
        Self {
            month_days: def.month_days,
            first_weekday: def.first_weekday,
            public_holidays: def.public_holidays.iter().copied().collect(),
            holiday_before: def.holiday_before,
            holiday_after: def.holiday_after,
        }
    }

    pub fn month_days(&self) -> usize {
        self.month_days
    }

    pub fn days(&self) -> std::ops::Range<Day> {
        0..self.month_days
    }

    pub fn weekday(&self, day: Day) -> Weekday {
        Weekday::from_index(day + self.first_weekday.index())
    }

    /// `day` is 0-based; public holidays are stored as 1-based day numbers.
    pub fn is_public_holiday(&self, day: Day) -> bool {
        self.public_holidays.contains(&(day + 1))
    }

    /// Holiday test that also answers for the days just outside the month.
    ///
    /// Negative days report the "day before" flag and days at or past
    /// `month_days` report the "day after" flag.
    pub fn is_holiday(&self, day: i64) -> bool {
        if day < 0 {
            return self.holiday_before;
        }
        let day = day as usize;
        if day >= self.month_days {
            return self.holiday_after;
        }
        self.is_public_holiday(day) || self.weekday(day).is_weekend()
    }

    pub fn is_holiday_day(&self, day: Day) -> bool {
        self.is_holiday(day as i64)
    }

    /// True when the following day, possibly outside the month, is a holiday.
    pub fn is_holiday_eve(&self, day: Day) -> bool {
        self.is_holiday(day as i64 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar(month_days: usize, first_weekday: Weekday, holidays: Vec<usize>) -> Calendar {
        Calendar::new(&CalendarDef {
            month_days,
            first_weekday,
            public_holidays: holidays,
            holiday_before: true,
            holiday_after: false,
        })
    }

    #[test]
    fn test_weekends_are_holidays() {
        // Day 0 is a Thursday: days 2 and 3 are Sat/Sun.
        let cal = calendar(31, Weekday::Thu, vec![]);
        assert_eq!(cal.weekday(0), Weekday::Thu);
        assert_eq!(cal.weekday(2), Weekday::Sat);
        assert!(!cal.is_holiday_day(1));
        assert!(cal.is_holiday_day(2));
        assert!(cal.is_holiday_day(3));
        assert!(!cal.is_holiday_day(4));
        assert!(cal.is_holiday_day(9));
    }

    #[test]
    fn test_public_holidays_are_one_based() {
        let cal = calendar(31, Weekday::Thu, vec![5]);
        assert!(cal.is_public_holiday(4));
        assert!(cal.is_holiday_day(4));
        assert!(!cal.is_public_holiday(5));
    }

    #[test]
    fn test_boundary_flags() {
        let cal = calendar(28, Weekday::Mon, vec![]);
        assert!(cal.is_holiday(-1));
        assert!(!cal.is_holiday(28));
        // Last day is a Sunday, its eve-test reaches past the month.
        assert!(cal.is_holiday_day(27));
        assert!(!cal.is_holiday_eve(27));
        assert!(cal.is_holiday_eve(26));
    }
}
