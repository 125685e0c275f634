use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::config::BackfillConfig;

/// True when the persisted dataset is small enough to warrant an archive
/// scan before the regular feed pull.
///
/// The check looks only at the count. A store that shrinks below the mark
/// for any reason (including a run that lost records upstream) triggers the
/// scan again.
pub fn should_backfill(existing_records: usize, low_water_mark: usize) -> bool {
    existing_records < low_water_mark
}

/// One calendar month of announcement archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArchiveMonth {
    pub year: i32,
    pub month: u32,
}

impl ArchiveMonth {
    /// First instant of the month; the date given to every record found in
    /// that month's archive.
    pub fn first_instant(&self) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .unwrap_or_default()
    }

    fn previous(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    /// Fill `{year}` and `{month}` (zero-padded) in an archive URL template.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{year}", &self.year.to_string())
            .replace("{month}", &format!("{:02}", self.month))
    }
}

/// The plan for a single run's archive scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillPlan {
    /// Newest month first.
    pub months: Vec<ArchiveMonth>,
}

/// Decide whether this run scans archives and, if so, which months.
pub fn plan(config: &BackfillConfig, existing_records: usize, now: DateTime<Utc>) -> Option<BackfillPlan> {
    if !config.enabled || !should_backfill(existing_records, config.low_water_mark) {
        return None;
    }
    let mut cursor = ArchiveMonth { year: now.year(), month: now.month() };
    let mut months = Vec::with_capacity(config.months as usize);
    for _ in 0..config.months {
        months.push(cursor);
        cursor = cursor.previous();
    }
    Some(BackfillPlan { months })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn low_water_mark_is_exclusive() {
        assert!(should_backfill(0, 100));
        assert!(should_backfill(99, 100));
        assert!(!should_backfill(100, 100));
        assert!(!should_backfill(5000, 100));
    }

    #[test]
    fn plan_walks_back_across_year_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap();
        let cfg = BackfillConfig { enabled: true, low_water_mark: 100, months: 4 };
        let plan = plan(&cfg, 0, now).unwrap();
        assert_eq!(
            plan.months,
            vec![
                ArchiveMonth { year: 2024, month: 2 },
                ArchiveMonth { year: 2024, month: 1 },
                ArchiveMonth { year: 2023, month: 12 },
                ArchiveMonth { year: 2023, month: 11 },
            ]
        );
    }

    #[test]
    fn no_plan_when_above_mark_or_disabled() {
        let now = Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap();
        let cfg = BackfillConfig { enabled: true, low_water_mark: 100, months: 4 };
        assert!(plan(&cfg, 100, now).is_none());
        let off = BackfillConfig { enabled: false, ..cfg };
        assert!(plan(&off, 0, now).is_none());
    }

    #[test]
    fn render_and_first_instant() {
        let m = ArchiveMonth { year: 2023, month: 7 };
        assert_eq!(
            m.render("https://aws.example/whats-new/{year}/{month}/"),
            "https://aws.example/whats-new/2023/07/"
        );
        assert_eq!(m.first_instant(), Utc.with_ymd_and_hms(2023, 7, 1, 0, 0, 0).unwrap());
    }
}
