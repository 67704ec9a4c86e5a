// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use flota_app::{ReportSettings, parse_hour};
use time::PrimitiveDateTime;

/// True when the weekly report should go out at local time `now`: the schedule is
/// enabled, today is the configured weekday, the configured hour has passed, and the
/// report has not already been sent today.
pub fn report_due(settings: &ReportSettings, now: PrimitiveDateTime) -> bool {
    if !settings.enabled || now.weekday() != settings.day_of_week {
        return false;
    }
    let Some(configured) = parse_hour(&settings.hour) else {
        return false;
    };
    if (now.hour(), now.minute()) < configured {
        return false;
    }
    settings.last_sent != Some(now.date())
}

#[cfg(test)]
mod tests {
    use super::report_due;
    use flota_app::ReportSettings;
    use time::Weekday;
    use time::macros::{date, datetime};

    fn monday_nine() -> ReportSettings {
        ReportSettings {
            day_of_week: Weekday::Monday,
            hour: "09:00".to_owned(),
            last_sent: None,
            enabled: true,
            google_script_url: String::new(),
        }
    }

    #[test]
    fn fires_on_weekday_after_hour() {
        let settings = monday_nine();
        assert!(!report_due(&settings, datetime!(2026-03-02 08:59)));
        assert!(report_due(&settings, datetime!(2026-03-02 09:00)));
        assert!(report_due(&settings, datetime!(2026-03-02 23:10)));
        assert!(!report_due(&settings, datetime!(2026-03-03 09:30)));
    }

    #[test]
    fn fires_once_per_day() {
        let mut settings = monday_nine();
        settings.last_sent = Some(date!(2026 - 03 - 02));
        assert!(!report_due(&settings, datetime!(2026-03-02 10:00)));
        assert!(report_due(&settings, datetime!(2026-03-09 10:00)));
    }

    #[test]
    fn disabled_or_malformed_schedule_never_fires() {
        let mut settings = monday_nine();
        settings.enabled = false;
        assert!(!report_due(&settings, datetime!(2026-03-02 10:00)));

        settings.enabled = true;
        settings.hour = "9am".to_owned();
        assert!(!report_due(&settings, datetime!(2026-03-02 10:00)));
    }
}
