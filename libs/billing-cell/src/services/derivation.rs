// libs/billing-cell/src/services/derivation.rs
//
// Pure charge derivation shared by the three billing call sites:
// home-visit booking, inpatient discharge and pharmacy dispensing.
use chrono::{DateTime, Utc};

const DEFAULT_WARD_DAILY_RATE: f64 = 1000.0;
const DEFAULT_HOME_VISIT_FEE: f64 = 300.0;

/// Daily rate by ward type. Unrecognized ward types fall back to the
/// general-ward rate.
pub fn ward_daily_rate(ward_type: &str) -> f64 {
    match ward_type.trim().to_lowercase().as_str() {
        "general" => 1000.0,
        "semi-private" => 2000.0,
        "private" => 3000.0,
        "icu" => 5000.0,
        _ => DEFAULT_WARD_DAILY_RATE,
    }
}

/// Flat fee by home-visit service type. Unrecognized service types are
/// charged the nurse-visit rate.
pub fn home_visit_fee(service_type: &str) -> f64 {
    match service_type.trim().to_lowercase().as_str() {
        "doctor" => 500.0,
        "nurse" => 300.0,
        "physiotherapist" => 400.0,
        "caregiver" => 250.0,
        _ => DEFAULT_HOME_VISIT_FEE,
    }
}

/// Billable days for an inpatient stay: partial days round up, and a
/// same-day discharge still counts as one day.
pub fn days_stayed(admission: DateTime<Utc>, discharge: DateTime<Utc>) -> i64 {
    let seconds = (discharge - admission).num_seconds();
    let days = (seconds + 86_399) / 86_400;
    days.max(1)
}

pub fn stay_total(days: i64, daily_rate: f64) -> f64 {
    days as f64 * daily_rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_ward_rates() {
        assert_eq!(ward_daily_rate("general"), 1000.0);
        assert_eq!(ward_daily_rate("semi-private"), 2000.0);
        assert_eq!(ward_daily_rate("Private"), 3000.0);
        assert_eq!(ward_daily_rate("ICU"), 5000.0);
    }

    #[test]
    fn test_unknown_ward_defaults_to_general_rate() {
        assert_eq!(ward_daily_rate("maternity"), 1000.0);
        assert_eq!(ward_daily_rate(""), 1000.0);
    }

    #[test]
    fn test_home_visit_fees() {
        assert_eq!(home_visit_fee("Doctor"), 500.0);
        assert_eq!(home_visit_fee("Nurse"), 300.0);
        assert_eq!(home_visit_fee("Physiotherapist"), 400.0);
        assert_eq!(home_visit_fee("Caregiver"), 250.0);
    }

    #[test]
    fn test_unknown_service_type_defaults() {
        assert_eq!(home_visit_fee("Chiropractor"), 300.0);
    }

    #[test]
    fn test_two_day_private_stay() {
        let days = days_stayed(at(2024, 1, 1, 0), at(2024, 1, 3, 0));
        assert_eq!(days, 2);
        assert_eq!(stay_total(days, ward_daily_rate("private")), 6000.0);
    }

    #[test]
    fn test_partial_day_rounds_up() {
        let days = days_stayed(at(2024, 1, 1, 8), at(2024, 1, 2, 9));
        assert_eq!(days, 2);
    }

    #[test]
    fn test_same_day_discharge_bills_one_day() {
        let days = days_stayed(at(2024, 1, 1, 8), at(2024, 1, 1, 8));
        assert_eq!(days, 1);
        assert_eq!(stay_total(days, ward_daily_rate("icu")), 5000.0);
    }
}
