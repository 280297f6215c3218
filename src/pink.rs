//! Pink Mobile plan rules: flat line pricing, promo thresholds, roaming
//! per-diem rates, PIN matching. All constants, no state.

use chrono::NaiveDate;

pub const PHONE_LINE_PRICE: f64 = 35.0;
pub const TABLET_LINE_PRICE: f64 = 10.0;

/// Default monthly price assumed for legacy lines with no stored price.
pub const DEFAULT_LINE_PRICE: f64 = 35.0;

pub const FREE_IPAD_LINE_REQUIREMENT: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    Phone,
    Tablet,
}

impl LineType {
    /// Tablets and iPads are tablet lines; everything else is a phone.
    pub fn classify(raw: &str) -> Self {
        let raw = raw.to_lowercase();
        if raw.contains("tablet") || raw.contains("ipad") {
            LineType::Tablet
        } else {
            LineType::Phone
        }
    }

    pub fn monthly_price(&self) -> f64 {
        match self {
            LineType::Phone => PHONE_LINE_PRICE,
            LineType::Tablet => TABLET_LINE_PRICE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineType::Phone => "phone",
            LineType::Tablet => "tablet",
        }
    }

    pub fn default_device(&self) -> &'static str {
        match self {
            LineType::Phone => "iPhone",
            LineType::Tablet => "iPad",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Promo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub requirement: i64,
    pub benefit: &'static str,
    pub device_value: Option<i64>,
}

pub const PROMOS: &[Promo] = &[
    Promo {
        id: "5-line-ipad",
        name: "5-Line Free iPad Promo",
        description: "Get a free iPad device when your account has 5 total lines",
        requirement: 5,
        benefit: "Free iPad",
        device_value: Some(799),
    },
    Promo {
        id: "family-plan",
        name: "Family Plan Discount",
        description: "10% discount on 4+ lines",
        requirement: 4,
        benefit: "10% off monthly bill",
        device_value: None,
    },
];

pub fn find_promo(id: &str) -> Option<&'static Promo> {
    PROMOS.iter().find(|p| p.id == id)
}

/// Free-iPad teaser shown on account info: eligible when the account is
/// one or two lines short of the requirement.
pub fn lines_needed_for_free_ipad(total_lines: i64) -> Option<i64> {
    let needed = FREE_IPAD_LINE_REQUIREMENT - total_lines;
    if (1..=2).contains(&needed) {
        Some(needed)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RoamingPass {
    pub id: &'static str,
    pub name: &'static str,
    pub regions: &'static [&'static str],
    pub daily_rate: i64,
    pub features: &'static [&'static str],
}

const PASS_FEATURES: &[&str] = &["Unlimited voice", "Unlimited text", "Data at home rates"];

pub const ROAMING_PASSES: &[RoamingPass] = &[
    RoamingPass {
        id: "europe-pass",
        name: "Europe Travel Pass",
        regions: &["Europe", "EU", "UK", "European Union"],
        daily_rate: 10,
        features: PASS_FEATURES,
    },
    RoamingPass {
        id: "asia-pass",
        name: "Asia Travel Pass",
        regions: &["Asia", "Japan", "Korea", "China", "Southeast Asia"],
        daily_rate: 15,
        features: PASS_FEATURES,
    },
    RoamingPass {
        id: "americas-pass",
        name: "Americas Travel Pass",
        regions: &["Canada", "Mexico", "South America", "Central America"],
        daily_rate: 10,
        features: PASS_FEATURES,
    },
];

/// Match a destination to a pass by region substring; Europe is the default.
pub fn select_roaming_pass(destination: &str) -> &'static RoamingPass {
    let destination = destination.to_lowercase();
    ROAMING_PASSES
        .iter()
        .find(|pass| {
            pass.regions
                .iter()
                .any(|region| destination.contains(&region.to_lowercase()))
        })
        .unwrap_or(&ROAMING_PASSES[0])
}

/// Inclusive day count between two travel dates.
pub fn travel_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// PINs match on their last four digits, so a padded entry like
/// "00001234" still verifies against "1234".
pub fn pins_match(provided: &str, stored: &str) -> bool {
    last_four(provided) == last_four(stored)
}

// Slices at a char boundary: spoken PINs can pick up non-ASCII
// transcription artifacts.
fn last_four(pin: &str) -> &str {
    match pin.char_indices().rev().nth(3) {
        Some((idx, _)) => &pin[idx..],
        None => pin,
    }
}

/// Strip a phone number to digits and drop a leading US country code.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 11 && digits.starts_with('1') {
        digits[1..].to_string()
    } else {
        digits
    }
}

/// Format a number for dialing out: default to +1 for bare 10-digit numbers.
pub fn to_e164(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 {
        format!("+1{digits}")
    } else {
        format!("+{digits}")
    }
}

/// Fallback ticket summary when the assistant did not provide one.
pub fn summarize_ticket(intents: &[String], actions: &[String], financial_impact: Option<&str>) -> String {
    let mut summary = String::new();
    let intents: Vec<&str> = intents.iter().map(String::as_str).filter(|s| !s.is_empty()).collect();
    let actions: Vec<&str> = actions.iter().map(String::as_str).filter(|s| !s.is_empty()).collect();

    if !intents.is_empty() {
        summary.push_str(&format!("Customer inquiry: {}. ", intents.join(", ")));
    }
    if !actions.is_empty() {
        summary.push_str(&format!("Actions: {}. ", actions.join("; ")));
    }
    if let Some(impact) = financial_impact {
        summary.push_str(&format!("Financial impact: {impact}."));
    }

    let summary = summary.trim().to_string();
    if summary.is_empty() {
        "Interaction completed.".to_string()
    } else {
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_type_classification() {
        assert_eq!(LineType::classify("phone"), LineType::Phone);
        assert_eq!(LineType::classify("iPhone"), LineType::Phone);
        assert_eq!(LineType::classify("tablet"), LineType::Tablet);
        assert_eq!(LineType::classify("iPad"), LineType::Tablet);
        assert_eq!(LineType::classify("new ipad line"), LineType::Tablet);
    }

    #[test]
    fn flat_pricing() {
        assert_eq!(LineType::Phone.monthly_price(), 35.0);
        assert_eq!(LineType::Tablet.monthly_price(), 10.0);
    }

    #[test]
    fn free_ipad_teaser_window() {
        assert_eq!(lines_needed_for_free_ipad(3), Some(2));
        assert_eq!(lines_needed_for_free_ipad(4), Some(1));
        assert_eq!(lines_needed_for_free_ipad(5), None);
        assert_eq!(lines_needed_for_free_ipad(6), None);
        assert_eq!(lines_needed_for_free_ipad(2), None);
    }

    #[test]
    fn promo_lookup() {
        assert_eq!(find_promo("5-line-ipad").unwrap().requirement, 5);
        assert_eq!(find_promo("family-plan").unwrap().requirement, 4);
        assert!(find_promo("mystery-promo").is_none());
    }

    #[test]
    fn roaming_pass_selection() {
        assert_eq!(select_roaming_pass("Europe").id, "europe-pass");
        assert_eq!(select_roaming_pass("traveling to japan").id, "asia-pass");
        assert_eq!(select_roaming_pass("Mexico City").id, "americas-pass");
        // unknown destinations default to the Europe pass
        assert_eq!(select_roaming_pass("Antarctica").id, "europe-pass");
    }

    #[test]
    fn roaming_cost_estimate() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let days = travel_days(start, end);
        assert_eq!(days, 3);
        let pass = select_roaming_pass("europe");
        assert_eq!(days * pass.daily_rate, 30);
    }

    #[test]
    fn single_day_trip_counts_one_day() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(travel_days(day, day), 1);
    }

    #[test]
    fn pin_matches_on_last_four() {
        assert!(pins_match("1234", "1234"));
        assert!(pins_match("00001234", "1234"));
        assert!(pins_match("1234", "00001234"));
        assert!(!pins_match("9999", "1234"));
    }

    #[test]
    fn pin_with_non_ascii_input_compares_without_panicking() {
        assert!(!pins_match("é123", "1234"));
        assert!(!pins_match("1234", "é123"));
        assert!(pins_match("éé1234", "1234"));
        assert!(!pins_match("", "1234"));
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("+1 (555) 123-4567"), "5551234567");
        assert_eq!(normalize_phone("15551234567"), "5551234567");
        assert_eq!(normalize_phone("5551234567"), "5551234567");
        assert_eq!(normalize_phone("+442071234567"), "442071234567");
    }

    #[test]
    fn e164_formatting() {
        assert_eq!(to_e164("5551234567"), "+15551234567");
        assert_eq!(to_e164("(555) 123-4567"), "+15551234567");
        assert_eq!(to_e164("+442071234567"), "+442071234567");
    }

    #[test]
    fn ticket_summary_fallback() {
        let summary = summarize_ticket(
            &["billing".to_string(), "roaming".to_string()],
            &["added line".to_string()],
            Some("+$35/mo"),
        );
        assert_eq!(
            summary,
            "Customer inquiry: billing, roaming. Actions: added line. Financial impact: +$35/mo."
        );
        assert_eq!(summarize_ticket(&[], &[], None), "Interaction completed.");
    }
}
