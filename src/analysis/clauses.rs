//! Clause detectors over normalized contract text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

static SENTENCE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n.]+").expect("static regex"));

static PAYMENT_VOCABULARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(payment|invoice|receipt|payable|net|due|days?)").expect("static regex")
});

static NET_TERMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bnet[-\s]?((\d{1,3})|([a-z]+)\s*\(\s*(\d{1,3})\s*\)|([a-z]+))\b")
        .expect("static regex")
});

static DUE_WITHIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:due\s+(?:in|within)|within)\s+(?:\(?([a-z]+)\)?\s*)?(?:\(?(\d{1,3})\)?)?\s*(?:calendar\s*)?days?\b",
    )
    .expect("static regex")
});

static PAST_DUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bpast\s+due\s+(?:after\s+)?(\d{1,3})\s*days?\b").expect("static regex")
});

/// "net 2" style terms are kept only when spelled out this way
static EXPLICIT_TWO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(net\s*2|within\s*\(?2\)?\s*(?:business\s*)?days?)\b").expect("static regex")
});

static ASSIGNMENT_NOTICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(notice\s+of\s+assignment|assignment\s+notice|assignment\s+of\s+accounts)")
        .expect("static regex")
});

static REV_CAPITAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\brev\s*capital\b").expect("static regex"));

static NON_SOLICIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(non[-\s]?solicit|non[-\s]?hire|client\s+hire|liquidated\s+damages|conversion\s+fee)",
    )
    .expect("static regex")
});

static CONVERSIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(conversion|temp[-\s]?to[-\s]?perm)").expect("static regex"));

static INDEMNITY_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i).{0,200}indemnif(?:y|ication).{0,400}").expect("static regex")
});

static MUTUAL_INDEMNITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(each\s+party|mutual(?:ly)?\s+indemn|both\s+parties)").expect("static regex")
});

/// Candidate weights; the strongest phrasing wins
const WEIGHT_NET: u8 = 8;
const WEIGHT_DUE_WITHIN: u8 = 7;
const WEIGHT_PAST_DUE: u8 = 5;
const WEIGHT_TWO_DAYS: u8 = 3;

const MIN_DAYS: u32 = 5;
const MAX_DAYS: u32 = 365;

/// Collapse whitespace runs to single spaces and trim
pub fn clean(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn word_to_num(word: &str) -> Option<u32> {
    let letters: String = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let value = match letters.as_str() {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        "hundred" => 100,
        _ => return None,
    };
    Some(value)
}

fn to_days(token: Option<&str>) -> Option<u32> {
    let token = token?;
    if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
        token.parse().ok()
    } else {
        word_to_num(token)
    }
}

fn push_candidate(picks: &mut Vec<(u32, u8)>, days: u32, weight: u8) {
    if days == 2 {
        picks.push((2, WEIGHT_TWO_DAYS));
    } else if (MIN_DAYS..=MAX_DAYS).contains(&days) {
        picks.push((days, weight));
    }
}

/// Payment term in days, from the sentences that talk about payment
pub fn find_payment_days(text: &str) -> Option<u32> {
    let relevant = SENTENCE_SPLIT
        .split(text)
        .filter(|sentence| PAYMENT_VOCABULARY.is_match(sentence))
        .collect::<Vec<_>>()
        .join(". ");

    let mut picks: Vec<(u32, u8)> = Vec::new();

    for caps in NET_TERMS.captures_iter(&relevant) {
        let token = caps
            .get(2)
            .or_else(|| caps.get(4))
            .or_else(|| caps.get(5))
            .map(|m| m.as_str());
        if let Some(days) = to_days(token) {
            push_candidate(&mut picks, days, WEIGHT_NET);
        }
    }

    for caps in DUE_WITHIN.captures_iter(&relevant) {
        let token = caps.get(2).or_else(|| caps.get(1)).map(|m| m.as_str());
        if let Some(days) = to_days(token) {
            push_candidate(&mut picks, days, WEIGHT_DUE_WITHIN);
        }
    }

    for caps in PAST_DUE.captures_iter(&relevant) {
        if let Some(days) = to_days(caps.get(1).map(|m| m.as_str())) {
            if (MIN_DAYS..=MAX_DAYS).contains(&days) {
                picks.push((days, WEIGHT_PAST_DUE));
            }
        }
    }

    let (days, _) = picks
        .into_iter()
        .min_by_key(|&(days, weight)| (std::cmp::Reverse(weight), days))?;

    if days == 2 && !EXPLICIT_TWO.is_match(&relevant) {
        return None;
    }
    Some(days)
}

/// Notice of assignment naming Rev Capital
pub fn find_notice_of_assignment(text: &str) -> bool {
    ASSIGNMENT_NOTICE.is_match(text) && REV_CAPITAL.is_match(text)
}

pub fn find_non_solicit(text: &str) -> bool {
    NON_SOLICIT.is_match(text)
}

pub fn find_conversions(text: &str) -> bool {
    CONVERSIONS.is_match(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Indemnity {
    None,
    Mutual,
    OneSided,
}

/// Classify the first indemnification clause
pub fn find_indemnity(text: &str) -> Indemnity {
    match INDEMNITY_BLOCK.find(text) {
        None => Indemnity::None,
        Some(block) if MUTUAL_INDEMNITY.is_match(block.as_str()) => Indemnity::Mutual,
        Some(_) => Indemnity::OneSided,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        assert_eq!(clean("  Net\t30\r\n\n days  "), "Net 30 days");
        assert_eq!(clean(" \n\t "), "");
    }

    #[test]
    fn test_net_terms() {
        assert_eq!(find_payment_days("Payment terms are Net 45 from invoice date."), Some(45));
        assert_eq!(find_payment_days("Invoices are payable net-thirty."), Some(30));
        assert_eq!(find_payment_days("Terms: net sixty (60) days."), Some(60));
    }

    #[test]
    fn test_due_within() {
        assert_eq!(find_payment_days("Invoices are due within thirty (30) days."), Some(30));
        assert_eq!(find_payment_days("Payment is due in 15 calendar days."), Some(15));
    }

    #[test]
    fn test_past_due() {
        assert_eq!(find_payment_days("Invoices are past due after 90 days."), Some(90));
    }

    #[test]
    fn test_weights_and_ties() {
        // net outranks due-within
        assert_eq!(
            find_payment_days("Net 60 applies. Payment due within 30 days of receipt."),
            Some(60)
        );
        // equal weight prefers the shorter term
        assert_eq!(find_payment_days("Invoices net 45. Rush invoices net 30."), Some(30));
    }

    #[test]
    fn test_out_of_range_ignored() {
        assert_eq!(find_payment_days("Payment net 3 days."), None);
        assert_eq!(find_payment_days("Invoice due within 400 days."), None);
    }

    #[test]
    fn test_two_days_needs_explicit_phrase() {
        assert_eq!(find_payment_days("Payment is net 2."), Some(2));
        assert_eq!(find_payment_days("Payment due within 2 days."), Some(2));
        assert_eq!(find_payment_days("Payment net two."), None);
    }

    #[test]
    fn test_no_terms() {
        assert_eq!(find_payment_days("The network is described in Exhibit A."), None);
        assert_eq!(find_payment_days(""), None);
    }

    #[test]
    fn test_notice_of_assignment() {
        assert!(find_notice_of_assignment(
            "A Notice of Assignment directing payment to Rev Capital is attached."
        ));
        assert!(!find_notice_of_assignment("A notice of assignment is attached."));
        assert!(!find_notice_of_assignment("Remit to RevCapital."));
    }

    #[test]
    fn test_non_solicit_and_conversions() {
        assert!(find_non_solicit("Client agrees to a non-solicitation period."));
        assert!(find_non_solicit("A conversion fee applies."));
        assert!(!find_non_solicit("Nothing relevant here."));
        assert!(find_conversions("Temp-to-perm placements are allowed."));
        assert!(!find_conversions("Nothing relevant here."));
    }

    #[test]
    fn test_indemnity() {
        assert_eq!(find_indemnity("No clause here."), Indemnity::None);
        assert_eq!(
            find_indemnity("Each party shall indemnify the other against claims."),
            Indemnity::Mutual
        );
        assert_eq!(
            find_indemnity("Supplier shall indemnify Client against all claims."),
            Indemnity::OneSided
        );
    }
}
