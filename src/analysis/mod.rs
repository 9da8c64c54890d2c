//! Contract clause analysis
//!
//! Scores extracted contract text against the clauses a staffing agreement
//! is expected to carry, as traffic lights plus short explanation cards.

mod clauses;

use serde::Serialize;

pub use clauses::{
    clean, find_conversions, find_indemnity, find_non_solicit, find_notice_of_assignment,
    find_payment_days, Indemnity,
};

/// Longest payment term that still passes
const PASS_DAYS: u32 = 30;
/// Longest payment term that only warns
const WARN_DAYS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct Light {
    pub label: &'static str,
    pub status: LightStatus,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub title: &'static str,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub ok: bool,
    pub lights: Vec<Light>,
    pub cards: Vec<Card>,
}

#[cfg(test)]
impl AnalysisReport {
    fn light(&self, label: &str) -> Option<&Light> {
        self.lights.iter().find(|l| l.label == label)
    }
}

fn light(label: &'static str, status: LightStatus, note: impl Into<String>) -> Light {
    Light {
        label,
        status,
        note: note.into(),
    }
}

fn card(title: &'static str, body: impl Into<String>) -> Card {
    Card {
        title,
        body: body.into(),
    }
}

fn present(found: bool) -> (LightStatus, &'static str) {
    if found {
        (LightStatus::Pass, "(present)")
    } else {
        (LightStatus::Warn, "(missing)")
    }
}

/// Analyze whitespace-normalized contract text
pub fn analyze(text: &str) -> AnalysisReport {
    let days = find_payment_days(text);
    let noa = find_notice_of_assignment(text);
    let non_solicit = find_non_solicit(text);
    let conversions = find_conversions(text);
    let indemnity = find_indemnity(text);

    tracing::debug!(
        ?days,
        noa,
        non_solicit,
        conversions,
        ?indemnity,
        "Clauses detected"
    );

    let payment = match days {
        None => light("Payment Terms", LightStatus::Fail, "(not found)"),
        Some(d) if d <= PASS_DAYS => light("Payment Terms", LightStatus::Pass, format!("({} days)", d)),
        Some(d) if d <= WARN_DAYS => light("Payment Terms", LightStatus::Warn, format!("({} days)", d)),
        Some(d) => light("Payment Terms", LightStatus::Fail, format!("({} days)", d)),
    };

    let (non_solicit_status, non_solicit_note) = present(non_solicit);
    let (conversions_status, conversions_note) = present(conversions);

    let (indemnity_status, indemnity_note, indemnity_body) = match indemnity {
        Indemnity::None => (LightStatus::Pass, "(none)", "None (preferred)"),
        Indemnity::Mutual => (LightStatus::Pass, "(mutual)", "Mutual"),
        Indemnity::OneSided => (LightStatus::Fail, "(one-sided)", "One-sided (client-favored)"),
    };

    let lights = vec![
        payment,
        if noa {
            light("NOA to Rev Capital", LightStatus::Pass, "(found)")
        } else {
            light("NOA to Rev Capital", LightStatus::Fail, "(not found)")
        },
        light("Client Hire / Non-Solicit", non_solicit_status, non_solicit_note),
        light("Conversions", conversions_status, conversions_note),
        light("Indemnity", indemnity_status, indemnity_note),
        light(
            "Insurance",
            LightStatus::Warn,
            "(client minimums not auto-evaluated here)",
        ),
    ];

    let cards = vec![
        card(
            "Payment Terms",
            match days {
                Some(d) => format!("Reason: Terms - {} days", d),
                None => "Reason: Terms - (not found)".to_string(),
            },
        ),
        card(
            "Notice of Assignment",
            if noa {
                "Reason: NOA referencing Rev Capital present."
            } else {
                "Reason: NOA not found - must include verbatim \"Rev Capital\" language."
            },
        ),
        card(
            "Client Hire / Non-Solicit",
            if non_solicit { "Present" } else { "Missing" },
        ),
        card(
            "Conversions (Temp-to-Perm)",
            if conversions { "Present" } else { "Missing" },
        ),
        card("Indemnity", indemnity_body),
    ];

    AnalysisReport {
        ok: true,
        lights,
        cards,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "Payment terms: invoices are due within thirty (30) days of receipt. \
        A Notice of Assignment in favor of Rev Capital is attached. \
        Client shall not solicit or hire assigned staff (non-solicit). \
        Temp-to-perm conversion is permitted after 520 hours. \
        Each party shall indemnify the other for its own negligence.";

    #[test]
    fn test_full_contract_passes() {
        let report = analyze(&clean(CONTRACT));

        assert!(report.ok);
        assert_eq!(report.lights.len(), 6);
        assert_eq!(report.cards.len(), 5);
        assert_eq!(report.light("Payment Terms").unwrap().status, LightStatus::Pass);
        assert_eq!(report.light("Payment Terms").unwrap().note, "(30 days)");
        assert_eq!(report.light("NOA to Rev Capital").unwrap().status, LightStatus::Pass);
        assert_eq!(report.light("Indemnity").unwrap().note, "(mutual)");
        assert_eq!(report.light("Insurance").unwrap().status, LightStatus::Warn);
    }

    #[test]
    fn test_payment_thresholds() {
        let status = |text: &str| analyze(text).light("Payment Terms").unwrap().status;

        assert_eq!(status("Payment net 30."), LightStatus::Pass);
        assert_eq!(status("Payment net 45."), LightStatus::Warn);
        assert_eq!(status("Payment net 90."), LightStatus::Fail);
        assert_eq!(status("No terms at all."), LightStatus::Fail);
    }

    #[test]
    fn test_missing_clauses() {
        let report = analyze("Supplier shall indemnify Client against all claims.");

        assert_eq!(report.light("NOA to Rev Capital").unwrap().status, LightStatus::Fail);
        assert_eq!(report.light("Conversions").unwrap().note, "(missing)");
        assert_eq!(report.light("Indemnity").unwrap().status, LightStatus::Fail);
        assert_eq!(report.cards[4].body, "One-sided (client-favored)");
    }

    #[test]
    fn test_report_json_shape() {
        let json = serde_json::to_value(analyze("Payment net 30.")).unwrap();

        assert_eq!(json["ok"], true);
        assert_eq!(json["lights"][0]["label"], "Payment Terms");
        assert_eq!(json["lights"][0]["status"], "pass");
        assert_eq!(json["cards"][0]["body"], "Reason: Terms - 30 days");
    }
}
