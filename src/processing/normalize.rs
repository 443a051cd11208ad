//! Boilerplate removal for extracted policy text.
//!
//! Pure text-to-text pass applied before segmentation. The pattern list is ordered: page
//! footers and contact boilerplate go first, blank-line collapsing runs last.

use regex::Regex;
use std::sync::LazyLock;

static CLEANING_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // Page footers.
        (r"(?i)Page \d+ of \d+\n?", ""),
        // Copyright lines.
        (r"(?i)(?:©|\(c\)) ?\d{4}[^\n]*\n", "\n"),
        // Product identification and regulator/contact boilerplate.
        (r"(?im)^UIN:[^\n]*$", ""),
        (
            r"(?im)^(?:Reach us on|IRDAI|CIN:|Email:|Website:|Toll-Free)[^\n]*$",
            "",
        ),
        // Email headers leaking in from .eml uploads.
        (r"(?im)^(?:From|Subject|To|Date):[^\n]*\n", ""),
        // Stray comma-separated digit runs left by table extraction.
        (r"(?:\d+,\s*)+", ""),
        // Repeated roman-numeral artifacts from broken list extraction.
        (r"(?i)\b(?:iv\s*){2,}", " "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("valid cleaning pattern"),
            replacement,
        )
    })
    .collect()
});

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\n\s*){3,}").expect("valid blank-run pattern"));

/// Strip boilerplate from extracted text, collapse blank-line runs, and trim.
///
/// Deterministic and stateless; applying it twice yields the same output.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut cleaned = text.to_string();
    for (pattern, replacement) in CLEANING_PATTERNS.iter() {
        cleaned = pattern.replace_all(&cleaned, *replacement).into_owned();
    }
    cleaned = BLANK_RUNS.replace_all(&cleaned, "\n\n").into_owned();
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_page_footers_and_copyright() {
        let input = "Coverage applies.\nPage 3 of 12\n© 2023 Some Insurer Ltd\nNext clause.";
        let output = normalize(input);
        assert!(!output.contains("Page 3 of 12"));
        assert!(!output.contains("© 2023"));
        assert!(output.contains("Coverage applies."));
        assert!(output.contains("Next clause."));
    }

    #[test]
    fn strips_regulator_and_contact_lines() {
        let input = "1. Hospitalization benefits are covered.\nUIN: ABCHLIP21234V012021\nIRDAI Registration No. 123\nEmail: care@insurer.example\nWebsite: insurer.example";
        let output = normalize(input);
        assert!(output.contains("Hospitalization benefits"));
        assert!(!output.contains("UIN:"));
        assert!(!output.contains("IRDAI"));
        assert!(!output.contains("Email:"));
    }

    #[test]
    fn strips_email_headers() {
        let input = "From: someone@example.com\nSubject: claim\nThe policy covers surgery.";
        let output = normalize(input);
        assert!(!output.contains("From:"));
        assert!(!output.contains("Subject:"));
        assert!(output.contains("The policy covers surgery."));
    }

    #[test]
    fn collapses_blank_line_runs() {
        let input = "First clause.\n\n\n\n\nSecond clause.";
        let output = normalize(input);
        assert_eq!(output, "First clause.\n\nSecond clause.");
    }

    #[test]
    fn is_idempotent() {
        let input = "Page 1 of 2\nA. Waiting periods apply after 36 months.\n\n\n\nB. Accidents are covered.\nUIN: XYZ";
        let once = normalize(input);
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\n  "), "");
    }
}
