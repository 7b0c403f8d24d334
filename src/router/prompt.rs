//! The routing prompt sent to the language model.

use std::fmt::Write as _;

use chrono::{DateTime, TimeZone};

use crate::action::ActionKind;

/// Output rules shared by every routing request.
const ROUTING_RULES: &str = "\
Analyze the user's request and choose exactly one tool from the reference below.\n\
Your ONLY output must be a single JSON object of the form \
{\"action\": \"<tool>\", \"params\": {...}}.\n\
Do not add explanations, markdown or any text outside the JSON object.\n\
Resolve relative dates and times (\"tomorrow at 3pm\", \"next Monday\") against the current time.\n\
If nothing else fits, use \"general_chat\" with the user's original request as \"prompt\".";

/// Build the routing prompt for `utterance` at time `now`.
pub fn routing_prompt<Tz>(utterance: &str, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut prompt = String::with_capacity(4096);
    prompt.push_str(ROUTING_RULES);
    let _ = write!(
        prompt,
        "\n\nCurrent time: {} ({}).\n\n## Tool reference\n",
        now.format("%Y-%m-%d %H:%M:%S"),
        now.format("%A"),
    );

    for kind in ActionKind::ALL {
        let entry = kind.entry();
        let _ = write!(prompt, "- \"{}\"", entry.tag);
        if !entry.required.is_empty() {
            let _ = write!(prompt, " | required: {}", entry.required.join(", "));
        }
        if !entry.optional.is_empty() {
            let _ = write!(prompt, " | optional: {}", entry.optional.join(", "));
        }
        let _ = writeln!(prompt, " | use for: {}", entry.use_for);
        let _ = writeln!(prompt, "  example: {}", entry.example);
    }

    let _ = write!(
        prompt,
        "\n## User request\n\"{}\"\n\n## Your JSON output\n",
        utterance.trim()
    );
    prompt
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::FixedOffset;

    fn fixed_now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(5 * 3600 + 1800)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 14, 9, 5, 7)
            .unwrap()
    }

    #[test]
    fn embeds_timestamp_and_weekday() {
        let prompt = routing_prompt("hi", &fixed_now());
        assert!(prompt.contains("Current time: 2026-03-14 09:05:07 (Saturday)"));
    }

    #[test]
    fn lists_every_action_with_example() {
        let prompt = routing_prompt("hi", &fixed_now());
        for kind in ActionKind::ALL {
            assert!(prompt.contains(&format!("- \"{}\"", kind.as_str())), "{kind}");
            assert!(prompt.contains(kind.entry().example));
        }
    }

    #[test]
    fn lists_required_params() {
        let prompt = routing_prompt("hi", &fixed_now());
        assert!(prompt.contains(
            "- \"set_price_alert\" | required: ticker, direction, target_price"
        ));
        assert!(prompt.contains("- \"find_file\" | required: file_name | optional: search_directory"));
    }

    #[test]
    fn quotes_the_user_request_last() {
        let prompt = routing_prompt("  what's on tomorrow?  ", &fixed_now());
        let request = prompt.find("\"what's on tomorrow?\"").unwrap();
        let reference = prompt.find("## Tool reference").unwrap();
        assert!(request > reference);
        assert!(prompt.trim_end().ends_with("## Your JSON output"));
    }
}
