//! Rule-based intent parsing.
//!
//! Rules are tried in order and the first match wins: literal keyword
//! prefixes, then the reminder, journal and task phrase regexes. Used on its
//! own when no language model is configured, and as the fallback when the
//! classifier fails.

use regex::Regex;
use std::sync::LazyLock;

use super::types::{CommandError, IntentKind, ParsedIntent, TodoAction, TodoCommand};

const PREFIX_RULES: &[(&str, IntentKind)] = &[
    ("HIGHLIGHT", IntentKind::Highlight),
    ("THOUGHT", IntentKind::Thought),
    ("IDEA", IntentKind::Idea),
    ("AFFIRMATION", IntentKind::Affirmation),
    ("GRATITUDE", IntentKind::Gratitude),
    ("REFLECTION", IntentKind::Reflection),
    ("TODO", IntentKind::Todo),
    ("HABIT", IntentKind::Habit),
    ("MOOD", IntentKind::Mood),
    ("EXPENSE", IntentKind::Expense),
    ("INCOME", IntentKind::Income),
    ("GOAL", IntentKind::BudgetGoal),
    ("BUDGET", IntentKind::BudgetGoal),
];

// Compiled once; the patterns are constants so failure is a programming error.
static REMINDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:remind me|set an alert|alert me)\s+(?:(?:to|for|about)\s+)?(?P<text>.+?)\s+(?:at\s+(?P<clock>\d{1,2}(?::\d{2})?\s*(?:am|pm)?)|(?:at\s+)?(?P<relative>tomorrow|later))\s*[.!]?\s*$",
    )
    .expect("Invalid regex: reminder pattern")
});

static JOURNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:log|write|record)\s+(?:my\s+|a\s+)?(?P<kind>mood|note|journal)(?:\s+entry)?\s*(?:as|about|:)?\s+(?P<text>.+)$",
    )
    .expect("Invalid regex: journal pattern")
});

static TASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\b(?:add|put|create)\s+|\b(?:work|personal|family)\s*:\s*)(?P<text>.+)$",
    )
    .expect("Invalid regex: task pattern")
});

/// Classify `text` with the ordered rule set.
///
/// Unrecognised text is not an error: it comes back as `unknown` with zero
/// confidence. The only error is a malformed TODO command.
pub fn parse(text: &str) -> Result<ParsedIntent, CommandError> {
    let trimmed = text.trim();

    for (keyword, kind) in PREFIX_RULES {
        if let Some(rest) = strip_keyword(trimmed, keyword) {
            if *kind == IntentKind::Todo {
                return parse_todo(rest);
            }
            return Ok(ParsedIntent::matched(*kind, rest));
        }
    }

    if let Some(caps) = REMINDER_RE.captures(trimmed) {
        let time = caps
            .name("clock")
            .or_else(|| caps.name("relative"))
            .map(|m| m.as_str().trim().to_lowercase())
            .unwrap_or_default();
        return Ok(
            ParsedIntent::matched(IntentKind::Reminder, caps["text"].trim())
                .with_attribute("time", time),
        );
    }

    if let Some(caps) = JOURNAL_RE.captures(trimmed) {
        let body = caps["text"].trim();
        return Ok(match caps["kind"].to_lowercase().as_str() {
            "mood" => ParsedIntent::matched(IntentKind::Mood, format!("track {}", body)),
            _ => ParsedIntent::matched(IntentKind::Thought, body),
        });
    }

    if let Some(caps) = TASK_RE.captures(trimmed) {
        let lower = trimmed.to_lowercase();
        let category = if lower.contains("work") {
            "work"
        } else if lower.contains("family") {
            "family"
        } else {
            "self_care"
        };
        return Ok(ParsedIntent::matched(IntentKind::Todo, caps["text"].trim())
            .with_category(category)
            .with_action(TodoAction::Add.as_str()));
    }

    Ok(ParsedIntent::unknown(trimmed))
}

fn parse_todo(rest: &str) -> Result<ParsedIntent, CommandError> {
    let command = TodoCommand::parse(rest)?;
    Ok(ParsedIntent::matched(IntentKind::Todo, command.content)
        .with_category(command.category.as_str())
        .with_action(command.action.as_str()))
}

/// Case-insensitive keyword prefix. The keyword must be followed by `:`,
/// whitespace or the end of input; returns the remaining payload.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }

    let rest = &text[keyword.len()..];
    match rest.chars().next() {
        None => Some(""),
        Some(':') => Some(rest[1..].trim()),
        Some(c) if c.is_whitespace() => {
            Some(rest.trim_start().trim_start_matches(':').trim())
        }
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_prefix() {
        let parsed = parse("HIGHLIGHT: shipped the release").unwrap();
        assert_eq!(parsed.intent, IntentKind::Highlight);
        assert_eq!(parsed.content, "shipped the release");
        assert_eq!(parsed.confidence, 1.0);
    }

    #[test]
    fn test_prefixes_are_case_insensitive_and_keep_content_case() {
        let parsed = parse("gratitude  My Sister's Call").unwrap();
        assert_eq!(parsed.intent, IntentKind::Gratitude);
        assert_eq!(parsed.content, "My Sister's Call");

        let parsed = parse("Idea : Build a Bot").unwrap();
        assert_eq!(parsed.intent, IntentKind::Idea);
        assert_eq!(parsed.content, "Build a Bot");
    }

    #[test]
    fn test_prefix_needs_a_word_boundary() {
        let parsed = parse("Idealism is underrated").unwrap();
        assert_ne!(parsed.intent, IntentKind::Idea);
    }

    #[test]
    fn test_todo_sub_grammar() {
        let parsed = parse("TODO: work add buy milk").unwrap();
        assert_eq!(parsed.intent, IntentKind::Todo);
        assert_eq!(parsed.category.as_deref(), Some("work"));
        assert_eq!(parsed.action.as_deref(), Some("add"));
        assert_eq!(parsed.content, "buy milk");
    }

    #[test]
    fn test_malformed_todo_is_an_error() {
        assert_eq!(
            parse("TODO: badcategory list"),
            Err(CommandError::InvalidTodoCategory("badcategory".to_string()))
        );
        assert_eq!(parse("TODO: work"), Err(CommandError::MissingTodoParts));
        assert_eq!(
            parse("todo family finish"),
            Err(CommandError::InvalidTodoAction("finish".to_string()))
        );
    }

    #[test]
    fn test_budget_prefixes() {
        assert_eq!(
            parse("EXPENSE 12.50 food lunch").unwrap().intent,
            IntentKind::Expense
        );
        assert_eq!(parse("income 1000 salary").unwrap().intent, IntentKind::Income);
        assert_eq!(
            parse("GOAL: food 300 eat out less").unwrap().intent,
            IntentKind::BudgetGoal
        );
        let summary = parse("budget summary").unwrap();
        assert_eq!(summary.intent, IntentKind::BudgetGoal);
        assert_eq!(summary.content, "summary");
    }

    #[test]
    fn test_reminder_with_clock_time() {
        let parsed = parse("Remind me to call mom at 5:30 pm").unwrap();
        assert_eq!(parsed.intent, IntentKind::Reminder);
        assert_eq!(parsed.content, "call mom");
        assert_eq!(parsed.attribute_str("time"), Some("5:30 pm"));
    }

    #[test]
    fn test_reminder_with_relative_time() {
        let parsed = parse("please remind me to water the plants tomorrow").unwrap();
        assert_eq!(parsed.intent, IntentKind::Reminder);
        assert_eq!(parsed.content, "water the plants");
        assert_eq!(parsed.attribute_str("time"), Some("tomorrow"));
    }

    #[test]
    fn test_reminder_without_time_is_not_a_reminder() {
        let parsed = parse("remind me to buy 2 apples").unwrap();
        assert_ne!(parsed.intent, IntentKind::Reminder);
    }

    #[test]
    fn test_journal_phrases() {
        let parsed = parse("log my mood as 4 pretty good day").unwrap();
        assert_eq!(parsed.intent, IntentKind::Mood);
        assert_eq!(parsed.content, "track 4 pretty good day");

        let parsed = parse("write a note about the offsite agenda").unwrap();
        assert_eq!(parsed.intent, IntentKind::Thought);
        assert_eq!(parsed.content, "the offsite agenda");
    }

    #[test]
    fn test_task_phrases() {
        let parsed = parse("add finish the report for work").unwrap();
        assert_eq!(parsed.intent, IntentKind::Todo);
        assert_eq!(parsed.category.as_deref(), Some("work"));
        assert_eq!(parsed.action.as_deref(), Some("add"));
        assert_eq!(parsed.content, "finish the report for work");

        let parsed = parse("family: plan the picnic").unwrap();
        assert_eq!(parsed.category.as_deref(), Some("family"));
        assert_eq!(parsed.content, "plan the picnic");

        let parsed = parse("personal: book a massage").unwrap();
        assert_eq!(parsed.category.as_deref(), Some("self_care"));
    }

    #[test]
    fn test_unrecognised_text_is_unknown() {
        let parsed = parse("hello there").unwrap();
        assert_eq!(parsed.intent, IntentKind::Unknown);
        assert_eq!(parsed.confidence, 0.0);
        assert_eq!(parsed.content, "hello there");

        assert_eq!(parse("").unwrap().intent, IntentKind::Unknown);
    }

    #[test]
    fn test_parse_is_pure() {
        for text in [
            "TODO: work add buy milk",
            "remind me to stretch at 7am",
            "something random",
            "TODO: nope",
        ] {
            assert_eq!(parse(text), parse(text));
        }
    }

    #[test]
    fn test_non_ascii_input_does_not_panic() {
        assert_eq!(parse("日本語のテキスト").unwrap().intent, IntentKind::Unknown);
        assert_eq!(parse("é").unwrap().intent, IntentKind::Unknown);
    }
}
