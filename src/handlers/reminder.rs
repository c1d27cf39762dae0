use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;
use tracing::info;

use crate::intent::registry::IntentHandler;
use crate::intent::types::ParsedIntent;
use crate::store::Store;

static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<hour>\d{1,2})(?::(?P<minute>\d{2}))?\s*(?P<meridiem>am|pm)?$")
        .expect("Invalid regex: clock time")
});

const ABSOLUTE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

const USAGE: &str = "❌ Please tell me when. Format: Remind me to [text] at [time]";

fn clock_time(spec: &str) -> Option<NaiveTime> {
    let caps = CLOCK_RE.captures(spec)?;
    let mut hour: u32 = caps["hour"].parse().ok()?;
    let minute: u32 = caps.name("minute").map_or(Ok(0), |m| m.as_str().parse()).ok()?;

    if let Some(meridiem) = caps.name("meridiem") {
        if !(1..=12).contains(&hour) {
            return None;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
        hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Turn a reminder time spec into a local due time.
///
/// `HH[:MM] [am|pm]` is the next occurrence of that clock time, `tomorrow`
/// is 09:00 tomorrow, `later` is one hour from `now`. Full timestamps are
/// taken as given.
pub fn resolve_due_at(spec: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let spec = spec.trim().to_lowercase();
    match spec.as_str() {
        "later" => return Some(now + Duration::hours(1)),
        "tomorrow" => {
            let nine = NaiveTime::from_hms_opt(9, 0, 0)?;
            return Some((now.date() + Duration::days(1)).and_time(nine));
        }
        _ => {}
    }

    if let Some(at) = ABSOLUTE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&spec.to_uppercase(), fmt).ok())
    {
        return Some(at);
    }

    let time = clock_time(&spec)?;
    let today = now.date().and_time(time);
    if today > now {
        Some(today)
    } else {
        Some(today + Duration::days(1))
    }
}

pub struct ReminderHandler {
    store: Store,
}

impl ReminderHandler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IntentHandler for ReminderHandler {
    async fn handle(&self, user_id: &str, intent: &ParsedIntent) -> Result<String> {
        let text = intent.content.trim();
        let Some(spec) = intent.attribute_str("time") else {
            return Ok(USAGE.to_string());
        };
        if text.is_empty() {
            return Ok(USAGE.to_string());
        }
        let Some(due_at) = resolve_due_at(spec, Local::now().naive_local()) else {
            return Ok(format!(
                "❌ I couldn't understand the time \"{}\". Try 5pm, 17:30, tomorrow or later.",
                spec
            ));
        };

        self.store.create_reminder(user_id, text, due_at).await?;
        info!("Reminder set for user {} at {}", user_id, due_at);
        Ok(format!(
            "⏰ Reminder set for {}: {}",
            due_at.format("%Y-%m-%d %H:%M"),
            text
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::types::IntentKind;

    fn at(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_clock_times() {
        let now = at("2026-06-10 10:00");
        assert_eq!(resolve_due_at("17", now), Some(at("2026-06-10 17:00")));
        assert_eq!(resolve_due_at("17:45", now), Some(at("2026-06-10 17:45")));
        assert_eq!(resolve_due_at("5:30 pm", now), Some(at("2026-06-10 17:30")));
        assert_eq!(resolve_due_at("5PM", now), Some(at("2026-06-10 17:00")));
        assert_eq!(resolve_due_at("12 am", now), Some(at("2026-06-11 00:00")));
        assert_eq!(resolve_due_at("12pm", now), Some(at("2026-06-10 12:00")));
    }

    #[test]
    fn test_past_times_roll_to_next_day() {
        let now = at("2026-06-10 10:00");
        assert_eq!(resolve_due_at("9am", now), Some(at("2026-06-11 09:00")));
        assert_eq!(resolve_due_at("10:00", now), Some(at("2026-06-11 10:00")));
    }

    #[test]
    fn test_relative_specs() {
        let now = at("2026-06-30 22:15");
        assert_eq!(resolve_due_at("later", now), Some(at("2026-06-30 23:15")));
        assert_eq!(resolve_due_at("Tomorrow", now), Some(at("2026-07-01 09:00")));
        assert_eq!(
            resolve_due_at("2026-07-04 08:30", now),
            Some(at("2026-07-04 08:30"))
        );
    }

    #[test]
    fn test_invalid_specs() {
        let now = at("2026-06-10 10:00");
        assert_eq!(resolve_due_at("25:00", now), None);
        assert_eq!(resolve_due_at("13pm", now), None);
        assert_eq!(resolve_due_at("noonish", now), None);
        assert_eq!(resolve_due_at("", now), None);
    }

    #[tokio::test]
    async fn test_handler_stores_reminder() {
        let store = Store::open_in_memory().unwrap();
        let (user_id, _) = store.ensure_user("whatsapp:+1777", None).await.unwrap();
        let handler = ReminderHandler::new(store.clone());

        let intent = ParsedIntent::matched(IntentKind::Reminder, "drink water")
            .with_attribute("time", "later");
        let reply = handler.handle(&user_id, &intent).await.unwrap();
        assert!(reply.starts_with("⏰ Reminder set for "));
        assert!(reply.ends_with(": drink water"));

        let due = store
            .due_reminders(Local::now().naive_local() + Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].reminder_text, "drink water");
    }

    #[tokio::test]
    async fn test_handler_usage_hints() {
        let handler = ReminderHandler::new(Store::open_in_memory().unwrap());

        let no_time = ParsedIntent::matched(IntentKind::Reminder, "call mom");
        assert_eq!(handler.handle("u1", &no_time).await.unwrap(), USAGE);

        let bad_time = ParsedIntent::matched(IntentKind::Reminder, "call mom")
            .with_attribute("time", "whenever");
        let reply = handler.handle("u1", &bad_time).await.unwrap();
        assert!(reply.contains("\"whenever\""));
    }
}
