use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, Duration, Local, NaiveDateTime, NaiveTime};

use super::split_action;
use crate::intent::registry::IntentHandler;
use crate::intent::types::ParsedIntent;
use crate::store::{parse_timestamp, Store};

const TRACK_USAGE: &str =
    "❌ Please provide your mood score (1-5). Format: track [mood] [energy] [stress] [notes]";

#[derive(Debug, PartialEq)]
struct MoodReading {
    score: u8,
    energy: Option<u8>,
    stress: Option<u8>,
    notes: Option<String>,
}

const SCORE_RANGE: &str = "❌ Mood score must be between 1 and 5";
const LEVEL_RANGE: &str = "❌ Energy and stress levels must be between 1 and 5";

/// Whole number on the 1-5 scale.
fn level(value: f64) -> Option<u8> {
    (value.fract() == 0.0 && (1.0..=5.0).contains(&value)).then_some(value as u8)
}

/// `<score> [energy] [stress] [notes]`. Energy and stress are only taken
/// when numeric, so free-text notes may follow the score directly.
fn parse_reading(args: &str) -> Result<MoodReading, &'static str> {
    let mut tokens = args.split_whitespace().peekable();
    let score = tokens
        .next()
        .and_then(|t| t.trim_end_matches("/5").parse::<f64>().ok())
        .ok_or(TRACK_USAGE)?;
    let score = level(score).ok_or(SCORE_RANGE)?;

    let mut levels = [None, None];
    for slot in levels.iter_mut() {
        let Some(value) = tokens.peek().and_then(|t| t.parse::<f64>().ok()) else {
            break;
        };
        tokens.next();
        *slot = Some(level(value).ok_or(LEVEL_RANGE)?);
    }

    let notes = tokens.collect::<Vec<_>>().join(" ");
    Ok(MoodReading {
        score,
        energy: levels[0],
        stress: levels[1],
        notes: Some(notes).filter(|n| !n.is_empty()),
    })
}

/// Classifier-reported levels; `None` when it gave no mood score.
fn reading_from_attributes(intent: &ParsedIntent) -> Option<Result<MoodReading, &'static str>> {
    let score = intent.attribute_f64("mood_score")?;
    Some(attribute_reading(intent, score))
}

fn attribute_reading(intent: &ParsedIntent, score: f64) -> Result<MoodReading, &'static str> {
    let optional = |key: &str| -> Result<Option<u8>, &'static str> {
        intent
            .attribute_f64(key)
            .map(|v| level(v).ok_or(LEVEL_RANGE))
            .transpose()
    };

    Ok(MoodReading {
        score: level(score).ok_or(SCORE_RANGE)?,
        energy: optional("energy_level")?,
        stress: optional("stress_level")?,
        notes: intent
            .attribute_str("notes")
            .map(str::to_string)
            .or_else(|| Some(intent.content.trim().to_string()).filter(|c| !c.is_empty())),
    })
}

/// Midnight of the most recent Sunday.
fn start_of_week(now: NaiveDateTime) -> NaiveDateTime {
    let days = now.date().weekday().num_days_from_sunday() as i64;
    (now.date() - Duration::days(days)).and_time(NaiveTime::MIN)
}

pub struct MoodHandler {
    store: Store,
}

impl MoodHandler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn track(&self, user_id: &str, reading: MoodReading) -> Result<String> {
        self.store
            .save_mood(
                user_id,
                reading.score,
                reading.energy,
                reading.stress,
                reading.notes.as_deref(),
            )
            .await?;

        let mut reply = format!("✅ Mood tracked successfully! Score: {}", reading.score);
        if let Some(energy) = reading.energy {
            reply.push_str(&format!(", Energy: {}", energy));
        }
        if let Some(stress) = reading.stress {
            reply.push_str(&format!(", Stress: {}", stress));
        }
        Ok(reply)
    }

    async fn view(&self, user_id: &str) -> Result<String> {
        let since = start_of_week(Local::now().naive_local());
        let moods = self.store.moods_since(user_id, since).await?;
        if moods.is_empty() {
            return Ok("📊 No mood entries found for this week.".to_string());
        }

        let mut reply = String::from("📊 Your Mood History:\n");
        for mood in moods {
            let day = parse_timestamp(&mood.entry_date)
                .map(|at| at.format("%a %d %b").to_string())
                .unwrap_or_else(|| mood.entry_date.clone());
            reply.push_str(&format!("\n{}:\nMood: {}/5", day, mood.mood_score));
            if let Some(energy) = mood.energy_level {
                reply.push_str(&format!(" | Energy: {}/5", energy));
            }
            if let Some(stress) = mood.stress_level {
                reply.push_str(&format!(" | Stress: {}/5", stress));
            }
            if let Some(notes) = &mood.notes {
                reply.push_str(&format!("\nNotes: {}", notes));
            }
            reply.push('\n');
        }
        Ok(reply.trim_end().to_string())
    }
}

#[async_trait]
impl IntentHandler for MoodHandler {
    async fn handle(&self, user_id: &str, intent: &ParsedIntent) -> Result<String> {
        if let Some(reading) = reading_from_attributes(intent) {
            return match reading {
                Ok(reading) => self.track(user_id, reading).await,
                Err(hint) => Ok(hint.to_string()),
            };
        }

        let (action, args) = split_action(intent);
        let args = match action.as_str() {
            "view" => return self.view(user_id).await,
            "track" => args,
            // A bare score reads as `track`.
            a if a.trim_end_matches("/5").parse::<f64>().is_ok() => intent.content.trim(),
            _ => return Ok("❌ Invalid mood command. Use: track or view".to_string()),
        };

        match parse_reading(args) {
            Ok(reading) => self.track(user_id, reading).await,
            Err(hint) => Ok(hint.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::types::IntentKind;

    fn mood(content: &str) -> ParsedIntent {
        ParsedIntent::matched(IntentKind::Mood, content)
    }

    #[test]
    fn test_parse_reading() {
        assert_eq!(
            parse_reading("4 3 2 long day").unwrap(),
            MoodReading {
                score: 4,
                energy: Some(3),
                stress: Some(2),
                notes: Some("long day".to_string()),
            }
        );
        assert_eq!(
            parse_reading("5 feeling great").unwrap(),
            MoodReading {
                score: 5,
                energy: None,
                stress: None,
                notes: Some("feeling great".to_string()),
            }
        );
        assert_eq!(parse_reading("").unwrap_err(), TRACK_USAGE);
        assert!(parse_reading("6").unwrap_err().contains("between 1 and 5"));
        assert!(parse_reading("3 9").unwrap_err().contains("Energy and stress"));
    }

    #[test]
    fn test_start_of_week_is_sunday_midnight() {
        let wednesday =
            NaiveDateTime::parse_from_str("2026-04-15 18:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(
            start_of_week(wednesday).to_string(),
            "2026-04-12 00:00:00"
        );
        let sunday = NaiveDateTime::parse_from_str("2026-04-12 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(start_of_week(sunday).to_string(), "2026-04-12 00:00:00");
    }

    #[tokio::test]
    async fn test_track_and_view() {
        let handler = MoodHandler::new(Store::open_in_memory().unwrap());

        let reply = handler.handle("u1", &mood("track 4 3 2")).await.unwrap();
        assert_eq!(reply, "✅ Mood tracked successfully! Score: 4, Energy: 3, Stress: 2");

        let reply = handler.handle("u1", &mood("3 tired")).await.unwrap();
        assert_eq!(reply, "✅ Mood tracked successfully! Score: 3");

        let reply = handler.handle("u1", &mood("view")).await.unwrap();
        assert!(reply.starts_with("📊 Your Mood History:"));
        assert!(reply.contains("Mood: 3/5\nNotes: tired"));
        assert!(reply.contains("Mood: 4/5 | Energy: 3/5 | Stress: 2/5"));
    }

    #[tokio::test]
    async fn test_attributes_take_precedence() {
        let handler = MoodHandler::new(Store::open_in_memory().unwrap());
        let intent = mood("feeling great, high energy")
            .with_attribute("mood_score", 5)
            .with_attribute("energy_level", "4");

        let reply = handler.handle("u1", &intent).await.unwrap();
        assert_eq!(reply, "✅ Mood tracked successfully! Score: 5, Energy: 4");

        let bad = mood("x").with_attribute("mood_score", 8);
        let reply = handler.handle("u1", &bad).await.unwrap();
        assert_eq!(reply, SCORE_RANGE);
    }

    #[tokio::test]
    async fn test_invalid_mood_command() {
        let handler = MoodHandler::new(Store::open_in_memory().unwrap());
        let reply = handler.handle("u1", &mood("dance")).await.unwrap();
        assert_eq!(reply, "❌ Invalid mood command. Use: track or view");
    }
}
