//! Google Calendar v3 over REST with a bearer access token.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::CalendarService;
use crate::config::CalendarConfig;
use crate::error::{AssistantError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Shown when no usable access token is configured.
pub const NOT_AUTHENTICATED: &str = "I can't access Google Calendar. It seems I'm not \
authenticated. Please provide a valid access token (GOOGLE_CALENDAR_TOKEN) and try again.";

/// Calendar client for a single calendar.
pub struct GoogleCalendar {
    client: reqwest::Client,
    api_base: String,
    calendar_id: String,
    access_token: String,
    event_duration: TimeDelta,
}

impl std::fmt::Debug for GoogleCalendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendar")
            .field("api_base", &self.api_base)
            .field("calendar_id", &self.calendar_id)
            .field("authenticated", &!self.access_token.is_empty())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    start: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default)]
    date_time: Option<String>,
}

impl GoogleCalendar {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CalendarConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AssistantError::Calendar(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            calendar_id: config.calendar_id.clone(),
            access_token: config.access_token.trim().to_owned(),
            event_duration: TimeDelta::minutes(config.event_duration_minutes.max(1)),
        })
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn token(&self) -> Result<&str> {
        if self.access_token.is_empty() {
            Err(AssistantError::Calendar(NOT_AUTHENTICATED.to_owned()))
        } else {
            Ok(&self.access_token)
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AssistantError::Calendar(NOT_AUTHENTICATED.to_owned()));
        }
        let body = response.text().await.unwrap_or_default();
        Err(AssistantError::Calendar(format!(
            "Calendar API returned HTTP {}: {}",
            status.as_u16(),
            api_error_message(&body)
        )))
    }
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    async fn daily_briefing(&self, day: &str) -> Result<String> {
        let Some(date) = resolve_day(day, Local::now().date_naive()) else {
            return Ok("I can only check the schedule for 'today' or 'tomorrow'.".to_owned());
        };
        let token = self.token()?;
        let (start, end) = day_bounds(date)?;
        debug!(%start, %end, "listing calendar events");

        let response = self
            .client
            .get(self.events_url())
            .bearer_auth(token)
            .query(&[
                ("timeMin", start.to_rfc3339()),
                ("timeMax", end.to_rfc3339()),
                ("singleEvents", "true".to_owned()),
                ("orderBy", "startTime".to_owned()),
            ])
            .send()
            .await
            .map_err(|e| AssistantError::Calendar(format!("calendar request failed: {e}")))?;
        let list: EventList = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AssistantError::Calendar(format!("invalid event list: {e}")))?;

        Ok(format_briefing(day, &list.items))
    }

    async fn create_event(&self, summary: &str, start_time: &str) -> Result<String> {
        let token = self.token()?;
        let start = parse_start_time(start_time).ok_or_else(|| {
            AssistantError::Calendar(format!(
                "could not understand the start time '{start_time}' (expected YYYY-MM-DDTHH:MM:SS)"
            ))
        })?;
        let end = start + self.event_duration;
        let body = serde_json::json!({
            "summary": summary,
            "start": {"dateTime": start.format("%Y-%m-%dT%H:%M:%S").to_string(), "timeZone": "UTC"},
            "end": {"dateTime": end.format("%Y-%m-%dT%H:%M:%S").to_string(), "timeZone": "UTC"},
        });

        let response = self
            .client
            .post(self.events_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Calendar(format!("calendar request failed: {e}")))?;
        let created: Event = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AssistantError::Calendar(format!("invalid created event: {e}")))?;

        let title = created.summary.unwrap_or_else(|| summary.to_owned());
        info!(%title, %start, "calendar event created");
        Ok(format!(
            "Event created successfully! You can see '{title}' on your calendar."
        ))
    }
}

/// Map `today`/`tomorrow` to a date.
fn resolve_day(day: &str, today: NaiveDate) -> Option<NaiveDate> {
    match day.trim().to_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => today.succ_opt(),
        _ => None,
    }
}

/// Local midnight to midnight for `date`, in UTC.
fn day_bounds(date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let local_midnight = |d: NaiveDate| {
        d.and_hms_opt(0, 0, 0)
            .and_then(|t| t.and_local_timezone(Local).earliest())
            .map(|t| t.with_timezone(&Utc))
    };
    let next = date.succ_opt();
    match (local_midnight(date), next.and_then(local_midnight)) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(AssistantError::Calendar(format!(
            "cannot compute the time window for {date}"
        ))),
    }
}

/// Accepts `YYYY-MM-DDTHH:MM[:SS]`, a space separator, or RFC 3339 with an offset.
fn parse_start_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn format_briefing(day: &str, events: &[Event]) -> String {
    if events.is_empty() {
        return format!("You have no upcoming events scheduled for {day}.");
    }
    let mut briefing = format!("Here is your schedule for {day}:");
    for event in events {
        let title = event.summary.as_deref().unwrap_or("(no title)");
        let timed = event.start.as_ref().and_then(|s| s.date_time.as_deref());
        let line = match timed {
            Some(dt) => {
                let when = DateTime::parse_from_rfc3339(dt)
                    .map(|t| t.with_timezone(&Local).format("%I:%M %p").to_string())
                    .unwrap_or_else(|_| dt.to_owned());
                format!("\n- At {when}: {title}")
            }
            None => format!("\n- All day: {title}"),
        };
        briefing.push_str(&line);
    }
    briefing
}

/// Google APIs report errors as `{"error": {"message": ...}}`.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_owned())
}
