//! Google Calendar REST contract.

use kunna::config::CalendarConfig;
use kunna::handlers::CalendarService;
use kunna::handlers::calendar::{GoogleCalendar, NOT_AUTHENTICATED};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn calendar(server: &MockServer, token: &str) -> GoogleCalendar {
    GoogleCalendar::new(&CalendarConfig {
        access_token: token.into(),
        api_base: server.uri(),
        calendar_id: "primary".into(),
        event_duration_minutes: 60,
    })
    .unwrap()
}

#[tokio::test]
async fn briefing_lists_the_days_events() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(header("authorization", "Bearer tok"))
        .and(query_param("singleEvents", "true"))
        .and(query_param("orderBy", "startTime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"summary": "Offsite", "start": {"date": "2026-03-14"}},
                {"summary": "Standup", "start": {"dateTime": "2026-03-14T09:30:00Z"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let briefing = calendar(&server, "tok").daily_briefing("today").await.unwrap();
    let lines: Vec<&str> = briefing.lines().collect();
    assert_eq!(lines[0], "Here is your schedule for today:");
    assert_eq!(lines[1], "- All day: Offsite");
    assert!(lines[2].starts_with("- At ") && lines[2].ends_with(": Standup"), "{}", lines[2]);
}

#[tokio::test]
async fn empty_day() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    assert_eq!(
        calendar(&server, "tok").daily_briefing("tomorrow").await.unwrap(),
        "You have no upcoming events scheduled for tomorrow."
    );
}

#[tokio::test]
async fn create_event_posts_one_hour_block() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(body_partial_json(json!({
            "summary": "Dentist",
            "start": {"dateTime": "2026-03-14T15:00:00", "timeZone": "UTC"},
            "end": {"dateTime": "2026-03-14T16:00:00", "timeZone": "UTC"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "evt1",
            "summary": "Dentist"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = calendar(&server, "tok")
        .create_event("Dentist", "2026-03-14T15:00:00")
        .await
        .unwrap();
    assert_eq!(
        reply,
        "Event created successfully! You can see 'Dentist' on your calendar."
    );
}

#[tokio::test]
async fn expired_token_reports_not_authenticated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": 401, "message": "Invalid Credentials"}
        })))
        .mount(&server)
        .await;

    let err = calendar(&server, "stale").daily_briefing("today").await.unwrap_err();
    assert!(err.to_string().contains(NOT_AUTHENTICATED));
}

#[tokio::test]
async fn server_errors_carry_the_api_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "Bad Request: invalid start"}
        })))
        .mount(&server)
        .await;

    let err = calendar(&server, "tok")
        .create_event("X", "2026-03-14 10:00")
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "calendar error: Calendar API returned HTTP 400: Bad Request: invalid start"
    );
}
