//! Yahoo Finance chart contract and price alert checks.

use kunna::action::PriceDirection;
use kunna::config::FinanceConfig;
use kunna::handlers::finance::YahooFinance;
use kunna::handlers::{MarketData, NotificationKind, Notifier};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chart(price: f64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "chart": {
            "result": [{"meta": {"symbol": "X", "regularMarketPrice": price}}],
            "error": null
        }
    }))
}

fn finance(server: &MockServer, notifier: Notifier) -> YahooFinance {
    YahooFinance::new(
        &FinanceConfig {
            api_base: server.uri(),
            alert_check_interval_secs: 3600,
        },
        notifier,
    )
    .unwrap()
}

#[tokio::test]
async fn quote_is_formatted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/MSFT"))
        .and(query_param("interval", "1d"))
        .respond_with(chart(412.3))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(
        finance(&server, Notifier::default()).stock_price("msft").await.unwrap(),
        "The current price of MSFT is $412.30."
    );
}

#[tokio::test]
async fn unknown_ticker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "chart": {"result": null, "error": {"code": "Not Found"}}
        })))
        .mount(&server)
        .await;

    assert_eq!(
        finance(&server, Notifier::default()).stock_price("ZZZZ").await.unwrap(),
        "Sorry, I couldn't find a current price for ZZZZ. It might be an invalid ticker."
    );
}

#[tokio::test]
async fn upstream_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = finance(&server, Notifier::default())
        .stock_price("AAPL")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("HTTP 503"));
}

#[tokio::test]
async fn triggered_alert_is_published_once_and_removed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAPL"))
        .respond_with(chart(251.5))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/TSLA"))
        .respond_with(chart(180.0))
        .mount(&server)
        .await;

    let notifier = Notifier::default();
    let mut rx = notifier.subscribe();
    let finance = finance(&server, notifier);
    finance
        .set_price_alert("AAPL", PriceDirection::Above, 250.0)
        .await
        .unwrap();
    finance
        .set_price_alert("TSLA", PriceDirection::Below, 150.0)
        .await
        .unwrap();

    finance.check_alerts_now().await;

    let notification = rx.try_recv().unwrap();
    assert_eq!(notification.kind, NotificationKind::PriceAlert);
    assert_eq!(
        notification.message,
        "Price alert for AAPL! It has gone above your target of $250.00 and is now at $251.50."
    );
    assert!(rx.try_recv().is_err());

    let remaining = finance.alerts();
    assert_eq!(remaining.len(), 1);
    assert!(remaining.contains_key("TSLA"));

    finance.check_alerts_now().await;
    assert!(rx.try_recv().is_err());
}
