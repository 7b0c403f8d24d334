//! Stock and crypto quotes from the Yahoo Finance chart API, plus price
//! alerts checked by a background task.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{MarketData, NotificationKind, Notifier};
use crate::action::PriceDirection;
use crate::config::FinanceConfig;
use crate::error::{AssistantError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; kunna/", env!("CARGO_PKG_VERSION"), ")");

/// An active alert for one ticker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceAlert {
    pub direction: PriceDirection,
    pub target: f64,
}

type AlertMap = Arc<Mutex<BTreeMap<String, PriceAlert>>>;

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,
}

/// Quote fetcher shared by request handling and the alert watcher.
#[derive(Debug, Clone)]
struct QuoteClient {
    client: reqwest::Client,
    api_base: String,
}

impl QuoteClient {
    /// Latest price, or `None` when the ticker is unknown.
    async fn price(&self, ticker: &str) -> Result<Option<f64>> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.api_base,
            urlencoding::encode(ticker)
        );
        let response = self
            .client
            .get(&url)
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await
            .map_err(|e| AssistantError::Finance(format!("quote request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AssistantError::Finance(format!(
                "quote service returned HTTP {}",
                status.as_u16()
            )));
        }
        let envelope: ChartEnvelope = response
            .json()
            .await
            .map_err(|e| AssistantError::Finance(format!("invalid quote response: {e}")))?;
        Ok(envelope
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .and_then(|r| r.meta.regular_market_price)
            .filter(|p| p.is_finite()))
    }
}

/// Quotes and alerts. Dropping it stops the alert watcher.
pub struct YahooFinance {
    quotes: QuoteClient,
    alerts: AlertMap,
    check_interval: Duration,
    notifier: Notifier,
    watcher: Mutex<Option<CancellationToken>>,
}

impl std::fmt::Debug for YahooFinance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooFinance")
            .field("api_base", &self.quotes.api_base)
            .field("check_interval", &self.check_interval)
            .finish_non_exhaustive()
    }
}

impl YahooFinance {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &FinanceConfig, notifier: Notifier) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AssistantError::Finance(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            quotes: QuoteClient {
                client,
                api_base: config.api_base.trim_end_matches('/').to_owned(),
            },
            alerts: Arc::new(Mutex::new(BTreeMap::new())),
            check_interval: Duration::from_secs(config.alert_check_interval_secs.max(1)),
            notifier,
            watcher: Mutex::new(None),
        })
    }

    /// Snapshot of the active alerts.
    pub fn alerts(&self) -> BTreeMap<String, PriceAlert> {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Check every alert once, publishing and removing triggered ones.
    pub async fn check_alerts_now(&self) {
        check_alerts(&self.quotes, &self.alerts, &self.notifier).await;
    }

    /// Start the periodic checker unless it is already running.
    fn ensure_watcher(&self) {
        let mut watcher = self.watcher.lock().unwrap_or_else(|e| e.into_inner());
        if watcher.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let quotes = self.quotes.clone();
        let alerts = Arc::clone(&self.alerts);
        let notifier = self.notifier.clone();
        let period = self.check_interval;

        tokio::spawn(async move {
            info!(secs = period.as_secs(), "price alert checker started");
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    () = task_cancel.cancelled() => break,
                    _ = interval.tick() => check_alerts(&quotes, &alerts, &notifier).await,
                }
            }
            debug!("price alert checker stopped");
        });
        *watcher = Some(cancel);
    }
}

impl Drop for YahooFinance {
    fn drop(&mut self) {
        if let Some(cancel) = self
            .watcher
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            cancel.cancel();
        }
    }
}

#[async_trait]
impl MarketData for YahooFinance {
    async fn stock_price(&self, ticker: &str) -> Result<String> {
        let symbol = ticker.trim().to_uppercase();
        info!(%symbol, "fetching quote");
        Ok(match self.quotes.price(&symbol).await? {
            Some(price) => format!("The current price of {symbol} is ${}.", format_money(price)),
            None => format!(
                "Sorry, I couldn't find a current price for {}. It might be an invalid ticker.",
                ticker.trim()
            ),
        })
    }

    async fn set_price_alert(
        &self,
        ticker: &str,
        direction: PriceDirection,
        target_price: f64,
    ) -> Result<String> {
        let symbol = ticker.trim().to_uppercase();
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                symbol.clone(),
                PriceAlert {
                    direction,
                    target: target_price,
                },
            );
        self.ensure_watcher();
        info!(%symbol, %direction, target_price, "price alert set");
        Ok(format!(
            "Okay, alert set. I will alert you if {symbol} goes {direction} ${}.",
            format_money(target_price)
        ))
    }

    fn active_alerts(&self) -> Result<String> {
        let alerts = self.alerts.lock().unwrap_or_else(|e| e.into_inner());
        if alerts.is_empty() {
            return Ok("You have no active price alerts.".to_owned());
        }
        let lines: Vec<String> = alerts
            .iter()
            .map(|(symbol, alert)| {
                format!(
                    "- {symbol}: Alert if price goes {} ${}",
                    alert.direction,
                    format_money(alert.target)
                )
            })
            .collect();
        Ok(format!("Here are your active alerts:\n{}", lines.join("\n")))
    }

    fn has_active_alerts(&self) -> bool {
        !self
            .alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

async fn check_alerts(quotes: &QuoteClient, alerts: &AlertMap, notifier: &Notifier) {
    let snapshot: Vec<(String, PriceAlert)> = alerts
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();

    for (symbol, alert) in snapshot {
        let price = match quotes.price(&symbol).await {
            Ok(Some(price)) => price,
            Ok(None) => continue,
            Err(e) => {
                warn!(%symbol, "could not check price alert: {e}");
                continue;
            }
        };
        debug!(%symbol, price, target = alert.target, "checked price alert");
        if !alert.direction.is_triggered(price, alert.target) {
            continue;
        }
        let removed = alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&symbol);
        // The alert may have been replaced or removed while we were fetching.
        if removed != Some(alert) {
            continue;
        }
        notifier.publish(
            NotificationKind::PriceAlert,
            format!(
                "Price alert for {symbol}! It has gone {} your target of ${} and is now at ${}.",
                alert.direction,
                format_money(alert.target),
                format_money(price)
            ),
        );
    }
}

/// Two decimals with thousands separators: `1234.5` → `1,234.50`.
pub fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}
