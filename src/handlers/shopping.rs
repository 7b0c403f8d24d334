//! Shopping and food delivery search, opened in the user's browser.

use std::sync::Arc;

use tracing::info;

use super::ShoppingSearch;
use crate::error::Result;

/// Opens a URL. Swapped out in tests.
pub type UrlOpener = Arc<dyn Fn(&str) -> Result<()> + Send + Sync>;

/// Supported platforms: lookup name, display name, search URL prefix.
const PLATFORMS: &[(&str, &str, &str)] = &[
    ("zomato", "Zomato", "https://www.zomato.com/search?q="),
    ("amazon", "Amazon", "https://www.amazon.in/s?k="),
];

/// Search URL for `item_name` on `platform`, with the display name.
pub fn search_url(platform: &str, item_name: &str) -> Option<(&'static str, String)> {
    let platform = platform.trim().to_lowercase();
    PLATFORMS
        .iter()
        .find(|(key, _, _)| *key == platform)
        .map(|(_, display, prefix)| {
            (
                *display,
                format!("{prefix}{}", urlencoding::encode(item_name.trim())),
            )
        })
}

/// Opens platform search pages in the browser.
pub struct BrowserShopping {
    opener: UrlOpener,
}

impl std::fmt::Debug for BrowserShopping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserShopping").finish_non_exhaustive()
    }
}

impl BrowserShopping {
    /// Uses the platform's default browser.
    pub fn system() -> Self {
        Self::with_opener(Arc::new(super::system::open_url))
    }

    pub fn with_opener(opener: UrlOpener) -> Self {
        Self { opener }
    }
}

impl ShoppingSearch for BrowserShopping {
    fn search_shopping(&self, platform: &str, item_name: &str) -> Result<String> {
        let Some((display, url)) = search_url(platform, item_name) else {
            return Ok(format!(
                "Sorry, I am currently configured to search only on Zomato and Amazon, not {}.",
                platform.trim()
            ));
        };
        info!(%url, "opening shopping search");
        (self.opener)(&url)?;
        Ok(format!(
            "I've opened a search for '{}' on {display} in your browser.",
            item_name.trim()
        ))
    }
}
