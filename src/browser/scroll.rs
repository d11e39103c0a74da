use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::errors::ScrapeError;
use super::engine::{Locator, RenderPage, WaitCondition};
use super::scripts;

/// Hard cap on entries opened by list enrichment.
pub const MAX_ENRICHED_ITEMS: usize = 10;
const FALLBACK_SCROLL_STEPS: u32 = 10;

/// Scroll to the bottom until the page height stops growing, then return to the top.
pub async fn smart_scroll(page: &mut dyn RenderPage, max_steps: u32) -> Result<u32, ScrapeError> {
    let mut last_height = page_height(page).await?;
    let mut steps_taken = 0;

    for step in 0..max_steps {
        steps_taken = step + 1;
        page.evaluate(scripts::SCROLL_TO_BOTTOM, Value::Null).await?;
        if let Err(e) = page.wait_for_load_state(WaitCondition::NetworkIdle, 1_500).await {
            debug!(error = %e, "Network still busy after scroll");
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        let mut new_height = page_height(page).await?;
        if new_height == last_height {
            tokio::time::sleep(Duration::from_secs(1)).await;
            new_height = page_height(page).await?;
            if new_height == last_height {
                debug!(step = steps_taken, "Page height stable, scroll finished");
                break;
            }
        }
        last_height = new_height;
    }

    page.evaluate(scripts::SCROLL_TO_TOP, Value::Null).await?;
    Ok(steps_taken)
}

async fn page_height(page: &mut dyn RenderPage) -> Result<f64, ScrapeError> {
    Ok(page.evaluate(scripts::SCROLL_HEIGHT, Value::Null).await?.as_f64().unwrap_or(0.0))
}

/// Selectors for a feed of entries whose details open in a side panel.
#[derive(Debug, Clone)]
pub struct ListSelectors {
    pub feed: String,
    pub item: String,
    pub detail_panel: String,
    pub website: String,
    pub phone: String,
    pub address: String,
    pub back_button: String,
}

impl Default for ListSelectors {
    fn default() -> Self {
        Self {
            feed: "div[role='feed']".into(),
            item: "div[role='feed'] > div[role='article']".into(),
            detail_panel: "div[role='main']".into(),
            website: r#"a[data-item-id="authority"]"#.into(),
            phone: r#"button[data-item-id^="phone"]"#.into(),
            address: r#"button[data-item-id="address"]"#.into(),
            back_button: "button[aria-label='Voltar'], button[aria-label='Back']".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryDetails {
    pub website: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl EntryDetails {
    pub fn is_empty(&self) -> bool {
        self.website.is_none() && self.phone.is_none() && self.address.is_none()
    }

    /// Marker block appended to the list entry so the model reads the details in place.
    pub fn to_html(&self) -> String {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(|s| escape_html(s.replace('\n', " ").trim()))
                .unwrap_or_else(|| "N/A".to_string())
        };
        format!(
            "<div class=\"enriched-info\" style=\"border: 2px solid #2AB17C; background: #e0ffee; \
             color: #000; padding: 8px; margin-top: 5px; font-weight: bold;\">\
             [ENRICHED DATA]: WEBSITE: {} PHONE: {} ADDRESS: {}</div>",
            clean(&self.website),
            clean(&self.phone),
            clean(&self.address),
        )
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Open each of the first `max_items` feed entries, read its contact details
/// and inject them back into the list. Returns how many entries were enriched.
pub async fn enrich_list(
    page: &mut dyn RenderPage,
    selectors: &ListSelectors,
    max_items: usize,
) -> Result<usize, ScrapeError> {
    let max_items = max_items.min(MAX_ENRICHED_ITEMS);

    if page.wait_for_selector(&selectors.feed, 5_000).await.is_err() {
        warn!(feed = %selectors.feed, "List feed not found, falling back to smart scroll");
        smart_scroll(page, FALLBACK_SCROLL_STEPS).await?;
        return Ok(0);
    }

    for _ in 0..3 {
        page.evaluate(scripts::SCROLL_CONTAINER_TO_END, json!(selectors.feed)).await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    let count = page.count(&selectors.item).await?;
    let limit = count.min(max_items);
    info!(found = count, limit, "Enriching list entries");

    let mut enriched = 0;
    for index in 0..limit {
        match enrich_entry(page, selectors, index).await {
            Ok(true) => enriched += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(index, error = %e, "Failed to enrich entry");
                let back = Locator::css(&selectors.back_button);
                if page.is_visible(&back).await.unwrap_or(false) {
                    if let Err(e) = page.click(&back, 3_000).await {
                        warn!(index, error = %e, "Failed to return to the list");
                    }
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    info!(enriched, "List enrichment finished");
    Ok(enriched)
}

async fn enrich_entry(page: &mut dyn RenderPage, selectors: &ListSelectors, index: usize) -> Result<bool, ScrapeError> {
    let entry = Locator::css(&selectors.item).nth(index);
    page.click(&entry, 5_000).await?;

    if page.wait_for_selector(&selectors.detail_panel, 4_000).await.is_err() {
        warn!(index, "Detail panel did not open");
        return Ok(false);
    }

    let details = read_details(page, selectors).await.unwrap_or_else(|e| {
        warn!(index, error = %e, "Could not read entry details");
        EntryDetails::default()
    });

    let back = Locator::css(&selectors.back_button);
    if page.count(&selectors.back_button).await? > 0 && page.is_visible(&back).await? {
        page.click(&back, 3_000).await?;
        page.wait_for_selector(&selectors.feed, 3_000).await?;
    }

    let mut injected = false;
    if !details.is_empty() {
        // The list is re-rendered after going back; locate the entry again by index.
        let result = page.evaluate(scripts::INJECT_AFTER_NTH, json!({
            "selector": selectors.item,
            "index": index,
            "html": details.to_html(),
        })).await?;
        injected = result.as_bool().unwrap_or(false);
        debug!(index, injected, "Entry details injected");
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    Ok(injected)
}

async fn read_details(page: &mut dyn RenderPage, selectors: &ListSelectors) -> Result<EntryDetails, ScrapeError> {
    let mut details = EntryDetails::default();

    let website = Locator::css(&selectors.website);
    if page.count(&selectors.website).await? > 0 && page.is_visible(&website).await? {
        details.website = page.attribute(&website, "href").await?;
    }
    details.phone = labelled_text(page, &selectors.phone).await?;
    details.address = labelled_text(page, &selectors.address).await?;
    Ok(details)
}

/// `aria-label` of the first match, else its inner text.
async fn labelled_text(page: &mut dyn RenderPage, selector: &str) -> Result<Option<String>, ScrapeError> {
    if page.count(selector).await? == 0 {
        return Ok(None);
    }
    let target = Locator::css(selector).nth(0);
    match page.attribute(&target, "aria-label").await? {
        Some(label) if !label.trim().is_empty() => Ok(Some(label)),
        _ => Ok(Some(page.inner_text(&target).await?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_details_html() {
        let details = EntryDetails {
            website: Some("https://cafe.example".into()),
            phone: Some("Phone:\n+1 555 0100 ".into()),
            address: None,
        };
        let html = details.to_html();
        assert!(html.contains("WEBSITE: https://cafe.example PHONE: Phone: +1 555 0100 ADDRESS: N/A"));
    }

    #[test]
    fn test_entry_details_escaped() {
        let details = EntryDetails { address: Some("<b>Main & 1st</b>".into()), ..EntryDetails::default() };
        assert!(details.to_html().contains("ADDRESS: &lt;b&gt;Main &amp; 1st&lt;/b&gt;"));
    }

    #[test]
    fn test_empty_details() {
        assert!(EntryDetails::default().is_empty());
    }
}
