mod common;

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use common::{capture_engine, quick_capture, FakeDoc, FakeEngine, FakeSite, GotoFault};
use pagelens::browser::capture::FETCH_FALLBACK;
use pagelens::browser::scroll::{enrich_list, ListSelectors};
use pagelens::browser::{CaptureOptions, FetchedResource, PageOptions, RenderEngine, WaitCondition};
use pagelens::errors::ScrapeError;
use pagelens::models::ScreenshotMode;

const URL: &str = "https://shop.example/catalog";

#[tokio::test]
async fn test_capture_happy_path() {
    let site = FakeSite::new();
    site.serve(URL, FakeDoc::html("Catalog", "Red shoes 49.90"));

    let result = capture_engine(&site).capture(URL, &quick_capture()).await.unwrap();

    assert_eq!(result.meta.title, "Catalog");
    assert_eq!(result.meta.wait_condition_used, "networkidle");
    assert_eq!(result.meta.screenshot_mode, ScreenshotMode::Requested);
    assert_eq!(result.meta.status_code, Some(200));
    assert_eq!(result.text, "Red shoes 49.90");
    assert_eq!(result.image_urls, vec!["https://cdn.example/a.jpg".to_string()]);
    assert!(!result.screenshot.is_empty());
    assert_eq!(site.closed(), 1);
}

#[tokio::test]
async fn test_navigation_timeouts_fall_back_to_weaker_conditions() {
    let site = FakeSite::new();
    site.serve(URL, FakeDoc::html("Catalog", "items"));
    site.fail_goto(&[GotoFault::Timeout, GotoFault::Timeout]);

    let result = capture_engine(&site).capture(URL, &quick_capture()).await.unwrap();

    assert_eq!(result.meta.wait_condition_used, "domcontentloaded");
    let modes = site.goto_modes.lock().unwrap().clone();
    assert_eq!(modes, vec![WaitCondition::NetworkIdle, WaitCondition::Load, WaitCondition::DomContentLoaded]);
}

#[tokio::test]
async fn test_non_timeout_navigation_error_is_not_retried_in_place() {
    let site = FakeSite::new();
    site.fail_goto(&[GotoFault::Network]);

    let err = capture_engine(&site).capture(URL, &quick_capture()).await.unwrap_err();

    assert!(matches!(err, ScrapeError::Network(_)));
    assert_eq!(site.goto_modes.lock().unwrap().len(), 1);
    assert_eq!(site.closed(), 1, "page released on failure");
}

#[tokio::test]
async fn test_exhausted_navigation_plan_reports_timeout() {
    let site = FakeSite::new();
    site.fail_every_goto(GotoFault::Timeout);

    let err = capture_engine(&site).capture(URL, &quick_capture()).await.unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(site.goto_modes.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_aborted_download_uses_raw_fetch() {
    let site = FakeSite::new();
    site.fail_goto(&[GotoFault::Aborted]);
    *site.fetch_response.lock().unwrap() = Some(FetchedResource {
        status: 200,
        url: URL.to_string(),
        headers: HashMap::from([("content-type".to_string(), "text/csv".to_string())]),
        body: b"name,price\nshoe,49.90\n".to_vec(),
    });

    let result = capture_engine(&site).capture(URL, &quick_capture()).await.unwrap();

    assert_eq!(result.meta.wait_condition_used, FETCH_FALLBACK);
    assert_eq!(result.meta.title, "Fallback Fetch");
    assert_eq!(result.meta.screenshot_mode, ScreenshotMode::None);
    assert!(result.screenshot.is_empty());
    assert!(result.text.starts_with("name,price"));
}

#[tokio::test]
async fn test_screenshot_degrades_to_viewport() {
    let site = FakeSite::new();
    site.serve(URL, FakeDoc::html("Catalog", "items"));
    site.screenshot_failures.store(1, Ordering::SeqCst);
    let options = CaptureOptions { full_page: true, ..quick_capture() };

    let result = capture_engine(&site).capture(URL, &options).await.unwrap();

    assert_ne!(result.meta.screenshot_mode, ScreenshotMode::Requested);
    let calls = site.screenshot_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].0, "first try honours full_page");
}

#[tokio::test]
async fn test_all_screenshot_strategies_failing_is_network_failure() {
    let site = FakeSite::new();
    site.serve(URL, FakeDoc::html("Catalog", "items"));
    site.screenshot_failures.store(10, Ordering::SeqCst);

    let err = capture_engine(&site).capture(URL, &quick_capture()).await.unwrap_err();

    assert!(matches!(err, ScrapeError::Network(_)));
    assert_eq!(site.screenshot_calls.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_block_page_is_classified_blocked() {
    let site = FakeSite::new();
    site.serve(URL, FakeDoc::html("Attention Required! | Cloudflare", "Please verify you are human"));

    let err = capture_engine(&site).capture(URL, &quick_capture()).await.unwrap_err();

    assert!(matches!(err, ScrapeError::Blocked(_)));
    assert_eq!(site.closed(), 1);
}

#[tokio::test]
async fn test_blocking_status_code_is_blocked() {
    let site = FakeSite::new();
    let mut doc = FakeDoc::html("Shop", "Too many requests");
    doc.status = 429;
    site.serve(URL, doc);

    let err = capture_engine(&site).capture(URL, &quick_capture()).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Blocked(reason) if reason.contains("429")));
}

#[tokio::test(start_paused = true)]
async fn test_smart_scroll_runs_before_capture() {
    let site = FakeSite::new();
    site.serve(URL, FakeDoc::html("Catalog", "items"));
    let options = CaptureOptions { auto_scroll: true, scroll_steps: 3, ..CaptureOptions::default() };

    let result = capture_engine(&site).capture(URL, &options).await.unwrap();

    assert!(result.meta.auto_scroll);
    assert_eq!(result.meta.scroll_steps, 3);
}

#[tokio::test]
async fn test_last_screenshot_strategy_is_full_page_low_quality() {
    let site = FakeSite::new();
    site.serve(URL, FakeDoc::html("Catalog", "items"));
    site.screenshot_failures.store(3, Ordering::SeqCst);

    let result = capture_engine(&site).capture(URL, &quick_capture()).await.unwrap();

    assert_eq!(result.meta.screenshot_mode, ScreenshotMode::FullLow);
    assert_eq!(site.screenshot_calls.lock().unwrap().last(), Some(&(true, 45)));
}

#[tokio::test(start_paused = true)]
async fn test_enrich_list_continues_when_back_navigation_fails() {
    let site = FakeSite::new();
    let selectors = ListSelectors::default();
    site.set_count(&selectors.item, 2);
    site.show(&selectors.back_button);
    let mut page = FakeEngine { site: site.clone() }.new_page(&PageOptions::default()).await.unwrap();

    let enriched = enrich_list(page.as_mut(), &selectors, 5).await.unwrap();

    assert_eq!(enriched, 0);
    assert_eq!(site.clicked(&selectors.item), 2);
    assert_eq!(site.clicked(&selectors.back_button), 2);
}
