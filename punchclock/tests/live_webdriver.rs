//! Smoke test against a real chromedriver.
//!
//! Run with: `chromedriver --port=9515 &` then
//! `cargo test -p punchclock --test live_webdriver -- --ignored --nocapture`

use punchclock::{open_session, ContextSwitcher, DriverOptions, LocationStrategy, RetryPolicy};
use std::time::Duration;

fn options() -> DriverOptions {
    DriverOptions {
        webdriver_url: std::env::var("WEBDRIVER_URL")
            .unwrap_or_else(|_| "http://localhost:9515".to_string()),
        headless: true,
        ..DriverOptions::default()
    }
}

const PAGE: &str = "data:text/html,<html><body><input id='userid'>\
<select id='TL_RPTD_TIME_PUNCH_TYPE$0'><option></option><option>Time-In</option><option>Time-Out</option></select>\
<button id='save' onclick=\"document.title='saved'\">Save</button></body></html>";

#[tokio::test]
#[ignore] // needs a running WebDriver server
async fn test_fill_select_and_click_on_static_page() -> anyhow::Result<()> {
    let session = open_session(&options()).await?;
    let policy = RetryPolicy::new(2, Duration::from_millis(500), Duration::from_secs(5));

    let result = async {
        session.goto(PAGE).await?;

        let field = session
            .locator("username", [LocationStrategy::id("userid")])
            .with_policy(policy)
            .locate()
            .await?;
        field.fill("alice").await?;

        let select = session
            .locator(
                "punch type",
                [
                    LocationStrategy::id("missing"),
                    LocationStrategy::attribute_contains("select", "id", "TL_RPTD_TIME_PUNCH_TYPE"),
                ],
            )
            .with_policy(policy)
            .locate()
            .await?;
        // The blank placeholder option is not a choice
        assert_eq!(select.option_labels().await?, vec!["Time-In", "Time-Out"]);
        select.select_by_label("Time-Out").await?;
        assert_eq!(select.selected_label().await?.as_deref(), Some("Time-Out"));

        let save = session
            .locator("save", [LocationStrategy::id("save")])
            .with_policy(policy)
            .clickable()
            .locate()
            .await?;
        assert!(punchclock::ActionExecutor::new(&session).activate(&save).await);
        assert_eq!(session.title().await?, "saved");

        // No frame was entered; returning to top must still be harmless
        ContextSwitcher::new(&session).return_to_top().await;
        ContextSwitcher::new(&session).return_to_top().await;
        Ok::<_, punchclock::AutomationError>(())
    }
    .await;

    session.close().await?;
    result?;
    Ok(())
}
