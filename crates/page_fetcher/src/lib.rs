//! Headless-browser session abstraction for the wiki and bracket scrapers.
//!
//! One Chrome instance is launched per pipeline run and shared across all
//! scrape calls; each call gets its own tab. The upstream wikis are
//! server-rendered, so a fetch is navigate + wait + dump HTML; actual
//! parsing happens offline with the `scraper` crate so it stays testable
//! against fixtures. The bracket site is the exception: its data arrives
//! via XHR, so there is a bounded response-interception mode as well.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use headless_chrome::browser::tab::ResponseHandler;
use headless_chrome::protocol::cdp::Network::events::ResponseReceivedEventParams;
use headless_chrome::protocol::cdp::Network::GetResponseBodyReturnObject;
use headless_chrome::{Browser, LaunchOptions};
use tokio::task;
use tracing::{debug, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// How long scripts get to settle after the DOM is reachable.
const SETTLE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Navigation did not complete in time. Retryable on the next cycle;
    /// call sites decide whether the target counts as "no data" instead.
    #[error("navigation timeout for {url}")]
    Timeout { url: String },
    /// A structurally required element never appeared.
    #[error("required structure missing: {0}")]
    StructureMissing(String),
    #[error("browser error: {0}")]
    Browser(#[from] anyhow::Error),
    #[error("browser task aborted: {0}")]
    Join(#[from] task::JoinError),
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, Clone, Copy)]
pub enum WaitStrategy {
    /// Wait for `<body>`, then give scripts a moment to settle.
    DomSettle,
    /// Wait until a specific selector appears, treating absence as timeout.
    Selector(&'static str),
}

/// A network response captured during interception.
#[derive(Debug, Clone)]
pub struct InterceptedResponse {
    pub url: String,
    pub body: String,
}

/// Owns the shared Chrome instance. Dropping it closes the browser, so the
/// session cannot outlive the run that created it.
#[derive(Clone)]
pub struct PageFetcher {
    browser: Browser,
}

impl PageFetcher {
    pub async fn launch() -> Result<Self> {
        let browser = task::spawn_blocking(|| -> anyhow::Result<Browser> {
            let options = LaunchOptions::default_builder()
                .headless(true)
                .sandbox(false)
                .build()?;
            Browser::new(options)
        })
        .await??;
        Ok(Self { browser })
    }

    /// Navigates to `url` and returns the rendered HTML.
    pub async fn fetch_html(&self, url: &str, wait: WaitStrategy) -> Result<String> {
        let browser = self.browser.clone();
        let url = url.to_string();
        task::spawn_blocking(move || fetch_html_blocking(&browser, &url, wait)).await?
    }

    /// Best-effort consent dialog dismissal: open the site root once and
    /// click the reject button. Cookies persist for every later tab. A
    /// missing banner is success.
    pub async fn dismiss_consent(&self, url: &str, button_selector: &'static str) -> Result<()> {
        let browser = self.browser.clone();
        let url = url.to_string();
        task::spawn_blocking(move || {
            let tab = browser.new_tab()?;
            tab.set_user_agent(USER_AGENT, None, None)?;
            if tab.navigate_to(&url).and_then(|t| t.wait_until_navigated()).is_err() {
                warn!("Consent page {url} unreachable, continuing without dismissal");
                let _ = tab.close(true);
                return Ok(());
            }
            match tab.wait_for_element_with_custom_timeout(button_selector, Duration::from_secs(5)) {
                Ok(button) => {
                    if let Err(e) = button.click() {
                        debug!("Consent button click failed: {e}");
                    } else {
                        std::thread::sleep(Duration::from_secs(2));
                        debug!("Consent banner dismissed on {url}");
                    }
                }
                Err(_) => debug!("No consent banner on {url}"),
            }
            let _ = tab.close(true);
            Ok(())
        })
        .await?
    }

    /// Opens `page_url` and collects the bodies of every network response
    /// whose URL contains `url_fragment`, for at most `timeout`. Yields an
    /// empty list if nothing matching arrives in time; that is not an
    /// error. The capture is one-shot and not restartable.
    pub async fn intercept_json_responses(
        &self,
        page_url: &str,
        url_fragment: &str,
        timeout: Duration,
    ) -> Result<Vec<InterceptedResponse>> {
        let browser = self.browser.clone();
        let page_url = page_url.to_string();
        let fragment = url_fragment.to_string();
        task::spawn_blocking(move || intercept_blocking(&browser, &page_url, &fragment, timeout))
            .await?
    }

    /// Runs a JSON GET inside the page context, inheriting the page's
    /// cookies and origin. Used by sources that refuse plain HTTP clients.
    pub async fn fetch_json_in_page(&self, page_url: &str, api_url: &str) -> Result<String> {
        let browser = self.browser.clone();
        let page_url = page_url.to_string();
        let api_url = api_url.to_string();
        task::spawn_blocking(move || -> Result<String> {
            let tab = browser.new_tab().map_err(FetchError::Browser)?;
            tab.set_user_agent(USER_AGENT, None, None)
                .map_err(FetchError::Browser)?;
            tab.navigate_to(&page_url)
                .and_then(|t| t.wait_until_navigated())
                .map_err(|_| FetchError::Timeout { url: page_url.clone() })?;
            let expression = format!(
                "fetch({:?}).then(r => r.text())",
                api_url
            );
            let value = tab
                .evaluate(&expression, true)
                .map_err(FetchError::Browser)?;
            let _ = tab.close(true);
            match value.value {
                Some(serde_json::Value::String(body)) => Ok(body),
                _ => Err(FetchError::StructureMissing(format!(
                    "no body returned for {api_url}"
                ))),
            }
        })
        .await?
    }
}

fn fetch_html_blocking(browser: &Browser, url: &str, wait: WaitStrategy) -> Result<String> {
    let tab = browser.new_tab().map_err(FetchError::Browser)?;
    tab.set_user_agent(USER_AGENT, None, None)
        .map_err(FetchError::Browser)?;

    let navigated = tab
        .navigate_to(url)
        .and_then(|t| t.wait_until_navigated());
    if navigated.is_err() {
        let _ = tab.close(true);
        return Err(FetchError::Timeout { url: url.to_string() });
    }

    match wait {
        WaitStrategy::DomSettle => {
            if tab.wait_for_element("body").is_err() {
                let _ = tab.close(true);
                return Err(FetchError::Timeout { url: url.to_string() });
            }
            std::thread::sleep(SETTLE_DELAY);
        }
        WaitStrategy::Selector(selector) => {
            if tab
                .wait_for_element_with_custom_timeout(selector, Duration::from_secs(5))
                .is_err()
            {
                let _ = tab.close(true);
                return Err(FetchError::Timeout { url: url.to_string() });
            }
        }
    }

    let html = tab.get_content().map_err(FetchError::Browser)?;
    let _ = tab.close(true);
    Ok(html)
}

fn intercept_blocking(
    browser: &Browser,
    page_url: &str,
    fragment: &str,
    timeout: Duration,
) -> Result<Vec<InterceptedResponse>> {
    let tab = browser.new_tab().map_err(FetchError::Browser)?;
    tab.set_user_agent(USER_AGENT, None, None)
        .map_err(FetchError::Browser)?;

    let (tx, rx) = mpsc::channel::<InterceptedResponse>();
    let wanted = fragment.to_string();
    let handler: ResponseHandler = Box::new(
        move |params: ResponseReceivedEventParams,
              fetch_body: &dyn Fn() -> anyhow::Result<GetResponseBodyReturnObject>| {
            let url = params.response.url.clone();
            if !url.contains(&wanted) {
                return;
            }
            match fetch_body() {
                Ok(body) if !body.base_64_encoded => {
                    let _ = tx.send(InterceptedResponse { url, body: body.body });
                }
                Ok(_) => debug!("Skipping base64 response body for {url}"),
                Err(e) => debug!("Response body unavailable for {url}: {e}"),
            }
        },
    );
    tab.register_response_handling("intercept", handler)
        .map_err(FetchError::Browser)?;

    if tab
        .navigate_to(page_url)
        .and_then(|t| t.wait_until_navigated())
        .is_err()
    {
        let _ = tab.close(true);
        return Err(FetchError::Timeout { url: page_url.to_string() });
    }

    // Drain until the deadline. No matching response is a valid outcome.
    let deadline = Instant::now() + timeout;
    let mut collected = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match rx.recv_timeout(remaining.min(Duration::from_millis(500))) {
            Ok(resp) => collected.push(resp),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if !collected.is_empty() {
                    // First match arrived; give stragglers one more window.
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    let _ = tab.deregister_response_handling("intercept");
    let _ = tab.close(true);
    debug!("Intercepted {} responses matching '{fragment}'", collected.len());
    Ok(collected)
}
