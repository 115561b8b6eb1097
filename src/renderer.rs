use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use headless_chrome::{Browser, LaunchOptions};
use tracing::{info, info_span, instrument, warn};

use crate::config::{Config, RendererKind};
use crate::error::ScheduleError;

/// Loads a page and hands back its HTML once scripts have produced the content
/// we care about.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn render(&self, url: &str) -> Result<String, ScheduleError>;
}

/// Stage of a browser page load. Waits that run out are timeouts; every other
/// stage failing is a fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStep {
    Launch,
    Navigate,
    AwaitNavigation,
    AwaitSelector,
    ReadContent,
}

impl LoadStep {
    pub fn error(
        self,
        renderer: &'static str,
        url: &str,
        selector: &str,
        timeout: Duration,
        cause: impl std::fmt::Display,
    ) -> ScheduleError {
        match self {
            LoadStep::AwaitNavigation | LoadStep::AwaitSelector => {
                warn!(renderer, step = ?self, error = %cause, "Page load timed out");
                ScheduleError::FetchTimeout {
                    url: url.to_string(),
                    selector: selector.to_string(),
                    timeout,
                }
            }
            LoadStep::Launch | LoadStep::Navigate | LoadStep::ReadContent => ScheduleError::fetch(renderer, cause),
        }
    }
}

/// Local headless Chromium, one browser process per call.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    ready_selector: String,
    timeout: Duration,
}

impl ChromeRenderer {
    pub fn new(ready_selector: impl Into<String>, timeout: Duration) -> Self {
        Self { ready_selector: ready_selector.into(), timeout }
    }

    fn render_blocking(url: &str, selector: &str, timeout: Duration) -> Result<String, ScheduleError> {
        const NAME: &str = "chrome";

        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .map_err(|e| LoadStep::Launch.error(NAME, url, selector, timeout, e))?;
        let browser = Browser::new(options).map_err(|e| LoadStep::Launch.error(NAME, url, selector, timeout, e))?;
        let tab = browser
            .new_tab()
            .map_err(|e| LoadStep::Launch.error(NAME, url, selector, timeout, e))?;
        tab.set_default_timeout(timeout);

        info!(url = %url, "Navigating");
        tab.navigate_to(url)
            .map_err(|e| LoadStep::Navigate.error(NAME, url, selector, timeout, e))?;
        // Fails only once the default timeout set above has run out
        tab.wait_until_navigated()
            .map_err(|e| LoadStep::AwaitNavigation.error(NAME, url, selector, timeout, e))?;
        tab.wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| LoadStep::AwaitSelector.error(NAME, url, selector, timeout, e))?;
        info!("Content loaded");

        // `browser` drops at the end of scope, which kills the process
        tab.get_content()
            .map_err(|e| LoadStep::ReadContent.error(NAME, url, selector, timeout, e))
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    fn name(&self) -> &'static str {
        "chrome"
    }

    #[instrument(level = "info", skip(self), fields(renderer = "chrome"))]
    async fn render(&self, url: &str) -> Result<String, ScheduleError> {
        // headless_chrome is synchronous; keep it off the async workers. A blocking
        // task cannot be cancelled, so when the caller's outer timeout fires the
        // browser lives on until its own waits above expire and it is dropped.
        let url = url.to_string();
        let selector = self.ready_selector.clone();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || Self::render_blocking(&url, &selector, timeout)).await?
    }
}

/// Remote browser driven over the WebDriver protocol, for hosts that cannot
/// run a local Chromium.
#[derive(Debug, Clone)]
pub struct WebDriverRenderer {
    webdriver_url: String,
    ready_selector: String,
    timeout: Duration,
}

impl WebDriverRenderer {
    pub fn new(webdriver_url: impl Into<String>, ready_selector: impl Into<String>, timeout: Duration) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            ready_selector: ready_selector.into(),
            timeout,
        }
    }

    async fn load(&self, client: &Client, url: &str) -> Result<String, ScheduleError> {
        const NAME: &str = "webdriver";

        let selector = self.ready_selector.as_str();

        info!(url = %url, "Navigating");
        client
            .goto(url)
            .await
            .map_err(|e| LoadStep::Navigate.error(NAME, url, selector, self.timeout, e))?;
        client
            .wait()
            .at_most(self.timeout)
            .for_element(Locator::Css(selector))
            .await
            .map_err(|e| LoadStep::AwaitSelector.error(NAME, url, selector, self.timeout, e))?;
        info!("Content loaded");
        client
            .source()
            .await
            .map_err(|e| LoadStep::ReadContent.error(NAME, url, selector, self.timeout, e))
    }

    fn capabilities() -> serde_json::Map<String, serde_json::Value> {
        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!({ "args": ["--headless=new", "--disable-gpu", "--no-sandbox"] }),
        );
        caps
    }
}

#[async_trait]
impl PageRenderer for WebDriverRenderer {
    fn name(&self) -> &'static str {
        "webdriver"
    }

    #[instrument(level = "info", skip(self), fields(renderer = "webdriver", driver = %self.webdriver_url))]
    async fn render(&self, url: &str) -> Result<String, ScheduleError> {
        const NAME: &str = "webdriver";

        let mut builder = ClientBuilder::native();
        builder.capabilities(Self::capabilities());
        let client = builder
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| ScheduleError::fetch(NAME, e))?;

        let result = self.load(&client, url).await;

        // Release the session whether or not the page loaded
        if let Err(e) = client.close().await {
            warn!(error = %e, "Failed to close WebDriver session");
        }
        result
    }
}

/// Plain HTTP GET with no script execution.
#[derive(Debug, Clone)]
pub struct StaticRenderer {
    timeout: Duration,
}

impl StaticRenderer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn get_blocking(url: &str, timeout: Duration) -> Result<String, ScheduleError> {
        const NAME: &str = "static";

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        let response = {
            let _span = info_span!("static_fetch", url = %url).entered();
            agent.get(url).call()
        };
        match response {
            Ok(response) => {
                let mut body = response.into_body();
                body.read_to_string().map_err(|e| ScheduleError::fetch(NAME, e))
            }
            Err(ureq::Error::Timeout(_)) => Err(ScheduleError::FetchTimeout {
                url: url.to_string(),
                selector: String::new(),
                timeout,
            }),
            Err(e) => Err(ScheduleError::fetch(NAME, e)),
        }
    }
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    fn name(&self) -> &'static str {
        "static"
    }

    #[instrument(level = "info", skip(self), fields(renderer = "static"))]
    async fn render(&self, url: &str) -> Result<String, ScheduleError> {
        let url = url.to_string();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || Self::get_blocking(&url, timeout)).await?
    }
}

/// Renderer `Auto` resolves to on this host: a local browser on desktop
/// systems, a WebDriver endpoint everywhere else.
pub fn host_default() -> RendererKind {
    if cfg!(any(target_os = "windows", target_os = "macos", target_os = "linux")) {
        RendererKind::Chrome
    } else {
        RendererKind::WebDriver
    }
}

pub fn build(config: &Config) -> Arc<dyn PageRenderer> {
    let kind = match config.renderer {
        RendererKind::Auto => host_default(),
        other => other,
    };
    let timeout = config.fetch_timeout();
    let renderer: Arc<dyn PageRenderer> = match kind {
        RendererKind::Chrome | RendererKind::Auto => Arc::new(ChromeRenderer::new(&config.ready_selector, timeout)),
        RendererKind::WebDriver => Arc::new(WebDriverRenderer::new(
            &config.webdriver_url,
            &config.ready_selector,
            timeout,
        )),
        RendererKind::Static => Arc::new(StaticRenderer::new(timeout)),
    };
    info!(renderer = renderer.name(), "Selected page renderer");
    renderer
}
