//! HTTP client for the university portal: authenticated session management
//! and rate-limited page fetching.

pub mod errors;
pub mod session;

use std::sync::Mutex;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Context;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use html_scraper::{Html, Selector};
use reqwest::header::COOKIE;
use reqwest::{StatusCode, Url};
use tracing::{debug, trace};

pub use errors::PortalError;
use session::SessionContext;

use crate::config::Config;

/// Form field names the portal's login form expects.
const LOGIN_FIELD: &str = "login";
const PASSWORD_FIELD: &str = "password";

static SEL_FORM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").unwrap());
static SEL_PASSWORD_INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[type=\"password\"]").unwrap());
static SEL_HIDDEN_INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[type=\"hidden\"]").unwrap());
static SEL_ERROR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".error, .alert-danger, .login-error").unwrap());

/// A fetched page: final URL after redirects, status, and body.
pub struct Page {
    pub url: Url,
    pub status: StatusCode,
    pub body: String,
}

/// The login form as found on the login page.
#[derive(Debug, PartialEq, Eq)]
struct LoginForm {
    /// Declared `action`, possibly relative; `None` means post back to the
    /// login page itself.
    action: Option<String>,
    hidden: Vec<(String, String)>,
}

/// Extract the form carrying a password input, with its hidden fields.
fn parse_login_form(body: &str) -> Option<LoginForm> {
    let document = Html::parse_document(body);
    let form = document
        .select(&SEL_FORM)
        .find(|f| f.select(&SEL_PASSWORD_INPUT).next().is_some())?;

    let hidden = form
        .select(&SEL_HIDDEN_INPUT)
        .filter_map(|input| {
            let name = input.value().attr("name")?.to_string();
            let value = input.value().attr("value").unwrap_or("").to_string();
            Some((name, value))
        })
        .collect();

    Some(LoginForm {
        action: form.value().attr("action").map(str::to_string),
        hidden,
    })
}

/// Whether the page carries a server-reported login error element.
fn has_error_element(body: &str) -> bool {
    let document = Html::parse_document(body);
    document
        .select(&SEL_ERROR)
        .any(|el| !el.text().collect::<String>().trim().is_empty())
}

/// Whether the page still contains a login form.
fn has_login_form(body: &str) -> bool {
    parse_login_form(body).is_some()
}

/// Rate-limited, session-carrying HTTP client for the portal.
///
/// The cookie jar is owned here and mutated only between requests; the batch
/// loop is strictly sequential so there are never concurrent writers.
pub struct PortalClient {
    http: reqwest::Client,
    base: Url,
    login_path: String,
    session: Mutex<SessionContext>,
    limiter: DefaultDirectRateLimiter,
}

impl PortalClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let base = Url::parse(&config.portal_base_url).context("invalid portal base URL")?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("raspisanie/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        let period = Duration::from_millis(config.request_delay_ms.max(1));
        let quota = Quota::with_period(period).context("invalid request delay")?;

        Ok(PortalClient {
            http,
            base,
            login_path: config.login_path.clone(),
            session: Mutex::new(SessionContext::new()),
            limiter: RateLimiter::direct(quota),
        })
    }

    fn resolve(&self, href: &str) -> Result<Url, PortalError> {
        self.base
            .join(href)
            .with_context(|| format!("cannot resolve portal URL from {href:?}"))
            .map_err(PortalError::RequestFailed)
    }

    fn cookie_header(&self) -> Option<String> {
        self.session.lock().expect("session lock poisoned").header_value()
    }

    fn absorb_cookies(&self, headers: &reqwest::header::HeaderMap) {
        self.session.lock().expect("session lock poisoned").absorb(headers);
    }

    /// GET a portal page, paced by the rate limiter, carrying and absorbing
    /// session cookies.
    pub async fn get_page(&self, href: &str) -> Result<Page, PortalError> {
        let url = self.resolve(href)?;
        self.limiter.until_ready().await;

        let mut request = self.http.get(url.clone());
        if let Some(cookies) = self.cookie_header() {
            request = request.header(COOKIE, cookies);
        }

        trace!(url = %url, "GET");
        let response = request
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))
            .map_err(PortalError::RequestFailed)?;

        self.absorb_cookies(response.headers());
        let status = response.status();
        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .with_context(|| format!("reading body of {final_url} failed"))
            .map_err(PortalError::RequestFailed)?;

        Ok(Page { url: final_url, status, body })
    }

    /// POST a form body, same session/pacing rules as [`Self::get_page`].
    async fn post_form(&self, url: Url, fields: &[(String, String)]) -> Result<Page, PortalError> {
        self.limiter.until_ready().await;

        let mut request = self.http.post(url.clone()).form(fields);
        if let Some(cookies) = self.cookie_header() {
            request = request.header(COOKIE, cookies);
        }

        trace!(url = %url, "POST");
        let response = request
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))
            .map_err(PortalError::RequestFailed)?;

        self.absorb_cookies(response.headers());
        let status = response.status();
        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .with_context(|| format!("reading body of {final_url} failed"))
            .map_err(PortalError::RequestFailed)?;

        Ok(Page { url: final_url, status, body })
    }

    /// Log in and keep the session alive for subsequent scrape requests.
    ///
    /// Fails closed: a server-reported error or a still-present login form
    /// yields `Ok(false)`; only transport problems are `Err`.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<bool, PortalError> {
        if username.is_empty() || password.is_empty() {
            return Err(PortalError::InvalidSession(
                "portal credentials are not configured".into(),
            ));
        }

        // Seed cookies and discover the form.
        let login_page = self.get_page(&self.login_path).await?;
        let Some(form) = parse_login_form(&login_page.body) else {
            return Err(PortalError::ParseFailed {
                status: login_page.status.as_u16(),
                url: login_page.url.to_string(),
                source: anyhow::anyhow!("no login form found on the login page"),
            });
        };

        let action_url = match &form.action {
            Some(action) if !action.is_empty() => login_page
                .url
                .join(action)
                .with_context(|| format!("cannot resolve form action {action:?}"))
                .map_err(PortalError::RequestFailed)?,
            _ => login_page.url.clone(),
        };

        let mut fields = form.hidden;
        fields.push((LOGIN_FIELD.to_string(), username.to_string()));
        fields.push((PASSWORD_FIELD.to_string(), password.to_string()));

        let result = self.post_form(action_url, &fields).await?;

        if has_error_element(&result.body) {
            debug!(url = %result.url, "login rejected: error element present");
            return Ok(false);
        }

        let moved_off_login = !result.url.path().contains(&self.login_path);
        if has_login_form(&result.body) && !moved_off_login {
            debug!(url = %result.url, "login rejected: login form persists");
            return Ok(false);
        }

        Ok(true)
    }
}
