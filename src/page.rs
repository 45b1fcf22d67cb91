// src/page.rs

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use url::Url;

use crate::table::RawTable;

/// Inflation statistics page of the Central Bank of Iran.
pub const INFLATION_URL: &str = "https://www.cbi.ir/Inflation/Inflation_FA.aspx";

/// Span the page renders instead of a monthly table when a year has no
/// published data.
const NOT_FOUND_SPAN_ID: &str = "ctl00_ucBody_ucContent_ctl00_LblNotFound";

/// Timing of the readiness wait: poll until the year selector is rendered,
/// settle briefly, and give up after `ready_timeout`. The page either
/// renders the selector well inside the default bound or is broken; a
/// broken page is reported instead of spun on.
#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    pub poll_interval: Duration,
    pub settle_delay: Duration,
    pub ready_timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            settle_delay: Duration::from_millis(500),
            ready_timeout: Duration::from_secs(30),
        }
    }
}

static SELECT: Lazy<Selector> = Lazy::new(|| Selector::parse("select").expect("select selector"));
static OPTION: Lazy<Selector> = Lazy::new(|| Selector::parse("option").expect("option selector"));
static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("table selector"));
static HIDDEN_INPUT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"input[type="hidden"]"#).expect("hidden input selector"));
static NOT_FOUND: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(&format!("span#{}", NOT_FOUND_SPAN_ID)).expect("not-found selector")
});

/// One entry of the year dropdown: the numeric postback code and the label
/// the site displays for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearOption {
    pub code: i64,
    pub label: String,
}

/// One fetched rendering of the page. Holds the raw HTML and re-parses per
/// accessor, so no parsed document ever lives across an await point.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    html: String,
}

impl PageSnapshot {
    pub fn new(html: String) -> Self {
        Self { html }
    }

    fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }

    /// The page counts as ready once the year selector has been rendered.
    pub fn is_ready(&self) -> bool {
        self.document().select(&SELECT).next().is_some()
    }

    /// Year codes and labels from the year `<select>`, in document order.
    /// The site lists the current year last.
    pub fn selectable_years(&self) -> Result<Vec<YearOption>> {
        let doc = self.document();
        let select = doc
            .select(&SELECT)
            .next()
            .context("no year <select> on page")?;

        let mut years = Vec::new();
        for option in select.select(&OPTION) {
            let value = option
                .value()
                .attr("value")
                .context("year <option> without a value attribute")?;
            let code = value
                .trim()
                .parse::<i64>()
                .with_context(|| format!("year option value {:?} is not numeric", value))?;
            let label = option.text().collect::<String>().trim().to_string();
            years.push(YearOption { code, label });
        }
        Ok(years)
    }

    /// True when the page says there is no monthly data for the selected
    /// year. Callers skip extraction entirely; this is not an error.
    pub fn has_no_data_marker(&self) -> bool {
        self.document().select(&NOT_FOUND).next().is_some()
    }

    /// Annual inflation table: the last `<table>` on the page.
    pub fn annual_table(&self) -> Result<RawTable> {
        let doc = self.document();
        let table = doc
            .select(&TABLE)
            .last()
            .context("no <table> on page for annual data")?;
        Ok(RawTable::from_element(table))
    }

    /// Monthly inflation table for the selected year: the first `<table>`.
    pub fn monthly_table(&self) -> Result<RawTable> {
        let doc = self.document();
        let table = doc
            .select(&TABLE)
            .next()
            .context("no <table> on page for monthly data")?;
        Ok(RawTable::from_element(table))
    }

    /// Form fields for a WebForms year-selection postback: every hidden
    /// input echoed back (`__VIEWSTATE`, `__EVENTVALIDATION`, ...), the
    /// dropdown named as `__EVENTTARGET`, and the chosen year code as the
    /// dropdown's submitted value.
    fn postback_form(&self, year_code: i64) -> Result<BTreeMap<String, String>> {
        let doc = self.document();
        let mut form = BTreeMap::new();

        for input in doc.select(&HIDDEN_INPUT) {
            if let Some(name) = input.value().attr("name") {
                let value = input.value().attr("value").unwrap_or_default();
                form.insert(name.to_string(), value.to_string());
            }
        }

        let select = doc
            .select(&SELECT)
            .next()
            .context("no year <select> on page")?;
        let select_name = select
            .value()
            .attr("name")
            .context("year <select> without a name attribute")?;

        form.insert("__EVENTTARGET".to_string(), select_name.to_string());
        form.entry("__EVENTARGUMENT".to_string()).or_default();
        form.insert(select_name.to_string(), year_code.to_string());
        Ok(form)
    }
}

/// HTTP session for the inflation page. The site is an ASP.NET WebForms
/// app: selecting a year is a form postback, so the session needs cookies
/// and the previous response's state fields round-tripped.
#[derive(Debug)]
pub struct InflationPage {
    client: Client,
    url: Url,
    wait: WaitConfig,
    snapshot: PageSnapshot,
}

impl InflationPage {
    /// Navigate to the inflation page and wait until it is ready.
    pub async fn open(client: Client) -> Result<Self> {
        Self::open_url(client, INFLATION_URL).await
    }

    pub async fn open_url(client: Client, url: &str) -> Result<Self> {
        Self::open_url_with(client, url, WaitConfig::default()).await
    }

    pub async fn open_url_with(client: Client, url: &str, wait: WaitConfig) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("parsing page URL {}", url))?;
        let mut page = Self {
            client,
            url,
            wait,
            snapshot: PageSnapshot::new(String::new()),
        };
        page.snapshot = page.wait_for_ready(None).await?;
        Ok(page)
    }

    pub fn snapshot(&self) -> &PageSnapshot {
        &self.snapshot
    }

    /// Select a year in the dropdown and wait for the refreshed page.
    pub async fn select_year(&mut self, year_code: i64) -> Result<()> {
        let form = self
            .snapshot
            .postback_form(year_code)
            .with_context(|| format!("building postback for year {}", year_code))?;
        self.snapshot = self.wait_for_ready(Some(form)).await?;
        Ok(())
    }

    async fn fetch(&self, form: Option<&BTreeMap<String, String>>) -> Result<String> {
        let request = match form {
            Some(form) => self.client.post(self.url.clone()).form(form),
            None => self.client.get(self.url.clone()),
        };
        let text = request
            .send()
            .await
            .with_context(|| format!("fetching {}", self.url))?
            .error_for_status()?
            .text()
            .await
            .with_context(|| format!("reading body from {}", self.url))?;
        Ok(text)
    }

    /// Poll until the year selector shows up, then give the page one short
    /// settle delay. Bounded: a page that never becomes ready is reported
    /// as a timeout error rather than hanging the process.
    async fn wait_for_ready(&self, form: Option<BTreeMap<String, String>>) -> Result<PageSnapshot> {
        let deadline = Instant::now() + self.wait.ready_timeout;
        loop {
            let snapshot = PageSnapshot::new(self.fetch(form.as_ref()).await?);
            if snapshot.is_ready() {
                sleep(self.wait.settle_delay).await;
                return Ok(snapshot);
            }
            if Instant::now() >= deadline {
                bail!(
                    "{} not ready after {:?}: year selector never appeared",
                    self.url,
                    self.wait.ready_timeout
                );
            }
            sleep(self.wait.poll_interval).await;
        }
    }
}
