use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use super::fetch::{decode, Fetch};
use crate::error::{DashboardError, Result};

const ITEM_SELECTOR: &str = "li.resource-item";
const HEADING_SELECTOR: &str = "a.heading";
const LINK_SELECTOR: &str = "a.resource-url-analytics";
const TYPE_SUFFIX: &str = "CSV";
const URL_PARAM: &str = "url";

// ---------------------------------------------------------------------------
// RangeCatalog – time-range label → CSV URL
// ---------------------------------------------------------------------------

/// Downloadable time-range datasets in page order.
///
/// Inserting an existing label keeps its position and replaces the URL
/// (last write wins).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeCatalog {
    entries: Vec<(String, String)>,
}

impl RangeCatalog {
    pub fn insert(&mut self, label: String, url: String) {
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => {
                log::debug!("duplicate range label '{label}', keeping last URL");
                entry.1 = url;
            }
            None => self.entries.push((label, url)),
        }
    }

    pub fn url(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, u)| u.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn first_label(&self) -> Option<&str> {
        self.labels().next()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Scraping
// ---------------------------------------------------------------------------

/// Fetch the catalog page and extract every downloadable range.
pub fn load_ranges(fetcher: &dyn Fetch, catalog_url: &str, encoding: &str) -> Result<RangeCatalog> {
    let bytes = fetcher.fetch(catalog_url)?;
    let html = decode(&bytes, encoding)?;
    let catalog = parse_catalog(&html, catalog_url)?;
    log::info!("Found {} time ranges at {catalog_url}", catalog.len());
    Ok(catalog)
}

/// Extract `label → url` pairs from the catalog markup.
///
/// Zero matching list items is not an error. A list item lacking its
/// heading or download link is.
pub fn parse_catalog(html: &str, page_url: &str) -> Result<RangeCatalog> {
    let base = Url::parse(page_url)
        .map_err(|e| DashboardError::parse(format!("invalid catalog URL '{page_url}': {e}")))?;
    let items = selector(ITEM_SELECTOR)?;
    let heading = selector(HEADING_SELECTOR)?;
    let link = selector(LINK_SELECTOR)?;

    let document = Html::parse_document(html);
    let mut catalog = RangeCatalog::default();

    for (i, li) in document.select(&items).enumerate() {
        let heading_text: String = first(&li, &heading, i, HEADING_SELECTOR)?.text().collect();
        let href = first(&li, &link, i, LINK_SELECTOR)?
            .value()
            .attr("href")
            .ok_or_else(|| DashboardError::parse(format!("resource item {i}: link without href")))?;
        let url = download_url(&base, href)
            .map_err(|msg| DashboardError::parse(format!("resource item {i}: {msg}")))?;

        let label = format_label(&heading_text);
        if label.is_empty() {
            log::warn!("resource item {i}: heading {heading_text:?} yields an empty label, skipping");
            continue;
        }
        catalog.insert(label, url);
    }

    Ok(catalog)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| DashboardError::parse(format!("bad selector '{css}': {e:?}")))
}

fn first<'a>(
    li: &ElementRef<'a>,
    sel: &Selector,
    index: usize,
    css: &str,
) -> Result<ElementRef<'a>> {
    li.select(sel)
        .next()
        .ok_or_else(|| DashboardError::parse(format!("resource item {index}: no '{css}' element")))
}

/// The resource URL carried in the `url=` query parameter of an analytics link.
fn download_url(base: &Url, href: &str) -> std::result::Result<String, String> {
    let link = base
        .join(href)
        .map_err(|e| format!("invalid link '{href}': {e}"))?;
    link.query_pairs()
        .find(|(k, _)| k == URL_PARAM)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("link '{href}' has no '{URL_PARAM}=' parameter"))
}

// ---------------------------------------------------------------------------
// Label formatting
// ---------------------------------------------------------------------------

/// Turn a resource heading into a dropdown label.
///
/// `"Tráfego Jan/2022 CSV"` → `"Jan de 2022"`.
pub fn format_label(heading: &str) -> String {
    let trimmed = heading.trim();
    let trimmed = trimmed.strip_suffix(TYPE_SUFFIX).unwrap_or(trimmed);
    let token = trimmed.split_whitespace().last().unwrap_or("");
    capitalize(&token.replace('/', " de "))
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
