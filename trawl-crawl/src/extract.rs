//! Best-effort field extraction from profile markup.
//!
//! Every field has an [`ExtractionRule`]: an ordered list of strategies, each
//! paired with an acceptance predicate. The first candidate text that passes
//! wins; if none does the field is simply absent. Fields never depend on each
//! other, so one missing section cannot hide another.
use crate::record::{Field, ProfileRecord};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

pub const SUMMARY_MAX_CHARS: usize = 200;
pub const SKILLS_LIMIT: usize = 5;

/// Predicate a candidate text must satisfy to be used.
pub type Accept = fn(&str) -> bool;

/// Default predicate: non-empty after trimming.
pub fn non_empty(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Locations carry no digits (in any script) and are longer than three
/// characters; this tells them apart from connection counts and dates in
/// look-alike slots.
pub fn plausible_location(text: &str) -> bool {
    let t = text.trim();
    !t.chars().any(char::is_numeric) && t.chars().count() > 3
}

/// How a candidate text is pulled out from under a root element.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Text of each element matching the selector, in document order.
    Text(String),
    /// First `inner` match within the first `item`.
    FirstItem { item: String, inner: String },
    /// Whole text of the first container, truncated to `max_chars`.
    Summary { container: String, max_chars: usize },
    /// Up to `limit` non-empty element texts joined by `", "`.
    Joined { selector: String, limit: usize },
}

impl Strategy {
    pub fn text(selector: &str) -> Self {
        Strategy::Text(selector.to_string())
    }

    fn candidates(&self, root: ElementRef<'_>) -> Vec<String> {
        match self {
            Strategy::Text(sel) => {
                let Some(sel) = css(sel) else { return vec![] };
                root.select(&sel).map(element_text).collect()
            }
            Strategy::FirstItem { item, inner } => {
                let (Some(item), Some(inner)) = (css(item), css(inner)) else {
                    return vec![];
                };
                root.select(&item)
                    .next()
                    .and_then(|first| first.select(&inner).next())
                    .map(element_text)
                    .into_iter()
                    .collect()
            }
            Strategy::Summary {
                container,
                max_chars,
            } => {
                let Some(container) = css(container) else {
                    return vec![];
                };
                root.select(&container)
                    .next()
                    .map(|c| truncate_summary(&element_text(c), *max_chars))
                    .into_iter()
                    .collect()
            }
            Strategy::Joined { selector, limit } => {
                let Some(sel) = css(selector) else { return vec![] };
                let parts: Vec<String> = root
                    .select(&sel)
                    .map(element_text)
                    .filter(|t| !t.is_empty())
                    .take(*limit)
                    .collect();
                if parts.is_empty() {
                    vec![]
                } else {
                    vec![parts.join(", ")]
                }
            }
        }
    }
}

/// Ordered fallback chain for one field.
///
/// A rule with a scope first settles on a single container (the first scope
/// selector that matches anything) and runs its chain only inside it. A
/// container without a match leaves the field absent; later scope selectors
/// are not consulted.
#[derive(Clone)]
pub struct ExtractionRule {
    pub field: Field,
    pub scope: Vec<String>,
    pub chain: Vec<(Strategy, Accept)>,
}

impl std::fmt::Debug for ExtractionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionRule")
            .field("field", &self.field)
            .field("scope", &self.scope)
            .field(
                "chain",
                &self.chain.iter().map(|(s, _)| s).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ExtractionRule {
    pub fn new(field: Field) -> Self {
        Self {
            field,
            scope: Vec::new(),
            chain: Vec::new(),
        }
    }

    /// Restrict the chain to the first of `containers` present on the page.
    pub fn within(mut self, containers: &[&str]) -> Self {
        self.scope = containers.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Append a strategy using the default predicate.
    pub fn then(self, strategy: Strategy) -> Self {
        self.then_if(strategy, non_empty)
    }

    pub fn then_if(mut self, strategy: Strategy, accept: Accept) -> Self {
        self.chain.push((strategy, accept));
        self
    }

    /// First accepted candidate across the chain, or `None`.
    pub fn evaluate(&self, doc: &Html) -> Option<String> {
        let Some(root) = self.root(doc) else {
            debug!(target: "trawl.extract", field = self.field.column(), "no container on page");
            return None;
        };
        for (idx, (strategy, accept)) in self.chain.iter().enumerate() {
            if let Some(hit) = strategy
                .candidates(root)
                .into_iter()
                .find(|text| accept(text))
            {
                debug!(target: "trawl.extract", field = self.field.column(), strategy = idx, "field matched");
                return Some(hit.trim().to_string());
            }
        }
        debug!(target: "trawl.extract", field = self.field.column(), "no strategy matched");
        None
    }

    fn root<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        if self.scope.is_empty() {
            return Some(doc.root_element());
        }
        self.scope
            .iter()
            .filter_map(|c| css(c))
            .find_map(|sel| doc.select(&sel).next())
    }
}

/// Applies one rule per field to a parsed page.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    rules: Vec<ExtractionRule>,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::profile()
    }
}

impl FieldExtractor {
    pub fn new(rules: Vec<ExtractionRule>) -> Self {
        Self { rules }
    }

    /// Rules for public profile pages, covering the logged-in and the
    /// guest layouts.
    pub fn profile() -> Self {
        Self::new(vec![
            ExtractionRule::new(Field::Name)
                .then(Strategy::text("h1.text-heading-xlarge"))
                .then(Strategy::text("h1.inline.t-24.v-align-middle.break-words"))
                .then(Strategy::text("h1.top-card-layout__title")),
            ExtractionRule::new(Field::Headline)
                .then(Strategy::text("div.text-body-medium.break-words"))
                .then(Strategy::text("div.top-card-layout__headline"))
                .then(Strategy::text("h2.mt1.t-18.t-black.t-normal.break-words")),
            ExtractionRule::new(Field::Location)
                .then_if(
                    Strategy::text("span.text-body-small.inline.t-black--light.break-words"),
                    plausible_location,
                )
                .then_if(
                    Strategy::text("div.top-card__subline-item"),
                    plausible_location,
                )
                .then_if(
                    Strategy::text("span.top-card-layout__first-subline"),
                    plausible_location,
                ),
            ExtractionRule::new(Field::CurrentCompany)
                .within(&["section#experience", "div#experience"])
                .then(Strategy::FirstItem {
                    item: "li.artdeco-list__item".to_string(),
                    inner: "span.t-14".to_string(),
                }),
            ExtractionRule::new(Field::ExperienceSummary).then(Strategy::Summary {
                container: "section#experience".to_string(),
                max_chars: SUMMARY_MAX_CHARS,
            }),
            ExtractionRule::new(Field::Education)
                .within(&["section#education", "div#education"])
                .then(Strategy::text("h3.t-16"))
                .then(Strategy::text("span.t-16")),
            ExtractionRule::new(Field::Skills).then(Strategy::Joined {
                selector: "section#skills span.t-bold".to_string(),
                limit: SKILLS_LIMIT,
            }),
        ])
    }

    /// Parse `html` and extract a record for `url`.
    pub fn extract(&self, url: &str, html: &str) -> ProfileRecord {
        let doc = Html::parse_document(html);
        self.extract_document(url, &doc)
    }

    pub fn extract_document(&self, url: &str, doc: &Html) -> ProfileRecord {
        let mut record = ProfileRecord::new(url);
        for rule in &self.rules {
            record.set(rule.field, rule.evaluate(doc));
        }
        info!(
            target: "trawl.extract",
            %url,
            name = record.name.as_deref().unwrap_or("<unknown>"),
            populated = record.populated(),
            "extracted profile"
        );
        record
    }
}

fn css(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(sel) => Some(sel),
        Err(e) => {
            debug!(target: "trawl.extract", %selector, error = %e, "unparseable selector treated as a miss");
            None
        }
    }
}

/// Element text with fragments trimmed and joined by single spaces.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cut to `max_chars` characters and mark the cut with `...`.
pub fn truncate_summary(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}
