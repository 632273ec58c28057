//! # Placeholder Fill
//!
//! Binds one [`Record`] onto a page's placeholder elements.
//!
//! The engine talks to elements only through [`ElementHandle`]: it reads an
//! attribute snapshot, asks the [`Resolver`] for a patch, and applies it. Text
//! placeholders get their content replaced; image placeholders get a new
//! source with geometry re-asserted, or are hidden when the record has no
//! image for them.
//!
//! ```
//! use placard::fill::Filler;
//! use placard::record::Record;
//! use placard::template::{Element, ElementHandle};
//!
//! let mut elements = vec![Element::text("{{name}} - {{price}}")];
//! let record = Record::new().with("name", "Widget").with("price", "10");
//! let report = Filler::default().fill(&mut elements, &record);
//!
//! assert_eq!(report.updated, 1);
//! assert_eq!(elements[0].attributes().text.as_deref(), Some("Widget - 10"));
//! ```

pub mod resolve;
pub mod rules;
pub mod tokens;

pub use resolve::{Resolution, Resolver};
pub use rules::{Rule, RuleSet};

use std::collections::{HashMap, HashSet};

use crate::record::{MissingPolicy, Record};
use crate::template::{ElementHandle, ElementType, Page, PageInstance};

/// Date/time variables available to every token, unless a record field of
/// the same name shadows them.
pub fn builtin_variables() -> HashMap<String, String> {
    use chrono::Local;

    let now = Local::now();
    HashMap::from([
        ("date".into(), now.format("%B %-d, %Y").to_string()), // October 16, 2026
        ("date_short".into(), now.format("%b %-d").to_string()),
        ("day".into(), now.format("%A").to_string()),
        ("time".into(), now.format("%H:%M").to_string()),
        ("time_12h".into(), now.format("%-I:%M %p").to_string()),
        ("datetime".into(), now.format("%a, %b %-d %H:%M").to_string()),
        ("year".into(), now.format("%Y").to_string()),
        ("iso_date".into(), now.format("%Y-%m-%d").to_string()),
    ])
}

/// What one fill pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Elements whose attributes were changed.
    pub updated: usize,
    /// Image slots hidden for lack of data.
    pub hidden: usize,
    /// Ids of image elements a rule matched (bound or hidden).
    pub bound_images: HashSet<String>,
}

/// The fill engine: rules, missing-value policy and built-in variables.
#[derive(Debug, Clone)]
pub struct Filler {
    rules: RuleSet,
    missing: MissingPolicy,
    builtins: HashMap<String, String>,
}

impl Default for Filler {
    fn default() -> Self {
        Self::new(RuleSet::default(), MissingPolicy::default())
    }
}

impl Filler {
    pub fn new(rules: RuleSet, missing: MissingPolicy) -> Self {
        Self {
            rules,
            missing,
            builtins: builtin_variables(),
        }
    }

    /// Replace the built-in variables (tests pin dates this way).
    pub fn with_builtins(mut self, builtins: HashMap<String, String>) -> Self {
        self.builtins = builtins;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn missing(&self) -> MissingPolicy {
        self.missing
    }

    /// Fill every placeholder among `elements` from `record`.
    ///
    /// Elements that are not placeholders are left untouched. The record is
    /// only read.
    pub fn fill<E: ElementHandle>(&self, elements: &mut [E], record: &Record) -> FillReport {
        let resolver = Resolver::new(&self.rules, self.missing, &self.builtins);
        let mut report = FillReport::default();

        for element in elements.iter_mut() {
            let attrs = element.attributes();
            let resolution = resolver.resolve(&attrs, record);

            if attrs.element_type == ElementType::Image && resolution.is_match() {
                report.bound_images.insert(attrs.id.clone());
            }

            if let Resolution::Patch(patch) = resolution {
                if patch.visible == Some(false) {
                    report.hidden += 1;
                }
                element.apply_attributes(&patch);
                report.updated += 1;
            }
        }

        tracing::trace!(
            updated = report.updated,
            hidden = report.hidden,
            "filled elements"
        );
        report
    }

    /// Fill a cloned page. Image sources deferred at clone time are restored
    /// for every image no rule bound, so decorative images keep their source.
    pub fn fill_page(&self, instance: &mut PageInstance, record: &Record) -> FillReport {
        let report = self.fill(&mut instance.page.children, record);
        instance.restore_unbound(&report.bound_images);
        report
    }

    /// Token names in `page` that would resolve to the missing-value default
    /// for `record`. Useful as a preview warning.
    pub fn unresolved_tokens(&self, page: &Page, record: &Record) -> Vec<String> {
        let mut missing = Vec::new();
        for element in &page.children {
            let Some(text) = element.as_text() else {
                continue;
            };
            for token in tokens::find_tokens(&text.text) {
                let known = record.contains(&token.name)
                    || self.builtins.contains_key(&token.name.to_lowercase());
                if !known && !missing.contains(&token.name) {
                    missing.push(token.name);
                }
            }
        }
        missing
    }
}
