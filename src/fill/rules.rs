//! Declarative placeholder rules.
//!
//! Every convention for marking an element as a placeholder is one [`Rule`].
//! A [`RuleSet`] keeps them in a fixed priority order:
//!
//! | Priority | Rule | Applies to | Matches |
//! |----------|------|------------|---------|
//! | 0 | `exact_text` | text | whole trimmed text equals the token (case-insensitive) |
//! | 1 | `tokens` | text | `{{field}}` / `{field}` anywhere in the text |
//! | 2 | `image_name` | image | element name equals the given name (case-insensitive) |
//! | 3 | `image_index` | image | element name contains `image<N>`, bound to the Nth record image |
//!
//! Within one priority class, rules keep the order they were given in.

use serde::{Deserialize, Serialize};

/// One placeholder convention paired with the field it reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum Rule {
    /// Whole text equals `text`; replaced by `field`, through `format` if set
    /// (`{}` stands for the value).
    ExactText {
        text: String,
        field: String,
        #[serde(default)]
        format: Option<String>,
    },
    /// Delimited tokens; each token names its own field.
    Tokens,
    /// Image whose name equals `name`; source from `field`.
    ImageName { name: String, field: String },
    /// Image whose name contains `image<N>`; source from the Nth record image.
    ImageIndex,
}

impl Rule {
    pub fn exact(text: &str, field: &str) -> Self {
        Rule::ExactText {
            text: text.into(),
            field: field.into(),
            format: None,
        }
    }

    pub fn image_name(name: &str, field: &str) -> Self {
        Rule::ImageName {
            name: name.into(),
            field: field.into(),
        }
    }

    fn priority(&self) -> u8 {
        match self {
            Rule::ExactText { .. } => 0,
            Rule::Tokens => 1,
            Rule::ImageName { .. } => 2,
            Rule::ImageIndex => 3,
        }
    }

    pub fn is_text_rule(&self) -> bool {
        matches!(self, Rule::ExactText { .. } | Rule::Tokens)
    }
}

/// Ordered placeholder rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Rule>", into = "Vec<Rule>")]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self::new(rules)
    }
}

impl From<RuleSet> for Vec<Rule> {
    fn from(set: RuleSet) -> Self {
        set.rules
    }
}

impl RuleSet {
    /// Build a rule set; rules are stably sorted into priority order.
    pub fn new(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(Rule::priority);
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn text_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.is_text_rule())
    }

    pub fn image_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| !r.is_text_rule())
    }

    /// Add a rule, keeping priority order.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
        self.rules.sort_by_key(Rule::priority);
    }
}

impl Default for RuleSet {
    /// The reserved tokens and names used by the product, quote and catalog
    /// poster templates, plus generic tokens and `image<N>` slots.
    fn default() -> Self {
        Self::new(vec![
            Rule::exact("{product_name}", "name"),
            Rule::exact("product_name", "name"),
            Rule::exact("{price}", "price"),
            Rule::exact("product_price", "price"),
            Rule::exact("{quote_text}", "quote_text"),
            Rule::exact("{quote_author}", "quote_author"),
            Rule::Tokens,
            Rule::image_name("product_image_placeholder", "url"),
            Rule::ImageIndex,
        ])
    }
}

/// Parse the `image<N>` slot (1-based) out of an element name.
pub fn image_index(name: &str) -> Option<usize> {
    let lower = name.to_ascii_lowercase();
    let mut search = lower.as_str();
    while let Some(pos) = search.find("image") {
        let rest = &search[pos + "image".len()..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(n) = digits.parse::<usize>()
            && n >= 1
        {
            return Some(n);
        }
        search = rest;
    }
    None
}
