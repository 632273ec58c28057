//! Placeholder resolution: element snapshot + record → attribute patch.
//!
//! Resolution is pure. Rules are tried in priority order; a matching rule
//! that finds a value wins. When rules match but none finds a value, the job's
//! [`MissingPolicy`] decides the text, and image slots are hidden.

use std::collections::HashMap;

use super::rules::{Rule, RuleSet, image_index};
use super::tokens;
use crate::record::columns::image_slot;
use crate::record::{MissingPolicy, Record};
use crate::template::{AttributePatch, ElementAttributes, ElementType};

/// Outcome of resolving one element.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Not a placeholder.
    Unmatched,
    /// A placeholder whose current value already equals the resolved one.
    Unchanged,
    /// A placeholder needing this update.
    Patch(AttributePatch),
}

impl Resolution {
    pub fn is_match(&self) -> bool {
        !matches!(self, Resolution::Unmatched)
    }
}

/// Resolves elements against records under one rule set and policy.
pub struct Resolver<'a> {
    rules: &'a RuleSet,
    missing: MissingPolicy,
    builtins: &'a HashMap<String, String>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        rules: &'a RuleSet,
        missing: MissingPolicy,
        builtins: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            rules,
            missing,
            builtins,
        }
    }

    /// Field value: record first, then built-in variables.
    fn lookup<'r>(&'r self, record: &'r Record, field: &str) -> Option<&'r str> {
        record.get(field).or_else(|| {
            self.builtins
                .get(&field.to_lowercase())
                .map(String::as_str)
        })
    }

    pub fn resolve(&self, attrs: &ElementAttributes, record: &Record) -> Resolution {
        match attrs.element_type {
            ElementType::Text => self.resolve_text(attrs, record),
            ElementType::Image => self.resolve_image(attrs, record),
        }
    }

    fn resolve_text(&self, attrs: &ElementAttributes, record: &Record) -> Resolution {
        let current = attrs.text.as_deref().unwrap_or_default();
        if current.trim().is_empty() {
            return Resolution::Unmatched;
        }

        let mut matched = false;
        for rule in self.rules.text_rules() {
            match rule {
                Rule::ExactText {
                    text,
                    field,
                    format,
                } if current.trim().eq_ignore_ascii_case(text) => {
                    matched = true;
                    if let Some(value) = self.lookup(record, field) {
                        let value = match format {
                            Some(f) => f.replace("{}", value),
                            None => value.to_string(),
                        };
                        return text_update(current, value);
                    }
                }
                Rule::Tokens if tokens::has_tokens(current) => {
                    let replaced = tokens::substitute(current, |name| {
                        self.lookup(record, name)
                            .unwrap_or(self.missing.value())
                            .to_string()
                    });
                    return text_update(current, replaced);
                }
                _ => {}
            }
        }

        if matched {
            text_update(current, self.missing.value().to_string())
        } else {
            Resolution::Unmatched
        }
    }

    fn resolve_image(&self, attrs: &ElementAttributes, record: &Record) -> Resolution {
        if attrs.name.trim().is_empty() {
            return Resolution::Unmatched;
        }

        let mut matched = false;
        for rule in self.rules.image_rules() {
            let value = match rule {
                Rule::ImageName { name, field } if attrs.name.trim().eq_ignore_ascii_case(name) => {
                    matched = true;
                    record
                        .get(field)
                        .or_else(|| image_slot(field).and_then(|slot| record.image(slot)))
                }
                Rule::ImageIndex => match image_index(&attrs.name) {
                    Some(n) => {
                        matched = true;
                        record
                            .image(n - 1)
                            .or_else(|| record.get(&format!("image{}", n)))
                    }
                    None => None,
                },
                _ => None,
            };
            if let Some(src) = value {
                return Resolution::Patch(AttributePatch::image_source(attrs, src));
            }
        }

        if matched {
            Resolution::Patch(AttributePatch::hide_image())
        } else {
            Resolution::Unmatched
        }
    }
}

fn text_update(current: &str, new: String) -> Resolution {
    if new == current {
        Resolution::Unchanged
    } else {
        Resolution::Patch(AttributePatch::text(new))
    }
}
