//! Page instantiation: independent per-row copies of a template page.
//!
//! A clone shares nothing with the template. Every element gets a fresh id,
//! missing sizes get defaults, and image sources are held back until
//! placeholders have been applied so a renderer never starts loading the
//! template's sample artwork for a slot that is about to be rebound.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use super::types::{DEFAULT_ELEMENT_SIZE, Element, ElementKind};
use super::{Page, Template};
use crate::PlacardError;

/// A page cloned from a template for one row.
#[derive(Debug, Clone)]
pub struct PageInstance {
    pub page: Page,
    /// Template sources stripped from image elements, keyed by cloned id.
    deferred_sources: HashMap<String, String>,
}

impl PageInstance {
    /// Template source withheld from an image element, if any.
    pub fn deferred_source(&self, element_id: &str) -> Option<&str> {
        self.deferred_sources.get(element_id).map(String::as_str)
    }

    /// Put template sources back on image elements no placeholder rule bound.
    ///
    /// Returns how many sources were restored.
    pub fn restore_unbound(&mut self, bound: &HashSet<String>) -> usize {
        let mut restored = 0;
        for el in &mut self.page.children {
            if bound.contains(&el.id) {
                continue;
            }
            if let ElementKind::Image(img) = &mut el.kind
                && let Some(src) = self.deferred_sources.get(&el.id)
            {
                img.src.clone_from(src);
                restored += 1;
            }
        }
        restored
    }

    pub fn into_page(self) -> Page {
        self.page
    }
}

fn fresh_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl Template {
    /// Clone page `page_index` into an independent, row-owned instance.
    pub fn instantiate_page(&self, page_index: usize) -> Result<PageInstance, PlacardError> {
        let source = self.validate_page(page_index)?;

        let mut deferred_sources = HashMap::new();
        let children = source
            .children
            .iter()
            .map(|el| {
                let mut copy: Element = el.clone();
                copy.id = fresh_id();
                copy.width = Some(el.width.unwrap_or(DEFAULT_ELEMENT_SIZE));
                copy.height = Some(el.height.unwrap_or(DEFAULT_ELEMENT_SIZE));
                if let ElementKind::Image(img) = &mut copy.kind
                    && !img.src.is_empty()
                {
                    deferred_sources.insert(copy.id.clone(), std::mem::take(&mut img.src));
                }
                copy
            })
            .collect();

        let page = Page {
            id: fresh_id(),
            width: Some(source.width.unwrap_or(self.width)),
            height: Some(source.height.unwrap_or(self.height)),
            background: source.background.clone(),
            children,
        };

        Ok(PageInstance {
            page,
            deferred_sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::DEFAULT_CANVAS_SIZE;

    fn sample_template() -> Template {
        let mut page = Page::default();
        page.id = "page-1".into();
        let mut title = Element::text("{{name}}");
        title.id = "title".into();
        page.push(title);
        let mut logo = Element::image("logo.png").named("logo").sized(50.0, 50.0);
        logo.id = "logo".into();
        page.push(logo);
        let mut slot = Element::image("sample.png").named("image1");
        slot.id = "slot".into();
        page.push(slot);

        let mut template = Template::default();
        template.push_page(page);
        template
    }

    #[test]
    fn test_clone_assigns_fresh_ids() {
        let template = sample_template();
        let a = template.instantiate_page(0).unwrap();
        let b = template.instantiate_page(0).unwrap();
        for (orig, (ca, cb)) in template.pages[0]
            .children
            .iter()
            .zip(a.page.children.iter().zip(&b.page.children))
        {
            assert_ne!(orig.id, ca.id);
            assert_ne!(ca.id, cb.id);
        }
        assert_ne!(a.page.id, template.pages[0].id);
    }

    #[test]
    fn test_clone_strips_image_sources() {
        let template = sample_template();
        let instance = template.instantiate_page(0).unwrap();
        for el in &instance.page.children {
            if let Some(img) = el.as_image() {
                assert!(img.src.is_empty());
                assert!(instance.deferred_source(&el.id).is_some());
            }
        }
        assert_eq!(
            template.pages[0].element("slot").unwrap().as_image().unwrap().src,
            "sample.png"
        );
    }

    #[test]
    fn test_restore_unbound_skips_bound_slots() {
        let template = sample_template();
        let mut instance = template.instantiate_page(0).unwrap();
        let slot_id = instance.page.element_named("image1").unwrap().id.clone();

        let bound = HashSet::from([slot_id.clone()]);
        assert_eq!(instance.restore_unbound(&bound), 1);

        let page = instance.into_page();
        assert_eq!(page.element_named("logo").unwrap().as_image().unwrap().src, "logo.png");
        assert_eq!(page.element(&slot_id).unwrap().as_image().unwrap().src, "");
    }

    #[test]
    fn test_malformed_sizes_get_defaults() {
        let template = Template::from_json(
            r#"{"pages": [{"children": [{"type": "text", "text": "x"}]}]}"#,
        )
        .unwrap();
        let page = template.instantiate_page(0).unwrap().into_page();
        assert_eq!(page.width, Some(DEFAULT_CANVAS_SIZE));
        assert_eq!(page.children[0].width, Some(DEFAULT_ELEMENT_SIZE));
        assert_eq!(page.children[0].height, Some(DEFAULT_ELEMENT_SIZE));
    }

    #[test]
    fn test_mutating_clone_leaves_template_untouched() {
        let template = sample_template();
        let before = template.clone();
        let mut instance = template.instantiate_page(0).unwrap();
        for el in &mut instance.page.children {
            el.x += 100.0;
            if let ElementKind::Text(t) = &mut el.kind {
                t.text.push_str(" changed");
            }
        }
        assert_eq!(template, before);
    }
}
