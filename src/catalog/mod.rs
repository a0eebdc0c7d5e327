//! # Template Catalog
//!
//! The list of meme templates offered by the template service, shown five
//! at a time in a carousel.

pub mod client;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::MemeError;

pub use client::{MemegenClient, TemplateRenderRequest, TemplateService};

/// Number of templates shown per carousel page.
pub const PAGE_SIZE: usize = 5;

/// Example text and render shipped with a template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateExample {
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub url: String,
}

/// One selectable base image from the template service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    pub id: String,
    pub name: String,
    /// URL of the template image without text.
    pub blank: String,
    /// Number of independent text slots.
    pub lines: usize,
    #[serde(default)]
    pub overlays: usize,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub example: TemplateExample,
}

impl TemplateDescriptor {
    /// Minimal descriptor, mostly useful for tests and the CLI.
    pub fn new(id: impl Into<String>, name: impl Into<String>, blank: impl Into<String>, lines: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            blank: blank.into(),
            lines,
            overlays: 0,
            styles: Vec::new(),
            keywords: Vec::new(),
            example: TemplateExample::default(),
        }
    }
}

/// Carousel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Prev,
}

/// Full template list plus the visible page.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    templates: Vec<TemplateDescriptor>,
    page: usize,
}

impl Catalog {
    pub fn new(templates: Vec<TemplateDescriptor>) -> Self {
        Self { templates, page: 0 }
    }

    /// Fetch the catalog once. Failures are logged and leave it empty.
    pub async fn load(service: &dyn TemplateService) -> Self {
        match service.list_templates().await {
            Ok(templates) => {
                info!(target: "catalog", "Fetched {} templates", templates.len());
                Self::new(templates)
            }
            Err(e) => {
                error!(target: "catalog", "Error loading templates: {}", e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&self) -> usize {
        self.templates.len().div_ceil(PAGE_SIZE)
    }

    /// Templates on the current page.
    pub fn visible(&self) -> &[TemplateDescriptor] {
        let start = (self.page * PAGE_SIZE).min(self.templates.len());
        let end = (start + PAGE_SIZE).min(self.templates.len());
        &self.templates[start..end]
    }

    /// Move one page. Returns true if the page actually changed.
    pub fn navigate(&mut self, direction: Direction) -> bool {
        let last = self.total_pages().saturating_sub(1);
        let new_page = match direction {
            Direction::Next => (self.page + 1).min(last),
            Direction::Prev => self.page.saturating_sub(1),
        };
        if new_page == self.page {
            return false;
        }
        self.page = new_page;
        info!(
            target: "catalog",
            "Navigating to page {}/{}",
            self.page + 1,
            self.total_pages()
        );
        true
    }

    /// Look up a template anywhere in the catalog.
    pub fn find(&self, id: &str) -> Result<&TemplateDescriptor, MemeError> {
        self.templates
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| MemeError::NotFound(format!("template '{}'", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn templates(n: usize) -> Vec<TemplateDescriptor> {
        (0..n)
            .map(|i| TemplateDescriptor::new(format!("t{}", i), format!("Template {}", i), format!("http://t/{}.png", i), 2))
            .collect()
    }

    fn ids(catalog: &Catalog) -> Vec<String> {
        catalog.visible().iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_twelve_template_walkthrough() {
        let mut catalog = Catalog::new(templates(12));
        assert_eq!(catalog.total_pages(), 3);
        assert_eq!(ids(&catalog), vec!["t0", "t1", "t2", "t3", "t4"]);

        assert!(catalog.navigate(Direction::Next));
        assert_eq!(ids(&catalog), vec!["t5", "t6", "t7", "t8", "t9"]);

        assert!(catalog.navigate(Direction::Next));
        assert_eq!(ids(&catalog), vec!["t10", "t11"]);

        assert!(!catalog.navigate(Direction::Next));
        assert_eq!(catalog.page(), 2);
        assert_eq!(ids(&catalog), vec!["t10", "t11"]);
    }

    #[test]
    fn test_prev_on_first_page_is_noop() {
        let mut catalog = Catalog::new(templates(7));
        assert!(!catalog.navigate(Direction::Prev));
        assert_eq!(catalog.page(), 0);
        catalog.navigate(Direction::Next);
        assert!(catalog.navigate(Direction::Prev));
        assert_eq!(catalog.page(), 0);
    }

    #[test]
    fn test_visible_window_sizes() {
        for count in [0usize, 1, 4, 5, 6, 10, 11, 23] {
            let mut catalog = Catalog::new(templates(count));
            loop {
                let start = catalog.page() * PAGE_SIZE;
                let expected = PAGE_SIZE.min(count - start.min(count));
                assert_eq!(catalog.visible().len(), expected, "count={} page={}", count, catalog.page());
                if let Some(first) = catalog.visible().first() {
                    assert_eq!(first.id, format!("t{}", start));
                }
                if !catalog.navigate(Direction::Next) {
                    break;
                }
            }
        }
    }

    #[test]
    fn test_empty_catalog_navigation() {
        let mut catalog = Catalog::default();
        assert_eq!(catalog.total_pages(), 0);
        assert!(!catalog.navigate(Direction::Next));
        assert!(!catalog.navigate(Direction::Prev));
        assert!(catalog.visible().is_empty());
    }

    #[test]
    fn test_descriptor_deserializes_service_payload() {
        let json = r#"{
            "id": "drake",
            "name": "Drakeposting",
            "lines": 2,
            "overlays": 0,
            "styles": [],
            "blank": "http://localhost:5000/images/drake.png",
            "example": {"text": ["left", "right"], "url": "http://localhost:5000/images/drake/left/right.png"},
            "source": "http://knowyourmeme.com/memes/drakeposting",
            "keywords": ["drake"],
            "_self": "http://localhost:5000/templates/drake"
        }"#;
        let t: TemplateDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(t.id, "drake");
        assert_eq!(t.lines, 2);
        assert_eq!(t.example.text, vec!["left", "right"]);
    }

    #[test]
    fn test_find_template() {
        let catalog = Catalog::new(templates(3));
        assert_eq!(catalog.find("t2").unwrap().name, "Template 2");
        assert!(matches!(catalog.find("zzz"), Err(MemeError::NotFound(_))));
    }
}
