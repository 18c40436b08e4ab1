// src/markup.rs
//! Minimal node-query surface the listing parser works against.
//!
//! The parser only needs "find nodes under this node", "text of this node" and
//! "attribute of this node". Keeping it to that lets the parsing rules be
//! tested and reused without tying them to one HTML library.

use scraper::{ElementRef, Selector};

use crate::error::ParseError;

pub trait NodeQuery: Sized {
    /// All descendants matching a CSS pattern, in document order.
    fn select_all(&self, pattern: &str) -> Result<Vec<Self>, ParseError>;

    /// First descendant matching a CSS pattern.
    fn select_first(&self, pattern: &str) -> Result<Option<Self>, ParseError> {
        Ok(self.select_all(pattern)?.into_iter().next())
    }

    /// Text content with surrounding whitespace trimmed and inner runs collapsed.
    fn text_content(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;
}

/// Compile a CSS pattern, mapping failures into [`ParseError`].
pub fn compile_selector(pattern: &str) -> Result<Selector, ParseError> {
    Selector::parse(pattern).map_err(|e| ParseError::Selector {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

impl NodeQuery for ElementRef<'_> {
    fn select_all(&self, pattern: &str) -> Result<Vec<Self>, ParseError> {
        let selector = compile_selector(pattern)?;
        Ok(ElementRef::select(self, &selector).collect())
    }

    fn text_content(&self) -> String {
        clean_text(&ElementRef::text(self).collect::<String>())
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.value().attr(name).map(str::to_string)
    }
}

pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_select_and_text() {
        let doc = Html::parse_fragment(
            r#"<ul><li class="a"> Rī<b>ga</b>
                </li><li class="a">Ogre</li></ul>"#,
        );
        let root = doc.root_element();

        let items = root.select_all("li.a").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text_content(), "Rīga");
        assert_eq!(items[1].text_content(), "Ogre");
        assert!(root.select_first("li.missing").unwrap().is_none());
    }

    #[test]
    fn test_attribute() {
        let doc = Html::parse_fragment(r#"<a class="x" href="/job/1">Job</a>"#);
        let link = doc.root_element().select_first("a.x").unwrap().unwrap();
        assert_eq!(link.attribute("href").as_deref(), Some("/job/1"));
        assert_eq!(link.attribute("title"), None);
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let doc = Html::parse_fragment("<p>x</p>");
        let err = doc.root_element().select_all("li[").unwrap_err();
        assert!(matches!(err, ParseError::Selector { pattern, .. } if pattern == "li["));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  1500 \n\t - 2000  € "), "1500 - 2000 €");
        assert_eq!(clean_text("   "), "");
    }
}
