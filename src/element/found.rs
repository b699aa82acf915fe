//! Resolved element handle

use serde::Serialize;

use crate::engine::types::Rectangle;

/// Backend-opaque reference to one resolved element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoundElement {
    /// Backend handle
    pub id: String,
    pub tag: String,
    /// Cached bounding rectangle in channel coordinates
    pub rect: Rectangle,
    pub is_password: bool,
    pub is_numeric: bool,
    pub is_iframe: bool,
    /// Inner text when the backend exposes it
    pub text: Option<String>,
    /// Nearest ancestor, filled by `DriverEngine::load_parents`
    #[serde(skip)]
    pub parent: Option<Box<FoundElement>>,
}

impl FoundElement {
    pub fn new<I: Into<String>, T: Into<String>>(id: I, tag: T, rect: Rectangle) -> Self {
        Self {
            id: id.into(),
            tag: tag.into(),
            rect,
            is_password: false,
            is_numeric: false,
            is_iframe: false,
            text: None,
            parent: None,
        }
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_password(mut self, is_password: bool) -> Self {
        self.is_password = is_password;
        self
    }

    /// Refresh the cached rectangle
    pub fn update_bounding(&mut self, rect: Rectangle) {
        self.rect = rect;
    }

    pub fn is_body(&self) -> bool {
        self.tag.eq_ignore_ascii_case("body")
    }

    /// Ancestors nearest first, as far as they were loaded
    pub fn ancestors(&self) -> Vec<&FoundElement> {
        let mut result = Vec::new();
        let mut current = self.parent.as_deref();
        while let Some(parent) = current {
            result.push(parent);
            current = parent.parent.as_deref();
        }
        result
    }

    /// Attach an ancestor chain given nearest first
    pub fn set_ancestors(&mut self, ancestors: Vec<FoundElement>) {
        self.parent = ancestors.into_iter().rev().fold(None, |parent, mut ancestor| {
            ancestor.parent = parent;
            Some(Box::new(ancestor))
        });
    }
}
