//! Element query

use crate::element::property::CalculatedProperty;
use crate::engine::types::ImageTemplate;

/// Immutable description of the element(s) to find
#[derive(Debug, Clone)]
pub struct SearchedElement {
    /// Element kind, may be a pseudo tag such as `AlertBox`
    pub tag: String,
    pub criteria: Vec<CalculatedProperty>,
    /// Query resolved first; this one is searched inside its result
    pub parent: Option<Box<SearchedElement>>,
    /// 0 for all occurrences, N for the Nth (1-based)
    pub index: usize,
    /// Search among system components
    pub sys_comp: bool,
    /// Search by image instead of attributes
    pub image: Option<ImageTemplate>,
}

impl SearchedElement {
    pub fn new<S: Into<String>>(tag: S) -> Self {
        Self {
            tag: tag.into(),
            criteria: Vec::new(),
            parent: None,
            index: 0,
            sys_comp: false,
            image: None,
        }
    }

    /// Image search; the tag of the matches is `ImageMatch`
    pub fn image(template: ImageTemplate) -> Self {
        Self {
            image: Some(template),
            ..Self::new(crate::engine::image::IMAGE_MATCH_TAG)
        }
    }

    pub fn with_property(mut self, property: CalculatedProperty) -> Self {
        self.criteria.push(property);
        self
    }

    pub fn with_parent(mut self, parent: SearchedElement) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn with_sys_comp(mut self, sys_comp: bool) -> Self {
        self.sys_comp = sys_comp;
        self
    }

    /// Number of queries in the parent chain, this one included
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map(|p| p.depth()).unwrap_or(0)
    }

    /// Diagnostic description: `tag,name:value,...`
    pub fn description(&self) -> String {
        let mut description = self.tag.clone();
        for property in &self.criteria {
            description.push(',');
            description.push_str(&property.name);
            description.push(':');
            description.push_str(&property.calculated());
        }
        description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_and_depth() {
        let query = SearchedElement::new("input")
            .with_property(CalculatedProperty::new("name", "email"))
            .with_property(CalculatedProperty::regexp("class", "field.*"))
            .with_parent(SearchedElement::new("form"));

        assert_eq!(query.description(), "input,name:email,class:field.*");
        assert_eq!(query.depth(), 2);
    }
}
