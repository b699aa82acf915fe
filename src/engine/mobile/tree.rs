//! Captured element tree
//!
//! The tree is stored as an arena: nodes live in a flat vector, the root at
//! index 0, and refer to their parent and children by index. A capture
//! replaces the whole tree.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::element::found::FoundElement;
use crate::element::property::ElementAttributes;
use crate::engine::types::Rectangle;
use crate::{Error, Result};

/// Index of a node in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One captured element
#[derive(Debug, Clone, PartialEq)]
pub struct MobileNode {
    pub id: String,
    pub tag: String,
    /// Device coordinates
    pub rect: Rectangle,
    pub clickable: bool,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl ElementAttributes for MobileNode {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }
}

impl MobileNode {
    fn flag(&self, name: &str) -> bool {
        self.attributes
            .get(name)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn matches_tag(&self, tag: &str) -> bool {
        tag == "*" || self.tag.eq_ignore_ascii_case(tag)
    }
}

/// Letter of the 1-based sibling position in a DOM-order label
///
/// Positions beyond 26 all map to 'Z', so their labels collide.
pub fn dom_letter(position: usize) -> char {
    if (1..=26).contains(&position) {
        (b'@' + position as u8) as char
    } else {
        'Z'
    }
}

/// Snapshot of the remote element hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct MobileTree {
    nodes: Vec<MobileNode>,
}

impl MobileTree {
    pub const ROOT_LABEL: &'static str = "A";

    /// Tree holding a bare root, used before the first capture
    pub fn empty() -> Self {
        MobileTree {
            nodes: vec![MobileNode {
                id: String::new(),
                tag: String::new(),
                rect: Rectangle::default(),
                clickable: false,
                attributes: BTreeMap::new(),
                children: Vec::new(),
                parent: None,
            }],
        }
    }

    /// Build a tree from a captured JSON root
    pub fn from_value(value: &Value) -> Result<Self> {
        let root = match value.get("root") {
            Some(root) if root.is_object() => root,
            _ => value,
        };
        if !root.is_object() {
            return Err(Error::protocol("captured tree root is not an object"));
        }

        let mut tree = MobileTree { nodes: Vec::new() };
        tree.push(root, None);
        Ok(tree)
    }

    fn push(&mut self, value: &Value, parent: Option<NodeId>) -> NodeId {
        let index = NodeId(self.nodes.len());
        self.nodes.push(MobileNode {
            id: text(value.get("id")).unwrap_or_default(),
            tag: text(value.get("tag")).unwrap_or_default(),
            rect: Rectangle::new(
                number(value.get("x")),
                number(value.get("y")),
                number(value.get("width")),
                number(value.get("height")),
            ),
            clickable: value.get("clickable").and_then(Value::as_bool).unwrap_or(false),
            attributes: value
                .get("attributes")
                .and_then(Value::as_object)
                .map(|map| {
                    map.iter()
                        .filter_map(|(k, v)| text(Some(v)).map(|v| (k.clone(), v)))
                        .collect()
                })
                .unwrap_or_default(),
            children: Vec::new(),
            parent,
        });

        if let Some(children) = value.get("children").and_then(Value::as_array) {
            for child in children.iter().filter(|c| c.is_object()) {
                let child = self.push(child, Some(index));
                self.nodes[index.0].children.push(child);
            }
        }
        index
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &MobileNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Descendants of the root in depth-first order with their DOM-order label
    pub fn dom_order(&self) -> Vec<(String, NodeId)> {
        let mut list = Vec::with_capacity(self.nodes.len());
        self.load_list(self.root(), Self::ROOT_LABEL.to_string(), &mut list);
        list
    }

    fn load_list(&self, parent: NodeId, order: String, list: &mut Vec<(String, NodeId)>) {
        for (i, child) in self.node(parent).children.iter().enumerate() {
            let mut label = order.clone();
            label.push(dom_letter(i + 1));
            list.push((label.clone(), *child));
            self.load_list(*child, label, list);
        }
    }

    /// Single top-down sweep over the DOM-ordered descendants: a node
    /// replaces the current match when `accept` holds for it and its
    /// rectangle lies inside the current match
    fn sweep<F>(&self, accept: F) -> NodeId
    where
        F: Fn(&MobileNode) -> bool,
    {
        let mut list = self.dom_order();
        list.sort_by(|a, b| a.0.cmp(&b.0));

        let mut element = self.root();
        for (_, candidate) in list {
            let node = self.node(candidate);
            if accept(node) && self.node(element).rect.contains_rect(&node.rect) {
                element = candidate;
            }
        }
        element
    }

    /// Most specific node under a device point; points in the dead zone hit the root
    pub fn element_from_point(&self, x: f64, y: f64, dead_zone: Option<&Rectangle>) -> NodeId {
        if dead_zone.map(|z| z.contains_point(x, y)).unwrap_or(false) {
            return self.root();
        }
        self.sweep(|node| node.rect.contains_point(x, y))
    }

    /// Most specific node containing a device rectangle
    pub fn element_from_rect(&self, rect: &Rectangle) -> NodeId {
        self.sweep(|node| node.rect.contains_rect(rect))
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_by_id_from(self.root(), id)
    }

    /// Depth-first search below `start`, `start` included
    pub fn find_by_id_from(&self, start: NodeId, id: &str) -> Option<NodeId> {
        if self.node(start).id == id {
            return Some(start);
        }
        self.node(start)
            .children
            .iter()
            .find_map(|child| self.find_by_id_from(*child, id))
    }

    /// Nodes below `start` with the given tag, `start` included, depth-first
    pub fn elements_by_tag(&self, start: NodeId, tag: &str) -> Vec<NodeId> {
        let mut list = Vec::new();
        self.load_elements_by_tag(start, tag, &mut list);
        list
    }

    fn load_elements_by_tag(&self, start: NodeId, tag: &str, list: &mut Vec<NodeId>) {
        if self.node(start).matches_tag(tag) {
            list.push(start);
        }
        for child in &self.node(start).children {
            self.load_elements_by_tag(*child, tag, list);
        }
    }

    /// Ancestors nearest first, the root excluded
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            if parent == self.root() {
                break;
            }
            result.push(parent);
            current = self.node(parent).parent;
        }
        result
    }

    pub fn to_found(&self, id: NodeId) -> FoundElement {
        let node = self.node(id);
        let mut found = FoundElement::new(&node.id, &node.tag, node.rect);
        found.is_password = node.flag("password");
        found.is_numeric = node.flag("numeric");
        found.text = node.attributes.get("text").cloned();
        found
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str, tag: &str, rect: [f64; 4], children: Vec<Value>) -> Value {
        json!({
            "id": id,
            "tag": tag,
            "x": rect[0], "y": rect[1], "width": rect[2], "height": rect[3],
            "clickable": true,
            "attributes": {"text": format!("{}-text", id)},
            "children": children,
        })
    }

    #[test]
    fn test_dom_order_labels() {
        let tree = MobileTree::from_value(&node(
            "root",
            "App",
            [0.0, 0.0, 100.0, 100.0],
            vec![
                node("c1", "View", [0.0, 0.0, 10.0, 10.0], vec![]),
                node("c2", "View", [0.0, 0.0, 10.0, 10.0], vec![]),
                node("c3", "View", [0.0, 0.0, 10.0, 10.0], vec![]),
            ],
        ))
        .unwrap();

        let labels: Vec<String> = tree.dom_order().into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["AA", "AB", "AC"]);
    }

    #[test]
    fn test_dom_letter_clamp() {
        assert_eq!(dom_letter(1), 'A');
        assert_eq!(dom_letter(26), 'Z');
        assert_eq!(dom_letter(27), 'Z');

        let children: Vec<Value> = (0..30)
            .map(|i| node(&format!("c{}", i), "Cell", [0.0, 0.0, 1.0, 1.0], vec![]))
            .collect();
        let tree = MobileTree::from_value(&node("root", "App", [0.0, 0.0, 100.0, 100.0], children)).unwrap();
        let labels: Vec<String> = tree.dom_order().into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels[25], "AZ");
        assert_eq!(labels[26], "AZ");
        assert_eq!(labels[29], "AZ");
    }

    #[test]
    fn test_point_prefers_nested_child() {
        let tree = MobileTree::from_value(&node(
            "root",
            "App",
            [0.0, 0.0, 100.0, 100.0],
            vec![node("child", "Button", [40.0, 40.0, 20.0, 20.0], vec![])],
        ))
        .unwrap();

        let hit = tree.element_from_point(50.0, 50.0, None);
        assert_eq!(tree.node(hit).id, "child");
        assert_eq!(tree.element_from_point(50.0, 50.0, None), hit);

        let outside = tree.element_from_point(5.0, 5.0, None);
        assert_eq!(outside, tree.root());

        let dead_zone = Rectangle::new(0.0, 0.0, 100.0, 60.0);
        assert_eq!(tree.element_from_point(50.0, 50.0, Some(&dead_zone)), tree.root());
    }

    #[test]
    fn test_point_ignores_overlapping_sibling_outside_match() {
        // the overlay spills out of the panel that contains the point
        let tree = MobileTree::from_value(&node(
            "root",
            "App",
            [0.0, 0.0, 100.0, 100.0],
            vec![
                node(
                    "panel",
                    "View",
                    [0.0, 0.0, 50.0, 50.0],
                    vec![node("label", "Text", [10.0, 10.0, 20.0, 20.0], vec![])],
                ),
                node("overlay", "View", [5.0, 5.0, 80.0, 80.0], vec![]),
            ],
        ))
        .unwrap();

        let hit = tree.element_from_point(15.0, 15.0, None);
        assert_eq!(tree.node(hit).id, "label");
    }

    #[test]
    fn test_rect_lookup() {
        let tree = MobileTree::from_value(&node(
            "root",
            "App",
            [0.0, 0.0, 100.0, 100.0],
            vec![node("child", "Button", [40.0, 40.0, 20.0, 20.0], vec![])],
        ))
        .unwrap();

        let hit = tree.element_from_rect(&Rectangle::new(45.0, 45.0, 5.0, 5.0));
        assert_eq!(tree.node(hit).id, "child");
        let hit = tree.element_from_rect(&Rectangle::new(35.0, 45.0, 10.0, 5.0));
        assert_eq!(hit, tree.root());
    }

    #[test]
    fn test_lookup_and_ancestors() {
        let tree = MobileTree::from_value(&json!({
            "root": node(
                "root",
                "App",
                [0.0, 0.0, 100.0, 100.0],
                vec![node(
                    "list",
                    "List",
                    [0.0, 0.0, 100.0, 100.0],
                    vec![node("cell", "Cell", [0.0, 0.0, 100.0, 10.0], vec![])],
                )],
            )
        }))
        .unwrap();

        let cell = tree.find_by_id("cell").unwrap();
        let ancestors: Vec<&str> = tree
            .ancestors(cell)
            .into_iter()
            .map(|id| tree.node(id).id.as_str())
            .collect();
        assert_eq!(ancestors, vec!["list"]);

        assert_eq!(tree.elements_by_tag(tree.root(), "cell"), vec![cell]);
        assert_eq!(tree.elements_by_tag(tree.root(), "*").len(), 3);
        assert_eq!(tree.to_found(cell).text.as_deref(), Some("cell-text"));
        assert!(tree.find_by_id("missing").is_none());
    }
}
