//! Mock engine implementation for testing
//!
//! `MockEngine` serves a flat list of scripted nodes, counts every backend
//! call and can be told to fail a number of interactions with a transient
//! "not interactable" error.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::element::found::FoundElement;
use crate::element::property::{CalculatedProperty, ElementAttributes};
use crate::engine::traits::{DriverEngine, ElementQuery};
use crate::engine::types::{ChannelDimensions, ImageTemplate, MouseDirection, Rectangle, SendKeyData};
use crate::{Error, Result};

/// Scripted element of the mock tree
#[derive(Debug, Clone)]
pub struct MockNode {
    pub id: String,
    pub tag: String,
    pub rect: Rectangle,
    pub attributes: HashMap<String, String>,
    pub text: Option<String>,
    /// Id of the parent node
    pub parent: Option<String>,
}

impl MockNode {
    pub fn new(id: &str, tag: &str) -> Self {
        Self {
            id: id.to_string(),
            tag: tag.to_string(),
            rect: Rectangle::new(0.0, 0.0, 10.0, 10.0),
            attributes: HashMap::new(),
            text: None,
            parent: None,
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn rect(mut self, rect: Rectangle) -> Self {
        self.rect = rect;
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn child_of(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    fn to_found(&self) -> FoundElement {
        let mut found = FoundElement::new(&self.id, &self.tag, self.rect);
        found.text = self.text.clone();
        found.is_password = self
            .attributes
            .get("type")
            .map(|t| t == "password")
            .unwrap_or(false);
        found
    }
}

impl ElementAttributes for MockNode {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }
}

/// Call counters of the mock engine
#[derive(Debug, Default)]
pub struct MockCalls {
    pub find: AtomicUsize,
    pub click: AtomicUsize,
    pub hover: AtomicUsize,
    pub text: AtomicUsize,
    pub select: AtomicUsize,
    pub bound_rect: AtomicUsize,
    pub attribute: AtomicUsize,
    pub script: AtomicUsize,
}

/// Mock engine
#[derive(Debug, Default)]
pub struct MockEngine {
    nodes: Mutex<Vec<MockNode>>,
    calls: MockCalls,
    fail_clicks: AtomicU32,
    fail_hover: AtomicU32,
    fail_text: AtomicU32,
    fail_select: AtomicU32,
    stale_find: AtomicBool,
    rects: Mutex<VecDeque<Rectangle>>,
    last_rect: Mutex<Option<Rectangle>>,
    select_options: Mutex<Vec<Vec<String>>>,
    actions: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MockEngine {
    /// Create an empty mock engine
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: MockNode) -> Self {
        self.nodes.get_mut().push(node);
        self
    }

    pub fn with_select_options(mut self, options: Vec<Vec<String>>) -> Self {
        *self.select_options.get_mut() = options;
        self
    }

    /// Successive results of `get_bound_rect`; the last one is repeated
    pub fn with_rects(mut self, rects: Vec<Rectangle>) -> Self {
        *self.rects.get_mut() = rects.into();
        self
    }

    /// Fail the next `n` clicks as not interactable
    pub fn fail_clicks(self, n: u32) -> Self {
        self.fail_clicks.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the next `n` hovers as not interactable
    pub fn fail_hover(self, n: u32) -> Self {
        self.fail_hover.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the next `n` text entries as not interactable
    pub fn fail_text(self, n: u32) -> Self {
        self.fail_text.store(n, Ordering::SeqCst);
        self
    }

    pub fn fail_select(self, n: u32) -> Self {
        self.fail_select.store(n, Ordering::SeqCst);
        self
    }

    /// Make searches raise a stale reference
    pub fn stale_find(self, stale: bool) -> Self {
        self.stale_find.store(stale, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> &MockCalls {
        &self.calls
    }

    /// Recorded actions, in call order
    pub async fn actions(&self) -> Vec<String> {
        self.actions.lock().await.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn record(&self, action: String) {
        self.actions.lock().await.push(action);
    }

    fn consume_failure(counter: &AtomicU32, what: &str) -> Result<()> {
        let remaining = counter.load(Ordering::SeqCst);
        if remaining > 0 {
            counter.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::not_interactable(format!("{} is covered", what)));
        }
        Ok(())
    }

    async fn node(&self, id: &str) -> Option<MockNode> {
        self.nodes.lock().await.iter().find(|n| n.id == id).cloned()
    }
}

#[async_trait]
impl DriverEngine for MockEngine {
    fn dimensions(&self) -> ChannelDimensions {
        let screen = Rectangle::new(0.0, 0.0, 1080.0, 1920.0);
        ChannelDimensions {
            device: screen,
            channel: screen,
        }
    }

    async fn find_elements(&self, query: &ElementQuery<'_>) -> Result<Vec<FoundElement>> {
        self.calls.find.fetch_add(1, Ordering::SeqCst);

        if self.stale_find.load(Ordering::SeqCst) {
            return Err(Error::stale_reference("tree changed during search"));
        }

        let nodes = self.nodes.lock().await;
        Ok(nodes
            .iter()
            .filter(|n| query.tag == "*" || n.tag.eq_ignore_ascii_case(query.tag))
            .filter(|n| match query.parent {
                Some(parent) => n.parent.as_deref() == Some(parent.id.as_str()),
                None => true,
            })
            .filter(|n| query.predicate.matches(*n))
            .map(MockNode::to_found)
            .collect())
    }

    async fn find_elements_by_image(
        &self,
        _parent: Option<&FoundElement>,
        _template: &ImageTemplate,
    ) -> Result<Vec<FoundElement>> {
        self.calls.find.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn element_from_point(&self, _sys_comp: bool, x: f64, y: f64) -> Result<Option<FoundElement>> {
        let nodes = self.nodes.lock().await;
        Ok(nodes
            .iter()
            .rev()
            .find(|n| n.rect.contains_point(x, y))
            .map(MockNode::to_found))
    }

    async fn element_from_rect(&self, _sys_comp: bool, rect: Rectangle) -> Result<Option<FoundElement>> {
        let nodes = self.nodes.lock().await;
        Ok(nodes
            .iter()
            .rev()
            .find(|n| n.rect.contains_rect(&rect))
            .map(MockNode::to_found))
    }

    async fn get_attribute(
        &self,
        element: &FoundElement,
        name: &str,
        _max_try: u32,
    ) -> Result<Option<String>> {
        self.calls.attribute.fetch_add(1, Ordering::SeqCst);
        Ok(self.node(&element.id).await.and_then(|n| n.attribute(name)))
    }

    async fn get_attributes(&self, element: &FoundElement, _reload: bool) -> Result<Vec<CalculatedProperty>> {
        self.calls.attribute.fetch_add(1, Ordering::SeqCst);
        let mut attributes: Vec<CalculatedProperty> = self
            .node(&element.id)
            .await
            .map(|n| {
                n.attributes
                    .iter()
                    .map(|(k, v)| CalculatedProperty::new(k.as_str(), v.as_str()))
                    .collect()
            })
            .unwrap_or_default();
        attributes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(attributes)
    }

    async fn get_css_attributes(&self, _element: &FoundElement) -> Result<Vec<CalculatedProperty>> {
        Ok(Vec::new())
    }

    async fn load_parents(&self, element: &mut FoundElement) -> Result<()> {
        let mut ancestors = Vec::new();
        let mut current = self.node(&element.id).await.and_then(|n| n.parent);
        while let Some(id) = current {
            match self.node(&id).await {
                Some(node) => {
                    current = node.parent.clone();
                    ancestors.push(node.to_found());
                }
                None => break,
            }
        }
        element.set_ancestors(ancestors);
        Ok(())
    }

    async fn load_select_options(&self, _element: &FoundElement) -> Result<Vec<Vec<String>>> {
        Ok(self.select_options.lock().await.clone())
    }

    async fn mouse_click(
        &self,
        element: &FoundElement,
        _position: &MouseDirection,
        _offset_x: i32,
        _offset_y: i32,
    ) -> Result<()> {
        self.calls.click.fetch_add(1, Ordering::SeqCst);
        Self::consume_failure(&self.fail_clicks, &element.tag)?;
        self.record(format!("click {}", element.id)).await;
        Ok(())
    }

    async fn mouse_move_to_element(&self, element: &FoundElement) -> Result<()> {
        self.calls.hover.fetch_add(1, Ordering::SeqCst);
        Self::consume_failure(&self.fail_hover, &element.tag)
    }

    async fn mouse_move_with_offset(
        &self,
        element: &FoundElement,
        _position: &MouseDirection,
        desktop_drag: bool,
        _offset_x: i32,
        _offset_y: i32,
    ) -> Result<()> {
        self.record(format!("over {} {}", element.id, desktop_drag)).await;
        Ok(())
    }

    async fn drag(
        &self,
        element: &FoundElement,
        _position: &MouseDirection,
        _offset_x: i32,
        _offset_y: i32,
    ) -> Result<()> {
        self.record(format!("drag {}", element.id)).await;
        Ok(())
    }

    async fn release(&self, _position: Option<&MouseDirection>, _desktop_drag: bool) -> Result<()> {
        self.record("release".to_string()).await;
        Ok(())
    }

    async fn move_by_offset(&self, horizontal: i32, vertical: i32) -> Result<()> {
        self.record(format!("move {} {}", horizontal, vertical)).await;
        Ok(())
    }

    async fn tap(&self, count: u32, element: &FoundElement) -> Result<()> {
        self.record(format!("tap {} {}", element.id, count)).await;
        Ok(())
    }

    async fn press(&self, duration_ms: u64, paths: &[String], element: &FoundElement) -> Result<()> {
        self.record(format!("press {} {} {}", element.id, duration_ms, paths.join(";")))
            .await;
        Ok(())
    }

    async fn scroll(&self, element: Option<&FoundElement>, delta: i32) -> Result<()> {
        let id = element.map(|e| e.id.as_str()).unwrap_or("-");
        self.record(format!("scroll {} {}", id, delta)).await;
        Ok(())
    }

    async fn select_options_item(
        &self,
        element: &FoundElement,
        property: &CalculatedProperty,
    ) -> Result<()> {
        self.calls.select.fetch_add(1, Ordering::SeqCst);
        Self::consume_failure(&self.fail_select, &element.tag)?;
        self.record(format!("select {} {}", element.id, property.calculated()))
            .await;
        Ok(())
    }

    async fn send_text_data(&self, element: &FoundElement, keys: &[SendKeyData]) -> Result<()> {
        self.calls.text.fetch_add(1, Ordering::SeqCst);
        Self::consume_failure(&self.fail_text, &element.tag)?;
        for key in keys {
            self.record(format!("text {} {}", element.id, key.sequence_mobile()))
                .await;
        }
        Ok(())
    }

    async fn clear_text(&self, element: &FoundElement, _position: &MouseDirection) -> Result<()> {
        self.record(format!("clear {}", element.id)).await;
        Ok(())
    }

    async fn execute_javascript(&self, script: &str, element: Option<&FoundElement>) -> Result<Value> {
        self.calls.script.fetch_add(1, Ordering::SeqCst);
        if script.contains("throw") {
            return Err(Error::script_execution_failed("script raised an error"));
        }
        Ok(serde_json::json!({
            "script": script,
            "element": element.map(|e| e.id.clone()),
        }))
    }

    async fn get_bound_rect(&self, element: &FoundElement) -> Result<Option<Rectangle>> {
        self.calls.bound_rect.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last_rect.lock().await;
        if let Some(rect) = self.rects.lock().await.pop_front() {
            *last = Some(rect);
        }
        Ok(Some(last.unwrap_or(element.rect)))
    }

    async fn screenshot(&self, _x: f64, _y: f64, _width: f64, _height: f64) -> Vec<u8> {
        vec![0]
    }

    async fn refresh_element_map_location(&self) -> Result<()> {
        Ok(())
    }

    async fn get_source(&self) -> Result<String> {
        let nodes = self.nodes.lock().await;
        Ok(nodes
            .iter()
            .map(|n| format!("<{} id=\"{}\"/>", n.tag, n.id))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn close(&self, keep_running: bool) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.record(format!("close {}", keep_running)).await;
        Ok(())
    }

    async fn system_button(&self, button: &str) -> Result<()> {
        self.record(format!("button {}", button)).await;
        Ok(())
    }
}
