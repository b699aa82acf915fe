//! Null-object engine bound to the empty channel

use async_trait::async_trait;
use serde_json::Value;

use crate::element::found::FoundElement;
use crate::element::property::CalculatedProperty;
use crate::engine::traits::{DriverEngine, ElementQuery};
use crate::engine::types::{ChannelDimensions, ImageTemplate, MouseDirection, Rectangle, SendKeyData};
use crate::{Error, Result};

/// Engine of the empty channel: finds nothing, rejects every action
#[derive(Debug, Default)]
pub struct EmptyEngine;

impl EmptyEngine {
    pub fn new() -> Self {
        Self
    }

    fn rejected<T>(action: &str) -> Result<T> {
        Err(Error::channel_not_found(format!("no running channel, cannot {}", action)))
    }
}

#[async_trait]
impl DriverEngine for EmptyEngine {
    fn dimensions(&self) -> ChannelDimensions {
        ChannelDimensions::default()
    }

    async fn find_elements(&self, _query: &ElementQuery<'_>) -> Result<Vec<FoundElement>> {
        Ok(Vec::new())
    }

    async fn find_elements_by_image(
        &self,
        _parent: Option<&FoundElement>,
        _template: &ImageTemplate,
    ) -> Result<Vec<FoundElement>> {
        Ok(Vec::new())
    }

    async fn element_from_point(&self, _sys_comp: bool, _x: f64, _y: f64) -> Result<Option<FoundElement>> {
        Ok(None)
    }

    async fn element_from_rect(&self, _sys_comp: bool, _rect: Rectangle) -> Result<Option<FoundElement>> {
        Ok(None)
    }

    async fn get_attribute(
        &self,
        _element: &FoundElement,
        _name: &str,
        _max_try: u32,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    async fn get_attributes(&self, _element: &FoundElement, _reload: bool) -> Result<Vec<CalculatedProperty>> {
        Ok(Vec::new())
    }

    async fn get_css_attributes(&self, _element: &FoundElement) -> Result<Vec<CalculatedProperty>> {
        Ok(Vec::new())
    }

    async fn load_parents(&self, _element: &mut FoundElement) -> Result<()> {
        Ok(())
    }

    async fn load_select_options(&self, _element: &FoundElement) -> Result<Vec<Vec<String>>> {
        Ok(Vec::new())
    }

    async fn mouse_click(
        &self,
        _element: &FoundElement,
        _position: &MouseDirection,
        _offset_x: i32,
        _offset_y: i32,
    ) -> Result<()> {
        Self::rejected("click")
    }

    async fn mouse_move_to_element(&self, _element: &FoundElement) -> Result<()> {
        Self::rejected("move mouse")
    }

    async fn mouse_move_with_offset(
        &self,
        _element: &FoundElement,
        _position: &MouseDirection,
        _desktop_drag: bool,
        _offset_x: i32,
        _offset_y: i32,
    ) -> Result<()> {
        Self::rejected("move mouse")
    }

    async fn drag(
        &self,
        _element: &FoundElement,
        _position: &MouseDirection,
        _offset_x: i32,
        _offset_y: i32,
    ) -> Result<()> {
        Self::rejected("drag")
    }

    async fn release(&self, _position: Option<&MouseDirection>, _desktop_drag: bool) -> Result<()> {
        Self::rejected("release")
    }

    async fn move_by_offset(&self, _horizontal: i32, _vertical: i32) -> Result<()> {
        Self::rejected("move mouse")
    }

    async fn tap(&self, _count: u32, _element: &FoundElement) -> Result<()> {
        Self::rejected("tap")
    }

    async fn press(&self, _duration_ms: u64, _paths: &[String], _element: &FoundElement) -> Result<()> {
        Self::rejected("press")
    }

    async fn scroll(&self, _element: Option<&FoundElement>, _delta: i32) -> Result<()> {
        Self::rejected("scroll")
    }

    async fn select_options_item(
        &self,
        _element: &FoundElement,
        _property: &CalculatedProperty,
    ) -> Result<()> {
        Self::rejected("select")
    }

    async fn send_text_data(&self, _element: &FoundElement, _keys: &[SendKeyData]) -> Result<()> {
        Self::rejected("send text")
    }

    async fn clear_text(&self, _element: &FoundElement, _position: &MouseDirection) -> Result<()> {
        Self::rejected("clear text")
    }

    async fn execute_javascript(&self, _script: &str, _element: Option<&FoundElement>) -> Result<Value> {
        Self::rejected("execute script")
    }

    async fn get_bound_rect(&self, _element: &FoundElement) -> Result<Option<Rectangle>> {
        Ok(None)
    }

    async fn screenshot(&self, _x: f64, _y: f64, _width: f64, _height: f64) -> Vec<u8> {
        vec![0]
    }

    async fn refresh_element_map_location(&self) -> Result<()> {
        Ok(())
    }

    async fn get_source(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn close(&self, _keep_running: bool) -> Result<()> {
        Ok(())
    }
}
