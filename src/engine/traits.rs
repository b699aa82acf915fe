//! Backend capability contract
//!
//! Every backend (web, desktop, mobile, api) implements [`DriverEngine`].
//! "Not found" is reported with `Ok(None)` or an empty list; errors are kept
//! for transient faults (`StaleReference`, `NotInteractable`) and genuine
//! backend failures.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

use crate::element::found::FoundElement;
use crate::element::property::{CalculatedProperty, Criteria};
use crate::engine::types::{ChannelDimensions, ImageTemplate, MouseDirection, Rectangle, SendKeyData};
use crate::{Error, Result};

/// Element search request
#[derive(Debug, Clone, Copy)]
pub struct ElementQuery<'a> {
    /// Search among system components
    pub sys_comp: bool,
    /// Resolved parent, `None` to search from the root
    pub parent: Option<&'a FoundElement>,
    pub tag: &'a str,
    /// Names of the criteria attributes
    pub attributes: &'a [String],
    /// Server-side filter hints (`name` or `name\tvalue`)
    pub attribute_values: &'a [String],
    /// Client-side predicate every result must satisfy
    pub predicate: &'a Criteria,
}

/// Backend capability set
#[async_trait]
pub trait DriverEngine: Send + Sync + Debug {
    /// Device and channel geometry
    fn dimensions(&self) -> ChannelDimensions;

    // Query

    /// Find elements by tag and criteria
    async fn find_elements(&self, query: &ElementQuery<'_>) -> Result<Vec<FoundElement>>;

    /// Find occurrences of an image on the screen
    async fn find_elements_by_image(
        &self,
        parent: Option<&FoundElement>,
        template: &ImageTemplate,
    ) -> Result<Vec<FoundElement>>;

    /// Most specific element under a point
    async fn element_from_point(&self, sys_comp: bool, x: f64, y: f64) -> Result<Option<FoundElement>>;

    /// Most specific element containing a rectangle
    async fn element_from_rect(&self, sys_comp: bool, rect: Rectangle) -> Result<Option<FoundElement>>;

    // Attributes

    async fn get_attribute(
        &self,
        element: &FoundElement,
        name: &str,
        max_try: u32,
    ) -> Result<Option<String>>;

    async fn get_attributes(&self, element: &FoundElement, reload: bool) -> Result<Vec<CalculatedProperty>>;

    async fn get_css_attributes(&self, element: &FoundElement) -> Result<Vec<CalculatedProperty>>;

    /// Fill the ancestor chain of `element`, stopping below the root
    async fn load_parents(&self, element: &mut FoundElement) -> Result<()>;

    /// Options of a select element, one row of cells per option
    async fn load_select_options(&self, element: &FoundElement) -> Result<Vec<Vec<String>>>;

    // Interaction

    async fn mouse_click(
        &self,
        element: &FoundElement,
        position: &MouseDirection,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<()>;

    /// Plain hover, used to probe interactability
    async fn mouse_move_to_element(&self, element: &FoundElement) -> Result<()>;

    /// Hover at a position, optionally as part of a desktop drag
    async fn mouse_move_with_offset(
        &self,
        element: &FoundElement,
        position: &MouseDirection,
        desktop_drag: bool,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<()>;

    async fn drag(
        &self,
        element: &FoundElement,
        position: &MouseDirection,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<()>;

    async fn release(&self, position: Option<&MouseDirection>, desktop_drag: bool) -> Result<()>;

    /// Move the pointer from the drag origin
    async fn move_by_offset(&self, horizontal: i32, vertical: i32) -> Result<()>;

    async fn tap(&self, count: u32, element: &FoundElement) -> Result<()>;

    async fn press(&self, duration_ms: u64, paths: &[String], element: &FoundElement) -> Result<()>;

    async fn scroll(&self, element: Option<&FoundElement>, delta: i32) -> Result<()>;

    async fn select_options_item(
        &self,
        element: &FoundElement,
        property: &CalculatedProperty,
    ) -> Result<()>;

    async fn send_text_data(&self, element: &FoundElement, keys: &[SendKeyData]) -> Result<()>;

    async fn clear_text(&self, element: &FoundElement, position: &MouseDirection) -> Result<()>;

    /// Run a script, on an element when given
    async fn execute_javascript(&self, script: &str, element: Option<&FoundElement>) -> Result<Value>;

    // Geometry

    /// Current bounding rectangle, `None` when the backend cannot tell
    async fn get_bound_rect(&self, element: &FoundElement) -> Result<Option<Rectangle>>;

    /// PNG capture of a screen area, never fails
    async fn screenshot(&self, x: f64, y: f64, width: f64, height: f64) -> Vec<u8>;

    // Lifecycle

    /// Re-capture the element tree
    async fn refresh_element_map_location(&self) -> Result<()>;

    async fn get_source(&self) -> Result<String>;

    /// Stop the session; `keep_running` leaves the application alive
    async fn close(&self, keep_running: bool) -> Result<()>;

    // Optional capabilities

    async fn set_sys_property(&self, name: &str, _value: &str) -> Result<()> {
        Err(Error::unsupported(format!("system property '{}'", name)))
    }

    async fn get_sys_property(&self, name: &str) -> Result<Option<String>> {
        Err(Error::unsupported(format!("system property '{}'", name)))
    }

    async fn system_button(&self, button: &str) -> Result<()> {
        Err(Error::unsupported(format!("system button '{}'", button)))
    }

    /// Accept or dismiss the current dialog box
    async fn dialog_action(&self, action: &str) -> Result<()> {
        Err(Error::unsupported(format!("dialog action '{}'", action)))
    }

    /// Bring the application to front
    async fn switch_app(&self) -> Result<()> {
        Err(Error::unsupported("application switch"))
    }
}
