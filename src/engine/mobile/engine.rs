//! Mobile driver engine

use async_trait::async_trait;
use base64::Engine as _;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::channel::traits::StartRequest;
use crate::config::Config;
use crate::element::found::FoundElement;
use crate::element::property::{CalculatedProperty, ElementAttributes};
use crate::engine::image;
use crate::engine::mobile::cache::TimedCache;
use crate::engine::mobile::client::{
    HttpTransport, MobileClient, MobileEndpoint, MobileResponse, MobileTransport, ALERT, APP,
    CAPTURE, DRIVER, ELEMENT, GET_PROP, INPUT, PRESS, SCRIPTING, SET_PROP, START, STOP, SWIPE,
    SWITCH, SYS_BUTTON, TAP,
};
use crate::engine::mobile::tree::MobileTree;
use crate::engine::traits::{DriverEngine, ElementQuery};
use crate::engine::types::{ChannelDimensions, ImageTemplate, MouseDirection, Rectangle, SendKeyData};
use crate::{Error, Result};

const ANDROID: &str = "android";
const IOS: &str = "ios";
const ALERT_BOX: &str = "AlertBox";
const ALERT_TAG: &str = "Alert";

/// Identity of the device and application reported at session start
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceInfo {
    pub os: String,
    pub system_name: String,
    pub driver_version: String,
    pub mobile_user: String,
    pub mobile_name: String,
    pub os_build: String,
    pub country: String,
    pub version: String,
    pub application: Option<String>,
    /// `host:port` of the screen capture stream
    pub screen_capture: String,
    pub system_properties: Vec<String>,
    pub system_buttons: Vec<String>,
    #[serde(skip)]
    pub icon: Vec<u8>,
}

/// Engine driving a remote mobile driver
#[derive(Debug)]
pub struct MobileDriverEngine {
    client: MobileClient,
    info: DeviceInfo,
    dimensions: ChannelDimensions,
    dead_zone: Option<Rectangle>,
    root: RwLock<Arc<MobileTree>>,
    source: RwLock<String>,
    cached: Mutex<TimedCache<MobileTree>>,
    drag_origin: Mutex<Option<(f64, f64)>>,
}

fn dimension(response: &MobileResponse, width: &str, height: &str) -> Rectangle {
    Rectangle::new(
        0.0,
        0.0,
        response.f64(width).unwrap_or(0.0),
        response.f64(height).unwrap_or(0.0),
    )
}

fn checked(response: Option<MobileResponse>, category: &str) -> Result<MobileResponse> {
    let response =
        response.ok_or_else(|| Error::protocol(format!("no response to '{}' request", category)))?;
    if response.is_success() {
        Ok(response)
    } else {
        Err(Error::protocol(response.message()))
    }
}

/// Interactions answered with a non-zero status may succeed later
fn interactable(response: Option<MobileResponse>, category: &str) -> Result<MobileResponse> {
    let response =
        response.ok_or_else(|| Error::protocol(format!("no response to '{}' request", category)))?;
    if response.is_success() {
        Ok(response)
    } else {
        Err(Error::not_interactable(response.message()))
    }
}

fn coordinate(value: f64) -> String {
    (value.round() as i64).to_string()
}

impl MobileDriverEngine {
    /// Start a session over HTTP
    pub async fn start(request: &StartRequest) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&request.config)?);
        Self::start_with_transport(&request.application, &request.config, transport).await
    }

    /// Start the driver, then the application, then capture the first tree
    #[instrument(skip(config, transport))]
    pub async fn start_with_transport(
        application: &str,
        config: &Config,
        transport: Arc<dyn MobileTransport>,
    ) -> Result<Self> {
        let endpoint = MobileEndpoint::parse(application)
            .map_err(|e| Error::channel_start(e.to_string()))?;
        let client = MobileClient::new(endpoint.clone(), transport, config.user_agent());

        let response = client.execute(DRIVER, &[START]).await.ok_or_else(|| {
            Error::channel_start(format!("unable to connect to : mobile://{}", endpoint.endpoint))
        })?;
        if !response.is_success() {
            return Err(Error::channel_start(response.message()));
        }

        client.set_token(response.str("token"));

        let os = response.str("os").unwrap_or_default();
        let mut info = DeviceInfo {
            os: os.clone(),
            system_name: response.str("systemName").unwrap_or_default(),
            driver_version: response.str("driverVersion").unwrap_or_default(),
            mobile_user: response.str("mobileUser").unwrap_or_default(),
            mobile_name: response.str("mobileName").unwrap_or_default(),
            os_build: response.str("osBuild").unwrap_or_default(),
            country: response.str("country").unwrap_or_default(),
            system_properties: response.string_list("systemProperties"),
            system_buttons: response.string_list("systemButtons"),
            ..Default::default()
        };

        let mut dimensions = ChannelDimensions::default();
        let mut dead_zone = None;

        if os == ANDROID {
            dimensions.device = dimension(&response, "deviceWidth", "deviceHeight");
            dimensions.channel = dimension(&response, "channelWidth", "channelHeight");

            let height = response.f64("deadZoneHeight").unwrap_or(0.0);
            if height > 0.0 {
                let y = response.f64("deadZoneY").unwrap_or(0.0);
                dead_zone = Some(Rectangle::new(0.0, y, dimensions.channel.width, height));
            }
        }

        let capture_port = response.str("screenCapturePort").unwrap_or_default();
        info.screen_capture = format!("{}:{}", endpoint.host(), capture_port);

        let app_response = match &endpoint.application {
            Some(app) => client.execute(APP, &[START, app.as_str()]).await,
            None if os == ANDROID => client.execute(APP, &[START]).await,
            None => return Err(Error::channel_start("unable to connect : missing app")),
        };
        let app_response = app_response.ok_or_else(|| {
            Error::channel_start(format!(
                "unable to connect to : {}",
                endpoint.application.clone().unwrap_or_default()
            ))
        })?;
        if !app_response.is_success() {
            return Err(Error::channel_start(app_response.message()));
        }

        let icon = app_response.str("icon").unwrap_or_default();
        if !icon.is_empty() {
            info.icon = base64::engine::general_purpose::STANDARD
                .decode(icon.as_bytes())
                .unwrap_or_default();
        }

        if os == IOS {
            dimensions.device = dimension(&app_response, "deviceWidth", "deviceHeight");
            dimensions.channel = dimension(&app_response, "channelWidth", "channelHeight");
        }

        info.version = app_response.str("version").unwrap_or_default();
        info.application = endpoint.application.clone();

        info!(
            "Mobile session started on {} ({} {}), application {:?}",
            endpoint.endpoint, info.os, info.system_name, info.application
        );

        let engine = Self {
            client,
            info,
            dimensions,
            dead_zone,
            root: RwLock::new(Arc::new(MobileTree::empty())),
            source: RwLock::new(String::new()),
            cached: Mutex::new(TimedCache::new(config.cache_ttl())),
            drag_origin: Mutex::new(None),
        };

        engine
            .refresh_element_map_location()
            .await
            .map_err(|e| Error::channel_start(e.to_string()))?;

        Ok(engine)
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn dead_zone(&self) -> Option<Rectangle> {
        self.dead_zone
    }

    pub fn token(&self) -> Option<String> {
        self.client.token()
    }

    /// Live tree, replaced by every capture
    pub async fn root_tree(&self) -> Arc<MobileTree> {
        self.root.read().await.clone()
    }

    async fn capture(&self) -> Option<MobileTree> {
        let response = self.client.execute(CAPTURE, &[]).await?;
        match MobileTree::from_value(&response.into_value()) {
            Ok(tree) => Some(tree),
            Err(e) => {
                warn!("Invalid captured tree: {}", e);
                None
            }
        }
    }

    /// Read-side tree, refreshed when older than the cache ttl
    async fn cached_tree(&self) -> Option<Arc<MobileTree>> {
        let mut cache = self.cached.lock().await;
        cache.get_or_refresh(|| self.capture()).await
    }

    async fn cached_or_live(&self) -> Arc<MobileTree> {
        match self.cached.lock().await.snapshot() {
            Some(tree) => tree,
            None => self.root_tree().await,
        }
    }

    async fn tap_at(&self, x: f64, y: f64, count: u32) -> Result<()> {
        let (x, y, count) = (coordinate(x), coordinate(y), count.to_string());
        interactable(self.client.execute(TAP, &[x.as_str(), y.as_str(), count.as_str()]).await, TAP)?;
        Ok(())
    }

    /// Stop the driver session
    pub async fn tear_down(&self) {
        if self.client.execute(DRIVER, &[STOP]).await.is_some() {
            self.client.set_token(None);
        }
    }
}

#[async_trait]
impl DriverEngine for MobileDriverEngine {
    fn dimensions(&self) -> ChannelDimensions {
        self.dimensions
    }

    #[instrument(skip(self, query), fields(tag = query.tag))]
    async fn find_elements(&self, query: &ElementQuery<'_>) -> Result<Vec<FoundElement>> {
        let tag = if query.tag == ALERT_BOX { ALERT_TAG } else { query.tag };

        let (tree, start) = match query.parent {
            None => {
                self.refresh_element_map_location().await?;
                let tree = self.root_tree().await;
                let root = tree.root();
                (tree, root)
            }
            Some(parent) => {
                let tree = self.root_tree().await;
                match tree.find_by_id(&parent.id) {
                    Some(start) => (tree, start),
                    None => {
                        return Err(Error::stale_reference(format!(
                            "element '{}' is no longer in the tree",
                            parent.id
                        )))
                    }
                }
            }
        };

        let found: Vec<FoundElement> = tree
            .elements_by_tag(start, tag)
            .into_iter()
            .filter(|id| query.predicate.matches(tree.node(*id)))
            .map(|id| tree.to_found(id))
            .collect();

        debug!("{} element(s) found", found.len());
        Ok(found)
    }

    async fn find_elements_by_image(
        &self,
        parent: Option<&FoundElement>,
        template: &ImageTemplate,
    ) -> Result<Vec<FoundElement>> {
        let screen = self.client.screenshot().await?;
        let rects = image::find_occurrences(&screen, template, parent.map(|p| p.rect))?;
        Ok(image::to_found_elements(rects))
    }

    async fn element_from_point(&self, _sys_comp: bool, x: f64, y: f64) -> Result<Option<FoundElement>> {
        let Some(tree) = self.cached_tree().await else {
            return Ok(None);
        };
        let origin = self.dimensions.channel;
        let id = tree.element_from_point(origin.x + x, origin.y + y, self.dead_zone.as_ref());
        Ok(Some(tree.to_found(id)))
    }

    async fn element_from_rect(&self, _sys_comp: bool, rect: Rectangle) -> Result<Option<FoundElement>> {
        let Some(tree) = self.cached_tree().await else {
            return Ok(None);
        };
        let origin = self.dimensions.channel;
        let id = tree.element_from_rect(&rect.translate(origin.x, origin.y));
        Ok(Some(tree.to_found(id)))
    }

    async fn get_attribute(
        &self,
        element: &FoundElement,
        name: &str,
        _max_try: u32,
    ) -> Result<Option<String>> {
        let tree = self.root_tree().await;
        Ok(tree
            .find_by_id(&element.id)
            .and_then(|id| tree.node(id).attribute(name)))
    }

    async fn get_attributes(&self, element: &FoundElement, reload: bool) -> Result<Vec<CalculatedProperty>> {
        let tree = if reload {
            Some(self.root_tree().await)
        } else {
            self.cached.lock().await.snapshot()
        };

        Ok(tree
            .and_then(|tree| {
                tree.find_by_id(&element.id).map(|id| {
                    tree.node(id)
                        .attributes
                        .iter()
                        .map(|(k, v)| CalculatedProperty::new(k.as_str(), v.as_str()))
                        .collect()
                })
            })
            .unwrap_or_default())
    }

    async fn get_css_attributes(&self, _element: &FoundElement) -> Result<Vec<CalculatedProperty>> {
        Ok(Vec::new())
    }

    async fn load_parents(&self, element: &mut FoundElement) -> Result<()> {
        let tree = self.cached_or_live().await;
        if let Some(id) = tree.find_by_id(&element.id) {
            let ancestors = tree
                .ancestors(id)
                .into_iter()
                .map(|parent| tree.to_found(parent))
                .collect();
            element.set_ancestors(ancestors);
        }
        Ok(())
    }

    async fn load_select_options(&self, _element: &FoundElement) -> Result<Vec<Vec<String>>> {
        Ok(Vec::new())
    }

    async fn mouse_click(
        &self,
        element: &FoundElement,
        position: &MouseDirection,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<()> {
        self.cached.lock().await.invalidate();
        let (x, y) = position.point_in(&element.rect);
        self.tap_at(x + offset_x as f64, y + offset_y as f64, 1).await
    }

    async fn mouse_move_to_element(&self, _element: &FoundElement) -> Result<()> {
        Ok(())
    }

    async fn mouse_move_with_offset(
        &self,
        _element: &FoundElement,
        _position: &MouseDirection,
        _desktop_drag: bool,
        _offset_x: i32,
        _offset_y: i32,
    ) -> Result<()> {
        Ok(())
    }

    async fn drag(
        &self,
        element: &FoundElement,
        position: &MouseDirection,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<()> {
        let (x, y) = position.point_in(&element.rect);
        *self.drag_origin.lock().await = Some((x + offset_x as f64, y + offset_y as f64));
        Ok(())
    }

    async fn release(&self, _position: Option<&MouseDirection>, _desktop_drag: bool) -> Result<()> {
        self.drag_origin.lock().await.take();
        Ok(())
    }

    async fn move_by_offset(&self, horizontal: i32, vertical: i32) -> Result<()> {
        let (x, y) = (*self.drag_origin.lock().await)
            .ok_or_else(|| Error::internal("swipe without a drag origin"))?;
        let (x, y) = (coordinate(x), coordinate(y));
        let (dx, dy) = (horizontal.to_string(), vertical.to_string());
        interactable(self
            .client
            .execute(SWIPE, &[x.as_str(), y.as_str(), dx.as_str(), dy.as_str()]).await, SWIPE)?;
        self.cached.lock().await.invalidate();
        Ok(())
    }

    async fn tap(&self, count: u32, element: &FoundElement) -> Result<()> {
        self.cached.lock().await.invalidate();
        let (x, y) = element.rect.center();
        self.tap_at(x, y, count).await
    }

    async fn press(&self, duration_ms: u64, paths: &[String], element: &FoundElement) -> Result<()> {
        let (x, y) = element.rect.center();
        let (x, y, duration) = (coordinate(x), coordinate(y), duration_ms.to_string());
        let mut args = vec![x.as_str(), y.as_str(), duration.as_str()];
        args.extend(paths.iter().map(String::as_str));
        interactable(self.client.execute(PRESS, &args).await, PRESS)?;
        Ok(())
    }

    async fn scroll(&self, _element: Option<&FoundElement>, delta: i32) -> Result<()> {
        debug!("Scroll ignored on mobile (delta {})", delta);
        Ok(())
    }

    async fn select_options_item(
        &self,
        _element: &FoundElement,
        _property: &CalculatedProperty,
    ) -> Result<()> {
        Ok(())
    }

    async fn send_text_data(&self, element: &FoundElement, keys: &[SendKeyData]) -> Result<()> {
        for key in keys {
            let sequence = key.sequence_mobile();
            interactable(
                self.client.execute(ELEMENT, &[element.id.as_str(), INPUT, sequence.as_str()]).await,
                ELEMENT,
            )?;
        }
        Ok(())
    }

    async fn clear_text(&self, element: &FoundElement, position: &MouseDirection) -> Result<()> {
        self.mouse_click(element, position, 0, 0).await?;
        interactable(
            self.client
                .execute(ELEMENT, &[element.id.as_str(), INPUT, SendKeyData::EMPTY_DATA])
                .await,
            ELEMENT,
        )?;
        Ok(())
    }

    async fn execute_javascript(&self, script: &str, element: Option<&FoundElement>) -> Result<Value> {
        let response = match element {
            Some(element) => self.client.execute(SCRIPTING, &[script, element.id.as_str()]).await,
            None => self.client.execute(SCRIPTING, &[script]).await,
        };
        let response = response
            .ok_or_else(|| Error::script_execution_failed("no response to script request"))?;
        if response.is_success() {
            Ok(response.into_value())
        } else {
            Err(Error::script_execution_failed(response.message()))
        }
    }

    /// Rectangle of `element` in a freshly captured tree
    async fn get_bound_rect(&self, element: &FoundElement) -> Result<Option<Rectangle>> {
        self.refresh_element_map_location().await?;
        let tree = self.root_tree().await;
        Ok(tree.find_by_id(&element.id).map(|id| tree.node(id).rect))
    }

    async fn screenshot(&self, x: f64, y: f64, width: f64, height: f64) -> Vec<u8> {
        let cropped = match self.client.screenshot().await {
            Ok(screen) => image::crop_png(&screen, x, y, width, height),
            Err(e) => Err(e),
        };
        cropped.unwrap_or_else(|e| {
            debug!("Screenshot unavailable: {}", e);
            vec![0]
        })
    }

    async fn refresh_element_map_location(&self) -> Result<()> {
        let response = self
            .client
            .execute(CAPTURE, &[])
            .await
            .ok_or_else(|| Error::protocol("no response to 'capture' request"))?;

        let value = response.into_value();
        let tree = MobileTree::from_value(&value)?;

        *self.source.write().await = value.to_string();
        *self.root.write().await = Arc::new(tree);
        Ok(())
    }

    async fn get_source(&self) -> Result<String> {
        self.refresh_element_map_location().await?;
        Ok(self.source.read().await.clone())
    }

    #[instrument(skip(self))]
    async fn close(&self, keep_running: bool) -> Result<()> {
        if keep_running {
            return Ok(());
        }
        if let Some(application) = &self.info.application {
            if self.client.execute(APP, &[STOP, application.as_str()]).await.is_none() {
                warn!("Unable to stop application {}", application);
            }
        }
        self.tear_down().await;
        Ok(())
    }

    async fn set_sys_property(&self, name: &str, value: &str) -> Result<()> {
        checked(self.client.execute(SET_PROP, &[name, value]).await, SET_PROP)?;
        Ok(())
    }

    async fn get_sys_property(&self, name: &str) -> Result<Option<String>> {
        let response = checked(self.client.execute(GET_PROP, &[name]).await, GET_PROP)?;
        Ok(response.str("value"))
    }

    async fn system_button(&self, button: &str) -> Result<()> {
        checked(self.client.execute(SYS_BUTTON, &[button]).await, SYS_BUTTON)?;
        self.cached.lock().await.invalidate();
        Ok(())
    }

    async fn dialog_action(&self, action: &str) -> Result<()> {
        checked(self.client.execute(ALERT, &[action]).await, ALERT)?;
        self.cached.lock().await.invalidate();
        Ok(())
    }

    async fn switch_app(&self) -> Result<()> {
        let response = match &self.info.application {
            Some(application) => self.client.execute(APP, &[SWITCH, application.as_str()]).await,
            None => self.client.execute(APP, &[SWITCH]).await,
        };
        checked(response, APP)?;
        Ok(())
    }
}
