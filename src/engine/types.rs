//! Engine types
//!
//! Geometry, pointer positions and key sequences shared by every backend.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Half-open point containment
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        !self.is_empty() && x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Full containment of `other` inside a non-empty `self`
    pub fn contains_rect(&self, other: &Rectangle) -> bool {
        !self.is_empty()
            && other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersects(&self, other: &Rectangle) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rectangle {
        Rectangle::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Anchor of a pointer position along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cartesian {
    Left,
    Right,
    Top,
    Bottom,
    Middle,
}

/// Anchor plus pixel offset along one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MousePosition {
    pub cartesian: Cartesian,
    pub value: i32,
}

impl MousePosition {
    pub fn new(cartesian: Cartesian, value: i32) -> Self {
        Self { cartesian, value }
    }
}

/// Pointer position relative to an element, defaults to the center
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouseDirection {
    pub horizontal: Option<MousePosition>,
    pub vertical: Option<MousePosition>,
}

impl MouseDirection {
    pub fn new(horizontal: Option<MousePosition>, vertical: Option<MousePosition>) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Horizontal offset used as a swipe distance
    pub fn horizontal_direction(&self) -> i32 {
        self.horizontal.map(|p| p.value).unwrap_or(0)
    }

    /// Vertical offset used as a swipe distance
    pub fn vertical_direction(&self) -> i32 {
        self.vertical.map(|p| p.value).unwrap_or(0)
    }

    /// Absolute point inside `rect`
    pub fn point_in(&self, rect: &Rectangle) -> (f64, f64) {
        let x = match self.horizontal {
            Some(MousePosition {
                cartesian: Cartesian::Left,
                value,
            }) => rect.x + value as f64,
            Some(MousePosition {
                cartesian: Cartesian::Right,
                value,
            }) => rect.right() - value as f64,
            Some(MousePosition { value, .. }) => rect.x + rect.width / 2.0 + value as f64,
            None => rect.x + rect.width / 2.0,
        };

        let y = match self.vertical {
            Some(MousePosition {
                cartesian: Cartesian::Top,
                value,
            }) => rect.y + value as f64,
            Some(MousePosition {
                cartesian: Cartesian::Bottom,
                value,
            }) => rect.bottom() - value as f64,
            Some(MousePosition { value, .. }) => rect.y + rect.height / 2.0 + value as f64,
            None => rect.y + rect.height / 2.0,
        };

        (x, y)
    }
}

/// Modifier held while a key sequence is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKey {
    Shift,
    Alt,
    Control,
}

const SPECIAL_KEYS: &[&str] = &[
    "ENTER", "RETURN", "TAB", "ESCAPE", "BACK_SPACE", "DELETE", "SPACE", "UP", "DOWN", "LEFT",
    "RIGHT", "HOME", "END", "PAGE_UP", "PAGE_DOWN", "INSERT", "F1", "F2", "F3", "F4", "F5", "F6",
    "F7", "F8", "F9", "F10", "F11", "F12",
];

/// One unit of a text entry: plain text or a special key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendKeyData {
    data: String,
    special_key: Option<String>,
    down_key: Option<ModifierKey>,
    enter_key: bool,
}

impl SendKeyData {
    /// Sent when a sequence is empty
    pub const EMPTY_DATA: &'static str = "&empty;";

    const KEY_PREFIX: &'static str = "$KEY-";

    /// Plain text
    pub fn text<S: Into<String>>(data: S) -> Self {
        Self {
            data: data.into(),
            special_key: None,
            down_key: None,
            enter_key: false,
        }
    }

    /// `$key(NAME)` or `$key(NAME,spare)`
    pub fn key(key: &str, spare: Option<&str>) -> Self {
        let key = key.trim().to_uppercase();
        match spare.filter(|s| !s.is_empty()) {
            Some(spare) => {
                let down_key = match key.as_str() {
                    "SHIFT" => Some(ModifierKey::Shift),
                    "ALT" => Some(ModifierKey::Alt),
                    "CONTROL" => Some(ModifierKey::Control),
                    _ => None,
                };
                Self {
                    data: spare.to_lowercase(),
                    special_key: None,
                    down_key,
                    enter_key: down_key == Some(ModifierKey::Control),
                }
            }
            None => Self {
                data: String::new(),
                special_key: SPECIAL_KEYS
                    .contains(&key.as_str())
                    .then(|| format!("{}{}", Self::KEY_PREFIX, key)),
                down_key: None,
                enter_key: false,
            },
        }
    }

    /// Split a text into plain segments and `$key(...)` tokens
    pub fn parse(text: &str) -> Vec<SendKeyData> {
        let mut result = Vec::new();
        let mut rest = text;

        while let Some(start) = rest.find("$key(") {
            let Some(len) = rest[start..].find(')') else {
                break;
            };
            if start > 0 {
                result.push(SendKeyData::text(&rest[..start]));
            }
            let inner = &rest[start + 5..start + len];
            let mut parts = inner.splitn(2, ',');
            let key = parts.next().unwrap_or_default();
            result.push(SendKeyData::key(key, parts.next()));
            rest = &rest[start + len + 1..];
        }

        if !rest.is_empty() || result.is_empty() {
            result.push(SendKeyData::text(rest));
        }
        result
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn down_key(&self) -> Option<ModifierKey> {
        self.down_key
    }

    pub fn is_enter_key(&self) -> bool {
        self.enter_key
    }

    pub fn is_special(&self) -> bool {
        self.special_key.is_some()
    }

    /// Sequence sent to mobile drivers
    pub fn sequence_mobile(&self) -> String {
        if let Some(key) = &self.special_key {
            key.clone()
        } else if !self.data.is_empty() {
            self.data.clone()
        } else {
            Self::EMPTY_DATA.to_string()
        }
    }

    /// Base64 sequence sent to desktop drivers
    pub fn sequence_desktop(&self) -> String {
        let raw = self.special_key.as_deref().unwrap_or(&self.data);
        base64::engine::general_purpose::STANDARD.encode(raw.as_bytes())
    }
}

/// Image searched on the screen
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTemplate {
    /// Encoded image (PNG or JPEG)
    pub data: Vec<u8>,
    /// Accepted mean absolute difference, 0.0 (exact) to 1.0
    pub tolerance: f64,
}

impl ImageTemplate {
    pub fn new(data: Vec<u8>, tolerance: f64) -> Self {
        Self {
            data,
            tolerance: tolerance.clamp(0.0, 1.0),
        }
    }
}

/// Device and channel geometry of a running application
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelDimensions {
    /// Whole device screen
    pub device: Rectangle,
    /// Area of the application inside the device screen
    pub channel: Rectangle,
}
