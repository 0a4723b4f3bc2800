use foundation::color::Rgb;
use serde::{Deserialize, Serialize};

/// Host-facing settings for one globe view. Every field has a default, so a
/// partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    /// Edge length of the square viewport, in CSS pixels.
    pub size: u32,
    /// Tint of the wireframe shell.
    pub color: String,
    /// Auto-rotation step in radians per animation frame.
    pub speed: f64,
    pub dot_size_multiplier: f64,
    pub graticule: bool,
    pub boundary_url: String,
    pub device_pixel_ratio: f64,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            size: 800,
            color: "#333333".to_string(),
            speed: 0.003,
            dot_size_multiplier: 1.0,
            graticule: false,
            boundary_url: "/continents.json".to_string(),
            device_pixel_ratio: 1.0,
        }
    }
}

impl GlobeConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Parsed shell colour; falls back to the default grey when unparsable.
    pub fn base_color(&self) -> Rgb {
        parse_color_or(&self.color, Rgb::from_hex(0x333333))
    }
}

pub(crate) fn parse_color_or(s: &str, fallback: Rgb) -> Rgb {
    s.parse().unwrap_or_else(|err| {
        tracing::warn!(color = %s, %err, %fallback, "invalid colour, using fallback");
        fallback
    })
}
