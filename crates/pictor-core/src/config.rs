use serde::{Deserialize, Serialize};

/// Markup dialect targeted by the decode/encode compatibility pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SvgVersion {
    /// SVG 1.1: `version="1.1"`, `xmlns:xlink` and `xlink:href`.
    #[default]
    #[serde(rename = "1.1")]
    V1_1,
    /// SVG 2: plain `href`, no xlink namespace.
    #[serde(rename = "2")]
    V2,
}

impl SvgVersion {
    pub fn uses_xlink(self) -> bool {
        matches!(self, Self::V1_1)
    }
}

impl std::str::FromStr for SvgVersion {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.0" | "1.1" => Ok(Self::V1_1),
            "2" | "2.0" => Ok(Self::V2),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Pixels per inch used for absolute unit conversion.
    pub dpi: f64,
    pub default_font_size: f64,
    /// Extra slack (user units) added around outlines when hit-testing.
    pub pick_tolerance: f64,
    pub target_version: SvgVersion,
    /// Attribute-name prefix reserved for engine bookkeeping.
    pub internal_attr_prefix: String,
    /// Prefix of engine-generated definition ids (`<prefix>-<n>-<value>`).
    pub defref_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dpi: 96.0,
            default_font_size: 16.0,
            pick_tolerance: 2.0,
            target_version: SvgVersion::V1_1,
            internal_attr_prefix: pictor_dom::DEFAULT_INTERNAL_ATTR_PREFIX.to_string(),
            defref_prefix: "pictor".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parses a (possibly partial) JSON config; missing keys keep their defaults.
    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
