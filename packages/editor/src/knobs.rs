//! # Knob State and Patch Builder
//!
//! Knobs are the ephemeral editing controls. They are never persisted as-is;
//! they are turned into patches (pushed into a page) or presets (saved for
//! reuse).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::document::{Layout, Page, PageMeta, Section};
use crate::errors::EditorError;
use crate::mutations::PatchFields;

/// Section type that receives hero-only fields
pub const HERO_TYPE: &str = "hero";

/// Spacing + default gutter bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Compact,
    #[default]
    Standard,
    Comfortable,
}

impl Density {
    pub fn spacing(&self) -> u32 {
        match self {
            Density::Compact => 4,
            Density::Standard => 6,
            Density::Comfortable => 8,
        }
    }

    pub fn default_gutter_x(&self) -> u32 {
        match self {
            Density::Compact => 12,
            Density::Standard => 16,
            Density::Comfortable => 24,
        }
    }
}

impl FromStr for Density {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compact" => Ok(Density::Compact),
            "standard" => Ok(Density::Standard),
            "comfortable" => Ok(Density::Comfortable),
            _ => Err(EditorError::InvalidKnob {
                knob: "density",
                value: s.to_string(),
            }),
        }
    }
}

/// Preview device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Mobile,
    Tablet,
    #[default]
    Desktop,
}

impl Device {
    /// Preview frame width in px
    pub fn width(&self) -> u32 {
        match self {
            Device::Mobile => 390,
            Device::Tablet => 768,
            Device::Desktop => 1200,
        }
    }
}

impl FromStr for Device {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mobile" => Ok(Device::Mobile),
            "tablet" => Ok(Device::Tablet),
            "desktop" => Ok(Device::Desktop),
            _ => Err(EditorError::InvalidKnob {
                knob: "device",
                value: s.to_string(),
            }),
        }
    }
}

/// Inner content max width of a hero; `Full` is stored as JSON `false`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentMaxWidth {
    Sm,
    Md,
    #[default]
    Lg,
    Xl,
    Full,
}

impl ContentMaxWidth {
    pub fn to_value(self) -> Value {
        match self {
            ContentMaxWidth::Sm => json!("sm"),
            ContentMaxWidth::Md => json!("md"),
            ContentMaxWidth::Lg => json!("lg"),
            ContentMaxWidth::Xl => json!("xl"),
            ContentMaxWidth::Full => json!(false),
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(false) => Some(ContentMaxWidth::Full),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl FromStr for ContentMaxWidth {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sm" => Ok(ContentMaxWidth::Sm),
            "md" => Ok(ContentMaxWidth::Md),
            "lg" => Ok(ContentMaxWidth::Lg),
            "xl" => Ok(ContentMaxWidth::Xl),
            "full" | "false" => Ok(ContentMaxWidth::Full),
            _ => Err(EditorError::InvalidKnob {
                knob: "contentMaxWidth",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ContentMaxWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentMaxWidth::Full => f.write_str("full"),
            other => write!(f, "{}", other.to_value().as_str().unwrap_or_default()),
        }
    }
}

impl Serialize for ContentMaxWidth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContentMaxWidth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid contentMaxWidth: {}", value))
        })
    }
}

/// Persistable bundle of knob values
///
/// Every field is optional so a partial preset written by another client
/// round-trips without gaining fields it never had.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<Density>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_spacing: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gutter_x: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bleed_left: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bleed_right: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_top: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_max_width: Option<ContentMaxWidth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width_map_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
}

impl Preset {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_value(value: Value) -> Result<Self, EditorError> {
        serde_json::from_value(value).map_err(EditorError::InvalidPreset)
    }
}

/// Current editing controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnobState {
    pub layout: Layout,
    pub density: Density,
    pub section_spacing: u32,
    /// Inner horizontal padding in px; 0 falls back to the density default
    pub gutter_x: u32,
    pub bleed_left: bool,
    pub bleed_right: bool,
    /// Hero height in vh; 0 means auto
    pub hero_height: u32,
    pub safe_top: bool,
    pub content_max_width: ContentMaxWidth,
    pub max_width_map_enabled: bool,
    pub device: Device,
}

impl Default for KnobState {
    fn default() -> Self {
        Self {
            layout: Layout::Boxed,
            density: Density::Standard,
            section_spacing: 6,
            gutter_x: 16,
            bleed_left: false,
            bleed_right: false,
            hero_height: 80,
            safe_top: true,
            content_max_width: ContentMaxWidth::Lg,
            max_width_map_enabled: true,
            device: Device::Desktop,
        }
    }
}

impl KnobState {
    /// Switch density; section spacing follows the density
    pub fn set_density(&mut self, density: Density) {
        self.density = density;
        self.section_spacing = density.spacing();
    }

    pub fn effective_gutter_x(&self) -> u32 {
        if self.gutter_x == 0 {
            self.density.default_gutter_x()
        } else {
            self.gutter_x
        }
    }

    pub fn to_preset(&self) -> Preset {
        Preset {
            layout: Some(self.layout),
            density: Some(self.density),
            section_spacing: Some(self.section_spacing),
            gutter_x: Some(self.gutter_x),
            bleed_left: Some(self.bleed_left),
            bleed_right: Some(self.bleed_right),
            hero_height: Some(self.hero_height),
            safe_top: Some(self.safe_top),
            content_max_width: Some(self.content_max_width),
            max_width_map_enabled: Some(self.max_width_map_enabled),
            device: Some(self.device),
        }
    }

    /// Knobs from a stored preset; absent flags read as off
    pub fn from_preset(preset: &Preset) -> Self {
        let defaults = Self::default();
        Self {
            layout: preset.layout.unwrap_or(defaults.layout),
            density: preset.density.unwrap_or(defaults.density),
            section_spacing: preset.section_spacing.unwrap_or(defaults.section_spacing),
            gutter_x: preset.gutter_x.unwrap_or(defaults.gutter_x),
            bleed_left: preset.bleed_left.unwrap_or(false),
            bleed_right: preset.bleed_right.unwrap_or(false),
            hero_height: preset.hero_height.unwrap_or(defaults.hero_height),
            safe_top: preset.safe_top.unwrap_or(false),
            content_max_width: preset.content_max_width.unwrap_or(defaults.content_max_width),
            max_width_map_enabled: preset.max_width_map_enabled.unwrap_or(false),
            device: preset.device.unwrap_or(defaults.device),
        }
    }

    pub fn apply_layout_preset(&mut self, preset: &LayoutPreset) {
        self.layout = preset.layout;
        self.section_spacing = preset.section_spacing;
        self.gutter_x = preset.default_gutter_x;
    }
}

/// Named starting point for page-level knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPreset {
    pub name: &'static str,
    pub layout: Layout,
    pub section_spacing: u32,
    pub default_gutter_x: u32,
}

pub const BUILTIN_PRESETS: [LayoutPreset; 4] = [
    LayoutPreset {
        name: "Default",
        layout: Layout::Boxed,
        section_spacing: 6,
        default_gutter_x: 16,
    },
    LayoutPreset {
        name: "Compact",
        layout: Layout::Boxed,
        section_spacing: 4,
        default_gutter_x: 12,
    },
    LayoutPreset {
        name: "Comfortable",
        layout: Layout::Boxed,
        section_spacing: 8,
        default_gutter_x: 24,
    },
    LayoutPreset {
        name: "Full-bleed Showcase",
        layout: Layout::Full,
        section_spacing: 6,
        default_gutter_x: 24,
    },
];

pub fn builtin_preset(name: &str) -> Option<&'static LayoutPreset> {
    BUILTIN_PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Section props patch for one section type
pub fn build_props_patch(section_type: &str, knobs: &KnobState) -> PatchFields {
    let mut fields = PatchFields::new();
    fields.insert("gutterX".into(), Some(json!(knobs.effective_gutter_x())));
    fields.insert("bleedLeft".into(), Some(json!(knobs.bleed_left)));
    fields.insert("bleedRight".into(), Some(json!(knobs.bleed_right)));

    if section_type == HERO_TYPE {
        fields.insert("heroHeight".into(), Some(json!(knobs.hero_height)));
        fields.insert("safeTop".into(), Some(json!(knobs.safe_top)));
        fields.insert("contentMaxWidth".into(), Some(knobs.content_max_width.to_value()));
    }

    fields
}

/// Page meta patch from the page-level knobs
pub fn build_meta_patch(knobs: &KnobState) -> PatchFields {
    let mut fields = PatchFields::new();
    fields.insert(PageMeta::LAYOUT.into(), Some(knobs.layout.to_value()));
    fields.insert(PageMeta::SECTION_SPACING.into(), Some(json!(knobs.section_spacing)));
    fields.insert(
        PageMeta::DEFAULT_GUTTER_X.into(),
        Some(json!(knobs.density.default_gutter_x())),
    );
    fields
}

/// Preview page shown when no live page is loaded
pub fn demo_page(knobs: &KnobState) -> Page {
    let gutter = json!(knobs.effective_gutter_x());
    let boxed_width = |width: &str| match knobs.layout {
        Layout::Full => json!(false),
        Layout::Boxed => json!(width),
    };

    let hero = Section::new(HERO_TYPE)
        .with_prop("eyebrow", json!("Enterprise Ready"))
        .with_prop("heading", json!("Dial in your layout"))
        .with_prop(
            "subheading",
            json!("Gutters, spacing, selective bleed, responsive max widths, and hero safe-area."),
        )
        .with_prop("ctaText", json!("Primary action"))
        .with_prop("secondaryCtaText", json!("Secondary"))
        .with_prop("overlay", json!(0.35))
        .with_prop("align", json!("left"))
        .with_prop("heroHeight", json!(knobs.hero_height))
        .with_prop("safeTop", json!(knobs.safe_top))
        .with_prop("contentMaxWidth", knobs.content_max_width.to_value())
        .with_prop("maxWidth", boxed_width("lg"))
        .with_prop("gutterX", gutter.clone())
        .with_prop("bleedLeft", json!(knobs.bleed_left))
        .with_prop("bleedRight", json!(knobs.bleed_right));

    let mut gallery = Section::new("galleryCarousel")
        .with_prop("title", json!("Image carousel (responsive width demo)"))
        .with_prop("images", json!([]))
        .with_prop("autoplay", json!(true))
        .with_prop("gutterX", gutter.clone())
        .with_prop("bleedLeft", json!(knobs.bleed_left))
        .with_prop("bleedRight", json!(knobs.bleed_right));
    gallery = if knobs.max_width_map_enabled {
        gallery.with_prop("maxWidthMap", json!({ "xs": "md", "md": "lg", "xl": false }))
    } else {
        gallery.with_prop("maxWidth", boxed_width("lg"))
    };

    let rich_text = Section::new("richText")
        .with_prop("title", json!("What these knobs do"))
        .with_prop("gutterX", gutter)
        .with_prop("maxWidth", boxed_width("md"));

    Page::default()
        .with_layout(knobs.layout)
        .with_meta(PageMeta::LAYOUT, knobs.layout.to_value())
        .with_meta(PageMeta::SECTION_SPACING, json!(knobs.section_spacing))
        .with_meta(
            PageMeta::DEFAULT_GUTTER_X,
            json!(knobs.density.default_gutter_x()),
        )
        .with_section(hero)
        .with_section(gallery)
        .with_section(rich_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_props_patch_for_non_hero() {
        let knobs = KnobState::default();
        let patch = build_props_patch("richText", &knobs);

        let keys: Vec<_> = patch.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["bleedLeft", "bleedRight", "gutterX"]);
    }

    #[test]
    fn test_props_patch_for_hero() {
        let knobs = KnobState {
            content_max_width: ContentMaxWidth::Full,
            ..KnobState::default()
        };
        let patch = build_props_patch("hero", &knobs);

        assert_eq!(patch.len(), 6);
        assert_eq!(patch["heroHeight"], Some(json!(80)));
        assert_eq!(patch["safeTop"], Some(json!(true)));
        assert_eq!(patch["contentMaxWidth"], Some(json!(false)));
    }

    #[test]
    fn test_zero_gutter_falls_back_to_density() {
        let mut knobs = KnobState {
            gutter_x: 0,
            ..KnobState::default()
        };
        knobs.set_density(Density::Comfortable);

        assert_eq!(knobs.section_spacing, 8);
        assert_eq!(build_props_patch("text", &knobs)["gutterX"], Some(json!(24)));
    }

    #[test]
    fn test_meta_patch() {
        let mut knobs = KnobState::default();
        knobs.layout = Layout::Full;
        knobs.set_density(Density::Compact);

        let patch = build_meta_patch(&knobs);
        assert_eq!(patch["layout"], Some(json!("full")));
        assert_eq!(patch["sectionSpacing"], Some(json!(4)));
        assert_eq!(patch["defaultGutterX"], Some(json!(12)));
    }

    #[test]
    fn test_preset_roundtrip_through_knobs() {
        let knobs = KnobState {
            layout: Layout::Full,
            device: Device::Tablet,
            hero_height: 0,
            ..KnobState::default()
        };

        let preset = knobs.to_preset();
        let json = preset.to_value();
        assert_eq!(json["layout"], json!("full"));
        assert_eq!(json["contentMaxWidth"], json!("lg"));

        let back = Preset::from_value(json).unwrap();
        assert_eq!(KnobState::from_preset(&back), knobs);
    }

    #[test]
    fn test_partial_preset_defaults() {
        let preset = Preset::from_value(json!({ "layout": "full" })).unwrap();
        let knobs = KnobState::from_preset(&preset);

        assert_eq!(knobs.layout, Layout::Full);
        assert_eq!(knobs.gutter_x, 16);
        assert!(!knobs.safe_top);
        assert!(!knobs.max_width_map_enabled);
        assert_eq!(preset.to_value(), json!({ "layout": "full" }));
    }

    #[test]
    fn test_content_max_width_false_is_full() {
        let preset = Preset::from_value(json!({ "contentMaxWidth": false })).unwrap();
        assert_eq!(preset.content_max_width, Some(ContentMaxWidth::Full));
        assert!(Preset::from_value(json!({ "contentMaxWidth": 3 })).is_err());
    }

    #[test]
    fn test_builtin_presets() {
        let preset = builtin_preset("full-bleed showcase").unwrap();
        let mut knobs = KnobState::default();
        knobs.apply_layout_preset(preset);

        assert_eq!(knobs.layout, Layout::Full);
        assert_eq!(knobs.gutter_x, 24);
        assert!(builtin_preset("nope").is_none());
    }

    #[test]
    fn test_demo_page_follows_knobs() {
        let mut knobs = KnobState::default();
        knobs.max_width_map_enabled = false;
        knobs.layout = Layout::Full;

        let page = demo_page(&knobs);
        assert_eq!(page.sections().len(), 3);
        assert_eq!(page.effective_layout(), Layout::Full);
        assert_eq!(page.sections()[1].props.get("maxWidth"), Some(&json!(false)));
        assert!(page.sections()[1].props.get("maxWidthMap").is_none());
    }

    #[test]
    fn test_device_widths() {
        assert_eq!("mobile".parse::<Device>().unwrap().width(), 390);
        assert_eq!(Device::default().width(), 1200);
        assert!("watch".parse::<Device>().is_err());
    }
}
