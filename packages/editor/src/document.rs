//! # Page Document Model
//!
//! A page is a layout header plus an ordered list of typed sections.
//!
//! ```text
//! Page
//!  ├─ id, layout            (boxed | full)
//!  └─ content
//!      ├─ meta              (layout, sectionSpacing, defaultGutterX, ...)
//!      └─ sections[]        ({ id, type, props })
//! ```
//!
//! Section props and page meta are opaque JSON bags. Fields this crate does
//! not know about (titles, slugs, server timestamps) are carried in `extra`
//! maps so a page survives a load/save cycle unchanged.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Page-level width mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Boxed,
    Full,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Boxed => "boxed",
            Layout::Full => "full",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "boxed" => Some(Layout::Boxed),
            "full" => Some(Layout::Full),
            _ => None,
        }
    }

    /// Read a layout out of an arbitrary JSON value (unknown values are ignored)
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(Self::parse)
    }

    pub fn to_value(self) -> Value {
        Value::String(self.as_str().to_string())
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend page identifier
///
/// Backends hand out either numeric or string ids; two ids are equal when
/// their string forms are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageId {
    Number(i64),
    Text(String),
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageId::Number(n) => write!(f, "{}", n),
            PageId::Text(s) => f.write_str(s),
        }
    }
}

impl PartialEq for PageId {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for PageId {}

impl Hash for PageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl From<&str> for PageId {
    fn from(s: &str) -> Self {
        PageId::Text(s.to_string())
    }
}

impl From<String> for PageId {
    fn from(s: String) -> Self {
        PageId::Text(s)
    }
}

impl From<i64> for PageId {
    fn from(n: i64) -> Self {
        PageId::Number(n)
    }
}

/// Editable page document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PageId>,

    /// Explicit page layout (wins over `content.meta.layout`)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_layout"
    )]
    pub layout: Option<Layout>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content: PageContent,

    /// Unrecognized page fields (title, slug, timestamps, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageContent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: PageMeta,

    #[serde(default, deserialize_with = "null_as_default")]
    pub sections: Vec<Section>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Page meta bag
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageMeta(pub Map<String, Value>);

impl PageMeta {
    pub const LAYOUT: &'static str = "layout";
    pub const SECTION_SPACING: &'static str = "sectionSpacing";
    pub const DEFAULT_GUTTER_X: &'static str = "defaultGutterX";

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn layout(&self) -> Option<Layout> {
        self.get(Self::LAYOUT).and_then(Layout::from_value)
    }

    pub fn section_spacing(&self) -> Option<f64> {
        self.get(Self::SECTION_SPACING).and_then(Value::as_f64)
    }

    pub fn default_gutter_x(&self) -> Option<f64> {
        self.get(Self::DEFAULT_GUTTER_X).and_then(Value::as_f64)
    }
}

/// A typed content block with an opaque property bag
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_section_id"
    )]
    pub id: Option<String>,

    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub section_type: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub props: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Section {
    pub fn new(section_type: impl Into<String>) -> Self {
        Self {
            section_type: section_type.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    /// An empty id counts as missing
    pub fn has_id(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// What the section renderer consumes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderInput {
    pub sections: Vec<Section>,
    pub layout: Layout,
    pub section_spacing: Option<f64>,
    pub default_gutter_x: Option<f64>,
}

impl Page {
    pub fn new(id: impl Into<PageId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.content.meta.0.insert(key.into(), value);
        self
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.content.sections.push(section);
        self
    }

    pub fn sections(&self) -> &[Section] {
        &self.content.sections
    }

    pub fn meta(&self) -> &PageMeta {
        &self.content.meta
    }

    /// Layout the page resolves to: explicit, then meta, then boxed
    pub fn effective_layout(&self) -> Layout {
        self.layout
            .or_else(|| self.content.meta.layout())
            .unwrap_or_default()
    }

    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        // Pages hold only JSON values, so this cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn render_input(&self) -> RenderInput {
        RenderInput {
            sections: self.content.sections.clone(),
            layout: self.effective_layout(),
            section_spacing: self.content.meta.section_spacing(),
            default_gutter_x: self.content.meta.default_gutter_x(),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_layout<'de, D>(deserializer: D) -> Result<Option<Layout>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Layout::from_value))
}

fn lenient_section_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
