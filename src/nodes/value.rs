//! Typed payloads carried by node properties

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Values are shared between the property that owns them and any reader
/// holding on to them. Identity (same `Rc`) is what `set_data` compares.
pub type SharedValue = Rc<Value>;

/// Kind tag of a [`Value`], used for type whitelists on properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Real,
    Integer,
    String,
    Boolean,
    Color,
    Enum,
    Image,
}

impl ValueKind {
    /// Name used in attribute files for values of this kind
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Real => "real",
            ValueKind::Integer => "int",
            ValueKind::String => "string",
            ValueKind::Boolean => "boolean",
            ValueKind::Color => "color",
            ValueKind::Enum => "enum",
            ValueKind::Image => "image",
        }
    }

    pub fn from_name(name: &str) -> Option<ValueKind> {
        Some(match name {
            "real" => ValueKind::Real,
            "int" => ValueKind::Integer,
            "string" => ValueKind::String,
            "boolean" => ValueKind::Boolean,
            "color" => ValueKind::Color,
            "enum" => ValueKind::Enum,
            "image" => ValueKind::Image,
            _ => return None,
        })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Real | ValueKind::Integer | ValueKind::Boolean)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// RGBA color with channels in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`
    pub fn from_hex(text: &str) -> Option<Color> {
        let hex = text.trim().strip_prefix('#')?;
        let channel = |range: std::ops::Range<usize>, scale: f64| {
            u8::from_str_radix(hex.get(range)?, 16)
                .ok()
                .map(|v| v as f64 / scale)
        };
        match hex.len() {
            3 => Some(Color::rgba(
                channel(0..1, 15.0)?,
                channel(1..2, 15.0)?,
                channel(2..3, 15.0)?,
                1.0,
            )),
            6 => Some(Color::rgba(
                channel(0..2, 255.0)?,
                channel(2..4, 255.0)?,
                channel(4..6, 255.0)?,
                1.0,
            )),
            8 => Some(Color::rgba(
                channel(0..2, 255.0)?,
                channel(2..4, 255.0)?,
                channel(4..6, 255.0)?,
                channel(6..8, 255.0)?,
            )),
            _ => None,
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_array(c: [f64; 4]) -> Self {
        Color::rgba(c[0], c[1], c[2], c[3])
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// One named choice of an [`EnumDef`]
#[derive(Debug, Clone, PartialEq)]
pub struct EnumField {
    /// Stable id, written to files
    pub id: &'static str,
    /// Display text
    pub label: &'static str,
    /// Numeric value handed to node logic
    pub value: i32,
}

/// The set of choices an enum property may take
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub id: &'static str,
    pub fields: Vec<EnumField>,
}

impl EnumDef {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, id: &'static str, label: &'static str, value: i32) -> Self {
        self.fields.push(EnumField { id, label, value });
        self
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    /// Index of the first field carrying the numeric `value`
    pub fn index_of_value(&self, value: i32) -> Option<usize> {
        self.fields.iter().position(|f| f.value == value)
    }
}

/// A selected choice out of a shared definition
#[derive(Debug, Clone)]
pub struct EnumValue {
    pub def: Arc<EnumDef>,
    pub index: usize,
}

impl EnumValue {
    pub fn new(def: Arc<EnumDef>, index: usize) -> Self {
        Self { def, index }
    }

    pub fn field(&self) -> Option<&EnumField> {
        self.def.fields.get(self.index)
    }

    pub fn id(&self) -> Option<&'static str> {
        self.field().map(|f| f.id)
    }

    pub fn value(&self) -> Option<i32> {
        self.field().map(|f| f.value)
    }

    /// Same definition, different selection
    pub fn with_id(&self, id: &str) -> Option<EnumValue> {
        self.def.index_of(id).map(|index| EnumValue {
            def: self.def.clone(),
            index,
        })
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && (Arc::ptr_eq(&self.def, &other.def) || self.def == other.def)
    }
}

/// Per-channel storage depth of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    D8,
    D16,
    D24,
    D32,
    D32f,
    D64f,
}

impl ColorDepth {
    pub const ALL: [ColorDepth; 6] = [
        ColorDepth::D8,
        ColorDepth::D16,
        ColorDepth::D24,
        ColorDepth::D32,
        ColorDepth::D32f,
        ColorDepth::D64f,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ColorDepth::D8 => "d8",
            ColorDepth::D16 => "d16",
            ColorDepth::D24 => "d24",
            ColorDepth::D32 => "d32",
            ColorDepth::D32f => "d32f",
            ColorDepth::D64f => "d64f",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ColorDepth::D8 => "8",
            ColorDepth::D16 => "16",
            ColorDepth::D24 => "24",
            ColorDepth::D32 => "32",
            ColorDepth::D32f => "32f",
            ColorDepth::D64f => "64f",
        }
    }

    pub fn from_id(id: &str) -> Option<ColorDepth> {
        ColorDepth::ALL.into_iter().find(|d| d.id() == id)
    }
}

/// Description of an image to be created: dimensions, layout and fill
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageValue {
    pub width: i64,
    pub height: i64,
    pub channels: i64,
    pub depth: ColorDepth,
    pub color: Color,
}

impl Default for ImageValue {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            channels: 4,
            depth: ColorDepth::D8,
            color: Color::WHITE,
        }
    }
}

/// Payload of a node property
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Real(f64),
    Integer(i64),
    String(String),
    Boolean(bool),
    Color(Color),
    Enum(EnumValue),
    Image(ImageValue),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Real(_) => ValueKind::Real,
            Value::Integer(_) => ValueKind::Integer,
            Value::String(_) => ValueKind::String,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Color(_) => ValueKind::Color,
            Value::Enum(_) => ValueKind::Enum,
            Value::Image(_) => ValueKind::Image,
        }
    }

    /// Numeric view: reals, integers and booleans all read as reals
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            Value::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Integer view; reals truncate toward zero
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Real(v) if v.is_finite() => Some(v.trunc() as i64),
            Value::Boolean(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            Value::Integer(v) => Some(*v != 0),
            Value::Real(v) => Some(*v != 0.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Value::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageValue> {
        match self {
            Value::Image(i) => Some(i),
            _ => None,
        }
    }

    /// Wrap into a fresh shared handle
    pub fn shared(self) -> SharedValue {
        Rc::new(self)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Value::Color(v)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Value::Enum(v)
    }
}

impl From<ImageValue> for Value {
    fn from(v: ImageValue) -> Self {
        Value::Image(v)
    }
}
