//! Attribute values carried by records.

use std::fmt;

use arrow_schema::DataType;
use geo_types::Geometry;

use crate::schema::FieldType;

/// A KML-style feature style as exposed by readers.
///
/// Colours are kept in the reader's notation (KML uses `aabbggrr` hex).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    /// Style identifier (`<Style id="...">`).
    pub id: Option<String>,
    /// Line colour.
    pub line_color: Option<String>,
    /// Line width in pixels.
    pub line_width: Option<f64>,
    /// Polygon fill colour.
    pub poly_color: Option<String>,
    /// Whether polygons are filled.
    pub fill: Option<bool>,
    /// Icon image reference for point placemarks.
    pub icon_href: Option<String>,
    /// Label scale factor.
    pub label_scale: Option<f64>,
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(id) = &self.id {
            parts.push(format!("id={id}"));
        }
        if let Some(color) = &self.line_color {
            parts.push(format!("lineColor={color}"));
        }
        if let Some(width) = self.line_width {
            parts.push(format!("lineWidth={width}"));
        }
        if let Some(color) = &self.poly_color {
            parts.push(format!("polyColor={color}"));
        }
        if let Some(fill) = self.fill {
            parts.push(format!("fill={fill}"));
        }
        if let Some(href) = &self.icon_href {
            parts.push(format!("icon={href}"));
        }
        if let Some(scale) = self.label_scale {
            parts.push(format!("labelScale={scale}"));
        }

        write!(f, "Style[{}]", parts.join(", "))
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Unset or null.
    Null,
    /// Boolean.
    Boolean(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Double(f64),
    /// Text.
    Text(String),
    /// Geometry in the schema's coordinate reference system.
    Geometry(Geometry<f64>),
    /// Unrendered style object.
    Style(Style),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrows the text of a [`Value::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts this value so it fits a field of type `target`.
    ///
    /// Any value renders to text for a `Utf8` field, except geometries. Numbers,
    /// booleans and parseable text convert between numeric and boolean types.
    /// Values that cannot be represented become [`Value::Null`]. Attribute types
    /// without a conversion rule keep the value unchanged.
    #[must_use]
    pub fn convert_to(&self, target: &FieldType) -> Value {
        if self.is_null() {
            return Value::Null;
        }

        match target {
            FieldType::Geometry(_) => match self {
                Value::Geometry(_) => self.clone(),
                _ => Value::Null,
            },
            FieldType::Style => match self {
                Value::Style(_) => self.clone(),
                _ => Value::Null,
            },
            FieldType::Attribute(data_type) => self.convert_to_attribute(data_type),
        }
    }

    fn convert_to_attribute(&self, data_type: &DataType) -> Value {
        match data_type {
            DataType::Utf8 | DataType::LargeUtf8 => match self {
                Value::Text(_) => self.clone(),
                Value::Boolean(b) => Value::Text(b.to_string()),
                Value::Integer(i) => Value::Text(i.to_string()),
                Value::Double(d) => Value::Text(d.to_string()),
                Value::Style(style) => Value::Text(style.to_string()),
                Value::Geometry(_) | Value::Null => Value::Null,
            },
            DataType::Boolean => match self {
                Value::Boolean(_) => self.clone(),
                Value::Integer(i) => Value::Boolean(*i != 0),
                Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Value::Boolean(true),
                    "false" | "0" => Value::Boolean(false),
                    _ => Value::Null,
                },
                _ => Value::Null,
            },
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => match self {
                Value::Integer(_) => self.clone(),
                Value::Boolean(b) => Value::Integer(i64::from(*b)),
                #[allow(clippy::cast_possible_truncation)]
                Value::Double(d) if d.is_finite() && d.fract() == 0.0 => Value::Integer(*d as i64),
                Value::Text(s) => s.trim().parse().map_or(Value::Null, Value::Integer),
                _ => Value::Null,
            },
            DataType::Float16 | DataType::Float32 | DataType::Float64 => match self {
                Value::Double(_) => self.clone(),
                #[allow(clippy::cast_precision_loss)]
                Value::Integer(i) => Value::Double(*i as f64),
                Value::Text(s) => s.trim().parse().map_or(Value::Null, Value::Double),
                _ => Value::Null,
            },
            _ => self.clone(),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<Geometry<f64>> for Value {
    fn from(value: Geometry<f64>) -> Self {
        Value::Geometry(value)
    }
}

impl From<Style> for Value {
    fn from(value: Style) -> Self {
        Value::Style(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::GeometryKind;
    use geo_types::point;

    #[test]
    fn test_style_display() {
        let style = Style {
            id: Some("trail".to_string()),
            line_color: Some("ff0000ff".to_string()),
            line_width: Some(2.5),
            ..Style::default()
        };
        assert_eq!(
            style.to_string(),
            "Style[id=trail, lineColor=ff0000ff, lineWidth=2.5]"
        );
        assert_eq!(Style::default().to_string(), "Style[]");
    }

    #[test]
    fn test_convert_to_text() {
        let text = FieldType::text();
        assert_eq!(Value::Integer(42).convert_to(&text), Value::from("42"));
        assert_eq!(Value::Boolean(true).convert_to(&text), Value::from("true"));
        assert_eq!(
            Value::Style(Style::default()).convert_to(&text),
            Value::from("Style[]")
        );
        let geometry = Value::Geometry(point!(x: 1.0, y: 2.0).into());
        assert_eq!(geometry.convert_to(&text), Value::Null);
    }

    #[test]
    fn test_convert_to_numbers() {
        let int = FieldType::Attribute(DataType::Int32);
        let float = FieldType::Attribute(DataType::Float64);
        assert_eq!(Value::from("120").convert_to(&int), Value::Integer(120));
        assert_eq!(Value::from("abc").convert_to(&int), Value::Null);
        assert_eq!(Value::Double(3.0).convert_to(&int), Value::Integer(3));
        assert_eq!(Value::Double(3.5).convert_to(&int), Value::Null);
        assert_eq!(Value::Integer(3).convert_to(&float), Value::Double(3.0));
        assert_eq!(Value::from(" 1.5 ").convert_to(&float), Value::Double(1.5));
    }

    #[test]
    fn test_convert_to_boolean() {
        let boolean = FieldType::Attribute(DataType::Boolean);
        assert_eq!(Value::from("TRUE").convert_to(&boolean), Value::Boolean(true));
        assert_eq!(Value::Integer(0).convert_to(&boolean), Value::Boolean(false));
        assert_eq!(Value::from("maybe").convert_to(&boolean), Value::Null);
    }

    #[test]
    fn test_convert_to_geometry_and_style() {
        let geometry = Value::Geometry(point!(x: 1.0, y: 2.0).into());
        let geom_type = FieldType::Geometry(GeometryKind::Any);
        assert_eq!(geometry.convert_to(&geom_type), geometry);
        assert_eq!(Value::from("POINT (1 2)").convert_to(&geom_type), Value::Null);
        assert_eq!(Value::from("x").convert_to(&FieldType::Style), Value::Null);
    }
}
