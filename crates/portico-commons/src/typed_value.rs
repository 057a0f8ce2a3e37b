//! Representation-tagged values crossing the wire.
//!
//! Every value carries an explicit representation tag so integer widths
//! stay distinguishable and NULL is distinct from any type's zero. The
//! same derives serve both wire forms: the textual serializer emits the
//! tag as the object key (`{"LONG": 42}`), the binary serializer emits the
//! variant index.
//!
//! Cross-language numeric and temporal semantics are handled explicitly:
//! decimals travel as (unscaled integer as decimal string, scale), never
//! as binary floats; DATE is days since 1970-01-01, TIME milliseconds past
//! midnight, TIMESTAMP milliseconds since epoch, all UTC.

use serde::{Deserialize, Serialize};

use crate::errors::{MetaError, Result};

/// Representation tag for a [`TypedValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rep {
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Decimal,
    String,
    Bytes,
    Date,
    Time,
    Timestamp,
    Array,
    Null,
}

impl Rep {
    /// Nominal SQL type code advertised in column metadata.
    pub fn sql_type_id(self) -> i32 {
        match self {
            Rep::Boolean => 16,
            Rep::Byte => -6,
            Rep::Short => 5,
            Rep::Integer => 4,
            Rep::Long => -5,
            Rep::Float => 7,
            Rep::Double => 8,
            Rep::Decimal => 3,
            Rep::String => 12,
            Rep::Bytes => -3,
            Rep::Date => 91,
            Rep::Time => 92,
            Rep::Timestamp => 93,
            Rep::Array => 2003,
            Rep::Null => 0,
        }
    }

    /// Nominal SQL type name matching [`Rep::sql_type_id`].
    pub fn sql_type_name(self) -> &'static str {
        match self {
            Rep::Boolean => "BOOLEAN",
            Rep::Byte => "TINYINT",
            Rep::Short => "SMALLINT",
            Rep::Integer => "INTEGER",
            Rep::Long => "BIGINT",
            Rep::Float => "REAL",
            Rep::Double => "DOUBLE",
            Rep::Decimal => "DECIMAL",
            Rep::String => "VARCHAR",
            Rep::Bytes => "VARBINARY",
            Rep::Date => "DATE",
            Rep::Time => "TIME",
            Rep::Timestamp => "TIMESTAMP",
            Rep::Array => "ARRAY",
            Rep::Null => "NULL",
        }
    }
}

/// Arbitrary-precision decimal: unscaled integer as a decimal string plus
/// a non-negative scale. The string form keeps exactness across languages
/// whose native floats would round.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecimalValue {
    /// Unscaled integer digits, optionally sign-prefixed.
    #[serde(rename = "unscaledValue")]
    pub unscaled: String,
    pub scale: i32,
}

impl DecimalValue {
    /// Builds a decimal after validating the unscaled digit string and the
    /// scale. NaN, infinities, and fractional strings are unrepresentable
    /// here and rejected by the digit check.
    pub fn new(unscaled: impl Into<String>, scale: i32) -> Result<Self> {
        let value = Self {
            unscaled: unscaled.into(),
            scale,
        };
        value.validate()?;
        Ok(value)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.scale < 0 {
            return Err(MetaError::invalid_input(format!(
                "decimal scale must not be negative, got {}",
                self.scale
            )));
        }
        let digits = self.unscaled.strip_prefix('-').unwrap_or(&self.unscaled);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MetaError::invalid_input(format!(
                "decimal unscaled value must be an integer digit string, got {:?}",
                self.unscaled
            )));
        }
        Ok(())
    }

    /// Canonical plain string, preserving the trailing zeros the scale
    /// demands: unscaled `1234567890` at scale 5 renders `12345.67890`.
    pub fn to_plain_string(&self) -> String {
        let negative = self.unscaled.starts_with('-');
        let digits = self.unscaled.strip_prefix('-').unwrap_or(&self.unscaled);
        let scale = self.scale as usize;
        let sign = if negative { "-" } else { "" };

        if scale == 0 {
            return format!("{}{}", sign, digits);
        }
        if digits.len() <= scale {
            let padded = format!("{:0>width$}", digits, width = scale);
            return format!("{}0.{}", sign, padded);
        }
        let split = digits.len() - scale;
        format!("{}{}.{}", sign, &digits[..split], &digits[split..])
    }

    /// Numeric equality across scales: `1.50` equals `1.5`.
    pub fn numerically_equal(&self, other: &DecimalValue) -> bool {
        normalize_plain(&self.to_plain_string()) == normalize_plain(&other.to_plain_string())
    }
}

fn normalize_plain(plain: &str) -> String {
    if !plain.contains('.') {
        return plain.to_string();
    }
    let trimmed = plain.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Ordered element values plus the declared component tag. Elements may be
/// NULL; nested arrays carry [`Rep::Array`] as their component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub component: Rep,
    pub elements: Vec<TypedValue>,
}

impl ArrayValue {
    pub fn new(component: Rep, elements: Vec<TypedValue>) -> Result<Self> {
        let value = Self {
            component,
            elements,
        };
        value.validate()?;
        Ok(value)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for element in &self.elements {
            if element.rep() != Rep::Null && element.rep() != self.component {
                return Err(MetaError::invalid_input(format!(
                    "array element tag {:?} conflicts with component type {:?}",
                    element.rep(),
                    self.component
                )));
            }
            element.validate()?;
        }
        Ok(())
    }
}

/// A single representation-tagged value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypedValue {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(DecimalValue),
    String(String),
    Bytes(Vec<u8>),
    /// Days since 1970-01-01.
    Date(i32),
    /// Milliseconds past midnight.
    Time(i32),
    /// Milliseconds since epoch, UTC.
    Timestamp(i64),
    Array(ArrayValue),
}

impl TypedValue {
    pub fn rep(&self) -> Rep {
        match self {
            TypedValue::Null => Rep::Null,
            TypedValue::Boolean(_) => Rep::Boolean,
            TypedValue::Byte(_) => Rep::Byte,
            TypedValue::Short(_) => Rep::Short,
            TypedValue::Integer(_) => Rep::Integer,
            TypedValue::Long(_) => Rep::Long,
            TypedValue::Float(_) => Rep::Float,
            TypedValue::Double(_) => Rep::Double,
            TypedValue::Decimal(_) => Rep::Decimal,
            TypedValue::String(_) => Rep::String,
            TypedValue::Bytes(_) => Rep::Bytes,
            TypedValue::Date(_) => Rep::Date,
            TypedValue::Time(_) => Rep::Time,
            TypedValue::Timestamp(_) => Rep::Timestamp,
            TypedValue::Array(_) => Rep::Array,
        }
    }

    /// Validates internal consistency. Values arriving off the wire bypass
    /// the checked constructors, so decoded decimals and arrays are
    /// re-validated before use.
    pub fn validate(&self) -> Result<()> {
        match self {
            TypedValue::Decimal(d) => d.validate(),
            TypedValue::Array(a) => a.validate(),
            _ => Ok(()),
        }
    }

    /// Checks this value against a declared column or parameter type.
    /// NULL is compatible with every declared type; nullability is
    /// enforced above the codec.
    pub fn check_rep(&self, expected: Rep) -> Result<()> {
        self.validate()?;
        let actual = self.rep();
        if actual == Rep::Null || actual == expected {
            Ok(())
        } else {
            Err(MetaError::invalid_input(format!(
                "value of type {:?} is incompatible with declared type {:?}",
                actual, expected
            )))
        }
    }

    /// Renders string and byte values as UTF-8 text; a binary column may
    /// be read either way. Other representations have no textual rendering
    /// here.
    pub fn render_utf8(&self) -> Option<String> {
        match self {
            TypedValue::String(s) => Some(s.clone()),
            TypedValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            _ => None,
        }
    }

    /// True iff this is the NULL value.
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_plain_string_preserves_trailing_zeros() {
        let d = DecimalValue::new("1234567890", 5).unwrap();
        assert_eq!(d.to_plain_string(), "12345.67890");
    }

    #[test]
    fn decimal_plain_string_small_magnitude() {
        let d = DecimalValue::new("5", 3).unwrap();
        assert_eq!(d.to_plain_string(), "0.005");
        let d = DecimalValue::new("-5", 3).unwrap();
        assert_eq!(d.to_plain_string(), "-0.005");
    }

    #[test]
    fn decimal_zero_scale() {
        let d = DecimalValue::new("-42", 0).unwrap();
        assert_eq!(d.to_plain_string(), "-42");
    }

    #[test]
    fn decimal_numeric_equality_ignores_trailing_zeros() {
        let a = DecimalValue::new("150", 2).unwrap();
        let b = DecimalValue::new("15", 1).unwrap();
        assert!(a.numerically_equal(&b));
        let c = DecimalValue::new("151", 2).unwrap();
        assert!(!a.numerically_equal(&c));
    }

    #[test]
    fn decimal_rejects_negative_scale() {
        let err = DecimalValue::new("10", -1).unwrap_err();
        assert!(matches!(err, MetaError::InvalidInput(_)));
    }

    #[test]
    fn decimal_rejects_non_integer_strings() {
        assert!(DecimalValue::new("NaN", 0).is_err());
        assert!(DecimalValue::new("Infinity", 0).is_err());
        assert!(DecimalValue::new("1.5", 1).is_err());
        assert!(DecimalValue::new("", 0).is_err());
    }

    #[test]
    fn bytes_render_as_utf8_string() {
        let v = TypedValue::Bytes(vec![0x61, 0x73, 0x64, 0x66]);
        assert_eq!(v.render_utf8().unwrap(), "asdf");
    }

    #[test]
    fn unicode_strings_pass_through() {
        for text in ["您好", "こんにちは", "안녕하세요"] {
            let v = TypedValue::String(text.to_string());
            assert_eq!(v.render_utf8().unwrap(), text);
        }
    }

    #[test]
    fn null_is_distinct_from_zero() {
        assert_ne!(TypedValue::Null, TypedValue::Integer(0));
        assert_ne!(TypedValue::Null, TypedValue::Long(0));
        assert!(TypedValue::Null.is_null());
        assert!(!TypedValue::Integer(0).is_null());
    }

    #[test]
    fn array_allows_null_elements() {
        let arr = ArrayValue::new(
            Rep::String,
            vec![
                TypedValue::String("b".to_string()),
                TypedValue::Null,
                TypedValue::String("c".to_string()),
            ],
        )
        .unwrap();
        assert_eq!(arr.elements.len(), 3);
    }

    #[test]
    fn array_rejects_conflicting_element_tag() {
        let err = ArrayValue::new(
            Rep::Integer,
            vec![TypedValue::Integer(1), TypedValue::String("x".to_string())],
        )
        .unwrap_err();
        assert!(matches!(err, MetaError::InvalidInput(_)));
    }

    #[test]
    fn nested_arrays_validate_recursively() {
        let inner = ArrayValue::new(Rep::Integer, vec![TypedValue::Integer(1)]).unwrap();
        let outer = ArrayValue::new(Rep::Array, vec![TypedValue::Array(inner)]).unwrap();
        assert_eq!(outer.component, Rep::Array);

        let bad_inner = ArrayValue {
            component: Rep::Integer,
            elements: vec![TypedValue::Boolean(true)],
        };
        let outer = ArrayValue {
            component: Rep::Array,
            elements: vec![TypedValue::Array(bad_inner)],
        };
        assert!(outer.validate().is_err());
    }

    #[test]
    fn check_rep_accepts_null_for_any_type() {
        assert!(TypedValue::Null.check_rep(Rep::Long).is_ok());
        assert!(TypedValue::Long(1).check_rep(Rep::Long).is_ok());
        assert!(TypedValue::Long(1).check_rep(Rep::Integer).is_err());
    }

    #[test]
    fn textual_form_carries_explicit_rep_tag() {
        let json = serde_json::to_string(&TypedValue::Long(42)).unwrap();
        assert_eq!(json, "{\"LONG\":42}");
        let json = serde_json::to_string(&TypedValue::Null).unwrap();
        assert_eq!(json, "\"NULL\"");
        let d = TypedValue::Decimal(DecimalValue::new("1050", 2).unwrap());
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, "{\"DECIMAL\":{\"unscaledValue\":\"1050\",\"scale\":2}}");
    }
}
