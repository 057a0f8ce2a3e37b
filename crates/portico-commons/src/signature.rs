//! Column and parameter metadata describing prepared statements.

use serde::{Deserialize, Serialize};

use crate::errors::{MetaError, Result};
use crate::typed_value::{Rep, TypedValue};

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetaData {
    /// Zero-based position in the row.
    pub ordinal: usize,
    pub column_name: String,
    pub label: String,
    /// Nominal SQL type code.
    pub type_id: i32,
    pub type_name: String,
    pub rep: Rep,
    pub precision: u32,
    pub scale: u32,
    pub nullable: bool,
    pub signed: bool,
    /// Element component type for array columns.
    pub component: Option<Rep>,
}

impl ColumnMetaData {
    /// Column with defaults inferred from the representation tag; the
    /// label mirrors the column name.
    pub fn new(ordinal: usize, name: impl Into<String>, rep: Rep) -> Self {
        let name = name.into();
        Self {
            ordinal,
            label: name.clone(),
            column_name: name,
            type_id: rep.sql_type_id(),
            type_name: rep.sql_type_name().to_string(),
            rep,
            precision: 0,
            scale: 0,
            nullable: true,
            signed: matches!(
                rep,
                Rep::Byte | Rep::Short | Rep::Integer | Rep::Long | Rep::Float | Rep::Double | Rep::Decimal
            ),
            component: None,
        }
    }

    /// Array column with the given element component type.
    pub fn array(ordinal: usize, name: impl Into<String>, component: Rep) -> Self {
        let mut column = Self::new(ordinal, name, Rep::Array);
        column.component = Some(component);
        column
    }

    pub fn with_precision_scale(mut self, precision: u32, scale: u32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Metadata for one statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMetaData {
    /// One-based parameter position.
    pub ordinal: usize,
    pub name: String,
    pub type_id: i32,
    pub type_name: String,
    pub rep: Rep,
    pub precision: u32,
    pub scale: u32,
    pub signed: bool,
}

impl ParameterMetaData {
    pub fn new(ordinal: usize, rep: Rep) -> Self {
        Self {
            ordinal,
            name: format!("?{}", ordinal),
            type_id: rep.sql_type_id(),
            type_name: rep.sql_type_name().to_string(),
            rep,
            precision: 0,
            scale: 0,
            signed: matches!(
                rep,
                Rep::Byte | Rep::Short | Rep::Integer | Rep::Long | Rep::Float | Rep::Double | Rep::Decimal
            ),
        }
    }
}

/// The shape of a prepared statement: ordered result columns, ordered
/// parameter descriptors, and the original SQL text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub columns: Vec<ColumnMetaData>,
    pub parameters: Vec<ParameterMetaData>,
    pub sql: Option<String>,
}

impl Signature {
    pub fn new(columns: Vec<ColumnMetaData>, parameters: Vec<ParameterMetaData>, sql: Option<String>) -> Self {
        Self {
            columns,
            parameters,
            sql,
        }
    }

    /// Signature for a result set with no parameters (metadata queries).
    pub fn for_columns(columns: Vec<ColumnMetaData>) -> Self {
        Self::new(columns, Vec::new(), None)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Binds parameter values against the parameter descriptors, rejecting
    /// arity and type mismatches.
    pub fn check_parameters(&self, values: &[TypedValue]) -> Result<()> {
        if values.len() != self.parameters.len() {
            return Err(MetaError::invalid_parameter(format!(
                "expected {} parameter(s), got {}",
                self.parameters.len(),
                values.len()
            )));
        }
        for (descriptor, value) in self.parameters.iter().zip(values) {
            value.check_rep(descriptor.rep).map_err(|e| {
                MetaError::invalid_parameter(format!("parameter {}: {}", descriptor.ordinal, e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed_value::DecimalValue;

    fn two_param_signature() -> Signature {
        Signature::new(
            vec![ColumnMetaData::new(0, "id", Rep::Long)],
            vec![
                ParameterMetaData::new(1, Rep::Long),
                ParameterMetaData::new(2, Rep::String),
            ],
            Some("select id from t where a = ? and b = ?".to_string()),
        )
    }

    #[test]
    fn check_parameters_accepts_matching_values() {
        let sig = two_param_signature();
        let values = vec![TypedValue::Long(7), TypedValue::String("x".to_string())];
        assert!(sig.check_parameters(&values).is_ok());
    }

    #[test]
    fn check_parameters_accepts_nulls() {
        let sig = two_param_signature();
        let values = vec![TypedValue::Null, TypedValue::Null];
        assert!(sig.check_parameters(&values).is_ok());
    }

    #[test]
    fn check_parameters_rejects_arity_mismatch() {
        let sig = two_param_signature();
        let err = sig.check_parameters(&[TypedValue::Long(7)]).unwrap_err();
        assert!(matches!(err, MetaError::InvalidParameter(_)));
    }

    #[test]
    fn check_parameters_rejects_type_mismatch() {
        let sig = two_param_signature();
        let values = vec![
            TypedValue::Decimal(DecimalValue::new("1", 0).unwrap()),
            TypedValue::String("x".to_string()),
        ];
        let err = sig.check_parameters(&values).unwrap_err();
        assert!(err.to_string().contains("parameter 1"));
    }

    #[test]
    fn column_defaults_follow_rep() {
        let col = ColumnMetaData::new(0, "amount", Rep::Decimal).with_precision_scale(12, 5);
        assert_eq!(col.type_name, "DECIMAL");
        assert!(col.signed);
        assert_eq!(col.scale, 5);

        let col = ColumnMetaData::array(1, "tags", Rep::String);
        assert_eq!(col.component, Some(Rep::String));
        assert_eq!(col.type_name, "ARRAY");
    }
}
