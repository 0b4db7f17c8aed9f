use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::{KeyValue, PgNumeric};

/// Storage type of a reporting column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    Date,
    Timestamp,
    TimestampTz,
    Bytea,
}

impl ColumnType {
    /// Returns the Postgres name of the type.
    pub fn as_pg_type(&self) -> &'static str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::Int2 => "int2",
            ColumnType::Int4 => "int4",
            ColumnType::Int8 => "int8",
            ColumnType::Float4 => "float4",
            ColumnType::Float8 => "float8",
            ColumnType::Numeric => "numeric",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Timestamp => "timestamp",
            ColumnType::TimestampTz => "timestamptz",
            ColumnType::Bytea => "bytea",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_pg_type())
    }
}

/// A single typed value read from or written to a store.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Numeric(PgNumeric),
    String(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Bytes(Vec<u8>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Returns the value as an integer when it has no fractional part.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Cell::I16(v) => Some(i64::from(*v)),
            Cell::I32(v) => Some(i64::from(*v)),
            Cell::I64(v) => Some(*v),
            Cell::F32(v) => float_to_i64(f64::from(*v)),
            Cell::F64(v) => float_to_i64(*v),
            Cell::Numeric(PgNumeric::Value(v)) if v.is_integer() => v.to_i64(),
            Cell::String(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as a double precision float.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Cell::I16(v) => Some(f64::from(*v)),
            Cell::I32(v) => Some(f64::from(*v)),
            Cell::I64(v) => Some(*v as f64),
            Cell::F32(v) => Some(widen_f32(*v)),
            Cell::F64(v) => Some(*v),
            Cell::Numeric(PgNumeric::Value(v)) => v.to_f64(),
            Cell::Numeric(PgNumeric::NaN) => Some(f64::NAN),
            Cell::Numeric(PgNumeric::PositiveInf) => Some(f64::INFINITY),
            Cell::Numeric(PgNumeric::NegativeInf) => Some(f64::NEG_INFINITY),
            Cell::String(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as an exact decimal.
    ///
    /// Single precision floats go through their shortest decimal rendering, so `0.1f32`
    /// becomes exactly `0.1`. Non-finite values have no decimal form.
    pub fn to_decimal(&self) -> Option<BigDecimal> {
        match self {
            Cell::I16(v) => Some(BigDecimal::from(*v)),
            Cell::I32(v) => Some(BigDecimal::from(*v)),
            Cell::I64(v) => Some(BigDecimal::from(*v)),
            Cell::F32(v) if v.is_finite() => BigDecimal::from_str(&v.to_string()).ok(),
            Cell::F64(v) if v.is_finite() => BigDecimal::from_str(&v.to_string()).ok(),
            Cell::Numeric(PgNumeric::Value(v)) => Some(v.clone()),
            Cell::String(v) => BigDecimal::from_str(v.trim()).ok(),
            _ => None,
        }
    }

    /// Returns the value as a lookup key, or [`None`] for nulls and non-key types.
    pub fn to_key_value(&self) -> Option<KeyValue> {
        match self {
            Cell::I16(_) | Cell::I32(_) | Cell::I64(_) => self.to_i64().map(KeyValue::Int),
            Cell::Numeric(PgNumeric::Value(v)) if v.is_integer() => v.to_i64().map(KeyValue::Int),
            Cell::String(v) => Some(KeyValue::Text(v.clone())),
            _ => None,
        }
    }

    /// Converts the cell into the representation stored in a column of `column_type`.
    ///
    /// Conversions never lose integer digits; values that do not fit fail with
    /// [`ErrorKind::ConversionError`]. Nulls are kept as they are.
    pub fn conform(self, column_type: ColumnType) -> EtlResult<Cell> {
        let conformed = match (column_type, &self) {
            (_, Cell::Null) => Some(Cell::Null),

            (ColumnType::Bool, Cell::Bool(_)) => Some(self.clone()),
            (ColumnType::Bool, Cell::I16(_) | Cell::I32(_) | Cell::I64(_)) => {
                match self.to_i64() {
                    Some(0) => Some(Cell::Bool(false)),
                    Some(1) => Some(Cell::Bool(true)),
                    _ => None,
                }
            }

            (ColumnType::Int2, _) => self
                .integral()
                .and_then(|v| i16::try_from(v).ok())
                .map(Cell::I16),
            (ColumnType::Int4, _) => self
                .integral()
                .and_then(|v| i32::try_from(v).ok())
                .map(Cell::I32),
            (ColumnType::Int8, _) => self.integral().map(Cell::I64),

            (ColumnType::Float4, Cell::F32(_)) => Some(self.clone()),
            (ColumnType::Float4, _) => self.numeric_f64().map(|v| Cell::F32(v as f32)),
            (ColumnType::Float8, _) => self.numeric_f64().map(Cell::F64),

            (ColumnType::Numeric, Cell::Numeric(_)) => Some(self.clone()),
            (ColumnType::Numeric, Cell::F32(_) | Cell::F64(_)) => match self.to_f64() {
                Some(v) if v.is_nan() => Some(Cell::Numeric(PgNumeric::NaN)),
                Some(v) if v == f64::INFINITY => Some(Cell::Numeric(PgNumeric::PositiveInf)),
                Some(v) if v == f64::NEG_INFINITY => Some(Cell::Numeric(PgNumeric::NegativeInf)),
                _ => self.to_decimal().map(|v| Cell::Numeric(PgNumeric::Value(v))),
            },
            (ColumnType::Numeric, Cell::I16(_) | Cell::I32(_) | Cell::I64(_)) => {
                self.to_decimal().map(|v| Cell::Numeric(PgNumeric::Value(v)))
            }

            (ColumnType::Text, Cell::String(_)) => Some(self.clone()),

            (ColumnType::Date, Cell::Date(_)) => Some(self.clone()),
            (ColumnType::Date, Cell::Timestamp(v)) => Some(Cell::Date(v.date())),
            (ColumnType::Date, Cell::TimestampTz(v)) => Some(Cell::Date(v.date_naive())),

            (ColumnType::Timestamp, Cell::Timestamp(_)) => Some(self.clone()),
            (ColumnType::Timestamp, Cell::Date(v)) => Some(Cell::Timestamp(v.and_time(
                chrono::NaiveTime::MIN,
            ))),
            (ColumnType::Timestamp, Cell::TimestampTz(v)) => Some(Cell::Timestamp(v.naive_utc())),

            (ColumnType::TimestampTz, Cell::TimestampTz(_)) => Some(self.clone()),
            (ColumnType::TimestampTz, Cell::Timestamp(v)) => Some(Cell::TimestampTz(v.and_utc())),

            (ColumnType::Bytea, Cell::Bytes(_)) => Some(self.clone()),

            _ => None,
        };

        match conformed {
            Some(cell) => Ok(cell),
            None => bail!(
                ErrorKind::ConversionError,
                "Value does not fit the column type",
                format!("cannot store {self:?} in a {column_type} column")
            ),
        }
    }

    /// Integer view used by the integer column types; text is never parsed here.
    fn integral(&self) -> Option<i64> {
        match self {
            Cell::String(_) | Cell::Bool(_) => None,
            _ => self.to_i64(),
        }
    }

    /// Float view used by the float column types; text is never parsed here.
    fn numeric_f64(&self) -> Option<f64> {
        match self {
            Cell::String(_) | Cell::Bool(_) => None,
            _ => self.to_f64(),
        }
    }
}

/// Widens a single precision float through its shortest decimal rendering.
fn widen_f32(value: f32) -> f64 {
    value
        .to_string()
        .parse::<f64>()
        .unwrap_or(f64::from(value))
}

fn float_to_i64(value: f64) -> Option<i64> {
    if value.is_finite()
        && value.fract() == 0.0
        && value >= i64::MIN as f64
        && value <= i64::MAX as f64
    {
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_precision_discount_widens_exactly() {
        assert_eq!(Cell::F32(0.1).to_f64(), Some(0.1));
        assert_eq!(
            Cell::F32(0.15).to_decimal(),
            Some(BigDecimal::from_str("0.15").unwrap())
        );
    }

    #[test]
    fn integers_conform_to_narrower_columns_when_they_fit() {
        assert_eq!(Cell::I64(42).conform(ColumnType::Int4).unwrap(), Cell::I32(42));
        assert_eq!(Cell::I16(7).conform(ColumnType::Int8).unwrap(), Cell::I64(7));

        let err = Cell::I64(i64::from(i32::MAX) + 1)
            .conform(ColumnType::Int4)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionError);
    }

    #[test]
    fn text_is_not_silently_converted() {
        let err = Cell::String("12".to_owned())
            .conform(ColumnType::Int4)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionError);

        let err = Cell::I32(12).conform(ColumnType::Text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionError);
    }

    #[test]
    fn bit_like_integers_conform_to_bool() {
        assert_eq!(Cell::I32(1).conform(ColumnType::Bool).unwrap(), Cell::Bool(true));
        assert_eq!(Cell::I16(0).conform(ColumnType::Bool).unwrap(), Cell::Bool(false));
        assert!(Cell::I32(2).conform(ColumnType::Bool).is_err());
    }

    #[test]
    fn nulls_conform_to_every_type() {
        for column_type in [ColumnType::Int4, ColumnType::Text, ColumnType::Numeric] {
            assert_eq!(Cell::Null.conform(column_type).unwrap(), Cell::Null);
        }
    }

    #[test]
    fn timestamps_conform_to_dates() {
        let timestamp = NaiveDate::from_ymd_opt(1996, 7, 4)
            .unwrap()
            .and_hms_opt(13, 30, 0)
            .unwrap();

        assert_eq!(
            Cell::Timestamp(timestamp).conform(ColumnType::Date).unwrap(),
            Cell::Date(NaiveDate::from_ymd_opt(1996, 7, 4).unwrap())
        );
    }

    #[test]
    fn key_values_widen_integers() {
        assert_eq!(Cell::I16(11).to_key_value(), Some(KeyValue::Int(11)));
        assert_eq!(Cell::I64(11).to_key_value(), Some(KeyValue::Int(11)));
        assert_eq!(Cell::Null.to_key_value(), None);
        assert_eq!(Cell::F64(11.0).to_key_value(), None);
    }
}
