use std::fmt;

/// Surrogate key generated by the reporting store for a dimension row.
pub type SurrogateKey = i64;

/// Hashable natural key of a dimension row.
///
/// Integer keys of every width are widened to `i64` so that a `smallint` source identifier
/// matches an `integer` reporting column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{v}"),
            KeyValue::Text(v) => write!(f, "{v}"),
        }
    }
}
