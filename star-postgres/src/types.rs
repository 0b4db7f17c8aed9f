use pg_escape::quote_identifier;
use std::fmt;

/// Schema-qualified name of a Postgres table.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TableName {
    /// The schema name containing the table.
    pub schema: String,
    /// The name of the table within the schema.
    pub name: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> TableName {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Returns the table name as a properly quoted Postgres identifier.
    ///
    /// Mixed-case names such as `Dim_Product` are only reachable when quoted.
    pub fn as_quoted_identifier(&self) -> String {
        let quoted_schema = quote_identifier(&self.schema);
        let quoted_name = quote_identifier(&self.name);

        format!("{quoted_schema}.{quoted_name}")
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}
