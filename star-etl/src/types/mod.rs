mod cell;
mod key;
mod numeric;
mod row_set;
mod table_row;

pub use cell::{Cell, ColumnType};
pub use key::{KeyValue, SurrogateKey};
pub use numeric::PgNumeric;
pub use row_set::RowSet;
pub use table_row::TableRow;
