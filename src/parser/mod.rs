//! Access-log parsing: raw lines → parsed records → typed table.

mod line;
mod table;

pub use line::{parse_line, ParsedRecord};
pub use table::{rfc3339, LogRow, LogTable, LogTableBuilder, TIMESTAMP_FORMAT};
