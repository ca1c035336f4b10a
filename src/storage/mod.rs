pub mod record;

pub use record::{COLUMNS, RecordWriter};
