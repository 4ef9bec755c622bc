pub mod header;
pub mod log_parser;
pub mod log_serializer;
pub mod time_codec;

pub use header::{resolve_header, FieldIndices, HeaderError, DEFAULT_HEADER};
pub use log_parser::{parse_line, parse_log};
pub use log_serializer::serialize_log;
pub use time_codec::{format_date, format_duration, format_time, parse_date_time, parse_epoch_ms};
