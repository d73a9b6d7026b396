pub mod body;
pub mod classifier;
pub mod fields;
pub mod frontmatter;
pub mod line;
pub mod serializer;

pub use body::collect_body;
pub use classifier::{checkbox_symbol, is_completed_line, is_task_line};
pub use fields::{Field, FieldTables};
pub use line::{parse_task_line, synthetic_id, title_text};
pub use serializer::{serialize_record, stamp_status};
