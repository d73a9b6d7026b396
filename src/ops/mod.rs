pub mod archive;
pub mod edits;
pub mod filter;
pub mod note;
pub mod patch;
pub mod scan;

pub use archive::{Archived, archive_record};
pub use edits::{
    Edit, add_task, cycle_status, set_field, set_status, stamp_status_dates, toggle_status,
};
pub use filter::{TagFilter, admit};
pub use note::{HeaderError, read_note, update_header};
pub use patch::{PatchError, delete_record, patch_record, validate_location};
pub use scan::{FileScan, ScanError, Scanner};
