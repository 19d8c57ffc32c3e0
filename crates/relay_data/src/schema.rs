//! Record initialization.

use crate::record::Record;

/// Assigns defaults to records before they are added.
pub trait RecordInitializer {
    /// Fills in defaults on `record`.
    fn initialize_record(&self, record: &mut Record);
}

/// Assigns a random v4 uuid to records that have no id.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidInitializer;

impl RecordInitializer for UuidInitializer {
    fn initialize_record(&self, record: &mut Record) {
        if record.id.is_empty() {
            record.id = uuid::Uuid::new_v4().to_string();
        }
    }
}
