pub mod preferences;

pub use preferences::{
    MemoryPreferenceStore, SORT_PREFERENCE_KEY, SortPreferenceStore, SqlitePreferenceStore,
};
