pub mod class;
pub mod enrollment;
pub mod filter;
pub mod sort;
pub mod student;

pub use class::{ClassPayload, ClassRecord};
pub use enrollment::EnrollmentRequest;
pub use filter::FilterCriteria;
pub use sort::{SortDirection, SortField, SortPreference};
pub use student::{StudentPayload, StudentRecord};
