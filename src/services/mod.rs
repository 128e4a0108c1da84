pub mod availability;
pub mod class_form;
pub mod debounce;
pub mod enrollment_form;
pub mod export;
pub mod form_mode;
pub mod roster;
pub mod student_form;

pub use availability::{ClassAvailability, OccupancyView};
pub use class_form::{ClassFormController, ClassFormValues};
pub use debounce::{Debouncer, SEARCH_DEBOUNCE};
pub use enrollment_form::{EnrollmentFormController, EnrollmentFormValues};
pub use form_mode::FormMode;
pub use roster::{RefreshOutcome, RosterRow, RosterStats, RosterView, RosterViewModel};
pub use student_form::{StudentFormController, StudentFormValues};
