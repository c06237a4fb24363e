pub mod cancellation;
pub mod recurrence;
pub mod time_tracker;
pub mod travel;
pub mod validator;

pub use cancellation::{COVER_STAFF_NAME, CancellationHandler};
pub use recurrence::{RecurrenceGenerator, RecurrenceReport, RecurrenceRequest};
pub use time_tracker::{JobTransition, TimeTracker, Timesheet};
pub use travel::{DistanceProvider, RouteTable, TravelLinker, TravelOutcome};
pub use validator::{AssignmentRefs, AssignmentValidator};
