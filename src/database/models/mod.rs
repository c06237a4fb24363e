pub mod client;
pub mod location;
mod macros;
pub mod shift;
pub mod staff;
pub mod team;

pub use client::{Client, ClientInput};
pub use location::{Location, LocationInput};
pub use shift::{
    AssignmentRole, AssignmentType, JobStatus, PAUSE_LOG_VERSION, PauseEntry, PauseLog, Shift,
    ShiftDetail, ShiftInput, ShiftTheme, ShiftUpdateInput, StaffLink,
};
pub use staff::{Staff, StaffInput};
pub use team::{Team, TeamInput};
