pub mod admin;
pub mod shared;
pub mod shifts;
