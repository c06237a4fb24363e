pub mod client;
pub mod location;
pub mod shift;
pub mod staff;
pub mod team;

// Re-export all repositories for easy importing
pub use client::ClientRepository;
pub use location::LocationRepository;
pub use shift::ShiftRepository;
pub use staff::StaffRepository;
pub use team::TeamRepository;
