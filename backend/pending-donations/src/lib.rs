//! Volunteer pending-donations screen.
//!
//! Lists the donations assigned to the signed-in volunteer and lets them set
//! each pickup's volunteer remark. The remote service is authoritative: every
//! status change is written first and then the whole list is re-fetched.

pub mod api;
pub mod config;
pub mod donation;
pub mod errors;
pub mod screen;
pub mod view;
