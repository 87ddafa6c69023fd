pub mod auth;
pub mod middleware;
pub mod research;
pub mod rest;
pub mod router;
pub mod state;
pub mod users;

use libre_research_core::ports::PortError;
use uuid::Uuid;

pub use router::build_router;
pub use state::AppState;

/// Parses a path id, rejecting malformed values as a validation error.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, PortError> {
    Uuid::parse_str(raw).map_err(|_| PortError::Validation(format!("'{}' is not a valid id", raw)))
}
