pub mod errors;
pub mod ids;

pub use errors::{ApiError, VttError};
pub use ids::{next_id, now_ms};
