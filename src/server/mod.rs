pub mod app_state;
pub mod session;
pub mod session_manager;

pub use app_state::AppState;
pub use session::{Role, Session};
pub use session_manager::SessionHub;
