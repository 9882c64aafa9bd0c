pub mod inventory;
pub mod rules;
pub mod triggers;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
