pub mod guard;
pub mod login;
pub mod refresh;
pub mod welcome;

// Re-export main handlers
pub use login::handle_login;
pub use refresh::handle_refresh;
pub use welcome::handle_auth_test;
