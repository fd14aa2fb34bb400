pub mod deliver;
pub mod headers;
pub mod http;
pub mod json_response;

// Re-export commonly used utilities
pub use self::deliver::*;
pub use self::headers::*;
pub use self::http::*;
pub use self::json_response::*;
