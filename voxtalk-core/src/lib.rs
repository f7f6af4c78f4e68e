pub mod config;
pub mod error;
pub mod session;
pub mod text;

// Keep the public surface small and intentional.
pub use config::*;
pub use error::*;
pub use session::*;
pub use text::*;
