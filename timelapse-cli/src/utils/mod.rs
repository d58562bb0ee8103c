mod paths;
pub mod progress;
mod size;

// Export utility functions
pub use self::paths::{application_dir, login_name};
pub use self::size::format_bytes;
pub use self::size::parse_size;
