pub mod connection_string;
pub mod diagnostics;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use connection_string::*;
pub use diagnostics::*;
pub use types::*;
pub use utils::*;
