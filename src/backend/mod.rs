//! Backend abstraction layer
//!
//! Provides the device and command recorder contracts the frame graph consumes,
//! the common descriptor types, and a bookkeeping-only dummy implementation.

pub mod dummy;
pub mod traits;
pub mod types;

pub use dummy::*;
pub use traits::*;
pub use types::*;
