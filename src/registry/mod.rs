//! Executor registry
//!
//! Maps command identifiers to the delivery address of the executor serving
//! them. Registration follows a versioned upsert: a newer or equal version
//! updates the entry in place and keeps its address, an older one is refused.

mod directory;
mod manager;
mod messages;

pub use directory::{ADDRESS_SUFFIX, ExecutorDirectory, ExecutorEntry, RegistrationError, generate_address};
pub use manager::ExecutorRegistry;
pub use messages::{RegistryCommand, RegistryError};
