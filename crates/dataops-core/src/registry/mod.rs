//! Model registry: versioned model records and their promotion lifecycle.
//!
//! - `types` - status state machine and record types
//! - `version_id` - timestamp + revision version identifiers
//! - `model_registry` - warehouse-backed register / promote / query

mod model_registry;
mod types;
pub mod version_id;

pub use model_registry::ModelRegistry;
pub use types::{ModelStatus, ModelVersionRecord, NewModelVersion};
