pub mod config;
pub mod download;
pub mod error;
pub mod hashes;
pub mod model;
pub mod schema;
pub mod verify;

// Re-export commonly used types for easier access in tests
pub use config::ConfigManager;
pub use error::{HashError, InvalidDocument, MetalinkError, SchemaError};
pub use hashes::HashRegistry;
pub use model::{
    Descriptor, DescriptorKind, File, Info, InfoValue, MediaValue, Metalink, Multimedia, Tags,
    Upgrade, Url, Version,
};
pub use schema::Schema;
pub use verify::{CheckResult, Checks, GpgVerifier, Outcome, SignatureVerifier, Summary, VerificationEngine};
