//! Domain layer - Core data model and port definitions
//!
//! This module defines the provisioning data model and the traits (ports)
//! that adapters implement, following hexagonal architecture principles.

pub mod ports;

pub use ports::*;
