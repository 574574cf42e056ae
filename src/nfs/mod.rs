//! NFS Module
//!
//! Server pool parsing, server selection, path planning, and local mounts.

pub mod mount;
pub mod paths;
pub mod pool;
pub mod selector;

pub use mount::{render_command, MountSession, ShellRunner};
pub use paths::*;
pub use pool::{clean_path, parse_servers};
pub use selector::{SelectionStrategy, ServerSelector};
