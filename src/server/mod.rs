//! TCP accept loop and shutdown coordination.

pub mod listener;

pub use listener::{Server, ShutdownHandle};
