//! Upstream pass-through
//!
//! Relays responses from a plain-HTTP upstream as chunked bodies with
//! trailers.

pub mod upstream;

pub use upstream::Upstream;
