//! `race_shared`
//!
//! Model shared by the race client and its test harness.
//!
//! Design goals:
//! - Plain data: snapshots and room records are replaced, never merged.
//! - Explicit, versionable wire encoding for the realtime channel.
//! - No dependency on a rendering or networking backend.

pub mod config;
pub mod math;
pub mod net;
pub mod palette;
pub mod render;
pub mod room;
pub mod session;
pub mod viewport;
pub mod world;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::config::*;
    pub use crate::math::*;
    pub use crate::net::*;
    pub use crate::room::*;
    pub use crate::session::*;
    pub use crate::world::*;
}
