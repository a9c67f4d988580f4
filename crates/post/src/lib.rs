//! Recursive post composition.
//!
//! Resolves a post URI into a fully-hydrated [`Post`]: text, timestamps,
//! normalized media, external-link preview, reconciled engagement counters,
//! and — depth-bounded — the quoted post and reply ancestors as composed
//! posts of their own.

pub mod compose;
pub mod engagement;
pub mod error;
mod model;

pub use crate::compose::{Composer, MAX_DEPTH, POST_COLLECTION};
pub use crate::engagement::{Endorsement, Engagement, LiveEngagement, reconcile};
pub use crate::model::{Author, Counts, Post};
