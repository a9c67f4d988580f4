//! One module per source schema.
//!
//! Three unrelated publishing applications, three record shapes, three
//! linking conventions. Each module knows how to skip its own notion of a
//! draft, resolve its own publication references, and fall back to its own
//! platform URL template — and nothing about the other two.

pub(crate) mod leaflet;
pub(crate) mod standard;
pub(crate) mod whtwnd;
