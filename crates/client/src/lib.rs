pub mod error;
mod fallback;
mod paginate;
mod record;
pub mod source;

pub use crate::fallback::{read_with_fallback, with_fallback};
pub use crate::paginate::{Listing, fetch_all, page_stream};
pub use crate::record::{AtUri, Page, Record};
#[cfg(any(test, feature = "mock"))]
pub use crate::source::{MockProvider, MockSource};
pub use crate::source::{FetchOrder, Network, RecordSource, SourceHandle, SourceProvider, XrpcSource};
