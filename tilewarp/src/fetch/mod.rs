//! Network fetching: bounded scheduling, cancellation, caching.
//!
//! - [`FetchScheduler`] caps running fetches and groups them by task
//! - [`TaskRegistry`] owns per-task cancellation tokens
//! - [`HttpTransport`] is the network seam, with [`ReqwestTransport`] as the
//!   production implementation
//! - [`Fetcher`] layers the in-memory caches and the persistence tier on top

mod fetcher;
mod scheduler;
mod task;
mod transport;

pub use fetcher::{FetchOptions, Fetcher};
pub use scheduler::{
    Admission, ControllerId, FetchController, FetchScheduler, FetchSlot, MAX_CONCURRENT_FETCHES,
};
pub use task::{TaskHandle, TaskId, TaskRegistry};
pub use transport::{FetchRequest, HttpTransport, ReqwestTransport};
