pub mod cbr_client;

pub use cbr_client::{CbrClient, FeedSource, FetchError};
