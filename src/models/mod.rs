// Re-export model modules
mod currencies;
pub(crate) mod feed;

pub use currencies::*;
pub use feed::{parse_feed, ParseError};
