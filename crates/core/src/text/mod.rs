//! Pure text gates applied before paid classification work.

pub mod prefilter;
pub mod truncate;

pub use prefilter::{Prefilter, matches_watchlist};
pub use truncate::{DETAIL_SEPARATOR, TruncationConfig, truncate_text};
