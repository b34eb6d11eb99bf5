//! Content backing the spoken actions

pub mod network;
pub mod news;

pub use network::{local_ip, IpResolver};
pub use news::{format_digest, parse_headlines, NewsClient, NewsConfig};
