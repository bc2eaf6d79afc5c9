//! wbi_reporter
//!
//! Query World Bank indicator data, keep results for the life of the process, and ask a
//! language model to summarize them. Pairs with the `wbi-report` CLI.
//!
//! ### Features
//! - Fetch one indicator for a set of countries over a year range, following pagination
//! - Normalize the nested API payload into a flat table, keeping missing values as `None`
//! - Memoize tables per query, with one in-flight fetch per query
//! - Per-country summary statistics and an ordered fallback over text-generation providers
//!
//! ### Example
//! ```no_run
//! use wbi_reporter::{Client, Query, QueryCache};
//!
//! let cache = QueryCache::new(Client::default());
//! let q = Query::new(["USA", "FRA"], "NY.GDP.PCAP.CD", 2015, 2017)?;
//! let table = cache.get_or_fetch(&q)?;
//! let again = cache.get_or_fetch(&q)?; // no network
//! assert_eq!(table.len(), again.len());
//! println!("{:#?}", wbi_reporter::stats::by_country(&table));
//! # Ok::<(), wbi_reporter::Error>(())
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod report;
pub mod request;
pub mod session;
pub mod stats;

pub use api::Client;
pub use cache::{CacheEntry, Loader, QueryCache};
pub use config::Settings;
pub use error::{Error, RowError};
pub use models::{Observation, Query, Table};
pub use session::Session;
