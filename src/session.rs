//! The workflow a dashboard host drives: submit queries, keep what is on screen, and ask
//! for a summary of it.

use crate::api::Client;
use crate::cache::{Loader, QueryCache};
use crate::error::Error;
use crate::models::{Query, Table};
use crate::report::{self, Report, ReportError, TextGenerator};
use crate::stats;
use std::sync::Arc;

/// Owns the query cache and the table currently displayed.
pub struct Session<L = Client> {
    cache: QueryCache<L>,
    current: Option<Arc<Table>>,
}

impl<L: Loader> Session<L> {
    pub fn new(loader: L) -> Self {
        Self {
            cache: QueryCache::new(loader),
            current: None,
        }
    }

    /// Run `query` and make its table current. On failure the current table stays as it was.
    pub fn submit(&mut self, query: &Query) -> Result<Arc<Table>, Error> {
        match self.cache.get_or_fetch(query) {
            Ok(table) => {
                self.current = Some(Arc::clone(&table));
                Ok(table)
            }
            Err(e) => {
                log::warn!("query {} failed: {}", query.cache_key(), e);
                Err(e)
            }
        }
    }

    pub fn current(&self) -> Option<&Arc<Table>> {
        self.current.as_ref()
    }

    pub fn cache(&self) -> &QueryCache<L> {
        &self.cache
    }

    /// Summarize the current table. `build_prompt` receives the per-country context lines.
    pub fn summarize(
        &self,
        providers: &[Box<dyn TextGenerator>],
        build_prompt: impl FnOnce(&str) -> String,
    ) -> Result<Report, ReportError> {
        let table = self.current.as_ref().ok_or(ReportError::NoData)?;
        let context = stats::context_text(table).ok_or(ReportError::NoData)?;
        report::generate_with_fallback(providers, &build_prompt(&context))
    }
}
