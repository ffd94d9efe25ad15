// Trait seams for the fetch engine.
//
// SearchProvider hides every site-specific scraper behind one call.
// ProviderFactory resolves a site tag to its provider.
//
// Tests swap both for the scripted doubles in `testing`.

use std::sync::Arc;

use async_trait::async_trait;

use jobsparser_common::{BatchResult, ProviderError, Result, SearchRequest, Site};

// ---------------------------------------------------------------------------
// SearchProvider
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Fetch up to `limit` postings for `request`, starting `offset` records in.
    ///
    /// An empty batch means the site has nothing more for this request.
    async fn search(
        &self,
        request: &SearchRequest,
        offset: usize,
        limit: usize,
    ) -> std::result::Result<BatchResult, ProviderError>;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// ProviderFactory
// ---------------------------------------------------------------------------

pub trait ProviderFactory: Send + Sync {
    /// Provider for `site`, or `InvalidConfig` if no backend is registered.
    fn provider(&self, site: Site) -> Result<Arc<dyn SearchProvider>>;
}
