pub mod ziprecruiter;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jobsparser_common::{JobsError, Result, Site};

use crate::traits::{ProviderFactory, SearchProvider};

pub use ziprecruiter::ZipRecruiterProvider;

/// Builds the bundled provider for each site on first use and reuses it.
///
/// Only ZipRecruiter ships with a backend. Other sites resolve to
/// `InvalidConfig` unless a provider is registered with [`Self::register`].
pub struct DefaultProviderFactory {
    proxies: Vec<String>,
    request_timeout: Duration,
    built: Mutex<HashMap<Site, Arc<dyn SearchProvider>>>,
}

impl DefaultProviderFactory {
    pub fn new(proxies: Vec<String>, request_timeout: Duration) -> Self {
        Self {
            proxies,
            request_timeout,
            built: Mutex::new(HashMap::new()),
        }
    }

    /// Plug in a backend for a site the factory cannot build itself.
    pub fn register(self, site: Site, provider: Arc<dyn SearchProvider>) -> Self {
        self.built
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(site, provider);
        self
    }

    fn build(&self, site: Site) -> Result<Arc<dyn SearchProvider>> {
        match site {
            Site::ZipRecruiter => {
                let proxy = self.proxies.first().map(String::as_str);
                let provider = ZipRecruiterProvider::new(proxy, self.request_timeout)?;
                Ok(Arc::new(provider))
            }
            other => Err(JobsError::InvalidConfig(format!(
                "no provider registered for {other}"
            ))),
        }
    }
}

impl ProviderFactory for DefaultProviderFactory {
    fn provider(&self, site: Site) -> Result<Arc<dyn SearchProvider>> {
        let mut built = self.built.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(provider) = built.get(&site) {
            return Ok(provider.clone());
        }
        let provider = self.build(site)?;
        built.insert(site, provider.clone());
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    #[test]
    fn unsupported_site_is_a_config_error() {
        let factory = DefaultProviderFactory::new(Vec::new(), Duration::from_secs(5));
        let err = factory.provider(Site::Glassdoor).err().unwrap();
        assert!(matches!(err, JobsError::InvalidConfig(_)));
    }

    #[test]
    fn ziprecruiter_provider_is_built_once() {
        let factory = DefaultProviderFactory::new(Vec::new(), Duration::from_secs(5));
        let a = factory.provider(Site::ZipRecruiter).unwrap();
        let b = factory.provider(Site::ZipRecruiter).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "zip_recruiter");
    }

    #[test]
    fn registered_provider_takes_over_site() {
        let factory = DefaultProviderFactory::new(Vec::new(), Duration::from_secs(5))
            .register(Site::Linkedin, Arc::new(ScriptedProvider::new()));
        assert_eq!(factory.provider(Site::Linkedin).unwrap().name(), "scripted");
    }
}
