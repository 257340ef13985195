use std::collections::HashMap;
use std::sync::Arc;

use prompt_gateway_sdk::{ModelProvider, ServiceKind};

/// Adapters by the service they speak to.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ServiceKind, Arc<dyn ModelProvider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under the service it reports, replacing any previous one.
    #[must_use]
    pub fn with(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.providers.insert(provider.service(), provider);
        self
    }

    #[must_use]
    pub fn get(&self, service: ServiceKind) -> Option<Arc<dyn ModelProvider>> {
        self.providers.get(&service).cloned()
    }
}
