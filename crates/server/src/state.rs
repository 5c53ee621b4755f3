use std::sync::Arc;

use fieldsync_core::{Config, CrmClient, CrmError, HubSpotClient, Reconciler, SanitizedConfig};
use tracing::{error, warn};

/// Outcome of building the CRM client at startup.
///
/// A missing or broken client is not fatal: the server still starts so that
/// health checks work, and every trigger answers with a 500 instead.
#[derive(Clone)]
pub enum CrmBinding {
    Ready(Reconciler),
    NotConfigured,
    Failed(String),
}

impl CrmBinding {
    /// Build the HubSpot client described by `config`.
    pub fn from_config(config: &Config) -> Self {
        match HubSpotClient::new(&config.crm) {
            Ok(client) => Self::ready(Arc::new(client), config),
            Err(CrmError::NotConfigured(reason)) => {
                warn!("CRM client not configured: {}", reason);
                Self::NotConfigured
            }
            Err(e) => {
                error!("Failed to create CRM client: {}", e);
                Self::Failed(e.to_string())
            }
        }
    }

    /// Bind an already constructed client.
    pub fn ready(crm: Arc<dyn CrmClient>, config: &Config) -> Self {
        Self::Ready(Reconciler::from_config(crm, &config.sync))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Shared application state
pub struct AppState {
    config: Config,
    crm: CrmBinding,
}

impl AppState {
    pub fn new(config: Config, crm: CrmBinding) -> Self {
        Self { config, crm }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn crm(&self) -> &CrmBinding {
        &self.crm
    }

    /// Custom object type id of the subscription objects.
    pub fn object_type(&self) -> &str {
        &self.config.crm.subscription_object_type
    }
}
