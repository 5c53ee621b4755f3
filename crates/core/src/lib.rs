pub mod config;
pub mod crm;
pub mod metrics;
pub mod sync;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, CrmConfig,
    SanitizedConfig, ServerConfig, SyncConfig,
};
pub use crm::{Association, CrmClient, CrmError, CrmObject, HubSpotClient, PropertyUpdate};
pub use sync::{Reconciler, SyncAction, SyncReport, SyncStatus};
