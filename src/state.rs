pub(crate) mod request_id;

use crate::config::AppConfig;
use crate::gateway::Gateway;
use crate::transport::{HttpTransport, Transport};

use request_id::RequestIdGenerator;

/// Shared application state accessible to all handlers.
pub struct AppState<T = HttpTransport> {
    pub config: AppConfig,
    pub gateway: Gateway<T>,
    request_ids: RequestIdGenerator,
}

impl<T: Transport> AppState<T> {
    #[must_use]
    pub fn new(config: AppConfig, transport: T) -> Self {
        let gateway = Gateway::new(&config.providers, transport);
        Self {
            config,
            gateway,
            request_ids: RequestIdGenerator::new(),
        }
    }

    pub fn next_request_seq(&self) -> u64 {
        self.request_ids.next_seq()
    }

    #[must_use]
    pub fn request_uuid(&self, request_seq: u64) -> uuid::Uuid {
        self.request_ids.request_uuid(request_seq)
    }
}
