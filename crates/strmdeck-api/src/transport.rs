// Shared transport configuration for building the reqwest::Client.
//
// The command surface and the health probe share user agent and TLS
// leniency through this module. Deadlines are applied per call by
// `CommandClient`, not by the client builder.

use crate::error::Error;

const USER_AGENT: &str = concat!("strmdeck/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    /// Accept any certificate (self-signed NAS deployments).
    pub accept_invalid_certs: bool,
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }
}
