//! Dispatch bridge

use crate::error::Result;
use crate::link::TerminalLink;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Bridge between the payment dispatcher and a terminal link
///
/// Thin orchestration over a [`TerminalLink`]: one exchange per dispatch,
/// deadline enforcement delegated to the link, outcome logged. Holding the
/// link behind `Arc<dyn TerminalLink>` keeps the bridge mockable without a
/// live terminal.
#[derive(Clone)]
pub struct TerminalBridge {
    link: Arc<dyn TerminalLink>,
}

impl TerminalBridge {
    /// Create a bridge over the given link
    pub fn new(link: Arc<dyn TerminalLink>) -> Self {
        Self { link }
    }

    /// Perform exactly one request/response exchange.
    ///
    /// Never retries. A failure here means the authorization outcome is
    /// unknown; callers record `UNKNOWN`, not a decline.
    pub async fn dispatch(
        &self,
        addr: &str,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        debug!(
            addr,
            link = self.link.name(),
            bytes = payload.len(),
            "dispatching frame to terminal"
        );

        match self.link.exchange(addr, payload, timeout).await {
            Ok(response) => {
                debug!(addr, bytes = response.len(), "terminal responded");
                Ok(response)
            }
            Err(err) => {
                warn!(addr, code = err.code(), %err, "terminal exchange failed");
                Err(err)
            }
        }
    }
}
