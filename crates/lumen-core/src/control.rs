//! Sending commands to a bound device.
//!
//! [`Controller`] owns at most one live session. Commands are written once,
//! without retries; the caller decides what to do with a failure.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lumen_types::{DeviceBinding, OFF_COMMAND, Rgb, ServiceEndpoint};

use crate::error::{Error, Result};
use crate::transport::{GattSession, GattTransport};
use crate::util::identifiers_match;

/// Connects to one device at a time and writes commands to it.
///
/// Activating another device cancels a connect that is still in flight and
/// disconnects the previous session first.
pub struct Controller<T: GattTransport> {
    transport: Arc<T>,
    session: tokio::sync::Mutex<Option<T::Session>>,
    pending: Mutex<Option<(u64, CancellationToken)>>,
    next_id: AtomicU64,
}

impl<T: GattTransport> fmt::Debug for Controller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("connecting", &self.is_connecting())
            .finish_non_exhaustive()
    }
}

impl<T: GattTransport> Controller<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            session: tokio::sync::Mutex::new(None),
            pending: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// A connect started by [`activate`](Self::activate) has not finished.
    pub fn is_connecting(&self) -> bool {
        self.pending_lock().is_some()
    }

    /// Make `device_id` the connected device.
    ///
    /// Already being connected to `device_id` is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if another call to `activate` or
    /// [`deactivate`](Self::deactivate) superseded this one, otherwise
    /// whatever the transport's connect returned. A superseded connect has
    /// its link released so it cannot linger.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn activate(&self, device_id: &str) -> Result<()> {
        let token = CancellationToken::new();
        let generation = self.next_id.fetch_add(1, Ordering::Relaxed);
        let superseded = self.pending_lock().replace((generation, token.clone()));
        if let Some((_, previous)) = superseded {
            debug!("Cancelling pending connect");
            previous.cancel();
        }

        let mut session = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Error::Cancelled),
            guard = self.session.lock() => guard,
        };

        if let Some(current) = session.as_ref()
            && identifiers_match(current.device_id(), device_id)
            && current.is_connected().await
        {
            self.finish(generation);
            return Ok(());
        }

        if let Some(previous) = session.take() {
            info!("Disconnecting {}", previous.device_id());
            if let Err(e) = previous.disconnect().await {
                warn!("Failed to disconnect {}: {}", previous.device_id(), e);
            }
        }

        let connected = tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            result = self.transport.connect(device_id) => result,
        };
        self.finish(generation);

        if matches!(connected, Err(Error::Cancelled)) {
            // The platform may finish the abandoned connect on its own.
            debug!("Releasing superseded connect to {}", device_id);
            if let Err(e) = self.transport.disconnect(device_id).await {
                warn!("Failed to release {}: {}", device_id, e);
            }
        }

        *session = Some(connected?);
        info!("Active device is now {}", device_id);
        Ok(())
    }

    /// Cancel any pending connect and disconnect the active device.
    pub async fn deactivate(&self) -> Result<()> {
        let pending = self.pending_lock().take();
        if let Some((_, token)) = pending {
            token.cancel();
        }
        let session = self.session.lock().await.take();
        match session {
            Some(session) => session.disconnect().await,
            None => Ok(()),
        }
    }

    /// Whether `device_id` is the active device and its link is up.
    pub async fn is_connected(&self, device_id: &str) -> bool {
        match self.session.lock().await.as_ref() {
            Some(session) => {
                identifiers_match(session.device_id(), device_id) && session.is_connected().await
            }
            None => false,
        }
    }

    /// Id of the active device, if any.
    pub async fn active_device(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.device_id().to_string())
    }

    /// Write the turn-off command.
    pub async fn send_off(&self, binding: &DeviceBinding) -> Result<()> {
        self.write(binding, &binding.turn_off_endpoint, &OFF_COMMAND)
            .await
    }

    /// Write `color` as `[r, g, b]`.
    pub async fn send_color(&self, binding: &DeviceBinding, color: Rgb) -> Result<()> {
        self.write(binding, &binding.set_color_endpoint, &color.to_payload())
            .await
    }

    async fn write(
        &self,
        binding: &DeviceBinding,
        endpoint: &ServiceEndpoint,
        payload: &[u8],
    ) -> Result<()> {
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .filter(|s| identifiers_match(s.device_id(), &binding.device_id))
            .ok_or_else(|| Error::NotConnected(binding.device_id.clone()))?;
        if !session.is_connected().await {
            return Err(Error::NotConnected(binding.device_id.clone()));
        }

        debug!("Writing {:?} to {}", payload, endpoint);
        session.write(endpoint, payload).await
    }

    fn finish(&self, generation: u64) {
        let mut pending = self.pending_lock();
        if pending.as_ref().is_some_and(|(id, _)| *id == generation) {
            *pending = None;
        }
    }

    fn pending_lock(&self) -> MutexGuard<'_, Option<(u64, CancellationToken)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
