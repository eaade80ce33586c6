//! Connectivity observation, decoupled from any runtime event model.

use tokio::sync::watch;

/// Observable online/offline state.
///
/// The facade subscribes to trigger a sync pass when connectivity comes
/// back; integrators implement this over whatever event source their
/// platform provides.
pub trait ConnectivityObserver: Send + Sync {
    /// Current connectivity state.
    fn is_online(&self) -> bool;

    /// Subscribe to connectivity changes. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Channel-backed connectivity source.
///
/// Platform glue (or a test) pushes transitions in via [`set_online`].
///
/// [`set_online`]: ChannelConnectivity::set_online
pub struct ChannelConnectivity {
    tx: watch::Sender<bool>,
}

impl ChannelConnectivity {
    /// Create a connectivity source with the given initial state.
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    /// Report a connectivity transition.
    pub fn set_online(&self, online: bool) {
        // send_replace succeeds even with no subscribers.
        self.tx.send_replace(online);
    }
}

impl ConnectivityObserver for ChannelConnectivity {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
