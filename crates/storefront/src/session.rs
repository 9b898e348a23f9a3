//! Session-state provider.
//!
//! The cart manager never reads the auth flag itself; it subscribes to a
//! [`SessionProvider`], which the auth flow drives directly on login/logout.
//! A polling safety net re-checks a shared boolean flag slot (the analog of
//! another tab flipping `is_authenticated`) at a fixed interval and
//! republishes any transition it observes.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Whether the session is a guest or an authenticated one.
///
/// Exactly one mode is active at a time; transitions are owned by the auth
/// subsystem, observed by the cart manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    #[default]
    Guest,
    Authenticated,
}

/// Publishes session mode transitions to subscribers.
///
/// The provider is the only writer; consumers hold `watch` receivers.
#[derive(Debug)]
pub struct SessionProvider {
    tx: watch::Sender<SessionMode>,
}

impl SessionProvider {
    /// Create a provider starting in the given mode.
    #[must_use]
    pub fn new(initial: SessionMode) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Subscribe to session mode changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionMode> {
        self.tx.subscribe()
    }

    /// Current session mode.
    #[must_use]
    pub fn mode(&self) -> SessionMode {
        *self.tx.borrow()
    }

    /// Publish a mode; subscribers are only woken on an actual transition.
    pub fn set_mode(&self, mode: SessionMode) {
        self.tx.send_if_modified(|current| {
            if *current == mode {
                false
            } else {
                debug!(?mode, "session mode transition");
                *current = mode;
                true
            }
        });
    }

    /// Convenience for auth flows reporting a boolean status.
    pub fn set_authenticated(&self, authenticated: bool) {
        self.set_mode(if authenticated {
            SessionMode::Authenticated
        } else {
            SessionMode::Guest
        });
    }

    /// Spawn the polling safety net.
    ///
    /// `probe` is called every `interval`; its result is republished through
    /// the provider. Direct `set_mode` calls remain the primary signal, the
    /// poll only catches flag flips made outside this process.
    pub fn spawn_flag_poll<F>(&self, interval: Duration, probe: F) -> JoinHandle<()>
    where
        F: Fn() -> bool + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let mode = if probe() {
                    SessionMode::Authenticated
                } else {
                    SessionMode::Guest
                };
                tx.send_if_modified(|current| {
                    if *current == mode {
                        false
                    } else {
                        debug!(?mode, "session mode transition (poll)");
                        *current = mode;
                        true
                    }
                });
            }
        })
    }
}

impl Default for SessionProvider {
    fn default() -> Self {
        Self::new(SessionMode::Guest)
    }
}

// =============================================================================
// FlagSlot
// =============================================================================

/// The shared "is authenticated" boolean slot.
///
/// A plain file holding `true` or `false`, writable by the auth flow and
/// readable by any process's poll probe. The cart manager never touches it.
#[derive(Debug, Clone)]
pub struct FlagSlot {
    path: PathBuf,
}

impl FlagSlot {
    /// Create a slot backed by the given file path.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the flag. A missing or unreadable slot reads as `false`.
    #[must_use]
    pub fn read(&self) -> bool {
        std::fs::read_to_string(&self.path)
            .map(|text| text.trim() == "true")
            .unwrap_or(false)
    }

    /// Write the flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    pub fn write(&self, authenticated: bool) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, if authenticated { "true" } else { "false" })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_mode_notifies_on_transition() {
        let provider = SessionProvider::default();
        let mut rx = provider.subscribe();
        assert_eq!(*rx.borrow_and_update(), SessionMode::Guest);

        provider.set_authenticated(true);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionMode::Authenticated);
    }

    #[test]
    fn test_set_mode_idempotent_no_wakeup() {
        let provider = SessionProvider::default();
        let mut rx = provider.subscribe();
        rx.borrow_and_update();

        // Re-publishing the current mode is not a transition
        provider.set_authenticated(false);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_flag_slot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FlagSlot::new(dir.path().join("is_authenticated"));

        // Missing slot reads false
        assert!(!slot.read());

        slot.write(true).unwrap();
        assert!(slot.read());

        slot.write(false).unwrap();
        assert!(!slot.read());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_poll_publishes_transition() {
        let provider = SessionProvider::default();
        let mut rx = provider.subscribe();
        rx.borrow_and_update();

        let handle = provider.spawn_flag_poll(Duration::from_secs(2), || true);

        // First tick fires immediately; paused time lets it run deterministically
        tokio::time::advance(Duration::from_millis(10)).await;
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionMode::Authenticated);

        handle.abort();
    }
}
