//! Credential file watcher for hot reload.

use std::path::PathBuf;
use std::sync::Arc;

#[cfg(target_os = "linux")]
use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::auth::htpasswd::HtpasswdStore;

/// Reloads an [`HtpasswdStore`] whenever its file changes on disk.
///
/// The parent directory is watched rather than the file itself so that
/// editors that replace the file by rename are still picked up. A rewrite in
/// place only triggers a reload once the writer closes the file, so the
/// truncation at its start never loads an empty table.
pub struct CredentialWatcher {
    store: Arc<HtpasswdStore>,
}

impl CredentialWatcher {
    pub fn new(store: Arc<HtpasswdStore>) -> Self {
        Self { store }
    }

    /// Start watching in the background. The returned watcher stops on drop.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let file = self.store.path().to_path_buf();
        let dir = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let store = self.store;
        let target = file.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !triggers_reload(&event.kind) {
                        return;
                    }
                    if !event.paths.iter().any(|p| p.file_name() == target.file_name()) {
                        return;
                    }
                    match store.reload() {
                        Ok(users) => {
                            tracing::info!(
                                path = %target.display(),
                                users,
                                "Credential file reloaded"
                            );
                        }
                        Err(e) => {
                            tracing::error!(
                                error = %e,
                                "Failed to reload credential file, keeping current users"
                            );
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Credential watch error"),
            },
            Config::default(),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %file.display(), "Credential watcher started");
        Ok(watcher)
    }
}

/// Events after which the file holds its complete new content.
#[cfg(target_os = "linux")]
fn triggers_reload(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Access(AccessKind::Close(AccessMode::Write))
            | EventKind::Modify(ModifyKind::Name(_))
    )
}

/// Backends without close events only report modifications.
#[cfg(not(target_os = "linux"))]
fn triggers_reload(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Modify(_) | EventKind::Create(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialStore;
    use std::io::Write;
    use std::time::Duration;

    const ALICE: &str = "alice:{SHA}5en6G6MezRroT3XKqkdPOmY/BfQ=\n";

    async fn eventually(store: &HtpasswdStore, user: &str, secret: &str) -> bool {
        for _ in 0..50 {
            if store.verify(user, secret) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }

    #[tokio::test]
    async fn reloads_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchman.passwd");
        std::fs::write(&path, "").unwrap();

        let store = Arc::new(HtpasswdStore::open(&path).unwrap());
        let _watcher = CredentialWatcher::new(store.clone()).run().unwrap();

        std::fs::write(&path, ALICE).unwrap();

        assert!(
            eventually(&store, "alice", "secret").await,
            "store should pick up the new user"
        );
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn truncation_does_not_drop_users_mid_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchman.passwd");
        std::fs::write(&path, ALICE).unwrap();

        let store = Arc::new(HtpasswdStore::open(&path).unwrap());
        let _watcher = CredentialWatcher::new(store.clone()).run().unwrap();

        // Truncate and hold the file open, as a writer does while rewriting.
        let mut file = std::fs::File::create(&path).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(store.verify("alice", "secret"));

        file.write_all(b"bob:{SHA}5en6G6MezRroT3XKqkdPOmY/BfQ=\n").unwrap();
        drop(file);

        assert!(eventually(&store, "bob", "secret").await);
        assert!(!store.verify("alice", "secret"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn reload_waits_for_complete_writes() {
        use notify::event::{CreateKind, DataChange, RenameMode};

        assert!(triggers_reload(&EventKind::Access(AccessKind::Close(
            AccessMode::Write
        ))));
        assert!(triggers_reload(&EventKind::Modify(ModifyKind::Name(
            RenameMode::To
        ))));
        assert!(!triggers_reload(&EventKind::Modify(ModifyKind::Data(
            DataChange::Any
        ))));
        assert!(!triggers_reload(&EventKind::Create(CreateKind::File)));
        assert!(!triggers_reload(&EventKind::Access(AccessKind::Open(
            AccessMode::Any
        ))));
    }
}
