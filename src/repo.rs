use std::sync::Arc;

use async_trait::async_trait;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait AccountRepo: Send + Sync {
    /// Insert a new account. The uniqueness check on the (case-insensitive)
    /// email and the insert are a single atomic step.
    async fn insert_account(&self, new: NewAccount) -> RepoResult<Account>;
    async fn get_account(&self, id: Id) -> RepoResult<Account>;
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<Account>>;
}

pub mod inmem {
    use super::*;
    use chrono::Utc;
    use dashmap::mapref::entry::Entry;
    use dashmap::DashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tracing::{info, warn};

    use crate::validation::email_key;

    pub const SNAPSHOT_FILE: &str = "accounts.json";

    /// In-memory account store keyed by case-folded email, with an optional
    /// JSON snapshot rewritten after every insert.
    #[derive(Clone, Default)]
    pub struct InMemAccountRepo {
        by_email: Arc<DashMap<String, Account>>,
        by_id: Arc<DashMap<Id, String>>,
        snapshot: Option<Arc<Snapshot>>,
    }

    struct Snapshot {
        path: PathBuf,
        write_lock: Mutex<()>,
    }

    impl InMemAccountRepo {
        pub fn new() -> Self {
            Self::default()
        }

        /// Back the repository with `<dir>/accounts.json`, loading any existing snapshot.
        pub fn with_snapshot_dir(dir: impl AsRef<Path>) -> Self {
            let path = dir.as_ref().join(SNAPSHOT_FILE);
            let repo = Self {
                snapshot: Some(Arc::new(Snapshot { path: path.clone(), write_lock: Mutex::new(()) })),
                ..Self::default()
            };
            for account in load_snapshot(&path) {
                repo.by_id.insert(account.id, account.email.clone());
                repo.by_email.insert(account.email.clone(), account);
            }
            repo
        }

        pub fn len(&self) -> usize {
            self.by_email.len()
        }

        pub fn is_empty(&self) -> bool {
            self.by_email.is_empty()
        }

        fn persist(&self) {
            let Some(snapshot) = &self.snapshot else { return };
            let _guard = snapshot.write_lock.lock().unwrap_or_else(|p| p.into_inner());
            let mut accounts: Vec<Account> = self.by_email.iter().map(|e| e.value().clone()).collect();
            accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            let bytes = match serde_json::to_vec_pretty(&accounts) {
                Ok(b) => b,
                Err(e) => { warn!("failed to encode account snapshot: {e}"); return; }
            };
            if let Some(dir) = snapshot.path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            let tmp = snapshot.path.with_extension("json.tmp");
            if let Err(e) = std::fs::write(&tmp, bytes).and_then(|_| std::fs::rename(&tmp, &snapshot.path)) {
                warn!("failed to write account snapshot '{}': {e}", snapshot.path.display());
            }
        }
    }

    fn load_snapshot(path: &Path) -> Vec<Account> {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<Vec<Account>>(&bytes) {
                Ok(accounts) => {
                    info!("loaded {} accounts from '{}'", accounts.len(), path.display());
                    accounts
                }
                Err(e) => {
                    warn!("failed to parse account snapshot '{}': {e}. Starting empty.", path.display());
                    Vec::new()
                }
            },
            Err(e) => {
                info!("no account snapshot at '{}' ({e}), starting empty", path.display());
                Vec::new()
            }
        }
    }

    #[async_trait]
    impl AccountRepo for InMemAccountRepo {
        async fn insert_account(&self, new: NewAccount) -> RepoResult<Account> {
            let key = email_key(&new.email);
            let account = match self.by_email.entry(key.clone()) {
                Entry::Occupied(_) => return Err(RepoError::Conflict),
                Entry::Vacant(slot) => {
                    let account = Account {
                        id: new.id,
                        email: key.clone(),
                        full_name: new.full_name,
                        password_hash: new.password_hash,
                        created_at: Utc::now(),
                    };
                    slot.insert(account.clone());
                    account
                }
            };
            self.by_id.insert(account.id, key);
            self.persist();
            Ok(account)
        }

        async fn get_account(&self, id: Id) -> RepoResult<Account> {
            let email = self.by_id.get(&id).map(|e| e.value().clone()).ok_or(RepoError::NotFound)?;
            self.by_email.get(&email).map(|a| a.value().clone()).ok_or(RepoError::NotFound)
        }

        async fn find_by_email(&self, email: &str) -> RepoResult<Option<Account>> {
            Ok(self.by_email.get(&email_key(email)).map(|a| a.value().clone()))
        }
    }
}
