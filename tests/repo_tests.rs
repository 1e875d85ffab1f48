use defi_auth::models::NewAccount;
use defi_auth::repo::{inmem::InMemAccountRepo, AccountRepo, RepoError};

fn new_account(email: &str) -> NewAccount {
    NewAccount {
        id: uuid::Uuid::new_v4(),
        email: email.into(),
        full_name: "Test User".into(),
        password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA".into(),
    }
}

#[tokio::test]
async fn insert_get_find() {
    let r = InMemAccountRepo::new();
    assert!(r.is_empty());

    let a = r.insert_account(new_account("Mixed@Case.com")).await.unwrap();
    assert_eq!(a.email, "mixed@case.com");
    assert_eq!(r.get_account(a.id).await.unwrap(), a);
    assert_eq!(r.find_by_email("MIXED@case.com").await.unwrap(), Some(a.clone()));
    assert!(r.find_by_email("other@case.com").await.unwrap().is_none());
    assert!(matches!(r.get_account(uuid::Uuid::new_v4()).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn insert_keeps_caller_assigned_id() {
    let r = InMemAccountRepo::new();
    let new = new_account("a@x.com");
    let id = new.id;
    assert_eq!(r.insert_account(new).await.unwrap().id, id);
    assert_eq!(r.get_account(id).await.unwrap().email, "a@x.com");
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let r = InMemAccountRepo::new();
    r.insert_account(new_account("a@x.com")).await.unwrap();
    let err = r.insert_account(new_account("A@x.com")).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict));
    assert_eq!(r.len(), 1);
}

#[tokio::test]
async fn snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let r = InMemAccountRepo::with_snapshot_dir(dir.path());
        r.insert_account(new_account("a@x.com")).await.unwrap();
        r.insert_account(new_account("b@x.com")).await.unwrap().id
    };
    assert!(dir.path().join("accounts.json").exists());

    let reopened = InMemAccountRepo::with_snapshot_dir(dir.path());
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.get_account(id).await.unwrap().email, "b@x.com");
    // uniqueness survives too
    assert!(matches!(reopened.insert_account(new_account("B@X.com")).await, Err(RepoError::Conflict)));
}

#[tokio::test]
async fn corrupt_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("accounts.json"), b"{not json").unwrap();
    let r = InMemAccountRepo::with_snapshot_dir(dir.path());
    assert!(r.is_empty());
    r.insert_account(new_account("a@x.com")).await.unwrap();
    assert_eq!(InMemAccountRepo::with_snapshot_dir(dir.path()).len(), 1);
}
