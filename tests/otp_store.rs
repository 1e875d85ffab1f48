use chrono::Duration;
use defi_auth::otp_store::{digest_code, InMemOtpStore, OtpStore};

#[tokio::test]
async fn put_get_remove() {
    let s = InMemOtpStore::new();
    assert!(s.get("a@x.com").await.unwrap().is_none());

    let rec = s.put("a@x.com", "123456", Duration::minutes(5)).await.unwrap();
    assert_eq!(rec.code_digest, digest_code("123456"));
    assert_ne!(rec.code_digest, "123456", "code must not be stored in plaintext");
    assert_eq!(rec.expires_at - rec.issued_at, Duration::minutes(5));

    let got = s.get("a@x.com").await.unwrap().expect("record");
    assert_eq!(got, rec);
    assert!(got.matches("123456"));
    assert!(!got.matches("654321"));

    assert!(s.remove("a@x.com").await.unwrap());
    assert!(!s.remove("a@x.com").await.unwrap());
    assert!(s.get("a@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn put_replaces_previous_record() {
    let s = InMemOtpStore::new();
    s.put("a@x.com", "111111", Duration::minutes(5)).await.unwrap();
    s.put("a@x.com", "222222", Duration::minutes(5)).await.unwrap();
    let got = s.get("a@x.com").await.unwrap().unwrap();
    assert!(got.matches("222222"));
    assert!(!got.matches("111111"));
    assert_eq!(s.len(), 1);
}

#[tokio::test]
async fn identities_are_isolated() {
    let s = InMemOtpStore::new();
    s.put("a@x.com", "111111", Duration::minutes(5)).await.unwrap();
    s.put("b@x.com", "222222", Duration::minutes(5)).await.unwrap();
    s.remove("a@x.com").await.unwrap();
    assert!(s.get("b@x.com").await.unwrap().unwrap().matches("222222"));
}

#[tokio::test]
async fn expired_get_is_absent_and_evicts() {
    let s = InMemOtpStore::new();
    s.put("a@x.com", "123456", Duration::milliseconds(30)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(60)).await;
    assert!(s.get("a@x.com").await.unwrap().is_none());
    assert!(s.is_empty(), "stale record removed as a side effect");
}

#[tokio::test]
async fn consume_only_removes_the_expected_record() {
    let s = InMemOtpStore::new();
    let old = s.put("a@x.com", "111111", Duration::minutes(5)).await.unwrap();
    let new = s.put("a@x.com", "222222", Duration::minutes(5)).await.unwrap();

    assert!(!s.consume("a@x.com", &old).await.unwrap(), "superseded record cannot be consumed");
    assert!(s.consume("a@x.com", &new).await.unwrap());
    assert!(!s.consume("a@x.com", &new).await.unwrap(), "second consume finds nothing");
    assert!(s.is_empty());
}

#[tokio::test]
async fn purge_drops_only_expired() {
    let s = InMemOtpStore::new();
    s.put("old@x.com", "111111", Duration::milliseconds(10)).await.unwrap();
    s.put("live@x.com", "222222", Duration::minutes(5)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    assert_eq!(s.purge_expired().await.unwrap(), 1);
    assert_eq!(s.len(), 1);
    assert!(s.get("live@x.com").await.unwrap().is_some());
}
