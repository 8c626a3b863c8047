use super::*;
use crate::identity::ChallengeHandle;
use crate::identity::dev::DevIdentityService;
use crate::services::otp::{OtpPhase, OtpStep};
use crate::store::MemoryRecordStore;

fn registry() -> ClientRegistry {
    ClientRegistry::new(Arc::new(DevIdentityService::new()), Arc::new(MemoryRecordStore::new()))
}

// =============================================================================
// generate_token
// =============================================================================

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_two_calls_differ() {
    assert_ne!(generate_token(), generate_token());
}

// =============================================================================
// registry
// =============================================================================

/// A detached context that has been registered.
async fn registered(reg: &ClientRegistry) -> Arc<ClientContext> {
    let client = reg.detached();
    reg.insert(client.clone()).await;
    client
}

#[tokio::test]
async fn detached_context_is_not_registered() {
    let reg = registry();
    let client = reg.detached();
    assert_eq!(client.id.len(), 64);
    assert_eq!(reg.len().await, 0);
    assert!(reg.get(&client.id).await.is_none());
}

#[tokio::test]
async fn inserted_context_resolves_by_id() {
    let reg = registry();
    let client = registered(&reg).await;
    let found = reg.get(&client.id).await.unwrap();
    assert!(Arc::ptr_eq(&client, &found));
    assert!(reg.get("forged-token").await.is_none());
}

#[tokio::test]
async fn holds_state_once_an_intent_is_set() {
    let reg = registry();
    let client = reg.detached();
    assert!(!client.holds_state().await);
    client
        .navigate(Some(NavigationIntent::Login { phone_number: "9876543210".into() }))
        .await;
    assert!(client.holds_state().await);
}

#[tokio::test]
async fn remove_drops_context() {
    let reg = registry();
    let client = registered(&reg).await;
    assert!(reg.remove(&client.id).await);
    assert!(!reg.remove(&client.id).await);
    assert_eq!(reg.len().await, 0);
}

#[tokio::test]
async fn sweep_removes_only_idle_contexts() {
    let reg = registry();
    registered(&reg).await;
    assert_eq!(reg.sweep_idle(Duration::from_secs(60)).await, 0);
    assert_eq!(reg.sweep_idle(Duration::ZERO).await, 1);
    assert_eq!(reg.len().await, 0);
}

#[tokio::test]
async fn sweeper_task_empties_idle_registry() {
    let reg = registry();
    registered(&reg).await;
    registered(&reg).await;

    let sweeper = spawn_client_sweeper(reg.clone(), Duration::ZERO, Duration::from_secs(1));
    tokio::time::timeout(Duration::from_secs(5), async {
        while reg.len().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    sweeper.abort();
}

#[tokio::test]
async fn abandon_verification_returns_step_to_awaiting_code() {
    let reg = registry();
    let client = reg.detached();
    let mut step = OtpStep::new(Instant::now());
    step.begin_verify().unwrap();
    client
        .navigate(Some(NavigationIntent::Otp {
            phone_number: "+919876543210".into(),
            challenge: ChallengeHandle::new("challenge"),
            step,
        }))
        .await;

    client.abandon_verification();
    match client.nav().await.as_ref() {
        Some(NavigationIntent::Otp { step, .. }) => assert_eq!(step.phase(), OtpPhase::AwaitingCode),
        other => panic!("unexpected intent: {other:?}"),
    }
}

#[tokio::test]
async fn new_context_session_settles_signed_out() {
    let reg = registry();
    let client = reg.detached();
    let session = client.session(Duration::from_secs(2)).await;
    assert!(!session.is_loading);
    assert!(!session.is_authenticated);
}

#[tokio::test]
async fn navigate_replaces_intent() {
    let reg = registry();
    let client = reg.detached();
    assert!(client.nav().await.is_none());
    client
        .navigate(Some(NavigationIntent::Login { phone_number: "9876543210".into() }))
        .await;
    assert_eq!(client.nav().await.as_ref().map(NavigationIntent::name), Some("login"));
    client.navigate(None).await;
    assert!(client.nav().await.is_none());
}
