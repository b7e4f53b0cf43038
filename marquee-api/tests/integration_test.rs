use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use marquee_api::middleware::auth::SessionClaims;
use marquee_api::webhooks::StripeWebhook;
use marquee_catalog::{InMemoryCatalog, SellableUnit};
use marquee_reserve::{HoldState, InMemoryLedger, ManualClock, ReservationManager, ReserveError};
use std::sync::Arc;
use uuid::Uuid;

struct Checkout {
    manager: Arc<ReservationManager>,
    clock: ManualClock,
    event_id: Uuid,
    ga_unit_id: Uuid,
    vip_unit_id: Uuid,
}

fn checkout_fixture() -> Checkout {
    let event_id = Uuid::new_v4();
    let ga = SellableUnit::general_admission(event_id, "Floor", "GA", 100, 6500);
    let vip = SellableUnit::seat(event_id, "VIP", "A", "1", "A-1-1", 25000);
    let ga_unit_id = ga.id;
    let vip_unit_id = vip.id;

    let clock = ManualClock::new(Utc::now());
    let manager = Arc::new(ReservationManager::new(
        Arc::new(InMemoryCatalog::new(vec![ga, vip])),
        Arc::new(InMemoryLedger::new()),
        Arc::new(clock.clone()),
        Duration::seconds(600),
    ));

    Checkout {
        manager,
        clock,
        event_id,
        ga_unit_id,
        vip_unit_id,
    }
}

#[tokio::test]
async fn test_browse_hold_pay_flow() {
    let fx = checkout_fixture();

    // Browse: two tiers listed with full availability
    let tiers = fx.manager.list_tier_availability(fx.event_id).await.unwrap();
    assert_eq!(tiers.len(), 2);
    let floor = tiers.iter().find(|t| t.tier_name == "Floor").unwrap();
    assert_eq!(floor.available_quantity, 100);

    // Hold two GA spots
    let hold = fx
        .manager
        .request_hold(fx.ga_unit_id, "guest-1", 2)
        .await
        .unwrap();
    assert_eq!(hold.state, HoldState::Active);

    let snapshot = fx.manager.unit_availability(fx.ga_unit_id).await.unwrap();
    assert_eq!(snapshot.available_quantity, 98);

    // Payment succeeded: confirm keeps the quantity reserved permanently
    let confirmed = fx.manager.confirm_hold(hold.id, "guest-1").await.unwrap();
    assert_eq!(confirmed.state, HoldState::Confirmed);

    let snapshot = fx.manager.unit_availability(fx.ga_unit_id).await.unwrap();
    assert_eq!(snapshot.available_quantity, 98);
}

#[tokio::test]
async fn test_abandoned_checkout_frees_capacity() {
    let fx = checkout_fixture();

    let hold = fx
        .manager
        .request_hold(fx.vip_unit_id, "guest-1", 1)
        .await
        .unwrap();

    // The seat is gone for everyone else
    let err = fx
        .manager
        .request_hold(fx.vip_unit_id, "guest-2", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ReserveError::InsufficientAvailability { .. }));

    // Buyer walks away; TTL elapses with no reaper run
    fx.clock.advance(Duration::seconds(601));

    let snapshot = fx.manager.unit_availability(fx.vip_unit_id).await.unwrap();
    assert_eq!(snapshot.available_quantity, 1);

    // Late payment cannot resurrect the hold
    let err = fx.manager.confirm_hold(hold.id, "guest-1").await.unwrap_err();
    assert!(matches!(err, ReserveError::Expired));

    // The seat goes to the next buyer
    let rebooked = fx
        .manager
        .request_hold(fx.vip_unit_id, "guest-2", 1)
        .await
        .unwrap();
    assert_eq!(rebooked.state, HoldState::Active);
}

#[tokio::test]
async fn test_cancelled_checkout_releases_hold() {
    let fx = checkout_fixture();

    let hold = fx
        .manager
        .request_hold(fx.ga_unit_id, "guest-1", 5)
        .await
        .unwrap();
    assert_eq!(
        fx.manager
            .unit_availability(fx.ga_unit_id)
            .await
            .unwrap()
            .available_quantity,
        95
    );

    let released = fx.manager.release_hold(hold.id, "guest-1").await.unwrap();
    assert_eq!(released.state, HoldState::Released);
    assert_eq!(
        fx.manager
            .unit_availability(fx.ga_unit_id)
            .await
            .unwrap()
            .available_quantity,
        100
    );

    // Cancel button pressed twice: still a success
    let again = fx.manager.release_hold(hold.id, "guest-1").await.unwrap();
    assert_eq!(again.state, HoldState::Released);
}

#[tokio::test]
async fn test_owner_history_spans_terminal_states() {
    let fx = checkout_fixture();

    let kept = fx
        .manager
        .request_hold(fx.ga_unit_id, "guest-1", 1)
        .await
        .unwrap();
    let dropped = fx
        .manager
        .request_hold(fx.ga_unit_id, "guest-1", 2)
        .await
        .unwrap();

    fx.manager.confirm_hold(kept.id, "guest-1").await.unwrap();
    fx.manager.release_hold(dropped.id, "guest-1").await.unwrap();

    let history = fx.manager.holds_for_owner("guest-1").await.unwrap();
    assert_eq!(history.len(), 2);

    let states: Vec<HoldState> = history.iter().map(|h| h.state).collect();
    assert!(states.contains(&HoldState::Confirmed));
    assert!(states.contains(&HoldState::Released));
}

#[test]
fn test_session_token_round_trip() {
    let secret = "test-secret";
    let claims = SessionClaims {
        sub: format!("guest-{}", Uuid::new_v4()),
        email: None,
        role: "GUEST".to_owned(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    let decoded = decode::<SessionClaims>(
        &token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .unwrap();

    assert_eq!(decoded.claims.sub, claims.sub);
    assert_eq!(decoded.claims.role, "GUEST");
}

#[test]
fn test_stripe_webhook_payload_parses() {
    let hold_id = Uuid::new_v4();
    let body = format!(
        r#"{{
            "id": "evt_123",
            "type": "payment_intent.succeeded",
            "data": {{
                "object": {{
                    "id": "pi_456",
                    "status": "succeeded",
                    "metadata": {{
                        "hold_id": "{}",
                        "owner_id": "guest-abc"
                    }}
                }}
            }}
        }}"#,
        hold_id
    );

    let webhook: StripeWebhook = serde_json::from_str(&body).unwrap();
    assert_eq!(webhook.type_, "payment_intent.succeeded");

    let metadata = webhook.data.object.metadata.unwrap();
    assert_eq!(
        metadata.get("hold_id").and_then(|v| v.as_str()).unwrap(),
        hold_id.to_string()
    );
}
