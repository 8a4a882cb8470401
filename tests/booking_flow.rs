// Full booking lifecycle against a real Postgres instance: create a booking,
// raise a payment order, verify the capture signature, then check members in
// at the door. Run with a disposable database:
//
//   TEST_DATABASE_URL=postgres://... cargo test -- --ignored

use bigdecimal::BigDecimal;
use chrono::Utc;
use fusionx_bookings::models::{
    Booking, BookingMember, CreateBookingRequest, Payment, TransactionLog,
};
use fusionx_bookings::services::analytics::{AnalyticsFilter, AnalyticsService};
use fusionx_bookings::services::checkin::{CheckInError, CheckInService, ValidateRequest};
use fusionx_bookings::services::payments::{PaymentService, VerifyPaymentRequest};
use fusionx_bookings::services::{ClientMeta, PaymentGateway};
use sqlx::PgPool;
use uuid::Uuid;

async fn setup_test_db() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("TEST_DATABASE_URL must be set for integration tests");
    let pool = PgPool::connect(&url).await.expect("connect test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}

fn test_gateway() -> PaymentGateway {
    PaymentGateway::with_credentials(
        "rzp_test_key".to_string(),
        "integration-test-secret".to_string(),
        "http://localhost:1".to_string(),
    )
}

async fn create_test_event(pool: &PgPool, capacity: i32) -> (Uuid, String) {
    let event_id = Uuid::new_v4();
    let title = format!("Test Event {}", &event_id.to_string()[..8]);
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO events (
            id, title, start_date, end_date, base_price, current_price,
            price_step, price_step_every, sold_out, status, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, 500, 500, 50, 10, false, 'active', $5, $5)
        "#,
    )
    .bind(event_id)
    .bind(&title)
    .bind(now)
    .bind(now + chrono::Duration::days(1))
    .bind(now)
    .execute(pool)
    .await
    .expect("insert test event");

    sqlx::query(
        r#"
        INSERT INTO event_tiers (id, event_id, name, price, capacity, booked)
        VALUES ($1, $2, 'standard', 500, $3, 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event_id)
    .bind(capacity)
    .execute(pool)
    .await
    .expect("insert test tier");

    (event_id, title)
}

fn booking_request(event_id: Uuid, members: usize) -> CreateBookingRequest {
    let suffix = Uuid::new_v4().simple().to_string();
    CreateBookingRequest {
        event_id,
        selected_date: "2026-09-12".to_string(),
        selected_time: "19:00".to_string(),
        price_tier: "standard".to_string(),
        total_amount: BigDecimal::from(500 * members as i64),
        members: (0..members)
            .map(|i| BookingMember {
                name: format!("Guest {}", i + 1),
                email: Some(format!("guest{}+{}@example.com", i + 1, suffix)),
                phone: None,
                member_code: None,
            })
            .collect(),
        contact_name: "Lead Guest".to_string(),
        contact_email: format!("lead+{}@example.com", suffix),
        contact_phone: "+919876543210".to_string(),
        notes: None,
    }
}

async fn cleanup_test_event(pool: &PgPool, event_id: Uuid) {
    sqlx::query("DELETE FROM attendance WHERE event_id = $1")
        .bind(event_id)
        .execute(pool)
        .await
        .ok();
    sqlx::query(
        "DELETE FROM transaction_logs WHERE booking_id IN (SELECT id FROM bookings WHERE event_id = $1)",
    )
    .bind(event_id)
    .execute(pool)
    .await
    .ok();
    sqlx::query(
        "DELETE FROM payments WHERE booking_id IN (SELECT id FROM bookings WHERE event_id = $1)",
    )
    .bind(event_id)
    .execute(pool)
    .await
    .ok();
    sqlx::query("DELETE FROM bookings WHERE event_id = $1")
        .bind(event_id)
        .execute(pool)
        .await
        .ok();
    sqlx::query("DELETE FROM event_tiers WHERE event_id = $1")
        .bind(event_id)
        .execute(pool)
        .await
        .ok();
    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(pool)
        .await
        .ok();
}

#[tokio::test]
#[ignore = "requires a Postgres test database"]
async fn booking_to_checkin_happy_path() {
    let pool = setup_test_db().await;
    let (event_id, _title) = create_test_event(&pool, 10).await;
    let gateway = test_gateway();
    let payments = PaymentService::new(gateway.clone());

    let booking = Booking::create(&pool, booking_request(event_id, 3))
        .await
        .expect("create booking");
    assert_eq!(booking.status, "pending");
    assert_eq!(booking.payment_status, "pending");
    assert_eq!(booking.members.0.len(), 3);
    assert_eq!(
        booking.members.0[0].member_code.as_deref(),
        Some(format!("{}-01", booking.code).as_str())
    );

    // Payment order raised out of band; simulate the gateway's order record.
    let order_id = format!("order_{}", Uuid::new_v4().simple());
    Payment::create(&pool, booking.id, &order_id, 150_000, "INR")
        .await
        .expect("create payment");

    let signature = gateway.compute_signature(&order_id, "pay_test_1");
    let confirmed = payments
        .verify_payment(
            &pool,
            &VerifyPaymentRequest {
                gateway_order_id: order_id.clone(),
                gateway_payment_id: "pay_test_1".to_string(),
                gateway_signature: signature,
            },
            ClientMeta::default(),
        )
        .await
        .expect("verify payment");

    assert!(confirmed.is_confirmed_sale());

    let success_logs = TransactionLog::count_by_type(&pool, booking.id, "payment_success")
        .await
        .unwrap();
    assert_eq!(success_logs, 1);

    // A second capture of the same payment row must be refused.
    let payment = Payment::find_by_order_id(&pool, &order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, "completed");
    assert!(payment
        .mark_completed(&pool, "pay_test_1", "resubmitted")
        .await
        .is_err());

    // Door check-in for the second member, using their own address.
    let member = &confirmed.members.0[1];
    let result = CheckInService::validate(
        &pool,
        &ValidateRequest {
            member_code: member.member_code.clone().unwrap(),
            email: member.email.clone().unwrap(),
        },
        "door-1",
        ClientMeta::default(),
    )
    .await
    .expect("check in member");
    assert_eq!(result.booking_code, confirmed.code);

    // Second scan of the same code must be refused.
    let dup = CheckInService::validate(
        &pool,
        &ValidateRequest {
            member_code: member.member_code.clone().unwrap(),
            email: member.email.clone().unwrap(),
        },
        "door-2",
        ClientMeta::default(),
    )
    .await;
    assert!(matches!(dup, Err(CheckInError::AlreadyCheckedIn)));

    // The confirmed sale shows up in revenue; the range filter pins the event.
    let summary = AnalyticsService::revenue_summary(
        &pool,
        &AnalyticsFilter {
            event_id: Some(event_id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(summary.confirmed_bookings, 1);
    assert_eq!(summary.total_members, 3);
    assert_eq!(summary.total_revenue, BigDecimal::from(1500));

    cleanup_test_event(&pool, event_id).await;
}

#[tokio::test]
#[ignore = "requires a Postgres test database"]
async fn tampered_signature_leaves_booking_pending() {
    let pool = setup_test_db().await;
    let (event_id, _title) = create_test_event(&pool, 10).await;
    let gateway = test_gateway();
    let payments = PaymentService::new(gateway.clone());

    let booking = Booking::create(&pool, booking_request(event_id, 2))
        .await
        .expect("create booking");

    let order_id = format!("order_{}", Uuid::new_v4().simple());
    Payment::create(&pool, booking.id, &order_id, 100_000, "INR")
        .await
        .expect("create payment");

    let result = payments
        .verify_payment(
            &pool,
            &VerifyPaymentRequest {
                gateway_order_id: order_id.clone(),
                gateway_payment_id: "pay_test_2".to_string(),
                gateway_signature: "deadbeef".repeat(8),
            },
            ClientMeta::default(),
        )
        .await;
    assert!(result.is_err());

    // The attempt is recorded as failed but the booking itself is untouched.
    let payment = Payment::find_by_order_id(&pool, &order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, "failed");

    let booking = Booking::find_by_id(&pool, booking.id).await.unwrap().unwrap();
    assert_eq!(booking.status, "pending");
    assert_eq!(booking.payment_status, "pending");
    assert!(!booking.is_confirmed_sale());

    let failed_logs = TransactionLog::count_by_type(&pool, booking.id, "payment_failed")
        .await
        .unwrap();
    assert_eq!(failed_logs, 1);

    cleanup_test_event(&pool, event_id).await;
}

#[tokio::test]
#[ignore = "requires a Postgres test database"]
async fn unpaid_booking_cannot_check_in() {
    let pool = setup_test_db().await;
    let (event_id, _title) = create_test_event(&pool, 10).await;

    let booking = Booking::create(&pool, booking_request(event_id, 1))
        .await
        .expect("create booking");
    let member = &booking.members.0[0];

    let result = CheckInService::validate(
        &pool,
        &ValidateRequest {
            member_code: member.member_code.clone().unwrap(),
            email: member.email.clone().unwrap(),
        },
        "door-1",
        ClientMeta::default(),
    )
    .await;
    assert!(matches!(result, Err(CheckInError::NotPaid)));

    cleanup_test_event(&pool, event_id).await;
}

#[tokio::test]
#[ignore = "requires a Postgres test database"]
async fn revenue_reports_count_only_settled_sales() {
    let pool = setup_test_db().await;
    let (event_id, _title) = create_test_event(&pool, 10).await;

    // One booking per (status, payment_status) combination. Only the
    // confirmed+paid row is realized revenue; the rest sum to 7500.
    let grid: &[(&str, &str, i64)] = &[
        ("pending", "pending", 500),
        ("pending", "paid", 1000),
        ("pending", "failed", 750),
        ("pending", "refunded", 1250),
        ("confirmed", "pending", 1500),
        ("confirmed", "paid", 2500),
        ("confirmed", "failed", 1000),
        ("confirmed", "refunded", 1500),
    ];

    for (status, payment_status, amount) in grid {
        let booking = Booking::create(&pool, booking_request(event_id, 1))
            .await
            .expect("create booking");
        sqlx::query(
            "UPDATE bookings SET status = $1, payment_status = $2, total_amount = $3 WHERE id = $4",
        )
        .bind(status)
        .bind(payment_status)
        .bind(BigDecimal::from(*amount))
        .bind(booking.id)
        .execute(&pool)
        .await
        .expect("seed booking state");
    }

    let filter = AnalyticsFilter {
        event_id: Some(event_id),
        ..Default::default()
    };

    let summary = AnalyticsService::revenue_summary(&pool, &filter).await.unwrap();
    assert_eq!(summary.total_revenue, BigDecimal::from(2500));
    assert_eq!(summary.confirmed_bookings, 1);
    assert_eq!(summary.total_members, 1);

    // The trend only carries the settled row too; everything was created in
    // the current month.
    let trend = AnalyticsService::monthly_trend(&pool, &filter).await.unwrap();
    let trend_revenue = trend
        .iter()
        .fold(BigDecimal::from(0), |acc, m| acc + &m.revenue);
    assert_eq!(trend_revenue, BigDecimal::from(2500));
    assert_eq!(trend.iter().map(|m| m.confirmed_bookings).sum::<i64>(), 1);

    let ranked = AnalyticsService::event_ranking(&pool, &AnalyticsFilter::default())
        .await
        .unwrap();
    let row = ranked
        .iter()
        .find(|r| r.event_id == event_id)
        .expect("settled event in ranking");
    assert_eq!(row.revenue, BigDecimal::from(2500));
    assert_eq!(row.confirmed_bookings, 1);

    // The breakdown keeps every row visible, counts and amounts alike.
    let breakdown = AnalyticsService::payment_status_breakdown(&pool, &filter)
        .await
        .unwrap();
    assert_eq!(breakdown.len(), 4);
    for row in &breakdown {
        let (bookings, amount) = match row.payment_status.as_str() {
            "pending" => (2, 2000),
            "paid" => (2, 3500),
            "failed" => (2, 1750),
            "refunded" => (2, 2750),
            other => panic!("unexpected payment status {}", other),
        };
        assert_eq!(row.bookings, bookings, "{}", row.payment_status);
        assert_eq!(
            row.total_amount,
            BigDecimal::from(amount),
            "{}",
            row.payment_status
        );
    }

    cleanup_test_event(&pool, event_id).await;
}

#[tokio::test]
#[ignore = "requires a Postgres test database"]
async fn tier_capacity_is_never_oversold() {
    let pool = setup_test_db().await;
    let (event_id, _title) = create_test_event(&pool, 5).await;

    let first = Booking::create(&pool, booking_request(event_id, 4)).await;
    assert!(first.is_ok());

    // Only one seat left; a party of two must be refused and capacity held.
    let second = Booking::create(&pool, booking_request(event_id, 2)).await;
    assert!(second.is_err());

    let third = Booking::create(&pool, booking_request(event_id, 1)).await;
    assert!(third.is_ok());

    cleanup_test_event(&pool, event_id).await;
}
