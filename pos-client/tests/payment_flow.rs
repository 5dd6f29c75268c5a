//! Cashier and courier payments against the fake backend

mod common;

use common::{Backend, TestServer, notices, order_json};
use pos_client::screens::cashier::PayOutcome;
use pos_client::screens::delivery::active_deliveries;
use pos_client::screens::keys;
use pos_client::{CashierScreen, DeliveryScreen, ErrorCode};
use rust_decimal::Decimal;
use serde_json::json;
use shared::models::{Order, OrderStatus, PaymentMethod};

fn order(value: serde_json::Value) -> Order {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_cash_payment_loads_receipt() {
    let server = TestServer::start(Backend {
        orders: vec![order_json(7, "ready", "dine_in")],
        ..Default::default()
    })
    .await;
    let ctx = server.context();
    let cashier = CashierScreen::new(ctx.clone());
    let ready = ctx.api().ready_orders().await.unwrap();
    ctx.cache().set(&keys::ready_orders(), ready);
    cashier.select(cashier.ready_orders()[0].clone());

    assert_eq!(
        cashier.change_for(PaymentMethod::Cash, Some(Decimal::from(50000))),
        Decimal::from(20000)
    );
    let outcome = cashier
        .pay("cash", Some(Decimal::from(50000)), None)
        .await
        .unwrap();

    match outcome {
        PayOutcome::Paid {
            order_id,
            change,
            receipt,
        } => {
            assert_eq!(order_id, 7);
            assert_eq!(change, Decimal::from(20000));
            assert_eq!(receipt.unwrap().check_number.as_deref(), Some("C-7"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(ctx.cache().is_stale(&keys::ready_orders()));
    let posts = server.posts();
    assert_eq!(posts.len(), 1);
    let (path, body) = &posts[0];
    assert_eq!(path, "orders/7/process_payment/");
    assert_eq!(body["method"], "cash");
    assert_eq!(body["received_amount"].as_f64(), Some(50000.0));
    assert!(body.get("mobile_provider").is_none());
}

#[tokio::test]
async fn test_payment_validation() {
    let server = TestServer::start(Backend {
        orders: vec![order_json(7, "ready", "dine_in")],
        ..Default::default()
    })
    .await;
    let ctx = server.context();
    let cashier = CashierScreen::new(ctx.clone());

    // nothing selected
    assert!(cashier.pay("card", None, None).await.is_err());

    cashier.select(order(order_json(7, "ready", "dine_in")));
    let err = cashier
        .pay("cash", Some(Decimal::from(1000)), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PaymentInsufficientAmount);
    assert!(cashier.payment_error().is_some());

    let err = cashier.pay("mobile", None, Some(" ")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::PaymentProviderRequired);

    let err = cashier.pay("cheque", None, None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::PaymentInvalidMethod);

    assert!(server.posts().is_empty());
}

#[tokio::test]
async fn test_closing_receipt_frees_table() {
    let mut paid = order_json(7, "completed", "dine_in");
    paid["table"] = json!({"name": "T4"});
    paid["payment"] = json!({"id": 1, "method": "card", "timestamp": "2025-03-01T12:00:00Z"});
    let server = TestServer::start(Backend {
        orders: vec![paid.clone()],
        ..Default::default()
    })
    .await;
    let ctx = server.context();
    let cashier = CashierScreen::new(ctx.clone());
    ctx.cache().set(&keys::payment_history(), vec![order(paid.clone())]);

    cashier.select(order(paid));
    let outcome = cashier.pay("card", None, None).await.unwrap();
    assert!(matches!(outcome, PayOutcome::AlreadyPaid { order_id: 7, receipt: Some(_) }));
    assert!(server.posts().is_empty());

    let mut rx = ctx.subscribe();
    let freed = cashier.close_receipt().unwrap();
    assert_eq!(freed.as_deref(), Some("Table T4 is now free"));
    assert!(cashier.selected().is_none());
    assert!(cashier.receipt().is_none());
    let messages: Vec<String> = notices(&mut rx).into_iter().map(|n| n.message).collect();
    assert!(messages.contains(&"Table T4 is now free".to_string()));

    // nothing left to close
    assert!(cashier.close_receipt().is_err());
}

#[tokio::test]
async fn test_missing_receipt_message() {
    let server = TestServer::start(Backend::default()).await;
    let cashier = CashierScreen::new(server.context());

    assert!(cashier.load_receipt(31).await.is_none());
    assert_eq!(
        cashier.receipt_error().as_deref(),
        Some("Order #31 not found or has no receipt")
    );
}

#[tokio::test]
async fn test_delivery_flow() {
    let server = TestServer::start(Backend {
        orders: vec![
            order_json(1, "ready", "delivery"),
            order_json(2, "delivered", "delivery"),
            order_json(3, "ready", "takeaway"),
        ],
        ..Default::default()
    })
    .await;
    let ctx = server.context();
    let delivery = DeliveryScreen::new(ctx.clone());
    let orders = ctx.api().orders(None).await.unwrap();
    ctx.cache().set(&keys::delivery_orders(), active_deliveries(orders));
    assert_eq!(delivery.orders().len(), 2);

    delivery.start_delivery(1).await.unwrap();
    assert_eq!(server.order(1).unwrap()["status"], "delivering");
    assert!(ctx.cache().is_stale(&keys::delivery_orders()));

    // short cash is refused locally
    let err = delivery
        .record_payment(2, PaymentMethod::Cash, Some(Decimal::from(100)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PaymentInsufficientAmount);
    assert_eq!(server.posts().len(), 1);

    assert_eq!(
        delivery.payment_change(2, PaymentMethod::Cash, Some(Decimal::from(40000))),
        Decimal::from(10000)
    );
    delivery
        .record_payment(2, PaymentMethod::Cash, Some(Decimal::from(40000)))
        .await
        .unwrap();
    assert_eq!(server.order(2).unwrap()["status"], "paid");
    assert!(ctx.cache().is_stale(&keys::paid_delivery_orders()));

    let refreshed = active_deliveries(ctx.api().orders(None).await.unwrap());
    assert!(refreshed.iter().all(|v| v.order.status != OrderStatus::Paid));
}
