//! Integration tests: OrderService commands → ProjectionProcessor → order board.

use std::sync::Arc;

use chrono::Utc;
use common::{AggregateId, FixedClock};
use domain::{
    Actor, CartLine, CustomerInfo, DeliveryMethod, FulfillmentStatus, InMemoryOrderCodeRegistry,
    Money, OrderService, PaymentMethod, PaymentStatus, PlaceOrder, PricingEngine,
    RequestTransition,
};
use event_store::InMemoryEventStore;
use projections::{OrderBoardView, Projection, ProjectionProcessor, ReadModel};

/// Helper to set up service, processor, and the board.
fn setup() -> (
    OrderService<InMemoryEventStore>,
    ProjectionProcessor<InMemoryEventStore>,
    OrderBoardView,
) {
    let store = InMemoryEventStore::new();
    let service = OrderService::new(
        store.clone(),
        Arc::new(InMemoryOrderCodeRegistry::new()),
        Arc::new(FixedClock::at(Utc::now())),
    );

    let board = OrderBoardView::new();
    let mut processor = ProjectionProcessor::new(store);
    processor.register(Box::new(board.clone()));

    (service, processor, board)
}

async fn place(service: &OrderService<InMemoryEventStore>, price: i64) -> (AggregateId, String) {
    let lines = vec![CartLine::new("goi-cuon", Money::new(price), 2).unwrap()];
    let priced = PricingEngine::default()
        .price(&lines, DeliveryMethod::Delivery, None)
        .unwrap();
    let cmd = PlaceOrder::for_checkout(
        CustomerInfo::new("Quân", "0977000111", "9 Võ Văn Tần"),
        DeliveryMethod::Delivery,
        PaymentMethod::CashOnDelivery,
        lines,
        priced,
    );
    let order_id = cmd.order_id;
    let result = service.commit_order(cmd).await.unwrap();
    (order_id, result.aggregate.code().unwrap().to_string())
}

fn admin(order_id: AggregateId) -> RequestTransition {
    RequestTransition::new(order_id, Actor::Admin)
}

#[tokio::test]
async fn test_full_lifecycle_on_the_board() {
    let (service, processor, board) = setup();
    let (order_id, code) = place(&service, 30_000).await;

    processor.run_catch_up().await.unwrap();
    let row = board.get_by_code(&code).await.unwrap();
    assert_eq!(row.order_id, order_id);
    assert_eq!(row.fulfillment, FulfillmentStatus::Pending);
    assert_eq!(row.total, Money::new(60_000));

    service
        .request_transition(admin(order_id).payment(PaymentStatus::Paid))
        .await
        .unwrap();
    for to in [
        FulfillmentStatus::Confirmed,
        FulfillmentStatus::Shipping,
        FulfillmentStatus::Completed,
    ] {
        service
            .request_transition(admin(order_id).fulfillment(to))
            .await
            .unwrap();
    }

    processor.run_catch_up().await.unwrap();
    let row = board.get_order(order_id).await.unwrap();
    assert_eq!(row.fulfillment, FulfillmentStatus::Completed);
    assert_eq!(row.payment, PaymentStatus::Paid);
    assert!(!row.refund_due);
    assert_eq!(board.position().await.events_processed, 5);
}

#[tokio::test]
async fn test_board_groups_by_status() {
    let (service, processor, board) = setup();
    let (first, _) = place(&service, 20_000).await;
    let (second, _) = place(&service, 25_000).await;
    let (third, _) = place(&service, 40_000).await;

    service
        .request_transition(admin(first).fulfillment(FulfillmentStatus::Confirmed))
        .await
        .unwrap();
    service
        .request_transition(
            RequestTransition::new(second, Actor::Customer)
                .payment(PaymentStatus::Paid)
                .fulfillment(FulfillmentStatus::Cancelled),
        )
        .await
        .unwrap();

    processor.run_catch_up().await.unwrap();

    let pending = board.list(Some(FulfillmentStatus::Pending)).await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].order_id, third);

    let counts = board.counts_by_status().await;
    assert_eq!(counts[&FulfillmentStatus::Confirmed], 1);
    assert_eq!(counts[&FulfillmentStatus::Cancelled], 1);
    assert_eq!(counts[&FulfillmentStatus::Shipping], 0);

    let refunds = board.refunds_due().await;
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].order_id, second);
    assert_eq!(board.list(None).await.len(), 3);
    assert_eq!(board.count(), 3);
}

#[tokio::test]
async fn test_rejected_transitions_leave_board_untouched() {
    let (service, processor, board) = setup();
    let (order_id, _) = place(&service, 30_000).await;

    assert!(
        service
            .request_transition(admin(order_id).fulfillment(FulfillmentStatus::Completed))
            .await
            .is_err()
    );

    processor.run_catch_up().await.unwrap();
    let row = board.get_order(order_id).await.unwrap();
    assert_eq!(row.fulfillment, FulfillmentStatus::Pending);
    assert_eq!(board.position().await.events_processed, 1);
}

#[tokio::test]
async fn test_rebuild_matches_incremental() {
    let (service, processor, board) = setup();
    let (order_id, _) = place(&service, 30_000).await;
    service
        .request_transition(admin(order_id).fulfillment(FulfillmentStatus::Confirmed))
        .await
        .unwrap();

    processor.run_catch_up().await.unwrap();
    let before = board.list(None).await;

    processor.rebuild_all().await.unwrap();
    assert_eq!(board.list(None).await, before);
}
