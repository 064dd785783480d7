mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use common::TestApp;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use storefront_api::{
    entities::{transaction, transaction_item},
    errors::{CommitStage, ServiceError},
    events::Event,
    services::checkout::{
        compute_totals, CartSnapshotReader, CheckoutRequest, ContactDetails, FeeResolver,
        TransactionCommitter, TransactionDraft,
    },
};

struct Storefront {
    app: TestApp,
    user_id: i32,
    order_method_id: i32,
    payment_method_id: i32,
}

/// One customer with full contact details, a 10.00 courier and a 2.00 card fee.
async fn storefront() -> Storefront {
    let app = TestApp::new().await;
    let user = app.seed_customer("grace@example.com").await;
    let courier = app.seed_order_method("courier", Some(dec!(10.00))).await;
    let card = app.seed_payment_method("card", Some(dec!(2.00))).await;

    Storefront {
        user_id: user.id,
        order_method_id: courier.id,
        payment_method_id: card.id,
        app,
    }
}

impl Storefront {
    fn request(&self) -> CheckoutRequest {
        CheckoutRequest {
            order_method_id: self.order_method_id,
            payment_method_id: self.payment_method_id,
            ..Default::default()
        }
    }

    async fn checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<storefront_api::services::checkout::CheckoutReceipt, ServiceError> {
        self.app
            .state
            .services
            .checkout
            .checkout(self.user_id, request)
            .await
    }
}

#[tokio::test]
async fn checkout_commits_header_lines_and_stock() {
    let mut shop = storefront().await;
    let mug = shop.app.seed_product("Mug", dec!(50.00), 10).await;
    let tee = shop.app.seed_product("Tee", dec!(25.00), 5).await;
    shop.app.add_to_cart(shop.user_id, mug.id, 2).await;
    shop.app.add_to_cart(shop.user_id, tee.id, 2).await;

    let receipt = shop.checkout(shop.request()).await.expect("checkout");

    assert_eq!(receipt.delivery_fee, dec!(10.00));
    assert_eq!(receipt.admin_fee, dec!(2.00));
    assert_eq!(receipt.tax, dec!(15.00));
    assert_eq!(receipt.total_transaction, dec!(177.00));

    let invoice = Regex::new(r"^INV-\d{8}-\d{5}$").unwrap();
    assert!(invoice.is_match(&receipt.invoice_number));
    assert!(receipt
        .invoice_number
        .starts_with(&format!("INV-{}", receipt.date_transaction.format("%Y%m%d"))));

    let headers = transaction::Entity::find()
        .all(shop.app.db())
        .await
        .unwrap();
    assert_eq!(headers.len(), 1);
    let header = &headers[0];
    assert_eq!(header.id, receipt.transaction_id);
    assert_eq!(header.user_id, shop.user_id);
    assert_eq!(header.full_name, "Grace Hopper");
    assert_eq!(header.status, transaction::TransactionStatus::InProgress);
    assert_eq!(header.total_transaction, dec!(177.00));

    let lines = transaction_item::Entity::find()
        .filter(transaction_item::Column::TransactionId.eq(header.id))
        .order_by_asc(transaction_item::Column::Id)
        .all(shop.app.db())
        .await
        .unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].product_name, "Mug");
    assert_eq!(lines[0].subtotal, dec!(100.00));
    assert_eq!(lines[1].product_name, "Tee");
    assert_eq!(lines[1].subtotal, dec!(50.00));

    assert_eq!(shop.app.stock_of(mug.id).await, 8);
    assert_eq!(shop.app.stock_of(tee.id).await, 3);

    assert_matches!(
        shop.app.events.try_recv(),
        Ok(Event::TransactionCreated { transaction_id, line_count: 2, .. })
            if transaction_id == receipt.transaction_id
    );
}

#[tokio::test]
async fn discounts_and_options_are_priced_into_lines() {
    let shop = storefront().await;
    let hoodie = shop
        .app
        .seed_discounted_product("Hoodie", dec!(80.00), dec!(25), 4)
        .await;
    let large = shop.app.seed_size("L", dec!(5.00)).await;
    let zip = shop.app.seed_variant("Zip", dec!(3.00)).await;
    shop.app
        .add_configured_to_cart(shop.user_id, hoodie.id, Some(large.id), Some(zip.id), 1)
        .await;

    let receipt = shop.checkout(shop.request()).await.expect("checkout");

    // (80 * 0.75 + 5 + 3) = 68.00, tax 6.80, fees 12.00
    assert_eq!(receipt.tax, dec!(6.80));
    assert_eq!(receipt.total_transaction, dec!(86.80));

    let line = transaction_item::Entity::find()
        .one(shop.app.db())
        .await
        .unwrap()
        .expect("line written");
    assert_eq!(line.size_name, "L");
    assert_eq!(line.variant_name, "Zip");
    assert_eq!(line.subtotal, dec!(68.00));
}

#[tokio::test]
async fn shortfall_on_any_line_rolls_back_everything() {
    let shop = storefront().await;
    let mug = shop.app.seed_product("Mug", dec!(50.00), 10).await;
    let tee = shop.app.seed_product("Tee", dec!(25.00), 1).await;
    shop.app.add_to_cart(shop.user_id, mug.id, 2).await;
    shop.app.add_to_cart(shop.user_id, tee.id, 2).await;

    let result = shop.checkout(shop.request()).await;

    assert_matches!(
        result,
        Err(ServiceError::InsufficientStock { product_id, requested: 2 }) if product_id == tee.id
    );
    assert_eq!(shop.app.transaction_count().await, 0);
    assert_eq!(shop.app.transaction_item_count().await, 0);
    assert_eq!(shop.app.stock_of(mug.id).await, 10);
    assert_eq!(shop.app.stock_of(tee.id).await, 1);
    assert_eq!(shop.app.cart_count().await, 2);
}

#[tokio::test]
async fn empty_cart_writes_nothing() {
    let shop = storefront().await;

    assert_matches!(
        shop.checkout(shop.request()).await,
        Err(ServiceError::EmptyCart)
    );
    assert_eq!(shop.app.transaction_count().await, 0);
}

#[tokio::test]
async fn provided_contact_overrides_profile() {
    let shop = storefront().await;
    let mug = shop.app.seed_product("Mug", dec!(50.00), 10).await;
    shop.app.add_to_cart(shop.user_id, mug.id, 1).await;

    let request = CheckoutRequest {
        address: Some("  77 Dock Street ".into()),
        ..shop.request()
    };
    let receipt = shop.checkout(request).await.expect("checkout");

    let header = transaction::Entity::find_by_id(receipt.transaction_id)
        .one(shop.app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.address, "77 Dock Street");
    assert_eq!(header.phone, "555-0100");
    assert_eq!(header.email, "grace@example.com");
}

#[tokio::test]
async fn blank_contact_field_fails_before_any_write() {
    let shop = storefront().await;
    let mug = shop.app.seed_product("Mug", dec!(50.00), 10).await;
    shop.app.add_to_cart(shop.user_id, mug.id, 1).await;

    let request = CheckoutRequest {
        phone: Some(String::new()),
        ..shop.request()
    };

    assert_matches!(
        shop.checkout(request).await,
        Err(ServiceError::IncompletePaymentInfo { missing }) if missing == vec!["phone"]
    );
    assert_eq!(shop.app.transaction_count().await, 0);
    assert_eq!(shop.app.stock_of(mug.id).await, 10);
}

#[tokio::test]
async fn profile_without_contact_details_needs_explicit_values() {
    let app = TestApp::new().await;
    let user = app.seed_user("bare@example.com", None, None, None).await;
    let pickup = app.seed_order_method("pickup", None).await;
    let cash = app.seed_payment_method("cash", None).await;
    let mug = app.seed_product("Mug", dec!(50.00), 10).await;
    app.add_to_cart(user.id, mug.id, 1).await;

    let checkout = &app.state.services.checkout;
    let bare = CheckoutRequest {
        order_method_id: pickup.id,
        payment_method_id: cash.id,
        ..Default::default()
    };

    assert_matches!(
        checkout.checkout(user.id, bare.clone()).await,
        Err(ServiceError::IncompletePaymentInfo { missing })
            if missing == vec!["full_name", "address", "phone"]
    );

    let filled = CheckoutRequest {
        full_name: Some("Bare Bones".into()),
        address: Some("3 Quiet Lane".into()),
        phone: Some("555-0199".into()),
        ..bare
    };
    let receipt = checkout.checkout(user.id, filled).await.expect("checkout");

    // Methods with no fee configured charge nothing.
    assert_eq!(receipt.delivery_fee, Decimal::ZERO);
    assert_eq!(receipt.admin_fee, Decimal::ZERO);
    assert_eq!(receipt.total_transaction, dec!(55.00));
}

#[tokio::test]
async fn unknown_methods_are_rejected() {
    let shop = storefront().await;
    let mug = shop.app.seed_product("Mug", dec!(50.00), 10).await;
    shop.app.add_to_cart(shop.user_id, mug.id, 1).await;

    let unknown_order = CheckoutRequest {
        order_method_id: 999,
        ..shop.request()
    };
    assert_matches!(
        shop.checkout(unknown_order).await,
        Err(ServiceError::InvalidFeeSelection(_))
    );

    let unknown_payment = CheckoutRequest {
        payment_method_id: 999,
        ..shop.request()
    };
    assert_matches!(
        shop.checkout(unknown_payment).await,
        Err(ServiceError::InvalidFeeSelection(_))
    );

    assert_eq!(shop.app.transaction_count().await, 0);
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let shop = storefront().await;

    assert_matches!(
        shop.app
            .state
            .services
            .checkout
            .checkout(4242, shop.request())
            .await,
        Err(ServiceError::NotFound(_))
    );
}

async fn draft_for(shop: &Storefront, invoice_number: &str) -> TransactionDraft {
    let db = shop.app.state.db.clone();
    let fees = FeeResolver::new(db.clone())
        .resolve_fees(shop.order_method_id, shop.payment_method_id)
        .await
        .unwrap();
    let lines = CartSnapshotReader::new(db)
        .read_cart(shop.user_id)
        .await
        .unwrap();
    let now = Utc::now();
    let totals = compute_totals(&lines, &fees, now.date_naive(), &mut rand::thread_rng());

    TransactionDraft {
        user_id: shop.user_id,
        contact: ContactDetails {
            full_name: "Grace Hopper".into(),
            email: "grace@example.com".into(),
            address: "1 Harbour Road".into(),
            phone: "555-0100".into(),
        },
        order_method_id: shop.order_method_id,
        payment_method_id: shop.payment_method_id,
        fees,
        tax: totals.tax,
        total: totals.total,
        invoice_number: invoice_number.to_string(),
        date_transaction: now,
        lines,
    }
}

#[tokio::test]
async fn invoice_collision_is_retried_with_fresh_number() {
    let shop = storefront().await;
    let mug = shop.app.seed_product("Mug", dec!(50.00), 10).await;
    shop.app.add_to_cart(shop.user_id, mug.id, 1).await;

    let committer = TransactionCommitter::new(shop.app.state.db.clone(), 3);
    let first = committer
        .commit(&draft_for(&shop, "INV-20240101-00042").await)
        .await
        .expect("first commit");
    assert_eq!(first.invoice_number, "INV-20240101-00042");

    let second = committer
        .commit(&draft_for(&shop, "INV-20240101-00042").await)
        .await
        .expect("retried commit");

    assert_ne!(second.invoice_number, first.invoice_number);
    assert_eq!(shop.app.transaction_count().await, 2);
    assert_eq!(shop.app.stock_of(mug.id).await, 8);
}

#[tokio::test]
async fn invoice_collision_without_retries_is_a_header_failure() {
    let shop = storefront().await;
    let mug = shop.app.seed_product("Mug", dec!(50.00), 10).await;
    shop.app.add_to_cart(shop.user_id, mug.id, 1).await;

    let committer = TransactionCommitter::new(shop.app.state.db.clone(), 1);
    committer
        .commit(&draft_for(&shop, "INV-20240101-00007").await)
        .await
        .expect("first commit");

    let result = committer
        .commit(&draft_for(&shop, "INV-20240101-00007").await)
        .await;

    assert_matches!(
        result,
        Err(ServiceError::PersistenceFailure {
            stage: CommitStage::HeaderInsert,
            ..
        })
    );
    assert_eq!(shop.app.transaction_count().await, 1);
    assert_eq!(shop.app.transaction_item_count().await, 1);
    assert_eq!(shop.app.stock_of(mug.id).await, 9);
}

#[tokio::test]
async fn storage_failure_mid_commit_leaves_no_trace() {
    let shop = storefront().await;
    let mug = shop.app.seed_product("Mug", dec!(50.00), 10).await;
    shop.app.add_to_cart(shop.user_id, mug.id, 2).await;

    // Second line points at a product row that does not exist, so its insert
    // fails after the header, the first line and the first decrement.
    let mut draft = draft_for(&shop, "INV-20240101-00099").await;
    let mut ghost = draft.lines[0].clone();
    ghost.cart_id = 0;
    ghost.product_id = 9_999;
    draft.lines.push(ghost);

    let result = TransactionCommitter::new(shop.app.state.db.clone(), 3)
        .commit(&draft)
        .await;

    assert_matches!(
        result,
        Err(ServiceError::PersistenceFailure {
            stage: CommitStage::LineInsert | CommitStage::StockUpdate,
            ..
        })
    );
    assert_eq!(shop.app.transaction_count().await, 0);
    assert_eq!(shop.app.transaction_item_count().await, 0);
    assert_eq!(shop.app.stock_of(mug.id).await, 10);
}

#[tokio::test]
async fn non_positive_quantity_never_reaches_storage() {
    let shop = storefront().await;
    let mug = shop.app.seed_product("Mug", dec!(50.00), 5).await;
    shop.app.add_to_cart(shop.user_id, mug.id, 1).await;

    let mut draft = draft_for(&shop, "INV-20240101-00100").await;
    draft.lines[0].quantity = -3;

    let result = TransactionCommitter::new(shop.app.state.db.clone(), 3)
        .commit(&draft)
        .await;

    assert_matches!(
        result,
        Err(ServiceError::InvalidQuantity { product_id, quantity: -3 }) if product_id == mug.id
    );
    assert_eq!(shop.app.transaction_count().await, 0);
    assert_eq!(shop.app.stock_of(mug.id).await, 5);
}

#[tokio::test]
async fn concurrent_checkouts_never_oversell() {
    let app = Arc::new(TestApp::new().await);
    let courier = app.seed_order_method("courier", Some(dec!(10.00))).await;
    let card = app.seed_payment_method("card", Some(dec!(2.00))).await;
    let last_one = app.seed_product("Last One", dec!(20.00), 1).await;

    let mut buyers = Vec::new();
    for n in 0..4 {
        let user = app.seed_customer(&format!("buyer{n}@example.com")).await;
        app.add_to_cart(user.id, last_one.id, 1).await;
        buyers.push(user.id);
    }

    let mut tasks = Vec::new();
    for user_id in buyers {
        let checkout = app.state.services.checkout.clone();
        let request = CheckoutRequest {
            order_method_id: courier.id,
            payment_method_id: card.id,
            ..Default::default()
        };
        tasks.push(tokio::spawn(async move {
            checkout.checkout(user_id, request).await
        }));
    }

    let mut succeeded = 0;
    for task in tasks {
        match task.await.expect("checkout task") {
            Ok(_) => succeeded += 1,
            Err(err) => assert_matches!(err, ServiceError::InsufficientStock { .. }),
        }
    }

    assert_eq!(succeeded, 1, "exactly one buyer gets the last unit");
    assert_eq!(app.stock_of(last_one.id).await, 0);
    assert_eq!(app.transaction_count().await, 1);
}
