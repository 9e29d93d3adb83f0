use crate::services::{
    ledger::{LedgerServiceTrait, OpenTransaction, PaymentProof, MAX_TRANSACTION_AMOUNT},
    tests::{d, setup},
    user::UserServiceTrait,
};
use database::{PackageType, TransactionStatus, TransactionType};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use utils::AppError;

fn purchase_request(user_id: &str, amount: Decimal) -> OpenTransaction {
    OpenTransaction {
        user_id: user_id.to_string(),
        amount,
        currency: None,
        transaction_type: TransactionType::PackagePurchase,
        package_type: Some(PackageType::Silver),
        metadata: Value::Null,
        description: None,
        gateway_order_id: Some("order_manual".to_string()),
    }
}

#[tokio::test]
async fn test_open_validates_request() {
    let ctx = setup();
    let user = ctx.signup("u@example.com", None).await;
    let ledger = &ctx.services.ledger;

    let result = ledger.open(purchase_request(&user.id, Decimal::ZERO)).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let result = ledger.open(purchase_request(&user.id, d("-1"))).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let result = ledger.open(purchase_request("nobody", Decimal::from(100))).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let mut request = purchase_request(&user.id, Decimal::from(100));
    request.currency = Some("USD".to_string());
    assert!(matches!(ledger.open(request).await, Err(AppError::BadRequest(_))));

    let mut request = purchase_request(&user.id, Decimal::from(100));
    request.package_type = None;
    assert!(matches!(ledger.open(request).await, Err(AppError::BadRequest(_))));

    let mut request = purchase_request(&user.id, Decimal::from(100));
    request.metadata = json!(["not", "an", "object"]);
    assert!(matches!(ledger.open(request).await, Err(AppError::BadRequest(_))));

    let result = ledger.open(purchase_request(&user.id, Decimal::MAX)).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    let result = ledger
        .open(purchase_request(&user.id, MAX_TRANSACTION_AMOUNT + Decimal::ONE))
        .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert!(ledger.open(purchase_request(&user.id, MAX_TRANSACTION_AMOUNT)).await.is_ok());

    let opened = ledger.open(purchase_request(&user.id, Decimal::from(100))).await.unwrap();
    assert_eq!(opened.status, TransactionStatus::Pending);
    assert_eq!(opened.currency, "INR");
    assert!(opened.metadata.is_object());
    assert!(opened.completed_at.is_none());
    println!("✅ 测试通过: 开单校验");
}

#[tokio::test]
async fn test_complete_with_valid_signature() {
    let ctx = setup();
    let user = ctx.signup("u@example.com", None).await;

    let pending = ctx
        .services
        .ledger
        .record_purchase(&user.id, PackageType::Platinum, Decimal::from(8850))
        .await
        .unwrap();
    assert!(pending.gateway_order_id.as_deref().unwrap().starts_with("order_"));
    assert_eq!(pending.metadata["package_type"], json!("platinum"));

    let outcome = ctx.services.ledger.complete(&pending.id, ctx.proof(&pending)).await.unwrap();
    let completed = &outcome.transaction;
    assert_eq!(completed.status, TransactionStatus::Completed);
    assert!(completed.completed_at.is_some());
    assert!(completed.gateway_payment_id.is_some());
    assert!(completed.gateway_signature.is_some());
    // 没有推荐人就没有佣金，也不需要补算
    assert!(outcome.commissions.is_empty());
    assert!(!outcome.commissions_deferred());

    let user = ctx.services.user.get_user(&user.id).await.unwrap();
    assert_eq!(user.package_type, Some(PackageType::Platinum));
    println!("✅ 测试通过: 签名校验后完成交易");
}

#[tokio::test]
async fn test_invalid_signature_leaves_transaction_pending() {
    let ctx = setup();
    let user = ctx.signup("u@example.com", None).await;
    let ledger = &ctx.services.ledger;

    let pending = ledger
        .record_purchase(&user.id, PackageType::Gold, Decimal::from(1000))
        .await
        .unwrap();

    let forged = PaymentProof::Gateway {
        payment_id: "pay_forged".to_string(),
        signature: "00".repeat(32),
    };
    assert!(matches!(
        ledger.complete(&pending.id, forged).await,
        Err(AppError::InvalidProof(_))
    ));

    // 套餐购买不接受线下结算凭证
    let operator = PaymentProof::Operator {
        reference: "UTR-1".to_string(),
    };
    assert!(matches!(
        ledger.complete(&pending.id, operator).await,
        Err(AppError::InvalidProof(_))
    ));

    let current = ledger.get_transaction(&pending.id).await.unwrap();
    assert_eq!(current.status, TransactionStatus::Pending);
    let user = ctx.services.user.get_user(&user.id).await.unwrap();
    assert!(user.package_type.is_none());

    // 之后仍可用正确的凭证完成
    let outcome = ledger.complete(&pending.id, ctx.proof(&pending)).await.unwrap();
    assert_eq!(outcome.transaction.status, TransactionStatus::Completed);
}

#[tokio::test]
async fn test_finalized_transactions_reject_changes() {
    let ctx = setup();
    let user = ctx.signup("u@example.com", None).await;
    let ledger = &ctx.services.ledger;

    let completed = ctx.purchase(&user, PackageType::Gold, Decimal::from(1000)).await.transaction;
    let result = ledger.complete(&completed.id, ctx.proof(&completed)).await;
    assert!(matches!(result, Err(AppError::AlreadyFinalized(_))));
    assert!(matches!(ledger.fail(&completed.id, "late").await, Err(AppError::AlreadyFinalized(_))));
    assert!(matches!(ledger.cancel(&completed.id).await, Err(AppError::AlreadyFinalized(_))));

    let pending = ledger
        .record_purchase(&user.id, PackageType::Silver, Decimal::from(2950))
        .await
        .unwrap();
    let failed = ledger.fail(&pending.id, "  card declined ").await.unwrap();
    assert_eq!(failed.status, TransactionStatus::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("card declined"));
    assert!(failed.completed_at.is_none());

    let result = ledger.complete(&pending.id, ctx.proof(&pending)).await;
    assert!(matches!(result, Err(AppError::AlreadyFinalized(_))));
    assert!(matches!(ledger.cancel(&pending.id).await, Err(AppError::AlreadyFinalized(_))));

    let pending = ledger
        .record_purchase(&user.id, PackageType::Silver, Decimal::from(2950))
        .await
        .unwrap();
    let cancelled = ledger.cancel(&pending.id).await.unwrap();
    assert_eq!(cancelled.status, TransactionStatus::Cancelled);

    assert!(matches!(ledger.cancel("missing").await, Err(AppError::NotFound(_))));
    let result = ledger.complete("missing", ctx.proof(&pending)).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    println!("✅ 测试通过: 终态交易不可再变更");
}

#[tokio::test]
async fn test_concurrent_completion_single_winner() {
    let ctx = setup();
    let a = ctx.signup("a@example.com", None).await;
    let b = ctx.signup("b@example.com", Some(a.referral_code.as_str())).await;

    let pending = ctx
        .services
        .ledger
        .record_purchase(&b.id, PackageType::Gold, Decimal::from(1000))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let ledger = ctx.services.ledger.clone();
        let id = pending.id.clone();
        let proof = ctx.proof(&pending);
        handles.push(tokio::spawn(async move { ledger.complete(&id, proof).await }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(AppError::AlreadyFinalized(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(ctx.db.commission_count().await, 1);
}

#[tokio::test]
async fn test_enrich_metadata_in_any_status() {
    let ctx = setup();
    let user = ctx.signup("u@example.com", None).await;
    let ledger = &ctx.services.ledger;

    let completed = ctx.purchase(&user, PackageType::Gold, Decimal::from(1000)).await.transaction;

    let mut extra = Map::new();
    extra.insert("invoice_no".to_string(), json!("INV-7"));
    let enriched = ledger.enrich_metadata(&completed.id, extra).await.unwrap();
    assert_eq!(enriched.status, TransactionStatus::Completed);
    assert_eq!(enriched.metadata["invoice_no"], json!("INV-7"));
    assert_eq!(enriched.metadata["package_type"], json!("gold"));

    let result = ledger.enrich_metadata("missing", Map::new()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_checkout_adds_gst() {
    let ctx = setup();
    let user = ctx.signup("u@example.com", None).await;

    let checkout = ctx
        .services
        .ledger
        .create_checkout(&user.id, PackageType::Gold)
        .await
        .unwrap();
    assert_eq!(checkout.base_amount, Decimal::from(5310));
    assert_eq!(checkout.total_amount, Decimal::from(6266));
    assert_eq!(checkout.gst_amount, Decimal::from(956));
    assert_eq!(checkout.currency, "INR");
    assert_eq!(checkout.key_id.as_deref(), Some("test_key_id"));

    // 账本记录的是套餐价格，佣金按该金额计算
    let transaction = &checkout.transaction;
    assert_eq!(transaction.amount, Decimal::from(5310));
    assert_eq!(transaction.gateway_order_id.as_deref(), Some(checkout.order_id.as_str()));
    assert_eq!(transaction.metadata["total_amount"], json!("6266"));

    let result = ctx.services.ledger.create_checkout("nobody", PackageType::Silver).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    println!("✅ 测试通过: GST 结账");
}

#[tokio::test]
async fn test_payout_and_refund_settlement() {
    let ctx = setup();
    let user = ctx.signup("u@example.com", None).await;
    let ledger = &ctx.services.ledger;

    let result = ledger.record_payout(&user.id, Decimal::from(100), "  ", None).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert!(ledger.list_transactions(&user.id).await.unwrap().is_empty());

    let payout = ledger
        .record_payout(&user.id, Decimal::from(100), "UTR-99", None)
        .await
        .unwrap();
    assert_eq!(payout.status, TransactionStatus::Completed);
    assert!(payout.gateway_signature.is_none());
    assert_eq!(payout.metadata["reference"], json!("UTR-99"));

    let refund = ledger
        .open(OpenTransaction {
            user_id: user.id.clone(),
            amount: Decimal::from(50),
            currency: Some("inr".to_string()),
            transaction_type: TransactionType::Refund,
            package_type: None,
            metadata: Value::Null,
            description: Some("goodwill refund".to_string()),
            gateway_order_id: None,
        })
        .await
        .unwrap();

    // 退款只能线下结算
    let gateway_proof = PaymentProof::Gateway {
        payment_id: "pay_x".to_string(),
        signature: "sig".to_string(),
    };
    assert!(matches!(
        ledger.complete(&refund.id, gateway_proof).await,
        Err(AppError::InvalidProof(_))
    ));
    let outcome = ledger
        .complete(
            &refund.id,
            PaymentProof::Operator {
                reference: "RFND-1".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.transaction.status, TransactionStatus::Completed);
    assert!(outcome.commissions.is_empty());

    let listed = ledger.list_transactions(&user.id).await.unwrap();
    assert_eq!(listed.len(), 2);
}
