//! MongoDB 集成测试
//!
//! 需要可用的副本集(多文档事务依赖副本集)，连接串读取 MONGO_URI:
//! `MONGO_URI=mongodb://localhost:27017/?replicaSet=rs0 cargo test -p database -- --ignored`

use crate::{
    commission::repository::{CommissionInsert, CommissionRepositoryTrait},
    transaction::repository::TransactionRepositoryTrait,
    user::repository::UserRepositoryTrait,
    Commission, CommissionStatus, CommissionTransition, Database, GatewayCompletion, NewUser, PackageType,
    Transaction, TransactionStatus, TransactionType, User,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use utils::{AppConfig, AppError};

async fn connect(name: &str) -> (Database, String) {
    let mongo_uri = std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let mongo_db = format!("affiliate_test_{}_{}", name, &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let config = AppConfig {
        mongo_uri,
        mongo_db: mongo_db.clone(),
        ..AppConfig::new_for_test()
    };

    let db = Database::new(Arc::new(config)).await.unwrap();
    db.init_indexes().await.unwrap();
    (db, mongo_db)
}

async fn cleanup(db: &Database, name: &str) {
    db.client.database(name).drop(None).await.unwrap();
}

fn new_user(email: &str, referred_by: Option<&str>) -> User {
    User::from_signup(
        NewUser {
            email: email.to_string(),
            hashed_password: "hash".to_string(),
            full_name: "Mongo Test".to_string(),
            phone: None,
            referred_by: referred_by.map(|r| r.to_string()),
        },
        User::generate_referral_code(),
    )
}

fn purchase(user_id: &str, amount: i64) -> Transaction {
    Transaction::new_pending(
        user_id,
        Decimal::from(amount),
        "INR",
        TransactionType::PackagePurchase,
        Some(PackageType::Gold),
        Value::Object(Default::default()),
    )
}

fn completion(payment_id: &str) -> GatewayCompletion {
    GatewayCompletion {
        payment_id: payment_id.to_string(),
        signature: Some("sig".to_string()),
    }
}

async fn completed_purchase(db: &Database, user_id: &str) -> Transaction {
    let pending = db.create_transaction(purchase(user_id, 1000)).await.unwrap();
    db.complete_transaction(&pending.id, completion("pay_1")).await.unwrap().unwrap()
}

fn rows_for(transaction: &Transaction, earners: &[&User]) -> Vec<Commission> {
    earners
        .iter()
        .enumerate()
        .map(|(index, earner)| {
            Commission::new_pending(
                &earner.id,
                &transaction.user_id,
                &transaction.id,
                (index + 1) as u8,
                Decimal::from(100),
                "0.10".parse().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
#[ignore] // 需要MongoDB连接
async fn test_user_unique_indexes_and_chain() {
    let (db, name) = connect("users").await;

    let r2 = db.create_user(new_user("r2@example.com", None)).await.unwrap();
    let r1 = db.create_user(new_user("r1@example.com", Some(&r2.id))).await.unwrap();
    let u = db.create_user(new_user("u@example.com", Some(&r1.id))).await.unwrap();

    let result = db.create_user(new_user("R2@example.com", None)).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // 推荐码冲突由唯一索引拦截
    let mut clash = new_user("clash@example.com", None);
    clash.referral_code = r1.referral_code.clone();
    assert!(matches!(db.create_user(clash).await, Err(AppError::Conflict(_))));

    let found = db
        .get_user_by_referral_code(&r1.referral_code.to_lowercase())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, r1.id);

    let uppers = db.get_uppers(&u.id, 2).await.unwrap();
    let ids: Vec<&str> = uppers.iter().map(|x| x.id.as_str()).collect();
    assert_eq!(ids, vec![r1.id.as_str(), r2.id.as_str()]);
    assert_eq!(db.get_uppers(&u.id, 1).await.unwrap().len(), 1);
    assert!(matches!(db.get_uppers("missing", 2).await, Err(AppError::NotFound(_))));

    let lowers = db.get_lowers(&r1.id).await.unwrap();
    assert_eq!(lowers.len(), 1);
    assert_eq!(lowers[0].id, u.id);

    let inactive = db.set_active(&u.id, false).await.unwrap().unwrap();
    assert!(!inactive.is_active);
    assert!(db.set_active("missing", false).await.unwrap().is_none());

    cleanup(&db, &name).await;
    println!("✅ 测试通过: 用户唯一索引与推荐链");
}

#[tokio::test]
#[ignore] // 需要MongoDB连接
async fn test_completion_stamps_package_atomically() {
    let (db, name) = connect("completion").await;
    let user = db.create_user(new_user("buyer@example.com", None)).await.unwrap();

    let pending = db.create_transaction(purchase(&user.id, 5310)).await.unwrap();
    let completed = db
        .complete_transaction(&pending.id, completion("pay_ok"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completed.status, TransactionStatus::Completed);
    assert_eq!(completed.gateway_payment_id.as_deref(), Some("pay_ok"));
    assert!(completed.completed_at.is_some());

    let stamped = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stamped.package_type, Some(PackageType::Gold));
    assert!(stamped.package_purchased_at.is_some());

    // 状态守卫: 已完成的交易不能再完成或失败
    assert!(db
        .complete_transaction(&pending.id, completion("pay_again"))
        .await
        .unwrap()
        .is_none());
    assert!(db
        .finalize_transaction(&pending.id, TransactionStatus::Failed, None)
        .await
        .unwrap()
        .is_none());

    // 用户不存在时整个事务回滚，交易仍为 pending
    let orphan = db.create_transaction(purchase("ghost", 1000)).await.unwrap();
    let result = db.complete_transaction(&orphan.id, completion("pay_orphan")).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    let current = db.get_transaction(&orphan.id).await.unwrap().unwrap();
    assert_eq!(current.status, TransactionStatus::Pending);
    assert!(current.gateway_payment_id.is_none());

    let failed = db
        .finalize_transaction(&orphan.id, TransactionStatus::Failed, Some("declined".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.status, TransactionStatus::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("declined"));
    assert!(db
        .complete_transaction(&orphan.id, completion("pay_late"))
        .await
        .unwrap()
        .is_none());

    let result = db
        .finalize_transaction(&orphan.id, TransactionStatus::Completed, None)
        .await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));

    let purchases = db.list_completed_purchases().await.unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].id, pending.id);

    cleanup(&db, &name).await;
    println!("✅ 测试通过: 交易完成与套餐更新在同一事务");
}

#[tokio::test]
#[ignore] // 需要MongoDB连接
async fn test_create_commissions_is_idempotent() {
    let (db, name) = connect("commissions").await;
    let r2 = db.create_user(new_user("r2@example.com", None)).await.unwrap();
    let r1 = db.create_user(new_user("r1@example.com", Some(&r2.id))).await.unwrap();
    let u = db.create_user(new_user("u@example.com", Some(&r1.id))).await.unwrap();

    let transaction = completed_purchase(&db, &u.id).await;
    let rows = rows_for(&transaction, &[&r1, &r2]);

    let first = db.create_commissions(&transaction.id, rows.clone()).await.unwrap();
    assert!(matches!(first, CommissionInsert::Created(ref created) if created.len() == 2));

    let second = db.create_commissions(&transaction.id, rows).await.unwrap();
    let CommissionInsert::Existing(existing) = second else {
        panic!("second insert should return the existing rows");
    };
    assert_eq!(existing.len(), 2);
    assert_eq!(existing[0].level, 1);
    assert_eq!(db.list_by_source_transaction(&transaction.id).await.unwrap().len(), 2);

    // pending 交易不允许生成佣金
    let pending = db.create_transaction(purchase(&u.id, 1000)).await.unwrap();
    let result = db.create_commissions(&pending.id, rows_for(&pending, &[&r1])).await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));
    assert!(db.list_by_source_transaction(&pending.id).await.unwrap().is_empty());

    // 并发写入同一笔交易: 只有一组佣金落库，其余调用返回已有记录
    let contested = completed_purchase(&db, &u.id).await;
    let mut handles = Vec::new();
    for _ in 0..4 {
        let db = db.clone();
        let id = contested.id.clone();
        let rows = rows_for(&contested, &[&r1, &r2]);
        handles.push(tokio::spawn(async move { db.create_commissions(&id, rows).await }));
    }
    for handle in handles {
        match handle.await.unwrap() {
            Ok(result) => assert_eq!(result.into_inner().len(), 2),
            // 写冲突且对方尚未提交时按存储故障返回
            Err(AppError::StorageFailure(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(db.list_by_source_transaction(&contested.id).await.unwrap().len(), 2);

    cleanup(&db, &name).await;
    println!("✅ 测试通过: 佣金写入幂等");
}

#[tokio::test]
#[ignore] // 需要MongoDB连接
async fn test_commission_transitions_are_guarded() {
    let (db, name) = connect("transitions").await;
    let r1 = db.create_user(new_user("r1@example.com", None)).await.unwrap();
    let u = db.create_user(new_user("u@example.com", Some(&r1.id))).await.unwrap();
    let transaction = completed_purchase(&db, &u.id).await;
    let created = db
        .create_commissions(&transaction.id, rows_for(&transaction, &[&r1]))
        .await
        .unwrap()
        .into_inner();
    let id = created[0].id.clone();

    let mark_paid = CommissionTransition::MarkPaid {
        payout_transaction_id: "payout-1".to_string(),
    };
    assert!(db.apply_transition(&id, &mark_paid, 10).await.unwrap().is_none());

    let approved = db
        .apply_transition(&id, &CommissionTransition::Approve, 20)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(approved.status, CommissionStatus::Approved);
    assert_eq!(approved.approved_at, Some(20));
    assert!(db
        .apply_transition(&id, &CommissionTransition::Approve, 21)
        .await
        .unwrap()
        .is_none());

    let paid = db.apply_transition(&id, &mark_paid, 30).await.unwrap().unwrap();
    assert_eq!(paid.status, CommissionStatus::Paid);
    assert_eq!(paid.paid_at, Some(30));
    assert_eq!(paid.payout_transaction_id.as_deref(), Some("payout-1"));
    assert!(db
        .apply_transition(&id, &CommissionTransition::Cancel, 40)
        .await
        .unwrap()
        .is_none());

    let listed = db.list_commissions(&r1.id, Some(CommissionStatus::Paid)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(db
        .list_commissions(&r1.id, Some(CommissionStatus::Pending))
        .await
        .unwrap()
        .is_empty());

    cleanup(&db, &name).await;
    println!("✅ 测试通过: 佣金状态迁移守卫");
}
