use crate::services::{
    tests::setup,
    user::{SignupInput, UserServiceTrait},
};
use utils::AppError;

fn signup_input(email: &str, password: &str) -> SignupInput {
    SignupInput {
        email: email.to_string(),
        password: password.to_string(),
        full_name: " Test User ".to_string(),
        phone: Some("  ".to_string()),
        referral_code: None,
    }
}

#[tokio::test]
async fn test_signup_normalizes_and_rejects_duplicate_email() {
    let ctx = setup();
    let users = &ctx.services.user;

    let user = users.signup(signup_input("  Alice@Example.COM ", "secret-1")).await.unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.full_name, "Test User");
    assert!(user.phone.is_none());
    assert!(user.is_active);
    assert!(!user.is_superuser);
    assert_ne!(user.hashed_password, "secret-1");

    let result = users.signup(signup_input("alice@example.com", "secret-2")).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    println!("✅ 测试通过: 注册与重复邮箱");
}

#[tokio::test]
async fn test_login_issues_verifiable_token() {
    let ctx = setup();
    let users = &ctx.services.user;
    let user = users.signup(signup_input("bob@example.com", "hunter22")).await.unwrap();

    let outcome = users.login("BOB@example.com", "hunter22").await.unwrap();
    assert_eq!(outcome.user.id, user.id);
    assert_eq!(outcome.expires_in, 30 * 60);

    let claims = ctx.services.jwt.verify_token(&outcome.access_token).unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.email, "bob@example.com");
    assert!(!claims.is_superuser);

    let result = users.login("bob@example.com", "wrong").await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    let result = users.login("nobody@example.com", "hunter22").await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_inactive_user_cannot_login() {
    let ctx = setup();
    let users = &ctx.services.user;
    let user = users.signup(signup_input("carol@example.com", "pw")).await.unwrap();

    let deactivated = users.set_active(&user.id, false).await.unwrap();
    assert!(!deactivated.is_active);
    let result = users.login("carol@example.com", "pw").await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    users.set_active(&user.id, true).await.unwrap();
    assert!(users.login("carol@example.com", "pw").await.is_ok());

    let result = users.set_active("missing", false).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_configured_superuser() {
    let ctx = setup();
    let admin = ctx
        .services
        .user
        .signup(signup_input("Admin@example.com", "pw"))
        .await
        .unwrap();
    assert!(admin.is_superuser);

    let outcome = ctx.services.user.login("admin@example.com", "pw").await.unwrap();
    let claims = ctx.services.jwt.verify_token(&outcome.access_token).unwrap();
    assert!(claims.is_superuser);
}

#[tokio::test]
async fn test_uppers_and_lowers() {
    let ctx = setup();
    let users = &ctx.services.user;
    let r3 = ctx.signup("r3@example.com", None).await;
    let r2 = ctx.signup("r2@example.com", Some(r3.referral_code.as_str())).await;
    let r1 = ctx.signup("r1@example.com", Some(r2.referral_code.as_str())).await;
    let u = ctx.signup("u@example.com", Some(r1.referral_code.as_str())).await;
    let v = ctx.signup("v@example.com", Some(r1.referral_code.as_str())).await;

    // 最多返回 max_commission_levels 级
    let uppers = users.get_uppers(&u.id).await.unwrap();
    let ids: Vec<&str> = uppers.iter().map(|x| x.id.as_str()).collect();
    assert_eq!(ids, vec![r1.id.as_str(), r2.id.as_str()]);

    assert!(users.get_uppers(&r3.id).await.unwrap().is_empty());
    assert!(matches!(users.get_uppers("missing").await, Err(AppError::NotFound(_))));

    let mut lowers: Vec<String> = users
        .get_lowers(&r1.id)
        .await
        .unwrap()
        .into_iter()
        .map(|x| x.id)
        .collect();
    lowers.sort();
    let mut expected = vec![u.id.clone(), v.id.clone()];
    expected.sort();
    assert_eq!(lowers, expected);
    assert!(users.get_lowers(&u.id).await.unwrap().is_empty());
    println!("✅ 测试通过: 上下级查询");
}
