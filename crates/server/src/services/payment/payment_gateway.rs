use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, warn};
use utils::{AppConfig, AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

pub type DynPaymentGateway = Arc<dyn PaymentGateway + Send + Sync>;

/// 支付网关协作方(只关心下单与回调校验，不涉及网关的传输协议)
#[async_trait]
pub trait PaymentGateway {
    /// 为指定金额创建网关订单，返回订单号
    async fn create_order(&self, amount: Decimal, currency: &str) -> AppResult<String>;

    /// 校验网关回调签名
    fn verify(&self, order_ref: &str, payment_ref: &str, signature: &str) -> bool;

    /// 前端发起支付所需的公开 key
    fn key_id(&self) -> Option<String> {
        None
    }
}

/// 基于 HMAC-SHA256 签名的网关实现
///
/// 签名为 `hex(HMAC-SHA256(key_secret, order_ref + "|" + payment_ref))`。
#[derive(Clone)]
pub struct HmacPaymentGateway {
    key_id: Option<String>,
    key_secret: String,
}

impl HmacPaymentGateway {
    pub fn new(key_id: Option<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id,
            key_secret: key_secret.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        if config.gateway_key_secret.is_empty() {
            warn!("⚠️ 未配置支付网关密钥，所有支付回调都会校验失败");
        }
        Self::new(config.gateway_key_id.clone(), config.gateway_key_secret.clone())
    }

    fn mac(&self) -> Option<HmacSha256> {
        HmacSha256::new_from_slice(self.key_secret.as_bytes()).ok()
    }

    /// 计算签名(网关侧同样的算法)
    pub fn sign(&self, order_ref: &str, payment_ref: &str) -> AppResult<String> {
        let mut mac = self
            .mac()
            .ok_or_else(|| AppError::InternalServerErrorWithContext("invalid gateway key".to_string()))?;
        mac.update(format!("{}|{}", order_ref, payment_ref).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl PaymentGateway for HmacPaymentGateway {
    async fn create_order(&self, amount: Decimal, currency: &str) -> AppResult<String> {
        if amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(format!("Order amount must be positive, got {}", amount)));
        }

        let order_ref = format!("order_{}", &uuid::Uuid::new_v4().simple().to_string()[..14]);
        info!("🧾 创建支付订单 {} 金额 {} {}", order_ref, amount, currency);

        Ok(order_ref)
    }

    fn verify(&self, order_ref: &str, payment_ref: &str, signature: &str) -> bool {
        if self.key_secret.is_empty() {
            return false;
        }
        let Ok(signature) = hex::decode(signature.trim()) else {
            return false;
        };
        let Some(mut mac) = self.mac() else {
            return false;
        };

        mac.update(format!("{}|{}", order_ref, payment_ref).as_bytes());
        mac.verify_slice(&signature).is_ok()
    }

    fn key_id(&self) -> Option<String> {
        self.key_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_order() {
        let gateway = HmacPaymentGateway::new(None, "secret");
        let order = gateway.create_order(Decimal::from(100), "INR").await.unwrap();
        assert!(order.starts_with("order_"));
        assert_eq!(order.len(), "order_".len() + 14);

        assert!(gateway.create_order(Decimal::ZERO, "INR").await.is_err());
    }

    #[test]
    fn test_signature_verification() {
        let gateway = HmacPaymentGateway::new(Some("key".to_string()), "secret");
        let signature = gateway.sign("order_1", "pay_1").unwrap();

        assert!(gateway.verify("order_1", "pay_1", &signature));
        assert!(gateway.verify("order_1", "pay_1", &signature.to_uppercase()));
        assert!(!gateway.verify("order_1", "pay_2", &signature));
        assert!(!gateway.verify("order_1", "pay_1", "not-hex"));

        let other = HmacPaymentGateway::new(None, "other-secret");
        assert!(!other.verify("order_1", "pay_1", &signature));

        let unconfigured = HmacPaymentGateway::new(None, "");
        assert!(!unconfigured.verify("order_1", "pay_1", &signature));
        println!("✅ 测试通过: 支付签名校验");
    }
}
