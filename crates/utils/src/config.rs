use clap::Parser;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(clap::ValueEnum, Clone, Debug, Copy)]
#[clap(rename_all = "lowercase")]
pub enum CargoEnv {
    Development,
    Production,
}

/// 佣金金额的舍入方式
#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[clap(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// 银行家舍入(四舍六入五取偶)
    #[default]
    HalfEven,
    /// 四舍五入
    HalfUp,
    /// 直接截断
    Down,
}

/// 环境配置加载器
pub struct EnvLoader;

impl EnvLoader {
    /// 根据 CARGO_ENV 加载对应的环境配置文件
    pub fn load_env_file() -> Result<(), Box<dyn std::error::Error>> {
        // 1. 获取环境变量 CARGO_ENV
        let cargo_env = std::env::var("CARGO_ENV").unwrap_or_else(|_| "development".to_string());
        println!("cargo_env: {}", cargo_env);
        // 2. 构建配置文件路径
        let env_file = match cargo_env.as_str() {
            "production" | "Production" | "prod" => ".env.production",
            "development" | "Development" | "dev" => ".env.development",
            "test" | "Test" => ".env.test",
            _ => {
                println!("⚠️  未知的 CARGO_ENV: {}，使用默认的 .env.development", cargo_env);
                ".env.development"
            }
        };
        // 3. 检查文件是否存在
        if !std::path::Path::new(env_file).exists() {
            eprintln!("⚠️  配置文件 {} 不存在，尝试加载默认的 .env 文件", env_file);
            if std::path::Path::new(".env").exists() {
                dotenvy::from_filename(".env")?;
                println!("✅ 已加载默认配置文件: .env");
            } else {
                eprintln!("❌ 未找到任何配置文件，使用默认配置");
            }
            return Ok(());
        }

        // 4. 加载指定的环境配置文件
        dotenvy::from_filename(env_file)?;
        println!("✅ 已加载环境配置文件: {} (CARGO_ENV={})", env_file, cargo_env);

        Ok(())
    }
}

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    #[clap(long, env, value_enum)]
    pub cargo_env: CargoEnv,

    #[clap(long, env, default_value = "0.0.0.0")]
    pub app_host: String,

    #[clap(long, env, default_value = "8000")]
    pub app_port: u16,

    #[clap(long, env, default_value = "mongodb://localhost:27017")]
    pub mongo_uri: String,

    #[clap(long, env)]
    pub mongo_db: String,

    #[clap(long, env, default_value = "info")]
    pub rust_log: String,

    /// 生产环境日志目录
    #[clap(long, env)]
    pub log_dir: Option<String>,

    /// 账本币种(单币种账本)
    #[clap(long, env, default_value = "INR")]
    pub currency: String,

    /// 佣金向上追溯的最大层级(1 = 仅直推)
    #[clap(long, env, default_value = "2")]
    pub max_commission_levels: u8,

    /// 佣金费率表(JSON): {"1": {"gold": "0.10"}, "2": {"gold": "0.03"}}
    #[clap(long, env, default_value = "{}")]
    pub commission_rates: String,

    /// 金额最小单位的小数位数
    #[clap(long, env, default_value = "2")]
    pub minor_unit_scale: u32,

    #[clap(long, env, value_enum, default_value = "half_even")]
    pub rounding_strategy: RoundingMode,

    /// 套餐结账时附加的税率(GST)
    #[clap(long, env, default_value = "0.18")]
    pub gst_rate: Decimal,

    #[clap(long, env)]
    pub gateway_key_id: Option<String>,

    /// 支付网关签名密钥
    #[clap(long, env, default_value = "")]
    pub gateway_key_secret: String,

    /// 注册时自动授予运营权限的邮箱(逗号分隔)
    #[clap(long, env, default_value = "")]
    pub superuser_emails: String,

    #[clap(long, env, default_value = "change-this-secret-in-production")]
    pub jwt_secret: String,

    #[clap(long, env, default_value = "30")]
    pub jwt_expires_in_minutes: i64,

    #[clap(long, env, default_value = "30")]
    pub http_timeout_secs: u64,
}

impl AppConfig {
    pub fn superuser_email_list(&self) -> Vec<String> {
        self.superuser_emails
            .split(',')
            .map(|email| email.trim().to_lowercase())
            .filter(|email| !email.is_empty())
            .collect()
    }

    /// 手动创建配置实例（用于测试）
    pub fn new_for_test() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            app_host: "0.0.0.0".to_string(),
            app_port: 8765,
            mongo_uri: std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db: std::env::var("MONGO_DB").unwrap_or_else(|_| "affiliate_test".to_string()),
            rust_log: "info".to_string(),
            log_dir: None,
            currency: "INR".to_string(),
            max_commission_levels: 2,
            commission_rates: r#"{"1": {"silver": "0.10", "gold": "0.10", "platinum": "0.10"}, "2": {"silver": "0.03", "gold": "0.03", "platinum": "0.03"}}"#
                .to_string(),
            minor_unit_scale: 2,
            rounding_strategy: RoundingMode::HalfEven,
            gst_rate: Decimal::new(18, 2),
            gateway_key_id: Some("test_key_id".to_string()),
            gateway_key_secret: "test_key_secret".to_string(),
            superuser_emails: "admin@example.com".to_string(),
            jwt_secret: "test_secret_key_for_jwt_testing_only".to_string(),
            jwt_expires_in_minutes: 30,
            http_timeout_secs: 30,
        }
    }
}
