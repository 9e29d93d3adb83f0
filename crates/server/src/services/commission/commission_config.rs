use anyhow::{anyhow, Context};
use database::PackageType;
use rust_decimal::{Decimal, RoundingStrategy};
use std::{collections::HashMap, fmt, sync::Arc};
use utils::{AppConfig, RoundingMode};

/// 按 (层级, 套餐) 查询佣金费率
pub trait RateLookup {
    fn lookup(&self, level: u8, package: PackageType) -> Option<Decimal>;
}

/// 佣金费率表
///
/// 费率为小数(0.10 表示 10%)。表中没有的 (层级, 套餐) 组合视为无佣金，
/// 引擎遇到缺失费率即停止向上追溯。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: HashMap<(u8, PackageType), Decimal>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, level: u8, package: PackageType, rate: Decimal) -> Self {
        self.rates.insert((level, package), rate);
        self
    }

    /// 解析 JSON 格式的费率表: `{"1": {"gold": "0.10"}, "2": {"gold": "0.03"}}`
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let parsed: HashMap<String, HashMap<String, Decimal>> =
            serde_json::from_str(raw).context("🔴 commission rate table is not valid JSON")?;

        let mut table = RateTable::new();
        for (level, packages) in parsed {
            let level: u8 = level
                .trim()
                .parse()
                .with_context(|| format!("🔴 invalid commission level: {}", level))?;
            if level == 0 {
                return Err(anyhow!("🔴 commission levels start at 1"));
            }

            for (package, rate) in packages {
                let package: PackageType = package.parse().map_err(|e: String| anyhow!("🔴 {}", e))?;
                if rate < Decimal::ZERO || rate > Decimal::ONE {
                    return Err(anyhow!(
                        "🔴 commission rate {} for level {} / {} must be within [0, 1]",
                        rate,
                        level,
                        package
                    ));
                }
                table.rates.insert((level, package), rate);
            }
        }

        Ok(table)
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }
}

impl RateLookup for RateTable {
    fn lookup(&self, level: u8, package: PackageType) -> Option<Decimal> {
        self.rates.get(&(level, package)).copied()
    }
}

/// 金额舍入规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundingRule {
    /// 最小货币单位的小数位数
    pub scale: u32,
    pub strategy: RoundingMode,
}

impl Default for RoundingRule {
    fn default() -> Self {
        Self {
            scale: 2,
            strategy: RoundingMode::HalfEven,
        }
    }
}

impl RoundingRule {
    pub fn apply(&self, amount: Decimal) -> Decimal {
        let strategy = match self.strategy {
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::Down => RoundingStrategy::ToZero,
        };
        let mut rounded = amount.round_dp_with_strategy(self.scale, strategy);
        rounded.rescale(self.scale);
        rounded
    }
}

/// 佣金引擎配置(构造时显式传入)
#[derive(Clone)]
pub struct CommissionConfig {
    pub max_levels: u8,
    pub rates: Arc<dyn RateLookup + Send + Sync>,
    pub rounding: RoundingRule,
}

impl fmt::Debug for CommissionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommissionConfig")
            .field("max_levels", &self.max_levels)
            .field("rounding", &self.rounding)
            .finish_non_exhaustive()
    }
}

impl CommissionConfig {
    pub fn new(max_levels: u8, rates: impl RateLookup + Send + Sync + 'static, rounding: RoundingRule) -> Self {
        Self {
            max_levels,
            rates: Arc::new(rates),
            rounding,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> anyhow::Result<Self> {
        let rates = RateTable::from_json(&config.commission_rates)?;
        if rates.is_empty() {
            tracing::warn!("⚠️ 佣金费率表为空，不会产生任何佣金");
        }

        Ok(Self::new(
            config.max_commission_levels,
            rates,
            RoundingRule {
                scale: config.minor_unit_scale,
                strategy: config.rounding_strategy,
            },
        ))
    }
}
