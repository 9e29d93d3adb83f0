use crate::services::ledger::{total_with_gst, PackageInfo};
use database::PackageType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 套餐目录项(含税价)
#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct PackageResponse {
    pub package_type: PackageType,
    pub name: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    #[schema(value_type = String)]
    pub gst_amount: Decimal,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub features: Vec<String>,
}

impl PackageResponse {
    pub fn new(info: &PackageInfo, gst_rate: Decimal) -> Self {
        let total_amount = total_with_gst(info.price, gst_rate);
        Self {
            package_type: info.package_type,
            name: info.name.to_string(),
            price: info.price,
            gst_amount: total_amount - info.price,
            total_amount,
            features: info.features.iter().map(|f| f.to_string()).collect(),
        }
    }
}
