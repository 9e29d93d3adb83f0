use database::PackageType;
use lazy_static::lazy_static;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// 课程套餐
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PackageInfo {
    pub package_type: PackageType,
    #[schema(value_type = String)]
    pub name: &'static str,
    /// 不含税价格
    #[schema(value_type = String)]
    pub price: Decimal,
    #[schema(value_type = Vec<String>)]
    pub features: Vec<&'static str>,
}

lazy_static! {
    pub static ref PACKAGE_CATALOG: BTreeMap<PackageType, PackageInfo> = {
        let mut catalog = BTreeMap::new();
        catalog.insert(
            PackageType::Silver,
            PackageInfo {
                package_type: PackageType::Silver,
                name: "Silver Package",
                price: Decimal::from(2950),
                features: vec![
                    "Access to 15+ courses",
                    "Basic support",
                    "Certificate of completion",
                    "Mobile app access",
                ],
            },
        );
        catalog.insert(
            PackageType::Gold,
            PackageInfo {
                package_type: PackageType::Gold,
                name: "Gold Package",
                price: Decimal::from(5310),
                features: vec![
                    "Access to 25+ courses",
                    "Priority support",
                    "Certificate of completion",
                    "Mobile app access",
                    "Live webinars",
                    "Community access",
                ],
            },
        );
        catalog.insert(
            PackageType::Platinum,
            PackageInfo {
                package_type: PackageType::Platinum,
                name: "Platinum Package",
                price: Decimal::from(8850),
                features: vec![
                    "Access to 35+ courses",
                    "Premium support",
                    "Certificate of completion",
                    "Mobile app access",
                    "Live webinars",
                    "Community access",
                    "1-on-1 mentoring",
                    "Advanced resources",
                ],
            },
        );
        catalog
    };
}

pub fn package_info(package: PackageType) -> Option<&'static PackageInfo> {
    PACKAGE_CATALOG.get(&package)
}

/// 含税总价，四舍五入到整数
pub fn total_with_gst(price: Decimal, gst_rate: Decimal) -> Decimal {
    (price * (Decimal::ONE + gst_rate)).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_prices() {
        assert_eq!(PACKAGE_CATALOG.len(), PackageType::ALL.len());
        for package in PackageType::ALL {
            assert_eq!(package_info(package).unwrap().package_type, package);
        }
        assert_eq!(package_info(PackageType::Silver).unwrap().price, Decimal::from(2950));
        assert_eq!(package_info(PackageType::Gold).unwrap().price, Decimal::from(5310));
        assert_eq!(package_info(PackageType::Platinum).unwrap().price, Decimal::from(8850));
    }

    #[test]
    fn test_total_with_gst() {
        let gst = Decimal::new(18, 2);
        assert_eq!(total_with_gst(Decimal::from(2950), gst), Decimal::from(3481));
        // 5310 * 1.18 = 6265.8
        assert_eq!(total_with_gst(Decimal::from(5310), gst), Decimal::from(6266));
        assert_eq!(total_with_gst(Decimal::from(8850), gst), Decimal::from(10443));
        assert_eq!(total_with_gst(Decimal::from(100), Decimal::ZERO), Decimal::from(100));
        println!("✅ 测试通过: 含税价格");
    }
}
