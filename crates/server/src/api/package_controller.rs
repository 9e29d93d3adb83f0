use crate::{dtos::package_dto::PackageResponse, services::ledger::PACKAGE_CATALOG, services::Services};
use axum::{routing::get, Extension, Json, Router};

/// 套餐目录
#[utoipa::path(
    get,
    path = "/api/v1/packages",
    tag = "package",
    responses(
        (status = 200, description = "所有可购买的套餐(含 GST 总价)", body = Vec<PackageResponse>)
    )
)]
pub async fn list_packages(Extension(services): Extension<Services>) -> Json<Vec<PackageResponse>> {
    let packages = PACKAGE_CATALOG
        .values()
        .map(|info| PackageResponse::new(info, services.config.gst_rate))
        .collect();

    Json(packages)
}

pub struct PackageController;
impl PackageController {
    pub fn app() -> Router {
        Router::new().route("/", get(list_packages))
    }
}
