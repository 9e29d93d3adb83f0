use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Clone, Serialize, Deserialize, Debug, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CommissionQuery {
    /// pending / approved / paid / cancelled
    pub status: Option<String>,
}
