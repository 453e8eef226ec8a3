use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, Debug, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvite {
    #[validate(length(min = 1, max = 64))]
    pub owner_name: String,
    #[validate(url)]
    pub owner_avatar: Option<String>,
    /// Code from an earlier call, handed back while it is still active.
    pub preferred_code: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RedeemInvite {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResult {
    pub success: bool,
    pub couple_id: Uuid,
}
