use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRoleRequest {
    pub target_email: Option<String>,
    pub role: Option<String>,
    pub role_color: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRoleResponse {
    pub message: String,
    pub user: String,
    pub role: String,
    pub role_color: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRequest {
    pub target_email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTrialRequest {
    pub target_email: Option<String>,
    #[serde(default)]
    pub days: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanRequest {
    pub target_email: Option<String>,
    pub duration: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserActionResponse {
    pub message: String,
    pub user: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MagicLinkResponse {
    pub message: String,
    pub magic_link: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
