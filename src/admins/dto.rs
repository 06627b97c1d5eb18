use serde::{Deserialize, Serialize};

use super::repo::AdminRecord;

/// Body of add / remove requests.
#[derive(Debug, Deserialize)]
pub struct AdminEmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    pub admins: Vec<AdminRecord>,
}

#[derive(Debug, Serialize)]
pub struct AdminAddedResponse {
    pub message: String,
    pub admin: AdminRecord,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
