use serde::{Deserialize, Serialize};

/// One entry of a hierarchy update as sent by the console.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleInput {
    pub role_name: String,
    pub hierarchy_order: i32,
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHierarchyRequest {
    pub roles: Option<Vec<RoleInput>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRoleRequest {
    pub role_name: Option<String>,
}

/// `{ success, data }` envelope used by every hierarchy endpoint.
#[derive(Debug, Serialize)]
pub struct HierarchyResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> HierarchyResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

impl HierarchyResponse<()> {
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
        }
    }
}
