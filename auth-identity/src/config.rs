use serde::{Deserialize, Serialize};

use crate::models::DEFAULT_ROLE;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Roles attached to identities created by registration or first provider sign-in
    #[serde(default = "default_roles")]
    pub default_roles: Vec<String>,
}

fn default_roles() -> Vec<String> { vec![DEFAULT_ROLE.to_string()] }

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            default_roles: default_roles(),
        }
    }
}
