//! User records

use serde::{Deserialize, Serialize};
use std::fmt;
use storage::ObjectId;

/// User role. Only `admin` is privileged; any other stored role name
/// (the seed data uses `default`) loads as `Standard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Standard,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Standard => "standard",
        }
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        if name == "admin" {
            Role::Admin
        } else {
            Role::Standard
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of access granted on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessType {
    #[serde(rename = "r")]
    ReadOnly,
    #[serde(rename = "rw")]
    ReadWrite,
}

/// Access-list entry granting access to one device's data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEntry {
    pub device_id: String,
    pub access_type: AccessType,
}

impl AccessEntry {
    pub fn read_only(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            access_type: AccessType::ReadOnly,
        }
    }

    pub fn read_write(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            access_type: AccessType::ReadWrite,
        }
    }
}

/// Stored user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub access_list: Vec<AccessEntry>,
}

/// User fields supplied on insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub access_list: Vec<AccessEntry>,
}

impl NewUser {
    pub fn new(username: &str, email: &str, role: Role) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            role,
            access_list: Vec::new(),
        }
    }

    pub fn with_access(mut self, entry: AccessEntry) -> Self {
        self.access_list.push(entry);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_names() {
        let admin: Role = serde_json::from_value(json!("admin")).unwrap();
        let default: Role = serde_json::from_value(json!("default")).unwrap();
        assert_eq!(admin, Role::Admin);
        assert_eq!(default, Role::Standard);
        assert_eq!(serde_json::to_value(Role::Standard).unwrap(), json!("standard"));
    }

    #[test]
    fn test_user_from_stored_document() {
        let id = ObjectId::new();
        let user: User = serde_json::from_value(json!({
            "_id": id.to_string(),
            "username": "user_1",
            "email": "user_1@example.com",
            "role": "default",
            "access_list": [
                {"device_id": "DT001", "access_type": "r"},
                {"device_id": "DT002", "access_type": "rw"}
            ]
        }))
        .unwrap();

        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Standard);
        assert_eq!(user.access_list[1], AccessEntry::read_write("DT002"));
    }

    #[test]
    fn test_access_list_optional() {
        let user: User = serde_json::from_value(json!({
            "_id": ObjectId::new().to_string(),
            "username": "admin",
            "email": "admin@example.com",
            "role": "admin"
        }))
        .unwrap();
        assert!(user.access_list.is_empty());
    }
}
