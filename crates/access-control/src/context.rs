//! Session authorization context

use crate::{AccessEntry, AccessError, AccessType, Role, User};
use tracing::warn;

/// Immutable snapshot of the session user's privileges.
///
/// Built once when a directory opens and never refreshed, so role or
/// access-list changes made afterwards are not observed until a new
/// session is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    username: String,
    is_admin: bool,
    access_list: Vec<AccessEntry>,
}

impl AuthContext {
    pub fn new(username: &str, role: Role, access_list: Vec<AccessEntry>) -> Self {
        Self {
            username: username.to_string(),
            is_admin: role == Role::Admin,
            access_list,
        }
    }

    pub fn from_user(user: &User) -> Self {
        Self::new(&user.username, user.role, user.access_list.clone())
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn access_list(&self) -> &[AccessEntry] {
        &self.access_list
    }

    /// Any access-list entry naming the device grants read access
    pub fn can_read(&self, device_id: &str) -> bool {
        self.access_list.iter().any(|e| e.device_id == device_id)
    }

    /// Write access needs a read-write entry for the device
    pub fn can_write(&self, device_id: &str) -> bool {
        self.access_list
            .iter()
            .any(|e| e.device_id == device_id && e.access_type == AccessType::ReadWrite)
    }

    pub fn require_admin(&self, action: &str) -> Result<(), AccessError> {
        self.require(self.is_admin, action)
    }

    pub fn require_read(&self, device_id: &str, action: &str) -> Result<(), AccessError> {
        self.require(self.can_read(device_id), action)
    }

    pub fn require_write(&self, device_id: &str, action: &str) -> Result<(), AccessError> {
        self.require(self.can_write(device_id), action)
    }

    fn require(&self, granted: bool, action: &str) -> Result<(), AccessError> {
        if granted {
            return Ok(());
        }
        warn!("Denied {} for {}", action, self.username);
        Err(AccessError::Unauthorized {
            username: self.username.clone(),
            action: action.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry_strategy() -> impl Strategy<Value = AccessEntry> {
        ("DT00[0-4]", any::<bool>()).prop_map(|(device_id, rw)| {
            if rw {
                AccessEntry::read_write(&device_id)
            } else {
                AccessEntry::read_only(&device_id)
            }
        })
    }

    #[test]
    fn test_admin_flag_from_role() {
        assert!(AuthContext::new("admin", Role::Admin, vec![]).is_admin());
        assert!(!AuthContext::new("user_1", Role::Standard, vec![]).is_admin());
    }

    #[test]
    fn test_read_only_entry() {
        let ctx = AuthContext::new("user_1", Role::Standard, vec![AccessEntry::read_only("DT001")]);
        assert!(ctx.can_read("DT001"));
        assert!(!ctx.can_write("DT001"));
        assert!(!ctx.can_read("DT002"));
    }

    #[test]
    fn test_admin_without_entries_has_no_device_access() {
        let ctx = AuthContext::new("admin", Role::Admin, vec![]);
        assert!(!ctx.can_read("DT001"));
        assert!(ctx.require_write("DT001", "record reading").is_err());
        assert!(ctx.require_admin("insert device").is_ok());
    }

    #[test]
    fn test_denial_names_user_and_action() {
        let ctx = AuthContext::new("user_2", Role::Standard, vec![]);
        let err = ctx.require_admin("insert device DT201").unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "User user_2 is not allowed to insert device DT201");
    }

    proptest! {
        #[test]
        fn prop_read_iff_any_entry(entries in prop::collection::vec(entry_strategy(), 0..6), probe in "DT00[0-5]") {
            let ctx = AuthContext::new("u", Role::Standard, entries.clone());
            let named = entries.iter().any(|e| e.device_id == probe);
            prop_assert_eq!(ctx.can_read(&probe), named);
        }

        #[test]
        fn prop_write_iff_rw_entry(entries in prop::collection::vec(entry_strategy(), 0..6), probe in "DT00[0-5]") {
            let ctx = AuthContext::new("u", Role::Standard, entries.clone());
            let rw = entries
                .iter()
                .any(|e| e.device_id == probe && e.access_type == AccessType::ReadWrite);
            prop_assert_eq!(ctx.can_write(&probe), rw);
            if ctx.can_write(&probe) {
                prop_assert!(ctx.can_read(&probe));
            }
        }
    }
}
