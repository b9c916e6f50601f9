//! User Directory

use crate::{AccessError, AuthContext, NewUser, Role, User};
use storage::{from_document, to_document, Filter, ObjectId, SharedGateway, StorageError};
use tracing::{debug, info, warn};

/// Users collection, mediated by the privileges of the user who opened it
pub struct UserDirectory {
    gateway: SharedGateway,
    context: AuthContext,
    latest_error: Option<String>,
}

impl UserDirectory {
    pub const COLLECTION: &'static str = "users";

    /// Open a session as `username`, caching its role and access list
    pub fn open(gateway: SharedGateway, username: &str) -> Result<Self, AccessError> {
        let user = find(&gateway, &Filter::new().eq("username", username))?
            .ok_or_else(|| AccessError::UnknownUser(username.to_string()))?;

        let context = AuthContext::from_user(&user);
        info!(
            "Opened session for {} (admin: {}, {} access entries)",
            username,
            context.is_admin(),
            context.access_list().len()
        );

        Ok(Self {
            gateway,
            context,
            latest_error: None,
        })
    }

    /// Privileges cached when the session opened
    pub fn context(&self) -> &AuthContext {
        &self.context
    }

    /// Message of the last rejected insert, cleared when an insert starts
    pub fn latest_error(&self) -> Option<&str> {
        self.latest_error.as_deref()
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<User>, AccessError> {
        self.context.require_admin("look up users")?;
        find(&self.gateway, &Filter::new().eq("username", username))
    }

    /// User holding `role`, if any. Stored role names other than `admin`
    /// all load as `Role::Standard`, so any of them matches `Standard`.
    pub fn find_role_assignment(&self, username: &str, role: Role) -> Result<Option<User>, AccessError> {
        self.context.require_admin("look up role assignments")?;
        let user = find(&self.gateway, &Filter::new().eq("username", username))?;
        Ok(user.filter(|u| u.role == role))
    }

    pub fn find_by_object_id(&self, id: ObjectId) -> Result<Option<User>, AccessError> {
        self.context.require_admin("look up users")?;
        find(&self.gateway, &Filter::by_id(id))
    }

    pub fn all_users(&self) -> Result<Vec<User>, AccessError> {
        self.context.require_admin("list users")?;
        self.gateway
            .fetch_all(Self::COLLECTION, &Filter::new())?
            .into_iter()
            .map(|d| from_document(d).map_err(AccessError::from))
            .collect()
    }

    /// Insert a user without device access
    pub fn insert(&mut self, username: &str, email: &str, role: Role) -> Result<User, AccessError> {
        self.insert_with_access(NewUser::new(username, email, role))
    }

    pub fn insert_with_access(&mut self, user: NewUser) -> Result<User, AccessError> {
        self.context.require_admin("insert users")?;
        self.latest_error = None;

        if find(&self.gateway, &Filter::new().eq("username", user.username.as_str()))?.is_some() {
            return Err(self.duplicate(&user.username));
        }

        let id = match self.gateway.insert_one(Self::COLLECTION, to_document(&user)?) {
            Ok(id) => id,
            Err(StorageError::UniqueViolation { .. }) => return Err(self.duplicate(&user.username)),
            Err(e) => return Err(e.into()),
        };
        info!("Inserted user {} ({})", user.username, user.role);

        find(&self.gateway, &Filter::by_id(id))?.ok_or(AccessError::Storage(StorageError::NotFound))
    }

    pub fn can_read(&self, device_id: &str) -> bool {
        self.context.can_read(device_id)
    }

    pub fn can_write(&self, device_id: &str) -> bool {
        self.context.can_write(device_id)
    }

    fn duplicate(&mut self, username: &str) -> AccessError {
        let message = format!("Username {username} already exists");
        warn!("{}", message);
        self.latest_error = Some(message.clone());
        AccessError::DuplicateKey(message)
    }
}

fn find(gateway: &SharedGateway, filter: &Filter) -> Result<Option<User>, AccessError> {
    debug!("Finding user with {:?}", filter);
    match gateway.fetch_one(UserDirectory::COLLECTION, filter)? {
        Some(document) => Ok(Some(from_document(document)?)),
        None => Ok(None),
    }
}
