// File: buildtrack-core/src/permissions.rs
// Purpose: Static role table and permission checks

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Role of a user within the organisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    ProjectManager,
    SiteSupervisor,
    Worker,
    Client,
    /// Anything the table does not know about
    #[serde(other)]
    Unknown,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::ProjectManager,
        Role::SiteSupervisor,
        Role::Worker,
        Role::Client,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ProjectManager => "project-manager",
            Role::SiteSupervisor => "site-supervisor",
            Role::Worker => "worker",
            Role::Client => "client",
            Role::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| ParseRoleError(s.to_string()))
    }
}

/// Something a user may be allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "project:view")]
    ViewProject,
    #[serde(rename = "project:manage")]
    ManageProject,
    #[serde(rename = "task:view")]
    ViewTask,
    #[serde(rename = "task:create")]
    CreateTask,
    #[serde(rename = "task:edit")]
    EditTask,
    #[serde(rename = "task:assign")]
    AssignTask,
    #[serde(rename = "task:delete")]
    DeleteTask,
    #[serde(rename = "comment:add")]
    AddComment,
    #[serde(rename = "document:upload")]
    UploadDocument,
    #[serde(rename = "document:view")]
    ViewDocument,
    #[serde(rename = "dashboard:view")]
    ViewDashboard,
    #[serde(rename = "map:view")]
    ViewMap,
    #[serde(rename = "report:view")]
    ViewReport,
    #[serde(rename = "user:manage")]
    ManageUsers,
}

impl Permission {
    pub const ALL: [Permission; 14] = [
        Permission::ViewProject,
        Permission::ManageProject,
        Permission::ViewTask,
        Permission::CreateTask,
        Permission::EditTask,
        Permission::AssignTask,
        Permission::DeleteTask,
        Permission::AddComment,
        Permission::UploadDocument,
        Permission::ViewDocument,
        Permission::ViewDashboard,
        Permission::ViewMap,
        Permission::ViewReport,
        Permission::ManageUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewProject => "project:view",
            Permission::ManageProject => "project:manage",
            Permission::ViewTask => "task:view",
            Permission::CreateTask => "task:create",
            Permission::EditTask => "task:edit",
            Permission::AssignTask => "task:assign",
            Permission::DeleteTask => "task:delete",
            Permission::AddComment => "comment:add",
            Permission::UploadDocument => "document:upload",
            Permission::ViewDocument => "document:view",
            Permission::ViewDashboard => "dashboard:view",
            Permission::ViewMap => "map:view",
            Permission::ViewReport => "report:view",
            Permission::ManageUsers => "user:manage",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission: {0}")]
pub struct ParsePermissionError(pub String);

impl FromStr for Permission {
    type Err = ParsePermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ParsePermissionError(s.to_string()))
    }
}

/// The user a permission check is made for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, name: None, role }
    }
}

static ROLE_TABLE: Lazy<HashMap<Role, HashSet<Permission>>> = Lazy::new(|| {
    use Permission::*;

    let viewing = [ViewProject, ViewTask, ViewDocument, ViewDashboard, ViewMap];

    let mut table = HashMap::new();
    table.insert(Role::Admin, Permission::ALL.into_iter().collect());
    table.insert(
        Role::ProjectManager,
        viewing
            .into_iter()
            .chain([
                ManageProject,
                CreateTask,
                EditTask,
                AssignTask,
                DeleteTask,
                AddComment,
                UploadDocument,
                ViewReport,
            ])
            .collect(),
    );
    table.insert(
        Role::SiteSupervisor,
        viewing
            .into_iter()
            .chain([CreateTask, EditTask, AssignTask, AddComment, UploadDocument, ViewReport])
            .collect(),
    );
    table.insert(
        Role::Worker,
        [ViewProject, ViewTask, ViewDocument, ViewDashboard, EditTask, AddComment, UploadDocument]
            .into_iter()
            .collect(),
    );
    table.insert(
        Role::Client,
        [ViewProject, ViewDocument, ViewDashboard, ViewMap, ViewReport]
            .into_iter()
            .collect(),
    );
    table
});

/// Check whether `actor` may perform `permission`.
///
/// No actor, or a role without a table entry, is always denied.
pub fn has_permission(actor: Option<&Actor>, permission: Permission) -> bool {
    actor
        .and_then(|actor| ROLE_TABLE.get(&actor.role))
        .map(|granted| granted.contains(&permission))
        .unwrap_or(false)
}

/// Permissions granted to a role, in declaration order
pub fn permissions_for(role: Role) -> Vec<Permission> {
    match ROLE_TABLE.get(&role) {
        Some(granted) => Permission::ALL
            .into_iter()
            .filter(|p| granted.contains(p))
            .collect(),
        None => Vec::new(),
    }
}
