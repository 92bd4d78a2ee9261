use std::fmt;

use serde::{Deserialize, Serialize};

/// The six entity types of the portfolio hierarchy.
///
/// Each kind maps to one table and, except for portfolios, declares the
/// column holding its parent reference:
/// programmes → portfolios, projects → programmes, and tasks,
/// resources, and risks → projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Portfolio,
    Programme,
    Project,
    Task,
    Resource,
    Risk,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Portfolio,
        EntityKind::Programme,
        EntityKind::Project,
        EntityKind::Task,
        EntityKind::Resource,
        EntityKind::Risk,
    ];

    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            EntityKind::Portfolio => "portfolios",
            EntityKind::Programme => "programmes",
            EntityKind::Project => "projects",
            EntityKind::Task => "tasks",
            EntityKind::Resource => "resources",
            EntityKind::Risk => "risks",
        }
    }

    /// The column carrying this kind's parent reference, if it has one.
    #[must_use]
    pub const fn parent_field(self) -> Option<&'static str> {
        match self {
            EntityKind::Portfolio => None,
            EntityKind::Programme => Some("portfolio_id"),
            EntityKind::Project => Some("programme_id"),
            EntityKind::Task | EntityKind::Resource | EntityKind::Risk => Some("project_id"),
        }
    }

    /// Converts a table name back to its kind.
    pub fn parse(s: &str) -> Option<EntityKind> {
        match s {
            "portfolios" => Some(EntityKind::Portfolio),
            "programmes" => Some(EntityKind::Programme),
            "projects" => Some(EntityKind::Project),
            "tasks" => Some(EntityKind::Task),
            "resources" => Some(EntityKind::Resource),
            "risks" => Some(EntityKind::Risk),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}
