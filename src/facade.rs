use std::sync::Arc;

use crate::client::Client;
use crate::realtime::ChangeNotifier;
use crate::repo::Repository;
use crate::session::SessionProvider;
use crate::types::EntityKind;

/// The one namespace application code consumes: session operations,
/// one repository per entity type, and the realtime change notifier.
///
/// Pure composition over an injected [`Client`] — the facade holds no
/// state of its own. Construct it once per process and share it;
/// nothing enforces that, but repositories are cheap clones over the
/// same client either way.
pub struct Facade {
    pub session: SessionProvider,
    pub portfolios: Repository,
    pub programmes: Repository,
    pub projects: Repository,
    pub tasks: Repository,
    pub resources: Repository,
    pub risks: Repository,
    pub realtime: ChangeNotifier,
}

impl Facade {
    pub fn new(client: Arc<dyn Client>) -> Self {
        let session = SessionProvider::new(client.clone());
        let repo = |kind| Repository::new(client.clone(), session.clone(), kind);
        Self {
            portfolios: repo(EntityKind::Portfolio),
            programmes: repo(EntityKind::Programme),
            projects: repo(EntityKind::Project),
            tasks: repo(EntityKind::Task),
            resources: repo(EntityKind::Resource),
            risks: repo(EntityKind::Risk),
            realtime: ChangeNotifier::new(client.clone()),
            session,
        }
    }

    /// Keyed access to the same repositories the named fields expose.
    #[must_use]
    pub fn repository(&self, kind: EntityKind) -> &Repository {
        match kind {
            EntityKind::Portfolio => &self.portfolios,
            EntityKind::Programme => &self.programmes,
            EntityKind::Project => &self.projects,
            EntityKind::Task => &self.tasks,
            EntityKind::Resource => &self.resources,
            EntityKind::Risk => &self.risks,
        }
    }
}
