pub const SCHEMA: &str = r#"
-- Principals are the authenticated actors; every entity row is owned by one
CREATE TABLE IF NOT EXISTS principals (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    display_name TEXT,
    password_hash TEXT NOT NULL,  -- argon2id hash with embedded salt
    created_at TEXT DEFAULT (datetime('now'))
);

-- Entity tables all share one shape: server-assigned id, immutable owner,
-- creation timestamp (the default ordering key), an optional parent
-- reference, and a free-form JSON attribute payload the core never validates.

CREATE TABLE IF NOT EXISTS portfolios (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    attributes TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS programmes (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
    portfolio_id TEXT REFERENCES portfolios(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    attributes TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
    programme_id TEXT REFERENCES programmes(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    attributes TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
    project_id TEXT REFERENCES projects(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    attributes TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS resources (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
    project_id TEXT REFERENCES projects(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    attributes TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS risks (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
    project_id TEXT REFERENCES projects(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    attributes TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_programmes_portfolio ON programmes(portfolio_id);
CREATE INDEX IF NOT EXISTS idx_projects_programme ON projects(programme_id);
CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
CREATE INDEX IF NOT EXISTS idx_resources_project ON resources(project_id);
CREATE INDEX IF NOT EXISTS idx_risks_project ON risks(project_id);
"#;
