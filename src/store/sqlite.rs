use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter, types};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::credentials::CredentialHasher;
use super::schema::SCHEMA;
use crate::client::{Client, Select};
use crate::error::{Error, Result};
use crate::realtime::channel_name;
use crate::types::{ChangeEvent, ChangeKind, EntityKind, Principal, Record, Row};

const CHANNEL_CAPACITY: usize = 64;

/// One named change channel with the number of opens held on it.
/// Releasing an open decrements the count; the sender is dropped only
/// when the count reaches zero, so subscribers on the same table never
/// close each other's streams.
struct Channel {
    tx: broadcast::Sender<ChangeEvent>,
    opens: usize,
}

/// Embedded SQLite implementation of the capability [`Client`]: local
/// identity, the six entity tables, and in-process change channels.
/// Lets the facade run standalone and gives the tests a real store.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    hasher: CredentialHasher,
    active: Mutex<Option<Principal>>,
    channels: Mutex<HashMap<String, Channel>>,
}

impl SqliteBackend {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self::wrap(conn))
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self::wrap(conn))
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            hasher: CredentialHasher::new(),
            active: Mutex::new(None),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, table: &str, event: ChangeEvent) {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(channel) = channels.get(&channel_name(table)) {
            // Send only fails with no live receivers; nothing to do then.
            let _ = channel.tx.send(event);
        }
    }
}

fn entity(table: &str) -> Result<EntityKind> {
    EntityKind::parse(table).ok_or_else(|| Error::Query(format!("unknown table: {table}")))
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

// Fixed-width fraction so string comparison in ORDER BY matches
// chronological order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Maps a logical column to a SQL expression. Fixed columns and the
/// table's parent column are real; everything else lives in the
/// `attributes` JSON payload.
fn column_expr(kind: EntityKind, column: &str) -> Result<String> {
    if !is_ident(column) {
        return Err(Error::Query(format!("invalid column name: {column}")));
    }
    match column {
        "id" | "owner_id" | "created_at" => Ok(column.to_string()),
        c if Some(c) == kind.parent_field() => Ok(c.to_string()),
        _ => Ok(format!("json_extract(attributes, '$.{column}')")),
    }
}

fn select_columns(kind: EntityKind) -> String {
    match kind.parent_field() {
        Some(parent) => format!("id, owner_id, created_at, attributes, {parent}"),
        None => "id, owner_id, created_at, attributes".to_string(),
    }
}

fn read_record(kind: EntityKind, row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let id: String = row.get(0)?;
    let owner_id: String = row.get(1)?;
    let created_at = parse_datetime(&row.get::<_, String>(2)?);
    let attributes: String = row.get(3)?;
    let mut fields: Row = serde_json::from_str(&attributes).unwrap_or_default();
    if let Some(parent_field) = kind.parent_field() {
        let parent: Option<String> = row.get(4)?;
        if let Some(parent) = parent {
            fields.insert(parent_field.to_string(), Value::String(parent));
        }
    }
    Ok(Record {
        id,
        owner_id,
        created_at,
        fields,
    })
}

fn bind_value(value: &Value) -> types::Value {
    match value {
        Value::Null => types::Value::Null,
        Value::Bool(b) => types::Value::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => types::Value::Integer(i),
            None => types::Value::Real(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => types::Value::Text(s.clone()),
        other => types::Value::Text(other.to_string()),
    }
}

/// Pulls the parent reference out of an attribute map, leaving the
/// remaining attributes for the JSON payload.
fn take_parent(kind: EntityKind, fields: &mut Row) -> Result<Option<String>> {
    let Some(parent_field) = kind.parent_field() else {
        return Ok(None);
    };
    match fields.remove(parent_field) {
        Some(Value::String(parent)) => Ok(Some(parent)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(Error::Query(format!(
            "{parent_field} must be a string id"
        ))),
    }
}

#[async_trait]
impl Client for SqliteBackend {
    // Identity operations

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Principal> {
        let password_hash = self.hasher.hash(password)?;
        let principal = Principal {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: display_name.map(str::to_string),
        };

        self.conn()
            .execute(
                "INSERT INTO principals (id, email, display_name, password_hash)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    principal.id,
                    principal.email,
                    principal.display_name,
                    password_hash
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(f, _)
                    if f.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Error::Identity("account already exists".to_string())
                }
                e => Error::Database(e),
            })?;

        Ok(principal)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal> {
        let row = {
            let conn = self.conn();
            conn.query_row(
                "SELECT id, email, display_name, password_hash FROM principals WHERE email = ?1",
                params![email],
                |row| {
                    Ok((
                        Principal {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            display_name: row.get(2)?,
                        },
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?
        };

        // One message for both unknown account and bad password.
        let (principal, password_hash) =
            row.ok_or_else(|| Error::Identity("invalid credentials".to_string()))?;
        if !self.hasher.verify(password, &password_hash)? {
            return Err(Error::Identity("invalid credentials".to_string()));
        }

        *self.active.lock().unwrap_or_else(|e| e.into_inner()) = Some(principal.clone());
        Ok(principal)
    }

    async fn sign_out(&self) -> Result<()> {
        *self.active.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }

    async fn current_principal(&self) -> Result<Option<Principal>> {
        Ok(self.active.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    // Relational operations

    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Record>> {
        let kind = entity(table)?;
        let mut sql = format!("SELECT {} FROM {}", select_columns(kind), kind.table());
        let mut binds: Vec<types::Value> = Vec::new();

        if let Some((column, value)) = &query.filter {
            sql.push_str(&format!(" WHERE {} = ?1", column_expr(kind, column)?));
            binds.push(bind_value(value));
        }
        if let Some(order) = &query.order {
            let direction = if order.descending { "DESC" } else { "ASC" };
            sql.push_str(&format!(
                " ORDER BY {} {direction}",
                column_expr(kind, &order.column)?
            ));
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(binds), |row| read_record(kind, row))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    async fn select_one(&self, table: &str, id: &str) -> Result<Record> {
        let kind = entity(table)?;
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {} FROM {} WHERE id = ?1",
                select_columns(kind),
                kind.table()
            ),
            params![id],
            |row| read_record(kind, row),
        )
        .optional()?
        .ok_or(Error::NotFound)
    }

    async fn insert(&self, table: &str, row: &Row) -> Result<Record> {
        let kind = entity(table)?;
        let mut fields = row.clone();
        let owner_id = match fields.remove("owner_id") {
            Some(Value::String(owner)) => owner,
            _ => return Err(Error::Query("owner_id is required on insert".to_string())),
        };
        let parent = take_parent(kind, &mut fields)?;

        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let attributes =
            serde_json::to_string(&fields).map_err(|e| Error::Query(e.to_string()))?;

        {
            let conn = self.conn();
            match kind.parent_field() {
                Some(parent_field) => conn.execute(
                    &format!(
                        "INSERT INTO {} (id, owner_id, {parent_field}, created_at, attributes)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        kind.table()
                    ),
                    params![id, owner_id, parent, format_datetime(&created_at), attributes],
                )?,
                None => conn.execute(
                    &format!(
                        "INSERT INTO {} (id, owner_id, created_at, attributes)
                         VALUES (?1, ?2, ?3, ?4)",
                        kind.table()
                    ),
                    params![id, owner_id, format_datetime(&created_at), attributes],
                )?,
            };
        }

        let record = self.select_one(table, &id).await?;
        self.publish(
            table,
            ChangeEvent {
                kind: ChangeKind::Insert,
                table: table.to_string(),
                new: Some(record.clone()),
                old: None,
            },
        );
        Ok(record)
    }

    async fn update(&self, table: &str, id: &str, patch: &Row) -> Result<Record> {
        let kind = entity(table)?;
        let old = self.select_one(table, id).await?;

        let mut merged = old.fields.clone();
        for (column, value) in patch {
            if matches!(column.as_str(), "id" | "owner_id" | "created_at") {
                return Err(Error::Query(format!("column {column} is immutable")));
            }
            merged.insert(column.clone(), value.clone());
        }
        let parent = take_parent(kind, &mut merged)?;
        let attributes =
            serde_json::to_string(&merged).map_err(|e| Error::Query(e.to_string()))?;

        {
            let conn = self.conn();
            let changed = match kind.parent_field() {
                Some(parent_field) => conn.execute(
                    &format!(
                        "UPDATE {} SET {parent_field} = ?1, attributes = ?2 WHERE id = ?3",
                        kind.table()
                    ),
                    params![parent, attributes, id],
                )?,
                None => conn.execute(
                    &format!("UPDATE {} SET attributes = ?1 WHERE id = ?2", kind.table()),
                    params![attributes, id],
                )?,
            };
            if changed == 0 {
                return Err(Error::NotFound);
            }
        }

        let record = self.select_one(table, id).await?;
        self.publish(
            table,
            ChangeEvent {
                kind: ChangeKind::Update,
                table: table.to_string(),
                new: Some(record.clone()),
                old: Some(old),
            },
        );
        Ok(record)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        let kind = entity(table)?;
        let old = match self.select_one(table, id).await {
            Ok(record) => Some(record),
            Err(Error::NotFound) => None,
            Err(e) => return Err(e),
        };

        let removed = self.conn().execute(
            &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
            params![id],
        )?;

        if removed > 0 {
            self.publish(
                table,
                ChangeEvent {
                    kind: ChangeKind::Delete,
                    table: table.to_string(),
                    new: None,
                    old,
                },
            );
        }
        Ok(())
    }

    // Channel operations

    async fn open_channel(
        &self,
        name: &str,
        table: &str,
    ) -> Result<broadcast::Receiver<ChangeEvent>> {
        entity(table)?;
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let channel = channels.entry(name.to_string()).or_insert_with(|| Channel {
            tx: broadcast::channel(CHANNEL_CAPACITY).0,
            opens: 0,
        });
        channel.opens += 1;
        Ok(channel.tx.subscribe())
    }

    async fn close_channel(&self, name: &str) -> Result<()> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(channel) = channels.get_mut(name) {
            channel.opens = channel.opens.saturating_sub(1);
            if channel.opens == 0 {
                channels.remove(name);
            }
        }
        Ok(())
    }
}
