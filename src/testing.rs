//! In-memory stub of the capability client for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::client::{Client, Select};
use crate::error::{Error, Result};
use crate::types::{ChangeEvent, ChangeKind, Principal, Record, Row};

pub fn row(entries: &[(&str, Value)]) -> Row {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[derive(Default)]
pub struct StubClient {
    accounts: Mutex<HashMap<String, (String, Principal)>>,
    active: Mutex<Option<Principal>>,
    tables: Mutex<HashMap<String, Vec<Record>>>,
    // Sender plus the number of opens held on the channel; the sender
    // is dropped only when the last open is released.
    channels: Mutex<HashMap<String, (broadcast::Sender<ChangeEvent>, usize)>>,
    identity_down: AtomicBool,
    inserts: AtomicUsize,
    // Monotonic tick so created_at ordering is deterministic even when
    // two inserts land within one clock granule.
    ticks: AtomicUsize,
}

impl StubClient {
    /// Makes every identity operation fail, simulating an unreachable
    /// identity service.
    pub fn fail_identity(&self) {
        self.identity_down.store(true, Ordering::Relaxed);
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Pushes a synthetic insert event onto the open channel for
    /// `table`, as an external writer would.
    pub fn emit_insert(&self, table: &str) {
        let channel = crate::realtime::channel_name(table);
        if let Some((tx, _)) = self.channels.lock().unwrap().get(&channel) {
            let _ = tx.send(ChangeEvent {
                kind: ChangeKind::Insert,
                table: table.to_string(),
                new: Some(Record {
                    id: Uuid::new_v4().to_string(),
                    owner_id: "external".to_string(),
                    created_at: Utc::now(),
                    fields: Row::new(),
                }),
                old: None,
            });
        }
    }

    fn check_identity(&self) -> Result<()> {
        if self.identity_down.load(Ordering::Relaxed) {
            return Err(Error::Identity("identity service unreachable".to_string()));
        }
        Ok(())
    }

    fn next_created_at(&self) -> chrono::DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) as i64;
        Utc::now() + Duration::microseconds(tick)
    }
}

#[async_trait]
impl Client for StubClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Principal> {
        self.check_identity()?;
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(Error::Identity("account already exists".to_string()));
        }
        let principal = Principal {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: display_name.map(str::to_string),
        };
        accounts.insert(email.to_string(), (password.to_string(), principal.clone()));
        Ok(principal)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal> {
        self.check_identity()?;
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some((stored, principal)) if stored == password => {
                *self.active.lock().unwrap() = Some(principal.clone());
                Ok(principal.clone())
            }
            _ => Err(Error::Identity("invalid credentials".to_string())),
        }
    }

    async fn sign_out(&self) -> Result<()> {
        self.check_identity()?;
        *self.active.lock().unwrap() = None;
        Ok(())
    }

    async fn current_principal(&self) -> Result<Option<Principal>> {
        self.check_identity()?;
        Ok(self.active.lock().unwrap().clone())
    }

    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Record>> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Record> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| match &query.filter {
                        Some((column, value)) => r.field(column) == Some(value),
                        None => true,
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            if order.column == "created_at" {
                rows.sort_by_key(|r| r.created_at);
                if order.descending {
                    rows.reverse();
                }
            }
        }
        Ok(rows)
    }

    async fn select_one(&self, table: &str, id: &str) -> Result<Record> {
        let tables = self.tables.lock().unwrap();
        tables
            .get(table)
            .and_then(|rows| rows.iter().find(|r| r.id == id))
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn insert(&self, table: &str, row: &Row) -> Result<Record> {
        let mut fields = row.clone();
        let owner_id = match fields.remove("owner_id") {
            Some(Value::String(owner)) => owner,
            _ => return Err(Error::Query("owner_id missing from insert".to_string())),
        };
        let record = Record {
            id: Uuid::new_v4().to_string(),
            owner_id,
            created_at: self.next_created_at(),
            fields,
        };
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        self.inserts.fetch_add(1, Ordering::Relaxed);
        Ok(record)
    }

    async fn update(&self, table: &str, id: &str, patch: &Row) -> Result<Record> {
        let mut tables = self.tables.lock().unwrap();
        let record = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| r.id == id))
            .ok_or(Error::NotFound)?;
        for (column, value) in patch {
            record.fields.insert(column.clone(), value.clone());
        }
        Ok(record.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        if let Some(rows) = self.tables.lock().unwrap().get_mut(table) {
            rows.retain(|r| r.id != id);
        }
        Ok(())
    }

    async fn open_channel(
        &self,
        name: &str,
        _table: &str,
    ) -> Result<broadcast::Receiver<ChangeEvent>> {
        let mut channels = self.channels.lock().unwrap();
        let (tx, opens) = channels
            .entry(name.to_string())
            .or_insert_with(|| (broadcast::channel(32).0, 0));
        *opens += 1;
        Ok(tx.subscribe())
    }

    async fn close_channel(&self, name: &str) -> Result<()> {
        let mut channels = self.channels.lock().unwrap();
        if let Some((_, opens)) = channels.get_mut(name) {
            *opens = opens.saturating_sub(1);
            if *opens == 0 {
                channels.remove(name);
            }
        }
        Ok(())
    }
}
