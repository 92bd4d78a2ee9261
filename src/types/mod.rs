mod entity;
mod models;

pub use entity::EntityKind;
pub use models::{ChangeEvent, ChangeKind, Principal, Record, Row, SessionOutcome};
