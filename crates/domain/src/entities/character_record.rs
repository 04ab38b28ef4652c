//! CharacterRecord - the full persisted state of one playable character
//!
//! There is exactly one canonical default shape ([`CharacterRecord::new`]).
//! Persisted documents are completed against it before being deserialized,
//! so records written by older sheets gain new fields without losing data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DomainError;
use crate::ids::EntityId;
use crate::merge::complete_with_defaults;
use crate::value_objects::{Hope, HopeBounds, Tracker};

/// Schema version stamped on every record this crate writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

pub const DEFAULT_HP_MAX: i32 = 4;
pub const DEFAULT_STRESS_MAX: i32 = 6;
pub const DEFAULT_ARMOR_MAX: i32 = 3;

const TRACKER_KEYS: [&str; 3] = ["hp", "stress", "armor"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRecord {
    pub id: EntityId,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub last_modified: DateTime<Utc>,
    pub version: u32,

    // Display
    pub name: String,
    pub subtitle: String,
    pub level: i32,
    pub portrait: Option<String>,

    pub attributes: Attributes,

    // Combat trackers
    pub hp: Tracker,
    pub stress: Tracker,
    pub armor: Tracker,
    pub damage_thresholds: DamageThresholds,
    pub hope: Hope,

    // Free-form collections
    pub equipment: Vec<Value>,
    pub journal: Journal,
    pub experiences: Vec<Value>,
    pub downtime: Downtime,
    pub details: Map<String, Value>,

    pub ui_preferences: UiPreferences,

    /// Keys this version does not know about, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub agility: i32,
    pub strength: i32,
    pub finesse: i32,
    pub instinct: i32,
    pub presence: i32,
    pub knowledge: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageThresholds {
    pub major: i32,
    pub severe: i32,
}

impl Default for DamageThresholds {
    fn default() -> Self {
        Self {
            major: 7,
            severe: 14,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub entries: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Downtime {
    pub projects: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiPreferences {
    pub theme: String,
    pub accent_color: Option<String>,
    pub collapsed_sections: Vec<String>,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            accent_color: None,
            collapsed_sections: Vec::new(),
        }
    }
}

impl CharacterRecord {
    /// The canonical default record for `id`.
    pub fn new(id: EntityId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            last_modified: now,
            version: CURRENT_SCHEMA_VERSION,
            name: String::new(),
            subtitle: String::new(),
            level: 1,
            portrait: None,
            attributes: Attributes::default(),
            hp: Tracker::filled(DEFAULT_HP_MAX),
            stress: Tracker::empty(DEFAULT_STRESS_MAX),
            armor: Tracker::empty(DEFAULT_ARMOR_MAX),
            damage_thresholds: DamageThresholds::default(),
            hope: Hope::default(),
            equipment: Vec::new(),
            journal: Journal::default(),
            experiences: Vec::new(),
            downtime: Downtime::default(),
            details: Map::new(),
            ui_preferences: UiPreferences::default(),
            extra: Map::new(),
        }
    }

    /// Serialize to the persisted JSON document shape.
    pub fn to_document(&self) -> Result<Value, DomainError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Coerce a (complete) document into a record and reconcile it.
    pub fn from_document(doc: Value, bounds: HopeBounds) -> Result<Self, DomainError> {
        if !doc.is_object() {
            return Err(DomainError::shape("record document is not an object"));
        }
        let mut record: Self = serde_json::from_value(doc)?;
        record.reconcile(bounds);
        Ok(record)
    }

    /// Upgrade a persisted document written by any schema version.
    ///
    /// Missing keys are completed from the canonical default for `id`; keys
    /// the document defines are left as they are. Returns the record and the
    /// dotted paths that had to be filled in.
    pub fn upgrade_document(
        mut doc: Value,
        id: &EntityId,
        now: DateTime<Utc>,
        bounds: HopeBounds,
    ) -> Result<(Self, Vec<String>), DomainError> {
        if !doc.is_object() {
            return Err(DomainError::shape("record document is not an object"));
        }
        let mut defaults = Self::new(id.clone(), now).to_document()?;
        // A stored tracker without circles is rebuilt from its own counts.
        for key in TRACKER_KEYS {
            if doc.get(key).is_some_and(Value::is_object) {
                if let Some(tracker) = defaults.get_mut(key).and_then(Value::as_object_mut) {
                    tracker.remove("circles");
                }
            }
        }
        let filled = complete_with_defaults(&mut doc, &defaults);
        let mut record = Self::from_document(doc, bounds)?;
        if record.version < CURRENT_SCHEMA_VERSION {
            record.version = CURRENT_SCHEMA_VERSION;
        }
        Ok((record, filled))
    }

    /// Restore tracker and hope invariants. Returns true if anything changed.
    pub fn reconcile(&mut self, bounds: HopeBounds) -> bool {
        let hp = self.hp.reconcile();
        let stress = self.stress.reconcile();
        let armor = self.armor.reconcile();
        let hope = self.hope.reconcile(bounds);
        hp || stress || armor || hope
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_modified = now;
    }
}

/// RFC 3339 timestamps, also accepting epoch milliseconds written by older
/// sheets.
mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(de::Error::custom),
            Raw::Millis(ms) => DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| de::Error::custom(format!("timestamp {} out of range", ms))),
        }
    }
}
