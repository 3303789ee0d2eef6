//! Snapshot data model
//!
//! A snapshot is one self-contained document holding every entity collection
//! of the travel store plus a metadata block. Child records carry their
//! parent journey id as an opaque string; nothing here resolves it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Entity collections known to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Journeys,
    Transports,
    Hotels,
    CarRentals,
    Documents,
    Notes,
    Places,
    Reminders,
    Expenses,
    UserSettings,
}

impl EntityKind {
    /// Reload order: journeys before anything that references them
    pub const LOAD_ORDER: [EntityKind; 10] = [
        EntityKind::Journeys,
        EntityKind::Transports,
        EntityKind::Hotels,
        EntityKind::CarRentals,
        EntityKind::Documents,
        EntityKind::Notes,
        EntityKind::Places,
        EntityKind::Reminders,
        EntityKind::Expenses,
        EntityKind::UserSettings,
    ];

    /// Stable collection name, as used in the snapshot document
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Journeys => "journeys",
            EntityKind::Transports => "transports",
            EntityKind::Hotels => "hotels",
            EntityKind::CarRentals => "carRentals",
            EntityKind::Documents => "documents",
            EntityKind::Notes => "notes",
            EntityKind::Places => "places",
            EntityKind::Reminders => "reminders",
            EntityKind::Expenses => "expenses",
            EntityKind::UserSettings => "userSettings",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transport {
    pub id: String,
    pub journey_id: String,
    /// Flight, train, ferry, bus...
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: String,
    pub journey_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarRental {
    pub id: String,
    pub journey_id: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropoff_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropoff_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_code: Option<String>,
}

/// Metadata of an attached document. The file contents are not part of
/// a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    pub id: String,
    pub journey_id: String,
    pub title: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub journey_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub journey_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub visited: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub journey_id: String,
    pub title: String,
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub journey_id: String,
    pub description: String,
    pub amount: f64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default)]
    pub preferred_currency: Option<String>,
    #[serde(default)]
    pub preferred_language: Option<String>,
}

impl UserSettings {
    pub fn is_empty(&self) -> bool {
        self.preferred_currency.is_none() && self.preferred_language.is_none()
    }
}

/// One record of any entity kind, as moved through the data store facade
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Journey(Journey),
    Transport(Transport),
    Hotel(Hotel),
    CarRental(CarRental),
    Document(DocumentMeta),
    Note(Note),
    Place(Place),
    Reminder(Reminder),
    Expense(Expense),
    UserSettings(UserSettings),
}

/// Key under which the single settings record is stored
pub const SETTINGS_ID: &str = "settings";

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Journey(_) => EntityKind::Journeys,
            Record::Transport(_) => EntityKind::Transports,
            Record::Hotel(_) => EntityKind::Hotels,
            Record::CarRental(_) => EntityKind::CarRentals,
            Record::Document(_) => EntityKind::Documents,
            Record::Note(_) => EntityKind::Notes,
            Record::Place(_) => EntityKind::Places,
            Record::Reminder(_) => EntityKind::Reminders,
            Record::Expense(_) => EntityKind::Expenses,
            Record::UserSettings(_) => EntityKind::UserSettings,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Record::Journey(r) => &r.id,
            Record::Transport(r) => &r.id,
            Record::Hotel(r) => &r.id,
            Record::CarRental(r) => &r.id,
            Record::Document(r) => &r.id,
            Record::Note(r) => &r.id,
            Record::Place(r) => &r.id,
            Record::Reminder(r) => &r.id,
            Record::Expense(r) => &r.id,
            Record::UserSettings(_) => SETTINGS_ID,
        }
    }

    /// Parent journey id, for child records
    pub fn journey_id(&self) -> Option<&str> {
        match self {
            Record::Transport(r) => Some(&r.journey_id),
            Record::Hotel(r) => Some(&r.journey_id),
            Record::CarRental(r) => Some(&r.journey_id),
            Record::Document(r) => Some(&r.journey_id),
            Record::Note(r) => Some(&r.journey_id),
            Record::Place(r) => Some(&r.journey_id),
            Record::Reminder(r) => Some(&r.journey_id),
            Record::Expense(r) => Some(&r.journey_id),
            Record::Journey(_) | Record::UserSettings(_) => None,
        }
    }

    /// Name of the first NaN or infinite field. JSON has no encoding for
    /// those, so such a record could never be restored.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        let finite = |v: Option<f64>| v.map_or(true, f64::is_finite);
        match self {
            Record::Place(r) if !finite(r.latitude) => Some("latitude"),
            Record::Place(r) if !finite(r.longitude) => Some("longitude"),
            Record::Expense(r) if !r.amount.is_finite() => Some("amount"),
            _ => None,
        }
    }

    /// Serialize the inner entity to JSON
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Record::Journey(r) => serde_json::to_vec(r),
            Record::Transport(r) => serde_json::to_vec(r),
            Record::Hotel(r) => serde_json::to_vec(r),
            Record::CarRental(r) => serde_json::to_vec(r),
            Record::Document(r) => serde_json::to_vec(r),
            Record::Note(r) => serde_json::to_vec(r),
            Record::Place(r) => serde_json::to_vec(r),
            Record::Reminder(r) => serde_json::to_vec(r),
            Record::Expense(r) => serde_json::to_vec(r),
            Record::UserSettings(r) => serde_json::to_vec(r),
        }
    }

    /// Parse an entity of the given kind from JSON
    pub fn from_json(kind: EntityKind, bytes: &[u8]) -> serde_json::Result<Self> {
        Ok(match kind {
            EntityKind::Journeys => Record::Journey(serde_json::from_slice(bytes)?),
            EntityKind::Transports => Record::Transport(serde_json::from_slice(bytes)?),
            EntityKind::Hotels => Record::Hotel(serde_json::from_slice(bytes)?),
            EntityKind::CarRentals => Record::CarRental(serde_json::from_slice(bytes)?),
            EntityKind::Documents => Record::Document(serde_json::from_slice(bytes)?),
            EntityKind::Notes => Record::Note(serde_json::from_slice(bytes)?),
            EntityKind::Places => Record::Place(serde_json::from_slice(bytes)?),
            EntityKind::Reminders => Record::Reminder(serde_json::from_slice(bytes)?),
            EntityKind::Expenses => Record::Expense(serde_json::from_slice(bytes)?),
            EntityKind::UserSettings => Record::UserSettings(serde_json::from_slice(bytes)?),
        })
    }
}

/// Snapshot metadata block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub app_version: String,
    pub device_name: String,
    #[serde(rename = "databaseSchemaVersion")]
    pub schema_version: u32,
}

/// Every entity collection plus the user preferences record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(default)]
    pub journeys: Vec<Journey>,
    #[serde(default)]
    pub transports: Vec<Transport>,
    #[serde(default)]
    pub hotels: Vec<Hotel>,
    #[serde(default)]
    pub car_rentals: Vec<CarRental>,
    #[serde(default)]
    pub documents: Vec<DocumentMeta>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub places: Vec<Place>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub user_settings: UserSettings,
}

impl Payload {
    /// Append a record to its collection. A settings record replaces the
    /// current preferences.
    pub fn push(&mut self, record: Record) {
        match record {
            Record::Journey(r) => self.journeys.push(r),
            Record::Transport(r) => self.transports.push(r),
            Record::Hotel(r) => self.hotels.push(r),
            Record::CarRental(r) => self.car_rentals.push(r),
            Record::Document(r) => self.documents.push(r),
            Record::Note(r) => self.notes.push(r),
            Record::Place(r) => self.places.push(r),
            Record::Reminder(r) => self.reminders.push(r),
            Record::Expense(r) => self.expenses.push(r),
            Record::UserSettings(r) => self.user_settings = r,
        }
    }

    /// Records of one collection, in stored order
    pub fn records(&self, kind: EntityKind) -> Vec<Record> {
        fn wrap<T: Clone>(items: &[T], f: fn(T) -> Record) -> Vec<Record> {
            items.iter().cloned().map(f).collect()
        }

        match kind {
            EntityKind::Journeys => wrap(&self.journeys, Record::Journey),
            EntityKind::Transports => wrap(&self.transports, Record::Transport),
            EntityKind::Hotels => wrap(&self.hotels, Record::Hotel),
            EntityKind::CarRentals => wrap(&self.car_rentals, Record::CarRental),
            EntityKind::Documents => wrap(&self.documents, Record::Document),
            EntityKind::Notes => wrap(&self.notes, Record::Note),
            EntityKind::Places => wrap(&self.places, Record::Place),
            EntityKind::Reminders => wrap(&self.reminders, Record::Reminder),
            EntityKind::Expenses => wrap(&self.expenses, Record::Expense),
            EntityKind::UserSettings => {
                if self.user_settings.is_empty() {
                    Vec::new()
                } else {
                    vec![Record::UserSettings(self.user_settings.clone())]
                }
            }
        }
    }

    /// All records in reload order (parents first)
    pub fn records_in_load_order(&self) -> Vec<Record> {
        EntityKind::LOAD_ORDER
            .iter()
            .flat_map(|kind| self.records(*kind))
            .collect()
    }

    /// Record count per collection
    pub fn counts(&self) -> BTreeMap<EntityKind, usize> {
        EntityKind::LOAD_ORDER
            .iter()
            .map(|kind| (*kind, self.records(*kind).len()))
            .collect()
    }

    /// Total number of records, settings included
    pub fn record_count(&self) -> usize {
        self.counts().values().sum()
    }
}

/// The portable unit of backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    #[serde(flatten)]
    pub payload: Payload,
}
