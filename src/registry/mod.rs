//! Vehicle registry records and the registry collaborator.
//!
//! The registry is owned by an external service. This crate only reads
//! snapshots of it for matching; the write operations exist so callers
//! acting on a check result (registering an unknown plate, adding a
//! phone number) can go through the same interface.

mod memory;

pub use memory::InMemoryRegistry;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Owner name recorded for vehicles whose owner is unknown.
pub const UNKNOWN_OWNER: &str = "확인불가";

/// Unit placeholder recorded for vehicles whose unit is unknown.
pub const UNKNOWN_UNIT: &str = "?";

/// Relationship of a vehicle to the property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum VehicleType {
    Resident,
    Staff,
    /// Anything not known to be a resident or staff vehicle.
    #[default]
    Unidentified,
}

impl VehicleType {
    /// Wire name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleType::Resident => "resident",
            VehicleType::Staff => "staff",
            VehicleType::Unidentified => "unidentified",
        }
    }
}

impl From<Option<String>> for VehicleType {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("resident") => VehicleType::Resident,
            Some("staff") => VehicleType::Staff,
            _ => VehicleType::Unidentified,
        }
    }
}

impl From<VehicleType> for String {
    fn from(value: VehicleType) -> Self {
        value.as_str().to_string()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A registered vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    pub id: String,
    pub plate_number: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub owner_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dong: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ho: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone_number: String,
    #[serde(rename = "type", default)]
    pub vehicle_type: VehicleType,
}

impl RegistryRecord {
    /// Unit number as `dong-ho`.
    pub fn unit_number(&self) -> String {
        format!("{}-{}", self.dong, self.ho)
    }
}

/// Fields for creating a registry entry; the service assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVehicle {
    pub plate_number: String,
    pub owner_name: String,
    pub dong: String,
    pub ho: String,
    pub phone_number: String,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
}

impl NewVehicle {
    /// Entry for a plate seen on site whose owner is unknown.
    pub fn unidentified(plate_number: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            plate_number: plate_number.into(),
            owner_name: UNKNOWN_OWNER.to_string(),
            dong: UNKNOWN_UNIT.to_string(),
            ho: UNKNOWN_UNIT.to_string(),
            phone_number: phone_number.into(),
            vehicle_type: VehicleType::Unidentified,
        }
    }

    /// Attaches an id, producing a full record.
    pub fn with_id(self, id: impl Into<String>) -> RegistryRecord {
        RegistryRecord {
            id: id.into(),
            plate_number: self.plate_number,
            owner_name: self.owner_name,
            dong: self.dong,
            ho: self.ho,
            phone_number: self.phone_number,
            vehicle_type: self.vehicle_type,
        }
    }
}

/// Errors from the registry collaborator.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("vehicle not found: {0}")]
    NotFound(String),
    #[error("registry request failed: {0}")]
    Transport(String),
    #[error("registry answered with status {0}")]
    Status(u16),
    #[error("malformed registry response: {0}")]
    Malformed(String),
}

/// Access to the vehicle registry.
#[allow(async_fn_in_trait)]
pub trait VehicleRegistry {
    /// Fetches a fresh snapshot of all records, in the service's order.
    async fn list(&self) -> Result<Vec<RegistryRecord>, RegistryError>;

    /// Adds a vehicle.
    async fn create(&self, vehicle: NewVehicle) -> Result<RegistryRecord, RegistryError>;

    /// Replaces the record with the same id.
    async fn update(&self, record: &RegistryRecord) -> Result<RegistryRecord, RegistryError>;

    /// Removes a vehicle by id.
    async fn delete(&self, id: &str) -> Result<(), RegistryError>;
}
