//! In-process registry used by tests and the offline demo.

use super::{NewVehicle, RegistryError, RegistryRecord, VehicleRegistry};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Registry held in memory, preserving insertion order.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    records: Mutex<Vec<RegistryRecord>>,
    next_id: AtomicU64,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the registry with existing records.
    pub fn with_records(records: Vec<RegistryRecord>) -> Self {
        Self {
            next_id: AtomicU64::new(records.len() as u64),
            records: Mutex::new(records),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    fn records(&self) -> MutexGuard<'_, Vec<RegistryRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl VehicleRegistry for InMemoryRegistry {
    async fn list(&self) -> Result<Vec<RegistryRecord>, RegistryError> {
        Ok(self.records().clone())
    }

    async fn create(&self, vehicle: NewVehicle) -> Result<RegistryRecord, RegistryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = vehicle.with_id(format!("vehicle-{}", id));
        self.records().push(record.clone());
        tracing::debug!(id = %record.id, plate = %record.plate_number, "Vehicle registered");
        Ok(record)
    }

    async fn update(&self, record: &RegistryRecord) -> Result<RegistryRecord, RegistryError> {
        let mut records = self.records();
        let slot = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| RegistryError::NotFound(record.id.clone()))?;
        *slot = record.clone();
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), RegistryError> {
        let mut records = self.records();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_crud_roundtrip() {
        let registry = InMemoryRegistry::new();
        let created = registry
            .create(NewVehicle::unidentified("12가3456", ""))
            .await
            .unwrap();
        assert_eq!(registry.len(), 1);

        let mut edited = created.clone();
        edited.phone_number = "01012345678".into();
        registry.update(&edited).await.unwrap();
        assert_eq!(registry.list().await.unwrap()[0].phone_number, "01012345678");

        registry.delete(&created.id).await.unwrap();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.delete(&created.id).await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_preserves_order() {
        let registry = InMemoryRegistry::new();
        for plate in ["1111", "2222", "3333"] {
            registry.create(NewVehicle::unidentified(plate, "")).await.unwrap();
        }
        let plates: Vec<_> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.plate_number)
            .collect();
        assert_eq!(plates, ["1111", "2222", "3333"]);
    }
}
