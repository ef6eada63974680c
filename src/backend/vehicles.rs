//! Vehicle registry over HTTP.

use super::BackendClient;
use crate::registry::{NewVehicle, RegistryError, RegistryRecord, VehicleRegistry};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// Registry backed by `/api/vehicles`.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: BackendClient,
}

#[derive(Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    success: bool,
}

/// Write endpoints answer with the stored row, sometimes wrapped in a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum Written {
    One(RegistryRecord),
    Many(Vec<RegistryRecord>),
}

impl Written {
    fn into_record(self) -> Option<RegistryRecord> {
        match self {
            Written::One(record) => Some(record),
            Written::Many(records) => records.into_iter().next(),
        }
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, RegistryError> {
    serde_json::from_slice(body).map_err(|e| RegistryError::Malformed(e.to_string()))
}

/// Reads an update answer; `null` or an empty list means nothing was updated.
fn updated(body: &[u8], id: &str) -> Result<RegistryRecord, RegistryError> {
    decode::<Option<Written>>(body)?
        .and_then(Written::into_record)
        .ok_or_else(|| RegistryError::NotFound(id.to_string()))
}

impl HttpRegistry {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, RegistryError> {
        let resp = request
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RegistryError::Status(status.as_u16()));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }
}

impl VehicleRegistry for HttpRegistry {
    async fn list(&self) -> Result<Vec<RegistryRecord>, RegistryError> {
        let body = self
            .send(self.client.http().get(self.client.url("/api/vehicles")))
            .await?;
        let records: Vec<RegistryRecord> = decode(&body)?;
        debug!(count = records.len(), "Registry snapshot loaded");
        Ok(records)
    }

    async fn create(&self, vehicle: NewVehicle) -> Result<RegistryRecord, RegistryError> {
        let body = self
            .send(self.client.http().post(self.client.url("/api/vehicles")).json(&vehicle))
            .await?;
        decode::<Written>(&body)?
            .into_record()
            .ok_or_else(|| RegistryError::Malformed("create returned no record".into()))
    }

    async fn update(&self, record: &RegistryRecord) -> Result<RegistryRecord, RegistryError> {
        let url = self.client.url(&format!("/api/vehicles/{}", record.id));
        let body = self.send(self.client.http().put(url).json(record)).await?;
        updated(&body, &record.id)
    }

    async fn delete(&self, id: &str) -> Result<(), RegistryError> {
        let url = self.client.url(&format!("/api/vehicles/{}", id));
        let body = self.send(self.client.http().delete(url)).await?;
        let response: DeleteResponse = decode(&body)?;
        if response.success {
            Ok(())
        } else {
            Err(RegistryError::NotFound(id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::VehicleType;

    #[test]
    fn test_decode_snapshot() {
        let body = r#"[
            {"id":"1717","plateNumber":"12가3456","ownerName":"Kim","dong":"101","ho":"1203",
             "phoneNumber":"01012345678","type":"resident","violations":[]},
            {"id":"1718","plateNumber":"34나5678","ownerName":null,"type":null}
        ]"#;
        let records: Vec<RegistryRecord> = decode(body.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].vehicle_type, VehicleType::Resident);
        assert_eq!(records[1].owner_name, "");
        assert_eq!(records[1].vehicle_type, VehicleType::Unidentified);
    }

    #[test]
    fn test_written_accepts_row_or_list() {
        let one = r#"{"id":"1","plateNumber":"1234"}"#;
        let many = r#"[{"id":"2","plateNumber":"5678"}]"#;
        assert_eq!(decode::<Written>(one.as_bytes()).unwrap().into_record().unwrap().id, "1");
        assert_eq!(decode::<Written>(many.as_bytes()).unwrap().into_record().unwrap().id, "2");
        assert!(decode::<Written>(b"[]").unwrap().into_record().is_none());
    }

    #[test]
    fn test_update_answers() {
        let row = r#"{"id":"7","plateNumber":"12가3456","ownerName":"Lee"}"#;
        assert_eq!(updated(row.as_bytes(), "7").unwrap().owner_name, "Lee");

        assert!(matches!(updated(b"null", "7"), Err(RegistryError::NotFound(id)) if id == "7"));
        assert!(matches!(updated(b"[]", "7"), Err(RegistryError::NotFound(_))));
        assert!(matches!(
            updated(b"{\"detail\":\"oops\"}", "7"),
            Err(RegistryError::Malformed(_))
        ));
    }

    #[test]
    fn test_malformed_snapshot() {
        assert!(matches!(
            decode::<Vec<RegistryRecord>>(b"{\"detail\":\"oops\"}"),
            Err(RegistryError::Malformed(_))
        ));
    }
}
