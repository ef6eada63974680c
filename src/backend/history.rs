//! Activity log over HTTP.

use super::BackendClient;
use crate::activity::{ActivityEntry, ActivityError, ActivityLog};
use tracing::info;

/// Activity log backed by `/api/history`.
#[derive(Debug, Clone)]
pub struct HttpActivityLog {
    client: BackendClient,
}

impl HttpActivityLog {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ActivityError> {
        let resp = request
            .send()
            .await
            .map_err(|e| ActivityError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ActivityError::Status(status.as_u16()));
        }
        Ok(resp)
    }
}

impl ActivityLog for HttpActivityLog {
    async fn append(&self, entry: ActivityEntry) -> Result<ActivityEntry, ActivityError> {
        let resp = self
            .send(self.client.http().post(self.client.url("/api/history")).json(&entry))
            .await?;
        let stored = resp
            .json::<ActivityEntry>()
            .await
            .map_err(|e| ActivityError::Malformed(e.to_string()))?;
        info!(kind = ?stored.kind, plate = %stored.plate_number, "Activity logged");
        Ok(stored)
    }

    async fn history(&self) -> Result<Vec<ActivityEntry>, ActivityError> {
        let resp = self
            .send(self.client.http().get(self.client.url("/api/history")))
            .await?;
        resp.json()
            .await
            .map_err(|e| ActivityError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::activity::{ActivityEntry, ActivityKind};

    #[test]
    fn test_decode_stored_entry() {
        let body = r#"{"id":"1718000000000","type":"report","plateNumber":"34나5678",
            "ownerName":"확인불가","unitNumber":"?-?","note":"blocking fire lane",
            "description":"","image":"","thumbnail":"","reporter_name":"guard",
            "timestamp":"2024-06-10T08:30:00.123456"}"#;
        let entry: ActivityEntry = serde_json::from_str(body).unwrap();
        assert_eq!(entry.kind, ActivityKind::Report);
        assert_eq!(entry.id.as_deref(), Some("1718000000000"));
        assert_eq!(entry.reporter_name, "guard");
        assert_eq!(
            entry.timestamp.unwrap().to_rfc3339(),
            "2024-06-10T08:30:00.123456+00:00"
        );
    }
}
