//! Recognizer over HTTP.

use super::BackendClient;
use crate::recognition::{BoundingBox, Recognition, RecognitionError, Recognizer};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, trace};

/// Wire form of an `/analyze` answer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "box", default)]
    pub bbox: Option<Vec<f64>>,
    /// Every plate the service read, best first.
    #[serde(default)]
    pub all_candidates: Option<Vec<serde_json::Value>>,
    /// Set when the service failed internally.
    #[serde(default)]
    pub error: Option<String>,
}

impl TryFrom<AnalysisResponse> for Recognition {
    type Error = RecognitionError;

    fn try_from(response: AnalysisResponse) -> Result<Self, Self::Error> {
        let bbox = match response.bbox {
            Some(values) => Some(BoundingBox::from_slice(&values).ok_or_else(|| {
                RecognitionError::Malformed(format!("box must be four pixel coordinates, got {:?}", values))
            })?),
            None => None,
        };
        Ok(Recognition {
            text: response.text,
            bbox,
        })
    }
}

/// Parses the body of an `/analyze` answer.
pub fn parse_analysis(body: &[u8]) -> Result<Recognition, RecognitionError> {
    let response: AnalysisResponse =
        serde_json::from_slice(body).map_err(|e| RecognitionError::Malformed(e.to_string()))?;

    if let Some(error) = &response.error {
        debug!(error = %error, "Recognizer reported an internal error");
    }
    trace!(
        candidates = response.all_candidates.as_ref().map_or(0, Vec::len),
        "Recognizer answered"
    );

    Recognition::try_from(response)
}

/// Sends frames to `POST {base}/analyze`.
#[derive(Debug, Clone)]
pub struct HttpRecognizer {
    client: BackendClient,
}

impl HttpRecognizer {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

impl Recognizer for HttpRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<Recognition, RecognitionError> {
        let part = Part::bytes(image.to_vec())
            .file_name("capture.png")
            .mime_str("image/png")
            .map_err(|e| RecognitionError::Payload(e.to_string()))?;
        let form = Form::new().part("file", part);

        let resp = self
            .client
            .http()
            .post(self.client.url("/analyze"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RecognitionError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RecognitionError::Status(status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| RecognitionError::Transport(e.to_string()))?;
        parse_analysis(&body)
    }
}
