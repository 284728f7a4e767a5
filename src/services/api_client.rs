// src/services/api_client.rs
use crate::errors::AutoCheckError;
use crate::models::*;
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Receives the share of photo bytes handed to the transport, as a 0-100 percentage.
pub type UploadProgress = Arc<dyn Fn(u8) + Send + Sync>;

/// The four calls the wizard makes against the analysis backend.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn create_analyse(&self, vin: &str) -> Result<CreateAnalysisResponse, AutoCheckError>;

    async fn change_params(
        &self,
        analyse_id: i64,
        params: &CarParameters,
    ) -> Result<(), AutoCheckError>;

    async fn upload_photos(
        &self,
        analyse_id: i64,
        photos: &[Photo],
        positions: &[PhotoPosition],
        on_progress: UploadProgress,
    ) -> Result<(), AutoCheckError>;

    async fn get_analyse(&self, analyse_id: i64) -> Result<AnalysisResponse, AutoCheckError>;
}

pub struct ApiClient {
    base_url: String,
    debug: bool,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, debug: bool) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            debug,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn check(&self, response: Response) -> Result<Response, AutoCheckError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if self.debug {
            error!("API error {} from {}: {}", status, self.base_url, body);
        }
        Err(AutoCheckError::Backend {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl AnalysisBackend for ApiClient {
    async fn create_analyse(&self, vin: &str) -> Result<CreateAnalysisResponse, AutoCheckError> {
        let response = self
            .client
            .post(self.url("create_analyse"))
            .json(&CreateAnalysisRequest {
                vin: vin.to_string(),
            })
            .send()
            .await?;

        Ok(self.check(response).await?.json().await?)
    }

    async fn change_params(
        &self,
        analyse_id: i64,
        params: &CarParameters,
    ) -> Result<(), AutoCheckError> {
        let response = self
            .client
            .post(self.url("change_params"))
            .query(&[("analyse_id", analyse_id)])
            .json(params)
            .send()
            .await?;

        self.check(response).await?;
        Ok(())
    }

    async fn upload_photos(
        &self,
        analyse_id: i64,
        photos: &[Photo],
        positions: &[PhotoPosition],
        on_progress: UploadProgress,
    ) -> Result<(), AutoCheckError> {
        let total: u64 = photos.iter().map(|p| p.data.len() as u64).sum();
        let sent = Arc::new(AtomicU64::new(0));

        let mut form = Form::new();
        for photo in photos {
            let part = Part::stream_with_length(
                progress_body(photo.data.clone(), total, sent.clone(), on_progress.clone()),
                photo.data.len() as u64,
            )
            .file_name(photo.file_name.clone())
            .mime_str(&photo.content_type)
            .map_err(|e| AutoCheckError::Validation(format!("Bad content type: {}", e)))?;
            form = form.part("photos", part);
        }
        for position in positions {
            form = form.text("positions", position.as_str());
        }

        debug!(
            "Uploading {} photos ({} bytes) for analysis {}",
            photos.len(),
            total,
            analyse_id
        );

        let response = self
            .client
            .post(self.url("upload"))
            .query(&[("analyse_id", analyse_id)])
            .multipart(form)
            .send()
            .await?;

        self.check(response).await?;
        on_progress(100);
        Ok(())
    }

    async fn get_analyse(&self, analyse_id: i64) -> Result<AnalysisResponse, AutoCheckError> {
        let response = self
            .client
            .get(self.url("analyse"))
            .query(&[("analyse_id", analyse_id)])
            .send()
            .await?;

        Ok(self.check(response).await?.json().await?)
    }
}

// Streams the photo in chunks and reports progress as each chunk is pulled by the transport.
fn progress_body(data: Bytes, total: u64, sent: Arc<AtomicU64>, on_progress: UploadProgress) -> Body {
    let chunks: Vec<Bytes> = (0..data.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| data.slice(start..(start + UPLOAD_CHUNK_SIZE).min(data.len())))
        .collect();

    let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
        let loaded = sent.fetch_add(chunk.len() as u64, Ordering::SeqCst) + chunk.len() as u64;
        on_progress(percent(loaded, total));
        Ok::<Bytes, std::io::Error>(chunk)
    }));

    Body::wrap_stream(stream)
}

pub fn percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((loaded as f64 * 100.0 / total as f64).round() as u64).min(100) as u8
}
