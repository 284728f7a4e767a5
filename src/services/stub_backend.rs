// src/services/stub_backend.rs
// Scriptable in-memory backend for tests.
use crate::errors::AutoCheckError;
use crate::models::*;
use crate::services::api_client::{AnalysisBackend, UploadProgress};
use crate::services::mock_data::{mock_analysis_response, mock_car_parameters};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Hang,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub create: usize,
    pub change_params: usize,
    pub upload: usize,
    pub results: usize,
}

pub struct StubBackend {
    create: Behavior,
    change_params: Behavior,
    upload: Behavior,
    results: Behavior,
    create_calls: AtomicUsize,
    change_params_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    results_calls: AtomicUsize,
}

impl StubBackend {
    pub const ANALYSE_ID: i64 = 501;
    pub const QUALITY: f64 = 3.5;

    pub fn new() -> Self {
        Self {
            create: Behavior::Succeed,
            change_params: Behavior::Succeed,
            upload: Behavior::Succeed,
            results: Behavior::Succeed,
            create_calls: AtomicUsize::new(0),
            change_params_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            results_calls: AtomicUsize::new(0),
        }
    }

    pub fn create(mut self, behavior: Behavior) -> Self {
        self.create = behavior;
        self
    }

    pub fn change_params(mut self, behavior: Behavior) -> Self {
        self.change_params = behavior;
        self
    }

    pub fn upload(mut self, behavior: Behavior) -> Self {
        self.upload = behavior;
        self
    }

    pub fn results(mut self, behavior: Behavior) -> Self {
        self.results = behavior;
        self
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            create: self.create_calls.load(Ordering::SeqCst),
            change_params: self.change_params_calls.load(Ordering::SeqCst),
            upload: self.upload_calls.load(Ordering::SeqCst),
            results: self.results_calls.load(Ordering::SeqCst),
        }
    }
}

async fn act(behavior: Behavior, operation: &str) -> Result<(), AutoCheckError> {
    match behavior {
        Behavior::Succeed => Ok(()),
        Behavior::Fail => Err(AutoCheckError::Network(format!("{} refused", operation))),
        Behavior::Hang => futures_util::future::pending().await,
    }
}

#[async_trait]
impl AnalysisBackend for StubBackend {
    async fn create_analyse(&self, vin: &str) -> Result<CreateAnalysisResponse, AutoCheckError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        act(self.create, "create_analyse").await?;

        let mut params = mock_car_parameters();
        params.model = "Qashqai".to_string();
        Ok(CreateAnalysisResponse {
            analyse_id: Self::ANALYSE_ID,
            vin: Some(vin.to_string()),
            car_params: Some(params),
            vin_check_data: Some(serde_json::json!({ "brand": "Nissan" })),
        })
    }

    async fn change_params(
        &self,
        _analyse_id: i64,
        _params: &CarParameters,
    ) -> Result<(), AutoCheckError> {
        self.change_params_calls.fetch_add(1, Ordering::SeqCst);
        act(self.change_params, "change_params").await
    }

    async fn upload_photos(
        &self,
        _analyse_id: i64,
        _photos: &[Photo],
        _positions: &[PhotoPosition],
        on_progress: UploadProgress,
    ) -> Result<(), AutoCheckError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        act(self.upload, "upload").await?;
        on_progress(50);
        on_progress(100);
        Ok(())
    }

    async fn get_analyse(&self, _analyse_id: i64) -> Result<AnalysisResponse, AutoCheckError> {
        self.results_calls.fetch_add(1, Ordering::SeqCst);
        act(self.results, "analyse").await?;

        let mut response = mock_analysis_response();
        response.details_analize.quality = Self::QUALITY;
        Ok(response)
    }
}
