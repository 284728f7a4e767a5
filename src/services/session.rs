// src/services/session.rs
use crate::config::SessionTimings;
use crate::errors::{AutoCheckError, NO_ACTIVE_SESSION_MESSAGE};
use crate::models::*;
use crate::navigation::Route;
use crate::services::api_client::{AnalysisBackend, UploadProgress};
use crate::services::catalog;
use crate::services::mock_data::{
    mock_analysis_response, mock_car_parameters, mock_create_response,
};
use crate::services::photo_validator::PhotoSet;
use crate::services::progress::{
    self, PROGRESS_COMPLETE, ProgressSender, progress_channel, spawn_fake_progress,
    spawn_upload_simulation,
};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

const SELECT_PHOTOS_MESSAGE: &str = "Please select photos to upload.";

/// Lifecycle stage, derived from which parts of the session are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Unstarted,
    Created,
    ParamsConfirmed,
    PhotosUploaded,
    Analyzing,
    Completed,
    Errored,
}

/// What a successful VIN submission hands to the parameter review step.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedAnalysis {
    pub analyse_id: i64,
    pub vin: String,
    pub vin_check_data: Option<serde_json::Value>,
    pub car_parameters: CarParameters,
    pub next: Route,
    pub fallback: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub analyse_id: Option<i64>,
    pub stage: Stage,
    pub car_parameters: Option<CarParameters>,
    pub uploaded_photos: Vec<PhotoPosition>,
    pub progress: u8,
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub result_source: Option<ResultSource>,
}

/// Flags `is_loading` for as long as it lives.
struct LoadingGuard(Arc<watch::Sender<bool>>);

impl LoadingGuard {
    fn new(loading: &Arc<watch::Sender<bool>>) -> Self {
        loading.send_replace(true);
        Self(loading.clone())
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

/// One wizard run against the analysis backend.
///
/// Failure policy per operation:
/// - `create_analysis`: backend failure substitutes the mock session.
/// - `update_car_parameters`: backend failure is logged and the flow continues.
/// - `upload_photos`: backend failure is logged, progress is simulated and the flow continues.
/// - `get_analysis_results`: the fetch races a timeout that yields the mock result;
///   a backend error that arrives first yields `None`.
///
/// Every timer the session spawns hangs off `lifetime`, which is cancelled on drop.
pub struct AnalysisSession {
    backend: Arc<dyn AnalysisBackend>,
    timings: SessionTimings,
    analyse_id: Option<i64>,
    car_parameters: Option<CarParameters>,
    uploaded_photos: PhotoSet,
    analysis_result: Option<AnalysisResponse>,
    result_source: Option<ResultSource>,
    params_confirmed: bool,
    photos_uploaded: bool,
    analyzing: bool,
    last_error: Option<String>,
    progress: ProgressSender,
    progress_rx: watch::Receiver<u8>,
    loading: Arc<watch::Sender<bool>>,
    loading_rx: watch::Receiver<bool>,
    lifetime: CancellationToken,
    phase: CancellationToken,
}

impl AnalysisSession {
    pub fn new(backend: Arc<dyn AnalysisBackend>, timings: SessionTimings) -> Self {
        let (progress, progress_rx) = progress_channel();
        let (loading, loading_rx) = watch::channel(false);
        let lifetime = CancellationToken::new();
        let phase = lifetime.child_token();

        Self {
            backend,
            timings,
            analyse_id: None,
            car_parameters: None,
            uploaded_photos: PhotoSet::new(),
            analysis_result: None,
            result_source: None,
            params_confirmed: false,
            photos_uploaded: false,
            analyzing: false,
            last_error: None,
            progress,
            progress_rx,
            loading: Arc::new(loading),
            loading_rx,
            lifetime,
            phase,
        }
    }

    /// Starts from an id taken from a deep link instead of a VIN submission.
    pub fn with_analyse_id(
        backend: Arc<dyn AnalysisBackend>,
        timings: SessionTimings,
        analyse_id: i64,
    ) -> Self {
        let mut session = Self::new(backend, timings);
        session.analyse_id = Some(analyse_id);
        session
    }

    pub fn analyse_id(&self) -> Option<i64> {
        self.analyse_id
    }

    pub fn car_parameters(&self) -> Option<&CarParameters> {
        self.car_parameters.as_ref()
    }

    pub fn uploaded_photos(&self) -> &PhotoSet {
        &self.uploaded_photos
    }

    pub fn analysis_result(&self) -> Option<&AnalysisResponse> {
        self.analysis_result.as_ref()
    }

    pub fn result_source(&self) -> Option<ResultSource> {
        self.result_source
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn progress(&self) -> u8 {
        *self.progress_rx.borrow()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading_rx.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<u8> {
        self.progress_rx.clone()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading_rx.clone()
    }

    /// Cancelling the returned token tears the session down: running timers stop and a
    /// pending results race resolves to nothing.
    pub fn teardown_token(&self) -> CancellationToken {
        self.lifetime.clone()
    }

    pub fn stage(&self) -> Stage {
        if self.last_error.is_some() {
            Stage::Errored
        } else if self.analyse_id.is_none() {
            Stage::Unstarted
        } else if self.analysis_result.is_some() {
            Stage::Completed
        } else if self.analyzing {
            Stage::Analyzing
        } else if self.photos_uploaded {
            Stage::PhotosUploaded
        } else if self.params_confirmed {
            Stage::ParamsConfirmed
        } else {
            Stage::Created
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            analyse_id: self.analyse_id,
            stage: self.stage(),
            car_parameters: self.car_parameters.clone(),
            uploaded_photos: self.uploaded_photos.positions(),
            progress: self.progress(),
            is_loading: self.is_loading(),
            last_error: self.last_error.clone(),
            result_source: self.result_source,
        }
    }

    fn require_session(&mut self) -> Result<i64, AutoCheckError> {
        match self.analyse_id {
            Some(id) => Ok(id),
            None => {
                self.last_error = Some(NO_ACTIVE_SESSION_MESSAGE.to_string());
                Err(AutoCheckError::NoActiveSession)
            }
        }
    }

    // Cancels whatever timers the previous step left running.
    fn begin_phase(&mut self) -> CancellationToken {
        self.phase.cancel();
        self.phase = self.lifetime.child_token();
        self.progress.send_replace(0);
        self.phase.clone()
    }

    /// Submits a VIN. Never fails: a backend failure yields the mock session.
    pub async fn create_analysis(&mut self, vin: &str) -> CreatedAnalysis {
        let _loading = LoadingGuard::new(&self.loading);
        self.last_error = None;

        let (response, fallback) = match self.backend.create_analyse(vin).await {
            Ok(response) => (response, false),
            Err(e) => {
                warn!("Using mock data for create_analysis: {}", e);
                (mock_create_response(), true)
            }
        };

        let car_parameters = resolve_car_parameters(&response);
        let analyse_id = response.analyse_id;
        info!("Analysis {} created for VIN {}", analyse_id, vin);

        self.phase.cancel();
        self.phase = self.lifetime.child_token();
        self.analyse_id = Some(analyse_id);
        self.car_parameters = Some(car_parameters.clone());
        self.uploaded_photos.clear();
        self.analysis_result = None;
        self.result_source = None;
        self.params_confirmed = false;
        self.photos_uploaded = false;
        self.analyzing = false;
        self.progress.send_replace(0);

        CreatedAnalysis {
            analyse_id,
            vin: response.vin.unwrap_or_else(|| vin.to_string()),
            vin_check_data: response.vin_check_data,
            car_parameters,
            next: Route::CarParameters(analyse_id),
            fallback,
        }
    }

    /// Applies a partial edit to the draft parameters without contacting the backend.
    /// A flow resumed from a link has no decoded parameters and starts from the mock record.
    pub fn edit_car_parameters(
        &mut self,
        edit: ParametersEdit,
    ) -> Result<&CarParameters, AutoCheckError> {
        self.require_session()?;
        let draft = self.car_parameters.get_or_insert_with(mock_car_parameters);
        catalog::apply_edit(draft, edit)?;
        Ok(draft)
    }

    /// Sends the current draft, or the mock record when nothing was decoded.
    pub async fn confirm_car_parameters(&mut self) -> Result<Route, AutoCheckError> {
        let draft = self
            .car_parameters
            .clone()
            .unwrap_or_else(mock_car_parameters);
        self.update_car_parameters(draft).await
    }

    pub async fn update_car_parameters(
        &mut self,
        params: CarParameters,
    ) -> Result<Route, AutoCheckError> {
        let analyse_id = self.require_session()?;
        let _loading = LoadingGuard::new(&self.loading);
        self.last_error = None;

        if let Err(e) = self.backend.change_params(analyse_id, &params).await {
            warn!(
                "Parameters for analysis {} not acknowledged, continuing: {}",
                analyse_id, e
            );
        }

        self.car_parameters = Some(params);
        self.params_confirmed = true;
        Ok(Route::UploadPhotos(analyse_id))
    }

    pub async fn upload_photos(
        &mut self,
        files: Vec<Photo>,
        positions: Vec<PhotoPosition>,
    ) -> Result<Route, AutoCheckError> {
        let analyse_id = self.require_session()?;

        if files.is_empty() {
            self.last_error = Some(SELECT_PHOTOS_MESSAGE.to_string());
            return Err(AutoCheckError::Validation(SELECT_PHOTOS_MESSAGE.to_string()));
        }
        if files.len() != positions.len() {
            let message = format!(
                "{} photos were given with {} positions",
                files.len(),
                positions.len()
            );
            self.last_error = Some(message.clone());
            return Err(AutoCheckError::Validation(message));
        }

        let _loading = LoadingGuard::new(&self.loading);
        self.last_error = None;
        let token = self.begin_phase();

        let sink = self.progress.clone();
        let on_progress: UploadProgress = Arc::new(move |pct| progress::advance(&sink, pct));

        match self
            .backend
            .upload_photos(analyse_id, &files, &positions, on_progress)
            .await
        {
            Ok(()) => info!("Uploaded {} photos for analysis {}", files.len(), analyse_id),
            Err(e) => {
                warn!(
                    "Upload for analysis {} failed, simulating progress: {}",
                    analyse_id, e
                );
                spawn_upload_simulation(self.progress.clone(), self.timings.upload_sim_tick, token);
            }
        }

        for (photo, position) in files.into_iter().zip(positions) {
            self.uploaded_photos.insert(position, photo);
        }
        self.photos_uploaded = true;
        Ok(Route::Analyzing(analyse_id))
    }

    /// Races the backend fetch against the results timeout.
    pub async fn get_analysis_results(
        &mut self,
    ) -> Result<Option<AnalysisDetails>, AutoCheckError> {
        let analyse_id = self.require_session()?;
        let _loading = LoadingGuard::new(&self.loading);
        self.last_error = None;

        let backend = self.backend.clone();
        let deadline = self.timings.results_timeout;
        let teardown = self.lifetime.clone();

        let outcome = tokio::select! {
            biased;

            result = backend.get_analyse(analyse_id) => match result {
                Ok(response) if response.success => Some((response, ResultSource::Backend)),
                Ok(_) => {
                    warn!("Backend reported an unsuccessful analysis {}", analyse_id);
                    None
                }
                Err(e) => {
                    warn!("Could not fetch results for analysis {}: {}", analyse_id, e);
                    None
                }
            },
            _ = tokio::time::sleep(deadline) => {
                warn!(
                    "Results for analysis {} timed out after {}ms, using mock data",
                    analyse_id,
                    deadline.as_millis()
                );
                Some((mock_analysis_response(), ResultSource::Mock))
            },
            _ = teardown.cancelled() => {
                debug!("Results race for analysis {} abandoned on teardown", analyse_id);
                None
            },
        };

        Ok(outcome.map(|(response, source)| {
            let details = response.details_analize.clone();
            self.analysis_result = Some(response);
            self.result_source = Some(source);
            details
        }))
    }

    /// The analyzing screen: cosmetic progress runs while the results race, then
    /// progress is completed and the results screen is next.
    pub async fn run_analysis(
        &mut self,
    ) -> Result<(Option<AnalysisDetails>, Route), AutoCheckError> {
        let analyse_id = self.require_session()?;
        let token = self.begin_phase();
        self.analyzing = true;

        let ticker = spawn_fake_progress(self.progress.clone(), self.timings.progress_tick, token.clone());
        let outcome = self.get_analysis_results().await;

        token.cancel();
        if let Err(e) = ticker.await {
            warn!("Progress ticker for analysis {} ended abnormally: {}", analyse_id, e);
        }
        self.analyzing = false;
        self.progress.send_replace(PROGRESS_COMPLETE);

        Ok((outcome?, Route::AnalysisResults(analyse_id)))
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

// Decoded parameters come from `car_params`, then from a well-formed `vin_check_data`,
// and otherwise from the mock record.
fn resolve_car_parameters(response: &CreateAnalysisResponse) -> CarParameters {
    if let Some(params) = &response.car_params {
        return params.clone();
    }
    if let Some(data) = &response.vin_check_data {
        match serde_json::from_value::<CarParameters>(data.clone()) {
            Ok(params) => return params,
            Err(e) => debug!("vin_check_data is not a parameter record: {}", e),
        }
    }
    mock_car_parameters()
}
