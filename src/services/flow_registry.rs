// src/services/flow_registry.rs
use crate::config::SessionTimings;
use crate::errors::AutoCheckError;
use crate::services::api_client::AnalysisBackend;
use crate::services::session::AnalysisSession;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One mounted wizard. Progress and loading are readable without the session lock.
pub struct FlowEntry {
    pub session: Mutex<AnalysisSession>,
    pub progress: watch::Receiver<u8>,
    pub loading: watch::Receiver<bool>,
    teardown: CancellationToken,
    last_seen: StdMutex<Instant>,
}

impl FlowEntry {
    fn new(session: AnalysisSession) -> Self {
        Self {
            progress: session.subscribe_progress(),
            loading: session.subscribe_loading(),
            teardown: session.teardown_token(),
            session: Mutex::new(session),
            last_seen: StdMutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        if let Ok(mut seen) = self.last_seen.lock() {
            *seen = Instant::now();
        }
    }

    fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .map(|seen| seen.elapsed())
            .unwrap_or_default()
    }
}

/// In-memory wizard flows. Each flow owns its session; two flows never share one, even
/// for the same analysis id. A flow untouched for longer than the TTL is gone.
pub struct FlowRegistry {
    backend: Arc<dyn AnalysisBackend>,
    timings: SessionTimings,
    ttl: Duration,
    flows: RwLock<HashMap<Uuid, Arc<FlowEntry>>>,
}

impl FlowRegistry {
    pub fn new(backend: Arc<dyn AnalysisBackend>, timings: SessionTimings, ttl: Duration) -> Self {
        Self {
            backend,
            timings,
            ttl,
            flows: RwLock::new(HashMap::new()),
        }
    }

    pub async fn open(&self) -> (Uuid, Arc<FlowEntry>) {
        let session = AnalysisSession::new(self.backend.clone(), self.timings);
        self.insert(session).await
    }

    pub async fn resume(&self, analyse_id: i64) -> (Uuid, Arc<FlowEntry>) {
        let session =
            AnalysisSession::with_analyse_id(self.backend.clone(), self.timings, analyse_id);
        self.insert(session).await
    }

    async fn insert(&self, session: AnalysisSession) -> (Uuid, Arc<FlowEntry>) {
        let flow_id = Uuid::new_v4();
        let entry = Arc::new(FlowEntry::new(session));

        let mut flows = self.flows.write().await;
        let ttl = self.ttl;
        flows.retain(|id, flow| {
            let alive = flow.idle_for() < ttl;
            if !alive {
                debug!("Expiring wizard flow {}", id);
                flow.teardown.cancel();
            }
            alive
        });
        flows.insert(flow_id, entry.clone());
        info!("Opened wizard flow {} ({} active)", flow_id, flows.len());

        (flow_id, entry)
    }

    pub async fn get(&self, flow_id: Uuid) -> Result<Arc<FlowEntry>, AutoCheckError> {
        let entry = self
            .flows
            .read()
            .await
            .get(&flow_id)
            .cloned()
            .ok_or(AutoCheckError::FlowNotFound(flow_id))?;

        if entry.idle_for() >= self.ttl {
            debug!("Expiring wizard flow {}", flow_id);
            self.flows.write().await.remove(&flow_id);
            entry.teardown.cancel();
            return Err(AutoCheckError::FlowNotFound(flow_id));
        }

        entry.touch();
        Ok(entry)
    }

    /// Removes the flow and cancels its timers, including a results race in flight.
    pub async fn close(&self, flow_id: Uuid) -> Result<(), AutoCheckError> {
        let entry = self
            .flows
            .write()
            .await
            .remove(&flow_id)
            .ok_or(AutoCheckError::FlowNotFound(flow_id))?;
        entry.teardown.cancel();
        info!("Closed wizard flow {} ({} active)", flow_id, self.len().await);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.flows.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock_data::mock_car_parameters;
    use crate::services::stub_backend::{Behavior, StubBackend};

    fn registry(stub: StubBackend, ttl: Duration) -> FlowRegistry {
        FlowRegistry::new(Arc::new(stub), SessionTimings::default(), ttl)
    }

    #[tokio::test]
    async fn flows_for_the_same_analysis_are_independent() {
        let registry = registry(StubBackend::new(), Duration::from_secs(60));
        let (first_id, first) = registry.resume(42).await;
        let (second_id, second) = registry.resume(42).await;
        assert_ne!(first_id, second_id);

        first
            .session
            .lock()
            .await
            .update_car_parameters(mock_car_parameters())
            .await
            .unwrap();

        assert!(first.session.lock().await.car_parameters().is_some());
        assert!(second.session.lock().await.car_parameters().is_none());
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn closing_removes_the_flow() {
        let registry = registry(StubBackend::new(), Duration::from_secs(60));
        let (flow_id, _) = registry.open().await;

        registry.close(flow_id).await.unwrap();

        assert!(matches!(
            registry.get(flow_id).await,
            Err(AutoCheckError::FlowNotFound(_))
        ));
        assert!(registry.close(flow_id).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn closing_interrupts_a_pending_results_race() {
        let registry = Arc::new(registry(
            StubBackend::new().results(Behavior::Hang),
            Duration::from_secs(60),
        ));
        let (flow_id, entry) = registry.resume(7).await;

        let racing = entry.clone();
        let race = tokio::spawn(async move {
            let mut session = racing.session.lock().await;
            session.get_analysis_results().await
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        registry.close(flow_id).await.unwrap();

        let started = Instant::now();
        let outcome = race.await.unwrap().unwrap();
        assert!(outcome.is_none());
        assert!(started.elapsed() < Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_flows_are_pruned_on_open() {
        let registry = registry(StubBackend::new(), Duration::from_secs(60));
        let (old_id, _) = registry.open().await;

        tokio::time::advance(Duration::from_secs(61)).await;
        registry.open().await;

        assert!(registry.get(old_id).await.is_err());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_flow_expires_on_lookup() {
        let registry = registry(StubBackend::new(), Duration::from_secs(60));
        let (flow_id, entry) = registry.open().await;
        let teardown = entry.teardown.clone();

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(matches!(
            registry.get(flow_id).await,
            Err(AutoCheckError::FlowNotFound(_))
        ));
        assert!(teardown.is_cancelled());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn lookups_keep_a_flow_alive() {
        let registry = registry(StubBackend::new(), Duration::from_secs(60));
        let (flow_id, _) = registry.open().await;

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(40)).await;
            assert!(registry.get(flow_id).await.is_ok());
        }
    }
}
