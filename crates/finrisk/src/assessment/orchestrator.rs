use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::domain::{AssessmentState, ErrorInfo, ErrorKind, NormalizedFeatures, RawInputs};
use super::normalizer::{normalize, NormalizationBounds};
use super::policy::{AssessmentResult, DecisionPolicy};
use crate::config::AssessmentConfig;
use crate::scoring::ScoringModel;

/// Error returned by orchestrator commands.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("assessment orchestrator has been disposed")]
    Disposed,
    #[error("assessment orchestrator must start inside a Tokio runtime: {0}")]
    Runtime(#[from] TryCurrentError),
}

impl From<&OrchestratorError> for ErrorInfo {
    fn from(err: &OrchestratorError) -> Self {
        match err {
            OrchestratorError::Disposed => ErrorInfo::new(ErrorKind::Disposed, err.to_string()),
            OrchestratorError::Runtime(_) => ErrorInfo::new(ErrorKind::Inference, err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum LoadStatus {
    Pending,
    Ready,
    Failed(ErrorInfo),
}

#[derive(Default)]
struct Control {
    in_flight: Option<JoinHandle<()>>,
    disposed: bool,
}

struct Shared {
    model: Arc<dyn ScoringModel>,
    bounds: NormalizationBounds,
    runtime: Handle,
    generation: AtomicU64,
    state: watch::Sender<AssessmentState>,
    load_status: watch::Sender<LoadStatus>,
    control: Mutex<Control>,
}

/// Coordinates input changes, model inference, and the published state stream.
///
/// Every mutation starts a new assessment cycle tagged with a generation
/// number. A cycle may publish only while its generation is the latest, so
/// snapshots always describe the most recent inputs regardless of the order
/// in which inference calls complete. The model is loaded once at start and
/// released by [`dispose`](Self::dispose) or on drop.
pub struct AssessmentOrchestrator {
    shared: Arc<Shared>,
}

impl AssessmentOrchestrator {
    /// Load the model and run the first assessment for `config.initial_inputs`.
    ///
    /// Must be called from within a Tokio runtime; cycles run on that runtime.
    pub fn start(
        model: Arc<dyn ScoringModel>,
        config: AssessmentConfig,
    ) -> Result<Self, OrchestratorError> {
        let runtime = Handle::try_current()?;
        let (state, _) = watch::channel(AssessmentState::initial(config.initial_inputs));
        let (load_status, _) = watch::channel(LoadStatus::Pending);

        let shared = Arc::new(Shared {
            model,
            bounds: config.bounds,
            runtime,
            generation: AtomicU64::new(0),
            state,
            load_status,
            control: Mutex::new(Control::default()),
        });

        info!(
            model = shared.model.name(),
            "starting assessment orchestrator"
        );
        shared.runtime.spawn(Arc::clone(&shared).load_model());
        {
            let mut control = shared.lock_control();
            shared.begin_cycle(&mut control, |_| {});
        }

        Ok(Self { shared })
    }

    pub fn set_income(&self, income: f64) -> Result<(), OrchestratorError> {
        self.mutate(|inputs| inputs.income = income)
    }

    pub fn set_age(&self, age: u32) -> Result<(), OrchestratorError> {
        self.mutate(|inputs| inputs.age = age)
    }

    pub fn set_engagement(&self, engagement: f64) -> Result<(), OrchestratorError> {
        self.mutate(|inputs| inputs.engagement = engagement)
    }

    /// Replace all three inputs with a single cycle.
    pub fn set_inputs(&self, inputs: RawInputs) -> Result<(), OrchestratorError> {
        self.mutate(|current| *current = inputs)
    }

    /// Retry loading the model after a load failure and reassess current inputs.
    pub fn reload_model(&self) -> Result<(), OrchestratorError> {
        let mut control = self.shared.lock_control();
        if control.disposed {
            return Err(OrchestratorError::Disposed);
        }

        let pending = matches!(*self.shared.load_status.borrow(), LoadStatus::Pending);
        if !pending {
            self.shared.load_status.send_replace(LoadStatus::Pending);
            self.shared
                .runtime
                .spawn(Arc::clone(&self.shared).load_model());
        }

        let generation = self.shared.begin_cycle(&mut control, |_| {});
        info!(generation, "model reload requested");
        Ok(())
    }

    /// Stream of snapshots. The receiver starts at the current snapshot.
    pub fn subscribe(&self) -> watch::Receiver<AssessmentState> {
        self.shared.state.subscribe()
    }

    pub fn snapshot(&self) -> AssessmentState {
        self.shared.state.borrow().clone()
    }

    /// Resolve with the first snapshot that is not loading.
    pub async fn settled(&self) -> AssessmentState {
        let mut updates = self.subscribe();
        let settled = updates
            .wait_for(|state| !state.is_loading)
            .await
            .map(|state| AssessmentState::clone(&state));
        settled.unwrap_or_else(|_| self.snapshot())
    }

    /// Generation of the most recently started cycle.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock_control().disposed
    }

    /// Stop accepting mutations and release the model. Later calls are no-ops.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    fn mutate(&self, apply: impl FnOnce(&mut RawInputs)) -> Result<(), OrchestratorError> {
        let mut control = self.shared.lock_control();
        if control.disposed {
            return Err(OrchestratorError::Disposed);
        }
        let generation = self.shared.begin_cycle(&mut control, apply);
        debug!(generation, "inputs changed");
        Ok(())
    }
}

impl Drop for AssessmentOrchestrator {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

impl Shared {
    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the mutated inputs as loading, supersede any in-flight cycle and
    /// launch a new one. Caller holds the control lock.
    fn begin_cycle(
        self: &Arc<Self>,
        control: &mut Control,
        apply: impl FnOnce(&mut RawInputs),
    ) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut inputs = RawInputs::default();
        self.state.send_modify(|state| {
            apply(&mut state.inputs);
            state.is_loading = true;
            state.error = None;
            inputs = state.inputs;
        });

        if let Some(previous) = control.in_flight.take() {
            debug!(generation, "superseding in-flight assessment");
            previous.abort();
        }
        control.in_flight = Some(
            self.runtime
                .spawn(Arc::clone(self).run_cycle(generation, inputs)),
        );
        generation
    }

    async fn load_model(self: Arc<Self>) {
        let model = Arc::clone(&self.model);
        let status = match tokio::task::spawn_blocking(move || model.load()).await {
            Ok(Ok(())) => LoadStatus::Ready,
            Ok(Err(err)) => {
                warn!(
                    model = self.model.name(),
                    error = %err,
                    "scoring model failed to load"
                );
                LoadStatus::Failed(ErrorInfo::from(&err))
            }
            Err(err) => LoadStatus::Failed(ErrorInfo::new(
                ErrorKind::Load,
                format!("model load task failed: {err}"),
            )),
        };

        let control = self.lock_control();
        if control.disposed {
            debug!("releasing model loaded after dispose");
            self.model.release();
        }
        self.load_status.send_replace(status);
    }

    async fn run_cycle(self: Arc<Self>, generation: u64, inputs: RawInputs) {
        let features = normalize(&inputs, &self.bounds);
        debug!(
            generation,
            features = ?features.values(),
            "assessment cycle started"
        );

        let outcome = match self.model_ready().await {
            Ok(()) => self.score(features).await,
            Err(error) => Err(error),
        };
        self.settle(generation, features, outcome);
    }

    async fn model_ready(&self) -> Result<(), ErrorInfo> {
        let mut status = self.load_status.subscribe();
        let ready = status
            .wait_for(|status| *status != LoadStatus::Pending)
            .await
            .map(|status| LoadStatus::clone(&status));

        match ready {
            Ok(LoadStatus::Failed(error)) => Err(error),
            Ok(_) => Ok(()),
            Err(_) => Err(ErrorInfo::new(
                ErrorKind::Load,
                "model load status is unavailable",
            )),
        }
    }

    async fn score(&self, features: NormalizedFeatures) -> Result<AssessmentResult, ErrorInfo> {
        let model = Arc::clone(&self.model);
        match tokio::task::spawn_blocking(move || model.infer(features.as_slice())).await {
            Ok(Ok(inference)) => Ok(DecisionPolicy::from_probability(
                inference.probability,
                inference.latency,
            )),
            Ok(Err(err)) => Err(ErrorInfo::from(&err)),
            Err(err) => Err(ErrorInfo::new(
                ErrorKind::Inference,
                format!("scoring task failed: {err}"),
            )),
        }
    }

    /// Apply a cycle's outcome if it is still the latest. Returns whether it
    /// was published.
    fn settle(
        &self,
        generation: u64,
        features: NormalizedFeatures,
        outcome: Result<AssessmentResult, ErrorInfo>,
    ) -> bool {
        let mut control = self.lock_control();
        let latest = self.generation.load(Ordering::SeqCst);
        if control.disposed || generation != latest {
            debug!(generation, latest, "discarding superseded assessment");
            return false;
        }
        control.in_flight = None;

        match &outcome {
            Ok(result) => info!(
                generation,
                decision = result.decision.label(),
                probability = result.probability,
                latency_us = result.inference_latency.as_micros() as u64,
                "assessment settled"
            ),
            Err(error) => warn!(
                generation,
                kind = error.kind.label(),
                error = %error.message,
                "assessment failed"
            ),
        }

        self.state.send_modify(|state| {
            state.is_loading = false;
            match outcome {
                Ok(result) => {
                    state.result = Some(result);
                    state.normalized_features = Some(features);
                    state.error = None;
                }
                Err(error) => state.error = Some(error),
            }
        });
        true
    }

    fn dispose(&self) {
        let mut control = self.lock_control();
        if control.disposed {
            return;
        }
        control.disposed = true;
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(in_flight) = control.in_flight.take() {
            in_flight.abort();
        }

        if matches!(*self.load_status.borrow(), LoadStatus::Pending) {
            debug!("model load still pending, release deferred until it completes");
        } else {
            self.model.release();
        }

        self.state.send_if_modified(|state| {
            let was_loading = state.is_loading;
            state.is_loading = false;
            was_loading
        });
        info!("assessment orchestrator disposed");
    }
}
