use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::application::context::{AppContext, WorkerContext};
use crate::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<AppContext>,
    /// Worker-side context, built over the worker credential.
    pub worker: Arc<WorkerContext>,
    pub settings: Settings,
    pub metrics: Option<PrometheusHandle>,
}
