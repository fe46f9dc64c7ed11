use std::net::SocketAddr;
use std::{sync::Mutex, time::Duration};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::trace;

/// Interval between two upkeep runs of the prometheus recorder.
const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

// Installing a second global recorder fails, every caller after the first one gets a clone
// of the same handle.
static PROMETHEUS_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Installs the global prometheus recorder once and returns a handle to render metrics.
///
/// The first call also spawns a task on the current tokio runtime that periodically runs
/// upkeep on the recorder, which keeps histogram memory bounded.
pub fn init_metrics_handle() -> Result<PrometheusHandle, BuildError> {
    let mut prometheus_handle = PROMETHEUS_HANDLE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(handle) = &*prometheus_handle {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    *prometheus_handle = Some(handle.clone());

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(UPKEEP_INTERVAL).await;
            trace!("running metrics upkeep");
            upkeep_handle.run_upkeep();
        }
    });

    Ok(handle)
}

/// Installs the global recorder together with an http listener serving `/metrics`.
///
/// When `app_name` is set it is attached to every metric as the `app` global label.
pub fn init_metrics(
    listen_address: SocketAddr,
    app_name: Option<String>,
) -> Result<(), BuildError> {
    let mut builder = PrometheusBuilder::new().with_http_listener(listen_address);

    if let Some(app_name) = app_name {
        builder = builder.add_global_label("app", app_name);
    }

    builder.install()
}
