use lens_vigil::alert::channels::{AlertChannel, EmailChannel, SmsChannel};
use lens_vigil::alert::AlertDispatcher;
use lens_vigil::capture::{FrameSource, TestPatternDevice};
use lens_vigil::config::AppConfig;
use lens_vigil::detector::ObstructionDetector;
use lens_vigil::monitor::{self, Monitor, RuntimeState};
use lens_vigil::store::{EventStore, JsonlEventStore, LogSink, MemoryEventStore};
use lens_vigil::{logging, Result};
use log::{error, info};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = AppConfig::from_env();
    info!(
        "starting lens-vigil for {} ({}x{})",
        config.capture.device_label(),
        config.capture.width,
        config.capture.height
    );

    let store: Arc<dyn EventStore> = match &config.log_path {
        Some(path) => {
            info!("persisting alert events to {}", path.display());
            Arc::new(JsonlEventStore::new(path))
        }
        None => {
            info!("no LOG_DB_PATH set, keeping alert events in memory");
            Arc::new(MemoryEventStore::new())
        }
    };
    let sink = Arc::new(LogSink::new(store));

    // Delivery transports are wired by the deployment; without them the
    // channels report unconfigured and the dispatcher skips them.
    let channels: Vec<Arc<dyn AlertChannel>> =
        vec![Arc::new(EmailChannel::new(None)), Arc::new(SmsChannel::new(None))];
    let dispatcher = AlertDispatcher::new(channels);

    let device = TestPatternDevice::new(config.capture.width, config.capture.height);
    let dark_switch = device.dark_switch();

    // DEMO_DARK_AFTER_SECONDS covers the lens after a delay so a local run
    // exercises the whole alert path end to end.
    if let Ok(raw) = std::env::var("DEMO_DARK_AFTER_SECONDS") {
        match raw.trim().parse::<u64>() {
            Ok(secs) => {
                let switch = Arc::clone(&dark_switch);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                    info!("demo: covering the lens");
                    switch.store(true, Ordering::Relaxed);
                });
            }
            Err(_) => error!("invalid DEMO_DARK_AFTER_SECONDS value {:?}, ignoring", raw),
        }
    }

    let source = FrameSource::start(Box::new(device));
    let detector = ObstructionDetector::new(config.detector.clone());

    let state = Arc::new(RuntimeState::new());
    state.start_detection();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let monitor = Monitor::new(
        source,
        detector,
        dispatcher,
        Arc::clone(&sink),
        Arc::clone(&state),
        config.contacts.clone(),
        config.capture.device_label(),
        shutdown_rx,
    );
    let monitor_handle = tokio::spawn(monitor.run());

    // Periodic status line so an operator tailing the log sees the flags
    // and the alert count without a control surface.
    {
        let state = Arc::clone(&state);
        let sink = Arc::clone(&sink);
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => {
                        let snapshot = monitor::status(&state, &sink).await;
                        info!(
                            "status: {:?}, detection={}, last_alert={:?}, recent={}",
                            snapshot.status,
                            snapshot.detection_enabled,
                            snapshot.last_alert_time,
                            snapshot.recent_log.len()
                        );
                    }
                }
            }
        });
    }

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", err);
    }
    info!("shutdown requested");
    let _ = shutdown_tx.send(());
    if let Err(err) = monitor_handle.await {
        error!("monitor task panicked: {}", err);
    }

    Ok(())
}
