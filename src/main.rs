use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use motionviewer::config::ViewerConfig;
use motionviewer::diagnostics::Diagnostics;
use motionviewer::input::{hardware, InputSource};
use motionviewer::persistence::SelectionStore;
use motionviewer::profile::ProfileRepository;
use motionviewer::selection::{BackgroundSelector, ProfileSelector};
use motionviewer::ui::{ViewerSession, ViewerUI};
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = ViewerConfig::default_path();
    ViewerConfig::ensure_default_config(&config_path).await?;
    let config = ViewerConfig::load(&config_path).await?;
    info!("Using profiles from {}", config.profiles_source);

    let store = SelectionStore::open(&config.state_file)
        .await
        .map_err(|e| eyre!("Failed to open selection state: {}", e))?;
    let repository = ProfileRepository::from_source(&config.profiles_source)
        .map_err(|e| eyre!("Invalid profile source: {}", e))?;
    let diagnostics = Diagnostics::new();

    let hardware_source = spawn_hardware(&config, &diagnostics);

    let profile_selector = ProfileSelector::new(repository, store.clone(), diagnostics.clone());
    let background_selector = BackgroundSelector::new(
        config.backgrounds_dir.clone(),
        config.default_background.clone(),
        store.clone(),
    );
    let mut session = ViewerSession::new(
        tokio::runtime::Handle::current(),
        profile_selector,
        background_selector,
        diagnostics,
        hardware_source,
    );
    session.start(config.local_profile_dir.clone());

    info!("Starting viewer UI");
    let frame_interval = Duration::from_millis(config.frame_interval_ms);
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Motion Controller Viewer",
        native_options,
        Box::new(move |cc| Ok(Box::new(ViewerUI::new(cc, session, frame_interval)))),
    )
    .map_err(|e| eyre!("Viewer UI failed: {}", e))?;

    store
        .flush()
        .await
        .map_err(|e| eyre!("Failed to save selection state: {}", e))?;
    Ok(())
}

fn spawn_hardware(config: &ViewerConfig, diagnostics: &Diagnostics) -> Option<InputSource> {
    if !config.hardware.enabled {
        return None;
    }
    match hardware::spawn(config.hardware.clone()) {
        Ok(source) => {
            info!(
                "Hardware input source for {} with profiles {:?}",
                source.handedness, source.profiles
            );
            Some(source)
        }
        Err(e) => {
            warn!("Hardware input disabled: {}", e);
            diagnostics.log(e.to_string());
            None
        }
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
