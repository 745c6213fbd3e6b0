//! CGM Analytics Dashboard
//!
//! This tool fetches a continuous-glucose-monitor (CGM) export, cleans it
//! and renders a single analytics page: descriptive statistics, a bolus
//! boxplot, a time-in-range breakdown and an interactive glucose trace.

use controller::application::AppController;
use crate::core::constants::{CACHE_FILE, DATA_URL};
use eframe::NativeOptions;
use env_logger::Env;
use model::loader::{DatasetCache, HttpSource};
use tokio::runtime::Runtime;

/// Core utilities and traits used throughout the application.
mod core {
    /// Application-wide constants.
    pub mod constants;
    /// Event system for inter-module communication.
    pub mod events;
    /// Trait definitions for views.
    pub mod view_trait;
}

/// Controllers managing the application's logic.
mod controller {
    /// Entry point controller orchestrating loading and view switching.
    pub mod application;
}

/// Mathematical utilities for the data pipeline.
mod math {
    /// Gap interpolation and descriptive statistics.
    pub mod series;
}

/// Data models representing the application's domain.
mod model {
    /// Tabular structures produced by the loader.
    pub mod dataset;
    /// Range classification, aggregation and derived session data.
    pub mod glucose;
    /// Download, local mirror and memoization of the dataset.
    pub mod loader;
}

/// UI-related components for the application.
mod view {
    /// The analytics dashboard page.
    pub mod dashboard;
    /// Spinner and fatal-error page shown before data arrives.
    pub mod loading;
}

/// Main entry point of the application.
///
/// Initializes logging, sets up the asynchronous runtime, and starts the
/// application with the eframe framework.
fn main() {
    // Initialize logger with environment-specific settings.
    env_logger::Builder::from_env(
        Env::default()
            .filter_or("MY_LOG_LEVEL", "info")
            .write_style_or("MY_LOG_STYLE", "always"),
    )
    .init();

    // Create a new Tokio runtime for asynchronous operations.
    let rt = Runtime::new().expect("Unable to create Runtime");
    let _enter = rt.enter();

    let source = HttpSource::new(DATA_URL).expect("Unable to create HTTP client");
    let cache = DatasetCache::new(CACHE_FILE);

    // Start the eframe application with the controller as the app.
    eframe::run_native(
        "Cgm-rs",
        NativeOptions::default(),
        Box::new(|cc| {
            let controller = AppController::new(source, cache, cc.egui_ctx.clone());
            Ok(Box::new(controller))
        }),
    )
    .expect("Failed to start eframe application");
}
