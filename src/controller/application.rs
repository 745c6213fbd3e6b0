//! Application Controller
//!
//! This module defines the controller orchestrating the dashboard: it owns
//! the event loop, drives the loading pipeline and swaps the active view
//! between the loading page and the dashboard.

use std::sync::Arc;

use eframe::App;
use log::{error, info};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::core::{events::AppEvent, view_trait::ViewApi};
use crate::model::glucose::GlucoseSessionData;
use crate::model::loader::{DataSource, DatasetCache};
use crate::view::{dashboard::DashboardView, loading::LoadingView};

/// Main application controller.
///
/// Owns the active view and the background event handler task. Implements
/// `eframe::App`, so rendering just forwards to whatever view is active.
pub struct AppController {
    view: Arc<Mutex<Box<dyn ViewApi>>>,
    _task_handle: JoinHandle<()>,
}

impl AppController {
    /// Creates the controller and kicks off the initial load.
    ///
    /// # Arguments
    /// - `source`: Where the export bytes come from.
    /// - `cache`: Memoizing dataset cache (owned by the event loop).
    /// - `gui_ctx`: The egui context, used to request repaints.
    pub fn new<DS>(source: DS, cache: DatasetCache, gui_ctx: egui::Context) -> Self
    where
        DS: DataSource + 'static,
    {
        info!("Initializing AppController.");
        let (event_tx, event_rx) = tokio::sync::mpsc::channel(16);
        let view: Arc<Mutex<Box<dyn ViewApi>>> = Arc::new(Mutex::new(Box::new(
            LoadingView::loading(event_tx.clone()),
        )));
        let _ = event_tx.try_send(AppEvent::LoadData);
        Self {
            view: view.clone(),
            _task_handle: tokio::spawn(Self::event_handler(
                source, cache, view, event_rx, event_tx, gui_ctx,
            )),
        }
    }

    /// Runs the loading pipeline and reports the outcome as an event.
    async fn load<DS: DataSource>(source: &DS, cache: &mut DatasetCache, event_tx: &Sender<AppEvent>) {
        let event = match cache.get_or_load(source).await {
            Ok(dataset) => match GlucoseSessionData::from_dataset(&dataset) {
                Ok(session) => AppEvent::SessionReady(Arc::new(session)),
                Err(e) => {
                    error!("deriving the session data failed: {}", e);
                    AppEvent::LoadFailed(e.to_string())
                }
            },
            Err(e) => {
                error!("loading the dataset failed: {}", e);
                AppEvent::LoadFailed(e.to_string())
            }
        };
        if event_tx.send(event).await.is_err() {
            error!("event channel closed while reporting the load outcome");
        }
    }

    /// Asynchronous event handler.
    ///
    /// Processes application-level events and swaps the active view.
    async fn event_handler<DS: DataSource>(
        source: DS,
        mut cache: DatasetCache,
        view: Arc<Mutex<Box<dyn ViewApi>>>,
        mut event_ch_rx: Receiver<AppEvent>,
        event_ch_tx: Sender<AppEvent>,
        gui_ctx: egui::Context,
    ) {
        while let Some(evt) = event_ch_rx.recv().await {
            match evt {
                AppEvent::LoadData => {
                    *view.lock().await = Box::new(LoadingView::loading(event_ch_tx.clone()));
                    Self::load(&source, &mut cache, &event_ch_tx).await;
                }
                AppEvent::ReloadData => {
                    cache.invalidate();
                    *view.lock().await = Box::new(LoadingView::loading(event_ch_tx.clone()));
                    Self::load(&source, &mut cache, &event_ch_tx).await;
                }
                AppEvent::SessionReady(session) => {
                    *view.lock().await =
                        Box::new(DashboardView::new(session, event_ch_tx.clone()));
                }
                AppEvent::LoadFailed(message) => {
                    *view.lock().await =
                        Box::new(LoadingView::failed(message, event_ch_tx.clone()));
                }
            }
            gui_ctx.request_repaint();
        }
    }
}

impl App for AppController {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_pixels_per_point(1.5);
        if let Err(e) = self.view.blocking_lock().render(ctx) {
            error!("Error during rendering: {}", e);
        }
    }
}
