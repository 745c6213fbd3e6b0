//! Loading View
//!
//! This module provides the view shown before the dashboard has data:
//! a spinner while the export download is in flight and a fatal error page
//! when it failed. There is no fallback data source, only a manual reload.

use eframe::egui;
use log::error;
use tokio::sync::mpsc::Sender;

use crate::core::{events::AppEvent, view_trait::ViewApi};

/// Pre-dashboard view: spinner or fatal load error.
pub struct LoadingView {
    error: Option<String>,
    event_ch: Sender<AppEvent>,
}

impl LoadingView {
    /// View for an in-flight download.
    pub fn loading(event_ch: Sender<AppEvent>) -> Self {
        Self {
            error: None,
            event_ch,
        }
    }

    /// View for a failed load.
    pub fn failed(message: String, event_ch: Sender<AppEvent>) -> Self {
        Self {
            error: Some(message),
            event_ch,
        }
    }
}

impl ViewApi for LoadingView {
    fn event(&self, event: AppEvent) {
        if let Err(e) = self.event_ch.try_send(event) {
            error!("Failed to send AppEvent: {}", e);
        }
    }

    fn render(&mut self, ctx: &egui::Context) -> Result<(), String> {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() * 0.3);
                match &self.error {
                    None => {
                        ui.spinner();
                        ui.label("Fetching the CGM export...");
                    }
                    Some(message) => {
                        ui.heading("Could not load the data");
                        ui.label(message.clone());
                        if ui.button("Reload").clicked() {
                            self.event(AppEvent::ReloadData);
                        }
                    }
                }
            });
        });
        Ok(())
    }
}
