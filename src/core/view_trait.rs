//! Core View Trait
//!
//! This module defines the `ViewApi` trait, which is implemented by all views
//! of the dashboard. It provides a standardized interface for publishing
//! events and rendering.

use super::events::AppEvent;

/// Trait defining the interface for application views.
pub trait ViewApi: Send {
    /// Publishes an event triggered by user interaction.
    fn event(&self, event: AppEvent);

    /// Renders the view.
    ///
    /// # Arguments
    /// * `ctx` - The `egui::Context` for rendering the UI.
    ///
    /// # Returns
    /// `Err` with a description if rendering failed.
    fn render(&mut self, ctx: &egui::Context) -> Result<(), String>;
}
