//! Core Events
//!
//! This module defines the events used for communication between the views
//! and the application controller. Events are central to the application's
//! event-driven architecture.

use std::sync::Arc;

use crate::model::glucose::GlucoseSessionData;

/// Enumeration of all application-level events.
///
/// These events drive the interaction between views, the controller, and the
/// data pipeline.
#[derive(Clone, Debug)]
pub enum AppEvent {
    /// Load the dataset, reusing the memoized copy when one exists.
    LoadData,

    /// Drop the memoized dataset and fetch it again.
    ReloadData,

    /// The pipeline finished; carries the derived session data.
    SessionReady(Arc<GlucoseSessionData>),

    /// Loading or parsing failed; carries the error description.
    LoadFailed(String),
}
