//! Document mapping pipeline for docmap.
//!
//! Given a batch of externally picked files, determine which already exist
//! as tracked documents, reconcile duplicates with user confirmation,
//! create records for the rest, and publish the final mapped set to the
//! owning entity. All external collaborators are injected as trait objects;
//! see [`services`] for the contracts and [`pipeline::DocumentMapper`] for
//! the orchestrator.

pub mod create;
pub mod events;
pub mod pipeline;
pub mod reconcile;
pub mod resolve;
pub mod services;

pub use events::{LogSink, MappingEvent, NotificationSink};
pub use pipeline::{Collaborators, DocumentMapper, MapOutcome, RunReport};
pub use services::{
    AdminGrantService, ConfirmDecision, ConfirmPrompt, ConfirmationService, ExistenceService,
    PermissionCache, PersistenceService, PickOutcome, PickerGateway,
};
