/// Flow instance checkpoint records
pub mod flow_instance;

/// Domain events
pub mod events;

/// Tagged attempt outcomes
pub mod outcome;

/// Conflict classification
pub mod classifier;

/// Progress reporting
pub mod progress;

/// Repository interfaces
pub mod repository;

/// Collaborator interfaces
pub mod services;
