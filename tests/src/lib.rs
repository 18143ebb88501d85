//! Flows and fixtures shared by the end-to-end scenarios.

pub mod fixtures;
pub mod flows;

pub use fixtures::{
    issue_reference, node_executor, pause_point, update_reference, Node, PauseControl, PausePoint,
};
pub use flows::{IssueAgainstReference, SpendState, UpdateReference};
