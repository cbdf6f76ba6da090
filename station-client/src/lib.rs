//! Read-side client for pumping-station telemetry stored in QuestDB.

pub mod db;
pub mod domain;
