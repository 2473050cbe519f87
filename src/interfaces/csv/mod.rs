//! CSV journal input and report output used by the replay binary.

pub mod action_reader;
pub mod report_writer;
