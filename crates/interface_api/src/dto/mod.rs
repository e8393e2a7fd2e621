//! Request and response bodies

pub mod workflow;
