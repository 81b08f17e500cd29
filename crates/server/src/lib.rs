//! HTTP surface: a table of servlets, each exposing named operations, behind
//! a single dispatcher that always answers with a JSON envelope.

pub mod dispatch;
pub mod envelope;
pub mod errors;
pub mod metrics;
pub mod servlet;
pub mod servlets;
pub mod startup;
pub mod state;

pub use startup::run;
