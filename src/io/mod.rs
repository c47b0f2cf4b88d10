//! Request body generation
//!
//! Produces the bytes uploaded by PUT workers.

pub mod generator;

pub use generator::ObjectGenerator;
