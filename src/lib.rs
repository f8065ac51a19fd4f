pub mod adapter;
pub mod advice;
pub mod booking;
pub mod config;
pub mod error;
pub mod models;
pub mod planner;
pub mod rate_limit;
pub mod routes;
pub mod schema;
pub mod service;
pub mod storage;
pub mod transport;
pub mod visual;
pub mod wallet;

#[cfg(test)]
mod testing;

pub use crate::error::{MzaniGoError, Result};
pub use crate::models::{RouteOption, Ticket, TicketStatus, TransportType};
pub use crate::planner::TripPlanner;
