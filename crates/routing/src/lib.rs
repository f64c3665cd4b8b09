//! Routing engine: turns inbound chat events into delivery actions and
//! session mutations.
//!
//! Per-user state machine:
//! 1. Idle: no pending category, no active conversation.
//! 2. SelectingMessage: category chosen, awaiting the free-text message.
//! 3. InDialog: an operator claimed the conversation; user text forwards
//!    straight to that operator.
//!
//! The chat platform is a collaborator behind the [`Delivery`] trait; the
//! engine never talks to a transport directly.

pub mod delivery;
pub mod engine;
pub mod error;
pub mod event;
pub mod fanout;
pub mod render;

pub use {
    delivery::{Controls, Delivery},
    engine::RoutingEngine,
    error::{Error, Result},
    event::{InboundEvent, Initiator},
    fanout::NotificationFanout,
};
