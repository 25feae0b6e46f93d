//! Translation between the canonical model-stream vocabulary and the three
//! downstream dialects.
//!
//! Inbound requests are converted to [`canonical::ModelRequest`] by the
//! `*2canonical` converters. Outbound, a [`middleware::StreamProcessor`]
//! drives one [`middleware::DialectAdapter`] over the source events and
//! hands each wire chunk to a sink in source order.

pub mod canonical;
pub mod generate_content;
pub mod middleware;
pub mod state;
