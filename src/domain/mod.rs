//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains some of:
//! - `mod.rs`: Rich domain types
//! - `wire.rs`: Raw serde structs matching feed payloads
//! - `convert.rs`: `From` conversions from wire types
//! - `state.rs`: State containers with update methods (for WS-driven data)

pub mod candle;
pub mod market;
pub mod order;
pub mod orderbook;
