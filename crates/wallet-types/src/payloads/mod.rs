//! Payload attribute types for the supported partitions.
//!
//! Each attribute type documents its canonical field order next to its
//! `minicbor` implementation. The order is part of the wire contract with the
//! node and is versioned together with [`crate::TX_ORDER_VERSION`].

pub mod evm;
pub mod orchestration;
