//! # Connection Model
//!
//! Plain DTOs shared by the kernel adapter, the scan engine and the
//! marshalling layer. These mirror what a simulation kernel hands out
//! through its connection API.
//!
//! Design rule: this module is pure data. No I/O, no kernel calls.

pub mod node;
pub mod connection;
pub mod value;
pub mod property_map;

pub use node::{NodeId, Locality};
pub use connection::{Connection, SynapseModelId};
pub use value::Value;
pub use property_map::PropertyMap;
