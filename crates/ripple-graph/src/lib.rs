//! Ripple Graph
//!
//! Gateway to the dependency multigraph holding code-to-code, code-to-schema
//! and API-to-consumer edges:
//! - `GraphGateway` port with bounded, cycle-safe edge queries and idempotent upserts
//! - `InMemoryGraphStore`, seeded from the static analyzer's edge list
//! - Neighbourhood views for graph visualization

pub mod error;
pub mod gateway;
pub mod memory;

pub use error::{GraphError, Result};
pub use gateway::{neighbourhood_view, GraphGateway};
pub use memory::{parse_edge_list, EdgeList, InMemoryGraphStore};
