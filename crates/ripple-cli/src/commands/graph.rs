// Print the dependency neighbourhood of an entity

use std::path::PathBuf;

use ripple_analysis::parse_entity;
use ripple_domain::GraphView;
use ripple_graph::{neighbourhood_view, InMemoryGraphStore};

use super::{print_json, Command};
use crate::error::{CliError, Result};

/// `ripple graph`
#[derive(Debug, Clone)]
pub struct GraphCommand {
    pub edges: PathBuf,
    pub entity: String,
    pub hops: u32,
}

impl GraphCommand {
    pub async fn run(&self) -> Result<GraphView> {
        if self.hops == 0 {
            return Err(CliError::invalid_argument("--hops must be at least 1"));
        }
        let store = InMemoryGraphStore::from_edge_list(&self.edges)?;
        let entity = parse_entity(&self.entity);
        Ok(neighbourhood_view(&store, &entity, self.hops).await?)
    }
}

#[async_trait::async_trait]
impl Command for GraphCommand {
    async fn execute(&self) -> Result<()> {
        print_json(&self.run().await?)
    }
}
