// Classify API contract differences between two files

use std::path::PathBuf;

use ripple_analysis::{classify, parse_api_spec};
use ripple_domain::ApiChangeItem;
use serde_json::Value;

use super::{print_json, read_file, Command};
use crate::error::Result;

/// `ripple classify`
#[derive(Debug, Clone)]
pub struct ClassifyCommand {
    pub before: PathBuf,
    pub after: PathBuf,
}

impl ClassifyCommand {
    pub async fn run(&self) -> Result<Vec<ApiChangeItem>> {
        let before = parse_api_spec(&Value::String(read_file(&self.before)?))?;
        let after = parse_api_spec(&Value::String(read_file(&self.after)?))?;
        Ok(classify(&before, &after))
    }
}

#[async_trait::async_trait]
impl Command for ClassifyCommand {
    async fn execute(&self) -> Result<()> {
        print_json(&self.run().await?)
    }
}
