//! Context payload sent to the semantic advisor

use ripple_domain::{
    ApiChangeItem, ChangeDescriptor, ChangePayload, CodeDependencies,
    ConsumerReport, SchemaRelationships,
};
use serde::Serialize;

/// Longest diff excerpt forwarded to the model
const MAX_DIFF_CHARS: usize = 4000;

/// Longest list of consumer locations forwarded to the model
const MAX_CONSUMER_LINES: usize = 20;

/// Instructions sent as the system message
pub const SYSTEM_PROMPT: &str = "You are a senior engineer reviewing the impact of a change. \
Respond with a single JSON object and nothing else, shaped as \
{\"summary\": string, \"risks\": [{\"title\": string, \"severity\": \"low\"|\"medium\"|\"high\"|\"critical\", \
\"technical_context\": string, \"business_impact\": string, \"cascading_effects\": string}], \
\"recommendations\": [string]}. Give one recommendation per risk, in the same order.";

/// Structural facts about a change, rendered into the advisor prompt
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContextPayload {
    pub analysis_type: String,
    pub change: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub api_changes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub consumers: Vec<String>,
}

impl ContextPayload {
    /// Start a payload describing the change itself
    pub fn for_change(descriptor: &ChangeDescriptor) -> Self {
        let change = match descriptor.change() {
            ChangePayload::Code(code) => format!(
                "Commit {} to {}: {}\n{}",
                code.commit_sha,
                code.file_path,
                code.commit_message,
                truncate(&code.diff, MAX_DIFF_CHARS)
            ),
            ChangePayload::Schema(schema) => format!(
                "{} change to {} {}{}: {}",
                schema.database_kind,
                schema.database_kind.entity_kind(),
                schema.entity_name,
                schema
                    .field_name
                    .as_ref()
                    .map(|f| format!(".{}", f))
                    .unwrap_or_default(),
                schema.ddl_or_operation
            ),
            ChangePayload::ApiContract(api) => format!(
                "API contract change in {} at {} ({} endpoints before, {} after)",
                api.repository,
                api.commit_sha,
                api.before_spec.endpoints.len(),
                api.after_spec.endpoints.len()
            ),
        };

        Self {
            analysis_type: descriptor.analysis_type().to_string(),
            change,
            ..Default::default()
        }
    }

    pub fn with_code_dependencies(mut self, deps: &CodeDependencies) -> Self {
        let groups = [
            ("depends on", &deps.direct),
            ("indirectly depends on", &deps.indirect),
            ("is used by", &deps.reverse_direct),
            ("is indirectly used by", &deps.reverse_indirect),
        ];
        for (relation, entities) in groups {
            for dep in entities {
                self.dependencies
                    .push(format!("{} {} ({} hops)", relation, dep.entity, dep.hops));
            }
        }
        self
    }

    pub fn with_schema_relationships(mut self, schema: &SchemaRelationships) -> Self {
        for dep in &schema.code_dependencies {
            self.dependencies
                .push(format!("{} references it {} times", dep.file, dep.usage_count));
        }
        for entity in &schema.affected_entities {
            self.dependencies.push(format!("related entity {}", entity));
        }
        self
    }

    pub fn with_api_changes(mut self, items: &[ApiChangeItem]) -> Self {
        self.api_changes = items
            .iter()
            .map(|item| {
                format!(
                    "{} {}{}: {}",
                    item.change_type,
                    item.endpoint_key(),
                    if item.breaking { " (breaking)" } else { "" },
                    item.details.reason()
                )
            })
            .collect();
        self
    }

    pub fn with_consumers(mut self, report: &ConsumerReport) -> Self {
        for target in &report.targets {
            for consumer in target.iter() {
                if self.consumers.len() >= MAX_CONSUMER_LINES {
                    break;
                }
                self.consumers.push(format!(
                    "{} used in {}:{}:{}",
                    target.target, consumer.repository, consumer.file_path, consumer.line_number
                ));
            }
        }
        let total = report.total_consumers();
        if total > self.consumers.len() {
            self.consumers
                .push(format!("... {} consumer locations in total", total));
        }
        if report.search_incomplete {
            self.consumers
                .push("consumer search was incomplete; more consumers may exist".to_string());
        }
        self
    }

    /// Render the user message for the model
    pub fn to_prompt(&self) -> String {
        let mut prompt = format!(
            "Analysis type: {}\n\nChange:\n{}\n",
            self.analysis_type, self.change
        );
        let sections = [
            ("Dependencies", &self.dependencies),
            ("API changes", &self.api_changes),
            ("Consumers", &self.consumers),
        ];
        for (title, lines) in sections {
            if lines.is_empty() {
                continue;
            }
            prompt.push_str(&format!("\n{}:\n", title));
            for line in lines {
                prompt.push_str("- ");
                prompt.push_str(line);
                prompt.push('\n');
            }
        }
        prompt.push_str("\nDescribe the business and technical risks of this change.");
        prompt
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("\n[truncated]");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_domain::{
        ApiContractChange, ApiSpec, ChangeDetails, ChangeType, CodeChange, Consumer,
    };

    #[test]
    fn test_prompt_lists_api_changes_and_consumers() {
        let descriptor = ChangeDescriptor::fresh(ChangePayload::ApiContract(ApiContractChange {
            before_spec: ApiSpec::default(),
            after_spec: ApiSpec::default(),
            repository: "acme/trading-api".to_string(),
            commit_sha: "abc123".to_string(),
        }));
        let items = vec![ApiChangeItem::new(
            "/api/stocks/buy",
            "POST",
            ChangeType::Breaking,
            ChangeDetails::Text("Required parameter accountId added".to_string()),
        )];
        let mut report = ConsumerReport::default();
        report.target_mut("POST /api/stocks/buy").push(Consumer {
            repository: "web".to_string(),
            file_path: "src/buy.ts".to_string(),
            line_number: 12,
            context_snippet: String::new(),
            source_url: None,
        });
        report.search_incomplete = true;

        let payload = ContextPayload::for_change(&descriptor)
            .with_api_changes(&items)
            .with_consumers(&report);
        let prompt = payload.to_prompt();

        assert_eq!(payload.analysis_type, "api_contract");
        assert!(prompt.contains("BREAKING POST /api/stocks/buy (breaking): Required parameter accountId added"));
        assert!(prompt.contains("POST /api/stocks/buy used in web:src/buy.ts:12"));
        assert!(prompt.contains("consumer search was incomplete"));
    }

    #[test]
    fn test_long_diffs_are_truncated() {
        let descriptor = ChangeDescriptor::fresh(ChangePayload::Code(CodeChange {
            file_path: "src/a.ts".to_string(),
            diff: "x".repeat(MAX_DIFF_CHARS + 10),
            commit_sha: "abc".to_string(),
            commit_message: "big".to_string(),
        }));
        let payload = ContextPayload::for_change(&descriptor);
        assert!(payload.change.ends_with("[truncated]"));
        assert!(payload.dependencies.is_empty());
    }
}
