//! Breaking-change classification of API contract diffs
//!
//! Endpoints are matched by `(method, path)`. Unmatched endpoints become
//! REMOVED or ADDED; a path change is never folded into MODIFIED. Removal is
//! always breaking, whether or not any consumer is known.

use std::collections::{BTreeMap, BTreeSet};

use ripple_domain::{
    ApiChangeItem, ApiSpec, ChangeDetails, ChangeType, EndpointKey, EndpointSpec, Modification,
    ModificationKind, ParameterSpec, StructuredDetails,
};
use tracing::debug;

/// Minimum parameter-name Jaccard similarity for rename pairing
pub const RENAME_SIMILARITY: f64 = 0.5;

/// Classify every changed endpoint between two contract versions.
///
/// Output is sorted by path, then method, and is identical for identical
/// inputs.
pub fn classify(before: &ApiSpec, after: &ApiSpec) -> Vec<ApiChangeItem> {
    let before_index = index(before);
    let after_index = index(after);

    let mut items = Vec::new();
    let mut removed: Vec<&EndpointSpec> = Vec::new();
    let mut added: Vec<&EndpointSpec> = Vec::new();

    for (key, old) in &before_index {
        match after_index.get(key) {
            Some(new) => {
                if let Some(item) = compare(old, new) {
                    items.push(item);
                }
            }
            None => removed.push(*old),
        }
    }
    for (key, new) in &after_index {
        if !before_index.contains_key(key) {
            added.push(*new);
        }
    }

    let renames = pair_renames(&removed, &added);

    for old in &removed {
        items.push(endpoint_item(old, ChangeType::Removed, None));
    }
    for new in &added {
        let rename_of = renames.get(&new.key()).cloned();
        items.push(endpoint_item(new, ChangeType::Added, rename_of));
    }

    items.sort_by(|a, b| a.endpoint.cmp(&b.endpoint).then_with(|| a.method.cmp(&b.method)));
    debug!(
        items = items.len(),
        breaking = items.iter().filter(|i| i.breaking).count(),
        "Classified API contract changes"
    );
    items
}

/// First definition wins when a contract repeats an endpoint
fn index(spec: &ApiSpec) -> BTreeMap<EndpointKey, &EndpointSpec> {
    let mut index = BTreeMap::new();
    for endpoint in &spec.endpoints {
        index.entry(endpoint.key()).or_insert(endpoint);
    }
    index
}

fn endpoint_item(endpoint: &EndpointSpec, change_type: ChangeType, rename_of: Option<String>) -> ApiChangeItem {
    let (kind, reason, before, after) = match change_type {
        ChangeType::Removed => (
            ModificationKind::EndpointRemoved,
            "Endpoint removed".to_string(),
            Some(endpoint.clone()),
            None,
        ),
        _ => (
            ModificationKind::EndpointAdded,
            match &rename_of {
                Some(old) => format!("Endpoint added; possible rename of {}", old),
                None => "Endpoint added".to_string(),
            },
            None,
            Some(endpoint.clone()),
        ),
    };

    ApiChangeItem::new(
        endpoint.path.clone(),
        &endpoint.method,
        change_type,
        ChangeDetails::Structured(StructuredDetails {
            reason,
            modifications: vec![Modification {
                kind,
                target: endpoint.path.clone(),
                breaking: change_type == ChangeType::Removed,
                before: None,
                after: None,
            }],
            before,
            after,
            possible_rename_of: rename_of,
        }),
    )
}

/// Compare a matched endpoint pair; `None` when nothing changed
fn compare(old: &EndpointSpec, new: &EndpointSpec) -> Option<ApiChangeItem> {
    let mut modifications = Vec::new();

    for before in &old.parameters {
        match new.parameter(&before.name) {
            None => modifications.push(modification(
                ModificationKind::ParameterRemoved,
                &before.name,
                true,
                before.param_type.clone(),
                None,
            )),
            Some(after) => compare_parameter(before, after, &mut modifications),
        }
    }
    for after in &new.parameters {
        if old.parameter(&after.name).is_none() {
            modifications.push(modification(
                ModificationKind::ParameterAdded,
                &after.name,
                after.is_mandatory(),
                None,
                after.param_type.clone(),
            ));
        }
    }

    match (&old.response_type, &new.response_type) {
        (Some(a), Some(b)) if a != b => modifications.push(modification(
            ModificationKind::ResponseTypeChanged,
            "response",
            true,
            Some(a.clone()),
            Some(b.clone()),
        )),
        (Some(a), None) => modifications.push(modification(
            ModificationKind::ResponseTypeRemoved,
            "response",
            true,
            Some(a.clone()),
            None,
        )),
        (None, Some(b)) => modifications.push(modification(
            ModificationKind::ResponseTypeAdded,
            "response",
            false,
            None,
            Some(b.clone()),
        )),
        _ => {}
    }

    if modifications.is_empty() {
        return None;
    }

    let change_type = if modifications.iter().any(|m| m.breaking) {
        ChangeType::Breaking
    } else if modifications
        .iter()
        .all(|m| m.kind == ModificationKind::ParameterAdded)
    {
        ChangeType::Added
    } else {
        ChangeType::Modified
    };

    let reason = modifications
        .iter()
        .map(describe)
        .collect::<Vec<_>>()
        .join("; ");

    Some(ApiChangeItem::new(
        new.path.clone(),
        &new.method,
        change_type,
        ChangeDetails::Structured(StructuredDetails {
            reason,
            modifications,
            before: Some(old.clone()),
            after: Some(new.clone()),
            possible_rename_of: None,
        }),
    ))
}

fn compare_parameter(before: &ParameterSpec, after: &ParameterSpec, out: &mut Vec<Modification>) {
    if let (Some(a), Some(b)) = (&before.param_type, &after.param_type) {
        if !a.eq_ignore_ascii_case(b) {
            out.push(modification(
                ModificationKind::ParameterTypeChanged,
                &after.name,
                true,
                Some(a.clone()),
                Some(b.clone()),
            ));
        }
    }
    if !before.required && after.required {
        out.push(modification(
            ModificationKind::ParameterBecameRequired,
            &after.name,
            after.is_mandatory(),
            None,
            None,
        ));
    } else if before.required && !after.required {
        out.push(modification(
            ModificationKind::ParameterBecameOptional,
            &after.name,
            false,
            None,
            None,
        ));
    }
}

fn modification(
    kind: ModificationKind,
    target: &str,
    breaking: bool,
    before: Option<String>,
    after: Option<String>,
) -> Modification {
    Modification {
        kind,
        target: target.to_string(),
        breaking,
        before,
        after,
    }
}

fn describe(m: &Modification) -> String {
    let before = m.before.as_deref().unwrap_or("unspecified");
    let after = m.after.as_deref().unwrap_or("unspecified");
    match m.kind {
        ModificationKind::ParameterAdded if m.breaking => format!("Required parameter {} added", m.target),
        ModificationKind::ParameterAdded => format!("Optional parameter {} added", m.target),
        ModificationKind::ParameterRemoved => format!("Parameter {} removed", m.target),
        ModificationKind::ParameterTypeChanged => {
            format!("Parameter {} type changed from {} to {}", m.target, before, after)
        }
        ModificationKind::ParameterBecameRequired => format!("Parameter {} became required", m.target),
        ModificationKind::ParameterBecameOptional => format!("Parameter {} became optional", m.target),
        ModificationKind::ResponseTypeChanged => format!("Response type changed from {} to {}", before, after),
        ModificationKind::ResponseTypeRemoved => format!("Response type {} removed", before),
        ModificationKind::ResponseTypeAdded => format!("Response type {} added", after),
        ModificationKind::EndpointAdded => "Endpoint added".to_string(),
        ModificationKind::EndpointRemoved => "Endpoint removed".to_string(),
    }
}

/// Jaccard similarity of the parameter-name sets; 0 when both are empty
pub fn parameter_similarity(a: &EndpointSpec, b: &EndpointSpec) -> f64 {
    let left: BTreeSet<&str> = a.parameters.iter().map(|p| p.name.as_str()).collect();
    let right: BTreeSet<&str> = b.parameters.iter().map(|p| p.name.as_str()).collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

/// Pair each added endpoint with the most similar removed one of the same
/// method; a removed endpoint is paired at most once
fn pair_renames(removed: &[&EndpointSpec], added: &[&EndpointSpec]) -> BTreeMap<EndpointKey, String> {
    let mut taken: BTreeSet<EndpointKey> = BTreeSet::new();
    let mut renames = BTreeMap::new();

    for new in added {
        let best = removed
            .iter()
            .filter(|old| old.key().method == new.key().method && !taken.contains(&old.key()))
            .map(|old| (parameter_similarity(old, new), *old))
            .filter(|(score, _)| *score >= RENAME_SIMILARITY)
            .fold(None::<(f64, &EndpointSpec)>, |best, candidate| match best {
                Some(current) if current.0 >= candidate.0 => Some(current),
                _ => Some(candidate),
            });

        if let Some((score, old)) = best {
            debug!(from = %old.path, to = %new.path, score, "Paired likely endpoint rename");
            taken.insert(old.key());
            renames.insert(new.key(), old.path.clone());
        }
    }
    renames
}
