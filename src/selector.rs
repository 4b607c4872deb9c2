// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label selector rendering for node listing.
//!
//! The `Database` node selector is stored in its structured form
//! (`matchLabels` + `matchExpressions`) and rendered to the string syntax the
//! Kubernetes API server accepts in `ListParams::labels`:
//!
//! | Selector | Rendered |
//! |----------|----------|
//! | `matchLabels: {pool: workers}` | `pool=workers` |
//! | `{key: zone, operator: In, values: [a, b]}` | `zone in (a,b)` |
//! | `{key: zone, operator: NotIn, values: [c]}` | `zone notin (c)` |
//! | `{key: gpu, operator: Exists}` | `gpu` |
//! | `{key: spot, operator: DoesNotExist}` | `!spot` |
//!
//! All requirements are joined with `,` (logical AND).

use crate::crd::{LabelSelector, LabelSelectorRequirement};
use crate::errors::AllowlistError;

/// Render a selector to the Kubernetes list-parameter syntax.
///
/// Returns `None` when the selector is absent or empty, which selects every node.
///
/// # Errors
///
/// Returns [`AllowlistError::InvalidSelector`] for an unknown operator or an
/// `In`/`NotIn` requirement without values.
pub fn render_label_selector(
    selector: Option<&LabelSelector>,
) -> Result<Option<String>, AllowlistError> {
    let Some(selector) = selector else {
        return Ok(None);
    };

    let mut requirements: Vec<String> = selector
        .match_labels
        .iter()
        .flatten()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();

    for requirement in selector.match_expressions.iter().flatten() {
        requirements.push(render_requirement(requirement)?);
    }

    if requirements.is_empty() {
        Ok(None)
    } else {
        Ok(Some(requirements.join(",")))
    }
}

fn render_requirement(requirement: &LabelSelectorRequirement) -> Result<String, AllowlistError> {
    let key = &requirement.key;
    let values = requirement.values.as_deref().unwrap_or_default();

    let set_operator = match requirement.operator.as_str() {
        "Exists" => return Ok(key.clone()),
        "DoesNotExist" => return Ok(format!("!{key}")),
        "In" => "in",
        "NotIn" => "notin",
        other => {
            return Err(AllowlistError::InvalidSelector {
                reason: format!("unsupported operator '{other}' for key '{key}'"),
            })
        }
    };

    if values.is_empty() {
        return Err(AllowlistError::InvalidSelector {
            reason: format!(
                "operator '{}' for key '{key}' requires at least one value",
                requirement.operator
            ),
        });
    }

    Ok(format!("{key} {set_operator} ({})", values.join(",")))
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod selector_tests;
