// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pagination helpers for Kubernetes API list operations.
//!
//! Large clusters can have thousands of nodes; listing them in pages keeps
//! memory usage and API server load bounded. Each page is retried on its own,
//! so a transient error late in a listing does not restart it from scratch.

use crate::constants::KUBE_LIST_PAGE_SIZE;
use crate::reconcilers::retry::retry_api_call;
use kube::api::{ListParams, ObjectList};
use kube::{Api, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// List all resources with automatic pagination.
///
/// # Example
///
/// ```no_run
/// use k8s_openapi::api::core::v1::Node;
/// use kube::{Api, Client, api::ListParams};
/// use dbfence::reconcilers::pagination::list_all_paginated;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = Client::try_default().await?;
/// let api: Api<Node> = Api::all(client);
///
/// let nodes = list_all_paginated(&api, ListParams::default().labels("pool=workers")).await?;
/// println!("Found {} nodes", nodes.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the last Kubernetes error once a page cannot be fetched.
pub async fn list_all_paginated<K>(
    api: &Api<K>,
    mut list_params: ListParams,
) -> Result<Vec<K>, kube::Error>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    list_params.limit = Some(KUBE_LIST_PAGE_SIZE);

    let mut all_items = Vec::new();
    let mut page_count = 0;

    loop {
        page_count += 1;
        let result = retry_api_call(|| api.list(&list_params), "list page").await?;

        let item_count = result.items.len();
        let next_token = continue_token(&result);
        all_items.extend(result.items);

        debug!(
            page = page_count,
            items_in_page = item_count,
            total_items = all_items.len(),
            "Fetched page from Kubernetes API"
        );

        match next_token {
            Some(token) => list_params.continue_token = Some(token),
            None => break,
        }
    }

    debug!(
        total_pages = page_count,
        total_items = all_items.len(),
        "Completed paginated list operation"
    );

    Ok(all_items)
}

/// Continue token of a page, if more pages follow.
///
/// The API server may send an empty string instead of omitting the field.
pub(crate) fn continue_token<K: Clone>(page: &ObjectList<K>) -> Option<String> {
    page.metadata
        .continue_
        .as_ref()
        .filter(|token| !token.is_empty())
        .cloned()
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod pagination_tests;
