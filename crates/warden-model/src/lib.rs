// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
pub mod catalog;
pub mod sanitize;
mod mock;
mod provider;
mod types;
mod yaml_mock;

pub use catalog::{InputModality, ModelCatalogEntry};
pub use mock::{MockProvider, ScriptedMockProvider};
pub use provider::{ModelProvider, ResponseStream};
pub use types::*;
pub use yaml_mock::YamlMockProvider;

use warden_config::ModelConfig;

/// Construct a boxed [`ModelProvider`] for local testing and demos.
///
/// Only the `"mock"` provider id is handled here: a deterministic echo
/// provider, or a YAML-scripted one when `mock_responses_file` is set. Every
/// other provider id is served by an external inference gateway; this crate
/// only defines the consumer-side [`ModelProvider`] interface for it, and
/// the host application wires in a real implementation at the boundary.
pub fn from_config(cfg: &ModelConfig) -> anyhow::Result<Box<dyn ModelProvider>> {
    match cfg.provider.as_str() {
        "mock" => {
            if let Some(path) = &cfg.mock_responses_file {
                Ok(Box::new(YamlMockProvider::from_file(path)?))
            } else {
                Ok(Box::new(MockProvider))
            }
        }
        other => anyhow::bail!(
            "provider {other:?} is served by an external gateway; this crate only \
             defines the ModelProvider interface for it, not a network client"
        ),
    }
}
