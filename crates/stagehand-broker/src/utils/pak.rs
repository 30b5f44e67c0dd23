/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Prefixed API Key (PAK) generation and verification.
//!
//! The controller is built once from [`Settings`] and shared process-wide.

use once_cell::sync::OnceCell;
use prefixed_api_key::{PrefixedApiKey, PrefixedApiKeyController};
use rand::rngs::OsRng;
use sha2::Sha256;
use stagehand_utils::logging::prelude::*;
use stagehand_utils::Settings;
use std::sync::Arc;

static PAK_CONTROLLER: OnceCell<Arc<PrefixedApiKeyController<OsRng, Sha256>>> = OnceCell::new();

/// Returns the shared PAK controller, building it from `config` on first use.
///
/// # Errors
///
/// Fails when the controller has not been initialized yet and no config is given,
/// or when the configured PAK settings are invalid.
pub fn create_pak_controller(
    config: Option<&Settings>,
) -> Result<Arc<PrefixedApiKeyController<OsRng, Sha256>>, String> {
    if let Some(controller) = PAK_CONTROLLER.get() {
        return Ok(controller.clone());
    }

    let cfg = config.ok_or("PAK_CONTROLLER not initialized and no config provided")?;
    let controller = PAK_CONTROLLER.get_or_try_init(|| {
        info!("Initializing PAK_CONTROLLER for the first time");
        build_controller(cfg).map(Arc::new)
    })?;
    Ok(controller.clone())
}

fn build_controller(config: &Settings) -> Result<PrefixedApiKeyController<OsRng, Sha256>, String> {
    let pak = &config.pak;
    PrefixedApiKeyController::configure()
        .prefix(pak.prefix.clone().unwrap_or_else(|| "stagehand".to_string()))
        .short_token_length(pak.short_token_length.unwrap_or(8))
        .short_token_prefix(pak.short_token_prefix.clone())
        .long_token_length(pak.long_token_length.unwrap_or(24))
        .rng_osrng()
        .digest_sha256()
        .finalize()
        .map_err(|e| format!("Failed to create PAK controller: {:?}", e))
}

/// Generates a new PAK and its hash using the shared controller.
pub fn create_pak() -> Result<(String, String), Box<dyn std::error::Error>> {
    let controller = create_pak_controller(None)?;
    controller
        .try_generate_key_and_hash()
        .map(|(pak, hash)| (pak.to_string(), hash))
        .map_err(|e| format!("Failed to generate PAK: {:?}", e).into())
}

/// Checks a PAK against a stored hash. Malformed keys never match.
pub fn verify_pak(pak: &str, stored_hash: &str) -> bool {
    let Ok(controller) = create_pak_controller(None) else {
        error!("PAK verification attempted before the controller was initialized");
        return false;
    };

    match PrefixedApiKey::from_string(pak) {
        Ok(key) => controller.check_hash(&key, stored_hash),
        Err(_) => false,
    }
}

/// Hash that would be stored for `pak`, if it is well formed.
pub fn generate_pak_hash(pak: &str) -> Option<String> {
    let controller = create_pak_controller(None).ok()?;
    PrefixedApiKey::from_string(pak)
        .ok()
        .map(|key| controller.long_token_hashed(&key))
}
