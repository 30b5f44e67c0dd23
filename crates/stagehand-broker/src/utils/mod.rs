/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Utility functions and structures for the Stagehand broker.
//!
//! Admin key management, first-startup bootstrap and shutdown cleanup.

use chrono::Utc;
use diesel::prelude::*;
use stagehand_models::schema::admin_role;
use stagehand_utils::config::Settings;
use stagehand_utils::logging::prelude::*;
use std::fs;
use std::path::Path;
use tokio::sync::oneshot;
use uuid::Uuid;

pub mod background_tasks;
pub mod pak;

/// Where a freshly generated admin PAK is written on first startup.
pub const ADMIN_KEY_PATH: &str = "/tmp/stagehand-keys/key.txt";

/// Handles the shutdown process for the broker.
///
/// Waits for the shutdown signal, then flushes telemetry and removes the admin key file.
pub async fn shutdown(shutdown_rx: oneshot::Receiver<()>) {
    let _ = shutdown_rx.await;
    info!("Shutdown signal received");
    stagehand_utils::telemetry::shutdown();
    let _ = fs::remove_file(ADMIN_KEY_PATH);
}

/// Represents an admin key in the database.
#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone)]
#[diesel(table_name = admin_role)]
pub struct AdminKey {
    pub id: Uuid,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub pak_hash: String,
}

/// Represents a new admin key to be inserted into the database.
#[derive(Insertable)]
#[diesel(table_name = admin_role)]
pub struct NewAdminKey {
    pub pak_hash: String,
}

/// Performs first-time startup operations: creates the admin key.
pub fn first_startup(
    conn: &mut PgConnection,
    config: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    upsert_admin(conn, config).map(|_| ())
}

/// Creates or replaces the admin key.
///
/// Uses `broker.pak_hash` from the configuration when set. Otherwise a new PAK
/// is generated and written to [`ADMIN_KEY_PATH`].
///
/// # Returns
///
/// Returns the new PAK when one was generated.
pub fn upsert_admin(
    conn: &mut PgConnection,
    config: &Settings,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let (pak_hash, generated) = match &config.broker.pak_hash {
        Some(hash) if !hash.is_empty() => {
            if !validate_pak_hash(hash) {
                return Err("Invalid PAK hash provided in configuration".into());
            }
            info!("Using admin PAK hash from configuration");
            (hash.clone(), None)
        }
        _ => {
            pak::create_pak_controller(Some(config))?;
            let (pak, hash) = pak::create_pak()?;

            info!("Writing admin PAK to {}", ADMIN_KEY_PATH);
            let key_path = Path::new(ADMIN_KEY_PATH);
            if let Some(parent) = key_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(key_path, &pak)?;

            (hash, Some(pak))
        }
    };

    let existing_admin_key = admin_role::table
        .select(admin_role::id)
        .first::<Uuid>(conn)
        .optional()?;

    match existing_admin_key {
        Some(id) => {
            diesel::update(admin_role::table.find(id))
                .set(admin_role::pak_hash.eq(&pak_hash))
                .execute(conn)?;
        }
        None => {
            diesel::insert_into(admin_role::table)
                .values(&NewAdminKey { pak_hash })
                .execute(conn)?;
        }
    }

    Ok(generated)
}

/// A stored PAK hash is a hex-encoded SHA-256 digest.
pub fn validate_pak_hash(hash: &str) -> bool {
    hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit())
}
