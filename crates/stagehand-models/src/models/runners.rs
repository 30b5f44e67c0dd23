/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Runners Module
//!
//! A runner is a CI identity allowed to read deployment context and report
//! deployment status. It authenticates with its own PAK (the "service key"
//! stored as a CI secret); only the hash is persisted.
//!
//! - `name` must be non-empty and cannot exceed 255 characters.
//! - Inactive runners fail authentication.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Queryable,
    Selectable,
    Identifiable,
    AsChangeset,
    Debug,
    Clone,
    Serialize,
    Deserialize,
    Eq,
    PartialEq,
    ToSchema,
)]
#[diesel(table_name = crate::schema::runners)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Runner {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub description: Option<String>,
    #[serde(skip_serializing, skip_deserializing)]
    pub pak_hash: Option<String>,
    pub last_active_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Insertable, Debug, Clone, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = crate::schema::runners)]
pub struct NewRunner {
    pub name: String,
    pub description: Option<String>,
}

impl NewRunner {
    pub fn new(name: String, description: Option<String>) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Runner name cannot be empty".to_string());
        }

        if name.len() > 255 {
            return Err("Runner name cannot exceed 255 characters".to_string());
        }

        Ok(NewRunner { name, description })
    }
}
