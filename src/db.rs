//! # Persistence
//!
//! PostgreSQL storage for recipe variants and grocery lists. Both are stored
//! whole as JSON documents keyed by slot and by scope. Writing a plan state
//! replaces everything stored for its scope in one transaction, so a recipe
//! swap is never persisted half done. Concurrent writers of one scope follow
//! last-write-wins.

use crate::grocery::GroceryList;
use crate::plan::PlanState;
use crate::variant_store::{RecipeVariant, SlotKey, VariantStore};
use anyhow::{Context, Result};
use sqlx::{PgExecutor, PgPool, Row};
use tracing::{debug, info};

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipe_variants (
            slot_key TEXT PRIMARY KEY,
            scope TEXT NOT NULL,
            variant_json TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create recipe_variants table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS recipe_variants_scope_idx ON recipe_variants (scope)")
        .execute(pool)
        .await
        .context("Failed to create recipe_variants scope index")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS grocery_lists (
            scope TEXT PRIMARY KEY,
            list_json TEXT NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create grocery_lists table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

async fn upsert_variant<'e>(executor: impl PgExecutor<'e>, variant: &RecipeVariant) -> Result<()> {
    let json = serde_json::to_string(variant).context("Failed to serialize recipe variant")?;
    sqlx::query(
        "INSERT INTO recipe_variants (slot_key, scope, variant_json, created_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (slot_key) DO UPDATE
         SET scope = EXCLUDED.scope,
             variant_json = EXCLUDED.variant_json,
             created_at = EXCLUDED.created_at,
             updated_at = NOW()",
    )
    .bind(variant.slot.to_string())
    .bind(&variant.slot.scope)
    .bind(json)
    .bind(variant.created_at)
    .execute(executor)
    .await
    .with_context(|| format!("Failed to save variant for slot {}", variant.slot))?;
    Ok(())
}

async fn upsert_grocery_list<'e>(executor: impl PgExecutor<'e>, list: &GroceryList) -> Result<()> {
    let json = serde_json::to_string(list).context("Failed to serialize grocery list")?;
    sqlx::query(
        "INSERT INTO grocery_lists (scope, list_json)
         VALUES ($1, $2)
         ON CONFLICT (scope) DO UPDATE
         SET list_json = EXCLUDED.list_json,
             updated_at = NOW()",
    )
    .bind(&list.scope)
    .bind(json)
    .execute(executor)
    .await
    .with_context(|| format!("Failed to save grocery list for scope {}", list.scope))?;
    Ok(())
}

/// Create or overwrite the variant of one slot
pub async fn save_variant(pool: &PgPool, variant: &RecipeVariant) -> Result<()> {
    debug!(slot = %variant.slot, "Saving recipe variant");
    upsert_variant(pool, variant).await
}

/// Read the variant of one slot
pub async fn read_variant(pool: &PgPool, slot: &SlotKey) -> Result<Option<RecipeVariant>> {
    let row = sqlx::query("SELECT variant_json FROM recipe_variants WHERE slot_key = $1")
        .bind(slot.to_string())
        .fetch_optional(pool)
        .await
        .context("Failed to read recipe variant")?;

    match row {
        Some(row) => {
            let json: String = row.get("variant_json");
            let variant = serde_json::from_str(&json)
                .with_context(|| format!("Corrupt variant stored for slot {}", slot))?;
            Ok(Some(variant))
        }
        None => {
            debug!(slot = %slot, "No recipe variant stored");
            Ok(None)
        }
    }
}

/// Delete the variant of one slot; returns whether one existed
pub async fn delete_variant(pool: &PgPool, slot: &SlotKey) -> Result<bool> {
    let result = sqlx::query("DELETE FROM recipe_variants WHERE slot_key = $1")
        .bind(slot.to_string())
        .execute(pool)
        .await
        .context("Failed to delete recipe variant")?;
    Ok(result.rows_affected() > 0)
}

/// Every variant stored for a scope, ordered by slot key
pub async fn list_variants(pool: &PgPool, scope: &str) -> Result<Vec<RecipeVariant>> {
    let rows = sqlx::query("SELECT slot_key, variant_json FROM recipe_variants WHERE scope = $1 ORDER BY slot_key")
        .bind(scope)
        .fetch_all(pool)
        .await
        .context("Failed to list recipe variants")?;

    rows.iter()
        .map(|row| {
            let slot: String = row.get("slot_key");
            let json: String = row.get("variant_json");
            serde_json::from_str(&json).with_context(|| format!("Corrupt variant stored for slot {}", slot))
        })
        .collect()
}

/// Create or overwrite the grocery list of a scope
pub async fn save_grocery_list(pool: &PgPool, list: &GroceryList) -> Result<()> {
    debug!(scope = %list.scope, items = list.len(), "Saving grocery list");
    upsert_grocery_list(pool, list).await
}

/// Read the grocery list of a scope
pub async fn read_grocery_list(pool: &PgPool, scope: &str) -> Result<Option<GroceryList>> {
    let row = sqlx::query("SELECT list_json FROM grocery_lists WHERE scope = $1")
        .bind(scope)
        .fetch_optional(pool)
        .await
        .context("Failed to read grocery list")?;

    row.map(|row| {
        let json: String = row.get("list_json");
        serde_json::from_str(&json).with_context(|| format!("Corrupt grocery list stored for scope {}", scope))
    })
    .transpose()
}

/// Replace everything stored for the state's scope in one transaction
pub async fn save_plan_state(pool: &PgPool, state: &PlanState) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM recipe_variants WHERE scope = $1")
        .bind(&state.scope)
        .execute(&mut *tx)
        .await
        .context("Failed to clear stored variants")?;

    for variant in state.variants.variants() {
        upsert_variant(&mut *tx, variant).await?;
    }

    match &state.grocery {
        Some(list) => upsert_grocery_list(&mut *tx, list).await?,
        None => {
            sqlx::query("DELETE FROM grocery_lists WHERE scope = $1")
                .bind(&state.scope)
                .execute(&mut *tx)
                .await
                .context("Failed to clear stored grocery list")?;
        }
    }

    tx.commit().await.context("Failed to commit plan state")?;
    info!(
        scope = %state.scope,
        variants = state.variants.len(),
        "Plan state saved"
    );
    Ok(())
}

/// Load everything stored for a scope; an unknown scope yields an empty state
pub async fn load_plan_state(pool: &PgPool, scope: &str) -> Result<PlanState> {
    let variants = list_variants(pool, scope).await?;
    let grocery = read_grocery_list(pool, scope).await?;
    Ok(PlanState {
        scope: scope.to_string(),
        variants: VariantStore::restore(variants),
        grocery,
    })
}
