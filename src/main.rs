use anyhow::{anyhow, bail, Context, Result};
use meal_patch::config::EngineConfig;
use meal_patch::db;
use meal_patch::interpreter::{
    authored_edits, candidate_edits, EditHint, InterpretationRequest, InterpretationResponse,
    InterpreterClient,
};
use meal_patch::patch::{CoverageHint, PatchSet};
use meal_patch::plan::{MealPlan, PlanState};
use meal_patch::recipe::Recipe;
use meal_patch::snapshot::SnapshotStore;
use meal_patch::variant_store::SlotKey;
use serde::Deserialize;
use sqlx::PgPool;
use std::env;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage:
  meal-patch consolidate <plan.json>
  meal-patch modify <plan.json> <slot> <edits.json>
  meal-patch revert <plan.json> <slot>
  meal-patch show <plan.json>

Slots are written scope/YYYY-MM-DD/meal, e.g. household-7/2026-03-02/dinner.";

/// Contents of an edits file: structured operations, interpretation hints,
/// or just the free-text request to send to the interpretation service
#[derive(Debug, Default, Deserialize)]
struct EditRequest {
    #[serde(default)]
    text: String,
    #[serde(default)]
    hints: Vec<EditHint>,
    #[serde(default)]
    operations: Option<Vec<serde_json::Value>>,
}

enum Command {
    Consolidate { plan: String },
    Modify { plan: String, slot: SlotKey, edits: String },
    Revert { plan: String, slot: SlotKey },
    Show { plan: String },
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let command = match args.as_slice() {
            ["consolidate", plan] => Command::Consolidate {
                plan: plan.to_string(),
            },
            ["modify", plan, slot, edits] => Command::Modify {
                plan: plan.to_string(),
                slot: slot.parse()?,
                edits: edits.to_string(),
            },
            ["revert", plan, slot] => Command::Revert {
                plan: plan.to_string(),
                slot: slot.parse()?,
            },
            ["show", plan] => Command::Show {
                plan: plan.to_string(),
            },
            _ => bail!("{}", USAGE),
        };
        Ok(command)
    }
}

fn read_plan(path: &str) -> Result<MealPlan> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read plan file {}", path))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid plan file {}", path))
}

fn read_edits(path: &str) -> Result<EditRequest> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read edits file {}", path))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid edits file {}", path))
}

/// Save the snapshot, and the database copy when one is configured
async fn persist(config: &EngineConfig, snapshots: &SnapshotStore, state: &PlanState) -> Result<()> {
    snapshots.save(state)?;

    if let Some(database_url) = &config.database_url {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        db::init_database_schema(&pool).await?;
        db::save_plan_state(&pool, state).await?;
    }
    Ok(())
}

fn print_state(plan: &MealPlan, state: &PlanState) {
    for planned in &plan.slots {
        println!("[{}]", planned.slot);
        print!("{}", state.effective_recipe(&planned.slot, &planned.recipe).as_recipe());
        println!();
    }
    match &state.grocery {
        Some(list) => print!("{}", list),
        None => println!("No grocery list yet, run `meal-patch consolidate` first."),
    }
}

/// Turn an edits file into a candidate patch set and its coverage hints
async fn interpret(
    config: &EngineConfig,
    request: EditRequest,
    current: &Recipe,
) -> Result<(PatchSet, Vec<CoverageHint>)> {
    let has_structured_edits = !request.hints.is_empty()
        || request.operations.as_ref().is_some_and(|ops| !ops.is_empty());

    let edits = if has_structured_edits {
        let response = InterpretationResponse {
            hints: request.hints,
            operations: request.operations,
        };
        authored_edits(response, &request.text)?
    } else if !request.text.trim().is_empty() {
        let client = InterpreterClient::new(&config.interpreter)?;
        let response = client
            .interpret(&InterpretationRequest::for_recipe(&request.text, current))
            .await?;
        candidate_edits(response, &request.text)?
    } else {
        bail!("Edits file contains no operations, hints or text");
    };
    Ok(edits)
}

async fn run(command: Command, config: &EngineConfig) -> Result<()> {
    let snapshots = SnapshotStore::new(&config.state_dir);

    match command {
        Command::Consolidate { plan } => {
            let plan = read_plan(&plan)?;
            let state = snapshots.load_or_new(&plan.scope)?;
            let next = state.consolidate(&plan.slots)?;
            persist(config, &snapshots, &next).await?;
            print_state(&plan, &next);
        }
        Command::Modify { plan, slot, edits } => {
            let plan = read_plan(&plan)?;
            let base = plan
                .base_recipe(&slot)
                .ok_or_else(|| anyhow!("Slot {} is not in the plan", slot))?;
            let state = snapshots.load_or_new(&plan.scope)?;

            let current = state.effective_recipe(&slot, base);
            let (patch, coverage) = interpret(config, read_edits(&edits)?, &current).await?;

            let next = state.modify_slot(&slot, base, patch, &coverage)?;
            persist(config, &snapshots, &next).await?;
            info!(slot = %slot, "Recipe modification stored");
            print_state(&plan, &next);
        }
        Command::Revert { plan, slot } => {
            let plan = read_plan(&plan)?;
            let base = plan
                .base_recipe(&slot)
                .ok_or_else(|| anyhow!("Slot {} is not in the plan", slot))?;
            let state = snapshots.load_or_new(&plan.scope)?;
            let next = state.revert_slot(&slot, base)?;
            persist(config, &snapshots, &next).await?;
            print_state(&plan, &next);
        }
        Command::Show { plan } => {
            let plan = read_plan(&plan)?;
            let state = snapshots.load_or_new(&plan.scope)?;
            print_state(&plan, &state);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging; RUST_LOG filters, LOG_FORMAT=json switches format
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = EngineConfig::from_env()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    info!(state_dir = %config.state_dir.display(), "Starting meal-patch");
    run(command, &config).await
}
