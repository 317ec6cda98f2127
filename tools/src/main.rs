//! lens-runner: headless driver for the NestEgg purchase lens.
//!
//! Usage:
//!   lens-runner --db nestegg.db
//!   lens-runner --db nestegg.db --item "Iced latte" --category meals --price 4.50 --commit
//!   lens-runner --db nestegg.db --ipc-mode

mod offline;

use anyhow::{anyhow, Result};
use nestegg_core::{
    clock::SystemClock,
    config::EngineConfig,
    entitlement::{Gated, PackageRef, PurchaseOutcome, RestoreOutcome, SubscriptionState},
    event::SessionEvent,
    meal_plan::MealPlan,
    profile::{Household, PurchaseCategory},
    projection::{PurchaseImpact, PurchaseInput},
    session::Summary,
    store::SqliteProfileStore,
    Session,
};
use offline::{OfflineAdvisory, OfflineEntitlement};
use serde_json::{json, Value};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Onboard {
        household_size:  String,
        weekly_budget:   String,
        investing_level: String,
    },
    Reveal {
        item:     String,
        category: String,
        price:    f64,
    },
    ChooseSwap,
    CompleteLesson {
        lesson_id: String,
    },
    OpenMealPlanner,
    ToggleMeal {
        meal_id: String,
    },
    CommitMealPlan,
    Offerings,
    Purchase {
        package_id: String,
    },
    Restore,
    UpdateHousehold {
        household_size:  String,
        weekly_budget:   String,
        investing_level: String,
    },
    Export,
    Reset,
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    onboarded:         bool,
    subscription:      SubscriptionState,
    summary:           Option<Summary<'a>>,
    meal_plan:         &'a MealPlan,
    meal_plan_savings: f64,
}

#[derive(serde::Serialize)]
struct Reply<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    events: Vec<SessionEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    state:  UiState<'a>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let commit = args.iter().any(|a| a == "--commit");
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");

    if !ipc_mode {
        println!("NestEgg lens-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let config = EngineConfig::load(data_dir)?;
    let store = if db == ":memory:" {
        SqliteProfileStore::in_memory()?
    } else {
        SqliteProfileStore::open(db)?
    };
    store.migrate()?;

    let mut session = Session::new(
        config,
        Box::new(store),
        Box::new(OfflineAdvisory),
        Box::new(OfflineEntitlement),
        Arc::new(SystemClock),
    );
    let events = session.start().await?;
    for event in &events {
        log::info!("startup event: {event:?}");
    }

    if ipc_mode {
        run_ipc_loop(&mut session).await?;
    } else {
        if let Some(item) = arg_value(&args, "--item") {
            let category = arg_value(&args, "--category").unwrap_or("other");
            let price = arg_value(&args, "--price").ok_or_else(|| anyhow!("--item needs --price"))?;
            let input = PurchaseInput::parse(item, category, price)?;
            reveal_once(&mut session, &input, commit).await?;
        }
        print_summary(&session)?;
    }

    Ok(())
}

async fn run_ipc_loop(session: &mut Session) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let mut last_impact: Option<PurchaseImpact> = None;

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };
        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        match handle_command(session, &mut last_impact, cmd).await {
            Ok((events, result)) => {
                let reply = Reply { events, result, state: build_ui_state(session)? };
                writeln!(stdout, "{}", serde_json::to_string(&reply)?)?;
            }
            Err(e) => {
                log::warn!("ipc command failed: {e:#}");
                writeln!(stdout, "{}", json!({ "error": e.to_string() }))?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

async fn handle_command(
    session:     &mut Session,
    last_impact: &mut Option<PurchaseImpact>,
    cmd:         IpcCommand,
) -> Result<(Vec<SessionEvent>, Option<Value>)> {
    let outcome = match cmd {
        IpcCommand::GetState | IpcCommand::Quit => (Vec::new(), None),
        IpcCommand::Onboard { household_size, weekly_budget, investing_level } => {
            let household = parse_household(&household_size, &weekly_budget, &investing_level)?;
            (session.onboard(household).await?, None)
        }
        IpcCommand::UpdateHousehold { household_size, weekly_budget, investing_level } => {
            let household = parse_household(&household_size, &weekly_budget, &investing_level)?;
            (session.update_household(household)?, None)
        }
        IpcCommand::Reveal { item, category, price } => {
            let category: PurchaseCategory = category.parse()?;
            let input = PurchaseInput::new(&item, category, price)?;
            match session.reveal_impact(&input).await? {
                Gated::Allowed(impact) => {
                    let result = json!({ "impact": &impact });
                    *last_impact = Some(impact);
                    (Vec::new(), Some(result))
                }
                Gated::QuotaExceeded(signal) => {
                    *last_impact = None;
                    (Vec::new(), Some(json!({ "quota_exceeded": signal })))
                }
            }
        }
        IpcCommand::ChooseSwap => {
            let impact = last_impact
                .take()
                .ok_or_else(|| anyhow!("nothing revealed to choose from"))?;
            (session.choose_swap(&impact)?, None)
        }
        IpcCommand::CompleteLesson { lesson_id } => (session.complete_lesson(&lesson_id)?, None),
        IpcCommand::OpenMealPlanner => {
            let meals = serde_json::to_value(session.open_meal_planner())?;
            (Vec::new(), Some(json!({ "meals": meals })))
        }
        IpcCommand::ToggleMeal { meal_id } => match session.toggle_meal(&meal_id)? {
            Gated::Allowed(selected) => (Vec::new(), Some(json!({ "selected": selected }))),
            Gated::QuotaExceeded(signal) => (Vec::new(), Some(json!({ "quota_exceeded": signal }))),
        },
        IpcCommand::CommitMealPlan => (session.commit_meal_plan()?, None),
        IpcCommand::Offerings => {
            let packages = serde_json::to_value(session.offerings().await)?;
            (Vec::new(), Some(json!({ "packages": packages })))
        }
        IpcCommand::Purchase { package_id } => {
            let outcome = match session.purchase(&PackageRef(package_id)).await? {
                PurchaseOutcome::Upgraded => json!({ "purchase": "upgraded" }),
                PurchaseOutcome::NotCompleted => json!({ "purchase": "not_completed" }),
                PurchaseOutcome::Failed { reason } => json!({ "purchase": "failed", "reason": reason }),
            };
            (Vec::new(), Some(outcome))
        }
        IpcCommand::Restore => {
            let outcome = match session.restore().await? {
                RestoreOutcome::Restored => json!({ "restore": "restored" }),
                RestoreOutcome::NothingToRestore => json!({ "restore": "nothing_to_restore" }),
                RestoreOutcome::Failed { reason } => json!({ "restore": "failed", "reason": reason }),
            };
            (Vec::new(), Some(outcome))
        }
        IpcCommand::Export => {
            let profile: Value = serde_json::from_str(&session.export_json()?)?;
            (Vec::new(), Some(json!({ "profile": profile })))
        }
        IpcCommand::Reset => {
            *last_impact = None;
            (session.reset()?, None)
        }
    };
    Ok(outcome)
}

fn parse_household(size: &str, budget: &str, level: &str) -> Result<Household> {
    Ok(Household {
        household_size:  size.parse()?,
        weekly_budget:   budget.parse()?,
        investing_level: level.parse()?,
    })
}

fn build_ui_state(session: &Session) -> Result<UiState<'_>> {
    let summary = match session.profile() {
        Some(_) => Some(session.summary()?),
        None => None,
    };
    let meal_plan = session.meal_plan();
    Ok(UiState {
        onboarded: summary.is_some(),
        subscription: session.subscription_state(),
        summary,
        meal_plan,
        meal_plan_savings: meal_plan.estimated_savings(session.config().takeaway_cost_per_serving),
    })
}

async fn reveal_once(session: &mut Session, input: &PurchaseInput, commit: bool) -> Result<()> {
    if session.profile().is_none() {
        println!("  (no profile stored; onboard via --ipc-mode first)");
        return Ok(());
    }
    let impact = match session.reveal_impact(input).await? {
        Gated::Allowed(impact) => impact,
        Gated::QuotaExceeded(signal) => {
            println!(
                "  free limit of {} reached for {:?}; upgrade to keep going",
                signal.limit, signal.feature
            );
            return Ok(());
        }
    };

    let p = &impact.projection;
    println!("=== IMPACT: {} ({}) ===", input.item, input.category);
    println!("  weekly:          ${:.2}", p.weekly_cost);
    println!("  yearly:          ${:.2}", p.yearly_cost);
    println!("  5y if invested:  ${:.2}", p.five_year_invested);
    for swap in impact.swaps.suggestions() {
        println!("  swap: {} at ${:.2} saves ${:.2}/wk ({})", swap.name, swap.price, swap.savings, swap.reason);
    }
    if impact.swaps.is_fallback() {
        println!("  (advisory offline; showing estimated swaps)");
    }
    println!();

    if commit {
        for event in session.choose_swap(&impact)? {
            log::info!("commit event: {event:?}");
        }
    }
    Ok(())
}

fn print_summary(session: &Session) -> Result<()> {
    if session.profile().is_none() {
        println!("=== NO PROFILE ===");
        return Ok(());
    }
    let summary = session.summary()?;

    println!("=== SUMMARY ===");
    println!("  tier:           {}", if summary.is_plus { "Plus" } else { "Free" });
    println!("  total saved:    ${:.2}", summary.total_saved);
    println!("  this week:      ${:.2}", summary.this_week_savings);
    println!("  actions:        {}", summary.actions_count);

    if !summary.recent.is_empty() {
        println!();
        println!("=== RECENT DECISIONS ===");
        for d in &summary.recent {
            println!("  {} | {} | +${:.2}", d.date.format("%Y-%m-%d"), d.item, d.savings);
        }
    }

    if let Some(next) = &summary.next_lesson {
        println!();
        if next.locked {
            println!(
                "  next lesson: {} (locked, {} more actions, {:.0}%)",
                next.lesson.title, next.remaining_actions, next.progress_percent
            );
        } else {
            println!("  next lesson: {} ({}) ready", next.lesson.title, next.lesson.duration);
        }
    }
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
