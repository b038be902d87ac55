//! CLI handlers for `diet plan` subcommands.
//!
//! Implements:
//! - `diet plan generate`   -- generate the current, upcoming or a given week
//! - `diet plan show`       -- print a week as a day-by-meal table
//! - `diet plan list`       -- list stored weeks
//! - `diet plan replace`    -- put a food in one slot by hand
//! - `diet plan leftover`   -- mark the next day's meal as leftovers
//! - `diet plan groceries`  -- ingredients needed for a week

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;

use diet_core::calendar::{SystemClock, WeekId};
use diet_core::store::PgStore;
use diet_core::PlanService;
use diet_db::models::{MealKind, MealSlot, WeekPlan};
use diet_db::queries::plans as plan_queries;

use crate::catalog_cmds::parse_id;
use crate::{PlanCommands, WeekArgs};

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Build the plan service used by the CLI and the HTTP server.
pub fn plan_service(pool: &PgPool) -> PlanService {
    let store = Arc::new(PgStore::new(pool.clone()));
    PlanService::new(store.clone(), store, Arc::new(SystemClock))
}

pub async fn run_plan_command(command: PlanCommands, pool: &PgPool) -> Result<()> {
    let service = plan_service(pool);
    match command {
        PlanCommands::Generate { week } => {
            let week = resolve_week(&service, &week)?;
            let plan = service.generate_plan(week).await?;
            println!("Plan generated for {}.", week.label());
            println!();
            print_plan(week, &plan);
        }
        PlanCommands::Show { week } => {
            let week = resolve_week(&service, &week)?;
            let plan = service.get_plan(week).await?;
            print_plan(week, &plan);
        }
        PlanCommands::List => cmd_list(pool).await?,
        PlanCommands::Replace {
            day,
            meal,
            food,
            week,
        } => {
            let week = resolve_week(&service, &week)?;
            let food_id = parse_id(&food, "food")?;
            let slot = service.replace_meal_slot(week, day, meal, food_id).await?;
            println!(
                "{} {} in {} is now {}.",
                day_name(slot.day_of_week),
                slot.meal_kind,
                week.label(),
                slot.food_name
            );
        }
        PlanCommands::Leftover {
            day,
            meal,
            off,
            week,
        } => {
            let week = resolve_week(&service, &week)?;
            let target = service.toggle_leftover(week, day, meal, !off).await?;
            let verb = if target.is_leftover {
                "serves leftovers:"
            } else {
                "serves"
            };
            println!(
                "{} {} {} {}.",
                day_name(target.day_of_week),
                target.meal_kind,
                verb,
                target.food_name
            );
        }
        PlanCommands::Groceries { week } => {
            let week = resolve_week(&service, &week)?;
            let items = service.grocery_list(week).await?;
            println!("Groceries for {}:", week.label());
            if items.is_empty() {
                println!("  (nothing)");
            }
            for item in &items {
                println!("  - {}", item.name);
            }
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------

/// `--year/--week` if given, else upcoming with `--upcoming`, else current.
fn resolve_week(service: &PlanService, args: &WeekArgs) -> Result<WeekId> {
    match (args.year, args.week) {
        (Some(year), Some(week)) => WeekId::new(year, week)
            .with_context(|| format!("{year} has no ISO week {week}")),
        _ if args.upcoming => Ok(service.upcoming_week()),
        _ => Ok(service.current_week()),
    }
}

fn day_name(day: i32) -> &'static str {
    match day {
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        7 => "Sunday",
        _ => "?",
    }
}

fn cell(slot: Option<&MealSlot>) -> String {
    match slot {
        Some(s) if s.is_leftover => format!("{} (leftover)", s.food_name),
        Some(s) if s.manual_food_id.is_some() => format!("{} *", s.food_name),
        Some(s) => s.food_name.clone(),
        None => "-".to_string(),
    }
}

fn print_plan(week: WeekId, plan: &WeekPlan) {
    println!(
        "{}  ({} .. {})",
        week.label(),
        week.start_date().format("%a %Y-%m-%d"),
        week.end_date().format("%a %Y-%m-%d"),
    );
    println!();

    let rows: Vec<(i32, Vec<String>)> = (1..=7)
        .map(|day| {
            let cells = MealKind::ALL
                .iter()
                .map(|kind| cell(plan.slot(day, *kind)))
                .collect();
            (day, cells)
        })
        .collect();

    let day_w = 9;
    let mut widths = [9usize, 5, 6];
    for (_, cells) in &rows {
        for (w, c) in widths.iter_mut().zip(cells) {
            *w = (*w).max(c.len());
        }
    }
    let [b_w, l_w, d_w] = widths;

    println!(
        "{:<day_w$}  {:<b_w$}  {:<l_w$}  {:<d_w$}",
        "DAY", "BREAKFAST", "LUNCH", "DINNER"
    );
    for (day, cells) in &rows {
        println!(
            "{:<day_w$}  {:<b_w$}  {:<l_w$}  {:<d_w$}",
            day_name(*day),
            cells[0],
            cells[1],
            cells[2],
        );
    }
    println!();
    println!("* chosen by hand");
}

async fn cmd_list(pool: &PgPool) -> Result<()> {
    let plans = plan_queries::list_week_plans(pool).await?;
    if plans.is_empty() {
        println!("No plans yet. Use `diet plan generate` to create one.");
        return Ok(());
    }

    println!("{:<36}  {:<8}  {:<16}  CREATED", "ID", "WEEK", "DATES");
    for plan in &plans {
        let Some(week) = u32::try_from(plan.week_number)
            .ok()
            .and_then(|w| WeekId::new(plan.year, w))
        else {
            continue;
        };
        println!(
            "{:<36}  {:<8}  {:<16}  {}",
            plan.id,
            week.to_string(),
            format!(
                "{} .. {}",
                week.start_date().format("%m-%d"),
                week.end_date().format("%m-%d")
            ),
            plan.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}
