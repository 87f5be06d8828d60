//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - dispatches to the command handlers
//! - prints reports or JSON

use clap::Parser;
use serde::Serialize;

use crate::cli::{
    Command, CreateSetArgs, DeleteSeriesArgs, DeleteSetArgs, EvaluateArgs, FitArgs, PointsArgs, SaveArgs,
    ShowArgs, UpdateSetArgs,
};
use crate::domain::Units;
use crate::duty::evaluate_batch;
use crate::error::AppError;
use crate::io::{SeriesFile, load_store, save_store, write_series_json};
use crate::models::{DEFAULT_SAMPLES, sample_curve};

pub mod pipeline;

/// Entry point for the `pumpcurve` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is the normal case.
    let _ = dotenvy::dotenv();
    let cli = crate::cli::Cli::parse();
    crate::logging::init(&cli.log_level);

    match cli.command {
        Command::Validate(args) => handle_validate(args),
        Command::Fit(args) => handle_fit(args),
        Command::CreateSet(args) => handle_create_set(args),
        Command::UpdateSet(args) => handle_update_set(args),
        Command::DeleteSet(args) => handle_delete_set(args),
        Command::Save(args) => handle_save(args),
        Command::Evaluate(args) => handle_evaluate(args),
        Command::Show(args) => handle_show(args),
        Command::DeleteSeries(args) => handle_delete_series(args),
    }
}

fn handle_validate(args: PointsArgs) -> Result<(), AppError> {
    let result = pipeline::run_validate(&args)?;

    if args.json {
        print_json(&result)?;
    } else {
        println!("{}", crate::report::format_validation(args.series_type, &result));
    }

    if result.is_accepted() {
        Ok(())
    } else {
        Err(AppError::new(
            3,
            format!("Point set rejected: {} blocking error(s).", result.blocking_errors.len()),
        ))
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let run = pipeline::run_fit(&args.points)?;

    if args.points.json {
        match args.samples {
            Some(n) => print_json(&SeriesFile::new(&run.series, &Units::default(), n)?)?,
            None => print_json(&run.series)?,
        }
    } else {
        println!(
            "{}",
            crate::report::format_fit_summary(
                run.prepared.series_type,
                &run.prepared.model,
                &run.residuals,
                &run.prepared.warnings,
                &Units::default(),
            )
        );
        if let Some(n) = args.samples {
            let grid = sample_curve(&run.series, n)?;
            println!("{}", crate::report::format_grid(&grid));
        }
    }

    if let Some(path) = &args.export {
        let samples = args.samples.unwrap_or(DEFAULT_SAMPLES);
        write_series_json(path, &run.series, &Units::default(), samples)?;
    }

    Ok(())
}

fn handle_create_set(args: CreateSetArgs) -> Result<(), AppError> {
    let store = load_store(&args.store)?;
    let units = Units {
        flow: args.flow_unit,
        head: args.head_unit,
        efficiency: args.efficiency_unit,
        power: args.power_unit,
    };
    let set = store.create_curve_set(args.pump_id, args.name, units);
    save_store(&args.store, &store)?;

    println!("Created curve set #{} '{}' for pump {}", set.id, set.name, set.pump_id);
    Ok(())
}

fn handle_update_set(args: UpdateSetArgs) -> Result<(), AppError> {
    let store = load_store(&args.store)?;
    let current = store.curve_set(args.curve_set)?;
    let units = args.merged_units(&current.units);
    let set = store.update_curve_set(args.curve_set, args.name, units)?;
    save_store(&args.store, &store)?;

    print!("{}", crate::report::format_curve_set(&set));
    Ok(())
}

fn handle_delete_set(args: DeleteSetArgs) -> Result<(), AppError> {
    let store = load_store(&args.store)?;
    let removed = store.delete_curve_set(args.curve_set)?;
    save_store(&args.store, &store)?;

    println!(
        "Deleted curve set #{} '{}' ({} series)",
        removed.id,
        removed.name,
        removed.series.len()
    );
    Ok(())
}

fn handle_save(args: SaveArgs) -> Result<(), AppError> {
    let config = args.points.engine.to_config();
    let ingest = pipeline::read_points(&args.points)?;

    let store = load_store(&args.store)?;
    let series = store.save_series(args.curve_set, args.points.series_type, &ingest.points, &config)?;
    save_store(&args.store, &store)?;

    if args.points.json {
        print_json(&series)?;
    } else {
        let set = store.curve_set(args.curve_set)?;
        println!("Saved {}", crate::report::format_series_line(&series, &set.units));
        print!("{}", crate::report::format_issues("Warnings", &series.validation_warnings));
    }
    Ok(())
}

fn handle_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let config = args.engine.to_config();
    config.check()?;

    let store = load_store(&args.store)?;
    let series = store.series(args.series_id)?;
    let results = evaluate_batch(&series, &args.flows, args.target, &config)?;

    if args.json {
        // A single duty point prints a single object.
        match results.as_slice() {
            [one] => print_json(one)?,
            many => print_json(&many)?,
        }
    } else {
        println!("{}", crate::report::format_evaluations(series.series_type, &results));
    }
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let store = load_store(&args.store)?;
    let sets = match args.curve_set {
        Some(id) => vec![store.curve_set(id)?],
        None => store.curve_sets(),
    };

    if args.json {
        print_json(&sets)?;
    } else if sets.is_empty() {
        println!("(no curve sets)");
    } else {
        for set in &sets {
            println!("{}", crate::report::format_curve_set(set));
        }
    }
    Ok(())
}

fn handle_delete_series(args: DeleteSeriesArgs) -> Result<(), AppError> {
    let store = load_store(&args.store)?;
    let removed = store.delete_series(args.series_id)?;
    save_store(&args.store, &store)?;

    println!(
        "Deleted {} series #{} from curve set #{}",
        removed.series_type, removed.id, removed.curve_set_id
    );
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::new(2, format!("Failed to serialize JSON: {e}")))?;
    println!("{text}");
    Ok(())
}
