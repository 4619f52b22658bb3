//! Purpose: Hold top-level CLI command dispatch for `bcp2pg`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Partial extract failures still print a summary; the first failure sets the exit code.
//! Invariants: Helpers in `main.rs` own stderr/stdout formatting.

use std::sync::Arc;

use bcp2pg::api::{Model, NoopObserver, RowReader, TableDescriptor, TracingObserver, open_table};

use super::*;
use crate::extract::{ExtractConfig, TableOutcome, extract_tables};
use crate::report_json::{outcome_json, row_json, table_info_json};

pub(super) fn dispatch_command(command: Command, color_mode: ColorMode) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "bcp2pg", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Tables { model, json } => {
            let model = Model::load(&model.model, model.base.as_deref())?;
            if json {
                let tables = model
                    .tables()
                    .iter()
                    .map(|table| table_info_json(table))
                    .collect::<Vec<_>>();
                emit_json(json!({ "tables": tables }));
            } else {
                let rows = model
                    .tables()
                    .iter()
                    .map(|table| {
                        vec![
                            table.qualified_name(),
                            table.columns.len().to_string(),
                            table.data_dir.display().to_string(),
                        ]
                    })
                    .collect::<Vec<_>>();
                println!("{}", render_table(&["TABLE", "COLUMNS", "DATA DIR"], &rows));
            }
            Ok(RunOutcome::ok())
        }
        Command::Rows {
            model,
            table,
            limit,
            debug,
        } => {
            let model = Model::load(&model.model, model.base.as_deref())?;
            let table = model.table(&table)?;
            if debug {
                let observer = TracingObserver::new(table.qualified_name());
                print_rows(&table, limit, observer)?;
            } else {
                print_rows(&table, limit, NoopObserver)?;
            }
            Ok(RunOutcome::ok())
        }
        Command::Extract(args) => {
            let model = Model::load(&args.model.model, args.model.base.as_deref())?;
            let mut names = args.tables.clone();
            if let Some(path) = &args.tables_file {
                names.extend(read_tables_file(path)?);
            }
            let tables = select_tables(&model, &names)?;
            let config = ExtractConfig {
                output_dir: args.output.clone(),
                limit: (args.limit > 0).then_some(args.limit),
                workers: usize::try_from(args.workers).unwrap_or(usize::MAX),
                debug: args.debug,
            };

            let outcomes = extract_tables(tables, &config)?;
            for outcome in &outcomes {
                if let Some(err) = &outcome.error {
                    emit_table_failed(&outcome.table, err, color_mode);
                }
            }
            emit_extract_summary(&outcomes, args.json);

            let exit_code = outcomes
                .iter()
                .find_map(|outcome| outcome.error.as_ref())
                .map(|err| to_exit_code(err.kind()))
                .unwrap_or(0);
            Ok(RunOutcome::with_code(exit_code))
        }
    }
}

/// Resolves requested names in order, dropping repeats; no names means every table.
fn select_tables(model: &Model, names: &[String]) -> Result<Vec<Arc<TableDescriptor>>, Error> {
    if names.is_empty() {
        return Ok(model.tables().to_vec());
    }
    let mut selected: Vec<Arc<TableDescriptor>> = Vec::new();
    for name in names {
        let table = model.table(name)?;
        if !selected.iter().any(|seen| Arc::ptr_eq(seen, &table)) {
            selected.push(table);
        }
    }
    Ok(selected)
}

fn print_rows<O: bcp2pg::api::DecodeObserver>(
    table: &Arc<TableDescriptor>,
    limit: Option<u64>,
    observer: O,
) -> Result<(), Error> {
    let source = open_table(table)?;
    let mut reader = RowReader::with_observer(Arc::clone(table), source, observer)?;
    let mut printed = 0u64;
    while limit.is_none_or(|limit| printed < limit) {
        match reader.next_row()? {
            Some(row) => {
                emit_json_line(&row_json(&row));
                printed += 1;
            }
            None => break,
        }
    }
    Ok(())
}

fn emit_extract_summary(outcomes: &[TableOutcome], json: bool) {
    if json {
        let tables = outcomes.iter().map(outcome_json).collect::<Vec<_>>();
        let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
        emit_json(json!({
            "tables": tables,
            "failed": failed,
        }));
        return;
    }

    let rows = outcomes
        .iter()
        .map(|outcome| {
            vec![
                outcome.table.clone(),
                outcome.rows.to_string(),
                outcome.status().to_string(),
                outcome.path.display().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    println!(
        "{}",
        render_table(&["TABLE", "ROWS", "STATUS", "PATH"], &rows)
    );
}
