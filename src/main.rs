mod cli;

use std::io::Read as _;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rusqlite::Connection;

use cli::{Cli, Command, DistanceAction};
use ttrack::config::Config;
use ttrack::model::{Category, NewTask, Task};
use ttrack::report::ReportRange;
use ttrack::view::{Row, ViewState};
use ttrack::{db, lifecycle, ops, output, paths, report, stats, timefmt, timer, view};

fn setup_logging() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("TTRACK_LOG", "warn"))
        .format_timestamp_secs()
        .init();
}

fn open_db(db_path: &Path) -> Result<Connection> {
    let conn = db::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    db::init(&conn)?;
    Ok(conn)
}

fn require_task(conn: &Connection, id: i64) -> Result<Task> {
    match ops::get_task_by_id(conn, id)? {
        Some(task) => Ok(task),
        None => bail!("task {id} not found"),
    }
}

fn main() {
    setup_logging();
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    let db_path = paths::db_path(cli.db.as_deref(), &config);
    paths::ensure_parent_dir(&db_path)?;
    let conn = open_db(&db_path)?;
    let now = timefmt::now();

    match cli.command {
        Command::Add {
            name,
            due,
            category,
            parent,
        } => {
            let category = match category {
                Some(c) => Category::parse(&c)?,
                None => config.tasks.default_category,
            };
            if let Some(parent) = parent {
                let Some(depth) = ops::task_depth(&conn, parent)? else {
                    bail!("task {parent} not found");
                };
                if depth >= config.tasks.max_depth {
                    bail!(
                        "task {parent} is at depth {depth}; subtasks are limited to depth {}",
                        config.tasks.max_depth
                    );
                }
            }
            let new = NewTask {
                name,
                due_date: due,
                category,
                parent_id: parent,
            };
            let id = ops::add_task(&conn, &new, now)?;
            println!("{id}");
            eprintln!("Added task {id}");
        }

        Command::Edit { id, name, due } => {
            require_task(&conn, id)?;
            ops::update_task_fields(&conn, id, &name, due.as_deref())?;
            eprintln!("Updated task {id}");
        }

        Command::Notes { id, text } => {
            require_task(&conn, id)?;
            let text = match text {
                Some(t) => t,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            ops::update_task_notes(&conn, id, &text)?;
            eprintln!("Updated notes for task {id}");
        }

        Command::Rm { id } => {
            require_task(&conn, id)?;
            ops::delete_task(&conn, id)?;
            eprintln!("Removed task {id}");
        }

        Command::Show { id, json } => {
            let task = require_task(&conn, id)?;
            let sessions = ops::list_sessions(&conn, id)?;
            if json {
                let detail = output::TaskDetail {
                    task: &task,
                    timer: timer::reading(&task, now)?,
                    sessions: &sessions,
                };
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                print!("{}", output::format_task_detail(&task, &sessions, now));
            }
        }

        Command::List {
            fold,
            hide_personal,
            json,
        } => {
            let state = ViewState {
                folded: fold.into_iter().collect(),
                show_personal: !hide_personal,
            };
            let active = view::active_rows(&conn, &state)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&active)?);
            } else if active.is_empty() {
                eprintln!("No active tasks");
            } else {
                print!("{}", output::format_active(&active, now));
            }
        }

        Command::History { since, json } => {
            let rows: Vec<Row> = match since {
                Some(since) => {
                    let date = timefmt::parse_date(&since)?;
                    let min_date = date.format(timefmt::DATE_FORMAT).to_string();
                    report::get_all_archived_tasks(&conn, Some(&min_date))?
                        .into_iter()
                        .map(|r| Row {
                            depth: 0,
                            folded: false,
                            task: r.task,
                        })
                        .collect()
                }
                None => view::history_rows(&conn)?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                eprintln!("No archived tasks yet");
            } else {
                print!("{}", output::format_rows(&rows, true, now));
            }
        }

        Command::Subtree { id } => {
            require_task(&conn, id)?;
            let rows = view::subtree_rows(&conn, id)?;
            print!("{}", output::format_rows(&rows, false, now));
        }

        Command::Start { id, goal } => {
            require_task(&conn, id)?;
            let goal_seconds = goal.map(|minutes| minutes.saturating_mul(60));
            timer::start_timer(&conn, id, goal_seconds, now)?;
            eprintln!("Started timer on task {id}");
        }

        Command::Stop { id } => {
            require_task(&conn, id)?;
            let elapsed = timer::stop_timer(&conn, id, now)?;
            println!("{}", output::format_seconds(elapsed));
            if elapsed == 0 {
                eprintln!("No session logged for task {id}");
            } else {
                eprintln!("Stopped timer on task {id}");
            }
        }

        Command::Done { id } => {
            require_task(&conn, id)?;
            lifecycle::mark_completed(&conn, id, now)?;
            eprintln!("Completed task {id}");
        }

        Command::Archive { id } => {
            require_task(&conn, id)?;
            lifecycle::archive_task(&conn, id, now)?;
            eprintln!("Archived task {id}");
        }

        Command::FinishDay => {
            let archived = lifecycle::archive_all_completed(&conn)?;
            eprintln!("Archived {archived} completed task(s)");
        }

        Command::Reopen { id } => {
            require_task(&conn, id)?;
            lifecycle::reopen_task(&conn, id)?;
            eprintln!("Reopened task {id}");
        }

        Command::Report {
            last_week,
            from,
            to,
            no_prompt,
            output: out_path,
        } => {
            let range = match (from, to) {
                (Some(from), Some(to)) => ReportRange::custom(&from, &to)?,
                _ if last_week => ReportRange::last_week(now),
                _ => ReportRange::current_week(now),
            };
            let include_prompt = config.report.include_prompt && !no_prompt;
            let markdown = report::generate(&conn, &range, now.date(), include_prompt)?;
            match out_path {
                Some(path) => {
                    std::fs::write(&path, format!("{markdown}\n"))
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Wrote report to {}", path.display());
                }
                None => println!("{markdown}"),
            }
        }

        Command::Distance { action } => {
            let total = match action {
                Some(DistanceAction::Add { km }) => stats::add_distance(&conn, km)?,
                None => stats::get_total_distance(&conn)?,
            };
            println!("{total}");
        }
    }

    Ok(())
}
