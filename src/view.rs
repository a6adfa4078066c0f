//! Flattened task trees for the active and history listings.

use std::collections::{BTreeSet, HashMap, HashSet};

use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;
use crate::model::{Category, Status, Task};
use crate::ops::{get_task_hierarchy, get_tasks};

/// Display preferences for the active listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// Tasks whose COMPLETED children are hidden.
    pub folded: BTreeSet<i64>,
    pub show_personal: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            folded: BTreeSet::new(),
            show_personal: true,
        }
    }
}

impl ViewState {
    /// Fold `id` if it is unfolded, unfold it otherwise. Returns the new state.
    pub fn toggle_fold(&mut self, id: i64) -> bool {
        if self.folded.remove(&id) {
            false
        } else {
            self.folded.insert(id);
            true
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Row {
    pub depth: usize,
    pub folded: bool,
    #[serde(flatten)]
    pub task: Task,
}

/// The active listing, split into its two groups.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActiveView {
    pub personal: Vec<Row>,
    pub work: Vec<Row>,
}

impl ActiveView {
    pub fn is_empty(&self) -> bool {
        self.personal.is_empty() && self.work.is_empty()
    }
}

/// Pre-order walk from `roots`. `keep(child, parent_folded)` decides whether a
/// child (and so its subtree) is shown.
fn flatten(
    conn: &Connection,
    roots: Vec<Task>,
    state: Option<&ViewState>,
    keep: impl Fn(&Task, bool) -> bool,
) -> Result<Vec<Row>> {
    let is_folded = |id: i64| state.is_some_and(|s| s.folded.contains(&id));

    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<(usize, Task)> = roots.into_iter().rev().map(|t| (0, t)).collect();
    while let Some((depth, task)) = stack.pop() {
        if !seen.insert(task.id) {
            continue;
        }
        let folded = is_folded(task.id);
        let children = get_tasks(conn, Some(task.id))?;
        stack.extend(
            children
                .into_iter()
                .filter(|c| keep(c, folded))
                .rev()
                .map(|c| (depth + 1, c)),
        );
        rows.push(Row {
            depth,
            folded,
            task,
        });
    }
    Ok(rows)
}

/// Every unarchived root and its visible descendants. Archived children are
/// always hidden; completed children are hidden under folded parents. The
/// personal group is empty when `show_personal` is off.
pub fn active_rows(conn: &Connection, state: &ViewState) -> Result<ActiveView> {
    let (personal, work): (Vec<Task>, Vec<Task>) = get_tasks(conn, None)?
        .into_iter()
        .filter(|t| t.status != Status::Archived)
        .partition(|t| t.category == Category::Personal);

    let keep = |child: &Task, parent_folded: bool| match child.status {
        Status::Archived => false,
        Status::Completed => !parent_folded,
        _ => true,
    };

    let personal = if state.show_personal {
        flatten(conn, personal, Some(state), keep)?
    } else {
        Vec::new()
    };
    let work = flatten(conn, work, Some(state), keep)?;
    Ok(ActiveView { personal, work })
}

/// Archived roots with their entire subtrees, whatever the descendants'
/// status.
pub fn history_rows(conn: &Connection) -> Result<Vec<Row>> {
    let roots = get_tasks(conn, None)?
        .into_iter()
        .filter(|t| t.status == Status::Archived)
        .collect();
    flatten(conn, roots, None, |_, _| true)
}

/// `id` and all of its descendants in pre-order, with depths relative to
/// `id`. Empty if the task does not exist.
pub fn subtree_rows(conn: &Connection, id: i64) -> Result<Vec<Row>> {
    let tasks = get_task_hierarchy(conn, id)?;
    let mut depths: HashMap<i64, usize> = HashMap::new();
    let mut rows = Vec::with_capacity(tasks.len());
    for task in tasks {
        let depth = task
            .parent_id
            .and_then(|p| depths.get(&p))
            .map_or(0, |d| d + 1);
        let depth = if task.id == id { 0 } else { depth };
        depths.insert(task.id, depth);
        rows.push(Row {
            depth,
            folded: false,
            task,
        });
    }
    Ok(rows)
}
