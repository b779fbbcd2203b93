//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod doc;
pub mod jsonl;
pub mod tasks;
pub mod validate;

use crate::domain::ids::{Language, TaskId};
use std::collections::BTreeMap;

/// Prints the detection tasks bound per language
fn print_bound_tasks(tasks: &BTreeMap<Language, Vec<TaskId>>) {
    println!("Detection tasks:");
    for (lang, ids) in tasks {
        let ids: Vec<&str> = ids.iter().map(TaskId::as_str).collect();
        println!("  {lang}: {}", ids.join(", "));
    }
    println!();
}
