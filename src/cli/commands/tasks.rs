//! Tasks command implementation
//!
//! Lists the detection tasks in the built-in registry, optionally restricted
//! to the tasks usable for some languages.

use crate::domain::errors::PiiProcessError;
use crate::domain::ids::{Language, PiiType};
use crate::pipeline::{RegisteredTask, StageRegistry};
use clap::Args;

/// Arguments for the tasks command
#[derive(Args, Debug)]
pub struct TasksArgs {
    /// Only list tasks usable for these languages (comma-separated)
    #[arg(short = 'L', long, value_name = "LANG", value_delimiter = ',')]
    pub lang: Option<Vec<String>>,
}

impl TasksArgs {
    /// Execute the tasks command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let registry = StageRegistry::builtin()?;
        let langs = self
            .lang
            .iter()
            .flatten()
            .map(|l| Language::new(l.as_str()).map_err(PiiProcessError::Config))
            .collect::<Result<Vec<_>, _>>()?;

        let tasks = select(&registry, &langs);
        println!("Detection tasks ({}):", tasks.len());
        for task in tasks {
            let info = task.info();
            let types: Vec<&str> = info.pii_types.iter().map(PiiType::as_str).collect();
            println!("  {}", info.id);
            println!("    Types:     {}", types.join(", "));
            println!("    Languages: {}", info.languages);
            if let Some(country) = &info.country {
                println!("    Country:   {country}");
            }
            println!("    Method:    {:?}", info.method);
            if !info.description.is_empty() {
                println!("    {}", info.description);
            }
        }
        println!();
        Ok(0)
    }
}

/// Tasks supporting at least one of `langs`, or all tasks when empty
fn select<'a>(registry: &'a StageRegistry, langs: &[Language]) -> Vec<&'a RegisteredTask> {
    registry
        .tasks()
        .filter(|t| langs.is_empty() || langs.iter().any(|l| t.info().languages.supports(l)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(tasks: &[&RegisteredTask]) -> Vec<String> {
        tasks.iter().map(|t| t.info().id.to_string()).collect()
    }

    #[test]
    fn test_select_all_without_filter() {
        let registry = StageRegistry::builtin().unwrap();
        assert_eq!(select(&registry, &[]).len(), registry.len());
    }

    #[test]
    fn test_select_by_language() {
        let registry = StageRegistry::builtin().unwrap();
        let es = ids(&select(&registry, &[Language::new("es").unwrap()]));
        assert!(es.contains(&"es_dni".to_string()));
        assert!(es.contains(&"email_address".to_string()));
        assert!(!es.contains(&"us_ssn".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_language_is_config_error() {
        let args = TasksArgs {
            lang: Some(vec![String::new()]),
        };
        let err = args.execute().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PiiProcessError>(),
            Some(PiiProcessError::Config(_))
        ));
    }
}
