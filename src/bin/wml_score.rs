//! wml-score: command-line front end for an online deployment
//!
//! Settings not passed as flags are read from `VCAP_SERVICES` and the
//! `WML_*` environment variables.

use std::io::{self, IsTerminal, Read};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use wml_scoring::{RetryConfig, ScoringClient, ScoringOptions};

/// Score rows against a Watson Machine Learning deployment
#[derive(Parser)]
#[command(name = "wml-score")]
#[command(version = wml_scoring::PKG_VERSION)]
#[command(about = "Watson Machine Learning scoring client")]
struct Args {
    /// Input field names, comma separated
    #[arg(short, long, value_delimiter = ',', required = true)]
    fields: Vec<String>,

    /// Service base URL
    #[arg(long)]
    service_path: Option<String>,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,

    #[arg(long)]
    instance_id: Option<String>,

    #[arg(long)]
    model_id: Option<String>,

    #[arg(long)]
    deployment_id: Option<String>,

    /// Look the model up by name instead of ID
    #[arg(long)]
    model_name: Option<String>,

    /// Online deployment name (with --model-name)
    #[arg(long)]
    deployment_name: Option<String>,

    /// Attempts per call when the access token is rejected
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// HTTP request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score one row (`[..]`) or several rows (`[[..], [..]]`) given as JSON
    ///
    /// An array whose items are all arrays is read as several rows. To score
    /// a single row of array-valued features, wrap it: `[[[1, 2], [3]]]`.
    Score {
        /// JSON rows (or omit to read from stdin)
        rows: Option<String>,
        /// Print the full response instead of just the predictions
        #[arg(long)]
        raw: bool,
    },

    /// Print the scoring URL, resolving model and deployment names if needed
    Resolve,
}

impl Args {
    fn options(&self) -> ScoringOptions {
        let mut options = ScoringOptions {
            service_path: self.service_path.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            instance_id: self.instance_id.clone(),
            model_id: self.model_id.clone(),
            deployment_id: self.deployment_id.clone(),
            model_name: self.model_name.clone(),
            deployment_name: self.deployment_name.clone(),
            ..ScoringOptions::default()
        }
        .retry(RetryConfig::new().max_attempts(self.max_attempts));
        if let Some(secs) = self.timeout_secs {
            options = options.timeout(Duration::from_secs(secs));
        }
        options
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    debug!(version = %wml_scoring::version::version_string(), "starting");

    let client = ScoringClient::new(args.fields.clone(), args.options())?;

    match args.command {
        Command::Score { rows, raw } => {
            let rows = parse_rows(&read_input(rows)?)?;
            let result = client.score_multi(&rows).await?;
            if raw {
                println!("{}", serde_json::to_string_pretty(&result.data)?);
            } else {
                for prediction in &result.predictions {
                    println!("{prediction}");
                }
            }
        }

        Command::Resolve => {
            println!("{}", client.scoring_url().await?);
        }
    }

    Ok(())
}

/// Take rows from the argument, or from stdin when piped.
fn read_input(arg: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(arg) = arg {
        return Ok(arg);
    }
    if io::stdin().is_terminal() {
        return Err("score: no rows provided (pass JSON as argument or via stdin)".into());
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

/// Accept a single row (`[1, "a"]`) or a list of rows (`[[1, "a"], [2, "b"]]`).
fn parse_rows(input: &str) -> Result<Vec<Vec<Value>>, Box<dyn std::error::Error>> {
    let Value::Array(items) = serde_json::from_str::<Value>(input.trim())? else {
        return Err("score: rows must be a JSON array".into());
    };
    if items.is_empty() {
        return Err("score: no rows provided".into());
    }

    if items.iter().all(Value::is_array) {
        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Array(row) => Some(row),
                _ => None,
            })
            .collect())
    } else {
        Ok(vec![items])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_single_row() {
        let rows = parse_rows(r#"[1, "gold", 2.5]"#).unwrap();
        assert_eq!(rows, vec![vec![json!(1), json!("gold"), json!(2.5)]]);
    }

    #[test]
    fn parses_multiple_rows() {
        let rows = parse_rows("[[1, 2], [3, 4]]\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![json!(3), json!(4)]);
    }

    #[test]
    fn all_array_row_needs_wrapping() {
        let rows = parse_rows("[[1, 2], [3]]").unwrap();
        assert_eq!(rows.len(), 2);

        let rows = parse_rows("[[[1, 2], [3]]]").unwrap();
        assert_eq!(rows, vec![vec![json!([1, 2]), json!([3])]]);
    }

    #[test]
    fn rejects_non_array() {
        assert!(parse_rows(r#"{"a": 1}"#).is_err());
        assert!(parse_rows("[]").is_err());
    }

    #[test]
    fn fields_are_comma_separated() {
        let args = Args::parse_from([
            "wml-score",
            "--fields",
            "age,plan",
            "--model-name",
            "churn-model",
            "resolve",
        ]);
        assert_eq!(args.fields, vec!["age", "plan"]);
        let options = args.options();
        assert_eq!(options.model_name.as_deref(), Some("churn-model"));
        assert_eq!(options.retry.max_attempts, 3);
        assert!(options.timeout.is_none());
    }
}
