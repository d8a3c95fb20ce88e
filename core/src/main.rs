//! quarryq - text-query inspector
//!
//! Parses a query in the text language, prints the compiled model, and can
//! run it against an in-memory backend seeded from a JSON file.

use anyhow::{Context, bail};
use clap::Parser;
use quarry_core::exec::{Executor, MemoryExecutor, Row};
use quarry_core::query::Value;
use quarry_core::text::{self, Statement};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "quarryq", about = "Inspect and run Quarry text queries")]
struct Cli {
    /// Query text, e.g. 'select * from Person where age > 21'
    query: String,

    /// Print the compiled query as JSON instead of debug form
    #[arg(long)]
    json: bool,

    /// Execute against an in-memory backend and print the resulting rows
    #[arg(long)]
    run: bool,

    /// JSON seed file: {"Entity": [{"field": value, ...}, ...]}
    #[arg(long, requires = "run")]
    seed: Option<std::path::PathBuf>,
}

fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let statement = text::parse(&cli.query)?;

    let query = match &statement {
        Statement::Query(query) => query.clone(),
        Statement::Prepared(prepared) => {
            if cli.run {
                bail!(
                    "cannot run a prepared query; unbound parameters: {}",
                    prepared.unbound().join(", ")
                );
            }
            prepared.query().clone()
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&query)?);
    } else {
        println!("{query:#?}");
    }
    if let Statement::Prepared(prepared) = &statement {
        println!("unbound parameters: {}", prepared.unbound().join(", "));
    }

    if cli.run {
        let executor = MemoryExecutor::new();
        if let Some(path) = &cli.seed {
            seed_from_file(&executor, path)?;
        }

        let rows: Vec<Row> = executor.execute(&query)?.collect();
        println!("-- {} row(s)", rows.len());
        for row in rows {
            println!("{}", render(&row)?);
        }
    }

    Ok(())
}

fn seed_from_file(executor: &MemoryExecutor, path: &std::path::Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&raw).context("parsing seed file")?;

    let serde_json::Value::Object(entities) = json else {
        bail!("seed file must be a JSON object keyed by entity name");
    };

    for (entity, rows) in entities {
        let serde_json::Value::Array(rows) = rows else {
            bail!("seed entry '{entity}' must be an array of row objects");
        };
        let mut seeded = Vec::new();
        for row_json in rows {
            let Value::Document(fields) = Value::from_json(row_json) else {
                bail!("seed rows for '{entity}' must be JSON objects");
            };
            let mut row = Row::new();
            for (field, value) in fields {
                row.insert(field, value);
            }
            seeded.push(row);
        }
        executor.seed(&entity, seeded);
    }
    Ok(())
}

fn render(row: &Row) -> anyhow::Result<String> {
    let mut columns: Vec<_> = row.data.iter().collect();
    columns.sort_by(|(a, _), (b, _)| a.cmp(b));

    let rendered: Vec<String> = columns
        .into_iter()
        .map(|(column, value)| {
            let json = serde_json::to_string(&value.clone().into_json())?;
            Ok(format!("{column}={json}"))
        })
        .collect::<anyhow::Result<_>>()?;
    Ok(rendered.join(" "))
}
