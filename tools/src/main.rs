//! tms-runner: headless transaction monitoring runner.
//!
//! Usage:
//!   tms-runner --input transactions.jsonl --db tms.db
//!   tms-runner --ipc-mode --history sqlite --db tms.db --data-dir ./data

use anyhow::Result;
use std::collections::BTreeMap;
use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;
use tms_core::{
    clock::{Clock, SystemClock},
    config::EngineConfig,
    history::{AccountHistory, MemoryAccountHistory, SqliteAccountHistory},
    monitor::{IngestOutcome, TransactionMonitor},
    store::TmsStore,
    transaction::NewTransaction,
};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Ingest { transaction: NewTransaction },
    ListAlerts,
    AlertsForTransaction { transaction_id: String },
    ListRules,
    PurgeHistory,
    Quit,
}

#[derive(Default)]
struct RunStats {
    ingested: u64,
    rejected: u64,
    flagged:  u64,
    purged:   usize,
    per_rule: BTreeMap<String, u64>,
}

impl RunStats {
    fn record(&mut self, outcome: &IngestOutcome) {
        self.ingested += 1;
        if !outcome.report.alerts.is_empty() {
            self.flagged += 1;
        }
        for result in outcome.report.results.iter().filter(|r| r.is_suspicious) {
            *self.per_rule.entry(result.rule_id.clone()).or_default() += 1;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let history_kind = flag_value(&args, "--history").unwrap_or("memory");
    let input = flag_value(&args, "--input");

    if !ipc_mode {
        println!("tms-runner: transaction monitoring");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  history:   {history_kind}");
        println!("  input:     {}", input.unwrap_or("<stdin>"));
        println!();
    }

    let config = EngineConfig::load(data_dir)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let history: Box<dyn AccountHistory> = match history_kind {
        "memory" => Box::new(MemoryAccountHistory::with_clock(clock.clone())),
        "sqlite" => Box::new(SqliteAccountHistory::open_with_clock(db, clock.clone())?),
        other => anyhow::bail!("Unknown --history '{other}' (expected memory or sqlite)"),
    };

    let monitor = TransactionMonitor::new(
        TmsStore::open(db)?,
        history,
        Box::new(config.risk_accounts()),
        &config,
        clock,
    )?;

    if ipc_mode {
        run_ipc_loop(&monitor).await?;
    } else {
        let reader: Box<dyn BufRead> = match input {
            Some(path) => Box::new(BufReader::new(File::open(path)?)),
            None => Box::new(BufReader::new(io::stdin())),
        };
        let stats = run_batch(&monitor, reader).await?;
        print_summary(&monitor, &stats)?;
    }

    Ok(())
}

async fn run_batch(monitor: &TransactionMonitor, reader: Box<dyn BufRead>) -> Result<RunStats> {
    let mut stats = RunStats::default();
    let mut stdout = io::stdout();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let new: NewTransaction = match serde_json::from_str(&line) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("line {}: cannot parse transaction: {e}", line_no + 1);
                stats.rejected += 1;
                continue;
            }
        };

        match monitor.ingest(new).await {
            Ok(outcome) => {
                stats.record(&outcome);
                let line_json = serde_json::json!({
                    "externalId": outcome.transaction.external_id,
                    "results":    outcome.report.results,
                    "alertCount": outcome.report.alerts.len(),
                });
                writeln!(stdout, "{line_json}")?;
            }
            Err(e) => {
                log::warn!("line {}: {e}", line_no + 1);
                stats.rejected += 1;
            }
        }
    }
    stdout.flush()?;
    stats.purged = monitor.purge_expired_history().await?;
    Ok(stats)
}

async fn run_ipc_loop(monitor: &TransactionMonitor) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

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
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let response = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Ingest { transaction } => match monitor.ingest(transaction).await {
                Ok(outcome) => serde_json::to_value(&outcome)?,
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            },
            IpcCommand::ListAlerts => serde_json::to_value(monitor.store().list_alerts()?)?,
            IpcCommand::AlertsForTransaction { transaction_id } => {
                serde_json::to_value(monitor.store().alerts_for_transaction(&transaction_id)?)?
            }
            IpcCommand::ListRules => serde_json::to_value(monitor.store().list_rules()?)?,
            IpcCommand::PurgeHistory => match monitor.purge_expired_history().await {
                Ok(purged) => serde_json::json!({ "purged": purged }),
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            },
        };
        writeln!(stdout, "{}", response)?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(monitor: &TransactionMonitor, stats: &RunStats) -> Result<()> {
    let stored = monitor.store().transaction_count()?;
    let alerts = monitor.store().alert_count()?;

    println!();
    println!("=== RUN SUMMARY ===");
    println!("  ingested:       {}", stats.ingested);
    println!("  rejected:       {}", stats.rejected);
    println!("  flagged txns:   {}", stats.flagged);
    println!("  stored txns:    {stored}");
    println!("  total alerts:   {alerts}");
    println!("  purged history: {}", stats.purged);

    println!();
    println!("=== ALERTS BY RULE ===");
    if stats.per_rule.is_empty() {
        println!("  (no suspicious transactions)");
    } else {
        for (rule, count) in &stats.per_rule {
            println!("  {rule:<28} {count}");
        }
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
