//! CLI runner - executes commands

use crate::cli::commands::{Cli, CollectArgs, Commands, OutputFormat};
use crate::config::CollectorConfig;
use crate::engine::{Collector, RunReport, Termination};
use crate::error::{Result, ResultExt};
use crate::http::HttpFetcher;
use crate::ledger::{Checkpoint, Ledger};
use crate::output::{format_row, CsvSink, MemorySink};
use serde_json::{json, Value};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
    cancel: CancellationToken,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops a running collection at the next request boundary
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Collect(args) => {
                let config = self.collect_config(args)?;
                self.collect(&config).await
            }
            Commands::Status { output } => self.status(output).await,
            Commands::Reset { output } => self.reset(output).await,
        }
    }

    /// Config file (if any) with flags applied on top
    fn collect_config(&self, args: &CollectArgs) -> Result<CollectorConfig> {
        let mut config = match &self.cli.config {
            Some(path) => CollectorConfig::load(path)?,
            None => CollectorConfig::default(),
        };
        args.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    async fn collect(&self, config: &CollectorConfig) -> Result<()> {
        // Everything that can fail on bad input happens before any request
        let pool = config.credential_pool()?;
        let ledger = config.ledger()?;
        let fetcher = HttpFetcher::with_config(config.fetcher_config())
            .context("Failed to build HTTP client")?;
        let mut collector = Collector::new(config.engine_config(), pool, ledger)?
            .with_boxed_transform(config.transform.build())
            .with_cancellation(self.cancel.clone());

        info!(
            tag = %config.tag,
            target = config.count,
            credentials = collector.pool().len(),
            transform = ?config.transform,
            "Starting collection"
        );

        let interrupt = self.cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; stopping after the current request");
                interrupt.cancel();
            }
        });

        let result = match &config.output {
            Some(path) => {
                let mut sink = CsvSink::open(path)?.with_delimiter(config.delimiter);
                collector.run(&fetcher, &mut sink).await
            }
            None => {
                let mut sink = MemorySink::new();
                let report = collector.run(&fetcher, &mut sink).await;
                for record in sink.records() {
                    println!("{}", format_row(record, config.delimiter));
                }
                report
            }
        };
        watcher.abort();

        let report = result?;
        self.print_report(&report);

        match report.termination {
            Termination::TransportFailure(e) => {
                if e.is_transport() && config.output.is_some() {
                    warn!("Progress up to the failed request is saved; rerun to resume");
                }
                Err(e)
            }
            _ => Ok(()),
        }
    }

    fn print_report(&self, report: &RunReport) {
        let progress = &report.progress;
        match self.cli.format {
            OutputFormat::Json => {
                let summary = json!({
                    "status": report.termination.as_str(),
                    "records_fetched": progress.records_fetched,
                    "requests_issued": progress.requests_issued,
                    "elapsed_seconds": progress.elapsed_seconds,
                    "end_of_results": progress.end_of_results,
                    "session_requests": report.session_requests,
                    "session_records": report.session_records,
                    "rotations": report.rotations,
                    "oldest_created_time": report.oldest_created_time,
                    "oldest_created_at": report.oldest_created_at().map(|dt| dt.to_rfc3339()),
                });
                eprintln!("{summary}");
            }
            OutputFormat::Pretty => {
                eprintln!("Status:           {}", report.termination.as_str());
                eprintln!(
                    "Records:          {} ({} this session)",
                    progress.records_fetched, report.session_records
                );
                eprintln!(
                    "Requests:         {} ({} this session)",
                    progress.requests_issued, report.session_requests
                );
                eprintln!("Elapsed:          {:.2}s", progress.elapsed_seconds);
                eprintln!("Rotations:        {}", report.rotations);
                if let Some(oldest) = report.oldest_created_at() {
                    eprintln!("Oldest record:    {}", oldest.to_rfc3339());
                }
            }
        }
    }

    async fn status(&self, output: &Path) -> Result<()> {
        let ledger = Ledger::for_output(output)?;
        let Some(checkpoint) = ledger.load().await? else {
            println!("No progress recorded for {}", output.display());
            return Ok(());
        };

        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&checkpoint_json(&checkpoint))?);
            }
            OutputFormat::Pretty => {
                let progress = &checkpoint.progress;
                println!("Run:              {}", output.display());
                println!("Records:          {}", progress.records_fetched);
                if let Some(target) = progress.target {
                    println!("Target:           {target}");
                }
                println!("Requests:         {}", progress.requests_issued);
                println!("Elapsed:          {:.2}s", progress.elapsed_seconds);
                println!("End of results:   {}", progress.end_of_results);
                if let Some(cursor) = &checkpoint.cursor {
                    println!("Next:             .../{}", cursor.short_display());
                }
                if let Some(status) = &checkpoint.status {
                    println!("Last status:      {status}");
                }
                if let Some(finished) = &checkpoint.finished_at {
                    println!("Finished at:      {finished}");
                }
            }
        }
        Ok(())
    }

    async fn reset(&self, output: &Path) -> Result<()> {
        let ledger = Ledger::for_output(output)?;
        ledger.reset().await?;
        println!(
            "Removed progress ledger for {} (the output file was kept)",
            output.display()
        );
        Ok(())
    }
}

/// JSON view of a checkpoint; the credential in the cursor is masked
fn checkpoint_json(checkpoint: &Checkpoint) -> Value {
    let progress = &checkpoint.progress;
    json!({
        "records_fetched": progress.records_fetched,
        "requests_issued": progress.requests_issued,
        "elapsed_seconds": progress.elapsed_seconds,
        "end_of_results": progress.end_of_results,
        "target": progress.target,
        "next": checkpoint.cursor.as_ref().map(crate::pagination::Cursor::short_display),
        "status": checkpoint.status,
        "finished_at": checkpoint.finished_at,
    })
}
