use clap::Parser;
use std::path::PathBuf;
use summit_scout::config::cli::{split_output_path, AggregateArgs, BatchArgs, Commands, FindArgs};
use summit_scout::utils::error::ErrorSeverity;
use summit_scout::utils::{logger, validation::Validate};
use summit_scout::{
    AggregationReport, Aggregator, BatchOrchestrator, BatchRunSummary, CliConfig, GeminiClient,
    LocalStorage, LocationFinder, ModelDiscovery, Result, ScoutConfig,
};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{} (Severity: {:?})", e, e.severity());
            tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("Error: {}", e.user_friendly_message());
            eprintln!("Suggestion: {}", e.recovery_suggestion());

            match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            }
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: CliConfig) -> Result<i32> {
    let settings = ScoutConfig::load(cli.config.as_deref())?;
    if let Err(e) = settings.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(e);
    }

    match cli.command {
        Commands::Find(args) => find(args, &settings).await,
        Commands::Batch(args) => batch(args, &settings).await,
        Commands::Aggregate(args) => aggregate(args, &settings).await,
    }
}

fn discovery(settings: &ScoutConfig) -> Result<ModelDiscovery<GeminiClient>> {
    let api_key = settings.api_key()?;
    let client = GeminiClient::new(api_key, settings.gemini_options())?;
    tracing::info!("Using model {}", client.model());
    Ok(ModelDiscovery::new(client).with_grounding(settings.grounding()))
}

async fn find(args: FindArgs, settings: &ScoutConfig) -> Result<i32> {
    let location = args.location()?;
    let discovery = discovery(settings)?;

    let (dir, file_name) = match &args.output_path {
        Some(path) => {
            let (dir, name) = split_output_path(path)?;
            (dir, Some(name))
        }
        None => (
            PathBuf::from(args.output_dir.as_deref().unwrap_or(settings.output_dir())),
            None,
        ),
    };

    let finder = LocationFinder::new(discovery, LocalStorage::new(dir));
    let result = finder.find(&location).await?;

    if args.no_save {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let path = finder.save(&result, file_name.as_deref()).await?;
        println!("Results saved to {}", path);
    }

    if result.is_success() {
        println!(
            "Found {} summits and {} companies in {}",
            result.summits.len(),
            result.companies.len(),
            location.city
        );
        Ok(0)
    } else {
        eprintln!(
            "Summit discovery failed for {}: {}",
            location.city,
            result.error.as_deref().unwrap_or("unknown error")
        );
        Ok(1)
    }
}

async fn batch(args: BatchArgs, settings: &ScoutConfig) -> Result<i32> {
    let locations = args.plan(&settings.presets())?;
    let discovery = discovery(settings)?;

    let output_dir = args
        .output_dir
        .as_deref()
        .unwrap_or(settings.output_dir());
    let finder = LocationFinder::new(discovery, LocalStorage::new(output_dir));

    let summary = BatchOrchestrator::new(finder, settings.pacing())
        .run(&locations)
        .await;
    print_summary(&summary);

    Ok(if summary.is_success() { 0 } else { 1 })
}

async fn aggregate(args: AggregateArgs, settings: &ScoutConfig) -> Result<i32> {
    let results_dir = args
        .results_dir
        .as_deref()
        .unwrap_or(settings.results_dir());
    let output = args
        .output
        .as_deref()
        .unwrap_or(settings.aggregate_output());
    let (output_dir, output_name) = split_output_path(output)?;

    let aggregator = Aggregator::new(settings.filter_config()?);
    let report = aggregator
        .run(
            &LocalStorage::new(results_dir),
            &LocalStorage::new(output_dir),
            &output_name,
        )
        .await?;
    print_report(&report);

    Ok(0)
}

fn print_summary(summary: &BatchRunSummary) {
    println!("Total locations processed: {}", summary.total);
    println!("Successful: {}", summary.succeeded);
    println!("Failed: {}", summary.failed);
    if !summary.failed_locations.is_empty() {
        println!("Failed locations:");
        for location in &summary.failed_locations {
            println!("  - {}", location);
        }
    }
}

fn print_report(report: &AggregationReport) {
    println!(
        "Files read: {} ({} skipped, {} failed results ignored)",
        report.files_read, report.files_skipped, report.failed_results
    );
    println!("Total company entries: {}", report.total_companies);
    println!("After filtering by scale: {}", report.after_scale_filter);
    println!("After excluding countries: {}", report.after_country_filter);
    println!("Unique companies: {}", report.unique_companies);

    println!("Companies by scale:");
    for (scale, count) in &report.by_scale {
        println!("  {}: {}", scale, count);
    }
    println!("Top fields:");
    for (field, count) in &report.top_fields {
        println!("  {}: {}", field, count);
    }
    if let Some(path) = &report.output_path {
        println!("Output saved to: {}", path);
    }
}
