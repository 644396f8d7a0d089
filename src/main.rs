mod cli;

use framereel::compose::{self, ComposeJob, ComposeReport};
use framereel::config::{self, Config};
use framereel_av::{ToolRegistry, TransformChain};
use tokio_util::sync::CancellationToken;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, Tuning};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "framereel=debug,framereel_pipeline=debug,framereel_av=debug".to_string()
        } else {
            "framereel=info,framereel_pipeline=info,framereel_av=info".to_string()
        }
    });

    // Logs go to stderr so `--json` output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match dispatch(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            let code = e
                .downcast_ref::<framereel_core::Error>()
                .map_or(1, framereel_core::Error::exit_code);
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_byte(code))
        }
    }
}

fn dispatch(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Compose {
            img_dir,
            out,
            tuning,
        } => compose_command(cli.config.as_deref(), img_dir, out, &tuning),
        Commands::Batch {
            base_dir,
            out_dir,
            pattern,
            tuning,
        } => batch_command(
            cli.config.as_deref(),
            &base_dir,
            &out_dir,
            pattern,
            &tuning,
        ),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("framereel {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    }
}

fn load_tuned_config(config_path: Option<&Path>, tuning: &Tuning) -> Result<Config> {
    let mut config = config::load_config_or_default(config_path)?;
    tuning.apply(&mut config);
    config::validate_config(&config)?;
    Ok(config)
}

fn compose_command(
    config_path: Option<&Path>,
    img_dir: PathBuf,
    out: PathBuf,
    tuning: &Tuning,
) -> Result<u8> {
    let config = load_tuned_config(config_path, tuning)?;
    let allow_partial = config.pipeline.allow_partial;
    let job = ComposeJob {
        img_dir,
        output: out,
    };

    let report = run_jobs(config, tuning, vec![job])?
        .into_iter()
        .next()
        .ok_or(framereel_core::Error::Cancelled)??;

    if tuning.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, allow_partial);
    }

    Ok(exit_byte(report.exit_code(allow_partial)))
}

fn batch_command(
    config_path: Option<&Path>,
    base_dir: &Path,
    out_dir: &Path,
    pattern: Option<String>,
    tuning: &Tuning,
) -> Result<u8> {
    let config = load_tuned_config(config_path, tuning)?;
    let allow_partial = config.pipeline.allow_partial;
    let pattern = pattern.unwrap_or_else(|| config.source.batch_pattern.clone());

    let jobs = compose::batch_jobs(
        base_dir,
        out_dir,
        &pattern,
        &config.source.batch_images_subdir,
    )?;
    if jobs.is_empty() {
        return Err(framereel_core::Error::empty_source(format!(
            "{} (no sub-directories matching '{}')",
            base_dir.display(),
            pattern
        ))
        .into());
    }
    tracing::info!("Batch: {} directories to compose", jobs.len());

    let outcomes = run_jobs(config, tuning, jobs.clone())?;

    let mut code = 0;
    let mut json_entries = Vec::new();
    for (job, outcome) in jobs.iter().zip(outcomes.iter()) {
        match outcome {
            Ok(report) => {
                code = code.max(report.exit_code(allow_partial));
                if tuning.json {
                    json_entries.push(serde_json::to_value(report)?);
                } else {
                    print_report(report, allow_partial);
                    println!();
                }
            }
            Err(e) => {
                code = code.max(1);
                if tuning.json {
                    json_entries.push(serde_json::json!({
                        "img_dir": job.img_dir,
                        "output": job.output,
                        "error": format!("{e:#}"),
                    }));
                } else {
                    println!("✗ {}: {:#}\n", job.img_dir.display(), e);
                }
            }
        }
    }
    if outcomes.len() < jobs.len() {
        // Jobs after a cancellation never ran.
        code = code.max(130);
    }

    if tuning.json {
        println!("{}", serde_json::to_string_pretty(&json_entries)?);
    } else {
        let ok = outcomes
            .iter()
            .filter(|o| matches!(o, Ok(r) if r.is_acceptable(allow_partial)))
            .count();
        println!("Batch complete: {}/{} videos composed", ok, jobs.len());
    }

    Ok(exit_byte(code))
}

/// Run `jobs` one after another on a blocking thread while a Ctrl-C
/// watcher cancels the active pipeline. Jobs after a cancellation are not
/// started, so the returned vector may be shorter than `jobs`.
fn run_jobs(
    config: Config,
    tuning: &Tuning,
    jobs: Vec<ComposeJob>,
) -> Result<Vec<Result<ComposeReport>>> {
    let tools = ToolRegistry::discover(&config.tools);
    let transforms = TransformChain(tuning.transforms.clone());
    if !transforms.is_identity() {
        let names: Vec<String> = transforms.0.iter().map(ToString::to_string).collect();
        tracing::info!("Frame transforms: {}", names.join(" -> "));
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(watch_interrupt(cancel.clone()));

        let worker = tokio::task::spawn_blocking(move || {
            let mut outcomes = Vec::with_capacity(jobs.len());
            for job in &jobs {
                if cancel.is_cancelled() {
                    tracing::warn!("Cancelled, skipping {:?}", job.img_dir);
                    break;
                }
                outcomes.push(compose::compose_dir(
                    &config,
                    &tools,
                    &transforms,
                    job,
                    cancel.clone(),
                ));
            }
            outcomes
        });

        let outcomes = worker.await.context("Composition thread panicked")?;
        watcher.abort();
        Ok::<_, anyhow::Error>(outcomes)
    })
}

async fn watch_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!("Interrupt received, stopping pipeline");
        cancel.cancel();
    }
}

fn exit_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

fn print_report(report: &ComposeReport, allow_partial: bool) {
    let result = &report.result;
    let status = if result.succeeded {
        "✓ Success"
    } else if result.cancelled {
        "✗ Cancelled"
    } else if report.is_acceptable(allow_partial) {
        "~ Partial"
    } else {
        "✗ Failed"
    };

    println!("{} {}", status, report.img_dir.display());
    println!("  Output: {}", report.output.display());
    println!("  Frames written: {}/{}", result.items_written, result.total);
    if !result.failures.is_empty() {
        println!("  Skipped frames: {}", result.failures.len());
        for failure in &result.failures {
            println!("    [{}] {}", failure.index, failure.reason);
        }
    }
    if let Some(ref fatal) = result.fatal {
        println!("  Encoder error: {}", fatal);
    }
    if let Some(ref close) = result.close_error {
        println!("  Finalize error: {}", close);
    }
    if !result.anomalies.is_empty() {
        println!("  Ordering anomalies: {:?}", result.anomalies);
    }
    if let Some(frames) = report.verified_frames {
        println!("  Verified frames: {}", frames);
    }
    if let Some(ref e) = report.verify_error {
        println!("  Verification failed: {}", e);
    }
    println!("  Execution time: {} ms", report.elapsed_ms);
}

fn check_tools(config_path: Option<&Path>) -> Result<u8> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
        Ok(0)
    } else {
        println!("ffmpeg is required to compose videos; ffprobe is needed for --verify.");
        Ok(4)
    }
}

fn validate_config(path: Option<&Path>) -> Result<u8> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let concurrency = config
        .pipeline
        .concurrency
        .map_or_else(|| format!("auto ({})", num_cpus::get()), |c| c.to_string());
    println!("  Workers: {}", concurrency);
    println!(
        "  Encoder: {} @ {} fps, {}",
        config.encoder.codec, config.encoder.fps, config.encoder.pixel_format
    );
    println!("  Extensions: {}", config.source.extensions.join(", "));
    println!(
        "  Batch: '{}' sub-directories, images in '{}'",
        config.source.batch_pattern, config.source.batch_images_subdir
    );
    println!("  Allow partial: {}", config.pipeline.allow_partial);

    Ok(0)
}
