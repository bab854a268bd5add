mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use specparity::canvas::render_comparison;
use specparity::{compare, Artifact, Tolerance, Verdict};
use std::path::PathBuf;
use std::process::ExitCode;

/// Compare a candidate spectrogram artifact against a reference.
///
/// Metrics are candidate-over-reference. Divergence is reported, not treated
/// as failure: the exit code is 0 whenever the comparison completes.
#[derive(Parser, Debug)]
#[command(name = "specparity-compare", version)]
struct Cli {
    /// Candidate artifact JSON
    candidate: PathBuf,
    /// Reference artifact JSON
    reference: PathBuf,
    /// Diagnostic figure (PNG)
    #[arg(default_value = "comparison.png")]
    output_image: PathBuf,
    /// Also write the report as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,
    /// Correlation below this fails the verdict
    #[arg(long, default_value_t = Tolerance::default().min_correlation)]
    min_correlation: f64,
    /// Mean relative error above this fails the verdict
    #[arg(long, default_value_t = Tolerance::default().max_relative_error)]
    max_relative_error: f64,
}

fn main() -> ExitCode {
    logging::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not usage errors
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let candidate = Artifact::read_json(&cli.candidate)
        .with_context(|| format!("loading candidate {}", cli.candidate.display()))?;
    let reference = Artifact::read_json(&cli.reference)
        .with_context(|| format!("loading reference {}", cli.reference.display()))?;

    let report = compare(&candidate, &reference);
    print!("{report}");

    let tolerance = Tolerance {
        min_correlation: cli.min_correlation,
        max_relative_error: cli.max_relative_error,
    };
    match report.verdict(&tolerance) {
        Verdict::Pass => println!("Verdict: PASS"),
        Verdict::Fail(failures) => {
            println!("Verdict: FAIL");
            for failure in failures {
                println!("  - {failure}");
            }
        }
    }

    if let Some(path) = &cli.json {
        let text = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, text)
            .with_context(|| format!("writing report {}", path.display()))?;
        println!("Report saved as: {}", path.display());
    }

    // The report above stands even if the figure cannot be written.
    let figure = render_comparison(&report, &candidate, &reference);
    match figure.write_png(&cli.output_image) {
        Ok(()) => println!("Comparison plot saved as: {}", cli.output_image.display()),
        Err(e) => {
            log::warn!("diagnostic image not written: {e}");
            println!("Comparison plot not written: {e}");
        }
    }
    Ok(())
}
