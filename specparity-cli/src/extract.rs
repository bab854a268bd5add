mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use specparity::audio::read_wav_mono;
use specparity::canvas::{render_heatmap, Colormap};
use specparity::{Extractor, SpectrogramKind, SpectrogramParams};
use std::path::PathBuf;
use std::process::ExitCode;

/// Compute a power or mel spectrogram from a WAV file and write it as an artifact.
///
/// Parameters start from the defaults, then the `--params` file, then flags.
#[derive(Parser, Debug)]
#[command(name = "specparity-extract", version)]
struct Cli {
    /// Input WAV (mono or stereo)
    wav: PathBuf,
    /// Output artifact JSON
    output: PathBuf,
    /// Partial parameter JSON merged over the defaults
    #[arg(long, value_name = "PATH")]
    params: Option<PathBuf>,
    #[arg(long)]
    n_fft: Option<usize>,
    #[arg(long)]
    hop_length: Option<usize>,
    #[arg(long)]
    win_length: Option<usize>,
    /// Reflection-pad n_fft/2 samples on both sides (true or false)
    #[arg(long, value_name = "BOOL")]
    center: Option<bool>,
    /// Project onto a mel filterbank
    #[arg(long)]
    mel: bool,
    #[arg(long)]
    n_mels: Option<usize>,
    #[arg(long)]
    f_min: Option<f64>,
    #[arg(long)]
    f_max: Option<f64>,
    /// Slaney mel scale with area-normalized filters instead of HTK
    #[arg(long)]
    slaney: bool,
    /// Also write a CSV table
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,
    /// Also write a heatmap PNG
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,
}

impl Cli {
    fn resolve_params(&self) -> Result<SpectrogramParams> {
        let mut params = match &self.params {
            Some(path) => SpectrogramParams::default()
                .with_overlay_file(path)
                .with_context(|| format!("reading parameters {}", path.display()))?,
            None => SpectrogramParams::default(),
        };
        if let Some(n) = self.n_fft {
            params.n_fft = n;
        }
        if let Some(n) = self.hop_length {
            params.hop_length = n;
        }
        if let Some(n) = self.win_length {
            params.win_length = n;
        }
        if let Some(center) = self.center {
            params.center = center;
        }
        if self.mel {
            params.kind = SpectrogramKind::Mel;
        }
        if let Some(n) = self.n_mels {
            params.n_mels = n;
        }
        if let Some(f) = self.f_min {
            params.f_min = f;
        }
        if self.f_max.is_some() {
            params.f_max = self.f_max;
        }
        if self.slaney {
            params.htk = false;
        }
        Ok(params)
    }
}

fn main() -> ExitCode {
    logging::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
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
    let params = cli.resolve_params()?;
    let audio = read_wav_mono(&cli.wav)
        .with_context(|| format!("reading audio {}", cli.wav.display()))?;
    let extractor = Extractor::new(audio.sample_rate, params)?;
    let artifact = extractor.process_audio(&audio)?;

    artifact
        .write_json(&cli.output)
        .with_context(|| format!("writing artifact {}", cli.output.display()))?;
    let (rows, cols) = artifact.shape();
    println!(
        "Wrote {} spectrogram {rows}x{cols} to {}",
        artifact.params().kind.as_str(),
        cli.output.display()
    );

    if let Some(path) = &cli.csv {
        artifact.write_csv(path)?;
        println!("Wrote CSV to {}", path.display());
    }
    if let Some(path) = &cli.image {
        render_heatmap(artifact.data(), Colormap::Viridis).write_png(path)?;
        println!("Wrote heatmap to {}", path.display());
    }
    Ok(())
}
