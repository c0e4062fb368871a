use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use intake_console::camera::{
    CameraBackend, FileCameraBackend, TestPatternBackend, VideoCapture,
};
use intake_console::voice::{play_samples, AudioRecorder, SpeechPlayer, SAMPLE_RATE};
use intake_console::{Config, Console, HttpSessionClient, SessionController};

/// Intake - voice-enabled console for medical onboarding
#[derive(Parser)]
#[command(name = "intake", version, about)]
struct Cli {
    /// Path to a config file (defaults to ./intake.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Session service base URL (overrides config file)
    #[arg(long, env = "INTAKE_SERVICE_URL")]
    service_url: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable microphone capture and speech playback
    #[arg(long, env = "INTAKE_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test the camera source and write a capture to a temp file
    TestCamera,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,intake_console=info",
        1 => "info,intake_console=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
            Command::TestCamera => test_camera(cli.config.as_deref()),
        };
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.service_url {
        config.service.base_url = url;
    }
    if cli.disable_voice {
        config.voice.enabled = false;
    }
    tracing::debug!(?config, "loaded configuration");

    let api = Arc::new(HttpSessionClient::new(&config.service.base_url)?);

    let player = if config.voice.enabled {
        Some(Arc::new(SpeechPlayer::new()))
    } else {
        None
    };

    let camera = VideoCapture::new(camera_backend(&config), config.camera.jpeg_quality);

    let controller = Arc::new(SessionController::new(api, player.clone()));
    let mut console = Console::new(controller, camera, player);

    tracing::info!(service = %config.service.base_url, "intake console ready");
    console.run().await?;

    Ok(())
}

fn camera_backend(config: &Config) -> Box<dyn CameraBackend> {
    match &config.camera.source_dir {
        Some(dir) => Box::new(FileCameraBackend::new(dir.clone())),
        None => Box::new(TestPatternBackend),
    }
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut recorder = AudioRecorder::new();
    recorder.start()?;

    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = recorder.peek_samples();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    match recorder.stop() {
        Some(Ok(recording)) => {
            println!("\n---");
            println!(
                "Captured {} bytes of WAV over {}s",
                recording.wav.len(),
                recording.duration_secs
            );
            println!("If you saw movement in the meter, your mic is working!");
        }
        Some(Err(e)) => println!("Recording assembly failed: {e}"),
        None => {}
    }

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sample_rate = 24000_f32;
    let frequency = 440.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (sample_rate * 2.0) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    play_samples(samples)?;

    println!("If you heard the tone, your speakers are working!");
    Ok(())
}

/// Test the configured camera source end to end
fn test_camera(config_path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    let mut capture = VideoCapture::new(camera_backend(&config), config.camera.jpeg_quality);

    println!("Opening camera ({})...", config.camera.default_facing);
    capture.open(config.camera.default_facing)?;
    capture.capture()?;
    let photo = capture.confirm()?;

    let path = std::env::temp_dir().join("intake-test-capture.jpg");
    std::fs::write(&path, &photo.jpeg)?;

    println!(
        "Captured {}x{} JPEG ({} bytes) -> {}",
        photo.width,
        photo.height,
        photo.jpeg.len(),
        path.display()
    );
    Ok(())
}
