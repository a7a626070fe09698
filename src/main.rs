use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use genie_voice::voice::{
    AudioCapture, AudioPlayback, PLAYBACK_SAMPLE_RATE, SAMPLE_RATE, TextToSpeech, calculate_energy,
};
use genie_voice::{
    CloudSynthesis, Config, HttpIntentClient, InteractionController, MicrophoneCapture,
    SpeechPreferences, SpeechSynthesis, TerminalView, select_voice,
};

/// Genie - voice assistant client for a remote intent service
#[derive(Parser)]
#[command(name = "genie", version, about)]
struct Cli {
    /// Base URL of the intent service
    #[arg(long, env = "GENIE_API_BASE")]
    api_base: Option<String>,

    /// Disable microphone and speaker (typed input only)
    #[arg(long, env = "GENIE_DISABLE_VOICE")]
    disable_voice: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Send one request and speak the reply
    Ask {
        /// Text to send
        text: String,
    },
    /// List configured voices and the one replies use
    Voices,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

/// Commands understood by the interactive prompt
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Toggle,
    Hold,
    Release,
    Help,
    Quit,
    Text(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "/listen" => Self::Toggle,
            "/hold" => Self::Hold,
            "/release" => Self::Release,
            "/help" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Text(line),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,genie_voice=info",
        1 => "info,genie_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.api_base.as_deref(), cli.disable_voice)?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Ask { text } => ask(&config, &text).await,
            Command::Voices => {
                list_voices(&config);
                Ok(())
            }
            Command::TestMic { duration } => test_mic(duration),
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&config, &text).await,
        };
    }

    interactive(config).await
}

/// Interactive session: typed lines and microphone capture
async fn interactive(config: Config) -> anyhow::Result<()> {
    tracing::info!(api_base = %config.api_base, "starting genie");

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let capture = Arc::new(MicrophoneCapture::from_config(&config, events_tx));
    let synthesis = Arc::new(CloudSynthesis::from_config(&config));
    let intent = Arc::new(HttpIntentClient::new(&config.api_base)?);

    let controller = InteractionController::new(
        capture,
        synthesis,
        intent,
        Arc::new(TerminalView::new()),
        SpeechPreferences::from_config(&config),
    );
    let pump = controller.spawn_capture_pump(events_rx);

    print_help(controller.capture_enabled());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };

                match Input::parse(&line) {
                    Input::Toggle => controller.toggle_capture(),
                    Input::Hold => controller.begin_capture(),
                    Input::Release => controller.end_capture(),
                    Input::Help => print_help(controller.capture_enabled()),
                    Input::Quit => break,
                    Input::Text(text) => {
                        let controller = controller.clone();
                        let text = text.to_string();
                        tokio::spawn(async move { controller.submit_text(&text).await });
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    pump.abort();
    Ok(())
}

fn print_help(capture_enabled: bool) {
    eprintln!("Type a request and press enter.");
    if capture_enabled {
        eprintln!("  /listen   start or stop listening");
        eprintln!("  /hold     start listening (press-and-hold)");
        eprintln!("  /release  stop listening");
    }
    eprintln!("  /quit     exit");
}

/// Submit one request, print the exchange and wait for the reply to be spoken
async fn ask(config: &Config, text: &str) -> anyhow::Result<()> {
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let capture = Arc::new(MicrophoneCapture::from_config(config, events_tx));
    let synthesis = Arc::new(CloudSynthesis::from_config(config));
    let intent = Arc::new(HttpIntentClient::new(&config.api_base)?);

    let controller = InteractionController::new(
        capture,
        Arc::clone(&synthesis) as Arc<dyn SpeechSynthesis>,
        intent,
        Arc::new(TerminalView::new()),
        SpeechPreferences::from_config(config),
    );

    controller.submit_text(text).await;
    synthesis.wait_idle().await;

    Ok(())
}

/// List configured voices and the one replies use
fn list_voices(config: &Config) {
    let voices = &config.speech.voices;
    let selected = select_voice(voices, &config.speech.voice_prefix);

    println!(
        "TTS backend: {:?} (default voice {})",
        config.speech.tts_backend,
        config.speech.tts_backend.default_voice()
    );
    println!("Language prefix: {}", config.speech.voice_prefix);
    println!("---");

    for voice in voices {
        let marker = if selected == Some(voice) { "*" } else { " " };
        println!("{marker} {:<24} {}", voice.name, voice.lang);
    }

    if selected.is_none() {
        println!("(no voices configured, backend default is used)");
    }
}

/// Test microphone input
fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let capture = AudioCapture::open()?;

    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!("---");

    for i in 0..duration {
        let samples = capture.record_for(Duration::from_secs(1));
        let energy = calculate_energy(&samples);
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

    drop(capture);

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let frequency = 440.0_f32;
    #[allow(clippy::cast_precision_loss)]
    let sample_rate = PLAYBACK_SAMPLE_RATE as f32;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..PLAYBACK_SAMPLE_RATE * 2)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {PLAYBACK_SAMPLE_RATE} Hz...", samples.len());

    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play(samples)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

/// Test TTS output with the configured backend and voice
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let tts = TextToSpeech::from_config(config)?;
    let voice = select_voice(&config.speech.voices, &config.speech.voice_prefix).map_or_else(
        || config.speech.tts_backend.default_voice().to_string(),
        |v| v.name.clone(),
    );

    println!("Synthesizing speech with voice {voice}...");
    let mp3_data = tts.synthesize(text, &voice, config.speech.rate).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    if let Some(header) = mp3_data.get(..4) {
        println!(
            "First 4 bytes: {:02x} {:02x} {:02x} {:02x}",
            header[0], header[1], header[2], header[3]
        );
    }

    println!("Playing audio...");
    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_mp3(&mp3_data)).await??;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
