use anyhow::Result;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use voxrelay::audio::convert::{AudioConverter, FfmpegConverter};
use voxrelay::chat::{MessageId, SpoolChatClient};
use voxrelay::cli::{Cli, Commands};
use voxrelay::config::Config;
use voxrelay::daemon::run_daemon;
use voxrelay::ipc::client::send_command;
use voxrelay::ipc::protocol::{Command, Response};
use voxrelay::ipc::server::IpcServer;
use voxrelay::notify::{HttpNotifier, Notifier};
use voxrelay::pipeline::ArtifactStore;
use voxrelay::relay::RelayService;
use voxrelay::stt::{HttpRecognizer, SegmentTranscriber, SpeechRecognizer, Transcriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        // Bare `voxrelay` behaves like `voxrelay once`
        None | Some(Commands::Once) => {
            let config = load_config(cli.config.as_deref())?;
            run_once(config).await?;
        }
        Some(Commands::Daemon { socket, every }) => {
            let config = load_config(cli.config.as_deref())?;
            let interval = match every {
                Some(interval) => interval,
                None => config.schedule_interval()?,
            };
            let (relay, notifier) = build_relay(&config);
            run_daemon(relay, notifier, interval, socket).await?;
        }
        Some(Commands::Tick { socket }) => {
            handle_ipc_command(socket, Command::Tick).await?;
        }
        Some(Commands::Status { socket }) => {
            handle_ipc_command(socket, Command::Status).await?;
        }
        Some(Commands::Stop { socket }) => {
            handle_ipc_command(socket, Command::Shutdown).await?;
        }
        Some(Commands::Transcribe { file }) => {
            let config = load_config(cli.config.as_deref())?;
            run_transcribe(config, &file).await?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "voxrelay",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Initialize the logger.
///
/// `RUST_LOG` still wins when set; the flags only pick the default filter.
fn init_logging(quiet: bool, verbose: u8) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Resolve configuration: `--config` beats the default path, which beats
/// built-in defaults. `VOXRELAY_*` env overrides apply last.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path()),
    };
    Ok(config.with_env_overrides())
}

/// Wire the shipped collaborators into a relay service.
fn build_relay(config: &Config) -> (RelayService, Arc<dyn Notifier>) {
    let chat = Arc::new(SpoolChatClient::new(config.chat.spool_dir.clone()));
    let converter = Arc::new(FfmpegConverter::new(config.pipeline.ffmpeg_path.clone()));
    let recognizer: Arc<dyn SpeechRecognizer> = Arc::new(HttpRecognizer::new(&config.stt));
    let transcriber = Arc::new(SegmentTranscriber::new(&config.segmenter, recognizer));
    let notifier: Arc<dyn Notifier> = Arc::new(HttpNotifier::new(&config.notify));

    let relay = RelayService::new(config, chat, converter, transcriber, Arc::clone(&notifier));
    (relay, notifier)
}

/// Run a single relay tick and print its summary.
async fn run_once(config: Config) -> Result<()> {
    let (mut relay, _notifier) = build_relay(&config);
    let summary = relay.process_once().await?;
    println!("{}", summary);
    Ok(())
}

/// Transcribe one local voice file and print the text.
async fn run_transcribe(config: Config, file: &Path) -> Result<()> {
    if !file.is_file() {
        eprintln!("{}", format!("No such file: {}", file.display()).red());
        std::process::exit(1);
    }

    let work_dir = config.work_dir();
    tokio::fs::create_dir_all(&work_dir).await?;

    // Stage a copy so conversion artifacts land in the work area, not next
    // to the operator's file
    let name = file
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("input.oga"));
    let staged = work_dir.join(name);
    tokio::fs::copy(file, &staged).await?;

    let artifacts = ArtifactStore::new(work_dir.join("segments"));
    artifacts.register_source(&staged);

    let converter = FfmpegConverter::new(config.pipeline.ffmpeg_path.clone());
    let recognizer: Arc<dyn SpeechRecognizer> = Arc::new(HttpRecognizer::new(&config.stt));
    let transcriber = SegmentTranscriber::new(&config.segmenter, recognizer);

    let result = async {
        let wav = converter.convert(&staged).await?;
        artifacts.register_converted(&wav);
        transcriber.transcribe(MessageId(0), &wav, &artifacts).await
    }
    .await;

    artifacts.cleanup();

    match result {
        Ok(text) => {
            println!("{}", text);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format!("Transcription failed: {}", e).red());
            std::process::exit(1);
        }
    }
}

/// Forward one control command to the daemon and print what came back.
async fn handle_ipc_command(socket: Option<std::path::PathBuf>, command: Command) -> Result<()> {
    let socket_path = socket.unwrap_or_else(IpcServer::default_socket_path);

    let response = match send_command(&socket_path, command).await {
        Ok(response) => response,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            eprintln!("Start it with: voxrelay daemon");
            std::process::exit(1);
        }
    };

    match response {
        Response::Ok => {
            println!("{}", "Ok".green());
        }
        Response::Summary { summary } => {
            println!("{} {}", "Tick complete:".green(), summary);
        }
        Response::Status {
            uptime_secs,
            ticks,
            last_tick,
        } => {
            println!("Status:");
            println!(
                "  {}    {}",
                "Uptime:".dimmed(),
                humantime::format_duration(Duration::from_secs(uptime_secs))
            );
            println!("  {}     {}", "Ticks:".dimmed(), ticks);
            match last_tick {
                Some(summary) => println!("  {} {}", "Last tick:".dimmed(), summary),
                None => println!("  {} {}", "Last tick:".dimmed(), "none yet".dimmed()),
            }
        }
        Response::Error { message } => {
            eprintln!("{}", format!("Daemon error: {}", message).red());
            std::process::exit(1);
        }
    }

    Ok(())
}
