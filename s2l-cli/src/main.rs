use std::fs::File;
use std::net::SocketAddr;
use std::time::Instant;

use clap::Parser;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use crossbeam_channel::{unbounded, Receiver, Sender};

use s2l_core::{Config, Core};
use s2l_osc::{OscPacket, OscTransport};
use s2l_types::NullObserver;

#[derive(Parser, Debug)]
#[command(name = "sound2light", about = "Real-time audio analysis and OSC lighting triggers")]
struct Cli {
    /// Enable debug-level logging (default: info)
    #[arg(long, short = 'v')]
    verbose: bool,
    /// Speak TCP to the lighting console instead of UDP
    #[arg(long)]
    tcp: bool,
    /// <USER> substitution value for outgoing templates
    #[arg(long, default_value = "0")]
    user: String,
    /// Address to send outgoing OSC to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// One BPM message template per `--bpm-template` flag, e.g. "/lx/tempo=<BPM>"
    #[arg(long = "bpm-template")]
    bpm_templates: Vec<String>,
}

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("sound2light")
        .join("sound2light.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = File::create(&log_path)
        .unwrap_or_else(|_| File::create("/tmp/sound2light.log").expect("cannot create log file"));

    WriteLogger::init(log_level, simplelog::Config::default(), log_file)
        .expect("failed to initialize logger");

    log::info!("sound2light starting (log level: {:?})", log_level);
}

enum CaptureEvent {
    Samples { data: Vec<f32>, channel_count: usize },
}

/// Spawn a cpal input stream on a dedicated thread (cpal's `Stream` isn't
/// `Send`) and forward every captured buffer over `tx`.
fn spawn_capture(tx: Sender<CaptureEvent>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let host = cpal::default_host();
        let device = match host.default_input_device() {
            Some(d) => d,
            None => {
                log::error!("no default audio input device");
                return;
            }
        };
        let supported = match device.default_input_config() {
            Ok(c) => c,
            Err(e) => {
                log::error!("failed to get default input config: {e}");
                return;
            }
        };
        let channel_count = supported.channels() as usize;
        let config = supported.config();
        let err_fn = |err| log::error!("audio stream error: {err}");

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(CaptureEvent::Samples { data: data.to_vec(), channel_count });
                },
                err_fn,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let samples: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                    let _ = tx.send(CaptureEvent::Samples { data: samples, channel_count });
                },
                err_fn,
                None,
            ),
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    let samples: Vec<f32> =
                        data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0).collect();
                    let _ = tx.send(CaptureEvent::Samples { data: samples, channel_count });
                },
                err_fn,
                None,
            ),
            other => {
                log::error!("unsupported capture sample format: {other:?}");
                return;
            }
        };

        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                log::error!("failed to build input stream: {e}");
                return;
            }
        };
        if let Err(e) = stream.play() {
            log::error!("failed to start input stream: {e}");
            return;
        }

        log::info!(
            "audio capture started: {} Hz, {} channel(s)",
            supported.sample_rate().0,
            channel_count
        );

        // The stream must stay alive on this thread for the process lifetime.
        loop {
            std::thread::sleep(std::time::Duration::from_millis(250));
        }
    })
}

fn drain_capture(rx: &Receiver<CaptureEvent>, core: &mut Core) {
    while let Ok(event) = rx.try_recv() {
        match event {
            CaptureEvent::Samples { data, channel_count } => core.push_audio(&data, channel_count),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load();

    let tx_addr: SocketAddr = format!("{}:{}", cli.host, config.udp_tx_port())
        .parse()
        .expect("invalid --host address");
    let tcp_addr: SocketAddr = format!("{}:{}", cli.host, config.tcp_port())
        .parse()
        .expect("invalid --host address");

    let mut transport = OscTransport::new(config.udp_rx_port(), tx_addr, tcp_addr)
        .expect("failed to bind OSC UDP receive socket");
    transport.set_user(cli.user);
    transport.set_framing(config.framing_mode());
    transport.set_use_tcp(cli.tcp);

    // One second of audio at a typical 44.1 kHz device is comfortably above
    // both analysis windows (4096 and 2048 samples).
    let mut core = Core::new(&config, 44_100, cli.bpm_templates);
    let mut observer = NullObserver;

    let (capture_tx, capture_rx) = unbounded();
    let _capture_thread = spawn_capture(capture_tx);

    let mut scheduler = s2l_core::Scheduler::new();
    let start = Instant::now();
    let mut last_tick = start;

    loop {
        let incoming = transport.tick(Instant::now());
        for packet in incoming {
            if let OscPacket::Message(message) = packet {
                let now_seconds = start.elapsed().as_secs_f64();
                core.handle_incoming(&message, now_seconds, &mut transport);
            }
        }

        drain_capture(&capture_rx, &mut core);

        let now = Instant::now();
        let elapsed = now.duration_since(last_tick);
        last_tick = now;
        for tick in scheduler.advance(elapsed) {
            match tick {
                s2l_core::Tick::Analysis => {
                    core.analysis_tick(&mut transport, &mut observer);
                }
                s2l_core::Tick::Bpm => core.bpm_tick(&mut transport),
                s2l_core::Tick::LevelFeedback => core.level_feedback_tick(&mut transport),
            }
        }

        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}
