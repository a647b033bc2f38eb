use std::io::BufRead;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use crossbeam_channel::{select, tick, unbounded, Receiver};

use star_audio::audio_system::AudioManager;
use star_audio::config::AudioConfig;
use star_audio::error::AppResult;
use star_audio::logging;

const FRAME: Duration = Duration::from_millis(16);
const VOLUME_STEP: f32 = 0.1;

/// Console commands understood by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Next,
    Pause,
    Resume,
    Stop,
    Play,
    VolumeUp,
    VolumeDown,
    Mute,
    Unmute,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "next" | "n" => Some(Command::Next),
            "pause" => Some(Command::Pause),
            "resume" => Some(Command::Resume),
            "stop" => Some(Command::Stop),
            "play" => Some(Command::Play),
            "vol+" | "+" => Some(Command::VolumeUp),
            "vol-" | "-" => Some(Command::VolumeDown),
            "mute" => Some(Command::Mute),
            "unmute" => Some(Command::Unmute),
            "quit" | "q" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Read stdin on its own thread so the update loop never blocks
fn spawn_console() -> Receiver<Command> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match Command::parse(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => println!("Unknown command: {}", line.trim()),
            }
        }
        let _ = tx.send(Command::Quit);
    });
    rx
}

/// Apply one command. Returns false when the player should exit.
fn apply(audio: &mut AudioManager, command: Command) -> bool {
    match command {
        Command::Next => audio.play_next_song_in_queue(),
        Command::Pause => audio.pause_background_queue(),
        Command::Resume => audio.resume_background_queue(),
        Command::Stop => audio.stop_background_queue(),
        Command::Play => audio.play_background_queue(),
        Command::VolumeUp => audio.increase_volume(VOLUME_STEP),
        Command::VolumeDown => audio.decrease_volume(VOLUME_STEP),
        Command::Mute => audio.mute_all_music(true),
        Command::Unmute => audio.mute_all_music(false),
        Command::Quit => return false,
    }
    tracing::debug!(?command, volume = audio.get_volume(), "Applied console command");
    true
}

fn main() -> AppResult<()> {
    logging::init_tracing();
    logging::log_runtime_environment();

    let tracks: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if tracks.is_empty() {
        bail!("usage: star-audio <track> [track...]");
    }

    let config = AudioConfig::load().context("Failed to load audio configuration")?;
    tracing::info!("Audio config: {}", AudioConfig::config_path_display());

    let mut audio = AudioManager::with_default_backend(&config);
    audio.start();
    if !audio.is_started() {
        bail!("Audio engine failed to start, see the log for the failing stage");
    }

    for (index, path) in tracks.iter().enumerate() {
        let name = format!("track-{}", index + 1);
        audio.load_music(path, &name, 0);
        if audio.is_music_loaded(&name) {
            audio.add_to_background_queue(&name);
        }
    }
    if audio.background_queue_len() == 0 {
        bail!("None of the given tracks could be loaded");
    }

    println!("Playing {} track(s)", audio.background_queue_len());
    println!("Commands: next, pause, resume, stop, play, vol+, vol-, mute, unmute, quit");
    audio.play_background_queue();

    let commands = spawn_console();
    let frames = tick(FRAME);
    loop {
        select! {
            recv(commands) -> command => match command {
                Ok(command) => {
                    if !apply(&mut audio, command) {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(frames) -> _ => audio.update(),
        }
    }

    audio.stop();
    Ok(())
}
