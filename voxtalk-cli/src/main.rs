mod adapters;
mod config_store;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::adapters::{SpeakerPlayback, StdinRecognition, ToneCue};
use crate::config_store::ConfigStore;
use voxtalk_core::session::{Role, Turn};
use voxtalk_engine::backend::HttpAssistantBackend;
use voxtalk_engine::engine::ConversationEngine;

const USAGE: &str = "commands:
  <Enter>       talk (then type what you would have said)
  /text <msg>   send a typed message instead of talking
  /voice        toggle female/male synthesis voice
  /history      show the recent conversation
  /mic          level-check the default input device
  /quit         exit";

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("VOXTALK_CONFIG") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".config/voxtalk/config.json")
}

fn print_history(turns: &[Turn]) {
    if turns.is_empty() {
        println!("(no conversation yet)");
        return;
    }
    for turn in turns {
        let who = match turn.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        println!("{who:>9}: {}", turn.content.display_text());
    }
}

/// Opens the microphone for two seconds and prints a peak meter, to
/// check device access without burning a conversation turn.
fn mic_check() -> anyhow::Result<()> {
    let recorder = voxtalk_audio::AudioRecorder::open_default()?;
    recorder.set_level_callback(|chunk| {
        let peak = chunk.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        let ticks = (peak * 40.0).round() as usize;
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\rmic [{:<40}]", "#".repeat(ticks.min(40)));
        let _ = out.flush();
    });
    recorder.start()?;
    std::thread::sleep(Duration::from_secs(2));
    let captured = recorder.stop()?;
    recorder.close()?;
    println!(
        "\ncaptured {} samples at {}Hz ({} at recognizer rate)",
        captured.samples.len(),
        captured.sample_rate_hz,
        captured.for_recognizer()?.samples.len(),
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let store = ConfigStore::at_path(config_path());
    let mut cfg = store.load_or_default()?;
    if let Ok(url) = std::env::var("VOXTALK_BACKEND_URL") {
        cfg.backend_url = url;
    }
    info!("backend: {}", cfg.backend_url);

    let backend = Arc::new(HttpAssistantBackend::new(cfg.backend_url.clone()));
    let engine = Arc::new(ConversationEngine::new(
        cfg.clone(),
        backend,
        Arc::new(SpeakerPlayback::new()),
        Arc::new(StdinRecognition),
        Arc::new(ToneCue::new()),
    ));

    // Status line mirror; the watch channel coalesces rapid transitions.
    {
        let mut status = engine.subscribe();
        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let snapshot = status.borrow_and_update().clone();
                if snapshot.mic_blocked {
                    println!("[{} — microphone blocked]", snapshot.message);
                } else {
                    println!("[{}]", snapshot.message);
                }
            }
        });
    }

    println!("voxtalk — session {}", engine.session_id().as_str());
    println!("{USAGE}");
    println!("[{}]", engine.status().message);

    let stdin = std::io::stdin();
    loop {
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        if line.is_empty() {
            // Line-based host: stdin serializes us, so the engine's
            // tap-while-listening cancel can't be triggered here — the
            // next line IS the utterance. An empty line ends the attempt
            // as "nothing heard". A raw-keypress host would hold the
            // mic-click path open during capture instead.
            if let Some(outcome) = engine.handle_mic_click().await {
                if let Some(answer) = &outcome.answer {
                    println!("assistant: {answer}");
                }
            }
            continue;
        }

        match line.split_once(' ').unwrap_or((line, "")) {
            ("/text", msg) if !msg.trim().is_empty() => {
                let outcome = engine.submit_text(msg.trim()).await;
                if let Some(answer) = &outcome.answer {
                    println!("assistant: {answer}");
                }
            }
            ("/voice", _) => {
                let voice = engine.voice().toggled();
                engine.set_voice(voice);
                cfg.voice = voice;
                if let Err(e) = store.save(&cfg) {
                    log::warn!("could not persist config: {e:#}");
                }
                println!("voice: {}", voice.as_str());
            }
            ("/history", _) => print_history(&engine.recent_history()),
            ("/mic", _) => {
                if let Err(e) = mic_check() {
                    println!("mic check failed: {e:#}");
                }
            }
            ("/quit", _) => break,
            _ => println!("{USAGE}"),
        }
    }

    Ok(())
}
