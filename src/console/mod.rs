//! Interactive console
//!
//! Thin presentation layer over the session controller: reads stdin lines,
//! dispatches commands to the controller and capture managers, and prints
//! new conversation turns as they arrive. Only one input surface (text,
//! microphone, camera) is active per turn - that policy lives here, not in
//! the controller.

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::DocumentPayload;
use crate::camera::{CameraState, VideoCapture};
use crate::session::{Phase, SessionController};
use crate::voice::{AudioRecorder, SpeechPlayer};
use crate::Result;

const HELP: &str = "\
commands:
  <text>            answer the current question
  /record           start/stop a spoken answer (stop submits)
  /camera           open the camera   /flip  switch front/back
  /snap             take a photo      /retake  discard and re-aim
  /confirm          stage the photo   /cancel  close the camera
  /attach <path>    stage a file for upload
  /drop <n>         remove staged item n
  /staged           list staged uploads
  /send             submit staged uploads
  /skip             skip the requested upload
  /replay           replay the last spoken message
  /log              reprint the whole conversation
  /reset            discard this session and start over
  /quit             exit";

/// Interactive session console
pub struct Console {
    controller: Arc<SessionController>,
    recorder: AudioRecorder,
    camera: VideoCapture,
    player: Option<Arc<SpeechPlayer>>,
    printed: usize,
}

impl Console {
    #[must_use]
    pub fn new(
        controller: Arc<SessionController>,
        camera: VideoCapture,
        player: Option<Arc<SpeechPlayer>>,
    ) -> Self {
        Self {
            controller,
            recorder: AudioRecorder::new(),
            camera,
            player,
            printed: 0,
        }
    }

    /// Run the interactive loop until the user quits or stdin closes.
    ///
    /// # Errors
    ///
    /// Returns error only for stdin IO failures; everything else is shown
    /// inline.
    pub async fn run(&mut self) -> Result<()> {
        println!("intake console - type /help for commands\n");

        self.controller.initialize().await?;
        self.flush_log();

        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();

        self.prompt();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim().to_string();
            if line.is_empty() {
                self.prompt();
                continue;
            }
            if !self.dispatch(&line).await {
                break;
            }
            self.flush_log();
            self.prompt();
        }

        self.camera.close();
        Ok(())
    }

    /// Handle one input line; returns false to exit
    async fn dispatch(&mut self, line: &str) -> bool {
        match line {
            "/quit" | "/exit" => return false,
            "/help" => println!("{HELP}"),
            "/record" => self.toggle_recording().await,
            "/camera" => self.open_camera(),
            "/flip" => {
                let result = self.camera.switch_facing();
                self.report(result.err());
            }
            "/snap" => {
                let result = self.camera.capture();
                self.report(result.err());
            }
            "/retake" => {
                let result = self.camera.retake();
                self.report(result.err());
            }
            "/confirm" => self.confirm_photo(),
            "/cancel" => {
                self.camera.close();
                println!("camera closed");
            }
            "/staged" => self.list_staged(),
            "/send" => {
                let result = self.controller.submit_documents().await;
                self.report(result.err());
            }
            "/skip" => {
                let result = self.controller.submit_skip().await;
                self.report(result.err());
            }
            "/replay" => self.replay(),
            "/log" => {
                self.printed = 0;
            }
            "/reset" => {
                let result = self.controller.reset().await;
                self.report(result.err());
            }
            _ => {
                if let Some(path) = line.strip_prefix("/attach ") {
                    self.attach(path.trim()).await;
                } else if let Some(index) = line.strip_prefix("/drop ") {
                    self.drop_staged(index.trim());
                } else if line.starts_with('/') {
                    println!("unknown command: {line} (try /help)");
                } else {
                    let result = self.controller.submit_text(line).await;
                    self.report(result.err());
                }
            }
        }
        true
    }

    async fn toggle_recording(&mut self) {
        if self.recorder.is_recording() {
            let elapsed = self.recorder.elapsed_secs().unwrap_or(0);
            match self.recorder.stop() {
                Some(Ok(recording)) => {
                    println!("recorded {elapsed}s, submitting...");
                    let result = self.controller.submit_audio(recording).await;
                    self.report(result.err());
                }
                Some(Err(e)) => println!("! could not assemble recording: {e}"),
                None => {}
            }
        } else {
            match self.recorder.start() {
                Ok(()) => println!("recording - /record again to stop and submit"),
                // microphone problems are a user notice, not a crash
                Err(e) => println!("! microphone unavailable: {e}"),
            }
        }
    }

    fn open_camera(&mut self) {
        let facing = self
            .camera
            .facing()
            .unwrap_or(crate::camera::CameraFacing::Back);
        match self.camera.open(facing) {
            Ok(()) => println!("camera live ({facing}) - /snap to capture"),
            Err(e) => println!("! camera unavailable: {e} (/cancel to dismiss)"),
        }
    }

    fn confirm_photo(&mut self) {
        if self.camera.state() != CameraState::Captured {
            println!("! nothing captured");
            return;
        }
        match self.camera.confirm() {
            Ok(photo) => {
                let staged = self.controller.stage_document(DocumentPayload::new(
                    photo.filename.clone(),
                    photo.jpeg,
                ));
                match staged {
                    Ok(()) => println!(
                        "staged {} ({}x{}) - /send to submit",
                        photo.filename, photo.width, photo.height
                    ),
                    Err(e) => println!("! {e}"),
                }
            }
            Err(e) => println!("! {e}"),
        }
    }

    async fn attach(&mut self, path: &str) {
        let filename = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                match self
                    .controller
                    .stage_document(DocumentPayload::new(filename.clone(), bytes))
                {
                    Ok(()) => println!("staged {filename} - /send to submit"),
                    Err(e) => println!("! {e}"),
                }
            }
            Err(e) => println!("! cannot read {path}: {e}"),
        }
    }

    fn drop_staged(&mut self, index: &str) {
        match index.parse::<usize>() {
            Ok(n) => self.report(self.controller.unstage_document(n).err()),
            Err(_) => println!("! /drop takes a number (see /staged)"),
        }
    }

    fn list_staged(&self) {
        let names = self.controller.staged_filenames();
        if names.is_empty() {
            println!("nothing staged");
        } else {
            for (i, name) in names.iter().enumerate() {
                println!("  {i}: {name}");
            }
        }
    }

    fn replay(&self) {
        match &self.player {
            Some(player) if player.has_latest() => player.replay(),
            _ => println!("nothing to replay"),
        }
    }

    fn report(&self, error: Option<crate::Error>) {
        if let Some(e) = error {
            println!("! {e}");
        }
    }

    /// Print conversation turns that arrived since the last flush
    fn flush_log(&mut self) {
        for line in self.controller.render_from(self.printed) {
            println!("{line}");
        }
        self.printed = self.controller.log_len();
    }

    fn prompt(&self) {
        let speaking = self
            .player
            .as_ref()
            .is_some_and(|p| p.is_speaking());
        let marker = if speaking { "🔊 " } else { "" };
        let mode = match self.controller.phase() {
            Phase::Initializing => "…",
            Phase::AwaitingText => "you",
            Phase::AwaitingUpload => "upload",
            Phase::Done => "done - /reset to start over",
            Phase::Failed => "failed - /reset to retry",
        };
        print!("{marker}[{mode}]> ");
        let _ = std::io::stdout().flush();
    }
}
