//! Batch orchestration: drives a list of prompts through one chat
//! session, downloading every generated image along the way.

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio_retry::{strategy::FixedInterval, RetryIf};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chat::ChatService;
use crate::dataurl;
use crate::error::{Error, ErrorKind, Result};
use crate::filename::generate_filename;
use crate::models::{
    ChatMode, ConflictAction, DownloadOptions, FileUpload, GeminiTool, ModelResponse, WaitOptions,
};

const DEFAULT_RETRY_ATTEMPTS: usize = 1;
const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;

/// Splits a prompt blob into individual prompts: one per line, trimmed,
/// with empty lines dropped.
pub fn parse_prompts(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Everything a batch run needs up front.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Folder name for downloaded images; also the filename prefix.
    pub project_name: String,
    pub prompts: Vec<String>,
    /// Sent as a plain first turn before the batch proper.
    pub system_prompt: Option<String>,
    /// Attached to the composer before the first turn goes out.
    pub reference_images: Vec<FileUpload>,
    /// Tool to activate for the session. `None` runs a plain chat batch.
    pub tool: Option<GeminiTool>,
    pub mode: Option<ChatMode>,
    pub wait: WaitOptions,
    /// Total generation attempts per prompt, including the first.
    pub retry_attempts: usize,
    pub retry_delay_ms: u64,
    /// Keep going after a failed prompt instead of stopping the batch.
    pub continue_on_error: bool,
}

impl BatchOptions {
    pub fn new(project_name: impl Into<String>, prompts: Vec<String>) -> Self {
        Self {
            project_name: project_name.into(),
            prompts,
            system_prompt: None,
            reference_images: Vec::new(),
            tool: Some(GeminiTool::ImageGeneration),
            mode: None,
            wait: WaitOptions::default(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            continue_on_error: false,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_reference_images(mut self, reference_images: Vec<FileUpload>) -> Self {
        self.reference_images = reference_images;
        self
    }

    /// Decodes reference images supplied as data urls, the form they
    /// arrive in over the message channel. Files are named
    /// `reference-NN` with an extension taken from the mime subtype.
    pub fn with_reference_data_urls(mut self, data_urls: &[String]) -> Result<Self> {
        for (position, data_url) in data_urls.iter().enumerate() {
            let mut file = dataurl::parse_data_url(data_url, "reference")?;
            let extension = file
                .mime_type
                .split('/')
                .nth(1)
                .filter(|subtype| !subtype.is_empty())
                .unwrap_or("bin")
                .to_string();
            file.name = format!("reference-{:02}.{}", position + 1, extension);
            self.reference_images.push(file);
        }
        Ok(self)
    }

    pub fn with_mode(mut self, mode: ChatMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_tool(mut self, tool: Option<GeminiTool>) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_retries(mut self, attempts: usize, delay_ms: u64) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay_ms = delay_ms;
        self
    }

    pub fn with_continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }
}

/// What happened to one prompt.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptOutcome {
    /// 1-based position in the prompt list.
    pub index: usize,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    pub image_count: usize,
    /// Relative paths handed to the download layer.
    pub downloads: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a finished (or stopped) batch run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub session_id: Uuid,
    pub project_name: String,
    pub started_at: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_url: Option<String>,
    pub outcomes: Vec<PromptOutcome>,
    pub completed: usize,
    pub failed: usize,
}

/// Runs batches against any [`ChatService`].
pub struct BatchRunner {
    chat: Box<dyn ChatService>,
}

impl BatchRunner {
    pub fn new(chat: Box<dyn ChatService>) -> Self {
        Self { chat }
    }

    /// Runs the whole batch, returning a report even when prompts fail.
    /// Only session setup problems (new chat, mode, uploads, tool
    /// selection, system prompt) abort the run with an error.
    pub async fn run(&self, options: &BatchOptions) -> Result<BatchReport> {
        let session_id = Uuid::new_v4();
        let started_at = Local::now();
        let total = options.prompts.len();
        info!(
            "Starting batch {} for project '{}' ({} prompts)",
            session_id, options.project_name, total
        );

        self.prepare(options).await?;

        let mut outcomes = Vec::with_capacity(total);
        let mut image_counter = 0;

        for (position, prompt) in options.prompts.iter().enumerate() {
            let index = position + 1;

            if options.wait.is_cancelled() {
                warn!("Batch cancelled before prompt {}/{}", index, total);
                outcomes.push(PromptOutcome {
                    index,
                    prompt: prompt.clone(),
                    response_text: None,
                    image_count: 0,
                    downloads: Vec::new(),
                    error: Some("cancelled".to_string()),
                });
                break;
            }

            info!("[{}/{}] Generating: {}", index, total, prompt);
            match self.generate_with_retry(prompt, options).await {
                Ok(response) => {
                    let (downloads, download_error) = self
                        .download_response_images(&response, prompt, options, &mut image_counter)
                        .await;
                    info!(
                        "[{}/{}] Completed with {} images",
                        index,
                        total,
                        response.images.len()
                    );
                    outcomes.push(PromptOutcome {
                        index,
                        prompt: prompt.clone(),
                        response_text: Some(response.text),
                        image_count: response.images.len(),
                        downloads,
                        error: download_error,
                    });
                }
                Err(e) => {
                    error!("[{}/{}] Generation failed: {}", index, total, e);
                    outcomes.push(PromptOutcome {
                        index,
                        prompt: prompt.clone(),
                        response_text: None,
                        image_count: 0,
                        downloads: Vec::new(),
                        error: Some(e.to_string()),
                    });
                    if options.wait.is_cancelled() || !options.continue_on_error {
                        warn!("Stopping batch after failed prompt {}", index);
                        break;
                    }
                }
            }
        }

        let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
        let completed = outcomes.len() - failed;
        info!(
            "Batch {} finished: {} completed, {} failed",
            session_id, completed, failed
        );

        Ok(BatchReport {
            session_id,
            project_name: options.project_name.clone(),
            started_at,
            conversation_url: self.chat.conversation_url(),
            outcomes,
            completed,
            failed,
        })
    }

    async fn prepare(&self, options: &BatchOptions) -> Result<()> {
        self.chat.start_new_chat()?;

        if let Some(mode) = options.mode {
            self.chat.switch_mode(mode)?;
            info!("Switched to {} mode", mode.as_str());
        }

        if let Some(tool) = options.tool {
            self.chat.select_tool(tool)?;
            info!("Selected {} tool", tool.as_str());
        }

        if !options.reference_images.is_empty() {
            let uploaded = self.chat.upload_files(&options.reference_images)?;
            info!("Attached {} reference images", uploaded.len());
        }

        if let Some(system_prompt) = &options.system_prompt {
            info!("Sending system prompt ({} chars)", system_prompt.len());
            self.chat.generate(system_prompt, &options.wait).await?;
        }

        Ok(())
    }

    async fn generate_with_retry(
        &self,
        prompt: &str,
        options: &BatchOptions,
    ) -> Result<ModelResponse> {
        let attempts = options.retry_attempts.max(1);
        let retry_strategy =
            FixedInterval::from_millis(options.retry_delay_ms).take(attempts - 1);

        RetryIf::spawn(
            retry_strategy,
            move || async move {
                match self.chat.generate(prompt, &options.wait).await {
                    Ok(response) => Ok(response),
                    Err(e) => {
                        warn!("Generation attempt failed: {}. Will retry...", e);
                        Err(e)
                    }
                }
            },
            // An aborted turn stays aborted; retrying it would just
            // burn the remaining attempts against the cancel flag.
            |error: &Error| error.kind() != ErrorKind::InvalidState,
        )
        .await
    }

    /// Downloads every image in a response. Failures are collected
    /// rather than propagated so one bad download does not lose the
    /// rest of the response.
    async fn download_response_images(
        &self,
        response: &ModelResponse,
        prompt: &str,
        options: &BatchOptions,
        image_counter: &mut usize,
    ) -> (Vec<String>, Option<String>) {
        let mut saved = Vec::new();
        let mut failure = None;

        for image in &response.images {
            *image_counter += 1;
            let filename = generate_filename(&options.project_name, *image_counter, prompt);
            let download = DownloadOptions {
                filename: Some(filename.clone()),
                conflict_action: ConflictAction::Uniquify,
            };
            match self.chat.download_image(image, &download).await {
                Ok(()) => {
                    info!("Saved image to {}", filename);
                    saved.push(filename);
                }
                Err(e) => {
                    error!("Failed to download image {}: {}", image.index, e);
                    failure.get_or_insert_with(|| e.to_string());
                }
            }
        }

        (saved, failure)
    }
}
