use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use gemini_pilot::batch::{BatchOptions, BatchRunner, parse_prompts};
use gemini_pilot::chat::DomChatClient;
use gemini_pilot::dataurl;
use gemini_pilot::dom::{FakePage, GenerationScript, PageBuilder, ScriptedReply};
use gemini_pilot::messaging::MockMessageSender;
use gemini_pilot::models::{ChatMode, Locale, WaitOptions};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "gemini-pilot")]
#[command(about = "Run image generation batches against a simulated Gemini page")]
struct CliArgs {
    /// Prompt to run; repeat the flag for multiple prompts.
    #[arg(long = "prompt", value_name = "TEXT")]
    prompts: Vec<String>,

    /// File with one prompt per line. Blank lines and lines starting
    /// with '#' are skipped.
    #[arg(long, value_name = "FILE")]
    prompts_file: Option<PathBuf>,

    /// Reference image uploaded once before the batch; repeat the flag
    /// for more.
    #[arg(long = "reference-image", value_name = "FILE")]
    reference_images: Vec<PathBuf>,

    /// Project folder for downloaded images.
    #[arg(long, default_value = "batch")]
    project: String,

    /// Instruction sent as a plain first turn before the batch.
    #[arg(long, value_name = "TEXT")]
    system_prompt: Option<String>,

    /// Chat mode to switch to before running.
    #[arg(long, value_name = "MODE", value_parser = parse_mode_arg)]
    mode: Option<ChatMode>,

    /// UI language of the simulated page.
    #[arg(long, value_name = "LOCALE", default_value = "ko", value_parser = parse_locale_arg)]
    page_locale: Locale,

    /// Per-prompt wait timeout in milliseconds.
    #[arg(long, default_value_t = 120_000)]
    timeout_ms: u64,

    /// Poll interval in milliseconds.
    #[arg(long, default_value_t = 1_000)]
    poll_interval_ms: u64,

    /// Polls a simulated turn takes to settle.
    #[arg(long, default_value_t = 3)]
    generation_polls: usize,

    /// Images attached to each simulated response.
    #[arg(long, default_value_t = 1)]
    images_per_prompt: usize,

    /// Keep going when a prompt fails.
    #[arg(long)]
    continue_on_error: bool,

    /// Write the JSON report here instead of stdout.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

fn parse_mode_arg(input: &str) -> std::result::Result<ChatMode, String> {
    match input.to_ascii_lowercase().as_str() {
        "fast" => Ok(ChatMode::Fast),
        "thinking" => Ok(ChatMode::Thinking),
        "pro" => Ok(ChatMode::Pro),
        _ => Err(format!(
            "Invalid mode '{}'. Expected fast, thinking or pro",
            input
        )),
    }
}

fn parse_locale_arg(input: &str) -> std::result::Result<Locale, String> {
    match input.to_ascii_lowercase().as_str() {
        "ko" => Ok(Locale::Ko),
        "en" => Ok(Locale::En),
        _ => Err(format!("Invalid locale '{}'. Expected ko or en", input)),
    }
}

fn collect_prompts(args: &CliArgs) -> Result<Vec<String>> {
    let mut prompts = Vec::new();
    if let Some(path) = &args.prompts_file {
        let contents = fs::read_to_string(path)?;
        prompts.extend(
            parse_prompts(&contents)
                .into_iter()
                .filter(|line| !line.starts_with('#')),
        );
    }
    prompts.extend(args.prompts.iter().cloned());
    Ok(prompts)
}

fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Reads reference images and re-encodes them as data urls, the form
/// the message channel carries them in.
fn collect_reference_data_urls(paths: &[PathBuf]) -> Result<Vec<String>> {
    paths
        .iter()
        .map(|path| {
            let bytes = fs::read(path)?;
            Ok(dataurl::to_data_url(mime_for_path(path), &bytes))
        })
        .collect()
}

/// One scripted reply per upcoming turn: a plain acknowledgement for
/// the system prompt, then an image-bearing reply per batch prompt.
fn build_script(args: &CliArgs, prompt_count: usize) -> GenerationScript {
    let mut script = GenerationScript::new(args.generation_polls);
    if args.system_prompt.is_some() {
        script = script.reply(ScriptedReply::text("Understood."));
    }
    for turn in 1..=prompt_count {
        script = script.reply(
            ScriptedReply::text(format!("Simulated image response {}", turn))
                .with_images(args.images_per_prompt),
        );
    }
    script
}

fn build_page(args: &CliArgs, prompt_count: usize) -> FakePage {
    PageBuilder::gemini_app(args.page_locale)
        .script(build_script(args, prompt_count))
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_pilot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let prompts = collect_prompts(&args)?;
    if prompts.is_empty() {
        error!("No prompts given. Use --prompt or --prompts-file.");
        std::process::exit(1);
    }

    info!(
        "Starting gemini-pilot against a simulated {} page ({} prompts)",
        args.page_locale.as_str(),
        prompts.len()
    );

    let page = build_page(&args, prompts.len());
    let sender = MockMessageSender::new();
    let client = DomChatClient::new(page.document(), page.window())
        .with_message_sender(Arc::new(sender.clone()));
    let runner = BatchRunner::new(Box::new(client));

    let mut options = BatchOptions::new(args.project.clone(), prompts).with_wait(
        WaitOptions::new()
            .with_timeout_ms(args.timeout_ms)
            .with_poll_interval_ms(args.poll_interval_ms),
    );
    if let Some(system_prompt) = args.system_prompt.clone() {
        options = options.with_system_prompt(system_prompt);
    }
    if let Some(mode) = args.mode {
        options = options.with_mode(mode);
    }
    if args.continue_on_error {
        options = options.with_continue_on_error();
    }
    if !args.reference_images.is_empty() {
        let data_urls = collect_reference_data_urls(&args.reference_images)?;
        options = options.with_reference_data_urls(&data_urls)?;
    }

    match runner.run(&options).await {
        Ok(report) => {
            info!(
                "Requested {} image downloads over the message channel",
                sender.get_send_count()
            );

            let json = serde_json::to_string_pretty(&report)?;
            match &args.report {
                Some(path) => {
                    fs::write(path, &json)?;
                    info!("Wrote report to {}", path.display());
                }
                None => println!("{}", json),
            }

            if report.failed > 0 {
                error!("{} prompts failed", report.failed);
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            error!("Batch failed during setup: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_arg() {
        assert_eq!(parse_mode_arg("thinking").unwrap(), ChatMode::Thinking);
        assert_eq!(parse_mode_arg("PRO").unwrap(), ChatMode::Pro);
        let err = parse_mode_arg("turbo").unwrap_err();
        assert!(err.contains("fast, thinking or pro"));
    }

    #[test]
    fn test_parse_locale_arg() {
        assert_eq!(parse_locale_arg("ko").unwrap(), Locale::Ko);
        assert_eq!(parse_locale_arg("EN").unwrap(), Locale::En);
        assert!(parse_locale_arg("fr").is_err());
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("ref.PNG")), "image/png");
        assert_eq!(mime_for_path(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_collect_reference_data_urls_encodes_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.png");
        fs::write(&path, [0x89, 0x50, 0x4E, 0x47]).unwrap();

        let urls = collect_reference_data_urls(&[path]).unwrap();
        assert_eq!(urls, vec!["data:image/png;base64,iVBORw=="]);
    }

    #[test]
    fn test_collect_prompts_merges_file_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.txt");
        fs::write(&path, "# comment\nfirst prompt\n\n  second prompt  \n").unwrap();

        let args = CliArgs::parse_from([
            "gemini-pilot",
            "--prompts-file",
            path.to_str().unwrap(),
            "--prompt",
            "third prompt",
        ]);
        let prompts = collect_prompts(&args).unwrap();
        assert_eq!(prompts, vec!["first prompt", "second prompt", "third prompt"]);
    }

    #[test]
    fn test_build_script_accounts_for_system_prompt() {
        let args = CliArgs::parse_from([
            "gemini-pilot",
            "--prompt",
            "one",
            "--system-prompt",
            "style guide",
        ]);
        // One acknowledgement turn plus one per prompt.
        let script = build_script(&args, 2);
        assert_eq!(script.replies.len(), 3);
    }
}
