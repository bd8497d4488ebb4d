//! `bia talk` — local interactive chat loop.
//!
//! Reads `apikey.txt`, `bio.txt`, and `memory.txt` from the working
//! directory and writes a per-run transcript under `logs/`. Context is
//! held in process memory only; `memory.txt` is the durable part and
//! feeds the system prompt on every rebuild.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};

use bia_agent::engine::{BLANK_FALLBACK, REMEMBER_ACK, REMEMBER_EMPTY, parse_remember};
use bia_agent::session::MEMORY_SEPARATOR;
use bia_config::AppConfig;
use bia_core::provider::Provider;
use bia_core::types::{ChatTurn, Role};
use bia_providers::OpenAiCompatProvider;

/// Raw turns kept in context; a user and an assistant message count one each.
const MAX_CONTEXT_TURNS: usize = 40;
const SESSION_ID: &str = "talk";
const API_KEY_FILE: &str = "apikey.txt";
const BIO_FILE: &str = "bio.txt";
const MEMORY_FILE: &str = "memory.txt";
const LOG_DIR: &str = "logs";
const GOODBYE_WORDS: [&str; 3] = ["exit", "quit", "bye"];

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let api_key = resolve_api_key(config.openai_api_key.clone(), Path::new(API_KEY_FILE))?;
    let provider = OpenAiCompatProvider::openai(Some(api_key));

    let bio = read_optional(Path::new(BIO_FILE));
    let mut system_prompt = build_system_prompt(
        &config.base_prompt,
        bio.as_deref(),
        read_optional(Path::new(MEMORY_FILE)).as_deref(),
    );

    let mut transcript = Transcript::open(Path::new(LOG_DIR))?;
    transcript.line(&format!("=== SESSION START {} ===", transcript.stamp()))?;
    transcript.line("SYSTEM: loaded apikey.txt + bio.txt + memory.txt")?;

    println!("Bia is awake.");
    println!("Type normally to chat.");
    println!("Commands:");
    println!("  /remember <note>   (saves to memory.txt + applies immediately)");
    println!("  exit               (goodbye ritual + saves log)");
    println!("Logs will save to: {}", transcript.path().display());

    let stdin = io::stdin();
    let mut turns: Vec<ChatTurn> = Vec::new();

    loop {
        let Some(input) = prompt_line(&stdin, "You: ")? else {
            transcript.line(&format!("=== SESSION END {} ===", now_stamp()))?;
            break;
        };
        let input = input.trim().to_string();
        if input.is_empty() {
            continue;
        }

        if let Some(note) = parse_remember(&input) {
            if note.is_empty() {
                println!("Bia: {REMEMBER_EMPTY}");
            } else {
                append_memory_line(Path::new(MEMORY_FILE), note)?;
                // Rebuild so the note applies to the very next turn.
                system_prompt = build_system_prompt(
                    &config.base_prompt,
                    bio.as_deref(),
                    read_optional(Path::new(MEMORY_FILE)).as_deref(),
                );
                println!("Bia: {REMEMBER_ACK}");
                transcript.line(&format!("You: {input}"))?;
                transcript.line(&format!("Bia: (saved to memory.txt) {note}"))?;
            }
            continue;
        }

        if GOODBYE_WORDS.contains(&input.to_lowercase().as_str()) {
            transcript.line(&format!("You: {input}"))?;
            goodbye(
                &provider,
                &config.model,
                &system_prompt,
                &turns,
                &stdin,
                &mut transcript,
            )
            .await?;
            break;
        }

        transcript.line(&format!("You: {input}"))?;
        turns.push(ChatTurn::new(SESSION_ID, Role::User, &input, Utc::now()));
        trim_context(&mut turns);

        match provider.complete(&config.model, &system_prompt, &turns).await {
            Ok(output) => {
                let reply = presentable(&output);
                println!("Bia: {reply}");
                transcript.line(&format!("Bia: {reply}"))?;
                transcript.line("")?;
                turns.push(ChatTurn::new(SESSION_ID, Role::Assistant, &reply, Utc::now()));
                trim_context(&mut turns);
            }
            Err(e) => {
                eprintln!("[error] {e}");
            }
        }
    }

    Ok(())
}

/// Exit ritual: one last line from the user, one final completion that
/// stays outside turn accounting, then the session-end marker.
async fn goodbye(
    provider: &OpenAiCompatProvider,
    model: &str,
    system_prompt: &str,
    turns: &[ChatTurn],
    stdin: &io::Stdin,
    transcript: &mut Transcript,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Bia: Before you go, leave me one last line.");
    let farewell = prompt_line(stdin, "You (goodbye): ")?.unwrap_or_default();
    let farewell = farewell.trim().to_string();
    transcript.line(&format!("You (goodbye): {farewell}"))?;

    let mut context = turns.to_vec();
    context.push(ChatTurn::new(
        SESSION_ID,
        Role::User,
        format!(
            "I'm leaving now. Here is my goodbye: {farewell}\n\
             Say a warm goodbye back in your own voice, then sign off."
        ),
        Utc::now(),
    ));

    match provider.complete(model, system_prompt, &context).await {
        Ok(output) => {
            let reply = presentable(&output);
            println!("Bia: {reply}");
            transcript.line(&format!("Bia: {reply}"))?;
        }
        Err(e) => {
            eprintln!("[error] {e}");
        }
    }

    transcript.line(&format!("=== SESSION END {} ===", now_stamp()))?;
    Ok(())
}

/// The API key comes from `OPENAI_API_KEY` (already folded into config)
/// or `apikey.txt`; the loop refuses to start without one.
fn resolve_api_key(
    from_config: Option<String>,
    key_file: &Path,
) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(key) = from_config.filter(|k| !k.trim().is_empty()) {
        return Ok(key);
    }
    if let Some(key) = read_optional(key_file) {
        return Ok(key);
    }
    Err(format!(
        "API key missing.\n\
         Set OPENAI_API_KEY or put your key in {API_KEY_FILE} (one line, no quotes)."
    )
    .into())
}

/// Base persona, then the bio section and the memory section when the
/// corresponding file has content.
fn build_system_prompt(base: &str, bio: Option<&str>, memory: Option<&str>) -> String {
    let mut prompt = base.to_string();
    if let Some(bio) = bio {
        prompt.push_str("\n\n=== BIO ===\n");
        prompt.push_str(bio);
    }
    if let Some(memory) = memory {
        prompt.push_str(MEMORY_SEPARATOR);
        prompt.push('\n');
        prompt.push_str(memory);
    }
    prompt
}

fn read_optional(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn append_memory_line(path: &Path, note: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "- {note}")
}

fn trim_context(turns: &mut Vec<ChatTurn>) {
    if turns.len() > MAX_CONTEXT_TURNS {
        turns.drain(..turns.len() - MAX_CONTEXT_TURNS);
    }
}

fn presentable(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        BLANK_FALLBACK.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Print a prompt, read one line. `None` means EOF.
fn prompt_line(stdin: &io::Stdin, prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if stdin.lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

fn now_stamp() -> String {
    Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Per-run transcript file under `logs/`.
struct Transcript {
    path: PathBuf,
    file: File,
    stamp: String,
}

impl Transcript {
    fn open(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let stamp = now_stamp();
        let path = dir.join(format!("log_{stamp}.txt"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file, stamp })
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.file, "{text}")
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn stamp(&self) -> &str {
        &self.stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_with_all_sections() {
        let prompt = build_system_prompt(
            "You are Bia. Stay in voice.",
            Some("we met in spring"),
            Some("- likes tea"),
        );
        assert!(prompt.starts_with("You are Bia. Stay in voice."));
        assert!(prompt.contains("=== BIO ===\nwe met in spring"));
        assert!(prompt.contains("=== MEMORY (persistent notes) ===\n- likes tea"));
    }

    #[test]
    fn system_prompt_without_files_is_just_the_base() {
        let prompt = build_system_prompt("You are Bia. Stay in voice.", None, None);
        assert_eq!(prompt, "You are Bia. Stay in voice.");
    }

    #[test]
    fn memory_lines_accumulate_as_bullets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.txt");

        append_memory_line(&path, "likes tea").unwrap();
        append_memory_line(&path, "hates mornings").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "- likes tea\n- hates mornings\n");
    }

    #[test]
    fn context_keeps_only_the_newest_turns() {
        let mut turns: Vec<ChatTurn> = (0..50)
            .map(|i| ChatTurn::new(SESSION_ID, Role::User, format!("m{i}"), Utc::now()))
            .collect();
        trim_context(&mut turns);
        assert_eq!(turns.len(), MAX_CONTEXT_TURNS);
        assert_eq!(turns[0].content, "m10");
        assert_eq!(turns.last().unwrap().content, "m49");
    }

    #[test]
    fn transcript_writes_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut transcript = Transcript::open(dir.path()).unwrap();
        transcript.line("You: hello").unwrap();
        transcript.line("Bia: hi there").unwrap();

        let contents = std::fs::read_to_string(transcript.path()).unwrap();
        assert_eq!(contents, "You: hello\nBia: hi there\n");
    }

    #[test]
    fn api_key_prefers_config_then_file() {
        let dir = tempfile::tempdir().unwrap();
        let key_file = dir.path().join("apikey.txt");
        std::fs::write(&key_file, "sk-from-file\n").unwrap();

        let key = resolve_api_key(Some("sk-from-env".into()), &key_file).unwrap();
        assert_eq!(key, "sk-from-env");

        let key = resolve_api_key(None, &key_file).unwrap();
        assert_eq!(key, "sk-from-file");
    }

    #[test]
    fn missing_key_everywhere_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_api_key(None, &dir.path().join("apikey.txt")).unwrap_err();
        assert!(err.to_string().contains("API key missing"));
    }
}
