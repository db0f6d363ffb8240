//! Interactive session shell (`rag chat`).
//!
//! Reads one line at a time from stdin. Lines starting with `/` are shell
//! commands; anything else is asked as a question.
//!
//! | Command | Effect |
//! |---------|--------|
//! | `/upload <file>...` | queue PDFs and index the batch; indexed files then leave the queue |
//! | `/files` | list queued files |
//! | `/remove <id>` | drop a queued file (id prefix is enough) |
//! | `/paste <title>` | read content until a line with a single `.`, then submit |
//! | `/mode file\|text\|chat` | switch the active workflow |
//! | `/retry` | probe the server again |
//! | `/status` | show connection, workflow and last status |
//! | `/history` | print the transcript |
//! | `/quit` | leave |

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::backend::RagBackend;
use crate::config::Config;
use crate::ingest::PendingFile;
use crate::progress::ProgressMode;
use crate::render::{connection_banner, render_items, render_message, render_transcript};
use crate::session::{Session, Workflow};

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Ask(String),
    Upload(Vec<String>),
    Files,
    Remove(String),
    Paste(String),
    Mode(Workflow),
    Retry,
    Status,
    History,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ShellCommand::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return ShellCommand::Ask(line.to_string());
        };

        let (cmd, arg) = match rest.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (rest, ""),
        };

        match cmd {
            "upload" if !arg.is_empty() => {
                ShellCommand::Upload(arg.split_whitespace().map(str::to_string).collect())
            }
            "upload" => ShellCommand::Invalid("usage: /upload <file.pdf>...".into()),
            "files" => ShellCommand::Files,
            "remove" if !arg.is_empty() => ShellCommand::Remove(arg.to_string()),
            "remove" => ShellCommand::Invalid("usage: /remove <id>".into()),
            "paste" => ShellCommand::Paste(arg.to_string()),
            "mode" => match arg.parse::<Workflow>() {
                Ok(w) => ShellCommand::Mode(w),
                Err(e) => ShellCommand::Invalid(e),
            },
            "retry" => ShellCommand::Retry,
            "status" => ShellCommand::Status,
            "history" => ShellCommand::History,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            other => ShellCommand::Invalid(format!("unknown command '/{}'; try /help", other)),
        }
    }
}

pub async fn run_chat(config: &Config, backend: Arc<dyn RagBackend>) -> Result<()> {
    let mut session = Session::new(config, backend);
    let progress = ProgressMode::default_for_tty();

    println!("RAG Assistant ({})", config.server.base_url);
    let health = session.check_connection().await;
    println!("{}", health);
    if let Some(banner) = connection_banner(health) {
        println!("{}", banner);
    }
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("[{} | {}]> ", session.workflow(), session.health());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ShellCommand::parse(&line) {
            ShellCommand::Empty => {}
            ShellCommand::Quit => break,
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Invalid(msg) => println!("{}", msg),
            ShellCommand::Retry => {
                let health = session.check_connection().await;
                println!("{}", health);
                if let Some(banner) = connection_banner(health) {
                    println!("{}", banner);
                }
            }
            ShellCommand::Status => {
                println!("connection: {}", session.health());
                println!("workflow:   {}", session.workflow());
                if !session.status().is_empty() {
                    println!("status:     {}", session.status());
                }
                if let Some(err) = session.last_error() {
                    println!("last error: {}", err);
                }
            }
            ShellCommand::Mode(workflow) => session.select_workflow(workflow),
            ShellCommand::History => print!("{}", render_transcript(&session.transcript())),
            ShellCommand::Files => print!("{}", render_items(&session.pipeline().views())),
            ShellCommand::Remove(prefix) => remove_by_prefix(&mut session, &prefix),
            ShellCommand::Upload(paths) => {
                session.select_workflow(Workflow::IngestFile);
                let files = paths.iter().filter_map(|p| match PendingFile::from_path(p) {
                    Ok(f) => Some(f),
                    Err(e) => {
                        println!("cannot open {}: {}", p, e);
                        None
                    }
                });
                let queued = session.enqueue_files(files.collect::<Vec<_>>());
                if queued.is_empty() {
                    println!("No PDF files queued.");
                    continue;
                }
                match session.index_files(progress.reporter().as_ref()).await {
                    Ok(_) => {
                        print!("{}", render_items(&session.pipeline().views()));
                        session.clear_indexed_files();
                    }
                    Err(e) => println!("{}", e),
                }
                println!("{}", session.status());
            }
            ShellCommand::Paste(title) => {
                session.select_workflow(Workflow::IngestText);
                println!("Paste content; finish with a line containing a single '.'");
                let content = read_block(&mut lines).await?;
                session.paste_mut().set_title(title);
                session.paste_mut().set_content(content);
                println!(
                    "{} characters, {} words",
                    session.paste().char_count(),
                    session.paste().word_count()
                );
                println!("{}", submit_paste(&mut session).await);
            }
            ShellCommand::Ask(query) => {
                session.select_workflow(Workflow::Chat);
                match session.ask(&query).await {
                    Ok(reply) => print!("{}", render_message(&reply)),
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    Ok(())
}

async fn submit_paste(session: &mut Session) -> String {
    match session.submit_paste().await {
        Ok(_) => session.status().to_string(),
        Err(e) if e.is_inline() => session.status().to_string(),
        Err(e) => e.to_string(),
    }
}

fn remove_by_prefix(session: &mut Session, prefix: &str) {
    let matches: Vec<String> = session
        .pipeline()
        .items()
        .iter()
        .filter(|item| item.id().starts_with(prefix))
        .map(|item| item.id().to_string())
        .collect();
    match matches.as_slice() {
        [id] => {
            if session.remove_file(id) {
                println!("removed {}", prefix);
            } else {
                println!("{} is uploading and cannot be removed", prefix);
            }
        }
        [] => println!("no queued file matches '{}'", prefix),
        _ => println!("'{}' is ambiguous", prefix),
    }
}

async fn read_block(lines: &mut Lines<BufReader<Stdin>>) -> Result<String> {
    let mut content = String::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == "." {
            break;
        }
        content.push_str(&line);
        content.push('\n');
    }
    Ok(content)
}

const HELP: &str = "\
/upload <file.pdf>...  queue PDFs and index them (failed ones stay queued)
/files                 list queued files
/remove <id>           remove a queued file
/paste <title>         paste text content (end with '.')
/mode file|text|chat   switch workflow
/retry                 check the server connection again
/status                show connection, last status and last error
/history               show the conversation
/quit                  exit
Anything else is sent as a question.";
