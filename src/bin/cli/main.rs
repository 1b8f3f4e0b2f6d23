mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "studydesk", about = "Study assistant: subjects, material, AI summaries and flashcards", version)]
struct Cli {
    /// Config file (default: <config dir>/studydesk/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Session file (default: from config, or <data dir>/studydesk/session.json)
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current subject, its deck and the API key status
    Status,

    /// List all subjects
    Subjects,

    /// Create a subject and switch to it
    Create {
        name: String,
    },

    /// Switch to another subject
    Select {
        name: String,
    },

    /// Rename a subject
    Rename {
        old: String,
        new: String,
    },

    /// Add PDF (.pdf) or slide (.pptx) files to a subject's material
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Target subject (default: current)
        #[arg(long)]
        subject: Option<String>,
    },

    /// Print a subject's material
    Material {
        #[arg(long)]
        subject: Option<String>,
    },

    /// Replace a subject's material with the given text (use "-" to read from stdin)
    Edit {
        text: Option<String>,
        #[arg(long)]
        subject: Option<String>,
    },

    /// Clear a subject's material (run twice to confirm)
    Clear {
        #[arg(long)]
        subject: Option<String>,
    },

    /// Summarize the material
    Summary {
        #[arg(long)]
        subject: Option<String>,
    },

    /// Generate a quiz from the material
    Quiz {
        #[arg(long)]
        subject: Option<String>,
    },

    /// Ask a free question
    Ask {
        question: String,
        #[arg(long)]
        subject: Option<String>,
    },

    /// Show the chat history
    History {
        #[arg(long)]
        subject: Option<String>,
    },

    /// Generate and review flashcards
    #[command(subcommand)]
    Flashcards(FlashcardsCommand),

    /// Read text aloud (default: the latest assistant reply)
    Speak {
        text: Option<String>,
        #[arg(long)]
        subject: Option<String>,
    },
}

#[derive(Subcommand)]
enum FlashcardsCommand {
    /// Generate a new deck from the material, replacing the old one
    Generate {
        /// Number of cards (default: flashcard_count from config)
        #[arg(long)]
        count: Option<usize>,
        #[arg(long)]
        subject: Option<String>,
    },

    /// Show the current card's question
    Show {
        #[arg(long)]
        subject: Option<String>,
    },

    /// Show the current card's answer
    Reveal {
        #[arg(long)]
        subject: Option<String>,
    },

    /// Rate the current card and move to the next
    Mark {
        outcome: MarkOutcome,
        #[arg(long)]
        subject: Option<String>,
    },

    /// Start the deck over from the first card
    Restart {
        #[arg(long)]
        subject: Option<String>,
    },

    /// Show deck progress
    Status {
        #[arg(long)]
        subject: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum MarkOutcome {
    Remembered,
    Forgot,
}

/// Read content from stdin if piped, or resolve "-" as stdin
fn resolve_content(content: Option<String>) -> Option<String> {
    match content.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf).ok();
            Some(buf)
        }
        Some(_) => content,
        None => {
            if !stdin_is_tty() {
                let mut buf = String::new();
                std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf).ok();
                if buf.is_empty() { None } else { Some(buf) }
            } else {
                None
            }
        }
    }
}

/// Check if stdin is a terminal (not piped)
fn stdin_is_tty() -> bool {
    unsafe { libc_isatty(0) != 0 }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();
    let format = &cli.format;

    let mut app = app::App::new(cli.config.as_deref(), cli.session.clone())?;

    match cli.command {
        Command::Status => commands::subjects::run_status(&app, format, use_color)?,
        Command::Subjects => commands::subjects::run_list(&app, format, use_color)?,
        Command::Create { name } => commands::subjects::run_create(&mut app, &name, format)?,
        Command::Select { name } => commands::subjects::run_select(&mut app, &name, format)?,
        Command::Rename { old, new } => {
            commands::subjects::run_rename(&mut app, &old, &new, format)?
        }
        Command::Upload { files, subject } => {
            commands::material::run_upload(&mut app, &files, subject.as_deref(), format)?
        }
        Command::Material { subject } => {
            commands::material::run_show(&app, subject.as_deref(), format, use_color)?
        }
        Command::Edit { text, subject } => {
            let content = resolve_content(text);
            commands::material::run_edit(&mut app, content, subject.as_deref(), format)?
        }
        Command::Clear { subject } => {
            commands::material::run_clear(&mut app, subject.as_deref(), format)?
        }
        Command::Summary { subject } => commands::study::run_summary(
            &mut app,
            subject.as_deref(),
            format,
        )?,
        Command::Quiz { subject } => {
            commands::study::run_quiz(&mut app, subject.as_deref(), format)?
        }
        Command::Ask { question, subject } => {
            commands::study::run_ask(&mut app, &question, subject.as_deref(), format)?
        }
        Command::History { subject } => {
            commands::study::run_history(&app, subject.as_deref(), format, use_color)?
        }
        Command::Flashcards(subcmd) => match subcmd {
            FlashcardsCommand::Generate { count, subject } => {
                commands::flashcards::run_generate(&mut app, count, subject.as_deref(), format)?
            }
            FlashcardsCommand::Show { subject } => {
                commands::flashcards::run_show(&app, subject.as_deref(), false, format, use_color)?
            }
            FlashcardsCommand::Reveal { subject } => {
                commands::flashcards::run_show(&app, subject.as_deref(), true, format, use_color)?
            }
            FlashcardsCommand::Mark { outcome, subject } => {
                commands::flashcards::run_mark(&mut app, outcome, subject.as_deref(), format)?
            }
            FlashcardsCommand::Restart { subject } => {
                commands::flashcards::run_restart(&mut app, subject.as_deref(), format)?
            }
            FlashcardsCommand::Status { subject } => {
                commands::flashcards::run_status(&app, subject.as_deref(), format)?
            }
        },
        Command::Speak { text, subject } => {
            commands::speak::run(&app, resolve_content(text), subject.as_deref(), format)?
        }
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
