//! `sharenote` command-line front end.
//!
//! # Responsibility
//! - Load settings, start logging and open the configured store.
//! - Run one note or account operation per invocation.
//!
//! # Invariants
//! - A store that fails to open is fatal: nothing runs and the exit code
//!   is 1.
//! - Each invocation starts from an anonymous session.

use clap::{Parser, Subcommand};
use log::error;
use sharenote_core::settings::{DEFAULT_CONFIG_FILE, ENV_PREFIX};
use sharenote_core::{
    init_from_settings, open_backend, AppError, AppPolicy, Backend, NoteId, RequestOrigin,
    Session, Settings, ShareNoteApp, Store,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sharenote")]
#[command(about = "Create and share short text notes", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file; missing files fall back to defaults.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Origin used to print share and raw links.
    #[arg(long, global = true, default_value = "http://localhost:3000")]
    origin: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show backend and collection sizes
    Status,
    /// Register a new account
    Register { username: String, password: String },
    /// Create a note, as a guest unless credentials are given
    Create {
        text: String,
        #[arg(short, long, requires = "password")]
        user: Option<String>,
        #[arg(short, long, requires = "user")]
        password: Option<String>,
    },
    /// Print a note with its links
    Show { id: String },
    /// Print only the note content
    Raw { id: String },
    /// List the notes owned by an account
    List { username: String, password: String },
    /// Delete a note owned by an account
    Delete {
        id: String,
        username: String,
        password: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load_with(Some(cli.config.as_path()), ENV_PREFIX) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("sharenote: {err}");
            return ExitCode::from(1);
        }
    };
    if let Err(err) = init_from_settings(&settings.logging) {
        eprintln!("sharenote: logging disabled: {err}");
    }

    let origin = match RequestOrigin::parse(&cli.origin) {
        Ok(origin) => origin,
        Err(err) => {
            eprintln!("sharenote: --origin: {err}");
            return ExitCode::from(1);
        }
    };

    let store = match open_backend(&settings).and_then(Store::open) {
        Ok(store) => store,
        Err(err) => {
            error!("event=cli_start module=cli status=error error={}", err);
            eprintln!(
                "sharenote: cannot open store at {}: {err}",
                settings.storage.path.display()
            );
            return ExitCode::from(1);
        }
    };

    let mut app = ShareNoteApp::with_defaults(store, AppPolicy::from(&settings));
    match run(&mut app, cli.command, &origin) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sharenote: {} error: {err}", err.kind());
            ExitCode::from(2)
        }
    }
}

fn run<B: Backend>(
    app: &mut ShareNoteApp<B>,
    command: Command,
    origin: &RequestOrigin,
) -> Result<(), AppError> {
    let mut session = Session::anonymous();

    match command {
        Command::Status => {
            let status = app.status();
            println!("backend={}", status.backend);
            println!("users={}", status.users);
            println!("notes={}", status.notes);
        }
        Command::Register { username, password } => {
            let id = app.register(&username, &password, &password)?;
            println!("registered {username} ({id})");
        }
        Command::Create {
            text,
            user,
            password,
        } => {
            if let (Some(user), Some(password)) = (user, password) {
                app.login(&mut session, &user, &password)?;
            }
            let created = app.create_note(&session, &text, origin)?;
            println!("id={}", created.id);
            println!("share={}", created.share_link);
            println!("raw={}", created.raw_link);
        }
        Command::Show { id } => {
            let view = app.view_note(&NoteId::new(id), origin)?;
            println!("id={}", view.note.id);
            println!("owner={}", view.note.owner_label);
            println!("created_at={}", view.note.created_at);
            println!("share={}", view.share_link);
            println!("raw={}", view.raw_link);
            println!();
            println!("{}", view.note.content);
        }
        Command::Raw { id } => {
            print!("{}", app.view_raw(&NoteId::new(id))?);
        }
        Command::List { username, password } => {
            app.login(&mut session, &username, &password)?;
            for summary in app.my_notes(&session)? {
                println!("{}\t{}\t{}", summary.id, summary.created_at, summary.preview);
            }
        }
        Command::Delete {
            id,
            username,
            password,
        } => {
            app.login(&mut session, &username, &password)?;
            app.delete_note(&session, &NoteId::new(id.as_str()))?;
            println!("deleted {id}");
        }
    }

    Ok(())
}
