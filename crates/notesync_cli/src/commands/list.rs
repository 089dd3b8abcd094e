//! List command implementation.

use super::{short_id, Format};
use crate::error::CliResult;
use notesync_engine::{RemoteGateway, SyncEngine};
use notesync_protocol::Note;
use notesync_storage::LocalStore;

/// Runs the list command.
pub fn run<S, G>(engine: &SyncEngine<S, G>, all: bool, format: &str) -> CliResult<()>
where
    S: LocalStore,
    G: RemoteGateway,
{
    let format = Format::parse(format)?;
    let notes = select(engine, all)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&notes)?),
        Format::Text => print_text_output(&notes),
    }
    Ok(())
}

fn select<S, G>(engine: &SyncEngine<S, G>, all: bool) -> CliResult<Vec<Note>>
where
    S: LocalStore,
    G: RemoteGateway,
{
    Ok(if all {
        engine.get_notes()?
    } else {
        engine.visible_notes()?
    })
}

fn print_text_output(notes: &[Note]) {
    if notes.is_empty() {
        println!("No notes.");
        return;
    }
    for note in notes {
        println!(
            "{:<8}  {:<14}  {}",
            short_id(note),
            note.status().as_str(),
            note.title
        );
    }
}
