use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::store::MemoryStore;

/// Write an iterator of serializable items to a JSONL file (one JSON object
/// per line).
fn write_jsonl<T: Serialize>(path: &Path, items: impl Iterator<Item = T>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut writer, &item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Flush the world state to JSONL files in the given output directory.
///
/// Creates the output directory if it does not exist. Writes 5 files:
/// - `factions.jsonl` — one Faction per line (state bag included)
/// - `relationships.jsonl` — one canonical pair record per line
/// - `memberships.jsonl` — one FactionMembership per line
/// - `pois.jsonl` — one Poi per line
/// - `npcs.jsonl` — one Npc per line
pub fn flush_to_jsonl(store: &MemoryStore, output_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;

    write_jsonl(&output_dir.join("factions.jsonl"), store.factions())?;
    write_jsonl(
        &output_dir.join("relationships.jsonl"),
        store.relationships(),
    )?;
    write_jsonl(&output_dir.join("memberships.jsonl"), store.memberships())?;
    write_jsonl(&output_dir.join("pois.jsonl"), store.pois())?;
    write_jsonl(&output_dir.join("npcs.jsonl"), store.npcs())?;

    Ok(())
}
