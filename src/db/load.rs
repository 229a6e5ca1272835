use serde::Serialize;
use sqlx::PgPool;

use crate::store::MemoryStore;

/// Load an entire world snapshot into Postgres using COPY FROM STDIN
/// (text format).
///
/// Key columns are flattened for querying; the full record lands in a
/// `record` JSONB column so nothing is lost in translation.
pub async fn load_store(pool: &PgPool, store: &MemoryStore) -> Result<(), sqlx::Error> {
    // Factions
    {
        let mut buf = String::new();
        for f in store.factions() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\n",
                f.id,
                escape(&f.name),
                f.influence,
                f.reputation,
                f.is_active,
                escape(&record_json(f)),
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_factions.sql"), &buf).await?;
    }

    // Relationships
    {
        let mut buf = String::new();
        for r in store.relationships() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\n",
                r.pair.a,
                r.pair.b,
                r.stance.as_str(),
                r.tension,
                r.is_at_war(),
                escape(&record_json(r)),
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_relationships.sql"), &buf).await?;
    }

    // Memberships
    {
        let mut buf = String::new();
        for m in store.memberships() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\n",
                m.id,
                m.faction_id,
                m.character_id,
                m.reputation,
                m.is_active,
                escape(&record_json(m)),
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_memberships.sql"), &buf).await?;
    }

    Ok(())
}

/// Execute a COPY FROM STDIN with the given text-format payload.
async fn copy_in(pool: &PgPool, statement: &str, data: &str) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let mut copy = conn.copy_in_raw(statement).await?;
    copy.send(data.as_bytes()).await?;
    copy.finish().await?;
    Ok(())
}

/// Escape a string for Postgres COPY text format.
/// Backslash must be escaped first, then the special whitespace characters.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize a full record to its JSON text for the JSONB column.
fn record_json<T: Serialize>(record: &T) -> String {
    serde_json::to_string(record).expect("record serialization")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_copy_specials() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a\tb"), "a\\tb");
        assert_eq!(escape("a\nb"), "a\\nb");
        assert_eq!(escape("a\\b"), "a\\\\b");
    }
}
