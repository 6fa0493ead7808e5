// src/repository.rs

use crate::error::Result;
use crate::models::{
    AttemptEntry, DifficultyState, Operation, Orientation, PerformanceRecord, ProblemIdentity,
    RecentAnswer,
};
use crate::performance::RecordEntry;
use crate::stats::ProfileState;
use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, VecDeque};

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

/// Rebuilds an identity from stored columns through `ProblemIdentity::new`,
/// so rows written in a non-canonical form still land on the right key.
fn stored_identity(operation: &str, a: i64, b: i64, orientation: &str) -> Result<ProblemIdentity> {
    let raw = ProblemIdentity {
        operation: operation.parse()?,
        operand_a: a,
        operand_b: b,
        orientation: orientation.parse::<Orientation>()?,
    };
    Ok(ProblemIdentity::new(raw.operation, raw.left(), raw.right()))
}

/// Returns the profile's row id, creating the profile if needed.
pub fn ensure_profile(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO profiles (name, created_ts) VALUES (?, ?)",
        params![name, Utc::now().timestamp()],
    )?;
    let id = conn.query_row("SELECT id FROM profiles WHERE name = ?", [name], |row| {
        row.get(0)
    })?;
    Ok(id)
}

fn find_profile(conn: &Connection, name: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row("SELECT id FROM profiles WHERE name = ?", [name], |row| {
            row.get(0)
        })
        .optional()?)
}

pub fn list_profiles(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM profiles ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

/// Loads a profile snapshot. Unknown profiles load as zero state.
/// Only the newest `history_limit` attempts are returned.
pub fn load_profile(conn: &Connection, name: &str, history_limit: usize) -> Result<ProfileState> {
    let profile_id = match find_profile(conn, name)? {
        Some(id) => id,
        None => {
            info!("Profile '{}' not found, starting fresh", name);
            return Ok(ProfileState::default());
        }
    };

    let state = ProfileState {
        records: load_records(conn, profile_id)?,
        difficulty: load_difficulty(conn, profile_id)?,
        history: load_history(conn, profile_id, history_limit)?,
    };
    info!(
        "Loaded profile '{}': {} records, {} difficulty states, {} attempts",
        name,
        state.records.len(),
        state.difficulty.len(),
        state.history.len()
    );
    Ok(state)
}

type RecordRow = (String, i64, i64, String, u32, u32, u32, String, f64, Option<i64>);

fn load_records(conn: &Connection, profile_id: i64) -> Result<Vec<RecordEntry>> {
    let mut stmt = conn.prepare(
        "SELECT operation, operand_a, operand_b, orientation,
                attempts, correct, incorrect, recent, avg_secs, last_seen_ms
         FROM performance_records
         WHERE profile_id = ?",
    )?;
    let rows = stmt
        .query_map([profile_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<RecordRow>>>()?;

    let mut entries = Vec::with_capacity(rows.len());
    for (op, a, b, orientation, attempts, correct, incorrect, recent, avg, last_seen) in rows {
        let recent: VecDeque<bool> = serde_json::from_str(&recent)?;
        entries.push(RecordEntry {
            identity: stored_identity(&op, a, b, &orientation)?,
            record: PerformanceRecord {
                attempts,
                correct,
                incorrect,
                recent,
                avg_normalized_secs: avg,
                last_seen: last_seen.and_then(from_millis),
            },
        });
    }
    Ok(entries)
}

fn load_difficulty(conn: &Connection, profile_id: i64) -> Result<BTreeMap<Operation, DifficultyState>> {
    let mut stmt = conn.prepare(
        "SELECT operation, level, recent, fast_streak, slow_streak
         FROM difficulty_state
         WHERE profile_id = ?",
    )?;
    let rows = stmt
        .query_map([profile_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u8>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut states = BTreeMap::new();
    for (op, level, recent, fast_streak, slow_streak) in rows {
        let recent: VecDeque<RecentAnswer> = serde_json::from_str(&recent)?;
        states.insert(
            op.parse::<Operation>()?,
            DifficultyState {
                level,
                recent,
                fast_streak,
                slow_streak,
            },
        );
    }
    Ok(states)
}

fn load_history(conn: &Connection, profile_id: i64, limit: usize) -> Result<Vec<AttemptEntry>> {
    // Newest first for the LIMIT, then flipped back to chronological order.
    let mut stmt = conn.prepare(
        "SELECT operation, operand_a, operand_b, orientation, correct, normalized_secs, timestamp_ms
         FROM attempts
         WHERE profile_id = ?
         ORDER BY id DESC
         LIMIT ?",
    )?;
    let rows = stmt
        .query_map(params![profile_id, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut history = Vec::with_capacity(rows.len());
    for (op, a, b, orientation, correct, secs, ts) in rows.into_iter().rev() {
        history.push(AttemptEntry {
            identity: stored_identity(&op, a, b, &orientation)?,
            correct,
            normalized_secs: secs,
            answered_at: from_millis(ts).unwrap_or_else(Utc::now),
        });
    }
    Ok(history)
}

/// Replaces the stored snapshot for `name` in one transaction.
pub fn save_profile(conn: &mut Connection, name: &str, state: &ProfileState) -> Result<()> {
    let profile_id = ensure_profile(conn, name)?;
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM performance_records WHERE profile_id = ?", [profile_id])?;
    tx.execute("DELETE FROM difficulty_state WHERE profile_id = ?", [profile_id])?;
    tx.execute("DELETE FROM attempts WHERE profile_id = ?", [profile_id])?;

    {
        let mut rec_stmt = tx.prepare(
            "INSERT INTO performance_records
             (profile_id, operation, operand_a, operand_b, orientation,
              attempts, correct, incorrect, recent, avg_secs, last_seen_ms)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        for entry in &state.records {
            let id = &entry.identity;
            let r = &entry.record;
            rec_stmt.execute(params![
                profile_id,
                id.operation.as_str(),
                id.operand_a,
                id.operand_b,
                id.orientation.as_str(),
                r.attempts,
                r.correct,
                r.incorrect,
                serde_json::to_string(&r.recent)?,
                r.avg_normalized_secs,
                r.last_seen.map(|t| t.timestamp_millis()),
            ])?;
        }

        let mut diff_stmt = tx.prepare(
            "INSERT INTO difficulty_state
             (profile_id, operation, level, recent, fast_streak, slow_streak)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        for (op, s) in &state.difficulty {
            diff_stmt.execute(params![
                profile_id,
                op.as_str(),
                s.level,
                serde_json::to_string(&s.recent)?,
                s.fast_streak,
                s.slow_streak,
            ])?;
        }

        let mut att_stmt = tx.prepare(
            "INSERT INTO attempts
             (profile_id, operation, operand_a, operand_b, orientation,
              correct, normalized_secs, timestamp_ms)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        for a in &state.history {
            att_stmt.execute(params![
                profile_id,
                a.identity.operation.as_str(),
                a.identity.operand_a,
                a.identity.operand_b,
                a.identity.orientation.as_str(),
                a.correct,
                a.normalized_secs,
                a.answered_at.timestamp_millis(),
            ])?;
        }
    }

    tx.commit()?;
    debug!(
        "[DB] Saved profile '{}': {} records, {} attempts",
        name,
        state.records.len(),
        state.history.len()
    );
    Ok(())
}

pub fn delete_profile(conn: &Connection, name: &str) -> Result<bool> {
    let removed = conn.execute("DELETE FROM profiles WHERE name = ?", [name])?;
    info!("Deleted profile '{}': {}", name, removed > 0);
    Ok(removed > 0)
}
