// src/database.rs

use log::debug;
use rusqlite::{Connection, Result};

pub fn init_db(conn: &Connection) -> Result<()> {
    debug!("init_db: Checking database schema...");

    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS profiles (
            id INTEGER PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            created_ts INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS performance_records (
            profile_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            operation TEXT NOT NULL
                CHECK (operation IN ('addition','subtraction','multiplication','division')),
            operand_a INTEGER NOT NULL,
            operand_b INTEGER NOT NULL,
            orientation TEXT NOT NULL CHECK (orientation IN ('forward','reversed')),
            attempts INTEGER NOT NULL DEFAULT 0,
            correct INTEGER NOT NULL DEFAULT 0,
            incorrect INTEGER NOT NULL DEFAULT 0,
            recent TEXT NOT NULL DEFAULT '[]',
            avg_secs REAL NOT NULL DEFAULT 0.0,
            last_seen_ms INTEGER,
            PRIMARY KEY (profile_id, operation, operand_a, operand_b, orientation)
        );
        CREATE TABLE IF NOT EXISTS difficulty_state (
            profile_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            operation TEXT NOT NULL
                CHECK (operation IN ('addition','subtraction','multiplication','division')),
            level INTEGER NOT NULL DEFAULT 1,
            recent TEXT NOT NULL DEFAULT '[]',
            fast_streak INTEGER NOT NULL DEFAULT 0,
            slow_streak INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (profile_id, operation)
        );
        CREATE TABLE IF NOT EXISTS attempts (
            id INTEGER PRIMARY KEY,
            profile_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            operation TEXT NOT NULL,
            operand_a INTEGER NOT NULL,
            operand_b INTEGER NOT NULL,
            orientation TEXT NOT NULL,
            correct INTEGER NOT NULL,
            normalized_secs REAL NOT NULL,
            timestamp_ms INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_attempts_profile ON attempts (profile_id, id);
        ",
    )?;

    Ok(())
}
