use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;

use crate::simulator::RunSummary;

///save run summary as pretty json
pub fn save_summary(path: impl AsRef<Path>, summary: &RunSummary) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(summary).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

pub fn load_summary(path: impl AsRef<Path>) -> Option<RunSummary> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// SQLite log of finished runs, one row per curriculum stage.
pub struct ResultsDb {
    conn: Connection,
}

impl ResultsDb {
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS runs (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                seed        INTEGER NOT NULL,
                started_at  TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS stages (
                run_id        INTEGER NOT NULL REFERENCES runs(id),
                road_width    INTEGER NOT NULL,
                episodes      INTEGER NOT NULL,
                best_advances INTEGER NOT NULL,
                min_advances  INTEGER NOT NULL,
                max_advances  INTEGER NOT NULL,
                mean_advances REAL NOT NULL,
                total_steps   INTEGER NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    /// Store a run and its stages; returns the new run id.
    pub fn record_run(&mut self, summary: &RunSummary) -> rusqlite::Result<i64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO runs (seed, started_at, recorded_at) VALUES (?1, ?2, ?3)",
            params![summary.seed as i64, summary.started_at, chrono::Utc::now().to_rfc3339()],
        )?;
        let run_id = tx.last_insert_rowid();
        for stage in &summary.stages {
            tx.execute(
                "INSERT INTO stages (run_id, road_width, episodes, best_advances,
                                     min_advances, max_advances, mean_advances, total_steps)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    run_id,
                    stage.road_width as i64,
                    stage.episodes as i64,
                    stage.best_advances as i64,
                    stage.advances.min as i64,
                    stage.advances.max as i64,
                    stage.advances.mean,
                    stage.total_steps as i64,
                ],
            )?;
        }
        tx.commit()?;
        Ok(run_id)
    }

    pub fn stage_count(&self, run_id: i64) -> rusqlite::Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM stages WHERE run_id = ?1", [run_id], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Best advance count ever recorded for a road width.
    pub fn best_advances(&self, road_width: usize) -> rusqlite::Result<Option<u64>> {
        let best: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT MAX(best_advances) FROM stages WHERE road_width = ?1",
                [road_width as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(best.flatten().map(|v| v as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::StageSummary;
    use crate::utils::Stats;

    fn summary(best: u64) -> RunSummary {
        RunSummary {
            seed: u64::MAX,
            started_at: "2026-01-01T00:00:00+00:00".to_string(),
            stages: vec![
                StageSummary {
                    road_width: 5,
                    episodes: 3,
                    best_advances: best,
                    advances: Stats { min: 2, max: best, mean: 7.5 },
                    total_steps: 22,
                },
                StageSummary {
                    road_width: 6,
                    episodes: 1,
                    best_advances: 40,
                    advances: Stats { min: 40, max: 40, mean: 40.0 },
                    total_steps: 40,
                },
            ],
        }
    }

    #[test]
    fn records_stages() {
        let mut db = ResultsDb::in_memory().unwrap();
        let first = db.record_run(&summary(12)).unwrap();
        db.record_run(&summary(30)).unwrap();
        assert_eq!(db.stage_count(first).unwrap(), 2);
        assert_eq!(db.best_advances(5).unwrap(), Some(30));
        assert_eq!(db.best_advances(9).unwrap(), None);
    }

    #[test]
    fn summary_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        save_summary(&path, &summary(12)).unwrap();
        assert_eq!(load_summary(&path), Some(summary(12)));
        assert_eq!(load_summary(dir.path().join("missing.json")), None);
    }
}
