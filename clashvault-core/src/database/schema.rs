//! Database schema and connection management.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::database::models::{ProfileRecord, ProfileType, Selection};
use crate::Result;

/// Main database connection and schema manager
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the specified path, creating the schema on demand.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Create a new in-memory database for testing
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS profiles (
                uuid TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                source TEXT NOT NULL,
                interval INTEGER NOT NULL DEFAULT 0,
                upload INTEGER NOT NULL DEFAULT 0,
                download INTEGER NOT NULL DEFAULT 0,
                total INTEGER NOT NULL DEFAULT 0,
                expire INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS selections (
                uuid TEXT NOT NULL,
                proxy TEXT NOT NULL,
                selected TEXT NOT NULL,
                PRIMARY KEY (uuid, proxy)
            )",
            [],
        )?;

        Ok(())
    }

    /// All profile uuids, oldest import first.
    pub fn query_all_uuids(&self) -> Result<Vec<Uuid>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid FROM profiles ORDER BY created_at")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut uuids = Vec::new();
        for row in rows {
            if let Ok(uuid) = Uuid::parse_str(&row?) {
                uuids.push(uuid);
            }
        }
        Ok(uuids)
    }

    pub fn query_profile(&self, uuid: &Uuid) -> Result<Option<ProfileRecord>> {
        let profile = self
            .conn
            .query_row(
                "SELECT uuid, name, type, source, interval, upload, download, total, expire, created_at
                 FROM profiles WHERE uuid = ?1",
                [uuid.to_string()],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    pub fn profile_exists(&self, uuid: &Uuid) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM profiles WHERE uuid = ?1)",
            [uuid.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn insert_profile(&self, profile: &ProfileRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO profiles (uuid, name, type, source, interval, upload, download, total, expire, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                profile.uuid.to_string(),
                profile.name,
                profile.kind.as_str(),
                profile.source,
                profile.interval,
                profile.upload,
                profile.download,
                profile.total,
                profile.expire,
                profile.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn update_profile(&self, profile: &ProfileRecord) -> Result<()> {
        self.conn.execute(
            "UPDATE profiles
             SET name = ?2, type = ?3, source = ?4, interval = ?5, upload = ?6,
                 download = ?7, total = ?8, expire = ?9, created_at = ?10
             WHERE uuid = ?1",
            params![
                profile.uuid.to_string(),
                profile.name,
                profile.kind.as_str(),
                profile.source,
                profile.interval,
                profile.upload,
                profile.download,
                profile.total,
                profile.expire,
                profile.created_at,
            ],
        )?;
        Ok(())
    }

    /// Selections for one profile, ordered by group name.
    pub fn query_selections(&self, uuid: &Uuid) -> Result<Vec<Selection>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, proxy, selected FROM selections WHERE uuid = ?1 ORDER BY proxy")?;
        let rows = stmt.query_map([uuid.to_string()], |row| {
            let raw: String = row.get(0)?;
            Ok((raw, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;

        let mut selections = Vec::new();
        for row in rows {
            let (raw, proxy, selected) = row?;
            if let Ok(uuid) = Uuid::parse_str(&raw) {
                selections.push(Selection {
                    uuid,
                    proxy,
                    selected,
                });
            }
        }
        Ok(selections)
    }

    /// Record the selected proxy for a group (upsert).
    pub fn set_selection(&self, selection: &Selection) -> Result<()> {
        self.conn.execute(
            "INSERT INTO selections (uuid, proxy, selected) VALUES (?1, ?2, ?3)
             ON CONFLICT(uuid, proxy) DO UPDATE SET selected = excluded.selected",
            params![
                selection.uuid.to_string(),
                selection.proxy,
                selection.selected,
            ],
        )?;
        Ok(())
    }
}

fn row_to_profile(row: &Row<'_>) -> rusqlite::Result<ProfileRecord> {
    let raw_uuid: String = row.get(0)?;
    let uuid = Uuid::parse_str(&raw_uuid).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let kind: String = row.get(2)?;

    Ok(ProfileRecord {
        uuid,
        name: row.get(1)?,
        kind: ProfileType::parse(&kind),
        source: row.get(3)?,
        interval: row.get(4)?,
        upload: row.get(5)?,
        download: row.get(6)?,
        total: row.get(7)?,
        expire: row.get(8)?,
        created_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile(uuid: Uuid) -> ProfileRecord {
        ProfileRecord {
            uuid,
            name: "my subscription".to_string(),
            kind: ProfileType::Url,
            source: "https://example.com/sub".to_string(),
            interval: 86_400,
            upload: 1024,
            download: 4096,
            total: 1 << 30,
            expire: 1_700_000_000_000,
            created_at: 1_690_000_000_000,
        }
    }

    #[test]
    fn insert_and_query_profile() {
        let db = Database::in_memory().unwrap();
        let uuid = Uuid::new_v4();
        let profile = sample_profile(uuid);

        db.insert_profile(&profile).unwrap();
        assert!(db.profile_exists(&uuid).unwrap());
        assert_eq!(db.query_profile(&uuid).unwrap(), Some(profile));
        assert_eq!(db.query_all_uuids().unwrap(), vec![uuid]);
    }

    #[test]
    fn missing_profile_is_none() {
        let db = Database::in_memory().unwrap();
        let uuid = Uuid::new_v4();
        assert!(!db.profile_exists(&uuid).unwrap());
        assert_eq!(db.query_profile(&uuid).unwrap(), None);
    }

    #[test]
    fn update_profile_in_place() {
        let db = Database::in_memory().unwrap();
        let uuid = Uuid::new_v4();
        let mut profile = sample_profile(uuid);
        db.insert_profile(&profile).unwrap();

        profile.name = "renamed".to_string();
        profile.download = 9999;
        db.update_profile(&profile).unwrap();

        assert_eq!(db.query_profile(&uuid).unwrap(), Some(profile));
        assert_eq!(db.query_all_uuids().unwrap().len(), 1);
    }

    #[test]
    fn selection_upsert() {
        let db = Database::in_memory().unwrap();
        let uuid = Uuid::new_v4();

        db.set_selection(&Selection {
            uuid,
            proxy: "PROXY".to_string(),
            selected: "node-a".to_string(),
        })
        .unwrap();

        db.set_selection(&Selection {
            uuid,
            proxy: "PROXY".to_string(),
            selected: "node-b".to_string(),
        })
        .unwrap();

        let selections = db.query_selections(&uuid).unwrap();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].selected, "node-b");
    }

    #[test]
    fn profile_type_round_trip() {
        for kind in [ProfileType::File, ProfileType::Url, ProfileType::External] {
            assert_eq!(ProfileType::parse(kind.as_str()), kind);
        }
    }
}
