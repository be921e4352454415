//! # Session Settings Store
//!
//! Keeps what each wizard session has uploaded and chosen so far: the template, the text
//! style and the recipient spreadsheet. Everything lives in one SQLite `sessions` table.
//! The default database is `:memory:`, so nothing outlives the running server.
//!
//! The certificate pipeline never reads from here directly. Callers take a snapshot with
//! [`SessionStore::load_settings`] and pass it in, which keeps a running batch immune to
//! edits made while it renders.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use common::model::certificate::{FontFamily, NamePosition, TemplateType, TextStyle};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::certificates::CertificateSettings;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS sessions (
        id                 TEXT PRIMARY KEY,
        template           BLOB,
        template_type      TEXT,
        template_extension TEXT,
        template_md5       TEXT,
        name_position_x    REAL,
        name_position_y    REAL,
        font_size          INTEGER,
        font_family        TEXT,
        text_color         TEXT,
        spreadsheet        BLOB,
        spreadsheet_name   TEXT,
        spreadsheet_md5    TEXT
    );
";

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,
    #[error("no template has been uploaded for this session")]
    MissingTemplate,
    #[error("no recipient spreadsheet has been uploaded for this session")]
    MissingSpreadsheet,
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("session store lock poisoned")]
    Poisoned,
}

/// A spreadsheet as uploaded: its original file name and raw bytes.
#[derive(Debug, Clone)]
pub struct StoredSpreadsheet {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub struct SessionStore {
    conn: Mutex<Connection>,
}

impl SessionStore {
    /// Opens the store at `path`; `:memory:` keeps it inside the process.
    pub fn open(path: &str) -> Result<Self, SessionError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(Path::new(path))?
        };
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, SessionError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, SessionError> {
        self.conn.lock().map_err(|_| SessionError::Poisoned)
    }

    pub fn create_session(&self) -> Result<String, SessionError> {
        let id = Uuid::new_v4().to_string();
        self.conn()?
            .execute("INSERT INTO sessions (id) VALUES (?1)", params![id])?;
        Ok(id)
    }

    pub fn delete_session(&self, id: &str) -> Result<(), SessionError> {
        let removed = self
            .conn()?
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(SessionError::NotFound);
        }
        Ok(())
    }

    /// Stores the template; returns `true` when the bytes match the current template.
    pub fn save_template(
        &self,
        id: &str,
        bytes: &[u8],
        template_type: TemplateType,
        extension: &str,
    ) -> Result<bool, SessionError> {
        let md5 = format!("{:x}", md5::compute(bytes));
        let conn = self.conn()?;
        let previous: Option<Option<String>> = conn
            .query_row(
                "SELECT template_md5 FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let previous = previous.ok_or(SessionError::NotFound)?;

        conn.execute(
            "UPDATE sessions SET template = ?1, template_type = ?2, template_extension = ?3, template_md5 = ?4 WHERE id = ?5",
            params![bytes, template_type.as_str(), extension, md5, id],
        )?;
        Ok(previous.as_deref() == Some(md5.as_str()))
    }

    pub fn save_style(&self, id: &str, style: &TextStyle) -> Result<(), SessionError> {
        let updated = self.conn()?.execute(
            "UPDATE sessions SET name_position_x = ?1, name_position_y = ?2, font_size = ?3, font_family = ?4, text_color = ?5 WHERE id = ?6",
            params![
                style.name_position.x,
                style.name_position.y,
                style.font_size,
                style.font_family.as_str(),
                style.text_color,
                id
            ],
        )?;
        if updated == 0 {
            return Err(SessionError::NotFound);
        }
        Ok(())
    }

    /// The stored style, with defaults for anything not chosen yet.
    pub fn load_style(&self, id: &str) -> Result<TextStyle, SessionError> {
        let conn = self.conn()?;
        load_style(&conn, id)
    }

    pub fn save_spreadsheet(
        &self,
        id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<bool, SessionError> {
        let md5 = format!("{:x}", md5::compute(bytes));
        let conn = self.conn()?;
        let previous: Option<Option<String>> = conn
            .query_row(
                "SELECT spreadsheet_md5 FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let previous = previous.ok_or(SessionError::NotFound)?;

        conn.execute(
            "UPDATE sessions SET spreadsheet = ?1, spreadsheet_name = ?2, spreadsheet_md5 = ?3 WHERE id = ?4",
            params![bytes, filename, md5, id],
        )?;
        Ok(previous.as_deref() == Some(md5.as_str()))
    }

    pub fn load_spreadsheet(&self, id: &str) -> Result<StoredSpreadsheet, SessionError> {
        let row: Option<(Option<String>, Option<Vec<u8>>)> = self
            .conn()?
            .query_row(
                "SELECT spreadsheet_name, spreadsheet FROM sessions WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            None => Err(SessionError::NotFound),
            Some((Some(filename), Some(bytes))) => Ok(StoredSpreadsheet { filename, bytes }),
            Some(_) => Err(SessionError::MissingSpreadsheet),
        }
    }

    /// An owned snapshot of everything the renderer needs.
    pub fn load_settings(&self, id: &str) -> Result<CertificateSettings, SessionError> {
        let conn = self.conn()?;
        let row: Option<(Option<Vec<u8>>, Option<String>)> = conn
            .query_row(
                "SELECT template, template_type FROM sessions WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (template, template_type) = row.ok_or(SessionError::NotFound)?;
        let template = template.ok_or(SessionError::MissingTemplate)?;
        let template_type = template_type
            .as_deref()
            .and_then(TemplateType::parse)
            .unwrap_or_default();

        let style = load_style(&conn, id)?;
        Ok(CertificateSettings::new(template, template_type, style))
    }
}

fn load_style(conn: &Connection, id: &str) -> Result<TextStyle, SessionError> {
    type StyleRow = (
        Option<f64>,
        Option<f64>,
        Option<u32>,
        Option<String>,
        Option<String>,
    );
    let row: Option<StyleRow> = conn
        .query_row(
            "SELECT name_position_x, name_position_y, font_size, font_family, text_color FROM sessions WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .optional()?;
    let (x, y, font_size, font_family, text_color) = row.ok_or(SessionError::NotFound)?;

    let defaults = TextStyle::default();
    Ok(TextStyle {
        name_position: match (x, y) {
            (Some(x), Some(y)) => NamePosition { x, y },
            _ => defaults.name_position,
        },
        font_size: font_size.unwrap_or(defaults.font_size),
        font_family: font_family
            .as_deref()
            .and_then(FontFamily::parse)
            .unwrap_or(defaults.font_family),
        text_color: text_color.unwrap_or(defaults.text_color),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_uses_default_style() {
        let store = SessionStore::open(":memory:").unwrap();
        let id = store.create_session().unwrap();
        assert_eq!(store.load_style(&id).unwrap(), TextStyle::default());
    }

    #[test]
    fn settings_require_a_template() {
        let store = SessionStore::open(":memory:").unwrap();
        let id = store.create_session().unwrap();
        assert!(matches!(
            store.load_settings(&id),
            Err(SessionError::MissingTemplate)
        ));
        assert!(matches!(
            store.load_settings("unknown"),
            Err(SessionError::NotFound)
        ));
    }

    #[test]
    fn settings_snapshot_combines_template_and_style() {
        let store = SessionStore::open(":memory:").unwrap();
        let id = store.create_session().unwrap();
        store
            .save_template(&id, b"%PDF-1.4", TemplateType::Pdf, "pdf")
            .unwrap();
        let style = TextStyle {
            name_position: NamePosition { x: 10.0, y: 80.0 },
            font_size: 36,
            font_family: FontFamily::Script,
            text_color: "#336699".to_string(),
        };
        store.save_style(&id, &style).unwrap();

        let settings = store.load_settings(&id).unwrap();
        assert_eq!(settings.template, b"%PDF-1.4");
        assert_eq!(settings.template_type, TemplateType::Pdf);
        assert_eq!(settings.name_position, style.name_position);
        assert_eq!(settings.font_family, FontFamily::Script);
        assert_eq!(settings.text_color, "#336699");

        // Later edits do not touch an existing snapshot.
        store.save_style(&id, &TextStyle::default()).unwrap();
        assert_eq!(settings.font_size, 36);
    }

    #[test]
    fn reuploading_identical_bytes_is_reported_unchanged() {
        let store = SessionStore::open(":memory:").unwrap();
        let id = store.create_session().unwrap();
        assert!(!store.save_spreadsheet(&id, "a.xlsx", b"one").unwrap());
        assert!(store.save_spreadsheet(&id, "b.xlsx", b"one").unwrap());
        assert!(!store.save_spreadsheet(&id, "b.xlsx", b"two").unwrap());

        assert!(!store
            .save_template(&id, b"png", TemplateType::Image, "png")
            .unwrap());
        assert!(store
            .save_template(&id, b"png", TemplateType::Image, "png")
            .unwrap());

        let sheet = store.load_spreadsheet(&id).unwrap();
        assert_eq!(sheet.filename, "b.xlsx");
        assert_eq!(sheet.bytes, b"two");
    }

    #[test]
    fn missing_spreadsheet_is_distinct_from_missing_session() {
        let store = SessionStore::open(":memory:").unwrap();
        let id = store.create_session().unwrap();
        assert!(matches!(
            store.load_spreadsheet(&id),
            Err(SessionError::MissingSpreadsheet)
        ));
        assert!(matches!(
            store.load_spreadsheet("nope"),
            Err(SessionError::NotFound)
        ));
    }

    #[test]
    fn writes_to_unknown_sessions_fail() {
        let store = SessionStore::open(":memory:").unwrap();
        assert!(matches!(
            store.save_style("nope", &TextStyle::default()),
            Err(SessionError::NotFound)
        ));
        assert!(matches!(
            store.save_spreadsheet("nope", "a.csv", b"Name\n"),
            Err(SessionError::NotFound)
        ));
        assert!(matches!(
            store.delete_session("nope"),
            Err(SessionError::NotFound)
        ));
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.sqlite");
        let path = path.to_str().unwrap();

        let id = {
            let store = SessionStore::open(path).unwrap();
            let id = store.create_session().unwrap();
            store.save_spreadsheet(&id, "names.csv", b"Name\nAda\n").unwrap();
            id
        };

        let store = SessionStore::open(path).unwrap();
        assert_eq!(store.load_spreadsheet(&id).unwrap().bytes, b"Name\nAda\n");
        store.delete_session(&id).unwrap();
        assert!(matches!(
            store.load_spreadsheet(&id),
            Err(SessionError::NotFound)
        ));
    }
}
