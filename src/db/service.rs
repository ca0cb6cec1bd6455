use crate::db::models::{
    ChatMessage, ChatSession, Feedback, LabelCount, OverallStats, Pet, SessionStats,
};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use duckdb::{params, Connection, Result as DbResult, Row};
use uuid::Uuid;

/// Outcome of a session close request. Closing is idempotent: a session that
/// was already ended keeps its original end timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionClose {
    Closed,
    AlreadyEnded,
    NotFound,
}

pub struct DbService;

// DuckDB hands timestamps back in driver-specific value types, so every SELECT
// casts them to VARCHAR and we parse the text here (see the CAST calls below).
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    if let Ok(dt) = raw.parse::<DateTime<Utc>>() {
        return dt;
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

impl DbService {
    fn row_to_pet(row: &Row) -> DbResult<Pet> {
        Ok(Pet {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            pet_type: row.get(3)?,
            breed: row.get(4)?,
            age: row.get(5)?,
            disease: row.get(6)?,
            symptoms: row.get(7)?,
            thread_id: row.get(8)?,
            last_updated: parse_timestamp(&row.get::<_, String>(9)?),
            created_at: parse_timestamp(&row.get::<_, String>(10)?),
        })
    }

    fn row_to_message(row: &Row) -> DbResult<ChatMessage> {
        let session_raw: Option<String> = row.get(3)?;
        Ok(ChatMessage {
            id: row.get(0)?,
            pet_id: row.get(1)?,
            thread_id: row.get(2)?,
            session_id: session_raw.and_then(|s| s.parse().ok()),
            role: row.get(4)?,
            message: row.get(5)?,
            response_time_ms: row.get(6)?,
            is_understood: row.get(7)?,
            source: row.get(8)?,
            created_at: parse_timestamp(&row.get::<_, String>(9)?),
        })
    }

    fn row_to_session(row: &Row) -> DbResult<ChatSession> {
        let end_raw: Option<String> = row.get(4)?;
        Ok(ChatSession {
            id: row.get::<_, String>(0)?.parse().unwrap_or_default(),
            user_id: row.get(1)?,
            device_type: row.get(2)?,
            start_time: parse_timestamp(&row.get::<_, String>(3)?),
            end_time: end_raw.map(|s| parse_timestamp(&s)),
            messages_count: row.get(5)?,
            created_at: parse_timestamp(&row.get::<_, String>(6)?),
        })
    }

    fn row_to_feedback(row: &Row) -> DbResult<Feedback> {
        Ok(Feedback {
            id: row.get(0)?,
            pet_id: row.get(1)?,
            thread_id: row.get(2)?,
            rating: row.get(3)?,
            comment: row.get(4)?,
            created_at: parse_timestamp(&row.get::<_, String>(5)?),
        })
    }

    // --- Users ---

    pub fn insert_user(conn: &Connection, email: &str, name: &str) -> DbResult<i64> {
        conn.execute(
            "INSERT INTO users (email, name) VALUES (?, ?)",
            params![email, name],
        )?;
        conn.query_row(
            "SELECT id FROM users WHERE email = ?",
            params![email],
            |row| row.get(0),
        )
    }

    // --- Pets ---

    #[allow(clippy::too_many_arguments)]
    pub fn insert_pet(
        conn: &Connection,
        user_id: Option<i64>,
        name: &str,
        pet_type: &str,
        breed: &str,
        age: i32,
        disease: &str,
        symptoms: &str,
    ) -> DbResult<Pet> {
        conn.execute(
            "INSERT INTO pets (user_id, name, pet_type, breed, age, disease, symptoms)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![user_id, name, pet_type, breed, age, disease, symptoms],
        )?;

        let mut stmt = conn.prepare(&format!("{PET_SELECT} ORDER BY id DESC LIMIT 1"))?;
        let mut rows = stmt.query_map([], Self::row_to_pet)?;
        rows.next().unwrap()
    }

    pub fn get_pet(conn: &Connection, id: i64) -> DbResult<Option<Pet>> {
        let mut stmt = conn.prepare(&format!("{PET_SELECT} WHERE id = ?"))?;
        let mut rows = stmt.query_map(params![id], Self::row_to_pet)?;
        rows.next().transpose()
    }

    pub fn list_pets(conn: &Connection, user_id: i64) -> DbResult<Vec<Pet>> {
        let mut stmt =
            conn.prepare(&format!("{PET_SELECT} WHERE user_id = ? ORDER BY id ASC"))?;
        let rows = stmt.query_map(params![user_id], Self::row_to_pet)?;
        rows.collect()
    }

    pub fn update_pet_thread(conn: &Connection, id: i64, thread_id: &str) -> DbResult<bool> {
        let affected = conn.execute(
            "UPDATE pets SET thread_id = ? WHERE id = ?",
            params![thread_id, id],
        )?;
        Ok(affected > 0)
    }

    pub fn update_pet_health(
        conn: &Connection,
        id: i64,
        symptoms: &str,
        disease: &str,
    ) -> DbResult<bool> {
        let affected = conn.execute(
            "UPDATE pets SET symptoms = ?, disease = ?, last_updated = CURRENT_TIMESTAMP
             WHERE id = ?",
            params![symptoms, disease, id],
        )?;
        Ok(affected > 0)
    }

    /// Refresh the pet's last-interaction timestamp.
    pub fn touch_pet(conn: &Connection, id: i64) -> DbResult<()> {
        conn.execute(
            "UPDATE pets SET last_updated = CURRENT_TIMESTAMP WHERE id = ?",
            params![id],
        )?;
        Ok(())
    }

    /// True when the pet's last update is older than `threshold`, or when the
    /// pet is unknown (an unknown pet should be asked for a fresh status).
    pub fn pet_needs_update(conn: &Connection, id: i64, threshold: Duration) -> DbResult<bool> {
        let mut stmt =
            conn.prepare("SELECT CAST(last_updated AS VARCHAR) FROM pets WHERE id = ?")?;
        let mut rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;

        match rows.next() {
            Some(raw) => {
                let last_updated = parse_timestamp(&raw?);
                Ok(last_updated < Utc::now() - threshold)
            }
            None => Ok(true),
        }
    }

    pub fn delete_pet(conn: &Connection, id: i64) -> DbResult<()> {
        conn.execute("BEGIN TRANSACTION", [])?;

        // Children first: topics hang off messages, so they go before messages.
        let cascade = [
            "DELETE FROM chat_topics WHERE message_id IN
                 (SELECT id FROM chat_messages WHERE pet_id = ?)",
            "DELETE FROM chat_feedback WHERE pet_id = ?",
            "DELETE FROM chat_messages WHERE pet_id = ?",
            "DELETE FROM pets WHERE id = ?",
        ];
        for sql in cascade {
            if let Err(e) = conn.execute(sql, params![id]) {
                let _ = conn.execute("ROLLBACK", []);
                return Err(e);
            }
        }

        conn.execute("COMMIT", [])?;
        Ok(())
    }

    // --- Sessions ---

    pub fn open_session(
        conn: &Connection,
        user_id: Option<i64>,
        device_type: &str,
    ) -> DbResult<ChatSession> {
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO chat_sessions (id, user_id, device_type) VALUES (?, ?, ?)",
            params![id.to_string(), user_id, device_type],
        )?;
        Self::get_session(conn, id).map(|s| s.unwrap())
    }

    pub fn get_session(conn: &Connection, id: Uuid) -> DbResult<Option<ChatSession>> {
        let mut stmt = conn.prepare(&format!("{SESSION_SELECT} WHERE id = ?"))?;
        let mut rows = stmt.query_map(params![id.to_string()], Self::row_to_session)?;
        rows.next().transpose()
    }

    pub fn list_sessions(conn: &Connection, limit: usize) -> DbResult<Vec<ChatSession>> {
        let mut stmt =
            conn.prepare(&format!("{SESSION_SELECT} ORDER BY start_time DESC LIMIT ?"))?;
        let rows = stmt.query_map(params![limit as i64], Self::row_to_session)?;
        rows.collect()
    }

    pub fn end_session(conn: &Connection, id: Uuid) -> DbResult<SessionClose> {
        if Self::get_session(conn, id)?.is_none() {
            return Ok(SessionClose::NotFound);
        }

        // end_time is written once; a second close leaves the original value.
        let affected = conn.execute(
            "UPDATE chat_sessions SET end_time = CURRENT_TIMESTAMP
             WHERE id = ? AND end_time IS NULL",
            params![id.to_string()],
        )?;

        if affected > 0 {
            Ok(SessionClose::Closed)
        } else {
            Ok(SessionClose::AlreadyEnded)
        }
    }

    pub fn bump_session_messages(conn: &Connection, id: Uuid, by: i32) -> DbResult<()> {
        conn.execute(
            "UPDATE chat_sessions SET messages_count = messages_count + ? WHERE id = ?",
            params![by, id.to_string()],
        )?;
        Ok(())
    }

    // --- Messages ---

    #[allow(clippy::too_many_arguments)]
    pub fn insert_message(
        conn: &Connection,
        pet_id: i64,
        thread_id: &str,
        session_id: Option<Uuid>,
        role: &str,
        message: &str,
        response_time_ms: Option<i64>,
        is_understood: bool,
        source: Option<&str>,
    ) -> DbResult<ChatMessage> {
        conn.execute(
            "INSERT INTO chat_messages
                 (pet_id, thread_id, session_id, role, message,
                  response_time_ms, is_understood, source)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                pet_id,
                thread_id,
                session_id.map(|s| s.to_string()),
                role,
                message,
                response_time_ms,
                is_understood,
                source
            ],
        )?;

        // Fetch the message we just inserted (since ID is generated by sequence)
        let mut stmt = conn.prepare(&format!(
            "{MESSAGE_SELECT} WHERE pet_id = ? ORDER BY id DESC LIMIT 1"
        ))?;
        let mut rows = stmt.query_map(params![pet_id], Self::row_to_message)?;
        rows.next().unwrap()
    }

    pub fn chat_history(conn: &Connection, pet_id: i64) -> DbResult<Vec<ChatMessage>> {
        let mut stmt = conn.prepare(&format!(
            "{MESSAGE_SELECT} WHERE pet_id = ? ORDER BY created_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params![pet_id], Self::row_to_message)?;
        rows.collect()
    }

    // --- Topics ---

    pub fn insert_topic(conn: &Connection, message_id: i64, topic: &str) -> DbResult<()> {
        conn.execute(
            "INSERT INTO chat_topics (message_id, topic) VALUES (?, ?)",
            params![message_id, topic],
        )?;
        Ok(())
    }

    // --- Feedback ---

    pub fn insert_feedback(
        conn: &Connection,
        pet_id: i64,
        thread_id: &str,
        rating: i32,
        comment: Option<&str>,
    ) -> DbResult<Feedback> {
        conn.execute(
            "INSERT INTO chat_feedback (pet_id, thread_id, rating, comment)
             VALUES (?, ?, ?, ?)",
            params![pet_id, thread_id, rating, comment],
        )?;

        let mut stmt = conn.prepare(
            "SELECT id, pet_id, thread_id, rating, comment, CAST(created_at AS VARCHAR)
             FROM chat_feedback WHERE pet_id = ? ORDER BY id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![pet_id], Self::row_to_feedback)?;
        rows.next().unwrap()
    }

    // --- Admin aggregations ---

    pub fn overall_stats(conn: &Connection) -> DbResult<OverallStats> {
        conn.query_row(
            "SELECT
                 (SELECT COUNT(*) FROM users),
                 (SELECT COUNT(*) FROM pets),
                 (SELECT ROUND(AVG(rating), 2) FROM chat_feedback)",
            [],
            |row| {
                Ok(OverallStats {
                    total_users: row.get(0)?,
                    total_pets: row.get(1)?,
                    avg_rating: row.get(2)?,
                })
            },
        )
    }

    pub fn pet_type_counts(conn: &Connection) -> DbResult<Vec<LabelCount>> {
        Self::label_counts(
            conn,
            "SELECT pet_type, COUNT(*) FROM pets GROUP BY pet_type ORDER BY COUNT(*) DESC",
        )
    }

    pub fn disease_counts(conn: &Connection) -> DbResult<Vec<LabelCount>> {
        Self::label_counts(
            conn,
            "SELECT disease, COUNT(*) FROM pets GROUP BY disease ORDER BY COUNT(*) DESC LIMIT 10",
        )
    }

    pub fn rating_counts(conn: &Connection) -> DbResult<Vec<LabelCount>> {
        Self::label_counts(
            conn,
            "SELECT CAST(rating AS VARCHAR), COUNT(*) FROM chat_feedback
             GROUP BY rating ORDER BY rating",
        )
    }

    pub fn topic_counts(conn: &Connection) -> DbResult<Vec<LabelCount>> {
        Self::label_counts(
            conn,
            "SELECT topic, COUNT(*) FROM chat_topics GROUP BY topic ORDER BY COUNT(*) DESC",
        )
    }

    pub fn session_stats(conn: &Connection) -> DbResult<SessionStats> {
        let (total_sessions, open_sessions, avg_messages) = conn.query_row(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE end_time IS NULL),
                    ROUND(AVG(messages_count), 2)
             FROM chat_sessions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let devices = Self::label_counts(
            conn,
            "SELECT COALESCE(device_type, 'unknown'), COUNT(*) FROM chat_sessions
             GROUP BY device_type ORDER BY COUNT(*) DESC",
        )?;

        Ok(SessionStats {
            total_sessions,
            open_sessions,
            avg_messages,
            devices,
        })
    }

    fn label_counts(conn: &Connection, sql: &str) -> DbResult<Vec<LabelCount>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(LabelCount {
                label: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        rows.collect()
    }
}

const PET_SELECT: &str = "SELECT id, user_id, name, pet_type, breed, age, disease, symptoms,
        thread_id, CAST(last_updated AS VARCHAR), CAST(created_at AS VARCHAR)
 FROM pets";

const SESSION_SELECT: &str = "SELECT CAST(id AS VARCHAR), user_id, device_type,
        CAST(start_time AS VARCHAR), CAST(end_time AS VARCHAR),
        messages_count, CAST(created_at AS VARCHAR)
 FROM chat_sessions";

const MESSAGE_SELECT: &str = "SELECT id, pet_id, thread_id, CAST(session_id AS VARCHAR), role, message,
        response_time_ms, is_understood, source, CAST(created_at AS VARCHAR)
 FROM chat_messages";
