use crate::config::DatabaseConfig;
use duckdb::{Connection, Result as DbResult};
use std::sync::{Arc, Mutex};
use tracing::info;

pub type DbPool = Arc<Mutex<Connection>>;

const SCHEMA: &str = r#"
CREATE SEQUENCE IF NOT EXISTS seq_users_id;
CREATE SEQUENCE IF NOT EXISTS seq_pets_id;
CREATE SEQUENCE IF NOT EXISTS seq_messages_id;
CREATE SEQUENCE IF NOT EXISTS seq_topics_id;
CREATE SEQUENCE IF NOT EXISTS seq_feedback_id;

CREATE TABLE IF NOT EXISTS users (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_users_id'),
    email VARCHAR NOT NULL UNIQUE,
    name VARCHAR NOT NULL,
    is_admin BOOLEAN DEFAULT FALSE,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS pets (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_pets_id'),
    user_id BIGINT,
    name VARCHAR NOT NULL,
    pet_type VARCHAR NOT NULL,
    breed VARCHAR NOT NULL,
    age INTEGER NOT NULL,
    disease VARCHAR NOT NULL,
    symptoms TEXT NOT NULL,
    thread_id VARCHAR,
    last_updated TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS chat_sessions (
    id UUID PRIMARY KEY,
    user_id BIGINT,
    device_type VARCHAR,
    start_time TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    end_time TIMESTAMP,
    messages_count INTEGER DEFAULT 0,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS chat_messages (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_messages_id'),
    pet_id BIGINT NOT NULL,
    thread_id VARCHAR NOT NULL,
    session_id UUID,
    role VARCHAR NOT NULL CHECK (role IN ('user', 'assistant')),
    message TEXT NOT NULL,
    response_time_ms BIGINT,
    is_understood BOOLEAN DEFAULT TRUE,
    source VARCHAR,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS chat_topics (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_topics_id'),
    message_id BIGINT NOT NULL,
    topic VARCHAR NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS chat_feedback (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_feedback_id'),
    pet_id BIGINT NOT NULL,
    thread_id VARCHAR NOT NULL,
    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    comment TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_messages_pet ON chat_messages(pet_id, thread_id);
CREATE INDEX IF NOT EXISTS idx_messages_session ON chat_messages(session_id);
CREATE INDEX IF NOT EXISTS idx_topics_message ON chat_topics(message_id);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON chat_sessions(user_id);
"#;

pub fn get_connection(config: &DatabaseConfig) -> DbResult<DbPool> {
    info!("Connecting to DuckDB at {}", config.path);
    let conn = Connection::open(&config.path)?;

    init_schema(&conn)?;

    Ok(Arc::new(Mutex::new(conn)))
}

fn init_schema(conn: &Connection) -> DbResult<()> {
    info!("Initializing database schema");
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
