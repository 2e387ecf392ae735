use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS spaces (
            id          TEXT PRIMARY KEY,
            code        TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY,
            space_id      TEXT NOT NULL REFERENCES spaces(id),
            name          TEXT NOT NULL,
            avatar_color  TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_users_space
            ON users(space_id);

        CREATE TABLE IF NOT EXISTS moods (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            space_id    TEXT NOT NULL REFERENCES spaces(id),
            emoji       TEXT NOT NULL,
            label       TEXT NOT NULL,
            color       TEXT NOT NULL,
            tags        TEXT NOT NULL DEFAULT '[]',
            note        TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_moods_space
            ON moods(space_id, created_at);

        CREATE TABLE IF NOT EXISTS questions (
            id       TEXT PRIMARY KEY,
            text     TEXT NOT NULL,
            options  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS answers (
            id                     TEXT PRIMARY KEY,
            user_id                TEXT NOT NULL REFERENCES users(id),
            space_id               TEXT NOT NULL REFERENCES spaces(id),
            question_id            TEXT NOT NULL REFERENCES questions(id),
            selected_option_index  INTEGER NOT NULL,
            created_at             TEXT NOT NULL,
            UNIQUE(user_id, question_id)
        );

        CREATE INDEX IF NOT EXISTS idx_answers_space
            ON answers(space_id, question_id);

        -- Seed the default question deck
        INSERT OR IGNORE INTO questions (id, text, options) VALUES
            ('00000000-0000-0000-0000-000000000101', 'Perfect lazy Sunday?',
                '["Movie marathon", "Long walk outside", "Cooking together", "Sleeping in"]'),
            ('00000000-0000-0000-0000-000000000102', 'Pick a dream trip',
                '["Beach", "Mountains", "Big city", "Road trip"]'),
            ('00000000-0000-0000-0000-000000000103', 'Best way to cheer me up?',
                '["Snacks", "A hug", "A silly video", "Give me space"]'),
            ('00000000-0000-0000-0000-000000000104', 'Morning drink?',
                '["Coffee", "Tea", "Juice", "Water"]');
        "#,
    )?;

    info!("Database migrations complete");
    Ok(())
}
