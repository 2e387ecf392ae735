use crate::models::{AnswerRow, MoodRow, NewMood, QuestionRow, SpaceRow, UserRow};
use crate::{Database, now_text};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use tracing::warn;

/// Attempts at finding an unused space code before giving up.
const CODE_ATTEMPTS: usize = 5;

const MOOD_COLUMNS: &str = "m.id, m.user_id, m.space_id, m.emoji, m.label, m.color, m.tags, m.note, m.created_at,
                            u.name, u.avatar_color";

const ANSWER_COLUMNS: &str = "a.id, a.user_id, a.space_id, a.question_id, a.selected_option_index, a.created_at,
                              u.name, u.avatar_color, q.text, q.options";

impl Database {
    // -- Spaces --

    /// Create a space under a freshly generated code. Codes that collide with
    /// an existing space are regenerated; `Ok(None)` means every attempt collided.
    pub fn create_space<F>(&self, id: &str, mut next_code: F) -> Result<Option<SpaceRow>>
    where
        F: FnMut() -> String,
    {
        self.with_conn(|conn| {
            for _ in 0..CODE_ATTEMPTS {
                let code = next_code();
                let created_at = now_text();
                match conn.execute(
                    "INSERT INTO spaces (id, code, created_at) VALUES (?1, ?2, ?3)",
                    (id, &code, &created_at),
                ) {
                    Ok(_) => {
                        return Ok(Some(SpaceRow {
                            id: id.to_string(),
                            code,
                            created_at,
                        }));
                    }
                    Err(e) if is_unique_violation(&e) => {
                        warn!("Space code {} already taken, regenerating", code);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(None)
        })
    }

    pub fn get_space_by_code(&self, code: &str) -> Result<Option<SpaceRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, code, created_at FROM spaces WHERE code = ?1",
                [code.to_ascii_uppercase()],
                space_from_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn get_space_by_id(&self, id: &str) -> Result<Option<SpaceRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, code, created_at FROM spaces WHERE id = ?1",
                [id],
                space_from_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    // -- Users --

    pub fn create_user(&self, id: &str, space_id: &str, name: &str, avatar_color: &str) -> Result<UserRow> {
        self.with_conn(|conn| {
            let created_at = now_text();
            conn.execute(
                "INSERT INTO users (id, space_id, name, avatar_color, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, space_id, name, avatar_color, &created_at),
            )?;
            Ok(UserRow {
                id: id.to_string(),
                space_id: space_id.to_string(),
                name: name.to_string(),
                avatar_color: avatar_color.to_string(),
                created_at,
            })
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, space_id, name, avatar_color, created_at FROM users WHERE id = ?1",
                [id],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        space_id: row.get(1)?,
                        name: row.get(2)?,
                        avatar_color: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
        })
    }

    // -- Moods --

    /// Append a mood to the log and return it joined with its author.
    pub fn insert_mood(&self, mood: &NewMood<'_>) -> Result<MoodRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO moods (id, user_id, space_id, emoji, label, color, tags, note, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    mood.id,
                    mood.user_id,
                    mood.space_id,
                    mood.emoji,
                    mood.label,
                    mood.color,
                    mood.tags,
                    mood.note,
                    now_text(),
                ],
            )?;

            let sql = format!(
                "SELECT {MOOD_COLUMNS} FROM moods m LEFT JOIN users u ON m.user_id = u.id WHERE m.id = ?1"
            );
            conn.query_row(&sql, [mood.id], mood_from_row)
                .map_err(|e| anyhow!("Inserted mood {} not readable: {}", mood.id, e))
        })
    }

    /// Most recent moods of a space, newest first.
    pub fn get_moods(&self, space_id: &str, limit: u32) -> Result<Vec<MoodRow>> {
        self.with_conn(|conn| query_moods(conn, space_id, limit))
    }

    // -- Questions --

    pub fn get_questions(&self) -> Result<Vec<QuestionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, text, options FROM questions ORDER BY id")?;
            let rows = stmt
                .query_map([], question_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_question(&self, id: &str) -> Result<Option<QuestionRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, text, options FROM questions WHERE id = ?1",
                [id],
                question_from_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    // -- Answers --

    /// Insert or overwrite the answer of `user_id` to `question_id`.
    /// The pair keeps a single row; its index and timestamp follow the latest call.
    pub fn upsert_answer(
        &self,
        id: &str,
        user_id: &str,
        space_id: &str,
        question_id: &str,
        selected_option_index: u32,
    ) -> Result<AnswerRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO answers (id, user_id, space_id, question_id, selected_option_index, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user_id, question_id) DO UPDATE SET
                    space_id = excluded.space_id,
                    selected_option_index = excluded.selected_option_index,
                    created_at = excluded.created_at",
                rusqlite::params![id, user_id, space_id, question_id, selected_option_index, now_text()],
            )?;

            let sql = format!(
                "SELECT {ANSWER_COLUMNS} FROM answers a
                 LEFT JOIN users u ON a.user_id = u.id
                 LEFT JOIN questions q ON a.question_id = q.id
                 WHERE a.user_id = ?1 AND a.question_id = ?2"
            );
            conn.query_row(&sql, [user_id, question_id], answer_from_row)
                .map_err(|e| anyhow!("Upserted answer for {} not readable: {}", user_id, e))
        })
    }

    /// Answers of a space, newest first; optionally limited to one question.
    pub fn get_answers(&self, space_id: &str, question_id: Option<&str>) -> Result<Vec<AnswerRow>> {
        self.with_conn(|conn| {
            let filter = if question_id.is_some() { "AND a.question_id = ?2" } else { "" };
            let sql = format!(
                "SELECT {ANSWER_COLUMNS} FROM answers a
                 LEFT JOIN users u ON a.user_id = u.id
                 LEFT JOIN questions q ON a.question_id = q.id
                 WHERE a.space_id = ?1 {filter}
                 ORDER BY a.created_at DESC, a.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = match question_id {
                Some(qid) => stmt.query_map([space_id, qid], answer_from_row)?,
                None => stmt.query_map([space_id], answer_from_row)?,
            }
            .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_moods(conn: &Connection, space_id: &str, limit: u32) -> Result<Vec<MoodRow>> {
    // JOIN users to fetch author fields in a single query
    let sql = format!(
        "SELECT {MOOD_COLUMNS}
         FROM moods m
         LEFT JOIN users u ON m.user_id = u.id
         WHERE m.space_id = ?1
         ORDER BY m.created_at DESC, m.rowid DESC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map(rusqlite::params![space_id, limit], mood_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn space_from_row(row: &Row<'_>) -> rusqlite::Result<SpaceRow> {
    Ok(SpaceRow {
        id: row.get(0)?,
        code: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn mood_from_row(row: &Row<'_>) -> rusqlite::Result<MoodRow> {
    Ok(MoodRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        space_id: row.get(2)?,
        emoji: row.get(3)?,
        label: row.get(4)?,
        color: row.get(5)?,
        tags: row.get(6)?,
        note: row.get(7)?,
        created_at: row.get(8)?,
        author_name: row.get(9)?,
        author_color: row.get(10)?,
    })
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<QuestionRow> {
    Ok(QuestionRow {
        id: row.get(0)?,
        text: row.get(1)?,
        options: row.get(2)?,
    })
}

fn answer_from_row(row: &Row<'_>) -> rusqlite::Result<AnswerRow> {
    Ok(AnswerRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        space_id: row.get(2)?,
        question_id: row.get(3)?,
        selected_option_index: row.get(4)?,
        created_at: row.get(5)?,
        author_name: row.get(6)?,
        author_color: row.get(7)?,
        question_text: row.get(8)?,
        question_options: row.get(9)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const QUESTION: &str = "00000000-0000-0000-0000-000000000101";

    fn id() -> String {
        Uuid::new_v4().to_string()
    }

    fn seeded() -> (Database, SpaceRow, UserRow) {
        let db = Database::open_in_memory().unwrap();
        let space = db.create_space(&id(), || "ABC123".into()).unwrap().unwrap();
        let user = db.create_user(&id(), &space.id, "Mia", "bg-pastel-pink").unwrap();
        (db, space, user)
    }

    fn mood<'a>(id: &'a str, user: &'a UserRow, emoji: &'a str) -> NewMood<'a> {
        NewMood {
            id,
            user_id: &user.id,
            space_id: &user.space_id,
            emoji,
            label: "Happy",
            color: "bg-pastel-yellow",
            tags: r#"["work"]"#,
            note: None,
        }
    }

    #[test]
    fn space_code_collision_regenerates() {
        let (db, space, _) = seeded();
        let mut codes = vec!["ZZZ999".to_string(), space.code.clone()];
        let created = db.create_space(&id(), || codes.pop().unwrap()).unwrap().unwrap();
        assert_eq!(created.code, "ZZZ999");
    }

    #[test]
    fn space_code_exhaustion_returns_none() {
        let (db, space, _) = seeded();
        let created = db.create_space(&id(), || space.code.clone()).unwrap();
        assert!(created.is_none());
    }

    #[test]
    fn space_lookup_is_case_insensitive() {
        let (db, space, _) = seeded();
        let found = db.get_space_by_code("abc123").unwrap().unwrap();
        assert_eq!(found.id, space.id);
        assert!(db.get_space_by_code("NOPE00").unwrap().is_none());
    }

    #[test]
    fn moods_come_back_newest_first_with_author() {
        let (db, _, user) = seeded();
        let ids: Vec<String> = (0..3).map(|_| id()).collect();
        for (i, emoji) in ["😊", "😢", "😴"].iter().enumerate() {
            db.insert_mood(&mood(&ids[i], &user, emoji)).unwrap();
        }

        let rows = db.get_moods(&user.space_id, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].emoji, "😴");
        assert_eq!(rows[1].emoji, "😢");
        assert_eq!(rows[0].author_name.as_deref(), Some("Mia"));
        assert_eq!(rows[0].tags, r#"["work"]"#);
    }

    #[test]
    fn answer_upsert_keeps_one_row() {
        let (db, space, user) = seeded();
        let first = db.upsert_answer(&id(), &user.id, &space.id, QUESTION, 0).unwrap();
        let second = db.upsert_answer(&id(), &user.id, &space.id, QUESTION, 2).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.selected_option_index, 2);
        assert_eq!(second.question_text.as_deref(), Some("Perfect lazy Sunday?"));

        let all = db.get_answers(&space.id, None).unwrap();
        assert_eq!(all.len(), 1);
        let by_question = db.get_answers(&space.id, Some(QUESTION)).unwrap();
        assert_eq!(by_question.len(), 1);
        assert!(db.get_answers(&space.id, Some("missing")).unwrap().is_empty());
    }

    #[test]
    fn questions_are_seeded() {
        let db = Database::open_in_memory().unwrap();
        let questions = db.get_questions().unwrap();
        assert_eq!(questions.len(), 4);
        assert!(db.get_question(QUESTION).unwrap().is_some());
    }
}
