/// Database row types. These map directly to SQLite rows.
/// Distinct from meow-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct SpaceRow {
    pub id: String,
    pub code: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub space_id: String,
    pub name: String,
    pub avatar_color: String,
    pub created_at: String,
}

/// Insert payload for the mood log.
pub struct NewMood<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub space_id: &'a str,
    pub emoji: &'a str,
    pub label: &'a str,
    pub color: &'a str,
    /// JSON array text
    pub tags: &'a str,
    pub note: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct MoodRow {
    pub id: String,
    pub user_id: String,
    pub space_id: String,
    pub emoji: String,
    pub label: String,
    pub color: String,
    pub tags: String,
    pub note: Option<String>,
    pub created_at: String,
    pub author_name: Option<String>,
    pub author_color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuestionRow {
    pub id: String,
    pub text: String,
    pub options: String,
}

#[derive(Debug, Clone)]
pub struct AnswerRow {
    pub id: String,
    pub user_id: String,
    pub space_id: String,
    pub question_id: String,
    pub selected_option_index: i64,
    pub created_at: String,
    pub author_name: Option<String>,
    pub author_color: Option<String>,
    pub question_text: Option<String>,
    pub question_options: Option<String>,
}
