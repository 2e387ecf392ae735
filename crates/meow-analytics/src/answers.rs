use uuid::Uuid;

use meow_types::models::AnswerEntry;

/// Shown when an answer points outside its question's options.
pub const MISSING_OPTION: &str = "—";

/// My answer and my partner's answer to one question.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerPair<'a> {
    pub mine: Option<&'a AnswerEntry>,
    pub partner: Option<&'a AnswerEntry>,
}

impl AnswerPair<'_> {
    pub fn both_answered(&self) -> bool {
        self.mine.is_some() && self.partner.is_some()
    }
}

/// First answer by `me` and first answer by anyone else.
pub fn answer_pair(answers: &[AnswerEntry], me: Uuid) -> AnswerPair<'_> {
    AnswerPair {
        mine: answers.iter().find(|a| a.answer.user_id == me),
        partner: answers.iter().find(|a| a.answer.user_id != me),
    }
}

pub fn option_text(options: &[String], index: u32) -> String {
    options
        .get(index as usize)
        .cloned()
        .unwrap_or_else(|| MISSING_OPTION.to_string())
}

/// A question both partners answered, with both choices spelled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    pub question_id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub you: String,
    pub partner: String,
}

/// Flashcards for every question answered by both users. Questions keep the
/// order in which they first appear in `answers`; answers without embedded
/// question text are skipped.
pub fn reveal_deck(answers: &[AnswerEntry], me: Uuid) -> Vec<Flashcard> {
    let mut by_question: Vec<(Uuid, Vec<&AnswerEntry>)> = Vec::new();
    for entry in answers.iter().filter(|a| a.question.is_some()) {
        let qid = entry.answer.question_id;
        match by_question.iter_mut().find(|(id, _)| *id == qid) {
            Some((_, list)) => list.push(entry),
            None => by_question.push((qid, vec![entry])),
        }
    }

    by_question
        .into_iter()
        .filter_map(|(question_id, list)| {
            let mine = list.iter().find(|a| a.answer.user_id == me)?;
            let partner = list.iter().find(|a| a.answer.user_id != me)?;
            let question = list[0].question.as_ref()?;
            Some(Flashcard {
                question_id,
                question: question.text.clone(),
                you: option_text(&question.options, mine.answer.selected_option_index),
                partner: option_text(&question.options, partner.answer.selected_option_index),
                options: question.options.clone(),
            })
        })
        .collect()
}
