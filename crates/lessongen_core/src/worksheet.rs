//! crates/lessongen_core/src/worksheet.rs
//!
//! The worksheet assembly and pagination pipeline: a deterministic, read-only
//! projection of one `LessonDocument` into an ordered sequence of fixed page
//! sections, plus the export-profile selector that chooses between the full
//! worksheet, the vocabulary sheet, and the vocabulary quiz.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::answer_key::{derive_answer_letter, normalize_option, position_letter};
use crate::domain::{Correction, DialogueLine, DifficultyLevel, LessonDocument, Question,
    VocabTestQuestion, VocabTestType, VocabularyItem};

/// Footer label used when the operator has not entered a student/class name.
pub const DEFAULT_FOOTER_LABEL: &str = "English Class";

/// The answer key always prints last and carries its own page number,
/// observed as 8 when combined with the seven-page body.
pub const ANSWER_KEY_PAGE_NUMBER: u32 = 8;

/// Vocabulary sheets switch to the denser type scale above this entry count.
pub const COMPACT_VOCAB_THRESHOLD: usize = 10;

/// The fixed-width blank substituted for underscore runs in
/// fill-in-the-blank quiz items.
pub const FIXED_BLANK: &str = "____________________";

// Ruled-space row counts for the handwritten sections.
const WRITING_ROWS: u32 = 8;
const CORRECTION_ROWS: u32 = 6;
const DICTATION_ROWS: u32 = 12;
const TRANSLATION_ROWS: u32 = 5;
const ESSAY_ROWS: u32 = 14;

static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{3,}").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// The three mutually exclusive projections of a lesson document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportProfile {
    Full,
    Vocab,
    VocabTest,
}

impl ExportProfile {
    /// Suffix appended to the topic-derived file name by the rasterizing
    /// collaborator.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            ExportProfile::Full => "_Full_Lesson",
            ExportProfile::Vocab => "_Vocabulary",
            ExportProfile::VocabTest => "_Vocab_Test",
        }
    }
}

/// Header shared by every page of a profile: the class name line and the
/// formatted date line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageHeader {
    pub class_name: String,
    pub date_line: String,
}

/// Running footer stamped on every page. Page numbers are local to the
/// active export profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageFooter {
    pub label: String,
    pub page_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub footer: PageFooter,
    pub body: PageBody,
}

/// A question as it appears on the page: numbered, with labels stripped from
/// every option so the renderer can stamp its own A-D letters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedQuestion {
    pub number: u32,
    pub text: String,
    pub options: Vec<String>,
}

/// One line of the answer key. `letter` is absent when the deriver could not
/// match the stored answer against the options; the text still renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerLine {
    pub number: u32,
    pub letter: Option<char>,
    pub text: String,
}

/// A vocabulary-quiz item rendered per its type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuizItem {
    /// 2-column option grid, letters A-D.
    MultipleChoice {
        number: u32,
        text: String,
        options: Vec<String>,
    },
    /// Underscore runs in the question text replaced by the fixed blank.
    FillInTheBlank { number: u32, text: String },
    /// Right-aligned literal marker.
    TrueFalse {
        number: u32,
        text: String,
        marker: String,
    },
    /// The scrambled word plus a ruled answer line.
    Unscramble {
        number: u32,
        scrambled_word: String,
    },
}

/// The typed body of one worksheet page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum PageBody {
    /// Part A. The first question sits beside the large topic banner; the
    /// remaining questions fill a 2-column grid, with one filler cell when
    /// their count is odd.
    Listening {
        topic_title: String,
        level: DifficultyLevel,
        banner_question: RenderedQuestion,
        grid_questions: Vec<RenderedQuestion>,
        filler_cell: bool,
    },
    /// Parts B and C combined on a single page, two stacked blocks.
    WritingSpeaking {
        prompts: Vec<String>,
        writing_rows: u32,
        speaking_theme: String,
        speaking_points: Vec<String>,
    },
    /// Part D: the error-ridden passage plus ruled correction and dictation
    /// space.
    ErrorCorrection {
        text_with_errors: String,
        correction_rows: u32,
        dictation_rows: u32,
    },
    /// Part E: translation passage and essay prompt, each with ruled space.
    TranslationEssay {
        translation_passage: String,
        translation_rows: u32,
        essay_prompt: String,
        essay_points: Vec<String>,
        essay_rows: u32,
    },
    /// Part F: multi-column reading passage and a 2-column question grid.
    ReadingComprehension {
        paragraphs: Vec<String>,
        grid_questions: Vec<RenderedQuestion>,
    },
    /// The teacher transcript. Audio controls are suppressed in printed
    /// output.
    DialogueScript {
        lines: Vec<DialogueLine>,
        show_audio_controls: bool,
    },
    /// Always last, numbered independently.
    AnswerKey {
        part_a: Vec<AnswerLine>,
        part_f: Vec<AnswerLine>,
        vocab_test: Vec<AnswerLine>,
        corrections: Vec<Correction>,
    },
    /// The vocabulary-only sheet.
    VocabularySheet {
        topic_title: String,
        entries: Vec<VocabularyItem>,
        compact: bool,
    },
    /// The vocabulary-quiz-only sheet.
    VocabQuiz {
        score_denominator: usize,
        items: Vec<QuizItem>,
    },
}

/// One fully assembled, renderable projection of a lesson document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorksheetDocument {
    pub profile: ExportProfile,
    pub header: PageHeader,
    pub pages: Vec<Page>,
}

/// Projects a lesson document into the chosen export profile.
///
/// Pure: the document is only read, and the same inputs always produce the
/// same page sequence. `class_name` overrides the default footer label when
/// non-empty.
pub fn assemble(
    doc: &LessonDocument,
    profile: ExportProfile,
    class_name: Option<&str>,
    date: NaiveDate,
) -> WorksheetDocument {
    let label = footer_label(class_name);
    let header = PageHeader {
        class_name: label.clone(),
        date_line: format_worksheet_date(date),
    };
    let pages = match profile {
        ExportProfile::Full => full_pages(doc, &label),
        ExportProfile::Vocab => vec![vocab_page(doc, &label)],
        ExportProfile::VocabTest => vec![vocab_quiz_page(doc, &label)],
    };
    WorksheetDocument {
        profile,
        header,
        pages,
    }
}

fn footer_label(class_name: Option<&str>) -> String {
    match class_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_FOOTER_LABEL.to_string(),
    }
}

fn page(body: PageBody, label: &str, page_number: u32) -> Page {
    Page {
        footer: PageFooter {
            label: label.to_string(),
            page_number,
        },
        body,
    }
}

fn rendered_question(number: u32, question: &Question) -> RenderedQuestion {
    RenderedQuestion {
        number,
        text: question.text.clone(),
        options: question.options.iter().map(|o| normalize_option(o)).collect(),
    }
}

fn answer_line(number: u32, question: &Question) -> AnswerLine {
    AnswerLine {
        number,
        letter: derive_answer_letter(question),
        text: normalize_option(&question.correct_answer),
    }
}

fn full_pages(doc: &LessonDocument, label: &str) -> Vec<Page> {
    let content = &doc.content;

    // Page 1: Part A. Question 1 beside the topic banner, the rest gridded.
    let banner_question = rendered_question(1, &content.part_a.questions[0]);
    let grid_questions: Vec<RenderedQuestion> = content.part_a.questions[1..]
        .iter()
        .enumerate()
        .map(|(i, q)| rendered_question(i as u32 + 2, q))
        .collect();
    let filler_cell = grid_questions.len() % 2 != 0;
    let listening = PageBody::Listening {
        topic_title: content.topic_title.clone(),
        level: doc.level,
        banner_question,
        grid_questions,
        filler_cell,
    };

    let writing_speaking = PageBody::WritingSpeaking {
        prompts: content.part_b.prompts.clone(),
        writing_rows: WRITING_ROWS,
        speaking_theme: content.part_c.theme.clone(),
        speaking_points: content.part_c.points.clone(),
    };

    let error_correction = PageBody::ErrorCorrection {
        text_with_errors: content.part_d.text_with_errors.clone(),
        correction_rows: CORRECTION_ROWS,
        dictation_rows: DICTATION_ROWS,
    };

    let translation_essay = PageBody::TranslationEssay {
        translation_passage: content.part_e.translation_passage.clone(),
        translation_rows: TRANSLATION_ROWS,
        essay_prompt: content.part_e.essay_prompt.clone(),
        essay_points: content.part_e.essay_points.clone(),
        essay_rows: ESSAY_ROWS,
    };

    let reading = PageBody::ReadingComprehension {
        paragraphs: content
            .part_f
            .passage
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.to_string())
            .collect(),
        grid_questions: content
            .part_f
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| rendered_question(i as u32 + 1, q))
            .collect(),
    };

    let dialogue = PageBody::DialogueScript {
        lines: content.dialogue_script.clone(),
        show_audio_controls: false,
    };

    // The full profile deliberately omits the vocabulary table; it appears
    // only in the vocab and vocab-test profiles.
    let mut pages: Vec<Page> = [
        listening,
        writing_speaking,
        error_correction,
        translation_essay,
        reading,
        dialogue,
    ]
    .into_iter()
    .enumerate()
    .map(|(i, body)| page(body, label, i as u32 + 1))
    .collect();

    pages.push(page(answer_key(doc), label, ANSWER_KEY_PAGE_NUMBER));
    pages
}

fn answer_key(doc: &LessonDocument) -> PageBody {
    let content = &doc.content;
    let numbered = |questions: &[Question]| -> Vec<AnswerLine> {
        questions
            .iter()
            .enumerate()
            .map(|(i, q)| answer_line(i as u32 + 1, q))
            .collect()
    };

    PageBody::AnswerKey {
        part_a: numbered(&content.part_a.questions),
        part_f: numbered(&content.part_f.questions),
        // Vocab-test answers show the stored text as-is; there is no option
        // list to correlate letters against for most item types.
        vocab_test: content
            .vocab_test
            .iter()
            .enumerate()
            .map(|(i, item)| AnswerLine {
                number: i as u32 + 1,
                letter: None,
                text: item.correct_answer.clone(),
            })
            .collect(),
        corrections: content.part_d.corrections.clone(),
    }
}

fn vocab_page(doc: &LessonDocument, label: &str) -> Page {
    let entries = doc.content.vocabulary.clone();
    let compact = entries.len() > COMPACT_VOCAB_THRESHOLD;
    page(
        PageBody::VocabularySheet {
            topic_title: doc.content.topic_title.clone(),
            entries,
            compact,
        },
        label,
        1,
    )
}

fn vocab_quiz_page(doc: &LessonDocument, label: &str) -> Page {
    let items: Vec<QuizItem> = doc
        .content
        .vocab_test
        .iter()
        .enumerate()
        .map(|(i, item)| quiz_item(i as u32 + 1, item))
        .collect();
    page(
        PageBody::VocabQuiz {
            score_denominator: doc.content.vocab_test.len(),
            items,
        },
        label,
        1,
    )
}

fn quiz_item(number: u32, item: &VocabTestQuestion) -> QuizItem {
    match item.question_type {
        VocabTestType::MultipleChoice => QuizItem::MultipleChoice {
            number,
            text: item.question_text.clone(),
            options: item
                .options
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|o| normalize_option(o))
                .collect(),
        },
        VocabTestType::FillInTheBlank => QuizItem::FillInTheBlank {
            number,
            text: BLANK_RUN
                .replace_all(&item.question_text, FIXED_BLANK)
                .into_owned(),
        },
        VocabTestType::TrueFalse => QuizItem::TrueFalse {
            number,
            text: item.question_text.clone(),
            marker: "( TRUE / FALSE )".to_string(),
        },
        VocabTestType::Unscramble => QuizItem::Unscramble {
            number,
            scrambled_word: item.scrambled_word.clone().unwrap_or_default(),
        },
    }
}

/// Formats the worksheet header date, e.g. "March 3rd, 2026".
pub fn format_worksheet_date(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match day % 100 {
        11..=13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{} {}{}, {}", date.format("%B"), day, suffix, date.year())
}

/// Plain-text transcript: one `SPEAKER: text` line per turn, blank line
/// between turns.
pub fn transcript_text(lines: &[DialogueLine]) -> String {
    lines
        .iter()
        .map(|line| format!("{}: {}", line.speaker, line.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// File name for a topic-derived export: whitespace runs become underscores,
/// then the suffix is appended, e.g. "Space_Exploration_Transcript.txt".
pub fn export_file_name(topic_title: &str, suffix: &str) -> String {
    format!(
        "{}{}",
        WHITESPACE_RUN.replace_all(topic_title.trim(), "_"),
        suffix
    )
}

/// Suffix for the plain-text transcript export.
pub const TRANSCRIPT_SUFFIX: &str = "_Transcript.txt";
/// Suffix for the WAVE audio export.
pub const AUDIO_SUFFIX: &str = "_Audio.wav";
