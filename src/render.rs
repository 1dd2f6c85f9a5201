use super::*;

use std::collections::BTreeSet;

use teloxide::utils::html;

use crate::dialogue::Action;

#[derive(Debug, Clone)]
pub(super) enum Reply {
    Text {
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Document {
        file_name: String,
        bytes: Vec<u8>,
    },
}

impl Reply {
    pub(super) fn text(text: impl Into<String>) -> Self {
        Reply::Text {
            text: text.into(),
            keyboard: None,
        }
    }

    pub(super) fn menu(text: impl Into<String>, keyboard: InlineKeyboardMarkup) -> Self {
        Reply::Text {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

pub(super) struct Formatter<'a> {
    pub(super) texts: &'a Localizer,
    pub(super) language: Language,
    pub(super) reference_url: Option<&'a str>,
}

impl<'a> Formatter<'a> {
    pub(super) fn t(&self, key: &str) -> String {
        self.texts.text(key, self.language)
    }

    pub(super) fn t_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.texts.text_args(key, self.language, args)
    }

    fn button(&self, key: &str, action: Action) -> InlineKeyboardButton {
        InlineKeyboardButton::callback(self.t(key), action.token())
    }

    pub(super) fn main_menu(&self, dictionary: &str) -> Reply {
        let name = html::escape(display_name(dictionary));
        let text = format!(
            "{}\n\n{}",
            self.t_args("active-dictionary", &[("name", name.as_str())]),
            self.t("choose-action")
        );
        Reply::menu(text, self.main_menu_keyboard())
    }

    pub(super) fn what_next(&self) -> Reply {
        Reply::menu(self.t("what-next"), self.main_menu_keyboard())
    }

    pub(super) fn main_menu_keyboard(&self) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::new(vec![
            vec![self.button("btn-random", Action::RandomWord)],
            vec![self.button("btn-many", Action::CountMenu)],
            vec![self.button("btn-add-words", Action::AddWords)],
            vec![self.button("btn-settings", Action::Settings)],
        ])
    }

    pub(super) fn count_menu(&self) -> Reply {
        let sizes: Vec<InlineKeyboardButton> = BATCH_SIZES
            .iter()
            .map(|size| InlineKeyboardButton::callback(size.to_string(), Action::Words(*size).token()))
            .collect();
        let keyboard = InlineKeyboardMarkup::new(vec![
            sizes,
            vec![self.button("btn-all", Action::Words(0))],
            vec![self.button("btn-back", Action::Back)],
        ]);
        Reply::menu(self.t("choose-count"), keyboard)
    }

    pub(super) fn settings_menu(&self, dictionary: Option<&str>) -> Reply {
        let mut text = self.t("settings-title");
        if let Some(name) = dictionary {
            text.push_str("\n\n");
            let name = html::escape(display_name(name));
            text.push_str(&self.t_args("active-dictionary", &[("name", name.as_str())]));
        }
        text.push_str("\n\n");
        text.push_str(&self.t("upload-hint"));
        let keyboard = InlineKeyboardMarkup::new(vec![
            vec![self.button("btn-change-dictionary", Action::DictionaryMenu)],
            vec![self.button("btn-change-language", Action::LanguageMenu)],
            vec![self.button("btn-back", Action::Back)],
        ]);
        Reply::menu(text, keyboard)
    }

    pub(super) fn language_menu(&self, key: &str) -> Reply {
        Reply::menu(self.t(key), language_keyboard())
    }

    pub(super) fn dictionary_menu(&self, names: &BTreeSet<String>, with_back: bool) -> Reply {
        if names.is_empty() {
            return Reply::text(self.t("no-dictionaries"));
        }
        let mut rows = dictionary_rows(names, Action::SelectDictionary);
        if with_back {
            rows.push(vec![self.button("btn-back", Action::Back)]);
        }
        Reply::menu(self.t("choose-dictionary"), InlineKeyboardMarkup::new(rows))
    }

    pub(super) fn append_target_menu(&self, names: &BTreeSet<String>, draft_len: usize) -> Reply {
        let mut rows = dictionary_rows(names, Action::AppendTo);
        rows.push(vec![self.button("btn-cancel", Action::Cancel)]);
        let count = draft_len.to_string();
        let text = self.t_args("add-words-target", &[("count", count.as_str())]);
        Reply::menu(text, InlineKeyboardMarkup::new(rows))
    }

    pub(super) fn cancellable(&self, key: &str) -> Reply {
        Reply::menu(
            self.t(key),
            InlineKeyboardMarkup::new(vec![vec![self.button("btn-cancel", Action::Cancel)]]),
        )
    }

    pub(super) fn word_link(&self, word: &str) -> String {
        let escaped = html::escape(word);
        match self.reference_url {
            Some(template) => {
                let url = template
                    .replace("{lang}", self.language.code())
                    .replace("{word}", &urlencoding::encode(word));
                format!("<a href=\"{}\">{}</a>", html::escape(&url), escaped)
            }
            None => escaped,
        }
    }

    pub(super) fn random_word(&self, words: &[String]) -> Vec<Reply> {
        match words.first() {
            Some(word) => {
                let word = format!("<b>{}</b>", self.word_link(word));
                vec![Reply::text(self.t_args("random-word", &[("word", word.as_str())]))]
            }
            None => vec![Reply::text(self.t("no-words"))],
        }
    }

    // Short lists go inline as bullets; longer ones become an attachment
    // named after the source dictionary.
    pub(super) fn word_list(&self, dictionary: &str, words: &[String]) -> Vec<Reply> {
        if words.is_empty() {
            return vec![Reply::text(self.t("no-words"))];
        }
        if words.len() <= INLINE_WORD_LIMIT {
            let mut text = self.t("words-header");
            for word in words {
                text.push_str("\n• ");
                text.push_str(&self.word_link(word));
            }
            return vec![Reply::text(text)];
        }
        let mut content = words.join("\n");
        content.push('\n');
        vec![
            Reply::text(self.t("words-file-ready")),
            Reply::Document {
                file_name: attachment_name(dictionary),
                bytes: content.into_bytes(),
            },
        ]
    }
}

pub(super) fn attachment_name(dictionary: &str) -> String {
    format!("words_from_{}", dictionary)
}

pub(super) fn language_keyboard() -> InlineKeyboardMarkup {
    let row: Vec<InlineKeyboardButton> = Language::ALL
        .iter()
        .map(|lang| InlineKeyboardButton::callback(lang.label(), Action::SelectLanguage(*lang).token()))
        .collect();
    InlineKeyboardMarkup::new(vec![row])
}

fn dictionary_rows(
    names: &BTreeSet<String>,
    action: fn(String) -> Action,
) -> Vec<Vec<InlineKeyboardButton>> {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let mut current_row = Vec::new();
    for name in names {
        let token = action(name.clone()).token();
        if token.len() > MAX_CALLBACK_DATA_LEN {
            warn!("dictionary name too long for a button: {}", name);
            continue;
        }
        current_row.push(InlineKeyboardButton::callback(display_name(name), token));
        if current_row.len() == 2 {
            rows.push(std::mem::take(&mut current_row));
        }
    }
    if !current_row.is_empty() {
        rows.push(current_row);
    }
    rows
}
