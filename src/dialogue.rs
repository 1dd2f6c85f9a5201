use super::*;

use std::sync::Mutex;

use crate::render::Formatter;
use crate::word_store::UploadOutcome;

#[derive(Debug, Clone)]
pub(super) enum Event {
    Command(String),
    Button(String),
    Text(String),
    Upload { file_name: String, bytes: Vec<u8> },
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Action {
    SelectLanguage(Language),
    SelectDictionary(String),
    AppendTo(String),
    RandomWord,
    CountMenu,
    // Zero asks for the whole dictionary.
    Words(usize),
    Settings,
    DictionaryMenu,
    LanguageMenu,
    AddWords,
    Cancel,
    Back,
}

impl Action {
    pub(super) fn token(&self) -> String {
        match self {
            Action::SelectLanguage(language) => format!("lang:{}", language.code()),
            Action::SelectDictionary(name) => format!("dict:{}", name),
            Action::AppendTo(name) => format!("add:{}", name),
            Action::RandomWord => "random".to_string(),
            Action::CountMenu => "many".to_string(),
            Action::Words(0) => "many:all".to_string(),
            Action::Words(count) => format!("many:{}", count),
            Action::Settings => "settings".to_string(),
            Action::DictionaryMenu => "settings:dict".to_string(),
            Action::LanguageMenu => "settings:lang".to_string(),
            Action::AddWords => "addword".to_string(),
            Action::Cancel => "cancel".to_string(),
            Action::Back => "back".to_string(),
        }
    }

    pub(super) fn parse(token: &str) -> Option<Action> {
        let action = match token.split_once(':') {
            Some(("lang", code)) => Action::SelectLanguage(Language::from_code(code)?),
            Some(("dict", name)) if !name.is_empty() => Action::SelectDictionary(name.to_string()),
            Some(("add", name)) if !name.is_empty() => Action::AppendTo(name.to_string()),
            Some(("many", "all")) => Action::Words(0),
            Some(("many", count)) => match count.parse::<usize>() {
                Ok(count) if count > 0 => Action::Words(count),
                _ => return None,
            },
            Some(("settings", "dict")) => Action::DictionaryMenu,
            Some(("settings", "lang")) => Action::LanguageMenu,
            Some(_) => return None,
            None => match token {
                "random" => Action::RandomWord,
                "many" => Action::CountMenu,
                "settings" => Action::Settings,
                "addword" => Action::AddWords,
                "cancel" => Action::Cancel,
                "back" => Action::Back,
                _ => return None,
            },
        };
        Some(action)
    }
}

#[derive(Debug, Clone)]
enum Input {
    Start,
    Help,
    Action(Action),
    Text(String),
    Upload { file_name: String, bytes: Vec<u8> },
    Unrecognized,
}

impl Input {
    fn from_event(event: Event) -> Self {
        match event {
            Event::Command(command) => match command.as_str() {
                "start" => Input::Start,
                "help" => Input::Help,
                "random" => Input::Action(Action::RandomWord),
                "words" => Input::Action(Action::CountMenu),
                "settings" => Input::Action(Action::Settings),
                "language" => Input::Action(Action::LanguageMenu),
                "dictionary" => Input::Action(Action::DictionaryMenu),
                "add" => Input::Action(Action::AddWords),
                "cancel" => Input::Action(Action::Cancel),
                _ => Input::Unrecognized,
            },
            Event::Button(token) => Action::parse(&token)
                .map(Input::Action)
                .unwrap_or(Input::Unrecognized),
            Event::Text(text) => Input::Text(text),
            Event::Upload { file_name, bytes } => Input::Upload { file_name, bytes },
            Event::Unsupported => Input::Unrecognized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum DialogueState {
    New,
    AwaitingDictionary,
    Ready,
    AddWordAwaitingText,
    AddWordAwaitingDict { draft: Vec<String> },
}

#[derive(Debug, Clone)]
enum AddWords {
    AwaitingText,
    AwaitingDictionary(Vec<String>),
}

pub(super) struct Dialogue {
    words: WordStore,
    sessions: SessionStore,
    texts: Localizer,
    reference_url: Option<String>,
    drafts: Mutex<HashMap<u64, AddWords>>,
}

impl Dialogue {
    pub(super) fn new(
        words: WordStore,
        sessions: SessionStore,
        texts: Localizer,
        reference_url: Option<String>,
    ) -> Self {
        Self {
            words,
            sessions,
            texts,
            reference_url,
            drafts: Mutex::new(HashMap::new()),
        }
    }

    pub(super) fn state(&self, user_id: u64) -> DialogueState {
        let session = self.sessions.get(user_id);
        if session.language.is_none() {
            return DialogueState::New;
        }
        match self.draft(user_id) {
            Some(AddWords::AwaitingText) => DialogueState::AddWordAwaitingText,
            Some(AddWords::AwaitingDictionary(draft)) => DialogueState::AddWordAwaitingDict { draft },
            None if session.dictionary.is_none() => DialogueState::AwaitingDictionary,
            None => DialogueState::Ready,
        }
    }

    pub(super) fn language_for(&self, user_id: u64) -> Language {
        self.sessions
            .get(user_id)
            .language
            .unwrap_or_else(|| self.texts.default_language())
    }

    pub(super) fn formatter(&self, language: Language) -> Formatter<'_> {
        Formatter {
            texts: &self.texts,
            language,
            reference_url: self.reference_url.as_deref(),
        }
    }

    // Runs one event through the state machine. Every event yields at
    // least one reply.
    pub(super) fn handle(&self, user_id: u64, event: Event) -> Result<Vec<Reply>> {
        let input = Input::from_event(event);

        if let Input::Action(Action::SelectLanguage(language)) = input {
            return self.select_language(user_id, language);
        }

        match self.state(user_id) {
            DialogueState::New => {
                let fmt = self.formatter(self.texts.default_language());
                Ok(vec![fmt.language_menu("welcome")])
            }
            DialogueState::AddWordAwaitingText => self.on_awaiting_text(user_id, input),
            DialogueState::AddWordAwaitingDict { draft } => {
                self.on_awaiting_dictionary(user_id, draft, input)
            }
            DialogueState::AwaitingDictionary | DialogueState::Ready => self.on_menu(user_id, input),
        }
    }

    fn select_language(&self, user_id: u64, language: Language) -> Result<Vec<Reply>> {
        self.sessions.set_language(user_id, language)?;
        info!("user {} set language {}", user_id, language.code());
        let fmt = self.formatter(language);
        let mut replies = vec![Reply::text(fmt.t("language-saved"))];
        match self.state(user_id) {
            DialogueState::AddWordAwaitingText => replies.push(fmt.cancellable("add-words-prompt")),
            DialogueState::AddWordAwaitingDict { draft } => {
                replies.push(fmt.append_target_menu(&self.words.list_dictionaries()?, draft.len()))
            }
            _ => replies.extend(self.home(user_id)?),
        }
        Ok(replies)
    }

    fn on_awaiting_text(&self, user_id: u64, input: Input) -> Result<Vec<Reply>> {
        let fmt = self.formatter(self.language_for(user_id));
        match input {
            Input::Text(text) => {
                let draft = split_words(&text);
                if draft.is_empty() {
                    return Ok(vec![fmt.cancellable("add-words-empty")]);
                }
                let names = self.words.list_dictionaries()?;
                let reply = fmt.append_target_menu(&names, draft.len());
                self.set_draft(user_id, Some(AddWords::AwaitingDictionary(draft)));
                Ok(vec![reply])
            }
            Input::Action(Action::Cancel) => self.cancel_add_words(user_id),
            Input::Help => Ok(vec![
                Reply::text(fmt.t("help")),
                fmt.cancellable("add-words-prompt"),
            ]),
            Input::Action(Action::AppendTo(_)) | Input::Unrecognized => {
                Ok(vec![fmt.cancellable("add-words-prompt")])
            }
            other => {
                self.set_draft(user_id, None);
                self.on_menu(user_id, other)
            }
        }
    }

    fn on_awaiting_dictionary(
        &self,
        user_id: u64,
        draft: Vec<String>,
        input: Input,
    ) -> Result<Vec<Reply>> {
        let fmt = self.formatter(self.language_for(user_id));
        match input {
            Input::Action(Action::AppendTo(name)) => {
                let names = self.words.list_dictionaries()?;
                if !names.contains(&name) {
                    let name = teloxide::utils::html::escape(display_name(&name));
                    return Ok(vec![
                        Reply::text(fmt.t_args("dictionary-unavailable", &[("name", name.as_str())])),
                        fmt.append_target_menu(&names, draft.len()),
                    ]);
                }
                let appended = self.words.append_words(&name, &draft)?;
                self.set_draft(user_id, None);
                info!("user {} added {} words to {}", user_id, appended, name);
                let count = appended.to_string();
                let shown = teloxide::utils::html::escape(display_name(&name));
                let mut replies = vec![Reply::text(fmt.t_args(
                    "add-words-done",
                    &[("count", count.as_str()), ("name", shown.as_str())],
                ))];
                replies.extend(self.home(user_id)?);
                Ok(replies)
            }
            Input::Action(Action::Cancel) => self.cancel_add_words(user_id),
            Input::Help => Ok(vec![
                Reply::text(fmt.t("help")),
                fmt.append_target_menu(&self.words.list_dictionaries()?, draft.len()),
            ]),
            Input::Text(_) | Input::Unrecognized => Ok(vec![
                fmt.append_target_menu(&self.words.list_dictionaries()?, draft.len()),
            ]),
            other => {
                self.set_draft(user_id, None);
                self.on_menu(user_id, other)
            }
        }
    }

    fn cancel_add_words(&self, user_id: u64) -> Result<Vec<Reply>> {
        self.set_draft(user_id, None);
        let fmt = self.formatter(self.language_for(user_id));
        let mut replies = vec![Reply::text(fmt.t("add-words-cancelled"))];
        replies.extend(self.home(user_id)?);
        Ok(replies)
    }

    fn on_menu(&self, user_id: u64, input: Input) -> Result<Vec<Reply>> {
        let session = self.sessions.get(user_id);
        let fmt = self.formatter(self.language_for(user_id));
        let action = match input {
            Input::Action(action) => action,
            Input::Help => {
                let mut replies = vec![Reply::text(fmt.t("help"))];
                replies.extend(self.home(user_id)?);
                return Ok(replies);
            }
            Input::Upload { file_name, bytes } => return self.upload(user_id, &file_name, &bytes),
            Input::Start | Input::Text(_) | Input::Unrecognized => return self.home(user_id),
        };

        match action {
            Action::Settings => Ok(vec![fmt.settings_menu(session.dictionary.as_deref())]),
            Action::LanguageMenu => Ok(vec![fmt.language_menu("choose-language")]),
            Action::DictionaryMenu => {
                let names = self.words.list_dictionaries()?;
                Ok(vec![fmt.dictionary_menu(&names, session.dictionary.is_some())])
            }
            Action::SelectDictionary(name) => self.select_dictionary(user_id, &name),
            Action::AddWords => {
                self.set_draft(user_id, Some(AddWords::AwaitingText));
                Ok(vec![fmt.cancellable("add-words-prompt")])
            }
            Action::RandomWord | Action::CountMenu | Action::Words(_) => {
                let Some(dictionary) = session.dictionary else {
                    let names = self.words.list_dictionaries()?;
                    return Ok(vec![
                        Reply::text(fmt.t("need-dictionary")),
                        fmt.dictionary_menu(&names, false),
                    ]);
                };
                let mut replies = match action {
                    Action::CountMenu => return Ok(vec![fmt.count_menu()]),
                    Action::RandomWord => fmt.random_word(&self.words.sample_words(&dictionary, 1)),
                    Action::Words(count) => {
                        fmt.word_list(&dictionary, &self.words.sample_words(&dictionary, count))
                    }
                    _ => Vec::new(),
                };
                replies.push(fmt.what_next());
                Ok(replies)
            }
            Action::Back | Action::Cancel | Action::AppendTo(_) => self.home(user_id),
            Action::SelectLanguage(language) => self.select_language(user_id, language),
        }
    }

    fn select_dictionary(&self, user_id: u64, name: &str) -> Result<Vec<Reply>> {
        let fmt = self.formatter(self.language_for(user_id));
        let shown = teloxide::utils::html::escape(display_name(name));
        if !self.words.contains(name)? {
            let mut replies = vec![Reply::text(
                fmt.t_args("dictionary-unavailable", &[("name", shown.as_str())]),
            )];
            let names = self.words.list_dictionaries()?;
            let has_dictionary = self.sessions.get(user_id).dictionary.is_some();
            replies.push(fmt.dictionary_menu(&names, has_dictionary));
            return Ok(replies);
        }
        self.sessions.set_dictionary(user_id, name)?;
        info!("user {} set dictionary {}", user_id, name);
        Ok(vec![
            Reply::text(fmt.t_args("dictionary-saved", &[("name", shown.as_str())])),
            fmt.main_menu(name),
        ])
    }

    fn upload(&self, user_id: u64, file_name: &str, bytes: &[u8]) -> Result<Vec<Reply>> {
        let fmt = self.formatter(self.language_for(user_id));
        match self.words.replace_dictionary(file_name, bytes)? {
            UploadOutcome::Stored { name, words } => {
                self.sessions.set_dictionary(user_id, &name)?;
                info!("user {} uploaded {} ({} words)", user_id, name, words);
                let shown = teloxide::utils::html::escape(display_name(&name));
                let count = words.to_string();
                Ok(vec![
                    Reply::text(fmt.t_args(
                        "upload-saved",
                        &[("name", shown.as_str()), ("count", count.as_str())],
                    )),
                    fmt.main_menu(&name),
                ])
            }
            outcome => {
                warn!("user {} upload {:?} rejected: {:?}", user_id, file_name, outcome);
                let mut replies = vec![Reply::text(fmt.t("upload-rejected"))];
                replies.extend(self.home(user_id)?);
                Ok(replies)
            }
        }
    }

    fn home(&self, user_id: u64) -> Result<Vec<Reply>> {
        let session = self.sessions.get(user_id);
        let Some(language) = session.language else {
            let fmt = self.formatter(self.texts.default_language());
            return Ok(vec![fmt.language_menu("welcome")]);
        };
        let fmt = self.formatter(language);
        match session.dictionary {
            Some(name) => Ok(vec![fmt.main_menu(&name)]),
            None => {
                let names = self.words.list_dictionaries()?;
                Ok(vec![fmt.dictionary_menu(&names, false)])
            }
        }
    }

    fn draft(&self, user_id: u64) -> Option<AddWords> {
        let drafts = self.drafts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        drafts.get(&user_id).cloned()
    }

    fn set_draft(&self, user_id: u64, draft: Option<AddWords>) {
        let mut drafts = self.drafts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match draft {
            Some(draft) => {
                drafts.insert(user_id, draft);
            }
            None => {
                drafts.remove(&user_id);
            }
        }
    }
}
