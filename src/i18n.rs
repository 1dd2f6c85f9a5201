use super::*;

use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use unic_langid::LanguageIdentifier;

const EN_FTL: &str = include_str!("../locales/en/main.ftl");
const RU_FTL: &str = include_str!("../locales/ru/main.ftl");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(super) enum Language {
    #[default]
    En,
    Ru,
}

impl Language {
    pub(super) const ALL: [Language; 2] = [Language::En, Language::Ru];

    pub(super) fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
        }
    }

    // Accepts bare codes as well as regional tags like `ru-RU`.
    pub(super) fn from_code(code: &str) -> Option<Language> {
        let base = code.split(|c: char| c == '-' || c == '_').next().unwrap_or(code).trim();
        Language::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(base))
    }

    pub(super) fn label(self) -> &'static str {
        match self {
            Language::En => "🇬🇧 English",
            Language::Ru => "🇷🇺 Русский",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Language::En => EN_FTL,
            Language::Ru => RU_FTL,
        }
    }
}

pub(super) struct Localizer {
    bundles: HashMap<Language, FluentBundle<FluentResource>>,
    default_language: Language,
}

impl Localizer {
    pub(super) fn new(default_language: Language) -> Result<Self> {
        let mut bundles = HashMap::new();
        for language in Language::ALL {
            bundles.insert(language, Self::create_bundle(language)?);
        }
        Ok(Self {
            bundles,
            default_language,
        })
    }

    fn create_bundle(language: Language) -> Result<FluentBundle<FluentResource>> {
        let locale: LanguageIdentifier = language
            .code()
            .parse()
            .with_context(|| format!("parse locale {}", language.code()))?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Isolation marks would end up inside HTML markup and file names.
        bundle.set_use_isolating(false);
        let resource = FluentResource::try_new(language.source().to_string())
            .map_err(|(_, errors)| anyhow!("parse {} messages: {:?}", language.code(), errors))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("load {} messages: {:?}", language.code(), errors))?;
        Ok(bundle)
    }

    pub(super) fn default_language(&self) -> Language {
        self.default_language
    }

    // Looks `key` up in `language`, then in the default language. Falls
    // back to the key itself.
    pub(super) fn text(&self, key: &str, language: Language) -> String {
        self.text_or(key, language, key)
    }

    pub(super) fn text_or(&self, key: &str, language: Language, default: &str) -> String {
        self.lookup(key, language, None)
            .or_else(|| self.lookup(key, self.default_language, None))
            .unwrap_or_else(|| default.to_string())
    }

    pub(super) fn text_args(&self, key: &str, language: Language, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            fluent_args.set(*name, FluentValue::from(*value));
        }
        self.lookup(key, language, Some(&fluent_args))
            .or_else(|| self.lookup(key, self.default_language, Some(&fluent_args)))
            .unwrap_or_else(|| key.to_string())
    }

    fn lookup(&self, key: &str, language: Language, args: Option<&FluentArgs>) -> Option<String> {
        let bundle = self.bundles.get(&language)?;
        let pattern = bundle.get_message(key)?.value()?;
        let mut errors = Vec::new();
        let value = bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            warn!("formatting {} in {}: {:?}", key, language.code(), errors);
        }
        Some(value.into_owned())
    }
}
