//! Lexicon for every user-facing text, backed by Fluent resources under
//! `locales/<lang>/main.ftl`.

use anyhow::Result;
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::warn;
use unic_langid::LanguageIdentifier;

/// Languages shipped with the bot; the first one is the fallback
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "ru"];
pub const DEFAULT_LANGUAGE: &str = "en";

/// Directory holding the bundled Fluent resources
pub fn default_locales_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("locales")
}

/// Localization manager for the film bot
pub struct LocalizationManager {
    bundles: HashMap<String, Arc<FluentBundle<FluentResource>>>,
}

impl LocalizationManager {
    /// Create a manager from the bundled locales directory
    pub fn new() -> Result<Self> {
        Self::from_dir(&default_locales_dir())
    }

    /// Create a manager loading `<dir>/<lang>/main.ftl` for every supported language
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut bundles = HashMap::new();

        for lang in SUPPORTED_LANGUAGES {
            let locale: LanguageIdentifier = lang.parse()?;
            let bundle = Self::create_bundle(dir, &locale);
            bundles.insert(lang.to_string(), Arc::new(bundle));
        }

        Ok(Self { bundles })
    }

    fn create_bundle(dir: &Path, locale: &LanguageIdentifier) -> FluentBundle<FluentResource> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Chat clients render the bidi isolation marks literally
        bundle.set_use_isolating(false);

        let resource_path = dir.join(locale.to_string()).join("main.ftl");
        match fs::read_to_string(&resource_path) {
            Ok(content) => match FluentResource::try_new(content) {
                Ok(resource) => {
                    if let Err(errors) = bundle.add_resource(resource) {
                        warn!(path = %resource_path.display(), ?errors, "Duplicate lexicon entries");
                    }
                }
                Err((_, errors)) => {
                    warn!(path = %resource_path.display(), ?errors, "Failed to parse lexicon");
                }
            },
            Err(e) => warn!(path = %resource_path.display(), error = %e, "Lexicon file not readable"),
        }

        bundle
    }

    /// Resolve a user's language code to one of the supported languages
    pub fn resolve_language(language_code: Option<&str>) -> &'static str {
        language_code
            .and_then(|code| code.split(['-', '_']).next())
            .and_then(|primary| {
                SUPPORTED_LANGUAGES
                    .iter()
                    .copied()
                    .find(|lang| lang.eq_ignore_ascii_case(primary))
            })
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Get a localized message in the given language, falling back to English
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let language = Self::resolve_language(Some(language));
        let bundle = match self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {key}"),
        };

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None if language != DEFAULT_LANGUAGE => {
                return self.get_message_in_language(key, DEFAULT_LANGUAGE, args)
            }
            None => return format!("Missing translation: {key}"),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {key}"),
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(*value));
            }
            fluent_args
        });

        let mut errors = vec![];
        bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors)
            .into_owned()
    }
}

static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager from a locales directory.
///
/// Has no effect when the manager was already initialized.
pub fn init_localization(dir: &Path) -> Result<()> {
    let manager = LocalizationManager::from_dir(dir)?;
    let _ = LOCALIZATION_MANAGER.set(manager);
    Ok(())
}

/// Get the global localization manager, loading the bundled locales on first use
pub fn get_localization_manager() -> &'static LocalizationManager {
    LOCALIZATION_MANAGER.get_or_init(|| {
        LocalizationManager::from_dir(&default_locales_dir()).unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to an empty lexicon");
            LocalizationManager {
                bundles: HashMap::new(),
            }
        })
    })
}

/// Localized message in the user's language
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    let language = LocalizationManager::resolve_language(language_code);
    get_localization_manager().get_message_in_language(key, language, None)
}

/// Localized message with arguments in the user's language
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let language = LocalizationManager::resolve_language(language_code);
    let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
    get_localization_manager().get_message_in_language(key, language, Some(&args_map))
}
