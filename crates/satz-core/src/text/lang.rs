//! Mapping between languages and scripts, used to pick a shaping language
//! for each itemized run.
//!
//! The language/script data comes from pango's script-language table.

use std::borrow::Cow;
use std::collections::HashMap;

use unicode_script::Script;

/// A BCP-47 style language tag, e.g. `"en"` or `"zh-cn"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Language(Cow<'static, str>);

impl Language {
    pub fn new(tag: &str) -> Language {
        if tag.bytes().any(|b| b.is_ascii_uppercase()) {
            Language(Cow::Owned(tag.to_ascii_lowercase()))
        } else {
            Language(Cow::Owned(tag.to_owned()))
        }
    }

    pub const fn from_static(tag: &'static str) -> Language {
        Language(Cow::Borrowed(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scripts each language is commonly written in.
#[rustfmt::skip]
static LANG_SCRIPTS: &[(&str, &[Script])] = &[
    ("aa", &[Script::Latin]),
    ("ab", &[Script::Cyrillic]),
    ("af", &[Script::Latin]),
    ("ak", &[Script::Latin]),
    ("am", &[Script::Ethiopic]),
    ("an", &[Script::Latin]),
    ("ar", &[Script::Arabic]),
    ("as", &[Script::Bengali]),
    ("ast", &[Script::Latin]),
    ("av", &[Script::Cyrillic]),
    ("ay", &[Script::Latin]),
    ("az-az", &[Script::Latin]),
    ("az-ir", &[Script::Arabic]),
    ("ba", &[Script::Cyrillic]),
    ("be", &[Script::Cyrillic]),
    ("ber-dz", &[Script::Latin]),
    ("ber-ma", &[Script::Tifinagh]),
    ("bg", &[Script::Cyrillic]),
    ("bh", &[Script::Devanagari]),
    ("bho", &[Script::Devanagari]),
    ("bi", &[Script::Latin]),
    ("bin", &[Script::Latin]),
    ("bm", &[Script::Latin]),
    ("bn", &[Script::Bengali]),
    ("bo", &[Script::Tibetan]),
    ("br", &[Script::Latin]),
    ("bs", &[Script::Latin]),
    ("bua", &[Script::Cyrillic]),
    ("byn", &[Script::Ethiopic]),
    ("ca", &[Script::Latin]),
    ("ce", &[Script::Cyrillic]),
    ("ch", &[Script::Latin]),
    ("chm", &[Script::Cyrillic]),
    ("chr", &[Script::Cherokee]),
    ("co", &[Script::Latin]),
    ("crh", &[Script::Latin]),
    ("cs", &[Script::Latin]),
    ("csb", &[Script::Latin]),
    ("cu", &[Script::Cyrillic]),
    ("cv", &[Script::Cyrillic, Script::Latin]),
    ("cy", &[Script::Latin]),
    ("da", &[Script::Latin]),
    ("de", &[Script::Latin]),
    ("dv", &[Script::Thaana]),
    ("dz", &[Script::Tibetan]),
    ("ee", &[Script::Latin]),
    ("el", &[Script::Greek]),
    ("en", &[Script::Latin]),
    ("eo", &[Script::Latin]),
    ("es", &[Script::Latin]),
    ("et", &[Script::Latin]),
    ("eu", &[Script::Latin]),
    ("fa", &[Script::Arabic]),
    ("fat", &[Script::Latin]),
    ("ff", &[Script::Latin]),
    ("fi", &[Script::Latin]),
    ("fil", &[Script::Latin]),
    ("fj", &[Script::Latin]),
    ("fo", &[Script::Latin]),
    ("fr", &[Script::Latin]),
    ("fur", &[Script::Latin]),
    ("fy", &[Script::Latin]),
    ("ga", &[Script::Latin]),
    ("gd", &[Script::Latin]),
    ("gez", &[Script::Ethiopic]),
    ("gl", &[Script::Latin]),
    ("gn", &[Script::Latin]),
    ("gu", &[Script::Gujarati]),
    ("gv", &[Script::Latin]),
    ("ha", &[Script::Latin]),
    ("haw", &[Script::Latin]),
    ("he", &[Script::Hebrew]),
    ("hi", &[Script::Devanagari]),
    ("hne", &[Script::Devanagari]),
    ("ho", &[Script::Latin]),
    ("hr", &[Script::Latin]),
    ("hsb", &[Script::Latin]),
    ("ht", &[Script::Latin]),
    ("hu", &[Script::Latin]),
    ("hy", &[Script::Armenian]),
    ("hz", &[Script::Latin]),
    ("ia", &[Script::Latin]),
    ("id", &[Script::Latin]),
    ("ie", &[Script::Latin]),
    ("ig", &[Script::Latin]),
    ("ii", &[Script::Yi]),
    ("ik", &[Script::Cyrillic]),
    ("io", &[Script::Latin]),
    ("is", &[Script::Latin]),
    ("it", &[Script::Latin]),
    ("iu", &[Script::Canadian_Aboriginal]),
    ("ja", &[Script::Han, Script::Katakana, Script::Hiragana]),
    ("jv", &[Script::Latin]),
    ("ka", &[Script::Georgian]),
    ("kaa", &[Script::Cyrillic]),
    ("kab", &[Script::Latin]),
    ("ki", &[Script::Latin]),
    ("kj", &[Script::Latin]),
    ("kk", &[Script::Cyrillic]),
    ("kl", &[Script::Latin]),
    ("km", &[Script::Khmer]),
    ("kn", &[Script::Kannada]),
    ("ko", &[Script::Hangul]),
    ("kok", &[Script::Devanagari]),
    ("kr", &[Script::Latin]),
    ("ks", &[Script::Arabic]),
    ("ku-am", &[Script::Cyrillic]),
    ("ku-iq", &[Script::Arabic]),
    ("ku-ir", &[Script::Arabic]),
    ("ku-tr", &[Script::Latin]),
    ("kum", &[Script::Cyrillic]),
    ("kv", &[Script::Cyrillic]),
    ("kw", &[Script::Latin]),
    ("kwm", &[Script::Latin]),
    ("ky", &[Script::Cyrillic]),
    ("la", &[Script::Latin]),
    ("lb", &[Script::Latin]),
    ("lez", &[Script::Cyrillic]),
    ("lg", &[Script::Latin]),
    ("li", &[Script::Latin]),
    ("ln", &[Script::Latin]),
    ("lo", &[Script::Lao]),
    ("lt", &[Script::Latin]),
    ("lv", &[Script::Latin]),
    ("mai", &[Script::Devanagari]),
    ("mg", &[Script::Latin]),
    ("mh", &[Script::Latin]),
    ("mi", &[Script::Latin]),
    ("mk", &[Script::Cyrillic]),
    ("ml", &[Script::Malayalam]),
    ("mn-cn", &[Script::Mongolian]),
    ("mn-mn", &[Script::Cyrillic]),
    ("mo", &[Script::Cyrillic, Script::Latin]),
    ("mr", &[Script::Devanagari]),
    ("ms", &[Script::Latin]),
    ("mt", &[Script::Latin]),
    ("my", &[Script::Myanmar]),
    ("na", &[Script::Latin]),
    ("nb", &[Script::Latin]),
    ("nds", &[Script::Latin]),
    ("ne", &[Script::Devanagari]),
    ("ng", &[Script::Latin]),
    ("nl", &[Script::Latin]),
    ("nn", &[Script::Latin]),
    ("no", &[Script::Latin]),
    ("nr", &[Script::Latin]),
    ("nso", &[Script::Latin]),
    ("nv", &[Script::Latin]),
    ("ny", &[Script::Latin]),
    ("oc", &[Script::Latin]),
    ("om", &[Script::Latin]),
    ("or", &[Script::Oriya]),
    ("os", &[Script::Cyrillic]),
    ("ota", &[Script::Arabic]),
    ("pa-in", &[Script::Gurmukhi]),
    ("pa-pk", &[Script::Arabic]),
    ("pap-an", &[Script::Latin]),
    ("pap-aw", &[Script::Latin]),
    ("pl", &[Script::Latin]),
    ("ps-af", &[Script::Arabic]),
    ("ps-pk", &[Script::Arabic]),
    ("pt", &[Script::Latin]),
    ("qu", &[Script::Latin]),
    ("rm", &[Script::Latin]),
    ("rn", &[Script::Latin]),
    ("ro", &[Script::Latin]),
    ("ru", &[Script::Cyrillic]),
    ("rw", &[Script::Latin]),
    ("sa", &[Script::Devanagari]),
    ("sah", &[Script::Cyrillic]),
    ("sc", &[Script::Latin]),
    ("sco", &[Script::Latin]),
    ("sd", &[Script::Arabic]),
    ("se", &[Script::Latin]),
    ("sel", &[Script::Cyrillic]),
    ("sg", &[Script::Latin]),
    ("sh", &[Script::Cyrillic, Script::Latin]),
    ("shs", &[Script::Latin]),
    ("si", &[Script::Sinhala]),
    ("sid", &[Script::Ethiopic]),
    ("sk", &[Script::Latin]),
    ("sl", &[Script::Latin]),
    ("sm", &[Script::Latin]),
    ("sma", &[Script::Latin]),
    ("smj", &[Script::Latin]),
    ("smn", &[Script::Latin]),
    ("sms", &[Script::Latin]),
    ("sn", &[Script::Latin]),
    ("so", &[Script::Latin]),
    ("sq", &[Script::Latin]),
    ("sr", &[Script::Cyrillic]),
    ("ss", &[Script::Latin]),
    ("st", &[Script::Latin]),
    ("su", &[Script::Latin]),
    ("sv", &[Script::Latin]),
    ("sw", &[Script::Latin]),
    ("syr", &[Script::Syriac]),
    ("ta", &[Script::Tamil]),
    ("te", &[Script::Telugu]),
    ("tg", &[Script::Cyrillic]),
    ("th", &[Script::Thai]),
    ("ti-er", &[Script::Ethiopic]),
    ("ti-et", &[Script::Ethiopic]),
    ("tig", &[Script::Ethiopic]),
    ("tk", &[Script::Latin]),
    ("tl", &[Script::Latin]),
    ("tn", &[Script::Latin]),
    ("to", &[Script::Latin]),
    ("tr", &[Script::Latin]),
    ("ts", &[Script::Latin]),
    ("tt", &[Script::Cyrillic]),
    ("tw", &[Script::Latin]),
    ("ty", &[Script::Latin]),
    ("tyv", &[Script::Cyrillic]),
    ("ug", &[Script::Arabic]),
    ("uk", &[Script::Cyrillic]),
    ("ur", &[Script::Arabic]),
    ("uz", &[Script::Latin]),
    ("ve", &[Script::Latin]),
    ("vi", &[Script::Latin]),
    ("vo", &[Script::Latin]),
    ("vot", &[Script::Latin]),
    ("wa", &[Script::Latin]),
    ("wal", &[Script::Ethiopic]),
    ("wen", &[Script::Latin]),
    ("wo", &[Script::Latin]),
    ("xh", &[Script::Latin]),
    ("yap", &[Script::Latin]),
    ("yi", &[Script::Hebrew]),
    ("yo", &[Script::Latin]),
    ("za", &[Script::Latin]),
    ("zh-cn", &[Script::Han]),
    ("zh-hk", &[Script::Han]),
    ("zh-mo", &[Script::Han]),
    ("zh-sg", &[Script::Han]),
    ("zh-tw", &[Script::Han]),
    ("zu", &[Script::Latin]),
];

/// The predominant language for scripts that are mostly tied to one.
#[rustfmt::skip]
static SAMPLE_LANGUAGES: &[(Script, &str)] = &[
    (Script::Arabic, "ar"),
    (Script::Armenian, "hy"),
    (Script::Bengali, "bn"),
    (Script::Buginese, "bug"),
    (Script::Buhid, "bku"),
    (Script::Canadian_Aboriginal, "iu"),
    (Script::Cherokee, "chr"),
    (Script::Coptic, "cop"),
    (Script::Cyrillic, "ru"),
    (Script::Devanagari, "hi"),
    (Script::Ethiopic, "am"),
    (Script::Georgian, "ka"),
    (Script::Greek, "el"),
    (Script::Gujarati, "gu"),
    (Script::Gurmukhi, "pa"),
    (Script::Hangul, "ko"),
    (Script::Hanunoo, "hnn"),
    (Script::Hebrew, "he"),
    (Script::Hiragana, "ja"),
    (Script::Kannada, "kn"),
    (Script::Katakana, "ja"),
    (Script::Khmer, "km"),
    (Script::Lao, "lo"),
    (Script::Latin, "en"),
    (Script::Malayalam, "ml"),
    (Script::Mongolian, "mn"),
    (Script::Myanmar, "my"),
    (Script::Nko, "nqo"),
    (Script::Old_Persian, "peo"),
    (Script::Oriya, "or"),
    (Script::Sinhala, "si"),
    (Script::Syloti_Nagri, "syl"),
    (Script::Syriac, "syr"),
    (Script::Tagalog, "tl"),
    (Script::Tagbanwa, "tbw"),
    (Script::Tamil, "ta"),
    (Script::Telugu, "te"),
    (Script::Thaana, "dv"),
    (Script::Thai, "th"),
    (Script::Tibetan, "bo"),
    (Script::Ugaritic, "uga"),
];

/// Languages assumed by default when neither a hint nor the script pins the
/// run down. Checked in order, so `"en"` before `"zh-cn"` gives Chinese
/// priority over Japanese for Han text.
const DEFAULT_LANGUAGES: &str = "en:zh-cn";

/// Lookup tables resolving the language used to shape a run of some script.
pub struct LangTable {
    scripts: HashMap<&'static str, &'static [Script]>,
    samples: HashMap<Script, &'static str>,
    defaults: Vec<Language>,
}

impl Default for LangTable {
    fn default() -> LangTable {
        LangTable::new()
    }
}

impl LangTable {
    pub fn new() -> LangTable {
        let mut table = LangTable {
            scripts: LANG_SCRIPTS.iter().copied().collect(),
            samples: SAMPLE_LANGUAGES.iter().copied().collect(),
            defaults: Vec::new(),
        };
        table.set_default_languages(DEFAULT_LANGUAGES);
        table
    }

    /// Sets the colon-separated list of languages assumed when detection has
    /// nothing else to go by.
    pub fn set_default_languages(&mut self, languages: &str) {
        self.defaults = languages
            .split(':')
            .filter(|tag| !tag.is_empty())
            .map(Language::new)
            .collect();
    }

    pub fn scripts_for(&self, language: &Language) -> &[Script] {
        self.scripts
            .get(language.as_str())
            .copied()
            .unwrap_or_default()
    }

    pub fn includes_script(&self, language: &Language, script: Script) -> bool {
        self.scripts_for(language).contains(&script)
    }

    /// Can `script` be used to write `hint`?
    pub fn matches(&self, hint: Option<&Language>, script: Script) -> bool {
        hint.map_or(false, |hint| self.includes_script(hint, script))
    }

    fn default_language(&self, script: Script) -> Option<Language> {
        self.defaults
            .iter()
            .find(|lang| self.includes_script(lang, script))
            .cloned()
    }

    fn sample_language(&self, script: Script) -> Option<Language> {
        self.samples
            .get(&script)
            .map(|&tag| Language::from_static(tag))
    }

    /// Picks a likely language for `script`: one of the default languages if
    /// the script can write it, otherwise the script's predominant language.
    pub fn detect(&self, script: Script) -> Option<Language> {
        self.default_language(script)
            .or_else(|| self.sample_language(script))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_tags_are_normalized() {
        assert_eq!(Language::new("ZH-CN"), Language::from_static("zh-cn"));
    }

    #[test]
    fn detect_prefers_default_languages() {
        let table = LangTable::new();

        assert_eq!(table.detect(Script::Latin), Some(Language::from_static("en")));
        // Chinese takes priority over Japanese for Han
        assert_eq!(table.detect(Script::Han), Some(Language::from_static("zh-cn")));
        assert_eq!(table.detect(Script::Arabic), Some(Language::from_static("ar")));
    }

    #[test]
    fn detect_priority_follows_default_order() {
        let mut table = LangTable::new();
        table.set_default_languages("ja:en");

        assert_eq!(table.detect(Script::Han), Some(Language::from_static("ja")));
    }

    #[test]
    fn hint_matching() {
        let table = LangTable::new();
        let japanese = Language::new("ja");

        assert!(table.matches(Some(&japanese), Script::Katakana));
        assert!(!table.matches(Some(&japanese), Script::Arabic));
        assert!(!table.matches(None, Script::Latin));
    }
}
