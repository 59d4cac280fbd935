use unicode_bidi::{BidiInfo, Level};
use unicode_script::{Script, UnicodeScript};

use crate::text::{Direction, LangTable, Language};

/// A maximal slice of text sharing one script, language and direction.
/// Ranges are byte offsets.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub start: usize,
    pub end: usize,
    pub script: Script,
    pub language: Option<Language>,
    pub direction: Direction,
}

impl TextRun {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

struct ScriptItem {
    start: usize,
    end: usize,
    script: Script,
    language: Option<Language>,
}

/// Splits a line of text into [`TextRun`]s, ordered visually left to right.
#[derive(Default)]
pub struct TextItemizer {
    lang_table: LangTable,
}

impl TextItemizer {
    pub fn new() -> TextItemizer {
        TextItemizer::default()
    }

    pub fn lang_table(&self) -> &LangTable {
        &self.lang_table
    }

    pub fn lang_table_mut(&mut self) -> &mut LangTable {
        &mut self.lang_table
    }

    /// Itemizes `text` into `runs`. Runs appear in visual order; within a
    /// right-to-left stretch the script runs are reversed, while each run's
    /// byte range stays logical.
    pub fn itemize(
        &self,
        text: &str,
        lang_hint: Option<&Language>,
        direction: Option<Direction>,
        runs: &mut Vec<TextRun>,
    ) {
        if text.is_empty() {
            runs.push(TextRun {
                start: 0,
                end: 0,
                script: Script::Common,
                language: None,
                direction: Direction::LeftToRight,
            });
            return;
        }

        let script_items = self.itemize_script(text, lang_hint);
        let direction_items = itemize_direction(text, direction);

        self.merge(&script_items, &direction_items, runs);
    }

    /// One item per stretch of a single script. `Common`, `Inherited` and
    /// `Unknown` codepoints are absorbed into the surrounding script.
    fn itemize_script(&self, text: &str, lang_hint: Option<&Language>) -> Vec<ScriptItem> {
        let mut items = Vec::new();

        let mut start = 0;
        let mut current: Option<Script> = None;

        for (pos, c) in text.char_indices() {
            let script = c.script();

            if matches!(script, Script::Common | Script::Inherited | Script::Unknown) {
                continue;
            }

            match current {
                None => current = Some(script),
                Some(cur) if cur != script => {
                    items.push(self.script_item(start, pos, cur, lang_hint));
                    start = pos;
                    current = Some(script);
                }
                Some(_) => {}
            }
        }

        let script = current.unwrap_or(Script::Common);
        items.push(self.script_item(start, text.len(), script, lang_hint));

        items
    }

    fn script_item(
        &self,
        start: usize,
        end: usize,
        script: Script,
        lang_hint: Option<&Language>,
    ) -> ScriptItem {
        let language = if self.lang_table.matches(lang_hint, script) {
            lang_hint.cloned()
        } else {
            self.lang_table.detect(script)
        };

        ScriptItem {
            start,
            end,
            script,
            language,
        }
    }

    fn merge(
        &self,
        script_items: &[ScriptItem],
        direction_items: &[(usize, usize, Direction)],
        runs: &mut Vec<TextRun>,
    ) {
        for &(start, end, direction) in direction_items {
            let mut position = start;

            // Runs of a right-to-left stretch are inserted at a fixed point,
            // which reverses them into visual order.
            let rtl_at = runs.len();

            let mut item_index = script_items
                .iter()
                .position(|item| item.start <= position && item.end > position)
                .unwrap_or(script_items.len().saturating_sub(1));

            while position < end {
                let item = &script_items[item_index];

                let run = TextRun {
                    start: position,
                    end: item.end.min(end),
                    script: item.script,
                    language: item.language.clone(),
                    direction,
                };

                position = run.end;

                match direction {
                    Direction::LeftToRight => runs.push(run),
                    Direction::RightToLeft => runs.insert(rtl_at, run),
                }

                if item.end == position {
                    item_index += 1;
                }
            }
        }
    }
}

/// One item per stretch of a single direction, in visual order.
fn itemize_direction(
    text: &str,
    direction: Option<Direction>,
) -> Vec<(usize, usize, Direction)> {
    let level_override = direction.map(|direction| match direction {
        Direction::LeftToRight => Level::ltr(),
        Direction::RightToLeft => Level::rtl(),
    });

    let bidi = BidiInfo::new(text, level_override);

    if bidi.paragraphs.is_empty() {
        log::warn!("Bidi analysis produced no paragraphs, assuming left-to-right");
        return vec![(0, text.len(), Direction::LeftToRight)];
    }

    let mut items = Vec::new();

    for para in &bidi.paragraphs {
        let (levels, ranges) = bidi.visual_runs(para, para.range.clone());

        for range in ranges {
            let direction = if levels[range.start].is_rtl() {
                Direction::RightToLeft
            } else {
                Direction::LeftToRight
            };

            items.push((range.start, range.end, direction));
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn itemize(text: &str) -> Vec<TextRun> {
        let itemizer = TextItemizer::new();
        let mut runs = Vec::new();
        itemizer.itemize(text, None, None, &mut runs);
        runs
    }

    #[test]
    fn empty_line_yields_single_run() {
        let runs = itemize("");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start, 0);
        assert_eq!(runs[0].end, 0);
        assert_eq!(runs[0].direction, Direction::LeftToRight);
    }

    #[test]
    fn plain_latin_is_one_run() {
        let runs = itemize("hello world");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].script, Script::Latin);
        assert_eq!(runs[0].direction, Direction::LeftToRight);
        assert_eq!((runs[0].start, runs[0].end), (0, 11));
    }

    #[test]
    fn mixed_direction_runs_are_visually_ordered() {
        // 'A', space, alef, beh, space, 'B'
        let text = "A \u{0627}\u{0628} B";
        let runs = itemize(text);

        assert_eq!(runs.len(), 4);

        assert_eq!(runs[0].script, Script::Latin);
        assert_eq!(runs[0].direction, Direction::LeftToRight);

        assert_eq!(runs[1].script, Script::Arabic);
        assert_eq!(runs[1].direction, Direction::RightToLeft);
        assert_eq!((runs[1].start, runs[1].end), (2, 6));

        // Trailing space was absorbed into the Arabic script item but flows
        // left-to-right
        assert_eq!(runs[2].direction, Direction::LeftToRight);

        assert_eq!(runs[3].script, Script::Latin);
        assert_eq!((runs[3].start, runs[3].end), (7, 8));
    }

    #[test]
    fn rtl_scripts_are_reversed_within_a_stretch() {
        // Hebrew word, space, Arabic word; the whole line is right-to-left,
        // so the Arabic run must come first visually.
        let text = "\u{05D0}\u{05D1} \u{0627}\u{0628}";
        let runs = itemize(text);

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].script, Script::Arabic);
        assert_eq!(runs[1].script, Script::Hebrew);
        assert!(runs.iter().all(|r| r.direction == Direction::RightToLeft));

        // Byte ranges stay logical
        assert!(runs[1].start < runs[0].start);
    }

    #[test]
    fn language_hint_wins_when_compatible() {
        let itemizer = TextItemizer::new();
        let mut runs = Vec::new();
        itemizer.itemize("\u{6F22}\u{5B57}", Some(&Language::new("ja")), None, &mut runs);

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].language, Some(Language::new("ja")));

        runs.clear();
        itemizer.itemize("\u{6F22}\u{5B57}", None, None, &mut runs);
        assert_eq!(runs[0].language, Some(Language::new("zh-cn")));
    }

    #[test]
    fn forced_direction_changes_visual_order() {
        let itemizer = TextItemizer::new();
        let text = "abc \u{05D0}\u{05D1}";

        let mut runs = Vec::new();
        itemizer.itemize(text, None, None, &mut runs);
        assert_eq!(runs[0].script, Script::Latin);

        // With a right-to-left paragraph the Hebrew run comes first
        runs.clear();
        itemizer.itemize(text, None, Some(Direction::RightToLeft), &mut runs);
        assert_eq!(runs[0].script, Script::Hebrew);
    }
}
