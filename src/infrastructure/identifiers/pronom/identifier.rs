use super::TAG;
use super::definition::{DefinitionError, FormatInfo, SignatureDefinition, compile};
use super::recorder::PronomRecorder;
use crate::domain::entities::{MatcherType, PriorityList};
use crate::domain::services::{Identifier, Matcher, Recorder};
use crate::infrastructure::matchers::{load_priorities, save_priorities};
use crate::persist::{Loader, PersistError, Saver};
use tracing::info;

/// Where one identifier's signatures sit inside one matcher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct IndexRange {
    start: usize,
    /// signature offset from `start` -> format index
    formats: Vec<usize>,
}

impl IndexRange {
    pub(crate) fn format(&self, index: usize) -> Option<usize> {
        index
            .checked_sub(self.start)
            .and_then(|local| self.formats.get(local).copied())
    }

    pub(crate) fn covers_format(&self, format: usize) -> bool {
        self.formats.contains(&format)
    }

    fn len(&self) -> usize {
        self.formats.len()
    }
}

/// Identifier for PRONOM-style format registries
#[derive(Debug, Clone)]
pub struct Pronom {
    name: String,
    details: String,
    extension_only: bool,
    pub(crate) formats: Vec<FormatInfo>,
    /// format-level supersession
    pub(crate) priorities: PriorityList,
    /// indexed by `MatcherType::tag()`
    pub(crate) ranges: [IndexRange; 3],
}

impl Pronom {
    /// Compiles `definition` and registers its signatures with `matchers`
    ///
    /// With `extension_only` set, only extension signatures are registered
    /// and every recorder is satisfied after the first phase.
    pub fn build(
        name: &str,
        definition: &SignatureDefinition,
        extension_only: bool,
        matchers: &mut [Box<dyn Matcher>],
    ) -> Result<Self, DefinitionError> {
        let compiled = compile(definition)?;
        let mut ranges: [IndexRange; 3] = Default::default();

        for (matcher_type, compiled_set) in MatcherType::PHASES.into_iter().zip(compiled.sets) {
            if compiled_set.set.is_empty()
                || (extension_only && matcher_type != MatcherType::Extension)
            {
                continue;
            }
            let matcher = matchers
                .iter_mut()
                .find(|m| m.matcher_type() == matcher_type)
                .ok_or(DefinitionError::MissingMatcher(matcher_type))?;
            let added = compiled_set.set.len();
            let total = matcher.add(compiled_set.set, &compiled_set.priorities)?;
            ranges[matcher_type.tag() as usize] = IndexRange {
                start: total - added,
                formats: compiled_set.formats,
            };
        }

        let details = format!(
            "{} formats; {} extension, {} container, {} byte signatures{}",
            compiled.formats.len(),
            ranges[0].len(),
            ranges[1].len(),
            ranges[2].len(),
            if extension_only { "; extension only" } else { "" }
        );
        info!("Built identifier {name}: {details}");

        Ok(Self {
            name: name.to_string(),
            details,
            extension_only,
            formats: compiled.formats,
            priorities: compiled.priorities,
            ranges,
        })
    }

    pub fn extension_only(&self) -> bool {
        self.extension_only
    }

    pub fn formats(&self) -> &[FormatInfo] {
        &self.formats
    }

    pub(crate) fn range(&self, matcher_type: MatcherType) -> &IndexRange {
        &self.ranges[matcher_type.tag() as usize]
    }

    pub(crate) fn load(loader: &mut Loader) -> Self {
        let name = loader.load_string();
        let details = loader.load_string();
        let extension_only = loader.load_bool();

        let count = loader.load_count();
        let mut formats = Vec::with_capacity(count);
        for _ in 0..count {
            if !loader.is_ok() {
                break;
            }
            formats.push(FormatInfo {
                id: loader.load_string(),
                name: loader.load_string(),
                version: loader.load_string(),
                mime: loader.load_string(),
                archive: loader.load_bool(),
            });
        }
        let priorities = load_priorities(loader);

        let mut ranges: [IndexRange; 3] = Default::default();
        for range in &mut ranges {
            range.start = loader.load_usize();
            range.formats = loader.load_usizes();
        }

        let known = formats.len();
        if let Some(bad) = ranges
            .iter()
            .flat_map(|r| r.formats.iter().copied())
            .chain(priorities.pairs().flat_map(|(sup, inf)| [sup, inf]))
            .find(|&f| f >= known)
        {
            loader.fail(PersistError::Invalid(format!(
                "identifier {name} refers to format {bad} of {known}"
            )));
        }

        Self {
            name,
            details,
            extension_only,
            formats,
            priorities,
            ranges,
        }
    }
}

impl Identifier for Pronom {
    fn tag(&self) -> u8 {
        TAG
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> [String; 2] {
        [self.name.clone(), self.details.clone()]
    }

    fn recorder(&self) -> Box<dyn Recorder + '_> {
        Box::new(PronomRecorder::new(self))
    }

    fn save(&self, saver: &mut Saver) {
        saver.save_byte(TAG);
        saver.save_string(&self.name);
        saver.save_string(&self.details);
        saver.save_bool(self.extension_only);
        saver.save_count(self.formats.len());
        for format in &self.formats {
            saver.save_string(&format.id);
            saver.save_string(&format.name);
            saver.save_string(&format.version);
            saver.save_string(&format.mime);
            saver.save_bool(format.archive);
        }
        save_priorities(saver, &self.priorities);
        for range in &self.ranges {
            saver.save_usize(range.start);
            saver.save_usizes(&range.formats);
        }
    }

    fn recognise(&self, matcher_type: MatcherType, index: usize) -> Option<String> {
        self.range(matcher_type)
            .format(index)
            .and_then(|f| self.formats.get(f))
            .map(|f| f.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::matchers::default_matchers;

    fn definition(ids: &[&str]) -> SignatureDefinition {
        let formats = ids
            .iter()
            .map(|id| {
                serde_json::json!({
                    "id": id,
                    "extensions": ["x"],
                    "bytes": [{"segments": [{"anchor": "bof", "hex": "00"}]}]
                })
            })
            .collect::<Vec<_>>();
        serde_json::from_value(serde_json::json!({ "formats": formats })).unwrap()
    }

    #[test]
    fn second_identifier_gets_offset_ranges() {
        let mut matchers = default_matchers();
        let first = Pronom::build("a", &definition(&["fmt/1", "fmt/2"]), false, &mut matchers).unwrap();
        let second = Pronom::build("b", &definition(&["fmt/3"]), false, &mut matchers).unwrap();

        assert_eq!(first.recognise(MatcherType::Byte, 1).as_deref(), Some("fmt/2"));
        assert_eq!(first.recognise(MatcherType::Byte, 2), None);
        assert_eq!(second.recognise(MatcherType::Byte, 2).as_deref(), Some("fmt/3"));
        assert_eq!(second.recognise(MatcherType::Byte, 0), None);
        assert_eq!(second.recognise(MatcherType::Container, 0), None);
    }

    #[test]
    fn extension_only_skips_content_matchers() {
        let mut matchers = default_matchers();
        let pronom = Pronom::build("e", &definition(&["fmt/1"]), true, &mut matchers).unwrap();
        assert!(pronom.extension_only());
        assert_eq!(pronom.recognise(MatcherType::Extension, 0).as_deref(), Some("fmt/1"));
        assert_eq!(pronom.recognise(MatcherType::Byte, 0), None);
        assert!(pronom.describe()[1].ends_with("extension only"));
    }

    #[test]
    fn missing_matcher_is_an_error() {
        let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
        let err = Pronom::build("a", &definition(&["fmt/1"]), false, &mut matchers).unwrap_err();
        assert!(matches!(err, DefinitionError::MissingMatcher(MatcherType::Extension)));
    }

    #[test]
    fn state_survives_save_and_load() {
        let mut matchers = default_matchers();
        let pronom = Pronom::build("a", &definition(&["fmt/1", "fmt/2"]), false, &mut matchers).unwrap();
        let mut saver = Saver::new();
        pronom.save(&mut saver);

        let mut loader = Loader::new(saver.into_bytes().unwrap());
        assert_eq!(loader.load_byte(), TAG);
        let loaded = Pronom::load(&mut loader);
        loader.finish_exact().unwrap();

        assert_eq!(loaded.describe(), pronom.describe());
        assert_eq!(loaded.formats, pronom.formats);
        assert_eq!(loaded.ranges, pronom.ranges);
    }

    fn forged(ranges: [&[usize]; 3], priorities: &[usize]) -> Loader {
        let mut saver = Saver::new();
        saver.save_string("forged");
        saver.save_string("");
        saver.save_bool(false);
        saver.save_count(1);
        for text in ["fmt/1", "One", "", ""] {
            saver.save_string(text);
        }
        saver.save_bool(false);
        saver.save_usizes(priorities);
        for formats in ranges {
            saver.save_usize(0);
            saver.save_usizes(formats);
        }
        Loader::new(saver.into_bytes().unwrap())
    }

    #[test]
    fn unknown_format_in_a_range_fails_the_cursor() {
        let mut loader = forged([&[5], &[], &[]], &[]);
        Pronom::load(&mut loader);
        assert!(matches!(loader.finish(), Err(PersistError::Invalid(_))));
    }

    #[test]
    fn unknown_format_in_priorities_fails_the_cursor() {
        let mut loader = forged([&[0], &[], &[0]], &[0, 3]);
        Pronom::load(&mut loader);
        assert!(matches!(loader.finish(), Err(PersistError::Invalid(_))));
    }

    #[test]
    fn known_formats_load_cleanly() {
        let mut loader = forged([&[0], &[], &[0]], &[]);
        let loaded = Pronom::load(&mut loader);
        loader.finish_exact().unwrap();
        assert_eq!(loaded.recognise(MatcherType::Byte, 0).as_deref(), Some("fmt/1"));
    }
}
