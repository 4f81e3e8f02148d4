//! Orchestrator tests
//!
//! Phase gating, first-claim routing, degraded matchers and ranking, driven
//! through instrumented matchers and identifiers.

use idforge::application::Engine;
use idforge::domain::entities::{
    Confidence, Identification, MatchResult, MatcherType, PriorityList, SignatureSet,
};
use idforge::domain::repositories::Buffer;
use idforge::domain::services::{Identifier, Matcher, MatcherError, Recorder, ResultStream};
use idforge::infrastructure::buffers::MemoryBuffer;
use idforge::persist::Saver;
use rstest::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Instrumented matcher
// ============================================================================

struct CountingMatcher {
    matcher_type: MatcherType,
    emits: Vec<usize>,
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl CountingMatcher {
    fn new(matcher_type: MatcherType, emits: Vec<usize>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let matcher = Self {
            matcher_type,
            emits,
            calls: Arc::clone(&calls),
            fail: false,
        };
        (matcher, calls)
    }

    fn failing(matcher_type: MatcherType) -> Self {
        Self {
            matcher_type,
            emits: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
            fail: true,
        }
    }
}

impl Matcher for CountingMatcher {
    fn matcher_type(&self) -> MatcherType {
        self.matcher_type
    }

    fn identify(&self, _name: &str, _buffer: Arc<dyn Buffer>) -> Result<ResultStream, MatcherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MatcherError::Other("cannot scan".into()));
        }
        let (tx, rx) = crossbeam_channel::unbounded();
        let emits = self.emits.clone();
        let phase = self.matcher_type;
        std::thread::spawn(move || {
            for idx in emits {
                let _ = tx.send(MatchResult::new(idx, format!("{phase} {idx}")));
            }
        });
        Ok(rx)
    }

    fn add(&mut self, _set: SignatureSet, _priorities: &PriorityList) -> Result<usize, MatcherError> {
        Ok(0)
    }

    fn save(&self, _saver: &mut Saver) {}

    fn describe(&self) -> String {
        format!("counting {} matcher", self.matcher_type)
    }
}

// ============================================================================
// Instrumented identifier
// ============================================================================

#[derive(Debug)]
struct TestIdentification {
    id: String,
    confidence: Confidence,
}

impl Identification for TestIdentification {
    fn id(&self) -> &str {
        &self.id
    }

    fn namespace(&self) -> &str {
        "test"
    }

    fn long_text(&self) -> String {
        self.id.clone()
    }

    fn json(&self) -> serde_json::Value {
        serde_json::json!({ "id": self.id })
    }

    fn csv(&self) -> Vec<String> {
        vec![self.id.clone()]
    }

    fn confidence(&self) -> Confidence {
        self.confidence
    }
}

struct TestIdentifier {
    name: String,
    /// Claims results whose index satisfies this predicate
    claims: fn(usize) -> bool,
    always_satisfied: bool,
    reports: Arc<AtomicUsize>,
}

impl TestIdentifier {
    fn boxed(name: &str, claims: fn(usize) -> bool, always_satisfied: bool) -> Box<dyn Identifier> {
        Box::new(Self {
            name: name.into(),
            claims,
            always_satisfied,
            reports: Arc::new(AtomicUsize::new(0)),
        })
    }
}

struct TestRecorder<'a> {
    identifier: &'a TestIdentifier,
    hits: Vec<(MatcherType, usize)>,
}

impl Recorder for TestRecorder<'_> {
    fn record(&mut self, matcher_type: MatcherType, result: &MatchResult) -> bool {
        if !(self.identifier.claims)(result.index()) {
            return false;
        }
        self.hits.push((matcher_type, result.index()));
        true
    }

    fn satisfied(&self) -> bool {
        self.identifier.always_satisfied
    }

    fn report(self: Box<Self>) -> Vec<Box<dyn Identification>> {
        self.identifier.reports.fetch_add(1, Ordering::SeqCst);
        self.hits
            .iter()
            .map(|(mt, idx)| {
                let confidence = match mt {
                    MatcherType::Extension => Confidence::Tentative,
                    MatcherType::Container => Confidence::Structural,
                    MatcherType::Byte => Confidence::Signature,
                };
                Box::new(TestIdentification {
                    id: format!("{}/{}", self.identifier.name, idx),
                    confidence,
                }) as Box<dyn Identification>
            })
            .collect()
    }
}

impl Identifier for TestIdentifier {
    fn tag(&self) -> u8 {
        7
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> [String; 2] {
        [self.name.clone(), "test identifier".into()]
    }

    fn recorder(&self) -> Box<dyn Recorder + '_> {
        Box::new(TestRecorder {
            identifier: self,
            hits: Vec::new(),
        })
    }

    fn save(&self, saver: &mut Saver) {
        saver.save_byte(7);
        saver.save_string(&self.name);
    }

    fn recognise(&self, _matcher_type: MatcherType, index: usize) -> Option<String> {
        (self.claims)(index).then(|| format!("{}/{}", self.name, index))
    }
}

fn any(_: usize) -> bool {
    true
}

fn even(idx: usize) -> bool {
    idx % 2 == 0
}

#[fixture]
fn buffer() -> Arc<dyn Buffer> {
    Arc::new(MemoryBuffer::new(&b"content"[..]))
}

fn engine(matchers: Vec<Box<dyn Matcher>>, identifiers: Vec<Box<dyn Identifier>>) -> Engine {
    let mut builder = Engine::builder().with_matchers(matchers);
    for identifier in identifiers {
        builder = builder.with_identifier(identifier);
    }
    builder.build()
}

// ============================================================================
// Phase gating
// ============================================================================

#[rstest]
#[case(true, 0)]
#[case(false, 1)]
fn test_satisfied_recorders_skip_byte_phase(
    buffer: Arc<dyn Buffer>,
    #[case] satisfied: bool,
    #[case] expected_byte_calls: usize,
) {
    let (ext, ext_calls) = CountingMatcher::new(MatcherType::Extension, vec![0]);
    let (container, container_calls) = CountingMatcher::new(MatcherType::Container, vec![]);
    let (byte, byte_calls) = CountingMatcher::new(MatcherType::Byte, vec![1]);
    let engine = engine(
        vec![Box::new(ext), Box::new(container), Box::new(byte)],
        vec![TestIdentifier::boxed("a", any, satisfied)],
    );

    let report = engine.identify("file.x", buffer);

    assert_eq!(ext_calls.load(Ordering::SeqCst), 1);
    assert_eq!(container_calls.load(Ordering::SeqCst), expected_byte_calls);
    assert_eq!(byte_calls.load(Ordering::SeqCst), expected_byte_calls);
    let expected_ids = if satisfied { vec!["a/0"] } else { vec!["a/1", "a/0"] };
    assert_eq!(report.ids(), expected_ids);
}

#[rstest]
fn test_one_unsatisfied_recorder_keeps_phases_running(buffer: Arc<dyn Buffer>) {
    let (ext, _) = CountingMatcher::new(MatcherType::Extension, vec![0]);
    let (byte, byte_calls) = CountingMatcher::new(MatcherType::Byte, vec![]);
    let engine = engine(
        vec![Box::new(ext), Box::new(byte)],
        vec![
            TestIdentifier::boxed("a", any, true),
            TestIdentifier::boxed("b", any, false),
        ],
    );

    engine.identify("file.x", buffer);
    assert_eq!(byte_calls.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_report_called_once_per_recorder(buffer: Arc<dyn Buffer>) {
    let reports = Arc::new(AtomicUsize::new(0));
    let identifier = TestIdentifier {
        name: "a".into(),
        claims: any,
        always_satisfied: false,
        reports: Arc::clone(&reports),
    };
    let (ext, _) = CountingMatcher::new(MatcherType::Extension, vec![0, 1]);
    let (byte, _) = CountingMatcher::new(MatcherType::Byte, vec![2]);
    let engine = engine(vec![Box::new(ext), Box::new(byte)], vec![Box::new(identifier)]);

    engine.identify("file.x", Arc::clone(&buffer));
    assert_eq!(reports.load(Ordering::SeqCst), 1);
    engine.identify("file.y", buffer);
    assert_eq!(reports.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Routing
// ============================================================================

#[rstest]
fn test_first_claim_wins(buffer: Arc<dyn Buffer>) {
    let (ext, _) = CountingMatcher::new(MatcherType::Extension, vec![0, 1, 2, 3]);
    let engine = engine(
        vec![Box::new(ext)],
        vec![
            TestIdentifier::boxed("first", even, false),
            TestIdentifier::boxed("second", any, false),
        ],
    );

    let report = engine.identify("file.x", buffer);
    let mut ids = report.ids();
    ids.sort();
    assert_eq!(ids, vec!["first/0", "first/2", "second/1", "second/3"]);
}

#[rstest]
fn test_identical_claims_go_to_earlier_identifier(buffer: Arc<dyn Buffer>) {
    let (ext, _) = CountingMatcher::new(MatcherType::Extension, vec![5]);
    let engine = engine(
        vec![Box::new(ext)],
        vec![
            TestIdentifier::boxed("first", any, false),
            TestIdentifier::boxed("second", any, false),
        ],
    );

    assert_eq!(engine.identify("file.x", buffer).ids(), vec!["first/5"]);
}

#[rstest]
fn test_every_stream_is_drained(buffer: Arc<dyn Buffer>) {
    let (a, _) = CountingMatcher::new(MatcherType::Byte, (0..300).collect());
    let (b, _) = CountingMatcher::new(MatcherType::Byte, (300..700).collect());
    let (c, _) = CountingMatcher::new(MatcherType::Byte, vec![]);
    let engine = engine(
        vec![Box::new(a), Box::new(b), Box::new(c)],
        vec![TestIdentifier::boxed("a", any, false)],
    );

    let report = engine.identify("file.x", buffer);
    assert_eq!(report.identifications.len(), 700);
}

// ============================================================================
// Degradation and ranking
// ============================================================================

#[rstest]
fn test_setup_failure_degrades_but_completes(buffer: Arc<dyn Buffer>) {
    let (ext, _) = CountingMatcher::new(MatcherType::Extension, vec![0]);
    let (byte, byte_calls) = CountingMatcher::new(MatcherType::Byte, vec![4]);
    let engine = engine(
        vec![
            Box::new(ext),
            Box::new(CountingMatcher::failing(MatcherType::Byte)),
            Box::new(byte),
        ],
        vec![TestIdentifier::boxed("a", any, false)],
    );

    let report = engine.identify("file.x", buffer);

    assert!(report.is_degraded());
    assert_eq!(report.degraded.len(), 1);
    assert_eq!(report.degraded[0].matcher_type, MatcherType::Byte);
    assert_eq!(report.errors(), vec!["byte matcher: Matcher error: cannot scan".to_string()]);
    assert_eq!(byte_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.ids(), vec!["a/4", "a/0"]);
}

#[rstest]
fn test_identifications_ranked_strongest_first(buffer: Arc<dyn Buffer>) {
    let (ext, _) = CountingMatcher::new(MatcherType::Extension, vec![0]);
    let (container, _) = CountingMatcher::new(MatcherType::Container, vec![1]);
    let (byte, _) = CountingMatcher::new(MatcherType::Byte, vec![2]);
    let engine = engine(
        vec![Box::new(ext), Box::new(container), Box::new(byte)],
        vec![TestIdentifier::boxed("a", any, false)],
    );

    let report = engine.identify("file.x", buffer);
    let confidences: Vec<_> = report
        .identifications
        .iter()
        .map(|id| id.confidence())
        .collect();
    assert_eq!(
        confidences,
        vec![Confidence::Structural, Confidence::Signature, Confidence::Tentative]
    );
}

#[rstest]
fn test_no_identifiers_report_nothing(buffer: Arc<dyn Buffer>) {
    let (ext, _) = CountingMatcher::new(MatcherType::Extension, vec![0]);
    let report = engine(vec![Box::new(ext)], vec![]).identify("file.x", buffer);
    assert!(report.identifications.is_empty());
    assert!(!report.is_degraded());
}
