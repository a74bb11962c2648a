// Tue Jan 13 2026 - Alex

use crate::config::HeapConfig;
use crate::gc::{HeapError, HeapObject, HeapSegment, HeapSnapshot, ObjectReader};
use crate::memory::Address;
use crate::validation::{BackgroundMarks, CardTable, IssueSeverity};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IssueKind {
    /// The member does not point at a parseable object.
    BadMember,
    /// The member points at a free object.
    FreeMember,
    /// An older object points at a younger one and no card covers it.
    MissingCard,
    /// The member slots themselves could not be read.
    UnreadableMember,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::BadMember => "bad member",
            IssueKind::FreeMember => "free member",
            IssueKind::MissingCard => "missing card",
            IssueKind::UnreadableMember => "unreadable member",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObjectIssue {
    pub object: Address,
    pub offset: u64,
    pub target: Address,
    pub kind: IssueKind,
}

impl ObjectIssue {
    pub fn severity(&self) -> IssueSeverity {
        match self.kind {
            IssueKind::UnreadableMember => IssueSeverity::Warning,
            _ => IssueSeverity::Error,
        }
    }

    pub fn to_error(&self) -> HeapError {
        match self.kind {
            IssueKind::MissingCard => HeapError::WriteBarrierMissing {
                parent: self.object,
                child: self.target,
            },
            IssueKind::UnreadableMember => HeapError::Unreadable { address: self.target },
            IssueKind::BadMember | IssueKind::FreeMember => HeapError::corrupt(self.object, None, self.to_string()),
        }
    }
}

impl fmt::Display for ObjectIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Object {}: {} {} at offset {:#x}",
            self.object,
            self.kind.as_str(),
            self.target,
            self.offset
        )
    }
}

/// Checks the outbound references of heap objects.
pub struct ObjectVerifier<'a> {
    reader: ObjectReader<'a>,
    snapshot: &'a HeapSnapshot,
    config: &'a HeapConfig,
    cards: CardTable<'a>,
    marks: BackgroundMarks<'a>,
}

impl<'a> ObjectVerifier<'a> {
    pub fn new(reader: ObjectReader<'a>, snapshot: &'a HeapSnapshot, config: &'a HeapConfig) -> Self {
        Self {
            cards: CardTable::new(reader.memory(), *reader.layout()),
            marks: BackgroundMarks::new(reader.memory()),
            reader,
            snapshot,
            config,
        }
    }

    /// Every issue found in the members of `object`, which lives in
    /// `segment`. Each issue is logged once.
    pub fn verify(&self, object: &HeapObject, segment: &HeapSegment) -> Vec<ObjectIssue> {
        let mut issues = Vec::new();
        let Some(heap) = self.snapshot.heap(segment.heap()) else {
            return issues;
        };

        if self.config.check_background_marks {
            match self.marks.should_consider_object(heap, segment, object.address()) {
                Ok(true) => {}
                Ok(false) => {
                    log::trace!("Skipping {}: not marked by the background GC", object.address());
                    return issues;
                }
                Err(e) => log::warn!("Background mark of {} unreadable: {}", object.address(), e),
            }
        }

        let mut check_cards =
            self.config.check_cards && object.generation > 0 && !object.is_frozen && CardTable::is_present(heap);
        if check_cards {
            match self.cards.any_card_set(heap, object.address(), object.size()) {
                Ok(set) => check_cards = !set,
                Err(e) => {
                    log::warn!("Card table unreadable for {}, cards not checked: {}", object.address(), e);
                    check_cards = false;
                }
            }
        }

        let references = match self.reader.references(&object.view) {
            Ok(references) => references,
            Err(e) => {
                issues.push(ObjectIssue {
                    object: object.address(),
                    offset: 0,
                    target: e.address().unwrap_or(object.method_table()),
                    kind: IssueKind::UnreadableMember,
                });
                log::warn!("{}", issues[0]);
                return issues;
            }
        };

        for reference in references {
            let issue = match reference {
                Ok(r) if r.target.is_null() => continue,
                Ok(r) => match self.check_member(object, r.target, check_cards) {
                    Some(kind) => ObjectIssue {
                        object: object.address(),
                        offset: r.offset,
                        target: r.target,
                        kind,
                    },
                    None => continue,
                },
                Err(e) => {
                    let target = e.address().unwrap_or_default();
                    ObjectIssue {
                        object: object.address(),
                        offset: target.as_u64().saturating_sub(object.address().as_u64()),
                        target,
                        kind: IssueKind::UnreadableMember,
                    }
                }
            };
            log::warn!("{}", issue);
            issues.push(issue);
        }
        issues
    }

    fn check_member(&self, parent: &HeapObject, target: Address, check_cards: bool) -> Option<IssueKind> {
        let layout = self.reader.layout();
        if !target.is_aligned(layout.pointer_size()) {
            return Some(IssueKind::BadMember);
        }
        let Some(segment) = self.snapshot.segment_of(target) else {
            return Some(IssueKind::BadMember);
        };

        if self.config.check_background_marks {
            if let Some(heap) = self.snapshot.heap(segment.heap()) {
                if let Ok(false) = self.marks.should_consider_object(heap, segment, target) {
                    return None;
                }
            }
        }

        let mt = match self.reader.method_table_of(target) {
            Ok(mt) => mt,
            Err(_) => return Some(IssueKind::BadMember),
        };
        if self.reader.is_free(mt) {
            return Some(IssueKind::FreeMember);
        }
        match self.reader.view(target, segment.is_large_or_pinned()) {
            Ok(view) if view.size >= layout.min_object_size() => {}
            _ => return Some(IssueKind::BadMember),
        }

        if check_cards && self.needs_card(parent.generation, target) {
            return Some(IssueKind::MissingCard);
        }
        None
    }

    /// LOH and POH count as the oldest generation; a child in the oldest
    /// generation never needs a card.
    fn needs_card(&self, parent_generation: u32, child: Address) -> bool {
        let max = self.snapshot.max_generation();
        let parent = parent_generation.min(max);
        let child = self.snapshot.get_generation(child).map_or(max, |g| g.min(max));
        child < max && child < parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::fixture::{self, Fixture};

    fn a(value: u64) -> Address {
        Address::new(value)
    }

    fn verify_all(fx: &Fixture) -> Vec<ObjectIssue> {
        let session = fx.session();
        let summary = session.traverse_all(&mut |_: &HeapObject| {}, true).unwrap();
        summary.verification.unwrap().issues().to_vec()
    }

    /// Old parent at 0x20_0000 pointing at a gen0 child at 0x30_0000.
    fn cross_generation() -> Fixture {
        let mut fx = Fixture::regions();
        fx.region(2, a(0x20_0000), a(0x20_0028));
        fx.node(a(0x20_0000), a(0x30_0000), Address::NULL);
        fx.region(0, a(0x30_0000), a(0x30_0018));
        fx.object(a(0x30_0000), fixture::PLAIN_MT);
        fx
    }

    #[test]
    fn test_missing_card_is_reported() {
        let fx = cross_generation();
        let issues = verify_all(&fx);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::MissingCard);
        assert_eq!(issues[0].offset, 8);
        assert_eq!(
            issues[0].to_error(),
            HeapError::WriteBarrierMissing {
                parent: a(0x20_0000),
                child: a(0x30_0000)
            }
        );
    }

    #[test]
    fn test_set_card_clears_issue() {
        let mut fx = cross_generation();
        fx.set_card(a(0x20_0008));
        assert!(verify_all(&fx).is_empty());
    }

    #[test]
    fn test_card_checks_can_be_disabled() {
        let mut fx = cross_generation();
        fx.config_mut().check_cards = false;
        assert!(verify_all(&fx).is_empty());
    }

    #[test]
    fn test_young_parent_needs_no_card() {
        let mut fx = Fixture::regions();
        fx.region(0, a(0x30_0000), a(0x30_0040));
        fx.node(a(0x30_0000), a(0x30_0028), Address::NULL);
        fx.object(a(0x30_0028), fixture::PLAIN_MT);
        fx.region(1, a(0x40_0000), a(0x40_0028));
        fx.node(a(0x40_0000), a(0x50_0000), Address::NULL);
        fx.region(2, a(0x50_0000), a(0x50_0018));
        fx.object(a(0x50_0000), fixture::PLAIN_MT);
        assert!(verify_all(&fx).is_empty());
    }

    #[test]
    fn test_bad_and_free_members() {
        let mut fx = Fixture::regions();
        fx.region(0, a(0x30_0000), a(0x30_0040));
        fx.node(a(0x30_0000), a(0x30_0028), a(0x1234));
        fx.free(a(0x30_0028), 24);
        let issues = verify_all(&fx);
        let kinds: Vec<_> = issues.iter().map(|i| (i.offset, i.kind)).collect();
        assert_eq!(kinds, vec![(8, IssueKind::FreeMember), (16, IssueKind::BadMember)]);
        assert!(issues.iter().all(|i| i.severity() == IssueSeverity::Error));
    }

    #[test]
    fn test_unmarked_background_target_is_not_bad() {
        let mut fx = Fixture::regions();
        fx.region(2, a(0x20_0000), a(0x20_0100));
        fx.node(a(0x20_0000), a(0x20_00c0), Address::NULL);
        // dead and not yet swept: the old header is garbage
        fx.object(a(0x20_00c0), a(0xdead_0000));
        fx.background_planning(a(0x20_0010));

        let session = fx.session();
        let config = session.config().clone().with_card_checks(false);
        let reader = session.object_reader();
        let snapshot = session.snapshot();
        let segment = &snapshot.segments()[0];
        let traverser =
            crate::gc::HeapTraverser::new(snapshot, reader, session.allocation_contexts(), session.interrupt(), &config);
        let parent = traverser.classify(reader.view(a(0x20_0000), false).unwrap(), segment).unwrap();

        let verifier = ObjectVerifier::new(reader, snapshot, &config);
        assert!(verifier.verify(&parent, segment).is_empty());

        let strict = HeapConfig { check_background_marks: false, ..config.clone() };
        let verifier = ObjectVerifier::new(reader, snapshot, &strict);
        let issues = verifier.verify(&parent, segment);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::BadMember);
    }
}
