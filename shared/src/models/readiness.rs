use serde::Serialize;

use super::{Member, MemberId};

/// Group state at one evaluation instant. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessSnapshot {
    pub threshold: u8,
    pub members: Vec<Member>,
}

impl ReadinessSnapshot {
    pub fn new(members: Vec<Member>, threshold: u8) -> Self {
        Self { threshold, members }
    }

    pub fn is_ready(&self, member: &Member) -> bool {
        member.desire.meets(self.threshold)
    }

    pub fn ready(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| self.is_ready(m))
    }

    pub fn not_ready(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| !self.is_ready(m))
    }

    pub fn ready_count(&self) -> usize {
        self.ready().count()
    }

    /// True iff every member is ready and there is at least one member.
    pub fn is_fully_ready(&self) -> bool {
        !self.members.is_empty() && self.ready_count() == self.members.len()
    }

    pub fn member_ids(&self) -> Vec<MemberId> {
        self.members.iter().map(|m| m.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DesireLevel;
    use chrono::Utc;

    fn member(id: MemberId, level: i64) -> Member {
        let mut m = Member::new(id, format!("m{id}"), Utc::now());
        m.desire = DesireLevel::new(level).unwrap();
        m
    }

    #[test]
    fn test_empty_group_is_never_fully_ready() {
        let snapshot = ReadinessSnapshot::new(vec![], 1);
        assert!(!snapshot.is_fully_ready());
    }

    #[test]
    fn test_fully_ready_requires_every_member_at_threshold() {
        let snapshot = ReadinessSnapshot::new(vec![member(1, 7), member(2, 10)], 7);
        assert!(snapshot.is_fully_ready());

        let snapshot = ReadinessSnapshot::new(vec![member(1, 7), member(2, 6)], 7);
        assert!(!snapshot.is_fully_ready());
        assert_eq!(snapshot.ready_count(), 1);
        assert_eq!(snapshot.not_ready().map(|m| m.id).collect::<Vec<_>>(), vec![2]);
    }
}
