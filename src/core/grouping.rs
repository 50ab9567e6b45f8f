use crate::models::{Application, LengthOfStay};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Exact-match compatibility key
///
/// Two applications can only end up in the same ring when their keys are
/// equal. Any `Fn(&Application) -> K` closure works as a key as well.
pub trait GroupBy: Send + Sync {
    type Key: Ord + Clone + Debug + Send;

    fn key(&self, application: &Application) -> Self::Key;
}

/// Default grouping: identical length of stay
#[derive(Debug, Clone, Copy, Default)]
pub struct ByLengthOfStay;

impl GroupBy for ByLengthOfStay {
    type Key = LengthOfStay;

    fn key(&self, application: &Application) -> LengthOfStay {
        application.length_of_stay
    }
}

impl<K, F> GroupBy for F
where
    F: Fn(&Application) -> K + Send + Sync,
    K: Ord + Clone + Debug + Send,
{
    type Key = K;

    fn key(&self, application: &Application) -> K {
        self(application)
    }
}

/// Bucket applications by key, in ascending key order
pub fn partition<'a, G: GroupBy + ?Sized>(
    applications: &'a [Application],
    group_by: &G,
) -> BTreeMap<G::Key, Vec<&'a Application>> {
    let mut groups: BTreeMap<G::Key, Vec<&'a Application>> = BTreeMap::new();
    for application in applications {
        groups
            .entry(group_by.key(application))
            .or_default()
            .push(application);
    }
    groups
}
