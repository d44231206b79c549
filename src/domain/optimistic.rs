//! Snapshot / apply / commit-or-rollback, as a value rather than a closure
//! over mutable state.

/// Result of settling an optimistic change against the authoritative store.
#[derive(Debug, PartialEq)]
pub enum Settled<E> {
    Committed,
    RolledBack(E),
}

impl<E> Settled<E> {
    pub fn into_result(self) -> Result<(), E> {
        match self {
            Settled::Committed => Ok(()),
            Settled::RolledBack(e) => Err(e),
        }
    }
}

/// Holds the pre-change copy of `T` until the change is confirmed or undone.
#[derive(Debug)]
#[must_use = "an optimistic update must be settled with commit_or_rollback"]
pub struct OptimisticUpdate<T: Clone> {
    snapshot: T,
}

impl<T: Clone> OptimisticUpdate<T> {
    pub fn snapshot(state: &T) -> Self {
        Self {
            snapshot: state.clone(),
        }
    }

    /// Runs `mutation` on the live state. If the mutation itself refuses, the
    /// state is restored before returning the error.
    pub fn apply<R, E, F>(&self, state: &mut T, mutation: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        let outcome = mutation(state);
        if outcome.is_err() {
            *state = self.snapshot.clone();
        }
        outcome
    }

    /// Keeps the live state on success, restores the snapshot on failure.
    pub fn commit_or_rollback<E>(self, state: &mut T, result: Result<(), E>) -> Settled<E> {
        match result {
            Ok(()) => Settled::Committed,
            Err(e) => {
                *state = self.snapshot;
                Settled::RolledBack(e)
            }
        }
    }

    pub fn original(&self) -> &T {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_keeps_the_mutation() {
        let mut state = vec![1, 2, 3];
        let update = OptimisticUpdate::snapshot(&state);
        update
            .apply(&mut state, |s| {
                s.push(4);
                Ok::<_, ()>(())
            })
            .unwrap();

        let settled = update.commit_or_rollback(&mut state, Ok::<_, &str>(()));

        assert_eq!(settled, Settled::Committed);
        assert_eq!(state, vec![1, 2, 3, 4]);
    }

    #[test]
    fn rollback_restores_the_snapshot_exactly() {
        let mut state = vec!["a".to_string()];
        let update = OptimisticUpdate::snapshot(&state);
        update
            .apply(&mut state, |s| {
                s[0] = "b".into();
                Ok::<_, ()>(())
            })
            .unwrap();
        assert_eq!(state, vec!["b"]);

        let settled = update.commit_or_rollback(&mut state, Err("offline"));

        assert_eq!(settled, Settled::RolledBack("offline"));
        assert_eq!(state, vec!["a"]);
    }

    #[test]
    fn refused_mutation_leaves_state_untouched() {
        let mut state = 10;
        let update = OptimisticUpdate::snapshot(&state);
        let refused: Result<(), &str> = update.apply(&mut state, |s| {
            *s = 99;
            Err("no")
        });
        assert!(refused.is_err());
        assert_eq!(state, 10);
        assert_eq!(*update.original(), 10);
    }
}
