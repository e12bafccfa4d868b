//! Concurrency combinators for rule evaluation
//!
//! Rule-groups are evaluated with "any matches" semantics: a logical OR over
//! asynchronous truth values. The standard combinators don't express this:
//! `join_all` waits for everything and `select` settles on the first
//! completion regardless of outcome. The engine is built on two explicit
//! primitives:
//!
//! - [`first_success`] fulfils as soon as the first success arrives and
//!   rejects only once every input has failed (logical OR).
//! - [`all_succeed`] fulfils only when every input succeeds (logical AND).
//!
//! Both drive all of their inputs concurrently; nothing iterates serially.

use std::fmt;

use futures::stream::{FuturesUnordered, StreamExt};

use futures::future::BoxFuture;

/// Evaluation failure carrying the name of the rule that rejected.
///
/// This is a value, not an error type: denial of a single rule is an
/// expected outcome the host uses for redirect lookup and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    name: String,
}

impl Rejection {
    /// A rejection attributed to the given rule name.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Name of the rule that rejected.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consume the rejection, yielding the rule name.
    pub fn into_name(self) -> String {
        self.name
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule `{}` rejected", self.name)
    }
}

/// Settled result of validating one rule: the rule name on success, a
/// [`Rejection`] carrying the name on failure.
pub type RuleResult = std::result::Result<String, Rejection>;

/// A rule validation in flight.
pub type RuleFuture<'a> = BoxFuture<'a, RuleResult>;

/// Outcome of a rule-group in which no rule matched.
#[derive(Debug, Clone)]
pub struct GroupFailure {
    /// All rejections, in the input order of the rule-group.
    pub rejections: Vec<Rejection>,

    /// The rejection that settled last. `None` only for an empty group.
    pub last_settled: Option<Rejection>,
}

/// Fulfil with the first success among `tasks`; fail only once every task
/// has failed.
///
/// All tasks are polled concurrently. Whichever success settles first wins
/// and the remaining tasks are dropped; when more than one task would
/// succeed, which one is observed first is not specified. Collected
/// rejections preserve the input order of the group regardless of
/// settlement order.
pub async fn first_success(tasks: Vec<RuleFuture<'_>>) -> std::result::Result<String, GroupFailure> {
    let total = tasks.len();
    let mut pending: FuturesUnordered<_> = tasks
        .into_iter()
        .enumerate()
        .map(|(index, task)| async move { (index, task.await) })
        .collect();

    let mut rejections: Vec<Option<Rejection>> = (0..total).map(|_| None).collect();
    let mut last_settled = None;

    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(name) => return Ok(name),
            Err(rejection) => {
                last_settled = Some(rejection.clone());
                rejections[index] = Some(rejection);
            }
        }
    }

    Err(GroupFailure {
        rejections: rejections.into_iter().flatten().collect(),
        last_settled,
    })
}

/// Fulfil only when every task succeeds; fail on the first rejection
/// observed, dropping the tasks still in flight.
pub async fn all_succeed(tasks: Vec<RuleFuture<'_>>) -> std::result::Result<Vec<String>, Rejection> {
    let total = tasks.len();
    let mut pending: FuturesUnordered<_> = tasks
        .into_iter()
        .enumerate()
        .map(|(index, task)| async move { (index, task.await) })
        .collect();

    let mut names: Vec<Option<String>> = (0..total).map(|_| None).collect();

    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(name) => names[index] = Some(name),
            Err(rejection) => return Err(rejection),
        }
    }

    Ok(names.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{self, FutureExt};
    use std::time::Duration;

    fn fulfilled(name: &str) -> RuleFuture<'static> {
        future::ready(Ok(name.to_owned())).boxed()
    }

    fn rejected(name: &str) -> RuleFuture<'static> {
        future::ready(Err(Rejection::named(name))).boxed()
    }

    fn rejected_after(name: &str, delay: Duration) -> RuleFuture<'static> {
        let name = name.to_owned();
        async move {
            tokio::time::sleep(delay).await;
            Err(Rejection::named(name))
        }
        .boxed()
    }

    #[test]
    fn first_success_picks_the_success() {
        tokio_test::block_on(async {
            let result =
                first_success(vec![rejected("A"), fulfilled("B"), rejected("C")]).await;
            assert_eq!(result.unwrap(), "B");
        });
    }

    #[tokio::test]
    async fn first_success_fails_when_all_fail() {
        let failure = first_success(vec![rejected("A"), rejected("B")])
            .await
            .unwrap_err();
        let names: Vec<_> = failure.rejections.iter().map(Rejection::name).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(failure.last_settled.is_some());
    }

    #[tokio::test]
    async fn first_success_preserves_input_order_of_rejections() {
        // B settles before A, but the collected rejections follow input order.
        let failure = first_success(vec![
            rejected_after("A", Duration::from_millis(20)),
            rejected("B"),
        ])
        .await
        .unwrap_err();

        let names: Vec<_> = failure.rejections.iter().map(Rejection::name).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(failure.last_settled.unwrap().name(), "A");
    }

    #[tokio::test]
    async fn first_success_does_not_wait_for_stragglers() {
        // The slow rejection never has to settle for the success to win.
        let result = first_success(vec![
            rejected_after("SLOW", Duration::from_secs(30)),
            fulfilled("FAST"),
        ])
        .await;
        assert_eq!(result.unwrap(), "FAST");
    }

    #[tokio::test]
    async fn first_success_on_empty_group_fails() {
        let failure = first_success(Vec::new()).await.unwrap_err();
        assert!(failure.rejections.is_empty());
        assert!(failure.last_settled.is_none());
    }

    #[test]
    fn all_succeed_collects_every_name() {
        tokio_test::block_on(async {
            let names = all_succeed(vec![fulfilled("A"), fulfilled("B")]).await.unwrap();
            assert_eq!(names, vec!["A", "B"]);
        });
    }

    #[tokio::test]
    async fn all_succeed_fails_on_any_rejection() {
        let rejection = all_succeed(vec![fulfilled("A"), rejected("B")])
            .await
            .unwrap_err();
        assert_eq!(rejection.name(), "B");
    }

    #[tokio::test]
    async fn all_succeed_on_empty_input_fulfils() {
        assert!(all_succeed(Vec::new()).await.unwrap().is_empty());
    }
}
