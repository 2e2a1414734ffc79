//! `SwitchedAction`: defer to one of several concrete actions based on which
//! feature switches are active on the request (spec §4.5).
//!
//! Grounded on `switched.py`'s `SwitchedAction`/`_SwitchedActionMetaClass`.
//! Python validates `switch_to_action_map` at class-creation time via a
//! metaclass so the error surfaces at import rather than on first call;
//! Rust has no equivalent hook, so [`SwitchedAction::try_new`] performs the
//! same "at least two entries" check at construction time instead — still
//! before the action ever runs a real request.

use async_trait::async_trait;
use pysoa_core::message::EnrichedActionRequest;
use pysoa_core::{Error, JsonObject, SwitchSet};
use std::sync::Arc;

use crate::action::Action;

/// One entry in a [`SwitchedAction`]'s dispatch table: either a specific
/// switch to test, or the catch-all default slot (spec §4.5's
/// `DEFAULT_ACTION` sentinel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchSelector {
    /// Use this action if `switch` is active on the request.
    Switch(i64),
    /// The designated default/fallback action.
    Default,
}

/// Failure constructing a [`SwitchedAction`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SwitchedActionError {
    /// `switch_to_action_map` had fewer than two entries.
    #[error("switch_to_action_map must have at least two entries, got {0}")]
    TooFewEntries(usize),
}

/// An action that defers to one of several concrete actions, chosen by
/// which feature switch (if any) is active on the incoming request.
///
/// Selection (spec §4.5, three-bucket fallback):
/// 1. The first entry whose switch is active in the request wins
///    immediately (`matched`).
/// 2. Otherwise, the entry explicitly marked [`SwitchSelector::Default`]
///    is used (`default`).
/// 3. Otherwise, the very last entry in the table is used regardless of its
///    switch (`last`), so a table with no explicit default still always
///    resolves to something.
pub struct SwitchedAction {
    switch_to_action_map: Vec<(SwitchSelector, Arc<dyn Action>)>,
}

impl SwitchedAction {
    /// Build a `SwitchedAction` over `switch_to_action_map`, which must
    /// have at least two entries (spec §4.5 / `switched.py`'s metaclass
    /// validation: "must be an iterable of at least two indexable items").
    pub fn try_new(
        switch_to_action_map: Vec<(SwitchSelector, Arc<dyn Action>)>,
    ) -> Result<Self, SwitchedActionError> {
        if switch_to_action_map.len() < 2 {
            return Err(SwitchedActionError::TooFewEntries(
                switch_to_action_map.len(),
            ));
        }
        Ok(Self {
            switch_to_action_map,
        })
    }

    fn select(&self, switches: &SwitchSet) -> Arc<dyn Action> {
        let mut default: Option<Arc<dyn Action>> = None;
        let mut last: Option<Arc<dyn Action>> = None;

        for (selector, action) in &self.switch_to_action_map {
            match selector {
                SwitchSelector::Default => default = Some(action.clone()),
                SwitchSelector::Switch(switch) if switches.contains(*switch) => {
                    return action.clone();
                }
                SwitchSelector::Switch(_) => last = Some(action.clone()),
            }
        }

        default
            .or(last)
            .expect("try_new guarantees at least two entries")
    }
}

#[async_trait]
impl Action for SwitchedAction {
    fn validate_request(&self, request: &EnrichedActionRequest) -> Result<(), Vec<Error>> {
        self.select(&request.switches).validate_request(request)
    }

    async fn run(&self, request: EnrichedActionRequest) -> Result<JsonObject, Vec<Error>> {
        let selected = self.select(&request.switches);
        selected.run(request).await
    }

    fn validate_response(&self, body: &JsonObject) -> Result<(), Vec<Error>> {
        // No single underlying action is known here without the request's
        // switches; response validation for the selected branch already ran
        // as part of `Server::run_one_action` calling it directly on the
        // action `select` returned, so this is intentionally permissive.
        let _ = body;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pysoa_core::empty_object;

    struct StubAction(&'static str);

    #[async_trait]
    impl Action for StubAction {
        async fn run(&self, _request: EnrichedActionRequest) -> Result<JsonObject, Vec<Error>> {
            let mut body = empty_object();
            body.insert("picked".to_string(), self.0.into());
            Ok(body)
        }
    }

    #[test]
    fn fewer_than_two_entries_is_rejected() {
        let err = SwitchedAction::try_new(vec![(
            SwitchSelector::Default,
            Arc::new(StubAction("only")) as Arc<dyn Action>,
        )])
        .unwrap_err();
        assert_eq!(err, SwitchedActionError::TooFewEntries(1));
    }

    #[tokio::test]
    async fn matched_switch_wins_over_default() {
        let action = SwitchedAction::try_new(vec![
            (SwitchSelector::Switch(7), Arc::new(StubAction("v2"))),
            (SwitchSelector::Default, Arc::new(StubAction("v1"))),
        ])
        .unwrap();

        let request = crate::test_support::enriched_request("ping", empty_object(), &[7]);
        let body = action.run(request).await.unwrap();
        assert_eq!(body["picked"], "v2");
    }

    #[tokio::test]
    async fn falls_back_to_default_when_no_switch_matches() {
        let action = SwitchedAction::try_new(vec![
            (SwitchSelector::Switch(7), Arc::new(StubAction("v2"))),
            (SwitchSelector::Default, Arc::new(StubAction("v1"))),
        ])
        .unwrap();

        let request = crate::test_support::enriched_request("ping", empty_object(), &[]);
        let body = action.run(request).await.unwrap();
        assert_eq!(body["picked"], "v1");
    }

    #[tokio::test]
    async fn falls_back_to_last_entry_when_no_default_present() {
        let action = SwitchedAction::try_new(vec![
            (SwitchSelector::Switch(1), Arc::new(StubAction("a"))),
            (SwitchSelector::Switch(2), Arc::new(StubAction("b"))),
        ])
        .unwrap();

        let request = crate::test_support::enriched_request("ping", empty_object(), &[]);
        let body = action.run(request).await.unwrap();
        assert_eq!(body["picked"], "b");
    }

    #[tokio::test]
    async fn matched_switch_is_used_even_mid_table() {
        let action = SwitchedAction::try_new(vec![
            (SwitchSelector::Switch(1), Arc::new(StubAction("a"))),
            (SwitchSelector::Switch(2), Arc::new(StubAction("b"))),
            (SwitchSelector::Default, Arc::new(StubAction("default"))),
        ])
        .unwrap();

        let request = crate::test_support::enriched_request("ping", empty_object(), &[2]);
        let body = action.run(request).await.unwrap();
        assert_eq!(body["picked"], "b");
    }
}
