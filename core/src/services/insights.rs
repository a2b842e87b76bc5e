//! Generated insights and their read state.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::client::ApiClient;
use crate::state::{RequestStatus, StateCell};
use crate::types::{Insight, Priority, INSIGHT_HEALTH_TIP, INSIGHT_PATTERN, INSIGHT_RECOMMENDATION};

pub const DEFAULT_INSIGHT_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsightsState {
    /// Newest first.
    pub insights: Vec<Insight>,
    pub status: RequestStatus,
}

tracked_state!(InsightsState);

pub struct InsightsService {
    api: Arc<ApiClient>,
    state: StateCell<InsightsState>,
}

impl InsightsService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: StateCell::new(InsightsState::default()),
        }
    }

    pub fn state(&self) -> InsightsState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<InsightsState> {
        self.state.subscribe()
    }

    pub async fn fetch_insights(&self, limit: usize) {
        self.state.begin();
        match self
            .api
            .get::<Vec<Insight>>(&format!("/insights?limit={limit}"))
            .await
        {
            Ok(insights) => self.state.succeed(|s| s.insights = insights),
            Err(err) => self.state.fail(&err),
        }
    }

    /// Ask the server for fresh insights and prepend the ones not already held.
    pub async fn generate_insights(&self) {
        self.state.begin();
        match self.api.post_empty::<Vec<Insight>>("/insights/generate").await {
            Ok(generated) => self.state.succeed(|s| merge_new_insights(&mut s.insights, generated)),
            Err(err) => self.state.fail(&err),
        }
    }

    /// Mark a locally held insight as read. Unknown ids are ignored and
    /// failures are only logged.
    pub async fn mark_insight_as_read(&self, id: &str) {
        let held = self
            .state
            .read(|s| s.insights.iter().any(|i| i.id.as_deref() == Some(id)));
        if !held {
            return;
        }

        match self
            .api
            .post_empty::<serde_json::Value>(&format!("/insights/{id}/read"))
            .await
        {
            Ok(_) => self.state.update(|s| {
                if let Some(insight) = s.insights.iter_mut().find(|i| i.id.as_deref() == Some(id)) {
                    insight.is_read = Some(true);
                }
            }),
            Err(err) => warn!(insight_id = %id, error = %err, "failed to mark insight as read"),
        }
    }

    pub fn unread(&self) -> Vec<Insight> {
        self.filtered(|i| i.is_read == Some(false))
    }

    pub fn high_priority(&self) -> Vec<Insight> {
        self.filtered(|i| i.priority == Some(Priority::High))
    }

    pub fn by_type(&self) -> BTreeMap<String, Vec<Insight>> {
        self.state.read(|s| {
            let mut groups: BTreeMap<String, Vec<Insight>> = BTreeMap::new();
            for insight in &s.insights {
                groups.entry(insight.kind.clone()).or_default().push(insight.clone());
            }
            groups
        })
    }

    pub fn patterns(&self) -> Vec<Insight> {
        self.filtered(|i| i.kind == INSIGHT_PATTERN)
    }

    pub fn recommendations(&self) -> Vec<Insight> {
        self.filtered(|i| i.kind == INSIGHT_RECOMMENDATION)
    }

    pub fn health_tips(&self) -> Vec<Insight> {
        self.filtered(|i| i.kind == INSIGHT_HEALTH_TIP)
    }

    fn filtered(&self, keep: impl Fn(&Insight) -> bool) -> Vec<Insight> {
        self.state
            .read(|s| s.insights.iter().filter(|i| keep(i)).cloned().collect())
    }
}

/// Prepend `generated` entries whose id is not already in `held`.
///
/// New entries keep their server order; held entries follow unchanged.
/// Entries without an id are always treated as new.
pub fn merge_new_insights(held: &mut Vec<Insight>, generated: Vec<Insight>) {
    let known: HashSet<String> = held.iter().filter_map(|i| i.id.clone()).collect();
    let fresh: Vec<Insight> = generated
        .into_iter()
        .filter(|i| i.id.as_ref().map_or(true, |id| !known.contains(id)))
        .collect();
    held.splice(0..0, fresh);
}
