//! Session-scoped state: the query being built and the result views it has produced.
//!
//! Each search opens a result view under a [`ViewId`] that is issued once and never reused or
//! renumbered. Closing a view removes only its own entry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::backend::{Client, SearchResults, Transport};
use crate::config::QueryConfig;
use crate::error::{Error, Result};
use crate::query::{Query, QueryPayload};
use crate::schema::FieldSchema;

/// Stable identifier of a result view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(u64);

impl ViewId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ViewStatus {
    /// The search has been sent and no answer has come back yet.
    Pending,
    Loaded(SearchResults),
    /// The search failed; the message is what the user was shown.
    Failed(String),
    /// Cancellation was requested from the backend.
    Cancelled,
}

/// One submitted search and what came back for it.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultView {
    /// The snapshot that was sent. Later edits to the session's query don't touch it.
    pub payload: QueryPayload,
    pub qid: Option<u64>,
    pub status: ViewStatus,
}

impl ResultView {
    pub fn results(&self) -> Option<&SearchResults> {
        match self.status {
            ViewStatus::Loaded(ref res) => Some(res),
            _ => None,
        }
    }
}

pub struct Session {
    config: QueryConfig,
    query: Query,
    views: BTreeMap<ViewId, ResultView>,
    next_id: u64,
}

impl Session {
    pub fn new(schema: Arc<FieldSchema>, config: QueryConfig) -> Self {
        Self {
            query: Query::with_config(schema, &config),
            config,
            views: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut Query {
        &mut self.query
    }

    /// Open a pending view for a submitted payload. With `same_tab` set, the most recently opened
    /// view is closed first.
    pub fn open_view(&mut self, payload: QueryPayload) -> ViewId {
        if self.config.same_tab {
            if let Some(last) = self.views.keys().next_back().copied() {
                self.views.remove(&last);
            }
        }
        let id = ViewId(self.next_id);
        self.next_id += 1;
        self.views.insert(
            id,
            ResultView {
                payload,
                qid: None,
                status: ViewStatus::Pending,
            },
        );
        id
    }

    pub fn view(&self, id: ViewId) -> Option<&ResultView> {
        self.views.get(&id)
    }

    /// Open views, oldest first.
    pub fn views(&self) -> impl Iterator<Item = (ViewId, &ResultView)> {
        self.views.iter().map(|(id, view)| (*id, view))
    }

    pub fn view_for_qid(&self, qid: u64) -> Option<ViewId> {
        self.views
            .iter()
            .find(|(_, view)| view.qid == Some(qid))
            .map(|(id, _)| *id)
    }

    fn view_mut(&mut self, id: ViewId) -> Result<&mut ResultView> {
        self.views.get_mut(&id).ok_or(Error::UnknownView(id))
    }

    pub fn record_results(&mut self, id: ViewId, results: SearchResults) -> Result<()> {
        let view = self.view_mut(id)?;
        if results.qid.is_none() {
            log::warn!("no qid found in results for view {}", id);
        }
        view.qid = results.qid;
        view.status = ViewStatus::Loaded(results);
        Ok(())
    }

    pub fn record_failure(&mut self, id: ViewId, err: &Error) -> Result<()> {
        let view = self.view_mut(id)?;
        log::error!("view {} failed: {}", id, err);
        view.status = ViewStatus::Failed(err.to_string());
        Ok(())
    }

    /// Close a view. Other views keep their ids.
    pub fn close_view(&mut self, id: ViewId) -> Option<ResultView> {
        log::debug!("closing view {}", id);
        self.views.remove(&id)
    }

    /// Submit the current query and run it. The view is left `Loaded` or `Failed`, never
    /// `Pending`, once this returns.
    pub fn run_search<T: Transport>(&mut self, client: &Client<T>) -> Result<ViewId> {
        let payload = self.query.submit();
        self.run_payload(client, payload)
    }

    /// Run an already-built payload, such as one from [`Query::pivot_on`] or
    /// [`Query::group_by`].
    pub fn run_payload<T: Transport>(
        &mut self,
        client: &Client<T>,
        payload: QueryPayload,
    ) -> Result<ViewId> {
        let id = self.open_view(payload);
        let outcome = match self.views.get(&id) {
            Some(view) => client.search(&view.payload),
            None => return Err(Error::UnknownView(id)),
        };
        match outcome {
            Ok(results) => {
                self.record_results(id, results)?;
                Ok(id)
            }
            Err(err) => {
                self.record_failure(id, &err)?;
                Err(err)
            }
        }
    }

    /// Ask the backend to abandon a view's query. Local state other than the view's status is
    /// left alone.
    pub fn cancel<T: Transport>(&mut self, id: ViewId, client: &Client<T>) -> Result<()> {
        let qid = self
            .view(id)
            .ok_or(Error::UnknownView(id))?
            .qid
            .ok_or_else(|| Error::ApplicationError(format!("view {} has no query id", id)))?;
        log::debug!("cancelling query {}", qid);
        client.cancel_query(qid)?;
        self.view_mut(id)?.status = ViewStatus::Cancelled;
        Ok(())
    }
}
