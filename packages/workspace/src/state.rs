use crate::error::{LoadError, PartialFailure, SyncError, SyncResult};
use crate::loader::{AggregateLoader, LoadedAggregate, DASHBOARD_SERVICE_KIND};
use dashsync_common::{
    vocabulary_names, EntityRef, GatewayResult, ServiceRef, SyncConfig, SyncGateway, TagCategory,
};
use dashsync_editor::{EditSession, Epoch, Mutation, Reconciler, Resolution};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handed out by `begin_load`, presented back to `finish_load`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub epoch: Epoch,
    pub aggregate_id: String,
}

/// Handed out by `begin_trail` for the owning-service lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailTicket {
    pub epoch: Epoch,
    pub service_id: String,
}

/// Handed out by `begin_vocabulary`; only the same generation may fill the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocabularyTicket {
    pub epoch: Epoch,
}

/// Owns the current edit session and retires it when another aggregate is opened
pub struct SessionManager<G: SyncGateway + ?Sized> {
    gateway: Arc<G>,
    config: SyncConfig,
    epoch: Epoch,
    session: Option<EditSession>,

    // Per-session caches, dropped with the session
    vocabulary: Option<Vec<TagCategory>>,
    failures: Vec<PartialFailure>,
}

impl<G: SyncGateway + ?Sized> SessionManager<G> {
    pub fn new(gateway: Arc<G>, config: SyncConfig) -> Self {
        Self {
            gateway,
            config,
            epoch: Epoch(0),
            session: None,
            vocabulary: None,
            failures: Vec::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn loader(&self) -> AggregateLoader<G> {
        AggregateLoader::new(self.gateway.clone(), &self.config)
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut EditSession> {
        self.session.as_mut()
    }

    /// Failures recorded for the current session by its load and trail lookup
    pub fn load_failures(&self) -> &[PartialFailure] {
        &self.failures
    }

    /// Retire the current session and start a new generation
    pub fn begin_load(&mut self, aggregate_id: &str) -> LoadTicket {
        self.epoch = Epoch(self.epoch.0 + 1);
        self.session = None;
        self.vocabulary = None;
        self.failures.clear();

        debug!(epoch = self.epoch.0, aggregate_id, "Load started");
        LoadTicket {
            epoch: self.epoch,
            aggregate_id: aggregate_id.to_string(),
        }
    }

    /// Install the load result unless a newer load has started since
    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<LoadedAggregate, LoadError>,
    ) -> Result<Resolution, LoadError> {
        if ticket.epoch != self.epoch {
            warn!(
                aggregate_id = %ticket.aggregate_id,
                epoch = ticket.epoch.0,
                current = self.epoch.0,
                "Discarding superseded load"
            );
            return Ok(Resolution::Stale);
        }

        let loaded = result?;
        info!(
            aggregate_id = %ticket.aggregate_id,
            epoch = self.epoch.0,
            degraded = loaded.is_degraded(),
            "Session opened"
        );
        self.failures = loaded.failures.clone();
        self.session = Some(loaded.into_session(self.epoch, &self.config));
        Ok(Resolution::Applied)
    }

    /// Load `aggregate_id` and make it the current session.
    ///
    /// The tag vocabulary is fetched alongside the load; its failure is
    /// logged and leaves the cache empty.
    pub async fn open(&mut self, aggregate_id: &str) -> SyncResult<&mut EditSession> {
        let ticket = self.begin_load(aggregate_id);
        let vocabulary = self.begin_vocabulary();

        let loader = self.loader();
        let gateway = self.gateway.clone();
        let (result, categories) = futures::join!(loader.load(aggregate_id), gateway.fetch_tag_vocabulary());

        if let Err(e) = self.finish_vocabulary(&vocabulary, categories) {
            warn!(error = %e, "Tag vocabulary unavailable");
        }
        match self.finish_load(&ticket, result)? {
            Resolution::Applied => self.session.as_mut().ok_or(SyncError::NoSession),
            _ => Err(SyncError::Superseded {
                aggregate_id: ticket.aggregate_id,
            }),
        }
    }

    /// Start an owning-service lookup for the current session.
    ///
    /// `None` when nothing is open or the aggregate names no service.
    pub fn begin_trail(&self) -> Option<TrailTicket> {
        let service = self.session.as_ref()?.working().service.as_ref()?;
        Some(TrailTicket {
            epoch: self.epoch,
            service_id: service.id.clone(),
        })
    }

    /// Upgrade the breadcrumb trail, or record why it stays aggregate-only
    pub fn finish_trail(&mut self, ticket: &TrailTicket, result: GatewayResult<ServiceRef>) -> SyncResult<Resolution> {
        if ticket.epoch != self.epoch {
            debug!(epoch = ticket.epoch.0, current = self.epoch.0, "Discarding superseded service lookup");
            return Ok(Resolution::Stale);
        }
        let session = self.session.as_mut().ok_or(SyncError::NoSession)?;

        let reason = match &result {
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };
        match (session.resolve_trail(ticket.epoch, DASHBOARD_SERVICE_KIND, result), reason) {
            (Ok(resolution), _) => Ok(resolution),
            (Err(_), Some(reason)) => {
                self.failures.push(PartialFailure::Service {
                    id: ticket.service_id.clone(),
                    reason,
                });
                Ok(Resolution::NoChange)
            }
            (Err(e), None) => Err(e.into()),
        }
    }

    /// Look up the owning service and upgrade the trail
    pub async fn resolve_trail(&mut self) -> SyncResult<Resolution> {
        let Some(ticket) = self.begin_trail() else {
            return Ok(Resolution::NoChange);
        };
        let result = self.loader().lookup_service(&ticket.service_id).await;
        self.finish_trail(&ticket, result)
    }

    pub fn begin_vocabulary(&self) -> VocabularyTicket {
        VocabularyTicket { epoch: self.epoch }
    }

    /// Cache the vocabulary unless a newer load has started since
    pub fn finish_vocabulary(
        &mut self,
        ticket: &VocabularyTicket,
        result: GatewayResult<Vec<TagCategory>>,
    ) -> SyncResult<Resolution> {
        if ticket.epoch != self.epoch {
            debug!(epoch = ticket.epoch.0, current = self.epoch.0, "Discarding superseded tag vocabulary");
            return Ok(Resolution::Stale);
        }
        let categories = result?;
        debug!(categories = categories.len(), "Tag vocabulary cached");
        self.vocabulary = Some(categories);
        Ok(Resolution::Applied)
    }

    /// Tag vocabulary, fetched once per session.
    ///
    /// Independent of the aggregate load; an empty list is a valid state.
    pub async fn tag_vocabulary(&mut self) -> SyncResult<&[TagCategory]> {
        if self.vocabulary.is_none() {
            let ticket = self.begin_vocabulary();
            let result = self.gateway.fetch_tag_vocabulary().await;
            self.finish_vocabulary(&ticket, result)?;
        }
        Ok(self.vocabulary.as_deref().unwrap_or_default())
    }

    /// Selectable tag names from the cache; empty until the vocabulary arrives
    pub fn tag_names(&self) -> Vec<String> {
        self.vocabulary
            .as_deref()
            .map(vocabulary_names)
            .unwrap_or_default()
    }

    // ── Mutations against the current session ────────────────────────────

    pub async fn apply(&mut self, mutation: Mutation) -> SyncResult<Resolution> {
        let session = self.session.as_mut().ok_or(SyncError::NoSession)?;
        Ok(Reconciler::new(self.gateway.as_ref()).apply(session, mutation).await?)
    }

    pub async fn edit_description(&mut self, description: impl Into<String>) -> SyncResult<Resolution> {
        self.apply(Mutation::EditDescription {
            description: description.into(),
        })
        .await
    }

    pub async fn set_owner_and_tier(&mut self, owner: Option<EntityRef>, tier: Option<String>) -> SyncResult<Resolution> {
        self.apply(Mutation::SetOwnerAndTier { owner, tier }).await
    }

    pub async fn set_tags(&mut self, names: Vec<String>) -> SyncResult<Resolution> {
        self.apply(Mutation::SetTags { names }).await
    }

    pub async fn toggle_follow(&mut self) -> SyncResult<Resolution> {
        let session = self.session.as_mut().ok_or(SyncError::NoSession)?;
        Ok(Reconciler::new(self.gateway.as_ref()).toggle_follow(session).await?)
    }

    /// Draft and submit a description change for the chart at `index`
    pub async fn edit_item(&mut self, index: usize, description: impl Into<String>) -> SyncResult<Resolution> {
        let session = self.session.as_mut().ok_or(SyncError::NoSession)?;
        session.edit_item(index, description)?;
        Ok(Reconciler::new(self.gateway.as_ref()).commit_item_edit(session).await?)
    }
}
