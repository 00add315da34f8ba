//! Traits binding the wire models to the generic collection machinery.

use std::fmt::Debug;

use mcpdeck_models::{
    EntityId, EntityStatus, Market, MarketDraft, MarketTool, ToolServer, ToolServerDraft,
};

use crate::error::ValidationError;

/// Item of a managed collection, identified by an id unique within it.
pub trait Entity: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Collection name used in logs and failure messages.
    const COLLECTION: &'static str;

    /// Identifier of this entity.
    fn id(&self) -> &EntityId;
}

/// Entity that can be created and updated through a draft payload.
pub trait Editable: Entity {
    /// Writable subset sent on create and update.
    type Draft: Clone + Debug + Send + Sync + 'static;

    /// Reject malformed drafts before any state change.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first invalid field.
    fn validate_draft(draft: &Self::Draft, creating: bool) -> Result<(), ValidationError>;

    /// New value with the draft's present fields applied.
    #[must_use]
    fn apply_draft(&self, draft: &Self::Draft) -> Self;

    /// Materialise an entity from a draft once the backend assigned an id.
    fn from_draft(id: EntityId, draft: &Self::Draft) -> Option<Self>;
}

/// Entity carrying an ENABLED/DISABLED status.
pub trait Toggleable: Entity {
    /// Current status.
    fn status(&self) -> EntityStatus;

    /// New value with the given status.
    #[must_use]
    fn with_status(&self, status: EntityStatus) -> Self;
}

impl Entity for ToolServer {
    const COLLECTION: &'static str = "servers";

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Editable for ToolServer {
    type Draft = ToolServerDraft;

    fn validate_draft(draft: &ToolServerDraft, creating: bool) -> Result<(), ValidationError> {
        if creating {
            ValidationError::check_required("name", draft.name.as_deref())?;
            if draft.kind.is_none() {
                return Err(ValidationError::MissingField { field: "type" });
            }
        } else if draft.name.is_some() {
            ValidationError::check_required("name", draft.name.as_deref())?;
        }
        ValidationError::check_json("configJson", draft.config_json.as_deref())
    }

    fn apply_draft(&self, draft: &ToolServerDraft) -> Self {
        draft.apply_to(self)
    }

    fn from_draft(id: EntityId, draft: &ToolServerDraft) -> Option<Self> {
        Some(Self {
            id,
            name: draft.name.clone()?,
            description: draft.description.clone(),
            kind: draft.kind?,
            status: draft.status.unwrap_or(EntityStatus::Enabled),
            config_json: draft.config_json.clone(),
            create_time: None,
            update_time: None,
        })
    }
}

impl Toggleable for ToolServer {
    fn status(&self) -> EntityStatus {
        self.status
    }

    fn with_status(&self, status: EntityStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

impl Entity for Market {
    const COLLECTION: &'static str = "markets";

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Editable for Market {
    type Draft = MarketDraft;

    fn validate_draft(draft: &MarketDraft, creating: bool) -> Result<(), ValidationError> {
        if creating {
            ValidationError::check_required("name", draft.name.as_deref())?;
            ValidationError::check_required("url", draft.url.as_deref())?;
        } else {
            if draft.name.is_some() {
                ValidationError::check_required("name", draft.name.as_deref())?;
            }
            if draft.url.is_some() {
                ValidationError::check_required("url", draft.url.as_deref())?;
            }
        }
        ValidationError::check_json("authConfig", draft.auth_config.as_deref())
    }

    fn apply_draft(&self, draft: &MarketDraft) -> Self {
        draft.apply_to(self)
    }

    fn from_draft(id: EntityId, draft: &MarketDraft) -> Option<Self> {
        Some(Self {
            id,
            name: draft.name.clone()?,
            url: draft.url.clone()?,
            description: draft.description.clone(),
            auth_config: draft.auth_config.clone(),
            status: draft.status.unwrap_or(EntityStatus::Enabled),
            create_time: None,
            update_time: None,
        })
    }
}

impl Toggleable for Market {
    fn status(&self) -> EntityStatus {
        self.status
    }

    fn with_status(&self, status: EntityStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

impl Entity for MarketTool {
    const COLLECTION: &'static str = "market-tools";

    fn id(&self) -> &EntityId {
        &self.id
    }
}
