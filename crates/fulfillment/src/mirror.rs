use serde::Deserialize;
use tracing::{info, warn};

use concierge_core::domain::restaurant::RestaurantId;

use crate::search::{SearchError, SearchIndex};

/// One change-stream record from the restaurant store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Modify,
    Remove,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub id: Option<String>,
    pub cuisine: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MirrorOutcome {
    Upserted,
    Deleted,
    /// Malformed event: logged and skipped, never retried.
    Dropped,
}

/// Mirror one store change into the search index. Inserts and modifies
/// upsert a `{id, Cuisine}` document keyed by the restaurant id; removals
/// delete by id. Events missing their key fields are dropped with a log
/// line so the stream keeps draining.
pub async fn mirror_change(
    index: &dyn SearchIndex,
    event: &ChangeEvent,
) -> Result<MirrorOutcome, SearchError> {
    let Some(id) = event.id.as_deref().filter(|id| !id.is_empty()) else {
        warn!(
            event_name = "mirror.event_dropped",
            kind = ?event.kind,
            "change event carries no restaurant id"
        );
        return Ok(MirrorOutcome::Dropped);
    };
    let id = RestaurantId(id.to_string());

    match event.kind {
        ChangeKind::Insert | ChangeKind::Modify => {
            let Some(cuisine) = event.cuisine.as_deref().filter(|cuisine| !cuisine.is_empty())
            else {
                warn!(
                    event_name = "mirror.event_dropped",
                    restaurant_id = %id,
                    "change event carries no cuisine"
                );
                return Ok(MirrorOutcome::Dropped);
            };

            index.upsert_document(&id, cuisine).await?;
            info!(
                event_name = "mirror.document_upserted",
                restaurant_id = %id,
                cuisine,
                "search document upserted"
            );
            Ok(MirrorOutcome::Upserted)
        }
        ChangeKind::Remove => {
            index.delete_document(&id).await?;
            info!(
                event_name = "mirror.document_deleted",
                restaurant_id = %id,
                "search document deleted"
            );
            Ok(MirrorOutcome::Deleted)
        }
    }
}
