use serde::{Deserialize, Serialize};

use ledger_core::{AbilityId, ContainerId, GrantHandle};

/// Requests addressed to the external ability system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityEvent {
    Granted {
        handle: GrantHandle,
        ability: AbilityId,
        container: ContainerId,
    },
    Revoked {
        handle: GrantHandle,
    },
}
