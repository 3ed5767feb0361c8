//! Opaque payloads. The bridge never looks inside these.

use serde::{Deserialize, Serialize};
use serde_json::Value;

macro_rules! opaque_payload {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Value);

        impl $name {
            /// Borrow the raw JSON.
            #[must_use]
            pub fn as_value(&self) -> &Value {
                &self.0
            }

            /// Consume and return the raw JSON.
            #[must_use]
            pub fn into_value(self) -> Value {
                self.0
            }
        }

        impl From<Value> for $name {
            fn from(value: Value) -> Self {
                Self(value)
            }
        }
    };
}

opaque_payload!(
    /// Full snapshot of debuggee process state. Each snapshot replaces the
    /// previous one wholesale.
    DebuggerState
);

opaque_payload!(
    /// Unification data for one unification id.
    UnifyMap
);

opaque_payload!(
    /// Discriminator selecting one successor of a branching command.
    BranchCase
);
